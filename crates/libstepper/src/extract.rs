use std::{
    collections::HashSet,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    docs,
    error::{Result, StepperError, git_error},
    git::{HistoryOrder, Repository},
    name::{self, CheckpointName, Classification},
    output::Output,
    snapshot,
};

/// Where snapshots land inside the staging area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `staging/<checkpoint>`; used when a single branch is processed.
    Flat,
    /// `staging/<branch folder>/<checkpoint>`; used for several branches.
    Nested,
}

/// Settings shared by every branch extracted in one run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    /// Snapshot placement.
    pub layout: Layout,
    /// Marker removed from branch names to form folder names.
    pub develop_marker: &'a str,
    /// Names skipped at every depth when copying the working tree.
    pub ignore: &'a [String],
    /// Repository URL for README diff links; `None` disables them.
    pub links: Option<&'a str>,
}

/// A checkpoint materialized into the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Development branch the checkpoint was found on.
    pub branch: String,
    /// Sanitized identifier, also the name of the checkpoint branch.
    pub identifier: String,
    /// Commit the checkpoint points at.
    pub commit: String,
    /// Exercise or solution classification.
    pub classification: Classification,
    /// Position in the branch's newest-first history.
    pub ordinal: usize,
    /// Snapshot directory inside the staging area.
    pub destination: PathBuf,
}

/// Walks one development branch and snapshots each checkpoint into staging.
pub struct CheckpointExtractor<'a> {
    /// Repository whose working tree is checked out per checkpoint.
    repo: &'a Repository,
    /// Root of the staging area.
    staging: &'a Path,
    /// Run-wide settings.
    options: ExtractOptions<'a>,
}

impl<'a> CheckpointExtractor<'a> {
    /// Create an extractor writing into `staging`.
    pub fn new(repo: &'a Repository, staging: &'a Path, options: ExtractOptions<'a>) -> Self {
        Self {
            repo,
            staging,
            options,
        }
    }

    /// Snapshot directory for `identifier` found on `branch`.
    pub fn destination(&self, branch: &str, identifier: &str) -> PathBuf {
        match self.options.layout {
            Layout::Flat => self.staging.join(identifier),
            Layout::Nested => self
                .staging
                .join(name::folder_name(branch, self.options.develop_marker))
                .join(identifier),
        }
    }

    /// Extract every checkpoint on `branch`, newest first.
    ///
    /// Each checkpoint gets a branch named after its identifier (replacing any
    /// existing one), is checked out, force-cleaned and copied into staging.
    /// Leaves HEAD detached at the last checkpoint processed.
    pub fn extract(&self, branch: &str, output: &dyn Output) -> Result<Vec<Checkpoint>> {
        let revs = self
            .repo
            .rev_list(branch, HistoryOrder::NewestFirst)
            .map_err(|e| git_error(&e))?;

        let mut seen = HashSet::new();
        let mut checkpoints = Vec::new();

        for (ordinal, rev) in revs.iter().enumerate() {
            let message = self.repo.commit_message(rev).map_err(|e| git_error(&e))?;
            let classification = name::classify_message(&message);
            let Some(identifier) = classification.identifier().map(str::to_string) else {
                continue;
            };

            if !seen.insert(identifier.clone()) {
                #[allow(clippy::let_underscore_must_use)]
                let _ = output.warn(&format!(
                    "Skipping {rev}: checkpoint '{identifier}' already taken by a newer commit"
                ));
                continue;
            }

            // Validate before touching the repository or the staging area.
            if !self
                .repo
                .is_valid_branch_name(&identifier)
                .map_err(|e| git_error(&e))?
            {
                return Err(StepperError::InvalidReference {
                    branch: branch.to_string(),
                    commit: rev.clone(),
                    identifier,
                });
            }

            let link_parts = match self.options.links {
                Some(_) => Some(CheckpointName::parse(&identifier).ok_or_else(|| {
                    StepperError::NamingConvention {
                        branch: branch.to_string(),
                        commit: rev.clone(),
                        identifier: identifier.clone(),
                    }
                })?),
                None => None,
            };

            #[allow(clippy::let_underscore_must_use)]
            let _ = output.message(&format!("Saving snapshot of: {identifier}"));
            let destination = self.materialize(branch, rev, &identifier)?;

            if let (Some(parts), Some(repository)) = (&link_parts, self.options.links) {
                append_readme(&destination, &docs::diff_link_block(parts, repository))?;
            }

            checkpoints.push(Checkpoint {
                branch: branch.to_string(),
                identifier,
                commit: rev.clone(),
                classification,
                ordinal,
                destination,
            });
        }

        Ok(checkpoints)
    }

    /// Point the checkpoint branch at `rev`, check it out clean and copy it to staging.
    fn materialize(&self, branch: &str, rev: &str, identifier: &str) -> Result<PathBuf> {
        if self.repo.has_branch(identifier).map_err(|e| git_error(&e))? {
            self.repo
                .delete_branch(identifier, true)
                .map_err(|e| git_error(&e))?;
        }
        self.repo
            .create_branch_at(identifier, rev)
            .map_err(|e| git_error(&e))?;
        self.repo.checkout(rev).map_err(|e| git_error(&e))?;
        self.repo.clean_all().map_err(|e| git_error(&e))?;

        let destination = self.destination(branch, identifier);
        snapshot::remove_entry(&destination)?;
        snapshot::copy_filtered(self.repo.root(), &destination, self.options.ignore)?;
        Ok(destination)
    }
}

/// Append `block` to `dir/README.md`, creating the file if needed.
fn append_readme(dir: &Path, block: &str) -> Result<()> {
    let mut readme = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("README.md"))?;
    readme.write_all(block.as_bytes())?;
    Ok(())
}
