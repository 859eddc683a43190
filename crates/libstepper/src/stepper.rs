use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::{
    config::Config,
    docs::{BranchDocs, SolutionStyle},
    error::{Result, StepperError, git_error},
    extract::{Checkpoint, CheckpointExtractor, ExtractOptions, Layout},
    git::{self, HistoryOrder, Repository},
    guard::guarded,
    lock::RunLock,
    name::{self, Classification},
    output::Output,
    reconcile::reconcile,
};

/// Which development branches a workflow operates on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BranchSelection {
    /// Every local branch containing the development marker.
    #[default]
    All,
    /// Exactly these branches, in this order.
    Named(Vec<String>),
}

/// Options for [`Stepper::flatten`].
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Directory receiving the checkpoint folders.
    pub output_dir: PathBuf,
    /// Published branch; defaults to the configured one.
    pub published_branch: Option<String>,
    /// Development branches to flatten.
    pub develop: BranchSelection,
    /// Force-delete local branches other than the published and selected ones first.
    pub remove_branches: bool,
    /// Append download and compare links to each checkpoint's README.
    pub links: bool,
    /// Directory the staging area is created in; the system temp directory when `None`.
    pub staging_parent: Option<PathBuf>,
}

/// What a flatten run did.
#[derive(Debug, Clone)]
pub struct FlattenReport {
    /// Development branches processed.
    pub branches: Vec<String>,
    /// Checkpoints extracted, per branch in newest-first order.
    pub checkpoints: Vec<Checkpoint>,
    /// Top-level entries copied into the output directory.
    pub copied: Vec<String>,
    /// Local branches deleted before extraction.
    pub removed_branches: Vec<String>,
    /// Published branch the output is meant to be committed to.
    pub published_branch: String,
}

/// Options for [`Stepper::write_texts`].
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Directory receiving one folder of documents per development branch.
    pub output_dir: PathBuf,
    /// Template for solution entries.
    pub style: SolutionStyle,
}

/// Checkpoint preview for one development branch.
#[derive(Debug, Clone)]
pub struct BranchListing {
    /// Development branch name.
    pub branch: String,
    /// Folder name the branch flattens into.
    pub folder: String,
    /// Checkpoints on the branch, oldest first.
    pub checkpoints: Vec<Classification>,
}

/// Manager for flattening course checkpoints and writing their documents.
///
/// All repository access goes through one [`Repository`] handle. Mutating
/// workflows hold an exclusive run lock and run inside a state guard that puts
/// the original branch and any uncommitted changes back afterwards.
pub struct Stepper {
    /// The repository being processed.
    repo: Repository,
    /// Course settings.
    config: Config,
}

impl Stepper {
    /// Create a new [`Stepper`].
    ///
    /// - `repo_dir`: optional path to the git repository root. If `None`, the
    ///   repository root is discovered by walking up from the current directory.
    /// - `config`: explicit configuration file; when `None`, `stepper.toml` at
    ///   the repository root is used if present.
    pub fn new(repo_dir: Option<PathBuf>, config: Option<&Path>) -> Result<Self> {
        let repo_dir = if let Some(dir) = repo_dir {
            git::find_root(&dir).ok_or_else(|| {
                StepperError::ContextError(format!("Not a git repository: {}", dir.display()))
            })?
        } else {
            let current_dir = env::current_dir().map_err(|_| {
                StepperError::ContextError("Failed to get current directory".to_string())
            })?;
            git::find_root(&current_dir).ok_or(StepperError::ContextError(
                "Not in a git repository".to_string(),
            ))?
        };

        // Canonicalize the repository root so output paths compare reliably.
        let repo_dir = fs::canonicalize(&repo_dir).unwrap_or(repo_dir);
        let config = Config::load(config, &repo_dir)?;

        Ok(Self::with_config(Repository::new(repo_dir), config))
    }

    /// Create a [`Stepper`] from an opened repository and explicit settings.
    pub fn with_config(repo: Repository, config: Config) -> Self {
        Self { repo, config }
    }

    /// The repository handle.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a branch selection against the repository's local branches.
    pub fn development_branches(&self, selection: &BranchSelection) -> Result<Vec<String>> {
        match selection {
            BranchSelection::All => {
                let branches = self.repo.list_branches().map_err(|e| git_error(&e))?;
                Ok(branches
                    .into_iter()
                    .filter(|b| self.config.is_development_branch(b))
                    .collect())
            }
            BranchSelection::Named(names) => {
                for name in names {
                    if !self.repo.has_branch(name).map_err(|e| git_error(&e))? {
                        return Err(StepperError::ContextError(format!(
                            "Development branch '{name}' does not exist"
                        )));
                    }
                }
                Ok(names.clone())
            }
        }
    }

    /// Local branches a flatten with `remove_branches` would delete.
    ///
    /// The currently checked-out branch is never included.
    pub fn stale_branches(&self, published: &str, develop: &[String]) -> Result<Vec<String>> {
        let current = self.repo.current_branch().map_err(|e| git_error(&e))?;
        let branches = self.repo.list_branches().map_err(|e| git_error(&e))?;
        Ok(branches
            .into_iter()
            .filter(|b| b != published)
            .filter(|b| !develop.contains(b))
            .filter(|b| current.as_deref() != Some(b.as_str()))
            .collect())
    }

    /// Whether `dir` is where the published branch's files live on disk.
    fn is_working_tree(&self, dir: &Path) -> bool {
        let canonical = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let cwd = env::current_dir()
            .ok()
            .and_then(|cwd| fs::canonicalize(cwd).ok());
        canonical == self.repo.root() || cwd.is_some_and(|cwd| cwd == canonical)
    }

    /// Flatten every checkpoint of the selected development branches into `output_dir`.
    pub fn flatten(&self, options: &FlattenOptions, output: &dyn Output) -> Result<FlattenReport> {
        let published = options
            .published_branch
            .clone()
            .unwrap_or_else(|| self.config.published_branch.clone());
        let branches = self.development_branches(&options.develop)?;
        let layout = if branches.len() == 1 {
            Layout::Flat
        } else {
            Layout::Nested
        };

        let _lock = RunLock::acquire(&self.repo.git_dir().map_err(|e| git_error(&e))?)?;
        let staging = match &options.staging_parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                TempDir::new_in(parent)?
            }
            None => TempDir::new()?,
        };

        let result = guarded(&self.repo, output, || {
            // Decided while HEAD is still on the starting branch, which is never stale.
            let removed_branches = if options.remove_branches {
                self.stale_branches(&published, &branches)?
            } else {
                Vec::new()
            };

            // Detach so no checkpoint branch is checked out while it is recreated.
            self.repo.detach().map_err(|e| git_error(&e))?;
            self.delete_branches(&removed_branches, output)?;

            let extractor = CheckpointExtractor::new(
                &self.repo,
                staging.path(),
                ExtractOptions {
                    layout,
                    develop_marker: &self.config.develop_marker,
                    ignore: &self.config.ignore,
                    links: options
                        .links
                        .then_some(self.config.archive_repository.as_str()),
                },
            );

            let mut checkpoints = Vec::new();
            for branch in &branches {
                let section = output.section(&format!("Flattening {branch}"));
                checkpoints.extend(extractor.extract(branch, section.as_ref())?);
            }

            let copied = reconcile(
                &self.repo,
                staging.path(),
                &options.output_dir,
                &published,
                self.is_working_tree(&options.output_dir),
                output,
            )?;

            Ok(FlattenReport {
                branches: branches.clone(),
                checkpoints,
                copied,
                removed_branches,
                published_branch: published.clone(),
            })
        });

        // The staging area goes away on every path; report a close failure
        // only if the run itself succeeded.
        let closed = staging.close();
        let report = result?;
        closed?;
        Ok(report)
    }

    /// Force-delete `branches`.
    fn delete_branches(&self, branches: &[String], output: &dyn Output) -> Result<()> {
        for branch in branches {
            #[allow(clippy::let_underscore_must_use)]
            let _ = output.message(&format!("Removing local branch: {branch}"));
            self.repo
                .delete_branch(branch, true)
                .map_err(|e| git_error(&e))?;
        }
        Ok(())
    }

    /// Classify every commit on `branch` in the given order.
    fn classify_history(&self, branch: &str, order: HistoryOrder) -> Result<Vec<Classification>> {
        let revs = self.repo.rev_list(branch, order).map_err(|e| git_error(&e))?;
        revs.iter()
            .map(|rev| {
                let message = self.repo.commit_message(rev).map_err(|e| git_error(&e))?;
                Ok(name::classify_message(&message))
            })
            .collect()
    }

    /// Write the download and cross-reference documents for every development branch.
    pub fn write_texts(&self, options: &TextOptions, output: &dyn Output) -> Result<Vec<PathBuf>> {
        let branches = self.development_branches(&BranchSelection::All)?;
        let _lock = RunLock::acquire(&self.repo.git_dir().map_err(|e| git_error(&e))?)?;

        guarded(&self.repo, output, || {
            let mut written = Vec::new();
            for branch in &branches {
                let docs = BranchDocs::new(branch, &self.config, &options.output_dir);
                let history = self.classify_history(branch, HistoryOrder::OldestFirst)?;
                #[allow(clippy::let_underscore_must_use)]
                let _ = output.message(&format!("Writing documents for {}", docs.folder));
                written.extend(docs.write(&history, options.style, &self.config)?);
            }
            Ok(written)
        })
    }

    /// Preview the checkpoints on each selected branch without touching the working tree.
    pub fn list(&self, selection: &BranchSelection) -> Result<Vec<BranchListing>> {
        self.development_branches(selection)?
            .into_iter()
            .map(|branch| {
                let checkpoints = self
                    .classify_history(&branch, HistoryOrder::OldestFirst)?
                    .into_iter()
                    .filter(|c| c.identifier().is_some())
                    .collect();
                Ok(BranchListing {
                    folder: name::folder_name(&branch, &self.config.develop_marker),
                    branch,
                    checkpoints,
                })
            })
            .collect()
    }
}
