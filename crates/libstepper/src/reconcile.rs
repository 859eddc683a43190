use std::{fs, io, path::Path};

use clonetree::{Options, clone_tree};

use crate::{
    error::{Result, StepperError, git_error},
    git::Repository,
    output::Output,
    snapshot,
};

/// Copy every top-level staging entry into `output_dir`, replacing existing entries.
///
/// When `checkout_published` is set, `published_branch` is checked out first
/// so the copies land on top of the branch being assembled. Entries are
/// processed in name order; the names copied are returned.
pub fn reconcile(
    repo: &Repository,
    staging: &Path,
    output_dir: &Path,
    published_branch: &str,
    checkout_published: bool,
    output: &dyn Output,
) -> Result<Vec<String>> {
    if checkout_published {
        #[allow(clippy::let_underscore_must_use)]
        let _ = output.message(&format!("Checking out {published_branch}"));
        repo.checkout(published_branch)
            .map_err(|e| git_error(&e))?;
    }

    fs::create_dir_all(output_dir)?;

    let mut names: Vec<_> = fs::read_dir(staging)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<_>>()?;
    names.sort();

    let mut copied = Vec::with_capacity(names.len());
    for name in names {
        let src = staging.join(&name);
        let dest = output_dir.join(&name);
        let display = name.to_string_lossy().to_string();

        // Replace, never merge: a stale checkpoint folder is removed wholesale.
        snapshot::remove_entry(&dest)?;

        #[allow(clippy::let_underscore_must_use)]
        let _ = output.message(&format!("Copying: {display}"));
        if src.is_dir() {
            clone_tree(&src, &dest, &Options::new()).map_err(|e| {
                StepperError::OperationError(format!("Failed to copy {display} to output: {e}"))
            })?;
        } else {
            reflink_copy::reflink_or_copy(&src, &dest).map_err(|e| {
                StepperError::OperationError(format!("Failed to copy {display} to output: {e}"))
            })?;
        }
        copied.push(display);
    }

    Ok(copied)
}
