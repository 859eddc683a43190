use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};

use fs4::FileExt;

use crate::error::{Result, StepperError};

/// Name of the lock file created inside the git directory.
pub const LOCK_FILE_NAME: &str = "stepper.lock";

/// RAII exclusive lock over a repository's working tree.
///
/// Held for the whole of a run so two stepper invocations cannot check out
/// commits into the same working tree at once.
#[derive(Debug)]
pub struct RunLock {
    /// The locked file handle.
    file: File,
}

impl RunLock {
    /// Take the lock in `git_dir`, failing immediately if another process holds it.
    pub fn acquire(git_dir: &Path) -> Result<Self> {
        let path = git_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(map_io)?;

        // Contention is reported differently per platform; any failure to
        // take a non-blocking lock means someone else holds it.
        if file.try_lock_exclusive().is_err() {
            return Err(StepperError::Locked { path });
        }
        Ok(Self { file })
    }
}

impl Drop for RunLock {
    #[allow(clippy::let_underscore_must_use)]
    fn drop(&mut self) {
        // Left in place so every run locks the same inode.
        let _ = FileExt::unlock(&self.file);
    }
}

/// Map an IO error to a StepperError.
#[allow(clippy::needless_pass_by_value)]
fn map_io(err: io::Error) -> StepperError {
    StepperError::OperationError(format!("Lock error: {err}"))
}
