use std::{fs, path::Path};

use clonetree::{Options, clone_tree};

use crate::error::{Result, StepperError};

/// Clone options excluding every name in `ignore` at any depth.
fn filtered_options(ignore: &[String]) -> Options {
    let mut options = Options::new();
    for name in ignore {
        options = options
            .glob(format!("!{name}"))
            .glob(format!("!{name}/**"))
            .glob(format!("!**/{name}"))
            .glob(format!("!**/{name}/**"));
    }
    options
}

/// Clone the tree at `src` into `dest`, skipping entries whose file name is in
/// `ignore` at any depth.
///
/// `dest` must not exist; its parent is created if needed. Files are reflinked
/// where the filesystem supports it and symlinks are recreated, not followed.
pub fn copy_filtered(src: &Path, dest: &Path, ignore: &[String]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    clone_tree(src, dest, &filtered_options(ignore)).map_err(|e| {
        StepperError::OperationError(format!(
            "Failed to copy {} to {}: {e}",
            src.display(),
            dest.display()
        ))
    })?;
    Ok(())
}

/// Remove `path` whether it is a directory, a file or a symlink. Missing paths are ignored.
pub fn remove_entry(path: &Path) -> Result<()> {
    if !(path.exists() || path.is_symlink()) {
        return Ok(());
    }
    if path.is_dir() && !path.is_symlink() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}
