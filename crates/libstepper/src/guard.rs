use crate::{
    error::{Result, StepperError, git_error},
    git::Repository,
    output::{Output, Quiet},
};

/// Saved repository state, restored when the guard is released.
///
/// [`RepoGuard::enter`] records the checked-out branch and stashes any
/// uncommitted work, including untracked and ignored files, since extraction
/// force-cleans the tree; [`RepoGuard::restore`] puts both back. If the guard is
/// dropped without an explicit restore (e.g. while unwinding from a panic),
/// restoration is attempted on a best-effort basis.
#[derive(Debug)]
pub struct RepoGuard<'a> {
    /// Repository being protected.
    repo: &'a Repository,
    /// Branch checked out when the guard was entered; `None` if HEAD was detached.
    branch: Option<String>,
    /// Stash commit created by `enter`, popped on restore.
    stash: Option<String>,
    /// Set once restoration has been attempted.
    restored: bool,
}

impl<'a> RepoGuard<'a> {
    /// Record the active branch and stash uncommitted changes, leaving a clean tree.
    pub fn enter(repo: &'a Repository, output: &dyn Output) -> Result<Self> {
        let branch = repo.current_branch().map_err(|e| git_error(&e))?;

        let stash = if repo.has_local_state().map_err(|e| git_error(&e))? {
            #[allow(clippy::let_underscore_must_use)]
            let _ = output.message("Stashing uncommitted changes");
            repo.stash_push().map_err(|e| git_error(&e))?
        } else {
            None
        };

        Ok(Self {
            repo,
            branch,
            stash,
            restored: false,
        })
    }

    /// Branch that will be checked out again on restore.
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Whether a stash entry will be popped on restore.
    pub fn stashed(&self) -> bool {
        self.stash.is_some()
    }

    /// Check out the original branch and pop the stash this guard created.
    pub fn restore(mut self, output: &dyn Output) -> Result<()> {
        self.restored = true;
        self.restore_state(output)
    }

    /// Shared restoration logic for [`restore`](Self::restore) and `Drop`.
    ///
    /// The stash is popped even when the branch checkout fails; every failure
    /// is reported together.
    fn restore_state(&self, output: &dyn Output) -> Result<()> {
        let mut failures = Vec::new();

        if let Some(branch) = &self.branch
            && let Err(e) = self.repo.checkout(branch)
        {
            failures.push(format!("could not check out '{branch}': {e:#}"));
        }

        if let Some(stash) = &self.stash {
            #[allow(clippy::let_underscore_must_use)]
            let _ = output.message("Popping stashed changes");
            if let Err(e) = self.repo.stash_pop() {
                failures.push(format!(
                    "could not pop stashed changes, they remain in stash commit {stash}: {e:#}"
                ));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StepperError::Restore(failures.join("; ")))
        }
    }
}

impl Drop for RepoGuard<'_> {
    #[allow(clippy::let_underscore_must_use)]
    fn drop(&mut self) {
        if !self.restored {
            let _ = self.restore_state(&Quiet);
        }
    }
}

/// Run `op` with the repository state saved, restoring it on every exit path.
///
/// When `op` fails its error is returned; a restoration failure is never
/// swallowed and is combined with the operation's error if both fail.
pub fn guarded<T, F>(repo: &Repository, output: &dyn Output, op: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let guard = RepoGuard::enter(repo, output)?;
    let result = op();
    let restored = guard.restore(output);

    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(failure), Ok(())) => Err(failure),
        (Ok(_), Err(restore)) => Err(restore),
        (Err(failure), Err(restore)) => Err(StepperError::RestoreAfterFailure {
            failure: Box::new(failure),
            restore: Box::new(restore),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path, process::Command};

    use tempfile::TempDir;

    use super::*;
    use crate::output::Quiet;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .current_dir(repo_dir)
            .args(args)
            .status()
            .unwrap();
        assert!(status.success(), "git {} failed", args.join(" "));
    }

    fn init_repo(tmp: &TempDir) -> Repository {
        let repo_dir = tmp.path().join("repo");
        fs::create_dir_all(&repo_dir).unwrap();
        run_git(&repo_dir, &["init", "-b", "main"]);
        run_git(&repo_dir, &["config", "user.email", "test@example.com"]);
        run_git(&repo_dir, &["config", "user.name", "Test User"]);
        fs::write(repo_dir.join("README.md"), "base").unwrap();
        run_git(&repo_dir, &["add", "README.md"]);
        run_git(&repo_dir, &["commit", "-m", "Initial commit"]);
        run_git(&repo_dir, &["branch", "other"]);
        Repository::new(repo_dir)
    }

    #[test]
    fn clean_tree_does_not_stash() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);

        let guard = RepoGuard::enter(&repo, &Quiet).unwrap();
        assert_eq!(guard.branch(), Some("main"));
        assert!(!guard.stashed());
        guard.restore(&Quiet).unwrap();
        assert!(repo.stash_list().unwrap().is_empty());
    }

    #[test]
    fn restores_branch_and_changes_after_success() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        fs::write(repo.root().join("README.md"), "edited").unwrap();
        fs::write(repo.root().join("notes.txt"), "draft").unwrap();

        let value = guarded(&repo, &Quiet, || {
            assert!(!repo.has_uncommitted_changes().unwrap());
            repo.checkout("other").unwrap();
            Ok(7)
        })
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(repo.current_branch().unwrap(), Some("main".to_string()));
        assert_eq!(
            fs::read_to_string(repo.root().join("README.md")).unwrap(),
            "edited"
        );
        assert_eq!(
            fs::read_to_string(repo.root().join("notes.txt")).unwrap(),
            "draft"
        );
        assert!(repo.stash_list().unwrap().is_empty());
    }

    #[test]
    fn restores_after_failure_and_returns_error() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        fs::write(repo.root().join("README.md"), "edited").unwrap();

        let result: Result<()> = guarded(&repo, &Quiet, || {
            repo.detach().unwrap();
            Err(StepperError::OperationError("boom".to_string()))
        });

        assert!(matches!(result, Err(StepperError::OperationError(_))));
        assert_eq!(repo.current_branch().unwrap(), Some("main".to_string()));
        assert_eq!(
            fs::read_to_string(repo.root().join("README.md")).unwrap(),
            "edited"
        );
    }

    #[test]
    fn preexisting_stash_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        fs::write(repo.root().join("README.md"), "older work").unwrap();
        run_git(repo.root(), &["stash"]);
        assert_eq!(repo.stash_list().unwrap().len(), 1);

        guarded(&repo, &Quiet, || Ok(())).unwrap();

        // The unrelated stash entry must not be popped.
        assert_eq!(repo.stash_list().unwrap().len(), 1);
        assert_eq!(
            fs::read_to_string(repo.root().join("README.md")).unwrap(),
            "base"
        );
    }

    #[test]
    fn detached_start_is_tolerated() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        repo.detach().unwrap();

        guarded(&repo, &Quiet, || {
            repo.checkout("other").unwrap();
            Ok(())
        })
        .unwrap();

        // No branch was recorded, so none is checked out on restore.
        assert_eq!(repo.current_branch().unwrap(), Some("other".to_string()));
    }

    #[test]
    fn restore_failure_is_surfaced() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);

        let result: Result<()> = guarded(&repo, &Quiet, || {
            repo.detach().unwrap();
            run_git(repo.root(), &["branch", "-D", "main"]);
            Err(StepperError::OperationError("boom".to_string()))
        });

        match result {
            Err(StepperError::RestoreAfterFailure { failure, restore }) => {
                assert!(matches!(*failure, StepperError::OperationError(_)));
                assert!(matches!(*restore, StepperError::Restore(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn stash_is_popped_even_when_checkout_fails() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        fs::write(repo.root().join("README.md"), "edited").unwrap();

        let result: Result<()> = guarded(&repo, &Quiet, || {
            repo.detach().unwrap();
            run_git(repo.root(), &["branch", "-D", "main"]);
            Ok(())
        });

        match result {
            Err(StepperError::Restore(message)) => {
                assert!(message.contains("'main'"), "{message}");
                assert!(!message.contains("stash commit"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(
            fs::read_to_string(repo.root().join("README.md")).unwrap(),
            "edited"
        );
        assert!(repo.stash_list().unwrap().is_empty());
    }

    #[test]
    fn failed_pop_names_the_stash_commit() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        fs::write(repo.root().join("notes.txt"), "draft").unwrap();

        let mut stash = None;
        let result: Result<()> = guarded(&repo, &Quiet, || {
            stash = repo.stash_head().unwrap();
            // An untracked file in the way makes the pop refuse to apply.
            fs::write(repo.root().join("notes.txt"), "in the way").unwrap();
            Ok(())
        });

        let stash = stash.unwrap();
        match result {
            Err(StepperError::Restore(message)) => assert!(message.contains(&stash), "{message}"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(repo.stash_list().unwrap().len(), 1);
    }

    #[test]
    fn ignored_files_survive_a_force_clean() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        fs::write(repo.root().join(".gitignore"), "local.properties\n").unwrap();
        run_git(repo.root(), &["add", ".gitignore"]);
        run_git(repo.root(), &["commit", "-m", "Ignore local settings"]);
        fs::write(repo.root().join("local.properties"), "sdk.dir=/opt/sdk").unwrap();

        guarded(&repo, &Quiet, || {
            repo.clean_all().unwrap();
            assert!(!repo.root().join("local.properties").exists());
            Ok(())
        })
        .unwrap();

        assert_eq!(
            fs::read_to_string(repo.root().join("local.properties")).unwrap(),
            "sdk.dir=/opt/sdk"
        );
        assert!(repo.stash_list().unwrap().is_empty());
    }

    #[test]
    fn drop_restores_when_not_released() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(&tmp);
        fs::write(repo.root().join("README.md"), "edited").unwrap();

        {
            let _guard = RepoGuard::enter(&repo, &Quiet).unwrap();
            repo.checkout("other").unwrap();
        }

        assert_eq!(repo.current_branch().unwrap(), Some("main".to_string()));
        assert_eq!(
            fs::read_to_string(repo.root().join("README.md")).unwrap(),
            "edited"
        );
    }
}
