use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Run a git command with the given arguments in the specified directory.
/// Returns the output if successful, otherwise returns an error with the full command details.
fn run_git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute git command: git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let command = format!("git {}", args.join(" "));
        anyhow::bail!("Git command failed: {}\nError: {}", command, stderr.trim());
    }

    Ok(output)
}

/// Run a git command and return its trimmed stdout.
fn git_stdout(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = run_git(repo_path, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Walk up from `start_dir` to find the nearest repository root containing a `.git` entry.
pub fn find_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Order in which [`Repository::rev_list`] returns commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrder {
    /// Branch head first, as `git rev-list` reports by default.
    NewestFirst,
    /// Root commit first (`git rev-list --reverse`).
    OldestFirst,
}

/// Handle to the repository whose working tree stepper operates on.
///
/// The working tree and index are a single shared resource: every mutating
/// operation goes through this handle, and only one checkout can be
/// materialized at a time.
#[derive(Debug, Clone)]
pub struct Repository {
    /// Root of the working tree.
    root: PathBuf,
}

impl Repository {
    /// Open the repository rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the git metadata directory.
    pub fn git_dir(&self) -> Result<PathBuf> {
        let dir = git_stdout(&self.root, &["rev-parse", "--absolute-git-dir"])?;
        Ok(PathBuf::from(dir))
    }

    /// Check whether the repository has staged, unstaged or untracked changes.
    pub fn has_uncommitted_changes(&self) -> Result<bool> {
        let status = git_stdout(&self.root, &["status", "--porcelain"])?;
        Ok(!status.is_empty())
    }

    /// Check whether the working tree holds anything a force-clean would remove:
    /// changes, untracked files or ignored files.
    pub fn has_local_state(&self) -> Result<bool> {
        let status = git_stdout(&self.root, &["status", "--porcelain", "--ignored"])?;
        Ok(!status.is_empty())
    }

    /// Enumerate every local branch, returning their short names.
    pub fn list_branches(&self) -> Result<Vec<String>> {
        let output = run_git(
            &self.root,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        )?;
        let output_str = String::from_utf8_lossy(&output.stdout);

        Ok(output_str
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|branch| !branch.is_empty())
            .collect())
    }

    /// Whether `name` is acceptable as a local branch name.
    pub fn is_valid_branch_name(&self, name: &str) -> Result<bool> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(["check-ref-format", "--branch", name])
            .output()
            .context("Failed to execute git check-ref-format")?;
        Ok(output.status.success())
    }

    /// Determine if a local branch named `branch_name` exists.
    pub fn has_branch(&self, branch_name: &str) -> Result<bool> {
        let refname = format!("refs/heads/{branch_name}");
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(["show-ref", "--verify", "--quiet", &refname])
            .output()
            .context("Failed to execute git show-ref")?;
        Ok(output.status.success())
    }

    /// The checked-out branch, or `None` when HEAD is detached.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(["symbolic-ref", "--quiet", "--short", "HEAD"])
            .output()
            .context("Failed to execute git symbolic-ref")?;

        // Exit status 1 with --quiet means HEAD is detached.
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Ok(Some(name))
        } else if output.status.code() == Some(1) {
            Ok(None)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to read HEAD: {}", stderr.trim());
        }
    }

    /// Current value of `refs/stash`, if any stash entry exists.
    pub fn stash_head(&self) -> Result<Option<String>> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(["rev-parse", "--quiet", "--verify", "refs/stash"])
            .output()
            .context("Failed to execute git rev-parse")?;
        if output.status.success() {
            Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ))
        } else {
            Ok(None)
        }
    }

    /// Stash changes plus untracked and ignored files, returning the new
    /// stash commit if an entry was created.
    pub fn stash_push(&self) -> Result<Option<String>> {
        let before = self.stash_head()?;
        run_git(&self.root, &["stash", "push", "--all", "--quiet"])?;
        let after = self.stash_head()?;
        Ok(after.filter(|commit| before.as_ref() != Some(commit)))
    }

    /// Restore the most recent stash entry, restaging what was staged.
    pub fn stash_pop(&self) -> Result<()> {
        run_git(&self.root, &["stash", "pop", "--index", "--quiet"])?;
        Ok(())
    }

    /// List stash entries, newest first.
    pub fn stash_list(&self) -> Result<Vec<String>> {
        let output = git_stdout(&self.root, &["stash", "list"])?;
        Ok(output.lines().map(str::to_string).collect())
    }

    /// Create or move the branch `branch_name` to point at `commit`.
    pub fn create_branch_at(&self, branch_name: &str, commit: &str) -> Result<()> {
        run_git(&self.root, &["branch", "--force", branch_name, commit])?;
        Ok(())
    }

    /// Delete the branch named `branch_name`, forcing the deletion when `force` is `true`.
    pub fn delete_branch(&self, branch_name: &str, force: bool) -> Result<()> {
        let mut args = vec!["branch"];
        if force {
            args.push("-D");
        } else {
            args.push("-d");
        }
        args.push(branch_name);

        run_git(&self.root, &args)?;
        Ok(())
    }

    /// Check out a branch, or a commit in detached mode.
    pub fn checkout(&self, target: &str) -> Result<()> {
        run_git(&self.root, &["checkout", "--quiet", target])?;
        Ok(())
    }

    /// Detach HEAD at the current commit, leaving the working tree untouched.
    pub fn detach(&self) -> Result<()> {
        run_git(&self.root, &["checkout", "--quiet", "--detach"])?;
        Ok(())
    }

    /// Remove untracked and ignored files and directories from the working tree.
    pub fn clean_all(&self) -> Result<()> {
        run_git(&self.root, &["clean", "-fdx", "--quiet"])?;
        Ok(())
    }

    /// Commit hashes reachable from `rev` in the requested order.
    pub fn rev_list(&self, rev: &str, order: HistoryOrder) -> Result<Vec<String>> {
        let mut args = vec!["rev-list"];
        if order == HistoryOrder::OldestFirst {
            args.push("--reverse");
        }
        args.push(rev);
        args.push("--");

        let output = git_stdout(&self.root, &args)?;
        Ok(output
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// Full message of `commit`.
    pub fn commit_message(&self, commit: &str) -> Result<String> {
        let output = run_git(&self.root, &["log", "-1", "--format=%B", commit])?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
