use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{Context, Result, ensure};
use tempfile::TempDir;

/// Return the path to the compiled `stepper` binary for integration-style tests.
pub fn stepper_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stepper"))
}

/// Run a git command inside `repo_path`, ensuring it succeeds.
pub fn git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "git command failed: git {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(output)
}

/// Trimmed stdout of a git command.
pub fn git_stdout(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = git(repo_path, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Write `content` to `file` and commit everything with `message`.
pub fn commit(repo_path: &Path, file: &str, content: &str, message: &str) -> Result<()> {
    fs::write(repo_path.join(file), content)?;
    git(repo_path, &["add", "-A"])?;
    git(repo_path, &["commit", "-m", message])?;
    Ok(())
}

/// Create a course repository: a `student` branch plus `develop-01-Intro`
/// (exercise, solution, cleanup) and `develop-02-Lists` (exercise, solution).
pub fn create_course_repo() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let repo_path = temp_dir.path().join("course");
    fs::create_dir_all(&repo_path)?;

    git(&repo_path, &["init", "-b", "student"])?;
    git(&repo_path, &["config", "user.email", "test@example.com"])?;
    git(&repo_path, &["config", "user.name", "Test User"])?;
    commit(&repo_path, "README.md", "# Course", "Initial commit")?;

    git(&repo_path, &["checkout", "-q", "-b", "develop-01-Intro"])?;
    commit(&repo_path, "Intro.java", "// TODO", "01-Exercise-Basics")?;
    commit(&repo_path, "Intro.java", "// done", "01-Solution-Basics")?;
    commit(&repo_path, "notes.txt", "tidy", "cleanup")?;

    git(&repo_path, &["checkout", "-q", "student"])?;
    git(&repo_path, &["checkout", "-q", "-b", "develop-02-Lists"])?;
    commit(&repo_path, "Lists.java", "// TODO", "02-Exercise-Lists")?;
    commit(&repo_path, "Lists.java", "// done", "02-Solution-Lists")?;

    git(&repo_path, &["checkout", "-q", "student"])?;
    Ok((temp_dir, repo_path))
}

/// Run `stepper` in `repo_path` with the provided arguments.
pub fn run_stepper(repo_path: &Path, args: &[&str]) -> Result<Output> {
    Command::new(stepper_binary())
        .current_dir(repo_path)
        .arg("--no-color")
        .args(args)
        .output()
        .with_context(|| format!("failed to run stepper {}", args.join(" ")))
}

/// Fail with the captured streams when `output` is not a success.
pub fn assert_success(output: &Output, what: &str) {
    if !output.status.success() {
        eprintln!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        eprintln!("stderr: {}", String::from_utf8_lossy(&output.stderr));
        panic!("{what} failed");
    }
}
