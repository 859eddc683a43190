use std::{io, path::PathBuf, result::Result as StdResult};
use thiserror::Error;

/// Custom Result type for stepper operations.
pub type Result<T> = StdResult<T, StepperError>;

/// Stepper-specific error types
#[derive(Error, Debug)]
pub enum StepperError {
    /// A checkpoint identifier does not follow the `number-kind-name` convention.
    #[error(
        "Naming convention violation on branch '{branch}' at commit {commit}: \
         '{identifier}' does not split into number-kind-name"
    )]
    NamingConvention {
        /// Development branch being processed.
        branch: String,
        /// Commit whose message produced the identifier.
        commit: String,
        /// The offending checkpoint identifier.
        identifier: String,
    },

    /// A checkpoint identifier cannot be used as a git branch name.
    #[error(
        "Invalid checkpoint name on branch '{branch}' at commit {commit}: \
         '{identifier}' is not a valid git branch name"
    )]
    InvalidReference {
        /// Development branch being processed.
        branch: String,
        /// Commit whose message produced the identifier.
        commit: String,
        /// The offending checkpoint identifier.
        identifier: String,
    },

    /// The repository could not be returned to its original branch or stash state.
    #[error("Failed to restore repository state: {0}")]
    Restore(String),

    /// The operation failed and restoring the repository afterwards failed too.
    #[error("{failure}; additionally failed to restore repository state: {restore}")]
    RestoreAfterFailure {
        /// The error raised by the protected operation.
        failure: Box<StepperError>,
        /// The restoration error.
        restore: Box<StepperError>,
    },

    /// The operation was cancelled by the user.
    #[error("Aborted by user")]
    UserAborted,

    /// A contextual precondition failed (e.g. not inside a Git repo).
    #[error("Context error: {0}")]
    ContextError(String),

    /// A high-level operation failed.
    #[error("Operation failed: {0}")]
    OperationError(String),

    /// A git command failed.
    #[error("Git error: {0}")]
    GitError(String),

    /// The configuration file could not be read or parsed.
    #[error("Config error in {}: {message}", path.display())]
    ConfigError {
        /// Path of the configuration file.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// Another stepper run holds the repository lock.
    #[error("Repository is locked by another stepper run: {}", path.display())]
    Locked {
        /// Path of the lock file.
        path: PathBuf,
    },

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl StepperError {
    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UserAborted => 130,
            Self::Locked { .. } => 2,
            Self::NamingConvention { .. } | Self::InvalidReference { .. } => 3,
            Self::Restore(_) | Self::RestoreAfterFailure { .. } => 4,
            Self::GitError(_) => 4,
            _ => 1,
        }
    }
}

/// Map git errors into a `StepperError::GitError`.
pub fn git_error(error: &anyhow::Error) -> StepperError {
    StepperError::GitError(format!("{error:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(StepperError::UserAborted.exit_code(), 130);
        assert_eq!(
            StepperError::NamingConvention {
                branch: "develop-01-Intro".to_string(),
                commit: "abc".to_string(),
                identifier: "BadName".to_string(),
            }
            .exit_code(),
            3
        );
        assert_eq!(
            StepperError::InvalidReference {
                branch: "develop-01-Intro".to_string(),
                commit: "abc".to_string(),
                identifier: "01-Exercise-Basics.lock".to_string(),
            }
            .exit_code(),
            3
        );
        assert_eq!(StepperError::Restore("x".to_string()).exit_code(), 4);
        assert_eq!(StepperError::OperationError("x".to_string()).exit_code(), 1);
    }

    #[test]
    fn restore_after_failure_mentions_both() {
        let err = StepperError::RestoreAfterFailure {
            failure: Box::new(StepperError::OperationError("copy failed".to_string())),
            restore: Box::new(StepperError::Restore("stash pop failed".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("copy failed"), "{msg}");
        assert!(msg.contains("stash pop failed"), "{msg}");
        assert_eq!(err.exit_code(), 4);
    }
}
