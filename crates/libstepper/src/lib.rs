#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Core library for flattening course development branches into checkpoint folders.
//!
//! A course repository keeps each lesson on a `develop-` branch whose commits
//! are marked as exercises or solutions. This crate walks those branches,
//! snapshots every checkpoint into its own folder, reconciles the folders into
//! an output directory and writes the accompanying markdown documents. The CLI
//! binary in `crates/stepper` builds on top of this library.

/// Course settings loaded from `stepper.toml`.
mod config;
/// Download and cross-reference markdown documents.
mod docs;
/// Error type and exit codes.
mod error;
/// Checkpoint extraction from one development branch.
mod extract;
/// Helper routines for interacting with Git repositories.
mod git;
/// Stash and branch restoration around mutating workflows.
mod guard;
/// Exclusive run lock inside the git directory.
mod lock;
/// Commit message sanitizing and checkpoint classification.
mod name;
/// Output channel abstractions and implementations.
mod output;
/// Replacing output entries with staged snapshots.
mod reconcile;
/// Filtered tree copies and entry removal.
mod snapshot;
/// High-level orchestration of the flatten, text and list workflows.
mod stepper;

/// Re-export of the configuration type.
pub use config::Config;
/// Re-exports for document generation.
pub use docs::{BranchDocs, SolutionStyle, diff_link_block};
/// Re-export of the error type.
pub use error::{Result, StepperError};
/// Re-exports for checkpoint extraction.
pub use extract::{Checkpoint, CheckpointExtractor, ExtractOptions, Layout};
/// Re-exports for repository access.
pub use git::{HistoryOrder, Repository};
/// Re-exports for state restoration.
pub use guard::{RepoGuard, guarded};
/// Re-export of the run lock.
pub use lock::{LOCK_FILE_NAME, RunLock};
/// Re-exports for checkpoint naming.
pub use name::{CheckpointName, Classification, classify, classify_message, sanitize};
/// Re-exports for output abstraction and concrete implementations.
pub use output::{Output, OutputError, Quiet, Recorder, Terminal};
/// Re-export of output reconciliation.
pub use reconcile::reconcile;
/// Re-export of the main manager type and its options.
pub use stepper::{
    BranchListing, BranchSelection, FlattenOptions, FlattenReport, Stepper, TextOptions,
};
