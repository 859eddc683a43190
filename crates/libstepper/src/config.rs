use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StepperError};

/// Settings for a course repository, read from `stepper.toml`.
///
/// Every field has a default, so an absent file or an empty one is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Substring identifying development branches.
    pub develop_marker: String,
    /// Long-lived branch that receives the flattened snapshots.
    pub published_branch: String,
    /// File and directory names skipped at every depth when copying snapshots.
    pub ignore: Vec<String>,
    /// Repository URL used for the zip and compare links appended to READMEs.
    pub archive_repository: String,
    /// Repository URL used for folder and diff links in generated documents.
    pub docs_repository: String,
    /// Link to the lesson introducing the code flow, used in download documents.
    pub refresher_link: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            develop_marker: "develop-".to_string(),
            published_branch: "student".to_string(),
            ignore: vec![".git".to_string(), ".DS_Store".to_string()],
            archive_repository: "https://github.com/udacity/ud843-QuakeReport".to_string(),
            docs_repository: "https://github.com/udacity/ud851-Exercises".to_string(),
            refresher_link: "https://classroom.udacity.com/courses/ud851/lessons/\
                             93affc67-3f0b-4f9b-b3a4-a7a26f241a86/concepts/\
                             115d08bb-f114-46fa-b693-5c6ce1445c07"
                .to_string(),
        }
    }
}

impl Config {
    /// Name of the configuration file looked up at the repository root.
    pub const FILE_NAME: &'static str = "stepper.toml";

    /// Read and parse the configuration at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| StepperError::ConfigError {
            path: path.to_path_buf(),
            message: format!("failed to read: {e}"),
        })?;
        Self::parse(&contents, path)
    }

    /// Parse configuration text; `path` is only used for error messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| StepperError::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Load `explicit` if given, else `stepper.toml` under `repo_root` if it
    /// exists, else the defaults.
    pub fn load(explicit: Option<&Path>, repo_root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate: PathBuf = repo_root.join(Self::FILE_NAME);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings that would make every branch or no branch match.
    fn validate(&self, path: &Path) -> Result<()> {
        if self.develop_marker.is_empty() {
            return Err(StepperError::ConfigError {
                path: path.to_path_buf(),
                message: "develop_marker must not be empty".to_string(),
            });
        }
        if self.published_branch.is_empty() {
            return Err(StepperError::ConfigError {
                path: path.to_path_buf(),
                message: "published_branch must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Whether `branch` is a development branch.
    pub fn is_development_branch(&self, branch: &str) -> bool {
        branch.contains(&self.develop_marker)
    }

    /// Web link to a folder on the published branch.
    pub fn folder_link(&self, folder: &str) -> String {
        format!(
            "{}/tree/{}/{folder}",
            self.docs_repository.trim_end_matches('/'),
            self.published_branch
        )
    }

    /// Web link comparing two refs in the documentation repository.
    pub fn compare_link(&self, before: &str, after: &str) -> String {
        format!(
            "{}/compare/{before}...{after}",
            self.docs_repository.trim_end_matches('/')
        )
    }
}
