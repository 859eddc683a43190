//! Commit message sanitizing and checkpoint classification.

/// Punctuation kept by [`sanitize`] in addition to alphanumerics.
const SAFE_CHARS: &[char] = &['-', '_', '.'];

/// Maximum length, in characters, of a sanitized identifier.
pub const MAX_NAME_LENGTH: usize = 100;

/// Token marking an exercise checkpoint.
pub const EXERCISE: &str = "Exercise";

/// Token marking a solution checkpoint.
pub const SOLUTION: &str = "Solution";

/// Reduce the first line of a commit message to a short, filesystem-safe identifier.
pub fn sanitize(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default();
    let safe: String = first_line
        .chars()
        .filter(|c| c.is_alphanumeric() || SAFE_CHARS.contains(c))
        .collect();
    safe.trim().chars().take(MAX_NAME_LENGTH).collect()
}

/// How a commit participates in the exercise/solution sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Scaffolding or any other commit that is not a checkpoint.
    NotCheckpoint,
    /// An exercise checkpoint with its identifier.
    Exercise(String),
    /// A solution checkpoint with its identifier.
    Solution(String),
}

impl Classification {
    /// The checkpoint identifier, if this is a checkpoint.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::NotCheckpoint => None,
            Self::Exercise(id) | Self::Solution(id) => Some(id),
        }
    }

    /// Short label for the checkpoint kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotCheckpoint => "commit",
            Self::Exercise(_) => "exercise",
            Self::Solution(_) => "solution",
        }
    }
}

/// Classify a sanitized identifier. Matching is a case-sensitive substring test.
pub fn classify(identifier: &str) -> Classification {
    if identifier.is_empty() {
        return Classification::NotCheckpoint;
    }
    if identifier.contains(EXERCISE) {
        Classification::Exercise(identifier.to_string())
    } else if identifier.contains(SOLUTION) {
        Classification::Solution(identifier.to_string())
    } else {
        Classification::NotCheckpoint
    }
}

/// Sanitize a commit message and classify the result.
pub fn classify_message(message: &str) -> Classification {
    classify(&sanitize(message))
}

/// The solution identifier paired with an exercise identifier.
pub fn solution_for(exercise: &str) -> String {
    exercise.replace(EXERCISE, SOLUTION)
}

/// A checkpoint identifier split into its `number-kind-name` parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointName {
    /// Leading ordinal, e.g. `01` or `T02.03`.
    pub number: String,
    /// `Exercise` or `Solution` (not validated).
    pub kind: String,
    /// Trailing descriptive name.
    pub name: String,
}

impl CheckpointName {
    /// Split an identifier on `-`, requiring exactly three parts.
    pub fn parse(identifier: &str) -> Option<Self> {
        let mut parts = identifier.split('-');
        let (Some(number), Some(kind), Some(name), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        Some(Self {
            number: number.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
        })
    }
}

/// Folder name for a development branch: the branch name without the marker.
pub fn folder_name(branch: &str, marker: &str) -> String {
    branch.replace(marker, "")
}

/// Human readable app name: the folder's words after the leading number.
pub fn app_name(folder: &str) -> String {
    folder.split('-').skip(1).collect::<Vec<_>>().join(" ")
}
