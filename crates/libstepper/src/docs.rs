//! Markdown documents describing a development branch's checkpoints.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::Config,
    error::Result,
    name::{self, CheckpointName, Classification},
};

/// Which template to use for solution entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolutionStyle {
    /// A single line with the solution folder and diff links.
    #[default]
    Compact,
    /// Placeholder narrative sections followed by the links ("sunshine" style).
    Sunshine,
}

/// README block appended to a checkpoint snapshot: zip downloads of the
/// exercise and its solution, and a compare link between them.
pub fn diff_link_block(checkpoint: &CheckpointName, archive_repository: &str) -> String {
    let repo = archive_repository.trim_end_matches('/');
    let CheckpointName { number, name, .. } = checkpoint;
    format!(
        "\n\nYou can download a zip of this exercise \
         [here]({repo}/archive/{number}-Exercise-{name}.zip), \
         and a zip of the solution [here]({repo}/archive/{number}-Solution-{name}.zip). \
         Also, you can find a visual summary of the solution \
         [here]({repo}/compare/{number}-Exercise-{name}...{number}-Solution-{name}).\n\n"
    )
}

/// Document context for one development branch.
#[derive(Debug, Clone)]
pub struct BranchDocs {
    /// Full branch name, e.g. `develop-T01-Favorite-Toys`.
    pub branch: String,
    /// Branch name with the development marker removed.
    pub folder: String,
    /// Web link to the folder on the published branch.
    pub folder_link: String,
    /// Human readable app name derived from the folder.
    pub app_name: String,
    /// Directory the documents are written into.
    pub directory: PathBuf,
}

impl BranchDocs {
    /// Build the context for `branch`, writing under `output_dir/<folder>`.
    pub fn new(branch: &str, config: &Config, output_dir: &Path) -> Self {
        let folder = name::folder_name(branch, &config.develop_marker);
        Self {
            branch: branch.to_string(),
            folder_link: config.folder_link(&folder),
            app_name: name::app_name(&folder),
            directory: output_dir.join(&folder),
            folder,
        }
    }

    /// File name of the download document.
    pub fn download_file_name(&self) -> String {
        format!("{}-DOWNLOAD.md", self.folder)
    }

    /// File name of the exercise/solution cross-reference document.
    pub fn cross_reference_file_name(&self) -> String {
        format!("{}-EXERCISES-SOLUTIONS.md", self.folder)
    }

    /// The download blurb for this branch.
    pub fn download_document(&self, config: &Config) -> String {
        let Self {
            folder,
            folder_link,
            app_name,
            ..
        } = self;
        let repo = config.docs_repository.trim_end_matches('/');
        let refresher = &config.refresher_link;
        format!(
            "\n# {app_name} Code\n\
             The code for this app can be found in the [{folder}]({folder_link}) folder \
             of the [Toy App Repository]({repo}).\n\n\
             If you need a refresher on how the code is organized, please refer to the \
             [concept where we introduced the code flow]({refresher}).\n\n\
             ## Explanation of {app_name}\n\
             TODO INSERT ANY EXPLANATION OF THE APP NEEDED\n"
        )
    }

    /// Exercise and solution entries for `classified` commits given oldest-first.
    ///
    /// Each exercise yields an exercise entry immediately followed by the entry
    /// for its derived solution. Solution commits themselves add nothing; the
    /// pairing comes from the exercise identifier.
    pub fn cross_reference_document(
        &self,
        classified: &[Classification],
        style: SolutionStyle,
        config: &Config,
    ) -> String {
        let mut doc = String::new();
        for exercise in classified.iter().filter_map(|c| match c {
            Classification::Exercise(id) => Some(id),
            _ => None,
        }) {
            let solution = name::solution_for(exercise);
            let diff_link = config.compare_link(exercise, &solution);

            doc.push_str("\n\n");
            doc.push_str(&self.exercise_entry(exercise));
            doc.push_str("\n\n");
            doc.push_str(&self.solution_entry(&solution, &diff_link, style));
        }
        doc
    }

    /// Markdown entry for one exercise.
    fn exercise_entry(&self, exercise: &str) -> String {
        let link = format!("{}/{exercise}", self.folder_link);
        format!("\n### Exercise Code\n**Exercise:** [{exercise}]({link})\n")
    }

    /// Markdown entry for one solution in the selected style.
    fn solution_entry(&self, solution: &str, diff_link: &str, style: SolutionStyle) -> String {
        let link = format!("{}/{solution}", self.folder_link);
        let line = format!("**Solution:** [[{solution}]({link})][[Diff]({diff_link})]");
        match style {
            SolutionStyle::Compact => format!("\n{line}\n"),
            SolutionStyle::Sunshine => format!(
                "\n# <Name of Node> Solution\n\n\
                 <Description of the solution state, what the app can now do, etc>\n\n\
                 ## Notes on Solution Code\n\n\
                 <Description of any interesting things you want to point out, gotchas, etc>\n\n\
                 ### Solution Code\n{line}\n"
            ),
        }
    }

    /// Create the branch directory and write both documents, returning their paths.
    pub fn write(
        &self,
        classified: &[Classification],
        style: SolutionStyle,
        config: &Config,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.directory)?;

        let download = self.directory.join(self.download_file_name());
        fs::write(&download, self.download_document(config))?;

        let cross_reference = self.directory.join(self.cross_reference_file_name());
        fs::write(
            &cross_reference,
            self.cross_reference_document(classified, style, config),
        )?;

        Ok(vec![download, cross_reference])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::classify;
    use tempfile::TempDir;

    fn intro_history() -> Vec<Classification> {
        ["Initial", "01-Exercise-Basics", "01-Solution-Basics", "cleanup"]
            .into_iter()
            .map(classify)
            .collect()
    }

    #[test]
    fn branch_docs_names() {
        let config = Config::default();
        let docs = BranchDocs::new("develop-T01-Favorite-Toys", &config, Path::new("out"));
        assert_eq!(docs.folder, "T01-Favorite-Toys");
        assert_eq!(docs.app_name, "Favorite Toys");
        assert_eq!(
            docs.folder_link,
            "https://github.com/udacity/ud851-Exercises/tree/student/T01-Favorite-Toys"
        );
        assert_eq!(docs.directory, Path::new("out").join("T01-Favorite-Toys"));
        assert_eq!(docs.download_file_name(), "T01-Favorite-Toys-DOWNLOAD.md");
        assert_eq!(
            docs.cross_reference_file_name(),
            "T01-Favorite-Toys-EXERCISES-SOLUTIONS.md"
        );
    }

    #[test]
    fn download_document_names_app_and_folder() {
        let config = Config::default();
        let docs = BranchDocs::new("develop-01-Intro", &config, Path::new("out"));
        let doc = docs.download_document(&config);
        assert!(doc.contains("# Intro Code"));
        assert!(doc.contains(&format!("[01-Intro]({})", docs.folder_link)));
        assert!(doc.contains("## Explanation of Intro"));
        assert!(doc.contains(&config.refresher_link));
    }

    #[test]
    fn cross_reference_pairs_exercise_with_solution() {
        let config = Config::default();
        let docs = BranchDocs::new("develop-01-Intro", &config, Path::new("out"));
        let doc = docs.cross_reference_document(&intro_history(), SolutionStyle::Compact, &config);

        assert_eq!(doc.matches("**Exercise:**").count(), 1);
        assert_eq!(doc.matches("**Solution:**").count(), 1);

        let exercise_at = doc.find("[01-Exercise-Basics]").unwrap();
        let solution_at = doc.find("[[01-Solution-Basics]").unwrap();
        assert!(exercise_at < solution_at);
        assert!(doc.contains(
            "https://github.com/udacity/ud851-Exercises/compare/\
             01-Exercise-Basics...01-Solution-Basics"
        ));
        assert!(!doc.contains("<Name of Node>"));
    }

    #[test]
    fn cross_reference_keeps_history_order() {
        let config = Config::default();
        let docs = BranchDocs::new("develop-01-Intro", &config, Path::new("out"));
        let history: Vec<_> = [
            "01-Exercise-First",
            "01-Solution-First",
            "02-Exercise-Second",
            "02-Solution-Second",
        ]
        .into_iter()
        .map(classify)
        .collect();
        let doc = docs.cross_reference_document(&history, SolutionStyle::Compact, &config);

        let positions: Vec<_> = [
            "[01-Exercise-First]",
            "[[01-Solution-First]",
            "[02-Exercise-Second]",
            "[[02-Solution-Second]",
        ]
        .iter()
        .map(|needle| doc.find(needle).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{doc}");
    }

    #[test]
    fn sunshine_style_adds_narrative_sections() {
        let config = Config::default();
        let docs = BranchDocs::new("develop-01-Intro", &config, Path::new("out"));
        let doc = docs.cross_reference_document(&intro_history(), SolutionStyle::Sunshine, &config);
        assert!(doc.contains("# <Name of Node> Solution"));
        assert!(doc.contains("## Notes on Solution Code"));
        assert!(doc.contains("### Solution Code\n**Solution:** [[01-Solution-Basics]"));
    }

    #[test]
    fn no_checkpoints_yields_empty_document() {
        let config = Config::default();
        let docs = BranchDocs::new("develop-01-Intro", &config, Path::new("out"));
        let history = vec![classify("Initial"), classify("")];
        assert!(
            docs.cross_reference_document(&history, SolutionStyle::Compact, &config)
                .is_empty()
        );
    }

    #[test]
    fn diff_link_block_uses_number_and_name() {
        let parts = CheckpointName::parse("01-Exercise-Basics").unwrap();
        let block = diff_link_block(&parts, "https://github.com/udacity/ud843-QuakeReport/");
        assert!(block.contains(
            "(https://github.com/udacity/ud843-QuakeReport/archive/01-Exercise-Basics.zip)"
        ));
        assert!(block.contains(
            "(https://github.com/udacity/ud843-QuakeReport/archive/01-Solution-Basics.zip)"
        ));
        assert!(block.contains(
            "(https://github.com/udacity/ud843-QuakeReport/compare/\
             01-Exercise-Basics...01-Solution-Basics)"
        ));
    }

    #[test]
    fn write_creates_both_files() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = Config::default();
        let docs = BranchDocs::new("develop-01-Intro", &config, tmp.path());

        let written = docs.write(&intro_history(), SolutionStyle::Compact, &config)?;
        assert_eq!(
            written,
            vec![
                tmp.path().join("01-Intro/01-Intro-DOWNLOAD.md"),
                tmp.path().join("01-Intro/01-Intro-EXERCISES-SOLUTIONS.md"),
            ]
        );
        let text = fs::read_to_string(&written[1])?;
        assert!(text.contains("01-Exercise-Basics"));
        Ok(())
    }
}
