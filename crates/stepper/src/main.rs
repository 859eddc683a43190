#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for flattening course checkpoints via the libstepper crate.

use std::{
    env,
    io::{self, IsTerminal, Write},
    path::PathBuf,
    process,
    result::Result as StdResult,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use libstepper::{
    BranchSelection, Classification, FlattenOptions, FlattenReport, Output, OutputError, Quiet,
    SolutionStyle, Stepper, StepperError, Terminal, TextOptions,
};

/// Default directory for the `text` command.
const DEFAULT_TEXT_DIR: &str = "output";

/// Keyword selecting every development branch.
const ALL_BRANCHES: &str = "all";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
/// Top-level CLI options for stepper.
struct Cli {
    /// Override the repository directory (defaults to current git project)
    #[arg(long, global = true, value_name = "DIR")]
    repo_dir: Option<PathBuf>,

    /// Configuration file (defaults to stepper.toml at the repository root)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable colored output
    #[arg(long, global = true)]
    color: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// Suppress all output
    #[arg(long, global = true)]
    quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    no_prompt: bool,

    #[command(subcommand)]
    /// The primary command to execute.
    command: Commands,
}

#[derive(Subcommand)]
/// CLI subcommands supported by stepper.
enum Commands {
    /// Copy every exercise and solution checkpoint into its own folder
    Flatten {
        /// Directory receiving the checkpoint folders
        #[arg(long, value_name = "DIR")]
        output: PathBuf,

        /// Published branch the folders are committed to
        #[arg(long, value_name = "NAME")]
        student: Option<String>,

        /// Development branches to flatten ("all" or omitted for every one)
        #[arg(long, value_name = "BRANCH", num_args = 1..)]
        develop: Vec<String>,

        /// Delete local branches other than the published and development ones first
        #[arg(long)]
        remove_branches: bool,

        /// Append download and diff links to each checkpoint's README
        #[arg(long)]
        links: bool,

        /// Create the staging area under DIR instead of the system temp directory
        #[arg(long, value_name = "DIR")]
        staging_dir: Option<PathBuf>,
    },

    /// Write download and exercise/solution documents for every development branch
    Text {
        /// Directory receiving one folder of documents per branch
        #[arg(long, value_name = "DIR", default_value = DEFAULT_TEXT_DIR)]
        output: PathBuf,

        /// Use the long-form solution template
        #[arg(long)]
        sunshine: bool,
    },

    /// Show the checkpoints found on each development branch
    List {
        /// Development branches to inspect ("all" or omitted for every one)
        #[arg(long, value_name = "BRANCH", num_args = 1..)]
        develop: Vec<String>,
    },
}

/// Interpret `--develop` values.
fn branch_selection(develop: Vec<String>) -> BranchSelection {
    if develop.is_empty() || develop.iter().any(|b| b == ALL_BRANCHES) {
        BranchSelection::All
    } else {
        BranchSelection::Named(develop)
    }
}

/// Convert output-layer failures into domain errors.
fn map_output_error(err: OutputError) -> StepperError {
    match err {
        OutputError::Cancelled => StepperError::UserAborted,
        other => StepperError::OperationError(format!("Output operation failed: {other}")),
    }
}

/// Emit an output result, mapping errors into `StepperError`.
fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(map_output_error)?;
    Ok(())
}

/// Prompt for confirmation, mapping cancellation to `UserAborted`.
fn prompt_confirm(output: &dyn Output, prompt: &str) -> Result<bool> {
    match output.confirm(prompt) {
        Ok(value) => Ok(value),
        Err(OutputError::Cancelled) => Err(StepperError::UserAborted.into()),
        Err(err) => {
            Err(StepperError::OperationError(format!("Output operation failed: {err}")).into())
        }
    }
}

/// Run the `stepper flatten` command logic.
fn flatten_command(
    stepper: &Stepper,
    output: &dyn Output,
    options: FlattenOptions,
    no_prompt: bool,
) -> Result<()> {
    if options.remove_branches && !no_prompt {
        let published = options
            .published_branch
            .as_deref()
            .unwrap_or(&stepper.config().published_branch);
        let develop = stepper.development_branches(&options.develop)?;
        let stale = stepper.stale_branches(published, &develop)?;
        if !stale.is_empty() {
            emit(output.warn("The following local branches will be deleted:"))?;
            let section = output.section("branches");
            for branch in &stale {
                emit(section.message(branch))?;
            }
            if !prompt_confirm(output, "Delete these branches?")? {
                return Err(StepperError::UserAborted.into());
            }
        }
    }

    let report = stepper.flatten(&options, output)?;
    report_flatten(output, &options, &report)
}

/// Summarize a finished flatten run.
fn report_flatten(
    output: &dyn Output,
    options: &FlattenOptions,
    report: &FlattenReport,
) -> Result<()> {
    if report.checkpoints.is_empty() {
        emit(output.warn("No checkpoints found"))?;
        return Ok(());
    }

    emit(output.success(&format!(
        "Flattened {} checkpoints from {} branches into {}",
        report.checkpoints.len(),
        report.branches.len(),
        options.output_dir.display()
    )))?;
    emit(output.message(&format!(
        "Review and commit the {} branch, then publish with: git push --all --prune",
        report.published_branch
    )))?;
    Ok(())
}

/// Run the `stepper text` command logic.
fn text_command(stepper: &Stepper, output: &dyn Output, options: &TextOptions) -> Result<()> {
    let written = stepper.write_texts(options, output)?;
    if written.is_empty() {
        emit(output.warn("No development branches found"))?;
        return Ok(());
    }
    emit(output.success(&format!(
        "Wrote {} documents into {}",
        written.len(),
        options.output_dir.display()
    )))
}

/// Run the `stepper list` command logic.
fn list_command(
    stepper: &Stepper,
    output: &dyn Output,
    selection: &BranchSelection,
) -> Result<()> {
    let listings = stepper.list(selection)?;
    if listings.is_empty() {
        emit(output.message("No development branches found."))?;
        return Ok(());
    }

    for listing in listings {
        let section = output.section(&format!("{} ({})", listing.branch, listing.folder));
        if listing.checkpoints.is_empty() {
            emit(section.message("no checkpoints"))?;
            continue;
        }
        for checkpoint in &listing.checkpoints {
            if let Some(identifier) = checkpoint.identifier() {
                let line = format!("{:<8} {identifier}", checkpoint.kind());
                match checkpoint {
                    Classification::Solution(_) => emit(section.success(&line))?,
                    _ => emit(section.message(&line))?,
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine color output preference early for error handling
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    let output: Arc<dyn Output> = if cli.quiet {
        Arc::new(Quiet)
    } else {
        Arc::new(Terminal::new(color))
    };

    if let Err(e) = run(cli, &output) {
        // Reset any existing colors only if color was enabled and stdout is a TTY
        if color && io::stdout().is_terminal() {
            print!("\x1b[0m");
            if let Err(flush_err) = io::stdout().flush() {
                eprintln!("Failed to flush stdout while resetting colors: {flush_err}");
            }
        }

        let exit_code = match e.downcast_ref::<StepperError>() {
            Some(err @ StepperError::UserAborted) => {
                if let Err(finish_err) = output.finish() {
                    eprintln!("Failed to flush output handler: {finish_err:#}");
                }
                err.exit_code()
            }
            Some(err) => {
                if let Err(display_err) = output.fail(&format!("{e:#}")) {
                    eprintln!("Failed to report error via output handler: {display_err:#}");
                }
                if let Err(finish_err) = output.finish() {
                    eprintln!("Failed to flush output handler: {finish_err:#}");
                }
                err.exit_code()
            }
            None => {
                if let Err(display_err) = output.fail(&format!("{e:#}")) {
                    eprintln!("Failed to report error via output handler: {display_err:#}");
                }
                if let Err(finish_err) = output.finish() {
                    eprintln!("Failed to flush output handler: {finish_err:#}");
                }
                1
            }
        };

        process::exit(exit_code);
    }
    Ok(())
}

/// Execute the selected CLI command using the provided output implementation.
fn run(cli: Cli, output: &Arc<dyn Output>) -> Result<()> {
    let stepper = Stepper::new(cli.repo_dir.clone(), cli.config.as_deref())
        .context("Failed to initialize stepper")?;

    match cli.command {
        Commands::Flatten {
            output: output_dir,
            student,
            develop,
            remove_branches,
            links,
            staging_dir,
        } => {
            flatten_command(
                &stepper,
                output.as_ref(),
                FlattenOptions {
                    output_dir: absolute(output_dir)?,
                    published_branch: student,
                    develop: branch_selection(develop),
                    remove_branches,
                    links,
                    staging_parent: staging_dir.map(absolute).transpose()?,
                },
                cli.no_prompt,
            )?;
        }
        Commands::Text {
            output: output_dir,
            sunshine,
        } => {
            let style = if sunshine {
                SolutionStyle::Sunshine
            } else {
                SolutionStyle::Compact
            };
            text_command(
                &stepper,
                output.as_ref(),
                &TextOptions {
                    output_dir: absolute(output_dir)?,
                    style,
                },
            )?;
        }
        Commands::List { develop } => {
            list_command(&stepper, output.as_ref(), &branch_selection(develop))?;
        }
    }

    output.finish()?;
    Ok(())
}

/// Resolve `path` against the current directory.
///
/// Extraction checks out other commits, so relative output paths are fixed
/// before any work starts.
fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(path))
}
