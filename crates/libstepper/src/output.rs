use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Mutex;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

/// Indentation level (in spaces) used for nested output sections.
const INDENT: usize = 4;

/// Errors produced by [`Output`] implementations when interacting with the user
/// or the terminal.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The requested operation is not supported by this output backend.
    #[error("{0}")]
    Unsupported(&'static str),

    /// The caller supplied invalid input (e.g. empty options for a selector).
    #[error("{0}")]
    InvalidInput(&'static str),

    /// A terminal/TTY related failure occurred.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Underlying I/O error while writing/reading to the terminal.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The user cancelled an interactive prompt.
    #[error("Selection cancelled")]
    Cancelled,
}

/// Convenience alias for output-related fallible operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Abstraction over how user-facing messages and prompts are produced.
///
/// Library operations report progress through this trait; the CLI picks the
/// implementation.
pub trait Output: Send + Sync {
    /// Print an informational message.
    fn message(&self, msg: &str) -> Result<()>;
    /// Print a success message.
    fn success(&self, msg: &str) -> Result<()>;
    /// Print a warning message.
    fn warn(&self, msg: &str) -> Result<()>;
    /// Print an error/failure message.
    fn fail(&self, msg: &str) -> Result<()>;
    /// Ask the user to confirm an action; returns `true` if confirmed.
    fn confirm(&self, prompt: &str) -> Result<bool>;
    /// Present a list of `options` and return the chosen index.
    fn select(&self, prompt: &str, options: Vec<String>) -> Result<usize>;
    /// Flush any buffered output.
    fn finish(&self) -> Result<()>;
    /// Create a nested output section that indents subsequent messages.
    fn section(&self, header: &str) -> Box<dyn Output>;
}

/// Output implementation that suppresses all messages and rejects interactive
/// prompts. Useful for non-interactive or test environments.
pub struct Quiet;

impl Output for Quiet {
    fn message(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn success(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn warn(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn fail(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Err(OutputError::Unsupported(
            "Cannot prompt for confirmation in quiet mode",
        ))
    }

    fn select(&self, _prompt: &str, _options: Vec<String>) -> Result<usize> {
        Err(OutputError::Unsupported(
            "Cannot prompt for selection in quiet mode",
        ))
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn section(&self, _header: &str) -> Box<dyn Output> {
        Box::new(Self)
    }
}

/// Output implementation that keeps warnings in memory so callers can inspect
/// them after an operation. Other messages are discarded.
#[derive(Default)]
pub struct Recorder {
    /// Warnings emitted so far, in order.
    warnings: Mutex<Vec<String>>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings emitted so far.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl Output for Recorder {
    fn message(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn success(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn warn(&self, msg: &str) -> Result<()> {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(msg.to_string());
        }
        Ok(())
    }

    fn fail(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Err(OutputError::Unsupported(
            "Cannot prompt for confirmation while recording",
        ))
    }

    fn select(&self, _prompt: &str, _options: Vec<String>) -> Result<usize> {
        Err(OutputError::Unsupported(
            "Cannot prompt for selection while recording",
        ))
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn section(&self, _header: &str) -> Box<dyn Output> {
        // Sections are not tracked; nested warnings are dropped.
        Box::new(Quiet)
    }
}

/// Color-capable terminal renderer for user messages and prompts.
pub struct Terminal {
    /// Color policy for stdout.
    color_choice: ColorChoice,
    /// Current indentation in spaces.
    indent: usize,
}

impl Terminal {
    /// Create a new terminal output.
    ///
    /// - `color`: when `true`, always render colored output; when `false`,
    ///   disable ANSI colors.
    pub fn new(color: bool) -> Self {
        let color_choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            color_choice,
            indent: 0,
        }
    }

    /// Write one indented line in `color`.
    fn write_colored(&self, msg: &str, color: Color) -> Result<()> {
        let mut stdout = StandardStream::stdout(self.color_choice);
        stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
        writeln!(stdout, "{}{msg}", " ".repeat(self.indent))?;
        stdout.reset()?;
        stdout.flush()?;
        Ok(())
    }

    /// Pick a distinct single-key shortcut for each option.
    fn generate_shortcuts(options: &[String]) -> Vec<char> {
        let mut shortcuts = Vec::new();
        let mut used_chars = HashSet::new();

        for option in options {
            let first_unique = option
                .chars()
                .filter(|ch| ch.is_alphabetic())
                .filter_map(|ch| ch.to_lowercase().next())
                .find(|ch| !used_chars.contains(ch));

            let shortcut = first_unique
                .or_else(|| {
                    (1..=9)
                        .filter_map(|i| char::from_digit(i, 10))
                        .find(|ch| !used_chars.contains(ch))
                })
                .unwrap_or('?');

            used_chars.insert(shortcut);
            shortcuts.push(shortcut);
        }

        shortcuts
    }

    /// Block until the user presses one of `shortcuts` or cancels.
    fn read_shortcut(shortcuts: &[char]) -> Result<usize> {
        loop {
            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read().map_err(|e| OutputError::Terminal(e.to_string()))?
            {
                if kind != KeyEventKind::Press {
                    continue;
                }
                match code {
                    KeyCode::Char(ch) if modifiers.contains(KeyModifiers::CONTROL) => {
                        if matches!(ch, 'c' | 'd') {
                            return Err(OutputError::Cancelled);
                        }
                    }
                    KeyCode::Char(ch) => {
                        let lower = ch.to_lowercase().next().unwrap_or(ch);
                        if let Some(index) = shortcuts.iter().position(|&s| s == lower) {
                            return Ok(index);
                        }
                    }
                    KeyCode::Esc => return Err(OutputError::Cancelled),
                    _ => {}
                }
            }
        }
    }
}

impl Output for Terminal {
    fn message(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Cyan)
    }

    fn success(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Green)
    }

    fn warn(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Rgb(255, 165, 0)) // Orange
    }

    fn fail(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Red)
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        let options = vec!["Yes".to_string(), "No".to_string()];
        let selection = self.select(prompt, options)?;
        Ok(selection == 0)
    }

    fn select(&self, prompt: &str, options: Vec<String>) -> Result<usize> {
        if options.is_empty() {
            return Err(OutputError::InvalidInput(
                "No options provided for selection",
            ));
        }

        let shortcuts = Self::generate_shortcuts(&options);
        let pad = " ".repeat(self.indent);

        println!("{pad}{prompt}");
        for (option, shortcut) in options.iter().zip(shortcuts.iter()) {
            println!("{pad}  [{shortcut}] {option}");
        }
        print!("{pad} > ");
        io::stdout().flush()?;

        terminal::enable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;
        let result = Self::read_shortcut(&shortcuts);
        // Always restore terminal mode
        terminal::disable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;

        match result {
            Ok(index) => {
                println!("{}", shortcuts[index]);
                Ok(index)
            }
            Err(e) => {
                println!();
                Err(e)
            }
        }
    }

    fn finish(&self) -> Result<()> {
        io::stdout().flush()?;
        Ok(())
    }

    fn section(&self, header: &str) -> Box<dyn Output> {
        #[allow(clippy::let_underscore_must_use)]
        let _ = self.message(header);

        Box::new(Self {
            color_choice: self.color_choice,
            indent: self.indent + INDENT,
        })
    }
}
