//! Colored terminal output utilities.

use console::{Style, Term};

/// Terminal output formatter.
///
/// Diagnostics go to stderr; rendered documents and listings go to stdout.
pub(crate) struct Output {
    term: Term,
    stdout: Term,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            stdout: Term::stdout(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted line to stdout (cyan bold).
    pub(crate) fn heading(&self, msg: &str) -> std::io::Result<()> {
        self.stdout
            .write_line(&self.cyan_bold.apply_to(msg).to_string())
    }

    /// Print a plain line to stdout.
    pub(crate) fn line(&self, msg: &str) -> std::io::Result<()> {
        self.stdout.write_line(msg)
    }

    /// Write text to stdout as is.
    pub(crate) fn write(&self, text: &str) -> std::io::Result<()> {
        self.stdout.write_str(text)
    }
}
