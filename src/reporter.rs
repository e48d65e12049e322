//! Output sinks for signing runs
//!
//! Core functions never print directly. They receive a [`Reporter`] and send
//! every status line, warning and rendered command line through it, so two
//! runs in the same process never share output state.
//!
//! ERROR HANDLING STRATEGY FOR DECORATIVE I/O:
//! All termcolor operations in [`TerminalReporter`] use `let _ =` to
//! deliberately ignore errors. Colored output is decorative. If stderr/stdout
//! is unavailable (broken pipe, no TTY, etc.), signing continues without it.

use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Severity of a reported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    /// A rendered codesign command line
    Command,
}

/// Sink for everything a signing run wants to tell the user.
pub trait Reporter {
    fn report(&mut self, level: Level, message: &str);

    fn info(&mut self, message: &str) {
        self.report(Level::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.report(Level::Success, message);
    }

    fn warn(&mut self, message: &str) {
        self.report(Level::Warn, message);
    }

    fn error(&mut self, message: &str) {
        self.report(Level::Error, message);
    }

    fn command(&mut self, line: &str) {
        self.report(Level::Command, line);
    }
}

/// Colored terminal output.
///
/// Warnings and errors go to stderr, everything else to stdout. Command lines
/// are printed bare so they can be copied into a shell.
pub struct TerminalReporter {
    stdout: BufferWriter,
    stderr: BufferWriter,
}

impl TerminalReporter {
    #[must_use]
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: BufferWriter::stdout(choice),
            stderr: BufferWriter::stderr(choice),
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}

impl Reporter for TerminalReporter {
    fn report(&mut self, level: Level, message: &str) {
        let (writer, marker) = match level {
            Level::Info | Level::Command => (&self.stdout, None),
            Level::Success => (&self.stdout, Some((Color::Green, "✓ "))),
            Level::Warn => (&self.stderr, Some((Color::Yellow, "⚠️  "))),
            Level::Error => (&self.stderr, Some((Color::Red, "❌ "))),
        };

        let mut buffer = writer.buffer();
        write_marked(&mut buffer, marker, message);
        let _ = writer.print(&buffer);
    }
}

fn write_marked(buffer: &mut Buffer, marker: Option<(Color, &str)>, message: &str) {
    if let Some((color, prefix)) = marker {
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = write!(buffer, "{prefix}");
        let _ = buffer.reset();
    }
    let _ = writeln!(buffer, "{message}");
}

/// Records every line in memory. Used by tests and by callers that want to
/// inspect a run after the fact.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    lines: Vec<(Level, String)>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> &[(Level, String)] {
        &self.lines
    }

    /// Messages reported at `level`, in order.
    #[must_use]
    pub fn at(&self, level: Level) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    #[must_use]
    pub fn commands(&self) -> Vec<&str> {
        self.at(Level::Command)
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.at(Level::Warn)
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, level: Level, message: &str) {
        self.lines.push((level, message.to_string()));
    }
}
