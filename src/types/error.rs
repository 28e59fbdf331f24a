//! Error types for Ashier

use std::fmt;

/// Main error type for Ashier operations that are not user configuration
/// errors (those are accumulated in an [`ErrorSink`] instead).
#[derive(Debug, thiserror::Error)]
pub enum AshierError {
    /// The configuration file could not be opened or read.
    #[error("cannot open configuration file: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration had one or more accumulated user errors.
    #[error("{0} configuration error(s) reported")]
    ConfigInvalid(usize),

    /// A PTY session could not be spawned.
    #[error("failed to spawn PTY session: {0}")]
    PtySpawn(String),

    /// CLI usage error (missing `--`, missing config path, etc).
    #[error("usage error: {0}")]
    Usage(String),
}

/// Result type alias for Ashier operations.
pub type Result<T> = std::result::Result<T, AshierError>;

/// Accumulates user-visible configuration errors keyed by source file/line.
///
/// The original implementation kept a single process-global error list
/// (`utils._error_messages`); here the sink is an explicit, owned value
/// threaded through parsing and compilation so each test run (and each
/// reload of a configuration) starts from a clean, independently
/// inspectable accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSink {
    messages: Vec<String>,
}

impl ErrorSink {
    /// Create a fresh, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fully-qualified error string.
    pub fn report(&mut self, message: impl Into<String>) {
        self.messages.push(format!("Error: {}", message.into()));
    }

    /// Record an error qualified by a source line's `file:lineno` header.
    pub fn report_at(&mut self, line: &crate::types::SourceLine, message: impl AsRef<str>) {
        self.report(line.with_header(message.as_ref()));
    }

    /// Whether any errors have been recorded.
    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the sink is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate over recorded messages in report order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// If the sink is non-empty, print the accumulated messages to stderr
    /// and return the [`AshierError::ConfigInvalid`] error carrying the
    /// count; callers turn this into an exit-252 process abort (see §7 of
    /// the design doc). Returns `Ok(())` when the sink is empty.
    pub fn fail_if_nonempty(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        for message in &self.messages {
            eprintln!("{message}");
        }
        eprintln!("Errors detected.  Exiting Ashier...");
        Err(AshierError::ConfigInvalid(self.messages.len()))
    }
}

impl fmt::Display for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_sink_has_no_errors() {
        let sink = ErrorSink::new();
        assert!(!sink.has_errors());
        assert!(sink.fail_if_nonempty().is_ok());
    }

    #[test]
    fn report_at_formats_header_and_message() {
        let mut sink = ErrorSink::new();
        let line = crate::types::SourceLine::new("script.ash", 3, "?\n");
        sink.report_at(&line, "empty marker directive");
        assert_eq!(
            sink.iter().collect::<Vec<_>>(),
            vec!["Error: script.ash:3  empty marker directive"]
        );
    }

    #[test]
    fn fail_if_nonempty_reports_count() {
        let mut sink = ErrorSink::new();
        sink.report("one");
        sink.report("two");
        let err = sink.fail_if_nonempty().unwrap_err();
        assert!(matches!(err, AshierError::ConfigInvalid(2)));
    }
}
