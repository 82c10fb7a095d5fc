//! Diagnostic reporting.
//!
//! Wire format:
//!
//! ```text
//! <FILENAME> LINE:COL error: 'MESSAGE'
//! <token text>
//! ^^^^^^^^^^^^
//! ```
//!
//! The echoed line and its caret underline are *not* a re-read of the
//! physical source line — they're whatever was in the tokenizer's scratch
//! buffer when the diagnostic was raised.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub filename: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    /// Snapshot of the tokenizer scratch buffer at the time the
    /// diagnostic was raised; echoed beneath the message with a caret
    /// underline of the same length.
    pub token_text: String,
}

impl Diagnostic {
    pub fn error(
        filename: impl Into<String>,
        line: u32,
        column: u32,
        token_text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            filename: filename.into(),
            line,
            column,
            token_text: token_text.into(),
            message: message.into(),
        }
    }

    pub fn warning(
        filename: impl Into<String>,
        line: u32,
        column: u32,
        token_text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            filename: filename.into(),
            line,
            column,
            token_text: token_text.into(),
            message: message.into(),
        }
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "<{}> {}:{} {}: '{}'",
            self.filename,
            self.line,
            self.column,
            self.severity.as_str(),
            self.message
        )?;
        writeln!(out, "{}", self.token_text)?;
        writeln!(out, "{}", "^".repeat(self.token_text.chars().count()))?;
        Ok(())
    }
}

/// Implemented by whatever is collecting diagnostics as the preprocessor
/// runs — a `Vec` during tests, stderr in the real binary.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);

    /// Whether any diagnostic of [`Severity::Error`] has been emitted so
    /// far. The driver consults this to decide whether to keep going
    /// after a non-fatal error (e.g. a redefinition warning never stops
    /// anything; a genuine error does).
    fn had_error(&self) -> bool;
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }

    fn had_error(&self) -> bool {
        self.iter().any(|d| d.severity == Severity::Error)
    }
}

/// Emits diagnostics straight to stderr and keeps a running tally so
/// callers can ask whether the run should be considered failed.
#[derive(Debug, Default)]
pub struct StderrDiagnostics {
    had_error: bool,
}

impl DiagnosticSink for StderrDiagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.had_error = true;
        }
        // Best-effort: a failure to write to stderr isn't itself something
        // we can usefully report.
        let _ = diagnostic.write_to(&mut io::stderr());
    }

    fn had_error(&self) -> bool {
        self.had_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_error_with_caret_underline() {
        let diagnostic = Diagnostic::error("foo.c", 3, 5, "bar", "undefined macro");
        let mut buf = Vec::new();
        diagnostic.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "<foo.c> 3:5 error: 'undefined macro'\nbar\n^^^\n"
        );
    }

    #[test]
    fn vec_sink_tracks_error_severity() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.emit(Diagnostic::warning("foo.c", 1, 1, "x", "redefinition"));
        assert!(!sink.had_error());
        sink.emit(Diagnostic::error("foo.c", 2, 1, "y", "bad token"));
        assert!(sink.had_error());
    }
}
