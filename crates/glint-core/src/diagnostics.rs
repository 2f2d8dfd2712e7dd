//! Append-only sink for compiler messages.
//!
//! Passes push into a [`Diagnostics`] shared by the whole compilation; the
//! caller reads it once the pipeline has completed or aborted.

use std::fmt;

use crate::Span;
use crate::error::CompileError;

/// A single message produced while compiling a shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the message is.
    pub severity: Severity,
    /// The message text, without location.
    pub message: String,
    /// Where in the source the message applies.
    pub span: Span,
}

/// The severity level of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Makes the compilation fail; the pipeline aborts after the current stage.
    Error,
    /// Suspicious but valid code.
    Warning,
    /// Informational output.
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A collection of diagnostics for one compilation.
///
/// # Examples
///
/// ```
/// use glint_core::{Diagnostics, Span};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.warning(Span::new(3, 1, 4), "unused variable 'x'");
/// assert!(!diagnostics.has_errors());
///
/// diagnostics.error(Span::new(7, 5, 1), "illegal discard");
/// assert_eq!(diagnostics.error_count(), 1);
/// assert_eq!(
///     diagnostics.to_string(),
///     "3:1: warning: unused variable 'x'\n7:5: error: illegal discard\n"
/// );
/// ```
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic to the collection.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            span,
        });
    }

    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            span,
        });
    }

    pub fn info(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Info,
            message: message.into(),
            span,
        });
    }

    /// Records a compile error with its own severity and location.
    pub fn report(&mut self, error: CompileError) {
        tracing::debug!(%error, "compile error reported");
        self.push(Diagnostic {
            severity: error.severity(),
            message: error.message(),
            span: error.span(),
        });
    }

    /// Returns `true` if any error diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// All diagnostics in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    /// Formats as `line:col: severity: message`, or `severity: message` when
    /// the diagnostic has no source location.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_known() {
            write!(
                f,
                "{}: {}: {}",
                self.span,
                self.severity.as_str(),
                self.message
            )
        } else {
            write!(f, "{}: {}", self.severity.as_str(), self.message)
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}
