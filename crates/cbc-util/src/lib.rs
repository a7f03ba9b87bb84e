//! Shared diagnostics and error taxonomy for the cbc compiler.
//!
//! Every fallible stage of the pipeline (lexer, parser/emitter, linker)
//! returns a `Result<_, CompileError>`. There is no diagnostic
//! accumulation: the first error anywhere aborts the whole compilation,
//! matching the "no partial output" rule the driver relies on.

use std::fmt;

/// A 1-based source line number, or `None` when the error has no single
/// originating line (link errors surface after line information has
/// already been folded into bytecode offsets).
pub type Line = Option<u32>;

/// Severity of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
        }
    }
}

/// The presentation-layer view of a [`CompileError`]: what the driver
/// prints to stderr.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub line: Line,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: {} (line {})", self.level, self.message, line),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

/// The error taxonomy described by the error-handling design: every
/// failure the compiler can produce is one of these four kinds.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CompileError {
    #[error("{message}")]
    Lex { message: String, line: Option<u32> },

    #[error("{message}")]
    Parse { message: String, line: Option<u32> },

    #[error("{message}")]
    Semantic { message: String, line: Option<u32> },

    #[error("{message}")]
    Link { message: String },
}

impl CompileError {
    pub fn lex(message: impl Into<String>, line: u32) -> Self {
        CompileError::Lex { message: message.into(), line: Some(line) }
    }

    pub fn parse(message: impl Into<String>, line: u32) -> Self {
        CompileError::Parse { message: message.into(), line: Some(line) }
    }

    pub fn semantic(message: impl Into<String>, line: u32) -> Self {
        CompileError::Semantic { message: message.into(), line: Some(line) }
    }

    pub fn link(message: impl Into<String>) -> Self {
        CompileError::Link { message: message.into() }
    }

    /// The source line this error originated at, if any.
    pub fn line(&self) -> Line {
        match self {
            CompileError::Lex { line, .. }
            | CompileError::Parse { line, .. }
            | CompileError::Semantic { line, .. } => *line,
            CompileError::Link { .. } => None,
        }
    }

    /// Renders this error as a [`Diagnostic`] for presentation by a driver.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic { level: Level::Error, message: self.to_string(), line: self.line() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_includes_line_when_present() {
        let err = CompileError::parse("expected expression", 7);
        assert_eq!(err.to_diagnostic().to_string(), "error: expected expression (line 7)");
    }

    #[test]
    fn link_error_has_no_line() {
        let err = CompileError::link("unresolved symbol `nosuch`");
        assert_eq!(err.line(), None);
        assert_eq!(err.to_diagnostic().to_string(), "error: unresolved symbol `nosuch`");
    }
}
