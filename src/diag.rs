//! Structured parse diagnostics.
//!
//! The session collects [`Diagnostic`] values instead of writing to stderr
//! directly; callers (the CLI, tests) decide where they go. Severity is an
//! explicit tag rather than a choice of callback.

use serde::Serialize;
use std::fmt;

/// How bad it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Tolerated structural oddity; processing continues unchanged.
    Warning,
    /// Recoverable parse error; the in-progress expression is discarded.
    Error,
    /// Reported by the event source as unrecoverable. Logged only; ordinary
    /// errors already cover realistic malformed input.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// One formatted notification from the parse.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Fatal,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
