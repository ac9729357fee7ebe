//! Diagnostics and error types.
//!
//! Grammar problems are accumulated rather than returned one at a time so
//! that a single run surfaces as many of them as possible. The error count
//! is what callers consult to decide the exit status.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

/// A sink for human-readable grammar diagnostics with file/line positions.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    filename: String,
    entries: Vec<Diagnostic>,
    errors: usize,
}

impl Diagnostics {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            entries: Vec::new(),
            errors: 0,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn error(&mut self, line: u32, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            line,
            message: message.into(),
        });
        self.errors += 1;
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}:{}: {}", self.filename, entry.line, entry.message)?;
        }
        Ok(())
    }
}

/// Structural problems detected while finalizing a grammar definition.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("empty grammar: no rules were defined")]
    Empty,

    #[error("grammar contains {} error(s)\n{}", .0.error_count(), .0)]
    Invalid(Diagnostics),
}
