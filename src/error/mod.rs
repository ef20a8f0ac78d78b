//! Error types and diagnostics for markup parsing.
//!
//! This module provides structured error reporting with source location
//! tracking. Every diagnostic carries a line, a column, the offending lexeme,
//! and a human-readable message.
//!
//! Parsing distinguishes **warnings** (recorded, parsing continues, the
//! document's well-formedness flag is cleared) from **fatal errors** (parsing
//! aborts and a [`ParseError`] is returned to the caller).

use std::fmt;

/// Severity level for a parse diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A non-fatal issue that doesn't prevent parsing, but marks the
    /// document as not well-formed.
    Warning,
    /// An unrecoverable error — parsing must stop.
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Source location within a markup or query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
}

impl SourceLocation {
    /// Creates a location from a line and column pair.
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single diagnostic emitted during parsing.
///
/// Warnings are collected on the [`Document`](crate::tree::Document) while
/// parsing continues; the presence of any diagnostic clears the document's
/// well-formedness flag.
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable message.
    pub message: String,
    /// The offending lexeme or token value, if one was at hand.
    pub lexeme: String,
    /// Where in the source this was detected.
    pub location: SourceLocation,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lexeme.is_empty() {
            write!(
                f,
                "{}: {} at {}",
                self.severity, self.message, self.location
            )
        } else {
            write!(
                f,
                "{}: {} ('{}') at {}",
                self.severity, self.message, self.lexeme, self.location
            )
        }
    }
}

/// The error type returned when markup parsing fails.
///
/// Covers both tokenization failures (unterminated comment/string/CDATA,
/// unknown character) and structural failures (namespace constraint
/// violations, mismatched end tags, multiple root elements, unexpected EOF).
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// The offending lexeme or token value.
    pub lexeme: String,
    /// Where in the source the fatal error occurred.
    pub location: SourceLocation,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        lexeme: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            message: message.into(),
            lexeme: lexeme.into(),
            location,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lexeme.is_empty() {
            write!(f, "parse error at {}: {}", self.location, self.message)
        } else {
            write!(
                f,
                "parse error at {}: {} ('{}')",
                self.location, self.message, self.lexeme
            )
        }
    }
}

impl std::error::Error for ParseError {}
