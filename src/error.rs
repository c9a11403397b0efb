//! Error types and result aliases for stencilfmt.
//!
//! This module defines the error handling infrastructure:
//! - [`Result<T>`]: Type alias for `anyhow::Result<T>` used by file and CLI level code
//! - [`SyntaxError`]: A malformed template, with the position it was detected at
//! - [`FormatError`]: Every way a single formatting run can fail
//!
//! A run never produces partial output: it either returns the whole formatted
//! document or one of these errors.

use std::fmt::Write as _;

use anyhow::Result as AnyhowResult;
use thiserror::Error;

use crate::parser::ast::Position;

pub type Result<T> = AnyhowResult<T>;

/// A template that the logic-tag parser could not make sense of.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {}, column {}", .position.line, .position.column + 1)]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
    pub hint: Option<String>,
}

impl SyntaxError {
    #[must_use]
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render the error with the offending source line and a caret under the column.
    #[must_use]
    pub fn format_with_source(&self, source: &str, filename: &str) -> String {
        let line_no = self.position.line;
        let col = self.position.column;
        let mut out = format!("error: {}\n --> {filename}:{line_no}:{}\n", self.message, col + 1);

        if let Some(line) = source.lines().nth(line_no.saturating_sub(1)) {
            let gutter = line_no.to_string().len();
            let pad = " ".repeat(gutter);
            let _ = writeln!(out, "{pad} |");
            let _ = writeln!(out, "{line_no} | {line}");
            let _ = writeln!(out, "{pad} | {}^", " ".repeat(col));
        }
        if let Some(hint) = &self.hint {
            let _ = writeln!(out, "  = hint: {hint}");
        }
        out
    }
}

/// Failure of a single formatting run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("unknown construct `{0}`")]
    UnknownConstruct(String),

    #[error("placeholder #{index} is missing from the formatted output")]
    PlaceholderMissing { index: usize },

    #[error("placeholder #{index} appears {count} times in the formatted output")]
    PlaceholderDuplicated { index: usize, count: usize },

    #[error("source already contains reserved `hbs:` markup at byte {offset}")]
    ReservedMarkup { offset: usize },

    #[error("malformed synthetic markup: {0}")]
    Markup(String),
}

impl FormatError {
    /// Render the error for display, expanding syntax errors against the source.
    #[must_use]
    pub fn render(&self, source: &str, filename: &str) -> String {
        match self {
            FormatError::Syntax(err) => err.format_with_source(source, filename),
            other => format!("error: {other}\n --> {filename}\n"),
        }
    }
}
