//! Positioned diagnostics.
//!
//! Both the parser and the binder report problems into a [`DiagnosticLog`],
//! which converts byte spans to 1-based line/column pairs as they are
//! recorded. Columns count characters, not bytes, so editors can jump straight
//! to the reported position.

use crate::Span;
use serde::Serialize;
use std::fmt;

/// A single parse or semantic error with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
    /// Human-readable description of the problem.
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic { line, column, message: message.into() }
    }

    /// Byte offset of this diagnostic's position within `source`.
    ///
    /// Returns `None` when the position does not exist in `source` (for
    /// example after the text was edited).
    pub fn byte_offset(&self, source: &str) -> Option<usize> {
        let start = line_start_offset(source, self.line.checked_sub(1)?)?;
        let column = self.column.checked_sub(1)?;
        let line = source[start..].split('\n').next().unwrap_or("");
        match line.char_indices().nth(column) {
            Some((idx, _)) => Some(start + idx),
            None if line.chars().count() == column => Some(start + line.len()),
            None => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.line, self.column, self.message)
    }
}

/// Byte offset at which the 0-based `line` starts in `text`.
pub fn line_start_offset(text: &str, line: usize) -> Option<usize> {
    if line == 0 {
        return Some(0);
    }
    text.match_indices('\n').nth(line - 1).map(|(idx, _)| idx + 1)
}

// --- Log --------------------------------------------------------------------

/// Ordered diagnostic sink for one run over one source text.
#[derive(Debug)]
pub(crate) struct DiagnosticLog<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
    entries: Vec<Diagnostic>,
}

impl<'src> DiagnosticLog<'src> {
    pub fn new(source: &'src str) -> Self {
        let line_starts = std::iter::once(0).chain(source.match_indices('\n').map(|(idx, _)| idx + 1)).collect();
        DiagnosticLog { source, line_starts, entries: Vec::new() }
    }

    /// Record `message` at the start of `span`.
    pub fn report(&mut self, span: Span, message: impl Into<String>) {
        let (line, column) = self.position(span.start);
        self.entries.push(Diagnostic { line, column, message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// 1-based (line, column) of a byte offset.
    fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line_idx = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let line_start = self.line_starts[line_idx];
        let column = self.source.get(line_start..offset).map_or(offset - line_start, |s| s.chars().count());
        (line_idx + 1, column + 1)
    }
}
