//! The external scanner interface.
//!
//! Some tokens cannot be described by regular expressions: indentation,
//! heredocs, nested comments. A language may supply an [`ExternalScanner`]
//! that the lexer consults before its own rules whenever one of the grammar's
//! external tokens is valid. Scanners are stateful; their state is snapshotted
//! into every token so incremental reparsing can restore it.

use std::fmt;
use std::sync::Arc;

/// A hand-written scanner for context-sensitive tokens.
pub trait ExternalScanner: Send {
    /// Attempts to recognize one external token at the cursor.
    ///
    /// `valid` is indexed like the grammar's external token list and says
    /// which externals the parser can accept here. Returns the index of the
    /// recognized token, or `None` to let the internal lexer run. A scanner
    /// must leave its state untouched when it returns `None`.
    fn scan(&mut self, cursor: &mut ScanCursor<'_>, valid: &[bool]) -> Option<usize>;

    /// Writes the scanner state into `buffer`.
    fn serialize(&self, buffer: &mut Vec<u8>);

    /// Restores state previously written by [`ExternalScanner::serialize`].
    /// An empty buffer means the initial state.
    fn deserialize(&mut self, buffer: &[u8]);
}

/// Constructs a fresh external scanner.
pub type ScannerFactory = fn() -> Box<dyn ExternalScanner>;

/// A serialized external scanner state, shared between tokens.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScannerState(Option<Arc<[u8]>>);

impl ScannerState {
    /// Snapshots the state of `scanner`.
    #[must_use]
    pub fn capture(scanner: &dyn ExternalScanner) -> Self {
        let mut buffer = Vec::new();
        scanner.serialize(&mut buffer);
        if buffer.is_empty() {
            Self(None)
        } else {
            Self(Some(buffer.into()))
        }
    }

    /// The serialized bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_deref().unwrap_or_default()
    }

    /// Whether this is the initial (empty) state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScannerState({:?})", self.as_bytes())
    }
}

/// The view of the input an [`ExternalScanner`] works through.
///
/// The token starts at the cursor's initial position. [`skip`](Self::skip)
/// moves the token start forward (the skipped text becomes padding);
/// [`advance`](Self::advance) consumes into the token. The token ends where
/// [`mark_end`](Self::mark_end) was last called, or at the cursor position if
/// it never was.
#[derive(Debug)]
pub struct ScanCursor<'a> {
    text: &'a str,
    position: usize,
    token_start: usize,
    marked_end: Option<usize>,
    examined: usize,
}

impl<'a> ScanCursor<'a> {
    pub(crate) fn new(text: &'a str, position: usize) -> Self {
        Self {
            text,
            position,
            token_start: position,
            marked_end: None,
            examined: position,
        }
    }

    /// The next character, or `None` at end of input.
    pub fn lookahead(&mut self) -> Option<char> {
        match self.text.get(self.position..).and_then(|rest| rest.chars().next()) {
            Some(c) => {
                self.examined = self.examined.max(self.position + c.len_utf8());
                Some(c)
            }
            None => {
                self.examined = self.examined.max(self.text.len() + 1);
                None
            }
        }
    }

    /// Consumes the next character into the token.
    pub fn advance(&mut self) {
        if let Some(c) = self.lookahead() {
            self.position += c.len_utf8();
        }
    }

    /// Skips the next character. Before anything has been consumed this
    /// moves the token start, so the character becomes padding.
    pub fn skip(&mut self) {
        let at_start = self.position == self.token_start;
        self.advance();
        if at_start {
            self.token_start = self.position;
        }
    }

    /// Ends the token at the current position.
    pub fn mark_end(&mut self) {
        self.marked_end = Some(self.position);
    }

    /// Byte column of the current position.
    #[must_use]
    pub fn column(&self) -> usize {
        let line_start = self.text.as_bytes()[..self.position]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        self.position - line_start
    }

    /// Whether the cursor is at the end of input.
    #[must_use]
    pub fn is_at_eof(&self) -> bool {
        self.position >= self.text.len()
    }

    pub(crate) fn token_start(&self) -> usize {
        self.token_start
    }

    pub(crate) fn token_end(&self) -> usize {
        self.marked_end.unwrap_or(self.position).max(self.token_start)
    }

    pub(crate) fn examined(&self) -> usize {
        self.examined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_moves_token_start() {
        let mut cursor = ScanCursor::new("  ab", 0);
        cursor.skip();
        cursor.skip();
        cursor.advance();
        assert_eq!(cursor.token_start(), 2);
        assert_eq!(cursor.token_end(), 3);
    }

    #[test]
    fn test_mark_end_and_examined() {
        let mut cursor = ScanCursor::new("abc", 0);
        cursor.advance();
        cursor.mark_end();
        cursor.advance();
        assert_eq!(cursor.token_end(), 1);
        assert_eq!(cursor.examined(), 2);
        cursor.advance();
        assert!(cursor.is_at_eof());
        assert_eq!(cursor.lookahead(), None);
        assert_eq!(cursor.examined(), 4);
    }

    #[test]
    fn test_column_counts_from_line_start() {
        let mut cursor = ScanCursor::new("ab\n  c", 0);
        for _ in 0..5 {
            cursor.advance();
        }
        assert_eq!(cursor.column(), 2);
    }

    #[test]
    fn test_scanner_state_empty_buffer() {
        assert!(ScannerState::default().is_empty());
        assert_eq!(ScannerState::default().as_bytes(), b"");
    }
}
