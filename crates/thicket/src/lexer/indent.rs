//! An indentation-tracking external scanner.
//!
//! Emits `indent` when a line starts deeper than the enclosing block and one
//! zero-width `dedent` per closed block when it starts shallower, including
//! the blocks still open at end of input. Grammars using it list their
//! externals in the order [`INDENT`], [`DEDENT`], [`BLANK_LINE`]; the last is
//! optional.

use super::scanner::{ExternalScanner, ScanCursor};

/// External index of the indent token.
pub const INDENT: usize = 0;
/// External index of the dedent token.
pub const DEDENT: usize = 1;
/// External index of the blank-line token.
pub const BLANK_LINE: usize = 2;

const TAB_WIDTH: u16 = 8;

/// Tracks a stack of open indentation levels.
///
/// Indentation is measured with a space as one column and a tab as eight.
/// The scanner only acts at the start of a line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndentScanner {
    indents: Vec<u16>,
}

impl IndentScanner {
    /// Creates a scanner with no open blocks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed scanner, usable as a [`ScannerFactory`](super::ScannerFactory).
    #[must_use]
    pub fn boxed() -> Box<dyn ExternalScanner> {
        Box::new(Self::new())
    }

    /// Currently open indentation levels, outermost first.
    #[must_use]
    pub fn levels(&self) -> &[u16] {
        &self.indents
    }
}

fn is_valid(valid: &[bool], index: usize) -> bool {
    valid.get(index).copied().unwrap_or(false)
}

impl ExternalScanner for IndentScanner {
    fn scan(&mut self, cursor: &mut ScanCursor<'_>, valid: &[bool]) -> Option<usize> {
        if cursor.column() != 0 {
            return None;
        }

        if cursor.is_at_eof() {
            if is_valid(valid, DEDENT) && self.indents.pop().is_some() {
                cursor.mark_end();
                return Some(DEDENT);
            }
            if is_valid(valid, BLANK_LINE) {
                cursor.mark_end();
                return Some(BLANK_LINE);
            }
            return None;
        }

        // Dedents are zero-width at the start of the line.
        cursor.mark_end();
        let mut width: u16 = 0;
        loop {
            match cursor.lookahead() {
                Some(' ') => width = width.saturating_add(1),
                Some('\t') => width = width.saturating_add(TAB_WIDTH),
                _ => break,
            }
            cursor.advance();
        }

        if matches!(cursor.lookahead(), None | Some('\n' | '\r')) {
            if is_valid(valid, BLANK_LINE) {
                cursor.mark_end();
                return Some(BLANK_LINE);
            }
            return None;
        }

        let current = self.indents.last().copied().unwrap_or(0);
        if width > current && is_valid(valid, INDENT) {
            cursor.mark_end();
            self.indents.push(width);
            return Some(INDENT);
        }
        if width < current && is_valid(valid, DEDENT) {
            self.indents.pop();
            return Some(DEDENT);
        }
        None
    }

    fn serialize(&self, buffer: &mut Vec<u8>) {
        for level in &self.indents {
            buffer.extend_from_slice(&level.to_le_bytes());
        }
    }

    fn deserialize(&mut self, buffer: &[u8]) {
        self.indents = buffer
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
    }
}
