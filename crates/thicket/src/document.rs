//! Text and tree kept in step across edits.
//!
//! A [`Document`] owns its text as a [`Rope`] together with the latest tree.
//! Edits are applied to both at once: the text changes immediately and the
//! tree is adjusted with [`Tree::edit`], leaving the document
//! [`Pending`](DocumentState::Pending) until [`Document::reparse`] brings the
//! tree up to date by reparsing incrementally.

use std::ops::Range;

use ropey::Rope;

use crate::language::Language;
use crate::length::{Length, Point};
use crate::parser::Parser;
use crate::tree::{EditError, InputEdit, Tree};

/// Whether a document's tree reflects its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// The tree was parsed from the current text.
    Clean,
    /// The text has been edited since the last parse.
    Pending,
}

/// An editable text with an incrementally maintained syntax tree.
#[derive(Debug, Clone)]
pub struct Document {
    parser: Parser,
    text: Rope,
    tree: Tree,
    pending: Vec<InputEdit>,
}

impl Document {
    /// Parses `text` with a default parser for `language`.
    #[must_use]
    pub fn new(language: Language, text: &str) -> Self {
        Self::with_parser(Parser::new(language), text)
    }

    /// Parses `text` with `parser`.
    #[must_use]
    pub fn with_parser(parser: Parser, text: &str) -> Self {
        let tree = parser.parse(text, None);
        Self {
            parser,
            text: Rope::from_str(text),
            tree,
            pending: Vec::new(),
        }
    }

    /// The current text.
    #[must_use]
    pub fn text(&self) -> &Rope {
        &self.text
    }

    /// Length of the current text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len_bytes()
    }

    /// Whether the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The latest tree. While edits are pending it is the last parsed tree
    /// adjusted for those edits.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Whether the tree is up to date.
    #[must_use]
    pub fn state(&self) -> DocumentState {
        if self.pending.is_empty() {
            DocumentState::Clean
        } else {
            DocumentState::Pending
        }
    }

    /// Edits applied since the last parse, oldest first.
    #[must_use]
    pub fn pending_edits(&self) -> &[InputEdit] {
        &self.pending
    }

    /// The row/column of a byte offset in the current text.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::OutOfBounds`] past the end of the text and
    /// [`EditError::NotCharBoundary`] inside a multi-byte character.
    pub fn point(&self, byte: usize) -> Result<Point, EditError> {
        let len = self.len();
        if byte > len {
            return Err(EditError::OutOfBounds {
                start: byte,
                old_end: byte,
                len,
            });
        }
        if !self.is_char_boundary(byte) {
            return Err(EditError::NotCharBoundary(byte));
        }
        let row = self.text.byte_to_line(byte);
        Ok(Point::new(row, byte - self.text.line_to_byte(row)))
    }

    fn is_char_boundary(&self, byte: usize) -> bool {
        self.text.char_to_byte(self.text.byte_to_char(byte)) == byte
    }

    /// Replaces the bytes in `range` with `replacement`.
    ///
    /// The text and tree are updated immediately; call
    /// [`reparse`](Self::reparse) to bring the tree up to date.
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] if the range is inverted, extends past the
    /// end of the text, or splits a character. Nothing is changed then.
    pub fn edit(&mut self, range: Range<usize>, replacement: &str) -> Result<InputEdit, EditError> {
        let Range { start, end } = range;
        if end < start {
            return Err(EditError::InvalidRange { start, end });
        }
        let len = self.len();
        if end > len {
            return Err(EditError::OutOfBounds {
                start,
                old_end: end,
                len,
            });
        }
        let start_position = self.point(start)?;
        let old_end_position = self.point(end)?;
        let new_end = Length::new(start, start_position) + Length::of(replacement.as_bytes());
        let edit = InputEdit {
            start_byte: start,
            old_end_byte: end,
            new_end_byte: new_end.bytes,
            start_position,
            old_end_position,
            new_end_position: new_end.extent,
        };

        self.tree.edit(&edit)?;
        let start_char = self.text.byte_to_char(start);
        let end_char = self.text.byte_to_char(end);
        self.text.remove(start_char..end_char);
        self.text.insert(start_char, replacement);
        self.pending.push(edit);
        tracing::debug!(
            start,
            old_end = end,
            new_end = new_end.bytes,
            pending = self.pending.len(),
            "document edited"
        );
        Ok(edit)
    }

    /// Reparses the text, reusing what the pending edits left intact, and
    /// returns the up-to-date tree.
    pub fn reparse(&mut self) -> &Tree {
        if !self.pending.is_empty() {
            let text = self.text.to_string();
            self.tree = self.parser.parse(&text, Some(&self.tree));
            tracing::debug!(edits = self.pending.len(), "document reparsed");
            self.pending.clear();
        }
        &self.tree
    }
}
