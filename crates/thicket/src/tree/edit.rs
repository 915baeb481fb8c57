//! Applying text edits to an existing tree.
//!
//! Editing does not reparse. It shifts every node after the edit, resizes the
//! nodes around it, and marks as changed each node whose text, or the text its
//! lexer looked at, overlaps the replaced range. The parser later refuses to
//! reuse changed nodes and shares everything else.

use crate::length::{Length, Point};

use super::subtree::Subtree;

/// A single text replacement, described in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEdit {
    /// Byte offset where the replaced range starts.
    pub start_byte: usize,
    /// Byte offset where the replaced range ended, before the edit.
    pub old_end_byte: usize,
    /// Byte offset where the inserted text ends, after the edit.
    pub new_end_byte: usize,
    /// Point of `start_byte`.
    pub start_position: Point,
    /// Point of `old_end_byte` in the old text.
    pub old_end_position: Point,
    /// Point of `new_end_byte` in the new text.
    pub new_end_position: Point,
}

/// Errors reported when an edit does not fit the text it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// The replaced range extends past the end of the text.
    #[error("edit range {start}..{old_end} is outside a text of {len} bytes")]
    OutOfBounds {
        /// Start of the replaced range.
        start: usize,
        /// End of the replaced range.
        old_end: usize,
        /// Length of the text.
        len: usize,
    },

    /// An end offset lies before the start offset.
    #[error("edit range is inverted: start {start} is after end {end}")]
    InvalidRange {
        /// Start of the range.
        start: usize,
        /// The offending end.
        end: usize,
    },

    /// An offset falls inside a multi-byte character.
    #[error("byte offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

impl InputEdit {
    /// Checks the edit against a text of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidRange`] if either end precedes the start,
    /// and [`EditError::OutOfBounds`] if the replaced range exceeds `len`.
    pub fn validate(&self, len: usize) -> Result<(), EditError> {
        if self.old_end_byte < self.start_byte {
            return Err(EditError::InvalidRange {
                start: self.start_byte,
                end: self.old_end_byte,
            });
        }
        if self.new_end_byte < self.start_byte {
            return Err(EditError::InvalidRange {
                start: self.start_byte,
                end: self.new_end_byte,
            });
        }
        if self.old_end_byte > len {
            return Err(EditError::OutOfBounds {
                start: self.start_byte,
                old_end: self.old_end_byte,
                len,
            });
        }
        Ok(())
    }

    fn old_end(&self) -> Length {
        Length::new(self.old_end_byte, self.old_end_position)
    }

    fn new_end(&self) -> Length {
        Length::new(self.new_end_byte, self.new_end_position)
    }

    /// Maps an absolute position in the old text to the new text.
    ///
    /// Positions before the edit stay put, positions inside the replaced
    /// range collapse onto the end of the inserted text, and positions after
    /// it shift by the size difference.
    #[must_use]
    pub fn map(&self, position: Length) -> Length {
        if position.bytes <= self.start_byte {
            position
        } else if position.bytes <= self.old_end_byte {
            self.new_end()
        } else {
            // Distance past the old end, re-based on the new end.
            self.new_end() + (position - self.old_end())
        }
    }

    /// Whether a node spanning `[start, end)` that read `lookahead` bytes
    /// past its end is affected by this edit.
    fn touches(&self, start: usize, end: usize, lookahead: usize) -> bool {
        self.start_byte < end + lookahead && self.old_end_byte >= start
    }
}

/// Edits a whole tree. The root always spans the edited text: an insertion
/// at the very end lies after every node and only the root grows over it.
pub(crate) fn edit_root(root: &Subtree, edit: &InputEdit) -> Subtree {
    let total = edit.new_end() + (root.total() - edit.old_end());
    let edited = edit_subtree(root, Length::ZERO, edit);
    if edited.total() == total {
        edited
    } else {
        let padding = edited.padding();
        edited.edited(padding, total - padding, edited.children().to_vec())
    }
}

/// Rebuilds the affected spine of `subtree`, which starts (padding included)
/// at absolute position `start` in the old text.
fn edit_subtree(subtree: &Subtree, start: Length, edit: &InputEdit) -> Subtree {
    let content_start = start + subtree.padding();
    let end = content_start + subtree.size();

    let new_start = edit.map(start);
    let new_content_start = edit.map(content_start);
    let new_end = edit.map(end);

    let children = subtree
        .children()
        .iter()
        .zip(subtree.offsets())
        .map(|(child, &offset)| {
            let child_start = start + offset;
            let child_end = child_start + child.total();
            if edit.touches(child_start.bytes, child_end.bytes, child.lookahead_bytes()) {
                edit_subtree(child, child_start, edit)
            } else {
                child.clone()
            }
        })
        .collect();

    subtree.edited(
        new_content_start - new_start,
        new_end - new_content_start,
        children,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{ScannerState, Token};
    use crate::table::{GrammarTable, StateId, Symbol, TableBuilder};
    use crate::tree::subtree::NodeInfo;

    fn token(symbol: Symbol, start: usize, end: usize, lookahead_end: usize) -> Token {
        let at = |b| Length::new(b, Point::new(0, b));
        Token {
            symbol,
            padding_start: at(start),
            start: at(start),
            end: at(end),
            lookahead_end,
            is_extra: false,
            scanner_before: ScannerState::default(),
            scanner_after: ScannerState::default(),
        }
    }

    /// `pair -> "a" "b"` over `[0, mid)` and `[mid, end)`, where the first
    /// leaf examined input up to `lookahead_end`.
    fn pair(mid: usize, end: usize, lookahead_end: usize) -> (GrammarTable, Subtree) {
        let mut b = TableBuilder::new("pair");
        let a = b.terminal_literal("a");
        let bee = b.terminal_literal("b");
        let pair = b.non_terminal("pair");
        let rule = b.production(pair, 2).id();
        let s: Vec<StateId> = (0..4).map(|_| b.state()).collect();
        b.shift(s[0], a, s[1]).goto(s[0], pair, s[3]);
        b.shift(s[1], bee, s[2]);
        b.reduce(s[2], &[Symbol::END], rule);
        b.accept(s[3]);
        let table = b.into_table().unwrap();
        let first = Subtree::leaf(&token(a, 0, mid, lookahead_end), s[0], s[1], &table);
        let second = Subtree::leaf(&token(bee, mid, end, end + 1), s[1], s[2], &table);
        let root = Subtree::node(
            pair,
            vec![first, second],
            Vec::new(),
            NodeInfo {
                production: Some(rule),
                parse_state: s[0],
                reduced_with: Symbol::END,
            },
            &table,
        );
        (table, root)
    }

    fn insertion(at: usize, text: &str) -> InputEdit {
        let start = Length::new(at, Point::new(0, at));
        let new_end = start + Length::of(text.as_bytes());
        InputEdit {
            start_byte: at,
            old_end_byte: at,
            new_end_byte: new_end.bytes,
            start_position: start.extent,
            old_end_position: start.extent,
            new_end_position: new_end.extent,
        }
    }

    #[test]
    fn test_map_shifts_positions_after_edit() {
        let edit = insertion(2, "xyz");
        assert_eq!(edit.map(Length::new(1, Point::new(0, 1))).bytes, 1);
        assert_eq!(edit.map(Length::new(2, Point::new(0, 2))).bytes, 2);
        let after = edit.map(Length::new(4, Point::new(0, 4)));
        assert_eq!(after, Length::new(7, Point::new(0, 7)));
    }

    #[test]
    fn test_map_across_rows() {
        // Insert a newline at column 2 of row 0; a later position on the same
        // row moves to row 1.
        let edit = insertion(2, "\n");
        let moved = edit.map(Length::new(5, Point::new(0, 5)));
        assert_eq!(moved, Length::new(6, Point::new(1, 3)));
        // Positions on later rows only change row.
        let later = edit.map(Length::new(9, Point::new(1, 2)));
        assert_eq!(later, Length::new(10, Point::new(2, 2)));
    }

    #[test]
    fn test_map_collapses_deleted_range() {
        let edit = InputEdit {
            start_byte: 2,
            old_end_byte: 6,
            new_end_byte: 2,
            start_position: Point::new(0, 2),
            old_end_position: Point::new(0, 6),
            new_end_position: Point::new(0, 2),
        };
        assert_eq!(edit.map(Length::new(4, Point::new(0, 4))).bytes, 2);
        assert_eq!(edit.map(Length::new(8, Point::new(0, 8))).bytes, 4);
    }

    #[test]
    fn test_validate() {
        assert!(insertion(3, "a").validate(3).is_ok());
        assert_eq!(
            insertion(4, "a").validate(3),
            Err(EditError::OutOfBounds {
                start: 4,
                old_end: 4,
                len: 3
            })
        );
        let inverted = InputEdit {
            old_end_byte: 1,
            ..insertion(2, "")
        };
        assert!(matches!(
            inverted.validate(5),
            Err(EditError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_append_grows_root() {
        let (_table, root) = pair(2, 3, 6);
        let edit = insertion(3, "xyz");
        let edited = edit_root(&root, &edit);
        assert_eq!(edited.total().bytes, 6);
        assert!(edited.has_changes());

        // A second append lands on the grown root.
        let again = edit_root(&edited, &insertion(6, "\n"));
        assert_eq!(again.total(), Length::new(7, Point::new(1, 0)));
    }

    #[test]
    fn test_edited_node_recomputes_lookahead() {
        // The first child looked 4 bytes past its end, beyond the second
        // child. Shrinking the second child moves the parent's end back, so
        // the parent's lookahead past its end grows.
        let (_table, root) = pair(2, 3, 6);
        assert_eq!(root.lookahead_bytes(), 3);
        let deletion = InputEdit {
            start_byte: 2,
            old_end_byte: 3,
            new_end_byte: 2,
            start_position: Point::new(0, 2),
            old_end_position: Point::new(0, 3),
            new_end_position: Point::new(0, 2),
        };
        let edited = edit_root(&root, &deletion);
        assert_eq!(edited.total().bytes, 2);
        assert_eq!(edited.lookahead_bytes(), 4);
        assert_eq!(edited.error_count(), 0);
    }

    #[test]
    fn test_touches_uses_lookahead() {
        let edit = insertion(5, "x");
        assert!(!edit.touches(0, 4, 1));
        assert!(edit.touches(0, 4, 2));
        assert!(edit.touches(5, 7, 1));
        assert!(!edit.touches(6, 7, 1));
    }
}
