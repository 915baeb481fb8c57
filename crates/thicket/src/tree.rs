//! Concrete syntax trees.
//!
//! A [`Tree`] owns a root subtree and the [`Language`] it was parsed with.
//! Navigation goes through [`Node`], a cheap positioned view, or a
//! [`TreeCursor`]. Trees are immutable apart from [`Tree::edit`], which
//! prepares a tree for incremental reparsing.

mod cursor;
pub mod edit;
mod node;
pub(crate) mod subtree;

use std::fmt;

pub use cursor::TreeCursor;
pub use edit::{EditError, InputEdit};
pub use node::Node;

use crate::language::Language;
use crate::length::Length;
use subtree::Subtree;

/// The result of a parse.
///
/// The root covers the whole text it was parsed from, trailing whitespace
/// included. Cloning shares every node.
#[derive(Clone)]
pub struct Tree {
    root: Subtree,
    language: Language,
}

impl Tree {
    pub(crate) fn new(root: Subtree, language: Language) -> Self {
        Self { root, language }
    }

    pub(crate) fn root(&self) -> &Subtree {
        &self.root
    }

    /// The root node.
    #[must_use]
    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, &self.root, Length::ZERO)
    }

    /// A cursor positioned at the root.
    #[must_use]
    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self.root_node())
    }

    /// The language the tree was parsed with.
    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Whether the tree contains `ERROR` or `MISSING` nodes.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.root.error_count() > 0
    }

    /// Whether the tree has been edited since it was parsed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.root.has_changes()
    }

    /// Length in bytes of the text the tree describes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.total().bytes
    }

    /// Whether the tree describes an empty text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tree as an s-expression of its named nodes.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        self.root_node().to_sexp()
    }

    /// Adjusts the tree for a text edit so it can seed an incremental parse.
    ///
    /// Nodes the edit cannot have affected are shared with the unedited
    /// tree; the rest are rebuilt at their new positions and marked as
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] if the edit does not fit the tree, in which
    /// case the tree is left untouched.
    pub fn edit(&mut self, edit: &InputEdit) -> Result<(), EditError> {
        edit.validate(self.len())?;
        self.root = edit::edit_root(&self.root, edit);
        tracing::debug!(
            start = edit.start_byte,
            old_end = edit.old_end_byte,
            new_end = edit.new_end_byte,
            "edited tree"
        );
        Ok(())
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for Tree {}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sexp())
    }
}
