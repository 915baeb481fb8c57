//! Positioned views of tree nodes.

use std::fmt;
use std::ops::Range;

use crate::length::{Length, Point};
use crate::table::Symbol;

use super::cursor::TreeCursor;
use super::subtree::Subtree;
use super::Tree;

/// A node of a [`Tree`] together with its absolute position.
///
/// Nodes are `Copy` and borrow the tree. Hidden grammar rules never appear
/// as nodes: their children are children of the enclosing node.
#[derive(Clone, Copy)]
pub struct Node<'tree> {
    tree: &'tree Tree,
    subtree: &'tree Subtree,
    /// Absolute start of the node's padding.
    start: Length,
}

impl<'tree> Node<'tree> {
    pub(crate) fn new(tree: &'tree Tree, subtree: &'tree Subtree, start: Length) -> Self {
        Self {
            tree,
            subtree,
            start,
        }
    }

    /// The node's type name.
    #[must_use]
    pub fn kind(&self) -> &'tree str {
        self.tree.language().table().symbol_name(self.subtree.symbol())
    }

    /// The node's grammar symbol.
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        self.subtree.symbol()
    }

    /// Whether the node is named (as opposed to anonymous punctuation).
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.subtree.is_named() && self.subtree.is_visible()
    }

    /// Whether the node is an extra, such as a comment.
    #[must_use]
    pub fn is_extra(&self) -> bool {
        self.subtree.is_extra()
    }

    /// Whether the node is an `ERROR` node.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.subtree.is_error()
    }

    /// Whether the node was inserted by error recovery.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.subtree.is_missing()
    }

    /// Whether the node is, or contains, an error.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.subtree.error_count() > 0
    }

    /// Whether the node was affected by an edit since it was parsed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.subtree.has_changes()
    }

    fn content_start(&self) -> Length {
        self.start + self.subtree.padding()
    }

    fn end(&self) -> Length {
        self.content_start() + self.subtree.size()
    }

    /// Byte offset where the node's text starts.
    #[must_use]
    pub fn start_byte(&self) -> usize {
        self.content_start().bytes
    }

    /// Byte offset where the node's text ends.
    #[must_use]
    pub fn end_byte(&self) -> usize {
        self.end().bytes
    }

    /// The node's text range.
    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte()..self.end_byte()
    }

    /// The node's range including the whitespace before it.
    #[must_use]
    pub fn total_range(&self) -> Range<usize> {
        self.start.bytes..self.end_byte()
    }

    /// Row/column where the node's text starts.
    #[must_use]
    pub fn start_position(&self) -> Point {
        self.content_start().extent
    }

    /// Row/column where the node's text ends.
    #[must_use]
    pub fn end_position(&self) -> Point {
        self.end().extent
    }

    /// Number of children, named or not.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.subtree.children().len()
    }

    /// The child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<Node<'tree>> {
        let child = self.subtree.children().get(index)?;
        let offset = self.subtree.offsets()[index];
        Some(Node::new(self.tree, child, self.start + offset))
    }

    /// All children in order.
    pub fn children(&self) -> impl Iterator<Item = Node<'tree>> + 'tree {
        let node = *self;
        (0..node.child_count()).filter_map(move |i| node.child(i))
    }

    /// Named children in order.
    pub fn named_children(&self) -> impl Iterator<Item = Node<'tree>> + 'tree {
        self.children().filter(Node::is_named)
    }

    /// Number of named children.
    #[must_use]
    pub fn named_child_count(&self) -> usize {
        self.named_children().count()
    }

    /// The named child at `index` among named children.
    #[must_use]
    pub fn named_child(&self, index: usize) -> Option<Node<'tree>> {
        self.named_children().nth(index)
    }

    /// The first child.
    #[must_use]
    pub fn first_child(&self) -> Option<Node<'tree>> {
        self.child(0)
    }

    /// The last child.
    #[must_use]
    pub fn last_child(&self) -> Option<Node<'tree>> {
        self.child(self.child_count().checked_sub(1)?)
    }

    /// Field name attached to the child at `index`.
    #[must_use]
    pub fn field_name_for_child(&self, index: usize) -> Option<&'tree str> {
        let field = self.subtree.field_at(index)?;
        Some(self.tree.language().table().field_name(field))
    }

    /// The first child carrying the field `name`.
    #[must_use]
    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'tree>> {
        let field = self.tree.language().table().field_id(name)?;
        (0..self.child_count())
            .find(|&i| self.subtree.field_at(i) == Some(field))
            .and_then(|i| self.child(i))
    }

    /// Whether `self` and `other` are the same shared node.
    #[must_use]
    pub fn same_identity(&self, other: &Node<'_>) -> bool {
        self.subtree.ptr_eq(other.subtree)
    }

    /// An identifier for the node's shared allocation. Nodes reused by an
    /// incremental parse keep their id.
    #[must_use]
    pub fn id(&self) -> usize {
        self.subtree.id()
    }

    fn is_same_node(&self, other: &Node<'_>) -> bool {
        self.same_identity(other) && self.start == other.start
    }

    /// Indices of children whose total range could contain `[start, end]`,
    /// found by binary search over the child offsets.
    fn candidates(&self, start: usize) -> impl Iterator<Item = Node<'tree>> + 'tree {
        let node = *self;
        let offsets = self.subtree.offsets();
        let after = offsets.partition_point(|o| (node.start + *o).bytes <= start);
        (0..after)
            .rev()
            .filter_map(move |i| node.child(i))
            .take_while(move |child| child.end_byte() >= start)
    }

    fn find_parent(&self, target: &Node<'_>) -> Option<Node<'tree>> {
        let target_start = target.start.bytes;
        let target_end = target.end_byte();
        for child in self.candidates(target_start) {
            if child.is_same_node(target) {
                return Some(*self);
            }
            if child.start.bytes <= target_start
                && target_end <= child.end_byte()
                && child.child_count() > 0
            {
                if let Some(parent) = child.find_parent(target) {
                    return Some(parent);
                }
            }
        }
        None
    }

    /// The node's parent, found by descending from the root.
    #[must_use]
    pub fn parent(&self) -> Option<Node<'tree>> {
        let root = self.tree.root_node();
        if root.is_same_node(self) {
            return None;
        }
        root.find_parent(self)
    }

    fn index_in(&self, parent: &Node<'tree>) -> Option<usize> {
        (0..parent.child_count()).find(|&i| parent.child(i).is_some_and(|c| c.is_same_node(self)))
    }

    /// The next sibling.
    #[must_use]
    pub fn next_sibling(&self) -> Option<Node<'tree>> {
        let parent = self.parent()?;
        parent.child(self.index_in(&parent)? + 1)
    }

    /// The previous sibling.
    #[must_use]
    pub fn prev_sibling(&self) -> Option<Node<'tree>> {
        let parent = self.parent()?;
        parent.child(self.index_in(&parent)?.checked_sub(1)?)
    }

    fn descend(&self, start: usize, end: usize, mut visit: impl FnMut(Node<'tree>)) -> Node<'tree> {
        let mut node = *self;
        loop {
            let mut loose = None;
            let mut strict = None;
            for child in node.candidates(start) {
                if child.start_byte() > start || end > child.end_byte() {
                    continue;
                }
                if end < child.end_byte() {
                    strict = Some(child);
                    break;
                }
                if loose.is_none() && child.start_byte() < child.end_byte() {
                    loose = Some(child);
                }
            }
            match strict.or(loose) {
                Some(child) => {
                    visit(child);
                    node = child;
                }
                None => return node,
            }
        }
    }

    /// The smallest node that spans the byte range `[start, end]`.
    #[must_use]
    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'tree>> {
        if start > end || start < self.start_byte() || end > self.end_byte() {
            return None;
        }
        Some(self.descend(start, end, |_| {}))
    }

    /// The smallest named node that spans the byte range `[start, end]`.
    #[must_use]
    pub fn named_descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'tree>> {
        if start > end || start < self.start_byte() || end > self.end_byte() {
            return None;
        }
        let mut named = *self;
        self.descend(start, end, |node| {
            if node.is_named() {
                named = node;
            }
        });
        Some(named)
    }

    /// The node's text, sliced from the source it was parsed from.
    #[must_use]
    pub fn utf8_text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.byte_range()).unwrap_or_default()
    }

    /// A cursor starting at this node.
    #[must_use]
    pub fn walk(&self) -> TreeCursor<'tree> {
        TreeCursor::new(*self)
    }

    /// The subtree rooted here as an s-expression of named nodes, with
    /// fields, `ERROR` and `MISSING` nodes shown.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(None, &mut out);
        out
    }

    fn write_sexp(&self, field: Option<&str>, out: &mut String) {
        let shown = self.is_named() || self.is_missing();
        if shown {
            if !out.is_empty() && !out.ends_with('(') {
                out.push(' ');
            }
            if let Some(field) = field {
                out.push_str(field);
                out.push_str(": ");
            }
            out.push('(');
            if self.is_missing() {
                out.push_str("MISSING ");
                if self.subtree.is_named() {
                    out.push_str(self.kind());
                } else {
                    out.push('"');
                    out.push_str(self.kind());
                    out.push('"');
                }
            } else {
                out.push_str(self.kind());
            }
        }
        for (i, child) in self.children().enumerate() {
            child.write_sexp(self.field_name_for_child(i), out);
        }
        if shown {
            out.push(')');
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_node(other)
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Node {} {} - {}}}",
            self.kind(),
            self.start_position(),
            self.end_position()
        )
    }
}
