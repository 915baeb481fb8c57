//! Stateful tree traversal.

use super::node::Node;

#[derive(Debug, Clone, Copy)]
struct Frame<'tree> {
    node: Node<'tree>,
    /// Index of `node` among its parent's children.
    index: usize,
}

/// Walks a tree without re-descending from the root for each step.
#[derive(Debug, Clone)]
pub struct TreeCursor<'tree> {
    frames: Vec<Frame<'tree>>,
}

impl<'tree> TreeCursor<'tree> {
    pub(crate) fn new(node: Node<'tree>) -> Self {
        Self {
            frames: vec![Frame { node, index: 0 }],
        }
    }

    fn top(&self) -> &Frame<'tree> {
        // The starting frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    /// The node the cursor is on.
    #[must_use]
    pub fn node(&self) -> Node<'tree> {
        self.top().node
    }

    /// Depth below the starting node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// The field name of the current node within its parent.
    #[must_use]
    pub fn field_name(&self) -> Option<&'tree str> {
        let parent = self.frames.len().checked_sub(2).map(|i| self.frames[i].node)?;
        parent.field_name_for_child(self.top().index)
    }

    /// Moves to the first child. Returns `false` at a leaf.
    pub fn goto_first_child(&mut self) -> bool {
        match self.node().child(0) {
            Some(node) => {
                self.frames.push(Frame { node, index: 0 });
                true
            }
            None => false,
        }
    }

    /// Moves to the next sibling. Returns `false` at the last child or the
    /// starting node.
    pub fn goto_next_sibling(&mut self) -> bool {
        let Some(parent) = self.frames.len().checked_sub(2).map(|i| self.frames[i].node) else {
            return false;
        };
        let index = self.top().index + 1;
        match parent.child(index) {
            Some(node) => {
                let last = self.frames.len() - 1;
                self.frames[last] = Frame { node, index };
                true
            }
            None => false,
        }
    }

    /// Moves to the parent. Returns `false` at the starting node.
    pub fn goto_parent(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    /// Moves back to `node` and forgets the path walked so far.
    pub fn reset(&mut self, node: Node<'tree>) {
        self.frames.clear();
        self.frames.push(Frame { node, index: 0 });
    }
}
