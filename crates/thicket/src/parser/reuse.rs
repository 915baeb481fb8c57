//! Reusing subtrees of an edited previous tree.
//!
//! At each lookahead position the parser asks the [`ReuseCursor`] for the old
//! nodes starting there, outermost first, and takes the first one that would
//! certainly be rebuilt identically: same symbol via its production, same
//! start state and scanner state, the same first token, and the same token
//! after it, re-lexed in the state the node's last token was shifted in.

use crate::length::Length;
use crate::lexer::Token;
use crate::table::StateId;
use crate::tree::subtree::Subtree;

use super::Run;

/// Finds old subtrees by start position.
pub(super) struct ReuseCursor<'a> {
    root: &'a Subtree,
    position: Option<usize>,
    candidates: Vec<&'a Subtree>,
}

impl<'a> ReuseCursor<'a> {
    pub(super) fn new(root: &'a Subtree) -> Self {
        Self {
            root,
            position: None,
            candidates: Vec::new(),
        }
    }

    /// Interior nodes whose padding starts at `position`, outermost first.
    pub(super) fn candidates(&mut self, position: usize) -> &[&'a Subtree] {
        if self.position != Some(position) {
            self.position = Some(position);
            self.candidates = collect(self.root, position);
        }
        &self.candidates
    }
}

fn collect(root: &Subtree, position: usize) -> Vec<&Subtree> {
    let mut found = Vec::new();
    let mut node = root;
    let mut start = 0;
    loop {
        if start == position && !node.is_leaf() {
            found.push(node);
        }
        let offsets = node.offsets();
        let after = offsets.partition_point(|o| start + o.bytes <= position);
        let Some(last) = after.checked_sub(1) else {
            break;
        };
        // Prefer the first of several children starting at `position`.
        let first = offsets[..after].partition_point(|o| start + o.bytes < position);
        let index = if first < after { first } else { last };
        let child = &node.children()[index];
        let child_start = start + offsets[index].bytes;
        if child_start != position && child_start + child.total().bytes <= position {
            break;
        }
        node = child;
        start = child_start;
    }
    found
}

impl<'a> Run<'a> {
    /// Pushes a reusable old subtree at the lookahead, if there is one.
    pub(super) fn try_reuse(&mut self) -> bool {
        let position = self.lookahead.padding_start.bytes;
        let Some(cursor) = self.reuse.as_mut() else {
            return false;
        };
        let candidates: Vec<&'a Subtree> = cursor.candidates(position).to_vec();
        let state = self.stack.state();
        for node in candidates {
            if !self.is_reusable(node, state) {
                continue;
            }
            let Some((extras, next)) = self.probe(node) else {
                continue;
            };
            let Some(goto) = self.table.goto(state, node.symbol()) else {
                continue;
            };
            tracing::debug!(
                symbol = self.table.symbol_name(node.symbol()),
                start = position,
                bytes = node.total().bytes,
                "reusing subtree"
            );
            self.stack.push(goto, node.clone());
            for extra in &extras {
                let leaf = Subtree::leaf(extra, node.leaf_state(), node.leaf_state(), self.table);
                self.stack.push(goto, leaf);
            }
            self.lookahead = next;
            self.reductions = 0;
            return true;
        }
        false
    }

    fn is_reusable(&self, node: &Subtree, state: StateId) -> bool {
        let lookahead = &self.lookahead;
        node.total().bytes > 0
            && node.is_visible()
            && !node.is_leaf()
            && !node.is_extra()
            && !node.has_changes()
            && node.error_count() == 0
            && node.parse_state() == state
            && node
                .production()
                .and_then(|id| self.table.production(id))
                .is_some_and(|p| p.lhs == node.symbol())
            && node.scanner_before().as_bytes() == lookahead.scanner_before.as_bytes()
            && node.first_leaf().is_some_and(|leaf| {
                leaf.symbol() == lookahead.symbol
                    && leaf.padding() == lookahead.padding()
                    && leaf.size() == lookahead.size()
            })
    }

    /// Re-lexes the input after `node` the way the original parse did.
    /// Returns the extras and the structural token found there if that token
    /// is the one the node was reduced with.
    fn probe(&mut self, node: &Subtree) -> Option<(Vec<Token>, Token)> {
        let saved = self.lexer.scanner_state().clone();
        self.lexer.restore_scanner(node.scanner_after());

        let mut position: Length = self.lookahead.padding_start + node.total();
        let mut extras = Vec::new();
        let next = loop {
            let token = self.lexer.lex(position, Some(node.leaf_state()));
            if token.is_extra && token.end.bytes > position.bytes {
                position = token.end;
                extras.push(token);
                continue;
            }
            break token;
        };

        if next.symbol == node.reduced_with() && !next.is_extra {
            Some((extras, next))
        } else {
            self.lexer.restore_scanner(&saved);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{StateId, Symbol, TableBuilder};
    use crate::Language;
    use crate::Parser;

    fn language() -> Language {
        // pair -> "a" "b"
        let mut b = TableBuilder::new("pair");
        let a = b.terminal_literal("a");
        let bee = b.terminal_literal("b");
        b.skip(" ");
        let pair = b.non_terminal("pair");
        let rule = b.production(pair, 2).id();
        let s: Vec<StateId> = (0..4).map(|_| b.state()).collect();
        b.shift(s[0], a, s[1]).goto(s[0], pair, s[3]);
        b.shift(s[1], bee, s[2]);
        b.reduce(s[2], &[Symbol::END], rule);
        b.accept(s[3]);
        Language::new(b.into_table().unwrap())
    }

    #[test]
    fn test_candidates_are_outermost_first() {
        let language = language();
        let tree = Parser::new(language).parse(" a b", None);
        let root = tree.root();
        let mut cursor = ReuseCursor::new(root);
        // The root starts at 0; its first leaf starts there too but leaves
        // are not candidates.
        assert_eq!(cursor.candidates(0).len(), 1);
        assert!(cursor.candidates(2).is_empty());
        assert!(cursor.candidates(9).is_empty());
    }
}
