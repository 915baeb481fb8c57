//! The parse stack.
//!
//! Each entry pairs a subtree with the state reached after pushing it. Extras
//! are pushed without changing state, so the state below an extra is always
//! the state recorded on it.

use std::iter;

use crate::table::StateId;
use crate::tree::subtree::Subtree;

#[derive(Debug, Clone)]
struct Entry {
    state: StateId,
    subtree: Subtree,
}

#[derive(Debug, Default)]
pub(super) struct Stack {
    entries: Vec<Entry>,
}

impl Stack {
    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    /// The current state.
    pub(super) fn state(&self) -> StateId {
        self.state_at(self.entries.len())
    }

    /// The state with only the first `len` entries on the stack.
    pub(super) fn state_at(&self, len: usize) -> StateId {
        len.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map_or(StateId::START, |e| e.state)
    }

    pub(super) fn push(&mut self, state: StateId, subtree: Subtree) {
        self.entries.push(Entry { state, subtree });
    }

    pub(super) fn top(&self) -> Option<&Subtree> {
        self.entries.last().map(|e| &e.subtree)
    }

    pub(super) fn pop(&mut self) -> Option<Subtree> {
        self.entries.pop().map(|e| e.subtree)
    }

    /// Removes and returns every entry from `at` upwards, bottom first.
    pub(super) fn split_off(&mut self, at: usize) -> Vec<Subtree> {
        self.entries
            .split_off(at.min(self.entries.len()))
            .into_iter()
            .map(|e| e.subtree)
            .collect()
    }

    /// Pops the extras sitting on top of the last structural entry.
    pub(super) fn pop_extras(&mut self) -> Vec<Subtree> {
        let at = self
            .entries
            .iter()
            .rposition(|e| !e.subtree.is_extra())
            .map_or(0, |i| i + 1);
        self.split_off(at)
    }

    /// Index of the entry where the top `count` structural entries begin,
    /// including any extras between them.
    pub(super) fn children_start(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return Some(self.entries.len());
        }
        let mut seen = 0;
        for (i, entry) in self.entries.iter().enumerate().rev() {
            if !entry.subtree.is_extra() {
                seen += 1;
                if seen == count {
                    return Some(i);
                }
            }
        }
        None
    }

    /// The states of the structural entries, starting with the start state.
    pub(super) fn states(&self) -> Vec<StateId> {
        iter::once(StateId::START)
            .chain(
                self.entries
                    .iter()
                    .filter(|e| !e.subtree.is_extra())
                    .map(|e| e.state),
            )
            .collect()
    }

    /// The highest length the stack can be cut back to, removing at least
    /// one structural entry, that leaves a state satisfying `accepts`.
    pub(super) fn recovery_point(&self, accepts: impl Fn(StateId) -> bool) -> Option<usize> {
        let mut structural = false;
        for len in (0..self.entries.len()).rev() {
            structural |= !self.entries[len].subtree.is_extra();
            if structural && accepts(self.state_at(len)) {
                return Some(len);
            }
        }
        None
    }

    pub(super) fn into_subtrees(self) -> Vec<Subtree> {
        self.entries.into_iter().map(|e| e.subtree).collect()
    }
}
