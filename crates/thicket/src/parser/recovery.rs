//! Syntax error recovery.
//!
//! When the table has no action for the lookahead the parser tries, in
//! order: inserting a zero-width `MISSING` terminal that lets the lookahead
//! through, popping back to a state that accepts the lookahead, ending the
//! parse under an `ERROR` root at end of input, and finally skipping the
//! lookahead. Every strategy but the last is limited per input position, and
//! the last always consumes input, so recovery terminates.

use crate::table::{ParseAction, StateId, Symbol};
use crate::tree::subtree::Subtree;

use super::{finish, Run};

/// Recovery attempts made at one lookahead position.
#[derive(Debug, Default)]
pub(super) struct Budget {
    position: Option<usize>,
    attempts: usize,
    tried_missing: bool,
}

impl Budget {
    /// Charges one attempt at `position`, starting afresh at a new position.
    fn charge(&mut self, position: usize) -> usize {
        if self.position != Some(position) {
            *self = Self {
                position: Some(position),
                ..Self::default()
            };
        }
        self.attempts += 1;
        self.attempts
    }
}

impl Run<'_> {
    /// Recovers from a syntax error at the lookahead. Returns the finished
    /// root when recovery ends the parse.
    pub(super) fn recover(&mut self) -> Option<Subtree> {
        self.insert = None;
        self.reductions = 0;
        let symbol = self.lookahead.symbol;
        let attempts = self.budget.charge(self.lookahead.start.bytes);
        tracing::debug!(
            symbol = self.table.symbol_name(symbol),
            start = self.lookahead.start.bytes,
            state = self.stack.state().0,
            attempts,
            "syntax error"
        );

        if attempts <= self.options.max_recovery_attempts {
            if !self.budget.tried_missing && symbol != Symbol::ERROR {
                self.budget.tried_missing = true;
                if let Some(missing) = self.find_missing() {
                    tracing::debug!(
                        missing = self.table.symbol_name(missing),
                        "inserting missing token"
                    );
                    self.insert = Some(missing);
                    return None;
                }
            }
            if self.pop_to_accepting() {
                return None;
            }
        }

        if self.lookahead.is_end() {
            tracing::debug!("wrapping unfinished input in an error root");
            let material = std::mem::take(&mut self.stack).into_subtrees();
            let root = Subtree::error(flatten_errors(material), StateId::START, self.table);
            return Some(finish(root, self.text));
        }

        self.skip_lookahead();
        None
    }

    /// The first terminal, in symbol order, whose insertion lets the parser
    /// go on to consume the lookahead.
    fn find_missing(&self) -> Option<Symbol> {
        let states = self.stack.states();
        let top = *states.last()?;
        let next = self.lookahead.symbol;
        self.table
            .expected_symbols(top)
            .filter(|&s| s != Symbol::END && !self.table.is_extra(s))
            .find(|&candidate| {
                let mut simulated = states.clone();
                self.simulate(&mut simulated, candidate) && self.simulate(&mut simulated, next)
            })
    }

    /// Runs the automaton on a bare state stack until `symbol` is shifted or
    /// accepted. Returns `false` on an error.
    fn simulate(&self, states: &mut Vec<StateId>, symbol: Symbol) -> bool {
        for _ in 0..=self.options.max_consecutive_reductions {
            let Some(&top) = states.last() else {
                return false;
            };
            match self.table.action(top, symbol) {
                Some(ParseAction::Shift { state, .. }) => {
                    states.push(state);
                    return true;
                }
                Some(ParseAction::Accept) => return true,
                Some(ParseAction::Reduce { production }) => {
                    let Some(production) = self.table.production(production) else {
                        return false;
                    };
                    // The start state at the bottom is never popped.
                    if production.child_count >= states.len() {
                        return false;
                    }
                    states.truncate(states.len() - production.child_count);
                    let Some(next) = states
                        .last()
                        .and_then(|&s| self.table.goto(s, production.lhs))
                    else {
                        return false;
                    };
                    states.push(next);
                }
                None => return false,
            }
        }
        false
    }

    /// Pops back to the nearest state with an action on the lookahead and
    /// wraps what was popped in an `ERROR` extra.
    fn pop_to_accepting(&mut self) -> bool {
        let symbol = self.lookahead.symbol;
        let table = self.table;
        let Some(at) = self
            .stack
            .recovery_point(|state| table.has_action(state, symbol))
        else {
            return false;
        };
        let popped = self.stack.split_off(at);
        tracing::debug!(
            popped = popped.len(),
            state = self.stack.state().0,
            "popped to recover"
        );
        self.push_error(popped);
        true
    }

    /// Moves the lookahead into an `ERROR` extra and lexes the next token.
    fn skip_lookahead(&mut self) {
        let state = self.stack.state();
        tracing::debug!(
            symbol = self.table.symbol_name(self.lookahead.symbol),
            start = self.lookahead.start.bytes,
            "skipping token"
        );
        let leaf = Subtree::leaf(&self.lookahead, state, state, self.table);
        self.push_error(vec![leaf]);
        self.advance();
    }

    /// Pushes `material` as an `ERROR` extra, merged with an `ERROR` extra
    /// already on top of the stack.
    fn push_error(&mut self, material: Vec<Subtree>) {
        let mut children = Vec::new();
        if self
            .stack
            .top()
            .is_some_and(|top| top.is_error() && top.is_extra())
        {
            children.extend(self.stack.pop());
        }
        children.extend(material);
        let mut children = flatten_errors(children);

        let state = self.stack.state();
        let error = if children.len() == 1 && children[0].is_error() {
            children.swap_remove(0)
        } else {
            Subtree::error(children, state, self.table)
        };
        self.stack.push(state, error.into_extra());
    }
}

/// Replaces interior `ERROR` nodes by their children so that consecutive
/// errors form one node.
fn flatten_errors(material: Vec<Subtree>) -> Vec<Subtree> {
    let mut out = Vec::with_capacity(material.len());
    for subtree in material {
        if subtree.is_error() && !subtree.is_leaf() {
            out.extend(subtree.children().iter().cloned());
        } else {
            out.push(subtree);
        }
    }
    out
}
