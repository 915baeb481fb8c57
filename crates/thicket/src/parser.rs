//! The table-driven parse engine.
//!
//! [`Parser::parse`] runs a shift/reduce automaton over tokens from the
//! context-aware [`Lexer`]. It never fails: syntax errors are recovered by
//! inserting `MISSING` tokens or wrapping unparseable material in `ERROR`
//! nodes, so the resulting tree always covers the whole text. Given an edited
//! previous tree, unchanged subtrees are reused instead of being rebuilt.

mod recovery;
mod reuse;
mod stack;

use crate::language::Language;
use crate::length::Length;
use crate::lexer::{Lexer, Token};
use crate::table::{FieldId, GrammarTable, ParseAction, ProductionId, StateId, Symbol};
use crate::tree::subtree::{NodeInfo, Subtree};
use crate::tree::Tree;

use recovery::Budget;
use reuse::ReuseCursor;
use stack::Stack;

/// Limits and switches for a [`Parser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Recovery attempts allowed at one input position before the lookahead
    /// is skipped outright.
    pub max_recovery_attempts: usize,
    /// Reductions allowed in a row without a shift before the parser treats
    /// the table as stuck and recovers.
    pub max_consecutive_reductions: usize,
    /// Whether subtrees of a previous tree may be reused.
    pub reuse_subtrees: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_recovery_attempts: 8,
            max_consecutive_reductions: 10_000,
            reuse_subtrees: true,
        }
    }
}

/// Parses text into [`Tree`]s for one language.
#[derive(Debug, Clone)]
pub struct Parser {
    language: Language,
    options: ParseOptions,
}

impl Parser {
    /// Creates a parser with default options.
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self::with_options(language, ParseOptions::default())
    }

    /// Creates a parser with explicit options.
    #[must_use]
    pub fn with_options(language: Language, options: ParseOptions) -> Self {
        Self { language, options }
    }

    /// The language this parser parses.
    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// The parser's options.
    #[must_use]
    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Parses `text`.
    ///
    /// If `old_tree` is the previous tree for this text, already adjusted
    /// with [`Tree::edit`] for every change since, its unchanged subtrees are
    /// reused. The result is the same tree a fresh parse would produce.
    /// An old tree whose length does not match `text`, or that was parsed
    /// with a different table, is ignored.
    #[must_use]
    pub fn parse(&self, text: &str, old_tree: Option<&Tree>) -> Tree {
        let old_root = old_tree
            .filter(|_| self.options.reuse_subtrees)
            .filter(|old| {
                let usable = old.len() == text.len() && old.language().same_table(&self.language);
                if !usable {
                    tracing::debug!(
                        old_len = old.len(),
                        len = text.len(),
                        "previous tree does not match the text; parsing from scratch"
                    );
                }
                usable
            })
            .map(Tree::root);
        let root = Run::new(&self.language, self.options, text, old_root).run();
        Tree::new(root, self.language.clone())
    }
}

/// State of one parse.
struct Run<'a> {
    table: &'a GrammarTable,
    options: ParseOptions,
    text: &'a str,
    lexer: Lexer<'a>,
    stack: Stack,
    reuse: Option<ReuseCursor<'a>>,
    lookahead: Token,
    /// A terminal chosen by recovery, shifted as `MISSING` before the
    /// lookahead.
    insert: Option<Symbol>,
    reductions: usize,
    budget: Budget,
}

impl<'a> Run<'a> {
    fn new(
        language: &'a Language,
        options: ParseOptions,
        text: &'a str,
        old_root: Option<&'a Subtree>,
    ) -> Self {
        let mut lexer = Lexer::new(language, text);
        let lookahead = lexer.lex(Length::ZERO, Some(StateId::START));
        Self {
            table: language.table(),
            options,
            text,
            lexer,
            stack: Stack::default(),
            reuse: old_root.map(ReuseCursor::new),
            lookahead,
            insert: None,
            reductions: 0,
            budget: Budget::default(),
        }
    }

    fn run(mut self) -> Subtree {
        loop {
            if self.insert.is_none() && self.lookahead.is_extra {
                self.shift_extra();
                continue;
            }
            if self.insert.is_none() && self.reuse.is_some() && self.try_reuse() {
                continue;
            }

            let state = self.stack.state();
            let symbol = self.insert.unwrap_or(self.lookahead.symbol);
            let action = if self.reductions > self.options.max_consecutive_reductions {
                tracing::debug!(reductions = self.reductions, "reduction limit reached");
                None
            } else {
                self.table.action(state, symbol)
            };

            match action {
                Some(ParseAction::Shift { state: next, .. }) => self.shift(state, next),
                Some(ParseAction::Reduce { production }) => {
                    if self.reduce(production, symbol) {
                        self.reductions += 1;
                    } else if let Some(root) = self.recover() {
                        return root;
                    }
                }
                Some(ParseAction::Accept) => return self.accept(),
                None => {
                    if let Some(root) = self.recover() {
                        return root;
                    }
                }
            }
        }
    }

    /// Lexes the token after the current lookahead in the current state.
    fn advance(&mut self) {
        let state = self.stack.state();
        self.lookahead = self.lexer.lex(self.lookahead.end, Some(state));
    }

    fn shift(&mut self, state: StateId, next: StateId) {
        self.reductions = 0;
        if let Some(symbol) = self.insert.take() {
            tracing::trace!(
                symbol = self.table.symbol_name(symbol),
                state = next.0,
                "shift missing"
            );
            let leaf = Subtree::missing(symbol, state, next, self.table);
            self.stack.push(next, leaf);
            return;
        }
        tracing::trace!(
            symbol = self.table.symbol_name(self.lookahead.symbol),
            start = self.lookahead.start.bytes,
            state = next.0,
            "shift"
        );
        let leaf = Subtree::leaf(&self.lookahead, state, next, self.table);
        self.stack.push(next, leaf);
        self.advance();
    }

    fn shift_extra(&mut self) {
        let state = self.stack.state();
        let leaf = Subtree::leaf(&self.lookahead, state, state, self.table);
        self.stack.push(state, leaf);
        self.advance();
    }

    /// Reduces by `id` with `lookahead` as the triggering symbol. Returns
    /// `false`, leaving the stack untouched, if the table cannot support the
    /// reduction here.
    fn reduce(&mut self, id: ProductionId, lookahead: Symbol) -> bool {
        let table = self.table;
        let Some(production) = table.production(id) else {
            return false;
        };
        let trailing = self.stack.pop_extras();
        let start = self.stack.children_start(production.child_count);
        let next = start.and_then(|s| table.goto(self.stack.state_at(s), production.lhs));
        let (Some(start), Some(next)) = (start, next) else {
            let state = self.stack.state();
            for extra in trailing {
                self.stack.push(state, extra);
            }
            return false;
        };
        let parse_state = self.stack.state_at(start);
        let popped = self.stack.split_off(start);

        let mut children = Vec::with_capacity(popped.len());
        let mut fields: Vec<Option<FieldId>> = Vec::with_capacity(popped.len());
        let mut index = 0;
        for child in popped {
            if child.is_extra() {
                children.push(child);
                fields.push(None);
                continue;
            }
            let field = production.field_for(index);
            let child = match production.alias_for(index) {
                Some(alias) => child.aliased(alias, table),
                None => child,
            };
            index += 1;
            if child.is_visible() || child.is_leaf() {
                children.push(child);
                fields.push(field);
            } else {
                // Hidden rules dissolve into their parent; a field on the
                // hidden child applies to each of its structural children.
                for (i, grandchild) in child.children().iter().enumerate() {
                    let inherited = field.filter(|_| !grandchild.is_extra());
                    fields.push(child.field_at(i).or(inherited));
                    children.push(grandchild.clone());
                }
            }
        }

        tracing::trace!(
            symbol = table.symbol_name(production.lhs),
            children = children.len(),
            state = next.0,
            "reduce"
        );
        let node = Subtree::node(
            production.lhs,
            children,
            fields,
            NodeInfo {
                production: Some(id),
                parse_state,
                reduced_with: lookahead,
            },
            table,
        );
        self.stack.push(next, node);
        for extra in trailing {
            self.stack.push(next, extra);
        }
        true
    }

    /// Builds the root from the accepted stack: extras around the start
    /// symbol's node become its children.
    fn accept(self) -> Subtree {
        let table = self.table;
        let text = self.text;
        let entries = self.stack.into_subtrees();
        let Some(at) = entries.iter().position(|s| !s.is_extra()) else {
            return finish(Subtree::error(entries, StateId::START, table), text);
        };
        let root = entries[at].clone();
        if entries.len() == 1 {
            return finish(root, text);
        }

        let mut children = Vec::with_capacity(entries.len() + root.children().len());
        let mut fields = Vec::with_capacity(children.capacity());
        for (i, subtree) in entries.into_iter().enumerate() {
            if i == at {
                for (j, child) in root.children().iter().enumerate() {
                    children.push(child.clone());
                    fields.push(root.field_at(j));
                }
            } else {
                children.push(subtree);
                fields.push(None);
            }
        }
        finish(root.with_children(children, fields, table), text)
    }
}

/// Stretches the root over the trailing padding so it spans the whole text.
fn finish(root: Subtree, text: &str) -> Subtree {
    let total = Length::of(text.as_bytes());
    if root.total() == total {
        root
    } else {
        root.with_size(total - root.padding())
    }
}
