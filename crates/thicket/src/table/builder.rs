//! Programmatic construction of table artifacts.
//!
//! The grammar compiler is a separate tool; [`TableBuilder`] is for writing
//! small tables by hand (tests, demos, embedded mini-languages) without
//! spelling out the JSON. The result is an ordinary [`TableArtifact`] with its
//! checksum stamped.

use super::{
    ActionEntry, ActionKind, Associativity, ChildAlias, ChildField, FieldId, GotoEntry,
    GrammarTable, LexRuleEntry, ProductionEntry, ProductionId, StateEntry, StateId, Symbol,
    SymbolEntry, SymbolKind, TableArtifact, TableError, TABLE_FORMAT_VERSION,
};

/// Incrementally assembles a [`TableArtifact`].
///
/// Symbol `0` (`end`) is created automatically. Non-terminals whose name
/// starts with `_` are hidden.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    artifact: TableArtifact,
}

impl TableBuilder {
    /// Starts an empty table for the named language.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut builder = Self {
            artifact: TableArtifact {
                format_version: TABLE_FORMAT_VERSION,
                checksum: 0,
                name: name.into(),
                symbols: Vec::new(),
                fields: Vec::new(),
                lex_rules: Vec::new(),
                skip: Vec::new(),
                word: None,
                externals: Vec::new(),
                productions: Vec::new(),
                states: Vec::new(),
            },
        };
        builder.push_symbol("end", SymbolKind::Terminal, false, false, false);
        builder
    }

    fn push_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        named: bool,
        hidden: bool,
        extra: bool,
    ) -> Symbol {
        let id = Symbol(u16::try_from(self.artifact.symbols.len()).unwrap_or(u16::MAX));
        self.artifact.symbols.push(SymbolEntry {
            name: name.to_string(),
            kind,
            named,
            hidden,
            extra,
        });
        id
    }

    fn push_lex_rule(&mut self, symbol: Symbol, literal: Option<&str>, pattern: Option<&str>) {
        self.artifact.lex_rules.push(LexRuleEntry {
            symbol: symbol.0,
            literal: literal.map(str::to_string),
            pattern: pattern.map(str::to_string),
            precedence: 0,
        });
    }

    /// Adds an anonymous terminal matching `literal` exactly.
    pub fn terminal_literal(&mut self, literal: &str) -> Symbol {
        let symbol = self.push_symbol(literal, SymbolKind::Terminal, false, false, false);
        self.push_lex_rule(symbol, Some(literal), None);
        symbol
    }

    /// Adds a named terminal matching a regular expression.
    pub fn terminal_pattern(&mut self, name: &str, pattern: &str) -> Symbol {
        let symbol = self.push_symbol(name, SymbolKind::Terminal, true, false, false);
        self.push_lex_rule(symbol, None, Some(pattern));
        symbol
    }

    /// Adds a named extra terminal (a comment, say) matching a pattern.
    pub fn extra_pattern(&mut self, name: &str, pattern: &str) -> Symbol {
        let symbol = self.push_symbol(name, SymbolKind::Terminal, true, false, true);
        self.push_lex_rule(symbol, None, Some(pattern));
        symbol
    }

    /// Adds a named terminal produced by the external scanner. Externals are
    /// numbered for the scanner in the order they are added.
    pub fn external(&mut self, name: &str) -> Symbol {
        let symbol = self.push_symbol(name, SymbolKind::External, true, false, false);
        self.artifact.externals.push(symbol.0);
        symbol
    }

    /// Adds a non-terminal.
    pub fn non_terminal(&mut self, name: &str) -> Symbol {
        let hidden = name.starts_with('_');
        self.push_symbol(name, SymbolKind::NonTerminal, true, hidden, false)
    }

    /// Adds a pattern skipped as padding between tokens.
    pub fn skip(&mut self, pattern: &str) -> &mut Self {
        self.artifact.skip.push(pattern.to_string());
        self
    }

    /// Declares the word token used for keyword extraction.
    pub fn word(&mut self, symbol: Symbol) -> &mut Self {
        self.artifact.word = Some(symbol.0);
        self
    }

    /// Sets the lexical precedence of every rule producing `symbol`.
    pub fn lex_precedence(&mut self, symbol: Symbol, precedence: i32) -> &mut Self {
        for rule in &mut self.artifact.lex_rules {
            if rule.symbol == symbol.0 {
                rule.precedence = precedence;
            }
        }
        self
    }

    /// Adds a field name.
    pub fn field(&mut self, name: &str) -> FieldId {
        let id = FieldId(u16::try_from(self.artifact.fields.len()).unwrap_or(u16::MAX));
        self.artifact.fields.push(name.to_string());
        id
    }

    /// Adds a production `lhs -> child_count symbols`.
    pub fn production(&mut self, lhs: Symbol, child_count: u16) -> ProductionBuilder<'_> {
        self.artifact.productions.push(ProductionEntry {
            lhs: lhs.0,
            child_count,
            precedence: 0,
            associativity: Associativity::None,
            fields: Vec::new(),
            aliases: Vec::new(),
        });
        let index = self.artifact.productions.len() - 1;
        ProductionBuilder {
            builder: self,
            index,
        }
    }

    /// Adds an empty parse state.
    pub fn state(&mut self) -> StateId {
        let id = StateId(u16::try_from(self.artifact.states.len()).unwrap_or(u16::MAX));
        self.artifact.states.push(StateEntry::default());
        id
    }

    fn state_mut(&mut self, state: StateId) -> &mut StateEntry {
        let index = state.index();
        if index >= self.artifact.states.len() {
            self.artifact
                .states
                .resize_with(index + 1, StateEntry::default);
        }
        &mut self.artifact.states[index]
    }

    fn push_action(
        &mut self,
        state: StateId,
        symbol: Symbol,
        action: ActionKind,
        target: u16,
        precedence: i32,
    ) {
        self.state_mut(state).actions.push(ActionEntry {
            symbol: symbol.0,
            action,
            target,
            precedence,
        });
    }

    /// Shifts `symbol` in `state`, moving to `target`.
    pub fn shift(&mut self, state: StateId, symbol: Symbol, target: StateId) -> &mut Self {
        self.push_action(state, symbol, ActionKind::Shift, target.0, 0);
        self
    }

    /// Shifts with an explicit precedence, for resolving conflicts against
    /// reductions in the same cell.
    pub fn shift_with_precedence(
        &mut self,
        state: StateId,
        symbol: Symbol,
        target: StateId,
        precedence: i32,
    ) -> &mut Self {
        self.push_action(state, symbol, ActionKind::Shift, target.0, precedence);
        self
    }

    /// Reduces by `production` in `state` on each of `lookaheads`.
    pub fn reduce(
        &mut self,
        state: StateId,
        lookaheads: &[Symbol],
        production: ProductionId,
    ) -> &mut Self {
        for &symbol in lookaheads {
            self.push_action(state, symbol, ActionKind::Reduce, production.0, 0);
        }
        self
    }

    /// Accepts on end of input in `state`.
    pub fn accept(&mut self, state: StateId) -> &mut Self {
        self.push_action(state, Symbol::END, ActionKind::Accept, 0, 0);
        self
    }

    /// Adds a goto from `state` on non-terminal `symbol`.
    pub fn goto(&mut self, state: StateId, symbol: Symbol, target: StateId) -> &mut Self {
        self.state_mut(state).gotos.push(GotoEntry {
            symbol: symbol.0,
            state: target.0,
        });
        self
    }

    /// Returns the finished artifact with its checksum stamped.
    #[must_use]
    pub fn build(&self) -> TableArtifact {
        let mut artifact = self.artifact.clone();
        artifact.stamp_checksum();
        artifact
    }

    /// Builds and loads the table.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if the assembled table fails validation or a
    /// pattern does not compile.
    pub fn into_table(self) -> Result<GrammarTable, TableError> {
        let mut artifact = self.artifact;
        artifact.stamp_checksum();
        GrammarTable::from_artifact(artifact)
    }
}

/// Annotates the production just added by [`TableBuilder::production`].
#[derive(Debug)]
pub struct ProductionBuilder<'b> {
    builder: &'b mut TableBuilder,
    index: usize,
}

impl ProductionBuilder<'_> {
    fn entry(&mut self) -> &mut ProductionEntry {
        &mut self.builder.artifact.productions[self.index]
    }

    /// Sets the conflict-resolution precedence.
    #[must_use]
    pub fn precedence(mut self, precedence: i32) -> Self {
        self.entry().precedence = precedence;
        self
    }

    /// Marks the production left associative.
    #[must_use]
    pub fn left(mut self) -> Self {
        self.entry().associativity = Associativity::Left;
        self
    }

    /// Marks the production right associative.
    #[must_use]
    pub fn right(mut self) -> Self {
        self.entry().associativity = Associativity::Right;
        self
    }

    /// Attaches `field` to structural child `child`.
    #[must_use]
    pub fn field(mut self, child: u16, field: FieldId) -> Self {
        self.entry().fields.push(ChildField {
            child,
            field: field.0,
        });
        self
    }

    /// Presents structural child `child` as `symbol`.
    #[must_use]
    pub fn alias(mut self, child: u16, symbol: Symbol) -> Self {
        self.entry().aliases.push(ChildAlias {
            child,
            symbol: symbol.0,
        });
        self
    }

    /// The id of the production.
    #[must_use]
    pub fn id(self) -> ProductionId {
        ProductionId(u16::try_from(self.index).unwrap_or(u16::MAX))
    }
}
