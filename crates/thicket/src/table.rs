//! Runtime grammar tables.
//!
//! A [`GrammarTable`] is the validated, immutable form of a
//! [`TableArtifact`]: symbol metadata, productions, the LR action/goto table
//! with every conflicting cell already resolved, and the compiled lexical
//! automata. Tables are shared read-only between parsers, typically behind a
//! [`Language`](crate::Language).

mod artifact;
mod builder;
pub mod resolve;

use std::fmt;
use std::path::Path;

pub use artifact::{
    parse_artifact, ActionEntry, ActionKind, Associativity, ChildAlias, ChildField, GotoEntry,
    LexRuleEntry, ProductionEntry, StateEntry, SymbolEntry, SymbolKind, TableArtifact,
    TABLE_FORMAT_VERSION,
};
pub use builder::{ProductionBuilder, TableBuilder};

use crate::lexer::dfa::LexAutomaton;
use crate::validate::{validate, ValidationError};

/// A grammar symbol id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub u16);

impl Symbol {
    /// The end-of-input terminal.
    pub const END: Self = Self(0);
    /// The built-in error symbol. It never appears in a table.
    pub const ERROR: Self = Self(u16::MAX);

    /// Index into per-symbol tables.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// A parse state id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u16);

impl StateId {
    /// The state every parse begins in.
    pub const START: Self = Self(0);

    /// Index into the state table.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// A production id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(pub u16);

impl ProductionId {
    /// Index into the production table.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// A field id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub u16);

impl FieldId {
    /// Index into the field name table.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Errors that can occur while loading a grammar table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The artifact could not be read from disk.
    #[error("failed to read table: {0}")]
    Io(#[from] std::io::Error),

    /// The artifact is not valid JSON or does not match the schema.
    #[error("malformed table JSON: {0}")]
    Json(String),

    /// The artifact was written for a different table layout.
    #[error("unsupported table format version {found} (expected {expected})")]
    VersionMismatch {
        /// Version recorded in the artifact.
        found: u32,
        /// Version this engine reads.
        expected: u32,
    },

    /// The stored checksum does not match the artifact contents.
    #[error("table checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum recorded in the artifact.
        stored: u32,
        /// Checksum of the artifact as read.
        computed: u32,
    },

    /// A lexical pattern failed to compile.
    #[error("invalid pattern for '{symbol}': {message}")]
    Pattern {
        /// Name of the symbol (or `"skip"`) the pattern belongs to.
        symbol: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// The artifact failed structural validation.
    #[error("invalid table: {0}")]
    Invalid(#[from] ValidationError),
}

/// Display and tree-shaping properties of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMetadata {
    /// Display name.
    pub name: String,
    /// Role of the symbol.
    pub kind: SymbolKind,
    /// Whether the symbol is named.
    pub named: bool,
    /// Whether nodes of this symbol are kept in the tree.
    pub visible: bool,
    /// Whether the symbol may appear anywhere as an extra.
    pub extra: bool,
}

/// A production rule with its tree-shaping annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    /// Non-terminal produced.
    pub lhs: Symbol,
    /// Number of non-extra children consumed.
    pub child_count: usize,
    /// Conflict-resolution precedence.
    pub precedence: i32,
    /// Conflict-resolution associativity.
    pub associativity: Associativity,
    fields: Vec<(usize, FieldId)>,
    aliases: Vec<(usize, Symbol)>,
}

impl Production {
    /// Field attached to the structural child at `child`, if any.
    #[must_use]
    pub fn field_for(&self, child: usize) -> Option<FieldId> {
        self.fields
            .iter()
            .find_map(|&(index, field)| (index == child).then_some(field))
    }

    /// Alias applied to the structural child at `child`, if any.
    #[must_use]
    pub fn alias_for(&self, child: usize) -> Option<Symbol> {
        self.aliases
            .iter()
            .find_map(|&(index, symbol)| (index == child).then_some(symbol))
    }

    /// Whether any child carries a field.
    #[must_use]
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// A parse action after conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAction {
    /// Push the lookahead and move to `state`.
    Shift {
        /// Successor state.
        state: StateId,
        /// Precedence of the shifted token in this context.
        precedence: i32,
    },
    /// Reduce by a production.
    Reduce {
        /// Production to reduce by.
        production: ProductionId,
    },
    /// Finish the parse.
    Accept,
}

#[derive(Debug)]
struct ActionCell {
    symbol: Symbol,
    actions: Vec<ParseAction>,
    resolved: ParseAction,
}

#[derive(Debug, Default)]
struct ParseState {
    cells: Vec<ActionCell>,
    gotos: Vec<(Symbol, StateId)>,
}

/// A loaded, validated grammar table.
pub struct GrammarTable {
    name: String,
    checksum: u32,
    symbols: Vec<SymbolMetadata>,
    fields: Vec<String>,
    productions: Vec<Production>,
    states: Vec<ParseState>,
    externals: Vec<Symbol>,
    lexer: LexAutomaton,
}

impl fmt::Debug for GrammarTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarTable")
            .field("name", &self.name)
            .field("checksum", &format_args!("{:#010x}", self.checksum))
            .field("symbols", &self.symbols.len())
            .field("productions", &self.productions.len())
            .field("states", &self.states.len())
            .finish_non_exhaustive()
    }
}

impl GrammarTable {
    /// Loads a table from its JSON artifact text.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if the JSON is malformed, the version or
    /// checksum does not match, validation fails, or a pattern is invalid.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        Self::from_artifact(parse_artifact(json)?)
    }

    /// Loads a table from a JSON artifact file.
    ///
    /// # Errors
    ///
    /// As [`GrammarTable::from_json`], plus [`TableError::Io`] if the file
    /// cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), name = %table.name, "loaded grammar table");
        Ok(table)
    }

    /// Builds the runtime table from an already-parsed artifact.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if the version or checksum does not match,
    /// validation fails, or a lexical pattern does not compile.
    pub fn from_artifact(artifact: TableArtifact) -> Result<Self, TableError> {
        if artifact.format_version != TABLE_FORMAT_VERSION {
            return Err(TableError::VersionMismatch {
                found: artifact.format_version,
                expected: TABLE_FORMAT_VERSION,
            });
        }
        let computed = artifact.compute_checksum();
        if computed != artifact.checksum {
            return Err(TableError::ChecksumMismatch {
                stored: artifact.checksum,
                computed,
            });
        }

        validate(&artifact)?;

        let lexer = LexAutomaton::build(&artifact)?;

        let symbols = artifact
            .symbols
            .iter()
            .map(|s| SymbolMetadata {
                name: s.name.clone(),
                kind: s.kind,
                named: s.named,
                visible: !s.hidden,
                extra: s.extra,
            })
            .collect();

        let productions: Vec<Production> = artifact
            .productions
            .iter()
            .map(|p| Production {
                lhs: Symbol(p.lhs),
                child_count: usize::from(p.child_count),
                precedence: p.precedence,
                associativity: p.associativity,
                fields: p
                    .fields
                    .iter()
                    .map(|f| (usize::from(f.child), FieldId(f.field)))
                    .collect(),
                aliases: p
                    .aliases
                    .iter()
                    .map(|a| (usize::from(a.child), Symbol(a.symbol)))
                    .collect(),
            })
            .collect();

        let states = artifact
            .states
            .iter()
            .map(|state| build_state(state, &productions))
            .collect();

        Ok(Self {
            name: artifact.name,
            checksum: artifact.checksum,
            symbols,
            fields: artifact.fields,
            productions,
            states,
            externals: artifact.externals.into_iter().map(Symbol).collect(),
            lexer,
        })
    }

    /// Short name of the language.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checksum of the artifact this table was loaded from.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Number of symbols, excluding the built-in error symbol.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Number of parse states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Number of productions.
    #[must_use]
    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    /// Metadata for a symbol; `None` for [`Symbol::ERROR`] and unknown ids.
    #[must_use]
    pub fn symbol_metadata(&self, symbol: Symbol) -> Option<&SymbolMetadata> {
        self.symbols.get(symbol.index())
    }

    /// Display name of a symbol.
    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        if symbol == Symbol::ERROR {
            return "ERROR";
        }
        self.symbol_metadata(symbol).map_or("", |m| m.name.as_str())
    }

    /// Looks a symbol up by display name and namedness.
    #[must_use]
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<Symbol> {
        if named && name == "ERROR" {
            return Some(Symbol::ERROR);
        }
        self.symbols
            .iter()
            .position(|m| m.name == name && m.named == named)
            .and_then(|i| u16::try_from(i).ok())
            .map(Symbol)
    }

    /// Whether the symbol is named. The error symbol is named.
    #[must_use]
    pub fn is_named(&self, symbol: Symbol) -> bool {
        symbol == Symbol::ERROR || self.symbol_metadata(symbol).is_some_and(|m| m.named)
    }

    /// Whether nodes of this symbol are kept in the tree.
    #[must_use]
    pub fn is_visible(&self, symbol: Symbol) -> bool {
        symbol == Symbol::ERROR || self.symbol_metadata(symbol).is_some_and(|m| m.visible)
    }

    /// Whether the symbol is an extra.
    #[must_use]
    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.symbol_metadata(symbol).is_some_and(|m| m.extra)
    }

    /// Whether the symbol is produced by reductions.
    #[must_use]
    pub fn is_non_terminal(&self, symbol: Symbol) -> bool {
        self.symbol_metadata(symbol)
            .is_some_and(|m| m.kind == SymbolKind::NonTerminal)
    }

    /// Name of a field.
    #[must_use]
    pub fn field_name(&self, field: FieldId) -> &str {
        self.fields.get(field.index()).map_or("", String::as_str)
    }

    /// Looks a field up by name.
    #[must_use]
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f == name)
            .and_then(|i| u16::try_from(i).ok())
            .map(FieldId)
    }

    /// A production by id.
    #[must_use]
    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        self.productions.get(id.index())
    }

    /// The resolved action for `symbol` in `state`.
    #[must_use]
    pub fn action(&self, state: StateId, symbol: Symbol) -> Option<ParseAction> {
        self.cell(state, symbol).map(|c| c.resolved)
    }

    /// Every action the table lists for `symbol` in `state`, before
    /// resolution. More than one entry means the cell was a conflict.
    #[must_use]
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction] {
        self.cell(state, symbol).map_or(&[], |c| c.actions.as_slice())
    }

    /// Whether `state` has any action on `symbol`.
    #[must_use]
    pub fn has_action(&self, state: StateId, symbol: Symbol) -> bool {
        self.cell(state, symbol).is_some()
    }

    /// Terminals with an action in `state`, in symbol order.
    pub fn expected_symbols(&self, state: StateId) -> impl Iterator<Item = Symbol> + '_ {
        self.states
            .get(state.index())
            .into_iter()
            .flat_map(|s| s.cells.iter().map(|c| c.symbol))
    }

    /// The successor of `state` after reducing to `symbol`.
    #[must_use]
    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        let gotos = &self.states.get(state.index())?.gotos;
        gotos
            .binary_search_by_key(&symbol, |&(s, _)| s)
            .ok()
            .map(|i| gotos[i].1)
    }

    /// Terminals recognized by the external scanner, in scanner index order.
    #[must_use]
    pub fn externals(&self) -> &[Symbol] {
        &self.externals
    }

    pub(crate) fn lex_automaton(&self) -> &LexAutomaton {
        &self.lexer
    }

    fn cell(&self, state: StateId, symbol: Symbol) -> Option<&ActionCell> {
        let cells = &self.states.get(state.index())?.cells;
        cells
            .binary_search_by_key(&symbol, |c| c.symbol)
            .ok()
            .map(|i| &cells[i])
    }
}

fn build_state(entry: &StateEntry, productions: &[Production]) -> ParseState {
    let mut cells: Vec<ActionCell> = Vec::new();
    let mut actions: Vec<&ActionEntry> = entry.actions.iter().collect();
    actions.sort_by_key(|a| a.symbol);

    for action in actions {
        let symbol = Symbol(action.symbol);
        let parsed = match action.action {
            ActionKind::Shift => ParseAction::Shift {
                state: StateId(action.target),
                precedence: action.precedence,
            },
            ActionKind::Reduce => ParseAction::Reduce {
                production: ProductionId(action.target),
            },
            ActionKind::Accept => ParseAction::Accept,
        };
        match cells.last_mut() {
            Some(cell) if cell.symbol == symbol => cell.actions.push(parsed),
            _ => cells.push(ActionCell {
                symbol,
                actions: vec![parsed],
                resolved: parsed,
            }),
        }
    }

    for cell in &mut cells {
        if cell.actions.len() > 1 {
            if let Some(resolved) = resolve::resolve(&cell.actions, productions) {
                cell.resolved = resolved;
            }
        }
    }

    let mut gotos: Vec<(Symbol, StateId)> = entry
        .gotos
        .iter()
        .map(|g| (Symbol(g.symbol), StateId(g.state)))
        .collect();
    gotos.sort_by_key(|&(s, _)| s);

    ParseState { cells, gotos }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic() -> TableBuilder {
        let mut b = TableBuilder::new("tiny_arith");
        let number = b.terminal_pattern("number", "[0-9]+");
        let plus = b.terminal_literal("+");
        let expr = b.non_terminal("expr");
        let add = b.production(expr, 3).precedence(1).left().id();
        let lit = b.production(expr, 1).id();
        let s0 = b.state();
        let s1 = b.state();
        let s2 = b.state();
        let s3 = b.state();
        let s4 = b.state();
        b.shift(s0, number, s2).goto(s0, expr, s1);
        b.accept(s1).shift_with_precedence(s1, plus, s3, 1);
        b.reduce(s2, &[Symbol::END, plus], lit);
        b.shift(s3, number, s2).goto(s3, expr, s4);
        b.reduce(s4, &[Symbol::END, plus], add)
            .shift_with_precedence(s4, plus, s3, 1);
        b
    }

    #[test]
    fn test_load_from_builder() {
        let table = arithmetic().into_table().unwrap();
        assert_eq!(table.name(), "tiny_arith");
        assert_eq!(table.symbol_name(Symbol::END), "end");
        assert_eq!(table.symbol_name(Symbol::ERROR), "ERROR");
        assert_eq!(table.symbol_for_name("number", true), Some(Symbol(1)));
        assert_eq!(table.symbol_for_name("+", false), Some(Symbol(2)));
        assert_eq!(table.goto(StateId(0), Symbol(3)), Some(StateId(1)));
        assert_eq!(table.goto(StateId(2), Symbol(3)), None);
    }

    #[test]
    fn test_conflicting_cell_is_resolved_at_load() {
        let table = arithmetic().into_table().unwrap();
        let plus = Symbol(2);
        assert_eq!(table.actions(StateId(4), plus).len(), 2);
        assert_eq!(
            table.action(StateId(4), plus),
            Some(ParseAction::Reduce {
                production: ProductionId(0)
            })
        );
    }

    #[test]
    fn test_json_round_trip() {
        let json = arithmetic().build().to_json();
        let table = GrammarTable::from_json(&json).unwrap();
        assert_eq!(table.state_count(), 5);
        assert!(table.has_action(StateId(1), Symbol::END));
        assert!(!table.has_action(StateId(1), Symbol::ERROR));
    }

    #[test]
    fn test_version_and_checksum_checked() {
        let mut artifact = arithmetic().build();
        artifact.format_version = 2;
        assert!(matches!(
            GrammarTable::from_artifact(artifact),
            Err(TableError::VersionMismatch { found: 2, .. })
        ));

        let mut artifact = arithmetic().build();
        artifact.name = "tampered".to_string();
        assert!(matches!(
            GrammarTable::from_artifact(artifact),
            Err(TableError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_pattern_reported_by_symbol() {
        let mut b = TableBuilder::new("bad");
        b.terminal_pattern("broken", "[a-");
        b.state();
        let err = b.into_table().unwrap_err();
        assert!(matches!(err, TableError::Pattern { ref symbol, .. } if symbol == "broken"));
    }
}
