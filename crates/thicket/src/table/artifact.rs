//! Serialized form of a compiled grammar table.
//!
//! An offline grammar compiler writes a [`TableArtifact`] as JSON. This module
//! mirrors that document one-to-one using [`facet`] so it can be read with
//! [`facet_json`], and defines the canonical encoding the artifact checksum is
//! computed over. Nothing here is validated; see [`crate::validate`] and
//! [`GrammarTable::from_artifact`](crate::table::GrammarTable::from_artifact).

use facet::Facet;

use super::TableError;

/// The table layout version this engine reads.
///
/// Artifacts carrying any other `format_version` are rejected at load time.
pub const TABLE_FORMAT_VERSION: u32 = 1;

/// A complete compiled grammar, as written by the grammar compiler.
///
/// Symbol `0` is always the end-of-input terminal. States are indexed from
/// `0`, which is the start state.
#[derive(Debug, Clone, Facet)]
pub struct TableArtifact {
    /// Layout version of this document; must equal [`TABLE_FORMAT_VERSION`].
    pub format_version: u32,

    /// CRC-32 of the canonical encoding of every other field.
    pub checksum: u32,

    /// Short name of the language (e.g. `"yarn_spinner"`).
    pub name: String,

    /// Every grammar symbol, indexed by symbol id.
    pub symbols: Vec<SymbolEntry>,

    /// Field names, indexed by field id.
    #[facet(default)]
    pub fields: Vec<String>,

    /// Lexical rules for internal terminals.
    #[facet(default)]
    pub lex_rules: Vec<LexRuleEntry>,

    /// Patterns for anonymous extras (usually whitespace), skipped as padding.
    #[facet(default)]
    pub skip: Vec<String>,

    /// The word token used for keyword extraction.
    #[facet(default)]
    pub word: Option<u16>,

    /// Terminals recognized by an external scanner, in scanner index order.
    #[facet(default)]
    pub externals: Vec<u16>,

    /// Production rules, indexed by production id.
    pub productions: Vec<ProductionEntry>,

    /// Parse states, indexed by state id.
    pub states: Vec<StateEntry>,
}

/// Metadata for a single grammar symbol.
#[derive(Debug, Clone, Facet)]
pub struct SymbolEntry {
    /// Display name; for anonymous terminals this is the literal text.
    pub name: String,

    /// Whether the symbol is lexed, reduced, or scanned externally.
    pub kind: SymbolKind,

    /// Named symbols appear in s-expressions and named-child queries.
    #[facet(default)]
    pub named: bool,

    /// Hidden non-terminals are spliced into their parent node.
    #[facet(default)]
    pub hidden: bool,

    /// Extras may appear between any two tokens.
    #[facet(default)]
    pub extra: bool,
}

/// The role a symbol plays in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum SymbolKind {
    /// A token produced by the internal lexer.
    #[facet(rename = "terminal")]
    Terminal,
    /// A symbol produced by reductions.
    #[facet(rename = "non_terminal")]
    NonTerminal,
    /// A token produced by the external scanner.
    #[facet(rename = "external")]
    External,
}

/// A lexical rule: exactly one of `literal` or `pattern` is set.
#[derive(Debug, Clone, Facet)]
pub struct LexRuleEntry {
    /// The terminal this rule produces.
    pub symbol: u16,

    /// Exact text to match.
    #[facet(default)]
    pub literal: Option<String>,

    /// Regular expression to match.
    #[facet(default)]
    pub pattern: Option<String>,

    /// Lexical precedence; higher wins over longer matches.
    #[facet(default)]
    pub precedence: i32,
}

/// A production `lhs -> child_count symbols`.
#[derive(Debug, Clone, Facet)]
pub struct ProductionEntry {
    /// The non-terminal being produced.
    pub lhs: u16,

    /// Number of non-extra children popped on reduction.
    pub child_count: u16,

    /// Precedence used to resolve conflicts involving this production.
    #[facet(default)]
    pub precedence: i32,

    /// Associativity used to break shift/reduce ties at equal precedence.
    #[facet(default)]
    pub associativity: Associativity,

    /// Field names attached to structural children.
    #[facet(default)]
    pub fields: Vec<ChildField>,

    /// Aliases renaming structural children.
    #[facet(default)]
    pub aliases: Vec<ChildAlias>,
}

/// Associativity of a production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Facet)]
#[repr(u8)]
pub enum Associativity {
    /// No associativity; shift/reduce ties prefer shifting.
    #[default]
    #[facet(rename = "none")]
    None,
    /// Left associative; ties reduce.
    #[facet(rename = "left")]
    Left,
    /// Right associative; ties shift.
    #[facet(rename = "right")]
    Right,
}

/// Attaches a field to a structural child of a production.
#[derive(Debug, Clone, Facet)]
pub struct ChildField {
    /// Structural child index (extras excluded).
    pub child: u16,
    /// Field id.
    pub field: u16,
}

/// Renames a structural child of a production.
#[derive(Debug, Clone, Facet)]
pub struct ChildAlias {
    /// Structural child index (extras excluded).
    pub child: u16,
    /// Symbol the child is presented as.
    pub symbol: u16,
}

/// One parse state: its actions on terminals and gotos on non-terminals.
#[derive(Debug, Clone, Default, Facet)]
pub struct StateEntry {
    /// Actions keyed by lookahead terminal. Several entries for one symbol
    /// form a conflicting cell that is resolved by precedence at load time.
    #[facet(default)]
    pub actions: Vec<ActionEntry>,

    /// Successor states after reducing to a non-terminal.
    #[facet(default)]
    pub gotos: Vec<GotoEntry>,
}

/// A single parse action.
#[derive(Debug, Clone, Facet)]
pub struct ActionEntry {
    /// Lookahead terminal.
    pub symbol: u16,

    /// What to do.
    pub action: ActionKind,

    /// Shift target state or reduce production id; unused for accept.
    #[facet(default)]
    pub target: u16,

    /// Precedence of a shift, compared against competing reductions.
    #[facet(default)]
    pub precedence: i32,
}

/// The kind of a parse action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum ActionKind {
    /// Push the lookahead and move to `target`.
    #[facet(rename = "shift")]
    Shift,
    /// Reduce by production `target`.
    #[facet(rename = "reduce")]
    Reduce,
    /// Finish the parse.
    #[facet(rename = "accept")]
    Accept,
}

/// A goto transition.
#[derive(Debug, Clone, Facet)]
pub struct GotoEntry {
    /// Non-terminal that was just reduced.
    pub symbol: u16,
    /// Successor state.
    pub state: u16,
}

/// Parse a JSON table artifact into its strongly typed mirror.
///
/// # Errors
///
/// Returns [`TableError::Json`] if the document is not valid JSON or does not
/// match the artifact schema.
pub fn parse_artifact(json: &str) -> Result<TableArtifact, TableError> {
    facet_json::from_str(json).map_err(|e| TableError::Json(e.to_string()))
}

impl TableArtifact {
    /// Serializes the artifact to JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        facet_json::to_string(self)
    }

    /// Computes the CRC-32 of the canonical encoding of this artifact.
    ///
    /// The encoding covers every field except `checksum` itself, so it does
    /// not depend on JSON formatting or key order.
    #[must_use]
    pub fn compute_checksum(&self) -> u32 {
        let mut enc = Canonical::default();
        enc.u32(self.format_version);
        enc.str(&self.name);

        enc.len(self.symbols.len());
        for symbol in &self.symbols {
            enc.str(&symbol.name);
            enc.byte(symbol.kind as u8);
            enc.flag(symbol.named);
            enc.flag(symbol.hidden);
            enc.flag(symbol.extra);
        }

        enc.len(self.fields.len());
        for field in &self.fields {
            enc.str(field);
        }

        enc.len(self.lex_rules.len());
        for rule in &self.lex_rules {
            enc.u16(rule.symbol);
            enc.opt_str(rule.literal.as_deref());
            enc.opt_str(rule.pattern.as_deref());
            enc.i32(rule.precedence);
        }

        enc.len(self.skip.len());
        for pattern in &self.skip {
            enc.str(pattern);
        }

        match self.word {
            Some(word) => {
                enc.flag(true);
                enc.u16(word);
            }
            None => enc.flag(false),
        }

        enc.len(self.externals.len());
        for &external in &self.externals {
            enc.u16(external);
        }

        enc.len(self.productions.len());
        for production in &self.productions {
            enc.u16(production.lhs);
            enc.u16(production.child_count);
            enc.i32(production.precedence);
            enc.byte(production.associativity as u8);
            enc.len(production.fields.len());
            for field in &production.fields {
                enc.u16(field.child);
                enc.u16(field.field);
            }
            enc.len(production.aliases.len());
            for alias in &production.aliases {
                enc.u16(alias.child);
                enc.u16(alias.symbol);
            }
        }

        enc.len(self.states.len());
        for state in &self.states {
            enc.len(state.actions.len());
            for action in &state.actions {
                enc.u16(action.symbol);
                enc.byte(action.action as u8);
                enc.u16(action.target);
                enc.i32(action.precedence);
            }
            enc.len(state.gotos.len());
            for goto in &state.gotos {
                enc.u16(goto.symbol);
                enc.u16(goto.state);
            }
        }

        enc.finish()
    }

    /// Recomputes and stores the checksum.
    pub fn stamp_checksum(&mut self) {
        self.checksum = self.compute_checksum();
    }
}

#[derive(Default)]
struct Canonical(crc32fast::Hasher);

impl Canonical {
    fn byte(&mut self, v: u8) {
        self.0.update(&[v]);
    }

    fn flag(&mut self, v: bool) {
        self.byte(u8::from(v));
    }

    fn u16(&mut self, v: u16) {
        self.0.update(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.0.update(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.0.update(&v.to_le_bytes());
    }

    fn len(&mut self, n: usize) {
        self.0.update(&(n as u64).to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.len(s.len());
        self.0.update(s.as_bytes());
    }

    fn opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.flag(true);
                self.str(s);
            }
            None => self.flag(false),
        }
    }

    fn finish(self) -> u32 {
        self.0.finalize()
    }
}
