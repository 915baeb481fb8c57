//! A table-driven incremental parser producing concrete syntax trees.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// Byte and row/column arithmetic.
///
/// Every position in a tree is derived by summing relative lengths, which is
/// what allows edited trees to share unchanged subtrees.
pub mod length;

/// Grammar tables: the compiled artifact, its loader and builder.
///
/// A table is produced offline by a grammar compiler and loaded here with
/// version and checksum checks. Conflicting table cells are settled once, at
/// load time, by the rules in [`table::resolve`].
pub mod table;

/// Grammar table validation and consistency checking utilities.
///
/// Validation exists to protect the parse engine from malformed tables. It
/// rejects dangling references and misplaced symbols before a single token is
/// lexed, so the engine can index the table without further checks.
pub mod validate;

/// Tokenization, including external scanners.
pub mod lexer;

/// A grammar table bundled with its external scanner.
pub mod language;

/// Syntax trees, nodes, cursors and edits.
pub mod tree;

/// The shift/reduce parse engine with error recovery and subtree reuse.
pub mod parser;

/// Editable documents that keep their tree up to date incrementally.
pub mod document;

pub use document::{Document, DocumentState};
pub use language::Language;
pub use length::{Length, Point};
pub use lexer::{ExternalScanner, IndentScanner, Lexer, ScanCursor, Token};
pub use parser::{ParseOptions, Parser};
pub use table::{GrammarTable, StateId, Symbol, TableBuilder, TableError};
pub use tree::{EditError, InputEdit, Node, Tree, TreeCursor};
pub use validate::{validate, ValidationError};
