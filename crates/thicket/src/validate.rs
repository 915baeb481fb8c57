//! Validation routines for compiled grammar tables.
//!
//! This module performs structural checks over a parsed
//! [`TableArtifact`](crate::table::TableArtifact), such as verifying that every
//! symbol, state, production and field reference is in range, that actions sit
//! on terminals and gotos on non-terminals, and that the built-in end symbol is
//! where the engine expects it. Unreachable states and conflicts that fall back
//! to default resolution are reported as warnings.

use std::collections::HashSet;

use crate::table::{ActionKind, Associativity, SymbolKind, TableArtifact};

/// Represents a validation failure encountered when checking a table.
///
/// Validation errors indicate issues such as dangling symbol references,
/// out-of-range shift targets, or symbols used in the wrong role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The descriptive human-readable error message.
    pub message: String,
}

impl ValidationError {
    /// Creates a new [`ValidationError`] from a message string.
    fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Performs semantic validation of a parsed [`TableArtifact`].
///
/// This function runs several consistency passes over the table:
///
/// - Checks the built-in end symbol and the presence of a start state.
/// - Checks that symbol, field, production and state references resolve.
/// - Checks that lexical rules are well formed.
/// - Warns about states unreachable from the start state.
/// - Warns about conflicts left to default resolution.
///
/// # Errors
///
/// Returns a [`ValidationError`] if any structural violation is detected.
pub fn validate(table: &TableArtifact) -> Result<(), ValidationError> {
    check_builtins(table)?;

    check_symbol_roles(table)?;

    check_lex_rules(table)?;

    check_productions(table)?;

    check_states(table)?;

    check_unreachable_states(table);

    check_precedence(table);

    Ok(())
}

fn kind_of(
    table: &TableArtifact,
    symbol: u16,
    context: &str,
) -> Result<SymbolKind, ValidationError> {
    table
        .symbols
        .get(usize::from(symbol))
        .map(|s| s.kind)
        .ok_or_else(|| {
            ValidationError::new(format!("undefined symbol {symbol} referenced in {context}"))
        })
}

fn check_builtins(table: &TableArtifact) -> Result<(), ValidationError> {
    let end = table
        .symbols
        .first()
        .ok_or_else(|| ValidationError::new("table has no symbols"))?;
    if end.kind != SymbolKind::Terminal || end.name != "end" {
        return Err(ValidationError::new("symbol 0 must be the terminal 'end'"));
    }
    if table.symbols.len() >= usize::from(u16::MAX) {
        return Err(ValidationError::new("too many symbols"));
    }
    if table.states.is_empty() {
        return Err(ValidationError::new("table has no start state"));
    }
    Ok(())
}

fn check_symbol_roles(table: &TableArtifact) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for &external in &table.externals {
        if kind_of(table, external, "externals")? != SymbolKind::External {
            return Err(ValidationError::new(format!(
                "external token list names non-external symbol '{}'",
                table.symbols[usize::from(external)].name
            )));
        }
        if !seen.insert(external) {
            return Err(ValidationError::new(format!(
                "external symbol {external} listed twice"
            )));
        }
    }
    for (index, symbol) in table.symbols.iter().enumerate() {
        let listed = u16::try_from(index).is_ok_and(|i| seen.contains(&i));
        if symbol.kind == SymbolKind::External && !listed {
            return Err(ValidationError::new(format!(
                "external symbol '{}' is missing from the external token list",
                symbol.name
            )));
        }
        if symbol.extra && symbol.kind == SymbolKind::NonTerminal {
            return Err(ValidationError::new(format!(
                "non-terminal '{}' cannot be an extra",
                symbol.name
            )));
        }
    }
    Ok(())
}

fn check_lex_rules(table: &TableArtifact) -> Result<(), ValidationError> {
    for rule in &table.lex_rules {
        if kind_of(table, rule.symbol, "lex rules")? != SymbolKind::Terminal || rule.symbol == 0 {
            return Err(ValidationError::new(format!(
                "lex rule for '{}' does not produce a lexable terminal",
                table.symbols[usize::from(rule.symbol)].name
            )));
        }
        if rule.literal.is_some() == rule.pattern.is_some() {
            return Err(ValidationError::new(format!(
                "lex rule for '{}' must have exactly one of literal or pattern",
                table.symbols[usize::from(rule.symbol)].name
            )));
        }
        if rule.literal.as_deref() == Some("") {
            return Err(ValidationError::new(format!(
                "lex rule for '{}' has an empty literal",
                table.symbols[usize::from(rule.symbol)].name
            )));
        }
    }

    if let Some(word) = table.word {
        let has_pattern = table
            .lex_rules
            .iter()
            .any(|r| r.symbol == word && r.pattern.is_some());
        if !has_pattern {
            return Err(ValidationError::new(format!(
                "word token {word} has no pattern rule"
            )));
        }
    }
    Ok(())
}

fn check_productions(table: &TableArtifact) -> Result<(), ValidationError> {
    for (id, production) in table.productions.iter().enumerate() {
        let context = format!("production {id}");
        if kind_of(table, production.lhs, &context)? != SymbolKind::NonTerminal {
            return Err(ValidationError::new(format!(
                "{context} has a terminal on its left-hand side"
            )));
        }
        for field in &production.fields {
            if field.child >= production.child_count {
                return Err(ValidationError::new(format!(
                    "{context} attaches a field to missing child {}",
                    field.child
                )));
            }
            if usize::from(field.field) >= table.fields.len() {
                return Err(ValidationError::new(format!(
                    "{context} references undefined field {}",
                    field.field
                )));
            }
        }
        for alias in &production.aliases {
            if alias.child >= production.child_count {
                return Err(ValidationError::new(format!(
                    "{context} aliases missing child {}",
                    alias.child
                )));
            }
            kind_of(table, alias.symbol, &context)?;
        }
    }
    Ok(())
}

fn check_states(table: &TableArtifact) -> Result<(), ValidationError> {
    let state_count = table.states.len();
    for (id, state) in table.states.iter().enumerate() {
        let context = format!("state {id}");
        for action in &state.actions {
            if kind_of(table, action.symbol, &context)? == SymbolKind::NonTerminal {
                return Err(ValidationError::new(format!(
                    "{context} has an action on non-terminal '{}'",
                    table.symbols[usize::from(action.symbol)].name
                )));
            }
            match action.action {
                ActionKind::Shift if usize::from(action.target) >= state_count => {
                    return Err(ValidationError::new(format!(
                        "{context} shifts to undefined state {}",
                        action.target
                    )));
                }
                ActionKind::Reduce if usize::from(action.target) >= table.productions.len() => {
                    return Err(ValidationError::new(format!(
                        "{context} reduces by undefined production {}",
                        action.target
                    )));
                }
                _ => {}
            }
        }

        let mut targets = HashSet::new();
        for goto in &state.gotos {
            if kind_of(table, goto.symbol, &context)? != SymbolKind::NonTerminal {
                return Err(ValidationError::new(format!(
                    "{context} has a goto on terminal '{}'",
                    table.symbols[usize::from(goto.symbol)].name
                )));
            }
            if usize::from(goto.state) >= state_count {
                return Err(ValidationError::new(format!(
                    "{context} has a goto to undefined state {}",
                    goto.state
                )));
            }
            if !targets.insert(goto.symbol) {
                return Err(ValidationError::new(format!(
                    "{context} has two gotos on '{}'",
                    table.symbols[usize::from(goto.symbol)].name
                )));
            }
        }
    }
    Ok(())
}

fn check_unreachable_states(table: &TableArtifact) {
    let mut reachable = HashSet::new();
    let mut to_visit = vec![0u16];

    while let Some(id) = to_visit.pop() {
        if !reachable.insert(id) {
            continue; // Already visited
        }
        let Some(state) = table.states.get(usize::from(id)) else {
            continue;
        };
        to_visit.extend(
            state
                .actions
                .iter()
                .filter(|a| a.action == ActionKind::Shift)
                .map(|a| a.target),
        );
        to_visit.extend(state.gotos.iter().map(|g| g.state));
    }

    for id in 0..table.states.len() {
        if !u16::try_from(id).is_ok_and(|id| reachable.contains(&id)) {
            tracing::warn!(table = %table.name, state = id, "unreachable parse state");
        }
    }
}

fn check_precedence(table: &TableArtifact) {
    // Cells with several actions are resolved at load time; flag the ones
    // where nothing but the default tie-breaks decides.
    for (id, state) in table.states.iter().enumerate() {
        let mut symbols: Vec<u16> = state.actions.iter().map(|a| a.symbol).collect();
        symbols.sort_unstable();
        symbols.dedup();

        for symbol in symbols {
            let cell: Vec<_> = state.actions.iter().filter(|a| a.symbol == symbol).collect();
            if cell.len() < 2 {
                continue;
            }
            let reduces: Vec<_> = cell
                .iter()
                .filter(|a| a.action == ActionKind::Reduce)
                .filter_map(|a| table.productions.get(usize::from(a.target)))
                .collect();
            let best = reduces.iter().map(|p| p.precedence).max();
            let tied_reduces = best.is_some_and(|best| {
                reduces.iter().filter(|p| p.precedence == best).count() > 1
            });
            let unresolved_shift = cell.iter().any(|a| {
                a.action == ActionKind::Shift
                    && reduces.iter().any(|p| {
                        p.precedence == a.precedence && p.associativity == Associativity::None
                    })
            });
            if tied_reduces || unresolved_shift {
                tracing::warn!(
                    table = %table.name,
                    state = id,
                    symbol = %table.symbols[usize::from(symbol)].name,
                    "conflict resolved by default tie-breaking"
                );
            }
        }
    }
}
