//! Deterministic resolution of conflicting table cells.
//!
//! A cell lists every action the grammar compiler could not rule out. The
//! decision made here is a pure function of the cell and the productions
//! involved, so a table always parses a given input the same way:
//!
//! 1. An accept action wins outright.
//! 2. Among reductions, the production with the highest precedence wins;
//!    ties go to the lowest production id.
//! 3. A shift competing with that reduction compares its own precedence with
//!    the production's. At equal precedence, a left-associative production
//!    reduces, while right-associative and non-associative ones shift.

use std::cmp::Ordering;

use super::{Associativity, ParseAction, Production, ProductionId};

/// Picks the single action to take from a (possibly conflicting) cell.
///
/// Returns `None` only for an empty cell.
#[must_use]
pub fn resolve(actions: &[ParseAction], productions: &[Production]) -> Option<ParseAction> {
    if actions.contains(&ParseAction::Accept) {
        return Some(ParseAction::Accept);
    }

    let precedence_of =
        |id: ProductionId| productions.get(id.index()).map_or(0, |p| p.precedence);

    let shift = actions
        .iter()
        .copied()
        .find(|a| matches!(a, ParseAction::Shift { .. }));

    let reduce = actions
        .iter()
        .filter_map(|a| match *a {
            ParseAction::Reduce { production } => Some(production),
            _ => None,
        })
        .max_by(|&a, &b| {
            precedence_of(a)
                .cmp(&precedence_of(b))
                .then_with(|| b.cmp(&a))
        });

    match (shift, reduce) {
        (None, None) => None,
        (Some(shift), None) => Some(shift),
        (None, Some(production)) => Some(ParseAction::Reduce { production }),
        (Some(shift), Some(production)) => {
            let ParseAction::Shift { precedence, .. } = shift else {
                return Some(shift);
            };
            let associativity = productions
                .get(production.index())
                .map_or(Associativity::None, |p| p.associativity);
            let reduce = ParseAction::Reduce { production };
            Some(match precedence.cmp(&precedence_of(production)) {
                Ordering::Greater => shift,
                Ordering::Less => reduce,
                Ordering::Equal => match associativity {
                    Associativity::Left => reduce,
                    Associativity::Right | Associativity::None => shift,
                },
            })
        }
    }
}
