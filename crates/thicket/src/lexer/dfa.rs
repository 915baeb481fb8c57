//! Compiled lexical automata.
//!
//! All lexical rules are compiled into one anchored multi-pattern DFA that
//! reports every pattern matching at every end offset. The lexer filters those
//! matches by the terminals valid in the current parse state and picks a
//! winner, so one automaton serves every state. Skip patterns and the word
//! token get automata of their own.

use regex_automata::dfa::{dense, Automaton, StartKind};
use regex_automata::{Anchored, Input, MatchKind};

use crate::table::{Symbol, TableArtifact, TableError};

type Dfa = dense::DFA<Vec<u32>>;

/// A lexical rule as the lexer sees it.
#[derive(Debug, Clone)]
pub(crate) struct LexRule {
    pub(crate) symbol: Symbol,
    pub(crate) precedence: i32,
    pub(crate) literal: bool,
    /// A literal that the word token also matches in full.
    pub(crate) keyword: bool,
}

#[derive(Debug)]
pub(crate) struct LexAutomaton {
    tokens: Option<Dfa>,
    rules: Vec<LexRule>,
    skip: Option<Dfa>,
    word: Option<Dfa>,
}

fn check_pattern(symbol: &str, pattern: &str) -> Result<(), TableError> {
    let hir = regex_syntax::parse(pattern).map_err(|e| TableError::Pattern {
        symbol: symbol.to_string(),
        message: e.to_string(),
    })?;
    if hir.properties().minimum_len() == Some(0) {
        return Err(TableError::Pattern {
            symbol: symbol.to_string(),
            message: "pattern matches the empty string".to_string(),
        });
    }
    Ok(())
}

fn compile(symbol: &str, patterns: &[String]) -> Result<Option<Dfa>, TableError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    dense::Builder::new()
        .configure(
            dense::Config::new()
                .match_kind(MatchKind::All)
                .start_kind(StartKind::Anchored),
        )
        .build_many(patterns)
        .map(Some)
        .map_err(|e| TableError::Pattern {
            symbol: symbol.to_string(),
            message: e.to_string(),
        })
}

/// Runs `dfa` anchored at `start`, reporting `(pattern, end)` for every match.
///
/// Returns the exclusive end of the bytes examined, where looking at the end
/// of input counts as examining one byte past it.
fn scan(dfa: &Dfa, text: &[u8], start: usize, mut on_match: impl FnMut(usize, usize)) -> usize {
    let input = Input::new(text).range(start..).anchored(Anchored::Yes);
    let Ok(mut state) = dfa.start_state_forward(&input) else {
        return start;
    };

    // Match states are delayed by one byte: a match state entered after
    // consuming the byte at `at` reports a match ending at `at`.
    for (at, &byte) in text.iter().enumerate().skip(start) {
        state = dfa.next_state(state, byte);
        if dfa.is_special_state(state) {
            if dfa.is_match_state(state) {
                for i in 0..dfa.match_len(state) {
                    on_match(dfa.match_pattern(state, i).as_usize(), at);
                }
            } else if dfa.is_dead_state(state) || dfa.is_quit_state(state) {
                return at + 1;
            }
        }
    }

    state = dfa.next_eoi_state(state);
    if dfa.is_match_state(state) {
        for i in 0..dfa.match_len(state) {
            on_match(dfa.match_pattern(state, i).as_usize(), text.len());
        }
    }
    text.len() + 1
}

impl LexAutomaton {
    pub(crate) fn build(artifact: &TableArtifact) -> Result<Self, TableError> {
        let symbol_name = |id: u16| {
            artifact
                .symbols
                .get(usize::from(id))
                .map_or_else(|| id.to_string(), |s| s.name.clone())
        };

        let mut patterns = Vec::with_capacity(artifact.lex_rules.len());
        for rule in &artifact.lex_rules {
            let pattern = match (&rule.literal, &rule.pattern) {
                (Some(literal), _) => regex_syntax::escape(literal),
                (None, Some(pattern)) => {
                    check_pattern(&symbol_name(rule.symbol), pattern)?;
                    pattern.clone()
                }
                (None, None) => {
                    return Err(TableError::Pattern {
                        symbol: symbol_name(rule.symbol),
                        message: "rule has neither literal nor pattern".to_string(),
                    })
                }
            };
            patterns.push(pattern);
        }
        for pattern in &artifact.skip {
            check_pattern("skip", pattern)?;
        }

        let tokens = compile("lexical rules", &patterns)?;
        let skip = compile("skip", &artifact.skip)?;

        let word = match artifact.word {
            Some(word) => {
                let word_patterns: Vec<String> = artifact
                    .lex_rules
                    .iter()
                    .filter(|r| r.symbol == word)
                    .filter_map(|r| r.pattern.clone())
                    .collect();
                compile(&symbol_name(word), &word_patterns)?
            }
            None => None,
        };

        let rules = artifact
            .lex_rules
            .iter()
            .map(|rule| {
                let keyword = match (&word, &rule.literal) {
                    (Some(word), Some(literal)) => {
                        let mut longest = None;
                        scan(word, literal.as_bytes(), 0, |_, end| longest = Some(end));
                        longest == Some(literal.len())
                    }
                    _ => false,
                };
                LexRule {
                    symbol: Symbol(rule.symbol),
                    precedence: rule.precedence,
                    literal: rule.literal.is_some(),
                    keyword,
                }
            })
            .collect();

        Ok(Self {
            tokens,
            rules,
            skip,
            word,
        })
    }

    pub(crate) fn rules(&self) -> &[LexRule] {
        &self.rules
    }

    /// Every rule matching at `start`, as `(rule index, end)` pairs.
    pub(crate) fn matches(
        &self,
        text: &[u8],
        start: usize,
        on_match: impl FnMut(usize, usize),
    ) -> usize {
        match &self.tokens {
            Some(dfa) => scan(dfa, text, start, on_match),
            None => start,
        }
    }

    /// End of the longest skippable run starting at `start`, if any.
    pub(crate) fn skip(&self, text: &[u8], start: usize) -> (Option<usize>, usize) {
        let Some(dfa) = &self.skip else {
            return (None, start);
        };
        let mut longest = None;
        let examined = scan(dfa, text, start, |_, end| {
            if end > start {
                longest = Some(end);
            }
        });
        (longest, examined)
    }

    /// End of the longest word-token match at `start`, if any.
    pub(crate) fn word(&self, text: &[u8], start: usize) -> (Option<usize>, usize) {
        let Some(dfa) = &self.word else {
            return (None, start);
        };
        let mut longest = None;
        let examined = scan(dfa, text, start, |_, end| longest = Some(end));
        (longest, examined)
    }
}
