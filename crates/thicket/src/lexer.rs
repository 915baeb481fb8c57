//! Context-aware tokenization.
//!
//! The [`Lexer`] produces one [`Token`] at a time, restricted to the
//! terminals the parser can accept in a given state. Anonymous extras
//! (whitespace) are skipped as padding; named extras (comments) are returned
//! as tokens flagged `is_extra`. Text that no rule matches becomes an
//! [`ERROR`](crate::Symbol::ERROR) token so lexing always makes progress.

pub(crate) mod dfa;
pub mod indent;
mod scanner;

use std::cmp::Reverse;

pub use indent::IndentScanner;
pub use scanner::{ExternalScanner, ScanCursor, ScannerFactory, ScannerState};

use crate::language::Language;
use crate::length::{Length, Point};
use crate::table::{GrammarTable, StateId, Symbol};

/// Zero-width external tokens allowed in a row at one position before the
/// scanner is ignored there.
const MAX_ZERO_WIDTH_RUN: usize = 64;

/// A lexed token with its absolute position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The terminal, or [`Symbol::ERROR`] for unlexable text.
    pub symbol: Symbol,
    /// Where the padding before the token begins.
    pub padding_start: Length,
    /// Where the token text begins.
    pub start: Length,
    /// Where the token text ends.
    pub end: Length,
    /// Exclusive end of the bytes examined to produce this token; one past
    /// the text length if end of input was inspected.
    pub lookahead_end: usize,
    /// Whether the token is a named extra.
    pub is_extra: bool,
    pub(crate) scanner_before: ScannerState,
    pub(crate) scanner_after: ScannerState,
}

impl Token {
    /// Whitespace skipped before the token.
    #[must_use]
    pub fn padding(&self) -> Length {
        self.start - self.padding_start
    }

    /// Extent of the token text.
    #[must_use]
    pub fn size(&self) -> Length {
        self.end - self.start
    }

    /// Byte range of the token text.
    #[must_use]
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.bytes..self.end.bytes
    }

    /// Start point of the token text.
    #[must_use]
    pub fn start_point(&self) -> Point {
        self.start.extent
    }

    /// End point of the token text.
    #[must_use]
    pub fn end_point(&self) -> Point {
        self.end.extent
    }

    /// Whether this is the end-of-input token.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.symbol == Symbol::END
    }

    /// Whether this token covers unlexable text.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.symbol == Symbol::ERROR
    }
}

/// Produces tokens from a text for a language.
pub struct Lexer<'a> {
    table: &'a GrammarTable,
    text: &'a str,
    scanner: Option<Box<dyn ExternalScanner>>,
    scanner_state: ScannerState,
    zero_width_run: (usize, usize),
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("table", &self.table.name())
            .field("len", &self.text.len())
            .field("scanner_state", &self.scanner_state)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy)]
struct Candidate {
    rule: usize,
    end: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `text`, with a fresh external scanner if the
    /// language has one.
    #[must_use]
    pub fn new(language: &'a Language, text: &'a str) -> Self {
        Self {
            table: language.table(),
            text,
            scanner: language.create_scanner(),
            scanner_state: ScannerState::default(),
            zero_width_run: (usize::MAX, 0),
        }
    }

    /// The text being lexed.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Lexes one token starting at `position`.
    ///
    /// With a state, only terminals that state can accept are considered
    /// (falling back to every terminal if none match); without one, every
    /// terminal is a candidate.
    pub fn lex(&mut self, position: Length, state: Option<StateId>) -> Token {
        let before = self.scanner_state.clone();
        if let Some(token) = self.lex_external(position, state, &before) {
            return token;
        }
        self.lex_internal(position, state, before)
    }

    /// An iterator lexing the whole text without parser guidance.
    #[must_use]
    pub fn tokens(self) -> Tokens<'a> {
        Tokens {
            lexer: self,
            position: Length::ZERO,
            done: false,
        }
    }

    pub(crate) fn scanner_state(&self) -> &ScannerState {
        &self.scanner_state
    }

    pub(crate) fn restore_scanner(&mut self, state: &ScannerState) {
        if let Some(scanner) = self.scanner.as_mut() {
            scanner.deserialize(state.as_bytes());
        }
        self.scanner_state = state.clone();
    }

    fn is_valid(&self, state: Option<StateId>, symbol: Symbol) -> bool {
        state.is_none_or(|s| self.table.has_action(s, symbol)) || self.table.is_extra(symbol)
    }

    fn lex_external(
        &mut self,
        position: Length,
        state: Option<StateId>,
        before: &ScannerState,
    ) -> Option<Token> {
        let externals = self.table.externals();
        if externals.is_empty() || self.scanner.is_none() {
            return None;
        }
        let valid: Vec<bool> = externals.iter().map(|&s| self.is_valid(state, s)).collect();
        if !valid.contains(&true) {
            return None;
        }
        if self.zero_width_run.0 == position.bytes && self.zero_width_run.1 >= MAX_ZERO_WIDTH_RUN {
            return None;
        }

        let scanner = self.scanner.as_mut()?;
        let mut cursor = ScanCursor::new(self.text, position.bytes);
        let Some(symbol) = scanner
            .scan(&mut cursor, &valid)
            .and_then(|index| externals.get(index).copied())
        else {
            scanner.deserialize(before.as_bytes());
            return None;
        };
        let after = ScannerState::capture(scanner.as_ref());

        let bytes = self.text.as_bytes();
        let start = position + Length::of(&bytes[position.bytes..cursor.token_start()]);
        let end = start + Length::of(&bytes[cursor.token_start()..cursor.token_end()]);

        if end.bytes == position.bytes {
            if self.zero_width_run.0 == position.bytes {
                self.zero_width_run.1 += 1;
            } else {
                self.zero_width_run = (position.bytes, 1);
            }
        }

        self.scanner_state = after.clone();
        Some(Token {
            symbol,
            padding_start: position,
            start,
            end,
            lookahead_end: cursor.examined().max(end.bytes + 1),
            is_extra: self.table.is_extra(symbol),
            scanner_before: before.clone(),
            scanner_after: after,
        })
    }

    fn lex_internal(
        &self,
        position: Length,
        state: Option<StateId>,
        before: ScannerState,
    ) -> Token {
        let automaton = self.table.lex_automaton();
        let bytes = self.text.as_bytes();

        let mut start = position.bytes;
        let mut examined = start;
        loop {
            let (skipped, seen) = automaton.skip(bytes, start);
            examined = examined.max(seen);
            match skipped {
                Some(end) if end > start => start = end,
                _ => break,
            }
        }
        let token_start = position + Length::of(&bytes[position.bytes..start]);

        let token = |symbol, end: usize, examined: usize, is_extra| Token {
            symbol,
            padding_start: position,
            start: token_start,
            end: token_start + Length::of(&bytes[start..end]),
            lookahead_end: examined.max(end + 1),
            is_extra,
            scanner_before: before.clone(),
            scanner_after: before.clone(),
        };

        if start >= bytes.len() {
            return token(Symbol::END, start, examined.max(bytes.len() + 1), false);
        }

        let (found, seen) = self.best_match(start, |symbol| self.is_valid(state, symbol));
        examined = examined.max(seen);
        let found = match found {
            Some(found) => Some(found),
            None if state.is_some() => {
                let (found, seen) = self.best_match(start, |_| true);
                examined = examined.max(seen);
                found
            }
            None => None,
        };

        if let Some(Candidate { rule, end }) = found {
            let symbol = automaton.rules()[rule].symbol;
            return token(symbol, end, examined, self.table.is_extra(symbol));
        }

        // Nothing matches: cover at least one character, and as much as some
        // rule was still willing to consume.
        let mut end = examined.saturating_sub(1).min(bytes.len());
        while !self.text.is_char_boundary(end) {
            end -= 1;
        }
        let one_char = self.text[start..]
            .chars()
            .next()
            .map_or(bytes.len(), |c| start + c.len_utf8());
        let end = end.max(one_char);
        tracing::trace!(start, end, "lexical error");
        token(Symbol::ERROR, end, examined, false)
    }

    /// Picks the winning rule at `start` among those whose symbol passes
    /// `accept`. Returns the winner and the examined end.
    fn best_match(
        &self,
        start: usize,
        accept: impl Fn(Symbol) -> bool,
    ) -> (Option<Candidate>, usize) {
        let automaton = self.table.lex_automaton();
        let rules = automaton.rules();
        let bytes = self.text.as_bytes();

        let mut best: Option<Candidate> = None;
        let mut word_end: Option<Option<usize>> = None;
        let mut examined = automaton.matches(bytes, start, |rule, end| {
            let Some(lex_rule) = rules.get(rule) else {
                return;
            };
            if end <= start || !accept(lex_rule.symbol) {
                return;
            }
            let candidate = Candidate { rule, end };
            if best.is_none_or(|b| rank(rules, candidate) > rank(rules, b)) {
                best = Some(candidate);
            }
        });

        // Keyword extraction: a keyword loses to a longer word-token match.
        if let Some(candidate) = best {
            if rules[candidate.rule].keyword {
                let (word, seen) = automaton.word(bytes, start);
                examined = examined.max(seen);
                word_end = Some(word);
                if word.is_some_and(|w| w > candidate.end) {
                    best = None;
                }
            }
        }

        if best.is_none() && word_end.is_some() {
            // The keyword was rejected; retry without keywords.
            let mut fallback: Option<Candidate> = None;
            automaton.matches(bytes, start, |rule, end| {
                let Some(lex_rule) = rules.get(rule) else {
                    return;
                };
                if end <= start || lex_rule.keyword || !accept(lex_rule.symbol) {
                    return;
                }
                let candidate = Candidate { rule, end };
                if fallback.is_none_or(|b| rank(rules, candidate) > rank(rules, b)) {
                    fallback = Some(candidate);
                }
            });
            best = fallback;
        }

        (best, examined)
    }
}

/// Selection order: precedence, then length, then literals over patterns,
/// then the earlier rule.
fn rank(rules: &[dfa::LexRule], c: Candidate) -> (i32, usize, bool, Reverse<usize>) {
    let rule = &rules[c.rule];
    (rule.precedence, c.end, rule.literal, Reverse(c.rule))
}

/// Lazily lexes a whole text with every terminal valid.
///
/// Yields the end-of-input token last.
#[derive(Debug)]
pub struct Tokens<'a> {
    lexer: Lexer<'a>,
    position: Length,
    done: bool,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.lexer.lex(self.position, None);
        self.position = token.end;
        if token.is_end() {
            self.done = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    fn language() -> Language {
        let mut b = TableBuilder::new("lex");
        let ident = b.terminal_pattern("identifier", "[a-z_]+");
        b.terminal_literal("if");
        b.terminal_literal("=");
        b.terminal_literal("==");
        b.terminal_pattern("number", "[0-9]+");
        b.extra_pattern("comment", "#[^\n]*");
        b.skip(r"\s");
        b.word(ident);
        b.state();
        Language::new(b.into_table().unwrap())
    }

    fn kinds(language: &Language, text: &str) -> Vec<String> {
        Lexer::new(language, text)
            .tokens()
            .map(|t| language.table().symbol_name(t.symbol).to_string())
            .collect()
    }

    #[test]
    fn test_longest_match_and_literals() {
        let language = language();
        assert_eq!(
            kinds(&language, "a == 1"),
            ["identifier", "==", "number", "end"]
        );
    }

    #[test]
    fn test_keyword_extraction() {
        let language = language();
        assert_eq!(kinds(&language, "if iffy"), ["if", "identifier", "end"]);
    }

    #[test]
    fn test_comment_is_extra_token() {
        let language = language();
        let tokens: Vec<Token> = Lexer::new(&language, "x # note\ny").tokens().collect();
        assert!(tokens[1].is_extra);
        assert_eq!(tokens[1].byte_range(), 2..8);
        assert_eq!(tokens[2].start_point(), Point::new(1, 0));
    }

    #[test]
    fn test_padding_and_positions() {
        let language = language();
        let mut lexer = Lexer::new(&language, "  ab\n");
        let token = lexer.lex(Length::ZERO, None);
        assert_eq!(token.padding().bytes, 2);
        assert_eq!(token.byte_range(), 2..4);
        let end = lexer.lex(token.end, None);
        assert!(end.is_end());
        assert_eq!(end.start.bytes, 5);
        assert_eq!(end.lookahead_end, 6);
    }

    #[test]
    fn test_unlexable_text_makes_progress() {
        let language = language();
        let tokens: Vec<Token> = Lexer::new(&language, "a @@ b").tokens().collect();
        assert!(tokens[1].is_error());
        assert_eq!(tokens[1].byte_range(), 2..3);
        assert_eq!(tokens.last().map(Token::is_end), Some(true));
    }

    #[test]
    fn test_multibyte_error_token() {
        let language = language();
        let tokens: Vec<Token> = Lexer::new(&language, "é").tokens().collect();
        assert!(tokens[0].is_error());
        assert_eq!(tokens[0].byte_range(), 0..2);
    }

    #[test]
    fn test_lookahead_extends_past_token() {
        let language = language();
        let mut lexer = Lexer::new(&language, "ab c");
        let token = lexer.lex(Length::ZERO, None);
        assert_eq!(token.byte_range(), 0..2);
        assert!(token.lookahead_end > 2);
    }
}
