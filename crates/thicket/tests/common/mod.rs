//! Hand-built grammar tables shared by the integration tests.
//!
//! Each table is the SLR automaton of the grammar in its doc comment, with
//! states numbered in the order the item sets were constructed.

#![allow(dead_code)]

use thicket::table::{StateId, Symbol, TableBuilder};
use thicket::{IndentScanner, Language, Node};

fn states(b: &mut TableBuilder, count: usize) -> Vec<StateId> {
    (0..count).map(|_| b.state()).collect()
}

/// A small C-like language.
///
/// ```text
/// program              -> _statements | ε
/// _statements          -> _statements _statement | _statement
/// _statement           -> if_statement | block | expression_statement
/// if_statement         -> "if" "(" _expression ")" _statement
///                       | "if" "(" _expression ")" _statement "else" _statement
/// block                -> "{" "}" | "{" _statements "}"
/// expression_statement -> _expression ";"
/// _expression          -> identifier | string | call_expression
/// call_expression      -> _expression "(" ")" | _expression "(" _expression ")"
/// ```
///
/// `// ...` comments are extras. The dangling `else` conflict is left in the
/// table for the loader to resolve.
pub fn c_language() -> Language {
    c_builder().into_table().map(Language::new).unwrap()
}

pub fn c_builder() -> TableBuilder {
    let mut b = TableBuilder::new("c");
    let identifier = b.terminal_pattern("identifier", "[a-zA-Z_][a-zA-Z0-9_]*");
    let string = b.terminal_pattern("string", "\"[^\"\\n]*\"");
    let kw_if = b.terminal_literal("if");
    let kw_else = b.terminal_literal("else");
    let open = b.terminal_literal("(");
    let close = b.terminal_literal(")");
    let lbrace = b.terminal_literal("{");
    let rbrace = b.terminal_literal("}");
    let semi = b.terminal_literal(";");
    b.extra_pattern("comment", "//[^\\n]*");
    b.skip(r"\s");
    b.word(identifier);

    let program = b.non_terminal("program");
    let statements = b.non_terminal("_statements");
    let statement = b.non_terminal("_statement");
    let if_statement = b.non_terminal("if_statement");
    let block = b.non_terminal("block");
    let expression_statement = b.non_terminal("expression_statement");
    let expression = b.non_terminal("_expression");
    let call_expression = b.non_terminal("call_expression");

    let condition = b.field("condition");
    let consequence = b.field("consequence");
    let alternative = b.field("alternative");
    let function = b.field("function");
    let argument = b.field("argument");

    let p_program = b.production(program, 1).id();
    let p_empty = b.production(program, 0).id();
    let p_more = b.production(statements, 2).id();
    let p_one = b.production(statements, 1).id();
    let p_if_stmt = b.production(statement, 1).id();
    let p_block_stmt = b.production(statement, 1).id();
    let p_expr_stmt = b.production(statement, 1).id();
    let p_if = b
        .production(if_statement, 5)
        .field(2, condition)
        .field(4, consequence)
        .id();
    let p_if_else = b
        .production(if_statement, 7)
        .field(2, condition)
        .field(4, consequence)
        .field(6, alternative)
        .id();
    let p_empty_block = b.production(block, 2).id();
    let p_block = b.production(block, 3).id();
    let p_expression_statement = b.production(expression_statement, 2).id();
    let p_identifier = b.production(expression, 1).id();
    let p_string = b.production(expression, 1).id();
    let p_call_expr = b.production(expression, 1).id();
    let p_call = b.production(call_expression, 3).field(0, function).id();
    let p_call_arg = b
        .production(call_expression, 4)
        .field(0, function)
        .field(2, argument)
        .id();

    let end = Symbol::END;
    let follow_statements = [end, identifier, string, kw_if, lbrace, rbrace];
    let follow_statement = [end, identifier, string, kw_if, kw_else, lbrace, rbrace];
    let follow_expression = [open, close, semi];

    let s = states(&mut b, 28);

    // Every state expecting a statement shifts the same tokens and has the
    // same gotos for the statement kinds.
    let statement_starts = |b: &mut TableBuilder, state: StateId| {
        b.shift(state, kw_if, s[9])
            .shift(state, lbrace, s[10])
            .shift(state, identifier, s[11])
            .shift(state, string, s[12])
            .goto(state, if_statement, s[4])
            .goto(state, block, s[5])
            .goto(state, expression_statement, s[6])
            .goto(state, expression, s[7])
            .goto(state, call_expression, s[8]);
    };

    statement_starts(&mut b, s[0]);
    b.reduce(s[0], &[end], p_empty)
        .goto(s[0], program, s[1])
        .goto(s[0], statements, s[2])
        .goto(s[0], statement, s[3]);
    b.accept(s[1]);
    statement_starts(&mut b, s[2]);
    b.reduce(s[2], &[end], p_program).goto(s[2], statement, s[13]);
    b.reduce(s[3], &follow_statements, p_one);
    b.reduce(s[4], &follow_statement, p_if_stmt);
    b.reduce(s[5], &follow_statement, p_block_stmt);
    b.reduce(s[6], &follow_statement, p_expr_stmt);
    b.shift(s[7], semi, s[14]).shift(s[7], open, s[15]);
    b.reduce(s[8], &follow_expression, p_call_expr);
    b.shift(s[9], open, s[16]);
    statement_starts(&mut b, s[10]);
    b.shift(s[10], rbrace, s[17])
        .goto(s[10], statements, s[18])
        .goto(s[10], statement, s[3]);
    b.reduce(s[11], &follow_expression, p_identifier);
    b.reduce(s[12], &follow_expression, p_string);
    b.reduce(s[13], &follow_statements, p_more);
    b.reduce(s[14], &follow_statement, p_expression_statement);
    b.shift(s[15], close, s[19])
        .shift(s[15], identifier, s[11])
        .shift(s[15], string, s[12])
        .goto(s[15], expression, s[20])
        .goto(s[15], call_expression, s[8]);
    b.shift(s[16], identifier, s[11])
        .shift(s[16], string, s[12])
        .goto(s[16], expression, s[21])
        .goto(s[16], call_expression, s[8]);
    b.reduce(s[17], &follow_statement, p_empty_block);
    statement_starts(&mut b, s[18]);
    b.shift(s[18], rbrace, s[22]).goto(s[18], statement, s[13]);
    b.reduce(s[19], &follow_expression, p_call);
    b.shift(s[20], close, s[23]).shift(s[20], open, s[15]);
    b.shift(s[21], close, s[24]).shift(s[21], open, s[15]);
    b.reduce(s[22], &follow_statement, p_block);
    b.reduce(s[23], &follow_expression, p_call_arg);
    statement_starts(&mut b, s[24]);
    b.goto(s[24], statement, s[25]);
    // Dangling else: both actions are listed and the loader shifts.
    b.reduce(s[25], &follow_statement, p_if)
        .shift(s[25], kw_else, s[26]);
    statement_starts(&mut b, s[26]);
    b.goto(s[26], statement, s[27]);
    b.reduce(s[27], &follow_statement, p_if_else);
    b
}

/// Binary arithmetic with precedence and associativity left to conflict
/// resolution.
///
/// ```text
/// program                  -> _expression
/// _expression              -> binary_expression | parenthesized_expression | number
/// binary_expression        -> _expression "+" _expression   (prec 1, left)
///                           | _expression "*" _expression   (prec 2, left)
///                           | _expression "^" _expression   (prec 3, right)
/// parenthesized_expression -> "(" _expression ")"
/// ```
pub fn expression_language() -> Language {
    let mut b = TableBuilder::new("arithmetic");
    let number = b.terminal_pattern("number", "[0-9]+");
    let plus = b.terminal_literal("+");
    let times = b.terminal_literal("*");
    let power = b.terminal_literal("^");
    let open = b.terminal_literal("(");
    let close = b.terminal_literal(")");
    b.skip(r"\s");

    let program = b.non_terminal("program");
    let expression = b.non_terminal("_expression");
    let binary = b.non_terminal("binary_expression");
    let parenthesized = b.non_terminal("parenthesized_expression");

    let left = b.field("left");
    let right = b.field("right");

    let p_program = b.production(program, 1).id();
    let p_binary = b.production(expression, 1).id();
    let p_parenthesized = b.production(expression, 1).id();
    let p_number = b.production(expression, 1).id();
    let p_add = b
        .production(binary, 3)
        .precedence(1)
        .left()
        .field(0, left)
        .field(2, right)
        .id();
    let p_mul = b
        .production(binary, 3)
        .precedence(2)
        .left()
        .field(0, left)
        .field(2, right)
        .id();
    let p_pow = b
        .production(binary, 3)
        .precedence(3)
        .right()
        .field(0, left)
        .field(2, right)
        .id();
    let p_group = b.production(parenthesized, 3).id();

    let follow = [Symbol::END, plus, times, power, close];
    let s = states(&mut b, 15);

    let operand = |b: &mut TableBuilder, state: StateId, target: StateId| {
        b.shift(state, number, s[5])
            .shift(state, open, s[6])
            .goto(state, expression, target)
            .goto(state, binary, s[3])
            .goto(state, parenthesized, s[4]);
    };
    let operators = |b: &mut TableBuilder, state: StateId| {
        b.shift_with_precedence(state, plus, s[7], 1)
            .shift_with_precedence(state, times, s[8], 2)
            .shift_with_precedence(state, power, s[9], 3);
    };

    operand(&mut b, s[0], s[2]);
    b.goto(s[0], program, s[1]);
    b.accept(s[1]);
    operators(&mut b, s[2]);
    b.reduce(s[2], &[Symbol::END], p_program);
    b.reduce(s[3], &follow, p_binary);
    b.reduce(s[4], &follow, p_parenthesized);
    b.reduce(s[5], &follow, p_number);
    operand(&mut b, s[6], s[10]);
    operand(&mut b, s[7], s[11]);
    operand(&mut b, s[8], s[12]);
    operand(&mut b, s[9], s[13]);
    operators(&mut b, s[10]);
    b.shift(s[10], close, s[14]);
    operators(&mut b, s[11]);
    b.reduce(s[11], &follow, p_add);
    operators(&mut b, s[12]);
    b.reduce(s[12], &follow, p_mul);
    operators(&mut b, s[13]);
    b.reduce(s[13], &follow, p_pow);
    b.reduce(s[14], &follow, p_group);
    Language::new(b.into_table().unwrap())
}

/// An indentation-structured language driven by [`IndentScanner`].
///
/// ```text
/// program     -> _statements
/// _statements -> _statements statement | statement
/// statement   -> word "\n" | word "\n" block
/// block       -> indent _statements dedent
/// ```
pub fn indent_language() -> Language {
    let mut b = TableBuilder::new("outline");
    let word = b.terminal_pattern("word", "[a-z]+");
    let newline = b.terminal_literal("\n");
    let indent = b.external("indent");
    let dedent = b.external("dedent");
    b.skip(" ");

    let program = b.non_terminal("program");
    let statements = b.non_terminal("_statements");
    let statement = b.non_terminal("statement");
    let block = b.non_terminal("block");

    let p_program = b.production(program, 1).id();
    let p_more = b.production(statements, 2).id();
    let p_one = b.production(statements, 1).id();
    let p_line = b.production(statement, 2).id();
    let p_nested = b.production(statement, 3).id();
    let p_block = b.production(block, 3).id();

    let follow = [Symbol::END, word, dedent];
    let s = states(&mut b, 11);

    b.shift(s[0], word, s[4])
        .goto(s[0], program, s[1])
        .goto(s[0], statements, s[2])
        .goto(s[0], statement, s[3]);
    b.accept(s[1]);
    b.reduce(s[2], &[Symbol::END], p_program)
        .shift(s[2], word, s[4])
        .goto(s[2], statement, s[5]);
    b.reduce(s[3], &follow, p_one);
    b.shift(s[4], newline, s[6]);
    b.reduce(s[5], &follow, p_more);
    b.reduce(s[6], &follow, p_line)
        .shift(s[6], indent, s[7])
        .goto(s[6], block, s[8]);
    b.shift(s[7], word, s[4])
        .goto(s[7], statements, s[9])
        .goto(s[7], statement, s[3]);
    b.reduce(s[8], &follow, p_nested);
    b.shift(s[9], dedent, s[10])
        .shift(s[9], word, s[4])
        .goto(s[9], statement, s[5]);
    b.reduce(s[10], &follow, p_block);
    Language::new(b.into_table().unwrap()).with_scanner(IndentScanner::boxed)
}

/// `program -> word`
pub fn word_language() -> Language {
    let mut b = TableBuilder::new("word");
    let word = b.terminal_pattern("word", "[a-z]+");
    b.skip(r"\s");
    let program = b.non_terminal("program");
    let p_program = b.production(program, 1).id();
    let s = states(&mut b, 3);
    b.shift(s[0], word, s[2]).goto(s[0], program, s[1]);
    b.accept(s[1]);
    b.reduce(s[2], &[Symbol::END], p_program);
    Language::new(b.into_table().unwrap())
}

/// Every node of the subtree rooted at `node`, in document order.
pub fn descendants<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut out = vec![node];
    for child in node.children() {
        out.extend(descendants(child));
    }
    out
}
