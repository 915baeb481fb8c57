//! Incremental reparsing: edited trees reparse to the same result as a fresh
//! parse, sharing the subtrees the edit left alone.

mod common;

use common::{c_language, descendants, expression_language, indent_language, word_language};
use rstest::rstest;
use thicket::{Document, InputEdit, Language, Length, Parser, Point};

/// The edit replacing `range` of `old` with `replacement`.
fn edit_for(old: &str, range: std::ops::Range<usize>, replacement: &str) -> InputEdit {
    let start = Length::of(&old.as_bytes()[..range.start]);
    let old_end = Length::of(&old.as_bytes()[..range.end]);
    let new_end = start + Length::of(replacement.as_bytes());
    InputEdit {
        start_byte: start.bytes,
        old_end_byte: old_end.bytes,
        new_end_byte: new_end.bytes,
        start_position: start.extent,
        old_end_position: old_end.extent,
        new_end_position: new_end.extent,
    }
}

fn splice(old: &str, range: std::ops::Range<usize>, replacement: &str) -> String {
    let mut new = old.to_string();
    new.replace_range(range, replacement);
    new
}

/// Reparses after one edit and checks the result against a fresh parse.
fn check_edit(language: Language, old: &str, range: std::ops::Range<usize>, replacement: &str) {
    let parser = Parser::new(language);
    let mut tree = parser.parse(old, None);
    tree.edit(&edit_for(old, range.clone(), replacement)).unwrap();
    let new = splice(old, range, replacement);
    let incremental = parser.parse(&new, Some(&tree));
    let fresh = parser.parse(&new, None);
    assert_eq!(incremental, fresh, "{old:?} -> {new:?}");
    assert!(!incremental.has_changes());
}

#[test]
fn test_single_word_edit_shares_nothing() {
    let parser = Parser::new(word_language());
    let mut tree = parser.parse("ab", None);
    tree.edit(&edit_for("ab", 1..1, "x")).unwrap();
    assert!(tree.has_changes());

    let new = parser.parse("axb", Some(&tree));
    assert_eq!(new.to_sexp(), "(program (word))");
    assert_eq!(new, parser.parse("axb", None));
    let old_ids: Vec<usize> = descendants(tree.root_node()).iter().map(|n| n.id()).collect();
    for node in descendants(new.root_node()) {
        assert!(!old_ids.contains(&node.id()), "{node:?} was reused");
    }
}

#[test]
fn test_untouched_statements_are_reused() {
    let old = "a();\nb();\nc();\n";
    let parser = Parser::new(c_language());
    let mut tree = parser.parse(old, None);
    // Lexing "a();" read up to byte 5, so the edit starts past that.
    tree.edit(&edit_for(old, 6..6, "b")).unwrap();
    let first = tree.root_node().child(0).unwrap().id();
    let third = tree.root_node().child(2).unwrap().id();

    let new = parser.parse("a();\nbb();\nc();\n", Some(&tree));
    assert_eq!(new, parser.parse("a();\nbb();\nc();\n", None));
    let root = new.root_node();
    assert_eq!(root.child(0).unwrap().id(), first);
    assert_eq!(root.child(2).unwrap().id(), third);
    assert_ne!(
        root.child(1).unwrap().id(),
        tree.root_node().child(1).unwrap().id()
    );

    let second = root.child(1).unwrap();
    assert_eq!(second.byte_range(), 5..10);
    assert_eq!(second.start_position(), Point::new(1, 0));
    assert_eq!(root.child(2).unwrap().start_position(), Point::new(2, 0));
}

#[test]
fn test_append_reuses_earlier_statements() {
    let old = "a();\nb();\n";
    let parser = Parser::new(c_language());
    let mut tree = parser.parse(old, None);
    tree.edit(&edit_for(old, 10..10, "c();\n")).unwrap();
    assert_eq!(tree.len(), 15);
    assert!(tree.has_changes());
    let first = tree.root_node().child(0).unwrap().id();

    let text = "a();\nb();\nc();\n";
    let new = parser.parse(text, Some(&tree));
    assert_eq!(new, parser.parse(text, None));
    let root = new.root_node();
    assert_eq!(root.child_count(), 3);
    assert_eq!(root.child(0).unwrap().id(), first);
    assert_eq!(root.child(2).unwrap().byte_range(), 10..14);
}

#[rstest]
#[case::insert_statement("a();\nc();\n", 5..5, "b();\n")]
#[case::delete_statement("a();\nb();\nc();\n", 5..10, "")]
#[case::break_a_call("a();\nb();\nc();\n", 6..7, "")]
#[case::repair_a_call("a();\nb(;\nc();\n", 7..7, ")")]
#[case::wrap_in_block("a();\nb();\n", 0..0, "{ ")]
#[case::close_block("{ a();\nb();\n", 11..11, "}")]
#[case::add_else("if (x) y();\nz();\n", 11..11, " else w();")]
#[case::remove_else("if (x) y(); else w();\nz();\n", 11..21, "")]
#[case::comment_out("a();\nb();\n", 5..5, "// ")]
#[case::open_string("a(\"x\");\nb();\n", 4..5, "")]
#[case::multibyte_comment("a(); // é\nb();\n", 8..10, "ü")]
#[case::replace_everything("a();", 0..4, "if (q) { }")]
#[case::append_statement("a();\n", 5..5, "b();\n")]
#[case::append_to_unterminated_line("a();", 4..4, "\nb();")]
#[case::append_after_blank_lines("a();\n\n\n", 7..7, "x();")]
#[case::insert_into_trailing_padding("a();\n\n\n", 6..6, "x();\n")]
#[case::append_to_empty("", 0..0, "a();")]
fn test_c_edits_match_fresh_parse(
    #[case] old: &str,
    #[case] range: std::ops::Range<usize>,
    #[case] replacement: &str,
) {
    check_edit(c_language(), old, range, replacement);
}

#[rstest]
#[case("1 + 2 * 3", 4..5, "7")]
#[case("1 + 2 * 3", 2..3, "^")]
#[case("1 + 2", 5..5, " * 3")]
#[case("(1 + 2) * 3", 0..1, "")]
#[case("1 + 2 * 3", 9..9, "1")]
#[case("1 + 2 * 3", 8..9, "")]
fn test_expression_edits_match_fresh_parse(
    #[case] old: &str,
    #[case] range: std::ops::Range<usize>,
    #[case] replacement: &str,
) {
    check_edit(expression_language(), old, range, replacement);
}

#[rstest]
#[case::dedented_line("a\n  b\n", 6..6, "c\n")]
#[case::indented_line("a\n  b\n", 6..6, "  d\n")]
#[case::deeper_block("a\n  b\n", 6..6, "    e\n")]
#[case::unterminated_line("a\n  b", 5..5, "\nc")]
fn test_indented_appends_match_fresh_parse(
    #[case] old: &str,
    #[case] range: std::ops::Range<usize>,
    #[case] replacement: &str,
) {
    check_edit(indent_language(), old, range, replacement);
}

#[test]
fn test_edits_compose_before_reparse() {
    let mut doc = Document::new(c_language(), "a();\nb();\nc();\n");
    doc.edit(10..11, "see").unwrap();
    doc.edit(0..1, "x").unwrap();
    doc.edit(5..5, "if (q) ").unwrap();
    assert_eq!(doc.pending_edits().len(), 3);

    let text = doc.text().to_string();
    assert_eq!(text, "x();\nif (q) b();\nsee();\n");
    let fresh = Parser::new(c_language()).parse(&text, None);
    assert_eq!(*doc.reparse(), fresh);
    assert_eq!(
        doc.tree().to_sexp(),
        "(program (expression_statement (call_expression function: (identifier))) (if_statement condition: (identifier) consequence: (expression_statement (call_expression function: (identifier)))) (expression_statement (call_expression function: (identifier))))"
    );
}

#[test]
fn test_stale_tree_is_ignored() {
    let parser = Parser::new(c_language());
    let tree = parser.parse("a();", None);
    // The old tree was never edited, so its length does not match.
    let new = parser.parse("a();b();", Some(&tree));
    assert_eq!(new, parser.parse("a();b();", None));
}

#[test]
fn test_edit_out_of_bounds_leaves_tree_untouched() {
    let parser = Parser::new(c_language());
    let mut tree = parser.parse("a();", None);
    let before = tree.clone();
    let mut edit = edit_for("a();", 0..4, "");
    edit.old_end_byte = 9;
    assert!(tree.edit(&edit).is_err());
    assert_eq!(tree, before);
    assert!(!tree.has_changes());
}
