//! Command-line front end: load a grammar table and optionally parse a file.
//!
//! ```text
//! thicket <table.json>                          check a table
//! thicket <table.json> --parse <source>         print the tree
//! thicket <table.json> --parse <source> --tokens  print the tokens
//! ```
//!
//! Exits with status 1 if the table does not load or the tree has errors.

use std::process::ExitCode;

use facet::Facet;
use thicket::{Language, Lexer, Parser, TableError};

#[derive(Facet, Debug)]
struct Args {
    /// Path to a JSON grammar table.
    #[facet(positional)]
    table: String,

    /// Source file to parse.
    #[facet(named, short = 'p')]
    #[facet(default)]
    parse: String,

    /// List tokens instead of printing the tree.
    #[facet(named, short = 't')]
    #[facet(default)]
    tokens: bool,
}

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let args: Args = match facet_args::from_slice(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let language = match load(&args.table) {
        Ok(language) => language,
        Err(e) => {
            eprintln!("error: {}: {e}", args.table);
            return ExitCode::FAILURE;
        }
    };

    if args.parse.is_empty() {
        return ExitCode::SUCCESS;
    }

    let text = match std::fs::read_to_string(&args.parse) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: {}: {e}", args.parse);
            return ExitCode::FAILURE;
        }
    };

    if args.tokens {
        print_tokens(&language, &text);
        return ExitCode::SUCCESS;
    }

    let tree = Parser::new(language).parse(&text, None);
    println!("{}", tree.to_sexp());
    if tree.has_error() {
        eprintln!("{}: syntax errors found", args.parse);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn load(path: &str) -> Result<Language, TableError> {
    let language = Language::from_path(path)?;
    let table = language.table();
    eprintln!(
        "{}: {} symbols, {} states, {} productions, checksum {:#010x}",
        table.name(),
        table.symbol_count(),
        table.state_count(),
        table.production_count(),
        table.checksum()
    );
    Ok(language)
}

fn print_tokens(language: &Language, text: &str) {
    let table = language.table();
    for token in Lexer::new(language, text).tokens() {
        let start = token.start_point();
        let end = token.end_point();
        let extra = if token.is_extra { " (extra)" } else { "" };
        println!(
            "{} {start} - {end} {:?}{extra}",
            table.symbol_name(token.symbol),
            &text[token.byte_range()]
        );
    }
}
