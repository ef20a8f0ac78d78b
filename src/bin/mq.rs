//! mq — parse XML/HTML files and evaluate XPath expressions.
//!
//! A small command-line front end: parse a file (or stdin) in either
//! dialect, optionally evaluate an XPath expression against it, and print
//! the rendered tree or the query result.

use std::fs;
use std::io::Read;
use std::process::ExitCode;

use clap::Parser;

use markquery::serial::render;
use markquery::xpath;
use markquery::{parse, ParseMode, ParseOptions, Value};

/// mq — parse and query XML/HTML documents.
#[derive(Parser, Debug)]
#[command(name = "mq", version, about, long_about = None)]
struct Cli {
    /// The file to process (use `-` for stdin).
    file: String,

    /// Parse the input as HTML instead of XML.
    #[arg(long)]
    html: bool,

    /// Drop whitespace-only text nodes.
    #[arg(long)]
    strip_space: bool,

    /// Keep the full DOCTYPE declaration text.
    #[arg(long)]
    keep_dtd: bool,

    /// Evaluate an XPath expression and print the result.
    #[arg(long, value_name = "EXPR")]
    query: Option<String>,

    /// Do not print the rendered tree.
    #[arg(long)]
    quiet: bool,

    /// Print collected diagnostics to stderr.
    #[arg(long)]
    diagnostics: bool,
}

const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_QUERY_ERROR: u8 = 2;
const EXIT_IO_ERROR: u8 = 3;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let input = match read_input(&cli.file) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("mq: {}: {err}", cli.file);
            return ExitCode::from(EXIT_IO_ERROR);
        }
    };

    let mode = if cli.html {
        ParseMode::Html
    } else {
        ParseMode::Xml
    };
    let options = ParseOptions::default()
        .preserve_space(!cli.strip_space)
        .preserve_dtd_structure(cli.keep_dtd);

    let doc = match parse(&input, mode, Some(&options)) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("mq: {}: {err}", cli.file);
            return ExitCode::from(EXIT_PARSE_ERROR);
        }
    };

    if cli.diagnostics {
        for diagnostic in &doc.diagnostics {
            eprintln!("mq: {}: {diagnostic}", cli.file);
        }
    }

    if let Some(expression) = &cli.query {
        match xpath::evaluate(&doc, doc.root(), expression) {
            Ok(value) => print_value(&doc, &value),
            Err(err) => {
                eprintln!("mq: {err}");
                return ExitCode::from(EXIT_QUERY_ERROR);
            }
        }
    } else if !cli.quiet {
        println!("{}", render(&doc));
    }

    ExitCode::SUCCESS
}

fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path)
    }
}

/// Prints a query result: node-sets one rendered node per line, scalars in
/// their XPath string form.
fn print_value(doc: &markquery::Document, value: &Value) {
    match value {
        Value::NodeSet(nodes) => {
            for &node in nodes {
                let mut out = String::new();
                markquery::serial::render_node(doc, node, &mut out);
                println!("{out}");
            }
        }
        scalar => println!("{scalar}"),
    }
}
