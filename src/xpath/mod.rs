//! XPath 1.0 query engine.
//!
//! Expression strings are tokenized by [`lexer`], parsed into an AST by
//! [`parser`], and evaluated against a parsed [`Document`] by [`eval`].
//! Results are [`Value`]s: a number, string, boolean, or a set of nodes
//! referencing the queried tree.
//!
//! # Quick start
//!
//! ```
//! use markquery::parser::{parse_xml, ParseOptions};
//! use markquery::xpath::{evaluate, Value};
//!
//! let doc = parse_xml("<root><a>1</a><b>2</b></root>", &ParseOptions::default()).unwrap();
//! let result = evaluate(&doc, doc.root(), "count(/root/*)").unwrap();
//! assert_eq!(result, Value::Number(2.0));
//! ```

pub mod ast;
mod axes;
pub mod eval;
mod functions;
pub mod lexer;
pub mod parser;
pub mod types;

pub use eval::Context;
pub use types::{QueryError, Value};

use crate::tree::{Document, NodeId};

/// Parses and evaluates an XPath expression against a context node.
///
/// For evaluating one expression against many context nodes, use
/// [`parser::parse`] once and [`Context::evaluate`] per node.
///
/// # Errors
///
/// Returns [`QueryError`] if the expression is malformed or evaluation
/// fails.
pub fn evaluate(
    doc: &Document,
    context_node: NodeId,
    expression: &str,
) -> Result<Value, QueryError> {
    let expr = parser::parse(expression)?;
    Context::new(doc, context_node).evaluate(&expr)
}
