//! # markquery
//!
//! A non-validating XML/HTML parser with an XPath 1.0 query engine.
//! Markup strings parse into an arena-backed document tree; query strings
//! evaluate against that tree to numbers, strings, booleans, or node-sets.
//!
//! ## Quick start
//!
//! ```
//! use markquery::{parse, query, ParseMode, Value};
//!
//! let doc = parse("<tag id='1'>some value<data id='2'>123456</data></tag>",
//!                 ParseMode::Xml, None).unwrap();
//! let result = query(&doc, "number(/tag/data)").unwrap();
//! assert_eq!(result, Value::Number(123456.0));
//! ```
//!
//! The XML dialect is strict: well-formedness and namespace-constraint
//! violations abort parsing. The HTML dialect is tolerant: void elements,
//! valueless attributes, and stray `<` are accepted, and `<script>` bodies
//! are captured opaquely.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod serial;
pub mod token;
pub mod tree;
pub mod xpath;

pub use error::{ParseDiagnostic, ParseError, SourceLocation};
pub use parser::{ParseMode, ParseOptions};
pub use tree::{Document, NodeId, NodeKind};
pub use xpath::{QueryError, Value};

/// Parses a markup string into a [`Document`].
///
/// `options` falls back to [`ParseOptions::default`] when `None`.
///
/// # Errors
///
/// Returns [`ParseError`] on a fatal tokenization or structural failure.
pub fn parse(
    markup: &str,
    mode: ParseMode,
    options: Option<&ParseOptions>,
) -> Result<Document, ParseError> {
    match options {
        Some(options) => parser::parse_with_mode(markup, mode, options),
        None => parser::parse_with_mode(markup, mode, &ParseOptions::default()),
    }
}

/// Evaluates an XPath expression against the document root.
///
/// # Errors
///
/// Returns [`QueryError`] if the expression is malformed or evaluation
/// fails.
pub fn query(doc: &Document, expression: &str) -> Result<Value, QueryError> {
    xpath::evaluate(doc, doc.root(), expression)
}

/// Evaluates an XPath expression and reduces a node-set result to its
/// first node in document order; scalar results pass through unchanged.
///
/// # Errors
///
/// Returns [`QueryError`] if the expression is malformed or evaluation
/// fails.
pub fn query_one(doc: &Document, expression: &str) -> Result<Value, QueryError> {
    match query(doc, expression)? {
        Value::NodeSet(nodes) => Ok(Value::NodeSet(
            nodes.iter().copied().min().into_iter().collect(),
        )),
        scalar => Ok(scalar),
    }
}

/// Evaluates an XPath expression that must produce a node-set and returns
/// the nodes in document order.
///
/// # Errors
///
/// Returns [`QueryError::Type`] for scalar results, or any other
/// [`QueryError`] from evaluation.
pub fn query_all(doc: &Document, expression: &str) -> Result<Vec<NodeId>, QueryError> {
    match query(doc, expression)? {
        Value::NodeSet(nodes) => Ok(nodes),
        other => Err(QueryError::Type {
            expected: "node-set".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}
