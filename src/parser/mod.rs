//! Markup parsers.
//!
//! Two hand-rolled recursive descent parsers share the token stream produced
//! by the [`Lexer`](crate::lexer::Lexer):
//!
//! - [`parse_xml`]: strict XML with namespace semantics. Fatal on any
//!   well-formedness or namespace-constraint violation.
//! - [`parse_html`]: tolerant HTML. Accepts void elements, valueless and
//!   unquoted attributes, stray `<` in text, and opaque `<script>` bodies;
//!   only a closing-tag mismatch is fatal.
//!
//! Both produce the same [`Document`](crate::tree::Document) tree.

mod html;
mod xml;

use crate::error::ParseError;
use crate::tree::Document;

/// The XML namespace URI, reserved for the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The xmlns namespace URI, reserved for the `xmlns` prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// The XHTML namespace URI — the only default namespace accepted by the
/// HTML parser.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Which markup dialect to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Strict XML with namespace semantics.
    Xml,
    /// Tolerant HTML.
    Html,
}

/// Parse options controlling both dialects.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use markquery::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .preserve_space(false)
///     .preserve_dtd_structure(true);
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes in element content.
    pub preserve_space: bool,
    /// Keep comment nodes (when off, comments are consumed and dropped).
    pub preserve_comment: bool,
    /// Keep CDATA sections (when off, they are consumed and dropped).
    pub preserve_cdata: bool,
    /// Store the complete DOCTYPE declaration text instead of just the
    /// document-type name.
    pub preserve_dtd_structure: bool,
    /// The root node's display name.
    pub document_name: String,
    /// Downgrade unresolved-namespace errors to silent skips (XML only).
    pub allow_missing_namespaces: bool,
    /// Collect warnings into the document's diagnostics list. Warnings
    /// clear the well-formedness flag either way.
    pub show_warnings: bool,
    /// Bind an in-scope default namespace to unprefixed elements (XML only).
    pub allow_default_namespace_bindings: bool,
    /// Reject attributes whose expanded names (namespace URI + local name)
    /// collide within one element (XML only).
    pub ensure_unique_namespaced_attributes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            preserve_space: true,
            preserve_comment: true,
            preserve_cdata: true,
            preserve_dtd_structure: false,
            document_name: "Document".to_string(),
            allow_missing_namespaces: false,
            show_warnings: true,
            allow_default_namespace_bindings: true,
            ensure_unique_namespaced_attributes: true,
        }
    }
}

impl ParseOptions {
    /// Sets whether whitespace-only text nodes are kept.
    #[must_use]
    pub fn preserve_space(mut self, yes: bool) -> Self {
        self.preserve_space = yes;
        self
    }

    /// Sets whether comment nodes are kept.
    #[must_use]
    pub fn preserve_comment(mut self, yes: bool) -> Self {
        self.preserve_comment = yes;
        self
    }

    /// Sets whether CDATA sections are kept.
    #[must_use]
    pub fn preserve_cdata(mut self, yes: bool) -> Self {
        self.preserve_cdata = yes;
        self
    }

    /// Sets whether the full DOCTYPE declaration text is stored.
    #[must_use]
    pub fn preserve_dtd_structure(mut self, yes: bool) -> Self {
        self.preserve_dtd_structure = yes;
        self
    }

    /// Sets the root node's display name.
    #[must_use]
    pub fn document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = name.into();
        self
    }

    /// Sets whether unresolved namespace prefixes are silently skipped.
    #[must_use]
    pub fn allow_missing_namespaces(mut self, yes: bool) -> Self {
        self.allow_missing_namespaces = yes;
        self
    }

    /// Sets whether warnings are collected into the diagnostics list.
    #[must_use]
    pub fn show_warnings(mut self, yes: bool) -> Self {
        self.show_warnings = yes;
        self
    }

    /// Sets whether unprefixed elements bind an in-scope default namespace.
    #[must_use]
    pub fn allow_default_namespace_bindings(mut self, yes: bool) -> Self {
        self.allow_default_namespace_bindings = yes;
        self
    }

    /// Sets whether expanded attribute names must be unique per element.
    #[must_use]
    pub fn ensure_unique_namespaced_attributes(mut self, yes: bool) -> Self {
        self.ensure_unique_namespaced_attributes = yes;
        self
    }
}

/// Parses a markup string in the given dialect.
///
/// # Errors
///
/// Returns `ParseError` on any fatal tokenization or structural failure.
pub fn parse_with_mode(
    input: &str,
    mode: ParseMode,
    options: &ParseOptions,
) -> Result<Document, ParseError> {
    match mode {
        ParseMode::Xml => parse_xml(input, options),
        ParseMode::Html => parse_html(input, options),
    }
}

/// Parses a strict XML document.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML or violates a
/// namespace constraint.
pub fn parse_xml(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    xml::XmlParser::new(input, options).parse()
}

/// Parses an HTML document tolerantly.
///
/// # Errors
///
/// Returns `ParseError` on a closing-tag mismatch or a malformed compound
/// lexeme; other irregularities are tolerated.
pub fn parse_html(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    html::HtmlParser::new(input, options).parse()
}
