//! Tolerant HTML parser.
//!
//! Differences from the XML dialect:
//!
//! - No prolog except a tolerated DOCTYPE; no XML declaration.
//! - The namespace scope is disabled. An `xmlns` attribute is accepted only
//!   when its URI is the XHTML namespace; it becomes an anonymous default
//!   namespace node on the element and never enters any scope.
//! - Names may contain `:` as part of the local name (no prefix split).
//! - The HTML void set closes without an end tag.
//! - `<script>` bodies are captured opaquely up to the first `</`.
//! - Attributes without `=value` get an empty value; unquoted values are
//!   tolerated, as are stray `<` characters in text.
//! - A closing-tag mismatch is fatal; everything else is tolerated.

use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};
use crate::lexer::{Dialect, Lexer};
use crate::token::{Token, TokenKind};
use crate::tree::{Document, ElementFlags, ElementMode, NodeId, NodeKind, QName};

use super::{ParseOptions, XHTML_NAMESPACE};

/// Returns `true` if the given tag name (lowercased) is a void element.
pub(crate) fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// The tolerant HTML parser.
pub(crate) struct HtmlParser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    doc: Document,
    options: ParseOptions,
    warning_count: u32,
}

impl<'a> HtmlParser<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        let mut lexer = Lexer::new(input, Dialect::Html);
        lexer.set_preserve_space(options.preserve_space);
        lexer.set_preserve_comment(options.preserve_comment);
        lexer.set_preserve_cdata(options.preserve_cdata);
        lexer.set_preserve_dtd_structure(options.preserve_dtd_structure);

        Self {
            lexer,
            peeked: None,
            doc: Document::new(options.document_name.clone()),
            options: options.clone(),
            warning_count: 0,
        }
    }

    /// Main parse entry point. Parses the entire document.
    pub fn parse(mut self) -> Result<Document, ParseError> {
        let root = self.doc.root();
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Text => {
                    if token.lexeme.chars().all(char::is_whitespace) {
                        continue;
                    }
                    let text = self.make_text(&token);
                    self.doc.append_child(root, text);
                }
                TokenKind::Comment => {
                    let comment = self.doc.create_node(NodeKind::Comment {
                        content: token.lexeme,
                    });
                    self.doc.append_child(root, comment);
                }
                TokenKind::Doctype => {
                    if self.doc.doctype().is_some() {
                        self.warn("extra DOCTYPE ignored", token.lexeme, token.location);
                        continue;
                    }
                    let doctype = self.doc.create_node(NodeKind::Doctype {
                        value: token.lexeme,
                    });
                    self.doc.append_child(root, doctype);
                }
                TokenKind::OpenAngle => match self.peek_kind()? {
                    TokenKind::Slash => {
                        self.next()?;
                        let name = self.expect(TokenKind::Name)?;
                        return Err(ParseError::new(
                            format!("stray end tag </{}>", name.lexeme),
                            name.lexeme,
                            name.location,
                        ));
                    }
                    TokenKind::Question => {
                        self.next()?;
                        let target = self.expect(TokenKind::Name)?;
                        self.parse_pi_rest(&target, root)?;
                    }
                    _ => {
                        self.parse_element(root)?;
                    }
                },
                _ => {
                    self.warn(
                        format!("unexpected {} at document level", token.kind),
                        token.lexeme,
                        token.location,
                    );
                }
            }
        }

        self.doc.is_well_formed = self.warning_count == 0;
        Ok(self.doc)
    }

    // --- Token access ---

    fn fetch(&mut self) -> Result<Token, ParseError> {
        let token = self.lexer.next_token();
        if token.is_error() {
            return Err(ParseError::new(token.lexeme, "", token.location));
        }
        Ok(token)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.fetch(),
        }
    }

    fn peek_kind(&mut self) -> Result<TokenKind, ParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.fetch()?);
        }
        Ok(self.peeked.as_ref().map_or(TokenKind::Eof, |t| t.kind))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.next()?;
        if token.kind != kind {
            return Err(ParseError::new(
                format!("expected {kind}, found {}", token.kind),
                token.lexeme,
                token.location,
            ));
        }
        Ok(token)
    }

    fn warn(
        &mut self,
        message: impl Into<String>,
        lexeme: impl Into<String>,
        location: SourceLocation,
    ) {
        self.warning_count += 1;
        if self.options.show_warnings {
            self.doc.diagnostics.push(ParseDiagnostic {
                severity: ErrorSeverity::Warning,
                message: message.into(),
                lexeme: lexeme.into(),
                location,
            });
        }
    }

    fn make_text(&mut self, token: &Token) -> NodeId {
        let has_entity = token.lexeme.contains('&');
        self.doc.create_node(NodeKind::Text {
            content: token.lexeme.clone(),
            is_cdata: token.is_cdata,
            has_entity,
        })
    }

    // --- Processing instructions ---

    fn parse_pi_rest(&mut self, target: &Token, parent: NodeId) -> Result<(), ParseError> {
        debug_assert!(self.peeked.is_none(), "raw scan with a pending token");
        let body = self.lexer.create_synthetic_token("?>");
        self.expect(TokenKind::Question)?;
        self.expect(TokenKind::CloseAngle)?;

        let pi = self.doc.create_node(NodeKind::ProcessingInstruction {
            target: target.lexeme.clone(),
            value: body.lexeme.trim_start().to_string(),
        });
        self.doc.append_child(parent, pi);
        Ok(())
    }

    // --- Elements ---

    /// Parses an element. The leading `<` has been consumed; the cursor is
    /// on the name. HTML names are single tokens (`:` is a name character),
    /// stored as the local name with no prefix.
    fn parse_element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let name_token = self.expect(TokenKind::Name)?;
        let name = QName::local(name_token.lexeme.clone());
        let lower = name.local.to_ascii_lowercase();

        let elem = self.doc.create_node(NodeKind::Element {
            name,
            attributes: Vec::new(),
            namespace_decls: Vec::new(),
            namespace: None,
            mode: ElementMode::Html,
            flags: ElementFlags::default(),
        });
        self.doc.append_child(parent, elem);

        self.parse_attribute_list(elem)?;

        // Tag end: '>' or '/>' (tolerated on any element).
        let mut explicit_self_close = false;
        let token = self.next()?;
        match token.kind {
            TokenKind::CloseAngle => {}
            TokenKind::Slash => {
                self.expect(TokenKind::CloseAngle)?;
                explicit_self_close = true;
            }
            _ => {
                return Err(ParseError::new(
                    format!("expected '>' in tag <{lower}>, found {}", token.kind),
                    token.lexeme,
                    token.location,
                ));
            }
        }

        let is_void = is_void_element(&lower);
        if is_void || explicit_self_close {
            self.finish_element(elem, true, is_void);
            return Ok(elem);
        }

        if lower == "script" {
            self.parse_script_body(elem, &lower)?;
        } else {
            self.parse_content(elem, &lower)?;
        }

        self.finish_element(elem, false, false);
        Ok(elem)
    }

    fn parse_attribute_list(&mut self, elem: NodeId) -> Result<(), ParseError> {
        loop {
            match self.peek_kind()? {
                TokenKind::Slash | TokenKind::CloseAngle | TokenKind::Eof => break,
                TokenKind::Name => {
                    let name_token = self.expect(TokenKind::Name)?;
                    let value = if self.peek_kind()? == TokenKind::Equals {
                        self.next()?;
                        match self.peek_kind()? {
                            // Quoted or unquoted value.
                            TokenKind::Literal | TokenKind::Name | TokenKind::Number => {
                                self.next()?.lexeme
                            }
                            _ => String::new(),
                        }
                    } else {
                        // Valueless attribute.
                        String::new()
                    };

                    if name_token.lexeme == "xmlns" {
                        self.attach_html_namespace(elem, &value, name_token.location);
                    } else {
                        self.attach_attribute(elem, &name_token, value);
                    }
                }
                _ => {
                    let token = self.next()?;
                    self.warn(
                        format!("unexpected {} in tag", token.kind),
                        token.lexeme,
                        token.location,
                    );
                }
            }
        }
        Ok(())
    }

    /// Stores an `xmlns` attribute as an anonymous default namespace node.
    /// Only the XHTML URI is accepted; anything else is dropped with a
    /// warning. The node never enters any scope.
    fn attach_html_namespace(&mut self, elem: NodeId, uri: &str, location: SourceLocation) {
        if uri != XHTML_NAMESPACE {
            self.warn("xmlns ignored: not the XHTML namespace", uri.to_string(), location);
            return;
        }
        let ns = self.doc.create_node(NodeKind::Namespace {
            prefix: String::new(),
            uri: uri.to_string(),
            is_default: true,
            is_global: false,
        });
        let index = self.doc.namespace_decls(elem).len();
        let data = self.doc.node_mut(ns);
        data.parent = Some(elem);
        data.index = index;
        if let NodeKind::Element {
            namespace_decls,
            namespace,
            ..
        } = &mut self.doc.node_mut(elem).kind
        {
            namespace_decls.push(ns);
            *namespace = Some(ns);
        }
    }

    fn attach_attribute(&mut self, elem: NodeId, name_token: &Token, value: String) {
        // Keep the first occurrence on duplicate names.
        if self.doc.attribute_node(elem, &name_token.lexeme).is_some() {
            self.warn(
                "duplicate attribute ignored",
                name_token.lexeme.clone(),
                name_token.location,
            );
            return;
        }
        let node = self.doc.create_node(NodeKind::Attribute {
            name: QName::local(name_token.lexeme.clone()),
            value,
            namespace: None,
        });
        let index = self.doc.attributes(elem).len();
        let data = self.doc.node_mut(node);
        data.parent = Some(elem);
        data.index = index;
        if let NodeKind::Element { attributes, .. } = &mut self.doc.node_mut(elem).kind {
            attributes.push(node);
        }
    }

    // --- Script bodies ---

    /// Captures the `<script>` element body opaquely: raw scans up to each
    /// `</`, checking whether the following name is `script`. A `</` whose
    /// name differs is folded into the body, so the first `</script`
    /// sequence ends the content — even inside a string literal in the
    /// script body. Non-whitespace content becomes a single synthetic text
    /// child.
    fn parse_script_body(&mut self, elem: NodeId, lower: &str) -> Result<(), ParseError> {
        debug_assert!(self.peeked.is_none(), "raw scan with a pending token");
        let start = self.lexer.location();
        let mut body = String::new();
        loop {
            let chunk = self.lexer.create_synthetic_token("</");
            body.push_str(&chunk.lexeme);
            if self.lexer.at_eof() {
                self.warn(
                    format!("unclosed <{lower}> at end of document"),
                    lower.to_string(),
                    start,
                );
                break;
            }
            if self.lexer.at_end_tag(lower) {
                self.expect(TokenKind::OpenAngle)?;
                self.expect(TokenKind::Slash)?;
                self.expect(TokenKind::Name)?;
                self.expect(TokenKind::CloseAngle)?;
                break;
            }
            body.push_str("</");
            self.lexer.skip_raw(2);
        }

        if !body.chars().all(char::is_whitespace) {
            let has_entity = body.contains('&');
            let text = self.doc.create_node(NodeKind::Text {
                content: body,
                is_cdata: false,
                has_entity,
            });
            self.doc.append_child(elem, text);
        }
        Ok(())
    }

    // --- Element content ---

    fn parse_content(&mut self, elem: NodeId, lower: &str) -> Result<(), ParseError> {
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Eof => {
                    // Unclosed element at end of input: tolerated.
                    self.warn(
                        format!("unclosed element <{lower}> at end of document"),
                        lower.to_string(),
                        token.location,
                    );
                    return Ok(());
                }
                TokenKind::Text => {
                    let text = self.make_text(&token);
                    self.doc.append_child(elem, text);
                }
                TokenKind::Comment => {
                    let comment = self.doc.create_node(NodeKind::Comment {
                        content: token.lexeme,
                    });
                    self.doc.append_child(elem, comment);
                }
                TokenKind::Doctype => {
                    self.warn("DOCTYPE ignored in element content", token.lexeme, token.location);
                }
                TokenKind::OpenAngle => match self.peek_kind()? {
                    TokenKind::Slash => {
                        self.next()?;
                        let end = self.expect(TokenKind::Name)?;
                        if !end.lexeme.eq_ignore_ascii_case(lower) {
                            return Err(ParseError::new(
                                format!(
                                    "mismatched end tag: expected </{lower}>, found </{}>",
                                    end.lexeme
                                ),
                                end.lexeme,
                                end.location,
                            ));
                        }
                        self.expect(TokenKind::CloseAngle)?;
                        return Ok(());
                    }
                    TokenKind::Question => {
                        self.next()?;
                        let target = self.expect(TokenKind::Name)?;
                        self.parse_pi_rest(&target, elem)?;
                    }
                    _ => {
                        self.parse_element(elem)?;
                    }
                },
                _ => {
                    self.warn(
                        format!("unexpected {} in element content", token.kind),
                        token.lexeme,
                        token.location,
                    );
                }
            }
        }
    }

    /// Computes the element's derived flags once its content is complete.
    fn finish_element(&mut self, elem: NodeId, self_enclosing: bool, is_void: bool) {
        let children = self.doc.children(elem);
        let has_child = !children.is_empty();
        let has_text = children.iter().any(|&c| self.doc.node(c).kind.is_text());
        let has_comment = children
            .iter()
            .any(|&c| matches!(self.doc.node(c).kind, NodeKind::Comment { .. }));
        let has_attribute = !self.doc.attributes(elem).is_empty();
        let is_namespaced = matches!(
            &self.doc.node(elem).kind,
            NodeKind::Element {
                namespace: Some(_),
                ..
            }
        );
        if let NodeKind::Element { flags, .. } = &mut self.doc.node_mut(elem).kind {
            *flags = ElementFlags {
                has_child,
                has_text,
                has_comment,
                has_attribute,
                is_self_enclosing: self_enclosing || !has_child,
                is_void,
                is_namespaced,
            };
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::{parse_html, ParseOptions};
    use crate::tree::{Document, ElementMode, NodeKind};
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Document {
        parse_html(input, &ParseOptions::default()).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    fn element_flags(doc: &Document, id: crate::tree::NodeId) -> crate::tree::ElementFlags {
        match &doc.node(id).kind {
            NodeKind::Element { flags, .. } => *flags,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_void_element_without_end_tag() {
        let doc = parse("<br>");
        let br = doc.root_element().unwrap();
        assert_eq!(doc.node_name(br).as_deref(), Some("br"));
        let flags = element_flags(&doc, br);
        assert!(flags.is_void);
        assert!(flags.is_self_enclosing);
    }

    #[test]
    fn test_void_elements_inside_content() {
        let doc = parse("<p>a<br>b</p>");
        let p = doc.root_element().unwrap();
        let children = doc.children(p);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.node_name(children[1]).as_deref(), Some("br"));
        assert_eq!(doc.text_content(p), "ab");
    }

    #[test]
    fn test_mode_tag_is_html() {
        let doc = parse("<div></div>");
        let div = doc.root_element().unwrap();
        match &doc.node(div).kind {
            NodeKind::Element { mode, .. } => assert_eq!(*mode, ElementMode::Html),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_valueless_attribute_gets_empty_value() {
        let doc = parse("<input disabled>");
        let input = doc.root_element().unwrap();
        assert_eq!(doc.attribute(input, "disabled"), Some(""));
    }

    #[test]
    fn test_unquoted_attribute_value() {
        let doc = parse("<div class=main></div>");
        let div = doc.root_element().unwrap();
        assert_eq!(doc.attribute(div, "class"), Some("main"));
    }

    #[test]
    fn test_stray_angle_in_text() {
        let doc = parse("<p>1 < 2</p>");
        let p = doc.root_element().unwrap();
        assert_eq!(doc.text_content(p), "1 < 2");
    }

    #[test]
    fn test_script_body_opaque() {
        let doc = parse("<script>if (a < b && c) { go(); }</script>");
        let script = doc.root_element().unwrap();
        let children = doc.children(script);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.node_text(children[0]), Some("if (a < b && c) { go(); }"));
    }

    #[test]
    fn test_script_body_with_markup_not_parsed() {
        let doc = parse("<script>document.write(\"<b>hi</\" + \"b>\");</script>");
        let script = doc.root_element().unwrap();
        // `</` runs whose name is not `script` stay in the body; the first
        // `</script` sequence ends it, even inside a string literal.
        let children = doc.children(script);
        assert_eq!(children.len(), 1);
        assert_eq!(
            doc.node_text(children[0]),
            Some("document.write(\"<b>hi</\" + \"b>\");")
        );
    }

    #[test]
    fn test_empty_script_has_no_text_child() {
        let doc = parse("<script>  </script>");
        let script = doc.root_element().unwrap();
        assert!(doc.children(script).is_empty());
    }

    #[test]
    fn test_closing_mismatch_is_fatal() {
        let result = parse_html("<div><span></div>", &ParseOptions::default());
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("mismatched end tag"));
    }

    #[test]
    fn test_end_tag_case_insensitive() {
        let doc = parse("<DIV></div>");
        assert_eq!(
            doc.node_name(doc.root_element().unwrap()).as_deref(),
            Some("DIV")
        );
    }

    #[test]
    fn test_colon_in_name() {
        let doc = parse("<fb:like></fb:like>");
        let elem = doc.root_element().unwrap();
        // The colon is part of the local name, not a prefix separator.
        assert_eq!(doc.local_name(elem), Some("fb:like"));
        match &doc.node(elem).kind {
            NodeKind::Element { name, .. } => assert!(name.prefix.is_none()),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_xmlns_xhtml_accepted() {
        let doc = parse("<html xmlns=\"http://www.w3.org/1999/xhtml\"></html>");
        let html = doc.root_element().unwrap();
        let decls = doc.namespace_decls(html);
        assert_eq!(decls.len(), 1);
        match &doc.node(decls[0]).kind {
            NodeKind::Namespace {
                prefix,
                uri,
                is_default,
                ..
            } => {
                assert!(prefix.is_empty());
                assert_eq!(uri, "http://www.w3.org/1999/xhtml");
                assert!(is_default);
            }
            other => panic!("expected namespace, got {other:?}"),
        }
        assert!(element_flags(&doc, html).is_namespaced);
    }

    #[test]
    fn test_xmlns_other_uri_dropped() {
        let doc = parse("<html xmlns=\"urn:other\"></html>");
        let html = doc.root_element().unwrap();
        assert!(doc.namespace_decls(html).is_empty());
        assert!(!doc.is_well_formed);
    }

    #[test]
    fn test_doctype_tolerated() {
        let doc = parse("<!DOCTYPE html><html></html>");
        assert!(doc.doctype().is_some());
        assert!(doc.root_element().is_some());
    }

    #[test]
    fn test_unclosed_element_tolerated() {
        let doc = parse("<div><p>text");
        assert!(!doc.is_well_formed);
        let div = doc.root_element().unwrap();
        let p = doc.first_child(div).unwrap();
        assert_eq!(doc.text_content(p), "text");
    }

    #[test]
    fn test_multiple_top_level_elements_tolerated() {
        let doc = parse("<a></a><b></b>");
        assert_eq!(doc.children(doc.root()).len(), 2);
    }

    #[test]
    fn test_duplicate_attribute_keeps_first() {
        let doc = parse("<div class=\"a\" class=\"b\"></div>");
        let div = doc.root_element().unwrap();
        assert_eq!(doc.attribute(div, "class"), Some("a"));
        assert!(!doc.is_well_formed);
    }

    #[test]
    fn test_comment_in_html() {
        let doc = parse("<div><!-- note --></div>");
        let div = doc.root_element().unwrap();
        let child = doc.first_child(div).unwrap();
        assert_eq!(doc.node_text(child), Some(" note "));
    }

    #[test]
    fn test_all_void_names() {
        for tag in [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
            "track", "wbr",
        ] {
            let doc = parse(&format!("<{tag}>"));
            let elem = doc.root_element().unwrap();
            assert!(element_flags(&doc, elem).is_void, "{tag} should be void");
        }
    }

    #[test]
    fn test_param_is_not_void() {
        // `param` is not in the void set; it needs an end tag.
        let doc = parse("<param></param>");
        let elem = doc.root_element().unwrap();
        assert!(!element_flags(&doc, elem).is_void);
    }
}
