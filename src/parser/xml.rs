//! Strict XML parser.
//!
//! A recursive descent parser over the token stream. Grammar:
//!
//! ```text
//! document ::= prolog element Misc*
//! prolog   ::= XMLDecl? Misc* (doctypedecl Misc*)?
//! ```
//!
//! The parser maintains a namespace scope table — a chain of
//! prefix→namespace maps with one frame per open element, seeded at the
//! bottom with the reserved `xml` and `xmlns` bindings — and enforces the
//! namespace constraints of Namespaces in XML 1.0. All structural failures
//! are fatal; reserved-name misuse and stray document-level text produce
//! warnings that clear the well-formedness flag.

use std::collections::{HashMap, HashSet};

use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};
use crate::lexer::{Dialect, Lexer};
use crate::token::{Token, TokenKind};
use crate::tree::{Document, ElementFlags, ElementMode, NodeId, NodeKind, QName};

use super::{ParseOptions, XMLNS_NAMESPACE, XML_NAMESPACE};

/// An attribute as written in the source, before namespace resolution.
struct RawAttr {
    name: QName,
    value: String,
    location: SourceLocation,
}

impl RawAttr {
    /// A qualified attribute whose prefix is `xmlns`, or whose whole name
    /// is `xmlns`, is a namespace declaration.
    fn is_namespace_decl(&self) -> bool {
        self.name.prefix.as_deref() == Some("xmlns")
            || (self.name.prefix.is_none() && self.name.local == "xmlns")
    }
}

/// The strict XML parser.
pub(crate) struct XmlParser<'a> {
    lexer: Lexer<'a>,
    /// One-token pushback buffer.
    peeked: Option<Token>,
    doc: Document,
    options: ParseOptions,
    /// Namespace scope chain: prefix (`""` for default) → namespace node.
    /// One frame per open element, plus the reserved base frame.
    scopes: Vec<HashMap<String, NodeId>>,
    /// Warnings counted even when not collected.
    warning_count: u32,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        let mut lexer = Lexer::new(input, Dialect::Xml);
        lexer.set_preserve_space(options.preserve_space);
        lexer.set_preserve_comment(options.preserve_comment);
        lexer.set_preserve_cdata(options.preserve_cdata);
        lexer.set_preserve_dtd_structure(options.preserve_dtd_structure);

        Self {
            lexer,
            peeked: None,
            doc: Document::new(options.document_name.clone()),
            options: options.clone(),
            scopes: Vec::new(),
            warning_count: 0,
        }
    }

    /// Main parse entry point. Parses the entire document.
    pub fn parse(mut self) -> Result<Document, ParseError> {
        self.seed_global_namespaces();
        self.parse_document_level()?;

        if self.doc.root_element().is_none() {
            return Err(self.fatal("missing root element", "", self.lexer.location()));
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
            return Err(self.fatal(
                format!("expected {kind}, found {}", token.kind),
                token.lexeme,
                token.location,
            ));
        }
        Ok(token)
    }

    // --- Diagnostics ---

    fn fatal(
        &self,
        message: impl Into<String>,
        lexeme: impl Into<String>,
        location: SourceLocation,
    ) -> ParseError {
        ParseError::new(message, lexeme, location)
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

    // --- Reserved namespaces ---

    /// Inserts the reserved `xml` and `xmlns` bindings as global namespace
    /// nodes at the root, forming the bottom scope frame.
    fn seed_global_namespaces(&mut self) {
        let root = self.doc.root();
        let mut base = HashMap::new();
        for (prefix, uri) in [("xml", XML_NAMESPACE), ("xmlns", XMLNS_NAMESPACE)] {
            let ns = self.doc.create_node(NodeKind::Namespace {
                prefix: prefix.to_string(),
                uri: uri.to_string(),
                is_default: false,
                is_global: true,
            });
            self.doc.node_mut(ns).parent = Some(root);
            self.doc.global_namespaces.push(ns);
            base.insert(prefix.to_string(), ns);
        }
        self.scopes.push(base);
    }

    // --- Document level ---

    fn parse_document_level(&mut self) -> Result<(), ParseError> {
        let root = self.doc.root();
        let mut produced_any = false;

        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Text => {
                    if !token.lexeme.chars().all(char::is_whitespace) {
                        self.warn(
                            "non-whitespace text at document level",
                            token.lexeme.trim().to_string(),
                            token.location,
                        );
                        produced_any = true;
                    }
                }
                TokenKind::Comment => {
                    let comment = self.doc.create_node(NodeKind::Comment {
                        content: token.lexeme,
                    });
                    self.doc.append_child(root, comment);
                    produced_any = true;
                }
                TokenKind::Doctype => {
                    if self.doc.doctype().is_some() {
                        return Err(self.fatal(
                            "multiple DOCTYPE declarations",
                            token.lexeme,
                            token.location,
                        ));
                    }
                    let doctype = self.doc.create_node(NodeKind::Doctype {
                        value: token.lexeme,
                    });
                    self.doc.append_child(root, doctype);
                    produced_any = true;
                }
                TokenKind::OpenAngle => {
                    match self.peek_kind()? {
                        TokenKind::Question => {
                            self.next()?;
                            let target = self.expect(TokenKind::Name)?;
                            if target.lexeme == "xml" {
                                if produced_any || self.doc.xml_decl().is_some() {
                                    return Err(self.fatal(
                                        "XML declaration must be at the start of the document",
                                        "<?xml",
                                        target.location,
                                    ));
                                }
                                self.parse_xml_declaration()?;
                            } else {
                                self.parse_pi_rest(&target, root)?;
                            }
                            produced_any = true;
                        }
                        TokenKind::Slash => {
                            return Err(self.fatal(
                                "unexpected closing tag at document level",
                                "</",
                                token.location,
                            ));
                        }
                        _ => {
                            if self.doc.root_element().is_some() {
                                return Err(self.fatal(
                                    "multiple root elements",
                                    "",
                                    token.location,
                                ));
                            }
                            self.parse_element(root)?;
                            produced_any = true;
                        }
                    }
                }
                _ => {
                    return Err(self.fatal(
                        format!("unexpected {} at document level", token.kind),
                        token.lexeme,
                        token.location,
                    ));
                }
            }
        }
        Ok(())
    }

    // --- XML declaration ---

    fn parse_xml_declaration(&mut self) -> Result<(), ParseError> {
        let mut raw = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Name => {
                    let name = self.expect(TokenKind::Name)?;
                    self.expect(TokenKind::Equals)?;
                    let value = self.expect(TokenKind::Literal)?;
                    raw.push((name.lexeme, value.lexeme));
                }
                TokenKind::Question => {
                    self.next()?;
                    self.expect(TokenKind::CloseAngle)?;
                    break;
                }
                _ => {
                    let token = self.next()?;
                    return Err(self.fatal(
                        "malformed XML declaration",
                        token.lexeme,
                        token.location,
                    ));
                }
            }
        }

        let decl = self.doc.create_node(NodeKind::XmlDecl {
            attributes: Vec::new(),
        });
        let root = self.doc.root();
        self.doc.append_child(root, decl);
        for (index, (name, value)) in raw.into_iter().enumerate() {
            let attr = self.doc.create_node(NodeKind::Attribute {
                name: QName::local(name),
                value,
                namespace: None,
            });
            let data = self.doc.node_mut(attr);
            data.parent = Some(decl);
            data.index = index;
            if let NodeKind::XmlDecl { attributes } = &mut self.doc.node_mut(decl).kind {
                attributes.push(attr);
            }
        }
        Ok(())
    }

    // --- Processing instructions ---

    /// Parses the remainder of a PI after `<?target`. The value is scanned
    /// raw up to the `?>` delimiter.
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

    // --- Qualified names ---

    /// Parses `Name (':' Name)?` into a qualified name.
    fn parse_qname(&mut self) -> Result<(QName, SourceLocation), ParseError> {
        let first = self.expect(TokenKind::Name)?;
        if self.peek_kind()? == TokenKind::Colon {
            self.next()?;
            let second = self.expect(TokenKind::Name)?;
            Ok((
                QName::new(Some(first.lexeme), second.lexeme),
                first.location,
            ))
        } else {
            let location = first.location;
            Ok((QName::local(first.lexeme), location))
        }
    }

    /// Warns when a name part begins with the reserved sequence `xml`
    /// (case-insensitive) without being exactly `xml` or `xmlns`.
    fn check_reserved_name(&mut self, name: &QName, location: SourceLocation) {
        let parts = [name.prefix.as_deref(), Some(name.local.as_str())];
        for part in parts.into_iter().flatten() {
            if part.to_ascii_lowercase().starts_with("xml") && part != "xml" && part != "xmlns" {
                self.warn(
                    "name begins with the reserved sequence 'xml'",
                    part.to_string(),
                    location,
                );
            }
        }
    }

    // --- Elements ---

    /// Parses an element. The leading `<` has been consumed; the cursor is
    /// on the name.
    fn parse_element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let (name, name_loc) = self.parse_qname()?;
        if name.prefix.as_deref() == Some("xmlns") {
            return Err(self.fatal(
                "elements must not have the prefix 'xmlns'",
                name.qualified(),
                name_loc,
            ));
        }
        self.check_reserved_name(&name, name_loc);

        self.scopes.push(HashMap::new());

        let raw_attrs = self.parse_attribute_list()?;

        // Duplicate qualified attribute names (keys unique).
        {
            let mut seen = HashSet::new();
            for attr in &raw_attrs {
                let qualified = attr.name.qualified();
                if !seen.insert(qualified.clone()) {
                    return Err(self.fatal("duplicate attribute", qualified, attr.location));
                }
            }
        }

        let elem = self.doc.create_node(NodeKind::Element {
            name: name.clone(),
            attributes: Vec::new(),
            namespace_decls: Vec::new(),
            namespace: None,
            mode: ElementMode::Xml,
            flags: ElementFlags::default(),
        });
        self.doc.append_child(parent, elem);

        // Namespace declarations are bound into the current scope first;
        // namespaced regular attributes are resolved after the full list.
        for attr in &raw_attrs {
            if attr.is_namespace_decl() {
                self.declare_namespace(elem, attr)?;
            }
        }
        for attr in &raw_attrs {
            if !attr.is_namespace_decl() {
                self.attach_attribute(elem, attr);
            }
        }
        self.resolve_namespaces(elem, &name, name_loc)?;

        // Self-close or content.
        let token = self.next()?;
        let self_enclosing = match token.kind {
            TokenKind::Slash => {
                self.expect(TokenKind::CloseAngle)?;
                true
            }
            TokenKind::CloseAngle => {
                self.parse_content(elem, &name)?;
                false
            }
            _ => {
                return Err(self.fatal(
                    format!("expected '>' or '/>', found {}", token.kind),
                    token.lexeme,
                    token.location,
                ));
            }
        };

        self.scopes.pop();
        self.finish_element(elem, self_enclosing);
        Ok(elem)
    }

    fn parse_attribute_list(&mut self) -> Result<Vec<RawAttr>, ParseError> {
        let mut attrs = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Slash | TokenKind::CloseAngle => break,
                TokenKind::Name => {
                    let (name, location) = self.parse_qname()?;
                    if !name.is_namespace_decl_name() {
                        self.check_reserved_name(&name, location);
                    }
                    self.expect(TokenKind::Equals)?;
                    let value = self.expect(TokenKind::Literal)?;
                    attrs.push(RawAttr {
                        name,
                        value: value.lexeme,
                        location,
                    });
                }
                _ => {
                    let token = self.next()?;
                    return Err(self.fatal(
                        format!("unexpected {} in element tag", token.kind),
                        token.lexeme,
                        token.location,
                    ));
                }
            }
        }
        Ok(attrs)
    }

    /// Binds a namespace declaration into the current scope, enforcing the
    /// reserved-namespace constraints.
    fn declare_namespace(&mut self, elem: NodeId, attr: &RawAttr) -> Result<(), ParseError> {
        let is_default = attr.name.prefix.is_none();
        let declared_prefix = if is_default {
            String::new()
        } else {
            attr.name.local.clone()
        };
        let uri = attr.value.clone();

        if !is_default {
            if declared_prefix == "xmlns" {
                return Err(self.fatal(
                    "the 'xmlns' prefix must not be declared",
                    attr.name.qualified(),
                    attr.location,
                ));
            }
            if uri.is_empty() {
                return Err(self.fatal(
                    format!("namespace prefix '{declared_prefix}' cannot be undeclared"),
                    attr.name.qualified(),
                    attr.location,
                ));
            }
            if declared_prefix == "xml" && uri != XML_NAMESPACE {
                return Err(self.fatal(
                    "the 'xml' prefix may only be bound to the XML namespace",
                    uri,
                    attr.location,
                ));
            }
            if declared_prefix != "xml" && uri == XML_NAMESPACE {
                return Err(self.fatal(
                    "only the 'xml' prefix may be bound to the XML namespace",
                    declared_prefix,
                    attr.location,
                ));
            }
        } else if uri == XML_NAMESPACE {
            return Err(self.fatal(
                "the XML namespace must not be the default namespace",
                uri,
                attr.location,
            ));
        }
        if uri == XMLNS_NAMESPACE {
            return Err(self.fatal(
                "the xmlns namespace must not be bound",
                uri,
                attr.location,
            ));
        }

        #[allow(clippy::expect_used)]
        let frame = self.scopes.last_mut().expect("scope chain is never empty");
        if frame.contains_key(&declared_prefix) {
            return Err(self.fatal(
                "duplicate namespace declaration",
                attr.name.qualified(),
                attr.location,
            ));
        }

        let ns = self.doc.create_node(NodeKind::Namespace {
            prefix: declared_prefix.clone(),
            uri,
            is_default,
            is_global: false,
        });
        #[allow(clippy::expect_used)]
        self.scopes
            .last_mut()
            .expect("scope chain is never empty")
            .insert(declared_prefix, ns);

        let index = self.doc.namespace_decls(elem).len();
        let data = self.doc.node_mut(ns);
        data.parent = Some(elem);
        data.index = index;
        if let NodeKind::Element {
            namespace_decls, ..
        } = &mut self.doc.node_mut(elem).kind
        {
            namespace_decls.push(ns);
        }
        Ok(())
    }

    /// Creates an attribute node on the element (namespace unresolved).
    fn attach_attribute(&mut self, elem: NodeId, attr: &RawAttr) {
        let node = self.doc.create_node(NodeKind::Attribute {
            name: attr.name.clone(),
            value: attr.value.clone(),
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

    /// Resolves a prefix through the scope chain (innermost frame wins).
    fn resolve_prefix(&self, prefix: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.get(prefix).copied())
    }

    /// Resolves the element's own namespace, binds an in-scope default when
    /// configured, resolves the deferred namespaced attributes, and checks
    /// expanded-name uniqueness.
    fn resolve_namespaces(
        &mut self,
        elem: NodeId,
        name: &QName,
        name_loc: SourceLocation,
    ) -> Result<(), ParseError> {
        // Element prefix.
        let elem_ns = match &name.prefix {
            Some(prefix) => match self.resolve_prefix(prefix) {
                Some(ns) => Some(ns),
                None => {
                    if self.options.allow_missing_namespaces {
                        None
                    } else {
                        return Err(self.fatal(
                            format!("unbound namespace prefix '{prefix}'"),
                            name.qualified(),
                            name_loc,
                        ));
                    }
                }
            },
            None => {
                if self.options.allow_default_namespace_bindings {
                    self.resolve_prefix("").filter(|&ns| {
                        matches!(
                            &self.doc.node(ns).kind,
                            NodeKind::Namespace { is_default: true, uri, .. } if !uri.is_empty()
                        )
                    })
                } else {
                    None
                }
            }
        };
        if let NodeKind::Element { namespace, .. } = &mut self.doc.node_mut(elem).kind {
            *namespace = elem_ns;
        }

        // Deferred namespaced attributes.
        let attr_ids: Vec<NodeId> = self.doc.attributes(elem).to_vec();
        for attr_id in &attr_ids {
            let (prefix, qualified, location) = match &self.doc.node(*attr_id).kind {
                NodeKind::Attribute { name, .. } => match &name.prefix {
                    Some(p) => (p.clone(), name.qualified(), name_loc),
                    None => continue,
                },
                _ => continue,
            };
            match self.resolve_prefix(&prefix) {
                Some(ns) => {
                    if let NodeKind::Attribute { namespace, .. } =
                        &mut self.doc.node_mut(*attr_id).kind
                    {
                        *namespace = Some(ns);
                    }
                }
                None => {
                    if !self.options.allow_missing_namespaces {
                        return Err(self.fatal(
                            format!("unbound namespace prefix '{prefix}' on attribute"),
                            qualified,
                            location,
                        ));
                    }
                }
            }
        }

        // Expanded-name uniqueness (namespace URI + local name).
        if self.options.ensure_unique_namespaced_attributes {
            let mut seen: HashSet<(String, String)> = HashSet::new();
            for attr_id in &attr_ids {
                let NodeKind::Attribute {
                    name, namespace, ..
                } = &self.doc.node(*attr_id).kind
                else {
                    continue;
                };
                let Some(ns) = namespace else { continue };
                let uri = self.doc.namespace_uri(*ns).unwrap_or("").to_string();
                let key = (uri.clone(), name.local.clone());
                if !seen.insert(key) {
                    return Err(self.fatal(
                        "duplicate attribute expanded name",
                        format!("{uri}:{}", name.local),
                        name_loc,
                    ));
                }
            }
        }

        Ok(())
    }

    // --- Element content ---

    fn parse_content(&mut self, elem: NodeId, name: &QName) -> Result<(), ParseError> {
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Eof => {
                    return Err(self.fatal(
                        format!("unexpected end of input in element <{name}>"),
                        name.qualified(),
                        token.location,
                    ));
                }
                TokenKind::Text => {
                    let has_entity = token.lexeme.contains('&');
                    let text = self.doc.create_node(NodeKind::Text {
                        content: token.lexeme,
                        is_cdata: token.is_cdata,
                        has_entity,
                    });
                    self.doc.append_child(elem, text);
                }
                TokenKind::Comment => {
                    let comment = self.doc.create_node(NodeKind::Comment {
                        content: token.lexeme,
                    });
                    self.doc.append_child(elem, comment);
                }
                TokenKind::Doctype => {
                    return Err(self.fatal(
                        "DOCTYPE not allowed in element content",
                        token.lexeme,
                        token.location,
                    ));
                }
                TokenKind::OpenAngle => match self.peek_kind()? {
                    TokenKind::Slash => {
                        self.next()?;
                        let (end_name, end_loc) = self.parse_qname()?;
                        if end_name != *name {
                            return Err(self.fatal(
                                format!(
                                    "mismatched end tag: expected </{name}>, found </{end_name}>"
                                ),
                                end_name.qualified(),
                                end_loc,
                            ));
                        }
                        self.expect(TokenKind::CloseAngle)?;
                        return Ok(());
                    }
                    TokenKind::Question => {
                        self.next()?;
                        let target = self.expect(TokenKind::Name)?;
                        if target.lexeme == "xml" {
                            return Err(self.fatal(
                                "XML declaration not allowed in element content",
                                "<?xml",
                                target.location,
                            ));
                        }
                        self.parse_pi_rest(&target, elem)?;
                    }
                    _ => {
                        self.parse_element(elem)?;
                    }
                },
                _ => {
                    return Err(self.fatal(
                        format!("unexpected {} in element content", token.kind),
                        token.lexeme,
                        token.location,
                    ));
                }
            }
        }
    }

    /// Computes the element's derived flags once its content is complete.
    fn finish_element(&mut self, elem: NodeId, self_enclosing: bool) {
        let children = self.doc.children(elem);
        let has_child = !children.is_empty();
        let has_text = children
            .iter()
            .any(|&c| self.doc.node(c).kind.is_text());
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
                is_void: false,
                is_namespaced,
            };
        }
    }
}

impl QName {
    /// Returns `true` if this name, used as an attribute name, declares a
    /// namespace.
    fn is_namespace_decl_name(&self) -> bool {
        self.prefix.as_deref() == Some("xmlns") || (self.prefix.is_none() && self.local == "xmlns")
    }
}
