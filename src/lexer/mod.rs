//! Markup tokenizer.
//!
//! A character cursor producing one [`Token`] per request, tracking line and
//! column for diagnostics. The lexer runs in one of two dialects chosen at
//! construction:
//!
//! - [`Dialect::Xml`]: strict tokenization. Qualified names lex as
//!   `name ':' name` token triples, stray `<` in text is an error.
//! - [`Dialect::Html`]: tolerant tokenization. `:` is an ordinary name
//!   character, stray `<` characters in text are folded into the text run,
//!   and unquoted attribute values are accepted.
//!
//! Text context is tracked through a single flag recording the last-seen
//! angle bracket: after `>` the lexer is in element content and produces raw
//! text runs; after `<` it produces tag-structure tokens.
//!
//! Compound lexemes (comments, CDATA sections, DOCTYPE declarations
//! including a structurally-balanced internal subset) are recognized as
//! single tokens.
//!
//! # Failure semantics
//!
//! An unterminated comment/string/CDATA, invalid DTD markup, or unknown
//! character produces an [`TokenKind::Error`] token carrying line/column and
//! a message. Error tokens are cumulative: every subsequent request returns
//! the stored error token again, so parser loops fail fast instead of
//! re-escalating.

use crate::error::SourceLocation;
use crate::token::{Token, TokenKind};

/// The tokenization dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Strict XML tokenization.
    Xml,
    /// Tolerant HTML tokenization.
    Html,
}

/// Returns `true` if `b` can start a markup name.
pub(crate) fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

/// Returns `true` if `b` can continue a markup name. The colon is a name
/// character only in the HTML dialect; XML qualified names lex as separate
/// `name ':' name` tokens.
pub(crate) fn is_name_char(b: u8, dialect: Dialect) -> bool {
    b.is_ascii_alphanumeric()
        || b == b'_'
        || b == b'.'
        || b == b'-'
        || (dialect == Dialect::Html && b == b':')
}

/// The markup tokenizer.
pub struct Lexer<'a> {
    /// The input bytes (valid UTF-8).
    input: &'a [u8],
    /// Current byte offset.
    pos: usize,
    /// Current line (1-based).
    line: u32,
    /// Current column (1-based).
    column: u32,
    /// The dialect chosen at construction.
    dialect: Dialect,
    /// Last-seen angle bracket: `true` after `>` (element content may
    /// follow), `false` after `<` (tag structure follows).
    in_content: bool,
    /// Set after an `=` inside a tag; enables unquoted attribute values in
    /// the HTML dialect.
    after_equals: bool,
    /// Keep whitespace-only text runs in element content.
    preserve_space: bool,
    /// Emit comment tokens (when off, comments are consumed and dropped).
    preserve_comment: bool,
    /// Emit CDATA text tokens (when off, sections are consumed and dropped).
    preserve_cdata: bool,
    /// Carry the full DOCTYPE declaration text instead of just the name.
    preserve_dtd_structure: bool,
    /// The sticky error token, once one has been produced.
    stored_error: Option<Token>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input` in the given dialect.
    #[must_use]
    pub fn new(input: &'a str, dialect: Dialect) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            dialect,
            in_content: true,
            after_equals: false,
            preserve_space: true,
            preserve_comment: true,
            preserve_cdata: true,
            preserve_dtd_structure: false,
            stored_error: None,
        }
    }

    /// Sets whether whitespace-only text runs are emitted.
    pub fn set_preserve_space(&mut self, yes: bool) {
        self.preserve_space = yes;
    }

    /// Sets whether comment tokens are emitted.
    pub fn set_preserve_comment(&mut self, yes: bool) {
        self.preserve_comment = yes;
    }

    /// Sets whether CDATA text tokens are emitted.
    pub fn set_preserve_cdata(&mut self, yes: bool) {
        self.preserve_cdata = yes;
    }

    /// Sets whether DOCTYPE tokens carry the complete declaration text.
    pub fn set_preserve_dtd_structure(&mut self, yes: bool) {
        self.preserve_dtd_structure = yes;
    }

    /// Returns the current source location.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    // -- Cursor primitives --

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Advances the position by `count` bytes, updating line/column.
    fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.pos < self.input.len() {
                if self.input[self.pos] == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                self.pos += 1;
            }
        }
    }

    /// Returns `true` if the input at the current position starts with `s`.
    fn looking_at(&self, s: &[u8]) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Case-insensitive variant of [`looking_at`](Self::looking_at).
    fn looking_at_ci(&self, s: &[u8]) -> bool {
        let end = self.pos + s.len();
        if end > self.input.len() {
            return false;
        }
        self.input[self.pos..end].eq_ignore_ascii_case(s)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.advance(1);
        }
    }

    /// Returns the UTF-8 slice from `start` to the current position.
    fn slice_from(&self, start: usize) -> &str {
        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("")
    }

    /// Produces (and stores) an error token at the given location.
    fn error_token(&mut self, message: impl Into<String>, location: SourceLocation) -> Token {
        let token = Token::new(TokenKind::Error, message, location);
        self.stored_error = Some(token.clone());
        token
    }

    // -- Tokenization --

    /// Returns the next token.
    ///
    /// After an error token has been produced, every subsequent call returns
    /// the same error token.
    pub fn next_token(&mut self) -> Token {
        if let Some(err) = &self.stored_error {
            return err.clone();
        }

        loop {
            if self.in_content {
                if let Some(token) = self.scan_text() {
                    return token;
                }
                if self.at_end() {
                    return Token::new(TokenKind::Eof, "", self.location());
                }
                // Fall through: the cursor now rests on markup.
            } else {
                self.skip_whitespace();
                if self.at_end() {
                    return Token::new(TokenKind::Eof, "", self.location());
                }
            }

            match self.scan_markup() {
                Some(token) => return token,
                // Suppressed comment/CDATA: keep scanning.
                None => continue,
            }
        }
    }

    /// Scans a raw run of characters until the end of the input.
    ///
    /// Used for `<script>` element bodies: the scan stops *before* the first
    /// occurrence of `delimiter` (which is left for normal tokenization) or
    /// at end of input. The returned text token carries everything scanned,
    /// verbatim.
    pub fn create_synthetic_token(&mut self, delimiter: &str) -> Token {
        let location = self.location();
        let start = self.pos;
        let delim = delimiter.as_bytes();
        while !self.at_end() && !self.looking_at(delim) {
            self.advance(1);
        }
        Token::new(TokenKind::Text, self.slice_from(start), location)
    }

    /// Returns `true` if all input has been consumed.
    pub(crate) fn at_eof(&self) -> bool {
        self.at_end()
    }

    /// Returns `true` if the cursor rests on `</name` (case-insensitive)
    /// with the name at a boundary (whitespace, `>`, `/`, or end of input).
    pub(crate) fn at_end_tag(&self, name: &str) -> bool {
        if !self.looking_at(b"</") {
            return false;
        }
        let after = self.pos + 2;
        let end = after + name.len();
        if end > self.input.len() {
            return false;
        }
        if !self.input[after..end].eq_ignore_ascii_case(name.as_bytes()) {
            return false;
        }
        match self.input.get(end) {
            None => true,
            Some(&b) => b.is_ascii_whitespace() || b == b'>' || b == b'/',
        }
    }

    /// Advances the cursor by `count` raw bytes. Used by parsers that fold
    /// unconsumed markup back into a raw scan.
    pub(crate) fn skip_raw(&mut self, count: usize) {
        self.advance(count);
    }

    /// Scans a text run in element content. Returns `None` when there is no
    /// text to emit at the current position (markup follows immediately, or
    /// the run was whitespace-only and whitespace is not preserved).
    fn scan_text(&mut self) -> Option<Token> {
        let location = self.location();
        let start = self.pos;

        while let Some(b) = self.peek() {
            if b == b'<' {
                match self.dialect {
                    Dialect::Xml => break,
                    Dialect::Html => {
                        if self.html_angle_opens_markup() {
                            break;
                        }
                        // Stray '<' inside HTML text: tolerated.
                        self.advance(1);
                    }
                }
            } else {
                self.advance(1);
            }
        }

        if self.pos == start {
            return None;
        }
        let text = self.slice_from(start);
        if !self.preserve_space && text.chars().all(char::is_whitespace) {
            return None;
        }
        Some(Token::new(TokenKind::Text, text, location))
    }

    /// Returns `true` if the `<` at the cursor begins an element, end tag,
    /// PI, comment, CDATA section, or DOCTYPE (HTML text scan stop set);
    /// any other `<` is tolerated as text.
    fn html_angle_opens_markup(&self) -> bool {
        match self.peek_at(1) {
            Some(b) if b.is_ascii_alphabetic() => true,
            Some(b'/' | b'?') => true,
            Some(b'!') => {
                self.looking_at(b"<!--")
                    || self.looking_at(b"<![CDATA[")
                    || self.looking_at_ci(b"<!DOCTYPE")
            }
            _ => false,
        }
    }

    /// Scans one markup token. Returns `None` for suppressed compound
    /// lexemes (comments or CDATA consumed under a `preserve_* = false`
    /// configuration).
    fn scan_markup(&mut self) -> Option<Token> {
        let location = self.location();
        let b = self.peek()?;

        match b {
            b'<' => {
                if self.looking_at(b"<!--") {
                    return self.scan_comment(location);
                }
                if self.looking_at(b"<![CDATA[") {
                    return self.scan_cdata(location);
                }
                if self.looking_at_ci(b"<!DOCTYPE") {
                    return Some(self.scan_doctype(location));
                }
                self.advance(1);
                self.in_content = false;
                self.after_equals = false;
                Some(Token::new(TokenKind::OpenAngle, "<", location))
            }
            b'"' | b'\'' => Some(self.scan_literal(b, location)),
            _ if self.dialect == Dialect::Html && self.after_equals => {
                // Unquoted attribute value: everything up to whitespace or
                // the end of the tag. Checked before the single-character
                // tokens so values like `/a` or `a=b` stay whole.
                self.after_equals = false;
                Some(self.scan_unquoted_value(location))
            }
            b'>' => {
                self.advance(1);
                self.in_content = true;
                self.after_equals = false;
                Some(Token::new(TokenKind::CloseAngle, ">", location))
            }
            b'/' => {
                self.advance(1);
                Some(Token::new(TokenKind::Slash, "/", location))
            }
            b'?' => {
                self.advance(1);
                Some(Token::new(TokenKind::Question, "?", location))
            }
            b'=' => {
                self.advance(1);
                self.after_equals = true;
                Some(Token::new(TokenKind::Equals, "=", location))
            }
            b':' if self.dialect == Dialect::Xml => {
                self.advance(1);
                Some(Token::new(TokenKind::Colon, ":", location))
            }
            _ if is_name_start(b) => {
                self.after_equals = false;
                Some(self.scan_name(location))
            }
            b'0'..=b'9' => {
                self.after_equals = false;
                Some(self.scan_number(location))
            }
            _ => {
                let ch = std::str::from_utf8(&self.input[self.pos..])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or('\u{FFFD}');
                Some(self.error_token(format!("unknown character '{ch}'"), location))
            }
        }
    }

    fn scan_name(&mut self, location: SourceLocation) -> Token {
        let start = self.pos;
        self.advance(1); // name start char already checked
        while self.peek().is_some_and(|b| is_name_char(b, self.dialect)) {
            self.advance(1);
        }
        Token::new(TokenKind::Name, self.slice_from(start), location)
    }

    fn scan_number(&mut self, location: SourceLocation) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.advance(1);
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.advance(1);
            }
        }
        Token::new(TokenKind::Number, self.slice_from(start), location)
    }

    fn scan_literal(&mut self, quote: u8, location: SourceLocation) -> Token {
        self.advance(1); // opening quote, not part of the value
        let start = self.pos;
        while !self.at_end() && self.peek() != Some(quote) {
            self.advance(1);
        }
        if self.at_end() {
            return self.error_token("unterminated string literal", location);
        }
        let value = self.slice_from(start).to_string();
        self.advance(1); // closing quote
        self.after_equals = false;
        Token::new(TokenKind::Literal, value, location)
    }

    fn scan_unquoted_value(&mut self, location: SourceLocation) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b'>' {
                break;
            }
            self.advance(1);
        }
        Token::new(TokenKind::Literal, self.slice_from(start), location)
    }

    /// Scans a complete `<!-- … -->` comment. Returns `None` when comments
    /// are suppressed.
    fn scan_comment(&mut self, location: SourceLocation) -> Option<Token> {
        self.advance(4); // <!--
        let start = self.pos;
        while !self.at_end() && !self.looking_at(b"-->") {
            self.advance(1);
        }
        if self.at_end() {
            return Some(self.error_token("unterminated comment", location));
        }
        let content = self.slice_from(start).to_string();
        self.advance(3); // -->
        if self.preserve_comment {
            Some(Token::new(TokenKind::Comment, content, location))
        } else {
            None
        }
    }

    /// Scans a complete `<![CDATA[ … ]]>` section. Returns `None` when CDATA
    /// is suppressed.
    fn scan_cdata(&mut self, location: SourceLocation) -> Option<Token> {
        self.advance(9); // <![CDATA[
        let start = self.pos;
        while !self.at_end() && !self.looking_at(b"]]>") {
            self.advance(1);
        }
        if self.at_end() {
            return Some(self.error_token("unterminated CDATA section", location));
        }
        let content = self.slice_from(start).to_string();
        self.advance(3); // ]]>
        if self.preserve_cdata {
            Some(Token::cdata(content, location))
        } else {
            None
        }
    }

    // -- DOCTYPE --

    /// Scans a complete `<!DOCTYPE …>` declaration, including an optional
    /// external ID and an optional `[ internal subset ]` which is checked
    /// for structural balance.
    fn scan_doctype(&mut self, location: SourceLocation) -> Token {
        let decl_start = self.pos;
        self.advance(9); // <!DOCTYPE
        if !self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            return self.error_token("whitespace required after '<!DOCTYPE'", location);
        }
        self.skip_whitespace();

        // Document type name.
        let name_start = self.pos;
        if !self.peek().is_some_and(is_name_start) {
            return self.error_token("expected name in DOCTYPE declaration", location);
        }
        while self
            .peek()
            .is_some_and(|b| is_name_char(b, self.dialect) || b == b':')
        {
            self.advance(1);
        }
        let name = self.slice_from(name_start).to_string();
        self.skip_whitespace();

        // Optional external ID.
        if self.looking_at_ci(b"SYSTEM") {
            self.advance(6);
            self.skip_whitespace();
            if let Some(token) = self.skip_quoted_in_dtd(location) {
                return token;
            }
            self.skip_whitespace();
        } else if self.looking_at_ci(b"PUBLIC") {
            self.advance(6);
            self.skip_whitespace();
            if let Some(token) = self.skip_quoted_in_dtd(location) {
                return token;
            }
            self.skip_whitespace();
            if let Some(token) = self.skip_quoted_in_dtd(location) {
                return token;
            }
            self.skip_whitespace();
        }

        // Optional internal subset.
        if self.peek() == Some(b'[') {
            self.advance(1);
            if let Some(err) = self.scan_internal_subset(location) {
                return err;
            }
            self.skip_whitespace();
        }

        if self.peek() != Some(b'>') {
            return self.error_token("expected '>' to close DOCTYPE declaration", location);
        }
        self.advance(1);
        self.in_content = true;

        let lexeme = if self.preserve_dtd_structure {
            self.slice_from(decl_start).to_string()
        } else {
            name
        };
        Token::new(TokenKind::Doctype, lexeme, location)
    }

    /// Skips a quoted string inside a DOCTYPE declaration; returns an error
    /// token on failure.
    fn skip_quoted_in_dtd(&mut self, location: SourceLocation) -> Option<Token> {
        let Some(quote @ (b'"' | b'\'')) = self.peek() else {
            return Some(self.error_token("expected quoted value in DOCTYPE declaration", location));
        };
        self.advance(1);
        while !self.at_end() && self.peek() != Some(quote) {
            self.advance(1);
        }
        if self.at_end() {
            return Some(self.error_token("unterminated string in DOCTYPE declaration", location));
        }
        self.advance(1);
        None
    }

    /// Scans the internal subset between `[` and `]`, checking structural
    /// balance. Recognizes markup declarations, processing instructions,
    /// comments, and parameter-entity references; anything else is invalid
    /// DTD markup. Returns an error token on failure, `None` on success
    /// (cursor rests just past the closing `]`).
    fn scan_internal_subset(&mut self, location: SourceLocation) -> Option<Token> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Some(
                        self.error_token("unexpected end of input in internal subset", location),
                    );
                }
                Some(b']') => {
                    self.advance(1);
                    return None;
                }
                Some(b'%') => {
                    // Parameter-entity reference: %Name;
                    self.advance(1);
                    if !self.peek().is_some_and(is_name_start) {
                        return Some(
                            self.error_token("expected name in parameter-entity reference", location),
                        );
                    }
                    while self.peek().is_some_and(|b| is_name_char(b, Dialect::Xml)) {
                        self.advance(1);
                    }
                    if self.peek() != Some(b';') {
                        return Some(
                            self.error_token("expected ';' after parameter-entity reference", location),
                        );
                    }
                    self.advance(1);
                }
                Some(b'<') => {
                    if self.looking_at(b"<!--") {
                        self.advance(4);
                        while !self.at_end() && !self.looking_at(b"-->") {
                            self.advance(1);
                        }
                        if self.at_end() {
                            return Some(self.error_token(
                                "unterminated comment in internal subset",
                                location,
                            ));
                        }
                        self.advance(3);
                    } else if self.looking_at(b"<?") {
                        self.advance(2);
                        while !self.at_end() && !self.looking_at(b"?>") {
                            self.advance(1);
                        }
                        if self.at_end() {
                            return Some(self.error_token(
                                "unterminated processing instruction in internal subset",
                                location,
                            ));
                        }
                        self.advance(2);
                    } else if self.looking_at(b"<!ELEMENT")
                        || self.looking_at(b"<!ATTLIST")
                        || self.looking_at(b"<!ENTITY")
                        || self.looking_at(b"<!NOTATION")
                    {
                        if let Some(err) = self.skip_markup_decl(location) {
                            return Some(err);
                        }
                    } else {
                        return Some(
                            self.error_token("invalid markup in internal subset", location),
                        );
                    }
                }
                Some(_) => {
                    return Some(self.error_token("invalid markup in internal subset", location));
                }
            }
        }
    }

    /// Skips a `<!ELEMENT/ATTLIST/ENTITY/NOTATION … >` declaration, tracking
    /// quoted strings and nested parentheses in content specs so a `>`
    /// inside either does not end the declaration early.
    fn skip_markup_decl(&mut self, location: SourceLocation) -> Option<Token> {
        let mut paren_depth: u32 = 0;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' => {
                    let quote = b;
                    self.advance(1);
                    while !self.at_end() && self.peek() != Some(quote) {
                        self.advance(1);
                    }
                    if self.at_end() {
                        return Some(self.error_token(
                            "unterminated string in markup declaration",
                            location,
                        ));
                    }
                    self.advance(1);
                }
                b'(' => {
                    paren_depth += 1;
                    self.advance(1);
                }
                b')' => {
                    paren_depth = paren_depth.saturating_sub(1);
                    self.advance(1);
                }
                b'>' if paren_depth == 0 => {
                    self.advance(1);
                    return None;
                }
                _ => self.advance(1),
            }
        }
        Some(self.error_token("unterminated markup declaration in internal subset", location))
    }
}
