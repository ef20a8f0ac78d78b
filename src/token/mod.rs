//! Markup token model.
//!
//! Tokens are produced one at a time by the [`Lexer`](crate::lexer::Lexer)
//! and consumed by the markup parsers. Each token carries its kind, its
//! lexeme text, and the line/column where it started, so parser diagnostics
//! can point at the exact source position.

use crate::error::SourceLocation;
use std::fmt;

/// The kind of a markup token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `<` — tag open.
    OpenAngle,
    /// `>` — tag close.
    CloseAngle,
    /// `/` — inside a tag (end tag marker or self-close).
    Slash,
    /// `?` — processing instruction delimiter.
    Question,
    /// `=` — attribute value separator.
    Equals,
    /// `:` — qualified name separator (XML dialect).
    Colon,
    /// A name (element, attribute, or PI target).
    Name,
    /// A number lexeme appearing in tag position (unquoted HTML values).
    Number,
    /// A quoted string; the quotes are not part of the lexeme.
    Literal,
    /// A raw text run in element content. CDATA sections are text tokens
    /// with [`Token::is_cdata`] set.
    Text,
    /// A complete `<!-- … -->` comment; the lexeme is the inner text.
    Comment,
    /// A complete `<!DOCTYPE …>` declaration.
    Doctype,
    /// End of input.
    Eof,
    /// A tokenization failure; the lexeme is the error message. Error
    /// tokens are sticky — once produced, the lexer repeats the same
    /// error token on every subsequent request.
    Error,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OpenAngle => "'<'",
            Self::CloseAngle => "'>'",
            Self::Slash => "'/'",
            Self::Question => "'?'",
            Self::Equals => "'='",
            Self::Colon => "':'",
            Self::Name => "name",
            Self::Number => "number",
            Self::Literal => "string",
            Self::Text => "text",
            Self::Comment => "comment",
            Self::Doctype => "doctype",
            Self::Eof => "end of input",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single markup token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The token's text. For [`TokenKind::Literal`] the surrounding quotes
    /// are stripped; for [`TokenKind::Comment`] the `<!--`/`-->` delimiters
    /// are stripped; for [`TokenKind::Error`] this is the error message.
    pub lexeme: String,
    /// Where the token started.
    pub location: SourceLocation,
    /// Set on [`TokenKind::Text`] tokens produced from a CDATA section.
    pub is_cdata: bool,
}

impl Token {
    /// Creates a token with the given kind, lexeme, and location.
    #[must_use]
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            location,
            is_cdata: false,
        }
    }

    /// Creates a CDATA text token.
    #[must_use]
    pub fn cdata(lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind: TokenKind::Text,
            lexeme: lexeme.into(),
            location,
            is_cdata: true,
        }
    }

    /// Returns `true` if this is an error token.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }

    /// Returns `true` if this is the end-of-input token.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Error => write!(f, "error: {}", self.lexeme),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_display() {
        assert_eq!(TokenKind::OpenAngle.to_string(), "'<'");
        assert_eq!(TokenKind::Name.to_string(), "name");
        assert_eq!(TokenKind::Doctype.to_string(), "doctype");
    }

    #[test]
    fn test_cdata_token() {
        let tok = Token::cdata("raw", SourceLocation::new(1, 1));
        assert_eq!(tok.kind, TokenKind::Text);
        assert!(tok.is_cdata);
        assert_eq!(tok.lexeme, "raw");
    }

    #[test]
    fn test_error_token_predicates() {
        let err = Token::new(TokenKind::Error, "bad", SourceLocation::default());
        assert!(err.is_error());
        assert!(!err.is_eof());
        assert_eq!(err.to_string(), "error: bad");
    }

    #[test]
    fn test_eof_token() {
        let eof = Token::new(TokenKind::Eof, "", SourceLocation::new(4, 1));
        assert!(eof.is_eof());
        assert_eq!(eof.to_string(), "end of input");
    }
}
