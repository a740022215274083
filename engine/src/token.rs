//! Token model (component D, first half).
//!
//! Grounded on `tokenizer/token.{hpp,cpp}`: a token records both ends of its
//! byte span, its raw and (for identifiers) normalized text, and an optional
//! documentation comment attached by a preceding `///` or `/**`.

use crate::line_table::FileLocation;
use crate::unicode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Newline,
    Semicolon,
    Comma,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Identifier,
    Operator,
    Tag,
    ContextArgument,
    PositionalArgument,
    PositionalArgumentCount,
    IntegerLiteral,
    FloatLiteral,
    VersionLiteral,
    SuperscriptIntegerLiteral,
    StringLiteral,
    CharacterLiteral,
    QuoteLiteral,
    BracketedString,
    LineComment,
    BlockComment,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub first_byte: usize,
    pub last_byte: usize,
    pub first_location: FileLocation,
    pub last_location: FileLocation,
    pub text: String,
    pub doc_text: Option<String>,
    pub is_documentation: bool,
    pub is_back_documentation: bool,
    pub is_raw: bool,
}

impl Token {
    pub fn new(kind: TokenKind, first_byte: usize, last_byte: usize, text: String) -> Self {
        Token {
            kind,
            first_byte,
            last_byte,
            first_location: FileLocation::unknown(),
            last_location: FileLocation::unknown(),
            text,
            doc_text: None,
            is_documentation: false,
            is_back_documentation: false,
            is_raw: false,
        }
    }

    pub fn eof(at: usize) -> Self {
        Token::new(TokenKind::Eof, at, at, String::new())
    }

    /// NFC-normalizes `text` in place; identifiers call this before the
    /// spoof check runs.
    pub fn normalize(&mut self) {
        self.text = unicode::nfc_normalize(&self.text);
    }

    /// Runs the spoof check against the (already normalized) identifier
    /// text, turning this token into an `Error` token carrying the reason
    /// on failure.
    pub fn security_check(&mut self) {
        if self.kind != TokenKind::Identifier {
            return;
        }
        if let Err(reason) = unicode::spoof_check(&self.text) {
            self.kind = TokenKind::Error;
            self.text = format!("{:?}", reason);
        }
    }

    pub fn can_end_statement(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier
                | TokenKind::IntegerLiteral
                | TokenKind::FloatLiteral
                | TokenKind::VersionLiteral
                | TokenKind::SuperscriptIntegerLiteral
                | TokenKind::StringLiteral
                | TokenKind::CharacterLiteral
                | TokenKind::QuoteLiteral
                | TokenKind::BracketedString
                | TokenKind::RightBrace
                | TokenKind::RightBracket
                | TokenKind::RightParen
                | TokenKind::Tag
                | TokenKind::ContextArgument
                | TokenKind::PositionalArgument
                | TokenKind::PositionalArgumentCount
        ) || (self.kind == TokenKind::Operator && !is_open_bracket_operator(&self.text))
    }
}

fn is_open_bracket_operator(text: &str) -> bool {
    matches!(text, "(" | "[" | "{")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_token_has_zero_span_at_given_offset() {
        let t = Token::eof(42);
        assert_eq!(t.kind, TokenKind::Eof);
        assert_eq!(t.first_byte, 42);
        assert_eq!(t.last_byte, 42);
    }

    #[test]
    fn identifiers_can_end_statements() {
        let t = Token::new(TokenKind::Identifier, 0, 1, "a".into());
        assert!(t.can_end_statement());
    }

    #[test]
    fn open_bracket_operator_cannot_end_statement() {
        let t = Token::new(TokenKind::Operator, 0, 1, "(".into());
        assert!(!t.can_end_statement());
    }
}
