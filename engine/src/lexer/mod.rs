//! Lexer (component D, second half): the top-level dispatch loop over a
//! file cursor, plus automatic semicolon insertion.
//!
//! Grounded on `tokenizer/tokenizer.cpp`'s main dispatch switch and
//! `tokenizer_semicolon_tests.cpp`'s fixed behaviours for automatic
//! semicolon insertion (§8 scenarios in the governing design notes).

mod bracket;
mod number;
mod string;

use crate::errors::{ErrorCode, ErrorList};
use crate::file_cursor::FileCursor;
use crate::line_table::LineTable;
use crate::token::{Token, TokenKind};
use crate::unicode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BracketKind {
    Paren,
    Bracket,
    Brace,
}

pub struct Lexer<'a> {
    cursor: FileCursor,
    line_table: &'a mut LineTable,
    errors: &'a mut ErrorList,
    file_name: String,
    brackets: Vec<BracketKind>,
    last_can_end_statement: bool,
    just_emitted_semicolon: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(cursor: FileCursor, line_table: &'a mut LineTable, errors: &'a mut ErrorList) -> Self {
        let file_name = cursor.path().to_string_lossy().into_owned();
        Lexer {
            cursor,
            line_table,
            errors,
            file_name,
            brackets: Vec::new(),
            last_can_end_statement: false,
            just_emitted_semicolon: false,
        }
    }

    fn suppresses_newline(&self) -> bool {
        matches!(
            self.brackets.last(),
            Some(BracketKind::Paren) | Some(BracketKind::Bracket)
        )
    }

    /// Produces the next token, including newline-derived semicolons,
    /// comments, and directive side effects (directives themselves emit no
    /// token and are skipped transparently).
    pub fn next_token(&mut self) -> Token {
        loop {
            if self.cursor.size() == 0 {
                let at = self.cursor.location().byte_ptr;
                return Token::eof(at);
            }

            let c0 = self.cursor.peek(0);
            let vs = self.current_vertical_space_len();
            if vs > 0 {
                for _ in 0..vs {
                    self.cursor.advance();
                }
                if self.suppresses_newline() {
                    continue;
                }
                if self.last_can_end_statement && !self.just_emitted_semicolon {
                    self.just_emitted_semicolon = true;
                    self.last_can_end_statement = false;
                    let at = self.cursor.location().byte_ptr;
                    let mut t = Token::new(TokenKind::Newline, at, at, ";".to_owned());
                    t.text = ";".to_owned();
                    return t;
                }
                continue;
            }

            if c0 == '#' as u32 {
                if let Some(tok) = self.try_directive() {
                    return tok;
                }
                let tok = self.parse_tag();
                self.note(&tok);
                return tok;
            }

            if c0 == '/' as u32 && self.cursor.peek(1) == '/' as u32 {
                let tok = self.parse_line_comment();
                return tok; // comments are transparent to ASI, last_can_end_statement untouched
            }
            if c0 == '/' as u32 && self.cursor.peek(1) == '*' as u32 {
                let tok = self.parse_block_comment();
                return tok;
            }

            if number::starts_number(&self.cursor) {
                let tok = number::parse_number(&mut self.cursor, self.errors);
                self.note(&tok);
                return tok;
            }
            if let Some(c) = char::from_u32(c0) {
                if unicode::is_superscript_digit(c) {
                    let tok = number::parse_superscript_integer(&mut self.cursor);
                    self.note(&tok);
                    return tok;
                }
            }

            if c0 == '"' as u32 || c0 == '\'' as u32 || c0 == '`' as u32 {
                let tok = string::parse_string(&mut self.cursor, self.errors, false);
                self.note(&tok);
                return tok;
            }
            if c0 == 'r' as u32 && matches!(self.cursor.peek(1), q if q == '"' as u32 || q == '\'' as u32 || q == '`' as u32)
            {
                self.cursor.advance();
                let tok = string::parse_string(&mut self.cursor, self.errors, true);
                self.note(&tok);
                return tok;
            }

            if c0 == '$' as u32 {
                let tok = self.parse_dollar();
                self.note(&tok);
                return tok;
            }

            if let Some(c) = char::from_u32(c0) {
                if unicode::is_identifier_start(c) {
                    let tok = self.parse_identifier();
                    self.note(&tok);
                    return tok;
                }
            }

            if let Some(tok) = self.try_simple_token(c0) {
                self.note(&tok);
                return tok;
            }

            let tok = self.parse_operator();
            self.note(&tok);
            return tok;
        }
    }

    fn current_vertical_space_len(&self) -> usize {
        // `FileCursor` exposes code points, not raw bytes, so reconstruct a
        // small UTF-8 window from the lookahead to reuse `is_vertical_space`.
        let mut buf = [0u8; 4];
        let cp = self.cursor.peek(0);
        match unicode::encode_code_point(cp, &mut buf) {
            Ok(n) => {
                if n == 1 && matches!(buf[0], b'\n' | 0x0B | 0x0C) {
                    1
                } else if n == 1 && buf[0] == b'\r' {
                    if self.cursor.peek(1) == '\n' as u32 {
                        0
                    } else {
                        1
                    }
                } else if cp == 0x85 || cp == 0x2028 || cp == 0x2029 {
                    1
                } else {
                    0
                }
            }
            Err(_) => 0,
        }
    }

    fn note(&mut self, tok: &Token) {
        if matches!(tok.kind, TokenKind::LineComment | TokenKind::BlockComment) {
            return;
        }
        self.last_can_end_statement = tok.can_end_statement();
        self.just_emitted_semicolon = tok.kind == TokenKind::Semicolon;
    }

    fn try_simple_token(&mut self, c0: u32) -> Option<Token> {
        let (kind, bracket) = match char::from_u32(c0)? {
            ';' => (TokenKind::Semicolon, None),
            ',' => (TokenKind::Comma, None),
            '{' => (TokenKind::LeftBrace, Some((BracketKind::Brace, true))),
            '}' => (TokenKind::RightBrace, Some((BracketKind::Brace, false))),
            '[' => (TokenKind::LeftBracket, Some((BracketKind::Bracket, true))),
            ']' => (TokenKind::RightBracket, Some((BracketKind::Bracket, false))),
            '(' => (TokenKind::LeftParen, Some((BracketKind::Paren, true))),
            ')' => (TokenKind::RightParen, Some((BracketKind::Paren, false))),
            _ => return None,
        };
        let start = self.cursor.location().byte_ptr;
        let text = char::from_u32(c0).unwrap().to_string();
        self.cursor.advance();
        let end = self.cursor.location().byte_ptr;
        if let Some((kind, opening)) = bracket {
            if opening {
                self.brackets.push(kind);
            } else {
                self.brackets.pop();
            }
        }
        Some(Token::new(kind, start, end, text))
    }

    fn parse_identifier(&mut self) -> Token {
        let start = self.cursor.location().byte_ptr;
        let mut text = String::new();
        while let Some(c) = char::from_u32(self.cursor.peek(0)) {
            if text.is_empty() {
                if !unicode::is_identifier_start(c) {
                    break;
                }
            } else if !unicode::is_identifier_continue(c) {
                break;
            }
            text.push(c);
            self.cursor.advance();
        }
        let end = self.cursor.location().byte_ptr;
        let mut tok = Token::new(TokenKind::Identifier, start, end, text);
        tok.normalize();
        tok.security_check();
        if tok.kind == TokenKind::Error {
            self.errors.add(start, end, ErrorCode::SpoofCheckFailed, Some(tok.text.clone()));
        }
        tok
    }

    fn parse_operator(&mut self) -> Token {
        let start = self.cursor.location().byte_ptr;
        let mut text = String::new();
        while let Some(c) = char::from_u32(self.cursor.peek(0)) {
            if unicode::is_pattern_syntax(c) {
                text.push(c);
                self.cursor.advance();
            } else {
                break;
            }
        }
        if text.is_empty() {
            // Code point was neither identifier, digit, bracket, nor pattern
            // syntax: emit a single-code-point error token and advance so
            // the lexer always makes progress.
            if let Some(c) = char::from_u32(self.cursor.peek(0)) {
                text.push(c);
            }
            self.cursor.advance();
            let end = self.cursor.location().byte_ptr;
            self.errors.add(start, end, ErrorCode::UnrecognizedCodePoint, None);
            return Token::new(TokenKind::Error, start, end, text);
        }
        let end = self.cursor.location().byte_ptr;
        Token::new(TokenKind::Operator, start, end, text)
    }

    fn parse_tag(&mut self) -> Token {
        let start = self.cursor.location().byte_ptr;
        self.cursor.advance(); // '#'
        let mut text = String::new();
        while let Some(c) = char::from_u32(self.cursor.peek(0)) {
            let ok = if text.is_empty() {
                unicode::is_identifier_start(c)
            } else {
                unicode::is_identifier_continue(c)
            };
            if !ok {
                break;
            }
            text.push(c);
            self.cursor.advance();
        }
        let end = self.cursor.location().byte_ptr;
        Token::new(TokenKind::Tag, start, end, text)
    }

    fn parse_dollar(&mut self) -> Token {
        let start = self.cursor.location().byte_ptr;
        self.cursor.advance(); // '$'
        if self.cursor.peek(0) == '#' as u32 {
            self.cursor.advance();
            let end = self.cursor.location().byte_ptr;
            return Token::new(TokenKind::PositionalArgumentCount, start, end, "$#".to_owned());
        }
        if let Some(c) = char::from_u32(self.cursor.peek(0)) {
            if c.is_ascii_digit() {
                let mut text = String::new();
                while let Some(d) = char::from_u32(self.cursor.peek(0)) {
                    if d.is_ascii_digit() {
                        text.push(d);
                        self.cursor.advance();
                    } else {
                        break;
                    }
                }
                let end = self.cursor.location().byte_ptr;
                return Token::new(TokenKind::PositionalArgument, start, end, text);
            }
        }
        let mut text = String::new();
        while let Some(c) = char::from_u32(self.cursor.peek(0)) {
            let ok = if text.is_empty() {
                unicode::is_identifier_start(c)
            } else {
                unicode::is_identifier_continue(c)
            };
            if !ok {
                break;
            }
            text.push(c);
            self.cursor.advance();
        }
        let end = self.cursor.location().byte_ptr;
        Token::new(TokenKind::ContextArgument, start, end, text)
    }

    fn parse_line_comment(&mut self) -> Token {
        let start = self.cursor.location().byte_ptr;
        self.cursor.advance();
        self.cursor.advance();
        let mut is_doc = false;
        let mut is_back_doc = false;
        if self.cursor.peek(0) == '/' as u32 {
            is_doc = true;
            self.cursor.advance();
            if self.cursor.peek(0) == '<' as u32 {
                is_back_doc = true;
                self.cursor.advance();
            }
        }
        let mut text = String::new();
        while self.current_vertical_space_len() == 0 && self.cursor.size() > 0 {
            if let Some(c) = char::from_u32(self.cursor.peek(0)) {
                text.push(c);
            }
            self.cursor.advance();
        }
        let end = self.cursor.location().byte_ptr;
        let mut tok = Token::new(TokenKind::LineComment, start, end, text.clone());
        tok.is_documentation = is_doc;
        tok.is_back_documentation = is_back_doc;
        if is_doc {
            tok.doc_text = Some(text);
        }
        tok
    }

    fn parse_block_comment(&mut self) -> Token {
        let start = self.cursor.location().byte_ptr;
        self.cursor.advance();
        self.cursor.advance();
        let is_doc = self.cursor.peek(0) == '*' as u32;
        if is_doc {
            self.cursor.advance();
        }
        let mut text = String::new();
        loop {
            if self.cursor.size() == 0 {
                let end = self.cursor.location().byte_ptr;
                self.errors.add(start, end, ErrorCode::UnterminatedBlockComment, None);
                break;
            }
            if self.cursor.peek(0) == '*' as u32 && self.cursor.peek(1) == '/' as u32 {
                self.cursor.advance();
                self.cursor.advance();
                break;
            }
            if let Some(c) = char::from_u32(self.cursor.peek(0)) {
                text.push(c);
            }
            self.cursor.advance();
        }
        let stripped = strip_leading_stars(&text);
        let end = self.cursor.location().byte_ptr;
        let mut tok = Token::new(TokenKind::BlockComment, start, end, stripped.clone());
        tok.is_documentation = is_doc;
        if is_doc {
            tok.doc_text = Some(stripped);
        }
        tok
    }

    /// `#line` and `#scram` directives. Returns `None` (and leaves the
    /// cursor untouched) if `#` is not followed by a recognised keyword, so
    /// the caller falls back to the tag sub-parser.
    fn try_directive(&mut self) -> Option<Token> {
        let keyword = self.peek_keyword_after_hash();
        match keyword.as_deref() {
            Some("line") => {
                self.consume_word(); // '#'
                self.consume_word(); // 'line'
                self.skip_inline_space();
                let number_start = self.cursor.location().byte_ptr;
                let mut digits = String::new();
                while let Some(c) = char::from_u32(self.cursor.peek(0)) {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.cursor.advance();
                    } else {
                        break;
                    }
                }
                if digits.is_empty() {
                    let end = self.cursor.location().byte_ptr;
                    self.errors.add(number_start, end, ErrorCode::MalformedLineDirective, None);
                    return Some(Token::new(TokenKind::Error, number_start, end, String::new()));
                }
                self.skip_inline_space();
                let mut file_name = None;
                if self.cursor.peek(0) == '"' as u32 {
                    let tok = string::parse_string(&mut self.cursor, self.errors, false);
                    file_name = Some(tok.text);
                }
                if let Ok(line) = digits.parse::<u32>() {
                    self.cursor.set_line(line);
                    self.line_table.add(
                        self.cursor.location().byte_ptr,
                        line,
                        file_name.as_deref().or(Some(self.file_name.as_str())),
                    );
                }
                None
            }
            Some("scram") => {
                self.consume_word();
                self.consume_word();
                self.skip_inline_space();
                let start = self.cursor.location().byte_ptr;
                let mut sign = 1i64;
                if self.cursor.peek(0) == '-' as u32 {
                    sign = -1;
                    self.cursor.advance();
                }
                let mut digits = String::new();
                while let Some(c) = char::from_u32(self.cursor.peek(0)) {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.cursor.advance();
                    } else {
                        break;
                    }
                }
                let end = self.cursor.location().byte_ptr;
                match digits.parse::<i64>() {
                    Ok(value) if value != 0 => {
                        let key = (sign * value) as i64 as u32;
                        self.cursor.set_scram_key(key);
                    }
                    _ => {
                        self.errors.add(start, end, ErrorCode::MalformedScramDirective, None);
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn peek_keyword_after_hash(&self) -> Option<String> {
        let mut word = String::new();
        let mut i = 1;
        loop {
            let cp = self.cursor.peek(i);
            match char::from_u32(cp) {
                Some(c) if c.is_ascii_alphabetic() => {
                    word.push(c);
                    i += 1;
                    if i >= 8 {
                        break;
                    }
                }
                _ => break,
            }
        }
        if word == "line" || word == "scram" {
            Some(word)
        } else {
            None
        }
    }

    fn consume_word(&mut self) {
        loop {
            match char::from_u32(self.cursor.peek(0)) {
                Some(c) if c == '#' || c.is_ascii_alphabetic() => {
                    self.cursor.advance();
                    if c != '#' && !char::from_u32(self.cursor.peek(0)).map(|c| c.is_ascii_alphabetic()).unwrap_or(false) {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn skip_inline_space(&mut self) {
        while matches!(char::from_u32(self.cursor.peek(0)), Some(' ') | Some('\t')) {
            self.cursor.advance();
        }
    }
}

fn strip_leading_stars(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_start().strip_prefix('*').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lex_all(contents: &str) -> Vec<Token> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        let cursor = FileCursor::open(f.path()).unwrap();
        let mut line_table = LineTable::new();
        let mut errors = ErrorList::new();
        let mut lexer = Lexer::new(cursor, &mut line_table, &mut errors);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    #[test]
    fn bare_identifier_gets_trailing_semicolon() {
        let tokens = lex_all("a");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn parens_suppress_automatic_semicolon() {
        let tokens = lex_all("(a\n)");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LeftParen,
                TokenKind::Identifier,
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn braces_convert_newline_to_semicolon() {
        let tokens = lex_all("{a\n}");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LeftBrace,
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::RightBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integer_literal_lexes() {
        let tokens = lex_all("42;");
        assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[0].text, "42");
    }

    #[test]
    fn string_literal_lexes_with_escape() {
        let tokens = lex_all("\"a\\nb\";");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "a\nb");
    }
}
