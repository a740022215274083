//! Lazy token vector (component E): a random-access cursor over a
//! token-producing lexer, materializing and caching tokens on first access.
//!
//! Grounded on `tokenizer/token_vector.{hpp,cpp}`.

use crate::token::{Token, TokenKind};

pub struct TokenVector<'a> {
    lexer: crate::lexer::Lexer<'a>,
    cache: Vec<Token>,
    position: usize,
    exhausted: bool,
}

impl<'a> TokenVector<'a> {
    pub fn new(lexer: crate::lexer::Lexer<'a>) -> Self {
        TokenVector {
            lexer,
            cache: Vec::new(),
            position: 0,
            exhausted: false,
        }
    }

    fn materialize_up_to(&mut self, index: usize) {
        while self.cache.len() <= index && !self.exhausted {
            let tok = self.lexer.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            self.cache.push(tok);
            if is_eof {
                self.exhausted = true;
            }
        }
    }

    fn eof_token(&self) -> Token {
        self.cache
            .last()
            .cloned()
            .filter(|t| t.kind == TokenKind::Eof)
            .unwrap_or_else(|| Token::eof(0))
    }

    /// Returns the token `offset` positions ahead of the cursor (0 = current),
    /// without moving the cursor. Past-the-end reads return an EOF token.
    pub fn peek(&mut self, offset: usize) -> Token {
        let index = self.position + offset;
        self.materialize_up_to(index);
        self.cache.get(index).cloned().unwrap_or_else(|| self.eof_token())
    }

    pub fn current(&mut self) -> Token {
        self.peek(0)
    }

    pub fn advance(&mut self) -> Token {
        let tok = self.current();
        if tok.kind != TokenKind::Eof || self.position < self.cache.len() {
            self.position += 1;
        }
        tok
    }

    pub fn retreat(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn at_end(&mut self) -> bool {
        self.current().kind == TokenKind::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorList;
    use crate::file_cursor::FileCursor;
    use crate::line_table::LineTable;
    use std::io::Write;

    fn vector_for(contents: &str) -> (TokenVector<'static>, Box<LineTable>, Box<ErrorList>) {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        let cursor = FileCursor::open(f.path()).unwrap();
        let mut line_table = Box::new(LineTable::new());
        let mut errors = Box::new(ErrorList::new());
        // SAFETY-free workaround for the test: leak references for the
        // lifetime of the test, since `Lexer` borrows them.
        let line_table_ref: &'static mut LineTable = unsafe { &mut *(line_table.as_mut() as *mut LineTable) };
        let errors_ref: &'static mut ErrorList = unsafe { &mut *(errors.as_mut() as *mut ErrorList) };
        let lexer = crate::lexer::Lexer::new(cursor, line_table_ref, errors_ref);
        (TokenVector::new(lexer), line_table, errors)
    }

    #[test]
    fn past_the_end_reads_return_eof() {
        let (mut v, _lt, _e) = vector_for("a;");
        assert_eq!(v.peek(0).kind, TokenKind::Identifier);
        assert_eq!(v.peek(1).kind, TokenKind::Semicolon);
        assert_eq!(v.peek(2).kind, TokenKind::Eof);
        assert_eq!(v.peek(10).kind, TokenKind::Eof);
    }

    #[test]
    fn advance_moves_cursor_forward_and_retreat_moves_back() {
        let (mut v, _lt, _e) = vector_for("a;");
        let first = v.advance();
        assert_eq!(first.kind, TokenKind::Identifier);
        v.retreat();
        assert_eq!(v.current().kind, TokenKind::Identifier);
    }
}
