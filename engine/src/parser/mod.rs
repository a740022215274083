//! Parser (component H): prologue (top declaration + imports) and the
//! build-guard expression sub-parser, both built over a lazy token vector.
//!
//! Grounded on `semantics/parser.{hpp,cpp}`. Parsing functions report three
//! states via `ParseResult`: a value, a definite error (already recorded in
//! the error sink), or no-match (the cursor is left untouched).

use crate::ast::{Ast, EqOp, GuardExpr, GuardId, ImportId, ImportKind, ImportNode, RelOp, TopId, TopKind, TopNode};
use crate::errors::{ErrorCode, ErrorList};
use crate::token::TokenKind;
use crate::token_vector::TokenVector;
use crate::util::fqname::Fqname;
use crate::util::semver::SemanticVersion;

#[derive(Debug)]
pub enum ParseResult<T> {
    Value(T),
    Error,
    NoMatch,
}

impl<T> ParseResult<T> {
    pub fn is_no_match(&self) -> bool {
        matches!(self, ParseResult::NoMatch)
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ParseResult::Value(v) => Some(v),
            _ => None,
        }
    }
}

pub struct Parser<'a, 'b> {
    tokens: &'a mut TokenVector<'b>,
    errors: &'a mut ErrorList,
}

impl<'a, 'b> Parser<'a, 'b> {
    pub fn new(tokens: &'a mut TokenVector<'b>, errors: &'a mut ErrorList) -> Self {
        Parser { tokens, errors }
    }

    fn at_keyword(&mut self, keyword: &str) -> bool {
        let tok = self.tokens.current();
        tok.kind == TokenKind::Identifier && tok.text == keyword
    }

    fn at_text(&mut self, text: &str) -> bool {
        let tok = self.tokens.current();
        tok.text == text
            && matches!(
                tok.kind,
                TokenKind::Operator | TokenKind::LeftParen | TokenKind::RightParen
            )
    }

    fn consume_semicolon_or_error(&mut self, code: ErrorCode) -> bool {
        let tok = self.tokens.current();
        if tok.kind == TokenKind::Semicolon || (tok.kind == TokenKind::Newline && tok.text == ";") {
            self.tokens.advance();
            true
        } else {
            let first = tok.first_byte;
            let last = tok.last_byte;
            self.errors.add(first, last, code, None);
            self.recover_to_semicolon();
            false
        }
    }

    /// Consumes tokens up to and including the next `;`, for recoverable
    /// prologue-level errors.
    fn recover_to_semicolon(&mut self) {
        loop {
            let tok = self.tokens.current();
            if tok.kind == TokenKind::Eof {
                return;
            }
            let is_semi = tok.kind == TokenKind::Semicolon || (tok.kind == TokenKind::Newline && tok.text == ";");
            self.tokens.advance();
            if is_semi {
                return;
            }
        }
    }

    /// Fully-qualified name: at least one identifier, optionally preceded by
    /// a leading `.` if `allow_leading_dot`. A `.` with no following
    /// identifier is `invalid-fqname`.
    pub fn parse_fqname(&mut self, allow_leading_dot: bool) -> ParseResult<Fqname> {
        let start_tok = self.tokens.current();
        let mut text = String::new();

        if allow_leading_dot && start_tok.kind == TokenKind::Operator && start_tok.text.starts_with('.') {
            text.push_str(&start_tok.text);
            self.tokens.advance();
        } else if start_tok.kind != TokenKind::Identifier {
            return ParseResult::NoMatch;
        }

        loop {
            let tok = self.tokens.current();
            if tok.kind != TokenKind::Identifier {
                if text.ends_with('.') || text.is_empty() {
                    let first = tok.first_byte;
                    let last = tok.last_byte;
                    self.errors.add(first, last, ErrorCode::InvalidFqname, None);
                    return ParseResult::Error;
                }
                break;
            }
            text.push_str(&tok.text);
            self.tokens.advance();

            let dot = self.tokens.current();
            if dot.kind == TokenKind::Operator && dot.text == "." {
                text.push('.');
                self.tokens.advance();
                continue;
            }
            break;
        }

        ParseResult::Value(Fqname::parse(&text))
    }

    fn parse_string_literal(&mut self) -> Option<String> {
        let tok = self.tokens.current();
        if tok.kind == TokenKind::StringLiteral {
            self.tokens.advance();
            Some(tok.text)
        } else {
            None
        }
    }

    fn parse_version_literal(&mut self) -> Option<SemanticVersion> {
        let tok = self.tokens.current();
        if tok.kind == TokenKind::VersionLiteral {
            self.tokens.advance();
            SemanticVersion::parse(&tok.text).ok()
        } else {
            None
        }
    }

    // ---- Build guard expression parser ----
    //
    // Conventional precedence (higher binds tighter), derived from the
    // governing lower-binds-tighter table: in/not-in=40, relational=30,
    // equality=20, and=10, or=0. `not` is a unary prefix handled in
    // `parse_primary`, not part of the binary climb.

    pub fn parse_build_guard_expr(&mut self, ast: &mut Ast) -> ParseResult<GuardId> {
        self.parse_guard_binary(ast, 0)
    }

    fn parse_guard_binary(&mut self, ast: &mut Ast, min_prec: i32) -> ParseResult<GuardId> {
        let mut lhs = match self.parse_guard_primary(ast) {
            ParseResult::Value(v) => v,
            other => return other,
        };

        loop {
            let (prec, combinator): (i32, BinCombinator) = if self.at_keyword("in") {
                (40, BinCombinator::In(false))
            } else if self.at_keyword("not") && self.peek_is_keyword_after(1, "in") {
                (40, BinCombinator::In(true))
            } else if self.at_text("<") {
                (30, BinCombinator::Rel(RelOp::Lt))
            } else if self.at_text("<=") {
                (30, BinCombinator::Rel(RelOp::Le))
            } else if self.at_text(">") {
                (30, BinCombinator::Rel(RelOp::Gt))
            } else if self.at_text(">=") {
                (30, BinCombinator::Rel(RelOp::Ge))
            } else if self.at_text("==") {
                (20, BinCombinator::Eq(EqOp::Eq))
            } else if self.at_text("!=") || self.at_text("≠") {
                (20, BinCombinator::Eq(EqOp::Ne))
            } else if self.at_keyword("and") {
                (10, BinCombinator::And)
            } else if self.at_keyword("or") {
                (0, BinCombinator::Or)
            } else {
                break;
            };

            if prec < min_prec {
                break;
            }

            match &combinator {
                BinCombinator::In(negated) => {
                    self.tokens.advance();
                    if *negated {
                        self.tokens.advance();
                    }
                }
                _ => {
                    self.tokens.advance();
                }
            }

            let rhs = match self.parse_guard_binary(ast, prec + 1) {
                ParseResult::Value(v) => v,
                ParseResult::NoMatch => {
                    let tok = self.tokens.current();
                    self.errors
                        .add(tok.first_byte, tok.last_byte, ErrorCode::MissingRhsOfBinaryOperator, None);
                    return ParseResult::Error;
                }
                ParseResult::Error => return ParseResult::Error,
            };

            lhs = match combinator {
                BinCombinator::In(negate) => ast.push_guard(GuardExpr::In { lhs, rhs, negate }),
                BinCombinator::Rel(op) => ast.push_guard(GuardExpr::Relational { op, lhs, rhs }),
                BinCombinator::Eq(op) => ast.push_guard(GuardExpr::Equality { op, lhs, rhs }),
                BinCombinator::And => ast.push_guard(GuardExpr::And(lhs, rhs)),
                BinCombinator::Or => ast.push_guard(GuardExpr::Or(lhs, rhs)),
            };
        }

        ParseResult::Value(lhs)
    }

    fn peek_is_keyword_after(&mut self, offset: usize, keyword: &str) -> bool {
        let tok = self.tokens.peek(offset);
        tok.kind == TokenKind::Identifier && tok.text == keyword
    }

    fn parse_guard_primary(&mut self, ast: &mut Ast) -> ParseResult<GuardId> {
        if self.at_keyword("not") {
            self.tokens.advance();
            return match self.parse_guard_primary(ast) {
                ParseResult::Value(inner) => ParseResult::Value(ast.push_guard(GuardExpr::Not(inner))),
                other => other,
            };
        }

        if self.tokens.current().kind == TokenKind::LeftParen {
            self.tokens.advance();
            let inner = match self.parse_build_guard_expr(ast) {
                ParseResult::Value(v) => v,
                ParseResult::NoMatch => {
                    let tok = self.tokens.current();
                    self.errors
                        .add(tok.first_byte, tok.last_byte, ErrorCode::MissingClosingParenthesis, None);
                    return ParseResult::Error;
                }
                ParseResult::Error => return ParseResult::Error,
            };
            if self.tokens.current().kind != TokenKind::RightParen {
                let tok = self.tokens.current();
                self.errors
                    .add(tok.first_byte, tok.last_byte, ErrorCode::MissingClosingParenthesis, None);
                return ParseResult::Error;
            }
            self.tokens.advance();
            return ParseResult::Value(inner);
        }

        let tok = self.tokens.current();
        match tok.kind {
            TokenKind::IntegerLiteral => {
                self.tokens.advance();
                match tok.text.trim_matches('\'').parse::<i64>() {
                    Ok(v) => ParseResult::Value(ast.push_guard(GuardExpr::Integer(v))),
                    Err(_) => ParseResult::Error,
                }
            }
            TokenKind::VersionLiteral => {
                self.tokens.advance();
                match SemanticVersion::parse(&tok.text) {
                    Ok(v) => ParseResult::Value(ast.push_guard(GuardExpr::Version(v))),
                    Err(_) => ParseResult::Error,
                }
            }
            TokenKind::StringLiteral => {
                self.tokens.advance();
                ParseResult::Value(ast.push_guard(GuardExpr::Str(tok.text)))
            }
            TokenKind::Identifier => match self.parse_fqname(true) {
                ParseResult::Value(name) => ParseResult::Value(ast.push_guard(GuardExpr::Name(name))),
                ParseResult::Error => ParseResult::Error,
                ParseResult::NoMatch => ParseResult::NoMatch,
            },
            _ => ParseResult::NoMatch,
        }
    }

    fn parse_if_guard(&mut self, ast: &mut Ast) -> Option<GuardId> {
        if self.at_keyword("if") {
            self.tokens.advance();
            match self.parse_build_guard_expr(ast) {
                ParseResult::Value(g) => Some(g),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Parses one top declaration: `module`, `program`, or `library`.
    pub fn parse_top_declaration(&mut self, ast: &mut Ast) -> ParseResult<TopId> {
        let start = self.tokens.current().first_byte;

        let kind = if self.at_keyword("module") {
            TopKind::Module
        } else if self.at_keyword("program") {
            TopKind::Program
        } else if self.at_keyword("library") {
            TopKind::Library
        } else {
            return ParseResult::NoMatch;
        };
        self.tokens.advance();

        let mut node = TopNode {
            kind,
            module_name: None,
            string_name: None,
            application_or_library: None,
            version: None,
            fallback: false,
            guard: None,
            first_byte: start,
            last_byte: start,
            enabled: None,
        };

        match kind {
            TopKind::Module => {
                match self.parse_fqname(true) {
                    ParseResult::Value(name) => node.module_name = Some(name),
                    ParseResult::Error => return ParseResult::Error,
                    ParseResult::NoMatch => {
                        let tok = self.tokens.current();
                        self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingModuleName, None);
                        return ParseResult::Error;
                    }
                }
                if self.at_keyword("application") || self.at_keyword("library") {
                    self.tokens.advance();
                    node.application_or_library = self.parse_string_literal();
                    if node.application_or_library.is_none() {
                        let tok = self.tokens.current();
                        self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingFilenameStem, None);
                        return ParseResult::Error;
                    }
                } else if self.at_keyword("package") {
                    self.tokens.advance();
                    node.version = self.parse_version_literal();
                }
            }
            TopKind::Program | TopKind::Library => {
                node.string_name = self.parse_string_literal();
                if node.string_name.is_none() {
                    let tok = self.tokens.current();
                    self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingFilenameStem, None);
                    return ParseResult::Error;
                }
                node.version = self.parse_version_literal();
            }
        }

        if self.at_keyword("fallback") {
            self.tokens.advance();
            node.fallback = true;
        } else {
            node.guard = self.parse_if_guard(ast);
        }

        node.last_byte = self.tokens.current().first_byte;
        self.consume_semicolon_or_error(ErrorCode::ExpectedStatementTerminator);
        ParseResult::Value(ast.push_top(node))
    }

    fn parse_one_import(&mut self, ast: &mut Ast) -> ParseResult<ImportId> {
        let start = self.tokens.current().first_byte;
        if !self.at_keyword("import") {
            return ParseResult::NoMatch;
        }
        self.tokens.advance();

        let kind = if self.at_keyword("git") {
            self.tokens.advance();
            let url = match self.parse_string_literal() {
                Some(s) => s,
                None => {
                    let tok = self.tokens.current();
                    self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingGitUrl, None);
                    return ParseResult::Error;
                }
            };
            let rev = match self.parse_string_literal() {
                Some(s) => s,
                None => {
                    let tok = self.tokens.current();
                    self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingGitRev, None);
                    return ParseResult::Error;
                }
            };
            ImportKind::Git { url, rev }
        } else if self.at_keyword("zip") {
            self.tokens.advance();
            let url = match self.parse_string_literal() {
                Some(s) => s,
                None => {
                    let tok = self.tokens.current();
                    self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingZipPath, None);
                    return ParseResult::Error;
                }
            };
            ImportKind::Zip { url }
        } else if self.at_keyword("lib") {
            self.tokens.advance();
            let path = match self.parse_string_literal() {
                Some(s) => s,
                None => {
                    let tok = self.tokens.current();
                    self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingLibPath, None);
                    return ParseResult::Error;
                }
            };
            ImportKind::Lib { path }
        } else {
            let name = match self.parse_fqname(true) {
                ParseResult::Value(v) => v,
                ParseResult::Error => return ParseResult::Error,
                ParseResult::NoMatch => {
                    let tok = self.tokens.current();
                    self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingModuleName, None);
                    return ParseResult::Error;
                }
            };
            let alias = if self.at_keyword("as") {
                self.tokens.advance();
                match self.parse_fqname(true) {
                    ParseResult::Value(v) => Some(v),
                    ParseResult::Error => return ParseResult::Error,
                    ParseResult::NoMatch => {
                        let tok = self.tokens.current();
                        self.errors.add(tok.first_byte, tok.last_byte, ErrorCode::MissingAsName, None);
                        return ParseResult::Error;
                    }
                }
            } else {
                None
            };
            ImportKind::Module { name, alias }
        };

        let guard = self.parse_if_guard(ast);
        let last = self.tokens.current().first_byte;
        self.consume_semicolon_or_error(ErrorCode::ExpectedStatementTerminator);

        ParseResult::Value(ast.push_import(ImportNode {
            kind,
            guard,
            first_byte: start,
            last_byte: last,
            enabled: None,
        }))
    }

    /// Parses the sequence of imports following the top declaration. A
    /// repository-import parser (`git`/`zip`) is tried before the generic
    /// module-import parser, per the governing ordering rule.
    pub fn parse_imports(&mut self, ast: &mut Ast) -> Vec<ImportId> {
        let mut imports = Vec::new();
        loop {
            match self.parse_one_import(ast) {
                ParseResult::Value(id) => imports.push(id),
                ParseResult::Error => continue,
                ParseResult::NoMatch => break,
            }
        }
        imports
    }

    /// Parses the prologue: one top declaration followed by its imports.
    pub fn parse_prologue(&mut self, ast: &mut Ast) -> (Option<TopId>, Vec<ImportId>) {
        let top = self.parse_top_declaration(ast).ok();
        let imports = self.parse_imports(ast);
        (top, imports)
    }
}

enum BinCombinator {
    In(bool),
    Rel(RelOp),
    Eq(EqOp),
    And,
    Or,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_cursor::FileCursor;
    use crate::line_table::LineTable;
    use std::io::Write;

    fn parse_source(contents: &str) -> (Ast, Option<TopId>, Vec<ImportId>) {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        let cursor = FileCursor::open(f.path()).unwrap();
        let mut line_table = LineTable::new();
        let mut errors = ErrorList::new();
        let lexer = crate::lexer::Lexer::new(cursor, &mut line_table, &mut errors);
        let mut tokens = TokenVector::new(lexer);
        let mut ast = Ast::new();
        let mut parser = Parser::new(&mut tokens, &mut errors);
        let (top, imports) = parser.parse_prologue(&mut ast);
        (ast, top, imports)
    }

    #[test]
    fn parses_module_declaration() {
        let (ast, top, _imports) = parse_source("module .a.b;\n");
        let top = top.expect("module declaration should parse");
        assert_eq!(ast.top(top).kind, TopKind::Module);
        assert_eq!(ast.top(top).module_name.as_ref().unwrap().to_string(), ".a.b");
    }

    #[test]
    fn parses_git_import_before_module_import_form() {
        let (ast, _top, imports) = parse_source("module .a;\nimport git \"u\" \"r\";\n");
        assert_eq!(imports.len(), 1);
        match &ast.import(imports[0]).kind {
            ImportKind::Git { url, rev } => {
                assert_eq!(url, "u");
                assert_eq!(rev, "r");
            }
            other => panic!("expected git import, got {:?}", other),
        }
    }

    #[test]
    fn build_guard_and_binds_tighter_than_or() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"1 or 0 and 0;").unwrap();
        let cursor = FileCursor::open(f.path()).unwrap();
        let mut line_table = LineTable::new();
        let mut errors = ErrorList::new();
        let lexer = crate::lexer::Lexer::new(cursor, &mut line_table, &mut errors);
        let mut tokens = TokenVector::new(lexer);
        let mut ast = Ast::new();
        let mut parser = Parser::new(&mut tokens, &mut errors);
        let result = parser.parse_build_guard_expr(&mut ast);
        let id = result.ok().expect("expression should parse");
        // `1 or (0 and 0)`, not `(1 or 0) and 0` -- evaluates truthy either
        // way here, so assert the shape directly.
        match ast.guard(id) {
            GuardExpr::Or(_, rhs) => assert!(matches!(ast.guard(*rhs), GuardExpr::And(_, _))),
            other => panic!("expected top-level or, got {:?}", other),
        }
    }
}
