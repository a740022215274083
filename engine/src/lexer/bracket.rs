//! Bracketed-string sub-parser, grounded on
//! `tokenizer/parse_bracketed_string.cpp`: copies code points verbatim
//! between a matching bracket pair, tracking nested brackets and suspending
//! that tracking while inside an embedded quoted string.

use crate::errors::{ErrorCode, ErrorList};
use crate::file_cursor::FileCursor;
use crate::token::{Token, TokenKind};
use crate::unicode;

pub fn parse_bracketed_string(cursor: &mut FileCursor, errors: &mut ErrorList) -> Token {
    let start = cursor.location().byte_ptr;
    let open = char::from_u32(cursor.peek(0)).expect("bracketed string must start on a bracket");
    let close = unicode::mirror_bracket(open);
    cursor.advance();

    let mut text = String::new();
    let mut depth: u32 = 1;
    let mut in_string: Option<u32> = None;

    loop {
        if cursor.size() == 0 || cursor.peek(0) == 0 {
            let end = cursor.location().byte_ptr;
            errors.add(start, end, ErrorCode::UnterminatedBracketedString, None);
            return Token::new(TokenKind::Error, start, end, text);
        }
        let c0 = cursor.peek(0);

        if let Some(quote) = in_string {
            if c0 == '\\' as u32 {
                if let Some(c) = char::from_u32(c0) {
                    text.push(c);
                }
                cursor.advance();
                if let Some(c) = char::from_u32(cursor.peek(0)) {
                    text.push(c);
                }
                cursor.advance();
                continue;
            }
            if c0 == quote {
                in_string = None;
            }
            if let Some(c) = char::from_u32(c0) {
                text.push(c);
            }
            cursor.advance();
            continue;
        }

        if c0 == '"' as u32 || c0 == '\'' as u32 || c0 == '`' as u32 {
            in_string = Some(c0);
            if let Some(c) = char::from_u32(c0) {
                text.push(c);
            }
            cursor.advance();
            continue;
        }

        if c0 == open as u32 {
            depth += 1;
        } else if c0 == close as u32 {
            depth -= 1;
            if depth == 0 {
                cursor.advance();
                let end = cursor.location().byte_ptr;
                return Token::new(TokenKind::BracketedString, start, end, text);
            }
        }
        if let Some(c) = char::from_u32(c0) {
            text.push(c);
        }
        cursor.advance();
    }
}
