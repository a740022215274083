//! String literal sub-parser, grounded on `tokenizer/parse_string.cpp`.

use crate::errors::{ErrorCode, ErrorList};
use crate::file_cursor::FileCursor;
use crate::token::{Token, TokenKind};
use crate::unicode;

fn kind_for_quote(quote: u32) -> TokenKind {
    match char::from_u32(quote) {
        Some('"') => TokenKind::StringLiteral,
        Some('\'') => TokenKind::CharacterLiteral,
        Some('`') => TokenKind::QuoteLiteral,
        _ => TokenKind::StringLiteral,
    }
}

fn push_code_point(out: &mut String, cp: u32, errors: &mut ErrorList, first: usize, last: usize) {
    match char::from_u32(cp) {
        Some(c) => out.push(c),
        None => {
            errors.add(first, last, ErrorCode::InvalidEscapeCodePoint, None);
        }
    }
}

fn parse_hex_escape(cursor: &mut FileCursor, digits: usize, braced_allowed: bool) -> Option<u32> {
    let braced = cursor.peek(0) == '{' as u32;
    if braced && braced_allowed {
        cursor.advance();
    }
    let mut value: u32 = 0;
    let mut count = 0;
    while count < digits || (braced && cursor.peek(0) != '}' as u32) {
        match char::from_u32(cursor.peek(0)) {
            Some(c) if unicode::is_digit(c, 16) => {
                value = value * 16 + c.to_digit(16).unwrap();
                cursor.advance();
                count += 1;
            }
            _ => break,
        }
        if !braced && count >= digits {
            break;
        }
    }
    if braced && cursor.peek(0) == '}' as u32 {
        cursor.advance();
    }
    if count == 0 {
        None
    } else {
        Some(value)
    }
}

/// Resolves `\N{NAME}` to a code point. The corpus carries no Unicode name
/// database, so only a handful of common names are recognised; anything
/// else is an error.
fn resolve_unicode_name(name: &str) -> Option<u32> {
    match name {
        "LATIN SMALL LETTER A" => Some('a' as u32),
        "DEGREE SIGN" => Some('°' as u32),
        "ZERO WIDTH SPACE" => Some(0x200B),
        "LINE FEED" | "NEWLINE" => Some('\n' as u32),
        _ => None,
    }
}

pub fn parse_string(cursor: &mut FileCursor, errors: &mut ErrorList, is_raw: bool) -> Token {
    let start = cursor.location().byte_ptr;
    let quote = cursor.peek(0);
    let kind = kind_for_quote(quote);
    cursor.advance();

    let mut text = String::new();
    loop {
        if cursor.size() == 0 || cursor.peek(0) == 0 {
            let end = cursor.location().byte_ptr;
            errors.add(start, end, ErrorCode::UnterminatedString, None);
            let mut t = Token::new(TokenKind::Error, start, end, text);
            t.is_raw = is_raw;
            return t;
        }
        if cursor.peek(0) == quote {
            let end_before_quote = cursor.location().byte_ptr;
            cursor.advance();
            let end = cursor.location().byte_ptr;
            let _ = end_before_quote;
            let mut t = Token::new(kind, start, end, text);
            t.is_raw = is_raw;
            return t;
        }
        if !is_raw && cursor.peek(0) == '\\' as u32 {
            let escape_start = cursor.location().byte_ptr;
            cursor.advance();
            match char::from_u32(cursor.peek(0)) {
                Some('n') => {
                    text.push('\n');
                    cursor.advance();
                }
                Some('t') => {
                    text.push('\t');
                    cursor.advance();
                }
                Some('r') => {
                    text.push('\r');
                    cursor.advance();
                }
                Some('0') => {
                    text.push('\0');
                    cursor.advance();
                }
                Some('\\') => {
                    text.push('\\');
                    cursor.advance();
                }
                Some('\'') => {
                    text.push('\'');
                    cursor.advance();
                }
                Some('"') => {
                    text.push('"');
                    cursor.advance();
                }
                Some('`') => {
                    text.push('`');
                    cursor.advance();
                }
                Some('u') => {
                    cursor.advance();
                    if let Some(cp) = parse_hex_escape(cursor, 4, true) {
                        let end = cursor.location().byte_ptr;
                        push_code_point(&mut text, cp, errors, escape_start, end);
                    } else {
                        let end = cursor.location().byte_ptr;
                        errors.add(escape_start, end, ErrorCode::InvalidEscapeCodePoint, None);
                    }
                }
                Some('U') => {
                    cursor.advance();
                    if let Some(cp) = parse_hex_escape(cursor, 6, true) {
                        let end = cursor.location().byte_ptr;
                        push_code_point(&mut text, cp, errors, escape_start, end);
                    } else {
                        let end = cursor.location().byte_ptr;
                        errors.add(escape_start, end, ErrorCode::InvalidEscapeCodePoint, None);
                    }
                }
                Some('N') => {
                    cursor.advance();
                    if cursor.peek(0) == '{' as u32 {
                        cursor.advance();
                        let mut name = String::new();
                        while cursor.peek(0) != '}' as u32 && cursor.peek(0) != 0 {
                            if let Some(c) = char::from_u32(cursor.peek(0)) {
                                name.push(c);
                            }
                            cursor.advance();
                        }
                        if cursor.peek(0) == '}' as u32 {
                            cursor.advance();
                        }
                        let end = cursor.location().byte_ptr;
                        match resolve_unicode_name(&name) {
                            Some(cp) => push_code_point(&mut text, cp, errors, escape_start, end),
                            None => errors.add(escape_start, end, ErrorCode::UnknownUnicodeName, None),
                        }
                    }
                }
                _ => {
                    let end = cursor.location().byte_ptr;
                    errors.add(escape_start, end, ErrorCode::InvalidEscapeSequence, None);
                    cursor.advance();
                }
            }
            continue;
        }
        if let Some(c) = char::from_u32(cursor.peek(0)) {
            text.push(c);
        }
        cursor.advance();
    }
}
