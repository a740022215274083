//! Number/version sub-parser, grounded on `tokenizer/parse_number.cpp`.

use crate::errors::{ErrorCode, ErrorList};
use crate::file_cursor::FileCursor;
use crate::token::{Token, TokenKind};
use crate::unicode;

fn radix_prefix(cursor: &FileCursor) -> Option<(u32, usize)> {
    if cursor.peek(0) != '0' as u32 {
        return None;
    }
    match char::from_u32(cursor.peek(1)).map(|c| c.to_ascii_lowercase()) {
        Some('b') => Some((2, 2)),
        Some('o') => Some((8, 2)),
        Some('d') => Some((10, 2)),
        Some('x') => Some((16, 2)),
        _ => None,
    }
}

/// True if a number token could start at the cursor's current position.
pub fn starts_number(cursor: &FileCursor) -> bool {
    let c0 = cursor.peek(0);
    if let Some(c) = char::from_u32(c0) {
        if unicode::is_digit(c, 10) {
            return true;
        }
        if c == '.' {
            if let Some(c1) = char::from_u32(cursor.peek(1)) {
                return unicode::is_digit(c1, 10);
            }
        }
        if c == '+' || c == '-' {
            if let Some(c1) = char::from_u32(cursor.peek(1)) {
                if unicode::is_digit(c1, 10) {
                    return true;
                }
                if c1 == '.' {
                    if let Some(c2) = char::from_u32(cursor.peek(2)) {
                        return unicode::is_digit(c2, 10);
                    }
                }
            }
        }
    }
    false
}

fn consume_digits(cursor: &mut FileCursor, radix: u32, out: &mut String) -> bool {
    let mut any = false;
    loop {
        match char::from_u32(cursor.peek(0)) {
            Some(c) if unicode::is_digit(c, radix) => {
                out.push(c);
                cursor.advance();
                any = true;
            }
            Some('\'') => {
                // digit separator; only valid between digits, checked loosely here
                out.push('\'');
                cursor.advance();
            }
            _ => break,
        }
    }
    any
}

pub fn parse_number(cursor: &mut FileCursor, errors: &mut ErrorList) -> Token {
    let start = cursor.location().byte_ptr;
    let mut text = String::new();

    if let Some(c) = char::from_u32(cursor.peek(0)) {
        if c == '+' || c == '-' {
            text.push(c);
            cursor.advance();
        }
    }

    let radix = if let Some((radix, len)) = radix_prefix(cursor) {
        for _ in 0..len {
            text.push(char::from_u32(cursor.peek(0)).unwrap_or('0'));
            cursor.advance();
        }
        radix
    } else {
        10
    };

    consume_digits(cursor, radix, &mut text);

    let mut is_float = false;
    let mut version_component_count = 1;

    if cursor.peek(0) == '.' as u32
        && char::from_u32(cursor.peek(1))
            .map(|c| unicode::is_digit(c, radix) || c == '*')
            .unwrap_or(false)
    {
        is_float = true;
        text.push('.');
        cursor.advance();
        if cursor.peek(0) == '*' as u32 {
            text.push('*');
            cursor.advance();
        } else {
            consume_digits(cursor, radix, &mut text);
        }
        version_component_count = 2;

        if cursor.peek(0) == '.' as u32
            && (char::from_u32(cursor.peek(1))
                .map(|c| unicode::is_digit(c, radix) || c == '*')
                .unwrap_or(false))
        {
            text.push('.');
            cursor.advance();
            if cursor.peek(0) == '*' as u32 {
                text.push('*');
                cursor.advance();
            } else {
                consume_digits(cursor, radix, &mut text);
            }
            version_component_count = 3;
        }
    }

    if version_component_count >= 2 {
        let end = cursor.location().byte_ptr;
        return Token::new(TokenKind::VersionLiteral, start, end, text);
    }

    if let Some(c) = char::from_u32(cursor.peek(0)) {
        if unicode::is_exponent_prefix(c, radix) {
            let mark = text.len();
            text.push(c);
            cursor.advance();
            if let Some(sign) = char::from_u32(cursor.peek(0)) {
                if sign == '+' || sign == '-' {
                    text.push(sign);
                    cursor.advance();
                }
            }
            let mut exponent_digits = String::new();
            consume_digits(cursor, 10, &mut exponent_digits);
            if exponent_digits.is_empty() {
                let end = cursor.location().byte_ptr;
                errors.add(start, end, ErrorCode::EmptyExponent, None);
                return Token::new(TokenKind::Error, start, end, text);
            }
            text.push_str(&exponent_digits);
            is_float = true;
            let _ = mark;
        }
    }

    let end = cursor.location().byte_ptr;
    let kind = if is_float {
        TokenKind::FloatLiteral
    } else {
        TokenKind::IntegerLiteral
    };
    Token::new(kind, start, end, text)
}

pub fn parse_superscript_integer(cursor: &mut FileCursor) -> Token {
    let start = cursor.location().byte_ptr;
    let mut text = String::new();
    while let Some(c) = char::from_u32(cursor.peek(0)) {
        if unicode::is_superscript_digit(c) {
            text.push(c);
            cursor.advance();
        } else {
            break;
        }
    }
    let end = cursor.location().byte_ptr;
    Token::new(TokenKind::SuperscriptIntegerLiteral, start, end, text)
}
