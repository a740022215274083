//! File cursor (component C): buffered UTF-8 reader with an 8-code-point
//! lookahead and optional scrambling.
//!
//! Grounded on `tokenizer/file_cursor.cpp`: the file is read in 4096-byte
//! chunks (here, eagerly at open time, appending the 8 trailing NUL bytes
//! §4.D requires sub-parsers to be able to overread into); scrambling is a
//! Caesar shift over printable ASCII driven by an evolving xorshift32 key,
//! applied to whatever is in the lookahead at the moment the key changes —
//! so a fresh key compounds onto values already scrambled (or not) under the
//! previous key, preserving the invariant that buffered code points are
//! always internally consistent.

use crate::unicode;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const LOOKAHEAD: usize = 8;
const CHUNK_SIZE: usize = 4096;
const SENTINEL_BYTES: usize = 8;

pub struct FileCursor {
    path: PathBuf,
    text: Vec<u8>,
    content_len: usize,
    byte_pos: usize,
    scram_key: u32,
    lookahead_cp: [u32; LOOKAHEAD],
    lookahead_len: [usize; LOOKAHEAD],
    current_line: u32,
    utf8_column: u32,
    utf16_column: u32,
    utf32_column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorLocation {
    pub line: u32,
    pub utf8_column: u32,
    pub utf16_column: u32,
    pub utf32_column: u32,
    pub byte_ptr: usize,
}

impl FileCursor {
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut text = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            text.extend_from_slice(&chunk[..n]);
        }
        let content_len = text.len();
        text.extend(std::iter::repeat(0u8).take(SENTINEL_BYTES));
        let mut cursor = FileCursor {
            path: path.to_path_buf(),
            text,
            content_len,
            byte_pos: 0,
            scram_key: 0,
            lookahead_cp: [0; LOOKAHEAD],
            lookahead_len: [1; LOOKAHEAD],
            current_line: 1,
            utf8_column: 0,
            utf16_column: 0,
            utf32_column: 0,
        };
        cursor.fill_lookahead();
        Ok(cursor)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_at(&self, pos: usize) -> (u32, usize) {
        if pos >= self.text.len() {
            return (0, 1);
        }
        match unicode::decode_code_point(&self.text[pos..]) {
            Ok(result) => result,
            Err(_) => (0xFFFD, 1),
        }
    }

    fn scram_one(&mut self, cp: u32) -> u32 {
        if self.scram_key == 0 {
            return cp;
        }
        let shifted = if (0x21..=0x7E).contains(&cp) {
            let shift = self.scram_key & 0xff;
            let range = 0x7E - 0x21 + 1;
            0x21 + (cp - 0x21 + shift) % range
        } else {
            cp
        };
        let mut key = self.scram_key;
        key ^= key << 13;
        key ^= key >> 17;
        key ^= key << 5;
        self.scram_key = if key == 0 { 1 } else { key };
        shifted
    }

    fn fill_lookahead(&mut self) {
        let mut pos = self.byte_pos;
        for i in 0..LOOKAHEAD {
            let (cp, len) = self.decode_at(pos);
            self.lookahead_cp[i] = self.scram_one(cp);
            self.lookahead_len[i] = len;
            pos += len;
        }
    }

    /// Number of code points still available before the end-of-file NUL
    /// sentinel; 0 means end of file.
    pub fn size(&self) -> usize {
        if self.byte_pos >= self.content_len {
            0
        } else {
            LOOKAHEAD.min(self.content_len - self.byte_pos)
        }
    }

    pub fn peek(&self, k: usize) -> u32 {
        assert!(k < LOOKAHEAD, "peek index out of range");
        self.lookahead_cp[k]
    }

    pub fn advance(&mut self) {
        let consumed_cp = self.lookahead_cp[0];
        let consumed_len = self.lookahead_len[0];
        let vs = unicode::is_vertical_space(&self.text[self.byte_pos..]);
        if vs > 0 {
            self.current_line += 1;
            self.utf8_column = 0;
            self.utf16_column = 0;
            self.utf32_column = 0;
        } else {
            self.utf8_column += consumed_len as u32;
            self.utf16_column += if consumed_cp >= 0x10000 { 2 } else { 1 };
            self.utf32_column += 1;
        }
        self.byte_pos += consumed_len;

        for i in 0..LOOKAHEAD - 1 {
            self.lookahead_cp[i] = self.lookahead_cp[i + 1];
            self.lookahead_len[i] = self.lookahead_len[i + 1];
        }
        let mut pos = self.byte_pos;
        for len in self.lookahead_len.iter().take(LOOKAHEAD - 1) {
            pos += len;
        }
        let (cp, len) = self.decode_at(pos);
        self.lookahead_cp[LOOKAHEAD - 1] = self.scram_one(cp);
        self.lookahead_len[LOOKAHEAD - 1] = len;
    }

    pub fn location(&self) -> CursorLocation {
        CursorLocation {
            line: self.current_line,
            utf8_column: self.utf8_column,
            utf16_column: self.utf16_column,
            utf32_column: self.utf32_column,
            byte_ptr: self.byte_pos,
        }
    }

    /// Handles a `#line N` directive: resets the line counter and column.
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
        self.utf8_column = 0;
        self.utf16_column = 0;
        self.utf32_column = 0;
    }

    /// Re-scrambles the currently-buffered lookahead with the new key,
    /// compounding onto whatever is already stored there.
    pub fn set_scram_key(&mut self, key: u32) {
        self.scram_key = key;
        for i in 0..LOOKAHEAD {
            self.lookahead_cp[i] = self.scram_one(self.lookahead_cp[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cursor_for(contents: &str) -> FileCursor {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        FileCursor::open(f.path()).unwrap()
    }

    #[test]
    fn peek_and_advance_walk_ascii() {
        let mut cursor = cursor_for("ab");
        assert_eq!(cursor.peek(0), 'a' as u32);
        assert_eq!(cursor.peek(1), 'b' as u32);
        cursor.advance();
        assert_eq!(cursor.peek(0), 'b' as u32);
    }

    #[test]
    fn size_reaches_zero_at_eof() {
        let mut cursor = cursor_for("a");
        assert_eq!(cursor.size(), 1);
        cursor.advance();
        assert_eq!(cursor.size(), 0);
    }

    #[test]
    fn scram_key_zero_is_noop() {
        let cursor = cursor_for("abc");
        assert_eq!(cursor.peek(0), 'a' as u32);
    }

    #[test]
    fn scram_key_shifts_printable_ascii() {
        let mut cursor = cursor_for("abc");
        cursor.set_scram_key(1);
        assert_ne!(cursor.peek(0), 'a' as u32);
        assert!((0x21..=0x7E).contains(&cursor.peek(0)));
    }
}
