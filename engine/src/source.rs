//! Source file record (component J): a small state machine keyed on mtime.
//!
//! Grounded on `semantics/source_record.{hpp,cpp}`.

use crate::ast::Ast;
use crate::errors::ErrorList;
use crate::file_cursor::FileCursor;
use crate::lexer::Lexer;
use crate::line_table::LineTable;
use crate::parser::Parser;
use crate::token_vector::TokenVector;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Fresh,
    LoadedNotParsed,
    PrologueParsed,
    FullParsed,
}

pub struct SourceRecord {
    pub path: PathBuf,
    state: SourceState,
    last_write_time: Option<SystemTime>,
    pub line_table: LineTable,
    pub errors: ErrorList,
    pub ast: Option<Ast>,
}

impl SourceRecord {
    pub fn new(path: PathBuf) -> Self {
        SourceRecord {
            path,
            state: SourceState::Fresh,
            last_write_time: None,
            line_table: LineTable::new(),
            errors: ErrorList::new(),
            ast: None,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Stats the file; if the write time is unchanged, remains `Fresh` (or
    /// whatever state it already reached). Otherwise loads, clears the AST,
    /// and records the new write time. Idempotent.
    pub fn ensure_loaded(&mut self) -> io::Result<()> {
        let metadata = std::fs::metadata(&self.path)?;
        let write_time = metadata.modified()?;
        if self.last_write_time == Some(write_time) && self.state != SourceState::Fresh {
            return Ok(());
        }
        self.last_write_time = Some(write_time);
        self.line_table.clear();
        self.errors.clear();
        self.ast = None;
        self.state = SourceState::LoadedNotParsed;
        Ok(())
    }

    /// Parses the prologue (top declaration + imports). Idempotent once in
    /// `PrologueParsed` or later, unless the text was reloaded meanwhile.
    pub fn ensure_prologue(&mut self) -> io::Result<()> {
        self.ensure_loaded()?;
        if matches!(self.state, SourceState::PrologueParsed | SourceState::FullParsed) {
            return Ok(());
        }
        let cursor = FileCursor::open(&self.path)?;
        let lexer = Lexer::new(cursor, &mut self.line_table, &mut self.errors);
        let mut tokens = TokenVector::new(lexer);
        let mut ast = Ast::new();
        {
            let mut parser = Parser::new(&mut tokens, &mut self.errors);
            parser.parse_prologue(&mut ast);
        }
        self.ast = Some(ast);
        self.state = SourceState::PrologueParsed;
        Ok(())
    }

    /// Parses the full body. The grammar beyond the prologue is out of
    /// scope; this only advances the state machine so callers can express
    /// "fully parsed" without re-parsing the prologue.
    pub fn ensure_full(&mut self) -> io::Result<()> {
        self.ensure_prologue()?;
        self.state = SourceState::FullParsed;
        Ok(())
    }
}

pub fn gather_hkm_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut visited_dirs = std::collections::HashSet::new();
    gather_recursive(root, &mut visited_dirs, &mut out)?;
    out.sort();
    Ok(out)
}

fn gather_recursive(
    dir: &Path,
    visited_dirs: &mut std::collections::HashSet<PathBuf>,
    out: &mut Vec<PathBuf>,
) -> io::Result<()> {
    let canonical = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    if !visited_dirs.insert(canonical) {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') || name_str.starts_with('_') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
            gather_recursive(&path, visited_dirs, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("hkm") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ensure_prologue_parses_module_declaration() {
        let mut f = tempfile::Builder::new().suffix(".hkm").tempfile().unwrap();
        f.write_all(b"module .a.b;\n").unwrap();
        let mut record = SourceRecord::new(f.path().to_path_buf());
        record.ensure_prologue().unwrap();
        assert_eq!(record.state(), SourceState::PrologueParsed);
        assert!(record.ast.is_some());
    }

    #[test]
    fn gather_skips_dot_and_underscore_prefixed_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("visible.hkm"), "module .a;\n").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden/skipped.hkm"), "module .b;\n").unwrap();
        std::fs::create_dir(dir.path().join("_gen")).unwrap();
        std::fs::write(dir.path().join("_gen/skipped.hkm"), "module .c;\n").unwrap();

        let files = gather_hkm_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "visible.hkm");
    }
}
