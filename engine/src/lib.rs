//! hikolang-engine - language front end and dependency resolver for the
//! `.hkm` module-oriented source language.
//!
//! This crate provides:
//!
//! - Unicode-aware lexing with an identifier spoof check
//! - A recoverable recursive-descent parser for module prologues and
//!   import statements
//! - A small boolean build-guard expression language
//! - A fixed-point dependency resolver that clones and tracks remote
//!   repositories referenced transitively from a root repository
//!
//! # Example
//!
//! ```rust,ignore
//! use hikolang_engine::source::gather_hkm_files;
//!
//! let files = gather_hkm_files(std::path::Path::new("."))?;
//! ```

pub mod ast;
pub mod config;
pub mod datum;
pub mod errors;
pub mod file_cursor;
pub mod interner;
pub mod lexer;
pub mod line_table;
pub mod parser;
pub mod remote;
pub mod repository;
pub mod source;
pub mod token;
pub mod token_vector;
pub mod unicode;
pub mod util;
pub mod worker_pool;

pub use ast::Ast;
pub use config::Config;
pub use datum::{Datum, DatumNamespace};
pub use errors::{ErrorCode, ErrorList};
pub use file_cursor::FileCursor;
pub use interner::{PathId, PathInterner};
pub use line_table::{FileLocation, LineTable};
pub use repository::Repository;
pub use source::SourceRecord;
pub use token::{Token, TokenKind};
pub use token_vector::TokenVector;
pub use util::{Defer, Fqname, Logic, SemanticVersion};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.chars().any(|c| c.is_ascii_digit()));
    }
}
