//! Error list (component I): a sorted-by-span list of diagnostics, each
//! immediately formatted to stderr and mirrored through `log`.
//!
//! Grounded on `diagnostics/error_list.{hpp,cpp}`. Error codes are numeric
//! and range-tagged (informational/warning/error/fatal/security) per the
//! governing design notes' §4.I and §7.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    // Informational: 0-9999
    pub const NONE: ErrorCode = ErrorCode(0);

    // Warnings: 10000-19999
    pub const COULD_NOT_CLONE_REPOSITORY: ErrorCode = ErrorCode(10001);
    pub const REMOTE_IMPORT_UNREACHABLE: ErrorCode = ErrorCode(10002);

    // Errors: 20000-29999
    pub const EMPTY_EXPONENT: ErrorCode = ErrorCode(20001);
    pub const INVALID_ESCAPE_SEQUENCE: ErrorCode = ErrorCode(20002);
    pub const INVALID_ESCAPE_CODE_POINT: ErrorCode = ErrorCode(20003);
    pub const UNKNOWN_UNICODE_NAME: ErrorCode = ErrorCode(20004);
    pub const UNTERMINATED_STRING: ErrorCode = ErrorCode(20005);
    pub const UNTERMINATED_BRACKETED_STRING: ErrorCode = ErrorCode(20006);
    pub const UNTERMINATED_BLOCK_COMMENT: ErrorCode = ErrorCode(20007);
    pub const UNRECOGNIZED_CODE_POINT: ErrorCode = ErrorCode(20008);
    pub const MALFORMED_LINE_DIRECTIVE: ErrorCode = ErrorCode(20009);
    pub const MALFORMED_SCRAM_DIRECTIVE: ErrorCode = ErrorCode(20010);
    pub const INVALID_FQNAME: ErrorCode = ErrorCode(20011);
    pub const MISSING_RHS_OF_BINARY_OPERATOR: ErrorCode = ErrorCode(20012);
    pub const MISSING_CLOSING_PARENTHESIS: ErrorCode = ErrorCode(20013);
    pub const EXPECTED_STATEMENT_TERMINATOR: ErrorCode = ErrorCode(20014);
    pub const INVALID_OPERAND_TYPES: ErrorCode = ErrorCode(20015);
    pub const DUPLICATE_MODULE: ErrorCode = ErrorCode(20016);
    pub const MISSING_ANCHOR_MODULE: ErrorCode = ErrorCode(20017);
    pub const REMOTE_URL_MISMATCH: ErrorCode = ErrorCode(20018);
    pub const REV_NOT_FOUND: ErrorCode = ErrorCode(20019);
    pub const MISSING_FQNAME: ErrorCode = ErrorCode(20020);
    pub const MISSING_FILENAME_STEM: ErrorCode = ErrorCode(20021);
    pub const MISSING_GIT_URL: ErrorCode = ErrorCode(20022);
    pub const MISSING_GIT_REV: ErrorCode = ErrorCode(20023);
    pub const MISSING_ZIP_PATH: ErrorCode = ErrorCode(20024);
    pub const MISSING_LIB_PATH: ErrorCode = ErrorCode(20025);
    pub const MISSING_AS_NAME: ErrorCode = ErrorCode(20026);
    pub const MISSING_MODULE_NAME: ErrorCode = ErrorCode(20027);
    pub const DUPLICATE_FALLBACK_MODULE: ErrorCode = ErrorCode(20028);
    pub const IMPORTED_MODULE_NOT_FOUND: ErrorCode = ErrorCode(20029);

    // Fatal: 30000-39999
    pub const FILE_OUTSIDE_WORKDIR: ErrorCode = ErrorCode(30001);

    // Security: >=40000
    pub const SPOOF_CHECK_FAILED: ErrorCode = ErrorCode(40001);

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::COULD_NOT_CLONE_REPOSITORY => "could not clone repository",
            ErrorCode::REMOTE_IMPORT_UNREACHABLE => "remote import unreachable",
            ErrorCode::EMPTY_EXPONENT => "empty exponent",
            ErrorCode::INVALID_ESCAPE_SEQUENCE => "invalid escape sequence",
            ErrorCode::INVALID_ESCAPE_CODE_POINT => "invalid escape code point",
            ErrorCode::UNKNOWN_UNICODE_NAME => "unknown unicode name",
            ErrorCode::UNTERMINATED_STRING => "unterminated string literal",
            ErrorCode::UNTERMINATED_BRACKETED_STRING => "unterminated bracketed string",
            ErrorCode::UNTERMINATED_BLOCK_COMMENT => "unterminated block comment",
            ErrorCode::UNRECOGNIZED_CODE_POINT => "unrecognized code point",
            ErrorCode::MALFORMED_LINE_DIRECTIVE => "malformed #line directive",
            ErrorCode::MALFORMED_SCRAM_DIRECTIVE => "malformed #scram directive",
            ErrorCode::INVALID_FQNAME => "invalid fully-qualified name",
            ErrorCode::MISSING_RHS_OF_BINARY_OPERATOR => "missing right-hand side of binary operator",
            ErrorCode::MISSING_CLOSING_PARENTHESIS => "missing closing parenthesis",
            ErrorCode::EXPECTED_STATEMENT_TERMINATOR => "expected statement terminator",
            ErrorCode::INVALID_OPERAND_TYPES => "invalid operand types",
            ErrorCode::DUPLICATE_MODULE => {
                "there are multiple modules with the same name for which the build guard evaluates to true"
            }
            ErrorCode::MISSING_ANCHOR_MODULE => {
                "module must be a sub-module of an anchor module in the same repository"
            }
            ErrorCode::REMOTE_URL_MISMATCH => "remote url mismatch",
            ErrorCode::REV_NOT_FOUND => "revision not found",
            ErrorCode::MISSING_FQNAME => "missing fully-qualified name",
            ErrorCode::MISSING_FILENAME_STEM => "missing filename stem",
            ErrorCode::MISSING_GIT_URL => "missing git url",
            ErrorCode::MISSING_GIT_REV => "missing git revision",
            ErrorCode::MISSING_ZIP_PATH => "missing zip path",
            ErrorCode::MISSING_LIB_PATH => "missing lib path",
            ErrorCode::MISSING_AS_NAME => "missing name after 'as'",
            ErrorCode::MISSING_MODULE_NAME => "missing module name",
            ErrorCode::DUPLICATE_FALLBACK_MODULE => "there are multiple fallback modules with the same name",
            ErrorCode::IMPORTED_MODULE_NOT_FOUND => "imported module was not found in project",
            ErrorCode::FILE_OUTSIDE_WORKDIR => "file outside work directory",
            ErrorCode::SPOOF_CHECK_FAILED => "identifier failed spoof check",
            _ => "unknown error",
        }
    }

    pub fn severity(self) -> Severity {
        match self.0 {
            0..=9999 => Severity::Informational,
            10000..=19999 => Severity::Warning,
            20000..=29999 => Severity::Error,
            30000..=39999 => Severity::Fatal,
            _ => Severity::Security,
        }
    }
}

// Provide the snake_case aliases the lexer submodules spell out directly,
// without repeating the SCREAMING_SNAKE_CASE constant names everywhere.
#[allow(non_upper_case_globals)]
impl ErrorCode {
    pub const EmptyExponent: ErrorCode = ErrorCode::EMPTY_EXPONENT;
    pub const InvalidEscapeSequence: ErrorCode = ErrorCode::INVALID_ESCAPE_SEQUENCE;
    pub const InvalidEscapeCodePoint: ErrorCode = ErrorCode::INVALID_ESCAPE_CODE_POINT;
    pub const UnknownUnicodeName: ErrorCode = ErrorCode::UNKNOWN_UNICODE_NAME;
    pub const UnterminatedString: ErrorCode = ErrorCode::UNTERMINATED_STRING;
    pub const UnterminatedBracketedString: ErrorCode = ErrorCode::UNTERMINATED_BRACKETED_STRING;
    pub const UnterminatedBlockComment: ErrorCode = ErrorCode::UNTERMINATED_BLOCK_COMMENT;
    pub const UnrecognizedCodePoint: ErrorCode = ErrorCode::UNRECOGNIZED_CODE_POINT;
    pub const MalformedLineDirective: ErrorCode = ErrorCode::MALFORMED_LINE_DIRECTIVE;
    pub const MalformedScramDirective: ErrorCode = ErrorCode::MALFORMED_SCRAM_DIRECTIVE;
    pub const InvalidFqname: ErrorCode = ErrorCode::INVALID_FQNAME;
    pub const MissingRhsOfBinaryOperator: ErrorCode = ErrorCode::MISSING_RHS_OF_BINARY_OPERATOR;
    pub const MissingClosingParenthesis: ErrorCode = ErrorCode::MISSING_CLOSING_PARENTHESIS;
    pub const ExpectedStatementTerminator: ErrorCode = ErrorCode::EXPECTED_STATEMENT_TERMINATOR;
    pub const InvalidOperandTypes: ErrorCode = ErrorCode::INVALID_OPERAND_TYPES;
    pub const DuplicateModule: ErrorCode = ErrorCode::DUPLICATE_MODULE;
    pub const MissingAnchorModule: ErrorCode = ErrorCode::MISSING_ANCHOR_MODULE;
    pub const RemoteUrlMismatch: ErrorCode = ErrorCode::REMOTE_URL_MISMATCH;
    pub const RevNotFound: ErrorCode = ErrorCode::REV_NOT_FOUND;
    pub const MissingFqname: ErrorCode = ErrorCode::MISSING_FQNAME;
    pub const MissingFilenameStem: ErrorCode = ErrorCode::MISSING_FILENAME_STEM;
    pub const MissingGitUrl: ErrorCode = ErrorCode::MISSING_GIT_URL;
    pub const MissingGitRev: ErrorCode = ErrorCode::MISSING_GIT_REV;
    pub const MissingZipPath: ErrorCode = ErrorCode::MISSING_ZIP_PATH;
    pub const MissingLibPath: ErrorCode = ErrorCode::MISSING_LIB_PATH;
    pub const MissingAsName: ErrorCode = ErrorCode::MISSING_AS_NAME;
    pub const MissingModuleName: ErrorCode = ErrorCode::MISSING_MODULE_NAME;
    pub const DuplicateFallbackModule: ErrorCode = ErrorCode::DUPLICATE_FALLBACK_MODULE;
    pub const ImportedModuleNotFound: ErrorCode = ErrorCode::IMPORTED_MODULE_NOT_FOUND;
    pub const FileOutsideWorkdir: ErrorCode = ErrorCode::FILE_OUTSIDE_WORKDIR;
    pub const SpoofCheckFailed: ErrorCode = ErrorCode::SPOOF_CHECK_FAILED;
    pub const CouldNotCloneRepository: ErrorCode = ErrorCode::COULD_NOT_CLONE_REPOSITORY;
    pub const RemoteImportUnreachable: ErrorCode = ErrorCode::REMOTE_IMPORT_UNREACHABLE;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Informational,
    Warning,
    Error,
    Fatal,
    Security,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub first: usize,
    pub last: usize,
    pub code: ErrorCode,
    pub detail: Option<String>,
}

impl ErrorRecord {
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {}", self.code.default_message(), detail),
            None => self.code.default_message().to_owned(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Default)]
pub struct ErrorList {
    records: Vec<ErrorRecord>,
}

impl ErrorList {
    pub fn new() -> Self {
        ErrorList::default()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn worst_severity(&self) -> Option<Severity> {
        self.records.iter().map(|r| r.code.severity()).max_by_key(severity_rank)
    }

    /// Inserts a diagnostic in (first, last) order, suppressing an exact
    /// duplicate (same code at the same span). Immediately formats and
    /// writes the record to standard error, and mirrors it through `log`.
    pub fn add(&mut self, first: usize, last: usize, code: ErrorCode, detail: Option<String>) {
        let record = ErrorRecord { first, last, code, detail };
        let pos = self
            .records
            .binary_search_by(|r| (r.first, r.last).cmp(&(record.first, record.last)))
            .unwrap_or_else(|idx| idx);

        if let Some(existing) = self.records.get(pos) {
            if existing.first == record.first && existing.last == record.last && existing.code == record.code {
                return;
            }
        }
        if pos > 0 {
            if let Some(prev) = self.records.get(pos - 1) {
                if prev.first == record.first && prev.last == record.last && prev.code == record.code {
                    return;
                }
            }
        }

        self.emit(&record);
        self.records.insert(pos, record);
    }

    fn emit(&self, record: &ErrorRecord) {
        eprintln!("{}", record.message());
        match record.code.severity() {
            Severity::Informational => log::info!("{}", record),
            Severity::Warning => log::warn!("{}", record),
            Severity::Error | Severity::Fatal | Severity::Security => log::error!("{}", record),
        }
    }

    /// Like `add`, but formats the message with the line table so the
    /// standard error output reads `file:line:col: message`.
    pub fn add_located(
        &mut self,
        first: usize,
        last: usize,
        code: ErrorCode,
        detail: Option<String>,
        text: &[u8],
        line_table: &crate::line_table::LineTable,
    ) {
        let (file, line, col) = line_table.position(text, first);
        let record = ErrorRecord { first, last, code, detail };
        eprintln!(
            "{}:{}:{}: {}",
            file.unwrap_or("<unknown>"),
            line,
            col,
            record.message()
        );
        self.add(first, last, code, record.detail);
    }
}

fn severity_rank(s: &Severity) -> u8 {
    match s {
        Severity::Informational => 0,
        Severity::Warning => 1,
        Severity::Error => 2,
        Severity::Fatal => 3,
        Severity::Security => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insertion_is_suppressed() {
        let mut list = ErrorList::new();
        list.add(0, 1, ErrorCode::EmptyExponent, None);
        list.add(0, 1, ErrorCode::EmptyExponent, None);
        assert_eq!(list.records().len(), 1);
    }

    #[test]
    fn records_stay_sorted_by_span() {
        let mut list = ErrorList::new();
        list.add(10, 12, ErrorCode::EmptyExponent, None);
        list.add(0, 2, ErrorCode::EmptyExponent, None);
        let spans: Vec<_> = list.records().iter().map(|r| r.first).collect();
        assert_eq!(spans, vec![0, 10]);
    }

    #[test]
    fn severity_bands_match_numeric_ranges() {
        assert_eq!(ErrorCode::CouldNotCloneRepository.severity(), Severity::Warning);
        assert_eq!(ErrorCode::EmptyExponent.severity(), Severity::Error);
        assert_eq!(ErrorCode::FileOutsideWorkdir.severity(), Severity::Fatal);
        assert_eq!(ErrorCode::SpoofCheckFailed.severity(), Severity::Security);
    }
}
