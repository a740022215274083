//! Response-file (`@filename`) argument expansion.
//!
//! Grounded on `original_source/src/utility/command_line.cpp`'s `parse(filename)`:
//! whitespace/newline separate tokens, `\` escapes the following character,
//! and `"` toggles an in-quotes state where whitespace no longer splits
//! tokens. Expansion happens before `clap` ever sees the arguments, so a
//! response file can itself be nested via a further `@other-file` token.

use anyhow::{Context, Result};
use std::path::Path;

/// Expands every `@filename` token in `args` into the whitespace/quote
/// delimited tokens read from that file, recursively. Plain tokens pass
/// through unchanged.
pub fn expand(args: Vec<String>) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        if let Some(filename) = arg.strip_prefix('@') {
            if filename.is_empty() {
                anyhow::bail!("filename for '@' option is empty");
            }
            let expanded = expand_file(Path::new(filename))?;
            out.extend(expand(expanded)?);
        } else {
            out.push(arg);
        }
    }
    Ok(out)
}

fn expand_file(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read response file '{}'", path.display()))?;
    Ok(tokenize(&data))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InQuotes,
    Escaped,
}

/// Tokenizes response-file text with C-style backslash escaping and
/// double-quote grouping; unquoted whitespace (any `char::is_whitespace`)
/// separates tokens.
fn tokenize(data: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut argument = String::new();
    let mut state = State::Normal;

    for c in data.chars() {
        match state {
            State::Escaped => {
                argument.push(c);
                state = State::Normal;
            }
            State::Normal | State::InQuotes if c == '\\' => {
                state = State::Escaped;
            }
            _ if c == '"' => {
                state = if state == State::Normal { State::InQuotes } else { State::Normal };
            }
            State::Normal if c.is_whitespace() => {
                if !argument.is_empty() {
                    arguments.push(std::mem::take(&mut argument));
                }
            }
            _ => argument.push(c),
        }
    }

    if !argument.is_empty() {
        arguments.push(argument);
    }
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_newlines_separate_tokens() {
        assert_eq!(tokenize("build  --fetch\n.\n"), vec!["build", "--fetch", "."]);
    }

    #[test]
    fn quotes_group_whitespace_into_one_token() {
        assert_eq!(tokenize(r#"--define name="a value""#), vec!["--define", "name=a value"]);
    }

    #[test]
    fn backslash_escapes_next_character() {
        assert_eq!(tokenize(r#"a\ b"#), vec!["a b"]);
        assert_eq!(tokenize(r#"\"quoted\""#), vec![r#""quoted""#]);
    }

    #[test]
    fn expand_leaves_plain_arguments_untouched() {
        let args = vec!["build".to_owned(), ".".to_owned()];
        assert_eq!(expand(args.clone()).unwrap(), args);
    }

    #[test]
    fn expand_reads_response_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let rsp = dir.path().join("args.rsp");
        std::fs::write(&rsp, "--fetch --build-type release").unwrap();
        let args = vec![format!("@{}", rsp.display())];
        assert_eq!(expand(args).unwrap(), vec!["--fetch", "--build-type", "release"]);
    }
}
