use std::path::{Path, PathBuf};

use precp_lexer::{TokenKind, Tokenizer, TokenizerFlags};

use crate::error::DriverError;

/// Resolves `#include` search-path policy. Implemented by whatever owns
/// the `-I` directory list — the core only knows how to parse the
/// filename out of the directive and recurse into whatever file the
/// resolver hands back.
pub trait IncludeResolver {
    /// Candidate filesystem paths to try opening, in search order, for
    /// `#include "name"` (`quoted = true`) or `#include <name>`
    /// (`quoted = false`). `includer_dir` is the directory of the file
    /// containing the directive, when known.
    fn candidates(&self, name: &str, quoted: bool, includer_dir: Option<&Path>) -> Vec<PathBuf>;
}

fn skip_hspace(tokenizer: &mut Tokenizer) -> Result<(), DriverError> {
    loop {
        let pos = tokenizer.position();
        let tok = tokenizer.next().map_err(DriverError::from)?;
        if tok.is_separator(' ') || tok.is_separator('\t') {
            continue;
        }
        tokenizer.set_position(pos);
        return Ok(());
    }
}

/// Parses the filename operand of `#include`. String tokenization is
/// disabled for the duration of the call — `"` must be an ordinary
/// separator here, not the start of a quoted-string token — and
/// restored before returning, success or failure.
pub fn parse_include_filename(tokenizer: &mut Tokenizer) -> Result<(String, bool), DriverError> {
    let saved_flags = tokenizer.flags();
    tokenizer.set_flags(TokenizerFlags::empty());
    let result = parse_include_filename_inner(tokenizer);
    tokenizer.set_flags(saved_flags);
    result
}

fn parse_include_filename_inner(tokenizer: &mut Tokenizer) -> Result<(String, bool), DriverError> {
    skip_hspace(tokenizer)?;
    let open = tokenizer.next().map_err(DriverError::from)?;
    let (quoted, stop) = if open.is_separator('"') {
        (true, '"')
    } else if open.is_separator('<') {
        (false, '>')
    } else {
        return Err(DriverError::ExpectedIncludeDelimiter {
            line: open.line,
            column: open.column,
            spelling: open.spelling,
        });
    };

    let mut name = String::new();
    loop {
        let tok = tokenizer.next().map_err(DriverError::from)?;
        if tok.kind == TokenKind::EndOfFile || tok.is_separator('\n') {
            return Err(DriverError::MalformedIncludeFilename {
                line: tok.line,
                column: tok.column,
                spelling: tok.spelling,
            });
        }
        if tok.is_separator(stop) {
            break;
        }
        if tok.kind == TokenKind::Separator {
            name.push(tok.value);
        } else {
            name.push_str(&tok.spelling);
        }
    }

    Ok((name, quoted))
}

/// The search policy described in the external interface: `"name"`
/// checks the includer's own directory before the configured `-I`
/// directories; `<name>` only checks `-I` directories.
#[derive(Debug, Default, Clone)]
pub struct SearchPathResolver {
    pub include_dirs: Vec<PathBuf>,
}

impl IncludeResolver for SearchPathResolver {
    fn candidates(&self, name: &str, quoted: bool, includer_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if quoted {
            if let Some(dir) = includer_dir {
                out.push(dir.join(name));
            }
        }
        out.extend(self.include_dirs.iter().map(|dir| dir.join(name)));
        out
    }
}
