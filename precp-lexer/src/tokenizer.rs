use std::rc::Rc;

use bitflags::bitflags;
use thiserror::Error;

use crate::buffer::CharBuffer;
use crate::token::{Token, TokenKind};

/// Separator characters: anything in this set terminates whatever
/// non-separator lexeme was being accumulated, and is itself emitted as
/// its own single-character [`TokenKind::Separator`] token.
const SEPARATORS: &[u8] = b" \t\n()[]<>{}?:;.,!=+-*&|/%#'\"";

/// A token this long (including its terminating classification) can
/// never be produced; scanning aborts with [`TokenizeError::Overflow`]
/// instead.
pub const MAX_TOK_LEN: usize = 4096;

fn is_sep(c: u8) -> bool {
    SEPARATORS.contains(&c)
}

fn has_ul_tail(s: &str) -> bool {
    let mut tail = [0u8; 4];
    let mut count = 0;
    for b in s.bytes() {
        if count >= 4 {
            break;
        }
        let c = b.to_ascii_lowercase();
        if c == b'u' || c == b'l' {
            tail[count] = c;
            count += 1;
        } else {
            return false;
        }
    }
    match count {
        1 => true,
        2 => matches!(&tail[..2], b"lu" | b"ul" | b"ll"),
        3 => matches!(&tail[..3], b"llu" | b"ull"),
        _ => false,
    }
}

fn is_hex_int_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' || (bytes[1] != b'x' && bytes[1] != b'X') {
        return false;
    }
    let rest = &s[2..];
    if rest.is_empty() {
        return false;
    }
    let rest_bytes = rest.as_bytes();
    for (i, &b) in rest_bytes.iter().enumerate() {
        if !b.to_ascii_lowercase().is_ascii_hexdigit() {
            if i == 0 {
                return false;
            }
            return has_ul_tail(&rest[i..]);
        }
    }
    true
}

fn is_dec_int_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes[0] == b'0' {
        return false;
    }
    for (i, &b) in bytes.iter().enumerate() {
        if !b.is_ascii_digit() {
            return has_ul_tail(&s[i..]);
        }
    }
    true
}

fn is_oct_int_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes[0] != b'0' {
        return false;
    }
    bytes.iter().all(|&b| (b'0'..=b'7').contains(&b))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn categorize(s: &str) -> TokenKind {
    if s == "..." {
        TokenKind::Ellipsis
    } else if is_hex_int_literal(s) {
        TokenKind::HexInt
    } else if is_dec_int_literal(s) {
        TokenKind::DecInt
    } else if is_oct_int_literal(s) {
        TokenKind::OctInt
    } else if is_identifier(s) {
        TokenKind::Identifier
    } else {
        TokenKind::Unknown
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TokenizerFlags: u8 {
        /// Whether `'` and `"` trigger string-literal scanning, or are
        /// just ordinary separator characters.
        const PARSE_STRINGS = 0x1;
    }
}

/// The multi-character sequences that switch the tokenizer into
/// comment-skipping mode. `None` disables that kind of comment entirely.
#[derive(Debug, Clone, Default)]
pub struct CommentMarkers {
    pub multiline_start: Option<String>,
    pub multiline_end: Option<String>,
    pub single_line_start: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("token exceeds the maximum length of {MAX_TOK_LEN} characters")]
    Overflow {
        line: u32,
        column: u32,
        spelling: String,
    },
    #[error("unterminated string literal")]
    UnterminatedString {
        line: u32,
        column: u32,
        spelling: String,
    },
}

impl TokenizeError {
    pub fn line(&self) -> u32 {
        match self {
            TokenizeError::Overflow { line, .. } => *line,
            TokenizeError::UnterminatedString { line, .. } => *line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            TokenizeError::Overflow { column, .. } => *column,
            TokenizeError::UnterminatedString { column, .. } => *column,
        }
    }

    pub fn spelling(&self) -> &str {
        match self {
            TokenizeError::Overflow { spelling, .. } => spelling,
            TokenizeError::UnterminatedString { spelling, .. } => spelling,
        }
    }
}

/// A snapshot of everything needed to restore a [`Tokenizer`]'s reading
/// position, so callers can implement lookahead (peeking a token and
/// putting it back).
#[derive(Debug, Clone, Copy)]
pub struct TokenizerPosition(crate::buffer::BufferSnapshot);

/// Streaming character-level scanner. Holds its whole input in memory
/// (an `Rc<str>`, shared cheaply with whoever constructed it) so that
/// re-tokenizing a macro body or a captured argument is just another
/// `Tokenizer` over a clone of the same text.
pub struct Tokenizer {
    buf: CharBuffer,
    filename: String,
    flags: TokenizerFlags,
    markers: CommentMarkers,
}

impl Tokenizer {
    pub fn new(source: Rc<str>, filename: impl Into<String>, flags: TokenizerFlags) -> Self {
        Self {
            buf: CharBuffer::new(source),
            filename: filename.into(),
            flags,
            markers: CommentMarkers::default(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
    }

    pub fn set_markers(&mut self, markers: CommentMarkers) {
        self.markers = markers;
    }

    pub fn flags(&self) -> TokenizerFlags {
        self.flags
    }

    /// Temporarily changing flags is how `#include` disables string
    /// tokenization while reading a `"filename"` or `<filename>` — `"`
    /// must behave as a plain separator there, not a quote.
    pub fn set_flags(&mut self, flags: TokenizerFlags) {
        self.flags = flags;
    }

    pub fn line(&self) -> u32 {
        self.buf.line()
    }

    pub fn column(&self) -> u32 {
        self.buf.column()
    }

    pub fn position(&self) -> TokenizerPosition {
        TokenizerPosition(self.buf.snapshot())
    }

    pub fn set_position(&mut self, position: TokenizerPosition) {
        self.buf.restore(position.0);
    }

    /// Checks whether, starting with already-consumed byte `first`, the
    /// bytes of `marker` follow. On success every byte of `marker` has
    /// been consumed. On failure, every byte read beyond `first` is
    /// pushed back so scanning can resume one byte later.
    fn looks_at(&mut self, first: u8, marker: &[u8]) -> bool {
        if marker.is_empty() || first != marker[0] {
            return false;
        }
        let mut consumed = 0usize;
        let mut i = 1;
        let matched = loop {
            if i == marker.len() {
                break true;
            }
            match self.buf.getc() {
                Some(c) if c == marker[i] => {
                    consumed += 1;
                    i += 1;
                }
                Some(_) => {
                    consumed += 1;
                    break false;
                }
                None => break false,
            }
        };
        if !matched {
            for _ in 0..consumed {
                self.buf.ungetc();
            }
        }
        matched
    }

    /// Consumes characters until `marker` is found (and consumes it
    /// too), or until end of input. An unterminated comment at EOF is
    /// simply considered closed rather than left hanging.
    fn ignore_until(&mut self, marker: &[u8]) {
        loop {
            match self.buf.getc() {
                None => break,
                Some(c) => {
                    if self.looks_at(c, marker) {
                        break;
                    }
                }
            }
        }
    }

    fn scan_string(
        &mut self,
        quote: u8,
        start_line: u32,
        start_column: u32,
    ) -> Result<Token, TokenizeError> {
        let mut bytes = vec![quote];
        let mut escaped = false;
        loop {
            if bytes.len() + 1 >= MAX_TOK_LEN {
                return Err(TokenizeError::Overflow {
                    line: start_line,
                    column: start_column,
                    spelling: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
            match self.buf.getc() {
                None => {
                    return Err(TokenizeError::UnterminatedString {
                        line: start_line,
                        column: start_column,
                        spelling: String::from_utf8_lossy(&bytes).into_owned(),
                    })
                }
                Some(b'\n') => {
                    return Err(TokenizeError::UnterminatedString {
                        line: start_line,
                        column: start_column,
                        spelling: String::from_utf8_lossy(&bytes).into_owned(),
                    })
                }
                Some(c) => {
                    if !escaped && c == quote {
                        bytes.push(c);
                        let kind = if quote == b'"' {
                            TokenKind::DoubleQuoteString
                        } else {
                            TokenKind::SingleQuoteString
                        };
                        return Ok(Token {
                            kind,
                            line: start_line,
                            column: start_column,
                            spelling: String::from_utf8(bytes)
                                .expect("string token is a contiguous slice of valid UTF-8 source"),
                            value: '\0',
                        });
                    }
                    escaped = !escaped && c == b'\\';
                    bytes.push(c);
                }
            }
        }
    }

    /// Produces the next token, or an error describing a lexical
    /// failure (unterminated string, or a token exceeding
    /// [`MAX_TOK_LEN`]). Reaching end of input successfully yields a
    /// token of kind [`TokenKind::EndOfFile`].
    pub fn next(&mut self) -> Result<Token, TokenizeError> {
        let mut bytes: Vec<u8> = Vec::new();
        // Position of the first character of whatever lexeme we're
        // accumulating; fixed on the first iteration, unlike the
        // buffer's current (post-read) line/column.
        let mut lexeme_start: Option<(u32, u32)> = None;

        loop {
            let here = (self.buf.line(), self.buf.column());
            let c = match self.buf.getc() {
                Some(c) => c,
                None => {
                    return match (lexeme_start, bytes.is_empty()) {
                        (Some((line, column)), false) => self.finish_lexeme(bytes, line, column),
                        _ => Ok(Token::eof(here.0, here.1)),
                    }
                }
            };

            let multiline_start = self.markers.multiline_start.clone();
            if let Some(marker) = &multiline_start {
                if !marker.is_empty() && self.looks_at(c, marker.as_bytes()) {
                    // A comment marker's first character is always a
                    // separator, so it can never appear while a
                    // non-separator lexeme is being accumulated.
                    let end = self.markers.multiline_end.clone().unwrap_or_default();
                    self.ignore_until(end.as_bytes());
                    continue;
                }
            }
            let single_line_start = self.markers.single_line_start.clone();
            if let Some(marker) = &single_line_start {
                if !marker.is_empty() && self.looks_at(c, marker.as_bytes()) {
                    self.ignore_until(b"\n");
                    continue;
                }
            }

            if is_sep(c) {
                self.buf.ungetc();
                break;
            }

            if lexeme_start.is_none() {
                lexeme_start = Some(here);
            }
            bytes.push(c);
            if bytes.len() + 1 >= MAX_TOK_LEN {
                let (line, column) = lexeme_start.expect("just set above");
                return Err(TokenizeError::Overflow {
                    line,
                    column,
                    spelling: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
        }

        match lexeme_start {
            Some((line, column)) if !bytes.is_empty() => self.finish_lexeme(bytes, line, column),
            _ => {
                // Nothing was accumulated: the very first character we
                // read was itself a separator. Re-read it to produce a
                // one-character Separator token (or switch into string
                // scanning for quote characters).
                let line = self.buf.line();
                let column = self.buf.column();
                let c = self
                    .buf
                    .getc()
                    .expect("a separator character was just pushed back");
                if (c == b'"' || c == b'\'') && self.flags.contains(TokenizerFlags::PARSE_STRINGS)
                {
                    return self.scan_string(c, line, column);
                }
                Ok(Token {
                    kind: TokenKind::Separator,
                    line,
                    column,
                    spelling: (c as char).to_string(),
                    value: c as char,
                })
            }
        }
    }

    fn finish_lexeme(
        &mut self,
        bytes: Vec<u8>,
        start_line: u32,
        start_column: u32,
    ) -> Result<Token, TokenizeError> {
        let spelling =
            String::from_utf8(bytes).expect("lexeme is a contiguous slice of valid UTF-8 source");
        let kind = categorize(&spelling);
        Ok(Token {
            kind,
            line: start_line,
            column: start_column,
            spelling,
            value: '\0',
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer(src: &str) -> Tokenizer {
        let mut t = Tokenizer::new(Rc::from(src), "test.c", TokenizerFlags::PARSE_STRINGS);
        t.set_markers(CommentMarkers {
            multiline_start: Some("/*".into()),
            multiline_end: Some("*/".into()),
            single_line_start: Some("//".into()),
        });
        t
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut t = tokenizer(src);
        let mut out = Vec::new();
        loop {
            let tok = t.next().expect("no tokenizer errors in this fixture");
            if tok.kind == TokenKind::EndOfFile {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn identifier_and_separators() {
        let mut t = tokenizer("foo(bar)");
        assert_eq!(t.next().unwrap().spelling, "foo");
        assert_eq!(t.next().unwrap().value, '(');
        assert_eq!(t.next().unwrap().spelling, "bar");
        assert_eq!(t.next().unwrap().value, ')');
    }

    #[test]
    fn integer_literal_kinds() {
        assert_eq!(kinds("0x1Fu"), vec![TokenKind::HexInt]);
        assert_eq!(kinds("123ull"), vec![TokenKind::DecInt]);
        assert_eq!(kinds("0755"), vec![TokenKind::OctInt]);
        assert_eq!(kinds("..."), vec![TokenKind::Ellipsis]);
    }

    #[test]
    fn skips_both_comment_styles() {
        assert_eq!(kinds("a /* comment */ b"), vec![TokenKind::Identifier, TokenKind::Separator, TokenKind::Identifier]);
        assert_eq!(kinds("a // rest of line\nb"), vec![TokenKind::Identifier, TokenKind::Separator, TokenKind::Identifier]);
    }

    #[test]
    fn double_quoted_string_round_trips_spelling() {
        let mut t = tokenizer(r#""hello world""#);
        let tok = t.next().unwrap();
        assert_eq!(tok.kind, TokenKind::DoubleQuoteString);
        assert_eq!(tok.spelling, r#""hello world""#);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut t = tokenizer("\"oops\n");
        let err = t.next().unwrap_err();
        assert!(matches!(err, TokenizeError::UnterminatedString { .. }));
    }

    #[test]
    fn tracks_line_numbers_across_newlines() {
        let mut t = tokenizer("a\nb");
        let first = t.next().unwrap();
        assert_eq!(first.line, 1);
        let sep = t.next().unwrap();
        assert_eq!(sep.value, '\n');
        let second = t.next().unwrap();
        assert_eq!(second.line, 2);
        assert_eq!(second.column, 0);
    }
}
