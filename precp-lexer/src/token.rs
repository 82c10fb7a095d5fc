use std::fmt;

/// The full set of lexical categories this tokenizer can produce. Unlike a
/// general-purpose language lexer, there is no separate token per operator
/// or punctuator — anything that isn't an identifier, literal, or ellipsis
/// falls into [`TokenKind::Separator`], carrying the raw character in
/// [`Token::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    SingleQuoteString,
    DoubleQuoteString,
    Ellipsis,
    HexInt,
    OctInt,
    DecInt,
    Separator,
    Unknown,
    Overflow,
    EndOfFile,
}

impl TokenKind {
    /// Human-readable name, for diagnostics and the `main.c`-style dump
    /// mode; mirrors `tokentype_to_str`.
    pub fn pretty_name(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::SingleQuoteString => "single-quoted string",
            TokenKind::DoubleQuoteString => "double-quoted string",
            TokenKind::Ellipsis => "ellipsis",
            TokenKind::HexInt => "hex int",
            TokenKind::OctInt => "oct int",
            TokenKind::DecInt => "dec int",
            TokenKind::Separator => "separator",
            TokenKind::Unknown => "unknown",
            TokenKind::Overflow => "overflow",
            TokenKind::EndOfFile => "eof",
        }
    }

    pub fn is_int_literal(self) -> bool {
        matches!(self, TokenKind::HexInt | TokenKind::OctInt | TokenKind::DecInt)
    }
}

/// A single lexical token. `spelling` owns its text outright rather than
/// borrowing from a shared scratch buffer that's only valid until the
/// next token is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
    pub spelling: String,
    /// For [`TokenKind::Separator`], the single character that was
    /// matched (including `'\n'`). Unused for every other kind.
    pub value: char,
}

impl Token {
    pub fn eof(line: u32, column: u32) -> Self {
        Self {
            kind: TokenKind::EndOfFile,
            line,
            column,
            spelling: String::new(),
            value: '\0',
        }
    }

    pub fn is_separator(&self, c: char) -> bool {
        self.kind == TokenKind::Separator && self.value == c
    }

    /// Whether this token is a standalone `\`. Backslash isn't in the
    /// separator set, so a lone one comes back as `TokenKind::Unknown`
    /// rather than `TokenKind::Separator`; callers looking for a
    /// line-continuation marker need this instead of `is_separator('\\')`.
    pub fn is_lone_backslash(&self) -> bool {
        self.kind == TokenKind::Unknown && self.spelling == "\\"
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TokenKind::Separator {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}", self.spelling)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(spelling: &str) -> Token {
        Token {
            kind: TokenKind::Unknown,
            line: 1,
            column: 1,
            spelling: spelling.to_string(),
            value: '\0',
        }
    }

    #[test]
    fn lone_backslash_is_recognized_as_unknown() {
        assert!(unknown("\\").is_lone_backslash());
        assert!(!unknown("\\\\").is_lone_backslash());
        assert!(!unknown("x").is_lone_backslash());
    }

    #[test]
    fn is_separator_never_matches_a_lone_backslash() {
        let tok = unknown("\\");
        assert!(!tok.is_separator('\\'));
    }
}
