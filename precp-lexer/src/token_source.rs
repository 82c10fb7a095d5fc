//! A small abstraction over "something that produces tokens", so the
//! macro expander can read a function-like macro's argument list from
//! either the live input file or an already-tokenized macro body
//! without caring which (`next` / `peek` / `position` / `set_position`).

use crate::token::{Token, TokenKind};
use crate::tokenizer::{Tokenizer, TokenizerPosition};

pub trait TokenSource {
    type Position: Copy;

    /// Always produces a token. Tokenizer-level failures are reported to
    /// the sink the source was constructed with and surface as a
    /// [`TokenKind::Unknown`] or [`TokenKind::Overflow`] token, exactly
    /// the same kinds a real lexical failure would otherwise produce, so
    /// [`Self::failed`] is how callers notice something went wrong.
    fn next(&mut self) -> Token;

    fn position(&self) -> Self::Position;
    fn set_position(&mut self, position: Self::Position);

    fn peek(&mut self) -> Token {
        let position = self.position();
        let token = self.next();
        self.set_position(position);
        token
    }

    /// Whether a tokenizer-level error has been observed since this
    /// source was created.
    fn failed(&self) -> bool {
        false
    }
}

/// Adapts a live [`Tokenizer`] reading from the real input (a source
/// file, or the remainder of a line after a macro invocation) to
/// [`TokenSource`], funneling lexical errors through a diagnostic
/// callback instead of `Result`.
pub struct TokenizerSource<'a> {
    tokenizer: &'a mut Tokenizer,
    on_error: &'a mut dyn FnMut(crate::tokenizer::TokenizeError),
    failed: bool,
}

impl<'a> TokenizerSource<'a> {
    pub fn new(
        tokenizer: &'a mut Tokenizer,
        on_error: &'a mut dyn FnMut(crate::tokenizer::TokenizeError),
    ) -> Self {
        Self {
            tokenizer,
            on_error,
            failed: false,
        }
    }
}

impl<'a> TokenSource for TokenizerSource<'a> {
    type Position = TokenizerPosition;

    fn next(&mut self) -> Token {
        match self.tokenizer.next() {
            Ok(token) => token,
            Err(error) => {
                self.failed = true;
                let line = error.line();
                let column = error.column();
                let spelling = error.spelling().to_string();
                let kind = match &error {
                    crate::tokenizer::TokenizeError::Overflow { .. } => TokenKind::Overflow,
                    crate::tokenizer::TokenizeError::UnterminatedString { .. } => {
                        TokenKind::Unknown
                    }
                };
                (self.on_error)(error);
                Token {
                    kind,
                    line,
                    column,
                    spelling,
                    value: '\0',
                }
            }
        }
    }

    fn position(&self) -> Self::Position {
        self.tokenizer.position()
    }

    fn set_position(&mut self, position: Self::Position) {
        self.tokenizer.set_position(position);
    }

    fn failed(&self) -> bool {
        self.failed
    }
}

/// A [`TokenSource`] over an already-materialized token list, used to
/// re-scan a macro's contents-with-arguments-expanded buffer for nested
/// macro calls without re-running the character-level tokenizer.
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, index: 0 }
    }
}

impl<'a> TokenSource for TokenCursor<'a> {
    type Position = usize;

    fn next(&mut self) -> Token {
        match self.tokens.get(self.index) {
            Some(token) => {
                self.index += 1;
                token.clone()
            }
            None => {
                let (line, column) = self
                    .tokens
                    .last()
                    .map(|t| (t.line, t.column))
                    .unwrap_or((0, 0));
                Token::eof(line, column)
            }
        }
    }

    fn position(&self) -> Self::Position {
        self.index
    }

    fn set_position(&mut self, position: Self::Position) {
        self.index = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerFlags;
    use std::rc::Rc;

    #[test]
    fn tokenizer_source_peek_does_not_advance() {
        let mut tokenizer = Tokenizer::new(Rc::from("a b"), "test.c", TokenizerFlags::PARSE_STRINGS);
        let mut errors = Vec::new();
        let mut on_error = |e| errors.push(e);
        let mut source = TokenizerSource::new(&mut tokenizer, &mut on_error);
        let peeked = source.peek();
        assert_eq!(peeked.spelling, "a");
        let first = source.next();
        assert_eq!(first.spelling, "a");
        assert!(errors.is_empty());
    }

    #[test]
    fn token_cursor_runs_off_the_end_into_eof() {
        let tokens = vec![Token {
            kind: TokenKind::Identifier,
            line: 1,
            column: 0,
            spelling: "a".into(),
            value: '\0',
        }];
        let mut cursor = TokenCursor::new(&tokens);
        assert_eq!(cursor.next().kind, TokenKind::Identifier);
        assert_eq!(cursor.next().kind, TokenKind::EndOfFile);
        assert_eq!(cursor.next().kind, TokenKind::EndOfFile);
    }
}
