//! Character buffer and tokenizer: turns raw source text into the token
//! stream the macro expander and directive driver consume.

pub mod buffer;
pub mod token;
pub mod tokenizer;
pub mod token_source;

pub use buffer::{CharBuffer, MAX_UNGETC};
pub use token::{Token, TokenKind};
pub use tokenizer::{
    CommentMarkers, Tokenizer, TokenizeError, TokenizerFlags, TokenizerPosition, MAX_TOK_LEN,
};
pub use token_source::{TokenCursor, TokenSource, TokenizerSource};
