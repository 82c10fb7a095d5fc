//! Parses `#define` and `#undef` bodies directly off the live input
//! tokenizer. Unlike the expansion engine, this never runs over an
//! in-memory [`precp_lexer::TokenCursor`] — there is nothing to
//! re-tokenize yet.

use precp_lexer::{Token, TokenKind, Tokenizer};

use crate::error::MacroError;
use crate::table::{Macro, MacroFlavor};

fn next_tok(tokenizer: &mut Tokenizer) -> Result<Token, MacroError> {
    tokenizer.next().map_err(MacroError::from)
}

/// Skips horizontal whitespace and backslash-newline continuations,
/// leaving the tokenizer positioned just before the first token that is
/// neither.
fn skip_ws_and_continuations(tokenizer: &mut Tokenizer) -> Result<(), MacroError> {
    loop {
        let before = tokenizer.position();
        let tok = next_tok(tokenizer)?;
        if tok.is_separator(' ') || tok.is_separator('\t') {
            continue;
        }
        if tok.is_lone_backslash() {
            let before_newline = tokenizer.position();
            let maybe_newline = next_tok(tokenizer)?;
            if maybe_newline.is_separator('\n') {
                continue;
            }
            let _ = before_newline;
            tokenizer.set_position(before);
            return Ok(());
        }
        tokenizer.set_position(before);
        return Ok(());
    }
}

/// Parses the `(ident, ident, ...)` parameter list of a function-like
/// macro. The opening `(` has already been consumed by the caller.
fn parse_parameter_list(tokenizer: &mut Tokenizer) -> Result<Vec<String>, MacroError> {
    let mut parameters = Vec::new();

    skip_ws_and_continuations(tokenizer)?;
    let before = tokenizer.position();
    let tok = next_tok(tokenizer)?;
    if tok.is_separator(')') {
        return Ok(parameters);
    }
    tokenizer.set_position(before);

    loop {
        skip_ws_and_continuations(tokenizer)?;
        let name_tok = next_tok(tokenizer)?;
        if name_tok.kind != TokenKind::Identifier {
            return Err(MacroError::ExpectedParameterName {
                line: name_tok.line,
                column: name_tok.column,
                spelling: name_tok.spelling,
            });
        }
        parameters.push(name_tok.spelling);

        skip_ws_and_continuations(tokenizer)?;
        let sep = next_tok(tokenizer)?;
        if sep.is_separator(')') {
            break;
        }
        if sep.is_separator(',') {
            continue;
        }
        return Err(MacroError::MalformedParameterList {
            line: sep.line,
            column: sep.column,
            spelling: sep.spelling,
        });
    }

    Ok(parameters)
}

/// Collects body tokens until an unescaped newline (or end of input),
/// normalizing whitespace to single spaces between tokens and dropping
/// `\`-`\n` continuations. `first` is an already-read token to treat as
/// the first body token, for the case where the body starts immediately
/// after the macro name with no separating whitespace.
fn collect_body(tokenizer: &mut Tokenizer, first: Option<Token>) -> Result<String, MacroError> {
    let mut body = String::new();
    let mut pending_ws = false;
    let mut pending = first;

    loop {
        let tok = match pending.take() {
            Some(tok) => tok,
            None => next_tok(tokenizer)?,
        };

        if tok.kind == TokenKind::EndOfFile {
            break;
        }
        if tok.is_separator('\n') {
            break;
        }
        if tok.is_separator(' ') || tok.is_separator('\t') {
            pending_ws = true;
            continue;
        }
        if tok.is_lone_backslash() {
            let before = tokenizer.position();
            let next = next_tok(tokenizer)?;
            if next.is_separator('\n') {
                pending_ws = false;
                continue;
            }
            tokenizer.set_position(before);
            if pending_ws && !body.is_empty() {
                body.push(' ');
            }
            pending_ws = false;
            body.push('\\');
            continue;
        }

        if pending_ws && !body.is_empty() {
            body.push(' ');
        }
        pending_ws = false;
        if tok.kind == TokenKind::Separator {
            body.push(tok.value);
        } else {
            body.push_str(&tok.spelling);
        }
    }

    Ok(body)
}

/// Parses everything after `#define` — the macro name, optional
/// parameter list, and body — returning the name and the [`Macro`] to
/// insert into the table.
pub fn parse_define(tokenizer: &mut Tokenizer) -> Result<(String, Macro), MacroError> {
    skip_ws_and_continuations(tokenizer)?;
    let name_tok = next_tok(tokenizer)?;
    if name_tok.kind != TokenKind::Identifier {
        return Err(MacroError::ExpectedMacroName {
            line: name_tok.line,
            column: name_tok.column,
            spelling: name_tok.spelling,
        });
    }
    let name = name_tok.spelling;

    let next = next_tok(tokenizer)?;

    if next.is_separator('(') {
        let parameters = parse_parameter_list(tokenizer)?;
        skip_ws_and_continuations(tokenizer)?;
        let body = collect_body(tokenizer, None)?;
        return Ok((
            name,
            Macro {
                flavor: MacroFlavor::FunctionLike,
                parameters,
                body,
            },
        ));
    }

    if next.is_separator('\n') || next.kind == TokenKind::EndOfFile {
        return Ok((
            name,
            Macro {
                flavor: MacroFlavor::ObjectLike,
                parameters: Vec::new(),
                body: String::new(),
            },
        ));
    }

    if next.is_separator(' ') || next.is_separator('\t') {
        skip_ws_and_continuations(tokenizer)?;
        let body = collect_body(tokenizer, None)?;
        return Ok((
            name,
            Macro {
                flavor: MacroFlavor::ObjectLike,
                parameters: Vec::new(),
                body,
            },
        ));
    }

    // No separating whitespace: `next` is itself the first body token.
    let body = collect_body(tokenizer, Some(next))?;
    Ok((
        name,
        Macro {
            flavor: MacroFlavor::ObjectLike,
            parameters: Vec::new(),
            body,
        },
    ))
}

/// Parses the identifier naming the macro to remove after `#undef`.
pub fn parse_undef(tokenizer: &mut Tokenizer) -> Result<String, MacroError> {
    skip_ws_and_continuations(tokenizer)?;
    let tok = next_tok(tokenizer)?;
    if tok.kind != TokenKind::Identifier {
        return Err(MacroError::ExpectedMacroName {
            line: tok.line,
            column: tok.column,
            spelling: tok.spelling,
        });
    }
    Ok(tok.spelling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use precp_lexer::TokenizerFlags;
    use std::rc::Rc;

    fn tokenizer(src: &str) -> Tokenizer {
        Tokenizer::new(Rc::from(src), "test.c", TokenizerFlags::PARSE_STRINGS)
    }

    #[test]
    fn object_like_with_no_body() {
        let mut t = tokenizer("X\n");
        let (name, macro_) = parse_define(&mut t).unwrap();
        assert_eq!(name, "X");
        assert_eq!(macro_.flavor, MacroFlavor::ObjectLike);
        assert_eq!(macro_.body, "");
    }

    #[test]
    fn object_like_with_body() {
        let mut t = tokenizer("X 42\n");
        let (name, macro_) = parse_define(&mut t).unwrap();
        assert_eq!(name, "X");
        assert_eq!(macro_.body, "42");
    }

    #[test]
    fn body_collapses_interior_whitespace_runs() {
        let mut t = tokenizer("X a    b\n");
        let (_, macro_) = parse_define(&mut t).unwrap();
        assert_eq!(macro_.body, "a b");
    }

    #[test]
    fn function_like_zero_arity() {
        let mut t = tokenizer("F() 1\n");
        let (_, macro_) = parse_define(&mut t).unwrap();
        assert_eq!(macro_.flavor, MacroFlavor::FunctionLike);
        assert!(macro_.parameters.is_empty());
        assert_eq!(macro_.body, "1");
    }

    #[test]
    fn function_like_with_parameters() {
        let mut t = tokenizer("ADD(a, b) a+b\n");
        let (name, macro_) = parse_define(&mut t).unwrap();
        assert_eq!(name, "ADD");
        assert_eq!(macro_.parameters, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(macro_.body, "a+b");
    }

    #[test]
    fn line_continuation_is_dropped_from_body() {
        let mut t = tokenizer("X a \\\nb\n");
        let (_, macro_) = parse_define(&mut t).unwrap();
        assert_eq!(macro_.body, "ab");
    }

    #[test]
    fn undef_reads_the_target_identifier() {
        let mut t = tokenizer(" X\n");
        let name = parse_undef(&mut t).unwrap();
        assert_eq!(name, "X");
    }

    #[test]
    fn non_identifier_macro_name_is_an_error() {
        let mut t = tokenizer("1\n");
        let err = parse_define(&mut t).unwrap_err();
        assert!(matches!(err, MacroError::ExpectedMacroName { .. }));
    }
}
