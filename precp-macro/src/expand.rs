//! The two-pass macro expansion engine.
//!
//! Pass A re-tokenizes a macro's stored body text and substitutes
//! parameters, stringizes (`#`), and concatenates (`##`), producing a
//! fresh "contents with arguments expanded" (CWAE) text buffer. Pass B
//! re-tokenizes *that* buffer and recursively expands whatever nested
//! macro calls the substitution created. Re-tokenizing CWAE rather than
//! splicing already-classified tokens is what makes `##` work: gluing
//! `foo` and `bar` with no separator between them only becomes the
//! single identifier `foobar` once the scanner sees it as raw
//! characters again.

use std::rc::Rc;

use precp_lexer::{
    Token, TokenCursor, TokenKind, TokenSource, Tokenizer, TokenizeError, TokenizerFlags,
    TokenizerSource,
};
use tracing::trace;

use crate::error::MacroError;
use crate::table::{Macro, MacroFlavor, MacroTable};

pub const MAX_RECURSION: u32 = 32;

fn raw_text_of(tokens: &[Token]) -> String {
    let mut s = String::new();
    for tok in tokens {
        if tok.kind == TokenKind::Separator {
            s.push(tok.value);
        } else {
            s.push_str(&tok.spelling);
        }
    }
    s
}

fn skip_space_atoms(atoms: &[Token], mut i: usize) -> usize {
    while i < atoms.len() && atoms[i].is_separator(' ') {
        i += 1;
    }
    i
}

fn token_text(tok: &Token) -> String {
    if tok.kind == TokenKind::Separator {
        tok.value.to_string()
    } else {
        tok.spelling.clone()
    }
}

/// Pass A: substitutes parameters and handles `#`/`##` over the macro's
/// re-tokenized body, producing CWAE as plain text.
fn pass_a(macro_: &Macro, args: &[Vec<Token>]) -> Result<String, MacroError> {
    let body_src: Rc<str> = Rc::from(macro_.body.as_str());
    let mut body_tokenizer = Tokenizer::new(body_src, "<macro>", TokenizerFlags::PARSE_STRINGS);
    let mut atoms = Vec::new();
    loop {
        let tok = body_tokenizer.next()?;
        if tok.kind == TokenKind::EndOfFile {
            break;
        }
        atoms.push(tok);
    }

    let mut out = String::new();
    let mut i = 0;
    while i < atoms.len() {
        let tok = atoms[i].clone();

        if tok.is_separator(' ') {
            out.push(' ');
            i += 1;
            continue;
        }

        if tok.is_separator('#') {
            let after_first = skip_space_atoms(&atoms, i + 1);
            let is_concat = atoms.get(after_first).map_or(false, |t| t.is_separator('#'));

            if is_concat {
                if out.trim_end_matches(' ').is_empty() {
                    return Err(MacroError::DanglingConcatenation {
                        line: tok.line,
                        column: tok.column,
                        spelling: tok.spelling,
                    });
                }
                let after_second = skip_space_atoms(&atoms, after_first + 1);
                if after_second >= atoms.len() {
                    return Err(MacroError::DanglingConcatenation {
                        line: tok.line,
                        column: tok.column,
                        spelling: tok.spelling,
                    });
                }
                if atoms[after_second].is_separator('#') {
                    let third = &atoms[after_second];
                    return Err(MacroError::TooManyHashes {
                        line: third.line,
                        column: third.column,
                        spelling: third.spelling.clone(),
                    });
                }

                while out.ends_with(' ') {
                    out.pop();
                }
                let right = &atoms[after_second];
                let right_text = if right.kind == TokenKind::Identifier {
                    match macro_.parameter_index(&right.spelling) {
                        Some(idx) => raw_text_of(&args[idx]),
                        None => token_text(right),
                    }
                } else {
                    token_text(right)
                };
                out.push_str(&right_text);
                i = after_second + 1;
                continue;
            }

            let param = atoms
                .get(after_first)
                .filter(|t| t.kind == TokenKind::Identifier)
                .and_then(|t| macro_.parameter_index(&t.spelling));
            let idx = match param {
                Some(idx) => idx,
                None => {
                    return Err(MacroError::StringizeNotParameter {
                        line: tok.line,
                        column: tok.column,
                        spelling: tok.spelling,
                    })
                }
            };
            out.push('"');
            out.push_str(&raw_text_of(&args[idx]));
            out.push('"');
            i = after_first + 1;
            continue;
        }

        if tok.kind == TokenKind::Identifier {
            if let Some(idx) = macro_.parameter_index(&tok.spelling) {
                out.push_str(&raw_text_of(&args[idx]));
                i += 1;
                continue;
            }
        }

        out.push_str(&token_text(&tok));
        i += 1;
    }

    Ok(out)
}

/// Pass B: re-tokenizes CWAE text and recursively expands every
/// identifier that names a macro, innermost call first by construction
/// (each `expand` call fully resolves before its output is appended).
fn run_pass_b(table: &MacroTable, cwae_text: &str, rec_level: u32) -> Result<String, MacroError> {
    let src: Rc<str> = Rc::from(cwae_text);
    let mut tokenizer = Tokenizer::new(src, "<macro>", TokenizerFlags::PARSE_STRINGS);
    let mut tokens = Vec::new();
    loop {
        let tok = tokenizer.next()?;
        if tok.kind == TokenKind::EndOfFile {
            break;
        }
        tokens.push(tok);
    }

    let mut cursor = TokenCursor::new(&tokens);
    let mut out = String::new();
    loop {
        let tok = cursor.next();
        if tok.kind == TokenKind::EndOfFile {
            break;
        }
        if tok.kind == TokenKind::Identifier {
            out.push_str(&expand(&mut cursor, table, &tok, rec_level + 1)?);
        } else {
            out.push_str(&token_text(&tok));
        }
    }
    Ok(out)
}

fn skip_hspace<S: TokenSource>(source: &mut S) {
    loop {
        let pos = source.position();
        let tok = source.next();
        if tok.is_separator(' ') || tok.is_separator('\t') {
            continue;
        }
        source.set_position(pos);
        return;
    }
}

/// Reads a function-like macro's argument list (the opening `(` through
/// its matching `)`) off `source`, splitting on top-level commas.
/// `arity` is the macro's declared parameter count; a zero-arity macro
/// accepts only a completely empty argument list (`F()`), not one empty
/// argument.
fn collect_arguments<S: TokenSource>(
    source: &mut S,
    arity: usize,
    name_token: &Token,
) -> Result<Vec<Vec<Token>>, MacroError> {
    skip_hspace(source);
    let open = source.next();
    if !open.is_separator('(') {
        return Err(MacroError::ExpectedOpenParen {
            line: open.line,
            column: open.column,
            spelling: open.spelling,
        });
    }
    skip_hspace(source);

    let mut groups: Vec<Vec<Token>> = vec![Vec::new()];
    let mut depth = 0i32;

    loop {
        let tok = source.next();
        if tok.kind == TokenKind::EndOfFile {
            return Err(MacroError::TooFewArguments {
                line: tok.line,
                column: tok.column,
                spelling: tok.spelling,
            });
        }
        if depth == 0 && tok.is_separator(',') {
            groups.push(Vec::new());
            skip_hspace(source);
            continue;
        }
        if tok.is_separator('(') {
            depth += 1;
        } else if tok.is_separator(')') {
            if depth == 0 {
                break;
            }
            depth -= 1;
        }
        groups.last_mut().expect("always at least one group").push(tok);
    }

    let groups = if arity == 0 && groups.len() == 1 && groups[0].is_empty() {
        Vec::new()
    } else {
        groups
    };

    if groups.len() < arity {
        return Err(MacroError::TooFewArguments {
            line: name_token.line,
            column: name_token.column,
            spelling: name_token.spelling.clone(),
        });
    }
    if groups.len() > arity {
        return Err(MacroError::TooManyArguments {
            line: name_token.line,
            column: name_token.column,
            spelling: name_token.spelling.clone(),
        });
    }

    Ok(groups)
}

/// Expands the macro named by `name_token` (already consumed from
/// `source`), writing the fully-expanded replacement text. Returns the
/// identifier verbatim if it does not name a macro.
pub fn expand<S: TokenSource>(
    source: &mut S,
    table: &MacroTable,
    name_token: &Token,
    rec_level: u32,
) -> Result<String, MacroError> {
    let macro_ = match table.get(&name_token.spelling) {
        Some(m) => m,
        None => return Ok(name_token.spelling.clone()),
    };

    if rec_level > MAX_RECURSION {
        return Err(MacroError::MaxRecursionReached {
            line: name_token.line,
            column: name_token.column,
            spelling: name_token.spelling.clone(),
        });
    }

    trace!(macro_name = %name_token.spelling, rec_level, "expanding macro invocation");

    let args = if macro_.flavor == MacroFlavor::FunctionLike {
        collect_arguments(source, macro_.arity(), name_token)?
    } else {
        Vec::new()
    };

    let cwae_text = pass_a(macro_, &args)?;
    run_pass_b(table, &cwae_text, rec_level)
}

/// Convenience entry point for the top-level driver: wraps a live
/// tokenizer as a [`TokenSource`], funneling any lexical failure while
/// reading the argument list into a [`MacroError`].
pub fn expand_from_tokenizer(
    tokenizer: &mut Tokenizer,
    table: &MacroTable,
    name_token: &Token,
) -> Result<String, MacroError> {
    let mut errors: Vec<TokenizeError> = Vec::new();
    let mut on_error = |e| errors.push(e);
    let result = {
        let mut source = TokenizerSource::new(tokenizer, &mut on_error);
        expand(&mut source, table, name_token, 0)
    };
    if let Some(err) = errors.into_iter().next() {
        return Err(MacroError::from(err));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define::parse_define;
    use crate::table::MacroTable;

    fn define(table: &mut MacroTable, src: &str) {
        let mut t = Tokenizer::new(Rc::from(src), "test.c", TokenizerFlags::PARSE_STRINGS);
        let (name, macro_) = parse_define(&mut t).unwrap();
        table.define(name, macro_);
    }

    fn expand_invocation(table: &MacroTable, src: &str, name: &str) -> String {
        let mut t = Tokenizer::new(Rc::from(src), "test.c", TokenizerFlags::PARSE_STRINGS);
        let name_token = Token {
            kind: TokenKind::Identifier,
            line: 1,
            column: 0,
            spelling: name.to_string(),
            value: '\0',
        };
        expand_from_tokenizer(&mut t, table, &name_token).unwrap()
    }

    #[test]
    fn object_like_expands_to_its_body() {
        let mut table = MacroTable::new();
        define(&mut table, "X 42\n");
        assert_eq!(expand_invocation(&table, "\n", "X"), "42");
    }

    #[test]
    fn function_like_substitutes_arguments() {
        let mut table = MacroTable::new();
        define(&mut table, "ADD(a,b) a+b\n");
        assert_eq!(expand_invocation(&table, "(1,2)\n", "ADD"), "1+2");
    }

    #[test]
    fn stringize_wraps_argument_text_in_quotes() {
        let mut table = MacroTable::new();
        define(&mut table, "STR(x) #x\n");
        assert_eq!(expand_invocation(&table, "(hello)\n", "STR"), "\"hello\"");
    }

    #[test]
    fn concatenation_glues_adjacent_tokens() {
        let mut table = MacroTable::new();
        define(&mut table, "CAT(a,b) a##b\n");
        assert_eq!(expand_invocation(&table, "(foo,bar)\n", "CAT"), "foobar");
    }

    #[test]
    fn nested_object_like_macros_expand_through_pass_b() {
        let mut table = MacroTable::new();
        define(&mut table, "A B\n");
        define(&mut table, "B C\n");
        assert_eq!(expand_invocation(&table, "\n", "A"), "C");
    }

    #[test]
    fn undefined_identifier_is_returned_verbatim() {
        let table = MacroTable::new();
        assert_eq!(expand_invocation(&table, "\n", "UNDEFINED"), "UNDEFINED");
    }

    #[test]
    fn wrong_argument_count_is_an_error() {
        let mut table = MacroTable::new();
        define(&mut table, "ADD(a,b) a+b\n");
        let mut t = Tokenizer::new(Rc::from("(1)\n"), "test.c", TokenizerFlags::PARSE_STRINGS);
        let name_token = Token {
            kind: TokenKind::Identifier,
            line: 1,
            column: 0,
            spelling: "ADD".into(),
            value: '\0',
        };
        let err = expand_from_tokenizer(&mut t, &table, &name_token).unwrap_err();
        assert!(matches!(err, MacroError::TooFewArguments { .. }));
    }

    #[test]
    fn zero_arity_function_like_requires_empty_parens() {
        let mut table = MacroTable::new();
        define(&mut table, "F() 1\n");
        assert_eq!(expand_invocation(&table, "()\n", "F"), "1");
    }

    #[test]
    fn direct_self_recursion_hits_the_recursion_cap() {
        let mut table = MacroTable::new();
        define(&mut table, "LOOP LOOP\n");
        let mut t = Tokenizer::new(Rc::from("\n"), "test.c", TokenizerFlags::PARSE_STRINGS);
        let name_token = Token {
            kind: TokenKind::Identifier,
            line: 1,
            column: 0,
            spelling: "LOOP".into(),
            value: '\0',
        };
        let err = expand_from_tokenizer(&mut t, &table, &name_token).unwrap_err();
        assert!(matches!(err, MacroError::MaxRecursionReached { .. }));
    }
}
