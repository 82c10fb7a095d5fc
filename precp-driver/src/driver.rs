//! The top-level directive driver: reads a file's tokens one at a time,
//! recognizes `#`-directives at the start of a logical line, and writes
//! everything else through, expanding macro invocations as it goes.
//!
//! This is the one place all the other crates meet: the tokenizer feeds
//! it tokens, `precp_macro` expands identifiers and parses `#define`/
//! `#undef`, and [`crate::conditional::ConditionalStack`] decides what
//! gets suppressed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use precp_foundation::diagnostics::{Diagnostic, DiagnosticSink};
use precp_foundation::source::SourceText;
use precp_lexer::{CommentMarkers, Token, TokenKind, Tokenizer, TokenizerFlags};
use precp_macro::{expand_from_tokenizer, parse_define, parse_undef, MacroTable};
use tracing::{debug, trace};

use crate::conditional::ConditionalStack;
use crate::error::DriverError;
use crate::include::{parse_include_filename, IncludeResolver};

const DIRECTIVES: &[&str] = &[
    "include", "error", "warning", "define", "undef", "if", "elif", "else", "ifdef", "endif",
];

/// What a directive line asks the caller to do next.
enum Outcome {
    Continue,
    /// An unrecognized directive name: stop reading this file,
    /// successfully, rather than treating it as an error.
    Stop,
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

/// Reads raw text up to (but not consuming) the next unescaped newline
/// or end of input. Used for `#error`/`#warning` message text, which is
/// never macro-expanded.
fn read_line_text(tokenizer: &mut Tokenizer) -> Result<(String, u32, u32), DriverError> {
    skip_hspace(tokenizer)?;
    let start_line = tokenizer.line();
    let start_column = tokenizer.column();
    let mut text = String::new();
    loop {
        let pos = tokenizer.position();
        let tok = tokenizer.next().map_err(DriverError::from)?;
        if tok.is_separator('\n') || tok.kind == TokenKind::EndOfFile {
            tokenizer.set_position(pos);
            break;
        }
        if tok.kind == TokenKind::Separator {
            text.push(tok.value);
        } else {
            text.push_str(&tok.spelling);
        }
    }
    Ok((text, start_line, start_column))
}

/// The `do_eval` stub: the first decimal-integer literal appearing in
/// `text` is the condition's value; absence of one yields 0. Full
/// expression evaluation (`&&`, comparisons, parentheses, ...) is
/// explicitly out of scope.
fn do_eval(text: &str) -> i64 {
    let mut tokenizer = Tokenizer::new(Rc::from(text), "<if>", TokenizerFlags::empty());
    loop {
        let tok = match tokenizer.next() {
            Ok(tok) => tok,
            Err(_) => return 0,
        };
        if tok.kind == TokenKind::EndOfFile {
            return 0;
        }
        if tok.kind == TokenKind::DecInt {
            let digits: String = tok.spelling.chars().take_while(|c| c.is_ascii_digit()).collect();
            return digits.parse().unwrap_or(0);
        }
    }
}

/// Reads and macro-expands the condition text following `#if`/`#elif`,
/// then runs [`do_eval`] over the expanded text. A whitespace character
/// must directly follow the keyword — `#if <expr>` / `#elif <expr>` is a
/// strict grammar, not `#ifFOO`.
fn evaluate_condition(tokenizer: &mut Tokenizer, table: &mut MacroTable) -> Result<i64, DriverError> {
    let first = tokenizer.next().map_err(DriverError::from)?;
    if !(first.is_separator(' ') || first.is_separator('\t')) {
        return Err(DriverError::ExpectedSpaceAfterConditionKeyword {
            line: first.line,
            column: first.column,
            spelling: first.spelling,
        });
    }
    skip_hspace(tokenizer)?;

    let start_line = tokenizer.line();
    let start_column = tokenizer.column();
    let mut text = String::new();

    loop {
        let tok = tokenizer.next().map_err(DriverError::from)?;
        if tok.kind == TokenKind::EndOfFile {
            break;
        }
        if tok.is_lone_backslash() {
            let pos = tokenizer.position();
            let next = tokenizer.next().map_err(DriverError::from)?;
            if next.is_separator('\n') {
                continue;
            }
            tokenizer.set_position(pos);
            text.push('\\');
            continue;
        }
        if tok.is_separator('\n') {
            break;
        }
        if tok.kind == TokenKind::Identifier {
            let expanded = expand_from_tokenizer(tokenizer, table, &tok)?;
            text.push_str(&expanded);
        } else if tok.kind == TokenKind::Separator {
            text.push(tok.value);
        } else {
            text.push_str(&tok.spelling);
        }
    }

    if text.trim().is_empty() {
        return Err(DriverError::EmptyCondition {
            line: start_line,
            column: start_column,
            spelling: text,
        });
    }

    Ok(do_eval(&text))
}

fn include_directive(
    tokenizer: &mut Tokenizer,
    includer_dir: Option<&Path>,
    table: &mut MacroTable,
    diagnostics: &mut dyn DiagnosticSink,
    resolver: &dyn IncludeResolver,
    out: &mut dyn Write,
) -> Result<(), DriverError> {
    let (name, quoted) = parse_include_filename(tokenizer)?;
    let line = tokenizer.line();
    let column = tokenizer.column();
    let candidates = resolver.candidates(&name, quoted, includer_dir);

    let mut last_error = None;
    for candidate in &candidates {
        match std::fs::read_to_string(candidate) {
            Ok(contents) => {
                let source = SourceText::from_file(
                    candidate.display().to_string(),
                    candidate.clone(),
                    contents,
                );
                return parse_file_inner(source, table, diagnostics, resolver, out);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(DriverError::CannotOpenInclude {
        line,
        column,
        path: candidates
            .into_iter()
            .next()
            .unwrap_or_else(|| PathBuf::from(&name)),
        source: last_error
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no -I search path given")),
    })
}

fn handle_directive(
    tokenizer: &mut Tokenizer,
    includer_dir: Option<&Path>,
    conditional: &mut ConditionalStack,
    table: &mut MacroTable,
    diagnostics: &mut dyn DiagnosticSink,
    resolver: &dyn IncludeResolver,
    out: &mut dyn Write,
) -> Result<Outcome, DriverError> {
    skip_hspace(tokenizer)?;
    let name_tok = tokenizer.next().map_err(DriverError::from)?;
    if name_tok.kind != TokenKind::Identifier
        || !DIRECTIVES.contains(&name_tok.spelling.as_str())
    {
        // Unrecognized directive: stop reading this file, successfully,
        // without a diagnostic.
        return Ok(Outcome::Stop);
    }
    let directive = name_tok.spelling.as_str();
    let skip = conditional.skip_conditional_block();
    trace!(directive, skip, "dispatching directive");

    if skip && matches!(directive, "include" | "error" | "warning" | "define" | "undef") {
        return Ok(Outcome::Continue);
    }

    match directive {
        "include" => {
            include_directive(tokenizer, includer_dir, table, diagnostics, resolver, out)?;
            consume_rest_of_line(tokenizer)?;
        }

        "error" => {
            let (message, line, column) = read_line_text(tokenizer)?;
            diagnostics.emit(Diagnostic::error(tokenizer.filename(), line, column, message.clone(), message.clone()));
            return Err(DriverError::UserError {
                line,
                column,
                spelling: message.clone(),
                message,
            });
        }

        "warning" => {
            let (message, line, column) = read_line_text(tokenizer)?;
            diagnostics.emit(Diagnostic::warning(tokenizer.filename(), line, column, message.clone(), message));
            consume_rest_of_line(tokenizer)?;
        }

        "define" => {
            let (name, macro_) = parse_define(tokenizer)?;
            if table.is_defined(&name) {
                diagnostics.emit(Diagnostic::warning(
                    tokenizer.filename(),
                    name_tok.line,
                    name_tok.column,
                    name.clone(),
                    format!("redefinition of macro '{name}'"),
                ));
            }
            table.define(name, macro_);
        }

        "undef" => {
            let name = parse_undef(tokenizer)?;
            table.undef(&name);
            consume_rest_of_line(tokenizer)?;
        }

        "if" => {
            let parent_active = conditional.all_levels_active();
            let value = if parent_active {
                evaluate_condition(tokenizer, table)?
            } else {
                consume_rest_of_line(tokenizer)?;
                0
            };
            conditional.enter(value != 0);
        }

        "ifdef" => {
            skip_hspace(tokenizer)?;
            let tok = tokenizer.next().map_err(DriverError::from)?;
            if tok.kind != TokenKind::Identifier {
                return Err(DriverError::ExpectedUndefName {
                    line: tok.line,
                    column: tok.column,
                    spelling: tok.spelling,
                });
            }
            let defined = conditional.all_levels_active() && table.is_defined(&tok.spelling);
            conditional.enter(defined);
            consume_rest_of_line(tokenizer)?;
        }

        "elif" => {
            if conditional.should_evaluate_branch() {
                let value = evaluate_condition(tokenizer, table)?;
                conditional.branch(value != 0);
            } else {
                consume_rest_of_line(tokenizer)?;
                conditional.branch(false);
            }
        }

        "else" => {
            conditional.branch(true);
            consume_rest_of_line(tokenizer)?;
        }

        "endif" => {
            conditional.exit();
            consume_rest_of_line(tokenizer)?;
        }

        _ => unreachable!("name validated against DIRECTIVES above"),
    }

    Ok(Outcome::Continue)
}

fn consume_leading_hspace(tokenizer: &mut Tokenizer, first: Token) -> Result<(Token, bool), DriverError> {
    let mut tok = first;
    let mut ate_any = false;
    while tok.is_separator(' ') || tok.is_separator('\t') {
        ate_any = true;
        tok = tokenizer.next().map_err(DriverError::from)?;
    }
    Ok((tok, ate_any))
}

fn skip_remaining_hspace(tokenizer: &mut Tokenizer) -> Result<(), DriverError> {
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

/// Discards whatever is left on the current line, including the
/// terminating newline itself. A directive line never contributes
/// output of its own — `#define` and `#if`/`#elif` already consume
/// their trailing newline as part of parsing the body/condition, but
/// `#undef`, `#ifdef`, `#else`, `#endif`, `#include`, and `#warning`
/// stop right after their last meaningful token, so the driver does
/// this uniformly for them rather than letting stray trailing text (or
/// just the bare newline) fall through to the ordinary-text path and
/// be echoed as an extra blank line.
fn consume_rest_of_line(tokenizer: &mut Tokenizer) -> Result<(), DriverError> {
    loop {
        let tok = tokenizer.next().map_err(DriverError::from)?;
        if tok.kind == TokenKind::EndOfFile || tok.is_separator('\n') {
            return Ok(());
        }
    }
}

/// Processes one file (the top level, or the target of an `#include`),
/// writing its expanded contents to `out`. `table` is threaded by
/// `&mut` through every recursive call so macro state survives across
/// includes; `conditional`'s frame, by contrast, is local to this file
/// — an unterminated `#if` is required to have unwound by the time the
/// file ends.
fn parse_file_inner(
    source: SourceText,
    table: &mut MacroTable,
    diagnostics: &mut dyn DiagnosticSink,
    resolver: &dyn IncludeResolver,
    out: &mut dyn Write,
) -> Result<(), DriverError> {
    debug!(file = %source.name, "preprocessing file");
    let includer_dir = source
        .path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);
    let mut tokenizer = Tokenizer::new(source.contents.clone(), source.name.clone(), TokenizerFlags::PARSE_STRINGS);
    tokenizer.set_markers(CommentMarkers {
        multiline_start: Some("/*".into()),
        multiline_end: Some("*/".into()),
        single_line_start: Some("//".into()),
    });

    let mut conditional = ConditionalStack::new();

    loop {
        let first = tokenizer.next().map_err(DriverError::from)?;
        if first.kind == TokenKind::EndOfFile {
            break;
        }

        let at_line_start = first.column == 0;
        let (tok, had_leading_ws) = if at_line_start {
            consume_leading_hspace(&mut tokenizer, first)?
        } else {
            (first, false)
        };

        if tok.kind == TokenKind::EndOfFile {
            break;
        }

        if conditional.skip_conditional_block() && !tok.is_separator('#') {
            continue;
        }

        if tok.is_separator('#') {
            if !at_line_start {
                return Err(DriverError::StrayHash {
                    line: tok.line,
                    column: tok.column,
                    spelling: tok.spelling,
                });
            }
            match handle_directive(
                &mut tokenizer,
                includer_dir.as_deref(),
                &mut conditional,
                table,
                diagnostics,
                resolver,
                out,
            )? {
                Outcome::Continue => continue,
                Outcome::Stop => break,
            }
        }

        if had_leading_ws {
            write!(out, " ").map_err(DriverError::from)?;
        }

        if tok.is_separator(' ') || tok.is_separator('\t') {
            write!(out, " ").map_err(DriverError::from)?;
            skip_remaining_hspace(&mut tokenizer)?;
            continue;
        }

        match tok.kind {
            TokenKind::Identifier => {
                let expanded = expand_from_tokenizer(&mut tokenizer, table, &tok)?;
                write!(out, "{expanded}").map_err(DriverError::from)?;
            }
            TokenKind::Separator => write!(out, "{}", tok.value).map_err(DriverError::from)?,
            _ => write!(out, "{}", tok.spelling).map_err(DriverError::from)?,
        }
    }

    if !conditional.is_balanced() {
        return Err(DriverError::UnterminatedConditional {
            line: tokenizer.line(),
            column: tokenizer.column(),
            spelling: String::new(),
        });
    }

    Ok(())
}

/// Owns the [`MacroTable`] across a whole preprocessing run — it
/// outlives any single file, since `#include` recurses back into
/// `parse_file` while sharing the same table.
pub struct Session<'a> {
    pub table: MacroTable,
    resolver: &'a dyn IncludeResolver,
}

impl<'a> Session<'a> {
    pub fn new(resolver: &'a dyn IncludeResolver) -> Self {
        Self {
            table: MacroTable::new(),
            resolver,
        }
    }

    /// Processes one file, writing its expanded output to `out`.
    pub fn parse_file(
        &mut self,
        source: SourceText,
        diagnostics: &mut dyn DiagnosticSink,
        out: &mut dyn Write,
    ) -> Result<(), DriverError> {
        parse_file_inner(source, &mut self.table, diagnostics, self.resolver, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::SearchPathResolver;
    use precp_macro::{Macro, MacroFlavor};

    fn run(resolver: &dyn IncludeResolver, table: &mut MacroTable, src: &str) -> Result<String, DriverError> {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut out = Vec::new();
        let source = SourceText::new("test.c", src);
        parse_file_inner(source, table, &mut diagnostics, resolver, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn plain_text_passes_through_untouched() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let out = run(&resolver, &mut table, "hello world\n").unwrap();
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn define_then_use_expands_the_macro() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let out = run(&resolver, &mut table, "#define FOO 42\nFOO\n").unwrap();
        assert_eq!(out, "42\n");
    }

    #[test]
    fn undef_removes_the_macro() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let out = run(&resolver, &mut table, "#define FOO 42\n#undef FOO\nFOO\n").unwrap();
        assert_eq!(out, "FOO\n");
    }

    #[test]
    fn disabled_if_block_is_skipped_entirely() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        table.define(
            "ZERO".to_string(),
            Macro {
                flavor: MacroFlavor::ObjectLike,
                parameters: Vec::new(),
                body: "0".to_string(),
            },
        );
        let out = run(
            &resolver,
            &mut table,
            "#if ZERO\n#define HIDDEN 1\nskip me\n#else\nkept\n#endif\n",
        )
        .unwrap();
        assert_eq!(out, "kept\n");
        assert!(!table.is_defined("HIDDEN"));
    }

    #[test]
    fn if_zero_else_takes_the_else_branch() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let out = run(&resolver, &mut table, "#if 0\nX\n#else\nY\n#endif\n").unwrap();
        assert_eq!(out, "Y\n");
    }

    #[test]
    fn elif_after_true_branch_is_never_evaluated() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let out = run(
            &resolver,
            &mut table,
            "#if 1\nfirst\n#elif UNDEFINED_MACRO_WOULD_EXPAND_TO_NOTHING\nsecond\n#endif\n",
        )
        .unwrap();
        assert_eq!(out, "first\n");
    }

    #[test]
    fn if_condition_continues_across_a_backslash_newline() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let out = run(&resolver, &mut table, "#if \\\n1\nmatched\n#endif\n").unwrap();
        assert_eq!(out, "matched\n");
    }

    #[test]
    fn unterminated_conditional_is_an_error() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let err = run(&resolver, &mut table, "#if 1\nbody\n").unwrap_err();
        assert!(matches!(err, DriverError::UnterminatedConditional { .. }));
    }

    #[test]
    fn user_error_directive_stops_processing() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let err = run(&resolver, &mut table, "#error something went wrong\n").unwrap_err();
        assert!(matches!(err, DriverError::UserError { .. }));
    }

    #[test]
    fn unknown_directive_stops_the_file_without_error() {
        let resolver = SearchPathResolver::default();
        let mut table = MacroTable::new();
        let out = run(&resolver, &mut table, "before\n#bogus stuff\nafter\n").unwrap();
        assert_eq!(out, "before\n");
    }
}
