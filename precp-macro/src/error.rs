use precp_lexer::TokenizeError;
use thiserror::Error;

/// Everything that can go wrong parsing a `#define`/`#undef` or expanding
/// a macro invocation. Every variant carries enough position information
/// to build a [`precp_foundation::diagnostics::Diagnostic`] without the
/// caller having to thread a tokenizer reference alongside the error.
#[derive(Debug, Error, Clone)]
pub enum MacroError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error("expected an identifier after #define")]
    ExpectedMacroName { line: u32, column: u32, spelling: String },

    #[error("expected an identifier for a macro parameter")]
    ExpectedParameterName { line: u32, column: u32, spelling: String },

    #[error("expected ')' or ',' in macro parameter list")]
    MalformedParameterList { line: u32, column: u32, spelling: String },

    #[error("expected '(' to begin the argument list")]
    ExpectedOpenParen { line: u32, column: u32, spelling: String },

    #[error("too few arguments for function-like macro")]
    TooFewArguments { line: u32, column: u32, spelling: String },

    #[error("too many arguments for function-like macro")]
    TooManyArguments { line: u32, column: u32, spelling: String },

    #[error("'#' is not followed by a macro parameter")]
    StringizeNotParameter { line: u32, column: u32, spelling: String },

    #[error("only two '#' characters are allowed for macro expansion")]
    TooManyHashes { line: u32, column: u32, spelling: String },

    #[error("'##' may not appear at the start or end of a macro body")]
    DanglingConcatenation { line: u32, column: u32, spelling: String },

    #[error("max recursion level reached")]
    MaxRecursionReached { line: u32, column: u32, spelling: String },
}

impl MacroError {
    pub fn line(&self) -> u32 {
        match self {
            MacroError::Tokenize(e) => e.line(),
            MacroError::ExpectedMacroName { line, .. }
            | MacroError::ExpectedParameterName { line, .. }
            | MacroError::MalformedParameterList { line, .. }
            | MacroError::ExpectedOpenParen { line, .. }
            | MacroError::TooFewArguments { line, .. }
            | MacroError::TooManyArguments { line, .. }
            | MacroError::StringizeNotParameter { line, .. }
            | MacroError::TooManyHashes { line, .. }
            | MacroError::DanglingConcatenation { line, .. }
            | MacroError::MaxRecursionReached { line, .. } => *line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            MacroError::Tokenize(e) => e.column(),
            MacroError::ExpectedMacroName { column, .. }
            | MacroError::ExpectedParameterName { column, .. }
            | MacroError::MalformedParameterList { column, .. }
            | MacroError::ExpectedOpenParen { column, .. }
            | MacroError::TooFewArguments { column, .. }
            | MacroError::TooManyArguments { column, .. }
            | MacroError::StringizeNotParameter { column, .. }
            | MacroError::TooManyHashes { column, .. }
            | MacroError::DanglingConcatenation { column, .. }
            | MacroError::MaxRecursionReached { column, .. } => *column,
        }
    }

    pub fn spelling(&self) -> &str {
        match self {
            MacroError::Tokenize(e) => e.spelling(),
            MacroError::ExpectedMacroName { spelling, .. }
            | MacroError::ExpectedParameterName { spelling, .. }
            | MacroError::MalformedParameterList { spelling, .. }
            | MacroError::ExpectedOpenParen { spelling, .. }
            | MacroError::TooFewArguments { spelling, .. }
            | MacroError::TooManyArguments { spelling, .. }
            | MacroError::StringizeNotParameter { spelling, .. }
            | MacroError::TooManyHashes { spelling, .. }
            | MacroError::DanglingConcatenation { spelling, .. }
            | MacroError::MaxRecursionReached { spelling, .. } => spelling,
        }
    }
}
