use std::path::PathBuf;

use precp_lexer::TokenizeError;
use precp_macro::MacroError;
use thiserror::Error;

/// Everything that can cause a `parse_file` run to stop. Every variant
/// carries a position so it can be turned into a
/// [`precp_foundation::diagnostics::Diagnostic`] uniformly.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Macro(#[from] MacroError),

    #[error("stray '#' not at the start of a line")]
    StrayHash { line: u32, column: u32, spelling: String },

    #[error("expected '\"' or '<' to begin an include filename")]
    ExpectedIncludeDelimiter { line: u32, column: u32, spelling: String },

    #[error("error parsing include filename")]
    MalformedIncludeFilename { line: u32, column: u32, spelling: String },

    #[error("cannot open '{path}': {source}")]
    CannotOpenInclude {
        line: u32,
        column: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expected an identifier after #undef")]
    ExpectedUndefName { line: u32, column: u32, spelling: String },

    #[error("expected whitespace after #if/#elif")]
    ExpectedSpaceAfterConditionKeyword { line: u32, column: u32, spelling: String },

    #[error("#(el)if with no expression")]
    EmptyCondition { line: u32, column: u32, spelling: String },

    #[error("unterminated #if")]
    UnterminatedConditional { line: u32, column: u32, spelling: String },

    #[error("{message}")]
    UserError {
        line: u32,
        column: u32,
        spelling: String,
        message: String,
    },

    #[error("failed writing output: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub fn line(&self) -> u32 {
        match self {
            DriverError::Tokenize(e) => e.line(),
            DriverError::Macro(e) => e.line(),
            DriverError::StrayHash { line, .. }
            | DriverError::ExpectedIncludeDelimiter { line, .. }
            | DriverError::MalformedIncludeFilename { line, .. }
            | DriverError::CannotOpenInclude { line, .. }
            | DriverError::ExpectedUndefName { line, .. }
            | DriverError::ExpectedSpaceAfterConditionKeyword { line, .. }
            | DriverError::EmptyCondition { line, .. }
            | DriverError::UnterminatedConditional { line, .. }
            | DriverError::UserError { line, .. } => *line,
            DriverError::Io(_) => 0,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            DriverError::Tokenize(e) => e.column(),
            DriverError::Macro(e) => e.column(),
            DriverError::StrayHash { column, .. }
            | DriverError::ExpectedIncludeDelimiter { column, .. }
            | DriverError::MalformedIncludeFilename { column, .. }
            | DriverError::CannotOpenInclude { column, .. }
            | DriverError::ExpectedUndefName { column, .. }
            | DriverError::ExpectedSpaceAfterConditionKeyword { column, .. }
            | DriverError::EmptyCondition { column, .. }
            | DriverError::UnterminatedConditional { column, .. }
            | DriverError::UserError { column, .. } => *column,
            DriverError::Io(_) => 0,
        }
    }

    pub fn spelling(&self) -> String {
        match self {
            DriverError::Tokenize(e) => e.spelling().to_string(),
            DriverError::Macro(e) => e.spelling().to_string(),
            DriverError::StrayHash { spelling, .. }
            | DriverError::ExpectedIncludeDelimiter { spelling, .. }
            | DriverError::MalformedIncludeFilename { spelling, .. }
            | DriverError::ExpectedUndefName { spelling, .. }
            | DriverError::ExpectedSpaceAfterConditionKeyword { spelling, .. }
            | DriverError::EmptyCondition { spelling, .. }
            | DriverError::UnterminatedConditional { spelling, .. }
            | DriverError::UserError { spelling, .. } => spelling.clone(),
            DriverError::CannotOpenInclude { path, .. } => path.display().to_string(),
            DriverError::Io(e) => e.to_string(),
        }
    }
}
