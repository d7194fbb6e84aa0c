use thiserror::Error;

use crate::source::Rule;

#[derive(Error, Debug)]
pub enum TagQueryError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Unterminated lexical context at end of input (depth {depth})")]
    ContextLeak { depth: usize },
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Output error: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, TagQueryError>;

impl TagQueryError {
    pub fn parse_at(message: impl Into<String>, (line, col): (usize, usize)) -> Self {
        Self::Parse { message: message.into(), line: Some(line), col: Some(col) }
    }
}

// Helper conversions
impl From<config::ConfigError> for TagQueryError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl From<std::io::Error> for TagQueryError {
    fn from(e: std::io::Error) -> Self { Self::Output(e.to_string()) }
}

impl From<pest::error::Error<Rule>> for TagQueryError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos(position) => position,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        Self::Parse { message: e.variant.message().into_owned(), line: Some(line), col: Some(col) }
    }
}
