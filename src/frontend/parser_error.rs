use thiserror::Error;

/// A syntax error with source location.
///
/// `line` and `col` are 1-based positions coming from the lexer spans.
/// For errors at end of input the parser uses the last consumed token's span
/// so locations are never `0:0`.
///
/// The parser never returns these to its caller: each one becomes a
/// diagnostic and an `error` statement, and parsing resumes.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}
