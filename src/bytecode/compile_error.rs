use thiserror::Error;

/// Inconsistencies between the intermediate code and the symbol table.
///
/// None of these can come from a program that passed the semantic checks;
/// they indicate a bug in an earlier stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("compile error: instruction {index} ({op}) has no line number")]
    Unnumbered { index: usize, op: &'static str },

    #[error("compile error: jump at {index} ({op}) has no target")]
    MissingTarget { index: usize, op: &'static str },

    #[error("compile error: instruction {index} ({op}) has no symbol operand")]
    MissingOperand { index: usize, op: &'static str },

    #[error("compile error: symbol #{symbol} has no value slot")]
    UnresolvedSymbol { symbol: usize },

    #[error("compile error: jump displacement out of range at {index}")]
    DisplacementOverflow { index: usize },
}
