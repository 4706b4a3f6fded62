use std::fmt;

use thiserror::Error;

use super::node::DataType;

/// Compile-time problems found while building the syntax tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosticKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("if: condition should be boolean, found {0}")]
    ConditionNotBoolean(DataType),

    #[error("==: different types ({left} and {right})")]
    EqualityTypeMismatch { left: DataType, right: DataType },

    #[error("+: could not coerce second argument to string (found {0})")]
    CannotCoerceToString(DataType),

    #[error("+: could not coerce second argument to integer (found {0})")]
    CannotCoerceToInteger(DataType),

    #[error("+: first argument must be a string or an integer, found {0}")]
    BadAdditionOperand(DataType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.kind)
    }
}

/// Error sink shared by the parser and the semantic checks.
///
/// Recording never aborts anything; the pipeline looks at [`count`] once,
/// after the whole tree is built, and skips code generation if it is nonzero.
///
/// [`count`]: Diagnostics::count
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, line: usize, kind: DiagnosticKind) {
        log::debug!("line {}: {}", line, kind);
        self.entries.push(Diagnostic { line, kind });
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Closing line printed after every compile.
    pub fn summary(&self) -> String {
        format!("{} error(s) were found.", self.entries.len())
    }
}
