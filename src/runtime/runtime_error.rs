use thiserror::Error;

use crate::bytecode::stack_check_error::StackCheckError;

/// Faults while executing a program. A program that went through the front
/// end and the stack checker only ever produces `Io` or a limit error; the
/// rest guard hand-built or corrupted images.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime error: stack underflow at ip={ip} ({op})")]
    StackUnderflow { ip: usize, op: &'static str },

    #[error("runtime error: type error at ip={ip} ({op}): expected {expected}, got {found}")]
    TypeMismatch {
        ip: usize,
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("runtime error: cell {index} at ip={ip} is free or out of range")]
    BadCell { ip: usize, index: usize },

    #[error("runtime error: jump at ip={ip} leaves the program")]
    JumpOutOfBounds { ip: usize },

    #[error("runtime error: stack size limit exceeded ({limit})")]
    StackLimit { limit: usize },

    #[error("runtime error: cell pool limit exceeded ({limit})")]
    CellLimit { limit: usize },

    #[error("runtime error: i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    StackCheck(#[from] StackCheckError),
}

pub fn stack_underflow(ip: usize, op: &'static str) -> RuntimeError {
    RuntimeError::StackUnderflow { ip, op }
}

pub fn type_error(
    ip: usize,
    op: &'static str,
    expected: &'static str,
    found: &'static str,
) -> RuntimeError {
    RuntimeError::TypeMismatch {
        ip,
        op,
        expected,
        found,
    }
}

pub fn bad_cell(ip: usize, index: usize) -> RuntimeError {
    RuntimeError::BadCell { ip, index }
}
