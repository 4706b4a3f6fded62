use thiserror::Error;

use crate::bytecode::{Op, ProgramBc};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StackCheckError {
    #[error("stack-check error: stack underflow at ip={ip}, op={op}, needed {needed} items")]
    Underflow {
        ip: usize,
        op: &'static str,
        needed: usize,
    },

    #[error("stack-check error: jump at ip={ip} lands on {target}, outside 0..={len}")]
    JumpOutOfRange { ip: usize, target: i64, len: usize },

    #[error("stack-check error: backward jump at ip={ip} (offset {offset})")]
    BackwardJump { ip: usize, offset: i32 },

    #[error("stack-check error: slot {slot} at ip={ip} is outside {cells} initial cells")]
    BadSlot { ip: usize, slot: usize, cells: usize },

    #[error("stack-check error: paths reach ip={ip} with heights {first} and {second}")]
    HeightMismatch {
        ip: usize,
        first: usize,
        second: usize,
    },
}

/// Returns (pops, pushes) for an op.
fn effect(op: &Op) -> (usize, usize) {
    use Op::*;
    match op {
        Nop => (0, 0),
        Push(_) => (0, 1),
        // reads the top without consuming it
        GetTop(_) => (1, 1),
        Discard | Print => (1, 0),
        Input(_) => (0, 0),

        Jump(_) => (0, 0),
        JumpIfFalse(_) => (1, 0),

        Equal | BoolEqual | Add => (2, 1),
        Bool2Str | Int2Str | Str2Int => (1, 1),
    }
}

/// Records `height` as the entry height of `ip`, or checks it against the
/// height another path already brought there.
fn merge(
    heights: &mut [Option<usize>],
    ip: usize,
    height: usize,
) -> Result<(), StackCheckError> {
    match heights[ip] {
        None => {
            heights[ip] = Some(height);
            Ok(())
        }
        Some(first) if first == height => Ok(()),
        Some(first) => Err(StackCheckError::HeightMismatch {
            ip,
            first,
            second: height,
        }),
    }
}

/// Check a flat instruction stream against `cells` initial value slots.
///
/// Jumps only go forward, so one pass in instruction order sees every
/// predecessor of an instruction before the instruction itself. Heights are
/// tracked per entry point; `ops.len()` is the exit and may be reached with
/// any height as long as all paths agree.
pub fn check_ops(ops: &[Op], cells: usize) -> Result<(), StackCheckError> {
    let len = ops.len();
    let mut heights: Vec<Option<usize>> = vec![None; len + 1];
    heights[0] = Some(0);

    for (ip, op) in ops.iter().enumerate() {
        if let Some(slot) = op.slot() {
            if slot >= cells {
                return Err(StackCheckError::BadSlot { ip, slot, cells });
            }
        }

        // unreachable code has no height to check
        let Some(h) = heights[ip] else {
            continue;
        };

        let (pops, pushes) = effect(op);
        if h < pops {
            return Err(StackCheckError::Underflow {
                ip,
                op: op.name(),
                needed: pops,
            });
        }
        let after = h - pops + pushes;

        if let Some(offset) = op.jump_offset() {
            if offset <= 0 {
                return Err(StackCheckError::BackwardJump { ip, offset });
            }
            let target = ip as i64 + i64::from(offset);
            if target > len as i64 {
                return Err(StackCheckError::JumpOutOfRange { ip, target, len });
            }
            merge(&mut heights, target as usize, after)?;
        }

        // everything but an unconditional jump falls through
        if !matches!(op, Op::Jump(_)) {
            merge(&mut heights, ip + 1, after)?;
        }
    }

    Ok(())
}

/// Check a whole program against its own cell table.
pub fn check_program(program: &ProgramBc) -> Result<(), StackCheckError> {
    check_ops(&program.ops, program.cells.len())
}
