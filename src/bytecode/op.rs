use serde::{Deserialize, Serialize};

// =============================================================================
// IrOp - intermediate code opcodes
// =============================================================================

/// Opcodes of the linked intermediate code.
///
/// These are the bytecode opcodes without operands, plus the `JumpTarget`
/// placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrOp {
    Nop,
    Push,
    GetTop,
    Discard,
    Print,
    Input,
    Jump,
    JumpIfFalse,
    Equal,
    BoolEqual,
    Add,
    Bool2Str,
    Int2Str,
    Str2Int,
    /// Not executable: marks where a jump lands. Its `target` points back
    /// at the jump it terminates.
    JumpTarget,
}

impl IrOp {
    pub fn name(self) -> &'static str {
        match self {
            IrOp::Nop => "OP_NOP",
            IrOp::Push => "OP_PUSH",
            IrOp::GetTop => "OP_GETTOP",
            IrOp::Discard => "OP_DISCARD",
            IrOp::Print => "OP_PRINT",
            IrOp::Input => "OP_INPUT",
            IrOp::Jump => "OP_JMP",
            IrOp::JumpIfFalse => "OP_JMPF",
            IrOp::Equal => "OP_EQUAL",
            IrOp::BoolEqual => "OP_BOOL_EQUAL",
            IrOp::Add => "OP_ADD",
            IrOp::Bool2Str => "OP_BOOL2STR",
            IrOp::Int2Str => "OP_INT2STR",
            IrOp::Str2Int => "OP_STR2INT",
            IrOp::JumpTarget => "JUMPTARGET",
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, IrOp::Jump | IrOp::JumpIfFalse)
    }

    /// Opcodes whose operand is a symbol.
    pub fn takes_symbol(self) -> bool {
        matches!(self, IrOp::Push | IrOp::GetTop | IrOp::Input)
    }
}

// =============================================================================
// Op - flat bytecode instructions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// No operation.
    Nop,

    /// Push a fresh copy of `cell[slot]`.
    Push(usize),

    /// Copy the value on top of the stack into `cell[slot]` (no pop).
    GetTop(usize),

    /// Pop and release the top value.
    Discard,

    /// Pop a value and print it on its own line.
    Print,

    /// Read one input line into `cell[slot]` as a string.
    Input(usize),

    /// Unconditional relative jump. Offset is added to current ip.
    Jump(i32),

    /// Pop bool from stack, jump if false. If true, continue to next instruction.
    JumpIfFalse(i32),

    /// Compare two strings or two integers, push a bool.
    Equal,

    /// Compare two bools, push a bool.
    BoolEqual,

    /// Add two integers or concatenate two strings (with run-time conversion).
    Add,

    Bool2Str,
    Int2Str,
    Str2Int,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Nop => "NOP",
            Op::Push(_) => "PUSH",
            Op::GetTop(_) => "GETTOP",
            Op::Discard => "DISCARD",
            Op::Print => "PRINT",
            Op::Input(_) => "INPUT",
            Op::Jump(_) => "JMP",
            Op::JumpIfFalse(_) => "JMPF",
            Op::Equal => "EQUAL",
            Op::BoolEqual => "BOOL_EQUAL",
            Op::Add => "ADD",
            Op::Bool2Str => "BOOL2STR",
            Op::Int2Str => "INT2STR",
            Op::Str2Int => "STR2INT",
        }
    }

    /// Relative displacement for jumps.
    pub fn jump_offset(&self) -> Option<i32> {
        match self {
            Op::Jump(offset) | Op::JumpIfFalse(offset) => Some(*offset),
            _ => None,
        }
    }

    /// Cell index for slot-addressed instructions.
    pub fn slot(&self) -> Option<usize> {
        match self {
            Op::Push(slot) | Op::GetTop(slot) | Op::Input(slot) => Some(*slot),
            _ => None,
        }
    }
}
