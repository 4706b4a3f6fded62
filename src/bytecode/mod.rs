pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod image;
pub mod intcode;
pub mod ir;
pub mod op;
pub mod stack_check_error;

pub use compile::Compiler;
pub use intcode::{IrProgram, generate};
pub use ir::ProgramBc;
pub use op::{IrOp, Op};
