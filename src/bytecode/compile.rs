use crate::{
    bytecode::{Op, ProgramBc, compile_error::CompileError, intcode::IrProgram, op::IrOp},
    lang::symbol::{SymbolKind, SymbolTable},
    runtime::cell::Cell,
};

/// Turns numbered intermediate code into a flat [`ProgramBc`].
///
/// Two passes, each linear:
/// 1. one value cell per symbol, in symbol-table order, with the slot index
///    recorded back onto the symbol;
/// 2. one flat instruction per intermediate instruction, with symbols
///    replaced by slots and jump targets by relative displacements.
pub struct Compiler {
    /// Output bytecode program
    program_bc: ProgramBc,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            program_bc: ProgramBc::new(),
        }
    }

    pub fn compile(
        mut self,
        symbols: &mut SymbolTable,
        code: &IrProgram,
    ) -> Result<ProgramBc, CompileError> {
        self.build_cells(symbols);
        self.linearize(symbols, code)?;

        log::debug!(
            "compiled {} instructions over {} cells",
            self.program_bc.ops.len(),
            self.program_bc.cells.len()
        );
        Ok(self.program_bc)
    }

    fn build_cells(&mut self, symbols: &mut SymbolTable) {
        let initial: Vec<_> = symbols
            .iter()
            .map(|(id, symbol)| {
                let cell = match symbol.kind {
                    SymbolKind::Identifier => Cell::Unknown,
                    SymbolKind::StringConstant => Cell::Str(symbol.string.clone()),
                    SymbolKind::IntegerConstant => Cell::Int(symbol.integer),
                };
                (id, cell)
            })
            .collect();

        for (id, cell) in initial {
            symbols.set_slot(id, self.program_bc.cells.len());
            self.program_bc.cells.push(cell);
        }
    }

    fn linearize(&mut self, symbols: &SymbolTable, code: &IrProgram) -> Result<(), CompileError> {
        for (index, (_, instr)) in code.iter().enumerate() {
            let name = instr.op.name();

            let slot = || -> Result<usize, CompileError> {
                let id = instr.operand.ok_or(CompileError::MissingOperand { index, op: name })?;
                symbols
                    .get(id)
                    .and_then(|s| s.slot)
                    .ok_or(CompileError::UnresolvedSymbol { symbol: id.0 })
            };

            // target line (1-based) minus our own 0-based index lands one past
            // the target placeholder
            let displacement = || -> Result<i32, CompileError> {
                let target = instr
                    .target
                    .and_then(|t| code.get(t))
                    .ok_or(CompileError::MissingTarget { index, op: name })?;
                let line = target
                    .line
                    .ok_or(CompileError::Unnumbered { index, op: name })?;
                let disp = line as i64 - index as i64;
                i32::try_from(disp).map_err(|_| CompileError::DisplacementOverflow { index })
            };

            let op = match instr.op {
                IrOp::Nop => Op::Nop,
                IrOp::Push => Op::Push(slot()?),
                IrOp::GetTop => Op::GetTop(slot()?),
                IrOp::Discard => Op::Discard,
                IrOp::Print => Op::Print,
                IrOp::Input => Op::Input(slot()?),
                IrOp::Jump => Op::Jump(displacement()?),
                IrOp::JumpIfFalse => Op::JumpIfFalse(displacement()?),
                IrOp::Equal => Op::Equal,
                IrOp::BoolEqual => Op::BoolEqual,
                IrOp::Add => Op::Add,
                IrOp::Bool2Str => Op::Bool2Str,
                IrOp::Int2Str => Op::Int2Str,
                IrOp::Str2Int => Op::Str2Int,
                // bookkeeping only
                IrOp::JumpTarget => Op::Nop,
            };

            self.program_bc.ops.push(op);
        }

        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
