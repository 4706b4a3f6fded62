use crate::bytecode::ProgramBc;
use crate::bytecode::op::Op;
use crate::bytecode::stack_check_error::check_program;
use crate::runtime::cell::{Cell, CellPool, leading_int};
use crate::runtime::runtime_error::{
    RuntimeError, bad_cell, stack_underflow, type_error,
};
use std::io::{self, BufRead, Write};

/// One operand stack entry: either a cell in the pool or a boolean produced
/// by a comparison. Booleans never occupy a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackValue {
    Index(usize),
    Bool(bool),
}

impl StackValue {
    fn kind(self) -> &'static str {
        match self {
            StackValue::Index(_) => "cell index",
            StackValue::Bool(_) => "bool",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_stack_size: usize,
    pub max_cells: usize,
    /// Log every executed instruction at `trace` level.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack_size: 10_000,
            max_cells: 100_000,
            trace: false,
        }
    }
}

pub struct VmBc {
    stack: Vec<StackValue>,
    pool: CellPool,
    config: VmConfig,
    steps: usize,
}

impl VmBc {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::new(),
            pool: CellPool::new(),
            config,
            steps: 0,
        }
    }

    pub fn stack(&self) -> &[StackValue] {
        &self.stack
    }

    pub fn pool(&self) -> &CellPool {
        &self.pool
    }

    /// Instructions executed by the last run.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn reset_execution_state(&mut self) {
        self.stack.clear();
        self.pool = CellPool::new();
        self.steps = 0;
    }

    /// Runs `prog` against the process's stdin and stdout.
    pub fn run_compiled(&mut self, prog: &ProgramBc) -> Result<(), RuntimeError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut input = stdin.lock();
        let mut output = stdout.lock();
        self.run_compiled_with_io(prog, &mut input, &mut output)
    }

    pub fn run_compiled_with_io(
        &mut self,
        prog: &ProgramBc,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<(), RuntimeError> {
        self.reset_execution_state();

        check_program(prog)?;

        self.pool = CellPool::from_cells(prog.cells.clone());
        let result = self.exec_ops(&prog.ops, input, output);
        output.flush()?;

        log::debug!(
            "executed {} instructions, {} of {} cells active",
            self.steps,
            self.pool.active(),
            self.pool.len()
        );
        result
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if self.stack.len() > self.config.max_stack_size {
            return Err(RuntimeError::StackLimit {
                limit: self.config.max_stack_size,
            });
        }

        if self.pool.len() > self.config.max_cells {
            return Err(RuntimeError::CellLimit {
                limit: self.config.max_cells,
            });
        }

        Ok(())
    }

    fn exec_ops(
        &mut self,
        ops: &[Op],
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<(), RuntimeError> {
        let mut ip: usize = 0;

        while ip < ops.len() {
            self.check_limits()?;

            let op = ops[ip];
            if self.config.trace {
                log::trace!("{:04} {:<10} stack={:?}", ip, op.name(), self.stack);
            }

            // displacement to the next instruction
            let mut ipc: i64 = 1;

            match op {
                Op::Nop => {}

                Op::Push(slot) => {
                    let value = self.cell(ip, slot)?.clone();
                    let index = self.pool.alloc(value);
                    self.push(StackValue::Index(index));
                }

                Op::GetTop(slot) => {
                    let top = *self.stack.last().ok_or(stack_underflow(ip, op.name()))?;
                    let value = match top {
                        StackValue::Index(i) => self.cell(ip, i)?.clone(),
                        StackValue::Bool(b) => Cell::Str(b.to_string()),
                    };
                    self.store(ip, slot, value)?;
                }

                Op::Discard => {
                    let value = self.pop(ip, op)?;
                    self.release(value);
                }

                Op::Print => {
                    let value = self.pop(ip, op)?;
                    match value {
                        StackValue::Bool(b) => writeln!(output, "{}", b)?,
                        StackValue::Index(i) => match self.cell(ip, i)? {
                            Cell::Str(s) => writeln!(output, "{}", s)?,
                            Cell::Int(n) => writeln!(output, "{}", n)?,
                            // nothing was ever stored: nothing to print
                            _ => {}
                        },
                    }
                    self.release(value);
                }

                Op::Input(slot) => {
                    // let a prompt printed just before reach the user
                    output.flush()?;
                    let mut line = Vec::new();
                    input.read_until(b'\n', &mut line)?;
                    let trimmed = line.strip_suffix(b"\n").unwrap_or(&line);
                    let trimmed = trimmed.strip_suffix(b"\r").unwrap_or(trimmed);
                    // any bytes are accepted; invalid UTF-8 becomes U+FFFD
                    let text = String::from_utf8_lossy(trimmed).into_owned();
                    self.store(ip, slot, Cell::Str(text))?;
                }

                Op::Jump(offset) => {
                    ipc = i64::from(offset);
                }

                Op::JumpIfFalse(offset) => {
                    if !self.pop_bool(ip, op)? {
                        ipc = i64::from(offset);
                    }
                }

                Op::Equal => {
                    let i = self.pop_index(ip, op)?;
                    let j = self.pop_index(ip, op)?;
                    // the first-popped operand alone picks the comparison
                    let equal = match (self.cell(ip, i)?, self.cell(ip, j)?) {
                        (Cell::Str(a), Cell::Str(b)) => a == b,
                        (Cell::Int(a), Cell::Int(b)) => a == b,
                        // mixed kinds, or an unset first operand
                        _ => false,
                    };
                    self.pool.release(i);
                    self.pool.release(j);
                    self.push(StackValue::Bool(equal));
                }

                Op::BoolEqual => {
                    let a = self.pop(ip, op)?;
                    let b = self.pop(ip, op)?;
                    self.push(StackValue::Bool(a == b));
                }

                Op::Add => {
                    let i = self.pop_index(ip, op)?;
                    let j = self.pop_index(ip, op)?;
                    let left = self.cell(ip, j)?.clone();
                    let right = self.cell(ip, i)?;
                    let sum = add_cells(left, right);
                    let k = self.pool.alloc(sum);
                    self.pool.release(i);
                    self.pool.release(j);
                    self.push(StackValue::Index(k));
                }

                Op::Bool2Str => {
                    let b = self.pop_bool(ip, op)?;
                    let k = self.pool.alloc(Cell::Str(b.to_string()));
                    self.push(StackValue::Index(k));
                }

                Op::Int2Str => {
                    let i = self.pop_index(ip, op)?;
                    let text = match self.cell(ip, i)? {
                        Cell::Int(n) => n.to_string(),
                        Cell::Str(s) => s.clone(),
                        _ => String::new(),
                    };
                    let k = self.pool.alloc(Cell::Str(text));
                    self.pool.release(i);
                    self.push(StackValue::Index(k));
                }

                Op::Str2Int => {
                    let value = self.pop(ip, op)?;
                    let n = match value {
                        StackValue::Bool(b) => i64::from(b),
                        StackValue::Index(i) => match self.cell(ip, i)? {
                            Cell::Str(s) => leading_int(s),
                            Cell::Int(n) => *n,
                            _ => 0,
                        },
                    };
                    let k = self.pool.alloc(Cell::Int(n));
                    self.release(value);
                    self.push(StackValue::Index(k));
                }
            }

            ip = usize::try_from(ip as i64 + ipc)
                .map_err(|_| RuntimeError::JumpOutOfBounds { ip })?;
        }

        Ok(())
    }

    fn push(&mut self, value: StackValue) {
        self.stack.push(value);
    }

    fn pop(&mut self, ip: usize, op: Op) -> Result<StackValue, RuntimeError> {
        self.stack.pop().ok_or(stack_underflow(ip, op.name()))
    }

    fn pop_index(&mut self, ip: usize, op: Op) -> Result<usize, RuntimeError> {
        match self.pop(ip, op)? {
            StackValue::Index(i) => Ok(i),
            other => Err(type_error(ip, op.name(), "cell index", other.kind())),
        }
    }

    fn pop_bool(&mut self, ip: usize, op: Op) -> Result<bool, RuntimeError> {
        match self.pop(ip, op)? {
            StackValue::Bool(b) => Ok(b),
            other => Err(type_error(ip, op.name(), "bool", other.kind())),
        }
    }

    fn cell(&self, ip: usize, index: usize) -> Result<&Cell, RuntimeError> {
        self.pool.get(index).ok_or(bad_cell(ip, index))
    }

    fn store(&mut self, ip: usize, slot: usize, value: Cell) -> Result<(), RuntimeError> {
        if self.pool.get(slot).is_none() || !self.pool.set(slot, value) {
            return Err(bad_cell(ip, slot));
        }
        Ok(())
    }

    fn release(&mut self, value: StackValue) {
        if let StackValue::Index(i) = value {
            self.pool.release(i);
        }
    }
}

impl Default for VmBc {
    fn default() -> Self {
        Self::new()
    }
}

/// Run-time addition over a copy of the left operand. An operand that was
/// never assigned contributes an empty string or zero; the result takes the
/// left operand's kind unless that one is unset.
fn add_cells(left: Cell, right: &Cell) -> Cell {
    match (left, right) {
        (Cell::Str(mut a), Cell::Str(b)) => {
            a.push_str(b);
            Cell::Str(a)
        }
        (Cell::Int(a), Cell::Int(b)) => Cell::Int(a.wrapping_add(*b)),

        (Cell::Unknown, Cell::Str(b)) => Cell::Str(b.clone()),
        (Cell::Unknown, Cell::Int(b)) => Cell::Int(*b),
        (Cell::Str(a), Cell::Unknown) => Cell::Str(a),
        (Cell::Int(a), Cell::Unknown) => Cell::Int(a),

        (Cell::Int(a), Cell::Str(b)) => Cell::Int(a.wrapping_add(leading_int(b))),
        (Cell::Str(mut a), Cell::Int(b)) => {
            a.push_str(&b.to_string());
            Cell::Str(a)
        }

        (left, _) => left,
    }
}
