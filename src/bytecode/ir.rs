use crate::bytecode::Op;
use crate::runtime::cell::Cell;
use serde::{Deserialize, Serialize};

/// A compiled bytecode program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramBc {
    /// Flat instruction stream; jump operands are relative to their own index.
    pub ops: Vec<Op>,

    /// Initial value cells, one per symbol in symbol-table order.
    /// Slot operands in `ops` index into this table.
    pub cells: Vec<Cell>,
}

impl ProgramBc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
