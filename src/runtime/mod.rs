pub mod cell;
pub mod runtime_error;
pub mod vm_bc;

pub use cell::{Cell, CellPool};
pub use runtime_error::RuntimeError;
pub use vm_bc::{StackValue, VmBc, VmConfig};
