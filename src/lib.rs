//! Compiler and bytecode virtual machine for my_c, a tiny scripting
//! language with sequential statements, `if`/`else`, `print`, `input`,
//! assignment, equality and overloaded `+` over strings and integers.
//!
//! Pipeline: [`frontend`] (tokens, parse tree built through [`lang`]) →
//! [`bytecode::intcode`] (linked intermediate code) → [`bytecode::compile`]
//! (flat instructions and a cell table) → [`runtime::vm_bc`].
//! [`session`] ties the stages together.

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;
pub mod session;

pub use session::{Session, SessionError, compile_source, run_source};
