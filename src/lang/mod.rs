//! # Language model
//!
//! The data the front end hands to the core: the symbol table, the typed
//! syntax tree (semantic checks run as nodes are built) and the diagnostics
//! collected along the way.

pub mod diagnostics;
pub mod node;
pub mod symbol;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use node::{DataType, NodeId, NodeKind, SyntaxTree, TreeNode};
pub use symbol::{Symbol, SymbolId, SymbolKind, SymbolTable};
