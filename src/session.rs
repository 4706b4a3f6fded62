//! One compilation: the symbol table, syntax tree and diagnostics of a
//! single source text, threaded explicitly through generate → number →
//! compile → execute.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::{Compiler, IrProgram, ProgramBc, generate};
use crate::frontend::{Lexer, LexerError, Parser};
use crate::lang::{Diagnostics, NodeId, SymbolTable, SyntaxTree};
use crate::runtime::{RuntimeError, VmBc, VmConfig};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("{count} error(s) were found.")]
    Diagnostics { count: usize },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug)]
pub struct Session {
    pub symbols: SymbolTable,
    pub tree: SyntaxTree,
    pub root: NodeId,
    pub diagnostics: Diagnostics,
}

impl Session {
    /// Lexes and parses `source`. Syntax and semantic errors do not fail
    /// this step; they are collected in `diagnostics`.
    pub fn parse(source: &str) -> Result<Session, LexerError> {
        let tokens = Lexer::new(source).tokenize_clean()?;
        let parsed = Parser::new(tokens).parse();
        Ok(Session {
            symbols: parsed.symbols,
            tree: parsed.tree,
            root: parsed.root,
            diagnostics: parsed.diagnostics,
        })
    }

    /// Numbered intermediate code for the whole program. Refused while any
    /// diagnostic is outstanding.
    pub fn generate(&self) -> Result<IrProgram, SessionError> {
        if !self.diagnostics.is_empty() {
            return Err(SessionError::Diagnostics {
                count: self.diagnostics.count(),
            });
        }
        let mut ir = generate(&self.tree, self.root);
        ir.number(1);
        Ok(ir)
    }

    /// Flattens already generated code. Records cell slots on the symbols.
    pub fn compile_ir(&mut self, ir: &IrProgram) -> Result<ProgramBc, SessionError> {
        Ok(Compiler::new().compile(&mut self.symbols, ir)?)
    }

    pub fn compile(&mut self) -> Result<ProgramBc, SessionError> {
        let ir = self.generate()?;
        self.compile_ir(&ir)
    }
}

/// Source text to bytecode in one call.
pub fn compile_source(source: &str) -> Result<ProgramBc, SessionError> {
    Session::parse(source)?.compile()
}

/// Compiles and runs `source` with the given streams and default limits.
pub fn run_source(
    source: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(), SessionError> {
    run_source_with_config(source, VmConfig::default(), input, output)
}

pub fn run_source_with_config(
    source: &str,
    config: VmConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(), SessionError> {
    let program = compile_source(source)?;
    VmBc::with_config(config).run_compiled_with_io(&program, input, output)?;
    Ok(())
}
