//! # Intermediate code
//!
//! The syntax tree is lowered bottom-up into a singly linked list of
//! stack-machine instructions. Every instruction lives in one arena
//! ([`IrProgram`]) and is addressed by [`InstrId`]; `next` links and jump
//! targets are plain ids, so there is no ownership between instructions.
//!
//! Structured control flow uses two pieces:
//! - a forward jump (`Jump` / `JumpIfFalse`) whose `target` is a
//!   `JumpTarget` placeholder;
//! - the `JumpTarget` itself, whose `target` points back at the jump it ends.
//!
//! After generation, [`IrProgram::number`] assigns line numbers in list order.
//! `JumpTarget`s get a line too, which keeps the jump arithmetic of the
//! bytecode compiler simple.

use std::fmt;

use crate::bytecode::op::IrOp;
use crate::lang::node::{DataType, NodeId, NodeKind, SyntaxTree};
use crate::lang::symbol::{SymbolId, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct IntInstr {
    pub op: IrOp,
    pub operand: Option<SymbolId>,
    pub target: Option<InstrId>,
    pub next: Option<InstrId>,
    /// Assigned by [`IrProgram::number`].
    pub line: Option<usize>,
}

/// A fragment of the list under construction: first and last instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub head: InstrId,
    pub tail: InstrId,
}

#[derive(Debug, Default, Clone)]
pub struct IrProgram {
    instrs: Vec<IntInstr>,
    head: Option<InstrId>,
}

impl IrProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<InstrId> {
        self.head
    }

    pub fn get(&self, id: InstrId) -> Option<&IntInstr> {
        self.instrs.get(id.0)
    }

    /// Creates a single-instruction block.
    pub fn emit(&mut self, op: IrOp) -> Block {
        self.emit_full(op, None, None)
    }

    pub fn emit_with_symbol(&mut self, op: IrOp, symbol: Option<SymbolId>) -> Block {
        self.emit_full(op, symbol, None)
    }

    fn emit_full(&mut self, op: IrOp, operand: Option<SymbolId>, target: Option<InstrId>) -> Block {
        let id = InstrId(self.instrs.len());
        self.instrs.push(IntInstr {
            op,
            operand,
            target,
            next: None,
            line: None,
        });
        Block { head: id, tail: id }
    }

    fn set_target(&mut self, instr: InstrId, target: InstrId) {
        if let Some(i) = self.instrs.get_mut(instr.0) {
            i.target = Some(target);
        }
    }

    /// Appends `second` after the tail of `first`; the result starts where
    /// `first` did.
    pub fn concatenate(&mut self, first: Block, second: Block) -> Block {
        if let Some(tail) = self.instrs.get_mut(first.tail.0) {
            tail.next = Some(second.head);
        }
        Block {
            head: first.head,
            tail: second.tail,
        }
    }

    /// Puts a `JumpTarget` for `jump` in front of `block`.
    pub fn prefix_jump_target(&mut self, block: Block, jump: InstrId) -> Block {
        let jt = self.emit_full(IrOp::JumpTarget, None, Some(jump));
        self.concatenate(jt, block)
    }

    /// Assigns consecutive line numbers, starting at `start`, in list order.
    pub fn number(&mut self, start: usize) {
        let mut line = start;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            match self.instrs.get_mut(id.0) {
                Some(instr) => {
                    instr.line = Some(line);
                    line += 1;
                    cursor = instr.next;
                }
                None => break,
            }
        }
    }

    /// Instructions in list order.
    pub fn iter(&self) -> IrIter<'_> {
        IrIter {
            program: self,
            cursor: self.head,
        }
    }

    /// Number of instructions reachable from the head.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> IrDisplay<'a> {
        IrDisplay {
            program: self,
            symbols,
        }
    }
}

pub struct IrIter<'a> {
    program: &'a IrProgram,
    cursor: Option<InstrId>,
}

impl<'a> Iterator for IrIter<'a> {
    type Item = (InstrId, &'a IntInstr);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let instr = self.program.get(id)?;
        self.cursor = instr.next;
        Some((id, instr))
    }
}

pub struct IrDisplay<'a> {
    program: &'a IrProgram,
    symbols: &'a SymbolTable,
}

impl fmt::Display for IrDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, instr) in self.program.iter() {
            match instr.line {
                Some(line) => write!(f, "{}: {}", line, instr.op.name())?,
                None => write!(f, "?: {}", instr.op.name())?,
            }
            if let Some(symbol) = instr.operand.and_then(|s| self.symbols.get(s)) {
                write!(f, " {}", symbol.name)?;
            }
            if let Some(line) = instr
                .target
                .and_then(|t| self.program.get(t))
                .and_then(|t| t.line)
            {
                write!(f, " {}", line)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// Lowers the tree under `root` into intermediate code.
///
/// Callers must only do this for trees built without diagnostics. The result
/// is not numbered yet.
pub fn generate(tree: &SyntaxTree, root: NodeId) -> IrProgram {
    let mut program = IrProgram::new();
    let block = lower(tree, root, &mut program);
    program.head = Some(block.head);
    log::debug!("generated {} intermediate instructions", program.len());
    program
}

fn lower(tree: &SyntaxTree, id: NodeId, ir: &mut IrProgram) -> Block {
    let node = &tree[id];
    let child = |i: usize| node.children.get(i).copied();

    match node.kind {
        NodeKind::StatementList => {
            let first = lower_child(tree, child(0), ir);
            let second = lower_child(tree, child(1), ir);
            ir.concatenate(first, second)
        }

        NodeKind::EmptyStatement | NodeKind::ErrorStatement => ir.emit(IrOp::Nop),

        NodeKind::ExpressionStatement => {
            let expr = lower_child(tree, child(0), ir);
            let discard = ir.emit(IrOp::Discard);
            ir.concatenate(expr, discard)
        }

        NodeKind::PrintStatement => {
            let expr = lower_child(tree, child(0), ir);
            let print = ir.emit(IrOp::Print);
            ir.concatenate(expr, print)
        }

        NodeKind::InputStatement => ir.emit_with_symbol(IrOp::Input, node.symbol),

        NodeKind::IfThen => {
            //   <cond>
            //   JMPF -> end
            //   <then>
            //   end: JUMPTARGET
            let cond = lower_child(tree, child(0), ir);
            let jump_to_end = ir.emit(IrOp::JumpIfFalse);
            let then_part = lower_child(tree, child(1), ir);
            let end = ir.emit_full(IrOp::JumpTarget, None, Some(jump_to_end.head));
            ir.set_target(jump_to_end.head, end.head);

            let block = ir.concatenate(cond, jump_to_end);
            let block = ir.concatenate(block, then_part);
            ir.concatenate(block, end)
        }

        NodeKind::IfThenElse => {
            //   <cond>
            //   JMPF -> else
            //   <then>
            //   JMP  -> end
            //   else: JUMPTARGET
            //   <else>
            //   end: JUMPTARGET
            let cond = lower_child(tree, child(0), ir);
            let jump_to_else = ir.emit(IrOp::JumpIfFalse);
            let then_part = lower_child(tree, child(1), ir);
            let else_body = lower_child(tree, child(2), ir);
            let else_part = ir.prefix_jump_target(else_body, jump_to_else.head);
            ir.set_target(jump_to_else.head, else_part.head);
            let jump_to_end = ir.emit(IrOp::Jump);
            let end = ir.emit_full(IrOp::JumpTarget, None, Some(jump_to_end.head));
            ir.set_target(jump_to_end.head, end.head);

            let block = ir.concatenate(cond, jump_to_else);
            let block = ir.concatenate(block, then_part);
            let block = ir.concatenate(block, jump_to_end);
            let block = ir.concatenate(block, else_part);
            ir.concatenate(block, end)
        }

        NodeKind::Equals => {
            let left = lower_child(tree, child(0), ir);
            let right = lower_child(tree, child(1), ir);
            let left_is_bool = child(0).map(|c| tree[c].ty == DataType::Bool);
            let op = if left_is_bool == Some(true) {
                IrOp::BoolEqual
            } else {
                IrOp::Equal
            };
            let compare = ir.emit(op);
            let block = ir.concatenate(left, right);
            ir.concatenate(block, compare)
        }

        NodeKind::Assign => {
            let value = lower_child(tree, child(0), ir);
            let store = ir.emit_with_symbol(IrOp::GetTop, node.symbol);
            ir.concatenate(value, store)
        }

        NodeKind::Add => {
            let left = lower_child(tree, child(0), ir);
            let right = lower_child(tree, child(1), ir);
            let add = ir.emit(IrOp::Add);
            let block = ir.concatenate(left, right);
            ir.concatenate(block, add)
        }

        NodeKind::Identifier | NodeKind::StringConstant | NodeKind::IntegerConstant => {
            ir.emit_with_symbol(IrOp::Push, node.symbol)
        }

        NodeKind::CoerceToString => {
            let operand = lower_child(tree, child(0), ir);
            let from_bool = child(0).map(|c| tree[c].ty == DataType::Bool);
            let op = if from_bool == Some(true) {
                IrOp::Bool2Str
            } else {
                IrOp::Int2Str
            };
            let convert = ir.emit(op);
            ir.concatenate(operand, convert)
        }

        NodeKind::CoerceToInteger => {
            let operand = lower_child(tree, child(0), ir);
            let convert = ir.emit(IrOp::Str2Int);
            ir.concatenate(operand, convert)
        }
    }
}

/// Children always exist for well-formed nodes; a missing one lowers to a
/// `Nop` rather than aborting.
fn lower_child(tree: &SyntaxTree, child: Option<NodeId>, ir: &mut IrProgram) -> Block {
    match child {
        Some(id) => lower(tree, id, ir),
        None => ir.emit(IrOp::Nop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::diagnostics::Diagnostics;
    use crate::lang::symbol::Symbol;

    struct Fixture {
        symbols: SymbolTable,
        tree: SyntaxTree,
        diag: Diagnostics,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                symbols: SymbolTable::new(),
                tree: SyntaxTree::new(),
                diag: Diagnostics::new(),
            }
        }

        fn sym(&mut self, symbol: Symbol) -> SymbolId {
            let name = symbol.name.clone();
            self.symbols.add(symbol);
            self.symbols.lookup(&name).unwrap()
        }

        fn int(&mut self, n: i64) -> NodeId {
            let s = self.sym(Symbol::integer_constant(n.to_string(), n, 1));
            self.tree.integer_constant(s)
        }

        fn string(&mut self, text: &str) -> NodeId {
            let s = self.sym(Symbol::string_constant(format!("{:?}", text), text, 1));
            self.tree.string_constant(s)
        }

        fn print(&mut self, text: &str) -> NodeId {
            let s = self.string(text);
            self.tree.print_statement(s)
        }

        fn cond(&mut self, a: i64, b: i64) -> NodeId {
            let a = self.int(a);
            let b = self.int(b);
            self.tree.equals(a, b, &mut self.diag)
        }

        fn lower(&self, root: NodeId) -> IrProgram {
            let mut ir = generate(&self.tree, root);
            ir.number(1);
            ir
        }
    }

    fn ops(ir: &IrProgram) -> Vec<IrOp> {
        ir.iter().map(|(_, i)| i.op).collect()
    }

    fn line_of(ir: &IrProgram, id: Option<InstrId>) -> Option<usize> {
        id.and_then(|id| ir.get(id)).and_then(|i| i.line)
    }

    #[test]
    fn test_print_addition() {
        let mut fx = Fixture::new();
        let a = fx.int(1);
        let b = fx.int(2);
        let add = fx.tree.add(a, b, &mut fx.diag);
        let root = fx.tree.print_statement(add);
        let ir = fx.lower(root);
        assert_eq!(
            ops(&ir),
            vec![IrOp::Push, IrOp::Push, IrOp::Add, IrOp::Print]
        );
    }

    #[test]
    fn test_sequence_preserves_order() {
        let mut fx = Fixture::new();
        let first = fx.print("a");
        let second = fx.print("b");
        let root = fx.tree.statement_list(first, second);
        let ir = fx.lower(root);
        let operands: Vec<_> = ir
            .iter()
            .filter_map(|(_, i)| i.operand)
            .map(|s| fx.symbols.get(s).unwrap().string.clone())
            .collect();
        assert_eq!(operands, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_and_expression_statements() {
        let mut fx = Fixture::new();
        let x = fx.sym(Symbol::identifier("x", 1));
        let n = fx.int(5);
        let assign = fx.tree.assign(x, n);
        let stmt = fx.tree.expression_statement(assign);
        let empty = fx.tree.empty_statement();
        let root = fx.tree.statement_list(stmt, empty);
        let ir = fx.lower(root);
        assert_eq!(
            ops(&ir),
            vec![IrOp::Push, IrOp::GetTop, IrOp::Discard, IrOp::Nop]
        );
        let gettop = ir.iter().nth(1).unwrap().1;
        assert_eq!(gettop.operand, Some(x));
    }

    #[test]
    fn test_if_then_layout_and_targets() {
        let mut fx = Fixture::new();
        let cond = fx.cond(1, 2);
        let then = fx.print("X");
        let root = fx.tree.if_then(cond, then, &mut fx.diag);
        let ir = fx.lower(root);

        assert_eq!(
            ops(&ir),
            vec![
                IrOp::Push,
                IrOp::Push,
                IrOp::Equal,
                IrOp::JumpIfFalse,
                IrOp::Push,
                IrOp::Print,
                IrOp::JumpTarget
            ]
        );

        let (jmpf_id, jmpf) = ir.iter().nth(3).unwrap();
        let (_, end) = ir.iter().nth(6).unwrap();
        assert_eq!(line_of(&ir, jmpf.target), Some(7));
        // the placeholder refers back to its jump
        assert_eq!(end.target, Some(jmpf_id));
    }

    #[test]
    fn test_if_then_else_layout_and_targets() {
        let mut fx = Fixture::new();
        let cond = fx.cond(1, 1);
        let then = fx.print("X");
        let otherwise = fx.print("Y");
        let root = fx.tree.if_then_else(cond, then, otherwise, &mut fx.diag);
        let ir = fx.lower(root);

        assert_eq!(
            ops(&ir),
            vec![
                IrOp::Push,        // 1
                IrOp::Push,        // 2
                IrOp::Equal,       // 3
                IrOp::JumpIfFalse, // 4 -> 8
                IrOp::Push,        // 5
                IrOp::Print,       // 6
                IrOp::Jump,        // 7 -> 11
                IrOp::JumpTarget,  // 8
                IrOp::Push,        // 9
                IrOp::Print,       // 10
                IrOp::JumpTarget,  // 11
            ]
        );

        let instrs: Vec<_> = ir.iter().collect();
        assert_eq!(line_of(&ir, instrs[3].1.target), Some(8));
        assert_eq!(line_of(&ir, instrs[6].1.target), Some(11));
        assert_eq!(instrs[7].1.target, Some(instrs[3].0));
        assert_eq!(instrs[10].1.target, Some(instrs[6].0));
    }

    #[test]
    fn test_bool_equality_uses_bool_equal() {
        let mut fx = Fixture::new();
        let left = fx.cond(1, 2);
        let right = fx.cond(3, 3);
        let eq = fx.tree.equals(left, right, &mut fx.diag);
        let root = fx.tree.print_statement(eq);
        let ir = fx.lower(root);
        let ops = ops(&ir);
        assert_eq!(ops.iter().filter(|o| **o == IrOp::Equal).count(), 2);
        assert_eq!(ops[ops.len() - 2], IrOp::BoolEqual);
    }

    #[test]
    fn test_coercions_lower_to_conversions() {
        let mut fx = Fixture::new();
        let s = fx.string("n=");
        let n = fx.int(4);
        let to_str = fx.tree.add(s, n, &mut fx.diag);
        let n2 = fx.int(1);
        let s2 = fx.string("2");
        let to_int = fx.tree.add(n2, s2, &mut fx.diag);
        let b = fx.cond(1, 1);
        let s3 = fx.string("b=");
        let from_bool = fx.tree.add(s3, b, &mut fx.diag);

        let p1 = fx.tree.print_statement(to_str);
        let p2 = fx.tree.print_statement(to_int);
        let p3 = fx.tree.print_statement(from_bool);
        let l = fx.tree.statement_list(p1, p2);
        let root = fx.tree.statement_list(l, p3);
        let ir = fx.lower(root);
        let ops = ops(&ir);

        assert!(ops.contains(&IrOp::Int2Str));
        assert!(ops.contains(&IrOp::Str2Int));
        assert!(ops.contains(&IrOp::Bool2Str));
    }

    #[test]
    fn test_input_statement() {
        let mut fx = Fixture::new();
        let name = fx.sym(Symbol::identifier("name", 1));
        let root = fx.tree.input_statement(name);
        let ir = fx.lower(root);
        let (_, instr) = ir.iter().next().unwrap();
        assert_eq!(instr.op, IrOp::Input);
        assert_eq!(instr.operand, Some(name));
    }

    #[test]
    fn test_numbering_is_sequential() {
        let mut fx = Fixture::new();
        let cond = fx.cond(1, 2);
        let then = fx.print("X");
        let root = fx.tree.if_then(cond, then, &mut fx.diag);
        let ir = fx.lower(root);
        let lines: Vec<_> = ir.iter().map(|(_, i)| i.line.unwrap()).collect();
        assert_eq!(lines, (1..=7).collect::<Vec<_>>());
        assert_eq!(ir.len(), 7);
    }

    #[test]
    fn test_display_dump() {
        let mut fx = Fixture::new();
        let cond = fx.cond(1, 2);
        let then = fx.print("X");
        let root = fx.tree.if_then(cond, then, &mut fx.diag);
        let ir = fx.lower(root);
        let dump = ir.display(&fx.symbols).to_string();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "1: OP_PUSH 1");
        assert_eq!(lines[3], "4: OP_JMPF 7");
        assert_eq!(lines[4], "5: OP_PUSH \"X\"");
        assert_eq!(lines[6], "7: JUMPTARGET 4");
    }
}
