use std::fmt;
use std::ops::Index;

use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::symbol::{SymbolId, SymbolTable};

/// Static result type of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Void,
    String,
    Integer,
    Bool,
    Unknown,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Void => "void",
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Bool => "bool",
            DataType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Syntax tree node kinds.
///
/// Child layout is fixed per kind, see [`NodeKind::arity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    // ───────────────────────────── Statements ─────────────────────────────
    /// `[left, right]`; the left part may itself be a list.
    StatementList,
    /// `;`
    EmptyStatement,
    /// `[expression]`, value discarded.
    ExpressionStatement,
    /// `[expression]`
    PrintStatement,
    /// `input var;` (symbol only)
    InputStatement,
    /// `[condition, then]`
    IfThen,
    /// `[condition, then, else]`
    IfThenElse,
    /// Placeholder for a statement that failed to parse.
    ErrorStatement,

    // ───────────────────────────── Expressions ────────────────────────────
    /// `[left, right]`
    Equals,
    /// `[value]`, target variable in the symbol.
    Assign,
    /// `[left, right]`
    Add,
    Identifier,
    StringConstant,
    IntegerConstant,
    /// `[operand]`, inserted by the semantic checks.
    CoerceToString,
    /// `[operand]`, inserted by the semantic checks.
    CoerceToInteger,
}

impl NodeKind {
    pub fn arity(self) -> usize {
        use NodeKind::*;
        match self {
            StatementList => 2,
            EmptyStatement => 0,
            ExpressionStatement => 1,
            PrintStatement => 1,
            InputStatement => 0,
            IfThen => 2,
            IfThenElse => 3,
            ErrorStatement => 0,
            Equals => 2,
            Assign => 1,
            Add => 2,
            Identifier | StringConstant | IntegerConstant => 0,
            CoerceToString | CoerceToInteger => 1,
        }
    }

    pub fn name(self) -> &'static str {
        use NodeKind::*;
        match self {
            StatementList => "statement_list",
            EmptyStatement => "empty_statement",
            ExpressionStatement => "expression_statement",
            PrintStatement => "print_statement",
            InputStatement => "input_statement",
            IfThen => "if_then_statement",
            IfThenElse => "if_then_else_statement",
            ErrorStatement => "error_statement",
            Equals => "equals",
            Assign => "assign",
            Add => "add",
            Identifier => "identifier",
            StringConstant => "string_constant",
            IntegerConstant => "integer_value",
            CoerceToString => "coercion_to_string",
            CoerceToInteger => "coercion_to_integer",
        }
    }

    pub fn is_statement(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            StatementList
                | EmptyStatement
                | ExpressionStatement
                | PrintStatement
                | InputStatement
                | IfThen
                | IfThenElse
                | ErrorStatement
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub ty: DataType,
    pub symbol: Option<SymbolId>,
    pub children: Vec<NodeId>,
    pub line: usize,
}

/// Arena holding every node of one program.
///
/// Nodes are only created through the constructor methods, which type the
/// node and run its semantic checks on the spot. Types are never revisited.
#[derive(Debug, Default, Clone)]
pub struct SyntaxTree {
    nodes: Vec<TreeNode>,
    line: usize,
}

impl Index<NodeId> for SyntaxTree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            line: 1,
        }
    }

    /// Source line stamped on nodes built from now on (and on their errors).
    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── statements ──────────────────────────────────────────────────────

    pub fn statement_list(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.push(NodeKind::StatementList, DataType::Void, None, vec![left, right])
    }

    pub fn empty_statement(&mut self) -> NodeId {
        self.push(NodeKind::EmptyStatement, DataType::Void, None, Vec::new())
    }

    pub fn expression_statement(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::ExpressionStatement, DataType::Void, None, vec![expr])
    }

    pub fn print_statement(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::PrintStatement, DataType::Void, None, vec![expr])
    }

    pub fn input_statement(&mut self, var: SymbolId) -> NodeId {
        self.push(NodeKind::InputStatement, DataType::Void, Some(var), Vec::new())
    }

    pub fn if_then(&mut self, cond: NodeId, then: NodeId, diag: &mut Diagnostics) -> NodeId {
        self.check_condition(cond, diag);
        self.push(NodeKind::IfThen, DataType::Void, None, vec![cond, then])
    }

    pub fn if_then_else(
        &mut self,
        cond: NodeId,
        then: NodeId,
        otherwise: NodeId,
        diag: &mut Diagnostics,
    ) -> NodeId {
        self.check_condition(cond, diag);
        self.push(
            NodeKind::IfThenElse,
            DataType::Void,
            None,
            vec![cond, then, otherwise],
        )
    }

    pub fn error_statement(&mut self) -> NodeId {
        self.push(NodeKind::ErrorStatement, DataType::Void, None, Vec::new())
    }

    // ── expressions ─────────────────────────────────────────────────────

    /// Equality never coerces: both sides must already have the same type.
    pub fn equals(&mut self, left: NodeId, right: NodeId, diag: &mut Diagnostics) -> NodeId {
        let (lt, rt) = (self[left].ty, self[right].ty);
        if lt != rt {
            diag.error(
                self.line,
                DiagnosticKind::EqualityTypeMismatch {
                    left: lt,
                    right: rt,
                },
            );
        }
        self.push(NodeKind::Equals, DataType::Bool, None, vec![left, right])
    }

    pub fn assign(&mut self, var: SymbolId, value: NodeId) -> NodeId {
        let ty = self[value].ty;
        self.push(NodeKind::Assign, ty, Some(var), vec![value])
    }

    /// The left operand's type wins; only the right operand is ever coerced.
    pub fn add(&mut self, left: NodeId, right: NodeId, diag: &mut Diagnostics) -> NodeId {
        let ty = self[left].ty;
        let right = match ty {
            DataType::String => self.coerce_to_string(right).unwrap_or_else(|found| {
                diag.error(self.line, DiagnosticKind::CannotCoerceToString(found));
                right
            }),
            DataType::Integer => self.coerce_to_integer(right).unwrap_or_else(|found| {
                diag.error(self.line, DiagnosticKind::CannotCoerceToInteger(found));
                right
            }),
            other => {
                diag.error(self.line, DiagnosticKind::BadAdditionOperand(other));
                right
            }
        };
        let ty = match ty {
            DataType::String | DataType::Integer => ty,
            _ => DataType::Unknown,
        };
        self.push(NodeKind::Add, ty, None, vec![left, right])
    }

    /// Identifiers are statically strings; their real type is only known
    /// when the VM runs.
    pub fn identifier(&mut self, symbol: SymbolId) -> NodeId {
        self.push(NodeKind::Identifier, DataType::String, Some(symbol), Vec::new())
    }

    pub fn string_constant(&mut self, symbol: SymbolId) -> NodeId {
        self.push(NodeKind::StringConstant, DataType::String, Some(symbol), Vec::new())
    }

    pub fn integer_constant(&mut self, symbol: SymbolId) -> NodeId {
        self.push(NodeKind::IntegerConstant, DataType::Integer, Some(symbol), Vec::new())
    }

    // ── semantic helpers ────────────────────────────────────────────────

    fn check_condition(&self, cond: NodeId, diag: &mut Diagnostics) {
        let ty = self[cond].ty;
        if ty != DataType::Bool {
            diag.error(self.line, DiagnosticKind::ConditionNotBoolean(ty));
        }
    }

    /// Returns the (possibly wrapped) operand, or the offending type.
    fn coerce_to_string(&mut self, child: NodeId) -> Result<NodeId, DataType> {
        match self[child].ty {
            DataType::String => Ok(child),
            DataType::Integer | DataType::Bool => Ok(self.push(
                NodeKind::CoerceToString,
                DataType::String,
                None,
                vec![child],
            )),
            other => Err(other),
        }
    }

    fn coerce_to_integer(&mut self, child: NodeId) -> Result<NodeId, DataType> {
        match self[child].ty {
            DataType::Integer => Ok(child),
            DataType::String | DataType::Bool => Ok(self.push(
                NodeKind::CoerceToInteger,
                DataType::Integer,
                None,
                vec![child],
            )),
            other => Err(other),
        }
    }

    fn push(
        &mut self,
        kind: NodeKind,
        ty: DataType,
        symbol: Option<SymbolId>,
        children: Vec<NodeId>,
    ) -> NodeId {
        debug_assert_eq!(children.len(), kind.arity(), "{} arity", kind.name());
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            kind,
            ty,
            symbol,
            children,
            line: self.line,
        });
        id
    }

    /// Indented dump of the subtree under `root`.
    pub fn display<'a>(&'a self, root: NodeId, symbols: &'a SymbolTable) -> TreeDisplay<'a> {
        TreeDisplay {
            tree: self,
            root,
            symbols,
        }
    }
}

pub struct TreeDisplay<'a> {
    tree: &'a SyntaxTree,
    root: NodeId,
    symbols: &'a SymbolTable,
}

impl TreeDisplay<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, level: usize) -> fmt::Result {
        let node = &self.tree[id];

        // statement lists are flattened into their parent's level
        let next_level = if node.kind == NodeKind::StatementList {
            level
        } else {
            write!(f, "{}{}", "   ".repeat(level), node.kind.name())?;
            if let Some(symbol) = node.symbol.and_then(|s| self.symbols.get(s)) {
                match node.kind {
                    NodeKind::StringConstant => write!(f, " ({:?})", symbol.string)?,
                    NodeKind::IntegerConstant => write!(f, " ({})", symbol.integer)?,
                    _ => write!(f, " ({})", symbol.name)?,
                }
            }
            writeln!(f)?;
            level + 1
        };

        for &child in &node.children {
            self.write_node(f, child, next_level)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

        fn ident(&mut self, name: &str) -> NodeId {
            let s = self.sym(Symbol::identifier(name, 1));
            self.tree.identifier(s)
        }

        fn int(&mut self, n: i64) -> NodeId {
            let s = self.sym(Symbol::integer_constant(n.to_string(), n, 1));
            self.tree.integer_constant(s)
        }

        fn string(&mut self, text: &str) -> NodeId {
            let s = self.sym(Symbol::string_constant(format!("{:?}", text), text, 1));
            self.tree.string_constant(s)
        }

        fn equals(&mut self, a: NodeId, b: NodeId) -> NodeId {
            self.tree.equals(a, b, &mut self.diag)
        }

        fn add(&mut self, a: NodeId, b: NodeId) -> NodeId {
            self.tree.add(a, b, &mut self.diag)
        }
    }

    #[test]
    fn test_leaf_types() {
        let mut fx = Fixture::new();
        let x = fx.ident("x");
        let s = fx.string("hi");
        let n = fx.int(3);
        assert_eq!(fx.tree[x].ty, DataType::String);
        assert_eq!(fx.tree[s].ty, DataType::String);
        assert_eq!(fx.tree[n].ty, DataType::Integer);
        assert!(fx.diag.is_empty());
    }

    #[test]
    fn test_statements_are_void() {
        let mut fx = Fixture::new();
        let n = fx.int(1);
        let p = fx.tree.print_statement(n);
        let e = fx.tree.empty_statement();
        let l = fx.tree.statement_list(p, e);
        for id in [p, e, l] {
            assert_eq!(fx.tree[id].ty, DataType::Void);
            assert!(fx.tree[id].kind.is_statement());
        }
    }

    #[test]
    fn test_add_string_coerces_integer_right() {
        let mut fx = Fixture::new();
        let s = fx.string("n=");
        let n = fx.int(4);
        let add = fx.add(s, n);

        let node = &fx.tree[add];
        assert_eq!(node.ty, DataType::String);
        let right = &fx.tree[node.children[1]];
        assert_eq!(right.kind, NodeKind::CoerceToString);
        assert_eq!(right.ty, DataType::String);
        assert_eq!(right.children, vec![n]);
        assert!(fx.diag.is_empty());
    }

    #[test]
    fn test_add_integer_coerces_string_right() {
        let mut fx = Fixture::new();
        let n = fx.int(4);
        let x = fx.ident("x");
        let add = fx.add(n, x);

        let node = &fx.tree[add];
        assert_eq!(node.ty, DataType::Integer);
        assert_eq!(fx.tree[node.children[1]].kind, NodeKind::CoerceToInteger);
        assert_eq!(fx.tree[node.children[1]].ty, DataType::Integer);
    }

    #[test]
    fn test_add_never_coerces_left() {
        let mut fx = Fixture::new();
        let x = fx.ident("x");
        let n = fx.int(3);
        let add = fx.add(x, n);
        let node = &fx.tree[add];
        assert_eq!(node.children[0], x);
        assert_eq!(node.ty, DataType::String);
    }

    #[test]
    fn test_add_coerces_bool_right() {
        let mut fx = Fixture::new();
        let a = fx.int(1);
        let b = fx.int(2);
        let eq = fx.equals(a, b);
        let s = fx.string("result: ");
        let add = fx.add(s, eq);
        let right = fx.tree[add].children[1];
        assert_eq!(fx.tree[right].kind, NodeKind::CoerceToString);
        assert!(fx.diag.is_empty());
    }

    #[test]
    fn test_add_with_bool_left_is_an_error() {
        let mut fx = Fixture::new();
        let a = fx.int(1);
        let b = fx.int(2);
        let eq = fx.equals(a, b);
        let c = fx.int(3);
        let add = fx.add(eq, c);
        assert_eq!(fx.tree[add].ty, DataType::Unknown);
        assert_eq!(fx.diag.count(), 1);
        assert!(matches!(
            fx.diag.iter().next().unwrap().kind,
            DiagnosticKind::BadAdditionOperand(DataType::Bool)
        ));
    }

    #[test]
    fn test_equality_requires_same_types() {
        let mut fx = Fixture::new();
        let x = fx.ident("x");
        let n = fx.int(5);
        let eq = fx.equals(x, n);
        // still built, still typed
        assert_eq!(fx.tree[eq].ty, DataType::Bool);
        assert_eq!(fx.tree[eq].children, vec![x, n]);
        assert_eq!(fx.diag.count(), 1);
    }

    #[test]
    fn test_if_condition_must_be_bool() {
        let mut fx = Fixture::new();
        let n = fx.int(1);
        let body = fx.tree.empty_statement();
        let stmt = fx.tree.if_then(n, body, &mut fx.diag);
        assert_eq!(fx.tree[stmt].kind, NodeKind::IfThen);
        assert_eq!(fx.diag.count(), 1);
        assert!(
            fx.diag
                .iter()
                .next()
                .unwrap()
                .to_string()
                .contains("condition should be boolean")
        );
    }

    #[test]
    fn test_if_else_with_bool_condition() {
        let mut fx = Fixture::new();
        let a = fx.string("a");
        let b = fx.string("b");
        let cond = fx.equals(a, b);
        let t = fx.tree.empty_statement();
        let e = fx.tree.empty_statement();
        let stmt = fx.tree.if_then_else(cond, t, e, &mut fx.diag);
        assert_eq!(fx.tree[stmt].children.len(), 3);
        assert!(fx.diag.is_empty());
    }

    #[test]
    fn test_assign_mirrors_value_type() {
        let mut fx = Fixture::new();
        let x = fx.sym(Symbol::identifier("x", 1));
        let n = fx.int(5);
        let a = fx.tree.assign(x, n);
        assert_eq!(fx.tree[a].ty, DataType::Integer);
        assert_eq!(fx.tree[a].symbol, Some(x));
    }

    #[test]
    fn test_nodes_record_line() {
        let mut fx = Fixture::new();
        fx.tree.set_line(7);
        let e = fx.tree.empty_statement();
        assert_eq!(fx.tree[e].line, 7);
    }

    #[test]
    fn test_display_dump() {
        let mut fx = Fixture::new();
        let x = fx.sym(Symbol::identifier("x", 1));
        let n = fx.int(5);
        let a = fx.tree.assign(x, n);
        let st = fx.tree.expression_statement(a);
        let s = fx.string("hi");
        let p = fx.tree.print_statement(s);
        let root = fx.tree.statement_list(st, p);

        let dump = fx.tree.display(root, &fx.symbols).to_string();
        assert_eq!(
            dump,
            "expression_statement\n   assign (x)\n      integer_value (5)\nprint_statement\n   string_constant (\"hi\")\n"
        );
    }
}
