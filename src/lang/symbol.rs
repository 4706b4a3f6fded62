//! # Symbol table
//!
//! Every identifier, string constant and integer constant a program mentions
//! is entered once, in the order the front end first meets it. That order is
//! significant: the bytecode compiler allocates one runtime cell per symbol in
//! exactly this order and records the cell's slot back onto the symbol.

use std::fmt;

/// Index of a symbol inside its [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Variable name.
    Identifier,
    /// String literal; the text lives in `Symbol::string`.
    StringConstant,
    /// Integer literal; the value lives in `Symbol::integer`.
    IntegerConstant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub string: String,
    pub integer: i64,
    /// Source line the symbol was first encountered on.
    pub line: usize,
    /// Runtime cell index, assigned by the bytecode compiler.
    pub slot: Option<usize>,
}

impl Symbol {
    pub fn identifier(name: impl Into<String>, line: usize) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Identifier,
            string: String::new(),
            integer: 0,
            line,
            slot: None,
        }
    }

    pub fn string_constant(name: impl Into<String>, text: impl Into<String>, line: usize) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::StringConstant,
            string: text.into(),
            integer: 0,
            line,
            slot: None,
        }
    }

    pub fn integer_constant(name: impl Into<String>, value: i64, line: usize) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::IntegerConstant,
            string: String::new(),
            integer: value,
            line,
            slot: None,
        }
    }
}

/// Insertion-ordered collection of uniquely named symbols.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `symbol`. Returns `false` (and leaves the table untouched) if a
    /// symbol with the same name already exists.
    pub fn add(&mut self, symbol: Symbol) -> bool {
        if self.find(&symbol.name).is_some() {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.symbols.iter().position(|s| s.name == name).map(SymbolId)
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0)
    }

    /// Records the runtime cell index of a symbol. Returns `false` for an
    /// unknown id.
    pub fn set_slot(&mut self, id: SymbolId, slot: usize) -> bool {
        match self.symbols.get_mut(id.0) {
            Some(symbol) => {
                symbol.slot = Some(slot);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i), s))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+----------------------+------+")?;
        writeln!(f, "| Name                 | Line |")?;
        writeln!(f, "+----------------------+------+")?;

        for symbol in &self.symbols {
            write!(f, "| {:<20} | {:>4} | ", symbol.name, symbol.line)?;
            match symbol.kind {
                SymbolKind::StringConstant => writeln!(f, "= {:?}", symbol.string)?,
                SymbolKind::IntegerConstant => writeln!(f, "= {}", symbol.integer)?,
                SymbolKind::Identifier => writeln!(f, "<identifier>")?,
            }
        }

        writeln!(f, "+----------------------+------+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut t = SymbolTable::new();
        assert!(t.add(Symbol::identifier("x", 1)));
        assert!(t.add(Symbol::string_constant("\"hi\"", "hi", 1)));
        assert!(t.add(Symbol::integer_constant("5", 5, 2)));
        t
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut t = table();
        assert!(!t.add(Symbol::identifier("x", 9)));
        assert_eq!(t.len(), 3);
        // the original entry is untouched
        assert_eq!(t.find("x").unwrap().line, 1);
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let t = table();
        let names: Vec<_> = t.iter().map(|(_, s)| s.name.as_str()).collect();
        assert_eq!(names, vec!["x", "\"hi\"", "5"]);
    }

    #[test]
    fn test_find_and_lookup() {
        let t = table();
        assert_eq!(t.find("5").unwrap().integer, 5);
        assert_eq!(t.lookup("\"hi\""), Some(SymbolId(1)));
        assert!(t.find("y").is_none());
        assert!(t.lookup("y").is_none());
    }

    #[test]
    fn test_set_slot() {
        let mut t = table();
        assert!(t.set_slot(SymbolId(2), 7));
        assert_eq!(t.get(SymbolId(2)).unwrap().slot, Some(7));
        assert!(!t.set_slot(SymbolId(3), 0));
    }

    #[test]
    fn test_display_dump() {
        let dump = table().to_string();
        assert!(dump.contains("| x                    |    1 | <identifier>"));
        assert!(dump.contains("= \"hi\""));
        assert!(dump.contains("|    2 | = 5"));
    }
}
