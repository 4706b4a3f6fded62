use serde::{Deserialize, Serialize};

/// One runtime value slot.
///
/// Booleans never live in cells; they travel on the stack as
/// [`StackValue::Bool`](crate::runtime::vm_bc::StackValue).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Released and available for reuse.
    #[default]
    Free,

    /// Active, but nothing has been stored yet (a variable before its first
    /// assignment or input).
    Unknown,

    Str(String),

    Int(i64),
}

impl Cell {
    pub fn is_free(&self) -> bool {
        matches!(self, Cell::Free)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Free => "free",
            Cell::Unknown => "unknown",
            Cell::Str(_) => "string",
            Cell::Int(_) => "integer",
        }
    }
}

/// Parses the leading integer of `text` the way C's `atoi` does: optional
/// leading whitespace, an optional sign, then digits up to the first
/// non-digit. No digits yields 0. Out-of-range values saturate.
pub fn leading_int(text: &str) -> i64 {
    let rest = text.trim_start();
    let (negative, digits) = match rest.as_bytes().first() {
        Some(b'-') => (true, &rest[1..]),
        Some(b'+') => (false, &rest[1..]),
        _ => (false, rest),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = i64::from(b - b'0');
        // accumulate on the sign's side so i64::MIN is reachable
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    value
}

/// Growable arena of cells with first-fit reuse.
#[derive(Debug, Default, Clone)]
pub struct CellPool {
    cells: Vec<Cell>,
}

impl CellPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        CellPool { cells }
    }

    /// Stores `cell` in the first free slot, growing the pool by one only
    /// when every slot is active.
    pub fn alloc(&mut self, cell: Cell) -> usize {
        match self.cells.iter().position(Cell::is_free) {
            Some(i) => {
                self.cells[i] = cell;
                i
            }
            None => {
                self.cells.push(cell);
                self.cells.len() - 1
            }
        }
    }

    /// Returns the cell at `index` unless it is out of range or free.
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index).filter(|c| !c.is_free())
    }

    /// Overwrites an existing slot. Returns `false` if `index` is out of range.
    pub fn set(&mut self, index: usize, cell: Cell) -> bool {
        match self.cells.get_mut(index) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = Cell::Free;
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn active(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_free()).count()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("42"), 42);
        assert_eq!(leading_int("  -17abc"), -17);
        assert_eq!(leading_int("+8"), 8);
        assert_eq!(leading_int("5 apples"), 5);
    }

    #[test]
    fn test_leading_int_without_digits_is_zero() {
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int("-"), 0);
        assert_eq!(leading_int("x12"), 0);
    }

    #[test]
    fn test_leading_int_saturates() {
        assert_eq!(leading_int("99999999999999999999"), i64::MAX);
        assert_eq!(leading_int("-99999999999999999999"), i64::MIN);
        assert_eq!(leading_int(&i64::MIN.to_string()), i64::MIN);
    }

    #[test]
    fn test_alloc_grows_when_full() {
        let mut pool = CellPool::from_cells(vec![Cell::Int(1), Cell::Unknown]);
        assert_eq!(pool.alloc(Cell::Int(2)), 2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_alloc_reuses_first_free_slot() {
        let mut pool = CellPool::new();
        let a = pool.alloc(Cell::Int(1));
        let b = pool.alloc(Cell::Int(2));
        let c = pool.alloc(Cell::Int(3));
        pool.release(c);
        pool.release(a);

        // lowest free index first, and no growth
        assert_eq!(pool.alloc(Cell::Str("x".into())), a);
        assert_eq!(pool.alloc(Cell::Str("y".into())), c);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(b), Some(&Cell::Int(2)));
    }

    #[test]
    fn test_get_hides_free_cells() {
        let mut pool = CellPool::new();
        let a = pool.alloc(Cell::Int(1));
        pool.release(a);
        assert!(pool.get(a).is_none());
        assert!(pool.get(99).is_none());
        assert_eq!(pool.active(), 0);
    }

    #[test]
    fn test_set_out_of_range() {
        let mut pool = CellPool::new();
        assert!(!pool.set(0, Cell::Unknown));
        pool.alloc(Cell::Unknown);
        assert!(pool.set(0, Cell::Int(3)));
        assert_eq!(pool.get(0), Some(&Cell::Int(3)));
    }
}
