use crate::bytecode::{Op, ProgramBc};
use crate::runtime::cell::Cell;
use std::collections::HashMap;
use std::fmt::Write;

/// Print disassembly of a bytecode program
pub fn print_bc(bc: &ProgramBc) {
    print!("{}", disassemble_program(bc));
}

/// Return disassembly of a whole program (cells, then code) as a String
pub fn disassemble_program(bc: &ProgramBc) -> String {
    let mut output = String::new();

    output.push_str("════════════════════════════════════════\n");
    output.push_str(&format!(" cells ({})\n", bc.cells.len()));
    output.push_str("════════════════════════════════════════\n");
    for (slot, cell) in bc.cells.iter().enumerate() {
        output.push_str(&format!("  [{:>3}] {}\n", slot, format_cell(cell)));
    }
    output.push('\n');

    output.push_str("════════════════════════════════════════\n");
    output.push_str(&format!(" main\n {} instructions\n", bc.ops.len()));
    output.push_str("════════════════════════════════════════\n");
    output.push_str(&disassemble_to_string(&bc.ops));
    output
}

fn collect_jump_targets(ops: &[Op]) -> Vec<usize> {
    let mut targets = Vec::new();

    for (ip, op) in ops.iter().enumerate() {
        if let Some(offset) = op.jump_offset() {
            let target = (ip as i64 + i64::from(offset)) as usize;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}

/// Return disassembly as a String
pub fn disassemble_to_string(ops: &[Op]) -> String {
    let mut output = String::new();
    let jump_targets = collect_jump_targets(ops);

    for (ip, op) in ops.iter().enumerate() {
        if jump_targets.contains(&ip) {
            output.push_str("      ┌──────────────────────────────────\n");
        }

        output.push_str(&format!("{:04} ", ip));

        if jump_targets.contains(&ip) {
            output.push_str("► ");
        } else {
            output.push_str("  ");
        }

        output.push_str(&format_op(op, ip));
        output.push('\n');
    }

    // a jump past the last instruction ends the program
    if jump_targets.contains(&ops.len()) {
        output.push_str("      ┌──────────────────────────────────\n");
        output.push_str(&format!("{:04} ► END\n", ops.len()));
    }

    output
}

fn format_op(op: &Op, ip: usize) -> String {
    match op {
        Op::Push(slot) => format!("PUSH        [{}]", slot),
        Op::GetTop(slot) => format!("GETTOP      [{}]   ; ( a -- a )", slot),
        Op::Input(slot) => format!("INPUT       [{}]", slot),
        Op::Jump(offset) => {
            let target = ip as i64 + i64::from(*offset);
            format!("JMP         {:+} (→ {:04})", offset, target)
        }
        Op::JumpIfFalse(offset) => {
            let target = ip as i64 + i64::from(*offset);
            format!("JMPF        {:+} (→ {:04})", offset, target)
        }
        Op::Discard => "DISCARD     ; ( a -- )".to_string(),
        Op::Print => "PRINT       ; ( a -- )".to_string(),
        Op::Equal => "EQUAL       ; ( a b -- bool )".to_string(),
        Op::BoolEqual => "BOOL_EQUAL  ; ( bool bool -- bool )".to_string(),
        Op::Add => "ADD         ; ( a b -- a+b )".to_string(),
        other => other.name().to_string(),
    }
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Free => "<free>".to_string(),
        Cell::Unknown => "<unset>".to_string(),
        Cell::Str(s) => format!("{:?}", s),
        Cell::Int(n) => n.to_string(),
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Return bytecode statistics as a String
pub fn bc_stats(bc: &ProgramBc) -> String {
    let mut out = String::new();
    let total = bc.ops.len();

    // writing into a String cannot fail
    let _ = writeln!(out, "Instructions: {}", total);
    let _ = writeln!(out, "Cells:        {}", bc.cells.len());

    let counts = count_ops(&bc.ops);
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let _ = writeln!(out, "Op frequency:");
    for (op, count) in counts {
        let pct = (count as f64 / total as f64) * 100.0;
        let _ = writeln!(out, "  {:<12} {:>4} ({:>5.1}%)", op, count, pct);
    }
    out
}

fn count_ops(ops: &[Op]) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for op in ops {
        *counts.entry(op.name()).or_insert(0) += 1;
    }
    counts
}
