//! Disassembly listing text.
//!
//! Formats instructions the way the bridge returns them to clients: one
//! instruction per line, `address:\ttext`, in ascending address order.

use crate::analysis::InstructionLine;

/// Format a single disassembly line.
pub fn format_disasm_line(line: &InstructionLine) -> String {
    format!("{:#x}:\t{}", line.address, line.text.trim_end())
}

/// Render a full listing. Instructions are sorted by address; exact
/// duplicates (an instruction reported by two overlapping blocks) are dropped.
pub fn render_listing(mut lines: Vec<InstructionLine>) -> String {
    lines.sort_by_key(|l| l.address);
    lines.dedup();
    lines
        .iter()
        .map(format_disasm_line)
        .collect::<Vec<_>>()
        .join("\n")
}
