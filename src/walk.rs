use std::fmt::Write;

use crate::cursor::InstructionCursor;
use crate::layout::{Layout, Operand};
use crate::opcode::Opcode;

/// Limits for a decode walk.
#[derive(Clone, Debug)]
pub struct WalkConfig {
    /// Maximum number of opcodes fetched before giving up.
    pub max_steps: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_steps: 1 << 16, // 65536
        }
    }
}

/// One fetched opcode together with the operands read after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// Position of the opcode. Past the end of the program for a fallback `RETURN`.
    pub offset: usize,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A `RETURN` was fetched, either encoded or from running off the end.
    Return,
    /// `max_steps` opcodes were fetched without reaching a `RETURN`.
    StepLimit,
}

/// Result of decoding a program from the start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Walk {
    pub instructions: Vec<Decoded>,
    pub steps: usize,
    pub stop: StopReason,
    pub final_position: usize,
}

/// Decode `program` opcode by opcode, reading operands as `layout` says.
///
/// This only decodes; nothing is executed. Because failed operand reads do
/// not advance, a truncated program can stall on the same position, and
/// `max_steps` is what guarantees termination.
pub fn walk(program: &[u8], layout: &Layout, config: &WalkConfig) -> Walk {
    let mut cursor = InstructionCursor::new(program);
    let mut instructions = Vec::new();
    let mut stop = StopReason::StepLimit;

    while instructions.len() < config.max_steps {
        let offset = cursor.position();
        let opcode = cursor.fetch_next_opcode();
        let operands = layout
            .operands(opcode)
            .iter()
            .map(|kind| kind.read(&mut cursor))
            .collect();
        instructions.push(Decoded {
            offset,
            opcode,
            operands,
        });
        if opcode.is_return() {
            stop = StopReason::Return;
            break;
        }
    }

    let steps = instructions.len();
    tracing::debug!(
        len = program.len(),
        steps,
        stop = ?stop,
        final_position = cursor.position(),
        "walk finished"
    );

    Walk {
        instructions,
        steps,
        stop,
        final_position: cursor.position(),
    }
}

/// Pretty-print the decoded instructions of `program`, one per line.
pub fn disassemble(program: &[u8], layout: &Layout, config: &WalkConfig) -> String {
    let walk = walk(program, layout, config);
    let mut out = String::new();
    for inst in &walk.instructions {
        let _ = write!(out, "{:04X}: {}", inst.offset, inst.opcode);
        for operand in &inst.operands {
            let _ = write!(out, " {operand}");
        }
        out.push('\n');
    }
    if walk.stop == StopReason::StepLimit {
        let _ = writeln!(out, "; step limit {} reached", config.max_steps);
    }
    out
}
