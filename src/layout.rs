use std::fmt;
use std::str::FromStr;

use crate::cursor::InstructionCursor;
use crate::opcode::Opcode;

/// One operand that follows an opcode in the encoded program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    U8,
    U16,
    U32,
    /// Fixed-size raw block.
    Bytes(usize),
    /// One length byte followed by that many raw bytes.
    VarBytes,
}

/// A decoded operand value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Int(u32),
    /// `None` when the block ran past the end of the program.
    Bytes(Option<Vec<u8>>),
}

impl OperandKind {
    /// Read this operand through the cursor. Fallback values pass through as-is.
    pub fn read(self, cursor: &mut InstructionCursor<'_>) -> Operand {
        match self {
            OperandKind::U8 => Operand::Int(cursor.read_u8() as u32),
            OperandKind::U16 => Operand::Int(cursor.read_u16() as u32),
            OperandKind::U32 => Operand::Int(cursor.read_u32()),
            OperandKind::Bytes(n) => Operand::Bytes(cursor.read_raw_bytes(n)),
            OperandKind::VarBytes => Operand::Bytes(cursor.read_length_prefixed_bytes()),
        }
    }
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::U8 => write!(f, "u8"),
            OperandKind::U16 => write!(f, "u16"),
            OperandKind::U32 => write!(f, "u32"),
            OperandKind::Bytes(n) => write!(f, "bytes:{n}"),
            OperandKind::VarBytes => write!(f, "var"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "${v:X}"),
            Operand::Bytes(None) => write!(f, "<truncated>"),
            Operand::Bytes(Some(bytes)) => {
                write!(f, "[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{b:02X}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("expected '<opcode>=<kind>[,<kind>...]', got '{0}'")]
    MissingEquals(String),
    #[error("invalid opcode '{0}'")]
    InvalidOpcode(String),
    #[error("unknown operand kind '{0}' (expected u8, u16, u32, bytes:N or var)")]
    UnknownKind(String),
}

impl FromStr for OperandKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "u8" => Ok(OperandKind::U8),
            "u16" => Ok(OperandKind::U16),
            "u32" => Ok(OperandKind::U32),
            "var" => Ok(OperandKind::VarBytes),
            other => other
                .strip_prefix("bytes:")
                .and_then(|n| n.parse::<usize>().ok())
                .map(OperandKind::Bytes)
                .ok_or_else(|| LayoutError::UnknownKind(other.to_string())),
        }
    }
}

fn parse_opcode(s: &str) -> Result<Opcode, LayoutError> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed
        .map(Opcode)
        .map_err(|_| LayoutError::InvalidOpcode(s.to_string()))
}

/// Operand plan for every opcode value. Opcodes with no entry take no operands.
#[derive(Clone, Debug)]
pub struct Layout {
    table: Vec<Vec<OperandKind>>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            table: vec![Vec::new(); 256],
        }
    }
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, opcode: Opcode, operands: Vec<OperandKind>) {
        self.table[opcode.byte() as usize] = operands;
    }

    pub fn operands(&self, opcode: Opcode) -> &[OperandKind] {
        &self.table[opcode.byte() as usize]
    }

    /// Apply one `"<opcode>=<kind>[,<kind>...]"` entry, e.g. `0x01=u16,var`.
    /// An empty right-hand side clears the entry.
    pub fn apply_spec(&mut self, spec: &str) -> Result<(), LayoutError> {
        let (op, kinds) = spec
            .split_once('=')
            .ok_or_else(|| LayoutError::MissingEquals(spec.to_string()))?;
        let opcode = parse_opcode(op)?;
        let operands = kinds
            .split(',')
            .filter(|k| !k.trim().is_empty())
            .map(str::parse::<OperandKind>)
            .collect::<Result<Vec<_>, _>>()?;
        self.set(opcode, operands);
        Ok(())
    }

    pub fn from_specs<I, S>(specs: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut layout = Self::new();
        for spec in specs {
            layout.apply_spec(spec.as_ref())?;
        }
        Ok(layout)
    }
}
