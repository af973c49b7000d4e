use std::fmt;

/// A single instruction byte as fetched from a program.
///
/// The cursor assigns meaning to exactly one value, [`Opcode::RETURN`].
/// Everything else is opaque here and interpreted by whoever dispatches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Opcode(pub u8);

impl Opcode {
    /// Terminal opcode. Also what the cursor yields once it runs past the
    /// last usable byte of a program, so the two cases look the same.
    pub const RETURN: Opcode = Opcode(0x66);

    #[inline(always)]
    pub fn is_return(self) -> bool {
        self == Self::RETURN
    }

    #[inline(always)]
    pub fn byte(self) -> u8 {
        self.0
    }
}

impl From<u8> for Opcode {
    fn from(byte: u8) -> Self {
        Opcode(byte)
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.0
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_return() {
            write!(f, "RET")
        } else {
            write!(f, "0x{:02X}", self.0)
        }
    }
}
