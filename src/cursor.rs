use crate::opcode::Opcode;

/// Unsigned little-endian integers the cursor can read as fixed-width operands.
pub trait FixedWidth: Copy {
    /// Number of program bytes consumed by one read.
    const WIDTH: usize;
    /// Value returned when the read would run past the end of the program.
    const ZERO: Self;

    /// Decode from exactly `WIDTH` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($($t:ty),*) => {
        $(
            impl FixedWidth for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();
                const ZERO: Self = 0;

                #[inline(always)]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_fixed_width!(u8, u16, u32);

/// Forward-only decoding cursor over an encoded program.
///
/// None of the reads fail. Reading past the end gives a fallback value:
/// - `fetch_next_opcode` gives [`Opcode::RETURN`] and still advances by one.
/// - fixed-width reads give `0` and do not advance.
/// - raw and length-prefixed reads give `None` and do not advance.
///
/// The position only ever increases and may end up past the end of the
/// program. A caller that keeps reading operands from a truncated program
/// sees zeros at the same position forever, so bounding the number of steps
/// is up to the caller.
#[derive(Clone, Debug)]
pub struct InstructionCursor<'a> {
    program: &'a [u8],
    position: usize,
}

impl<'a> InstructionCursor<'a> {
    pub fn new(program: &'a [u8]) -> Self {
        Self { program, position: 0 }
    }

    /// Offset of the next unread byte. Can be greater than the program length.
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline(always)]
    pub fn program(&self) -> &'a [u8] {
        self.program
    }

    /// Bytes left between the position and the end of the program.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.program.len().saturating_sub(self.position)
    }

    /// Fetch the opcode at the current position and advance by one.
    ///
    /// The last byte of the program is never fetched: once the position
    /// reaches `len - 1` this returns [`Opcode::RETURN`] without touching the
    /// buffer. An empty program yields `RETURN` from the first call on.
    pub fn fetch_next_opcode(&mut self) -> Opcode {
        let opcode = if self.position >= self.program.len().saturating_sub(1) {
            tracing::trace!(
                position = self.position,
                len = self.program.len(),
                "fetch past safety boundary, yielding RETURN"
            );
            Opcode::RETURN
        } else {
            Opcode(self.program[self.position])
        };
        self.position = self.position.saturating_add(1);
        opcode
    }

    /// Read a little-endian unsigned integer of `W::WIDTH` bytes.
    pub fn read_fixed_width<W: FixedWidth>(&mut self) -> W {
        match self.span(W::WIDTH) {
            Some(bytes) => {
                let value = W::from_le_slice(bytes);
                self.position += W::WIDTH;
                value
            }
            None => {
                tracing::trace!(
                    position = self.position,
                    width = W::WIDTH,
                    len = self.program.len(),
                    "fixed-width read out of range, yielding 0"
                );
                W::ZERO
            }
        }
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> u8 {
        self.read_fixed_width::<u8>()
    }

    #[inline(always)]
    pub fn read_u16(&mut self) -> u16 {
        self.read_fixed_width::<u16>()
    }

    #[inline(always)]
    pub fn read_u32(&mut self) -> u32 {
        self.read_fixed_width::<u32>()
    }

    /// Copy the next `n` bytes out of the program.
    ///
    /// Returns `None` without advancing if fewer than `n` bytes remain.
    /// `n == 0` succeeds with an empty vector as long as the position is
    /// not past the end.
    pub fn read_raw_bytes(&mut self, n: usize) -> Option<Vec<u8>> {
        match self.span(n) {
            Some(bytes) => {
                let out = bytes.to_vec();
                self.position += n;
                Some(out)
            }
            None => {
                tracing::trace!(
                    position = self.position,
                    requested = n,
                    len = self.program.len(),
                    "raw read out of range"
                );
                None
            }
        }
    }

    /// Read a one-byte length `n`, then `n` raw bytes.
    ///
    /// A truncated length byte reads as 0, which makes the payload read an
    /// empty one. A truncated payload gives `None`, but the length byte stays
    /// consumed.
    pub fn read_length_prefixed_bytes(&mut self) -> Option<Vec<u8>> {
        let n = self.read_u8();
        self.read_raw_bytes(n as usize)
    }

    /// The `n` bytes at the current position, if they all lie in the program.
    #[inline(always)]
    fn span(&self, n: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(n)?;
        self.program.get(self.position..end)
    }
}
