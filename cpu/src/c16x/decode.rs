//! Instruction fetch fields.
//!
//! C16x instructions are two or four bytes long.  The first byte is
//! the opcode; most instructions use the second byte either as two
//! register nibbles (`n:m`), as a short `reg` address, or as a
//! condition code plus register.  Four-byte instructions carry a
//! 16-bit memory address or immediate in bytes 2 and 3 (little
//! endian).
use std::fmt::{self, Display, Formatter};

/// The length in bytes of the instruction whose first byte is
/// `opcode`.  The length depends only on the low nibble, with no
/// exceptions across the whole opcode map.
pub const fn instruction_length(opcode: u8) -> u8 {
    match opcode & 0x0F {
        0x2 | 0x3 | 0x4 | 0x5 | 0x6 | 0x7 | 0xA => 4,
        _ => 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    bytes: [u8; 4],
}

impl Instruction {
    pub fn new(bytes: [u8; 4]) -> Instruction {
        Instruction { bytes }
    }

    /// Assemble an instruction from the (at most two) 16-bit words
    /// fetched from code memory.
    pub fn from_words(first: u16, second: u16) -> Instruction {
        let [b0, b1] = first.to_le_bytes();
        let [b2, b3] = second.to_le_bytes();
        Instruction::new([b0, b1, b2, b3])
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    pub fn length(&self) -> u8 {
        instruction_length(self.opcode())
    }

    /// The second byte.
    #[inline]
    pub fn operand_byte(&self) -> u8 {
        self.bytes[1]
    }

    /// High nibble of the second byte; usually a destination register
    /// or a condition code.
    #[inline]
    pub fn n(&self) -> u8 {
        self.bytes[1] >> 4
    }

    /// Low nibble of the second byte; usually a source register.
    #[inline]
    pub fn m(&self) -> u8 {
        self.bytes[1] & 0x0F
    }

    /// The second byte as a short `reg` address.
    #[inline]
    pub fn reg(&self) -> u8 {
        self.bytes[1]
    }

    /// The second byte as a signed word displacement.
    #[inline]
    pub fn rel(&self) -> i8 {
        self.bytes[1] as i8
    }

    pub fn byte2(&self) -> u8 {
        self.bytes[2]
    }

    /// Bytes 2 and 3: a memory address or 16-bit immediate.
    #[inline]
    pub fn word(&self) -> u16 {
        u16::from_le_bytes([self.bytes[2], self.bytes[3]])
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let len = usize::from(self.length());
        for (i, b) in self.bytes[..len].iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}
