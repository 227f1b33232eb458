//! The C16x Processor Status Word.
//!
//! Bit positions match the hardware register (SFR `PSW` at 0FF10h) so
//! that raw values taken from memory dumps or snapshots can be turned
//! into a [`Psw`] and back without loss.
use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Psw: u16 {
        /// Negative result.
        const N = 1 << 0;
        /// Carry (for subtraction: borrow).
        const C = 1 << 1;
        /// Arithmetic overflow.
        const V = 1 << 2;
        /// Zero result.
        const Z = 1 << 3;
        /// "End of table": the value was the most negative number.
        const E = 1 << 4;
        /// Multiplication/division in progress.
        const MULIP = 1 << 5;
        /// General purpose user flag.
        const USR0 = 1 << 6;
        /// Hold enable (external bus arbitration).
        const HLDEN = 1 << 10;
        /// Global interrupt enable.
        const IEN = 1 << 11;
        /// CPU priority level (4 bits).
        const ILVL = 0xF << 12;

        /// The flags which the condition-code table depends on.
        const CONDITION_FLAGS = Self::N.bits()
            | Self::C.bits()
            | Self::V.bits()
            | Self::Z.bits()
            | Self::E.bits();
    }
}

impl Psw {
    /// Build a PSW from a raw register value, keeping reserved bits.
    pub const fn from_raw(raw: u16) -> Psw {
        Psw::from_bits_retain(raw)
    }

    pub const fn raw(self) -> u16 {
        self.bits()
    }

    pub const fn negative(self) -> bool {
        self.contains(Psw::N)
    }

    pub const fn carry(self) -> bool {
        self.contains(Psw::C)
    }

    pub const fn overflow(self) -> bool {
        self.contains(Psw::V)
    }

    pub const fn zero(self) -> bool {
        self.contains(Psw::Z)
    }

    pub const fn end_of_table(self) -> bool {
        self.contains(Psw::E)
    }

    pub const fn interrupts_enabled(self) -> bool {
        self.contains(Psw::IEN)
    }

    /// The five condition flags packed into the low bits, as used to
    /// index the condition-code table.
    pub const fn condition_bits(self) -> u8 {
        (self.bits() & Psw::CONDITION_FLAGS.bits()) as u8
    }

    pub const fn interrupt_level(self) -> u8 {
        ((self.bits() & Psw::ILVL.bits()) >> 12) as u8
    }

    pub fn set_interrupt_level(&mut self, level: u8) {
        let level_bits = (u16::from(level) << 12) & Psw::ILVL.bits();
        *self = Psw::from_bits_retain((self.bits() & !Psw::ILVL.bits()) | level_bits);
    }
}

impl Display for Psw {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{:04X} [{}{}{}{}{}] ILVL={}",
            self.bits(),
            flag(self.end_of_table(), 'E'),
            flag(self.zero(), 'Z'),
            flag(self.overflow(), 'V'),
            flag(self.carry(), 'C'),
            flag(self.negative(), 'N'),
            self.interrupt_level(),
        )
    }
}

#[test]
fn test_bit_positions_match_hardware() {
    assert_eq!(Psw::N.bits(), 0x0001);
    assert_eq!(Psw::C.bits(), 0x0002);
    assert_eq!(Psw::V.bits(), 0x0004);
    assert_eq!(Psw::Z.bits(), 0x0008);
    assert_eq!(Psw::E.bits(), 0x0010);
    assert_eq!(Psw::IEN.bits(), 0x0800);
    assert_eq!(Psw::CONDITION_FLAGS.bits(), 0x001F);
}

#[test]
fn test_raw_round_trip_keeps_reserved_bits() {
    let raw = 0xF38Bu16;
    assert_eq!(Psw::from_raw(raw).raw(), raw);
}

#[test]
fn test_interrupt_level() {
    let mut psw = Psw::from_raw(0x0809);
    psw.set_interrupt_level(0xA);
    assert_eq!(psw.interrupt_level(), 0xA);
    assert_eq!(psw.raw(), 0xA809);
    assert!(psw.zero());
    assert!(psw.negative());
    assert!(psw.interrupts_enabled());
    assert_eq!(psw.condition_bits(), 0x09);
}
