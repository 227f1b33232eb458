//! Branch condition codes and their precomputed truth table.
//!
//! Conditional jumps and calls carry a 4-bit condition field.  The
//! [`ConditionTable`] answers "does condition `cc` hold for these
//! flags?" with a single lookup, which matters because the answer is
//! needed on every conditional branch.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use super::psw::Psw;

/// The sixteen C16x condition codes, numbered as they are encoded in
/// an instruction's condition field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConditionCode {
    /// Unconditional.
    Uc = 0x0,
    /// Not equal and not end-of-table.
    Net = 0x1,
    Z = 0x2,
    Nz = 0x3,
    V = 0x4,
    Nv = 0x5,
    N = 0x6,
    Nn = 0x7,
    C = 0x8,
    Nc = 0x9,
    Sgt = 0xA,
    Sle = 0xB,
    Slt = 0xC,
    Sge = 0xD,
    Ugt = 0xE,
    Ule = 0xF,
}

impl ConditionCode {
    pub const EQ: ConditionCode = ConditionCode::Z;
    pub const NE: ConditionCode = ConditionCode::Nz;
    pub const ULT: ConditionCode = ConditionCode::C;
    pub const UGE: ConditionCode = ConditionCode::Nc;

    pub const ALL: [ConditionCode; 16] = [
        ConditionCode::Uc,
        ConditionCode::Net,
        ConditionCode::Z,
        ConditionCode::Nz,
        ConditionCode::V,
        ConditionCode::Nv,
        ConditionCode::N,
        ConditionCode::Nn,
        ConditionCode::C,
        ConditionCode::Nc,
        ConditionCode::Sgt,
        ConditionCode::Sle,
        ConditionCode::Slt,
        ConditionCode::Sge,
        ConditionCode::Ugt,
        ConditionCode::Ule,
    ];

    /// Decode the low four bits of `field`.  Instruction fields are
    /// four bits wide, so this cannot fail.
    pub const fn from_field(field: u8) -> ConditionCode {
        ConditionCode::ALL[(field & 0x0F) as usize]
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            ConditionCode::Uc => "cc_UC",
            ConditionCode::Net => "cc_NET",
            ConditionCode::Z => "cc_Z",
            ConditionCode::Nz => "cc_NZ",
            ConditionCode::V => "cc_V",
            ConditionCode::Nv => "cc_NV",
            ConditionCode::N => "cc_N",
            ConditionCode::Nn => "cc_NN",
            ConditionCode::C => "cc_C",
            ConditionCode::Nc => "cc_NC",
            ConditionCode::Sgt => "cc_SGT",
            ConditionCode::Sle => "cc_SLE",
            ConditionCode::Slt => "cc_SLT",
            ConditionCode::Sge => "cc_SGE",
            ConditionCode::Ugt => "cc_UGT",
            ConditionCode::Ule => "cc_ULE",
        }
    }

    /// Evaluate the condition directly from the flags.  This is what
    /// the table is built from; the simulator itself uses the table.
    pub fn holds(self, flags: Psw) -> bool {
        let z = flags.zero();
        let c = flags.carry();
        let v = flags.overflow();
        let n = flags.negative();
        let e = flags.end_of_table();
        match self {
            ConditionCode::Uc => true,
            ConditionCode::Net => !z && !e,
            ConditionCode::Z => z,
            ConditionCode::Nz => !z,
            ConditionCode::V => v,
            ConditionCode::Nv => !v,
            ConditionCode::N => n,
            ConditionCode::Nn => !n,
            ConditionCode::C => c,
            // Carry clear only.  NC must not also pick up the SGT
            // result.
            ConditionCode::Nc => !c,
            ConditionCode::Sgt => !z && (n == v),
            ConditionCode::Sle => z || (n != v),
            ConditionCode::Slt => n != v,
            ConditionCode::Sge => n == v,
            ConditionCode::Ugt => !z && !c,
            ConditionCode::Ule => z || c,
        }
    }
}

impl Display for ConditionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A condition code value outside the 4-bit range.  Real hardware
/// cannot produce one, so this indicates a simulator configuration
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionCodeError(pub u8);

impl Display for ConditionCodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "condition code {:#x} does not exist", self.0)
    }
}

impl Error for ConditionCodeError {}

impl TryFrom<u8> for ConditionCode {
    type Error = ConditionCodeError;

    fn try_from(n: u8) -> Result<ConditionCode, ConditionCodeError> {
        if n > 0x0F {
            Err(ConditionCodeError(n))
        } else {
            Ok(ConditionCode::from_field(n))
        }
    }
}

const FLAG_COMBINATIONS: usize = 1 << 5;

/// Truth table indexed by the five condition flags (E, Z, V, C, N).
/// Each entry is a 16-bit mask with bit `cc` set when condition `cc`
/// holds.
///
/// The only way to obtain a table is [`ConditionTable::build`], so a
/// table which has not been filled in cannot be consulted.
#[derive(Clone, PartialEq, Eq)]
pub struct ConditionTable {
    entries: [u16; FLAG_COMBINATIONS],
}

impl ConditionTable {
    pub fn build() -> ConditionTable {
        let mut entries = [0_u16; FLAG_COMBINATIONS];
        for (flag_bits, entry) in entries.iter_mut().enumerate() {
            let flags = Psw::from_raw(flag_bits as u16);
            for cc in ConditionCode::ALL {
                if cc.holds(flags) {
                    *entry |= 1 << (cc as u8);
                }
            }
        }
        ConditionTable { entries }
    }

    #[inline]
    pub fn evaluate(&self, cc: ConditionCode, psw: Psw) -> bool {
        let entry = self.entries[usize::from(psw.condition_bits())];
        entry & (1 << (cc as u8)) != 0
    }

    /// Evaluate a condition given as a raw number.
    ///
    /// # Errors
    ///
    /// Fails when `code` is not a 4-bit value.
    pub fn evaluate_raw(&self, code: u8, psw: Psw) -> Result<bool, ConditionCodeError> {
        ConditionCode::try_from(code).map(|cc| self.evaluate(cc, psw))
    }
}

impl fmt::Debug for ConditionTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionTable")
            .field("entries", &format_args!("{:04x?}", self.entries))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    fn flags(z: bool, c: bool, v: bool, n: bool, e: bool) -> Psw {
        let mut psw = Psw::empty();
        psw.set(Psw::Z, z);
        psw.set(Psw::C, c);
        psw.set(Psw::V, v);
        psw.set(Psw::N, n);
        psw.set(Psw::E, e);
        psw
    }

    #[test]
    fn table_is_defined_for_every_code_and_flag_combination() {
        let table = ConditionTable::build();
        for raw in 0..FLAG_COMBINATIONS {
            let psw = Psw::from_raw(raw as u16);
            for cc in ConditionCode::ALL {
                assert_eq!(table.evaluate(cc, psw), cc.holds(psw), "{cc} with {psw}");
            }
        }
    }

    #[test]
    fn unconditional_always_holds() {
        let table = ConditionTable::build();
        for raw in 0..FLAG_COMBINATIONS {
            assert!(table.evaluate(ConditionCode::Uc, Psw::from_raw(raw as u16)));
        }
    }

    #[test]
    fn signed_comparisons() {
        let table = ConditionTable::build();
        // 3 - 5: N set, V clear => less than.
        let lt = flags(false, true, false, true, false);
        assert!(table.evaluate(ConditionCode::Slt, lt));
        assert!(table.evaluate(ConditionCode::Sle, lt));
        assert!(!table.evaluate(ConditionCode::Sgt, lt));
        assert!(!table.evaluate(ConditionCode::Sge, lt));
        // Overflowed negative result means greater.
        let gt = flags(false, false, true, true, false);
        assert!(table.evaluate(ConditionCode::Sgt, gt));
        assert!(table.evaluate(ConditionCode::Sge, gt));
        // Equal.
        let eq = flags(true, false, false, false, false);
        assert!(table.evaluate(ConditionCode::Sge, eq));
        assert!(table.evaluate(ConditionCode::Sle, eq));
        assert!(!table.evaluate(ConditionCode::Sgt, eq));
        assert!(table.evaluate(ConditionCode::EQ, eq));
    }

    #[test]
    fn unsigned_comparisons() {
        let table = ConditionTable::build();
        let below = flags(false, true, false, false, false);
        assert!(table.evaluate(ConditionCode::ULT, below));
        assert!(table.evaluate(ConditionCode::Ule, below));
        assert!(!table.evaluate(ConditionCode::Ugt, below));
        let above = flags(false, false, false, true, false);
        assert!(table.evaluate(ConditionCode::Ugt, above));
        assert!(table.evaluate(ConditionCode::UGE, above));
    }

    #[test]
    fn net_requires_both_zero_and_end_of_table_clear() {
        let table = ConditionTable::build();
        assert!(table.evaluate(ConditionCode::Net, flags(false, false, false, false, false)));
        assert!(!table.evaluate(ConditionCode::Net, flags(true, false, false, false, false)));
        assert!(!table.evaluate(ConditionCode::Net, flags(false, false, false, false, true)));
    }

    // Known ambiguity: a table builder with a missing `break` lets NC
    // fall through into SGT.  NC means carry clear and nothing else, so when
    // SGT holds but carry is set, NC must be false.
    #[test]
    fn no_carry_does_not_inherit_signed_greater() {
        let table = ConditionTable::build();
        let psw = flags(false, true, false, false, false);
        assert!(table.evaluate(ConditionCode::Sgt, psw));
        assert!(!table.evaluate(ConditionCode::Nc, psw));
        assert!(table.evaluate(ConditionCode::Nc, flags(false, false, false, true, false)));
    }

    #[test]
    fn unrecognised_raw_code_is_an_error() {
        let table = ConditionTable::build();
        assert_eq!(
            table.evaluate_raw(0x10, Psw::empty()),
            Err(ConditionCodeError(0x10))
        );
        assert_eq!(table.evaluate_raw(0x2, Psw::Z), Ok(true));
    }

    #[test]
    fn field_decoding_matches_discriminants() {
        for n in 0..16_u8 {
            assert_eq!(ConditionCode::from_field(n) as u8, n);
        }
    }

    #[proptest]
    fn only_condition_flags_matter(raw: u16, code: u8) {
        let table = ConditionTable::build();
        let cc = ConditionCode::from_field(code);
        let psw = Psw::from_raw(raw);
        let stripped = Psw::from_raw(raw & Psw::CONDITION_FLAGS.bits());
        assert_eq!(table.evaluate(cc, psw), table.evaluate(cc, stripped));
    }
}
