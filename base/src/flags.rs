//! Condition-flag arithmetic for the C16x ALU.
//!
//! Carry and overflow are derived from the sign bits of the two
//! operands and of the result, the way the hardware's most
//! significant adder stage produces them, rather than by comparing
//! against a wider computation.  The formulas hold whatever the carry
//! into that stage was, so the same functions serve ADD and ADDC.
//!
//! Subtraction follows the C16x convention: C is a *borrow*.  It is
//! set when the unsigned minuend is smaller than the subtrahend, which
//! is the opposite polarity to ALUs that subtract by adding the
//! complement and report the adder's carry-out.
use super::access::AccessWidth;
use super::psw::Psw;

/// Operand width for ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub const fn sign_bit(self) -> u16 {
        match self {
            Width::Byte => 0x80,
            Width::Word => 0x8000,
        }
    }

    pub const fn mask(self) -> u16 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
        }
    }

    /// Size in bytes; also the step used by post-increment and
    /// pre-decrement addressing.
    pub const fn bytes(self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }

    pub const fn is_negative(self, value: u16) -> bool {
        value & self.sign_bit() != 0
    }
}

impl From<Width> for AccessWidth {
    fn from(w: Width) -> AccessWidth {
        match w {
            Width::Byte => AccessWidth::Byte,
            Width::Word => AccessWidth::Word,
        }
    }
}

/// The flags an operation asserts, and the set of flags it affects.
///
/// Applying a delta first clears every affected flag and then sets
/// the asserted ones, so no stale value of an affected flag can
/// survive.  Flags outside `affected` are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDelta {
    affected: Psw,
    asserted: Psw,
}

impl FlagDelta {
    pub const NONE: FlagDelta = FlagDelta {
        affected: Psw::empty(),
        asserted: Psw::empty(),
    };

    pub fn new(affected: Psw, asserted: Psw) -> FlagDelta {
        assert!(
            affected.contains(asserted),
            "flag delta asserts {asserted:?} which it does not claim to affect ({affected:?})"
        );
        FlagDelta { affected, asserted }
    }

    pub const fn affected(&self) -> Psw {
        self.affected
    }

    pub const fn asserted(&self) -> Psw {
        self.asserted
    }

    pub const fn is_set(&self, flag: Psw) -> bool {
        self.asserted.contains(flag)
    }

    #[must_use]
    pub fn apply(&self, psw: Psw) -> Psw {
        psw.difference(self.affected).union(self.asserted)
    }
}

/// Z, N and E as derived from a result value.
pub fn result_flags(width: Width, result: u16) -> Psw {
    let result = result & width.mask();
    let mut flags = Psw::empty();
    flags.set(Psw::Z, result == 0);
    flags.set(Psw::N, width.is_negative(result));
    flags.set(Psw::E, result == width.sign_bit());
    flags
}

fn add_carry(width: Width, op1: u16, op2: u16, result: u16) -> bool {
    let a = width.is_negative(op1);
    let b = width.is_negative(op2);
    let r = width.is_negative(result);
    (a && b) || (a && !r) || (b && !r)
}

/// Signed overflow: both operands have the same sign and the result
/// has the other.  So 0x8000 + 0x8000 (giving 0x0000) sets V, as
/// two's-complement arithmetic requires.
fn add_overflow(width: Width, op1: u16, op2: u16, result: u16) -> bool {
    let a = width.is_negative(op1);
    let b = width.is_negative(op2);
    let r = width.is_negative(result);
    (a && b && !r) || (!a && !b && r)
}

fn sub_borrow(width: Width, op1: u16, op2: u16, result: u16) -> bool {
    let a = width.is_negative(op1);
    let b = width.is_negative(op2);
    let r = width.is_negative(result);
    (!a && b) || (!a && r) || (b && r)
}

fn sub_overflow(width: Width, op1: u16, op2: u16, result: u16) -> bool {
    let a = width.is_negative(op1);
    let b = width.is_negative(op2);
    let r = width.is_negative(result);
    (a && !b && !r) || (!a && b && r)
}

fn arithmetic(width: Width, result: u16, carry: bool, overflow: bool) -> FlagDelta {
    let mut asserted = result_flags(width, result);
    asserted.set(Psw::C, carry);
    asserted.set(Psw::V, overflow);
    FlagDelta::new(Psw::CONDITION_FLAGS, asserted)
}

pub fn add_flags(width: Width, op1: u16, op2: u16, result: u16) -> FlagDelta {
    arithmetic(
        width,
        result,
        add_carry(width, op1, op2, result),
        add_overflow(width, op1, op2, result),
    )
}

pub fn add_flags_16(op1: u16, op2: u16, result: u16) -> FlagDelta {
    add_flags(Width::Word, op1, op2, result)
}

pub fn add_flags_8(op1: u8, op2: u8, result: u8) -> FlagDelta {
    add_flags(Width::Byte, op1.into(), op2.into(), result.into())
}

pub fn sub_flags(width: Width, op1: u16, op2: u16, result: u16) -> FlagDelta {
    arithmetic(
        width,
        result,
        sub_borrow(width, op1, op2, result),
        sub_overflow(width, op1, op2, result),
    )
}

pub fn sub_flags_16(op1: u16, op2: u16, result: u16) -> FlagDelta {
    sub_flags(Width::Word, op1, op2, result)
}

pub fn sub_flags_8(op1: u8, op2: u8, result: u8) -> FlagDelta {
    sub_flags(Width::Byte, op1.into(), op2.into(), result.into())
}

// ADDC/SUBC are used to chain multi-word arithmetic, so Z must mean
// "the whole chained result is zero": it can be cleared by a non-zero
// partial result but never set by a zero one.
fn with_sticky_zero(delta: FlagDelta, previous: Psw) -> FlagDelta {
    let mut asserted = delta.asserted();
    asserted.set(Psw::Z, delta.is_set(Psw::Z) && previous.zero());
    FlagDelta::new(delta.affected(), asserted)
}

/// Flags for ADDC/ADDCB.  `result` must already include the carry-in.
pub fn addc_flags(width: Width, op1: u16, op2: u16, result: u16, previous: Psw) -> FlagDelta {
    with_sticky_zero(add_flags(width, op1, op2, result), previous)
}

/// Flags for SUBC/SUBCB.  `result` must already include the borrow-in.
pub fn subc_flags(width: Width, op1: u16, op2: u16, result: u16, previous: Psw) -> FlagDelta {
    with_sticky_zero(sub_flags(width, op1, op2, result), previous)
}

/// AND, OR, XOR: C and V are cleared.
pub fn logic_flags(width: Width, result: u16) -> FlagDelta {
    FlagDelta::new(Psw::CONDITION_FLAGS, result_flags(width, result))
}

/// MOV and CPL: only E, Z and N are affected.
pub fn move_flags(width: Width, value: u16) -> FlagDelta {
    FlagDelta::new(Psw::E | Psw::Z | Psw::N, result_flags(width, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    fn flags_of(delta: FlagDelta) -> (bool, bool, bool, bool) {
        (
            delta.is_set(Psw::C),
            delta.is_set(Psw::V),
            delta.is_set(Psw::N),
            delta.is_set(Psw::Z),
        )
    }

    #[test]
    fn add_positive_overflow() {
        // (C, V, N, Z)
        assert_eq!(
            flags_of(add_flags_16(0x7FFF, 0x0001, 0x8000)),
            (false, true, true, false)
        );
    }

    #[test]
    fn add_of_two_most_negative_words() {
        // Both operands negative and the sum wraps to zero: there is a
        // carry out, and since -65536 is not representable in 16 bits
        // the signed result has overflowed too.
        let delta = add_flags_16(0x8000, 0x8000, 0x0000);
        assert!(delta.is_set(Psw::C));
        assert!(delta.is_set(Psw::V));
        assert!(delta.is_set(Psw::Z));
        assert!(!delta.is_set(Psw::N));
    }

    #[test]
    fn add_carry_without_overflow() {
        assert_eq!(
            flags_of(add_flags_16(0xFFFF, 0x0001, 0x0000)),
            (true, false, false, true)
        );
    }

    #[test]
    fn sub_carry_is_a_borrow() {
        // 1 - 2 borrows.
        let delta = sub_flags_16(0x0001, 0x0002, 0xFFFF);
        assert!(delta.is_set(Psw::C));
        assert!(!delta.is_set(Psw::V));
        assert!(delta.is_set(Psw::N));
        // 2 - 1 does not.
        assert!(!sub_flags_16(0x0002, 0x0001, 0x0001).is_set(Psw::C));
        // Equal operands: no borrow, zero result.
        let equal = sub_flags_16(0x1234, 0x1234, 0x0000);
        assert!(!equal.is_set(Psw::C));
        assert!(equal.is_set(Psw::Z));
    }

    #[test]
    fn sub_overflow() {
        // -32768 - 1 overflows to +32767.
        let delta = sub_flags_16(0x8000, 0x0001, 0x7FFF);
        assert!(delta.is_set(Psw::V));
        assert!(!delta.is_set(Psw::C));
    }

    #[test]
    fn byte_flags_use_bit_seven() {
        let delta = add_flags_8(0x7F, 0x01, 0x80);
        assert!(delta.is_set(Psw::V));
        assert!(delta.is_set(Psw::N));
        assert!(delta.is_set(Psw::E));
        assert!(!delta.is_set(Psw::C));
        assert!(sub_flags_8(0x00, 0x01, 0xFF).is_set(Psw::C));
    }

    #[test]
    fn end_of_table_flag_marks_most_negative_result() {
        assert!(result_flags(Width::Word, 0x8000).contains(Psw::E));
        assert!(!result_flags(Width::Word, 0x8001).contains(Psw::E));
        assert!(result_flags(Width::Byte, 0x0080).contains(Psw::E));
    }

    #[test]
    fn apply_clears_stale_flags() {
        let before = Psw::C | Psw::V | Psw::N | Psw::E | Psw::IEN;
        let after = add_flags_16(0x0001, 0x0001, 0x0002).apply(before);
        assert_eq!(after, Psw::IEN);
    }

    #[test]
    fn move_flags_leave_carry_and_overflow() {
        let before = Psw::C | Psw::V | Psw::Z;
        let after = move_flags(Width::Word, 0x8000).apply(before);
        assert_eq!(after, Psw::C | Psw::V | Psw::N | Psw::E);
    }

    #[test]
    fn logic_flags_clear_carry_and_overflow() {
        let after = logic_flags(Width::Word, 0).apply(Psw::C | Psw::V);
        assert_eq!(after, Psw::Z);
    }

    #[test]
    fn addc_zero_is_sticky() {
        // A zero partial result only keeps Z if it was already set.
        let delta = addc_flags(Width::Word, 0xFFFF, 0x0000, 0x0000, Psw::empty());
        assert!(!delta.is_set(Psw::Z));
        let delta = addc_flags(Width::Word, 0xFFFF, 0x0000, 0x0000, Psw::Z);
        assert!(delta.is_set(Psw::Z));
        // A non-zero partial result always clears it.
        let delta = subc_flags(Width::Word, 0x0005, 0x0001, 0x0004, Psw::Z);
        assert!(!delta.is_set(Psw::Z));
    }

    #[proptest]
    fn add_16_matches_wide_arithmetic(a: u16, b: u16) {
        let wide = u32::from(a) + u32::from(b);
        let result = wide as u16;
        let signed = i32::from(a as i16) + i32::from(b as i16);
        let delta = add_flags_16(a, b, result);
        assert_eq!(delta.is_set(Psw::C), wide > 0xFFFF);
        assert_eq!(
            delta.is_set(Psw::V),
            signed < i32::from(i16::MIN) || signed > i32::from(i16::MAX)
        );
        assert_eq!(delta.is_set(Psw::Z), result == 0);
        assert_eq!(delta.is_set(Psw::N), result & 0x8000 != 0);
    }

    #[proptest]
    fn add_with_carry_in_matches_wide_arithmetic(a: u16, b: u16, carry_in: bool) {
        let wide = u32::from(a) + u32::from(b) + u32::from(carry_in);
        let delta = add_flags_16(a, b, wide as u16);
        assert_eq!(delta.is_set(Psw::C), wide > 0xFFFF);
    }

    #[proptest]
    fn sub_16_borrow_matches_unsigned_compare(a: u16, b: u16) {
        let result = a.wrapping_sub(b);
        let signed = i32::from(a as i16) - i32::from(b as i16);
        let delta = sub_flags_16(a, b, result);
        assert_eq!(delta.is_set(Psw::C), a < b);
        assert_eq!(
            delta.is_set(Psw::V),
            signed < i32::from(i16::MIN) || signed > i32::from(i16::MAX)
        );
    }

    #[proptest]
    fn sub_8_borrow_matches_unsigned_compare(a: u8, b: u8) {
        let delta = sub_flags_8(a, b, a.wrapping_sub(b));
        assert_eq!(delta.is_set(Psw::C), a < b);
    }
}
