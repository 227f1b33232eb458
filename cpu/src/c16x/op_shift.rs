//! ## Shift and rotate opcodes
//!
//! Each has a register-count form (`op nm`: shift Rwn by Rwm, using
//! the low four bits of Rwm) and an immediate form (`op #n`: the count
//! is in the high nibble, the register in the low nibble).
//!
//! | Operation | Rwn, Rwm | Rwn, #data4 |
//! | --------- | -------- | ----------- |
//! | ROL  | 0C | 1C |
//! | ROR  | 2C | 3C |
//! | SHL  | 4C | 5C |
//! | SHR  | 6C | 7C |
//! | ASHR | AC | BC |
//!
//! C receives the last bit shifted out.  For the right shifts, V is
//! set when any 1 bit was shifted out before that one (the result
//! has been rounded down).  E is always cleared.
use base::flags::result_flags;
use base::prelude::*;

use super::{Cpu, Execution, Flow, Instruction};
use crate::bus::Bus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftOp {
    Rol,
    Ror,
    Shl,
    Shr,
    Ashr,
}

fn bit(value: u16, n: u32) -> bool {
    value & (1 << n) != 0
}

/// Any of the bits below bit `n`.
fn any_below(value: u16, n: u32) -> bool {
    n > 0 && value & ((1_u16 << n) - 1) != 0
}

fn shift(op: ShiftOp, value: u16, count: u32) -> (u16, FlagDelta) {
    let count = count & 0x0F;
    let (result, carry, overflow) = if count == 0 {
        (value, false, false)
    } else {
        match op {
            ShiftOp::Rol => {
                let r = value.rotate_left(count);
                (r, bit(value, 16 - count), false)
            }
            ShiftOp::Shl => (value << count, bit(value, 16 - count), false),
            ShiftOp::Ror => (
                value.rotate_right(count),
                bit(value, count - 1),
                any_below(value, count - 1),
            ),
            ShiftOp::Shr => (
                value >> count,
                bit(value, count - 1),
                any_below(value, count - 1),
            ),
            ShiftOp::Ashr => (
                ((value as i16) >> count) as u16,
                bit(value, count - 1),
                any_below(value, count - 1),
            ),
        }
    };
    let mut asserted = result_flags(Width::Word, result);
    asserted.remove(Psw::E);
    asserted.set(Psw::C, carry);
    asserted.set(Psw::V, overflow);
    (result, FlagDelta::new(Psw::CONDITION_FLAGS, asserted))
}

impl Cpu {
    pub(super) fn op_shift(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let opcode = inst.opcode();
        let op = match opcode & 0xE0 {
            0x00 => ShiftOp::Rol,
            0x20 => ShiftOp::Ror,
            0x40 => ShiftOp::Shl,
            0x60 => ShiftOp::Shr,
            _ => ShiftOp::Ashr,
        };
        let immediate = opcode & 0x10 != 0;
        let (register, count) = if immediate {
            (inst.m(), u32::from(inst.n()))
        } else {
            let count = self.read_gpr16(bus, inst.m());
            (inst.n(), u32::from(count))
        };
        let value = self.read_gpr16(bus, register);
        let (result, flags) = shift(op, value, count);
        self.write_gpr16(bus, register, result);
        self.apply_flags(flags);
        Ok(Flow::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shl_carry_is_last_bit_out() {
        let (r, flags) = shift(ShiftOp::Shl, 0x4001, 2);
        assert_eq!(r, 0x0004);
        assert!(flags.is_set(Psw::C));
        let (_, flags) = shift(ShiftOp::Shl, 0x8001, 2);
        assert!(!flags.is_set(Psw::C));
    }

    #[test]
    fn test_right_shift_rounding_sets_overflow() {
        let (r, flags) = shift(ShiftOp::Shr, 0b1011, 2);
        assert_eq!(r, 0b10);
        assert!(flags.is_set(Psw::C));
        assert!(flags.is_set(Psw::V));
        let (_, flags) = shift(ShiftOp::Shr, 0b1010, 2);
        assert!(flags.is_set(Psw::C));
        assert!(!flags.is_set(Psw::V));
    }

    #[test]
    fn test_ashr_keeps_sign() {
        let (r, flags) = shift(ShiftOp::Ashr, 0x8000, 4);
        assert_eq!(r, 0xF800);
        assert!(flags.is_set(Psw::N));
        assert!(!flags.is_set(Psw::E));
    }

    #[test]
    fn test_rotates() {
        assert_eq!(shift(ShiftOp::Rol, 0x8001, 1).0, 0x0003);
        assert_eq!(shift(ShiftOp::Ror, 0x8001, 1).0, 0xC000);
        assert!(shift(ShiftOp::Ror, 0x8001, 1).1.is_set(Psw::C));
    }

    #[test]
    fn test_zero_count_clears_carry_and_overflow() {
        let (r, flags) = shift(ShiftOp::Shr, 0x1234, 16);
        assert_eq!(r, 0x1234);
        assert!(!flags.is_set(Psw::C));
        assert!(!flags.is_set(Psw::Z));
    }
}
