//! ## Arithmetic and logic opcodes
//!
//! Opcodes 0x00 to 0x79 form eight families of ten, selected by the
//! high nibble:
//!
//! | High nibble | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 |
//! | ----------- | - | - | - | - | - | - | - | - |
//! | Operation   | ADD | ADDC | SUB | SUBC | CMP | XOR | AND | OR |
//!
//! and the low nibble selects the operand form (odd forms are the
//! byte variants, e.g. ADDB):
//!
//! | Low nibble | Operands | Encoding |
//! | ---------- | -------- | -------- |
//! | 0, 1 | `Rn, Rm` | `op n:m` |
//! | 2, 3 | `reg, mem` | `op RR MM MM` |
//! | 4, 5 | `mem, reg` | `op RR MM MM` |
//! | 6, 7 | `reg, #data` | `op RR ## ##` |
//! | 8, 9 | `Rn, #data3` / `Rn, [Rwi]` / `Rn, [Rwi+]` | `op n:0###` / `op n:10ii` / `op n:11ii` |
//!
//! NEG, CPL, NEGB and CPLB (0x81, 0x91, 0xA1, 0xB1) are here too.
use base::flags::{
    add_flags, addc_flags, logic_flags, move_flags, sub_flags, subc_flags,
};
use base::prelude::*;

use super::{Cpu, Execution, Flow, Instruction, Location, Source, Unimplemented};
use crate::bus::Bus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AluOp {
    Add,
    Addc,
    Sub,
    Subc,
    Cmp,
    Xor,
    And,
    Or,
}

impl AluOp {
    fn from_opcode(opcode: u8) -> AluOp {
        match opcode >> 4 {
            0 => AluOp::Add,
            1 => AluOp::Addc,
            2 => AluOp::Sub,
            3 => AluOp::Subc,
            4 => AluOp::Cmp,
            5 => AluOp::Xor,
            6 => AluOp::And,
            _ => AluOp::Or,
        }
    }
}

/// Compute `op1 op op2`, returning the result and the flags it
/// produces.  `psw` supplies the carry-in for ADDC/SUBC and the
/// previous Z flag, which those two only ever clear.
fn alu(op: AluOp, width: Width, op1: u16, op2: u16, psw: Psw) -> (u16, FlagDelta) {
    let mask = width.mask();
    let carry_in = u16::from(psw.carry());
    match op {
        AluOp::Add => {
            let r = op1.wrapping_add(op2) & mask;
            (r, add_flags(width, op1, op2, r))
        }
        AluOp::Addc => {
            let r = op1.wrapping_add(op2).wrapping_add(carry_in) & mask;
            (r, addc_flags(width, op1, op2, r, psw))
        }
        AluOp::Sub | AluOp::Cmp => {
            let r = op1.wrapping_sub(op2) & mask;
            (r, sub_flags(width, op1, op2, r))
        }
        AluOp::Subc => {
            let r = op1.wrapping_sub(op2).wrapping_sub(carry_in) & mask;
            (r, subc_flags(width, op1, op2, r, psw))
        }
        AluOp::Xor => {
            let r = (op1 ^ op2) & mask;
            (r, logic_flags(width, r))
        }
        AluOp::And => {
            let r = op1 & op2 & mask;
            (r, logic_flags(width, r))
        }
        AluOp::Or => {
            let r = (op1 | op2) & mask;
            (r, logic_flags(width, r))
        }
    }
}

impl Cpu {
    pub(super) fn op_alu(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let op = AluOp::from_opcode(inst.opcode());
        let form = inst.opcode() & 0x0F;
        let width = if form & 1 == 0 { Width::Word } else { Width::Byte };
        let (dest, src, post_increment): (Location, Source, Option<u8>) = match form {
            0x0 | 0x1 => (
                Location::Gpr(inst.n()),
                Source::At(Location::Gpr(inst.m())),
                None,
            ),
            0x2 | 0x3 => (
                Location::Reg(inst.reg()),
                Source::At(Location::Mem(inst.word())),
                None,
            ),
            0x4 | 0x5 => (
                Location::Mem(inst.word()),
                Source::At(Location::Reg(inst.reg())),
                None,
            ),
            0x6 | 0x7 => (
                Location::Reg(inst.reg()),
                Source::Immediate(match width {
                    Width::Word => inst.word(),
                    Width::Byte => u16::from(inst.byte2()),
                }),
                None,
            ),
            0x8 | 0x9 => {
                let m = inst.m();
                let dest = Location::Gpr(inst.n());
                if m & 0b1000 == 0 {
                    (dest, Source::Immediate(u16::from(m & 0b0111)), None)
                } else {
                    let i = m & 0b0011;
                    let pointer = self.read_gpr16(bus, i);
                    let post_increment = (m & 0b0100 != 0).then_some(i);
                    (dest, Source::At(Location::Mem(pointer)), post_increment)
                }
            }
            _ => return Err(Unimplemented),
        };
        let op2 = self.read_source(bus, src, width);
        if let Some(i) = post_increment {
            self.bump_pointer(bus, i, width.bytes() as i16);
        }
        let op1 = self.read_location(bus, dest, width);
        let (result, flags) = alu(op, width, op1, op2, self.regs.psw);
        if op != AluOp::Cmp {
            self.write_location(bus, dest, width, result);
        }
        self.apply_flags(flags);
        Ok(Flow::Next)
    }

    /// NEG Rwn (`81 n0`), CPL Rwn (`91 n0`), NEGB Rbn (`A1 n0`), CPLB
    /// Rbn (`B1 n0`).
    pub(super) fn op_neg_cpl(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let (width, negate) = match inst.opcode() {
            0x81 => (Width::Word, true),
            0x91 => (Width::Word, false),
            0xA1 => (Width::Byte, true),
            _ => (Width::Byte, false),
        };
        let n = inst.n();
        let value = self.read_gpr(bus, n, width);
        let (result, flags) = if negate {
            let r = 0_u16.wrapping_sub(value) & width.mask();
            (r, sub_flags(width, 0, value, r))
        } else {
            let r = !value & width.mask();
            (r, move_flags(width, r))
        };
        self.write_gpr(bus, n, width, result);
        self.apply_flags(flags);
        Ok(Flow::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_addc_propagates_carry_and_keeps_zero_sticky() {
        // Low words: 0xFFFF + 0x0001 = 0x0000, carry out, Z set.
        let (lo, flags) = alu(AluOp::Add, Width::Word, 0xFFFF, 0x0001, Psw::empty());
        let psw = flags.apply(Psw::empty());
        assert_eq!(lo, 0);
        assert!(psw.carry() && psw.zero());
        // High words: 0x0000 + 0x0000 + carry = 1; Z must clear.
        let (hi, flags) = alu(AluOp::Addc, Width::Word, 0x0000, 0x0000, psw);
        let psw = flags.apply(psw);
        assert_eq!(hi, 1);
        assert!(!psw.zero());
        // A zero partial result can't set Z again.
        let (_, flags) = alu(AluOp::Addc, Width::Word, 0, 0, psw);
        assert!(!flags.apply(psw).zero());
    }

    #[test]
    fn test_subc_uses_borrow() {
        let psw = Psw::C | Psw::Z;
        let (r, flags) = alu(AluOp::Subc, Width::Word, 5, 2, psw);
        assert_eq!(r, 2);
        let after = flags.apply(psw);
        assert!(!after.carry());
        assert!(!after.zero());
    }

    #[test]
    fn test_logic_clears_carry_and_overflow() {
        let psw = Psw::C | Psw::V;
        let (r, flags) = alu(AluOp::And, Width::Byte, 0xF0, 0x8F, psw);
        assert_eq!(r, 0x80);
        let after = flags.apply(psw);
        assert!(!after.carry() && !after.overflow());
        assert!(after.negative() && after.end_of_table());
    }

    #[proptest]
    fn byte_results_never_leak_into_the_high_byte(a: u8, b: u8, opcode_family: u8, carry: bool) {
        let op = AluOp::from_opcode((opcode_family % 8) << 4);
        let psw = if carry { Psw::C } else { Psw::empty() };
        let (r, _) = alu(op, Width::Byte, a.into(), b.into(), psw);
        assert_eq!(r & 0xFF00, 0);
    }
}
