//! ## Multiply and divide opcodes
//!
//! - MUL Rwn, Rwm (`0B nm`) and MULU (`1B nm`): 32-bit product in
//!   MDH:MDL.
//! - DIV Rwn (`4B nn`), DIVU (`5B nn`): MDL divided by Rwn.
//! - DIVL Rwn (`6B nn`), DIVLU (`7B nn`): MDH:MDL divided by Rwn.
//!
//! The manufacturer's manual is not consistent about which of MDL and
//! MDH receives the quotient and which the remainder.  We put the
//! quotient in MDL and the remainder in MDH for all four divide
//! instructions, and warn (once) when a program first divides.  A
//! division by zero, or a quotient which does not fit in 16 bits,
//! sets V and leaves MDH and MDL unchanged.
use tracing::{event, Level};

use base::prelude::*;

use super::{Cpu, Execution, Flow, Instruction};
use crate::bus::Bus;

/// The flags after MUL/DIV.  E and C are always cleared.
fn muldiv_flags(zero: bool, negative: bool, overflow: bool) -> FlagDelta {
    let mut asserted = Psw::empty();
    asserted.set(Psw::Z, zero);
    asserted.set(Psw::N, negative);
    asserted.set(Psw::V, overflow);
    FlagDelta::new(Psw::CONDITION_FLAGS, asserted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DivKind {
    Div,
    Divu,
    Divl,
    Divlu,
}

/// Quotient and remainder, or None on overflow or division by zero.
pub(crate) fn divide(kind: DivKind, md: u32, divisor: u16) -> Option<(u16, u16)> {
    if divisor == 0 {
        return None;
    }
    match kind {
        DivKind::Div => {
            let dividend = md as u16 as i16;
            let divisor = divisor as i16;
            let q = dividend.checked_div(divisor)?;
            let r = dividend.checked_rem(divisor)?;
            Some((q as u16, r as u16))
        }
        DivKind::Divu => {
            let dividend = md as u16;
            Some((dividend / divisor, dividend % divisor))
        }
        DivKind::Divl => {
            let dividend = md as i32;
            let divisor = i32::from(divisor as i16);
            let q = dividend.checked_div(divisor)?;
            let r = dividend.checked_rem(divisor)?;
            let q = i16::try_from(q).ok()?;
            Some((q as u16, r as u16))
        }
        DivKind::Divlu => {
            let divisor = u32::from(divisor);
            let q = u16::try_from(md / divisor).ok()?;
            Some((q, (md % divisor) as u16))
        }
    }
}

impl Cpu {
    pub(super) fn op_mul(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let a = self.read_gpr16(bus, inst.n());
        let b = self.read_gpr16(bus, inst.m());
        let flags = if inst.opcode() == 0x0B {
            let product = i32::from(a as i16) * i32::from(b as i16);
            self.regs.set_md(product as u32);
            muldiv_flags(
                product == 0,
                product < 0,
                i16::try_from(product).is_err(),
            )
        } else {
            let product = u32::from(a) * u32::from(b);
            self.regs.set_md(product);
            muldiv_flags(product == 0, product & 0x8000_0000 != 0, product > 0xFFFF)
        };
        self.apply_flags(flags);
        Ok(Flow::Next)
    }

    pub(super) fn op_div(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        if !self.division_warning_given {
            event!(
                Level::WARN,
                "DIV/DIVU/DIVL/DIVLU: the hardware manual is unclear about the result registers; \
                 this simulator leaves the quotient in MDL and the remainder in MDH"
            );
            self.division_warning_given = true;
        }
        let kind = match inst.opcode() {
            0x4B => DivKind::Div,
            0x5B => DivKind::Divu,
            0x6B => DivKind::Divl,
            _ => DivKind::Divlu,
        };
        let divisor = self.read_gpr16(bus, inst.n());
        match divide(kind, self.regs.md(), divisor) {
            Some((quotient, remainder)) => {
                self.regs.mdl = quotient;
                self.regs.mdh = remainder;
                self.apply_flags(muldiv_flags(
                    quotient == 0,
                    Width::Word.is_negative(quotient),
                    false,
                ));
            }
            None => {
                self.faults.divide_errors += 1;
                event!(
                    Level::WARN,
                    "{:?} of {:#010x} by {:#06x} overflowed; MD unchanged",
                    kind,
                    self.regs.md(),
                    divisor
                );
                self.apply_flags(muldiv_flags(false, false, true));
            }
        }
        Ok(Flow::Next)
    }
}
