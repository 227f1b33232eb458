//! ## Extended addressing and ATOMIC
//!
//! | Encoding | Instruction |
//! | -------- | ----------- |
//! | `D1 :00##-0` | ATOMIC #irang2 |
//! | `D1 :10##-0` | EXTR #irang2 |
//! | `D7 :00##-0 ss 00` | EXTS #seg, #irang2 |
//! | `D7 :01##-0 pp 0:00pp` | EXTP #pag, #irang2 |
//! | `D7 :10##-0 ss 00` | EXTSR #seg, #irang2 |
//! | `D7 :11##-0 pp 0:00pp` | EXTPR #pag, #irang2 |
//! | `DC :00##-m` | EXTS Rwm, #irang2 |
//! | `DC :01##-m` | EXTP Rwm, #irang2 |
//! | `DC :10##-m` | EXTSR Rwm, #irang2 |
//! | `DC :11##-m` | EXTPR Rwm, #irang2 |
//!
//! `##` holds the instruction count minus one, so 1 to 4
//! instructions are covered.
use tracing::{event, Level};

use super::addressing::ExtendedKind;
use super::{Cpu, Execution, Flow, Instruction, Unimplemented};
use crate::bus::Bus;

const PAGE_SHIFT: u32 = 14;
const SEGMENT_SHIFT: u32 = 16;

fn lock_count(inst: &Instruction) -> u8 {
    ((inst.operand_byte() >> 4) & 0b11) + 1
}

fn page_or_segment_kind(selector: u8) -> ExtendedKind {
    match selector & 0b11 {
        0b00 => ExtendedKind::Segment,
        0b01 => ExtendedKind::Page,
        0b10 => ExtendedKind::SegmentEsfr,
        _ => ExtendedKind::PageEsfr,
    }
}

fn override_base(kind: ExtendedKind, number: u16) -> u32 {
    match kind {
        ExtendedKind::Page | ExtendedKind::PageEsfr => u32::from(number & 0x3FF) << PAGE_SHIFT,
        _ => u32::from(number & 0xFF) << SEGMENT_SHIFT,
    }
}

impl Cpu {
    fn arm(&mut self, kind: ExtendedKind, base: u32, count: u8) -> Execution {
        event!(
            Level::TRACE,
            "{} for {} instructions, base {:#08x}",
            kind,
            count,
            base
        );
        self.addressing.set_extended_mode(kind, base, count);
        Ok(Flow::ArmedOverride)
    }

    pub(super) fn op_atomic_extr(&mut self, inst: &Instruction) -> Execution {
        let kind = match inst.operand_byte() >> 6 {
            0b00 => ExtendedKind::Atomic,
            0b10 => ExtendedKind::Esfr,
            _ => return Err(Unimplemented),
        };
        self.arm(kind, 0, lock_count(inst))
    }

    pub(super) fn op_ext_immediate(&mut self, inst: &Instruction) -> Execution {
        let kind = page_or_segment_kind(inst.operand_byte() >> 6);
        let base = override_base(kind, inst.word());
        self.arm(kind, base, lock_count(inst))
    }

    pub(super) fn op_ext_register(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let kind = page_or_segment_kind(inst.operand_byte() >> 6);
        let number = self.read_gpr16(bus, inst.m());
        let base = override_base(kind, number);
        self.arm(kind, base, lock_count(inst))
    }
}

#[test]
fn test_override_fields() {
    // EXTP #0x123, #3
    let inst = Instruction::from_words(0x60D7, 0x0123);
    assert_eq!(lock_count(&inst), 3);
    let kind = page_or_segment_kind(inst.operand_byte() >> 6);
    assert_eq!(kind, ExtendedKind::Page);
    assert_eq!(override_base(kind, inst.word()), 0x123 << 14);
    // EXTSR #5, #1
    let inst = Instruction::from_words(0x80D7, 0x0005);
    let kind = page_or_segment_kind(inst.operand_byte() >> 6);
    assert_eq!(kind, ExtendedKind::SegmentEsfr);
    assert_eq!(lock_count(&inst), 1);
    assert_eq!(override_base(kind, inst.word()), 0x05_0000);
}
