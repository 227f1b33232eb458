//! ## Data movement opcodes
//!
//! MOV and MOVB in all their addressing modes.  Each sets E, Z and N
//! from the value moved and leaves C and V alone.
//!
//! | Word | Byte | Operands |
//! | ---- | ---- | -------- |
//! | F0 | F1 | `Rn, Rm` |
//! | E0 | E1 | `Rn, #data4` (encoded `#:n`) |
//! | E6 | E7 | `reg, #data` |
//! | F2 | F3 | `reg, mem` |
//! | F6 | F7 | `mem, reg` |
//! | A8 | A9 | `Rn, [Rwm]` |
//! | 98 | 99 | `Rn, [Rwm+]` |
//! | B8 | B9 | `[Rwm], Rn` |
//! | 88 | 89 | `[-Rwm], Rn` |
//! | C8 | C9 | `[Rwn], [Rwm]` |
//! | D8 | D9 | `[Rwn+], [Rwm]` |
//! | E8 | E9 | `[Rwn], [Rwm+]` |
//! | D4 | F4 | `Rn, [Rwm+#data16]` |
//! | C4 | E4 | `[Rwm+#data16], Rn` |
//! | 84 | A4 | `[Rwn], mem` |
//! | 94 | B4 | `mem, [Rwn]` |
//!
//! Post-increment adds the operand size to the pointer register
//! after the access; pre-decrement subtracts it before.
use base::flags::move_flags;
use base::prelude::*;

use super::{Cpu, Execution, Flow, Instruction, Location, Source, Unimplemented};
use crate::bus::Bus;

impl Cpu {
    fn indirect(&mut self, bus: &mut Bus, n: u8) -> Location {
        Location::Mem(self.read_gpr16(bus, n))
    }

    pub(super) fn op_mov(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let opcode = inst.opcode();
        let width = match opcode {
            0xF0 | 0xE0 | 0xE6 | 0xF2 | 0xF6 | 0xA8 | 0x98 | 0xB8 | 0x88 | 0xC8 | 0xD8 | 0xE8
            | 0xD4 | 0xC4 | 0x84 | 0x94 => Width::Word,
            _ => Width::Byte,
        };
        let step = width.bytes() as i16;
        let (n, m) = (inst.n(), inst.m());
        // Pointer register to advance once the move is done.
        let mut post_increment: Option<u8> = None;
        let (dest, src) = match opcode {
            0xF0 | 0xF1 => (Location::Gpr(n), Source::At(Location::Gpr(m))),
            // The register is in the low nibble, the data in the high.
            0xE0 | 0xE1 => (Location::Gpr(m), Source::Immediate(u16::from(n))),
            0xE6 => (Location::Reg(inst.reg()), Source::Immediate(inst.word())),
            0xE7 => (
                Location::Reg(inst.reg()),
                Source::Immediate(u16::from(inst.byte2())),
            ),
            0xF2 | 0xF3 => (
                Location::Reg(inst.reg()),
                Source::At(Location::Mem(inst.word())),
            ),
            0xF6 | 0xF7 => (
                Location::Mem(inst.word()),
                Source::At(Location::Reg(inst.reg())),
            ),
            0xA8 | 0xA9 => (Location::Gpr(n), Source::At(self.indirect(bus, m))),
            0x98 | 0x99 => {
                post_increment = Some(m);
                (Location::Gpr(n), Source::At(self.indirect(bus, m)))
            }
            0xB8 | 0xB9 => (self.indirect(bus, m), Source::At(Location::Gpr(n))),
            0x88 | 0x89 => {
                self.bump_pointer(bus, m, -step);
                (self.indirect(bus, m), Source::At(Location::Gpr(n)))
            }
            0xC8 | 0xC9 => (self.indirect(bus, n), Source::At(self.indirect(bus, m))),
            0xD8 | 0xD9 => {
                post_increment = Some(n);
                (self.indirect(bus, n), Source::At(self.indirect(bus, m)))
            }
            0xE8 | 0xE9 => {
                post_increment = Some(m);
                (self.indirect(bus, n), Source::At(self.indirect(bus, m)))
            }
            0xD4 | 0xF4 => {
                let base = self.read_gpr16(bus, m);
                (
                    Location::Gpr(n),
                    Source::At(Location::Mem(base.wrapping_add(inst.word()))),
                )
            }
            0xC4 | 0xE4 => {
                let base = self.read_gpr16(bus, m);
                (
                    Location::Mem(base.wrapping_add(inst.word())),
                    Source::At(Location::Gpr(n)),
                )
            }
            0x84 | 0xA4 => (self.indirect(bus, m), Source::At(Location::Mem(inst.word()))),
            0x94 | 0xB4 => (Location::Mem(inst.word()), Source::At(self.indirect(bus, m))),
            _ => return Err(Unimplemented),
        };
        let value = self.read_source(bus, src, width);
        self.write_location(bus, dest, width, value);
        if let Some(pointer) = post_increment {
            self.bump_pointer(bus, pointer, step);
        }
        self.apply_flags(move_flags(width, value));
        Ok(Flow::Next)
    }
}
