//! Core registers and their special function register addresses.
//!
//! The general purpose registers are not here: they live in memory,
//! at the address held in CP (see [`super::Cpu::read_gpr16`]).
use serde::{Deserialize, Serialize};

use base::prelude::*;

use super::addressing::Addressing;

pub const SFR_DPP0: u32 = 0xFE00;
pub const SFR_DPP1: u32 = 0xFE02;
pub const SFR_DPP2: u32 = 0xFE04;
pub const SFR_DPP3: u32 = 0xFE06;
pub const SFR_CSP: u32 = 0xFE08;
pub const SFR_MDH: u32 = 0xFE0C;
pub const SFR_MDL: u32 = 0xFE0E;
pub const SFR_CP: u32 = 0xFE10;
pub const SFR_SP: u32 = 0xFE12;
pub const SFR_STKOV: u32 = 0xFE14;
pub const SFR_STKUN: u32 = 0xFE16;
pub const SFR_MDC: u32 = 0xFF0E;
pub const SFR_PSW: u32 = 0xFF10;
pub const SFR_ZEROS: u32 = 0xFF1C;
pub const SFR_ONES: u32 = 0xFF1E;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuRegisters {
    /// Offset of the next instruction within the code segment.
    pub ip: u16,
    /// Code segment pointer; only the low 8 bits are significant.
    pub csp: u16,
    pub psw: Psw,
    pub sp: u16,
    pub cp: u16,
    pub mdh: u16,
    pub mdl: u16,
    pub mdc: u16,
    pub stkov: u16,
    pub stkun: u16,
}

impl CpuRegisters {
    pub fn new(ip: u16, cp: u16, sp: u16) -> CpuRegisters {
        CpuRegisters {
            ip,
            csp: 0,
            psw: Psw::empty(),
            sp,
            cp,
            mdh: 0,
            mdl: 0,
            mdc: 0,
            stkov: 0xFA00,
            stkun: 0xFC00,
        }
    }

    /// Physical address of the instruction at `ip`.
    pub fn code_address(&self, ip: u16) -> u32 {
        (u32::from(self.csp & 0xFF) << 16) | u32::from(ip)
    }

    pub fn md(&self) -> u32 {
        (u32::from(self.mdh) << 16) | u32::from(self.mdl)
    }

    pub fn set_md(&mut self, value: u32) {
        self.mdh = (value >> 16) as u16;
        self.mdl = value as u16;
    }

    /// Read a core register mapped at physical address `addr`, if
    /// there is one.  `addr` must be even.
    pub fn read_sfr(&self, addressing: &Addressing, addr: u32) -> Option<u16> {
        Some(match addr {
            SFR_DPP0 => addressing.dpp(0),
            SFR_DPP1 => addressing.dpp(1),
            SFR_DPP2 => addressing.dpp(2),
            SFR_DPP3 => addressing.dpp(3),
            SFR_CSP => self.csp,
            SFR_MDH => self.mdh,
            SFR_MDL => self.mdl,
            SFR_CP => self.cp,
            SFR_SP => self.sp,
            SFR_STKOV => self.stkov,
            SFR_STKUN => self.stkun,
            SFR_MDC => self.mdc,
            SFR_PSW => self.psw.raw(),
            SFR_ZEROS => 0x0000,
            SFR_ONES => 0xFFFF,
            _ => return None,
        })
    }

    /// Write a core register mapped at physical address `addr`.
    /// Returns false when no core register lives there.  CSP, ZEROS
    /// and ONES are read-only; writes to them are dropped.
    pub fn write_sfr(&mut self, addressing: &mut Addressing, addr: u32, value: u16) -> bool {
        match addr {
            SFR_DPP0 => addressing.set_dpp(0, value),
            SFR_DPP1 => addressing.set_dpp(1, value),
            SFR_DPP2 => addressing.set_dpp(2, value),
            SFR_DPP3 => addressing.set_dpp(3, value),
            SFR_MDH => self.mdh = value,
            SFR_MDL => self.mdl = value,
            // CP and SP are word aligned.
            SFR_CP => self.cp = value & !1,
            SFR_SP => self.sp = value & !1,
            SFR_STKOV => self.stkov = value & !1,
            SFR_STKUN => self.stkun = value & !1,
            SFR_MDC => self.mdc = value,
            SFR_PSW => self.psw = Psw::from_raw(value),
            SFR_CSP | SFR_ZEROS | SFR_ONES => (),
            _ => return false,
        }
        true
    }
}

/// A dump of the processor state, in raw form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub ip: u16,
    pub csp: u16,
    pub psw: u16,
    pub sp: u16,
    pub cp: u16,
    pub dpp: [u16; 4],
    pub mdh: u16,
    pub mdl: u16,
    pub mdc: u16,
    /// R0..R15, read through the current context pointer.
    pub gpr: Vec<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sfr_round_trip() {
        let mut regs = CpuRegisters::new(0, 0xFC00, 0xFC00);
        let mut addressing = Addressing::new();
        assert!(regs.write_sfr(&mut addressing, SFR_MDL, 0x1234));
        assert!(regs.write_sfr(&mut addressing, SFR_DPP3, 0x0007));
        assert!(regs.write_sfr(&mut addressing, SFR_PSW, Psw::C.bits() | Psw::IEN.bits()));
        assert_eq!(regs.read_sfr(&addressing, SFR_MDL), Some(0x1234));
        assert_eq!(addressing.dpp(3), 7);
        assert!(regs.psw.carry());
        assert!(regs.psw.interrupts_enabled());
        assert_eq!(regs.read_sfr(&addressing, 0xFE40), None);
        assert!(!regs.write_sfr(&mut addressing, 0xFE40, 1));
    }

    #[test]
    fn test_constant_registers_ignore_writes() {
        let mut regs = CpuRegisters::new(0, 0xFC00, 0xFC00);
        let mut addressing = Addressing::new();
        assert!(regs.write_sfr(&mut addressing, SFR_ZEROS, 0x5555));
        assert!(regs.write_sfr(&mut addressing, SFR_ONES, 0x5555));
        assert_eq!(regs.read_sfr(&addressing, SFR_ZEROS), Some(0));
        assert_eq!(regs.read_sfr(&addressing, SFR_ONES), Some(0xFFFF));
    }

    #[test]
    fn test_md_pair() {
        let mut regs = CpuRegisters::new(0, 0, 0);
        regs.set_md(0xDEAD_BEEF);
        assert_eq!((regs.mdh, regs.mdl), (0xDEAD, 0xBEEF));
        assert_eq!(regs.md(), 0xDEAD_BEEF);
    }
}
