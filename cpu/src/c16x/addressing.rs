//! Translation of 16-bit data addresses to physical (bus) addresses.
//!
//! By default the top two bits of a data address select one of the
//! four data page pointers (DPP0..DPP3), which supplies a 10-bit page
//! number; the low 14 bits are the offset within the 16K page.
//!
//! The EXTP, EXTS, EXTR and ATOMIC instructions override this for a
//! small number (1 to 4) of following instructions:
//!
//! | Instruction | Effect during the locked sequence |
//! | ----------- | --------------------------------- |
//! | EXTP        | data accesses use the given page  |
//! | EXTS        | data accesses use the given segment (64K) |
//! | EXTR        | short `reg` addresses refer to the ESFR area |
//! | EXTPR/EXTSR | both of the above |
//! | ATOMIC      | no translation change; interrupts are held off |
//!
//! Arming a new override while one is in effect replaces it.  The
//! counter counts instructions, not memory accesses, so all the
//! accesses made by one instruction see the same translation.
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedKind {
    Atomic,
    /// EXTR.
    Esfr,
    /// EXTP.
    Page,
    /// EXTS.
    Segment,
    /// EXTPR.
    PageEsfr,
    /// EXTSR.
    SegmentEsfr,
}

impl Display for ExtendedKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtendedKind::Atomic => "ATOMIC",
            ExtendedKind::Esfr => "EXTR",
            ExtendedKind::Page => "EXTP",
            ExtendedKind::Segment => "EXTS",
            ExtendedKind::PageEsfr => "EXTPR",
            ExtendedKind::SegmentEsfr => "EXTSR",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Override {
    None,
    /// `base` is the physical address of the start of the page.
    Page { base: u32 },
    /// `base` is the physical address of the start of the segment.
    Segment { base: u32 },
}

pub const SFR_BASE: u32 = 0xFE00;
pub const ESFR_BASE: u32 = 0xF000;

const PAGE_OFFSET_MASK: u16 = 0x3FFF;
const PAGE_NUMBER_MASK: u16 = 0x03FF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressing {
    dpp: [u16; 4],
    mode: Override,
    esfr: bool,
    remaining: u8,
}

impl Default for Addressing {
    fn default() -> Self {
        Self::new()
    }
}

impl Addressing {
    /// The reset state: DPPn selects page n, so the first 64K of data
    /// addresses map straight through.
    pub fn new() -> Addressing {
        Addressing {
            dpp: [0, 1, 2, 3],
            mode: Override::None,
            esfr: false,
            remaining: 0,
        }
    }

    pub fn dpp(&self, n: usize) -> u16 {
        self.dpp[n & 3]
    }

    pub fn set_dpp(&mut self, n: usize, value: u16) {
        self.dpp[n & 3] = value & PAGE_NUMBER_MASK;
    }

    pub fn dpps(&self) -> [u16; 4] {
        self.dpp
    }

    /// Instructions still covered by the current override (including
    /// ATOMIC).
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    /// While locked, interrupts are not taken.
    pub fn is_locked(&self) -> bool {
        self.remaining > 0
    }

    pub fn current_override(&self) -> Override {
        if self.remaining > 0 {
            self.mode
        } else {
            Override::None
        }
    }

    /// Arm an override for the next `count` instructions.
    ///
    /// For `Page` kinds, `base` is the physical page base (the page
    /// number shifted left by 14); for `Segment` kinds, the physical
    /// segment base (the segment number shifted left by 16).  `base`
    /// is ignored for ATOMIC and EXTR.
    pub fn set_extended_mode(&mut self, kind: ExtendedKind, base: u32, count: u8) {
        let (mode, esfr) = match kind {
            ExtendedKind::Atomic => (Override::None, false),
            ExtendedKind::Esfr => (Override::None, true),
            ExtendedKind::Page => (Override::Page { base }, false),
            ExtendedKind::Segment => (Override::Segment { base }, false),
            ExtendedKind::PageEsfr => (Override::Page { base }, true),
            ExtendedKind::SegmentEsfr => (Override::Segment { base }, true),
        };
        self.mode = mode;
        self.esfr = esfr;
        self.remaining = count;
    }

    /// Called once after each instruction other than the one which
    /// armed the override.
    pub fn end_instruction(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.mode = Override::None;
                self.esfr = false;
            }
        }
    }

    /// Where short `reg` addresses point: the SFR area, or the ESFR
    /// area while an EXTR-type override is in effect.
    pub fn sfr_base(&self) -> u32 {
        if self.esfr && self.remaining > 0 {
            ESFR_BASE
        } else {
            SFR_BASE
        }
    }

    /// Translate a 16-bit data address.  This has no side effects.
    pub fn translate(&self, logical: u16) -> u32 {
        match self.current_override() {
            Override::Page { base } => base | u32::from(logical & PAGE_OFFSET_MASK),
            Override::Segment { base } => base | u32::from(logical),
            Override::None => {
                let page = self.dpp[usize::from(logical >> 14)] & PAGE_NUMBER_MASK;
                (u32::from(page) << 14) | u32::from(logical & PAGE_OFFSET_MASK)
            }
        }
    }
}
