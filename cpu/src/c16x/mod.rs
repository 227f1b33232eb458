//! Emulates the core of a C16x-family microcontroller.
//!
//! Within this emulator the core performs the following functions:
//!
//! - Instruction fetch, decode and dispatch
//! - Address translation (see [`addressing`])
//! - Maintaining the PSW condition flags
//! - Interrupt entry, at instruction boundaries
//!
//! The sixteen general purpose registers are not stored here.  They
//! are ordinary memory, found at the address in the context pointer
//! (CP): word register Rn is at CP+2n and byte register n (RL0, RH0,
//! RL1, ...) is at CP+n.  Switching register banks is just a matter
//! of changing CP.  GPR addresses go through the same translation as
//! any other data address, so remapping DPP3 or an EXTP/EXTS override
//! moves the register bank too.  Stack accesses use the physical
//! address in segment 0 directly.
//!
//! Accesses to unmapped memory are not fatal.  Reads return the
//! configured sentinel value, writes are dropped, and both are
//! counted.  An instruction fetch which fails, however, stops the
//! run since there is no sensible way to continue.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, span, Level};

pub mod addressing;
mod decode;
mod op_arith;
mod op_ext;
mod op_jump;
mod op_move;
mod op_muldiv;
mod op_shift;
pub mod registers;
mod timing;

use base::prelude::*;

use crate::bus::{Bus, BusError};
use crate::config::SimulationConfig;
use crate::fault::FaultCounters;

pub use addressing::{Addressing, ExtendedKind, Override};
pub use decode::{instruction_length, Instruction};
pub use registers::{CpuRegisters, CpuSnapshot};

use timing::{instruction_cycles, INTERRUPT_ENTRY_CYCLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    Executed,
    /// The opcode is not implemented; it was skipped.
    Unimplemented,
    /// No instruction was executed; the CPU entered an interrupt
    /// handler instead.
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub outcome: StepOutcome,
    pub cycles: u64,
}

/// An instruction could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFault {
    pub address: u32,
    pub error: BusError,
}

impl Display for FetchFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to fetch instruction at {:#08x}: {}",
            self.address, self.error
        )
    }
}

impl Error for FetchFault {}

/// What an instruction did to the flow of control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Branched,
    /// EXTP, EXTS, EXTR, ATOMIC: the lock counter was just armed, so
    /// this instruction does not count against it.
    ArmedOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Unimplemented;

type Execution = Result<Flow, Unimplemented>;

/// A place an operand can be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// A GPR: word register number, or byte register number for byte
    /// operations.
    Gpr(u8),
    /// A short `reg` address.
    Reg(u8),
    /// A 16-bit data address, translated before use.
    Mem(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    At(Location),
    Immediate(u16),
}

#[derive(Debug)]
pub struct Cpu {
    regs: CpuRegisters,
    addressing: Addressing,
    conditions: ConditionTable,
    faults: FaultCounters,
    unmapped_read_value: u16,
    interrupt_vector: u16,
    division_warning_given: bool,
}

impl Cpu {
    pub fn new(config: &SimulationConfig) -> Cpu {
        let cpu = Cpu {
            regs: CpuRegisters::new(config.reset_ip, config.reset_cp & !1, config.reset_sp & !1),
            addressing: Addressing::new(),
            conditions: ConditionTable::build(),
            faults: FaultCounters::default(),
            unmapped_read_value: config.unmapped_read_value,
            interrupt_vector: config.interrupt_vector,
            division_warning_given: false,
        };
        event!(Level::DEBUG, "Initial CPU state is {:?}", &cpu.regs);
        cpu
    }

    pub fn registers(&self) -> &CpuRegisters {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut CpuRegisters {
        &mut self.regs
    }

    pub fn addressing(&self) -> &Addressing {
        &self.addressing
    }

    pub fn addressing_mut(&mut self) -> &mut Addressing {
        &mut self.addressing
    }

    pub fn psw(&self) -> Psw {
        self.regs.psw
    }

    pub fn faults(&self) -> &FaultCounters {
        &self.faults
    }

    /// Physical address of the next instruction.
    pub fn instruction_address(&self) -> u32 {
        self.regs.code_address(self.regs.ip)
    }

    pub fn set_extended_mode(&mut self, kind: ExtendedKind, base: u32, count: u8) {
        self.addressing.set_extended_mode(kind, base, count);
    }

    pub fn evaluate_condition(&self, cc: ConditionCode) -> bool {
        self.conditions.evaluate(cc, self.regs.psw)
    }

    fn apply_flags(&mut self, delta: FlagDelta) {
        self.regs.psw = delta.apply(self.regs.psw);
    }

    fn note_read_failure(&mut self, e: &BusError) {
        self.faults.unmapped_reads += 1;
        event!(
            Level::WARN,
            "{}; read as {:#06x}",
            e,
            self.unmapped_read_value
        );
    }

    fn note_write_failure(&mut self, e: &BusError) {
        match e {
            BusError::ReadOnly(_) => self.faults.read_only_writes += 1,
            _ => self.faults.unmapped_writes += 1,
        }
        event!(Level::WARN, "{}; write dropped", e);
    }

    fn read_core_register(&self, addr: u32, width: Width) -> Option<u16> {
        let word = self.regs.read_sfr(&self.addressing, addr & !1)?;
        Some(match width {
            Width::Word => word,
            Width::Byte if addr & 1 == 0 => word & 0x00FF,
            Width::Byte => word >> 8,
        })
    }

    /// Read physical memory, seeing core registers at their SFR
    /// addresses.
    fn phys_read(&mut self, bus: &mut Bus, addr: u32, width: Width) -> u16 {
        if let Some(value) = self.read_core_register(addr, width) {
            return value;
        }
        match bus.read(addr, width.into()) {
            Ok(value) => value as u16,
            Err(e) => {
                self.note_read_failure(&e);
                self.unmapped_read_value & width.mask()
            }
        }
    }

    fn phys_write(&mut self, bus: &mut Bus, addr: u32, width: Width, value: u16) {
        let value = value & width.mask();
        let aligned = addr & !1;
        if let Some(word) = self.regs.read_sfr(&self.addressing, aligned) {
            let merged = match width {
                Width::Word => value,
                Width::Byte if addr & 1 == 0 => (word & 0xFF00) | value,
                Width::Byte => (word & 0x00FF) | (value << 8),
            };
            self.regs.write_sfr(&mut self.addressing, aligned, merged);
            return;
        }
        if let Err(e) = bus.write(addr, width.into(), value.into()) {
            self.note_write_failure(&e);
        }
    }

    /// Read through the data address translation.
    pub fn read_data(&mut self, bus: &mut Bus, logical: u16, width: Width) -> u16 {
        let phys = self.addressing.translate(logical);
        self.phys_read(bus, phys, width)
    }

    pub fn write_data(&mut self, bus: &mut Bus, logical: u16, width: Width, value: u16) {
        let phys = self.addressing.translate(logical);
        self.phys_write(bus, phys, width, value);
    }

    fn gpr_address(&self, n: u8, width: Width) -> u32 {
        let offset = u16::from(n & 0x0F) * width.bytes();
        self.addressing.translate(self.regs.cp.wrapping_add(offset))
    }

    fn read_gpr(&mut self, bus: &mut Bus, n: u8, width: Width) -> u16 {
        let addr = self.gpr_address(n, width);
        self.phys_read(bus, addr, width)
    }

    fn write_gpr(&mut self, bus: &mut Bus, n: u8, width: Width, value: u16) {
        let addr = self.gpr_address(n, width);
        self.phys_write(bus, addr, width, value);
    }

    pub fn read_gpr16(&mut self, bus: &mut Bus, n: u8) -> u16 {
        self.read_gpr(bus, n, Width::Word)
    }

    pub fn read_gpr8(&mut self, bus: &mut Bus, n: u8) -> u8 {
        self.read_gpr(bus, n, Width::Byte) as u8
    }

    pub fn write_gpr16(&mut self, bus: &mut Bus, n: u8, value: u16) {
        self.write_gpr(bus, n, Width::Word, value);
    }

    pub fn write_gpr8(&mut self, bus: &mut Bus, n: u8, value: u8) {
        self.write_gpr(bus, n, Width::Byte, value.into());
    }

    /// Short `reg` addressing: 0xF0 and above name a GPR, anything
    /// else a (E)SFR word.
    fn reg_address(&self, rr: u8) -> Result<u8, u32> {
        if rr >= 0xF0 {
            Ok(rr & 0x0F)
        } else {
            Err(self.addressing.sfr_base() + 2 * u32::from(rr))
        }
    }

    fn read_reg(&mut self, bus: &mut Bus, rr: u8, width: Width) -> u16 {
        match self.reg_address(rr) {
            Ok(n) => self.read_gpr(bus, n, width),
            Err(addr) => self.phys_read(bus, addr, width),
        }
    }

    fn write_reg(&mut self, bus: &mut Bus, rr: u8, width: Width, value: u16) {
        match self.reg_address(rr) {
            Ok(n) => self.write_gpr(bus, n, width, value),
            Err(addr) => self.phys_write(bus, addr, width, value),
        }
    }

    fn read_location(&mut self, bus: &mut Bus, loc: Location, width: Width) -> u16 {
        match loc {
            Location::Gpr(n) => self.read_gpr(bus, n, width),
            Location::Reg(rr) => self.read_reg(bus, rr, width),
            Location::Mem(addr) => self.read_data(bus, addr, width),
        }
    }

    fn write_location(&mut self, bus: &mut Bus, loc: Location, width: Width, value: u16) {
        match loc {
            Location::Gpr(n) => self.write_gpr(bus, n, width, value),
            Location::Reg(rr) => self.write_reg(bus, rr, width, value),
            Location::Mem(addr) => self.write_data(bus, addr, width, value),
        }
    }

    fn read_source(&mut self, bus: &mut Bus, src: Source, width: Width) -> u16 {
        match src {
            Source::At(loc) => self.read_location(bus, loc, width),
            Source::Immediate(value) => value & width.mask(),
        }
    }

    /// Add `delta` to word register `n` (used for post-increment and
    /// pre-decrement addressing).
    fn bump_pointer(&mut self, bus: &mut Bus, n: u8, delta: i16) {
        let value = self.read_gpr16(bus, n);
        self.write_gpr16(bus, n, value.wrapping_add_signed(delta));
    }

    fn push(&mut self, bus: &mut Bus, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        let addr = u32::from(self.regs.sp);
        self.phys_write(bus, addr, Width::Word, value);
    }

    fn pop(&mut self, bus: &mut Bus) -> u16 {
        let addr = u32::from(self.regs.sp);
        let value = self.phys_read(bus, addr, Width::Word);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }

    fn fetch(&mut self, bus: &mut Bus) -> Result<Instruction, FetchFault> {
        let ip = self.regs.ip;
        let fetch_word = |bus: &mut Bus, address: u32| {
            bus.read16(address)
                .map_err(|error| FetchFault { address, error })
        };
        let first = fetch_word(bus, self.regs.code_address(ip))?;
        let second = if instruction_length(first as u8) == 4 {
            fetch_word(bus, self.regs.code_address(ip.wrapping_add(2)))?
        } else {
            0
        };
        Ok(Instruction::from_words(first, second))
    }

    /// Take an interrupt if interrupts are enabled and no EXT or
    /// ATOMIC sequence is in progress.  PSW, CSP and IP are pushed,
    /// further interrupts are disabled and execution continues at the
    /// interrupt vector in segment 0.  RETI undoes this.
    pub fn service_interrupt(&mut self, bus: &mut Bus) -> Option<Step> {
        if !self.regs.psw.interrupts_enabled() || self.addressing.is_locked() {
            return None;
        }
        let (psw, csp, ip) = (self.regs.psw.raw(), self.regs.csp, self.regs.ip);
        self.push(bus, psw);
        self.push(bus, csp);
        self.push(bus, ip);
        self.regs.psw.remove(Psw::IEN);
        self.regs.csp = 0;
        self.regs.ip = self.interrupt_vector;
        event!(
            Level::DEBUG,
            "interrupt taken at {:#04x}:{:#06x}, vectoring to {:#06x}",
            csp,
            ip,
            self.interrupt_vector
        );
        Some(Step {
            outcome: StepOutcome::Interrupt,
            cycles: INTERRUPT_ENTRY_CYCLES,
        })
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// # Errors
    ///
    /// Only a failed instruction fetch is an error.  Unimplemented
    /// opcodes and bad data accesses are logged, counted and skipped.
    pub fn execute_instruction(&mut self, bus: &mut Bus) -> Result<Step, FetchFault> {
        let address = self.instruction_address();
        let inst = self.fetch(bus)?;
        self.regs.ip = self.regs.ip.wrapping_add(u16::from(inst.length()));

        let span = span!(Level::TRACE, "xop", ip = address, op = %inst);
        let _enter = span.enter();
        let (outcome, flow) = match self.dispatch(bus, &inst) {
            Ok(flow) => {
                event!(Level::TRACE, "executed; psw now {}", self.regs.psw);
                (StepOutcome::Executed, flow)
            }
            Err(Unimplemented) => {
                self.faults.illegal_opcodes += 1;
                event!(
                    Level::WARN,
                    "opcode {:02X} at {:#08x} is not implemented; skipping {} bytes",
                    inst.opcode(),
                    address,
                    inst.length()
                );
                (StepOutcome::Unimplemented, Flow::Next)
            }
        };
        if flow != Flow::ArmedOverride {
            self.addressing.end_instruction();
        }
        Ok(Step {
            outcome,
            cycles: instruction_cycles(&inst, flow == Flow::Branched),
        })
    }

    fn dispatch(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        match inst.opcode() {
            // There is no CMP mem,reg.
            0x44 | 0x45 => Err(Unimplemented),
            op if op < 0x80 && (op & 0x0F) <= 0x09 => self.op_alu(bus, inst),
            0x81 | 0x91 | 0xA1 | 0xB1 => self.op_neg_cpl(bus, inst),
            0x0B | 0x1B => self.op_mul(bus, inst),
            0x4B | 0x5B | 0x6B | 0x7B => self.op_div(bus, inst),
            0x0C | 0x1C | 0x2C | 0x3C | 0x4C | 0x5C | 0x6C | 0x7C | 0xAC | 0xBC => {
                self.op_shift(bus, inst)
            }
            op if op & 0x0F == 0x0D => self.op_jmpr(inst),
            0xEA => self.op_jmpa(inst),
            0x9C => self.op_jmpi(bus, inst),
            0xFA => self.op_jmps(inst),
            0xBB => self.op_callr(bus, inst),
            0xCA => self.op_calla(bus, inst),
            0xAB => self.op_calli(bus, inst),
            0xDA => self.op_calls(bus, inst),
            0xCB => self.op_ret(bus),
            0xDB => self.op_rets(bus),
            0xFB => self.op_reti(bus),
            0xEC => self.op_push(bus, inst),
            0xFC => self.op_pop(bus, inst),
            0xCC => Ok(Flow::Next),
            0xD1 => self.op_atomic_extr(inst),
            0xD7 => self.op_ext_immediate(inst),
            0xDC => self.op_ext_register(bus, inst),
            0xF0 | 0xF1 | 0xE0 | 0xE1 | 0xE6 | 0xE7 | 0xF2 | 0xF3 | 0xF6 | 0xF7 | 0xA8 | 0xA9
            | 0x98 | 0x99 | 0xB8 | 0xB9 | 0x88 | 0x89 | 0xC8 | 0xC9 | 0xD8 | 0xD9 | 0xE8
            | 0xE9 | 0xD4 | 0xF4 | 0xC4 | 0xE4 | 0x84 | 0x94 | 0xA4 | 0xB4 => {
                self.op_mov(bus, inst)
            }
            _ => Err(Unimplemented),
        }
    }

    /// Capture the processor state.  The GPRs are read from the bus
    /// without counting failed reads as faults.
    pub fn snapshot(&self, bus: &mut Bus) -> CpuSnapshot {
        let gpr = (0..16_u8)
            .map(|n| {
                bus.read16(self.gpr_address(n, Width::Word))
                    .unwrap_or(self.unmapped_read_value)
            })
            .collect();
        CpuSnapshot {
            ip: self.regs.ip,
            csp: self.regs.csp,
            psw: self.regs.psw.raw(),
            sp: self.regs.sp,
            cp: self.regs.cp,
            dpp: self.addressing.dpps(),
            mdh: self.regs.mdh,
            mdl: self.regs.mdl,
            mdc: self.regs.mdc,
            gpr,
        }
    }
}
