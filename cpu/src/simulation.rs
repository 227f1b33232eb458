//! One simulated machine: a C16x core, its bus and its logical clock.
//!
//! A [`Simulation`] owns all the mutable state of the simulated
//! system, so several can exist side by side (which the tests rely
//! on).  The run loop is:
//!
//! 1. If the interrupt request line is asserted, try to enter the
//!    interrupt handler; otherwise execute one instruction.
//! 2. Advance the clock by the cycles that took.
//! 3. If a timer is due, fire the timers.
//!
//! Timer callbacks therefore only ever run between instructions.
use tracing::{event, span, Level};

use base::prelude::*;

use crate::bus::{Bus, BusError};
use crate::c16x::{Cpu, CpuSnapshot, Step, StepOutcome};
use crate::clock::ClockRate;
use crate::config::SimulationConfig;
use crate::fault::{FaultCounters, SimulationFault, Subsystem};
use crate::memory::Ram;
use crate::signal::SharedSignal;
use crate::timer::CycleTimer;

/// Why [`Simulation::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    InstructionLimit,
    CycleLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stop: StopReason,
    /// Instructions executed during this call (not counting
    /// interrupt entries).
    pub instructions: u64,
    /// The cycle count when the run stopped.
    pub cycles: u64,
}

#[derive(Debug)]
pub struct Simulation {
    cpu: Cpu,
    bus: Bus,
    timer: CycleTimer,
    clock: ClockRate,
    irq: Option<SharedSignal>,
    instructions: u64,
}

fn configuration_fault(detail: impl std::fmt::Display) -> SimulationFault {
    SimulationFault::new(Subsystem::Configuration, 0, 0, detail)
}

impl Simulation {
    /// Build a machine with RAM mapped as `config` says and the CPU
    /// in its reset state.
    ///
    /// # Errors
    ///
    /// A zero clock rate, or a RAM region which can't be mapped, is a
    /// configuration fault.
    pub fn new(config: &SimulationConfig) -> Result<Simulation, SimulationFault> {
        let clock = ClockRate::new(config.clock_hz).map_err(configuration_fault)?;
        let mut bus = Bus::new();
        bus.register_region(
            config.ram_base,
            config.ram_size,
            Endian::Little,
            "ram",
            Box::new(Ram::new(config.ram_size)),
        )
        .map_err(configuration_fault)?;
        event!(
            Level::INFO,
            "simulating at {} Hz with {:#x} bytes of RAM at {:#08x}",
            config.clock_hz,
            config.ram_size,
            config.ram_base
        );
        Ok(Simulation {
            cpu: Cpu::new(config),
            bus,
            timer: CycleTimer::new(),
            clock,
            irq: None,
            instructions: 0,
        })
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Peripherals are attached by registering regions here.
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn timer(&self) -> &CycleTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut CycleTimer {
        &mut self.timer
    }

    pub fn clock(&self) -> ClockRate {
        self.clock
    }

    pub fn now(&self) -> u64 {
        self.timer.now()
    }

    /// Total instructions executed so far.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn faults(&self) -> &FaultCounters {
        self.cpu.faults()
    }

    /// Have the CPU sample `line` (active low) as its interrupt
    /// request.
    pub fn connect_interrupt(&mut self, line: SharedSignal) {
        event!(
            Level::DEBUG,
            "interrupt request input connected to {}",
            line.borrow().name()
        );
        self.irq = Some(line);
    }

    /// Copy a program or data image into memory, byte by byte,
    /// through the bus.
    ///
    /// # Errors
    ///
    /// Fails if any part of the image would land outside writable
    /// memory.
    pub fn load_image(&mut self, address: u32, image: &[u8]) -> Result<(), SimulationFault> {
        for (addr, byte) in (address..).zip(image.iter()) {
            self.bus
                .write8(addr, *byte)
                .map_err(|e: BusError| SimulationFault::new(Subsystem::Bus, self.timer.now(), addr, e))?;
        }
        event!(
            Level::INFO,
            "loaded {} bytes at {:#08x}",
            image.len(),
            address
        );
        Ok(())
    }

    fn interrupt_requested(&self) -> bool {
        self.irq
            .as_ref()
            .is_some_and(|line| line.borrow().is_asserted_low())
    }

    /// Execute one instruction (or enter the interrupt handler), then
    /// fire any timers which have become due.
    ///
    /// # Errors
    ///
    /// A failed instruction fetch, or a timer callback which fails,
    /// stops the simulation.
    pub fn step(&mut self) -> Result<Step, SimulationFault> {
        let serviced = if self.interrupt_requested() {
            self.cpu.service_interrupt(&mut self.bus)
        } else {
            None
        };
        let step = match serviced {
            Some(step) => step,
            None => {
                let step = self.cpu.execute_instruction(&mut self.bus).map_err(|e| {
                    let fault = SimulationFault::new(Subsystem::Cpu, self.timer.now(), e.address, &e);
                    event!(Level::ERROR, "{}", fault);
                    fault
                })?;
                self.instructions += 1;
                step
            }
        };
        self.timer.advance(step.cycles);
        if self.timer.is_due() {
            self.timer.check().map_err(|e| {
                let fault = SimulationFault::new(
                    Subsystem::Scheduler,
                    self.timer.now(),
                    self.cpu.instruction_address(),
                    &e,
                );
                event!(Level::ERROR, "{}", fault);
                fault
            })?;
        }
        Ok(step)
    }

    /// Run until `max_instructions` more instructions have executed or
    /// the clock reaches `max_cycles`, whichever is first.
    ///
    /// # Errors
    ///
    /// Stops early on a fatal fault.
    pub fn run(
        &mut self,
        max_instructions: u64,
        max_cycles: u64,
    ) -> Result<RunSummary, SimulationFault> {
        let span = span!(Level::DEBUG, "run", max_instructions, max_cycles);
        let _enter = span.enter();
        let mut executed = 0;
        let stop = loop {
            if executed >= max_instructions {
                break StopReason::InstructionLimit;
            }
            if self.timer.now() >= max_cycles {
                break StopReason::CycleLimit;
            }
            if self.step()?.outcome != StepOutcome::Interrupt {
                executed += 1;
            }
        };
        let summary = RunSummary {
            stop,
            instructions: executed,
            cycles: self.timer.now(),
        };
        event!(
            Level::INFO,
            "stopped ({:?}) after {} instructions, at cycle {} ({} us of simulated time)",
            summary.stop,
            summary.instructions,
            summary.cycles,
            self.clock.microseconds_from_cycles(summary.cycles)
        );
        Ok(summary)
    }

    pub fn snapshot(&mut self) -> CpuSnapshot {
        self.cpu.snapshot(&mut self.bus)
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        let faults = self.cpu.faults();
        if faults.total() > 0 {
            event!(Level::WARN, "recoverable faults during this run: {}", faults);
        }
    }
}
