//! This crate simulates a C16x-family microcontroller: the CPU core,
//! the bus its peripherals hang off, and the logical clock which
//! paces them.
#![crate_name = "cpu"]

mod bus;
pub mod c16x;
mod clock;
mod config;
mod fault;
mod memory;
mod signal;
mod simulation;
mod timer;

pub use bus::{AccessFault, Bus, BusDevice, BusError};
pub use c16x::{Cpu, CpuSnapshot, FetchFault, Step, StepOutcome};
pub use clock::{ClockRate, ZeroClockRate};
pub use config::SimulationConfig;
pub use fault::{FaultCounters, SimulationFault, Subsystem};
pub use memory::{Ram, Rom};
pub use signal::{Drive, DriverId, Pull, SharedSignal, SignalLevel, SignalLine};
pub use simulation::{RunSummary, Simulation, StopReason};
pub use timer::{CycleTimer, TimerCallback, TimerError, TimerId};
