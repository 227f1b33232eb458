//! Fatal and recoverable faults.
//!
//! Recoverable problems (an access to unmapped memory, an
//! unimplemented opcode) are logged where they happen and counted in
//! [`FaultCounters`]; the simulation carries on.  Anything else
//! stops the run with a [`SimulationFault`], which says which
//! subsystem failed and where the simulated machine was at the time.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Configuration,
    Scheduler,
    Bus,
    Cpu,
}

impl Display for Subsystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Subsystem::Configuration => "configuration",
            Subsystem::Scheduler => "scheduler",
            Subsystem::Bus => "bus",
            Subsystem::Cpu => "cpu",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationFault {
    pub subsystem: Subsystem,
    pub cycle: u64,
    /// Physical address of the instruction being executed.
    pub ip: u32,
    pub detail: String,
}

impl SimulationFault {
    pub fn new(subsystem: Subsystem, cycle: u64, ip: u32, detail: impl Display) -> SimulationFault {
        SimulationFault {
            subsystem,
            cycle,
            ip,
            detail: detail.to_string(),
        }
    }
}

impl Display for SimulationFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fatal {} fault at cycle {} (ip={:#08x}): {}",
            self.subsystem, self.cycle, self.ip, self.detail
        )
    }
}

impl Error for SimulationFault {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultCounters {
    pub unmapped_reads: u64,
    pub unmapped_writes: u64,
    pub read_only_writes: u64,
    pub illegal_opcodes: u64,
    pub divide_errors: u64,
}

impl FaultCounters {
    pub fn total(&self) -> u64 {
        self.unmapped_reads
            + self.unmapped_writes
            + self.read_only_writes
            + self.illegal_opcodes
            + self.divide_errors
    }
}

impl Display for FaultCounters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} unmapped reads, {} unmapped writes, {} writes to read-only memory, {} illegal opcodes, {} divide errors",
            self.unmapped_reads,
            self.unmapped_writes,
            self.read_only_writes,
            self.illegal_opcodes,
            self.divide_errors
        )
    }
}

#[test]
fn test_fault_display_names_subsystem_cycle_and_ip() {
    let fault = SimulationFault::new(Subsystem::Cpu, 1234, 0x00_0200, "fetch failed");
    assert_eq!(
        fault.to_string(),
        "fatal cpu fault at cycle 1234 (ip=0x000200): fetch failed"
    );
}
