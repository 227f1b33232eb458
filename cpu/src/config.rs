//! Parameters of a simulation run.
//!
//! Reading these from a file is left to the caller; the command-line
//! driver fills them in from its arguments.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// CPU clock in cycles per second.
    pub clock_hz: u64,
    pub ram_base: u32,
    pub ram_size: u32,
    /// Instruction pointer (offset in segment 0) at reset.
    pub reset_ip: u16,
    /// Context pointer at reset; R0 lives here.
    pub reset_cp: u16,
    /// Stack pointer at reset.  The stack grows downward.
    pub reset_sp: u16,
    /// Value returned for reads of unmapped memory.  All-ones matches
    /// erased flash.
    pub unmapped_read_value: u16,
    /// Where the CPU goes when it takes an interrupt.
    pub interrupt_vector: u16,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            clock_hz: 20_000_000,
            ram_base: 0,
            ram_size: 0x1_0000,
            reset_ip: 0,
            reset_cp: 0xFC00,
            reset_sp: 0xFC00,
            unmapped_read_value: 0xFFFF,
            interrupt_vector: 0x0040,
        }
    }
}
