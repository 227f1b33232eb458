//! The `base` crate holds the parts of the simulator which are pure
//! computation: they need neither a bus nor a clock.  The idea is
//! that a disassembler or a test harness could depend on the base
//! crate without needing the simulator library itself.

pub mod access;
pub mod collections;
pub mod condition;
pub mod flags;
pub mod prelude;
pub mod psw;
