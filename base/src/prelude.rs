//! The prelude exports the types which nearly every user of the base
//! crate needs.
pub use super::access::{AccessWidth, Endian};
pub use super::condition::{ConditionCode, ConditionCodeError, ConditionTable};
pub use super::flags::{FlagDelta, Width};
pub use super::psw::Psw;
