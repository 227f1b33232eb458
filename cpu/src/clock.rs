//! Conversion between simulated cycles and simulated time.
//!
//! The simulation never looks at the wall clock.  Time inside the
//! simulated system is a cycle count (see [`crate::CycleTimer`]);
//! peripherals which think in baud rates or timeouts convert their
//! intervals to cycles with a [`ClockRate`].
//!
//! All conversions are done in 128-bit integer arithmetic, so they
//! neither overflow nor lose precision for any rate and interval that
//! fits in a `u64`.  Conversions to cycles round down; a non-zero
//! interval which would round to zero cycles becomes one cycle so that
//! a peripheral never schedules a "short" delay as an immediate one.
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use conv::ValueFrom;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroClockRate {}

impl Display for ZeroClockRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("the CPU clock rate must be at least 1 cycle per second")
    }
}

impl Error for ZeroClockRate {}

/// The rate (in cycles per second) at which the logical clock runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockRate {
    cycles_per_second: u64,
}

impl ClockRate {
    /// # Errors
    ///
    /// A rate of zero cycles per second is rejected, since no
    /// interval could then be converted to cycles.
    pub fn new(cycles_per_second: u64) -> Result<ClockRate, ZeroClockRate> {
        if cycles_per_second == 0 {
            Err(ZeroClockRate {})
        } else {
            Ok(ClockRate { cycles_per_second })
        }
    }

    pub fn cycles_per_second(&self) -> u64 {
        self.cycles_per_second
    }

    fn cycles_from(&self, amount: u64, units_per_second: u128) -> u64 {
        let cycles = u128::from(amount) * u128::from(self.cycles_per_second) / units_per_second;
        let cycles = if cycles == 0 && amount != 0 { 1 } else { cycles };
        u64::try_from(cycles).unwrap_or(u64::MAX)
    }

    fn units_from(&self, cycles: u64, units_per_second: u128) -> u64 {
        let units = u128::from(cycles) * units_per_second / u128::from(self.cycles_per_second);
        u64::try_from(units).unwrap_or(u64::MAX)
    }

    pub fn cycles_from_seconds(&self, seconds: u64) -> u64 {
        self.cycles_from(seconds, 1)
    }

    pub fn cycles_from_milliseconds(&self, ms: u64) -> u64 {
        self.cycles_from(ms, 1_000)
    }

    pub fn cycles_from_microseconds(&self, us: u64) -> u64 {
        self.cycles_from(us, 1_000_000)
    }

    pub fn cycles_from_nanoseconds(&self, ns: u64) -> u64 {
        self.cycles_from(ns, NANOS_PER_SECOND)
    }

    pub fn seconds_from_cycles(&self, cycles: u64) -> u64 {
        self.units_from(cycles, 1)
    }

    pub fn milliseconds_from_cycles(&self, cycles: u64) -> u64 {
        self.units_from(cycles, 1_000)
    }

    pub fn microseconds_from_cycles(&self, cycles: u64) -> u64 {
        self.units_from(cycles, 1_000_000)
    }

    pub fn nanoseconds_from_cycles(&self, cycles: u64) -> u64 {
        self.units_from(cycles, NANOS_PER_SECOND)
    }

    pub fn cycles_from_duration(&self, d: &Duration) -> u64 {
        let nanos = d.as_nanos();
        let cycles = nanos * u128::from(self.cycles_per_second) / NANOS_PER_SECOND;
        let cycles = if cycles == 0 && nanos != 0 { 1 } else { cycles };
        u64::try_from(cycles).unwrap_or(u64::MAX)
    }

    pub fn duration_from_cycles(&self, cycles: u64) -> Duration {
        Duration::from_nanos(self.nanoseconds_from_cycles(cycles))
    }

    /// Simulated time in (fractional) seconds, for reporting only.
    pub fn seconds_f64_from_cycles(&self, cycles: u64) -> f64 {
        let c = f64::value_from(cycles).unwrap_or(f64::MAX);
        let rate = f64::value_from(self.cycles_per_second).unwrap_or(f64::MAX);
        c / rate
    }
}

#[test]
fn test_zero_rate_rejected() {
    assert_eq!(ClockRate::new(0), Err(ZeroClockRate {}));
}

#[test]
fn test_conversions_at_20mhz() {
    let rate = ClockRate::new(20_000_000).expect("valid rate");
    assert_eq!(rate.cycles_from_seconds(1), 20_000_000);
    assert_eq!(rate.cycles_from_milliseconds(3), 60_000);
    assert_eq!(rate.cycles_from_microseconds(5), 100);
    assert_eq!(rate.cycles_from_nanoseconds(50), 1);
    assert_eq!(rate.cycles_from_nanoseconds(120), 2);
    assert_eq!(rate.nanoseconds_from_cycles(1), 50);
    assert_eq!(rate.microseconds_from_cycles(100), 5);
    assert_eq!(rate.milliseconds_from_cycles(60_000), 3);
    assert_eq!(rate.seconds_from_cycles(40_000_000), 2);
}

#[test]
fn test_short_intervals_are_never_zero_cycles() {
    let rate = ClockRate::new(1_000).expect("valid rate");
    assert_eq!(rate.cycles_from_nanoseconds(1), 1);
    assert_eq!(rate.cycles_from_nanoseconds(0), 0);
    assert_eq!(rate.cycles_from_duration(&Duration::from_nanos(1)), 1);
}

#[test]
fn test_large_values_do_not_overflow() {
    let rate = ClockRate::new(u64::MAX).expect("valid rate");
    assert_eq!(rate.cycles_from_seconds(2), u64::MAX);
    assert_eq!(rate.seconds_from_cycles(u64::MAX), 1);
}

#[test]
fn test_duration_round_trip() {
    let rate = ClockRate::new(40_000_000).expect("valid rate");
    let d = Duration::from_micros(250);
    let cycles = rate.cycles_from_duration(&d);
    assert_eq!(cycles, 10_000);
    assert_eq!(rate.duration_from_cycles(cycles), d);
}
