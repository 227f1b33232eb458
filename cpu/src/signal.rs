//! Level-based signal lines, such as interrupt request wires.
//!
//! A line has any number of drivers, each of which drives it low,
//! drives it high, or leaves it open (high impedance).  A line may
//! also have a pull-up or pull-down resistor which sets its level
//! when nothing drives it.  Low wins over high, which is what makes
//! a shared open-drain interrupt wire work: any one device pulling
//! it low asserts the request.
//!
//! There is no queue of edges.  Whoever is interested in a line (for
//! example the CPU, at each instruction boundary) samples its level.
use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drive {
    Low,
    High,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pull {
    Up,
    Down,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalLevel {
    Low,
    High,
    /// Nothing drives the line and it has no pull resistor.
    Floating,
}

impl Display for SignalLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalLevel::Low => "low",
            SignalLevel::High => "high",
            SignalLevel::Floating => "floating",
        })
    }
}

/// Identifies one driver of a [`SignalLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(usize);

#[derive(Debug)]
pub struct SignalLine {
    name: String,
    pull: Pull,
    drivers: Vec<(String, Drive)>,
}

/// Lines are shared between the devices driving them and whoever
/// samples them.
pub type SharedSignal = Rc<RefCell<SignalLine>>;

impl SignalLine {
    pub fn new(name: &str, pull: Pull) -> SignalLine {
        SignalLine {
            name: name.to_string(),
            pull,
            drivers: Vec::new(),
        }
    }

    pub fn shared(name: &str, pull: Pull) -> SharedSignal {
        Rc::new(RefCell::new(SignalLine::new(name, pull)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a new driver.  It starts out open.
    pub fn attach(&mut self, owner: &str) -> DriverId {
        self.drivers.push((owner.to_string(), Drive::Open));
        DriverId(self.drivers.len() - 1)
    }

    pub fn drive(&mut self, id: DriverId, drive: Drive) {
        let before = self.level();
        let Some(slot) = self.drivers.get_mut(id.0) else {
            return;
        };
        slot.1 = drive;
        let after = self.level();
        if before != after {
            event!(
                Level::TRACE,
                "{} now {} ({} drives {:?})",
                self.name,
                after,
                self.drivers[id.0].0,
                drive
            );
        }
        if self.is_contended() {
            event!(
                Level::DEBUG,
                "{} is driven both high and low; low wins",
                self.name
            );
        }
    }

    fn is_contended(&self) -> bool {
        let mut low = false;
        let mut high = false;
        for (_, d) in &self.drivers {
            match d {
                Drive::Low => low = true,
                Drive::High => high = true,
                Drive::Open => (),
            }
        }
        low && high
    }

    pub fn level(&self) -> SignalLevel {
        let mut driven_high = false;
        for (_, d) in &self.drivers {
            match d {
                Drive::Low => return SignalLevel::Low,
                Drive::High => driven_high = true,
                Drive::Open => (),
            }
        }
        if driven_high {
            return SignalLevel::High;
        }
        match self.pull {
            Pull::Up => SignalLevel::High,
            Pull::Down => SignalLevel::Low,
            Pull::None => SignalLevel::Floating,
        }
    }

    /// True when an active-low line is asserted.  A floating line is
    /// not.
    pub fn is_asserted_low(&self) -> bool {
        self.level() == SignalLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_sets_idle_level() {
        assert_eq!(SignalLine::new("a", Pull::Up).level(), SignalLevel::High);
        assert_eq!(SignalLine::new("b", Pull::Down).level(), SignalLevel::Low);
        assert_eq!(SignalLine::new("c", Pull::None).level(), SignalLevel::Floating);
    }

    #[test]
    fn test_open_drain_wired_and() {
        let mut irq = SignalLine::new("irq", Pull::Up);
        let uart = irq.attach("uart");
        let timer = irq.attach("timer");
        assert!(!irq.is_asserted_low());
        irq.drive(uart, Drive::Low);
        assert!(irq.is_asserted_low());
        irq.drive(timer, Drive::Low);
        irq.drive(uart, Drive::Open);
        // The timer still holds the line low.
        assert!(irq.is_asserted_low());
        irq.drive(timer, Drive::Open);
        assert_eq!(irq.level(), SignalLevel::High);
    }

    #[test]
    fn test_low_beats_high() {
        let mut line = SignalLine::new("line", Pull::Down);
        let a = line.attach("a");
        let b = line.attach("b");
        line.drive(a, Drive::High);
        assert_eq!(line.level(), SignalLevel::High);
        line.drive(b, Drive::Low);
        assert_eq!(line.level(), SignalLevel::Low);
    }
}
