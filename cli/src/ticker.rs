//! A periodic timer peripheral, for trying out interrupt handlers.
//!
//! Every `period` cycles the ticker counts a tick and pulls the
//! interrupt request line low.  It has two word registers:
//!
//! | Offset | Read | Write |
//! | ------ | ---- | ----- |
//! | 0 | tick count (low 16 bits) | any value acknowledges the tick, releasing the line |
//! | 2 | 1 if a tick is unacknowledged, else 0 | ignored |
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use tracing::{event, Level};

use base::prelude::*;
use cpu::{
    AccessFault, BusDevice, BusError, Drive, DriverId, SharedSignal, Simulation, TimerError,
};

pub const TICKER_REGION_SIZE: u32 = 4;

#[derive(Debug)]
pub struct Ticker {
    irq: SharedSignal,
    driver: DriverId,
    ticks: u64,
    pending: bool,
}

impl Ticker {
    fn new(irq: SharedSignal) -> Ticker {
        let driver = irq.borrow_mut().attach("ticker");
        Ticker {
            irq,
            driver,
            ticks: 0,
            pending: false,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn tick(&mut self) {
        self.ticks += 1;
        self.pending = true;
        self.irq.borrow_mut().drive(self.driver, Drive::Low);
    }

    fn acknowledge(&mut self) {
        self.pending = false;
        self.irq.borrow_mut().drive(self.driver, Drive::Open);
    }
}

impl BusDevice for Ticker {
    fn read(&mut self, offset: u32, width: AccessWidth) -> Result<u32, AccessFault> {
        if width != AccessWidth::Word {
            return Err(AccessFault::UnsupportedWidth);
        }
        match offset {
            0 => Ok((self.ticks & 0xFFFF) as u32),
            2 => Ok(u32::from(self.pending)),
            _ => Err(AccessFault::UnsupportedWidth),
        }
    }

    fn write(&mut self, offset: u32, width: AccessWidth, _value: u32) -> Result<(), AccessFault> {
        if width != AccessWidth::Word {
            return Err(AccessFault::UnsupportedWidth);
        }
        match offset {
            0 => {
                self.acknowledge();
                Ok(())
            }
            2 => Ok(()),
            _ => Err(AccessFault::UnsupportedWidth),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerError {
    /// The registers could not be mapped.
    Map(BusError),
    /// The first tick could not be scheduled.
    Start(TimerError),
}

impl Display for TickerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TickerError::Map(e) => write!(f, "ticker registers could not be mapped: {e}"),
            TickerError::Start(e) => write!(f, "ticker could not start: {e}"),
        }
    }
}

impl Error for TickerError {}

impl From<BusError> for TickerError {
    fn from(e: BusError) -> TickerError {
        TickerError::Map(e)
    }
}

impl From<TimerError> for TickerError {
    fn from(e: TimerError) -> TickerError {
        TickerError::Start(e)
    }
}

/// Map a ticker at `base` and start it ticking every `period` cycles.
///
/// Once running, a tick which cannot re-arm the ticker's timer stops
/// the simulation with a scheduler fault.
///
/// # Errors
///
/// Fails if the ticker's registers can't be mapped at `base`, or its
/// timer can't be armed.
pub fn attach_ticker(
    sim: &mut Simulation,
    base: u32,
    period: u64,
    irq: SharedSignal,
) -> Result<Rc<RefCell<Ticker>>, TickerError> {
    let ticker = Rc::new(RefCell::new(Ticker::new(irq)));
    sim.bus_mut().register_region(
        base,
        TICKER_REGION_SIZE,
        Endian::Little,
        "ticker",
        Box::new(Rc::clone(&ticker)),
    )?;
    let period = period.max(1);
    let device = Rc::clone(&ticker);
    let timer = sim.timer_mut();
    let first = timer.now().saturating_add(period);
    // Ticks are due at exact multiples of the period, however late
    // the previous one was noticed.
    let mut next = first;
    let id = timer.create(
        "ticker",
        Box::new(move |timer, id| {
            device.borrow_mut().tick();
            next = next.saturating_add(period);
            timer.schedule_at(id, next)
        }),
    );
    timer.schedule_at(id, first)?;
    event!(
        Level::INFO,
        "ticker at {:#08x} fires every {} cycles",
        base,
        period
    );
    Ok(ticker)
}
