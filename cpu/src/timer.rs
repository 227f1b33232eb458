//! The logical clock and the queue of timed events.
//!
//! Simulated time is a cycle counter which only moves forward, and
//! only when the simulation says so (normally by the number of cycles
//! the last instruction took).  Subsystems which need to do something
//! at a later simulated instant create a timer, then arm it with a
//! delay in cycles.  After every instruction the run loop calls
//! [`CycleTimer::check`], which fires every timer whose deadline has
//! been reached.
//!
//! The run loop asks [`CycleTimer::is_due`] on every instruction, so
//! the earliest deadline is cached and that check is a single
//! comparison.  Arming and cancelling are O(log n).
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

use tracing::{event, Level};

use base::collections::pq::KeyedMinPriorityQueue;

/// Identifies a timer created by [`CycleTimer::create`].  Ids are
/// never reused, so a stale id can't refer to somebody else's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl Display for TimerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// The function run when a timer fires.  It gets the timer subsystem
/// (so that it can re-arm itself or others) and its own id.  An error
/// (typically from re-arming) is passed back out of
/// [`CycleTimer::check`].
pub type TimerCallback = Box<dyn FnMut(&mut CycleTimer, TimerId) -> Result<(), TimerError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The id was never created, or the timer has been destroyed.
    UnknownTimer(TimerId),
    /// The timer is already armed.  Use [`CycleTimer::reschedule`] to
    /// move its deadline.
    AlreadyActive { id: TimerId, deadline: u64 },
}

impl Display for TimerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::UnknownTimer(id) => write!(f, "{id} does not exist"),
            TimerError::AlreadyActive { id, deadline } => {
                write!(f, "{id} is already scheduled to fire at cycle {deadline}")
            }
        }
    }
}

impl Error for TimerError {}

/// Queue priority: the deadline, then the order in which timers were
/// armed, so that timers with equal deadlines fire in arming order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline {
    cycle: u64,
    seq: u64,
}

struct TimerSlot {
    name: String,
    // None only while the callback is running.
    callback: Option<TimerCallback>,
    deadline: Option<u64>,
}

impl Debug for TimerSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSlot")
            .field("name", &self.name)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct CycleTimer {
    now: u64,
    // Equal to the earliest deadline in `queue`, or u64::MAX.
    next_deadline: u64,
    queue: KeyedMinPriorityQueue<TimerId, Deadline>,
    slots: HashMap<TimerId, TimerSlot>,
    next_id: u64,
    next_seq: u64,
}

impl Default for CycleTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleTimer {
    pub fn new() -> CycleTimer {
        CycleTimer {
            now: 0,
            next_deadline: u64::MAX,
            queue: KeyedMinPriorityQueue::new(),
            slots: HashMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// The current cycle count.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// True when at least one timer's deadline has been reached.
    #[inline]
    pub fn is_due(&self) -> bool {
        self.now >= self.next_deadline
    }

    /// The earliest pending deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.peek().map(|(_, deadline)| deadline.cycle)
    }

    /// How far the clock could advance before a timer needs to fire.
    pub fn cycles_until_next_event(&self) -> Option<u64> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_sub(self.now))
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Let `cycles` of simulated time pass.  Timers are not fired;
    /// that is the job of [`CycleTimer::check`].
    pub fn advance(&mut self, cycles: u64) {
        self.now = self.now.saturating_add(cycles);
    }

    /// Move the clock forward to `cycle`.  The clock never runs
    /// backward, so a `cycle` in the past is ignored.
    pub fn advance_to(&mut self, cycle: u64) {
        if cycle > self.now {
            self.now = cycle;
        }
    }

    fn refresh_next_deadline(&mut self) {
        self.next_deadline = self
            .queue
            .peek()
            .map_or(u64::MAX, |(_, deadline)| deadline.cycle);
    }

    pub fn create(&mut self, name: &str, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            TimerSlot {
                name: name.to_string(),
                callback: Some(callback),
                deadline: None,
            },
        );
        event!(Level::DEBUG, "created {} ({})", id, name);
        id
    }

    /// Disarm and forget a timer.  Its id becomes invalid.
    ///
    /// # Errors
    ///
    /// `TimerError::UnknownTimer` if the id does not exist.
    pub fn destroy(&mut self, id: TimerId) -> Result<(), TimerError> {
        self.cancel(id);
        match self.slots.remove(&id) {
            Some(slot) => {
                event!(Level::DEBUG, "destroyed {} ({})", id, slot.name);
                Ok(())
            }
            None => Err(TimerError::UnknownTimer(id)),
        }
    }

    /// Arm timer `id` to fire `delay` cycles from now.  A delay of 0
    /// fires it at the next call to [`CycleTimer::check`].
    ///
    /// # Errors
    ///
    /// Fails if the timer doesn't exist or is already armed.
    pub fn schedule(&mut self, id: TimerId, delay: u64) -> Result<(), TimerError> {
        self.schedule_at(id, self.now.saturating_add(delay))
    }

    /// Arm timer `id` to fire at absolute cycle `deadline`.  A
    /// deadline in the past is treated as "now".
    ///
    /// # Errors
    ///
    /// Fails if the timer doesn't exist or is already armed.
    pub fn schedule_at(&mut self, id: TimerId, deadline: u64) -> Result<(), TimerError> {
        let deadline = deadline.max(self.now);
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(TimerError::UnknownTimer(id))?;
        if let Some(existing) = slot.deadline {
            return Err(TimerError::AlreadyActive {
                id,
                deadline: existing,
            });
        }
        slot.deadline = Some(deadline);
        event!(
            Level::TRACE,
            "arming {} ({}) for cycle {} (now {})",
            id,
            slot.name,
            deadline,
            self.now
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(
            id,
            Deadline {
                cycle: deadline,
                seq,
            },
        );
        if deadline < self.next_deadline {
            self.next_deadline = deadline;
        }
        Ok(())
    }

    /// Cancel any pending firing, then arm the timer `delay` cycles
    /// from now.  The old deadline never fires.
    ///
    /// # Errors
    ///
    /// Fails if the timer doesn't exist.
    pub fn reschedule(&mut self, id: TimerId, delay: u64) -> Result<(), TimerError> {
        self.cancel(id);
        self.schedule(id, delay)
    }

    /// Disarm a timer.  Cancelling a timer which is not armed (or has
    /// already fired, or doesn't exist) does nothing.
    pub fn cancel(&mut self, id: TimerId) {
        if let Some(slot) = self.slots.get_mut(&id) {
            if slot.deadline.take().is_some() {
                self.queue.remove(&id);
                event!(Level::TRACE, "cancelled {} ({})", id, slot.name);
                self.refresh_next_deadline();
            }
        }
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|slot| slot.deadline.is_some())
    }

    /// Cycles until the timer fires; 0 if it is not armed.  Negative
    /// when the deadline has passed but `check` has not yet run.
    pub fn remaining(&self, id: TimerId) -> i64 {
        match self.slots.get(&id).and_then(|slot| slot.deadline) {
            Some(deadline) => {
                let diff = i128::from(deadline) - i128::from(self.now);
                i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
            }
            None => 0,
        }
    }

    pub fn deadline(&self, id: TimerId) -> Option<u64> {
        self.slots.get(&id).and_then(|slot| slot.deadline)
    }

    /// Fire, in deadline order, every timer whose deadline is not
    /// after the current cycle.  Returns the number fired.
    ///
    /// Each timer is disarmed before its callback runs, so the
    /// callback may re-arm it.  A timer armed by a callback during
    /// this call does not fire until the next call, even with a delay
    /// of zero.
    ///
    /// # Errors
    ///
    /// Stops at the first callback which fails and returns its error.
    /// Timers which were due but had not yet fired stay armed.
    pub fn check(&mut self) -> Result<usize, TimerError> {
        if !self.is_due() {
            return Ok(0);
        }
        let horizon = self.next_seq;
        let mut fired = 0;
        while let Some((&id, &deadline)) = self.queue.peek() {
            if deadline.cycle > self.now || deadline.seq >= horizon {
                break;
            }
            self.queue.pop();
            self.refresh_next_deadline();
            let callback = match self.slots.get_mut(&id) {
                Some(slot) => {
                    slot.deadline = None;
                    event!(
                        Level::TRACE,
                        "firing {} ({}) due at cycle {} at cycle {}",
                        id,
                        slot.name,
                        deadline.cycle,
                        self.now
                    );
                    slot.callback.take()
                }
                None => None,
            };
            fired += 1;
            if let Some(mut callback) = callback {
                let outcome = callback(self, id);
                // The callback may have destroyed its own timer.
                if let Some(slot) = self.slots.get_mut(&id) {
                    slot.callback = Some(callback);
                }
                if let Err(e) = outcome {
                    event!(Level::ERROR, "{} failed after {} firings: {}", id, fired, e);
                    return Err(e);
                }
            }
        }
        Ok(fired)
    }
}

#[cfg(test)]
mod tests;
