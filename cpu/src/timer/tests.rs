use std::cell::RefCell;
use std::rc::Rc;

use test_strategy::proptest;

use super::{CycleTimer, TimerError, TimerId};

type Log = Rc<RefCell<Vec<(&'static str, u64)>>>;

fn recorder(log: &Log, label: &'static str) -> super::TimerCallback {
    let log = Rc::clone(log);
    Box::new(move |timer: &mut CycleTimer, _id: TimerId| {
        log.borrow_mut().push((label, timer.now()));
        Ok(())
    })
}

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn test_only_due_event_fires() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let x = timer.create("x", recorder(&log, "x"));
    let y = timer.create("y", recorder(&log, "y"));
    timer.schedule(x, 100).expect("x should arm");
    timer.schedule(y, 50).expect("y should arm");
    timer.advance(60);
    assert_eq!(timer.check(), Ok(1));
    assert_eq!(*log.borrow(), vec![("y", 60)]);
    assert!(timer.is_active(x));
    assert!(!timer.is_active(y));
    assert_eq!(timer.remaining(x), 40);
    assert_eq!(timer.remaining(y), 0);
}

#[test]
fn test_event_fires_exactly_once() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let t = timer.create("t", recorder(&log, "t"));
    timer.schedule(t, 10).expect("should arm");
    timer.advance(9);
    assert_eq!(timer.check(), Ok(0));
    assert!(log.borrow().is_empty());
    timer.advance(1);
    assert_eq!(timer.check(), Ok(1));
    timer.advance(100);
    assert_eq!(timer.check(), Ok(0));
    assert_eq!(*log.borrow(), vec![("t", 10)]);
}

#[test]
fn test_fires_in_deadline_order() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let late = timer.create("late", recorder(&log, "late"));
    let early = timer.create("early", recorder(&log, "early"));
    let middle = timer.create("middle", recorder(&log, "middle"));
    timer.schedule(late, 30).expect("should arm");
    timer.schedule(early, 10).expect("should arm");
    timer.schedule(middle, 20).expect("should arm");
    timer.advance(30);
    assert_eq!(timer.check(), Ok(3));
    let order: Vec<&str> = log.borrow().iter().map(|(label, _)| *label).collect();
    assert_eq!(order, vec!["early", "middle", "late"]);
}

#[test]
fn test_equal_deadlines_fire_in_arming_order() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let labels = ["a", "b", "c", "d"];
    let ids: Vec<TimerId> = labels
        .iter()
        .map(|&label| timer.create(label, recorder(&log, label)))
        .collect();
    for id in ids.iter().rev() {
        timer.schedule(*id, 5).expect("should arm");
    }
    timer.advance(5);
    timer.check().expect("callbacks succeed");
    let order: Vec<&str> = log.borrow().iter().map(|(label, _)| *label).collect();
    assert_eq!(order, vec!["d", "c", "b", "a"]);
}

#[test]
fn test_reschedule_replaces_old_deadline() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let t = timer.create("t", recorder(&log, "t"));
    timer.schedule(t, 10).expect("should arm");
    timer.reschedule(t, 50).expect("should re-arm");
    assert_eq!(timer.pending(), 1);
    assert_eq!(timer.deadline(t), Some(50));
    timer.advance(20);
    assert_eq!(timer.check(), Ok(0));
    timer.advance(30);
    assert_eq!(timer.check(), Ok(1));
    assert_eq!(*log.borrow(), vec![("t", 50)]);
}

#[test]
fn test_schedule_while_active_is_refused() {
    let mut timer = CycleTimer::new();
    let t = timer.create("t", Box::new(|_, _| Ok(())));
    timer.schedule(t, 10).expect("should arm");
    assert_eq!(
        timer.schedule(t, 5),
        Err(TimerError::AlreadyActive { id: t, deadline: 10 })
    );
    assert_eq!(timer.pending(), 1);
}

#[test]
fn test_cancel_is_harmless() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let a = timer.create("a", recorder(&log, "a"));
    let b = timer.create("b", recorder(&log, "b"));
    // Not armed yet.
    timer.cancel(a);
    timer.schedule(a, 5).expect("should arm");
    timer.schedule(b, 5).expect("should arm");
    timer.advance(5);
    timer.check().expect("callbacks succeed");
    // Already fired.
    timer.cancel(a);
    timer.cancel(a);
    timer.schedule(b, 5).expect("should arm");
    timer.cancel(a);
    assert!(timer.is_active(b));
    timer.advance(5);
    timer.check().expect("callbacks succeed");
    assert_eq!(*log.borrow(), vec![("a", 5), ("b", 5), ("b", 10)]);
}

#[test]
fn test_cancelled_event_does_not_fire() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let t = timer.create("t", recorder(&log, "t"));
    timer.schedule(t, 3).expect("should arm");
    timer.cancel(t);
    assert_eq!(timer.next_deadline(), None);
    assert!(!timer.is_due());
    timer.advance(10);
    assert_eq!(timer.check(), Ok(0));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_unknown_timer_fails_fast() {
    let mut timer = CycleTimer::new();
    let t = timer.create("t", Box::new(|_, _| Ok(())));
    timer.destroy(t).expect("should destroy");
    assert_eq!(timer.schedule(t, 1), Err(TimerError::UnknownTimer(t)));
    assert_eq!(timer.destroy(t), Err(TimerError::UnknownTimer(t)));
    assert!(!timer.is_active(t));
}

#[test]
fn test_periodic_self_rescheduling() {
    let count = Rc::new(RefCell::new(0_u32));
    let mut timer = CycleTimer::new();
    let counter = Rc::clone(&count);
    let t = timer.create(
        "periodic",
        Box::new(move |timer: &mut CycleTimer, me: TimerId| {
            *counter.borrow_mut() += 1;
            // A firing timer is inactive, so it can re-arm itself.
            timer.schedule(me, 10)
        }),
    );
    timer.schedule(t, 10).expect("should arm");
    for _ in 0..100 {
        timer.advance(1);
        timer.check().expect("callbacks succeed");
    }
    assert_eq!(*count.borrow(), 10);
    assert_eq!(timer.remaining(t), 10);
}

#[test]
fn test_zero_delay_from_callback_waits_for_next_check() {
    let count = Rc::new(RefCell::new(0_u32));
    let mut timer = CycleTimer::new();
    let counter = Rc::clone(&count);
    let t = timer.create(
        "eager",
        Box::new(move |timer: &mut CycleTimer, me: TimerId| {
            *counter.borrow_mut() += 1;
            timer.schedule(me, 0)
        }),
    );
    timer.schedule(t, 0).expect("should arm");
    assert_eq!(timer.check(), Ok(1));
    assert_eq!(timer.check(), Ok(1));
    assert_eq!(*count.borrow(), 2);
    assert!(timer.is_due());
}

#[test]
fn test_callback_can_destroy_itself() {
    let mut timer = CycleTimer::new();
    let t = timer.create(
        "once",
        Box::new(|timer: &mut CycleTimer, me: TimerId| {
            timer.destroy(me)
        }),
    );
    timer.schedule(t, 1).expect("should arm");
    timer.advance(1);
    assert_eq!(timer.check(), Ok(1));
    assert_eq!(timer.schedule(t, 1), Err(TimerError::UnknownTimer(t)));
}

#[test]
fn test_failing_callback_error_reaches_caller() {
    let log = new_log();
    let mut timer = CycleTimer::new();
    let gone = timer.create("gone", Box::new(|_, _| Ok(())));
    timer.destroy(gone).expect("should destroy");
    let bad = timer.create(
        "bad",
        Box::new(move |timer: &mut CycleTimer, _| timer.schedule(gone, 10)),
    );
    let after = timer.create("after", recorder(&log, "after"));
    timer.schedule(bad, 5).expect("should arm");
    timer.schedule(after, 6).expect("should arm");
    timer.advance(10);
    assert_eq!(timer.check(), Err(TimerError::UnknownTimer(gone)));
    // The later timer is still due and fires on the next check.
    assert!(timer.is_active(after));
    assert!(log.borrow().is_empty());
    assert_eq!(timer.check(), Ok(1));
    assert_eq!(*log.borrow(), vec![("after", 10)]);
}

#[test]
fn test_clock_never_runs_backward() {
    let mut timer = CycleTimer::new();
    timer.advance_to(100);
    timer.advance_to(50);
    assert_eq!(timer.now(), 100);
    timer.advance(0);
    assert_eq!(timer.now(), 100);
}

#[test]
fn test_cycles_until_next_event() {
    let mut timer = CycleTimer::new();
    assert_eq!(timer.cycles_until_next_event(), None);
    let t = timer.create("t", Box::new(|_, _| Ok(())));
    timer.schedule(t, 25).expect("should arm");
    timer.advance(5);
    assert_eq!(timer.cycles_until_next_event(), Some(20));
    timer.advance(30);
    assert_eq!(timer.cycles_until_next_event(), Some(0));
    assert_eq!(timer.remaining(t), -5);
}

#[derive(Debug, Clone, Copy, test_strategy::Arbitrary)]
enum Action {
    Schedule(#[strategy(0_usize..4)] usize, #[strategy(0_u64..50)] u64),
    Reschedule(#[strategy(0_usize..4)] usize, #[strategy(0_u64..50)] u64),
    Cancel(#[strategy(0_usize..4)] usize),
    Advance(#[strategy(0_u64..20)] u64),
    Check,
}

#[proptest]
fn clock_is_monotonic_and_each_arming_fires_at_most_once(actions: Vec<Action>) {
    let fired: Rc<RefCell<Vec<(usize, u64)>>> = Rc::new(RefCell::new(Vec::new()));
    let mut timer = CycleTimer::new();
    let ids: Vec<TimerId> = (0..4_usize)
        .map(|n| {
            let fired = Rc::clone(&fired);
            timer.create(
                "prop",
                Box::new(move |timer: &mut CycleTimer, _| {
                    fired.borrow_mut().push((n, timer.now()));
                    Ok(())
                }),
            )
        })
        .collect();
    let mut expected: Vec<Option<u64>> = vec![None; 4];
    let mut last_now = timer.now();
    for action in actions {
        match action {
            Action::Schedule(n, delay) => {
                let result = timer.schedule(ids[n], delay);
                if expected[n].is_some() {
                    assert!(result.is_err());
                } else {
                    assert!(result.is_ok());
                    expected[n] = Some(timer.now() + delay);
                }
            }
            Action::Reschedule(n, delay) => {
                timer.reschedule(ids[n], delay).expect("timer exists");
                expected[n] = Some(timer.now() + delay);
            }
            Action::Cancel(n) => {
                timer.cancel(ids[n]);
                expected[n] = None;
            }
            Action::Advance(cycles) => timer.advance(cycles),
            Action::Check => {
                fired.borrow_mut().clear();
                timer.check().expect("callbacks succeed");
                for (n, at) in fired.borrow().iter() {
                    let deadline = expected[*n].expect("only armed timers fire");
                    assert!(deadline <= *at);
                    expected[*n] = None;
                }
                for (n, deadline) in expected.iter().enumerate() {
                    if let Some(deadline) = deadline {
                        assert!(*deadline > timer.now(), "timer {n} was due but did not fire");
                    }
                }
            }
        }
        assert!(timer.now() >= last_now);
        last_now = timer.now();
        for (n, deadline) in expected.iter().enumerate() {
            assert_eq!(timer.is_active(ids[n]), deadline.is_some());
        }
    }
}
