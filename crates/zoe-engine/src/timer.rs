//! Timer service used by `afterDeadline` exits.
//!
//! Zoe never polls a clock. It registers one wakeup per deadline offer and
//! reacts when the timer calls back.

use std::cell::{Cell, RefCell};
use std::fmt;

/// Callback invoked with the time at which it fired.
pub type WakeupHandler = Box<dyn FnOnce(u64)>;

/// An external source of time.
pub trait Timer {
    fn current_time(&self) -> u64;

    /// Call `handler` once, at the first tick at or after `deadline`.
    fn set_wakeup(&self, deadline: u64, handler: WakeupHandler);
}

struct Wakeup {
    deadline: u64,
    handler: WakeupHandler,
}

/// A timer that only moves when told to.
#[derive(Default)]
pub struct ManualTimer {
    now: Cell<u64>,
    pending: RefCell<Vec<Wakeup>>,
}

impl ManualTimer {
    pub fn new(start: u64) -> Self {
        Self {
            now: Cell::new(start),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Advance by one unit and fire due wakeups. Returns how many fired.
    pub fn tick(&self) -> usize {
        self.advance_to(self.now.get().saturating_add(1))
    }

    /// Move the clock forward to `time` and fire due wakeups in deadline
    /// order. The clock never moves backwards.
    pub fn advance_to(&self, time: u64) -> usize {
        let now = self.now.get().max(time);
        self.now.set(now);

        // Handlers may register new wakeups, so take the due ones out first.
        let mut due = {
            let mut pending = self.pending.borrow_mut();
            let (due, later): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|wakeup| wakeup.deadline <= now);
            *pending = later;
            due
        };
        due.sort_by_key(|wakeup| wakeup.deadline);

        let fired = due.len();
        for wakeup in due {
            tracing::debug!(deadline = wakeup.deadline, now, "timer wakeup");
            (wakeup.handler)(now);
        }
        fired
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl Timer for ManualTimer {
    fn current_time(&self) -> u64 {
        self.now.get()
    }

    fn set_wakeup(&self, deadline: u64, handler: WakeupHandler) {
        self.pending.borrow_mut().push(Wakeup { deadline, handler });
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimer")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn wakeups_fire_once_at_or_after_their_deadline() {
        let timer = ManualTimer::new(0);
        let fired = Rc::new(RefCell::new(Vec::new()));
        for deadline in [3, 1] {
            let fired = Rc::clone(&fired);
            timer.set_wakeup(deadline, Box::new(move |now| fired.borrow_mut().push((deadline, now))));
        }

        assert_eq!(timer.tick(), 1);
        assert_eq!(*fired.borrow(), vec![(1, 1)]);
        assert_eq!(timer.advance_to(10), 1);
        assert_eq!(*fired.borrow(), vec![(1, 1), (3, 10)]);
        assert_eq!(timer.tick(), 0);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn handlers_can_schedule_more_wakeups() {
        let timer = Rc::new(ManualTimer::new(5));
        let count = Rc::new(Cell::new(0));
        let inner_timer = Rc::clone(&timer);
        let inner_count = Rc::clone(&count);
        timer.set_wakeup(
            5,
            Box::new(move |now| {
                inner_count.set(inner_count.get() + 1);
                let count = Rc::clone(&inner_count);
                inner_timer.set_wakeup(now + 2, Box::new(move |_| count.set(count.get() + 1)));
            }),
        );

        timer.tick();
        assert_eq!(count.get(), 1);
        assert_eq!(timer.pending(), 1);
        timer.advance_to(8);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn clock_never_moves_backwards() {
        let timer = ManualTimer::new(10);
        timer.advance_to(4);
        assert_eq!(timer.current_time(), 10);
    }
}
