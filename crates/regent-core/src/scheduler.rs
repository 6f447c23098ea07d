//! Deadline-ordered task queue with named, replaceable timers.
//!
//! The scheduler runs on either a virtual clock (tests, simulations) that
//! only moves when told to, or a realtime clock backed by
//! [`web_time::Instant`]. Tasks are opaque to it; the runtime decides what
//! a task is and when to drain due ones.
//!
//! Two tasks with the same deadline run in scheduling order. Scheduling a
//! named timer while a timer of the same name is pending cancels the
//! pending one and hands its task back.

use std::collections::{BTreeMap, HashMap};

use web_time::{Duration, Instant};

/// Time source for a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Time advances only through [`Scheduler::advance_to`].
    Virtual,
    /// Wall-clock time since the scheduler was created.
    Realtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct Scheduler<T> {
    clock: Clock,
    started: Instant,
    virtual_now: Duration,
    next_id: u64,
    tasks: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<u64, Duration>,
    named: HashMap<String, u64>,
    names: HashMap<u64, String>,
}

impl<T> Scheduler<T> {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            started: Instant::now(),
            virtual_now: Duration::ZERO,
            next_id: 0,
            tasks: BTreeMap::new(),
            deadlines: HashMap::new(),
            named: HashMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Time elapsed since the scheduler started.
    pub fn now(&self) -> Duration {
        match self.clock {
            Clock::Virtual => self.virtual_now,
            Clock::Realtime => self.started.elapsed(),
        }
    }

    /// Move a virtual clock forward to `at`. Never moves backwards; a no-op
    /// on realtime clocks.
    pub fn advance_to(&mut self, at: Duration) {
        if self.clock == Clock::Virtual && at > self.virtual_now {
            self.virtual_now = at;
        }
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        let deadline = self.now() + delay;
        self.tasks.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    /// Schedule under `name`, replacing any pending timer of that name.
    ///
    /// Returns the task of the replaced timer.
    pub fn schedule_named(&mut self, name: &str, delay: Duration, task: T) -> Option<T> {
        let replaced = self.cancel_named(name);
        let TimerId(id) = self.schedule(delay, task);
        self.named.insert(name.to_owned(), id);
        self.names.insert(id, name.to_owned());
        replaced
    }

    pub fn cancel(&mut self, timer: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&timer.0)?;
        if let Some(name) = self.names.remove(&timer.0) {
            self.named.remove(&name);
        }
        self.tasks.remove(&(deadline, timer.0))
    }

    pub fn cancel_named(&mut self, name: &str) -> Option<T> {
        let id = *self.named.get(name)?;
        self.cancel(TimerId(id))
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Remove and return the earliest task whose deadline has passed.
    pub fn pop_due(&mut self) -> Option<T> {
        let now = self.now();
        let (&(deadline, id), _) = self.tasks.first_key_value()?;
        if deadline > now {
            return None;
        }
        self.deadlines.remove(&id);
        if let Some(name) = self.names.remove(&id) {
            self.named.remove(&name);
        }
        self.tasks.remove(&(deadline, id))
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.tasks.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
