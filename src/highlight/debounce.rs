// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trailing-edge debouncing driven by explicit timestamps.

use std::time::{Duration, Instant};

/// Holds the latest value until `delay` has passed without a newer one.
///
/// There is no timer thread: the owner passes `now` into [`fire`] whenever it
/// runs, and may use [`deadline`] to decide when to run next.
///
/// [`fire`]: Debouncer::fire
/// [`deadline`]: Debouncer::deadline
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Changes the delay for values armed from now on.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Stores `value` and moves the deadline to `now + delay`.
    pub fn arm(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.delay, value));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    /// Takes the value if its deadline has passed.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(deadline, _)| *deadline <= now);
        if due { self.cancel() } else { None }
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, value)| value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}
