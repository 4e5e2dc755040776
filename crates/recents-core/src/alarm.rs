#![forbid(unsafe_code)]

//! One-shot, cancelable, reschedulable alarm.
//!
//! The alarm has no thread and no callback. The owner advances it with
//! [`Alarm::tick`] from its frame loop and reacts when `tick` reports a fire.
//!
//! # Example
//!
//! ```rust
//! use recents_core::alarm::Alarm;
//! use std::time::Duration;
//!
//! let mut alarm = Alarm::new();
//! alarm.set(Duration::from_millis(500));
//! assert!(!alarm.tick(Duration::from_millis(499)));
//! assert!(alarm.tick(Duration::from_millis(1)));
//! assert!(!alarm.is_armed());
//! ```

use std::time::Duration;

/// A single pending deadline, measured as time remaining.
#[derive(Debug, Clone, Default)]
pub struct Alarm {
    remaining: Option<Duration>,
}

impl Alarm {
    /// Creates a disarmed alarm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the alarm to fire after `delay`, replacing any pending deadline.
    pub fn set(&mut self, delay: Duration) {
        self.remaining = Some(delay);
    }

    /// Disarms the alarm. Idempotent.
    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    /// Returns whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.remaining.is_some()
    }

    /// Time until the alarm fires, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    /// Advances the clock. Returns `true` exactly once, on the tick that
    /// reaches the deadline; the alarm is disarmed afterwards.
    pub fn tick(&mut self, delta: Duration) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };
        let left = remaining.saturating_sub(delta);
        if left.is_zero() {
            self.remaining = None;
            true
        } else {
            self.remaining = Some(left);
            false
        }
    }
}
