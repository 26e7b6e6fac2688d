//! Cancellable scheduled work with a single owner.
//!
//! A `ScheduledTask` holds at most one spawned timer task. Scheduling through
//! it aborts whatever was scheduled before, and dropping it aborts the task,
//! so "stop before restart" cannot be forgotten.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Shortest period `schedule_every` will tick at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` once after `delay`, superseding anything already scheduled.
    pub fn schedule_once<F>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            action();
        }));
    }

    /// Run `action` every `period`, first after one full period.
    ///
    /// The loop ends when `action` returns `false` (e.g. its channel closed).
    /// A zero `period` is raised to `MIN_PERIOD`.
    pub fn schedule_every<F>(&mut self, period: Duration, mut action: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.cancel();
        let period = period.max(MIN_PERIOD);
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !action() {
                    break;
                }
            }
        }));
    }

    /// Abort the scheduled task. Returns whether one was still pending.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Whether a task is scheduled and has not run to completion.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
