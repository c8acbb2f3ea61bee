//! Frame-stepped timer facility.
//!
//! Deferred continuations (invulnerability blink, delayed drops, fades) are
//! scheduled here and come back as plain events from [`TimerService::advance`]
//! on a later frame. Nothing blocks; a pending timer can be cancelled.

use serde::{Deserialize, Serialize};

/// Slack applied when comparing due times, absorbs float accumulation error.
const DUE_EPSILON: f64 = 1e-9;

/// Opaque handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Scheduled<E> {
    handle: TimerHandle,
    due: f64,
    period: Option<f64>,
    event: E,
}

/// Scheduler driven by the frame loop. `E` is the continuation payload.
#[derive(Debug, Clone)]
pub struct TimerService<E> {
    now: f64,
    next_id: u64,
    timers: Vec<Scheduled<E>>,
    paused: bool,
}

impl<E: Clone> TimerService<E> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_id: 0,
            timers: Vec::new(),
            paused: false,
        }
    }

    /// Fire `event` once, `delay` seconds from now.
    pub fn schedule(&mut self, delay: f32, event: E) -> TimerHandle {
        self.push(delay, None, event)
    }

    /// Fire `event` every `period` seconds until cancelled. A non-positive
    /// period degrades to a one-shot timer.
    pub fn schedule_repeating(&mut self, period: f32, event: E) -> TimerHandle {
        if period > 0.0 {
            self.push(period, Some(f64::from(period)), event)
        } else {
            tracing::warn!(period, "repeating timer needs a positive period, firing once");
            self.push(0.0, None, event)
        }
    }

    fn push(&mut self, delay: f32, period: Option<f64>, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(Scheduled {
            handle,
            due: self.now + f64::from(delay.max(0.0)),
            period,
            event,
        });
        handle
    }

    /// Remove a pending timer. Unknown or already-fired handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        before != self.timers.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Advance the clock by `dt` seconds and return every event that came due,
    /// ordered by due time. Timers with equal due times fire in scheduling
    /// order. A repeating timer fires once per elapsed period.
    pub fn advance(&mut self, dt: f32) -> Vec<E> {
        if self.paused || !dt.is_finite() || dt < 0.0 {
            return Vec::new();
        }
        self.now += f64::from(dt);

        let mut fired = Vec::new();
        loop {
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= self.now + DUE_EPSILON)
                .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.handle.0.cmp(&b.handle.0)))
                .map(|(i, _)| i);

            let Some(index) = next else {
                break;
            };

            match self.timers[index].period {
                Some(period) => {
                    let timer = &mut self.timers[index];
                    timer.due += period;
                    fired.push(timer.event.clone());
                },
                None => {
                    let timer = self.timers.remove(index);
                    fired.push(timer.event);
                },
            }
        }
        fired
    }
}

impl<E: Clone> Default for TimerService<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a millisecond constant into timer seconds.
pub fn ms(millis: u64) -> f32 {
    millis as f32 / 1000.0
}
