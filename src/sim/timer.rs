//! Session time and the elapsed-time display tick

use serde::{Deserialize, Serialize};

/// Elapsed session time, derived from wall-clock timestamps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionClock {
    started_at_ms: f64,
    stopped_at_ms: Option<f64>,
}

impl SessionClock {
    pub fn start(now_ms: f64) -> Self {
        Self {
            started_at_ms: now_ms,
            stopped_at_ms: None,
        }
    }

    pub fn started_at_ms(&self) -> f64 {
        self.started_at_ms
    }

    pub fn is_running(&self) -> bool {
        self.stopped_at_ms.is_none()
    }

    /// Freeze the clock; later calls keep the first stop time
    pub fn stop(&mut self, now_ms: f64) {
        if self.stopped_at_ms.is_none() {
            self.stopped_at_ms = Some(now_ms.max(self.started_at_ms));
        }
    }

    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        let end = self.stopped_at_ms.unwrap_or(now_ms);
        (end - self.started_at_ms).max(0.0)
    }
}

/// Periodic refresh for the elapsed-time readout
///
/// Only says *when* to redraw; the value shown always comes from
/// `SessionClock::elapsed_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTicker {
    interval_ms: f64,
    next_due_ms: Option<f64>,
}

impl DisplayTicker {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            next_due_ms: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn is_running(&self) -> bool {
        self.next_due_ms.is_some()
    }

    /// Start ticking; the first poll fires immediately
    pub fn start(&mut self, now_ms: f64) {
        self.next_due_ms = Some(now_ms);
    }

    pub fn stop(&mut self) {
        self.next_due_ms = None;
    }

    /// True when a refresh is due; missed ticks collapse into one
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.next_due_ms {
            Some(due) if now_ms >= due => {
                self.next_due_ms = Some(now_ms + self.interval_ms);
                true
            }
            _ => false,
        }
    }
}
