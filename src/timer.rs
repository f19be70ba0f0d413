//! Per-session round countdown.
//!
//! The clock is a view-layer artifact: each participant counts down locally
//! from the last state it was pushed, and every fresh push re-arms it.
//! Nothing is written back to the store, and reaching zero does not end the
//! round: the clock just stops, and ending stays an explicit leader action.

use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

pub struct Countdown {
    interval: Interval,
    remaining: u32,
    running: bool,
}

impl Countdown {
    pub fn new() -> Self {
        let mut interval = interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            remaining: 0,
            running: false,
        }
    }

    /// Arm (or re-arm) the countdown from a fresh state push.
    pub fn arm(&mut self, seconds: u32) {
        self.remaining = seconds;
        self.running = seconds > 0;
        self.interval.reset();
    }

    /// Stop counting. The remaining seconds keep their last value.
    pub fn disarm(&mut self) {
        self.running = false;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Wait for the next one-second tick and return the updated remainder.
    ///
    /// Pends forever while disarmed or at zero, so it is safe to keep in a
    /// `select!` loop alongside other event sources.
    pub async fn tick(&mut self) -> u32 {
        if !self.running {
            std::future::pending::<()>().await;
            unreachable!()
        }
        self.interval.tick().await;
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
        }
        self.remaining
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}
