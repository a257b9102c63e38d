//! Shared outbound API budget gate
//!
//! The accounting API enforces per-minute and per-day call budgets.
//! One gate instance is injected into every client that talks to it and
//! serializes all budget accounting; callers suspend in
//! [`RateGate::wait_if_needed`] until one more call is safe to issue.
//!
//! Daily budget policy: when the remaining daily budget falls to the
//! safety buffer the gate returns
//! [`RateLimitError::DailyBudgetExhausted`] instead of sleeping until
//! midnight. Minute budget policy: the gate sleeps out the rest of the
//! rolling 60s window and then proceeds.

use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::error::RateLimitError;

const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Budget configuration.
///
/// Defaults match the accounting API's published tenant limits, with
/// small safety buffers held back so a burst from another client on the
/// same tenant does not push us into a 429.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_day: u32,
    /// Calls held back from the minute budget.
    pub minute_buffer: u32,
    /// Calls held back from the daily budget.
    pub day_buffer: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_minute: 60,
            per_day: 5000,
            minute_buffer: 5,
            day_buffer: 50,
        }
    }
}

#[derive(Debug)]
struct GateState {
    minute_remaining: u32,
    window_started: Instant,
    day_remaining: u32,
    day: NaiveDate,
}

/// Process-wide rate gate. Construct once, share via `Arc`.
#[derive(Debug)]
pub struct RateGate {
    limits: RateLimits,
    state: Mutex<GateState>,
}

impl RateGate {
    pub fn new(limits: RateLimits) -> Self {
        // Clamp buffers below their budgets so the gate can always
        // admit at least one call per window.
        let limits = RateLimits {
            minute_buffer: limits.minute_buffer.min(limits.per_minute.saturating_sub(1)),
            day_buffer: limits.day_buffer.min(limits.per_day.saturating_sub(1)),
            ..limits
        };
        let state = GateState {
            minute_remaining: limits.per_minute,
            window_started: Instant::now(),
            day_remaining: limits.per_day,
            day: Utc::now().date_naive(),
        };
        Self {
            limits,
            state: Mutex::new(state),
        }
    }

    /// A gate that never blocks and never exhausts, for tests.
    pub fn unlimited() -> Self {
        Self::new(RateLimits {
            per_minute: u32::MAX,
            per_day: u32::MAX,
            minute_buffer: 0,
            day_buffer: 0,
        })
    }

    /// Suspends until one more outbound call is within budget, then
    /// books that call against both counters.
    pub async fn wait_if_needed(&self) -> Result<(), RateLimitError> {
        loop {
            let sleep_for = {
                let mut state = self.state.lock().await;
                self.roll_windows(&mut state);

                if state.day_remaining <= self.limits.day_buffer {
                    return Err(RateLimitError::DailyBudgetExhausted {
                        remaining: state.day_remaining,
                        buffer: self.limits.day_buffer,
                    });
                }

                if state.minute_remaining > self.limits.minute_buffer {
                    state.minute_remaining -= 1;
                    state.day_remaining -= 1;
                    return Ok(());
                }

                MINUTE_WINDOW
                    .checked_sub(state.window_started.elapsed())
                    .unwrap_or(Duration::from_millis(50))
            };
            // Lock released while sleeping.
            tracing::debug!(
                wait_ms = sleep_for.as_millis() as u64,
                "minute budget low, waiting for window reset"
            );
            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Recalibrates from the remaining-quota counters the API returns.
    /// Header values are the source of truth and override local counts.
    pub async fn record_remote_counts(
        &self,
        minute_remaining: Option<u32>,
        day_remaining: Option<u32>,
    ) {
        if minute_remaining.is_none() && day_remaining.is_none() {
            return;
        }
        let mut state = self.state.lock().await;
        if let Some(minute) = minute_remaining {
            state.minute_remaining = minute;
        }
        if let Some(day) = day_remaining {
            state.day_remaining = day;
        }
        tracing::trace!(
            minute_remaining = state.minute_remaining,
            day_remaining = state.day_remaining,
            "rate budgets recalibrated from response headers"
        );
    }

    /// Current `(minute, day)` remaining counts, for display.
    pub async fn remaining(&self) -> (u32, u32) {
        let mut state = self.state.lock().await;
        self.roll_windows(&mut state);
        (state.minute_remaining, state.day_remaining)
    }

    fn roll_windows(&self, state: &mut GateState) {
        if state.window_started.elapsed() >= MINUTE_WINDOW {
            state.minute_remaining = self.limits.per_minute;
            state.window_started = Instant::now();
        }
        let today = Utc::now().date_naive();
        if today != state.day {
            state.day = today;
            state.day_remaining = self.limits.per_day;
        }
    }

    #[cfg(test)]
    async fn backdate_window(&self, by: Duration) {
        let mut state = self.state.lock().await;
        state.window_started = Instant::now() - by;
    }

    #[cfg(test)]
    async fn backdate_day(&self) {
        let mut state = self.state.lock().await;
        state.day = state.day.pred_opt().unwrap_or(state.day);
    }
}
