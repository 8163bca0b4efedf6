//! Cancellable countdown driving round starts.
//!
//! A [`CountdownTimer`] owns at most one background task. The task sends its
//! generation stamp on the tick channel once per period and exits after the
//! requested number of ticks. Starting a new countdown or calling
//! [`cancel`](CountdownTimer::cancel) aborts the previous task; ticks it
//! already queued are discarded by [`SessionState::tick`](crate::state::SessionState::tick)
//! through the generation check.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

/// Default time between two ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Shortest accepted tick period. `tokio::time::interval` rejects zero.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Single-owner handle to the countdown task.
#[derive(Debug, Default)]
pub struct CountdownTimer {
    task: Option<JoinHandle<()>>,
    generation: Option<u64>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any live countdown with one sending `generation` on `tick_tx`
    /// `initial` times, the first tick one `period` from now. Periods below
    /// [`MIN_TICK_PERIOD`] are raised to it.
    pub fn start(
        &mut self,
        initial: u8,
        generation: u64,
        period: Duration,
        tick_tx: mpsc::UnboundedSender<u64>,
    ) {
        self.cancel();
        let period = period.max(MIN_TICK_PERIOD);
        debug!(initial, generation, ?period, "countdown started");
        self.generation = Some(generation);
        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            for _ in 0..initial {
                interval.tick().await;
                if tick_tx.send(generation).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop the live countdown, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(generation = ?self.generation, "countdown cancelled");
        }
        self.generation = None;
    }

    /// `true` while a countdown task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Generation of the countdown started last, until cancelled.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sends_one_stamp_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new();
        let started = Instant::now();
        timer.start(3, 7, DEFAULT_TICK_PERIOD, tx.clone());

        for expected in 1..=3u64 {
            assert_eq!(rx.recv().await, Some(7));
            assert_eq!(started.elapsed(), Duration::from_secs(expected));
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_pending_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new();
        timer.start(3, 1, DEFAULT_TICK_PERIOD, tx.clone());
        assert!(timer.is_active());

        timer.cancel();
        timer.cancel();
        assert_eq!(timer.generation(), None);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_supersedes_previous_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new();
        timer.start(3, 1, DEFAULT_TICK_PERIOD, tx.clone());
        assert_eq!(rx.recv().await, Some(1));

        timer.start(3, 2, DEFAULT_TICK_PERIOD, tx.clone());
        assert_eq!(timer.generation(), Some(2));
        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(2));
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_raised_to_the_minimum() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new();
        let started = Instant::now();
        timer.start(3, 9, Duration::ZERO, tx);

        for expected in 1..=3u32 {
            assert_eq!(rx.recv().await, Some(9));
            assert_eq!(started.elapsed(), MIN_TICK_PERIOD * expected);
        }
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut timer = CountdownTimer::new();
            timer.start(2, 4, DEFAULT_TICK_PERIOD, tx.clone());
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
