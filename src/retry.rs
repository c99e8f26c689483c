//! Fixed-interval reconnect timer
//!
//! A live order feed should stay up for as long as the process runs, so the
//! channel retries forever at a constant interval with no backoff and no
//! attempt cap. The timer holds at most one pending firing: arming it again
//! replaces the previous one.

use std::time::Duration;
use tokio::task::JoinHandle;

/// Single-slot retry timer
#[derive(Debug)]
pub struct RetryTimer {
    interval: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl RetryTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedule `fire` to run once after the interval, replacing any pending
    /// firing. `fire` receives the generation it was armed under; pass it
    /// back to [`claim`](Self::claim) to check it is still the live one.
    pub fn arm<F>(&mut self, fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        if self.cancel() {
            tracing::debug!("Restarting pending reconnect timer");
        }

        self.generation += 1;
        let generation = self.generation;
        let interval = self.interval;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            fire(generation);
        }));

        tracing::debug!("Reconnect timer {} armed for {:?}", generation, interval);
        generation
    }

    /// Drop the pending firing, if any. A firing that already ran but has
    /// not been claimed is invalidated as well.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Accept a firing. Returns false for a firing that was cancelled or
    /// superseded by a later `arm`.
    pub fn claim(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_interval() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut timer = RetryTimer::new(Duration::from_millis(5000));

        let sink = fired.clone();
        let generation = timer.arm(move |g| sink.lock().unwrap().push(g));
        settle().await;

        tokio::time::advance(Duration::from_millis(4999)).await;
        settle().await;
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(*fired.lock().unwrap(), vec![generation]);
        assert!(timer.claim(generation));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut timer = RetryTimer::new(Duration::from_millis(100));

        let sink = fired.clone();
        timer.arm(move |g| sink.lock().unwrap().push(g));
        settle().await;
        tokio::time::advance(Duration::from_millis(60)).await;

        let sink = fired.clone();
        let second = timer.arm(move |g| sink.lock().unwrap().push(g));
        settle().await;

        tokio::time::advance(Duration::from_millis(60)).await;
        settle().await;
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_millis(40)).await;
        settle().await;
        assert_eq!(*fired.lock().unwrap(), vec![second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing_and_claim() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut timer = RetryTimer::new(Duration::from_millis(100));

        let sink = fired.clone();
        let generation = timer.arm(move |g| sink.lock().unwrap().push(g));
        settle().await;
        assert!(timer.cancel());

        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert!(fired.lock().unwrap().is_empty());
        assert!(!timer.claim(generation));
    }
}
