//! Shared pacing for batch submissions
//!
//! Every worker goes through the same gate, so the inter-batch delay and the
//! error backoff hold in aggregate no matter how many chunks are in flight.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out submissions and stretches the gap after errors
#[derive(Debug)]
pub struct RateGate {
    next_allowed: Mutex<Instant>,
    delay: Duration,
}

impl RateGate {
    /// Creates a gate that is open immediately
    pub fn new(delay: Duration) -> Self {
        Self {
            next_allowed: Mutex::new(Instant::now()),
            delay,
        }
    }

    /// Waits for a submission slot and reserves it
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_allowed.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.delay;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    /// Marks a batch finished; the next slot opens one delay from now
    pub async fn complete(&self) {
        self.push_back(self.delay).await;
    }

    /// Holds the gate closed for at least `backoff` from now
    pub async fn penalize(&self, backoff: Duration) {
        self.push_back(backoff).await;
    }

    async fn push_back(&self, wait: Duration) {
        let mut next = self.next_allowed.lock().await;
        let candidate = Instant::now() + wait;
        if candidate > *next {
            *next = candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let gate = RateGate::new(Duration::from_secs(60));
        let start = Instant::now();
        gate.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_delay_after_completion() {
        let gate = RateGate::new(Duration::from_millis(40));
        gate.acquire().await;
        gate.complete().await;

        let start = Instant::now();
        gate.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn test_penalty_outlasts_delay() {
        let gate = RateGate::new(Duration::from_millis(5));
        gate.acquire().await;
        gate.penalize(Duration::from_millis(60)).await;
        gate.complete().await;

        let start = Instant::now();
        gate.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
