use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Fixed-interval polling that backs off exponentially (with jitter) while
/// the polled call keeps failing, and snaps back after a success.
#[derive(Debug, Clone)]
pub struct Poller {
    pub interval: Duration,
    pub max_backoff: Duration,
    pub jitter_pct: f64,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_backoff: Duration::from_secs(5 * 60),
            jitter_pct: 0.20,
        }
    }
}

impl Poller {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Delay before the next tick given the number of consecutive failures.
    pub fn next_delay(&self, failures: u32, rng: &mut impl Rng) -> Duration {
        let base_ms = self.interval.as_millis().min(u64::MAX as u128) as u64;
        let max_ms = (self.max_backoff.as_millis().min(u64::MAX as u128) as u64).max(base_ms);

        // interval * 2^failures, saturating, then capped
        let pow2 = 1_u64.checked_shl(failures).unwrap_or(u64::MAX);
        let delay = base_ms.saturating_mul(pow2).min(max_ms);

        let jitter_range = (delay as f64) * self.jitter_pct.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rng.gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        let jittered = (delay as f64 + jitter).round().clamp(0.0, max_ms as f64) as u64;
        Duration::from_millis(jittered)
    }

    /// Calls `tick` immediately and then on schedule until `cancel` fires.
    /// `tick` reports whether the poll succeeded.
    pub async fn run<F, Fut>(&self, cancel: CancellationToken, mut tick: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut failures: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return;
            }

            if tick().await {
                failures = 0;
            } else {
                failures = failures.saturating_add(1);
            }

            let delay = self.next_delay(failures, &mut rand::thread_rng());
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
