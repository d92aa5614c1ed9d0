use rand::Rng;
use std::time::Duration;

use crate::config::ReconnectConfig;

/// Reconnect delay policy: exponential growth, capped, with symmetric jitter.
///
/// Attempts are numbered from 1. With `first_attempt_immediate` the first
/// attempt has no delay and growth starts from the second.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectConfig,
}

impl Backoff {
    pub fn new(policy: ReconnectConfig) -> Self {
        Self { policy }
    }

    /// Delay before `attempt`, jittered
    pub fn delay(&self, attempt: u32) -> Duration {
        let spread: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_with_spread(attempt, spread)
    }

    /// Delay before `attempt` for a given jitter draw in -1.0..=1.0
    pub fn delay_with_spread(&self, attempt: u32, spread: f64) -> Duration {
        let attempt = attempt.max(1);
        let step = if self.policy.first_attempt_immediate {
            if attempt == 1 {
                return Duration::ZERO;
            }
            attempt - 1
        } else {
            attempt
        };

        let max = self.policy.max_delay_ms as f64;
        let base = ((self.policy.initial_delay_ms as f64) *
            self.policy.multiplier.powi((step - 1).min(64) as i32)).min(max);
        let jittered = base * (1.0 + self.policy.jitter_ratio * spread.clamp(-1.0, 1.0));

        Duration::from_millis(jittered.clamp(0.0, max) as u64)
    }
}
