use std::time::Duration;

use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    /// Subject this controller serves requests on; broadcasts go out on
    /// `<path>.pub`.
    pub path: String,
    #[serde(default)]
    pub reconnect: BackoffConfig,
}

/// Bounded exponential backoff between connection attempts.
#[derive(Deserialize, Clone)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl BackoffConfig {
    /// Delay before the next attempt; `attempt` is 1-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .initial_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_double_delay_up_to_the_ceiling() {
        let backoff = BackoffConfig {
            initial_delay_ms: 500,
            max_delay_ms: 3_000,
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(1_000));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(2_000));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(3_000));
        assert_eq!(backoff.delay_for(40), Duration::from_millis(3_000));
    }
}
