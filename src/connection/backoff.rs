//! Delay schedule between push reconnect attempts

use std::time::Duration;

use rand::Rng;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Upper bound of the random fraction added to each delay. Jitter only
    /// lengthens a delay, so no attempt starts before its scheduled time.
    pub jitter: f64,
    /// Consecutive failed attempts before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Same delay every time, no jitter, never gives up
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: 0.0,
            max_attempts: None,
        }
    }

    pub fn backoff() -> Self {
        Self {
            initial_delay: DEFAULT_RECONNECT_DELAY,
            max_delay: DEFAULT_MAX_RECONNECT_DELAY,
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: Some(DEFAULT_MAX_RECONNECT_ATTEMPTS),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based), or `None` once
    /// the attempt budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt > max {
                return None;
            }
        }

        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let base = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());

        let delay = if self.jitter > 0.0 && base > 0.0 {
            rand::thread_rng().gen_range(base..=base * (1.0 + self.jitter))
        } else {
            base
        };

        Some(Duration::from_secs_f64(delay.max(0.0)))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::backoff()
    }
}
