use std::time::Duration;
use termwiki_config::RetryCfg;
use tracing::{debug, warn};

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Defaults overridden by the `[retry]` section.
    pub fn from_cfg(cfg: Option<&RetryCfg>) -> Self {
        let base = Self::default();
        let Some(cfg) = cfg else { return base };
        Self::new(
            cfg.max_attempts.unwrap_or(base.max_attempts),
            cfg.initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(base.initial_delay),
        )
        .with_max_delay(
            cfg.max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(base.max_delay),
        )
    }

    /// Delay before attempt `attempt` (0-indexed); zero for the first.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    /// 4 attempts; waits 1s, 2s, 4s.
    fn default() -> Self {
        Self::new(4, Duration::from_secs(1)).with_max_delay(Duration::from_secs(8))
    }
}

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or attempts run out. Returns the last result and the number of
/// attempts made.
pub fn with_retry_if<T, E, F, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> (Result<T, E>, u32)
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(event = "retry_wait", operation = operation_name, attempt = attempt + 1, ?delay);
            std::thread::sleep(delay);
        }
        match operation() {
            Ok(v) => {
                if attempt > 0 {
                    debug!(event = "retry_succeeded", operation = operation_name, attempt = attempt + 1);
                }
                return (Ok(v), attempt + 1);
            }
            Err(e) => {
                let remaining = max - attempt - 1;
                if !should_retry(&e) {
                    return (Err(e), attempt + 1);
                }
                if remaining == 0 {
                    warn!(event = "retry_exhausted", operation = operation_name, attempts = max, error = %e);
                    return (Err(e), attempt + 1);
                }
                warn!(
                    event = "retry",
                    operation = operation_name,
                    attempt = attempt + 1,
                    remaining,
                    error = %e
                );
            }
        }
        attempt += 1;
    }
}
