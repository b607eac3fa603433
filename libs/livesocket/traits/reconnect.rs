use std::time::Duration;

/// Decides how long to wait before reopening after a transport error
///
/// `attempt` counts consecutive failed attempts since the last successful
/// transport-open, starting at 0.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before the next attempt, or `None` to give up and stay idle
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Reopen right away, forever
///
/// This is the default. A persistently unreachable endpoint produces a tight
/// reconnect loop; pick [`ExponentialBackoff`] if that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl ReconnectionStrategy for Immediate {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        Some(Duration::ZERO)
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        true
    }
}

/// Exponential backoff reconnection strategy
///
/// Delays between reconnection attempts grow exponentially:
/// initial_delay * 2^attempt, capped at max_delay
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// # Arguments
    /// * `initial_delay` - The initial delay before first reconnect
    /// * `max_delay` - The maximum delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// The client goes idle after the first transport error
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}
