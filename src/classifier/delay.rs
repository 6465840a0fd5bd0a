//! Pauses between classification calls.

use std::time::Duration;

/// How long to wait after the call with the given zero-based index.
pub trait DelayStrategy: Send + Sync {
    fn delay(&self, attempt: usize) -> Duration;
}

/// The same pause after every call, whatever happened.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        FixedDelay(Duration::from_millis(500))
    }
}

impl DelayStrategy for FixedDelay {
    fn delay(&self, _attempt: usize) -> Duration {
        self.0
    }
}

/// No pause at all; used by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayStrategy for NoDelay {
    fn delay(&self, _attempt: usize) -> Duration {
        Duration::ZERO
    }
}

impl<F> DelayStrategy for F
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: usize) -> Duration {
        self(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_does_not_grow() {
        let delay = FixedDelay::default();
        assert_eq!(delay.delay(0), Duration::from_millis(500));
        assert_eq!(delay.delay(99), Duration::from_millis(500));
    }

    #[test]
    fn test_closure_delay() {
        let delay = |attempt: usize| Duration::from_millis(attempt as u64 * 10);
        assert_eq!(DelayStrategy::delay(&delay, 3), Duration::from_millis(30));
        assert_eq!(NoDelay.delay(3), Duration::ZERO);
    }
}
