//! Retry delay for failed passes

use std::time::Duration;

/// Exponential backoff: `base * 2^(failures - 1)`, capped at `max`.
///
/// `failures` counts consecutive failed passes for one key, starting at 1.
pub fn backoff_delay(failures: u32, base: Duration, max: Duration) -> Duration {
    let exponent = failures.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_cap() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(5);

        assert_eq!(backoff_delay(1, base, max), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, base, max), Duration::from_secs(1));
        assert_eq!(backoff_delay(3, base, max), Duration::from_secs(2));
        assert_eq!(backoff_delay(4, base, max), Duration::from_secs(4));
        assert_eq!(backoff_delay(5, base, max), max);
        assert_eq!(backoff_delay(500, base, max), max);
    }

    #[test]
    fn test_zero_failures_uses_base() {
        let base = Duration::from_millis(10);
        assert_eq!(backoff_delay(0, base, Duration::from_secs(1)), base);
    }
}
