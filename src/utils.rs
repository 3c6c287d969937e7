use std::time::Duration;

use rand::Rng;

const MAX_BACKOFF_MS: u64 = 5_000;

/// Exponential backoff with up to 50% random jitter, capped at 5 seconds.
pub(crate) fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let base = base_delay_ms.saturating_mul(multiplier).min(MAX_BACKOFF_MS);

    let jitter = match base / 2 {
        0 => 0,
        bound => rand::thread_rng().gen_range(0..=bound),
    };

    Duration::from_millis(base.saturating_add(jitter).min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_bounds() {
        for attempt in 0..5 {
            let base = 100 * 2u64.pow(attempt);
            let delay = backoff_delay(100, attempt);
            assert!(delay >= Duration::from_millis(base));
            assert!(delay <= Duration::from_millis(base + base / 2));
        }
    }

    #[test]
    fn test_backoff_delay_cap() {
        assert_eq!(backoff_delay(1_000, 10), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_backoff_delay_overflow() {
        assert_eq!(backoff_delay(u64::MAX, u32::MAX), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_backoff_delay_zero_base() {
        assert_eq!(backoff_delay(0, 3), Duration::ZERO);
    }
}
