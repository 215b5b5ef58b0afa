//! Linear backoff with optional jitter between download retry attempts.

use rand::Rng;

/// `base_ms * attempt`, plus up to `jitter_percent` percent of extra delay.
/// A `jitter_percent` of 0 disables jitter entirely.
#[must_use]
pub fn retry_delay_ms(base_ms: u64, attempt: u32, jitter_percent: u32) -> u64 {
    let linear = base_ms.saturating_mul(u64::from(attempt));
    if jitter_percent == 0 || linear == 0 {
        return linear;
    }
    let jitter_range = std::cmp::max(1, linear.saturating_mul(u64::from(jitter_percent)) / 100);
    let mut rng = rand::rng();
    linear + rng.random_range(0..jitter_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_jitter_is_exactly_linear() {
        assert_eq!(retry_delay_ms(350, 1, 0), 350);
        assert_eq!(retry_delay_ms(350, 3, 0), 1050);
    }

    #[test]
    fn jitter_never_decreases_delay() {
        for attempt in 1..5 {
            let delay = retry_delay_ms(350, attempt, 20);
            assert!(delay >= 350 * u64::from(attempt));
        }
    }
}
