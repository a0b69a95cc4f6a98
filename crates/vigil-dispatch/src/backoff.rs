// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff schedule for delivery retries.

use std::time::Duration;

/// Upper bound on a single backoff delay. Keeps a misconfigured base delay
/// from parking a retry for hours.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Delay before the given retry attempt (1-based).
///
/// Attempt `n` waits `base_delay_ms * 2^(n-1)`, capped at [`MAX_DELAY`].
/// Attempt 0 is not a retry and gets no delay.
pub fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let exp = attempt.saturating_sub(1).min(32);
    let millis = base_delay_ms.saturating_mul(1u64 << exp);
    Duration::from_millis(millis).min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_per_attempt() {
        assert_eq!(backoff_delay(200, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(200, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(200, 3), Duration::from_millis(800));
    }

    #[test]
    fn zero_attempt_has_no_delay() {
        assert_eq!(backoff_delay(200, 0), Duration::ZERO);
    }

    #[test]
    fn delay_is_capped() {
        assert_eq!(backoff_delay(1000, 30), MAX_DELAY);
        // Shift overflow territory stays capped, not wrapped.
        assert_eq!(backoff_delay(u64::MAX, 64), MAX_DELAY);
    }
}
