//! Exponential backoff shared by the retry policy and SSE reconnection.

use rand::Rng;
use std::time::Duration;

/// Computes `min(base * multiplier^(attempt - 1), max)`.
///
/// With `jitter` enabled the capped delay is scaled by a uniform factor in
/// `[0.5, 1.5]`, so it can move up to 50% in either direction. The result is
/// never negative. Attempts below 1 are treated as the first attempt.
pub fn delay(attempt: u32, base: Duration, max: Duration, multiplier: f64, jitter: bool) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let raw = base.as_secs_f64() * multiplier.powi(exponent);

    let capped = if raw.is_finite() {
        raw.min(max.as_secs_f64()).max(0.0)
    } else {
        max.as_secs_f64()
    };

    let secs = if jitter {
        let factor: f64 = rand::rng().random_range(0.5..=1.5);
        (capped * factor).max(0.0)
    } else {
        capped
    };

    Duration::try_from_secs_f64(secs).unwrap_or(max)
}
