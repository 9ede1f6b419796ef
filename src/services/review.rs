//! Spaced-repetition scheduling for completed lessons (SM-2 style).

use chrono::{DateTime, Duration, Utc};

pub const MIN_EASE_FACTOR: f64 = 1.3;
const MAX_INTERVAL_DAYS: i64 = 365;

/// Recall quality on the 0-5 SM-2 scale derived from a quiz score.
pub fn quality_from_score(score: f64) -> u8 {
    match score {
        s if s >= 90.0 => 5,
        s if s >= 80.0 => 4,
        s if s >= 70.0 => 3,
        s if s >= 50.0 => 2,
        s if s >= 25.0 => 1,
        _ => 0,
    }
}

/// Next `(ease_factor, interval_days)` after a review of the given quality.
pub fn schedule(ease_factor: f64, interval_days: i64, quality: u8) -> (f64, i64) {
    let q = f64::from(quality.min(5));
    let miss = 5.0 - q;
    let ease = (ease_factor + 0.1 - miss * (0.08 + miss * 0.02)).max(MIN_EASE_FACTOR);

    if quality < 3 {
        return (ease, 1);
    }
    let interval = ((interval_days.max(1) as f64) * ease).round() as i64;
    (ease, interval.clamp(1, MAX_INTERVAL_DAYS))
}

pub fn next_review_at(now: DateTime<Utc>, interval_days: i64) -> DateTime<Utc> {
    now + Duration::days(interval_days)
}
