//! Derived user rating.
//!
//! A user's rating is the floor of the arithmetic mean of every `stars_given`
//! value they have received, or 0 when nobody has reviewed them yet.

use tracing::trace;

/// Lowest and highest star values a review may carry.
const MIN_STARS: i32 = 1;
const MAX_STARS: i32 = 5;

/// Floor of the mean of `stars`, 0 for an empty slice.
pub fn floor_mean(stars: &[i32]) -> i32 {
    if stars.is_empty() {
        return 0;
    }
    let total: i64 = stars.iter().map(|s| i64::from(*s)).sum();
    let count = stars.len() as i64;
    let mean = total.div_euclid(count);
    trace!(total, count, mean, "computed floor mean rating");
    mean as i32
}

/// Whether `stars` is an acceptable review value.
pub fn valid_stars(stars: i32) -> bool {
    (MIN_STARS..=MAX_STARS).contains(&stars)
}
