pub mod deduplication;

use std::time::Instant;

/// Milliseconds elapsed since `start`, for log fields
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
