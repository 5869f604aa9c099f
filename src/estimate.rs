//! Rough output-size arithmetic for picking a batch size.
//!
//! The unit size is a constant-factor heuristic on the mean canvas area, not a measurement of any
//! encoder. Converting a count to a size and back agrees only up to rounding.

use crate::config::GenerationSettings;

/// Approximate encoded bytes per image: `(wMin + wMax) * (hMin + hMax) / 64`, at least 1.
pub fn estimated_unit_size(settings: &GenerationSettings) -> u64 {
    let w = u64::from(settings.width.min) + u64::from(settings.width.max);
    let h = u64::from(settings.height.min) + u64::from(settings.height.max);
    (w * h / 64).max(1)
}

pub fn estimate_total_size(count: u64, settings: &GenerationSettings) -> u64 {
    count.saturating_mul(estimated_unit_size(settings))
}

/// Number of images that fit `total_size`, rounded half away from zero.
pub fn estimate_count(total_size: u64, settings: &GenerationSettings) -> u64 {
    (total_size as f64 / estimated_unit_size(settings) as f64).round() as u64
}
