//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(f64::MAX)
}

/// Floor a f64 and clamp it to the u64 range, returning 0 for NaN or negative values.
#[must_use]
pub fn floor_f64_to_u64(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    cast::<f64, u64>(value.min(max).floor()).unwrap_or(u64::MAX)
}

/// Narrow a u64 to u32, saturating at `u32::MAX`.
#[must_use]
pub fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Ratio `part / whole` expressed as a percentage clamped to `[0, 100]`.
///
/// A zero `whole` reports 100 so a degenerate span reads as complete.
#[must_use]
pub fn clamped_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    (u64_to_f64(part) / u64_to_f64(whole) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_handles_non_finite_and_negative() {
        assert_eq!(floor_f64_to_u64(f64::NAN), 0);
        assert_eq!(floor_f64_to_u64(-3.5), 0);
        assert_eq!(floor_f64_to_u64(7.9), 7);
        assert_eq!(floor_f64_to_u64(f64::INFINITY), u64::MAX);
    }

    #[test]
    fn percent_clamps_to_range() {
        assert!((clamped_percent(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!((clamped_percent(9, 4) - 100.0).abs() < f64::EPSILON);
        assert!((clamped_percent(0, 0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn saturating_narrowing() {
        assert_eq!(saturating_u32(12), 12);
        assert_eq!(saturating_u32(u64::MAX), u32::MAX);
    }
}
