//! Numeric conversion helpers centralizing lossy casts.

use num_traits::cast::cast;

/// `part / whole` as an `f32` clamped to `[0, 1]`; zero when `whole` is zero.
#[must_use]
pub fn unit_ratio(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        return 0.0;
    }
    let part = cast::<u64, f64>(part.min(whole)).unwrap_or(0.0);
    let whole = cast::<u64, f64>(whole).unwrap_or(1.0);
    cast::<f64, f32>(part / whole)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

/// Playback length of a sprite strip in whole milliseconds (truncated).
#[must_use]
pub fn frames_to_ms(frames: u32, fps: u32) -> u64 {
    if fps == 0 {
        return 0;
    }
    u64::from(frames) * 1_000 / u64::from(fps)
}

/// Convert a millisecond count to `u64`, saturating on overflow.
#[must_use]
pub fn millis_to_u64(millis: u128) -> u64 {
    u64::try_from(millis).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_ratio_clamps_and_handles_zero() {
        assert!((unit_ratio(0, 0) - 0.0).abs() < f32::EPSILON);
        assert!((unit_ratio(7_500, 15_000) - 0.5).abs() < f32::EPSILON);
        assert!((unit_ratio(20_000, 15_000) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn frames_truncate_to_whole_millis() {
        assert_eq!(frames_to_ms(6, 8), 750);
        assert_eq!(frames_to_ms(4, 7), 571);
        assert_eq!(frames_to_ms(11, 8), 1_375);
        assert_eq!(frames_to_ms(3, 0), 0);
    }

    #[test]
    fn millis_saturate() {
        assert_eq!(millis_to_u64(42), 42);
        assert_eq!(millis_to_u64(u128::MAX), u64::MAX);
    }
}
