//! Progress → frame number mapping.

use super::sequence::{FrameDirection, FrameSequence};

/// Frame number to display at `progress` (clamped to [0, 1], NaN reads as 0).
///
/// - Forward: `floor(p * (N - 1)) + 1`
/// - Reverse: `N - floor(p * (N - 1))`
///
/// A single-frame sequence always yields frame 1.
pub fn map_frame(progress: f64, direction: FrameDirection, total_frames: u32) -> u32 {
    if total_frames <= 1 {
        return 1;
    }

    let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    let span = (total_frames - 1) as f64;
    // p <= 1 keeps the offset within [0, N - 1]
    let offset = ((progress * span).floor() as u32).min(total_frames - 1);

    match direction {
        FrameDirection::Forward => offset + 1,
        FrameDirection::Reverse => total_frames - offset,
    }
}

impl FrameSequence {
    /// Frame number to display at `progress` for this sequence.
    pub fn frame_at(&self, progress: f64) -> u32 {
        map_frame(progress, self.direction(), self.total_frames())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_forward_endpoints() {
        assert_eq!(map_frame(0.0, FrameDirection::Forward, 191), 1);
        assert_eq!(map_frame(1.0, FrameDirection::Forward, 191), 191);
    }

    #[test]
    fn test_reverse_endpoints() {
        assert_eq!(map_frame(0.0, FrameDirection::Reverse, 191), 191);
        assert_eq!(map_frame(1.0, FrameDirection::Reverse, 191), 1);
    }

    #[test]
    fn test_reverse_midpoint() {
        // 191 - floor(0.5 * 190) = 96
        assert_eq!(map_frame(0.5, FrameDirection::Reverse, 191), 96);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(map_frame(-0.25, FrameDirection::Forward, 191), 1);
        assert_eq!(map_frame(1.0000001, FrameDirection::Forward, 191), 191);
        assert_eq!(map_frame(3.0, FrameDirection::Reverse, 191), 1);
        assert_eq!(map_frame(f64::NAN, FrameDirection::Reverse, 191), 191);
        assert_eq!(map_frame(f64::INFINITY, FrameDirection::Forward, 10), 10);
    }

    #[test]
    fn test_single_frame() {
        for p in [0.0, 0.3, 1.0, -4.0] {
            assert_eq!(map_frame(p, FrameDirection::Forward, 1), 1);
            assert_eq!(map_frame(p, FrameDirection::Reverse, 1), 1);
        }
        assert_eq!(map_frame(0.7, FrameDirection::Reverse, 0), 1);
    }

    #[test]
    fn test_sequence_frame_at() {
        let seq = FrameSequence::new("/images/mango", 191, FrameDirection::Reverse);
        assert_eq!(seq.frame_at(0.5), 96);
    }

    proptest! {
        #[test]
        fn prop_forward_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0, n in 1u32..2000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(map_frame(lo, FrameDirection::Forward, n) <= map_frame(hi, FrameDirection::Forward, n));
        }

        #[test]
        fn prop_reverse_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0, n in 1u32..2000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(map_frame(lo, FrameDirection::Reverse, n) >= map_frame(hi, FrameDirection::Reverse, n));
        }

        #[test]
        fn prop_in_range(p in -2.0f64..3.0, n in 1u32..2000) {
            for dir in [FrameDirection::Forward, FrameDirection::Reverse] {
                let f = map_frame(p, dir, n);
                prop_assert!(f >= 1 && f <= n);
            }
        }

        #[test]
        fn prop_endpoints(n in 2u32..2000) {
            prop_assert_eq!(map_frame(0.0, FrameDirection::Forward, n), 1);
            prop_assert_eq!(map_frame(1.0, FrameDirection::Forward, n), n);
            prop_assert_eq!(map_frame(0.0, FrameDirection::Reverse, n), n);
            prop_assert_eq!(map_frame(1.0, FrameDirection::Reverse, n), 1);
        }
    }
}
