//! Easing curves for the autoplay timeline.
//!
//! Each curve maps `t` in [0, 1] to a progress value in [0, 1] and is
//! monotonic, so the frame mapper never steps backwards during autoplay.

use serde::{Deserialize, Serialize};

/// Constant velocity.
#[inline]
pub fn linear(t: f64) -> f64 {
    clamp_unit(t)
}

/// Cubic ease-out: fast start, slow settle.
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = clamp_unit(t);
    1.0 - (1.0 - t).powi(3)
}

#[inline]
fn clamp_unit(t: f64) -> f64 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

/// Easing selectable from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    #[default]
    EaseOutCubic,
}

impl Easing {
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => linear(t),
            Easing::EaseOutCubic => ease_out_cubic(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_out_cubic_midpoint() {
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_endpoints() {
        for easing in [Easing::Linear, Easing::EaseOutCubic] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(2.0), 1.0);
            assert_eq!(easing.apply(-1.0), 0.0);
        }
    }

    #[test]
    fn test_monotonic() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = ease_out_cubic(i as f64 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }
}
