//! Easing curves for tweens
//!
//! Names follow the usual tweening vocabulary: `power1` is quadratic,
//! `power2` is cubic.

use serde::{Serialize, Deserialize};

/// Easing curve mapping normalized time to normalized progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    /// Quadratic in/out
    Power1InOut,
    /// Cubic in/out (camera fly-to default)
    #[default]
    Power2InOut,
    /// Cubic out
    Power2Out,
    SineInOut,
}

impl Ease {
    /// Apply the curve. Input is clamped to [0, 1]; endpoints are exact.
    pub fn apply(self, t: f32) -> f32 {
        if t <= 0.0 || t.is_nan() {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Ease::Linear => t,
            Ease::Power1InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Ease::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Ease::Power2Out => 1.0 - (1.0 - t).powi(3),
            Ease::SineInOut => -((std::f32::consts::PI * t).cos() - 1.0) / 2.0,
        }
    }

    /// Parse a `family.direction` name such as `power2.inOut`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linear" | "none" => Some(Ease::Linear),
            "power1.inout" => Some(Ease::Power1InOut),
            "power2.inout" => Some(Ease::Power2InOut),
            "power2.out" => Some(Ease::Power2Out),
            "sine.inout" => Some(Ease::SineInOut),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 5] = [
        Ease::Linear,
        Ease::Power1InOut,
        Ease::Power2InOut,
        Ease::Power2Out,
        Ease::SineInOut,
    ];

    #[test]
    fn test_exact_endpoints() {
        for ease in ALL {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
            assert_eq!(ease.apply(-3.0), 0.0);
            assert_eq!(ease.apply(7.0), 1.0);
        }
    }

    #[test]
    fn test_monotonic() {
        for ease in ALL {
            let mut prev = 0.0;
            for i in 1..=100 {
                let v = ease.apply(i as f32 / 100.0);
                assert!(v >= prev - 1e-6, "{ease:?} not monotonic at {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn test_in_out_symmetry() {
        for ease in [Ease::Power1InOut, Ease::Power2InOut, Ease::SineInOut] {
            assert!((ease.apply(0.5) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Ease::from_name("power2.inOut"), Some(Ease::Power2InOut));
        assert_eq!(Ease::from_name("linear"), Some(Ease::Linear));
        assert_eq!(Ease::from_name("elastic"), None);
    }
}
