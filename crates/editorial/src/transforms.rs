//! Nonlinear remaps applied to individual telemetry fields.

use std::f32::consts::PI;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    SmoothScroll,
    ComplexityCurve,
}

impl Transform {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Transform::SmoothScroll => smooth_scroll(x),
            Transform::ComplexityCurve => complexity_curve(x),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Transform::SmoothScroll => "smoothScroll",
            Transform::ComplexityCurve => "complexityCurve",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Peaks at mid-page: `sin(x·π)·0.7 + 0.3`.
pub fn smooth_scroll(x: f32) -> f32 {
    (x * PI).sin() * 0.7 + 0.3
}

/// `x^1.5·0.8 + 0.2`, with negative inputs treated as zero.
pub fn complexity_curve(x: f32) -> f32 {
    x.max(0.0).powf(1.5) * 0.8 + 0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn smooth_scroll_endpoints_and_peak() {
        assert!((smooth_scroll(0.0) - 0.3).abs() < EPS);
        assert!((smooth_scroll(1.0) - 0.3).abs() < EPS);
        assert!((smooth_scroll(0.5) - 1.0).abs() < EPS);
    }

    #[test]
    fn complexity_curve_endpoints() {
        assert_eq!(complexity_curve(0.0), 0.2);
        assert!((complexity_curve(1.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn complexity_curve_is_monotonic() {
        let mut previous = complexity_curve(0.0);
        for step in 1..=100 {
            let value = complexity_curve(step as f32 / 100.0);
            assert!(value > previous, "not increasing at step {step}");
            previous = value;
        }
    }

    #[test]
    fn transform_dispatch_matches_functions() {
        assert_eq!(Transform::SmoothScroll.apply(0.25), smooth_scroll(0.25));
        assert_eq!(Transform::ComplexityCurve.apply(0.25), complexity_curve(0.25));
    }
}
