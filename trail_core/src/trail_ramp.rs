//! Appearance ramps: piecewise-linear color and width over a point's age ratio.
//!
//! Ratio 0 is a freshly sampled point, ratio 1 a point at the end of its
//! lifetime. Stops are evenly spaced over [0, 1]; inputs outside that range
//! are clamped.

use trail_env::Rgba;

/// Values a ramp can interpolate.
pub trait Lerp: Copy {
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Rgba {
    fn lerp(self, other: Self, t: f32) -> Self {
        Rgba::lerp(self, other, t)
    }
}

/// Samples `stops` at `ratio` across `stops.len() - 1` equal segments.
///
/// Requires at least two stops.
fn piecewise<T: Lerp>(stops: &[T], ratio: f32) -> T {
    debug_assert!(stops.len() >= 2);
    let segments = (stops.len() - 1) as f32;
    let scaled = ratio * segments;
    let index = (scaled.floor() as usize).min(stops.len() - 2);
    let t = scaled - index as f32;
    stops[index].lerp(stops[index + 1], t)
}

fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

/// Color over age.
///
/// - no stops: white fading to clear
/// - one stop: that color fading to clear
/// - two or more: piecewise lerp through the stops
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorRamp {
    stops: Vec<Rgba>,
}

impl ColorRamp {
    pub fn new(stops: Vec<Rgba>) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> &[Rgba] {
        &self.stops
    }

    pub fn sample(&self, ratio: f32) -> Rgba {
        let ratio = clamp_ratio(ratio);
        match self.stops.as_slice() {
            [] => Rgba::WHITE.lerp(Rgba::CLEAR, ratio),
            [only] => only.lerp(Rgba::CLEAR, ratio),
            stops => piecewise(stops, ratio),
        }
    }
}

/// Width over age.
///
/// - no stops: constant width 1
/// - one stop: constant width of that stop
/// - two or more: piecewise lerp through the stops
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidthRamp {
    stops: Vec<f32>,
}

impl WidthRamp {
    pub fn new(stops: Vec<f32>) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> &[f32] {
        &self.stops
    }

    pub fn sample(&self, ratio: f32) -> f32 {
        let ratio = clamp_ratio(ratio);
        match self.stops.as_slice() {
            [] => 1.0,
            [only] => *only,
            stops => piecewise(stops, ratio),
        }
    }
}
