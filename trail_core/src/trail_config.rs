//! Trail configuration.
//!
//! Every field may change between ticks; the trail picks up the new values
//! on its next tick. Values are sanitized on the way in rather than rejected,
//! so a bad config degrades the trail instead of failing the frame.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;
use trail_env::Rgba;

use crate::error::TrailError;

/// Default ring capacity (points retained at most).
pub const DEFAULT_MAXIMUM_POINTS: usize = 128;

/// A ribbon segment needs a pair of cross-sections.
pub const MIN_MAXIMUM_POINTS: usize = 2;

/// Upper bound on ring capacity; keeps `2 * points` vertex indices in `u32`.
pub const MAX_MAXIMUM_POINTS: usize = 1 << 16;

/// Configuration for a single trail instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Maximum age of a point in seconds (default: 1.0)
    pub segment_lifetime: f64,

    /// Motion at or below this distance only drags the newest point (default: 0.1)
    pub min_vertex_distance: f32,

    /// Motion beyond this distance always inserts a point (default: 1.0)
    pub max_vertex_distance: f32,

    /// Rotation beyond this many degrees inserts a point (default: 2.0)
    pub max_angle: f32,

    /// Color stops, evenly spaced from newest (ratio 0) to oldest (ratio 1)
    pub colors: Vec<Rgba>,

    /// Width stops, evenly spaced like `colors`
    pub widths: Vec<f32>,

    /// Ring capacity; inserting into a full ring drops the oldest point (default: 128)
    pub maximum_points: usize,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            segment_lifetime: 1.0,
            min_vertex_distance: 0.1,
            max_vertex_distance: 1.0,
            max_angle: 2.0,
            colors: Vec::new(),
            widths: Vec::new(),
            maximum_points: DEFAULT_MAXIMUM_POINTS,
        }
    }
}

impl TrailConfig {
    /// Sets the segment lifetime in seconds.
    pub fn with_lifetime(mut self, secs: f64) -> Self {
        self.segment_lifetime = secs;
        self
    }

    /// Sets the min/max insertion distances.
    pub fn with_vertex_distances(mut self, min: f32, max: f32) -> Self {
        self.min_vertex_distance = min;
        self.max_vertex_distance = max;
        self
    }

    /// Sets the angular insertion threshold in degrees.
    pub fn with_max_angle(mut self, degrees: f32) -> Self {
        self.max_angle = degrees;
        self
    }

    /// Sets the color ramp stops.
    pub fn with_colors(mut self, colors: Vec<Rgba>) -> Self {
        self.colors = colors;
        self
    }

    /// Sets the width ramp stops.
    pub fn with_widths(mut self, widths: Vec<f32>) -> Self {
        self.widths = widths;
        self
    }

    /// Sets the ring capacity.
    pub fn with_maximum_points(mut self, points: usize) -> Self {
        self.maximum_points = points;
        self
    }

    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TrailError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TrailError::ConfigParse(e.to_string()))?;
        Ok(config.sanitized())
    }

    /// Reads and parses a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TrailError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// `1 / segment_lifetime`, or `None` when the lifetime is not positive.
    pub fn lifetime_ratio(&self) -> Option<f64> {
        if self.segment_lifetime > 0.0 {
            Some(1.0 / self.segment_lifetime)
        } else {
            None
        }
    }

    /// True when no point can ever survive a tick.
    pub fn is_degenerate(&self) -> bool {
        self.lifetime_ratio().is_none()
    }

    /// Returns a copy with every out-of-range value clamped.
    ///
    /// - non-finite or negative lifetime, distances and angle become 0
    /// - non-finite ramp stops are dropped
    /// - `maximum_points` is clamped to [2, `MAX_MAXIMUM_POINTS`]
    pub fn sanitized(mut self) -> Self {
        if !self.segment_lifetime.is_finite() || self.segment_lifetime < 0.0 {
            warn!("segment_lifetime {} out of range, clamping to 0", self.segment_lifetime);
            self.segment_lifetime = 0.0;
        }

        self.min_vertex_distance = non_negative("min_vertex_distance", self.min_vertex_distance);
        self.max_vertex_distance = non_negative("max_vertex_distance", self.max_vertex_distance);
        self.max_angle = non_negative("max_angle", self.max_angle);

        let colors_before = self.colors.len();
        self.colors.retain(Rgba::is_finite);
        if self.colors.len() != colors_before {
            warn!("Dropped {} non-finite color stops", colors_before - self.colors.len());
        }

        let widths_before = self.widths.len();
        self.widths.retain(|w| w.is_finite());
        if self.widths.len() != widths_before {
            warn!("Dropped {} non-finite width stops", widths_before - self.widths.len());
        }

        if self.maximum_points < MIN_MAXIMUM_POINTS {
            warn!("maximum_points {} below {}, raising", self.maximum_points, MIN_MAXIMUM_POINTS);
            self.maximum_points = MIN_MAXIMUM_POINTS;
        } else if self.maximum_points > MAX_MAXIMUM_POINTS {
            warn!("maximum_points {} above {}, lowering", self.maximum_points, MAX_MAXIMUM_POINTS);
            self.maximum_points = MAX_MAXIMUM_POINTS;
        }

        self
    }
}

fn non_negative(name: &str, value: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!("{} {} out of range, clamping to 0", name, value);
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TrailConfig::default();
        assert_eq!(config.segment_lifetime, 1.0);
        assert_eq!(config.min_vertex_distance, 0.1);
        assert_eq!(config.max_vertex_distance, 1.0);
        assert_eq!(config.max_angle, 2.0);
        assert!(config.colors.is_empty());
        assert_eq!(config.maximum_points, DEFAULT_MAXIMUM_POINTS);
        assert_eq!(config.lifetime_ratio(), Some(1.0));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "segment_lifetime": 0.5,
            "colors": [{"r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0}],
            "widths": [0.4, 0.1]
        }"#;

        let config = TrailConfig::from_json(json).unwrap();
        assert_eq!(config.segment_lifetime, 0.5);
        assert_eq!(config.colors, vec![Rgba::new(1.0, 0.0, 0.0, 1.0)]);
        assert_eq!(config.widths, vec![0.4, 0.1]);
        // Untouched fields keep their defaults
        assert_eq!(config.max_angle, 2.0);
        assert_eq!(config.lifetime_ratio(), Some(2.0));
    }

    #[test]
    fn test_config_rejects_malformed_json() {
        let err = TrailConfig::from_json("{ segment_lifetime: ").unwrap_err();
        assert!(matches!(err, TrailError::ConfigParse(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = TrailConfig::from_file("/nonexistent/trail.json").unwrap_err();
        assert!(matches!(err, TrailError::Io(_)));
    }

    #[test]
    fn test_sanitize_clamps_out_of_range() {
        let config = TrailConfig {
            segment_lifetime: f64::NAN,
            min_vertex_distance: -1.0,
            max_vertex_distance: f32::INFINITY,
            max_angle: -5.0,
            colors: vec![Rgba::WHITE, Rgba::new(f32::NAN, 0.0, 0.0, 1.0)],
            widths: vec![1.0, f32::NAN, 0.5],
            maximum_points: 0,
        }
        .sanitized();

        assert_eq!(config.segment_lifetime, 0.0);
        assert!(config.is_degenerate());
        assert_eq!(config.min_vertex_distance, 0.0);
        assert_eq!(config.max_vertex_distance, 0.0);
        assert_eq!(config.max_angle, 0.0);
        assert_eq!(config.colors, vec![Rgba::WHITE]);
        assert_eq!(config.widths, vec![1.0, 0.5]);
        assert_eq!(config.maximum_points, MIN_MAXIMUM_POINTS);
    }

    #[test]
    fn test_sanitize_caps_maximum_points() {
        let config = TrailConfig::default().with_maximum_points(usize::MAX).sanitized();
        assert_eq!(config.maximum_points, MAX_MAXIMUM_POINTS);

        let json = format!(r#"{{"maximum_points": {}}}"#, u64::MAX);
        let config = TrailConfig::from_json(&json).unwrap();
        assert_eq!(config.maximum_points, MAX_MAXIMUM_POINTS);
    }

    #[test]
    fn test_sanitize_keeps_min_above_max() {
        // Inverted thresholds are a legal configuration: the max check wins
        let config = TrailConfig::default().with_vertex_distances(2.0, 0.5).sanitized();
        assert_eq!(config.min_vertex_distance, 2.0);
        assert_eq!(config.max_vertex_distance, 0.5);
    }
}
