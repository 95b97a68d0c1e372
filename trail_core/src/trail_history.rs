//! The "HISTORY" Engine - Adaptive Point Sampling over a Ring Buffer
//!
//! Keeps the rolling window of pose samples a ribbon is built from:
//! - Expiry from the oldest end once a point outlives the segment lifetime
//! - A guaranteed pair of live points while emitting
//! - Adaptive insertion: large moves and sharp turns add a point, small
//!   moves only drag the newest point along with the source
//!
//! Storage is a fixed arena indexed from `head` with wraparound, allocated
//! once per capacity. A full ring drops its oldest point to make room.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trail_env::Pose;

use crate::trail_config::{TrailConfig, MAX_MAXIMUM_POINTS, MIN_MAXIMUM_POINTS};

// ============================================================================
// POINT
// ============================================================================

/// A single timestamped pose sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,

    /// Timestamp (seconds) when sampled or last resampled
    pub created_at: f64,
}

impl Point {
    pub fn new(pose: Pose, now: f64) -> Self {
        Self {
            position: pose.position,
            rotation: pose.rotation,
            created_at: now,
        }
    }

    /// Seconds since this point was sampled.
    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// Overwrites the sample in place.
    pub fn resample(&mut self, pose: Pose, now: f64) {
        self.position = pose.position;
        self.rotation = pose.rotation;
        self.created_at = now;
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(Pose::default(), 0.0)
    }
}

// ============================================================================
// SAMPLING DECISION
// ============================================================================

/// What the adaptive sampler did on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDecision {
    /// Not emitting, or the lifetime is degenerate
    Idle,

    /// The newest point was dragged to the source pose
    Resampled,

    /// Moved farther than `max_vertex_distance` from the reference
    InsertedDistance,

    /// Turned more than `max_angle` relative to the reference
    InsertedAngle,
}

impl SampleDecision {
    pub fn inserted(&self) -> bool {
        matches!(self, SampleDecision::InsertedDistance | SampleDecision::InsertedAngle)
    }
}

/// Running counters for a point history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Points appended (including the minimum pair)
    pub inserted: u64,

    /// In-place updates of the newest point
    pub resampled: u64,

    /// Points removed because they outlived the segment lifetime
    pub expired: u64,

    /// Points dropped early because the ring was full
    pub overflow_dropped: u64,
}

// ============================================================================
// POINT HISTORY
// ============================================================================

/// Oldest-first ring of points.
#[derive(Debug, Clone)]
pub struct PointHistory {
    /// Fixed arena; only `len` slots starting at `head` are live
    slots: Vec<Point>,

    /// Slot index of the oldest live point
    head: usize,

    /// Number of live points
    len: usize,

    stats: HistoryStats,
}

impl PointHistory {
    /// Creates an empty history with room for `capacity` points, clamped to
    /// [`MIN_MAXIMUM_POINTS`, `MAX_MAXIMUM_POINTS`].
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(MIN_MAXIMUM_POINTS, MAX_MAXIMUM_POINTS);
        Self {
            slots: vec![Point::default(); capacity],
            head: 0,
            len: 0,
            stats: HistoryStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stats(&self) -> HistoryStats {
        self.stats
    }

    /// Returns the `index`-th point, 0 = oldest.
    pub fn get(&self, index: usize) -> Option<&Point> {
        if index < self.len {
            Some(&self.slots[self.slot(index)])
        } else {
            None
        }
    }

    pub fn oldest(&self) -> Option<&Point> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<&Point> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// The point new motion is measured against.
    pub fn second_newest(&self) -> Option<&Point> {
        self.len.checked_sub(2).and_then(|i| self.get(i))
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Point> + '_ {
        (0..self.len).map(move |i| &self.slots[self.slot(i)])
    }

    /// Removes every point, keeping the arena.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Rebuilds the arena at a new capacity, keeping the newest points.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.clamp(MIN_MAXIMUM_POINTS, MAX_MAXIMUM_POINTS);
        if capacity == self.capacity() {
            return;
        }

        let keep = self.len.min(capacity);
        let skip = self.len - keep;
        let mut slots = vec![Point::default(); capacity];
        for (dst, point) in slots.iter_mut().zip(self.iter().skip(skip)) {
            *dst = *point;
        }

        self.stats.overflow_dropped += skip as u64;
        self.slots = slots;
        self.head = 0;
        self.len = keep;
    }

    /// Appends a point as the newest, dropping the oldest if full.
    pub fn push(&mut self, point: Point) {
        if self.len == self.capacity() {
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
            self.stats.overflow_dropped += 1;
        }

        let slot = self.slot(self.len);
        self.slots[slot] = point;
        self.len += 1;
        self.stats.inserted += 1;
    }

    /// Removes and returns the oldest point.
    pub fn pop_oldest(&mut self) -> Option<Point> {
        if self.len == 0 {
            return None;
        }

        let point = self.slots[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(point)
    }

    /// Overwrites the newest point in place. No-op on an empty history.
    pub fn resample_newest(&mut self, pose: Pose, now: f64) {
        if let Some(i) = self.len.checked_sub(1) {
            let slot = self.slot(i);
            self.slots[slot].resample(pose, now);
            self.stats.resampled += 1;
        }
    }

    /// Removes points whose age exceeds `lifetime`, oldest first.
    ///
    /// Returns the number of points removed.
    pub fn expire(&mut self, now: f64, lifetime: f64) -> usize {
        let mut removed = 0;
        while let Some(oldest) = self.oldest() {
            if oldest.age(now) <= lifetime {
                break;
            }
            self.pop_oldest();
            removed += 1;
        }

        self.stats.expired += removed as u64;
        removed
    }

    /// Advances the history by one tick.
    ///
    /// This performs three operations:
    /// 1. Expire points older than `segment_lifetime`
    /// 2. While emitting, top up to a renderable pair
    /// 3. While emitting, insert or resample per the adaptive policy
    ///
    /// # Arguments
    /// * `now` - Current timestamp in seconds
    /// * `source` - The tracked object's pose this tick
    /// * `emitting` - Whether new samples are being taken
    /// * `config` - Thresholds; `maximum_points` changes resize the ring
    pub fn tick(&mut self, now: f64, source: Pose, emitting: bool, config: &TrailConfig) -> SampleDecision {
        self.resize(config.maximum_points);

        // Degenerate lifetime: nothing survives, nothing is sampled
        if config.is_degenerate() {
            self.stats.expired += self.len as u64;
            self.clear();
            return SampleDecision::Idle;
        }

        self.expire(now, config.segment_lifetime);

        if !emitting {
            return SampleDecision::Idle;
        }

        while self.len < MIN_MAXIMUM_POINTS {
            self.push(Point::new(source, now));
        }

        let decision = match self.second_newest() {
            Some(reference) => decide(reference, &source, config),
            None => SampleDecision::Resampled,
        };

        if decision.inserted() {
            debug!(points = self.len + 1, ?decision, "Inserting trail point");
            self.push(Point::new(source, now));
        } else {
            self.resample_newest(source, now);
        }

        decision
    }

    fn slot(&self, index: usize) -> usize {
        (self.head + index) % self.slots.len()
    }
}

/// Adaptive insertion policy relative to the reference point.
///
/// The max-distance check runs first so that it keeps priority when
/// `min_vertex_distance > max_vertex_distance`.
fn decide(reference: &Point, source: &Pose, config: &TrailConfig) -> SampleDecision {
    let d2 = (source.position - reference.position).norm_squared();

    if d2 > config.max_vertex_distance * config.max_vertex_distance {
        SampleDecision::InsertedDistance
    } else if d2 <= config.min_vertex_distance * config.min_vertex_distance {
        SampleDecision::Resampled
    } else if angle_degrees(&source.rotation, &reference.rotation) > config.max_angle {
        SampleDecision::InsertedAngle
    } else {
        SampleDecision::Resampled
    }
}

/// Angle between two orientations in degrees, in [0, 180].
pub fn angle_degrees(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>) -> f32 {
    a.angle_to(b).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn pose_x(x: f32) -> Pose {
        Pose::at(Vector3::new(x, 0.0, 0.0))
    }

    fn reference_config() -> TrailConfig {
        TrailConfig::default()
            .with_lifetime(1.0)
            .with_vertex_distances(0.1, 1.0)
            .with_max_angle(2.0)
    }

    #[test]
    fn test_ring_push_and_order() {
        let mut history = PointHistory::with_capacity(4);
        for i in 0..3 {
            history.push(Point::new(pose_x(i as f32), i as f64));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.oldest().unwrap().created_at, 0.0);
        assert_eq!(history.newest().unwrap().created_at, 2.0);
        assert_eq!(history.second_newest().unwrap().created_at, 1.0);

        let stamps: Vec<f64> = history.iter().map(|p| p.created_at).collect();
        assert_eq!(stamps, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_ring_overflow_drops_oldest() {
        let mut history = PointHistory::with_capacity(3);
        for i in 0..5 {
            history.push(Point::new(pose_x(i as f32), i as f64));
        }

        assert_eq!(history.len(), 3);
        let stamps: Vec<f64> = history.iter().map(|p| p.created_at).collect();
        assert_eq!(stamps, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.stats().overflow_dropped, 2);
        assert_eq!(history.stats().inserted, 5);
    }

    #[test]
    fn test_ring_wraparound_after_expiry() {
        let mut history = PointHistory::with_capacity(3);
        for i in 0..3 {
            history.push(Point::new(pose_x(0.0), i as f64));
        }

        // Expire the two oldest, then wrap two new points around the arena
        assert_eq!(history.expire(2.5, 1.0), 2);
        history.push(Point::new(pose_x(0.0), 3.0));
        history.push(Point::new(pose_x(0.0), 4.0));

        let stamps: Vec<f64> = history.iter().map(|p| p.created_at).collect();
        assert_eq!(stamps, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.stats().overflow_dropped, 0);
    }

    #[test]
    fn test_resize_keeps_newest() {
        let mut history = PointHistory::with_capacity(8);
        for i in 0..6 {
            history.push(Point::new(pose_x(i as f32), i as f64));
        }

        history.resize(4);
        assert_eq!(history.capacity(), 4);
        let stamps: Vec<f64> = history.iter().map(|p| p.created_at).collect();
        assert_eq!(stamps, vec![2.0, 3.0, 4.0, 5.0]);

        history.resize(16);
        assert_eq!(history.capacity(), 16);
        assert_eq!(history.len(), 4);
        assert_eq!(history.newest().unwrap().created_at, 5.0);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let history = PointHistory::with_capacity(usize::MAX);
        assert_eq!(history.capacity(), MAX_MAXIMUM_POINTS);

        let mut history = PointHistory::with_capacity(0);
        assert_eq!(history.capacity(), MIN_MAXIMUM_POINTS);
        history.resize(usize::MAX);
        assert_eq!(history.capacity(), MAX_MAXIMUM_POINTS);
    }

    #[test]
    fn test_fresh_start_creates_pair() {
        let mut history = PointHistory::with_capacity(16);
        let decision = history.tick(0.0, pose_x(0.0), true, &reference_config());

        assert_eq!(history.len(), 2);
        assert_eq!(decision, SampleDecision::Resampled);
    }

    #[test]
    fn test_large_move_inserts_point() {
        // Source moves 2.0 units in one tick from rest: 2 initial + 1 new
        let config = reference_config();
        let mut history = PointHistory::with_capacity(16);
        history.tick(0.0, pose_x(0.0), true, &config);

        let decision = history.tick(0.016, pose_x(2.0), true, &config);

        assert_eq!(decision, SampleDecision::InsertedDistance);
        assert_eq!(history.len(), 3);
        assert_eq!(history.newest().unwrap().position.x, 2.0);
    }

    #[test]
    fn test_small_move_resamples_newest() {
        let config = reference_config();
        let mut history = PointHistory::with_capacity(16);
        history.tick(0.0, pose_x(0.0), true, &config);

        let decision = history.tick(0.1, pose_x(0.05), true, &config);

        assert_eq!(decision, SampleDecision::Resampled);
        assert_eq!(history.len(), 2);
        let newest = history.newest().unwrap();
        assert_eq!(newest.position.x, 0.05);
        assert_eq!(newest.created_at, 0.1);
        // Reference untouched
        assert_eq!(history.oldest().unwrap().created_at, 0.0);
    }

    #[test]
    fn test_turn_in_place_inserts_point() {
        let config = reference_config();
        let mut history = PointHistory::with_capacity(16);
        history.tick(0.0, pose_x(0.0), true, &config);

        // Mid-range move (between min and max) with a 10° turn
        let turned = Pose::new(
            Vector3::new(0.5, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 10f32.to_radians()),
        );
        assert_eq!(history.tick(0.1, turned, true, &config), SampleDecision::InsertedAngle);
        assert_eq!(history.len(), 3);

        // Same move without the turn only drags the newest point
        let mut straight = PointHistory::with_capacity(16);
        straight.tick(0.0, pose_x(0.0), true, &config);
        assert_eq!(straight.tick(0.1, pose_x(0.5), true, &config), SampleDecision::Resampled);
        assert_eq!(straight.len(), 2);
    }

    #[test]
    fn test_rotation_within_min_distance_is_ignored() {
        // Small displacement short-circuits before the angle check
        let config = reference_config();
        let mut history = PointHistory::with_capacity(16);
        history.tick(0.0, pose_x(0.0), true, &config);

        let spun = Pose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 90f32.to_radians()),
        );
        assert_eq!(history.tick(0.1, spun, true, &config), SampleDecision::Resampled);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_inverted_thresholds_max_wins() {
        let config = reference_config().with_vertex_distances(5.0, 1.0);
        let mut history = PointHistory::with_capacity(16);
        history.tick(0.0, pose_x(0.0), true, &config);

        // 2.0 is below min (5.0) but above max (1.0): insert
        assert_eq!(history.tick(0.1, pose_x(2.0), true, &config), SampleDecision::InsertedDistance);
    }

    #[test]
    fn test_not_emitting_only_expires() {
        let config = reference_config();
        let mut history = PointHistory::with_capacity(16);
        history.tick(0.0, pose_x(0.0), true, &config);
        history.tick(0.1, pose_x(3.0), true, &config);
        assert_eq!(history.len(), 3);

        assert_eq!(history.tick(0.2, pose_x(9.0), false, &config), SampleDecision::Idle);
        assert_eq!(history.len(), 3);

        // Stationary past the lifetime while not emitting: everything expires
        history.tick(1.5, pose_x(9.0), false, &config);
        assert!(history.is_empty());
        assert_eq!(history.stats().expired, 3);
    }

    #[test]
    fn test_degenerate_lifetime_clears_everything() {
        let config = reference_config().with_lifetime(0.0);
        let mut history = PointHistory::with_capacity(16);

        for i in 0..5 {
            let decision = history.tick(i as f64 * 0.1, pose_x(i as f32 * 3.0), true, &config);
            assert_eq!(decision, SampleDecision::Idle);
            assert!(history.is_empty());
        }
    }

    #[test]
    fn test_capacity_config_change_applies_next_tick() {
        let mut config = reference_config();
        let mut history = PointHistory::with_capacity(config.maximum_points);
        for i in 0..6 {
            history.tick(i as f64 * 0.01, pose_x(i as f32 * 2.0), true, &config);
        }
        assert_eq!(history.len(), 7);

        config.maximum_points = 4;
        history.tick(0.06, pose_x(12.0), true, &config);
        assert_eq!(history.capacity(), 4);
        assert_eq!(history.len(), 4);
        assert_eq!(history.newest().unwrap().position.x, 12.0);
    }

    #[test]
    fn test_angle_degrees() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 45f32.to_radians());
        assert_relative_eq!(angle_degrees(&a, &b), 45.0, epsilon = 1e-3);
        assert_relative_eq!(angle_degrees(&b, &b), 0.0, epsilon = 1e-3);
    }

    proptest! {
        #[test]
        fn prop_expiry_and_minimum_hold(
            steps in prop::collection::vec((0.001f64..0.2, -3.0f32..3.0, any::<bool>()), 1..80),
            lifetime in 0.05f64..2.0,
        ) {
            let config = reference_config().with_lifetime(lifetime).with_maximum_points(32);
            let mut history = PointHistory::with_capacity(config.maximum_points);
            let mut now = 0.0;
            let mut x = 0.0f32;

            for (dt, dx, emitting) in steps {
                now += dt;
                x += dx;
                history.tick(now, pose_x(x), emitting, &config);

                // No retained point outlives the lifetime
                for point in history.iter() {
                    prop_assert!(point.age(now) <= lifetime);
                }

                // A renderable pair exists whenever emitting
                if emitting {
                    prop_assert!(history.len() >= 2);
                }

                // Ages are non-decreasing from newest to oldest
                let stamps: Vec<f64> = history.iter().map(|p| p.created_at).collect();
                prop_assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
                prop_assert!(history.len() <= history.capacity());
            }
        }

        #[test]
        fn prop_sub_min_jitter_never_inserts(
            jitter in prop::collection::vec(-0.07f32..0.07, 1..60),
        ) {
            // Max offset from the origin stays within sqrt(2) * 0.07 < 0.1
            let config = reference_config().with_lifetime(100.0);
            let mut history = PointHistory::with_capacity(16);
            history.tick(0.0, pose_x(0.0), true, &config);

            for (i, j) in jitter.iter().enumerate() {
                let pose = Pose::at(Vector3::new(*j, *j, 0.0));
                let now = (i + 1) as f64 * 0.016;
                prop_assert_eq!(history.tick(now, pose, true, &config), SampleDecision::Resampled);
                prop_assert_eq!(history.len(), 2);
                prop_assert_eq!(history.newest().unwrap().created_at, now);
            }
        }

        #[test]
        fn prop_fast_line_inserts_every_tick(
            speed in 1.01f32..5.0,
            ticks in 1usize..40,
        ) {
            let config = reference_config().with_lifetime(100.0).with_maximum_points(64);
            let mut history = PointHistory::with_capacity(config.maximum_points);
            history.tick(0.0, pose_x(0.0), true, &config);

            for i in 1..=ticks {
                let decision = history.tick(i as f64 * 0.016, pose_x(speed * i as f32), true, &config);
                prop_assert_eq!(decision, SampleDecision::InsertedDistance);
                prop_assert_eq!(history.len(), 2 + i);
            }
        }
    }
}
