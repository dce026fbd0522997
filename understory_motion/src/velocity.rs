// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer velocity estimation.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Vec2};
use smallvec::SmallVec;

/// Samples older than this, relative to the newest one, are ignored.
const HORIZON_MS: u64 = 100;

#[derive(Copy, Clone, Debug, PartialEq)]
struct Sample {
    time_ms: u64,
    position: Point,
}

/// Estimates pointer velocity from recent movement.
///
/// The estimate is a least-squares line through the samples of the last 100 ms, in logical
/// pixels per second, with each axis clamped to `max_velocity`.
///
/// ```rust
/// use kurbo::Point;
/// use understory_motion::VelocityTracker;
///
/// let mut tracker = VelocityTracker::new(8000.0);
/// tracker.add(0, Point::new(0.0, 0.0));
/// tracker.add(10, Point::new(0.0, 20.0));
/// assert!((tracker.velocity().y - 2000.0).abs() < 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct VelocityTracker {
    samples: SmallVec<[Sample; 16]>,
    max_velocity: f64,
}

impl VelocityTracker {
    /// Create a tracker clamping each axis to `max_velocity`.
    pub fn new(max_velocity: f64) -> Self {
        Self {
            samples: SmallVec::new(),
            max_velocity: max_velocity.abs(),
        }
    }

    /// Record a pointer position.
    ///
    /// A timestamp earlier than the newest sample starts a new estimate.
    pub fn add(&mut self, time_ms: u64, position: Point) {
        if self.samples.last().is_some_and(|s| s.time_ms > time_ms) {
            self.samples.clear();
        }
        self.samples.push(Sample { time_ms, position });
        let cutoff = time_ms.saturating_sub(HORIZON_MS);
        self.samples.retain(|s| s.time_ms >= cutoff);
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Current velocity in logical pixels per second.
    pub fn velocity(&self) -> Vec2 {
        let Some(newest) = self.samples.last() else {
            return Vec2::ZERO;
        };
        if self.samples.len() < 2 {
            return Vec2::ZERO;
        }
        let newest_ms = newest.time_ms;
        // Seconds before the newest sample, as negative times.
        let time_of = |s: &Sample| -((newest_ms - s.time_ms) as f64) / 1000.0;
        let n = self.samples.len() as f64;
        let mean_t = self.samples.iter().map(time_of).sum::<f64>() / n;
        let mean = self
            .samples
            .iter()
            .fold(Vec2::ZERO, |acc, s| acc + s.position.to_vec2())
            / n;

        let mut var_t = 0.0;
        let mut cov = Vec2::ZERO;
        for s in &self.samples {
            let dt = time_of(s) - mean_t;
            var_t += dt * dt;
            cov += (s.position.to_vec2() - mean) * dt;
        }
        if var_t == 0.0 {
            return Vec2::ZERO;
        }
        let v = cov / var_t;
        Vec2::new(
            v.x.clamp(-self.max_velocity, self.max_velocity),
            v.y.clamp(-self.max_velocity, self.max_velocity),
        )
    }
}
