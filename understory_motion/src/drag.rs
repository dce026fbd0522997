// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag tracking with touch slop and release velocity.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Vec2};
use understory_coordinator::{PointerEvent, PointerId};

use crate::velocity::VelocityTracker;

/// Thresholds shared by the drag-driven behaviors, in logical pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragConfig {
    /// Distance a pointer travels before a press becomes a drag.
    pub touch_slop: f64,
    /// Slowest release that still counts as a fling, in pixels per second.
    pub min_fling_velocity: f64,
    /// Fastest fling, in pixels per second.
    pub max_fling_velocity: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            touch_slop: 8.0,
            min_fling_velocity: 50.0,
            max_fling_velocity: 8000.0,
        }
    }
}

impl DragConfig {
    /// Zero below the minimum fling velocity, capped at the maximum, sign preserved.
    pub fn clamp_fling_velocity(&self, velocity: f64) -> f64 {
        let magnitude = velocity.abs();
        if magnitude < self.min_fling_velocity {
            0.0
        } else if magnitude > self.max_fling_velocity {
            self.max_fling_velocity.copysign(velocity)
        } else {
            velocity
        }
    }
}

/// Follows one pointer through a drag.
///
/// Most helpers measure the vertical axis; the `_x` variants measure the horizontal one.
///
/// A press is tracked from [`begin`](Self::begin) until [`reset`](Self::reset). Events of
/// any other pointer are ignored, so a lost pointer simply stops producing movement.
#[derive(Clone, Debug)]
pub struct DragTracker {
    config: DragConfig,
    pointer: Option<PointerId>,
    initial: Point,
    last: Point,
    dragging: bool,
    velocity: VelocityTracker,
}

impl Default for DragTracker {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl DragTracker {
    /// Create an idle tracker.
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            pointer: None,
            initial: Point::ZERO,
            last: Point::ZERO,
            dragging: false,
            velocity: VelocityTracker::new(config.max_fling_velocity),
        }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    /// Start tracking the pointer of `event`.
    pub fn begin(&mut self, event: &PointerEvent) {
        self.pointer = Some(event.pointer);
        self.initial = event.position;
        self.last = event.position;
        self.dragging = false;
        self.velocity.clear();
        self.velocity.add(event.time_ms, event.position);
    }

    /// Stop tracking and forget the velocity.
    pub fn reset(&mut self) {
        self.release();
        self.velocity.clear();
    }

    /// Stop tracking the pointer but keep its velocity for a later release.
    pub fn release(&mut self) {
        self.pointer = None;
        self.dragging = false;
    }

    /// The tracked pointer.
    pub fn pointer(&self) -> Option<PointerId> {
        self.pointer
    }

    /// Whether `pointer` is the tracked one.
    pub fn is_tracking(&self, pointer: PointerId) -> bool {
        self.pointer == Some(pointer)
    }

    /// Whether the press has become a drag.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Treat the press as a drag from now on.
    pub fn start_dragging(&mut self) {
        self.dragging = true;
    }

    /// Where the press started.
    pub fn initial_position(&self) -> Point {
        self.initial
    }

    /// Position of the last consumed movement.
    pub fn last_position(&self) -> Point {
        self.last
    }

    /// Whether `position` is more than the touch slop away from the start of the press.
    pub fn past_slop(&self, position: Point) -> bool {
        (position.y - self.initial.y).abs() > self.config.touch_slop
    }

    /// Whether `position` is more than the touch slop away horizontally from the start of
    /// the press.
    pub fn past_slop_x(&self, position: Point) -> bool {
        (position.x - self.initial.x).abs() > self.config.touch_slop
    }

    /// Record `event` for velocity estimation, if it belongs to the tracked pointer.
    pub fn add_movement(&mut self, event: &PointerEvent) {
        if self.is_tracking(event.pointer) {
            self.velocity.add(event.time_ms, event.position);
        }
    }

    /// Turn the press into a drag once the pointer moved past the slop since the last
    /// consumed position. Returns whether it is dragging.
    pub fn claim_past_slop(&mut self, event: &PointerEvent) -> bool {
        if !self.is_tracking(event.pointer) {
            return false;
        }
        if !self.dragging && (event.position.y - self.last.y).abs() > self.config.touch_slop {
            self.dragging = true;
            self.last = event.position;
        }
        self.dragging
    }

    /// Scroll distance of a move, positive when the pointer travels up.
    ///
    /// Returns `None` until the press passes the slop; the crossing move reports the
    /// distance beyond the slop.
    pub fn scroll_delta(&mut self, event: &PointerEvent) -> Option<f64> {
        if !self.is_tracking(event.pointer) {
            return None;
        }
        let mut dy = self.last.y - event.position.y;
        if !self.dragging && dy.abs() > self.config.touch_slop {
            self.dragging = true;
            dy -= self.config.touch_slop.copysign(dy);
        }
        if !self.dragging {
            return None;
        }
        self.last = event.position;
        Some(dy)
    }

    /// Pointer movement since the last consumed position, positive downward.
    pub fn follow(&mut self, event: &PointerEvent) -> Option<f64> {
        if !self.is_tracking(event.pointer) {
            return None;
        }
        let dy = event.position.y - self.last.y;
        self.last = event.position;
        Some(dy)
    }

    /// Pointer movement since the last consumed position, positive to the right.
    pub fn follow_x(&mut self, event: &PointerEvent) -> Option<f64> {
        if !self.is_tracking(event.pointer) {
            return None;
        }
        let dx = event.position.x - self.last.x;
        self.last = event.position;
        Some(dx)
    }

    /// Estimated pointer velocity, capped at the maximum fling velocity.
    pub fn velocity(&self) -> Vec2 {
        self.velocity.velocity()
    }

    /// Vertical release velocity, zeroed below the minimum fling velocity.
    pub fn fling_velocity_y(&self) -> f64 {
        self.config.clamp_fling_velocity(self.velocity().y)
    }

    /// Horizontal release velocity, zeroed below the minimum fling velocity.
    pub fn fling_velocity_x(&self) -> f64 {
        self.config.clamp_fling_velocity(self.velocity().x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::num::NonZeroU64;
    use understory_coordinator::PointerKind;

    fn at(kind: PointerKind, y: f64, t: u64) -> PointerEvent {
        PointerEvent::new(kind, Point::new(10.0, y), t)
    }

    #[test]
    fn slop_is_subtracted_once() {
        let mut drag = DragTracker::default();
        drag.begin(&at(PointerKind::Down, 100.0, 0));
        assert_eq!(drag.scroll_delta(&at(PointerKind::Move, 95.0, 10)), None);
        assert_eq!(drag.scroll_delta(&at(PointerKind::Move, 80.0, 20)), Some(12.0));
        assert!(drag.is_dragging());
        assert_eq!(drag.scroll_delta(&at(PointerKind::Move, 90.0, 30)), Some(-10.0));
    }

    #[test]
    fn other_pointers_are_ignored() {
        let mut drag = DragTracker::default();
        drag.begin(&at(PointerKind::Down, 100.0, 0));
        let stray = at(PointerKind::Move, 0.0, 10).with_pointer(NonZeroU64::new(7).unwrap());
        assert_eq!(drag.scroll_delta(&stray), None);
        assert!(!drag.claim_past_slop(&stray));
        assert_eq!(drag.follow(&stray), None);
        drag.reset();
        assert_eq!(drag.pointer(), None);
    }

    #[test]
    fn claiming_moves_the_reference_point() {
        let mut drag = DragTracker::default();
        drag.begin(&at(PointerKind::Down, 100.0, 0));
        assert!(!drag.claim_past_slop(&at(PointerKind::Move, 104.0, 5)));
        assert!(drag.claim_past_slop(&at(PointerKind::Move, 120.0, 10)));
        assert_eq!(drag.last_position().y, 120.0);
        assert_eq!(drag.follow(&at(PointerKind::Move, 130.0, 15)), Some(10.0));
    }

    #[test]
    fn fling_velocity_respects_limits() {
        let config = DragConfig::default();
        assert_eq!(config.clamp_fling_velocity(30.0), 0.0);
        assert_eq!(config.clamp_fling_velocity(-300.0), -300.0);
        assert_eq!(config.clamp_fling_velocity(-9000.0), -8000.0);

        let mut drag = DragTracker::new(config);
        drag.begin(&at(PointerKind::Down, 100.0, 0));
        drag.add_movement(&at(PointerKind::Move, 110.0, 10));
        assert!((drag.fling_velocity_y() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn horizontal_helpers_measure_x() {
        let mut drag = DragTracker::default();
        drag.begin(&PointerEvent::down(Point::new(100.0, 50.0), 0));
        assert!(!drag.past_slop_x(Point::new(106.0, 90.0)));
        assert!(drag.past_slop_x(Point::new(90.0, 50.0)));

        let moved = PointerEvent::moved(Point::new(130.0, 70.0), 10);
        drag.add_movement(&moved);
        assert_eq!(drag.follow_x(&moved), Some(30.0));
        assert!((drag.fling_velocity_x() - 3000.0).abs() < 1e-6);
        assert_eq!(drag.follow(&PointerEvent::moved(Point::new(130.0, 80.0), 20)), Some(10.0));
    }
}
