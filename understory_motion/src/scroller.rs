// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-driven motion primitives: flings, tweens, and settle timing.
//!
//! Nothing here owns a timer. Behaviors advance these by the frame delta they receive in
//! [`Behavior::on_animation_frame`](understory_coordinator::Behavior::on_animation_frame)
//! and stop requesting frames once they report finished.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::drag::DragConfig;

/// Exponent of the fling deceleration curve, `ln(0.78) / ln(0.9)`.
const DECELERATION_RATE: f64 = 2.358_201_815;
const INFLEXION: f64 = 0.35;
const SCROLL_FRICTION: f64 = 0.015;
/// Earth gravity in inches per second squared, at 160 logical pixels per inch, tuned.
const PHYSICAL_COEFF: f64 = 9.806_65 * 39.37 * 160.0 * 0.84;

const BASE_SETTLE_DURATION_MS: f64 = 256.0;
const MAX_SETTLE_DURATION_MS: f64 = 600.0;
const MAX_OFFSET_ANIMATION_DURATION_MS: f64 = 600.0;

/// Easing curve of a [`Tween`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolator {
    /// Quadratic ease-out.
    #[default]
    Decelerate,
    /// Quintic ease-out, used for settling dragged views.
    Quintic,
}

impl Interpolator {
    /// Map linear progress `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
            Self::Quintic => {
                let u = t - 1.0;
                u * u * u * u * u + 1.0
            }
        }
    }
}

/// Animates a value from one point to another over a fixed duration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tween {
    from: f64,
    to: f64,
    duration_ms: f64,
    elapsed_ms: f64,
    interpolator: Interpolator,
}

impl Tween {
    /// A tween from `from` to `to` lasting `duration_ms`.
    pub fn new(from: f64, to: f64, duration_ms: f64, interpolator: Interpolator) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            elapsed_ms: 0.0,
            interpolator,
        }
    }

    /// Advance by `dt_ms` and return the new value.
    pub fn advance(&mut self, dt_ms: f64) -> f64 {
        self.elapsed_ms = (self.elapsed_ms + dt_ms.max(0.0)).min(self.duration_ms);
        self.value()
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        if self.is_finished() {
            return self.to;
        }
        let t = self.elapsed_ms / self.duration_ms;
        self.from + (self.to - self.from) * self.interpolator.apply(t)
    }

    /// Whether the tween reached its target.
    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    /// Final value.
    pub fn target(&self) -> f64 {
        self.to
    }

    /// Total duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }
}

/// A decelerating fling along one axis, confined to `[min, max]`.
///
/// Distance and duration follow the usual mobile scroll physics: a fling travels
/// further and longer the faster it starts, and stops early at either bound.
///
/// ```rust
/// use understory_motion::Fling;
///
/// let mut fling = Fling::new(0.0, -3000.0, -200.0, 0.0);
/// assert!(!fling.is_finished());
/// while !fling.is_finished() {
///     fling.advance(16.0);
/// }
/// assert_eq!(fling.position(), -200.0);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fling {
    start: f64,
    distance: f64,
    duration_ms: f64,
    elapsed_ms: f64,
    min: f64,
    max: f64,
    position: f64,
    finished: bool,
}

impl Fling {
    /// Start a fling at `start` with `velocity` in logical pixels per second.
    pub fn new(start: f64, velocity: f64, min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let start = start.clamp(min, max);
        let (distance, duration_ms) = if velocity == 0.0 {
            (0.0, 0.0)
        } else {
            let ratio = INFLEXION * velocity.abs() / (SCROLL_FRICTION * PHYSICAL_COEFF);
            let exponent = DECELERATION_RATE - 1.0;
            let duration = 1000.0 * ratio.powf(1.0 / exponent);
            let distance =
                SCROLL_FRICTION * PHYSICAL_COEFF * ratio.powf(DECELERATION_RATE / exponent);
            (distance * velocity.signum(), duration)
        };
        let pinned = (start >= max && velocity > 0.0) || (start <= min && velocity < 0.0);
        Self {
            start,
            distance,
            duration_ms,
            elapsed_ms: 0.0,
            min,
            max,
            position: start,
            finished: duration_ms <= 0.0 || pinned,
        }
    }

    /// Advance by `dt_ms` and return the new position.
    pub fn advance(&mut self, dt_ms: f64) -> f64 {
        if self.finished {
            return self.position;
        }
        self.elapsed_ms += dt_ms.max(0.0);
        let unclamped = if self.elapsed_ms >= self.duration_ms {
            self.finished = true;
            self.start + self.distance
        } else {
            let remaining = 1.0 - self.elapsed_ms / self.duration_ms;
            self.start + self.distance * (1.0 - remaining.powf(DECELERATION_RATE))
        };
        self.position = unclamped.clamp(self.min, self.max);
        if self.position != unclamped {
            self.finished = true;
        }
        self.position
    }

    /// Current position.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Where the fling comes to rest.
    pub fn final_position(&self) -> f64 {
        (self.start + self.distance).clamp(self.min, self.max)
    }

    /// Unbounded duration of the fling in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Whether the fling stopped, by running out or by reaching a bound.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

fn distance_influence(ratio: f64) -> f64 {
    ((ratio - 0.5) * 0.3 * core::f64::consts::FRAC_PI_2).sin()
}

/// Duration of settling a released view by `delta` along one axis.
///
/// `velocity` is the release velocity (clamped through `config` first), `motion_range` the
/// full draggable range, and `container_width` the width of the container the view
/// settles in.
pub fn settle_duration(
    delta: f64,
    velocity: f64,
    motion_range: f64,
    container_width: f64,
    config: &DragConfig,
) -> f64 {
    if delta == 0.0 {
        return 0.0;
    }
    let velocity = config.clamp_fling_velocity(velocity).abs();
    let half_width = container_width / 2.0;
    let ratio = (delta.abs() / container_width).min(1.0);
    let distance = half_width + half_width * distance_influence(ratio);
    let duration = if velocity > 0.0 {
        4.0 * (1000.0 * (distance / velocity).abs()).round()
    } else {
        ((delta.abs() / motion_range + 1.0) * BASE_SETTLE_DURATION_MS).floor()
    };
    duration.min(MAX_SETTLE_DURATION_MS)
}

/// Duration of animating a header offset over `distance`.
///
/// With a velocity the animation keeps pace with it; otherwise it scales with the distance
/// relative to the header `height`.
pub fn offset_animation_duration(distance: f64, velocity: f64, height: f64) -> f64 {
    let velocity = velocity.abs();
    let duration = if velocity > 0.0 {
        3.0 * (1000.0 * (distance / velocity)).round()
    } else {
        ((distance / height + 1.0) * 150.0).floor()
    };
    duration.min(MAX_OFFSET_ANIMATION_DURATION_MS)
}
