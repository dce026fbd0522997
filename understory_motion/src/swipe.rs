// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Swipe to dismiss: a child dragged sideways and flung off its resting place.
//!
//! A released child is dismissed when it was flung in an allowed direction, or when it was
//! let go still, at least `dismiss_threshold` of its width away from where the drag began.
//! A dismissed child settles one full width away; otherwise it settles back.

use alloc::boxed::Box;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use understory_coordinator::{AnimationStatus, Behavior, BehaviorCtx, PointerEvent, PointerKind};

use crate::drag::{DragConfig, DragTracker};
use crate::scroller::{Interpolator, Tween, settle_duration};

/// Directions a [`SwipeDismissBehavior`] can be swiped in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    /// Towards the trailing edge: rightwards in left-to-right layouts.
    StartToEnd,
    /// Towards the leading edge: leftwards in left-to-right layouts.
    EndToStart,
    /// Either way.
    #[default]
    Any,
}

/// Drag state of a [`SwipeDismissBehavior`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SwipeState {
    /// At rest.
    #[default]
    Idle,
    /// Following a pointer.
    Dragging,
    /// Animating back or off after a release.
    Settling,
}

/// Configuration of a [`SwipeDismissBehavior`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SwipeDismissConfig {
    /// Allowed swipe directions.
    pub direction: SwipeDirection,
    /// Share of the child's width a still release must travel to dismiss, in `[0, 1]`.
    pub dismiss_threshold: f64,
    /// Share of the width swiped before the alpha starts to fade.
    pub alpha_start: f64,
    /// Share of the width swiped at which the alpha reaches zero.
    pub alpha_end: f64,
    /// Drag thresholds.
    pub drag: DragConfig,
}

impl Default for SwipeDismissConfig {
    fn default() -> Self {
        Self {
            direction: SwipeDirection::Any,
            dismiss_threshold: 0.5,
            alpha_start: 0.0,
            alpha_end: 0.5,
            drag: DragConfig::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Settle {
    tween: Tween,
    dismiss: bool,
}

type SwipePredicate = Box<dyn Fn(&BehaviorCtx<'_>) -> bool>;
type DismissListener = Box<dyn FnMut()>;
type StateListener = Box<dyn FnMut(SwipeState)>;

/// Behavior of a child that can be swiped away horizontally.
///
/// The behavior only moves the child and reports [`alpha`](Self::alpha); removing a
/// dismissed child is up to the dismiss listener.
///
/// ```rust
/// use kurbo::{Point, Size};
/// use understory_coordinator::{Coordinator, LayoutSpec, Length, PointerEvent};
/// use understory_motion::SwipeDismissBehavior;
///
/// let mut coordinator = Coordinator::default();
/// let card = coordinator
///     .add_child(LayoutSpec {
///         width: Length::Fixed(300.0),
///         height: Length::Fixed(80.0),
///         ..LayoutSpec::with_behavior(SwipeDismissBehavior::default())
///     })
///     .unwrap();
/// coordinator.layout_pass(Size::new(400.0, 200.0)).unwrap();
///
/// let down = PointerEvent::down(Point::new(100.0, 40.0), 0);
/// if !coordinator.on_intercept_pointer(&down) {
///     coordinator.on_pointer(&down);
/// }
/// coordinator.on_pointer(&PointerEvent::moved(Point::new(280.0, 40.0), 16));
/// coordinator.on_pointer(&PointerEvent::moved(Point::new(280.0, 40.0), 200));
/// coordinator.on_pointer(&PointerEvent::up(Point::new(280.0, 40.0), 300));
/// while coordinator.is_animating() {
///     coordinator.frame(16.0);
/// }
/// let swipe = coordinator.behavior::<SwipeDismissBehavior>(card).unwrap();
/// assert!(swipe.is_dismissed());
/// assert_eq!(coordinator.rect(card).unwrap().x0, 300.0);
/// ```
pub struct SwipeDismissBehavior {
    config: SwipeDismissConfig,
    state: SwipeState,
    drag: DragTracker,
    intercepting: bool,
    captured: bool,
    original_left: f64,
    settle: Option<Settle>,
    dismissed: bool,
    alpha: f64,
    predicate: Option<SwipePredicate>,
    dismiss_listener: Option<DismissListener>,
    state_listener: Option<StateListener>,
}

impl fmt::Debug for SwipeDismissBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwipeDismissBehavior")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("captured", &self.captured)
            .field("original_left", &self.original_left)
            .field("settle", &self.settle)
            .field("dismissed", &self.dismissed)
            .field("alpha", &self.alpha)
            .finish_non_exhaustive()
    }
}

impl Default for SwipeDismissBehavior {
    fn default() -> Self {
        Self::new(SwipeDismissConfig::default())
    }
}

impl SwipeDismissBehavior {
    /// An idle behavior.
    pub fn new(config: SwipeDismissConfig) -> Self {
        Self {
            config,
            state: SwipeState::Idle,
            drag: DragTracker::new(config.drag),
            intercepting: false,
            captured: false,
            original_left: 0.0,
            settle: None,
            dismissed: false,
            alpha: 1.0,
            predicate: None,
            dismiss_listener: None,
            state_listener: None,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &SwipeDismissConfig {
        &self.config
    }

    /// Mutable configuration; applies from the next drag.
    pub fn config_mut(&mut self) -> &mut SwipeDismissConfig {
        &mut self.config
    }

    /// Current drag state.
    pub fn state(&self) -> SwipeState {
        self.state
    }

    /// Opacity the host should draw the child with, `1` at rest and `0` once swiped far.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Whether a release has dismissed the child.
    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    /// Decide whether a press may start a swipe. By default every press may.
    pub fn set_swipe_predicate(&mut self, predicate: impl Fn(&BehaviorCtx<'_>) -> bool + 'static) {
        self.predicate = Some(Box::new(predicate));
    }

    /// Called once the child has settled off after a dismissing release.
    pub fn set_dismiss_listener(&mut self, listener: impl FnMut() + 'static) {
        self.dismiss_listener = Some(Box::new(listener));
    }

    /// Called on every drag state change.
    pub fn set_state_listener(&mut self, listener: impl FnMut(SwipeState) + 'static) {
        self.state_listener = Some(Box::new(listener));
    }

    fn set_state(&mut self, state: SwipeState) {
        if self.state == state {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?state, "swipe state");
        self.state = state;
        if let Some(listener) = &mut self.state_listener {
            listener(state);
        }
    }

    fn finish_dismiss(&mut self) {
        tracing::debug!("swipe dismissed");
        self.dismissed = true;
        if let Some(listener) = &mut self.dismiss_listener {
            listener();
        }
    }

    fn try_capture(&self, ctx: &BehaviorCtx<'_>) -> bool {
        !self.captured && self.predicate.as_ref().is_none_or(|p| p(ctx))
    }

    fn capture(&mut self, ctx: &BehaviorCtx<'_>, event: &PointerEvent) {
        self.captured = true;
        self.settle = None;
        self.original_left = ctx.child_rect().x0;
        self.drag.start_dragging();
        self.drag.follow_x(event);
        self.set_state(SwipeState::Dragging);
    }

    /// Horizontal range the child's left edge may be dragged within.
    fn drag_bounds(&self, ctx: &BehaviorCtx<'_>) -> (f64, f64) {
        let origin = self.original_left;
        let width = ctx.child_rect().width();
        let rtl = ctx.layout_direction().is_rtl();
        match (self.config.direction, rtl) {
            (SwipeDirection::StartToEnd, false) | (SwipeDirection::EndToStart, true) => {
                (origin, origin + width)
            }
            (SwipeDirection::StartToEnd, true) | (SwipeDirection::EndToStart, false) => {
                (origin - width, origin)
            }
            (SwipeDirection::Any, _) => (origin - width, origin + width),
        }
    }

    fn update_alpha(&mut self, left: f64, width: f64) {
        let distance = (left - self.original_left).abs();
        let start = width * self.config.alpha_start;
        let end = width * self.config.alpha_end;
        self.alpha = if distance <= start {
            1.0
        } else if distance >= end {
            0.0
        } else {
            (1.0 - (distance - start) / (end - start)).clamp(0.0, 1.0)
        };
    }

    fn move_left_to(&mut self, ctx: &mut BehaviorCtx<'_>, left: f64) {
        let rect = ctx.child_rect();
        if rect.x0 != left {
            ctx.offset_left_and_right(left - rect.x0);
        }
        self.update_alpha(left, rect.width());
    }

    fn follow_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) {
        let Some(dx) = self.drag.follow_x(event) else {
            return;
        };
        let (min, max) = self.drag_bounds(ctx);
        let left = (ctx.child_rect().x0 + dx).clamp(min, max);
        self.move_left_to(ctx, left);
    }

    fn should_dismiss(&self, ctx: &BehaviorCtx<'_>, velocity: f64) -> bool {
        let rect = ctx.child_rect();
        if velocity != 0.0 {
            let rtl = ctx.layout_direction().is_rtl();
            return match self.config.direction {
                SwipeDirection::Any => true,
                SwipeDirection::StartToEnd => (velocity < 0.0) == rtl,
                SwipeDirection::EndToStart => (velocity > 0.0) == rtl,
            };
        }
        let threshold = (rect.width() * self.config.dismiss_threshold.clamp(0.0, 1.0)).round();
        (rect.x0 - self.original_left).abs() >= threshold
    }

    fn release(&mut self, ctx: &mut BehaviorCtx<'_>, velocity: f64) {
        self.captured = false;
        let rect = ctx.child_rect();
        let dismiss = self.should_dismiss(ctx, velocity);
        let target = if !dismiss {
            self.original_left
        } else if rect.x0 < self.original_left {
            self.original_left - rect.width()
        } else {
            self.original_left + rect.width()
        };
        self.settle_to(ctx, target, dismiss, velocity);
    }

    fn settle_to(&mut self, ctx: &mut BehaviorCtx<'_>, left: f64, dismiss: bool, velocity: f64) {
        let rect = ctx.child_rect();
        let delta = left - rect.x0;
        if delta == 0.0 {
            self.settle = None;
            self.set_state(SwipeState::Idle);
            if dismiss {
                self.finish_dismiss();
            }
            return;
        }
        let duration = settle_duration(
            delta,
            velocity,
            rect.width(),
            ctx.container_size().width,
            &self.config.drag,
        );
        tracing::trace!(from = rect.x0, to = left, duration, dismiss, "swipe settle");
        self.settle = Some(Settle {
            tween: Tween::new(rect.x0, left, duration, Interpolator::Quintic),
            dismiss,
        });
        self.set_state(SwipeState::Settling);
        ctx.request_animation_frame();
    }
}

impl Behavior for SwipeDismissBehavior {
    fn on_intercept_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        let mut dispatch = self.intercepting;
        match event.kind {
            PointerKind::Down => {
                self.intercepting = ctx.is_point_in_child_bounds(ctx.child(), event.position);
                dispatch = self.intercepting;
            }
            PointerKind::Up | PointerKind::Cancel => self.intercepting = false,
            PointerKind::Move => {}
        }
        if !dispatch {
            return false;
        }
        match event.kind {
            PointerKind::Down => {
                self.drag.begin(event);
                // Catching a settling child grabs it immediately.
                if self.state == SwipeState::Settling && self.try_capture(ctx) {
                    self.capture(ctx, event);
                }
            }
            PointerKind::Move => {
                self.drag.add_movement(event);
                if !self.captured
                    && self.drag.is_tracking(event.pointer)
                    && self.drag.past_slop_x(event.position)
                    && self.try_capture(ctx)
                {
                    self.capture(ctx, event);
                }
            }
            PointerKind::Up | PointerKind::Cancel => self.drag.reset(),
        }
        self.captured
    }

    fn on_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        if self.captured && !self.drag.is_tracking(event.pointer) {
            tracing::warn!(pointer = event.pointer.get(), "swipe drag lost its pointer");
            self.drag.reset();
            self.release(ctx, 0.0);
            return false;
        }
        match event.kind {
            PointerKind::Down => {
                self.intercepting = ctx.is_point_in_child_bounds(ctx.child(), event.position);
                if !self.intercepting {
                    return false;
                }
                self.drag.begin(event);
                if self.try_capture(ctx) {
                    self.capture(ctx, event);
                }
            }
            PointerKind::Move => {
                self.drag.add_movement(event);
                if self.captured {
                    self.follow_pointer(ctx, event);
                } else if self.intercepting
                    && self.drag.is_tracking(event.pointer)
                    && self.drag.past_slop_x(event.position)
                    && self.try_capture(ctx)
                {
                    self.capture(ctx, event);
                }
            }
            PointerKind::Up => {
                self.drag.add_movement(event);
                if self.captured {
                    let velocity = self.drag.fling_velocity_x();
                    self.release(ctx, velocity);
                }
                self.drag.release();
            }
            PointerKind::Cancel => {
                if self.captured {
                    self.release(ctx, 0.0);
                }
                self.drag.reset();
            }
        }
        let handled = self.intercepting;
        if event.is_terminal() {
            self.intercepting = false;
        }
        handled
    }

    fn on_animation_frame(&mut self, ctx: &mut BehaviorCtx<'_>, dt_ms: f64) -> AnimationStatus {
        let Some(mut settle) = self.settle else {
            return AnimationStatus::Finished;
        };
        let left = settle.tween.advance(dt_ms);
        self.move_left_to(ctx, left);
        if !settle.tween.is_finished() {
            self.settle = Some(settle);
            return AnimationStatus::Running;
        }
        self.settle = None;
        self.set_state(SwipeState::Idle);
        if settle.dismiss {
            self.finish_dismiss();
        }
        AnimationStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};
    use kurbo::{Point, Size};
    use understory_coordinator::{
        ChildId, Coordinator, CoordinatorConfig, LayoutDirection, LayoutSpec, Length, PointerId,
    };

    const CONTAINER: Size = Size::new(400.0, 200.0);

    fn setup_in(config: SwipeDismissConfig, direction: LayoutDirection) -> (Coordinator, ChildId) {
        let mut c = Coordinator::new(CoordinatorConfig {
            layout_direction: direction,
            ..CoordinatorConfig::default()
        });
        let card = c
            .add_child(LayoutSpec {
                width: Length::Fixed(300.0),
                height: Length::Fixed(80.0),
                ..LayoutSpec::with_behavior(SwipeDismissBehavior::new(config))
            })
            .unwrap();
        c.layout_pass(CONTAINER).unwrap();
        (c, card)
    }

    fn setup(config: SwipeDismissConfig) -> (Coordinator, ChildId) {
        setup_in(config, LayoutDirection::Ltr)
    }

    fn towards(direction: SwipeDirection) -> SwipeDismissConfig {
        SwipeDismissConfig {
            direction,
            ..SwipeDismissConfig::default()
        }
    }

    fn left(c: &Coordinator, card: ChildId) -> f64 {
        c.rect(card).unwrap().x0
    }

    fn swipe(c: &Coordinator, card: ChildId) -> &SwipeDismissBehavior {
        c.behavior::<SwipeDismissBehavior>(card).unwrap()
    }

    fn settle(c: &mut Coordinator) {
        for _ in 0..200 {
            if !c.is_animating() {
                return;
            }
            c.frame(16.0);
        }
        panic!("swipe did not settle");
    }

    fn press(c: &mut Coordinator, x: f64) {
        let down = PointerEvent::down(Point::new(x, 40.0), 0);
        if !c.on_intercept_pointer(&down) {
            c.on_pointer(&down);
        }
    }

    /// Press at `from`, move to `to`, hold still, and let go.
    fn drag_and_hold(c: &mut Coordinator, from: f64, to: f64) {
        press(c, from);
        c.on_pointer(&PointerEvent::moved(Point::new(to, 40.0), 16));
        c.on_pointer(&PointerEvent::moved(Point::new(to, 40.0), 200));
        c.on_pointer(&PointerEvent::up(Point::new(to, 40.0), 300));
    }

    /// Press at `from` and move quickly to `to` before letting go.
    fn flick(c: &mut Coordinator, from: f64, to: f64) {
        press(c, from);
        let step = (to - from) / 2.0;
        c.on_pointer(&PointerEvent::moved(Point::new(from + step, 40.0), 10));
        c.on_pointer(&PointerEvent::moved(Point::new(to, 40.0), 20));
        c.on_pointer(&PointerEvent::up(Point::new(to, 40.0), 24));
    }

    #[test]
    fn swiping_past_the_threshold_dismisses() {
        let (mut c, card) = setup(SwipeDismissConfig::default());
        let dismissals = Rc::new(Cell::new(0));
        let states = Rc::new(RefCell::new(Vec::new()));
        let (count, log) = (dismissals.clone(), states.clone());
        c.with_behavior::<SwipeDismissBehavior, _>(card, |b, _| {
            b.set_dismiss_listener(move || count.set(count.get() + 1));
            b.set_state_listener(move |s| log.borrow_mut().push(s));
        });

        drag_and_hold(&mut c, 100.0, 260.0);
        assert_eq!(left(&c, card), 160.0);
        assert_eq!(swipe(&c, card).alpha(), 0.0);
        assert_eq!(swipe(&c, card).state(), SwipeState::Settling);
        assert_eq!(dismissals.get(), 0);

        settle(&mut c);
        assert_eq!(left(&c, card), 300.0);
        assert!(swipe(&c, card).is_dismissed());
        assert_eq!(dismissals.get(), 1);
        assert_eq!(
            *states.borrow(),
            [SwipeState::Dragging, SwipeState::Settling, SwipeState::Idle]
        );

        // Swiped the other way, it leaves on the other side.
        let (mut c, card) = setup(SwipeDismissConfig::default());
        drag_and_hold(&mut c, 250.0, 60.0);
        settle(&mut c);
        assert_eq!(left(&c, card), -300.0);
        assert!(swipe(&c, card).is_dismissed());
    }

    #[test]
    fn short_swipe_returns_and_fades_back() {
        let (mut c, card) = setup(SwipeDismissConfig::default());
        press(&mut c, 100.0);
        c.on_pointer(&PointerEvent::moved(Point::new(200.0, 40.0), 16));
        assert_eq!(left(&c, card), 100.0);
        // Fades over the first 150: a third left.
        assert!((swipe(&c, card).alpha() - 1.0 / 3.0).abs() < 1e-9);

        c.on_pointer(&PointerEvent::moved(Point::new(200.0, 40.0), 200));
        c.on_pointer(&PointerEvent::up(Point::new(200.0, 40.0), 300));
        settle(&mut c);
        assert_eq!(left(&c, card), 0.0);
        assert_eq!(swipe(&c, card).alpha(), 1.0);
        assert!(!swipe(&c, card).is_dismissed());
        assert_eq!(swipe(&c, card).state(), SwipeState::Idle);
    }

    #[test]
    fn direction_limits_the_drag() {
        let (mut c, card) = setup(towards(SwipeDirection::StartToEnd));
        press(&mut c, 200.0);
        c.on_pointer(&PointerEvent::moved(Point::new(120.0, 40.0), 16));
        assert_eq!(left(&c, card), 0.0);

        // Right to left, start to end runs leftwards.
        let (mut c, card) = setup_in(towards(SwipeDirection::StartToEnd), LayoutDirection::Rtl);
        let start = left(&c, card);
        press(&mut c, start + 200.0);
        c.on_pointer(&PointerEvent::moved(Point::new(start + 120.0, 40.0), 16));
        assert_eq!(left(&c, card), start - 80.0);
        c.on_pointer(&PointerEvent::moved(Point::new(start + 280.0, 40.0), 32));
        assert_eq!(left(&c, card), start);
    }

    #[test]
    fn fling_dismisses_only_in_an_allowed_direction() {
        let (mut c, card) = setup(SwipeDismissConfig::default());
        flick(&mut c, 100.0, 140.0);
        assert_eq!(left(&c, card), 40.0);
        settle(&mut c);
        assert_eq!(left(&c, card), 300.0);
        assert!(swipe(&c, card).is_dismissed());

        let (mut c, card) = setup(towards(SwipeDirection::EndToStart));
        flick(&mut c, 100.0, 140.0);
        assert_eq!(left(&c, card), 0.0);
        assert!(!c.is_animating());
        assert!(!swipe(&c, card).is_dismissed());
        assert_eq!(swipe(&c, card).state(), SwipeState::Idle);
    }

    #[test]
    fn losing_the_pointer_puts_the_child_back() {
        let (mut c, card) = setup(SwipeDismissConfig::default());
        press(&mut c, 100.0);
        c.on_pointer(&PointerEvent::moved(Point::new(150.0, 40.0), 16));
        assert_eq!(left(&c, card), 50.0);

        let other = PointerId::new(2).unwrap();
        let stray = PointerEvent::moved(Point::new(390.0, 40.0), 32).with_pointer(other);
        assert!(!c.on_pointer(&stray));
        assert_eq!(left(&c, card), 50.0);
        assert_eq!(swipe(&c, card).state(), SwipeState::Settling);

        c.on_pointer(&PointerEvent::up(Point::new(150.0, 40.0), 48));
        settle(&mut c);
        assert_eq!(left(&c, card), 0.0);
        assert!(!swipe(&c, card).is_dismissed());
    }

    #[test]
    fn presses_outside_the_child_are_not_claimed() {
        let (mut c, card) = setup(SwipeDismissConfig::default());
        let down = PointerEvent::down(Point::new(350.0, 40.0), 0);
        assert!(!c.on_intercept_pointer(&down));
        assert!(!c.on_pointer(&down));
        assert_eq!(c.touch_owner(), None);
        assert!(!c.on_intercept_pointer(&PointerEvent::moved(Point::new(200.0, 40.0), 16)));
        assert_eq!(left(&c, card), 0.0);
    }

    #[test]
    fn predicate_can_refuse_the_swipe() {
        let (mut c, card) = setup(SwipeDismissConfig::default());
        c.with_behavior::<SwipeDismissBehavior, _>(card, |b, _| b.set_swipe_predicate(|_| false));
        drag_and_hold(&mut c, 100.0, 260.0);
        assert_eq!(left(&c, card), 0.0);
        assert_eq!(swipe(&c, card).state(), SwipeState::Idle);
    }
}
