// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sheet: a child that rests expanded, collapsed to a peek height, or hidden below the
//! container, and is dragged between those positions.
//!
//! Every layout recomputes the two rest offsets from the container and sheet heights:
//!
//! - `min_offset = max(0, H - h)`: the sheet's top when expanded;
//! - `max_offset = max(H - peek, min_offset)`: its top when collapsed.
//!
//! A hidden sheet's top sits at the container height `H`. Releasing a drag, or ending a
//! nested scroll from the sheet's scrolling descendant, picks a rest state from the
//! direction of travel and settles there with a quintic tween.

use alloc::boxed::Box;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Vec2;
use understory_coordinator::{
    AnimationStatus, Axes, Behavior, BehaviorCtx, ChildId, NodeFlags, PointerEvent, PointerKind,
    SavedState,
};

use crate::drag::{DragConfig, DragTracker};
use crate::error::MotionError;
use crate::scroller::{Interpolator, Tween, settle_duration};

/// Share of the release velocity projected onto the position when deciding to hide.
const HIDE_FRICTION: f64 = 0.1;
/// Fraction of the peek height a release must travel past collapsed to hide.
const HIDE_THRESHOLD: f64 = 0.5;

/// State of a [`SheetBehavior`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SheetState {
    /// Following a pointer or a nested scroll.
    Dragging,
    /// Animating towards a rest state.
    Settling,
    /// Fully shown.
    Expanded,
    /// Showing only the peek height.
    #[default]
    Collapsed,
    /// Moved below the container.
    Hidden,
}

impl SheetState {
    /// Whether this is a state the sheet can rest in.
    pub const fn is_resting(self) -> bool {
        matches!(self, Self::Expanded | Self::Collapsed | Self::Hidden)
    }
}

/// Height of the sheet left visible when collapsed.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum PeekHeight {
    /// Derived from the container: `max(peek_height_min, H - W * 9 / 16)`.
    #[default]
    Auto,
    /// A fixed height in logical pixels.
    Fixed(f64),
}

/// Configuration of a [`SheetBehavior`].
///
/// Changes apply from the next layout.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SheetConfig {
    /// Collapsed height.
    pub peek_height: PeekHeight,
    /// Lower bound of [`PeekHeight::Auto`].
    pub peek_height_min: f64,
    /// Whether the sheet can be hidden by dragging it down.
    pub hideable: bool,
    /// Whether a hideable sheet skips collapsed when dragged down from expanded.
    pub skip_collapsed: bool,
    /// Drag thresholds.
    pub drag: DragConfig,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            peek_height: PeekHeight::Auto,
            peek_height_min: 64.0,
            hideable: false,
            skip_collapsed: false,
            drag: DragConfig::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Settle {
    tween: Tween,
    target: SheetState,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct SheetSavedState {
    state: SheetState,
}

type StateListener = Box<dyn FnMut(SheetState)>;
type SlideListener = Box<dyn FnMut(f64)>;

/// Behavior of a sheet resting at the bottom of the container.
///
/// ```rust
/// use kurbo::Size;
/// use understory_coordinator::{Coordinator, LayoutSpec, Length};
/// use understory_motion::{PeekHeight, SheetBehavior, SheetConfig, SheetState};
///
/// let mut coordinator = Coordinator::default();
/// let sheet = coordinator
///     .add_child(LayoutSpec {
///         width: Length::MatchParent,
///         height: Length::MatchParent,
///         ..LayoutSpec::with_behavior(SheetBehavior::new(SheetConfig {
///             peek_height: PeekHeight::Fixed(120.0),
///             ..SheetConfig::default()
///         }))
///     })
///     .unwrap();
/// coordinator.layout_pass(Size::new(400.0, 600.0)).unwrap();
/// assert_eq!(coordinator.rect(sheet).unwrap().y0, 480.0);
///
/// coordinator
///     .with_behavior::<SheetBehavior, _>(sheet, |b, ctx| b.set_state(ctx, SheetState::Expanded))
///     .unwrap()
///     .unwrap();
/// while coordinator.is_animating() {
///     coordinator.frame(16.0);
/// }
/// assert_eq!(coordinator.rect(sheet).unwrap().y0, 0.0);
/// ```
pub struct SheetBehavior {
    config: SheetConfig,
    state: SheetState,
    drag: DragTracker,
    captured: bool,
    ignore_events: bool,
    touching_scrolling_child: bool,
    settle: Option<Settle>,
    parent_height: f64,
    parent_width: f64,
    peek: f64,
    min_offset: f64,
    max_offset: f64,
    laid_out: bool,
    nested_child: Option<ChildId>,
    last_nested_dy: f64,
    nested_scrolled: bool,
    state_listener: Option<StateListener>,
    slide_listener: Option<SlideListener>,
}

impl fmt::Debug for SheetBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetBehavior")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("captured", &self.captured)
            .field("settle", &self.settle)
            .field("min_offset", &self.min_offset)
            .field("max_offset", &self.max_offset)
            .field("nested_child", &self.nested_child)
            .finish_non_exhaustive()
    }
}

impl Default for SheetBehavior {
    fn default() -> Self {
        Self::new(SheetConfig::default())
    }
}

impl SheetBehavior {
    /// A collapsed sheet.
    pub fn new(config: SheetConfig) -> Self {
        Self {
            config,
            state: SheetState::Collapsed,
            drag: DragTracker::new(config.drag),
            captured: false,
            ignore_events: false,
            touching_scrolling_child: false,
            settle: None,
            parent_height: 0.0,
            parent_width: 0.0,
            peek: 0.0,
            min_offset: 0.0,
            max_offset: 0.0,
            laid_out: false,
            nested_child: None,
            last_nested_dy: 0.0,
            nested_scrolled: false,
            state_listener: None,
            slide_listener: None,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Mutable configuration; offsets follow at the next layout.
    pub fn config_mut(&mut self) -> &mut SheetConfig {
        &mut self.config
    }

    /// Current state.
    pub fn state(&self) -> SheetState {
        self.state
    }

    /// Peek height resolved by the last layout.
    pub fn peek_height(&self) -> f64 {
        self.peek
    }

    /// Top of the sheet when expanded, as of the last layout.
    pub fn min_offset(&self) -> f64 {
        self.min_offset
    }

    /// Top of the sheet when collapsed, as of the last layout.
    pub fn max_offset(&self) -> f64 {
        self.max_offset
    }

    /// Called on every state change.
    pub fn set_state_listener(&mut self, listener: impl FnMut(SheetState) + 'static) {
        self.state_listener = Some(Box::new(listener));
    }

    /// Called with the slide offset whenever the sheet moves.
    ///
    /// The offset is `1` expanded, `0` collapsed, and `-1` hidden.
    pub fn set_slide_listener(&mut self, listener: impl FnMut(f64) + 'static) {
        self.slide_listener = Some(Box::new(listener));
    }

    /// Move to a rest state, animated.
    ///
    /// Before the first layout the state is recorded and applied by that layout.
    /// [`SheetState::Dragging`] and [`SheetState::Settling`] cannot be requested, nor
    /// [`SheetState::Hidden`] unless the sheet is hideable.
    pub fn set_state(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        state: SheetState,
    ) -> Result<(), MotionError> {
        if state == self.state {
            return Ok(());
        }
        let top = match state {
            SheetState::Collapsed => self.max_offset,
            SheetState::Expanded => self.min_offset,
            SheetState::Hidden if self.config.hideable => self.parent_height,
            SheetState::Hidden | SheetState::Dragging | SheetState::Settling => {
                return Err(MotionError::IllegalState(state));
            }
        };
        if !self.laid_out {
            self.state = state;
            return Ok(());
        }
        self.settle_to(ctx, top, state, 0.0);
        Ok(())
    }

    fn set_state_internal(&mut self, state: SheetState) {
        if self.state == state {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?state, "sheet state");
        self.state = state;
        if let Some(listener) = &mut self.state_listener {
            listener(state);
        }
    }

    fn slide_offset(&self, top: f64) -> f64 {
        let (distance, range) = if top > self.max_offset {
            (self.max_offset - top, self.parent_height - self.max_offset)
        } else {
            (self.max_offset - top, self.max_offset - self.min_offset)
        };
        if range == 0.0 { 0.0 } else { distance / range }
    }

    fn dispatch_slide(&mut self, top: f64) {
        let offset = self.slide_offset(top);
        if let Some(listener) = &mut self.slide_listener {
            listener(offset);
        }
    }

    fn move_top_to(&mut self, ctx: &mut BehaviorCtx<'_>, top: f64) {
        let current = ctx.child_rect().y0;
        if current != top {
            ctx.offset_top_and_bottom(top - current);
            self.dispatch_slide(top);
        }
    }

    fn drag_range(&self) -> f64 {
        if self.config.hideable {
            self.parent_height - self.min_offset
        } else {
            self.max_offset - self.min_offset
        }
    }

    fn should_hide(&self, top: f64, velocity: f64) -> bool {
        if self.config.skip_collapsed {
            return true;
        }
        if top < self.max_offset {
            return false;
        }
        let projected = top + velocity * HIDE_FRICTION;
        (projected - self.max_offset).abs() / self.peek > HIDE_THRESHOLD
    }

    /// Rest position for a sheet let go at `top`.
    ///
    /// `direction` is negative when travelling up, zero when still. `velocity` feeds the
    /// hide projection.
    fn release_target(&self, top: f64, direction: f64, velocity: f64) -> (f64, SheetState) {
        if direction < 0.0 {
            (self.min_offset, SheetState::Expanded)
        } else if self.config.hideable && self.should_hide(top, velocity) {
            (self.parent_height, SheetState::Hidden)
        } else if direction == 0.0 {
            if (top - self.min_offset).abs() < (top - self.max_offset).abs() {
                (self.min_offset, SheetState::Expanded)
            } else {
                (self.max_offset, SheetState::Collapsed)
            }
        } else {
            (self.max_offset, SheetState::Collapsed)
        }
    }

    fn settle_to(&mut self, ctx: &mut BehaviorCtx<'_>, top: f64, target: SheetState, velocity: f64) {
        let current = ctx.child_rect().y0;
        let delta = top - current;
        if delta == 0.0 {
            self.settle = None;
            self.set_state_internal(target);
            return;
        }
        let duration = settle_duration(
            delta,
            velocity,
            self.drag_range(),
            self.parent_width,
            &self.config.drag,
        );
        tracing::trace!(from = current, to = top, duration, "sheet settle");
        self.settle = Some(Settle {
            tween: Tween::new(current, top, duration, Interpolator::Quintic),
            target,
        });
        self.set_state_internal(SheetState::Settling);
        ctx.request_animation_frame();
    }

    fn release(&mut self, ctx: &mut BehaviorCtx<'_>, velocity: f64) {
        self.captured = false;
        let top = ctx.child_rect().y0;
        let (target_top, target) = self.release_target(top, velocity, velocity);
        self.settle_to(ctx, target_top, target, velocity);
    }

    fn try_capture(&self) -> bool {
        self.state != SheetState::Dragging && !self.touching_scrolling_child
    }

    fn capture(&mut self, event: &PointerEvent) {
        self.captured = true;
        self.settle = None;
        self.drag.start_dragging();
        self.drag.follow(event);
        self.set_state_internal(SheetState::Dragging);
    }

    fn follow_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) {
        let Some(dy) = self.drag.follow(event) else {
            return;
        };
        let max = if self.config.hideable {
            self.parent_height
        } else {
            self.max_offset
        };
        let top = (ctx.child_rect().y0 + dy).clamp(self.min_offset, max.max(self.min_offset));
        self.move_top_to(ctx, top);
    }

    fn over_scrolling_child(&self, ctx: &BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        self.nested_child
            .is_some_and(|s| ctx.is_point_in_child_bounds(s, event.position))
    }
}

impl Behavior for SheetBehavior {
    fn on_layout(&mut self, ctx: &mut BehaviorCtx<'_>) -> bool {
        let saved_top = ctx.child_rect().y0;
        ctx.layout_child_default();
        let container = ctx.container_size();
        self.parent_height = container.height;
        self.parent_width = container.width;
        self.peek = match self.config.peek_height {
            PeekHeight::Auto => self
                .config
                .peek_height_min
                .max(container.height - container.width * 9.0 / 16.0),
            PeekHeight::Fixed(peek) => peek,
        };
        let height = ctx.child_rect().height();
        self.min_offset = f64::max(0.0, container.height - height);
        self.max_offset = f64::max(container.height - self.peek, self.min_offset);
        let top = match self.state {
            SheetState::Expanded => self.min_offset,
            SheetState::Collapsed => self.max_offset,
            SheetState::Hidden => self.parent_height,
            SheetState::Dragging | SheetState::Settling => saved_top,
        };
        ctx.offset_top_and_bottom(top - ctx.child_rect().y0);
        self.nested_child = ctx.find_nested_scrolling_descendant(ctx.child());
        self.laid_out = true;
        true
    }

    fn on_intercept_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        if !ctx.is_shown(ctx.child()) {
            self.ignore_events = true;
            return false;
        }
        match event.kind {
            PointerKind::Down => {
                self.captured = false;
                self.drag.begin(event);
                self.touching_scrolling_child = self.over_scrolling_child(ctx, event);
                self.ignore_events = !self.touching_scrolling_child
                    && !ctx.is_point_in_child_bounds(ctx.child(), event.position);
            }
            PointerKind::Move => self.drag.add_movement(event),
            PointerKind::Up | PointerKind::Cancel => {
                self.drag.add_movement(event);
                self.drag.release();
                self.captured = false;
                self.touching_scrolling_child = false;
                if self.ignore_events {
                    self.ignore_events = false;
                    return false;
                }
            }
        }
        if self.ignore_events {
            return false;
        }

        let in_sheet = ctx.is_point_in_child_bounds(ctx.child(), event.position);
        match event.kind {
            // Catching a settling sheet grabs it immediately.
            PointerKind::Down if self.state == SheetState::Settling && in_sheet => {
                if self.try_capture() {
                    self.capture(event);
                }
            }
            PointerKind::Move if !self.captured => {
                if in_sheet && self.drag.past_slop(event.position) && self.try_capture() {
                    self.capture(event);
                }
            }
            _ => {}
        }
        if self.captured {
            return true;
        }

        event.kind == PointerKind::Move
            && self.nested_child.is_some()
            && self.state != SheetState::Dragging
            && !self.over_scrolling_child(ctx, event)
            && self.drag.past_slop(event.position)
    }

    fn on_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        if !ctx.is_shown(ctx.child()) {
            return false;
        }
        if self.state == SheetState::Dragging && event.kind == PointerKind::Down {
            return true;
        }
        if self.captured && !self.drag.is_tracking(event.pointer) {
            tracing::warn!(pointer = event.pointer.get(), "sheet drag lost its pointer");
            self.drag.reset();
            self.release(ctx, 0.0);
            return false;
        }
        match event.kind {
            PointerKind::Down => {
                self.captured = false;
                self.drag.begin(event);
                if ctx.is_point_in_child_bounds(ctx.child(), event.position) && self.try_capture() {
                    self.capture(event);
                }
            }
            PointerKind::Move => {
                self.drag.add_movement(event);
                if self.captured {
                    self.follow_pointer(ctx, event);
                } else if !self.ignore_events
                    && self.drag.is_tracking(event.pointer)
                    && self.drag.past_slop(event.position)
                {
                    self.capture(event);
                }
            }
            PointerKind::Up => {
                self.drag.add_movement(event);
                if self.captured {
                    let velocity = self.drag.fling_velocity_y();
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
        !self.ignore_events
    }

    fn on_start_nested_scroll(
        &mut self,
        _ctx: &mut BehaviorCtx<'_>,
        _direct_child: ChildId,
        _target: ChildId,
        axes: Axes,
    ) -> bool {
        self.last_nested_dy = 0.0;
        self.nested_scrolled = false;
        axes.contains(Axes::VERTICAL)
    }

    fn on_nested_pre_scroll(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        target: ChildId,
        delta: Vec2,
    ) -> Vec2 {
        if self.nested_child != Some(target) {
            return Vec2::ZERO;
        }
        let dy = delta.y;
        let top = ctx.child_rect().y0;
        let new_top = top - dy;
        let mut consumed = 0.0;
        if dy > 0.0 {
            if new_top < self.min_offset {
                consumed = top - self.min_offset;
                ctx.offset_top_and_bottom(-consumed);
                self.set_state_internal(SheetState::Expanded);
            } else {
                consumed = dy;
                ctx.offset_top_and_bottom(-dy);
                self.set_state_internal(SheetState::Dragging);
            }
        } else if dy < 0.0 && !ctx.flags(target).contains(NodeFlags::CAN_SCROLL_UP) {
            if new_top <= self.max_offset || self.config.hideable {
                // A hideable sheet goes no lower than hidden.
                let new_top = new_top.min(self.parent_height.max(self.max_offset));
                consumed = top - new_top;
                ctx.offset_top_and_bottom(new_top - top);
                self.set_state_internal(SheetState::Dragging);
            } else {
                consumed = top - self.max_offset;
                ctx.offset_top_and_bottom(-consumed);
                self.set_state_internal(SheetState::Collapsed);
            }
        }
        let top = ctx.child_rect().y0;
        self.dispatch_slide(top);
        self.last_nested_dy = dy;
        self.nested_scrolled = true;
        Vec2::new(0.0, consumed)
    }

    fn on_stop_nested_scroll(&mut self, ctx: &mut BehaviorCtx<'_>, target: ChildId) {
        let top = ctx.child_rect().y0;
        if top == self.min_offset {
            self.set_state_internal(SheetState::Expanded);
            return;
        }
        if self.nested_child != Some(target) || !self.nested_scrolled {
            return;
        }
        let velocity = self.drag.velocity().y;
        let (target_top, target_state) = self.release_target(top, -self.last_nested_dy, velocity);
        self.settle_to(ctx, target_top, target_state, 0.0);
        self.nested_scrolled = false;
    }

    fn on_nested_pre_fling(
        &mut self,
        _ctx: &mut BehaviorCtx<'_>,
        target: ChildId,
        _velocity: Vec2,
    ) -> bool {
        self.nested_child == Some(target) && self.state != SheetState::Expanded
    }

    fn on_animation_frame(&mut self, ctx: &mut BehaviorCtx<'_>, dt_ms: f64) -> AnimationStatus {
        let Some(mut settle) = self.settle else {
            return AnimationStatus::Finished;
        };
        let top = settle.tween.advance(dt_ms);
        self.move_top_to(ctx, top);
        if settle.tween.is_finished() {
            self.settle = None;
            self.set_state_internal(settle.target);
            AnimationStatus::Finished
        } else {
            self.settle = Some(settle);
            AnimationStatus::Running
        }
    }

    fn save_state(&self, _ctx: &BehaviorCtx<'_>) -> Option<SavedState> {
        Some(Box::new(SheetSavedState { state: self.state }))
    }

    fn restore_state(&mut self, _ctx: &mut BehaviorCtx<'_>, state: SavedState) {
        let Ok(saved) = state.downcast::<SheetSavedState>() else {
            return;
        };
        self.state = match saved.state {
            SheetState::Hidden if self.config.hideable => SheetState::Hidden,
            SheetState::Expanded => SheetState::Expanded,
            _ => SheetState::Collapsed,
        };
    }
}
