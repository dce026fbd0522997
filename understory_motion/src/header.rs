// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collapsing header: a stack of segments that scrolls away with a sibling's content.
//!
//! The header's vertical offset lives in `[-total_scroll_range, 0]`. It moves through three
//! routes:
//!
//! - nested scroll from a scrolling descendant of another child, which the header consumes
//!   before (or after) the descendant scrolls;
//! - dragging the header itself, released into a fling;
//! - settling animations: snapping to a segment edge, or [`HeaderBehavior::set_expanded`].
//!
//! Which part of the stack scrolls, and when it comes back, is decided per segment by its
//! [`ScrollFlags`].

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Vec2;
use understory_coordinator::{
    AnimationStatus, Axes, Behavior, BehaviorCtx, ChildId, Constraints, Length, NodeFlags,
    PointerEvent, PointerKind, SavedState,
};

use crate::drag::{DragConfig, DragTracker};
use crate::offset::ViewOffset;
use crate::scroller::{Fling, Interpolator, Tween, offset_animation_duration};

bitflags::bitflags! {
    /// How a [`HeaderSegment`] takes part in scrolling.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ScrollFlags: u8 {
        /// Scrolls with the content. Segments below the first one without it never scroll.
        const SCROLL                 = 0b0000_0001;
        /// Scrolls off only down to its minimum height.
        const EXIT_UNTIL_COLLAPSED   = 0b0000_0010;
        /// Comes back as soon as the content scrolls down.
        const ENTER_ALWAYS           = 0b0000_0100;
        /// With `ENTER_ALWAYS`, comes back only to its minimum height at first.
        const ENTER_ALWAYS_COLLAPSED = 0b0000_1000;
        /// Snaps to its nearest edge when scrolling ends part-way through it.
        const SNAP                   = 0b0001_0000;
    }
}

impl ScrollFlags {
    const QUICK_RETURN: Self = Self::SCROLL.union(Self::ENTER_ALWAYS);
    const SCROLL_SNAP: Self = Self::SCROLL.union(Self::SNAP);
}

/// One block of the header stack, top to bottom.
///
/// Heights include the block's margins.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HeaderSegment {
    /// Full height.
    pub height: f64,
    /// Height kept visible by [`ScrollFlags::EXIT_UNTIL_COLLAPSED`] and
    /// [`ScrollFlags::ENTER_ALWAYS_COLLAPSED`].
    pub min_height: f64,
    /// Scrolling participation.
    pub flags: ScrollFlags,
}

impl HeaderSegment {
    /// A segment of `height` with no minimum height.
    pub const fn new(height: f64, flags: ScrollFlags) -> Self {
        Self {
            height,
            min_height: 0.0,
            flags,
        }
    }

    /// The same segment with a minimum height.
    #[must_use]
    pub const fn with_min_height(mut self, min_height: f64) -> Self {
        self.min_height = min_height;
        self
    }
}

/// Motion state of a [`HeaderBehavior`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum HeaderState {
    /// At rest.
    #[default]
    Idle,
    /// Following a pointer.
    Dragging,
    /// Flinging or animating towards a target offset.
    Settling,
}

/// Saved header state: just the offset.
#[derive(Copy, Clone, Debug, PartialEq)]
struct HeaderSavedState {
    offset: f64,
}

type DragPredicate = Box<dyn Fn(&BehaviorCtx<'_>) -> bool>;
type OffsetListener = Box<dyn FnMut(f64)>;

/// Behavior of a collapsing header.
///
/// Attach to a direct child at the top of the container. A sibling carrying a
/// [`ScrollingContentBehavior`](crate::ScrollingContentBehavior) stays pinned beneath it.
///
/// ```rust
/// use understory_motion::{HeaderBehavior, HeaderSegment, ScrollFlags};
///
/// let header = HeaderBehavior::new([
///     HeaderSegment::new(200.0, ScrollFlags::SCROLL | ScrollFlags::EXIT_UNTIL_COLLAPSED)
///         .with_min_height(56.0),
///     HeaderSegment::new(48.0, ScrollFlags::empty()),
/// ]);
/// assert_eq!(header.total_scroll_range(), 144.0);
/// assert_eq!(header.down_nested_pre_scroll_range(), 0.0);
/// ```
pub struct HeaderBehavior {
    segments: Vec<HeaderSegment>,
    offset: ViewOffset,
    state: HeaderState,
    drag: DragTracker,
    fling: Option<Fling>,
    animation: Option<Tween>,
    skip_nested_pre_scroll: bool,
    was_nested_flung: bool,
    last_nested_target: Option<ChildId>,
    drag_predicate: Option<DragPredicate>,
    offset_listener: Option<OffsetListener>,
    pending_offset: Option<f64>,
    laid_out: bool,
}

impl fmt::Debug for HeaderBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderBehavior")
            .field("segments", &self.segments)
            .field("offset", &self.offset.top_and_bottom())
            .field("state", &self.state)
            .field("fling", &self.fling)
            .field("animation", &self.animation)
            .field("last_nested_target", &self.last_nested_target)
            .finish_non_exhaustive()
    }
}

impl Default for HeaderBehavior {
    fn default() -> Self {
        Self::new([])
    }
}

impl HeaderBehavior {
    /// A header made of `segments`, top to bottom.
    pub fn new(segments: impl IntoIterator<Item = HeaderSegment>) -> Self {
        Self::with_drag_config(segments, DragConfig::default())
    }

    /// A header with custom drag thresholds.
    pub fn with_drag_config(
        segments: impl IntoIterator<Item = HeaderSegment>,
        config: DragConfig,
    ) -> Self {
        Self {
            segments: segments.into_iter().collect(),
            offset: ViewOffset::default(),
            state: HeaderState::Idle,
            drag: DragTracker::new(config),
            fling: None,
            animation: None,
            skip_nested_pre_scroll: false,
            was_nested_flung: false,
            last_nested_target: None,
            drag_predicate: None,
            offset_listener: None,
            pending_offset: None,
            laid_out: false,
        }
    }

    /// Segments, top to bottom.
    pub fn segments(&self) -> &[HeaderSegment] {
        &self.segments
    }

    /// Replace the segments; ranges apply from the next scroll or layout.
    pub fn set_segments(&mut self, segments: impl IntoIterator<Item = HeaderSegment>) {
        self.segments = segments.into_iter().collect();
    }

    /// Current offset, in `[-total_scroll_range, 0]`.
    pub fn top_and_bottom_offset(&self) -> f64 {
        self.offset.top_and_bottom()
    }

    /// Current motion state.
    pub fn state(&self) -> HeaderState {
        self.state
    }

    /// Decide whether a press on the header may drag it, instead of the default rule.
    ///
    /// By default the header is draggable while the last nested-scrolling target, if any,
    /// is shown and scrolled to its top.
    pub fn set_drag_predicate(&mut self, predicate: impl Fn(&BehaviorCtx<'_>) -> bool + 'static) {
        self.drag_predicate = Some(Box::new(predicate));
    }

    /// Called with the offset whenever it changes, and after every layout.
    pub fn set_offset_listener(&mut self, listener: impl FnMut(f64) + 'static) {
        self.offset_listener = Some(Box::new(listener));
    }

    /// How far the header scrolls off in total.
    pub fn total_scroll_range(&self) -> f64 {
        let mut range = 0.0;
        for segment in &self.segments {
            if !segment.flags.contains(ScrollFlags::SCROLL) {
                break;
            }
            range += segment.height;
            if segment.flags.contains(ScrollFlags::EXIT_UNTIL_COLLAPSED) {
                range -= segment.min_height;
                break;
            }
        }
        f64::max(range, 0.0)
    }

    /// How far an upward nested scroll moves the header before the content scrolls.
    pub fn up_nested_pre_scroll_range(&self) -> f64 {
        self.total_scroll_range()
    }

    /// How far a downward nested scroll brings the header back before the content scrolls.
    ///
    /// Only the trailing run of enter-always segments comes back early.
    pub fn down_nested_pre_scroll_range(&self) -> f64 {
        let mut range = 0.0;
        for segment in self.segments.iter().rev() {
            let flags = segment.flags;
            if flags.contains(ScrollFlags::QUICK_RETURN) {
                range += if flags.contains(ScrollFlags::ENTER_ALWAYS_COLLAPSED) {
                    segment.min_height
                } else if flags.contains(ScrollFlags::EXIT_UNTIL_COLLAPSED) {
                    segment.height - segment.min_height
                } else {
                    segment.height
                };
            } else if range > 0.0 {
                break;
            }
        }
        f64::max(range, 0.0)
    }

    /// How far a downward scroll the content could not use brings the header back.
    pub fn down_nested_scroll_range(&self) -> f64 {
        self.total_scroll_range()
    }

    /// Height of the segment stack.
    pub fn stack_height(&self) -> f64 {
        self.segments.iter().map(|s| s.height).sum()
    }

    /// Expand or collapse the header, optionally animated.
    ///
    /// Before the first layout the target is applied by that layout.
    pub fn set_expanded(&mut self, ctx: &mut BehaviorCtx<'_>, expanded: bool, animate: bool) {
        let target = if expanded {
            0.0
        } else {
            -self.up_nested_pre_scroll_range()
        };
        if !self.laid_out {
            self.pending_offset = Some(target);
            return;
        }
        self.stop_motion();
        if animate {
            self.animate_offset_to(ctx, target, 0.0);
        } else {
            let total = self.total_scroll_range();
            self.set_header_offset(ctx, target, -total, 0.0);
        }
    }

    fn set_state(&mut self, state: HeaderState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "header state");
            self.state = state;
        }
    }

    /// Cancel any fling or animation. Returns whether one was running.
    fn stop_motion(&mut self) -> bool {
        let running = self.fling.take().is_some() | self.animation.take().is_some();
        if running {
            self.set_state(HeaderState::Idle);
        }
        running
    }

    fn dispatch_offset(&mut self) {
        let offset = self.offset.top_and_bottom();
        if let Some(listener) = &mut self.offset_listener {
            listener(offset);
        }
    }

    /// Move to `new_offset` clamped to `[min, max]`; returns the scroll distance consumed.
    ///
    /// Nothing moves when `min` is zero or the current offset lies outside the bounds.
    fn set_header_offset(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        new_offset: f64,
        min: f64,
        max: f64,
    ) -> f64 {
        let current = self.offset.top_and_bottom();
        if min == 0.0 || current < min || current > max {
            return 0.0;
        }
        let new_offset = new_offset.clamp(min, max);
        if !self.offset.set_top_and_bottom(ctx, new_offset) {
            return 0.0;
        }
        self.dispatch_offset();
        current - new_offset
    }

    fn scroll(&mut self, ctx: &mut BehaviorCtx<'_>, dy: f64, min: f64, max: f64) -> f64 {
        let target = self.offset.top_and_bottom() - dy;
        self.set_header_offset(ctx, target, min, max)
    }

    /// Fling from the current offset; returns whether it is still moving.
    fn fling(&mut self, ctx: &mut BehaviorCtx<'_>, min: f64, max: f64, velocity: f64) -> bool {
        self.animation = None;
        let fling = Fling::new(self.offset.top_and_bottom(), velocity, min, max);
        if fling.is_finished() {
            self.fling = None;
            self.set_state(HeaderState::Idle);
            self.snap_to_segment_if_needed(ctx);
            return false;
        }
        self.fling = Some(fling);
        self.set_state(HeaderState::Settling);
        ctx.request_animation_frame();
        true
    }

    fn animate_offset_to(&mut self, ctx: &mut BehaviorCtx<'_>, target: f64, velocity: f64) {
        let current = self.offset.top_and_bottom();
        if current == target {
            self.animation = None;
            return;
        }
        let height = ctx.child_rect().height();
        let duration = offset_animation_duration((current - target).abs(), velocity, height);
        self.fling = None;
        self.animation = Some(Tween::new(
            current,
            target,
            duration,
            Interpolator::Decelerate,
        ));
        self.set_state(HeaderState::Settling);
        ctx.request_animation_frame();
    }

    /// Index and top of the segment spanning `-offset`.
    fn segment_at_offset(&self, offset: f64) -> Option<(usize, f64)> {
        let mut top = 0.0;
        for (i, segment) in self.segments.iter().enumerate() {
            let bottom = top + segment.height;
            if top <= -offset && bottom >= -offset {
                return Some((i, top));
            }
            top = bottom;
        }
        None
    }

    fn snap_to_segment_if_needed(&mut self, ctx: &mut BehaviorCtx<'_>) {
        let offset = self.offset.top_and_bottom();
        let Some((index, top)) = self.segment_at_offset(offset) else {
            return;
        };
        let segment = self.segments[index];
        if !segment.flags.contains(ScrollFlags::SCROLL_SNAP) {
            return;
        }
        let mut snap_top = -top;
        let mut snap_bottom = -(top + segment.height);
        if segment.flags.contains(ScrollFlags::EXIT_UNTIL_COLLAPSED) {
            snap_bottom += segment.min_height;
        } else if segment.flags.contains(ScrollFlags::QUICK_RETURN) {
            let seam = snap_bottom + segment.min_height;
            if offset < seam {
                snap_top = seam;
            } else {
                snap_bottom = seam;
            }
        }
        let target = if offset < (snap_bottom + snap_top) / 2.0 {
            snap_bottom
        } else {
            snap_top
        };
        let target = target.clamp(-self.total_scroll_range(), 0.0);
        tracing::trace!(offset, target, "header snap");
        self.animate_offset_to(ctx, target, 0.0);
    }

    fn can_drag(&self, ctx: &BehaviorCtx<'_>) -> bool {
        if let Some(predicate) = &self.drag_predicate {
            return predicate(ctx);
        }
        match self.last_nested_target {
            Some(target) => {
                ctx.is_shown(target) && !ctx.flags(target).contains(NodeFlags::CAN_SCROLL_UP)
            }
            None => true,
        }
    }

    /// Abort a drag whose pointer went missing from the stream.
    fn lose_pointer(&mut self, event: &PointerEvent) {
        tracing::warn!(pointer = event.pointer.get(), "header drag lost its pointer");
        self.drag.reset();
        if self.state == HeaderState::Dragging {
            self.set_state(HeaderState::Idle);
        }
    }
}

impl Behavior for HeaderBehavior {
    fn on_measure(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        parent: Constraints,
        width_used: f64,
        height_used: f64,
    ) -> bool {
        ctx.measure_child_default(parent, width_used, height_used);
        let wraps = ctx
            .spec(ctx.child())
            .is_some_and(|spec| spec.height == Length::WrapContent);
        if wraps && let Some(mut size) = ctx.measured_size(ctx.child()) {
            size.height = size.height.max(self.stack_height());
            ctx.set_measured_size(size);
        }
        true
    }

    fn on_layout(&mut self, ctx: &mut BehaviorCtx<'_>) -> bool {
        ctx.layout_child_default();
        self.offset.on_layout(ctx);
        self.laid_out = true;
        if let Some(offset) = self.pending_offset.take() {
            self.offset.set_top_and_bottom(ctx, offset);
        }
        let clamped = self
            .offset
            .top_and_bottom()
            .clamp(-self.total_scroll_range(), 0.0);
        self.offset.set_top_and_bottom(ctx, clamped);
        self.dispatch_offset();
        true
    }

    fn on_intercept_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        match event.kind {
            PointerKind::Down => {
                self.drag.reset();
                if ctx.is_point_in_child_bounds(ctx.child(), event.position) && self.can_drag(ctx) {
                    self.drag.begin(event);
                    // Catching a moving header claims the stream right away.
                    return self.stop_motion();
                }
                false
            }
            PointerKind::Move => {
                if self.drag.pointer().is_none() {
                    return false;
                }
                if !self.drag.is_tracking(event.pointer) {
                    self.lose_pointer(event);
                    return false;
                }
                self.drag.add_movement(event);
                self.drag.claim_past_slop(event)
            }
            PointerKind::Up | PointerKind::Cancel => {
                self.drag.reset();
                false
            }
        }
    }

    fn on_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        match event.kind {
            PointerKind::Down => {
                if !ctx.is_point_in_child_bounds(ctx.child(), event.position) || !self.can_drag(ctx)
                {
                    return false;
                }
                self.stop_motion();
                self.drag.begin(event);
                true
            }
            PointerKind::Move => {
                if self.drag.pointer().is_none() {
                    return false;
                }
                if !self.drag.is_tracking(event.pointer) {
                    self.lose_pointer(event);
                    return false;
                }
                self.drag.add_movement(event);
                if let Some(dy) = self.drag.scroll_delta(event) {
                    self.set_state(HeaderState::Dragging);
                    let min = -self.down_nested_scroll_range();
                    self.scroll(ctx, dy, min, 0.0);
                }
                true
            }
            PointerKind::Up => {
                if !self.drag.is_tracking(event.pointer) {
                    return false;
                }
                self.drag.add_movement(event);
                let velocity = self.drag.velocity().y;
                self.drag.reset();
                let total = self.total_scroll_range();
                self.fling(ctx, -total, 0.0, velocity);
                true
            }
            PointerKind::Cancel => {
                let tracking = self.drag.pointer().is_some();
                self.drag.reset();
                if self.state == HeaderState::Dragging {
                    self.set_state(HeaderState::Idle);
                }
                tracking
            }
        }
    }

    fn on_start_nested_scroll(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        direct_child: ChildId,
        _target: ChildId,
        axes: Axes,
    ) -> bool {
        let header_height = ctx.child_rect().height();
        let scrolling_height = ctx.rect(direct_child).map_or(0.0, |r| r.height());
        let started = axes.contains(Axes::VERTICAL)
            && self.total_scroll_range() > 0.0
            && ctx.container_size().height - scrolling_height <= header_height;
        if started {
            self.stop_motion();
        }
        self.last_nested_target = None;
        started
    }

    fn on_nested_pre_scroll(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        _target: ChildId,
        delta: Vec2,
    ) -> Vec2 {
        let dy = delta.y;
        if dy == 0.0 || self.skip_nested_pre_scroll {
            return Vec2::ZERO;
        }
        let (min, max) = if dy < 0.0 {
            let min = -self.total_scroll_range();
            (min, min + self.down_nested_pre_scroll_range())
        } else {
            (-self.up_nested_pre_scroll_range(), 0.0)
        };
        if min == max {
            return Vec2::ZERO;
        }
        Vec2::new(0.0, self.scroll(ctx, dy, min, max))
    }

    fn on_nested_scroll(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        _target: ChildId,
        _consumed: Vec2,
        unconsumed: Vec2,
    ) {
        if unconsumed.y < 0.0 {
            let min = -self.down_nested_scroll_range();
            self.scroll(ctx, unconsumed.y, min, 0.0);
            self.skip_nested_pre_scroll = true;
        } else {
            self.skip_nested_pre_scroll = false;
        }
    }

    fn on_nested_fling(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        _target: ChildId,
        velocity: Vec2,
        consumed: bool,
    ) -> bool {
        let offset = self.offset.top_and_bottom();
        let flung = if !consumed {
            let total = self.total_scroll_range();
            self.fling(ctx, -total, 0.0, -velocity.y)
        } else if velocity.y < 0.0 {
            let target = -self.total_scroll_range() + self.down_nested_pre_scroll_range();
            let below = offset < target;
            if below {
                self.animate_offset_to(ctx, target, velocity.y);
            }
            below
        } else {
            let target = -self.up_nested_pre_scroll_range();
            let above = offset > target;
            if above {
                self.animate_offset_to(ctx, target, velocity.y);
            }
            above
        };
        self.was_nested_flung = flung;
        flung
    }

    fn on_stop_nested_scroll(&mut self, ctx: &mut BehaviorCtx<'_>, target: ChildId) {
        if !self.was_nested_flung {
            self.snap_to_segment_if_needed(ctx);
        }
        self.was_nested_flung = false;
        self.skip_nested_pre_scroll = false;
        self.last_nested_target = Some(target);
    }

    fn on_animation_frame(&mut self, ctx: &mut BehaviorCtx<'_>, dt_ms: f64) -> AnimationStatus {
        let total = self.total_scroll_range();
        if let Some(mut fling) = self.fling {
            let position = fling.advance(dt_ms);
            self.set_header_offset(ctx, position, -total, 0.0);
            if !fling.is_finished() {
                self.fling = Some(fling);
                return AnimationStatus::Running;
            }
            self.fling = None;
            self.set_state(HeaderState::Idle);
            self.snap_to_segment_if_needed(ctx);
            return AnimationStatus::from_running(self.animation.is_some());
        }
        if let Some(mut tween) = self.animation {
            let value = tween.advance(dt_ms);
            self.set_header_offset(ctx, value, -total, 0.0);
            if !tween.is_finished() {
                self.animation = Some(tween);
                return AnimationStatus::Running;
            }
            self.animation = None;
            self.set_state(HeaderState::Idle);
        }
        AnimationStatus::Finished
    }

    fn save_state(&self, _ctx: &BehaviorCtx<'_>) -> Option<SavedState> {
        Some(Box::new(HeaderSavedState {
            offset: self.offset.top_and_bottom(),
        }))
    }

    fn restore_state(&mut self, _ctx: &mut BehaviorCtx<'_>, state: SavedState) {
        if let Ok(saved) = state.downcast::<HeaderSavedState>() {
            self.pending_offset = Some(saved.offset);
        }
    }
}
