// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The behavior capability contract and the registry that resolves named behaviors.
//!
//! A [`Behavior`] is attached to at most one direct child through its
//! [`LayoutSpec`](crate::LayoutSpec). Every method has a no-op default, so an
//! implementation overrides only the capabilities it needs.
//!
//! Callbacks receive a [`BehaviorCtx`] scoped to the child the behavior is attached to.
//! The context reads the whole container but writes only that child. A panic inside a
//! callback is not caught; the container's state is undefined afterwards.

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Rect, Vec2};

use crate::context::BehaviorCtx;
use crate::pointer::PointerEvent;
use crate::types::{Axes, ChildId, Constraints};

/// Opaque per-child state produced by [`Behavior::save_state`].
///
/// The container neither inspects nor serializes it.
pub type SavedState = Box<dyn Any>;

/// Whether a frame-driven animation wants another frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AnimationStatus {
    /// Call again on the next frame.
    Running,
    /// Done; no further frames needed.
    Finished,
}

impl AnimationStatus {
    /// `Running` if `running` is true.
    pub const fn from_running(running: bool) -> Self {
        if running { Self::Running } else { Self::Finished }
    }
}

/// Interaction, layout, and scroll-coordination strategy for a direct child.
#[allow(unused_variables, reason = "default implementations ignore their arguments")]
pub trait Behavior: Any {
    /// Called when the behavior is attached to a layout spec.
    fn on_attached(&mut self) {}

    /// Called when the behavior is detached from its layout spec.
    fn on_detached(&mut self) {}

    /// Whether the child depends on `candidate` (another direct child).
    ///
    /// Dependencies are laid out first and reported through
    /// [`on_dependent_changed`](Self::on_dependent_changed).
    fn depends_on(&self, ctx: &BehaviorCtx<'_>, candidate: ChildId) -> bool {
        false
    }

    /// A dependency changed size or position. Returns whether the child moved.
    fn on_dependent_changed(&mut self, ctx: &mut BehaviorCtx<'_>, dependency: ChildId) -> bool {
        false
    }

    /// A dependency is being removed from the container.
    fn on_dependent_removed(&mut self, ctx: &mut BehaviorCtx<'_>, dependency: ChildId) {}

    /// Measure the child. Return `true` after calling
    /// [`BehaviorCtx::set_measured_size`] or [`BehaviorCtx::measure_child_default`].
    fn on_measure(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        parent: Constraints,
        width_used: f64,
        height_used: f64,
    ) -> bool {
        false
    }

    /// Position the child. Return `true` if it was placed.
    fn on_layout(&mut self, ctx: &mut BehaviorCtx<'_>) -> bool {
        false
    }

    /// Inspect a pointer event before any child sees it. Return `true` to own the stream.
    fn on_intercept_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        false
    }

    /// Handle a pointer event. Return `true` if consumed.
    fn on_pointer(&mut self, ctx: &mut BehaviorCtx<'_>, event: &PointerEvent) -> bool {
        false
    }

    /// A descendant starts scrolling along `axes`. Return `true` to take part in the session.
    fn on_start_nested_scroll(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        direct_child: ChildId,
        target: ChildId,
        axes: Axes,
    ) -> bool {
        false
    }

    /// The session this behavior accepted has begun.
    fn on_nested_scroll_accepted(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        direct_child: ChildId,
        target: ChildId,
        axes: Axes,
    ) {
    }

    /// The target is about to scroll by `delta`. Return how much of it this behavior consumed.
    fn on_nested_pre_scroll(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        target: ChildId,
        delta: Vec2,
    ) -> Vec2 {
        Vec2::ZERO
    }

    /// The target scrolled by `consumed` and left `unconsumed` over.
    fn on_nested_scroll(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        target: ChildId,
        consumed: Vec2,
        unconsumed: Vec2,
    ) {
    }

    /// The target is about to fling. Return `true` to consume the fling before it does.
    fn on_nested_pre_fling(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        target: ChildId,
        velocity: Vec2,
    ) -> bool {
        false
    }

    /// The target flung; `consumed` tells whether it used the fling itself.
    fn on_nested_fling(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        target: ChildId,
        velocity: Vec2,
        consumed: bool,
    ) -> bool {
        false
    }

    /// The nested scroll session ended.
    fn on_stop_nested_scroll(&mut self, ctx: &mut BehaviorCtx<'_>, target: ChildId) {}

    /// Advance a running animation by `dt_ms`.
    ///
    /// Called only after [`BehaviorCtx::request_animation_frame`].
    fn on_animation_frame(&mut self, ctx: &mut BehaviorCtx<'_>, dt_ms: f64) -> AnimationStatus {
        AnimationStatus::Finished
    }

    /// Capture state worth restoring later.
    fn save_state(&self, ctx: &BehaviorCtx<'_>) -> Option<SavedState> {
        None
    }

    /// Restore state produced by [`save_state`](Self::save_state).
    fn restore_state(&mut self, ctx: &mut BehaviorCtx<'_>, state: SavedState) {}

    /// Opacity of the scrim drawn beneath the child, in `[0, 1]`.
    fn scrim_opacity(&self, ctx: &BehaviorCtx<'_>) -> f64 {
        0.0
    }

    /// Whether the child blocks interaction with children beneath it.
    fn blocks_interaction_below(&self, ctx: &BehaviorCtx<'_>) -> bool {
        self.scrim_opacity(ctx) > 0.0
    }

    /// Part of the child, in container coordinates, that must dodge inset edges.
    ///
    /// Must lie within the child's bounds. `None` dodges with the whole child.
    fn inset_dodge_rect(&self, ctx: &BehaviorCtx<'_>) -> Option<Rect> {
        None
    }
}

impl fmt::Debug for dyn Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior").finish_non_exhaustive()
    }
}

/// Stable name of a registered behavior.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BehaviorKey(pub &'static str);

/// Declared kind of a child, used to look up its default behavior.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChildKind(pub &'static str);

/// Constructor of a registered behavior.
pub type BehaviorFactory = fn() -> Box<dyn Behavior>;

/// Maps stable keys to behavior factories, and child kinds to default keys.
///
/// Named behaviors ([`LayoutSpec::behavior_key`](crate::LayoutSpec::behavior_key)) and
/// per-kind defaults are resolved once, when a child is attached.
///
/// ```rust
/// use understory_coordinator::{Behavior, BehaviorKey, BehaviorRegistry, ChildKind};
///
/// struct Inert;
/// impl Behavior for Inert {}
///
/// let mut registry = BehaviorRegistry::new();
/// registry.register(BehaviorKey("inert"), || Box::new(Inert));
/// registry.set_default_for_kind(ChildKind("panel"), BehaviorKey("inert"));
/// assert!(registry.create(BehaviorKey("inert")).is_some());
/// assert_eq!(registry.default_for_kind(ChildKind("panel")), Some(BehaviorKey("inert")));
/// ```
#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    factories: HashMap<BehaviorKey, BehaviorFactory>,
    defaults: HashMap<ChildKind, BehaviorKey>,
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("factories", &self.factories.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl BehaviorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `key`.
    pub fn register(&mut self, key: BehaviorKey, factory: BehaviorFactory) {
        self.factories.insert(key, factory);
    }

    /// Use the behavior registered as `key` for children declared as `kind`.
    pub fn set_default_for_kind(&mut self, kind: ChildKind, key: BehaviorKey) {
        self.defaults.insert(kind, key);
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: BehaviorKey) -> bool {
        self.factories.contains_key(&key)
    }

    /// Instantiate the behavior registered as `key`.
    pub fn create(&self, key: BehaviorKey) -> Option<Box<dyn Behavior>> {
        self.factories.get(&key).map(|factory| factory())
    }

    /// Default behavior key for `kind`.
    pub fn default_for_kind(&self, kind: ChildKind) -> Option<BehaviorKey> {
        self.defaults.get(&kind).copied()
    }
}
