// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_coordinator --heading-base-level=0

//! Understory Coordinator: a headless container whose children cooperate through behaviors.
//!
//! Children of a [`Coordinator`] never talk to each other directly. Each may carry a
//! [`Behavior`] that declares what it depends on, measures and places its child, claims
//! pointer gestures, and takes part in nested scrolling. The container orders the
//! children by their dependencies and routes every event through that order.
//!
//! - Dependency ordering: each measure pass rebuilds a [`DependencyGraph`] from anchors,
//!   inset dodging, and [`Behavior::depends_on`], then sorts it topologically. A cycle is a
//!   configuration error.
//! - Layout: children are measured and placed in dependency order, by anchor, keyline, or
//!   gravity, unless their behavior does it itself.
//! - Pointer dispatch: behaviors see gestures topmost first; the first to claim a stream
//!   owns it, and everything beneath receives a single cancel.
//! - Nested scrolling: a scrolling descendant shares its deltas and flings with the
//!   behaviors that accepted its session.
//! - Change notification: once per frame (and right after nested scrolls), children that
//!   moved are reported to the children depending on them.
//!
//! ## Not a renderer
//!
//! The container owns geometry only. It draws nothing, reads no input devices, and runs no
//! timers: the host feeds it pointer events, nested scroll deltas, and frame ticks, and
//! reads back rects (and [`Behavior::scrim_opacity`]) to draw.
//!
//! ## API overview
//!
//! - [`Coordinator`]: the container. Add children with [`Coordinator::add_child`] and
//!   their inner structure with [`Coordinator::add_descendant`].
//! - [`LayoutSpec`]: per-child size, margins, gravity, anchor, keyline, inset and dodge
//!   edges, and the attached behavior.
//! - [`Behavior`]: the capability trait, with a [`BehaviorCtx`] for each callback.
//! - [`BehaviorRegistry`]: named behaviors and per-kind defaults.
//! - [`PointerEvent`]: one event of a gesture stream.
//! - [`NestedScrollSession`]: the nested scroll in progress.
//! - [`CoordinatorError`]: configuration errors.
//!
//! Key operations:
//! - [`Coordinator::layout_pass`] (or [`Coordinator::measure`] then [`Coordinator::layout`]).
//! - [`Coordinator::on_intercept_pointer`] and [`Coordinator::on_pointer`].
//! - [`Coordinator::start_nested_scroll`], [`Coordinator::nested_pre_scroll`],
//!   [`Coordinator::nested_scroll`], [`Coordinator::nested_pre_fling`],
//!   [`Coordinator::nested_fling`], [`Coordinator::stop_nested_scroll`].
//! - [`Coordinator::frame`]: advances behavior animations and runs the pre-draw notification.
//! - [`Coordinator::save_state`] and [`Coordinator::restore_state`].
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Rect, Size};
//! use understory_coordinator::{
//!     Behavior, BehaviorCtx, ChildId, Coordinator, Gravity, LayoutSpec, Length,
//! };
//!
//! /// Keeps its child directly below another child.
//! struct Below(ChildId);
//!
//! impl Behavior for Below {
//!     fn depends_on(&self, _: &BehaviorCtx<'_>, candidate: ChildId) -> bool {
//!         candidate == self.0
//!     }
//!
//!     fn on_layout(&mut self, ctx: &mut BehaviorCtx<'_>) -> bool {
//!         ctx.layout_child_default();
//!         let bottom = ctx.rect(self.0).map_or(0.0, |r| r.y1);
//!         ctx.offset_top_and_bottom(bottom - ctx.child_rect().y0);
//!         true
//!     }
//! }
//!
//! let mut coordinator = Coordinator::default();
//! let header = coordinator
//!     .add_child(LayoutSpec {
//!         width: Length::MatchParent,
//!         height: Length::Fixed(120.0),
//!         ..LayoutSpec::default()
//!     })
//!     .unwrap();
//! // Laid out after the header it depends on.
//! let list = coordinator
//!     .add_child(LayoutSpec {
//!         width: Length::MatchParent,
//!         height: Length::Fixed(300.0),
//!         gravity: Gravity::TOP,
//!         ..LayoutSpec::with_behavior(Below(header))
//!     })
//!     .unwrap();
//!
//! coordinator.layout_pass(Size::new(360.0, 640.0)).unwrap();
//! assert_eq!(coordinator.dependency_order(), &[header, list]);
//! assert_eq!(coordinator.rect(list), Some(Rect::new(0.0, 120.0, 360.0, 420.0)));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod behavior;
mod context;
mod coordinator;
mod error;
mod graph;
mod gravity;
mod layout;
mod nested;
mod notify;
mod pointer;
mod spec;
mod types;

pub use behavior::{
    AnimationStatus, Behavior, BehaviorFactory, BehaviorKey, BehaviorRegistry, ChildKind,
    SavedState,
};
pub use context::BehaviorCtx;
pub use coordinator::{Coordinator, CoordinatorConfig, SavedStates};
pub use error::CoordinatorError;
pub use graph::DependencyGraph;
pub use gravity::{Align, Gravity};
pub use nested::NestedScrollSession;
pub use pointer::{PRIMARY_POINTER, PointerEvent, PointerId, PointerKind};
pub use spec::{BehaviorSlot, LayoutSpec};
pub use types::{
    Axes, ChildId, Constraint, Constraints, Edges, LayoutDirection, Length, NodeFlags, SizeMode,
    Visibility,
};
