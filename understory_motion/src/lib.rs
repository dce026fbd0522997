// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_motion --heading-base-level=0

//! Understory Motion: drag, fling, and settle behaviors for `understory_coordinator`.
//!
//! Four behaviors cover the usual scroll-coupled and gesture-driven layouts:
//!
//! - [`HeaderBehavior`]: a collapsing header made of [`HeaderSegment`]s. It scrolls away
//!   with nested scrolling content, can be dragged and flung, and snaps to segment edges.
//! - [`ScrollingContentBehavior`]: keeps a scrolling sibling pinned beneath the header.
//! - [`SheetBehavior`]: a sheet resting expanded, collapsed to a peek height, or hidden,
//!   settled by drag velocity or by the nested scroll of its own scrolling content.
//! - [`SwipeDismissBehavior`]: a child swiped sideways and flung off to dismiss it.
//!
//! They are built on frame-driven primitives that behaviors advance from
//! [`Behavior::on_animation_frame`](understory_coordinator::Behavior::on_animation_frame):
//! [`Fling`], [`Tween`], [`VelocityTracker`], and [`DragTracker`].
//!
//! ## Registering
//!
//! [`register_defaults`] adds the behaviors to a [`BehaviorRegistry`] under [`HEADER`],
//! [`SHEET`], [`SCROLLING_CONTENT`], and [`SWIPE_DISMISS`], and makes the header the
//! default behavior of children of kind [`HEADER_KIND`].
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Size, Vec2};
//! use understory_coordinator::{Axes, Coordinator, LayoutSpec, Length, NodeFlags};
//! use understory_motion::{
//!     HeaderBehavior, HeaderSegment, ScrollFlags, ScrollingContentBehavior,
//! };
//!
//! let mut coordinator = Coordinator::default();
//! let header = coordinator
//!     .add_child(LayoutSpec {
//!         width: Length::MatchParent,
//!         ..LayoutSpec::with_behavior(HeaderBehavior::new([
//!             HeaderSegment::new(200.0, ScrollFlags::SCROLL),
//!             HeaderSegment::new(56.0, ScrollFlags::empty()),
//!         ]))
//!     })
//!     .unwrap();
//! let content = coordinator
//!     .add_child(LayoutSpec {
//!         width: Length::MatchParent,
//!         height: Length::MatchParent,
//!         ..LayoutSpec::with_behavior(ScrollingContentBehavior::default())
//!     })
//!     .unwrap();
//! let list = coordinator
//!     .add_descendant(content, kurbo::Rect::new(0.0, 0.0, 360.0, 584.0))
//!     .unwrap();
//! coordinator.set_flags(list, NodeFlags::NESTED_SCROLLING);
//! coordinator.layout_pass(Size::new(360.0, 640.0)).unwrap();
//!
//! // The list scrolls up by 80: the header takes it all and the content follows.
//! coordinator.start_nested_scroll(list, Axes::VERTICAL);
//! let consumed = coordinator.nested_pre_scroll(list, Vec2::new(0.0, 80.0));
//! assert_eq!(consumed, Vec2::new(0.0, 80.0));
//! assert_eq!(coordinator.rect(header).unwrap().y1, 176.0);
//! assert_eq!(coordinator.rect(content).unwrap().y0, 176.0);
//! coordinator.stop_nested_scroll(list);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

use alloc::boxed::Box;

use understory_coordinator::{BehaviorKey, BehaviorRegistry, ChildKind};

mod drag;
mod error;
mod header;
mod offset;
mod scroller;
mod scrolling;
mod sheet;
mod swipe;
mod velocity;

pub use drag::{DragConfig, DragTracker};
pub use error::MotionError;
pub use header::{HeaderBehavior, HeaderSegment, HeaderState, ScrollFlags};
pub use offset::ViewOffset;
pub use scroller::{Fling, Interpolator, Tween, offset_animation_duration, settle_duration};
pub use scrolling::ScrollingContentBehavior;
pub use sheet::{PeekHeight, SheetBehavior, SheetConfig, SheetState};
pub use swipe::{SwipeDirection, SwipeDismissBehavior, SwipeDismissConfig, SwipeState};
pub use velocity::VelocityTracker;

/// Registry key of [`HeaderBehavior`].
pub const HEADER: BehaviorKey = BehaviorKey("understory.header");
/// Registry key of [`SheetBehavior`].
pub const SHEET: BehaviorKey = BehaviorKey("understory.sheet");
/// Registry key of [`ScrollingContentBehavior`].
pub const SCROLLING_CONTENT: BehaviorKey = BehaviorKey("understory.scrolling_content");
/// Registry key of [`SwipeDismissBehavior`].
pub const SWIPE_DISMISS: BehaviorKey = BehaviorKey("understory.swipe_dismiss");

/// Child kind whose default behavior is [`HeaderBehavior`].
pub const HEADER_KIND: ChildKind = ChildKind("understory.header");

/// Register the behaviors of this crate with their default configuration.
pub fn register_defaults(registry: &mut BehaviorRegistry) {
    registry.register(HEADER, || Box::new(HeaderBehavior::default()));
    registry.register(SHEET, || Box::new(SheetBehavior::default()));
    registry.register(SCROLLING_CONTENT, || {
        Box::new(ScrollingContentBehavior::default())
    });
    registry.register(SWIPE_DISMISS, || Box::new(SwipeDismissBehavior::default()));
    registry.set_default_for_kind(HEADER_KIND, HEADER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use understory_coordinator::{Coordinator, CoordinatorConfig, LayoutSpec, Length};

    #[test]
    fn registered_behaviors_resolve_by_key_and_kind() {
        let mut registry = BehaviorRegistry::new();
        register_defaults(&mut registry);
        let mut coordinator = Coordinator::with_registry(CoordinatorConfig::default(), registry);

        let header = coordinator
            .add_child_of_kind(
                HEADER_KIND,
                LayoutSpec {
                    width: Length::MatchParent,
                    height: Length::Fixed(100.0),
                    ..LayoutSpec::default()
                },
            )
            .unwrap();
        let content = coordinator
            .add_child(LayoutSpec {
                width: Length::MatchParent,
                height: Length::MatchParent,
                behavior_key: Some(SCROLLING_CONTENT),
                ..LayoutSpec::default()
            })
            .unwrap();
        let sheet = coordinator
            .add_child(LayoutSpec {
                behavior_key: Some(SHEET),
                ..LayoutSpec::default()
            })
            .unwrap();
        let card = coordinator
            .add_child(LayoutSpec {
                behavior_key: Some(SWIPE_DISMISS),
                ..LayoutSpec::default()
            })
            .unwrap();

        assert!(coordinator.behavior::<HeaderBehavior>(header).is_some());
        assert!(coordinator.behavior::<ScrollingContentBehavior>(content).is_some());
        assert!(coordinator.behavior::<SheetBehavior>(sheet).is_some());
        assert!(coordinator.behavior::<SwipeDismissBehavior>(card).is_some());

        coordinator.layout_pass(Size::new(360.0, 640.0)).unwrap();
        assert_eq!(coordinator.dependencies(content), &[header]);
        assert_eq!(coordinator.rect(content).unwrap().y0, 100.0);
    }
}
