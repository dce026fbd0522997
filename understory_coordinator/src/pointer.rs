// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer dispatch chain: lets behaviors claim a gesture before the children see it.
//!
//! The host feeds every pointer event through [`Coordinator::on_intercept_pointer`] until it
//! returns `true`, and from then on through [`Coordinator::on_pointer`]. A `false` return
//! means the event continues to the ordinary view hierarchy.
//!
//! Behaviors are consulted topmost first. The first one to claim the stream becomes its
//! owner; every behavior beneath it receives one synthetic [`PointerKind::Cancel`]. A child
//! whose behavior blocks interaction below it (for example because it draws a scrim) cuts
//! the walk short in the same way.
//!
//! ```rust
//! use kurbo::Point;
//! use understory_coordinator::{
//!     Behavior, BehaviorCtx, Coordinator, LayoutSpec, PointerEvent, PointerKind,
//! };
//!
//! struct ClaimsMoves;
//! impl Behavior for ClaimsMoves {
//!     fn on_intercept_pointer(&mut self, _: &mut BehaviorCtx<'_>, ev: &PointerEvent) -> bool {
//!         ev.kind == PointerKind::Move
//!     }
//! }
//!
//! let mut coordinator = Coordinator::default();
//! let id = coordinator.add_child(LayoutSpec::with_behavior(ClaimsMoves)).unwrap();
//! assert!(!coordinator.on_intercept_pointer(&PointerEvent::down(Point::ZERO, 0)));
//! assert!(coordinator.on_intercept_pointer(&PointerEvent::moved(Point::new(0.0, 20.0), 16)));
//! assert_eq!(coordinator.touch_owner(), Some(id));
//! ```

use alloc::vec::Vec;
use core::cmp::Reverse;
use core::num::NonZeroU64;

use kurbo::Point;

use crate::coordinator::Coordinator;
use crate::types::ChildId;

/// Identifier of a pointer within a gesture stream.
pub type PointerId = NonZeroU64;

/// The pointer used by single-pointer input.
pub const PRIMARY_POINTER: PointerId = NonZeroU64::MIN;

/// Phase of a pointer event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PointerKind {
    /// A pointer went down; starts a new stream.
    Down,
    /// A pointer moved.
    Move,
    /// The pointer went up; ends the stream.
    Up,
    /// The stream was aborted.
    Cancel,
}

/// One event of a pointer gesture stream.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    /// Phase.
    pub kind: PointerKind,
    /// Which pointer.
    pub pointer: PointerId,
    /// Position in container coordinates.
    pub position: Point,
    /// Timestamp in milliseconds.
    pub time_ms: u64,
}

impl PointerEvent {
    /// An event of `kind` for the primary pointer.
    pub const fn new(kind: PointerKind, position: Point, time_ms: u64) -> Self {
        Self {
            kind,
            pointer: PRIMARY_POINTER,
            position,
            time_ms,
        }
    }

    /// Primary pointer down.
    pub const fn down(position: Point, time_ms: u64) -> Self {
        Self::new(PointerKind::Down, position, time_ms)
    }

    /// Primary pointer move.
    pub const fn moved(position: Point, time_ms: u64) -> Self {
        Self::new(PointerKind::Move, position, time_ms)
    }

    /// Primary pointer up.
    pub const fn up(position: Point, time_ms: u64) -> Self {
        Self::new(PointerKind::Up, position, time_ms)
    }

    /// Primary pointer cancel.
    pub const fn cancel(position: Point, time_ms: u64) -> Self {
        Self::new(PointerKind::Cancel, position, time_ms)
    }

    /// The same event for another pointer.
    #[must_use]
    pub const fn with_pointer(mut self, pointer: PointerId) -> Self {
        self.pointer = pointer;
        self
    }

    /// A synthetic cancel at the time and place of this event.
    pub const fn to_cancel(&self) -> Self {
        Self {
            kind: PointerKind::Cancel,
            ..*self
        }
    }

    /// Whether this event ends the stream.
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, PointerKind::Up | PointerKind::Cancel)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dispatch {
    Intercept,
    Pointer,
}

impl Coordinator {
    /// Offer an event to behaviors before the children see it.
    ///
    /// Returns `true` once a behavior owns the stream.
    pub fn on_intercept_pointer(&mut self, event: &PointerEvent) -> bool {
        if event.kind == PointerKind::Down {
            self.reset_touch_behaviors(event);
        }
        let intercepted = self.perform_intercept(event, Dispatch::Intercept);
        if event.is_terminal() {
            self.reset_touch_behaviors(event);
        }
        intercepted
    }

    /// Deliver an event the children did not consume.
    ///
    /// With an owner, only the owner sees it. Otherwise the topmost behavior that handles it
    /// becomes the owner.
    pub fn on_pointer(&mut self, event: &PointerEvent) -> bool {
        let handled = match self.touch_owner {
            Some(owner) => self
                .call_behavior(owner, |b, ctx| b.on_pointer(ctx, event))
                .unwrap_or(false),
            None => self.perform_intercept(event, Dispatch::Pointer),
        };
        if event.is_terminal() {
            self.reset_touch_behaviors(event);
        }
        handled
    }

    /// A descendant asks its ancestors not to intercept the current stream.
    ///
    /// The first request after a reset cancels the current owner.
    pub fn request_disallow_intercept(&mut self, disallow: bool) {
        if disallow && !self.disallow_intercept_reset {
            let now = self.last_event_time();
            self.reset_touch_behaviors(&PointerEvent::cancel(Point::ZERO, now));
            self.disallow_intercept_reset = true;
        }
    }

    /// The child whose behavior owns the current pointer stream.
    pub fn touch_owner(&self) -> Option<ChildId> {
        self.touch_owner
    }

    /// Direct children, topmost first: reverse insertion order, then by descending
    /// elevation.
    pub fn top_sorted_children(&self) -> Vec<ChildId> {
        let mut out: Vec<ChildId> = self.children.iter().rev().copied().collect();
        out.sort_by_key(|&id| Reverse(self.z_index(id).unwrap_or(0)));
        out
    }

    /// The container left the window: end any gesture and nested scroll.
    pub fn detach(&mut self) {
        let now = self.last_event_time();
        self.reset_touch_behaviors(&PointerEvent::cancel(Point::ZERO, now));
        if let Some(session) = self.nested {
            self.stop_nested_scroll(session.target);
        }
    }

    fn last_event_time(&self) -> u64 {
        self.last_pointer_time
    }

    fn perform_intercept(&mut self, event: &PointerEvent, dispatch: Dispatch) -> bool {
        self.last_pointer_time = event.time_ms;
        let mut intercepted = false;
        let mut new_block = false;
        let cancel = event.to_cancel();

        for id in self.top_sorted_children() {
            if (intercepted || new_block) && event.kind != PointerKind::Down {
                self.call_behavior(id, |b, ctx| match dispatch {
                    Dispatch::Intercept => b.on_intercept_pointer(ctx, &cancel),
                    Dispatch::Pointer => b.on_pointer(ctx, &cancel),
                });
                continue;
            }

            if !intercepted {
                intercepted = self
                    .call_behavior(id, |b, ctx| match dispatch {
                        Dispatch::Intercept => b.on_intercept_pointer(ctx, event),
                        Dispatch::Pointer => b.on_pointer(ctx, event),
                    })
                    .unwrap_or(false);
                if intercepted {
                    tracing::debug!(child = ?id, kind = ?event.kind, "pointer stream claimed");
                    self.touch_owner = Some(id);
                }
            }

            let was_blocking = self.slot(id).is_some_and(|s| s.did_block);
            let is_blocking = self.is_blocking_interaction_below(id);
            new_block = is_blocking && !was_blocking;
            if is_blocking && !new_block {
                break;
            }
        }
        intercepted
    }

    /// Sticky until the next touch reset.
    fn is_blocking_interaction_below(&mut self, id: ChildId) -> bool {
        if self.slot(id).is_some_and(|s| s.did_block) {
            return true;
        }
        let blocks = self
            .call_behavior(id, |b, ctx| b.blocks_interaction_below(ctx))
            .unwrap_or(false);
        match self.slot_mut(id) {
            Some(slot) => {
                slot.did_block = blocks;
                blocks
            }
            None => false,
        }
    }

    fn reset_touch_behaviors(&mut self, event: &PointerEvent) {
        if let Some(owner) = self.touch_owner.take() {
            let cancel = event.to_cancel();
            self.call_behavior(owner, |b, ctx| b.on_pointer(ctx, &cancel));
            tracing::trace!(child = ?owner, "pointer owner reset");
        }
        for id in self.children.clone() {
            if let Some(slot) = self.slot_mut(id) {
                slot.did_block = false;
            }
        }
        self.disallow_intercept_reset = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::context::BehaviorCtx;
    use crate::spec::LayoutSpec;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<(&'static str, Dispatch, PointerKind)>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        claim: Option<PointerKind>,
        scrim: f64,
    }

    impl Recorder {
        fn spec(name: &'static str, log: &Log, claim: Option<PointerKind>) -> LayoutSpec {
            LayoutSpec::with_behavior(Self {
                name,
                log: log.clone(),
                claim,
                scrim: 0.0,
            })
        }
    }

    impl Behavior for Recorder {
        fn on_intercept_pointer(&mut self, _: &mut BehaviorCtx<'_>, ev: &PointerEvent) -> bool {
            self.log
                .borrow_mut()
                .push((self.name, Dispatch::Intercept, ev.kind));
            self.claim == Some(ev.kind)
        }

        fn on_pointer(&mut self, _: &mut BehaviorCtx<'_>, ev: &PointerEvent) -> bool {
            self.log
                .borrow_mut()
                .push((self.name, Dispatch::Pointer, ev.kind));
            self.claim.is_some()
        }

        fn scrim_opacity(&self, _: &BehaviorCtx<'_>) -> f64 {
            self.scrim
        }
    }

    fn at(kind: PointerKind, t: u64) -> PointerEvent {
        PointerEvent::new(kind, Point::new(10.0, 10.0), t)
    }

    #[test]
    fn first_claim_owns_stream_and_cancels_below_once() {
        let log = Log::default();
        let mut c = Coordinator::default();
        let _below = c.add_child(Recorder::spec("below", &log, None)).unwrap();
        let top = c
            .add_child(Recorder::spec("top", &log, Some(PointerKind::Move)))
            .unwrap();

        assert!(!c.on_intercept_pointer(&at(PointerKind::Down, 0)));
        assert!(c.on_intercept_pointer(&at(PointerKind::Move, 16)));
        assert_eq!(c.touch_owner(), Some(top));
        assert_eq!(
            *log.borrow(),
            vec![
                ("top", Dispatch::Intercept, PointerKind::Down),
                ("below", Dispatch::Intercept, PointerKind::Down),
                ("top", Dispatch::Intercept, PointerKind::Move),
                ("below", Dispatch::Intercept, PointerKind::Cancel),
            ]
        );

        log.borrow_mut().clear();
        assert!(c.on_pointer(&at(PointerKind::Move, 32)));
        assert!(c.on_pointer(&at(PointerKind::Up, 48)));
        assert_eq!(c.touch_owner(), None);
        assert_eq!(
            *log.borrow(),
            vec![
                ("top", Dispatch::Pointer, PointerKind::Move),
                ("top", Dispatch::Pointer, PointerKind::Up),
                ("top", Dispatch::Pointer, PointerKind::Cancel),
            ]
        );
    }

    #[test]
    fn new_down_cancels_a_stale_owner() {
        let log = Log::default();
        let mut c = Coordinator::default();
        let id = c
            .add_child(Recorder::spec("only", &log, Some(PointerKind::Down)))
            .unwrap();
        assert!(c.on_intercept_pointer(&at(PointerKind::Down, 0)));
        assert_eq!(c.touch_owner(), Some(id));
        log.borrow_mut().clear();

        // The previous stream never ended.
        c.on_intercept_pointer(&at(PointerKind::Down, 100));
        assert_eq!(
            log.borrow()[..2],
            [
                ("only", Dispatch::Pointer, PointerKind::Cancel),
                ("only", Dispatch::Intercept, PointerKind::Down),
            ]
        );
    }

    #[test]
    fn blocking_child_hides_children_below() {
        let log = Log::default();
        let mut c = Coordinator::default();
        c.add_child(Recorder::spec("below", &log, Some(PointerKind::Move)))
            .unwrap();
        let scrim = c.add_child(Recorder::spec("scrim", &log, None)).unwrap();
        c.with_behavior::<Recorder, _>(scrim, |b, _| b.scrim = 0.5);

        c.on_intercept_pointer(&at(PointerKind::Down, 0));
        assert!(!c.on_intercept_pointer(&at(PointerKind::Move, 16)));
        assert_eq!(c.touch_owner(), None);
        assert_eq!(
            *log.borrow(),
            vec![
                ("scrim", Dispatch::Intercept, PointerKind::Down),
                ("below", Dispatch::Intercept, PointerKind::Down),
                ("scrim", Dispatch::Intercept, PointerKind::Move),
            ]
        );
    }

    #[test]
    fn elevation_orders_before_insertion() {
        let log = Log::default();
        let mut c = Coordinator::default();
        let raised = c.add_child(Recorder::spec("raised", &log, None)).unwrap();
        let plain = c.add_child(Recorder::spec("plain", &log, None)).unwrap();
        c.set_z_index(raised, 4);
        assert_eq!(c.top_sorted_children(), vec![raised, plain]);
    }

    #[test]
    fn disallow_intercept_resets_once() {
        let log = Log::default();
        let mut c = Coordinator::default();
        c.add_child(Recorder::spec("only", &log, Some(PointerKind::Down)))
            .unwrap();
        c.on_intercept_pointer(&at(PointerKind::Down, 0));
        log.borrow_mut().clear();

        c.request_disallow_intercept(true);
        c.request_disallow_intercept(true);
        assert_eq!(c.touch_owner(), None);
        assert_eq!(
            *log.borrow(),
            vec![("only", Dispatch::Pointer, PointerKind::Cancel)]
        );
    }
}
