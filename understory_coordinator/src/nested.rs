// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested scrolling: a scrolling descendant shares its scroll deltas with sibling behaviors.
//!
//! A session runs from [`Coordinator::start_nested_scroll`] to
//! [`Coordinator::stop_nested_scroll`]. Only behaviors that accepted the session at start
//! receive its events. Pre-scroll lets them consume part of a delta before the target
//! scrolls; post-scroll reports what the target left over.
//!
//! Every pre-scroll, scroll, or handled fling that reached at least one behavior runs the
//! dependent-change notifier, so dependents follow within the same call.

use alloc::vec::Vec;

use kurbo::Vec2;

use crate::coordinator::Coordinator;
use crate::notify::ChangeEvent;
use crate::types::{Axes, ChildId, Visibility};

/// The nested scroll in progress.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NestedScrollSession {
    /// Direct child containing the scrolling target.
    pub direct_child: ChildId,
    /// The scrolling descendant.
    pub target: ChildId,
    /// Axes the target scrolls along.
    pub axes: Axes,
}

/// Combine one behavior's consumption into the running total for an axis.
fn merge_consumed(total: f64, consumed: f64, delta: f64) -> f64 {
    if delta > 0.0 {
        total.max(consumed)
    } else {
        total.min(consumed)
    }
}

/// Keep consumption between zero and the delta.
fn clamp_consumed(consumed: f64, delta: f64) -> f64 {
    if delta > 0.0 {
        consumed.clamp(0.0, delta)
    } else if delta < 0.0 {
        consumed.clamp(delta, 0.0)
    } else {
        0.0
    }
}

impl Coordinator {
    /// Offer a new session to every behavior.
    ///
    /// `target` is the scrolling node (any live node). Returns whether any behavior
    /// accepted; if so, the session opens and accepting behaviors are told.
    pub fn start_nested_scroll(&mut self, target: ChildId, axes: Axes) -> bool {
        let Some(direct_child) = self.direct_child_of(target) else {
            return false;
        };
        let mut handled = false;
        for id in self.children.clone() {
            let accepted = if self.visibility(id) == Some(Visibility::Gone) {
                false
            } else {
                self.call_behavior(id, |b, ctx| {
                    b.on_start_nested_scroll(ctx, direct_child, target, axes)
                })
                .unwrap_or(false)
            };
            if let Some(slot) = self.slot_mut(id) {
                slot.nested_accepted = accepted;
            }
            handled |= accepted;
        }
        if !handled {
            return false;
        }

        self.nested = Some(NestedScrollSession {
            direct_child,
            target,
            axes,
        });
        tracing::debug!(?target, ?axes, "nested scroll started");
        for id in self.accepting_children(false) {
            self.call_behavior(id, |b, ctx| {
                b.on_nested_scroll_accepted(ctx, direct_child, target, axes);
            });
        }
        true
    }

    /// The session in progress, if any.
    pub fn nested_scroll_session(&self) -> Option<NestedScrollSession> {
        self.nested
    }

    /// The target is about to scroll by `delta`; returns how much the behaviors consumed.
    pub fn nested_pre_scroll(&mut self, target: ChildId, delta: Vec2) -> Vec2 {
        let mut consumed = Vec2::ZERO;
        let mut accepted = false;
        for id in self.accepting_children(true) {
            let Some(c) = self.call_behavior(id, |b, ctx| b.on_nested_pre_scroll(ctx, target, delta))
            else {
                continue;
            };
            consumed.x = merge_consumed(consumed.x, c.x, delta.x);
            consumed.y = merge_consumed(consumed.y, c.y, delta.y);
            accepted = true;
        }
        let consumed = Vec2::new(
            clamp_consumed(consumed.x, delta.x),
            clamp_consumed(consumed.y, delta.y),
        );
        tracing::trace!(?delta, ?consumed, "nested pre-scroll");
        if accepted {
            self.notify_changes(ChangeEvent::NestedScroll);
        }
        consumed
    }

    /// The target scrolled by `consumed`, leaving `unconsumed`.
    pub fn nested_scroll(&mut self, target: ChildId, consumed: Vec2, unconsumed: Vec2) {
        let mut accepted = false;
        for id in self.accepting_children(true) {
            accepted |= self
                .call_behavior(id, |b, ctx| {
                    b.on_nested_scroll(ctx, target, consumed, unconsumed);
                })
                .is_some();
        }
        if accepted {
            self.notify_changes(ChangeEvent::NestedScroll);
        }
    }

    /// The target is about to fling; returns whether a behavior consumed the fling.
    pub fn nested_pre_fling(&mut self, target: ChildId, velocity: Vec2) -> bool {
        let mut handled = false;
        for id in self.accepting_children(true) {
            handled |= self
                .call_behavior(id, |b, ctx| b.on_nested_pre_fling(ctx, target, velocity))
                .unwrap_or(false);
        }
        handled
    }

    /// The target flung; `consumed` tells whether it scrolled itself.
    pub fn nested_fling(&mut self, target: ChildId, velocity: Vec2, consumed: bool) -> bool {
        let mut handled = false;
        for id in self.accepting_children(true) {
            handled |= self
                .call_behavior(id, |b, ctx| b.on_nested_fling(ctx, target, velocity, consumed))
                .unwrap_or(false);
        }
        if handled {
            self.notify_changes(ChangeEvent::NestedScroll);
        }
        handled
    }

    /// End the session.
    pub fn stop_nested_scroll(&mut self, target: ChildId) {
        for id in self.accepting_children(false) {
            self.call_behavior(id, |b, ctx| b.on_stop_nested_scroll(ctx, target));
            if let Some(slot) = self.slot_mut(id) {
                slot.nested_accepted = false;
                slot.changed_after_nested = false;
            }
        }
        if self.nested.take().is_some() {
            tracing::debug!(?target, "nested scroll stopped");
        }
    }

    fn accepting_children(&self, skip_gone: bool) -> Vec<ChildId> {
        self.children
            .iter()
            .copied()
            .filter(|&id| self.slot(id).is_some_and(|s| s.nested_accepted))
            .filter(|&id| !skip_gone || self.visibility(id) != Some(Visibility::Gone))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::context::BehaviorCtx;
    use crate::spec::LayoutSpec;
    use kurbo::Rect;
    use proptest::prelude::*;

    /// Consumes a fixed share of every pre-scroll.
    struct Share {
        vertical_only: bool,
        consume: Vec2,
        stopped: u32,
        accepted: u32,
    }

    impl Share {
        fn spec(consume: Vec2) -> LayoutSpec {
            LayoutSpec::with_behavior(Self {
                vertical_only: true,
                consume,
                stopped: 0,
                accepted: 0,
            })
        }
    }

    impl Behavior for Share {
        fn on_start_nested_scroll(
            &mut self,
            _: &mut BehaviorCtx<'_>,
            _: ChildId,
            _: ChildId,
            axes: Axes,
        ) -> bool {
            !self.vertical_only || axes.contains(Axes::VERTICAL)
        }

        fn on_nested_scroll_accepted(
            &mut self,
            _: &mut BehaviorCtx<'_>,
            _: ChildId,
            _: ChildId,
            _: Axes,
        ) {
            self.accepted += 1;
        }

        fn on_nested_pre_scroll(&mut self, _: &mut BehaviorCtx<'_>, _: ChildId, _: Vec2) -> Vec2 {
            self.consume
        }

        fn on_stop_nested_scroll(&mut self, _: &mut BehaviorCtx<'_>, _: ChildId) {
            self.stopped += 1;
        }
    }

    fn setup(shares: &[Vec2]) -> (Coordinator, Vec<ChildId>, ChildId) {
        let mut c = Coordinator::default();
        let ids: Vec<ChildId> = shares
            .iter()
            .map(|&s| c.add_child(Share::spec(s)).unwrap())
            .collect();
        let host = c.add_child(LayoutSpec::default()).unwrap();
        let list = c.add_descendant(host, Rect::ZERO).unwrap();
        (c, ids, list)
    }

    #[test]
    fn session_opens_only_when_accepted() {
        let (mut c, ids, list) = setup(&[Vec2::ZERO]);
        assert!(!c.start_nested_scroll(list, Axes::HORIZONTAL));
        assert_eq!(c.nested_scroll_session(), None);

        assert!(c.start_nested_scroll(list, Axes::VERTICAL));
        let session = c.nested_scroll_session().unwrap();
        assert_eq!(session.target, list);
        assert_eq!(session.direct_child, c.direct_child_of(list).unwrap());
        assert_eq!(c.behavior::<Share>(ids[0]).unwrap().accepted, 1);

        c.stop_nested_scroll(list);
        assert_eq!(c.nested_scroll_session(), None);
        assert_eq!(c.behavior::<Share>(ids[0]).unwrap().stopped, 1);
        // A second stop reaches nobody.
        c.stop_nested_scroll(list);
        assert_eq!(c.behavior::<Share>(ids[0]).unwrap().stopped, 1);
    }

    #[test]
    fn pre_scroll_takes_largest_share_in_direction() {
        let (mut c, _, list) = setup(&[Vec2::new(0.0, 10.0), Vec2::new(0.0, 30.0)]);
        assert!(c.start_nested_scroll(list, Axes::VERTICAL));
        assert_eq!(
            c.nested_pre_scroll(list, Vec2::new(0.0, 50.0)),
            Vec2::new(0.0, 30.0)
        );
        // Over-consumption is clamped to the delta.
        assert_eq!(
            c.nested_pre_scroll(list, Vec2::new(0.0, 20.0)),
            Vec2::new(0.0, 20.0)
        );
    }

    #[test]
    fn gone_children_do_not_join() {
        let (mut c, ids, list) = setup(&[Vec2::new(0.0, 10.0)]);
        c.set_visibility(ids[0], Visibility::Gone);
        assert!(!c.start_nested_scroll(list, Axes::VERTICAL));
        assert_eq!(c.nested_pre_scroll(list, Vec2::new(0.0, 50.0)), Vec2::ZERO);
    }

    #[test]
    fn removing_target_ends_session() {
        let (mut c, _, list) = setup(&[Vec2::ZERO]);
        assert!(c.start_nested_scroll(list, Axes::VERTICAL));
        c.remove(list);
        assert_eq!(c.nested_scroll_session(), None);
    }

    proptest! {
        #[test]
        fn pre_scroll_never_exceeds_delta(
            shares in proptest::collection::vec(-400.0_f64..400.0, 1..4),
            delta in -300.0_f64..300.0,
        ) {
            let shares: Vec<Vec2> = shares.into_iter().map(|y| Vec2::new(0.0, y)).collect();
            let (mut c, _, list) = setup(&shares);
            prop_assert!(c.start_nested_scroll(list, Axes::VERTICAL));
            let consumed = c.nested_pre_scroll(list, Vec2::new(0.0, delta));
            prop_assert_eq!(consumed.x, 0.0);
            if delta >= 0.0 {
                prop_assert!(consumed.y >= 0.0 && consumed.y <= delta);
            } else {
                prop_assert!(consumed.y <= 0.0 && consumed.y >= delta);
            }
        }
    }
}
