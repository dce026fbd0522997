// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependent-change notifier: propagates a child's movement to the children depending on it.
//!
//! The notifier walks children in dependency order. For each one it re-snaps anchored
//! children to their anchor, accumulates the container edges claimed by inset-declaring
//! children, moves dodging children clear of those edges, and, if the child's rect changed
//! since the last walk, tells every later child whose behavior depends on it.

use kurbo::{Insets, Rect, Vec2};

use crate::coordinator::Coordinator;
use crate::types::{ChildId, Edges, Visibility};

/// What triggered a notifier walk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ChangeEvent {
    /// Once per frame, before drawing.
    PreDraw,
    /// Synchronously after a nested scroll moved something.
    NestedScroll,
    /// A direct child is being removed.
    ChildRemoved(ChildId),
}

impl Coordinator {
    /// Run the per-frame notification, if any child has dependencies.
    ///
    /// [`frame`](Self::frame) calls this after ticking animations; hosts without a frame
    /// clock can call it directly after moving children.
    pub fn pre_draw(&mut self) {
        if self.needs_pre_draw {
            self.notify_changes(ChangeEvent::PreDraw);
        }
    }

    /// Tell every child depending on `id` that it changed, outside of a notifier walk.
    pub fn dispatch_dependents_changed(&mut self, id: ChildId) {
        for dependent in self.dependents(id).to_vec() {
            self.call_behavior(dependent, |b, ctx| b.on_dependent_changed(ctx, id));
        }
    }

    pub(crate) fn notify_child_removed(&mut self, id: ChildId) {
        self.notify_changes(ChangeEvent::ChildRemoved(id));
    }

    pub(crate) fn notify_changes(&mut self, event: ChangeEvent) {
        let direction = self.config.layout_direction;
        let order = self.sorted.clone();
        let mut inset = Insets::ZERO;
        tracing::trace!(?event, "notifying dependents");

        for (i, &child) in order.iter().enumerate() {
            let visibility = self.visibility(child);
            if event == ChangeEvent::PreDraw && visibility == Some(Visibility::Gone) {
                continue;
            }
            let Some(slot) = self.slot(child) else {
                continue;
            };
            let anchor_direct = slot.anchor_direct;
            let inset_edge = slot.spec.inset_edge.resolve(direction);
            let dodges = !slot.spec.dodge_inset_edges.is_empty();

            if anchor_direct.is_some_and(|a| order[..i].contains(&a)) {
                self.offset_child_to_anchor(child);
            }

            let Some(rect) = self.rect(child) else {
                continue;
            };
            if !inset_edge.is_empty() && rect.area() > 0.0 {
                accumulate_inset(&mut inset, inset_edge, rect, self.size);
            }

            if dodges && visibility == Some(Visibility::Visible) {
                self.offset_child_by_inset(child, inset);
            }

            let removed = match event {
                ChangeEvent::ChildRemoved(removed) => {
                    if removed != child {
                        continue;
                    }
                    true
                }
                _ => {
                    let current = self.rect(child).unwrap_or(rect);
                    let Some(slot) = self.slot_mut(child) else {
                        continue;
                    };
                    if slot.last_rect == Some(current) {
                        continue;
                    }
                    slot.last_rect = Some(current);
                    false
                }
            };

            for &dependent in &order[i + 1..] {
                let depends = self
                    .call_behavior(dependent, |b, ctx| b.depends_on(ctx, child))
                    .unwrap_or(false);
                if !depends {
                    continue;
                }
                if event == ChangeEvent::PreDraw
                    && let Some(slot) = self.slot_mut(dependent)
                    && slot.changed_after_nested
                {
                    slot.changed_after_nested = false;
                    continue;
                }
                if removed {
                    self.call_behavior(dependent, |b, ctx| b.on_dependent_removed(ctx, child));
                    continue;
                }
                let moved = self
                    .call_behavior(dependent, |b, ctx| b.on_dependent_changed(ctx, child))
                    .unwrap_or(false);
                if event == ChangeEvent::NestedScroll
                    && let Some(slot) = self.slot_mut(dependent)
                {
                    slot.changed_after_nested = moved;
                }
            }
        }
    }

    /// Move an anchored child back onto its anchor.
    ///
    /// The child's own behavior is told when its desired position moved.
    fn offset_child_to_anchor(&mut self, child: ChildId) {
        let Some(slot) = self.slot(child) else {
            return;
        };
        let Some(anchor) = slot.resolved_anchor else {
            return;
        };
        let (Some(anchor_rect), Some(current), Some(size)) = (
            self.rect(anchor),
            self.rect(child),
            self.measured_size(child),
        ) else {
            return;
        };
        let desired = self.desired_anchored_rect(&slot.spec, anchor_rect, size);
        let changed = desired.origin() != current.origin();
        let constrained = self.constrain_child_rect(&slot.spec, desired.origin(), size);
        let delta = constrained.origin() - current.origin();
        if delta != Vec2::ZERO {
            self.offset_node(child, delta);
        }
        if changed {
            self.call_behavior(child, |b, ctx| b.on_dependent_changed(ctx, anchor));
        }
    }

    /// Move a dodging child so it does not overlap the accumulated insets.
    ///
    /// # Panics
    ///
    /// If the child's behavior reports a dodge rect outside the child's bounds.
    fn offset_child_by_inset(&mut self, child: ChildId, inset: Insets) {
        let Some(bounds) = self.rect(child) else {
            return;
        };
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }
        let dodge = match self
            .call_behavior(child, |b, ctx| b.inset_dodge_rect(ctx))
            .flatten()
        {
            Some(rect) => {
                assert!(
                    encloses(bounds, rect),
                    "inset dodge rect {rect:?} must lie within the child's bounds {bounds:?}"
                );
                rect
            }
            None => bounds,
        };
        if dodge.area() <= 0.0 {
            return;
        }

        let Some(slot) = self.slot(child) else {
            return;
        };
        let edges = slot.spec.dodge_inset_edges.resolve(self.config.layout_direction);
        let margins = slot.spec.margins;
        let offset = slot.inset_offset;
        let size = self.size;

        let mut target = offset;
        let mut moved_y = false;
        if edges.contains(Edges::TOP) {
            let distance = dodge.y0 - margins.y0 - offset.y;
            if distance < inset.y0 {
                target.y = inset.y0 - distance;
                moved_y = true;
            }
        }
        if edges.contains(Edges::BOTTOM) {
            let distance = size.height - dodge.y1 - margins.y1 + offset.y;
            if distance < inset.y1 {
                target.y = distance - inset.y1;
                moved_y = true;
            }
        }
        if !moved_y {
            target.y = 0.0;
        }

        let mut moved_x = false;
        if edges.contains(Edges::LEFT) {
            let distance = dodge.x0 - margins.x0 - offset.x;
            if distance < inset.x0 {
                target.x = inset.x0 - distance;
                moved_x = true;
            }
        }
        if edges.contains(Edges::RIGHT) {
            let distance = size.width - dodge.x1 - margins.x1 + offset.x;
            if distance < inset.x1 {
                target.x = distance - inset.x1;
                moved_x = true;
            }
        }
        if !moved_x {
            target.x = 0.0;
        }

        if target != offset {
            self.offset_node(child, target - offset);
            if let Some(slot) = self.slot_mut(child) {
                slot.inset_offset = target;
            }
        }
    }
}

fn encloses(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Grow the claimed container edges by a child that insets `edges`.
///
/// Only one vertical and one horizontal edge count, top and left taking priority.
fn accumulate_inset(inset: &mut Insets, edges: Edges, rect: Rect, container: kurbo::Size) {
    if edges.contains(Edges::TOP) {
        inset.y0 = inset.y0.max(rect.y1);
    } else if edges.contains(Edges::BOTTOM) {
        inset.y1 = inset.y1.max(container.height - rect.y0);
    }
    if edges.contains(Edges::LEFT) {
        inset.x0 = inset.x0.max(rect.x1);
    } else if edges.contains(Edges::RIGHT) {
        inset.x1 = inset.x1.max(container.width - rect.x0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::context::BehaviorCtx;
    use crate::gravity::Gravity;
    use crate::spec::LayoutSpec;
    use crate::types::Length;
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use kurbo::Size;

    const SIZE: Size = Size::new(400.0, 800.0);

    fn fixed(w: f64, h: f64) -> LayoutSpec {
        LayoutSpec {
            width: Length::Fixed(w),
            height: Length::Fixed(h),
            ..LayoutSpec::default()
        }
    }

    /// Depends on one child and records every notification it receives.
    struct Watcher {
        on: ChildId,
        changed: Rc<RefCell<Vec<ChildId>>>,
        removed: Rc<RefCell<Vec<ChildId>>>,
    }

    impl Watcher {
        fn new(on: ChildId) -> Self {
            Self {
                on,
                changed: Rc::default(),
                removed: Rc::default(),
            }
        }
    }

    impl Behavior for Watcher {
        fn depends_on(&self, _: &BehaviorCtx<'_>, candidate: ChildId) -> bool {
            candidate == self.on
        }

        fn on_dependent_changed(&mut self, _: &mut BehaviorCtx<'_>, dep: ChildId) -> bool {
            self.changed.borrow_mut().push(dep);
            true
        }

        fn on_dependent_removed(&mut self, _: &mut BehaviorCtx<'_>, dep: ChildId) {
            self.removed.borrow_mut().push(dep);
        }
    }

    /// Slides its own child on demand, like a header driven by a gesture.
    struct Slider;

    impl Behavior for Slider {
        fn on_nested_pre_scroll(
            &mut self,
            ctx: &mut BehaviorCtx<'_>,
            _: ChildId,
            delta: Vec2,
        ) -> Vec2 {
            ctx.offset_top_and_bottom(-delta.y);
            delta
        }

        fn on_start_nested_scroll(
            &mut self,
            _: &mut BehaviorCtx<'_>,
            _: ChildId,
            _: ChildId,
            _: crate::types::Axes,
        ) -> bool {
            true
        }
    }

    #[test]
    fn anchored_child_resnaps_and_dependent_is_told_once() {
        let mut c = Coordinator::default();
        let bar = c
            .add_child(LayoutSpec {
                width: Length::Fixed(400.0),
                height: Length::Fixed(200.0),
                ..LayoutSpec::with_behavior(Slider)
            })
            .unwrap();
        let fab = c
            .add_child(LayoutSpec {
                anchor: Some(bar),
                anchor_gravity: Gravity::BOTTOM | Gravity::RIGHT,
                gravity: Gravity::TOP | Gravity::LEFT,
                ..fixed(56.0, 56.0)
            })
            .unwrap();
        let watcher = Watcher::new(fab);
        let changed = watcher.changed.clone();
        let follower = c.add_child(LayoutSpec::with_behavior(watcher)).unwrap();
        c.layout_pass(SIZE).unwrap();
        assert_eq!(c.dependency_order(), &[bar, fab, follower]);

        // First frame records the initial rects.
        c.frame(16.0);
        assert_eq!(*changed.borrow(), vec![fab]);
        changed.borrow_mut().clear();

        // The anchor moves; the anchored child follows within the same walk.
        let host = c.add_descendant(follower, Rect::ZERO).unwrap();
        assert!(c.start_nested_scroll(host, crate::types::Axes::VERTICAL));
        c.nested_pre_scroll(host, Vec2::new(0.0, 40.0));
        assert_eq!(c.rect(bar), Some(Rect::new(0.0, -40.0, 400.0, 160.0)));
        assert_eq!(c.rect(fab), Some(Rect::new(344.0, 104.0, 400.0, 160.0)));
        assert_eq!(*changed.borrow(), vec![fab]);

        // The pre-draw of the same frame does not repeat it.
        c.frame(16.0);
        assert_eq!(*changed.borrow(), vec![fab]);
    }

    #[test]
    fn unchanged_children_are_not_reported_twice() {
        let mut c = Coordinator::default();
        let a = c.add_child(fixed(10.0, 10.0)).unwrap();
        let watcher = Watcher::new(a);
        let changed = watcher.changed.clone();
        c.add_child(LayoutSpec::with_behavior(watcher)).unwrap();
        c.layout_pass(SIZE).unwrap();
        c.pre_draw();
        c.pre_draw();
        c.frame(16.0);
        assert_eq!(*changed.borrow(), vec![a]);

        c.spec_mut(a).unwrap().gravity = Gravity::BOTTOM;
        c.layout_pass(SIZE).unwrap();
        c.pre_draw();
        c.pre_draw();
        assert_eq!(*changed.borrow(), vec![a, a]);
    }

    #[test]
    fn removal_notifies_only_dependents_of_removed_child() {
        let mut c = Coordinator::default();
        let a = c.add_child(fixed(10.0, 10.0)).unwrap();
        let b = c.add_child(fixed(10.0, 10.0)).unwrap();
        let on_a = Watcher::new(a);
        let on_b = Watcher::new(b);
        let (removed_a, removed_b) = (on_a.removed.clone(), on_b.removed.clone());
        c.add_child(LayoutSpec::with_behavior(on_a)).unwrap();
        c.add_child(LayoutSpec::with_behavior(on_b)).unwrap();
        c.layout_pass(SIZE).unwrap();

        assert!(c.remove(a));
        assert_eq!(*removed_a.borrow(), vec![a]);
        assert!(removed_b.borrow().is_empty());
    }

    #[test]
    fn dodging_child_moves_clear_of_bottom_inset() {
        let mut c = Coordinator::default();
        let fab = c
            .add_child(LayoutSpec {
                gravity: Gravity::BOTTOM | Gravity::END,
                dodge_inset_edges: Edges::BOTTOM,
                margins: Insets::uniform(16.0),
                ..fixed(56.0, 56.0)
            })
            .unwrap();
        let banner = c
            .add_child(LayoutSpec {
                gravity: Gravity::BOTTOM,
                inset_edge: Edges::BOTTOM,
                ..fixed(400.0, 48.0)
            })
            .unwrap();
        c.layout_pass(SIZE).unwrap();
        assert_eq!(c.rect(fab), Some(Rect::new(328.0, 728.0, 384.0, 784.0)));

        c.pre_draw();
        assert_eq!(c.rect(fab), Some(Rect::new(328.0, 680.0, 384.0, 736.0)));

        // The banner leaves; the dodge offset is released on the next walk.
        c.set_visibility(banner, crate::types::Visibility::Gone);
        c.pre_draw();
        assert_eq!(c.rect(fab), Some(Rect::new(328.0, 728.0, 384.0, 784.0)));
    }

    #[test]
    #[should_panic(expected = "must lie within")]
    fn dodge_rect_outside_bounds_panics() {
        struct Wild;
        impl Behavior for Wild {
            fn inset_dodge_rect(&self, _: &BehaviorCtx<'_>) -> Option<Rect> {
                Some(Rect::new(-100.0, -100.0, 0.0, 0.0))
            }
        }
        let mut c = Coordinator::default();
        c.add_child(LayoutSpec {
            dodge_inset_edges: Edges::BOTTOM,
            width: Length::Fixed(10.0),
            height: Length::Fixed(10.0),
            ..LayoutSpec::with_behavior(Wild)
        })
        .unwrap();
        c.add_child(LayoutSpec {
            inset_edge: Edges::BOTTOM,
            ..fixed(10.0, 10.0)
        })
        .unwrap();
        c.layout_pass(SIZE).unwrap();
        c.pre_draw();
    }
}
