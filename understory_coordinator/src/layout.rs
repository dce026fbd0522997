// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Measure and layout passes.
//!
//! Each measure pass rebuilds the dependency graph from scratch, so children are always
//! measured and placed after everything they depend on. Layout then places each child by
//! one of three rules, unless its behavior places it itself:
//!
//! - anchored: relative to a point on the anchor's current rect, then clamped inside the
//!   container's padding and the child's margins;
//! - keyline: the child's trailing edge on a horizontal guideline;
//! - plain: gravity within the padded container.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;
use crate::gravity::{Align, Gravity};
use crate::spec::LayoutSpec;
use crate::types::{ChildId, Constraint, Constraints, Length, SizeMode, Visibility};

/// Gravity of a child placed on a keyline, when none is given.
fn keyline_gravity(gravity: Gravity) -> Gravity {
    if gravity.is_empty() {
        Gravity::END | Gravity::TOP
    } else {
        gravity
    }
}

/// Gravity of an anchored child, when none is given.
fn anchored_gravity(gravity: Gravity) -> Gravity {
    if gravity.is_empty() {
        Gravity::CENTER
    } else {
        gravity
    }
}

/// Extent along one axis for a child of `length` with intrinsic `content`.
fn resolve_extent(constraint: Constraint, length: Length, content: f64) -> f64 {
    let desired = match length {
        Length::Fixed(size) => size,
        Length::MatchParent if constraint.mode != SizeMode::Unbounded => constraint.size,
        Length::MatchParent | Length::WrapContent => content,
    };
    constraint.resolve(desired)
}

impl Coordinator {
    /// Measure every child and resolve the container size.
    ///
    /// Rebuilds the dependency order first, which validates anchors and keylines.
    pub fn measure(&mut self, constraints: Constraints) -> Result<Size, CoordinatorError> {
        self.prepare_children()?;
        self.needs_pre_draw = self
            .children
            .iter()
            .any(|c| self.graph.has_outgoing_edges(c));

        let padding = self.config.padding;
        let direction = self.config.layout_direction;
        let rtl = direction.is_rtl();
        let width_size = constraints.width.size;
        let mut used = Size::ZERO;

        for id in self.sorted.clone() {
            if self.visibility(id) == Some(Visibility::Gone) {
                continue;
            }
            let Some(spec) = self.spec(id) else {
                continue;
            };
            let margins = spec.margins;

            let mut keyline_width_used = 0.0;
            if let Some(index) = spec.keyline
                && constraints.width.mode != SizeMode::Unbounded
            {
                let keyline = self.config.keylines.get(index).copied().unwrap_or(0.0);
                let align = keyline_gravity(spec.gravity).resolve(direction).horizontal();
                keyline_width_used = match (align, rtl) {
                    (Some(Align::Min), false) | (Some(Align::Max), true) => {
                        (width_size - padding.x1 - keyline).max(0.0)
                    }
                    (Some(Align::Max), false) | (Some(Align::Min), true) => {
                        (keyline - padding.x0).max(0.0)
                    }
                    _ => 0.0,
                };
            }

            let handled = self
                .call_behavior(id, |b, ctx| {
                    b.on_measure(ctx, constraints, keyline_width_used, 0.0)
                })
                .unwrap_or(false);
            if !handled {
                self.measure_child(id, constraints, keyline_width_used, 0.0);
            }

            let measured = self.measured_size(id).unwrap_or(Size::ZERO);
            used.width = used
                .width
                .max(padding.x0 + padding.x1 + measured.width + margins.x0 + margins.x1);
            used.height = used
                .height
                .max(padding.y0 + padding.y1 + measured.height + margins.y0 + margins.y1);
        }

        self.size = constraints.resolve(used);
        tracing::trace!(size = ?self.size, "container measured");
        Ok(self.size)
    }

    /// Place every child in dependency order.
    pub fn layout(&mut self) -> Result<(), CoordinatorError> {
        for id in self.sorted.clone() {
            if self.visibility(id) == Some(Visibility::Gone) {
                continue;
            }
            let Some(slot) = self.slot_mut(id) else {
                continue;
            };
            if slot.spec.anchor != slot.resolved_anchor {
                return Err(CoordinatorError::AnchorChangedDuringLayout(id));
            }
            slot.inset_offset = Vec2::ZERO;
            let handled = self
                .call_behavior(id, |b, ctx| b.on_layout(ctx))
                .unwrap_or(false);
            if !handled {
                self.layout_child(id);
            }
        }
        Ok(())
    }

    /// Measure with exact constraints of `size`, then lay out.
    pub fn layout_pass(&mut self, size: Size) -> Result<(), CoordinatorError> {
        self.measure(Constraints::exact(size))?;
        self.layout()
    }

    /// Resolve anchors, validate keylines, and rebuild the dependency order.
    fn prepare_children(&mut self) -> Result<(), CoordinatorError> {
        self.graph.clear();
        let children = self.children.clone();
        for &id in &children {
            self.graph.add_node(id);
            let Some(spec) = self.spec(id) else {
                continue;
            };
            let (anchor, keyline) = (spec.anchor, spec.keyline);
            if let Some(index) = keyline
                && index >= self.config.keylines.len()
            {
                return Err(CoordinatorError::KeylineOutOfRange {
                    child: id,
                    index,
                    count: self.config.keylines.len(),
                });
            }
            let anchor_direct = match anchor {
                Some(anchor) => Some(self.resolve_anchor(id, anchor)?),
                None => None,
            };
            if let Some(slot) = self.slot_mut(id) {
                slot.resolved_anchor = anchor;
                slot.anchor_direct = anchor_direct;
            }
        }

        let direction = self.config.layout_direction;
        for &id in &children {
            for &other in &children {
                if other == id {
                    continue;
                }
                let structural = match (self.slot(id), self.spec(other)) {
                    (Some(slot), Some(other_spec)) => {
                        slot.anchor_direct == Some(other)
                            || slot.spec.dodges(other_spec.inset_edge, direction)
                    }
                    _ => false,
                };
                let depends = structural
                    || self
                        .call_behavior(id, |b, ctx| b.depends_on(ctx, other))
                        .unwrap_or(false);
                if depends {
                    self.graph.add_edge(id, other);
                }
            }
        }

        self.sorted = self.graph.topological_order()?;
        tracing::debug!(children = self.sorted.len(), "dependency order rebuilt");
        Ok(())
    }

    /// Check that `anchor` is a valid anchor for `child` and return the direct child
    /// containing it.
    fn resolve_anchor(&self, child: ChildId, anchor: ChildId) -> Result<ChildId, CoordinatorError> {
        if anchor == child {
            return Err(CoordinatorError::AnchorIsSelf(child));
        }
        let mut direct = anchor;
        loop {
            let Some(node) = self.node(direct) else {
                return Err(CoordinatorError::AnchorNotFound { child, anchor });
            };
            if direct == child {
                return Err(CoordinatorError::AnchorInsideChild { child, anchor });
            }
            match node.parent {
                Some(parent) => direct = parent,
                None => return Ok(direct),
            }
        }
    }

    /// Default measurement of a direct child.
    pub(crate) fn measure_child(
        &mut self,
        id: ChildId,
        parent: Constraints,
        width_used: f64,
        height_used: f64,
    ) {
        let padding = self.config.padding;
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let Some(spec) = node.slot.as_deref().map(|s| &s.spec) else {
            return;
        };
        let m = spec.margins;
        let width = parent
            .width
            .for_child(padding.x0 + padding.x1 + m.x0 + m.x1 + width_used, spec.width);
        let height = parent
            .height
            .for_child(padding.y0 + padding.y1 + m.y0 + m.y1 + height_used, spec.height);
        let measured = Size::new(
            resolve_extent(width, spec.width, node.content_size.width),
            resolve_extent(height, spec.height, node.content_size.height),
        );
        node.measured = measured;
    }

    /// Default placement of a direct child.
    pub(crate) fn layout_child(&mut self, id: ChildId) {
        let Some(measured) = self.measured_size(id) else {
            return;
        };
        let Some(slot) = self.slot(id) else {
            return;
        };
        let anchor_rect = slot.resolved_anchor.and_then(|a| self.rect(a));
        let rect = if let Some(anchor_rect) = anchor_rect {
            let desired = self.desired_anchored_rect(&slot.spec, anchor_rect, measured);
            self.constrain_child_rect(&slot.spec, desired.origin(), measured)
        } else if let Some(index) = slot.spec.keyline {
            self.keyline_rect(&slot.spec, index, measured)
        } else {
            slot.spec.gravity.or_start_top().apply(
                measured,
                self.content_box(&slot.spec),
                self.config.layout_direction,
            )
        };
        if let Some(node) = self.node_mut(id) {
            node.frame = rect;
        }
    }

    /// Container bounds inside padding and the child's margins.
    fn content_box(&self, spec: &LayoutSpec) -> Rect {
        let p = self.config.padding;
        let m = spec.margins;
        Rect::new(
            p.x0 + m.x0,
            p.y0 + m.y0,
            self.size.width - p.x1 - m.x1,
            self.size.height - p.y1 - m.y1,
        )
    }

    /// Where an anchored child wants to be, before clamping into the container.
    pub(crate) fn desired_anchored_rect(
        &self,
        spec: &LayoutSpec,
        anchor: Rect,
        size: Size,
    ) -> Rect {
        let direction = self.config.layout_direction;
        let gravity = anchored_gravity(spec.gravity).resolve(direction);
        let anchor_gravity = spec.anchor_gravity.or_start_top().resolve(direction);

        let mut x = match anchor_gravity.horizontal() {
            Some(Align::Max) => anchor.x1,
            Some(Align::Center) => anchor.x0 + anchor.width() / 2.0,
            Some(Align::Min) | None => anchor.x0,
        };
        let mut y = match anchor_gravity.vertical() {
            Some(Align::Max) => anchor.y1,
            Some(Align::Center) => anchor.y0 + anchor.height() / 2.0,
            Some(Align::Min) | None => anchor.y0,
        };
        // The anchor point is the child's top-left corner for RIGHT|BOTTOM gravity.
        x -= match gravity.horizontal() {
            Some(Align::Max) => 0.0,
            Some(Align::Center) => size.width / 2.0,
            Some(Align::Min) | None => size.width,
        };
        y -= match gravity.vertical() {
            Some(Align::Max) => 0.0,
            Some(Align::Center) => size.height / 2.0,
            Some(Align::Min) | None => size.height,
        };
        Rect::from_origin_size((x, y), size)
    }

    /// Clamp a child's origin so it stays inside padding and margins.
    pub(crate) fn constrain_child_rect(&self, spec: &LayoutSpec, origin: Point, size: Size) -> Rect {
        let p = self.config.padding;
        let m = spec.margins;
        let x = origin
            .x
            .min(self.size.width - p.x1 - size.width - m.x1)
            .max(p.x0 + m.x0);
        let y = origin
            .y
            .min(self.size.height - p.y1 - size.height - m.y1)
            .max(p.y0 + m.y0);
        Rect::from_origin_size((x, y), size)
    }

    fn keyline_rect(&self, spec: &LayoutSpec, index: usize, size: Size) -> Rect {
        let direction = self.config.layout_direction;
        let gravity = keyline_gravity(spec.gravity).resolve(direction);
        let mut keyline = self.config.keylines.get(index).copied().unwrap_or(0.0);
        if direction.is_rtl() {
            keyline = self.size.width - keyline;
        }
        let mut x = keyline - size.width;
        match gravity.horizontal() {
            Some(Align::Max) => x += size.width,
            Some(Align::Center) => x += size.width / 2.0,
            Some(Align::Min) | None => {}
        }
        let bounds = self.content_box(spec);
        let y = match gravity.vertical() {
            Some(Align::Max) => bounds.y1 - size.height,
            Some(Align::Center) => bounds.y0 + (bounds.height() - size.height) / 2.0,
            Some(Align::Min) | None => bounds.y0,
        };
        self.constrain_child_rect(spec, Point::new(x, y), size)
    }

    /// Rects of all non-gone direct children, in dependency order.
    pub fn laid_out_children(&self) -> Vec<(ChildId, Rect)> {
        self.sorted
            .iter()
            .filter(|&&id| self.visibility(id) != Some(Visibility::Gone))
            .filter_map(|&id| Some((id, self.rect(id)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::context::BehaviorCtx;
    use crate::coordinator::CoordinatorConfig;
    use crate::types::{Edges, LayoutDirection};
    use alloc::vec;
    use kurbo::Insets;

    fn fixed(w: f64, h: f64) -> LayoutSpec {
        LayoutSpec {
            width: Length::Fixed(w),
            height: Length::Fixed(h),
            ..LayoutSpec::default()
        }
    }

    const SIZE: Size = Size::new(400.0, 800.0);

    #[test]
    fn plain_gravity_respects_padding_and_margins() {
        let mut c = Coordinator::new(CoordinatorConfig {
            padding: Insets::uniform(10.0),
            ..CoordinatorConfig::default()
        });
        let top_left = c.add_child(fixed(50.0, 50.0)).unwrap();
        let centered = c
            .add_child(LayoutSpec {
                gravity: Gravity::CENTER,
                ..fixed(100.0, 100.0)
            })
            .unwrap();
        let bottom_end = c
            .add_child(LayoutSpec {
                gravity: Gravity::BOTTOM | Gravity::END,
                margins: Insets::uniform(16.0),
                ..fixed(56.0, 56.0)
            })
            .unwrap();
        c.layout_pass(SIZE).unwrap();
        assert_eq!(c.rect(top_left), Some(Rect::new(10.0, 10.0, 60.0, 60.0)));
        assert_eq!(c.rect(centered), Some(Rect::new(150.0, 350.0, 250.0, 450.0)));
        assert_eq!(
            c.rect(bottom_end),
            Some(Rect::new(318.0, 718.0, 374.0, 774.0))
        );
    }

    #[test]
    fn default_measurement_follows_length() {
        let mut c = Coordinator::new(CoordinatorConfig {
            padding: Insets::new(5.0, 0.0, 5.0, 0.0),
            ..CoordinatorConfig::default()
        });
        let fill = c
            .add_child(LayoutSpec {
                width: Length::MatchParent,
                height: Length::WrapContent,
                ..LayoutSpec::default()
            })
            .unwrap();
        c.set_content_size(fill, Size::new(10.0, 900.0));
        let size = c.measure(Constraints::exact(SIZE)).unwrap();
        assert_eq!(size, SIZE);
        assert_eq!(c.measured_size(fill), Some(Size::new(390.0, 800.0)));
    }

    #[test]
    fn wrap_container_grows_to_largest_child() {
        let mut c = Coordinator::default();
        c.add_child(fixed(120.0, 40.0)).unwrap();
        c.add_child(LayoutSpec {
            margins: Insets::new(0.0, 10.0, 0.0, 10.0),
            ..fixed(80.0, 60.0)
        })
        .unwrap();
        let size = c
            .measure(Constraints {
                width: Constraint::at_most(500.0),
                height: Constraint::unbounded(),
            })
            .unwrap();
        assert_eq!(size, Size::new(120.0, 80.0));
    }

    #[test]
    fn anchored_child_sits_on_anchor_edge() {
        let mut c = Coordinator::default();
        let bar = c.add_child(fixed(400.0, 200.0)).unwrap();
        let fab = c
            .add_child(LayoutSpec {
                anchor: Some(bar),
                anchor_gravity: Gravity::BOTTOM | Gravity::END,
                margins: Insets::uniform(16.0),
                ..fixed(56.0, 56.0)
            })
            .unwrap();
        c.layout_pass(SIZE).unwrap();
        // Default CENTER gravity centers the child on the anchor's bottom-right corner,
        // then the margin clamp pulls it back inside.
        assert_eq!(c.rect(fab), Some(Rect::new(328.0, 172.0, 384.0, 228.0)));
        assert_eq!(c.dependencies(fab), &[bar]);
        assert_eq!(c.dependency_order(), &[bar, fab]);
    }

    #[test]
    fn anchor_inside_another_child_orders_after_that_child() {
        let mut c = Coordinator::default();
        let badge = c
            .add_child(LayoutSpec {
                gravity: Gravity::BOTTOM | Gravity::RIGHT,
                ..fixed(10.0, 10.0)
            })
            .unwrap();
        let card = c
            .add_child(LayoutSpec {
                margins: Insets::new(100.0, 100.0, 0.0, 0.0),
                ..fixed(200.0, 200.0)
            })
            .unwrap();
        let icon = c
            .add_descendant(card, Rect::new(20.0, 20.0, 60.0, 60.0))
            .unwrap();
        c.spec_mut(badge).unwrap().anchor = Some(icon);
        c.layout_pass(SIZE).unwrap();
        assert_eq!(c.dependency_order(), &[card, badge]);
        assert_eq!(c.rect(badge), Some(Rect::new(120.0, 120.0, 130.0, 130.0)));
    }

    #[test]
    fn invalid_anchors_are_rejected() {
        let mut c = Coordinator::default();
        let a = c.add_child(fixed(10.0, 10.0)).unwrap();
        let inner = c.add_descendant(a, Rect::ZERO).unwrap();

        c.spec_mut(a).unwrap().anchor = Some(a);
        assert_eq!(
            c.layout_pass(SIZE),
            Err(CoordinatorError::AnchorIsSelf(a))
        );

        c.spec_mut(a).unwrap().anchor = Some(inner);
        assert_eq!(
            c.layout_pass(SIZE),
            Err(CoordinatorError::AnchorInsideChild {
                child: a,
                anchor: inner
            })
        );

        let gone = c.add_child(LayoutSpec::default()).unwrap();
        c.remove(gone);
        c.spec_mut(a).unwrap().anchor = Some(gone);
        assert_eq!(
            c.layout_pass(SIZE),
            Err(CoordinatorError::AnchorNotFound {
                child: a,
                anchor: gone
            })
        );
    }

    #[test]
    fn anchor_change_between_measure_and_layout_is_an_error() {
        let mut c = Coordinator::default();
        let a = c.add_child(fixed(10.0, 10.0)).unwrap();
        let b = c.add_child(fixed(10.0, 10.0)).unwrap();
        c.measure(Constraints::exact(SIZE)).unwrap();
        c.spec_mut(b).unwrap().anchor = Some(a);
        assert_eq!(
            c.layout(),
            Err(CoordinatorError::AnchorChangedDuringLayout(b))
        );
    }

    #[test]
    fn keyline_places_trailing_edge() {
        let mut c = Coordinator::new(CoordinatorConfig {
            keylines: vec![72.0],
            ..CoordinatorConfig::default()
        });
        let avatar = c
            .add_child(LayoutSpec {
                keyline: Some(0),
                ..fixed(40.0, 40.0)
            })
            .unwrap();
        c.layout_pass(SIZE).unwrap();
        // Default END gravity puts the child's leading edge on the keyline.
        assert_eq!(c.rect(avatar), Some(Rect::new(72.0, 0.0, 112.0, 40.0)));

        c.config_mut().layout_direction = LayoutDirection::Rtl;
        c.layout_pass(SIZE).unwrap();
        assert_eq!(c.rect(avatar), Some(Rect::new(288.0, 0.0, 328.0, 40.0)));

        c.spec_mut(avatar).unwrap().keyline = Some(3);
        assert_eq!(
            c.layout_pass(SIZE),
            Err(CoordinatorError::KeylineOutOfRange {
                child: avatar,
                index: 3,
                count: 1
            })
        );
    }

    #[test]
    fn dodging_child_depends_on_insetting_child() {
        let mut c = Coordinator::default();
        let fab = c
            .add_child(LayoutSpec {
                dodge_inset_edges: Edges::BOTTOM,
                ..fixed(56.0, 56.0)
            })
            .unwrap();
        let banner = c
            .add_child(LayoutSpec {
                inset_edge: Edges::BOTTOM,
                ..fixed(400.0, 48.0)
            })
            .unwrap();
        c.layout_pass(SIZE).unwrap();
        assert_eq!(c.dependencies(fab), &[banner]);
        assert_eq!(c.dependents(banner), &[fab]);
        assert_eq!(c.dependency_order(), &[banner, fab]);
    }

    struct Follows(ChildId);

    impl Behavior for Follows {
        fn depends_on(&self, _: &BehaviorCtx<'_>, candidate: ChildId) -> bool {
            candidate == self.0
        }
    }

    #[test]
    fn behavior_dependency_cycle_is_fatal() {
        let mut c = Coordinator::default();
        let a = c.add_child(LayoutSpec::default()).unwrap();
        let b = c
            .add_child(LayoutSpec::with_behavior(Follows(a)))
            .unwrap();
        c.spec_mut(a)
            .unwrap()
            .set_behavior(Some(alloc::boxed::Box::new(Follows(b))));
        assert_eq!(c.layout_pass(SIZE), Err(CoordinatorError::DependencyCycle));
    }

    struct Pinned;

    impl Behavior for Pinned {
        fn on_measure(&mut self, ctx: &mut BehaviorCtx<'_>, _: Constraints, _: f64, _: f64) -> bool {
            ctx.set_measured_size(Size::new(20.0, 30.0));
            true
        }

        fn on_layout(&mut self, ctx: &mut BehaviorCtx<'_>) -> bool {
            ctx.layout_child_default();
            ctx.offset_top_and_bottom(5.0);
            true
        }
    }

    #[test]
    fn behavior_overrides_measure_and_layout() {
        let mut c = Coordinator::default();
        let id = c
            .add_child(LayoutSpec {
                gravity: Gravity::RIGHT,
                ..LayoutSpec::with_behavior(Pinned)
            })
            .unwrap();
        c.layout_pass(SIZE).unwrap();
        assert_eq!(c.rect(id), Some(Rect::new(380.0, 5.0, 400.0, 35.0)));
    }

    #[test]
    fn gone_children_are_skipped() {
        let mut c = Coordinator::default();
        let hidden = c.add_child(fixed(1000.0, 1000.0)).unwrap();
        c.set_visibility(hidden, Visibility::Gone);
        let size = c
            .measure(Constraints {
                width: Constraint::unbounded(),
                height: Constraint::unbounded(),
            })
            .unwrap();
        assert_eq!(size, Size::ZERO);
        c.layout().unwrap();
        assert!(c.laid_out_children().is_empty());
    }
}
