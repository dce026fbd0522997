// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scrolling content pinned beneath a collapsing header.

use kurbo::{Rect, Vec2};
use understory_coordinator::{Behavior, BehaviorCtx, ChildId, Constraint, Constraints, Length};

use crate::header::HeaderBehavior;

/// Keeps a child directly below the first sibling carrying a [`HeaderBehavior`].
///
/// The child is measured as tall as the container once the header has scrolled away, so it
/// fills the screen at full collapse. It follows the header's bottom edge whenever the
/// header moves, keeping any gap left by its top margin or gravity.
///
/// With an `overlay_top`, the child overlaps the expanded header by that distance. The
/// overlap shrinks to zero as the header collapses.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ScrollingContentBehavior {
    overlay_top: f64,
    vertical_layout_gap: f64,
}

impl ScrollingContentBehavior {
    /// Content overlapping the expanded header by `overlay_top`.
    pub fn with_overlay_top(overlay_top: f64) -> Self {
        Self {
            overlay_top,
            vertical_layout_gap: 0.0,
        }
    }

    /// Distance the content overlaps the expanded header.
    pub fn overlay_top(&self) -> f64 {
        self.overlay_top
    }

    /// Set the overlap. Applies from the next layout.
    pub fn set_overlay_top(&mut self, overlay_top: f64) {
        self.overlay_top = overlay_top;
    }

    /// Gap between the header's bottom and the content's top at the last layout.
    pub fn vertical_layout_gap(&self) -> f64 {
        self.vertical_layout_gap
    }

    fn find_header(ctx: &BehaviorCtx<'_>) -> Option<ChildId> {
        ctx.dependencies()
            .iter()
            .copied()
            .find(|&d| ctx.has_behavior::<HeaderBehavior>(d))
    }

    fn overlap_ratio(header: &HeaderBehavior) -> f64 {
        let total = header.total_scroll_range();
        let pre_scroll_down = header.down_nested_pre_scroll_range();
        let offset = header.top_and_bottom_offset();
        if pre_scroll_down != 0.0 && total + offset <= pre_scroll_down {
            // Entering from a downward pre-scroll.
            return 0.0;
        }
        let available = total - pre_scroll_down;
        if available == 0.0 {
            0.0
        } else {
            1.0 + offset / available
        }
    }

    fn overlap(&self, ctx: &BehaviorCtx<'_>, header: ChildId) -> f64 {
        if self.overlay_top == 0.0 {
            return 0.0;
        }
        let ratio = ctx.behavior::<HeaderBehavior>(header).map_or(0.0, Self::overlap_ratio);
        (ratio * self.overlay_top).clamp(0.0, self.overlay_top.max(0.0))
    }
}

impl Behavior for ScrollingContentBehavior {
    fn depends_on(&self, ctx: &BehaviorCtx<'_>, candidate: ChildId) -> bool {
        ctx.has_behavior::<HeaderBehavior>(candidate)
    }

    fn on_dependent_changed(&mut self, ctx: &mut BehaviorCtx<'_>, dependency: ChildId) -> bool {
        let Some(header) = ctx.rect(dependency) else {
            return false;
        };
        let dy = header.y1 - ctx.child_rect().y0 + self.vertical_layout_gap
            - self.overlap(ctx, dependency);
        ctx.offset_top_and_bottom(dy);
        dy != 0.0
    }

    fn on_measure(
        &mut self,
        ctx: &mut BehaviorCtx<'_>,
        parent: Constraints,
        width_used: f64,
        height_used: f64,
    ) -> bool {
        let Some(height_length) = ctx.spec(ctx.child()).map(|s| s.height) else {
            return false;
        };
        if !matches!(height_length, Length::MatchParent | Length::WrapContent) {
            return false;
        }
        let Some(header) = Self::find_header(ctx) else {
            return false;
        };
        let header_height = ctx.measured_size(header).map_or(0.0, |s| s.height);
        let scroll_range = ctx
            .behavior::<HeaderBehavior>(header)
            .map_or(header_height, HeaderBehavior::total_scroll_range);
        let mut available = parent.height.size;
        if available == 0.0 {
            available = ctx.container_size().height;
        }
        let height = available - header_height + scroll_range;
        let height = if height_length == Length::MatchParent {
            Constraint::exact(height)
        } else {
            Constraint::at_most(height)
        };
        ctx.measure_child_default(
            Constraints {
                width: parent.width,
                height,
            },
            width_used,
            height_used,
        );
        true
    }

    fn on_layout(&mut self, ctx: &mut BehaviorCtx<'_>) -> bool {
        let Some(header) = Self::find_header(ctx) else {
            self.vertical_layout_gap = 0.0;
            return false;
        };
        let (Some(header_rect), Some(spec), Some(measured)) = (
            ctx.rect(header),
            ctx.spec(ctx.child()),
            ctx.measured_size(ctx.child()),
        ) else {
            return false;
        };
        let p = ctx.padding();
        let m = spec.margins;
        let size = ctx.container_size();
        let available = Rect::new(
            p.x0 + m.x0,
            header_rect.y1 + m.y0,
            size.width - p.x1 - m.x1,
            size.height + header_rect.y1 - p.y1 - m.y1,
        );
        let out = spec
            .gravity
            .or_start_top()
            .apply(measured, available, ctx.layout_direction());
        let overlap = self.overlap(ctx, header);
        ctx.place_child(out - Vec2::new(0.0, overlap));
        self.vertical_layout_gap = out.y0 - header_rect.y1;
        true
    }
}
