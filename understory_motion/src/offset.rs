// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A vertical offset kept on top of wherever layout put the child.

use understory_coordinator::BehaviorCtx;

/// Vertical offset of a child relative to its laid-out position.
///
/// Layout resets the child's rect; [`on_layout`](Self::on_layout) records the new base and
/// reapplies the offset, so the offset survives relayout.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ViewOffset {
    layout_top: f64,
    offset: f64,
}

impl ViewOffset {
    /// Record the laid-out position of the context's child and reapply the offset.
    pub fn on_layout(&mut self, ctx: &mut BehaviorCtx<'_>) {
        self.layout_top = ctx.child_rect().y0;
        self.apply(ctx);
    }

    /// Current offset.
    pub fn top_and_bottom(&self) -> f64 {
        self.offset
    }

    /// Laid-out top of the child, before the offset.
    pub fn layout_top(&self) -> f64 {
        self.layout_top
    }

    /// Set the offset and move the child. Returns whether it changed.
    pub fn set_top_and_bottom(&mut self, ctx: &mut BehaviorCtx<'_>, offset: f64) -> bool {
        if self.offset == offset {
            return false;
        }
        self.offset = offset;
        self.apply(ctx);
        true
    }

    fn apply(&self, ctx: &mut BehaviorCtx<'_>) {
        let dy = self.layout_top + self.offset - ctx.child_rect().y0;
        ctx.offset_top_and_bottom(dy);
    }
}
