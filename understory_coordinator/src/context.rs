// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view of the container handed to behavior callbacks.

use kurbo::{Insets, Point, Rect, Size, Vec2};

use crate::behavior::Behavior;
use crate::coordinator::Coordinator;
use crate::spec::LayoutSpec;
use crate::types::{ChildId, Constraints, LayoutDirection, NodeFlags, Visibility};

/// Context for a behavior callback, scoped to the child the behavior is attached to.
///
/// Reads cover the whole container. Writes only touch the context's own child, so a
/// behavior cannot rearrange its siblings behind the container's back.
///
/// While a callback runs, the calling behavior is detached from its slot:
/// [`behavior`](Self::behavior) returns `None` for the context's own child.
#[derive(Debug)]
pub struct BehaviorCtx<'a> {
    coordinator: &'a mut Coordinator,
    child: ChildId,
}

impl<'a> BehaviorCtx<'a> {
    pub(crate) fn new(coordinator: &'a mut Coordinator, child: ChildId) -> Self {
        Self { coordinator, child }
    }

    /// The child this behavior is attached to.
    pub fn child(&self) -> ChildId {
        self.child
    }

    /// Read-only access to the whole container.
    pub fn coordinator(&self) -> &Coordinator {
        self.coordinator
    }

    /// Size of the container from the last measure pass.
    pub fn container_size(&self) -> Size {
        self.coordinator.size
    }

    /// Container padding.
    pub fn padding(&self) -> Insets {
        self.coordinator.config.padding
    }

    /// Container layout direction.
    pub fn layout_direction(&self) -> LayoutDirection {
        self.coordinator.config.layout_direction
    }

    /// Rect of any node, in container coordinates.
    pub fn rect(&self, id: ChildId) -> Option<Rect> {
        self.coordinator.rect(id)
    }

    /// Rect of the context's own child.
    pub fn child_rect(&self) -> Rect {
        self.coordinator.rect(self.child).unwrap_or(Rect::ZERO)
    }

    /// Measured size of any node.
    pub fn measured_size(&self, id: ChildId) -> Option<Size> {
        self.coordinator.measured_size(id)
    }

    /// Layout spec of any direct child.
    pub fn spec(&self, id: ChildId) -> Option<&LayoutSpec> {
        self.coordinator.spec(id)
    }

    /// Visibility of any node.
    pub fn visibility(&self, id: ChildId) -> Option<Visibility> {
        self.coordinator.visibility(id)
    }

    /// Whether the node and its ancestors are all visible.
    pub fn is_shown(&self, id: ChildId) -> bool {
        self.coordinator.is_shown(id)
    }

    /// Scrolling flags of any node.
    pub fn flags(&self, id: ChildId) -> NodeFlags {
        self.coordinator.flags(id)
    }

    /// Children the context's child depends on, as of the last measure pass.
    pub fn dependencies(&self) -> &[ChildId] {
        self.coordinator.dependencies(self.child)
    }

    /// Children depending on the context's child, as of the last measure pass.
    pub fn dependents(&self) -> &[ChildId] {
        self.coordinator.dependents(self.child)
    }

    /// Behavior of another child, if it is a `T`.
    pub fn behavior<T: Behavior>(&self, id: ChildId) -> Option<&T> {
        self.coordinator.behavior::<T>(id)
    }

    /// Whether another child carries a behavior of type `T`.
    pub fn has_behavior<T: Behavior>(&self, id: ChildId) -> bool {
        self.behavior::<T>(id).is_some()
    }

    /// Whether `point` lies within the rect of `id`.
    pub fn is_point_in_child_bounds(&self, id: ChildId, point: Point) -> bool {
        self.coordinator.is_point_in_child_bounds(id, point)
    }

    /// First nested-scrolling node in the subtree of `id`, `id` included.
    pub fn find_nested_scrolling_descendant(&self, id: ChildId) -> Option<ChildId> {
        self.coordinator.find_nested_scrolling_descendant(id)
    }

    /// Record the measured size of the context's child.
    pub fn set_measured_size(&mut self, size: Size) {
        if let Some(node) = self.coordinator.node_mut(self.child) {
            node.measured = size;
        }
    }

    /// Measure the context's child the way the container does without a behavior.
    pub fn measure_child_default(&mut self, parent: Constraints, width_used: f64, height_used: f64) {
        self.coordinator
            .measure_child(self.child, parent, width_used, height_used);
    }

    /// Place the context's child the way the container does without a behavior.
    pub fn layout_child_default(&mut self) {
        self.coordinator.layout_child(self.child);
    }

    /// Place the context's child at `rect`, in container coordinates.
    pub fn place_child(&mut self, rect: Rect) {
        if let Some(node) = self.coordinator.node_mut(self.child) {
            node.frame = rect;
        }
    }

    /// Move the context's child vertically.
    pub fn offset_top_and_bottom(&mut self, dy: f64) {
        if dy != 0.0 {
            self.coordinator.offset_node(self.child, Vec2::new(0.0, dy));
        }
    }

    /// Move the context's child horizontally.
    pub fn offset_left_and_right(&mut self, dx: f64) {
        if dx != 0.0 {
            self.coordinator.offset_node(self.child, Vec2::new(dx, 0.0));
        }
    }

    /// Ask for [`Behavior::on_animation_frame`] on the next [`Coordinator::frame`].
    pub fn request_animation_frame(&mut self) {
        self.coordinator.request_animation_frame(self.child);
    }
}
