// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The coordinating container: node arena, child management, and behavior access.

use alloc::{boxed::Box, vec::Vec};
use core::any::Any;
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Insets, Point, Rect, Size, Vec2};

use crate::behavior::{AnimationStatus, Behavior, BehaviorRegistry, ChildKind, SavedState};
use crate::context::BehaviorCtx;
use crate::error::CoordinatorError;
use crate::graph::DependencyGraph;
use crate::nested::NestedScrollSession;
use crate::spec::LayoutSpec;
use crate::types::{ChildId, LayoutDirection, NodeFlags, Visibility};

/// Saved behavior state, keyed by [`LayoutSpec::save_key`].
pub type SavedStates = HashMap<u64, SavedState>;

/// Container-wide configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoordinatorConfig {
    /// Inner padding of the container.
    pub padding: Insets,
    /// Horizontal guideline positions, in logical pixels from the leading edge.
    pub keylines: Vec<f64>,
    /// Direction used to resolve relative gravities and edges.
    pub layout_direction: LayoutDirection,
}

/// Tracking state kept for each direct child.
#[derive(Debug, Default)]
pub(crate) struct ChildSlot {
    pub(crate) spec: LayoutSpec,
    /// Anchor seen by the last measure pass.
    pub(crate) resolved_anchor: Option<ChildId>,
    /// Direct child containing `resolved_anchor`.
    pub(crate) anchor_direct: Option<ChildId>,
    /// Rect recorded by the last change notification.
    pub(crate) last_rect: Option<Rect>,
    /// Offset applied while dodging inset edges.
    pub(crate) inset_offset: Vec2,
    pub(crate) did_block: bool,
    pub(crate) nested_accepted: bool,
    pub(crate) changed_after_nested: bool,
}

#[derive(Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) parent: Option<ChildId>,
    pub(crate) children: Vec<ChildId>,
    /// Position relative to the parent node (the container for direct children).
    pub(crate) frame: Rect,
    pub(crate) content_size: Size,
    pub(crate) measured: Size,
    pub(crate) visibility: Visibility,
    pub(crate) flags: NodeFlags,
    pub(crate) z_index: i32,
    /// Present only for direct children.
    pub(crate) slot: Option<Box<ChildSlot>>,
}

impl Node {
    fn new(generation: u32, parent: Option<ChildId>, slot: Option<Box<ChildSlot>>) -> Self {
        Self {
            generation,
            parent,
            children: Vec::new(),
            frame: Rect::ZERO,
            content_size: Size::ZERO,
            measured: Size::ZERO,
            visibility: Visibility::Visible,
            flags: NodeFlags::empty(),
            z_index: 0,
            slot,
        }
    }
}

/// A container whose direct children cooperate through attached [`Behavior`]s.
///
/// The coordinator owns every node's geometry. Direct children carry a [`LayoutSpec`];
/// descendants (added with [`add_descendant`](Self::add_descendant)) model the inner
/// structure a behavior may care about, such as a scrolling list inside a sheet.
///
/// ## Example
///
/// ```rust
/// use kurbo::{Rect, Size};
/// use understory_coordinator::{Coordinator, Gravity, LayoutSpec, Length};
///
/// let mut coordinator = Coordinator::default();
/// let fab = coordinator
///     .add_child(LayoutSpec {
///         width: Length::Fixed(56.0),
///         height: Length::Fixed(56.0),
///         gravity: Gravity::END | Gravity::BOTTOM,
///         ..LayoutSpec::default()
///     })
///     .unwrap();
/// coordinator.layout_pass(Size::new(400.0, 800.0)).unwrap();
/// assert_eq!(coordinator.rect(fab), Some(Rect::new(344.0, 744.0, 400.0, 800.0)));
/// ```
pub struct Coordinator {
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    /// Direct children in insertion order.
    pub(crate) children: Vec<ChildId>,
    /// Direct children in dependency order, rebuilt by each measure pass.
    pub(crate) sorted: Vec<ChildId>,
    pub(crate) graph: DependencyGraph<ChildId>,
    pub(crate) config: CoordinatorConfig,
    pub(crate) size: Size,
    registry: BehaviorRegistry,
    pub(crate) touch_owner: Option<ChildId>,
    pub(crate) disallow_intercept_reset: bool,
    pub(crate) last_pointer_time: u64,
    pub(crate) nested: Option<NestedScrollSession>,
    pub(crate) animating: Vec<ChildId>,
    pub(crate) needs_pre_draw: bool,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Coordinator")
            .field("nodes_alive", &alive)
            .field("children", &self.children.len())
            .field("size", &self.size)
            .field("config", &self.config)
            .field("touch_owner", &self.touch_owner)
            .field("nested", &self.nested)
            .field("animating", &self.animating.len())
            .finish_non_exhaustive()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl Coordinator {
    /// Create an empty container with an empty behavior registry.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_registry(config, BehaviorRegistry::new())
    }

    /// Create an empty container that resolves named behaviors through `registry`.
    pub fn with_registry(config: CoordinatorConfig, registry: BehaviorRegistry) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            children: Vec::new(),
            sorted: Vec::new(),
            graph: DependencyGraph::new(),
            config,
            size: Size::ZERO,
            registry,
            touch_owner: None,
            disallow_intercept_reset: false,
            last_pointer_time: 0,
            nested: None,
            animating: Vec::new(),
            needs_pre_draw: false,
        }
    }

    /// Container configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Mutable container configuration; takes effect on the next layout pass.
    pub fn config_mut(&mut self) -> &mut CoordinatorConfig {
        &mut self.config
    }

    /// The behavior registry.
    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    /// Size resolved by the last measure pass.
    pub fn size(&self) -> Size {
        self.size
    }

    // --- structure ---

    /// Add a direct child.
    ///
    /// If the layout spec carries no behavior but names one through
    /// [`LayoutSpec::behavior_key`], it is instantiated from the registry.
    pub fn add_child(&mut self, spec: LayoutSpec) -> Result<ChildId, CoordinatorError> {
        self.attach_child(spec, None)
    }

    /// Add a direct child of a declared kind, falling back to the kind's default behavior.
    pub fn add_child_of_kind(
        &mut self,
        kind: ChildKind,
        spec: LayoutSpec,
    ) -> Result<ChildId, CoordinatorError> {
        self.attach_child(spec, Some(kind))
    }

    fn attach_child(
        &mut self,
        mut spec: LayoutSpec,
        kind: Option<ChildKind>,
    ) -> Result<ChildId, CoordinatorError> {
        if spec.behavior().is_none() {
            let key = spec
                .behavior_key
                .or_else(|| kind.and_then(|k| self.registry.default_for_kind(k)));
            if let Some(key) = key {
                let behavior = self
                    .registry
                    .create(key)
                    .ok_or(CoordinatorError::UnknownBehavior(key))?;
                spec.set_behavior(Some(behavior));
            }
        }
        let slot = ChildSlot {
            spec,
            ..ChildSlot::default()
        };
        let id = self.alloc(None, Some(Box::new(slot)));
        self.children.push(id);
        tracing::debug!(child = ?id, "child added");
        Ok(id)
    }

    /// Add a descendant node under `parent` (a direct child or another descendant).
    ///
    /// `frame` is relative to the parent.
    pub fn add_descendant(
        &mut self,
        parent: ChildId,
        frame: Rect,
    ) -> Result<ChildId, CoordinatorError> {
        if !self.is_alive(parent) {
            return Err(CoordinatorError::UnknownChild(parent));
        }
        let id = self.alloc(Some(parent), None);
        if let Some(node) = self.node_mut(id) {
            node.frame = frame;
            node.measured = frame.size();
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    fn alloc(&mut self, parent: Option<ChildId>, slot: Option<Box<ChildSlot>>) -> ChildId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, parent, slot));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ChildId indices are 32-bit."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, parent, slot)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ChildId indices are 32-bit."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        ChildId::new(idx, generation)
    }

    /// Remove a node and its subtree.
    ///
    /// Removing a direct child first notifies the behaviors that depend on it, then detaches
    /// its behavior. Returns `false` if `id` was not live.
    pub fn remove(&mut self, id: ChildId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let direct = self.is_direct_child(id);
        if direct {
            self.notify_child_removed(id);
        }

        let mut subtree = Vec::new();
        self.collect_subtree(id, &mut subtree);
        if self.touch_owner.is_some_and(|o| subtree.contains(&o)) {
            self.touch_owner = None;
        }
        if self
            .nested
            .is_some_and(|s| subtree.contains(&s.direct_child) || subtree.contains(&s.target))
        {
            tracing::debug!(child = ?id, "nested scroll session dropped with its target");
            self.nested = None;
        }
        self.animating.retain(|a| !subtree.contains(a));

        if direct {
            self.children.retain(|c| *c != id);
            self.sorted.retain(|c| *c != id);
            self.graph.remove_node(&id);
            if let Some(slot) = self.slot_mut(id) {
                slot.spec.set_behavior(None);
            }
        } else if let Some(parent) = self.node(id).and_then(|n| n.parent)
            && let Some(p) = self.node_mut(parent)
        {
            p.children.retain(|c| *c != id);
        }

        for node in subtree {
            self.nodes[node.idx()] = None;
            self.free_list.push(node.idx());
        }
        tracing::debug!(child = ?id, "node removed");
        true
    }

    fn collect_subtree(&self, id: ChildId, out: &mut Vec<ChildId>) {
        out.push(id);
        if let Some(node) = self.node(id) {
            for &child in &node.children {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Whether `id` names a live node.
    pub fn is_alive(&self, id: ChildId) -> bool {
        self.node(id).is_some()
    }

    /// Whether `id` is a live direct child.
    pub fn is_direct_child(&self, id: ChildId) -> bool {
        self.slot(id).is_some()
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> &[ChildId] {
        &self.children
    }

    /// Children of any node, in insertion order.
    pub fn children_of(&self, id: ChildId) -> &[ChildId] {
        self.node(id).map_or(&[][..], |n| n.children.as_slice())
    }

    /// Parent of a descendant; `None` for direct children.
    pub fn parent_of(&self, id: ChildId) -> Option<ChildId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Direct child whose subtree contains `id` (which may be `id` itself).
    pub fn direct_child_of(&self, id: ChildId) -> Option<ChildId> {
        let mut current = id;
        loop {
            let node = self.node(current)?;
            match node.parent {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }

    /// Direct children in the order of the last measure pass (dependencies first).
    pub fn dependency_order(&self) -> &[ChildId] {
        &self.sorted
    }

    /// Direct children that `id` depends on, as of the last measure pass.
    pub fn dependencies(&self, id: ChildId) -> &[ChildId] {
        self.graph.outgoing_edges(&id)
    }

    /// Direct children that depend on `id`, as of the last measure pass.
    pub fn dependents(&self, id: ChildId) -> &[ChildId] {
        self.graph.incoming_edges(&id)
    }

    // --- node properties ---

    /// Layout spec of a direct child.
    pub fn spec(&self, id: ChildId) -> Option<&LayoutSpec> {
        self.slot(id).map(|s| &s.spec)
    }

    /// Mutable layout spec of a direct child; changes apply on the next layout pass.
    ///
    /// Changing the anchor between [`measure`](Self::measure) and
    /// [`layout`](Self::layout) is a configuration error.
    pub fn spec_mut(&mut self, id: ChildId) -> Option<&mut LayoutSpec> {
        self.slot_mut(id).map(|s| &mut s.spec)
    }

    /// Position of a node in container coordinates.
    pub fn rect(&self, id: ChildId) -> Option<Rect> {
        let node = self.node(id)?;
        let mut rect = node.frame;
        let mut parent = node.parent;
        while let Some(p) = parent {
            let pn = self.node(p)?;
            rect = rect + pn.frame.origin().to_vec2();
            parent = pn.parent;
        }
        Some(rect)
    }

    /// Set the frame of a descendant, relative to its parent.
    ///
    /// Direct children are positioned by the container and are not accepted here.
    pub fn set_descendant_frame(&mut self, id: ChildId, frame: Rect) -> bool {
        match self.node_mut(id) {
            Some(node) if node.parent.is_some() => {
                node.frame = frame;
                node.measured = frame.size();
                true
            }
            _ => false,
        }
    }

    /// Size measured by the last measure pass.
    pub fn measured_size(&self, id: ChildId) -> Option<Size> {
        self.node(id).map(|n| n.measured)
    }

    /// Intrinsic size used by default measurement.
    pub fn set_content_size(&mut self, id: ChildId, size: Size) {
        if let Some(node) = self.node_mut(id) {
            node.content_size = size;
        }
    }

    /// Visibility of a node.
    pub fn visibility(&self, id: ChildId) -> Option<Visibility> {
        self.node(id).map(|n| n.visibility)
    }

    /// Set the visibility of a node.
    pub fn set_visibility(&mut self, id: ChildId, visibility: Visibility) {
        if let Some(node) = self.node_mut(id) {
            node.visibility = visibility;
        }
    }

    /// Whether the node and all of its ancestors are visible.
    pub fn is_shown(&self, id: ChildId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.node(c) {
                Some(n) if n.visibility == Visibility::Visible => current = n.parent,
                _ => return false,
            }
        }
        true
    }

    /// Scrolling flags of a node; empty if not live.
    pub fn flags(&self, id: ChildId) -> NodeFlags {
        self.node(id).map_or(NodeFlags::empty(), |n| n.flags)
    }

    /// Replace the scrolling flags of a node.
    pub fn set_flags(&mut self, id: ChildId, flags: NodeFlags) {
        if let Some(node) = self.node_mut(id) {
            node.flags = flags;
        }
    }

    /// Elevation of a node; higher is in front.
    pub fn z_index(&self, id: ChildId) -> Option<i32> {
        self.node(id).map(|n| n.z_index)
    }

    /// Set the elevation of a node.
    pub fn set_z_index(&mut self, id: ChildId, z: i32) {
        if let Some(node) = self.node_mut(id) {
            node.z_index = z;
        }
    }

    /// Whether `point` (container coordinates) lies within the node's rect.
    pub fn is_point_in_child_bounds(&self, id: ChildId, point: Point) -> bool {
        self.rect(id).is_some_and(|r| r.contains(point))
    }

    /// First node in `id`'s subtree (pre-order, `id` included) flagged
    /// [`NodeFlags::NESTED_SCROLLING`].
    pub fn find_nested_scrolling_descendant(&self, id: ChildId) -> Option<ChildId> {
        let node = self.node(id)?;
        if node.flags.contains(NodeFlags::NESTED_SCROLLING) {
            return Some(id);
        }
        node.children
            .iter()
            .find_map(|&c| self.find_nested_scrolling_descendant(c))
    }

    // --- behaviors ---

    /// The behavior of a direct child, if it has one of type `T`.
    pub fn behavior<T: Behavior>(&self, id: ChildId) -> Option<&T> {
        let behavior: &dyn Behavior = self.slot(id)?.spec.behavior()?;
        let any: &dyn Any = behavior;
        any.downcast_ref::<T>()
    }

    /// Run `f` with the behavior of `id` (if it is a `T`) and a context for its child.
    ///
    /// This is how hosts drive behavior APIs that move the child, for example expanding a
    /// sheet.
    pub fn with_behavior<T: Behavior, R>(
        &mut self,
        id: ChildId,
        f: impl FnOnce(&mut T, &mut BehaviorCtx<'_>) -> R,
    ) -> Option<R> {
        self.call_behavior(id, |behavior, ctx| {
            let any: &mut dyn Any = behavior;
            any.downcast_mut::<T>().map(|b| f(b, ctx))
        })
        .flatten()
    }

    /// Take the behavior of `id` out of its slot while `f` runs with a context for `id`.
    pub(crate) fn call_behavior<R>(
        &mut self,
        id: ChildId,
        f: impl FnOnce(&mut dyn Behavior, &mut BehaviorCtx<'_>) -> R,
    ) -> Option<R> {
        let mut behavior = self.slot_mut(id)?.spec.take_behavior()?;
        let result = f(&mut *behavior, &mut BehaviorCtx::new(self, id));
        if let Some(slot) = self.slot_mut(id) {
            slot.spec.put_behavior(behavior);
        }
        Some(result)
    }

    // --- frame clock ---

    /// Advance every requested animation by `dt_ms`, then run the pre-draw notification.
    pub fn frame(&mut self, dt_ms: f64) {
        let ticking = core::mem::take(&mut self.animating);
        for id in ticking {
            let status = self.call_behavior(id, |b, ctx| b.on_animation_frame(ctx, dt_ms));
            if status == Some(AnimationStatus::Running) && !self.animating.contains(&id) {
                self.animating.push(id);
            }
        }
        self.pre_draw();
    }

    /// Whether any behavior asked for another frame.
    pub fn is_animating(&self) -> bool {
        !self.animating.is_empty()
    }

    pub(crate) fn request_animation_frame(&mut self, id: ChildId) {
        if !self.animating.contains(&id) {
            self.animating.push(id);
        }
    }

    // --- saved state ---

    /// Collect saved state from every behavior whose child has a [`LayoutSpec::save_key`].
    pub fn save_state(&mut self) -> SavedStates {
        let mut out = SavedStates::new();
        for id in self.children.clone() {
            let Some(key) = self.spec(id).and_then(|s| s.save_key) else {
                continue;
            };
            if let Some(Some(state)) = self.call_behavior(id, |b, ctx| b.save_state(ctx)) {
                out.insert(key, state);
            }
        }
        out
    }

    /// Hand saved state back to the behaviors of children with matching save keys.
    ///
    /// Entries without a matching child are dropped.
    pub fn restore_state(&mut self, mut states: SavedStates) {
        for id in self.children.clone() {
            let Some(key) = self.spec(id).and_then(|s| s.save_key) else {
                continue;
            };
            if let Some(state) = states.remove(&key) {
                self.call_behavior(id, |b, ctx| b.restore_state(ctx, state));
            }
        }
    }

    // --- internals ---

    pub(crate) fn node(&self, id: ChildId) -> Option<&Node> {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .filter(|n| n.generation == id.1)
    }

    pub(crate) fn node_mut(&mut self, id: ChildId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|n| n.as_mut())
            .filter(|n| n.generation == id.1)
    }

    pub(crate) fn slot(&self, id: ChildId) -> Option<&ChildSlot> {
        self.node(id).and_then(|n| n.slot.as_deref())
    }

    pub(crate) fn slot_mut(&mut self, id: ChildId) -> Option<&mut ChildSlot> {
        self.node_mut(id).and_then(|n| n.slot.as_deref_mut())
    }

    /// Move a node's frame by `delta`.
    pub(crate) fn offset_node(&mut self, id: ChildId, delta: Vec2) {
        if let Some(node) = self.node_mut(id) {
            node.frame = node.frame + delta;
        }
    }
}
