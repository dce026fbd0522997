// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-child layout configuration.

use alloc::boxed::Box;
use core::fmt;

use kurbo::Insets;

use crate::behavior::{Behavior, BehaviorKey};
use crate::gravity::Gravity;
use crate::types::{ChildId, Edges, LayoutDirection, Length};

/// Holder of the behavior attached to a [`LayoutSpec`].
///
/// Putting a behavior into a slot attaches it ([`Behavior::on_attached`]); replacing it or
/// dropping the slot detaches it ([`Behavior::on_detached`]).
#[derive(Default)]
pub struct BehaviorSlot(Option<Box<dyn Behavior>>);

impl fmt::Debug for BehaviorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BehaviorSlot")
            .field(&self.0.is_some())
            .finish()
    }
}

impl Drop for BehaviorSlot {
    fn drop(&mut self) {
        if let Some(behavior) = self.0.as_mut() {
            behavior.on_detached();
        }
    }
}

impl BehaviorSlot {
    /// A slot holding `behavior`, attached.
    pub fn new(behavior: impl Behavior) -> Self {
        Self::from_box(Box::new(behavior))
    }

    /// A slot holding an already boxed behavior, attached.
    pub fn from_box(mut behavior: Box<dyn Behavior>) -> Self {
        behavior.on_attached();
        Self(Some(behavior))
    }

    /// The held behavior.
    pub fn get(&self) -> Option<&dyn Behavior> {
        self.0.as_deref()
    }

    /// Whether the slot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Swap in `behavior`, detaching and returning the previous one.
    pub fn replace(&mut self, behavior: Option<Box<dyn Behavior>>) -> Option<Box<dyn Behavior>> {
        let mut old = core::mem::replace(&mut self.0, behavior);
        if let Some(old) = old.as_mut() {
            old.on_detached();
        }
        if let Some(new) = self.0.as_mut() {
            new.on_attached();
        }
        old
    }

    fn take(&mut self) -> Option<Box<dyn Behavior>> {
        self.0.take()
    }

    fn put(&mut self, behavior: Box<dyn Behavior>) {
        debug_assert!(
            self.0.is_none(),
            "behavior slot refilled while a callback was running"
        );
        self.0 = Some(behavior);
    }
}

/// Layout configuration of a direct child, including its attached [`Behavior`].
///
/// ```rust
/// use understory_coordinator::{Edges, Gravity, LayoutSpec, Length};
///
/// let spec = LayoutSpec {
///     width: Length::Fixed(56.0),
///     height: Length::Fixed(56.0),
///     gravity: Gravity::END | Gravity::BOTTOM,
///     dodge_inset_edges: Edges::BOTTOM,
///     ..LayoutSpec::default()
/// };
/// assert!(spec.behavior().is_none());
/// ```
#[derive(Debug, Default)]
pub struct LayoutSpec {
    /// Requested width.
    pub width: Length,
    /// Requested height.
    pub height: Length,
    /// Outer margins.
    pub margins: Insets,
    /// Placement within the container, or around the anchor when anchored.
    pub gravity: Gravity,
    /// Descendant this child is positioned against.
    pub anchor: Option<ChildId>,
    /// Point on the anchor the child is positioned relative to.
    pub anchor_gravity: Gravity,
    /// Index into the container's keylines.
    pub keyline: Option<usize>,
    /// Edges of the container this child insets others from.
    pub inset_edge: Edges,
    /// Edges along which this child dodges insetting children.
    pub dodge_inset_edges: Edges,
    /// Registered behavior to instantiate when the child is attached, if none is set.
    pub behavior_key: Option<BehaviorKey>,
    /// Stable identifier of the child's saved-state slot.
    pub save_key: Option<u64>,
    /// The attached behavior.
    pub behavior_slot: BehaviorSlot,
}

impl LayoutSpec {
    /// A spec with `behavior` attached.
    pub fn with_behavior(behavior: impl Behavior) -> Self {
        Self {
            behavior_slot: BehaviorSlot::new(behavior),
            ..Self::default()
        }
    }

    /// The attached behavior.
    pub fn behavior(&self) -> Option<&dyn Behavior> {
        self.behavior_slot.get()
    }

    /// Attach `behavior`, detaching and returning the previous one.
    pub fn set_behavior(
        &mut self,
        behavior: Option<Box<dyn Behavior>>,
    ) -> Option<Box<dyn Behavior>> {
        self.behavior_slot.replace(behavior)
    }

    /// Whether this child dodges a child that insets `inset_edge`.
    ///
    /// All of the other child's inset edges must be covered by this child's dodge edges,
    /// after both are resolved for `direction`.
    pub(crate) fn dodges(&self, inset_edge: Edges, direction: LayoutDirection) -> bool {
        let inset = inset_edge.resolve(direction);
        !inset.is_empty() && self.dodge_inset_edges.resolve(direction).contains(inset)
    }

    /// Borrow the behavior out while a callback runs; no attach or detach happens.
    pub(crate) fn take_behavior(&mut self) -> Option<Box<dyn Behavior>> {
        self.behavior_slot.take()
    }

    pub(crate) fn put_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.behavior_slot.put(behavior);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;

    struct Tracked(Rc<Cell<(u32, u32)>>);

    impl Behavior for Tracked {
        fn on_attached(&mut self) {
            let (a, d) = self.0.get();
            self.0.set((a + 1, d));
        }

        fn on_detached(&mut self) {
            let (a, d) = self.0.get();
            self.0.set((a, d + 1));
        }
    }

    #[test]
    fn reassigning_detaches_previous_behavior() {
        let first = Rc::new(Cell::new((0, 0)));
        let second = Rc::new(Cell::new((0, 0)));
        let mut spec = LayoutSpec::with_behavior(Tracked(first.clone()));
        assert_eq!(first.get(), (1, 0));

        let old = spec.set_behavior(Some(Box::new(Tracked(second.clone()))));
        assert!(old.is_some());
        assert_eq!(first.get(), (1, 1));
        assert_eq!(second.get(), (1, 0));

        spec.set_behavior(None);
        assert_eq!(second.get(), (1, 1));
        assert!(spec.behavior().is_none());
    }

    #[test]
    fn dropping_spec_detaches_behavior() {
        let state = Rc::new(Cell::new((0, 0)));
        let spec = LayoutSpec {
            keyline: Some(0),
            ..LayoutSpec::with_behavior(Tracked(state.clone()))
        };
        assert_eq!(state.get(), (1, 0));
        drop(spec);
        assert_eq!(state.get(), (1, 1));
    }

    #[test]
    fn dodge_requires_full_edge_cover() {
        let ltr = LayoutDirection::Ltr;
        let spec = LayoutSpec {
            dodge_inset_edges: Edges::BOTTOM | Edges::END,
            ..LayoutSpec::default()
        };
        assert!(spec.dodges(Edges::BOTTOM, ltr));
        assert!(spec.dodges(Edges::RIGHT, ltr));
        assert!(spec.dodges(Edges::LEFT, LayoutDirection::Rtl));
        assert!(!spec.dodges(Edges::BOTTOM | Edges::LEFT, ltr));
        assert!(!spec.dodges(Edges::empty(), ltr));
    }
}
