// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the coordinator: node identifiers, flags, and measurement constraints.

/// Identifier for a node owned by a [`Coordinator`](crate::Coordinator) (generational).
///
/// Direct children and their descendants share one arena, so a `ChildId` may name either.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ChildId(pub(crate) u32, pub(crate) u32);

impl ChildId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Visibility of a node.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Visibility {
    /// Drawn, measured, and laid out.
    #[default]
    Visible,
    /// Measured and laid out but not drawn.
    Invisible,
    /// Takes no space; skipped by measurement, layout, and pre-draw updates.
    Gone,
}

/// Horizontal layout direction, used to resolve relative edges and gravities.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum LayoutDirection {
    /// Left to right.
    #[default]
    Ltr,
    /// Right to left.
    Rtl,
}

impl LayoutDirection {
    /// Returns `true` for [`LayoutDirection::Rtl`].
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Rtl)
    }
}

bitflags::bitflags! {
    /// Per-node flags describing scrolling capabilities.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is a scrolling view that takes part in nested scrolling.
        const NESTED_SCROLLING = 0b0000_0001;
        /// Node's own content is scrolled away from its top, so it can still scroll up.
        const CAN_SCROLL_UP    = 0b0000_0010;
    }
}

bitflags::bitflags! {
    /// Scroll axes of a nested scroll session.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Axes: u8 {
        /// Horizontal scrolling.
        const HORIZONTAL = 0b01;
        /// Vertical scrolling.
        const VERTICAL   = 0b10;
    }
}

bitflags::bitflags! {
    /// Container edges, used by inset and dodge declarations.
    ///
    /// `START` and `END` are relative and resolve against a [`LayoutDirection`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Edges: u8 {
        /// Left edge.
        const LEFT   = 0b0000_0001;
        /// Top edge.
        const TOP    = 0b0000_0010;
        /// Right edge.
        const RIGHT  = 0b0000_0100;
        /// Bottom edge.
        const BOTTOM = 0b0000_1000;
        /// Leading edge (left in LTR).
        const START  = 0b0001_0000;
        /// Trailing edge (right in LTR).
        const END    = 0b0010_0000;
    }
}

impl Edges {
    /// Replace `START` and `END` with absolute edges for `direction`.
    pub fn resolve(self, direction: LayoutDirection) -> Self {
        let mut out = self.difference(Self::START | Self::END);
        let (start, end) = match direction {
            LayoutDirection::Ltr => (Self::LEFT, Self::RIGHT),
            LayoutDirection::Rtl => (Self::RIGHT, Self::LEFT),
        };
        if self.contains(Self::START) {
            out |= start;
        }
        if self.contains(Self::END) {
            out |= end;
        }
        out
    }
}

/// Requested extent of a child along one axis.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Length {
    /// An exact size in logical pixels.
    Fixed(f64),
    /// Fill the space the container offers.
    MatchParent,
    /// Size to the child's content.
    #[default]
    WrapContent,
}

/// How a [`Constraint`] limits a measured extent.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SizeMode {
    /// The result must be exactly `size`.
    Exact,
    /// The result may be anything up to `size`.
    AtMost,
    /// No limit; `size` is only a hint.
    #[default]
    Unbounded,
}

/// One-axis measurement constraint.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Constraint {
    /// Limit mode.
    pub mode: SizeMode,
    /// Limit size (ignored for [`SizeMode::Unbounded`] except as a hint).
    pub size: f64,
}

impl Constraint {
    /// An exact constraint.
    pub const fn exact(size: f64) -> Self {
        Self {
            mode: SizeMode::Exact,
            size,
        }
    }

    /// An upper bound.
    pub const fn at_most(size: f64) -> Self {
        Self {
            mode: SizeMode::AtMost,
            size,
        }
    }

    /// No constraint.
    pub const fn unbounded() -> Self {
        Self {
            mode: SizeMode::Unbounded,
            size: 0.0,
        }
    }

    /// Resolve a desired extent against this constraint.
    pub fn resolve(self, desired: f64) -> f64 {
        match self.mode {
            SizeMode::Exact => self.size,
            SizeMode::AtMost => desired.min(self.size),
            SizeMode::Unbounded => desired,
        }
    }

    /// Derive the constraint for a child from this (parent) constraint.
    ///
    /// `used` is space already taken by padding, margins, and other claims along this axis.
    pub fn for_child(self, used: f64, length: Length) -> Self {
        let available = (self.size - used).max(0.0);
        match (length, self.mode) {
            (Length::Fixed(size), _) => Self::exact(size.max(0.0)),
            (Length::MatchParent, SizeMode::Exact) => Self::exact(available),
            (Length::MatchParent | Length::WrapContent, SizeMode::AtMost | SizeMode::Exact) => {
                Self::at_most(available)
            }
            (Length::MatchParent | Length::WrapContent, SizeMode::Unbounded) => Self {
                mode: SizeMode::Unbounded,
                size: available,
            },
        }
    }
}

/// Two-axis measurement constraints.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Constraints {
    /// Horizontal constraint.
    pub width: Constraint,
    /// Vertical constraint.
    pub height: Constraint,
}

impl Constraints {
    /// Exact constraints for a known size.
    pub const fn exact(size: kurbo::Size) -> Self {
        Self {
            width: Constraint::exact(size.width),
            height: Constraint::exact(size.height),
        }
    }

    /// Resolve a desired size against both axes.
    pub fn resolve(self, desired: kurbo::Size) -> kurbo::Size {
        kurbo::Size::new(
            self.width.resolve(desired.width),
            self.height.resolve(desired.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_edges_resolve_per_direction() {
        let edges = Edges::START | Edges::BOTTOM;
        assert_eq!(edges.resolve(LayoutDirection::Ltr), Edges::LEFT | Edges::BOTTOM);
        assert_eq!(edges.resolve(LayoutDirection::Rtl), Edges::RIGHT | Edges::BOTTOM);
    }

    #[test]
    fn child_constraint_follows_parent_mode() {
        let parent = Constraint::exact(300.0);
        assert_eq!(
            parent.for_child(20.0, Length::MatchParent),
            Constraint::exact(280.0)
        );
        assert_eq!(
            parent.for_child(20.0, Length::WrapContent),
            Constraint::at_most(280.0)
        );
        assert_eq!(
            Constraint::unbounded().for_child(0.0, Length::Fixed(42.0)),
            Constraint::exact(42.0)
        );
        assert_eq!(
            Constraint::unbounded()
                .for_child(10.0, Length::WrapContent)
                .mode,
            SizeMode::Unbounded
        );
    }

    #[test]
    fn resolve_clamps_only_when_bounded() {
        assert_eq!(Constraint::at_most(50.0).resolve(80.0), 50.0);
        assert_eq!(Constraint::at_most(50.0).resolve(30.0), 30.0);
        assert_eq!(Constraint::unbounded().resolve(80.0), 80.0);
        assert_eq!(Constraint::exact(10.0).resolve(80.0), 10.0);
    }
}
