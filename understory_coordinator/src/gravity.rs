// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gravity flags and placement of a sized box within a container rectangle.

use kurbo::{Rect, Size};

use crate::types::LayoutDirection;

bitflags::bitflags! {
    /// Placement of a child within (or, for anchors, around) a reference rectangle.
    ///
    /// At most one horizontal and one vertical component is meaningful. `START`/`END`
    /// are relative and resolve against a [`LayoutDirection`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Gravity: u16 {
        /// Align to the left edge.
        const LEFT              = 0x0001;
        /// Align to the right edge.
        const RIGHT             = 0x0002;
        /// Center horizontally.
        const CENTER_HORIZONTAL = 0x0004;
        /// Align to the leading edge.
        const START             = 0x0008;
        /// Align to the trailing edge.
        const END               = 0x0010;
        /// Align to the top edge.
        const TOP               = 0x0100;
        /// Align to the bottom edge.
        const BOTTOM            = 0x0200;
        /// Center vertically.
        const CENTER_VERTICAL   = 0x0400;
        /// Center on both axes.
        const CENTER = Self::CENTER_HORIZONTAL.bits() | Self::CENTER_VERTICAL.bits();
    }
}

/// Alignment along one axis after resolving a [`Gravity`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Align {
    /// Left or top.
    Min,
    /// Centered.
    Center,
    /// Right or bottom.
    Max,
}

impl Gravity {
    const HORIZONTAL: Self = Self::LEFT
        .union(Self::RIGHT)
        .union(Self::CENTER_HORIZONTAL)
        .union(Self::START)
        .union(Self::END);
    const VERTICAL: Self = Self::TOP
        .union(Self::BOTTOM)
        .union(Self::CENTER_VERTICAL);

    /// Replace `START` and `END` with `LEFT`/`RIGHT` for `direction`.
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

    /// Whether any horizontal component is set.
    pub fn has_horizontal(self) -> bool {
        self.intersects(Self::HORIZONTAL)
    }

    /// Whether any vertical component is set.
    pub fn has_vertical(self) -> bool {
        self.intersects(Self::VERTICAL)
    }

    /// Horizontal alignment of a resolved gravity, if any.
    pub fn horizontal(self) -> Option<Align> {
        if self.contains(Self::CENTER_HORIZONTAL) {
            Some(Align::Center)
        } else if self.contains(Self::RIGHT) {
            Some(Align::Max)
        } else if self.contains(Self::LEFT) {
            Some(Align::Min)
        } else {
            None
        }
    }

    /// Vertical alignment, if any.
    pub fn vertical(self) -> Option<Align> {
        if self.contains(Self::CENTER_VERTICAL) {
            Some(Align::Center)
        } else if self.contains(Self::BOTTOM) {
            Some(Align::Max)
        } else if self.contains(Self::TOP) {
            Some(Align::Min)
        } else {
            None
        }
    }

    /// Fill in missing components: `START` when there is no horizontal one, `TOP` when
    /// there is no vertical one.
    pub fn or_start_top(self) -> Self {
        let mut out = self;
        if !out.has_horizontal() {
            out |= Self::START;
        }
        if !out.has_vertical() {
            out |= Self::TOP;
        }
        out
    }

    /// Place a box of `size` inside `container`, resolving relative components first.
    ///
    /// Missing components align to the left and top.
    pub fn apply(self, size: Size, container: Rect, direction: LayoutDirection) -> Rect {
        let g = self.resolve(direction);
        let x = match g.horizontal() {
            Some(Align::Center) => container.x0 + (container.width() - size.width) / 2.0,
            Some(Align::Max) => container.x1 - size.width,
            Some(Align::Min) | None => container.x0,
        };
        let y = match g.vertical() {
            Some(Align::Center) => container.y0 + (container.height() - size.height) / 2.0,
            Some(Align::Max) => container.y1 - size.height,
            Some(Align::Min) | None => container.y0,
        };
        Rect::from_origin_size((x, y), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_end_follow_direction() {
        let g = Gravity::START | Gravity::BOTTOM;
        assert_eq!(g.resolve(LayoutDirection::Ltr), Gravity::LEFT | Gravity::BOTTOM);
        assert_eq!(g.resolve(LayoutDirection::Rtl), Gravity::RIGHT | Gravity::BOTTOM);
        assert_eq!(
            Gravity::END.resolve(LayoutDirection::Rtl).horizontal(),
            Some(Align::Min)
        );
    }

    #[test]
    fn apply_places_within_container() {
        let container = Rect::new(10.0, 20.0, 110.0, 220.0);
        let size = Size::new(20.0, 40.0);
        assert_eq!(
            Gravity::CENTER.apply(size, container, LayoutDirection::Ltr),
            Rect::new(50.0, 100.0, 70.0, 140.0)
        );
        assert_eq!(
            (Gravity::END | Gravity::BOTTOM).apply(size, container, LayoutDirection::Ltr),
            Rect::new(90.0, 180.0, 110.0, 220.0)
        );
        assert_eq!(
            Gravity::empty().apply(size, container, LayoutDirection::Ltr),
            Rect::new(10.0, 20.0, 30.0, 60.0)
        );
    }

    #[test]
    fn defaults_fill_only_missing_axes() {
        assert_eq!(
            Gravity::BOTTOM.or_start_top(),
            Gravity::BOTTOM | Gravity::START
        );
        assert_eq!(Gravity::empty().or_start_top(), Gravity::START | Gravity::TOP);
    }
}
