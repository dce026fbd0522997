// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration errors raised by the coordinator.

use crate::behavior::BehaviorKey;
use crate::types::ChildId;

/// A configuration error that prevents the container from producing a consistent layout.
///
/// These are raised immediately and never retried; the container has no fallback layout
/// for an inconsistent configuration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// The dependency graph between children contains a cycle.
    #[error("dependency graph contains a cycle")]
    DependencyCycle,
    /// A child's anchor does not name a live descendant.
    #[error("anchor {anchor:?} of child {child:?} is not a descendant of the container")]
    AnchorNotFound {
        /// Anchored child.
        child: ChildId,
        /// Missing anchor.
        anchor: ChildId,
    },
    /// A child names itself as its anchor.
    #[error("child {0:?} cannot be anchored to itself")]
    AnchorIsSelf(ChildId),
    /// A child's anchor lies inside that child's own subtree.
    #[error("anchor {anchor:?} must not be a descendant of the anchored child {child:?}")]
    AnchorInsideChild {
        /// Anchored child.
        child: ChildId,
        /// Offending anchor.
        anchor: ChildId,
    },
    /// The anchor of a child changed after measurement began and before layout finished.
    #[error("anchor of child {0:?} changed between measure and layout")]
    AnchorChangedDuringLayout(ChildId),
    /// A keyline index is outside the configured keylines.
    #[error("keyline {index} of child {child:?} is out of range ({count} keylines)")]
    KeylineOutOfRange {
        /// Child declaring the keyline.
        child: ChildId,
        /// Requested index.
        index: usize,
        /// Number of configured keylines.
        count: usize,
    },
    /// A behavior key is not present in the registry.
    #[error("no behavior registered for key {0:?}")]
    UnknownBehavior(BehaviorKey),
    /// An identifier does not name a live node (or a direct child where one is required).
    #[error("{0:?} is not a live child of the container")]
    UnknownChild(ChildId),
}
