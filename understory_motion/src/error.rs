// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised by motion behavior APIs.

use crate::sheet::SheetState;

/// A request the behavior cannot honor in its current configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MotionError {
    /// The state cannot be requested directly, or is not allowed by the configuration
    /// (for example [`SheetState::Hidden`] on a sheet that is not hideable).
    #[error("illegal state request: {0:?}")]
    IllegalState(SheetState),
}
