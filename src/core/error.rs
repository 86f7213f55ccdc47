// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 pvrgl contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types
//!
//! Failures are split into three tiers, matching how the hardware is
//! actually used:
//!
//! - [`GlError`]: usage errors (bad enum, bad call sequence, bad range).
//!   These latch into a sticky [`ErrorLatch`] and the offending call
//!   becomes a no-op; the caller's program keeps running.
//! - [`TaError`]: tile-accelerator submission failures. These are logged
//!   and the current frame continues with the next independent unit of
//!   work (one bad list must not block the others).
//! - Invariant violations (command-buffer overflow, misaligned store-queue
//!   destination, unsupported format combinations) panic, because the
//!   alternative on real hardware is silent corruption of GPU state.

use thiserror::Error;

/// OpenGL-style usage error codes
///
/// Raised by API misuse: unknown enums, out-of-range values, calls made
/// in the wrong bracket. They never abort the calling program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GlError {
    /// An enumerant was not one of the accepted values
    #[error("invalid enum")]
    InvalidEnum,

    /// A numeric argument was out of range
    #[error("invalid value")]
    InvalidValue,

    /// The call is not allowed in the current state
    #[error("invalid operation")]
    InvalidOperation,

    /// A matrix stack push exceeded the stack's maximum depth
    #[error("stack overflow")]
    StackOverflow,

    /// A matrix stack pop was attempted at the stack base
    #[error("stack underflow")]
    StackUnderflow,

    /// A video-memory allocation failed
    #[error("out of memory")]
    OutOfMemory,
}

/// Tile-accelerator submission failures
///
/// Non-zero status from the list/scene/DMA layer. Callers log these and
/// move on to the next list or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaError {
    /// `list_begin` refused the list (wrong scene phase, list reopened)
    #[error("list {0} could not be opened")]
    ListBegin(usize),

    /// `list_finish` reported an error closing the active list
    #[error("list {0} could not be closed")]
    ListFinish(usize),

    /// The DMA engine rejected the transfer
    #[error("DMA load of {len} bytes for list {list} failed")]
    DmaLoad { list: usize, len: usize },

    /// Scene begin/finish handshake failed
    #[error("scene handshake failed")]
    Scene,
}

/// Result alias for tile-accelerator operations
pub type TaResult<T> = Result<T, TaError>;

/// Sticky first-error latch
///
/// Mirrors the `glGetError` model: the first error recorded since the
/// last [`take`](ErrorLatch::take) wins, later errors are dropped until
/// the latch is cleared. A deliberate policy, not a bug.
#[derive(Debug, Default)]
pub struct ErrorLatch {
    first: Option<GlError>,
}

impl ErrorLatch {
    /// Create a clear latch
    pub fn new() -> Self {
        Self { first: None }
    }

    /// Record an error; ignored if one is already latched
    pub fn record(&mut self, error: GlError) {
        if self.first.is_none() {
            log::debug!("usage error latched: {}", error);
            self.first = Some(error);
        } else {
            log::trace!("usage error dropped (latch occupied): {}", error);
        }
    }

    /// Return the latched error, if any, and clear the latch
    pub fn take(&mut self) -> Option<GlError> {
        self.first.take()
    }

    /// Peek without clearing (used by tests)
    pub fn peek(&self) -> Option<GlError> {
        self.first
    }
}
