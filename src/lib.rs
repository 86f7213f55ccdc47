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

//! pvrgl: an immediate-mode GL subset for PowerVR-class tile
//! accelerators
//!
//! This crate implements the fixed-function rendering pipeline of a
//! Dreamcast-style tile accelerator: matrix stacks, near-plane
//! clipping, packed polygon headers, per-list command buffering, and
//! twiddled texture management.
//!
//! # Architecture
//!
//! Everything hangs off one [`core::system::RenderContext`] built over
//! a [`core::backend::TileAccelerator`] backend. Draw calls accumulate
//! 32-byte-aligned command blocks into five display-list buffers;
//! closing the scene DMAs each non-empty list to the hardware in its
//! fixed order.
//!
//! # Example
//!
//! ```
//! use pvrgl::core::backend::ReferenceTa;
//! use pvrgl::core::prim::Topology;
//! use pvrgl::RenderContext;
//!
//! let mut gl = RenderContext::new(ReferenceTa::new(), false);
//! gl.begin_scene()?;
//! gl.begin(Topology::Triangles);
//! gl.vertex3(-1.0, -1.0, 0.0);
//! gl.vertex3(1.0, -1.0, 0.0);
//! gl.vertex3(0.0, 1.0, 0.0);
//! gl.end();
//! gl.end_scene()?;
//! # Ok::<(), pvrgl::core::error::TaError>(())
//! ```
//!
//! # Modules
//!
//! - [`core::context`]: polygon header bit fields
//! - [`core::matrix`]: transform stacks
//! - [`core::state`]: render state encoding and list routing
//! - [`core::prim`]: vertex assembly and clipping
//! - [`core::cmdbuf`]: display-list buffering
//! - [`core::texture`]: texture pool, Morton addressing, mipmaps
//! - [`core::backend`]: hardware abstraction plus a recording software
//!   implementation for tests
//!
//! # Error Handling
//!
//! Usage errors latch into the context following the `glGetError`
//! model ([`core::error::GlError`]); submission failures surface as
//! [`core::error::TaResult`] from the scene bracketing calls.

pub mod core;

// Re-export commonly used types
pub use core::error::{GlError, TaError, TaResult};
pub use core::system::RenderContext;
