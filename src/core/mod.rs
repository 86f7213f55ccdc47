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

//! Core rendering pipeline components
//!
//! - [`context`]: packed 32-byte polygon headers and their bit fields
//! - [`matrix`]: GL-style matrix stacks and the cached screen transform
//! - [`state`]: logical render state and its hardware encoding
//! - [`prim`]: immediate-mode vertex assembly, clipping, and emission
//! - [`cmdbuf`]: per-list command buffering and DMA submission
//! - [`texture`]: texture objects, twiddled uploads, and mipmapping
//! - [`backend`]: the tile accelerator abstraction and VRAM arena
//! - [`system`]: the [`RenderContext`](system::RenderContext) tying it
//!   all together

pub mod backend;
pub mod cmdbuf;
pub mod context;
pub mod error;
pub mod matrix;
pub mod prim;
pub mod state;
pub mod system;
pub mod texture;
