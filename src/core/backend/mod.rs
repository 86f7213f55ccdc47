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

//! Tile accelerator backend
//!
//! [`TileAccelerator`] is the seam between the renderer and the actual
//! hardware: scene/list bracketing, DMA transfer of command data, and
//! video memory. [`ReferenceTa`] is a faithful software stand-in that
//! records everything pushed at it, used by the test suite and by hosts
//! without the real chip.
//!
//! Video memory for textures is managed by [`VideoMemory`], a first-fit
//! allocator over a flat 16-bit-word arena. Texture addresses handed to
//! the context descriptor are byte offsets into this arena (8-byte
//! aligned, since the descriptor drops the low three address bits).

use crate::core::context::ListKind;
use crate::core::error::{TaError, TaResult};

/// Hardware DMA transfer granularity in bytes
pub const DMA_BLOCK: usize = 32;

/// Shape of the hardware fog attenuation table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FogCurve {
    Exp { density: f32 },
    Exp2 { density: f32 },
    Linear { start: f32, end: f32 },
}

/// Scene bracketing, list submission, and VRAM for one PVR-like device
///
/// Implementations must tolerate `list_begin`/`list_finish` pairs in
/// the fixed order of [`ListKind::ALL`]; empty lists are skipped by the
/// caller.
pub trait TileAccelerator {
    /// Begin a new scene (frame)
    fn scene_begin(&mut self) -> TaResult<()>;

    /// Finish the scene; the hardware starts rendering after this
    fn scene_finish(&mut self) -> TaResult<()>;

    /// Open one display list for command intake
    fn list_begin(&mut self, list: ListKind) -> TaResult<()>;

    /// Close the currently open display list
    fn list_finish(&mut self, list: ListKind) -> TaResult<()>;

    /// Queue a DMA transfer of command data into the open list
    ///
    /// `data.len()` must be a multiple of [`DMA_BLOCK`].
    fn dma_load(&mut self, list: ListKind, data: &[u8]) -> TaResult<()>;

    /// Whether the last queued DMA transfer has completed
    fn dma_ready(&self) -> bool;

    /// Block until the last queued DMA transfer completes
    fn wait_dma(&mut self);

    /// Program the punch-through alpha compare reference (global)
    fn set_alpha_compare(&mut self, reference: f32);

    /// Program the background plane color
    fn set_background(&mut self, rgb: [f32; 3]);

    /// Regenerate the fog table for `curve` with the given far depth
    fn set_fog(&mut self, far_depth: f32, curve: FogCurve);

    /// Program the fog color, a/r/g/b
    fn set_fog_color(&mut self, argb: [f32; 4]);

    /// Texture memory arena
    fn vram(&self) -> &VideoMemory;

    /// Texture memory arena
    fn vram_mut(&mut self) -> &mut VideoMemory;
}

/// One free region of the arena, in 16-bit words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FreeSpan {
    start: usize,
    len: usize,
}

/// First-fit allocator over a flat texture memory arena
///
/// Offsets are in bytes and always 8-byte aligned. Freed spans merge
/// with adjacent free neighbors.
#[derive(Debug, Clone)]
pub struct VideoMemory {
    words: Vec<u16>,
    free: Vec<FreeSpan>,
}

impl VideoMemory {
    /// Allocation granularity in bytes
    pub const ALIGN: usize = 8;

    /// Arena of `bytes` bytes, fully free
    pub fn new(bytes: usize) -> VideoMemory {
        let words = bytes / 2;
        VideoMemory {
            words: vec![0; words],
            free: vec![FreeSpan { start: 0, len: words }],
        }
    }

    /// Total arena size in bytes
    pub fn capacity(&self) -> usize {
        self.words.len() * 2
    }

    /// Bytes currently free (may be fragmented)
    pub fn free_bytes(&self) -> usize {
        self.free.iter().map(|s| s.len * 2).sum()
    }

    /// Allocate `bytes`, returning the byte offset of the block
    pub fn alloc(&mut self, bytes: usize) -> Option<usize> {
        let words = (bytes + Self::ALIGN - 1) / Self::ALIGN * Self::ALIGN / 2;
        let slot = self.free.iter().position(|s| s.len >= words)?;
        let span = &mut self.free[slot];
        let start = span.start;
        span.start += words;
        span.len -= words;
        if span.len == 0 {
            self.free.remove(slot);
        }
        Some(start * 2)
    }

    /// Return a block to the arena
    pub fn release(&mut self, byte_offset: usize, bytes: usize) {
        let words = (bytes + Self::ALIGN - 1) / Self::ALIGN * Self::ALIGN / 2;
        let start = byte_offset / 2;
        debug_assert!(start + words <= self.words.len());
        let at = self
            .free
            .iter()
            .position(|s| s.start > start)
            .unwrap_or(self.free.len());
        self.free.insert(at, FreeSpan { start, len: words });
        // merge with right then left neighbor
        if at + 1 < self.free.len() && self.free[at].start + self.free[at].len == self.free[at + 1].start
        {
            self.free[at].len += self.free[at + 1].len;
            self.free.remove(at + 1);
        }
        if at > 0 && self.free[at - 1].start + self.free[at - 1].len == self.free[at].start {
            self.free[at - 1].len += self.free[at].len;
            self.free.remove(at);
        }
    }

    /// Word view of a byte range
    pub fn words(&self, byte_offset: usize, bytes: usize) -> &[u16] {
        &self.words[byte_offset / 2..byte_offset / 2 + bytes / 2]
    }

    /// Mutable word view of a byte range
    pub fn words_mut(&mut self, byte_offset: usize, bytes: usize) -> &mut [u16] {
        &mut self.words[byte_offset / 2..byte_offset / 2 + bytes / 2]
    }
}

/// What one recorded scene looked like, list by list
#[derive(Debug, Clone, Default)]
pub struct RecordedScene {
    /// Command bytes per list, in submission order
    pub lists: [Vec<u8>; ListKind::COUNT],
    /// Whether scene_finish was seen
    pub finished: bool,
}

/// Recording software tile accelerator
///
/// Enforces the bracketing protocol (scene open before lists, one list
/// open at a time, block-multiple DMA lengths) and keeps every byte it
/// is handed, so tests can assert on the exact command stream.
#[derive(Debug, Default)]
pub struct ReferenceTa {
    vram: VideoMemory,
    scenes: Vec<RecordedScene>,
    scene_open: bool,
    list_open: Option<ListKind>,
    /// Last programmed global registers, for test inspection
    pub alpha_compare: f32,
    pub background: [f32; 3],
    pub fog: Option<(f32, FogCurve)>,
    pub fog_color: [f32; 4],
}

impl ReferenceTa {
    /// Default arena size: 8 MiB of texture memory
    pub const VRAM_BYTES: usize = 8 * 1024 * 1024;

    pub fn new() -> ReferenceTa {
        ReferenceTa::default()
    }

    /// All scenes recorded so far
    pub fn scenes(&self) -> &[RecordedScene] {
        &self.scenes
    }

    /// The most recent scene
    pub fn last_scene(&self) -> Option<&RecordedScene> {
        self.scenes.last()
    }
}

impl Default for VideoMemory {
    fn default() -> VideoMemory {
        VideoMemory::new(ReferenceTa::VRAM_BYTES)
    }
}

impl TileAccelerator for ReferenceTa {
    fn scene_begin(&mut self) -> TaResult<()> {
        if self.scene_open {
            return Err(TaError::Scene);
        }
        self.scene_open = true;
        self.scenes.push(RecordedScene::default());
        Ok(())
    }

    fn scene_finish(&mut self) -> TaResult<()> {
        if !self.scene_open || self.list_open.is_some() {
            return Err(TaError::Scene);
        }
        self.scene_open = false;
        if let Some(scene) = self.scenes.last_mut() {
            scene.finished = true;
        }
        Ok(())
    }

    fn list_begin(&mut self, list: ListKind) -> TaResult<()> {
        if !self.scene_open || self.list_open.is_some() {
            return Err(TaError::ListBegin(list.index()));
        }
        self.list_open = Some(list);
        Ok(())
    }

    fn list_finish(&mut self, list: ListKind) -> TaResult<()> {
        if self.list_open != Some(list) {
            return Err(TaError::ListFinish(list.index()));
        }
        self.list_open = None;
        Ok(())
    }

    fn dma_load(&mut self, list: ListKind, data: &[u8]) -> TaResult<()> {
        if self.list_open != Some(list) || data.len() % DMA_BLOCK != 0 {
            return Err(TaError::DmaLoad {
                list: list.index(),
                len: data.len(),
            });
        }
        let scene = self.scenes.last_mut().ok_or(TaError::Scene)?;
        scene.lists[list.index()].extend_from_slice(data);
        Ok(())
    }

    fn dma_ready(&self) -> bool {
        // software transfers complete synchronously
        true
    }

    fn wait_dma(&mut self) {}

    fn set_alpha_compare(&mut self, reference: f32) {
        self.alpha_compare = reference;
    }

    fn set_background(&mut self, rgb: [f32; 3]) {
        self.background = rgb;
    }

    fn set_fog(&mut self, far_depth: f32, curve: FogCurve) {
        self.fog = Some((far_depth, curve));
    }

    fn set_fog_color(&mut self, argb: [f32; 4]) {
        self.fog_color = argb;
    }

    fn vram(&self) -> &VideoMemory {
        &self.vram
    }

    fn vram_mut(&mut self) -> &mut VideoMemory {
        &mut self.vram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vram_first_fit_reuses_released_blocks() {
        let mut vm = VideoMemory::new(1024);
        let a = vm.alloc(256).unwrap();
        let b = vm.alloc(256).unwrap();
        assert_ne!(a, b);
        vm.release(a, 256);
        let c = vm.alloc(128).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn vram_merges_adjacent_free_spans() {
        let mut vm = VideoMemory::new(1024);
        let a = vm.alloc(256).unwrap();
        let b = vm.alloc(256).unwrap();
        let _c = vm.alloc(256).unwrap();
        vm.release(a, 256);
        vm.release(b, 256);
        // 512 contiguous bytes must be available again
        let d = vm.alloc(512).unwrap();
        assert_eq!(d, a);
    }

    #[test]
    fn vram_alignment_rounds_up() {
        let mut vm = VideoMemory::new(64);
        let a = vm.alloc(3).unwrap();
        let b = vm.alloc(3).unwrap();
        assert_eq!(b - a, VideoMemory::ALIGN);
    }

    #[test]
    fn vram_exhaustion_returns_none() {
        let mut vm = VideoMemory::new(64);
        assert!(vm.alloc(64).is_some());
        assert!(vm.alloc(8).is_none());
    }

    #[test]
    fn protocol_requires_scene_before_list() {
        let mut ta = ReferenceTa::new();
        assert!(ta.list_begin(ListKind::OpaquePoly).is_err());
        ta.scene_begin().unwrap();
        ta.list_begin(ListKind::OpaquePoly).unwrap();
        // only one list open at a time
        assert!(ta.list_begin(ListKind::BlendPoly).is_err());
        // finishing the scene with a list open is a protocol error
        assert!(ta.scene_finish().is_err());
        ta.list_finish(ListKind::OpaquePoly).unwrap();
        ta.scene_finish().unwrap();
    }

    #[test]
    fn dma_rejects_partial_blocks() {
        let mut ta = ReferenceTa::new();
        ta.scene_begin().unwrap();
        ta.list_begin(ListKind::OpaquePoly).unwrap();
        assert!(ta.dma_load(ListKind::OpaquePoly, &[0u8; 31]).is_err());
        ta.dma_load(ListKind::OpaquePoly, &[0u8; 64]).unwrap();
        ta.list_finish(ListKind::OpaquePoly).unwrap();
        ta.scene_finish().unwrap();
        assert_eq!(ta.last_scene().unwrap().lists[0].len(), 64);
        assert!(ta.last_scene().unwrap().finished);
    }
}
