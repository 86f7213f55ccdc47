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

//! Per-list command buffers
//!
//! The tile accelerator wants each display list's commands delivered as
//! one contiguous DMA stream, but an application interleaves opaque,
//! punch-through, and translucent draws freely. So every header and
//! vertex record is appended to the buffer of whichever list the current
//! context targets, and at scene end the buffers are DMA'd out in the
//! fixed hardware list order.
//!
//! All appends are whole 32-byte hardware blocks. A list that somehow
//! ends up misaligned or implausibly large is dropped with a logged
//! error rather than fed to the DMA engine; the other lists still
//! flush.

use crate::core::backend::{TileAccelerator, DMA_BLOCK};
use crate::core::context::ListKind;
use crate::core::error::{TaError, TaResult};

/// Per-list ceiling; a frame bigger than this is a runaway, not a scene
pub const LIST_BYTES_SANITY: usize = 6 * 1024 * 1024;

/// Command stream staging for all five hardware lists
#[derive(Debug, Default)]
pub struct CommandBuffers {
    buffers: [Vec<u8>; ListKind::COUNT],
    target: ListKind,
}

impl CommandBuffers {
    pub fn new() -> CommandBuffers {
        CommandBuffers::default()
    }

    /// List that subsequent appends go to
    pub fn target(&self) -> ListKind {
        self.target
    }

    /// Route subsequent appends to `list`
    pub fn select(&mut self, list: ListKind) {
        self.target = list;
    }

    /// Append one 32-byte block to the target list
    #[inline]
    pub fn push_block(&mut self, block: &[u8; DMA_BLOCK]) {
        self.buffers[self.target.index()].extend_from_slice(block);
    }

    /// Append whole blocks of raw command data to the target list
    ///
    /// # Panics
    ///
    /// Panics if `data` is not a multiple of the hardware block size;
    /// a partial block would corrupt every record after it.
    pub fn push_bytes(&mut self, data: &[u8]) {
        assert!(
            data.len() % DMA_BLOCK == 0,
            "command data must be whole 32-byte blocks, got {} bytes",
            data.len()
        );
        self.buffers[self.target.index()].extend_from_slice(data);
    }

    /// Write position (bytes) of the target list
    pub fn position(&self) -> usize {
        self.buffers[self.target.index()].len()
    }

    /// Rewind the target list to an earlier position
    ///
    /// # Panics
    ///
    /// Panics if `pos` is past the current position or not block
    /// aligned.
    pub fn rewind(&mut self, pos: usize) {
        let buf = &mut self.buffers[self.target.index()];
        assert!(pos <= buf.len() && pos % DMA_BLOCK == 0);
        buf.truncate(pos);
    }

    /// Bytes staged for one list
    pub fn list_bytes(&self, list: ListKind) -> usize {
        self.buffers[list.index()].len()
    }

    /// Staged contents of one list
    pub fn list_data(&self, list: ListKind) -> &[u8] {
        &self.buffers[list.index()]
    }

    /// Whether any list has staged data
    pub fn is_empty(&self) -> bool {
        self.buffers.iter().all(Vec::is_empty)
    }

    /// Drop all staged data without submitting
    ///
    /// # Panics
    ///
    /// Panics if a DMA transfer is still in flight; its source buffer
    /// must not be recycled under it.
    pub fn clear<B: TileAccelerator>(&mut self, ta: &B) {
        assert!(ta.dma_ready(), "clearing command buffers during DMA");
        for buf in &mut self.buffers {
            buf.clear();
        }
    }

    /// Submit every non-empty list in hardware order, then clear
    ///
    /// A list failing its sanity checks is logged and skipped; the
    /// remaining lists still go out. The first error encountered is
    /// returned after all lists have been attempted.
    pub fn flush<B: TileAccelerator>(&mut self, ta: &mut B) -> TaResult<()> {
        let mut first_err = None;
        for list in ListKind::ALL {
            let data = &self.buffers[list.index()];
            if data.is_empty() {
                continue;
            }
            if let Err(e) = Self::submit_list(ta, list, data) {
                log::error!("list {:?} submit failed: {e}", list);
                first_err.get_or_insert(e);
            }
        }
        ta.wait_dma();
        for buf in &mut self.buffers {
            buf.clear();
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn submit_list<B: TileAccelerator>(
        ta: &mut B,
        list: ListKind,
        data: &[u8],
    ) -> TaResult<()> {
        if data.len() % DMA_BLOCK != 0 || data.len() > LIST_BYTES_SANITY {
            return Err(TaError::DmaLoad {
                list: list.index(),
                len: data.len(),
            });
        }
        ta.list_begin(list)?;
        let result = ta.dma_load(list, data);
        // always close the list, even if the transfer was refused
        let finish = ta.list_finish(list);
        result.and(finish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::ReferenceTa;

    fn block(tag: u8) -> [u8; DMA_BLOCK] {
        [tag; DMA_BLOCK]
    }

    #[test]
    fn appends_route_to_selected_list() {
        let mut cb = CommandBuffers::new();
        cb.push_block(&block(1));
        cb.select(ListKind::PunchThrough);
        cb.push_block(&block(2));
        cb.push_block(&block(3));
        assert_eq!(cb.list_bytes(ListKind::OpaquePoly), 32);
        assert_eq!(cb.list_bytes(ListKind::PunchThrough), 64);
        assert_eq!(cb.list_bytes(ListKind::BlendPoly), 0);
    }

    #[test]
    fn rewind_discards_tail() {
        let mut cb = CommandBuffers::new();
        cb.push_block(&block(1));
        let mark = cb.position();
        cb.push_block(&block(2));
        cb.push_block(&block(3));
        cb.rewind(mark);
        assert_eq!(cb.position(), 32);
    }

    #[test]
    #[should_panic]
    fn partial_block_append_panics() {
        let mut cb = CommandBuffers::new();
        cb.push_bytes(&[0u8; 16]);
    }

    #[test]
    fn flush_submits_in_hardware_order_and_clears() {
        let mut cb = CommandBuffers::new();
        let mut ta = ReferenceTa::new();
        ta.scene_begin().unwrap();
        cb.select(ListKind::BlendPoly);
        cb.push_block(&block(0xBB));
        cb.select(ListKind::OpaquePoly);
        cb.push_block(&block(0xAA));
        cb.flush(&mut ta).unwrap();
        ta.scene_finish().unwrap();

        let scene = ta.last_scene().unwrap();
        assert_eq!(scene.lists[ListKind::OpaquePoly.index()], vec![0xAA; 32]);
        assert_eq!(scene.lists[ListKind::BlendPoly.index()], vec![0xBB; 32]);
        assert!(scene.lists[ListKind::PunchThrough.index()].is_empty());
        assert!(cb.is_empty());
    }

    #[test]
    fn oversized_list_is_skipped_not_submitted() {
        let mut cb = CommandBuffers::new();
        let mut ta = ReferenceTa::new();
        ta.scene_begin().unwrap();
        cb.select(ListKind::OpaquePoly);
        cb.push_bytes(&vec![0u8; LIST_BYTES_SANITY + DMA_BLOCK]);
        cb.select(ListKind::PunchThrough);
        cb.push_block(&block(0xCC));
        assert!(cb.flush(&mut ta).is_err());
        ta.scene_finish().unwrap();

        // the good list still went out
        let scene = ta.last_scene().unwrap();
        assert!(scene.lists[ListKind::OpaquePoly.index()].is_empty());
        assert_eq!(scene.lists[ListKind::PunchThrough.index()].len(), 32);
        assert!(cb.is_empty());
    }
}
