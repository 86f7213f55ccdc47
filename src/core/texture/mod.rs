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

//! Texture objects, naming, upload, and descriptor application
//!
//! A fixed pool of texture objects is addressed through GL-style
//! integer names. Small names map directly into the name table; larger
//! or aliased names fall back to a top-down linear scan. Name 0 is a
//! built-in default texture that can never be deleted, and deleting a
//! bound texture rebinds it.
//!
//! Uploads convert client pixels to the packed 16-bit hardware formats
//! and store them twiddled (see [`morton`]). Mip chains live
//! smallest-level-first at the fixed offsets [`format`] computes; a
//! texture first imaged without mipmaps is migrated in place when a
//! chain is added later.
//!
//! [`TexturePool::apply`] merges the bound texture's descriptor fields
//! into the current context header through a bit-select mask, touching
//! nothing the texture does not own.

pub mod format;
pub mod morton;

use crate::core::backend::VideoMemory;
use crate::core::context::{PixelFormat, SizeClass, TextureFilter, UvControl};
use crate::core::error::GlError;
use crate::core::state::{Caps, StateEncoder};

use self::format::{Storage, UploadFormat, UploadType};
use self::morton::MortonOrder;

/// Texture object pool capacity
pub const MAX_TEXTURES: usize = 200;
/// Texture name table capacity
pub const MAX_NAMES: usize = 1000;

/// Minification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

/// Magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagFilter {
    Nearest,
    Linear,
}

/// Per-axis wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    Clamp,
}

/// One texture object
#[derive(Debug, Clone)]
pub struct Texture {
    name: u32,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    storage: Storage,
    twiddled: bool,
    compressed: bool,
    /// Bitmask of uploaded mip levels, bit 0 = largest
    levels: u32,
    /// Allocation includes space for a full mip chain
    mip_capable: bool,
    vram_offset: usize,
    vram_bytes: usize,
    min_filter: MinFilter,
    mag_filter: MagFilter,
    wrap_s: WrapMode,
    wrap_t: WrapMode,
}

impl Texture {
    fn new(name: u32) -> Texture {
        Texture {
            name,
            width: 0,
            height: 0,
            pixel_format: PixelFormat::Argb1555,
            storage: Storage::Direct16,
            twiddled: true,
            compressed: false,
            levels: 0,
            mip_capable: false,
            vram_offset: 0,
            vram_bytes: 0,
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Linear,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
        }
    }

    pub fn name(&self) -> u32 {
        self.name
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn has_storage(&self) -> bool {
        self.vram_bytes != 0
    }

    fn top_log2(&self) -> u32 {
        self.width.trailing_zeros()
    }

    /// Whether every level of the chain has been uploaded
    fn mip_complete(&self) -> bool {
        self.mip_capable
            && self.levels == format::full_level_mask(format::level_count(self.width))
    }

    /// VRAM byte offset of one mip level's payload
    fn level_payload_offset(&self, level: u32) -> usize {
        let inner = if self.mip_capable {
            self.storage.level_offset(self.top_log2(), level)
        } else {
            0
        };
        self.vram_offset + self.storage.header_bytes() + inner
    }

    fn release(&mut self, vram: &mut VideoMemory) {
        if self.has_storage() {
            vram.release(self.vram_offset, self.vram_bytes);
            self.vram_bytes = 0;
            self.levels = 0;
            self.mip_capable = false;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct NameEntry {
    name: u32,
    slot: usize,
}

/// The texture pool, name table, and current binding
#[derive(Debug)]
pub struct TexturePool {
    slots: Vec<Option<Texture>>,
    names: Vec<Option<NameEntry>>,
    bound: usize,
    next_name: u32,
}

impl TexturePool {
    /// Build the pool and its default texture (an 8x8 opaque white)
    pub fn new(vram: &mut VideoMemory) -> TexturePool {
        let mut pool = TexturePool {
            slots: vec![None; MAX_TEXTURES],
            names: vec![None; MAX_NAMES],
            bound: 0,
            next_name: 1,
        };
        let mut default = Texture::new(0);
        default.width = 8;
        default.height = 8;
        let bytes = Storage::Direct16.total_bytes(8, 8, false);
        // the arena is empty here, this cannot fail
        let offset = vram.alloc(bytes).expect("default texture allocation");
        for word in vram.words_mut(offset, bytes) {
            *word = 0xFFFF;
        }
        default.vram_offset = offset;
        default.vram_bytes = bytes;
        default.levels = 1;
        pool.slots[0] = Some(default);
        pool.names[0] = Some(NameEntry { name: 0, slot: 0 });
        pool
    }

    // --- name management ---

    /// Name table index holding `name`, if it exists: direct index
    /// first, top-down linear scan as the fallback
    fn entry_index(&self, name: u32) -> Option<usize> {
        let direct = name as usize;
        if direct < MAX_NAMES
            && matches!(&self.names[direct], Some(e) if e.name == name)
        {
            return Some(direct);
        }
        (1..MAX_NAMES)
            .rev()
            .find(|&i| matches!(&self.names[i], Some(e) if e.name == name))
    }

    /// Name table index where `name` can be created
    fn free_index_for(&self, name: u32) -> Option<usize> {
        let direct = name as usize;
        if direct < MAX_NAMES {
            return self.names[direct].is_none().then_some(direct);
        }
        (1..MAX_NAMES).rev().find(|&i| self.names[i].is_none())
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Reserve `count` unused texture names
    pub fn gen(&mut self, count: usize) -> Vec<u32> {
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let name = self.next_name;
            self.next_name = self.next_name.wrapping_add(1).max(1);
            if self.entry_index(name).is_none() && !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    pub fn is_texture(&self, name: u32) -> bool {
        self.entry_index(name).is_some()
    }

    /// Bind `name`, creating the texture object on first use
    pub fn bind(&mut self, name: u32, state: &mut StateEncoder) -> Result<(), GlError> {
        let slot = match self.entry_index(name) {
            Some(entry) => self.names[entry].as_ref().map(|e| e.slot).unwrap_or(0),
            None => {
                let entry = self.free_index_for(name).ok_or(GlError::OutOfMemory)?;
                let slot = self.free_slot().ok_or(GlError::OutOfMemory)?;
                self.slots[slot] = Some(Texture::new(name));
                self.names[entry] = Some(NameEntry { name, slot });
                slot
            }
        };
        self.bound = slot;
        self.apply(state);
        Ok(())
    }

    /// Delete textures, rebinding the default texture where needed
    pub fn delete(&mut self, names: &[u32], vram: &mut VideoMemory, state: &mut StateEncoder) {
        for &name in names {
            if name == 0 {
                // the default texture is permanent
                continue;
            }
            let Some(entry) = self.entry_index(name) else {
                continue;
            };
            let slot = self.names[entry].map(|e| e.slot).unwrap_or(0);
            if let Some(tex) = self.slots[slot].as_mut() {
                tex.release(vram);
            }
            self.slots[slot] = None;
            self.names[entry] = None;
            if self.bound == slot {
                self.bound = 0;
                self.apply(state);
            }
        }
    }

    /// Name of the currently bound texture
    pub fn bound_name(&self) -> u32 {
        self.bound_tex().map(|t| t.name).unwrap_or(0)
    }

    fn bound_tex(&self) -> Option<&Texture> {
        self.slots[self.bound].as_ref()
    }

    fn bound_tex_mut(&mut self) -> &mut Texture {
        // slot 0 always holds the default texture
        self.slots[self.bound]
            .as_mut()
            .expect("bound slot holds a texture")
    }

    // --- image specification ---

    /// Upload one mip level, converting and twiddling client pixels
    pub fn tex_image_2d(
        &mut self,
        level: u32,
        internal: PixelFormat,
        width: u32,
        height: u32,
        border: u32,
        fmt: UploadFormat,
        ty: UploadType,
        data: &[u8],
        vram: &mut VideoMemory,
        state: &mut StateEncoder,
    ) -> Result<(), GlError> {
        if level >= 11 || width == 0 || height == 0 {
            return Err(GlError::InvalidValue);
        }
        // the 8..=1024 range applies to the base level; higher levels
        // shrink below it
        let base_w = width << level;
        let base_h = height << level;
        format::check_dimensions(base_w, base_h, border)?;
        if level > 0 && base_w != base_h {
            // mip chains are square-only
            return Err(GlError::InvalidValue);
        }
        let pixel_bytes = format::upload_pixel_bytes(fmt, ty)?;
        if data.len() < (width * height) as usize * pixel_bytes {
            return Err(GlError::InvalidValue);
        }
        if !matches!(
            internal,
            PixelFormat::Argb1555 | PixelFormat::Rgb565 | PixelFormat::Argb4444
        ) {
            return Err(GlError::InvalidEnum);
        }

        self.prepare_storage(base_w, base_h, internal, level > 0, vram)?;

        let tex = self.bound_tex_mut();
        let offset = tex.level_payload_offset(level);
        let order = MortonOrder::new(width, height);
        let dst = vram.words_mut(offset, (width * height) as usize * 2);
        for y in 0..height {
            for x in 0..width {
                let src = ((y * width + x) as usize) * pixel_bytes;
                let rgba = format::read_rgba8(&data[src..], fmt, ty);
                dst[order.index(x, y) as usize] = format::pack_texel(internal, rgba);
            }
        }
        let tex = self.bound_tex_mut();
        tex.levels |= 1 << level;
        self.apply(state);
        Ok(())
    }

    /// Replace a sub-rectangle of an existing level
    pub fn tex_sub_image_2d(
        &mut self,
        level: u32,
        x0: u32,
        y0: u32,
        width: u32,
        height: u32,
        fmt: UploadFormat,
        ty: UploadType,
        data: &[u8],
        vram: &mut VideoMemory,
    ) -> Result<(), GlError> {
        let pixel_bytes = format::upload_pixel_bytes(fmt, ty)?;
        let tex = self.bound_tex_mut();
        if !tex.has_storage() || tex.levels & (1 << level) == 0 {
            return Err(GlError::InvalidOperation);
        }
        let (lw, lh) = (tex.width >> level, tex.height >> level);
        if x0 + width > lw || y0 + height > lh {
            return Err(GlError::InvalidValue);
        }
        if data.len() < (width * height) as usize * pixel_bytes {
            return Err(GlError::InvalidValue);
        }
        if tex.storage != Storage::Direct16 {
            return Err(GlError::InvalidOperation);
        }
        let internal = tex.pixel_format;
        let offset = tex.level_payload_offset(level);
        let order = MortonOrder::new(lw, lh);
        let dst = vram.words_mut(offset, (lw * lh) as usize * 2);
        // row-major source walked against twiddled destination by
        // incremental stepping
        let mut row_start = order.index(x0, y0);
        for y in 0..height {
            let mut m = row_start;
            for x in 0..width {
                let src = ((y * width + x) as usize) * pixel_bytes;
                let rgba = format::read_rgba8(&data[src..], fmt, ty);
                dst[m as usize] = format::pack_texel(internal, rgba);
                if x + 1 < width {
                    m = order.inc_x(m);
                }
            }
            if y + 1 < height {
                row_start = order.inc_y(row_start);
            }
        }
        Ok(())
    }

    /// Upload a pre-packed texture image (VQ or pre-twiddled 16-bit)
    pub fn compressed_tex_image_2d(
        &mut self,
        internal: PixelFormat,
        width: u32,
        height: u32,
        vq: bool,
        mipmapped: bool,
        data: &[u8],
        vram: &mut VideoMemory,
        state: &mut StateEncoder,
    ) -> Result<(), GlError> {
        format::check_dimensions(width, height, 0)?;
        if mipmapped && width != height {
            return Err(GlError::InvalidValue);
        }
        let storage = Storage::of(internal, vq);
        let expected = storage.total_bytes(width, height, mipmapped);
        if data.len() != expected {
            return Err(GlError::InvalidValue);
        }

        let tex = self.bound_tex_mut();
        tex.release(vram);
        let offset = vram.alloc(expected).ok_or(GlError::OutOfMemory)?;
        let words = vram.words_mut(offset, expected);
        for (w, chunk) in words.iter_mut().zip(data.chunks_exact(2)) {
            *w = u16::from_le_bytes([chunk[0], chunk[1]]);
        }

        let tex = self.bound_tex_mut();
        tex.width = width;
        tex.height = height;
        tex.pixel_format = internal;
        tex.storage = storage;
        tex.compressed = vq;
        tex.twiddled = true;
        tex.mip_capable = mipmapped;
        tex.vram_offset = offset;
        tex.vram_bytes = expected;
        tex.levels = if mipmapped {
            format::full_level_mask(format::level_count(width))
        } else {
            1
        };
        self.apply(state);
        Ok(())
    }

    /// Ensure the bound texture has storage matching the base-level
    /// shape, reallocating (or migrating to a mip-capable layout) as
    /// needed
    fn prepare_storage(
        &mut self,
        base_w: u32,
        base_h: u32,
        internal: PixelFormat,
        need_mips: bool,
        vram: &mut VideoMemory,
    ) -> Result<(), GlError> {
        let tex = self.bound_tex_mut();
        let shape_matches = tex.has_storage()
            && tex.width == base_w
            && tex.height == base_h
            && tex.pixel_format == internal
            && tex.storage == Storage::Direct16
            && !tex.compressed;
        if !shape_matches {
            tex.release(vram);
            let mip = need_mips;
            let bytes = Storage::Direct16.total_bytes(base_w, base_h, mip);
            let offset = vram.alloc(bytes).ok_or(GlError::OutOfMemory)?;
            tex.width = base_w;
            tex.height = base_h;
            tex.pixel_format = internal;
            tex.storage = Storage::Direct16;
            tex.compressed = false;
            tex.twiddled = true;
            tex.mip_capable = mip;
            tex.vram_offset = offset;
            tex.vram_bytes = bytes;
            tex.levels = 0;
            return Ok(());
        }
        if need_mips && !tex.mip_capable {
            self.migrate_to_mip_layout(vram)?;
        }
        Ok(())
    }

    /// Give a flat-allocated texture room for a mip chain, preserving
    /// its level 0 data
    fn migrate_to_mip_layout(&mut self, vram: &mut VideoMemory) -> Result<(), GlError> {
        let tex = self.bound_tex_mut();
        debug_assert!(!tex.mip_capable && tex.width == tex.height);
        let needed = tex.storage.total_bytes(tex.width, tex.height, true);
        let level0_words = (tex.width * tex.height) as usize;
        let shift_words = tex.storage.level_offset(tex.top_log2(), 0) / 2;

        if tex.vram_bytes >= needed {
            // enough room already: shift level 0 up in place, copying
            // backward so the overlapping ranges do not clobber
            let (offset, bytes) = (tex.vram_offset, tex.vram_bytes);
            let words = vram.words_mut(offset, bytes);
            for i in (0..level0_words).rev() {
                words[shift_words + i] = words[i];
            }
        } else {
            let old_offset = tex.vram_offset;
            let old_bytes = tex.vram_bytes;
            let new_offset = vram.alloc(needed).ok_or(GlError::OutOfMemory)?;
            let level0: Vec<u16> = vram.words(old_offset, level0_words * 2).to_vec();
            vram.words_mut(new_offset, needed)[shift_words..shift_words + level0_words]
                .copy_from_slice(&level0);
            vram.release(old_offset, old_bytes);
            let tex = self.bound_tex_mut();
            tex.vram_offset = new_offset;
            tex.vram_bytes = needed;
        }
        self.bound_tex_mut().mip_capable = true;
        Ok(())
    }

    // --- parameters ---

    pub fn set_min_filter(&mut self, f: MinFilter, state: &mut StateEncoder) {
        self.bound_tex_mut().min_filter = f;
        self.apply(state);
    }

    pub fn set_mag_filter(&mut self, f: MagFilter, state: &mut StateEncoder) {
        self.bound_tex_mut().mag_filter = f;
        self.apply(state);
    }

    pub fn set_wrap_s(&mut self, w: WrapMode, state: &mut StateEncoder) {
        self.bound_tex_mut().wrap_s = w;
        self.apply(state);
    }

    pub fn set_wrap_t(&mut self, w: WrapMode, state: &mut StateEncoder) {
        self.bound_tex_mut().wrap_t = w;
        self.apply(state);
    }

    // --- mipmap generation ---

    /// Derive the full mip chain from level 0 with a 2x2 box filter
    ///
    /// Square direct-color textures only. In twiddled order a 2x2
    /// block of one level is four consecutive texels, so each level is
    /// produced by a single linear pass over the previous one.
    pub fn generate_mipmap(
        &mut self,
        vram: &mut VideoMemory,
        state: &mut StateEncoder,
    ) -> Result<(), GlError> {
        let tex = self.bound_tex_mut();
        if !tex.has_storage() || tex.levels & 1 == 0 {
            return Err(GlError::InvalidOperation);
        }
        if tex.width != tex.height || tex.storage != Storage::Direct16 {
            return Err(GlError::InvalidOperation);
        }
        let pixel_format = tex.pixel_format;
        if format::box_filter(pixel_format, [0; 4]).is_none() {
            return Err(GlError::InvalidOperation);
        }
        if !tex.mip_capable {
            self.migrate_to_mip_layout(vram)?;
        }

        let tex = self.bound_tex_mut();
        let top = tex.top_log2();
        let (base_offset, base_bytes) = (tex.vram_offset, tex.vram_bytes);
        let offsets: Vec<usize> = (0..=top)
            .map(|lvl| tex.level_payload_offset(lvl) - base_offset)
            .collect();

        let words = vram.words_mut(base_offset, base_bytes);
        for level in 1..=top {
            let dim = (tex.width >> level) as usize;
            let src_base = offsets[level as usize - 1] / 2;
            let dst_base = offsets[level as usize] / 2;
            for i in 0..dim * dim {
                let block = [
                    words[src_base + 4 * i],
                    words[src_base + 4 * i + 1],
                    words[src_base + 4 * i + 2],
                    words[src_base + 4 * i + 3],
                ];
                // filterability checked above
                words[dst_base + i] = format::box_filter(pixel_format, block)
                    .unwrap_or(block[0]);
            }
        }
        let tex = self.bound_tex_mut();
        tex.levels = format::full_level_mask(format::level_count(tex.width));
        self.apply(state);
        Ok(())
    }

    // --- descriptor application ---

    /// Fold the bound texture into the context header
    ///
    /// Only the texture-owned fields move: the tex word, the UV size,
    /// filter, wrap, and bias fields of mode2, and the textured bit of
    /// cmd. Everything else belongs to the state encoder.
    pub fn apply(&self, state: &mut StateEncoder) {
        use crate::core::context::MipmapBias;

        const MODE2_MASK: u32 = (3 << 17) | (3 << 15) | (3 << 13) | (0xF << 8) | (7 << 3) | 7;

        let enabled = state.is_enabled(Caps::TEXTURE_2D);
        let Some(tex) = self.bound_tex().filter(|t| t.has_storage()) else {
            let ctx = state.context_mut();
            if ctx.textured() {
                ctx.set_textured(false);
                state.mark_dirty();
            }
            return;
        };

        let mut desired = crate::core::context::Submodes::default();
        desired.set_uv_size(
            SizeClass::from_pixels(tex.width),
            SizeClass::from_pixels(tex.height),
        );
        desired.set_filter(self.hardware_filter(tex));
        desired.set_uv_flip(Self::flip_control(tex));
        desired.set_uv_clamp(Self::clamp_control(tex));
        desired.set_mipmap_bias(MipmapBias::B1_00);
        desired.set_texture(
            tex.vram_offset as u32,
            SizeClass::from_pixels(tex.width),
            SizeClass::from_pixels(tex.height),
            tex.pixel_format,
            tex.twiddled,
            tex.mip_complete(),
            tex.compressed,
        );

        let ctx = state.context_mut();
        let mode2 = bitselect(ctx.modes.mode2, desired.mode2, MODE2_MASK);
        // an unchanged descriptor must not re-dirty the header
        if ctx.modes.mode2 == mode2 && ctx.modes.tex == desired.tex && ctx.textured() == enabled {
            return;
        }
        ctx.modes.mode2 = mode2;
        ctx.modes.tex = desired.tex;
        ctx.set_textured(enabled);
        state.mark_dirty();
    }

    fn hardware_filter(&self, tex: &Texture) -> TextureFilter {
        if tex.mip_complete() && tex.min_filter == MinFilter::LinearMipmapLinear {
            TextureFilter::TrilinearFirst
        } else if tex.mag_filter == MagFilter::Nearest {
            TextureFilter::Point
        } else {
            TextureFilter::Bilinear
        }
    }

    fn flip_control(tex: &Texture) -> UvControl {
        let mut c = UvControl::None;
        if tex.wrap_s == WrapMode::MirroredRepeat {
            c = c.with_u();
        }
        if tex.wrap_t == WrapMode::MirroredRepeat {
            c = c.with_v();
        }
        c
    }

    fn clamp_control(tex: &Texture) -> UvControl {
        let mut c = UvControl::None;
        if tex.wrap_s == WrapMode::Clamp {
            c = c.with_u();
        }
        if tex.wrap_t == WrapMode::Clamp {
            c = c.with_v();
        }
        c
    }
}

/// Replace the masked bits of `dst` with those of `src`
#[inline(always)]
fn bitselect(dst: u32, src: u32, mask: u32) -> u32 {
    (dst & !mask) | (src & mask)
}
