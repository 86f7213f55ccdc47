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

//! Texel formats, layout arithmetic, and filtering helpers
//!
//! Everything here is pure math over the hardware's storage rules:
//!
//! - 16 bits per texel for the direct-color formats, 8 or 4 for the
//!   palette formats, 2 for VQ (one byte indexes a 2x2 block);
//! - a mipmapped texture stores its levels smallest-first at fixed
//!   offsets, so the whole chain is addressed by one table lookup;
//! - VQ textures carry a 2 KiB codebook ahead of the index data.
//!
//! The 2x2 box filter used by mipmap generation works directly on the
//! packed 16-bit texels: each format splits into two channel masks
//! chosen so that four masked values can be summed without the fields
//! bleeding into each other.

use crate::core::context::PixelFormat;
use crate::core::error::GlError;

/// VQ codebook size in bytes (256 entries of four 16-bit texels)
pub const VQ_CODEBOOK_BYTES: usize = 2048;

/// Largest texture dimension the hardware addresses
pub const MAX_DIMENSION: u32 = 1024;
/// Smallest texture dimension the hardware addresses
pub const MIN_DIMENSION: u32 = 8;

/// Byte offset of the mip level with log2 dimension `i` in an
/// uncompressed 16-bit mipmapped texture; the first 6 bytes are the
/// hardware's padding before the 1x1 level
const MIP_OFFSET_16BPP: [u32; 11] = [
    0x6, 0x8, 0x10, 0x30, 0xB0, 0x2B0, 0xAB0, 0x2AB0, 0xAAB0, 0x2AAB0, 0xAAAB0,
];

/// Byte offset (past the codebook) of the mip level with log2
/// dimension `i` in a VQ texture, in index bytes
const MIP_OFFSET_VQ: [u32; 11] = [
    0x0, 0x1, 0x2, 0x6, 0x16, 0x56, 0x156, 0x556, 0x1556, 0x5556, 0x15556,
];

/// Storage layout class of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// One 16-bit word per texel
    Direct16,
    /// One byte per texel, palette-indexed
    Palette8,
    /// Four bits per texel, palette-indexed
    Palette4,
    /// Vector-quantized: codebook plus one index byte per 2x2 block
    Vq,
}

impl Storage {
    pub fn of(format: PixelFormat, compressed: bool) -> Storage {
        if compressed {
            Storage::Vq
        } else {
            match format {
                PixelFormat::Palette8 => Storage::Palette8,
                PixelFormat::Palette4 => Storage::Palette4,
                _ => Storage::Direct16,
            }
        }
    }

    /// Bytes needed for `texels` texels of payload
    pub fn payload_bytes(self, texels: u32) -> usize {
        match self {
            Storage::Direct16 => texels as usize * 2,
            Storage::Palette8 => texels as usize,
            Storage::Palette4 => texels as usize / 2,
            Storage::Vq => texels as usize / 4,
        }
    }

    /// Byte offset of mip level `level` (0 = largest) for a chain
    /// whose top level has log2 dimension `top_log2`
    pub fn level_offset(self, top_log2: u32, level: u32) -> usize {
        let i = (top_log2 - level) as usize;
        match self {
            Storage::Direct16 => MIP_OFFSET_16BPP[i] as usize,
            Storage::Palette8 => (MIP_OFFSET_16BPP[i] / 2) as usize,
            Storage::Palette4 => (MIP_OFFSET_16BPP[i] / 4) as usize,
            Storage::Vq => MIP_OFFSET_VQ[i] as usize,
        }
    }

    /// Fixed leading bytes before the texel payload
    pub fn header_bytes(self) -> usize {
        match self {
            Storage::Vq => VQ_CODEBOOK_BYTES,
            _ => 0,
        }
    }

    /// Total VRAM footprint of a `width` x `height` texture, with or
    /// without a full mip chain (mip chains are square-only)
    pub fn total_bytes(self, width: u32, height: u32, mipmapped: bool) -> usize {
        if mipmapped {
            debug_assert_eq!(width, height);
            let top = width.trailing_zeros();
            self.header_bytes() + self.level_offset(top, 0) + self.payload_bytes(width * height)
        } else {
            self.header_bytes() + self.payload_bytes(width * height)
        }
    }
}

/// Validate one level's dimensions against the hardware rules
pub fn check_dimensions(width: u32, height: u32, border: u32) -> Result<(), GlError> {
    if border != 0 {
        return Err(GlError::InvalidValue);
    }
    if !width.is_power_of_two() || !height.is_power_of_two() {
        return Err(GlError::InvalidValue);
    }
    if width < MIN_DIMENSION
        || height < MIN_DIMENSION
        || width > MAX_DIMENSION
        || height > MAX_DIMENSION
    {
        return Err(GlError::InvalidValue);
    }
    Ok(())
}

/// Number of levels in a full chain topped by a `dim` x `dim` level
#[inline]
pub fn level_count(dim: u32) -> u32 {
    dim.trailing_zeros() + 1
}

/// Bitmask with one bit per level of a full `count`-level chain
#[inline]
pub fn full_level_mask(count: u32) -> u32 {
    0x7FF >> (11 - count)
}

/// Client-side pixel layouts accepted by the upload paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Rgb,
    Rgba,
    Luminance,
}

/// Client-side component types accepted by the upload paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadType {
    UnsignedByte,
    UnsignedShort565,
    UnsignedShort5551,
    UnsignedShort4444,
}

/// Bytes per client-side pixel for a format/type pair
pub fn upload_pixel_bytes(format: UploadFormat, ty: UploadType) -> Result<usize, GlError> {
    match (format, ty) {
        (UploadFormat::Rgb, UploadType::UnsignedByte) => Ok(3),
        (UploadFormat::Rgba, UploadType::UnsignedByte) => Ok(4),
        (UploadFormat::Luminance, UploadType::UnsignedByte) => Ok(1),
        (UploadFormat::Rgb, UploadType::UnsignedShort565) => Ok(2),
        (UploadFormat::Rgba, UploadType::UnsignedShort5551) => Ok(2),
        (UploadFormat::Rgba, UploadType::UnsignedShort4444) => Ok(2),
        _ => Err(GlError::InvalidOperation),
    }
}

/// Decode one client pixel to r/g/b/a bytes
pub fn read_rgba8(data: &[u8], format: UploadFormat, ty: UploadType) -> [u8; 4] {
    match (format, ty) {
        (UploadFormat::Rgb, UploadType::UnsignedByte) => [data[0], data[1], data[2], 0xFF],
        (UploadFormat::Rgba, UploadType::UnsignedByte) => [data[0], data[1], data[2], data[3]],
        (UploadFormat::Luminance, UploadType::UnsignedByte) => {
            [data[0], data[0], data[0], 0xFF]
        }
        (_, UploadType::UnsignedShort565) => {
            let t = u16::from_le_bytes([data[0], data[1]]);
            [
                expand5((t >> 11) as u8 & 0x1F),
                expand6((t >> 5) as u8 & 0x3F),
                expand5(t as u8 & 0x1F),
                0xFF,
            ]
        }
        (_, UploadType::UnsignedShort5551) => {
            let t = u16::from_le_bytes([data[0], data[1]]);
            [
                expand5((t >> 11) as u8 & 0x1F),
                expand5((t >> 6) as u8 & 0x1F),
                expand5((t >> 1) as u8 & 0x1F),
                if t & 1 != 0 { 0xFF } else { 0 },
            ]
        }
        (_, UploadType::UnsignedShort4444) => {
            let t = u16::from_le_bytes([data[0], data[1]]);
            [
                expand4((t >> 12) as u8 & 0xF),
                expand4((t >> 8) as u8 & 0xF),
                expand4((t >> 4) as u8 & 0xF),
                expand4(t as u8 & 0xF),
            ]
        }
    }
}

#[inline]
fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

#[inline]
fn expand6(v: u8) -> u8 {
    (v << 2) | (v >> 4)
}

#[inline]
fn expand4(v: u8) -> u8 {
    (v << 4) | v
}

/// Pack r/g/b/a bytes into one hardware texel
pub fn pack_texel(format: PixelFormat, rgba: [u8; 4]) -> u16 {
    let [r, g, b, a] = rgba;
    match format {
        PixelFormat::Argb1555 => {
            (((a >= 0x80) as u16) << 15)
                | ((r as u16 >> 3) << 10)
                | ((g as u16 >> 3) << 5)
                | (b as u16 >> 3)
        }
        PixelFormat::Rgb565 => {
            ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
        }
        PixelFormat::Argb4444 => {
            ((a as u16 >> 4) << 12)
                | ((r as u16 >> 4) << 8)
                | ((g as u16 >> 4) << 4)
                | (b as u16 >> 4)
        }
        // palette/YUV data is uploaded pre-packed
        _ => u16::from_le_bytes([rgba[0], rgba[1]]),
    }
}

/// Channel-mask pair for summing four packed texels of a format
/// without cross-field carries
fn filter_masks(format: PixelFormat) -> Option<(u16, u16)> {
    match format {
        PixelFormat::Argb1555 => Some((0x83E0, 0x7C1F)),
        PixelFormat::Rgb565 => Some((0x07E0, 0xF81F)),
        PixelFormat::Argb4444 => Some((0xF0F0, 0x0F0F)),
        _ => None,
    }
}

/// Average a 2x2 block of packed texels
///
/// Masked fields are summed in 32 bits and divided by four in place;
/// each mask leaves two spare bits per field so the sum cannot
/// overflow into a neighbor. Returns `None` for formats the filter
/// cannot process (palette, YUV).
pub fn box_filter(format: PixelFormat, block: [u16; 4]) -> Option<u16> {
    let (m0, m1) = filter_masks(format)?;
    let mut out = 0u16;
    for mask in [m0, m1] {
        let sum: u32 = block.iter().map(|&t| (t & mask) as u32).sum();
        out |= ((sum >> 2) as u16) & mask;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct16_sizes() {
        assert_eq!(Storage::Direct16.total_bytes(8, 8, false), 128);
        assert_eq!(Storage::Direct16.total_bytes(1024, 512, false), 1024 * 512 * 2);
        // mipmapped 1024: offset of the top level plus the top level
        assert_eq!(
            Storage::Direct16.total_bytes(1024, 1024, true),
            0xAAAB0 + 1024 * 1024 * 2
        );
    }

    #[test]
    fn vq_sizes_include_codebook() {
        assert_eq!(Storage::Vq.total_bytes(1024, 1024, false), 2048 + 1024 * 1024 / 4);
        assert_eq!(
            Storage::Vq.total_bytes(64, 64, true),
            2048 + 0x156 + 64 * 64 / 4
        );
    }

    #[test]
    fn level_offsets_shrink_with_level() {
        // a 256-texture (log2 8): level 0 at table[8], level 8 (1x1) at 0x6
        assert_eq!(Storage::Direct16.level_offset(8, 0), 0xAAB0);
        assert_eq!(Storage::Direct16.level_offset(8, 8), 0x6);
        assert_eq!(Storage::Palette8.level_offset(8, 0), 0xAAB0 / 2);
        assert_eq!(Storage::Palette4.level_offset(8, 0), 0xAAB0 / 4);
        assert_eq!(Storage::Vq.level_offset(8, 0), 0x1556);
    }

    #[test]
    fn dimension_validation() {
        assert!(check_dimensions(64, 256, 0).is_ok());
        assert_eq!(check_dimensions(64, 64, 1), Err(GlError::InvalidValue));
        assert_eq!(check_dimensions(63, 64, 0), Err(GlError::InvalidValue));
        assert_eq!(check_dimensions(4, 64, 0), Err(GlError::InvalidValue));
        assert_eq!(check_dimensions(2048, 64, 0), Err(GlError::InvalidValue));
    }

    #[test]
    fn level_masks() {
        assert_eq!(level_count(8), 4);
        assert_eq!(full_level_mask(level_count(8)), 0b1111);
        assert_eq!(full_level_mask(level_count(1024)), 0x7FF);
    }

    #[test]
    fn packs_white_and_black() {
        assert_eq!(pack_texel(PixelFormat::Argb1555, [255, 255, 255, 255]), 0xFFFF);
        assert_eq!(pack_texel(PixelFormat::Rgb565, [255, 255, 255, 0]), 0xFFFF);
        assert_eq!(pack_texel(PixelFormat::Argb4444, [0, 0, 0, 255]), 0xF000);
        assert_eq!(pack_texel(PixelFormat::Argb1555, [0, 0, 0, 0]), 0);
    }

    #[test]
    fn upload_decoding_roundtrips_through_packing() {
        let rgba = [0xF8, 0xE0, 0x18, 0xFF];
        let decoded = read_rgba8(&rgba, UploadFormat::Rgba, UploadType::UnsignedByte);
        assert_eq!(pack_texel(PixelFormat::Rgb565, decoded), 0xFF03);
        let packed565 = 0xFF03u16.to_le_bytes();
        let redecoded = read_rgba8(&packed565, UploadFormat::Rgb, UploadType::UnsignedShort565);
        assert_eq!(pack_texel(PixelFormat::Rgb565, redecoded), 0xFF03);
    }

    #[test]
    fn box_filter_averages_each_channel() {
        // four RGB565 texels with red 4/8/12/16ds
        let block = [
            pack_texel(PixelFormat::Rgb565, [32, 0, 0, 0]),
            pack_texel(PixelFormat::Rgb565, [64, 0, 0, 0]),
            pack_texel(PixelFormat::Rgb565, [96, 0, 0, 0]),
            pack_texel(PixelFormat::Rgb565, [128, 0, 0, 0]),
        ];
        let avg = box_filter(PixelFormat::Rgb565, block).unwrap();
        // (4 + 8 + 12 + 16) / 4 = 10 in 5-bit red
        assert_eq!(avg >> 11, 10);
        assert_eq!(avg & 0x07FF, 0);
    }

    #[test]
    fn box_filter_uniform_block_is_identity() {
        for format in [PixelFormat::Argb1555, PixelFormat::Rgb565, PixelFormat::Argb4444] {
            let t = pack_texel(format, [200, 100, 50, 255]);
            assert_eq!(box_filter(format, [t; 4]), Some(t));
        }
    }

    #[test]
    fn box_filter_rejects_palette() {
        assert_eq!(box_filter(PixelFormat::Palette8, [0; 4]), None);
    }
}
