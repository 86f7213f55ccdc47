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

//! Packed GPU context descriptor
//!
//! The PVR tile accelerator reads a fixed 32-byte polygon header before
//! each run of vertex data: a `cmd` word (primitive command, target list,
//! strip length, color format, texture/gouraud/specular flags), a `mode1`
//! word (depth compare, culling, depth-write disable), and a submode pair
//! (`mode2` for blending/fog/filtering, `tex` for texture format and
//! address), followed by a base float color.
//!
//! The layout is interpreted directly by fixed hardware logic, so it must
//! be reproduced bit-exact. Every field write goes through
//! [`replace_bits`]/[`replace_bit`], which leave all other bits untouched;
//! the [`ctx_field!`] macro keeps each field's (word, offset, width) in
//! exactly one place.
//!
//! # References
//!
//! - Hitachi/Sega "Dreamcast Hardware Specification", tile accelerator
//!   parameter formats
//! - [PowerVR Series2 overview](https://en.wikipedia.org/wiki/PowerVR)

use bytemuck::{Pod, Zeroable};

/// Replace `width` bits of `src` starting at bit `start` with `value`
///
/// All bits outside the field are preserved. Excess bits of `value`
/// beyond the field width are masked off.
#[inline(always)]
pub fn replace_bits(src: u32, value: u32, start: u32, width: u32) -> u32 {
    debug_assert!(start + width <= 32);
    let m = u32::MAX << start;
    let mask = m ^ (m.wrapping_shl(width));
    (src & !mask) | ((value << start) & mask)
}

/// Replace a single bit of `src` at position `start`
#[inline(always)]
pub fn replace_bit(src: u32, value: bool, start: u32) -> u32 {
    replace_bits(src, value as u32, start, 1)
}

/// Extract `width` bits of `src` starting at bit `start`
#[inline(always)]
pub fn extract_bits(src: u32, start: u32, width: u32) -> u32 {
    debug_assert!(start + width <= 32);
    let m = u32::MAX << start;
    let mask = m ^ (m.wrapping_shl(width));
    (src & mask) >> start
}

/// Parameter command type (cmd bits 29-31)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    /// Polygon header (also modifier volume)
    Polygon = 4,
    /// Sprite header
    Sprite = 5,
}

/// Hardware depth comparison (mode1 bits 29-31)
///
/// Note the PVR uses a reversed depth buffer; the state encoder remaps
/// logical comparisons before writing this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DepthCompare {
    Never = 0,
    Less = 1,
    Equal = 2,
    Lequal = 3,
    Greater = 4,
    NotEqual = 5,
    Gequal = 6,
    Always = 7,
}

/// Maximum strip length hint (cmd bits 18-19)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StripLength {
    L1 = 0,
    L2 = 1,
    L4 = 2,
    L6 = 3,
}

/// User tile clip interaction (cmd bits 16-17)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum UserClipMode {
    Disable = 0,
    Inside = 1,
    Outside = 2,
}

/// Vertex color format (cmd bits 4-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ColorKind {
    Packed = 0,
    Float = 1,
    Intensity = 2,
    Constant = 3,
}

/// Draw-order bucket the primitive is routed to (cmd bits 24-26)
///
/// The PVR rasterizes opaque geometry first, then punch-through, then
/// translucent; the indices below are both the hardware enum values and
/// the command buffer flush order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ListKind {
    OpaquePoly = 0,
    OpaqueModifier = 1,
    BlendPoly = 2,
    BlendModifier = 3,
    PunchThrough = 4,
}

impl Default for ListKind {
    fn default() -> ListKind {
        ListKind::OpaquePoly
    }
}

impl ListKind {
    /// Number of hardware lists
    pub const COUNT: usize = 5;

    /// Command-buffer index for this list
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// All lists in fixed flush order
    pub const ALL: [ListKind; Self::COUNT] = [
        ListKind::OpaquePoly,
        ListKind::OpaqueModifier,
        ListKind::BlendPoly,
        ListKind::BlendModifier,
        ListKind::PunchThrough,
    ];
}

/// Hardware culling mode (mode1 bits 27-28)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CullMode {
    Disable = 0,
    /// Cull degenerate (tiny-area) triangles only
    Small = 1,
    Ccw = 2,
    Cw = 3,
}

/// Blend factor (mode2 src bits 29-31, dst bits 26-28)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BlendFactor {
    Zero = 0,
    One = 1,
    OtherColor = 2,
    InvOtherColor = 3,
    SrcAlpha = 4,
    InvSrcAlpha = 5,
    DstAlpha = 6,
    InvDstAlpha = 7,
}

/// Fog mode (mode2 bits 22-23)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum HwFogMode {
    Table = 0,
    Vertex = 1,
    Disable = 2,
    Table2 = 3,
}

/// Texture filtering (mode2 bits 13-14)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TextureFilter {
    Point = 0,
    Bilinear = 1,
    TrilinearFirst = 2,
    TrilinearSecond = 3,
}

/// Mipmap D-adjust bias in 0.25 steps (mode2 bits 8-11)
///
/// The hardware has no value for 0.0; `B1_00` is the neutral setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MipmapBias {
    B0_25 = 1,
    B0_50 = 2,
    B0_75 = 3,
    B1_00 = 4,
    B1_25 = 5,
    B1_50 = 6,
    B1_75 = 7,
    B2_00 = 8,
    B2_25 = 9,
    B2_50 = 10,
    B2_75 = 11,
    B3_00 = 12,
    B3_25 = 13,
    B3_50 = 14,
    B3_75 = 15,
}

/// Texture/shading combine function (mode2 bits 6-7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TexEnv {
    Replace = 0,
    ModulateNoAlpha = 1,
    Decal = 2,
    Modulate = 3,
}

/// UV wrap control, one bit per axis (flip bits 17-18, clamp bits 15-16)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum UvControl {
    None = 0,
    U = 1,
    V = 2,
    Both = 3,
}

impl UvControl {
    /// Combine per-axis selections
    #[inline(always)]
    pub fn with_u(self) -> UvControl {
        match self {
            UvControl::None | UvControl::U => UvControl::U,
            UvControl::V | UvControl::Both => UvControl::Both,
        }
    }

    /// Combine per-axis selections
    #[inline(always)]
    pub fn with_v(self) -> UvControl {
        match self {
            UvControl::None | UvControl::V => UvControl::V,
            UvControl::U | UvControl::Both => UvControl::Both,
        }
    }
}

/// Texture dimension size class (mode2 u bits 3-5, v bits 0-2)
///
/// The hardware only supports power-of-two dimensions from 8 to 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum SizeClass {
    S8 = 0,
    S16 = 1,
    S32 = 2,
    S64 = 3,
    S128 = 4,
    S256 = 5,
    S512 = 6,
    S1024 = 7,
}

impl SizeClass {
    /// log2 of the pixel dimension
    #[inline(always)]
    pub fn log2(self) -> u32 {
        self as u32 + 3
    }

    /// Pixel dimension for this size class
    #[inline(always)]
    pub fn pixels(self) -> u32 {
        1 << self.log2()
    }

    /// Smallest size class covering `size` pixels, saturating at 1024
    pub fn from_pixels(size: u32) -> SizeClass {
        match size {
            0..=8 => SizeClass::S8,
            9..=16 => SizeClass::S16,
            17..=32 => SizeClass::S32,
            33..=64 => SizeClass::S64,
            65..=128 => SizeClass::S128,
            129..=256 => SizeClass::S256,
            257..=512 => SizeClass::S512,
            _ => SizeClass::S1024,
        }
    }
}

/// Texel storage format (tex bits 27-29)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PixelFormat {
    Argb1555 = 0,
    Rgb565 = 1,
    Argb4444 = 2,
    Yuv = 3,
    Normal = 4,
    Palette8 = 5,
    Palette4 = 6,
}

/// The `mode2`/`tex` submode word pair
///
/// One pair describes blending, fog, filtering, and texturing for a
/// polygon face. Modifier-volume contexts carry two pairs; the GL-style
/// surface only ever uses the no-modifier ("base") pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Submodes {
    pub mode2: u32,
    pub tex: u32,
}

/// Generates a setter and getter for one descriptor bit field.
///
/// The field's (word, offset, width) live only here, so the setter and
/// getter can never disagree about the layout.
macro_rules! ctx_field {
    ($(#[$doc:meta])* $word:ident : $set:ident, $get:ident, $start:expr, $width:expr) => {
        $(#[$doc])*
        #[inline(always)]
        pub fn $set(&mut self, value: u32) {
            self.$word = replace_bits(self.$word, value, $start, $width);
        }

        #[inline(always)]
        pub fn $get(&self) -> u32 {
            extract_bits(self.$word, $start, $width)
        }
    };
    ($(#[$doc:meta])* $word:ident : $set:ident, $get:ident, bit $start:expr) => {
        $(#[$doc])*
        #[inline(always)]
        pub fn $set(&mut self, value: bool) {
            self.$word = replace_bit(self.$word, value, $start);
        }

        #[inline(always)]
        pub fn $get(&self) -> bool {
            extract_bits(self.$word, $start, 1) != 0
        }
    };
}

impl Submodes {
    ctx_field!(
        /// Source blend factor
        mode2: set_src_blend_raw, src_blend_raw, 29, 3
    );
    ctx_field!(
        /// Destination blend factor
        mode2: set_dst_blend_raw, dst_blend_raw, 26, 3
    );
    ctx_field!(
        /// Read source color from the accumulation buffer
        mode2: set_color_source, color_source, bit 25
    );
    ctx_field!(
        /// Write output to the accumulation buffer
        mode2: set_color_destination, color_destination, bit 24
    );
    ctx_field!(
        /// Fog mode
        mode2: set_fog_mode_raw, fog_mode_raw, 22, 2
    );
    ctx_field!(
        /// Clamp combined color to [0,1]
        mode2: set_color_clamp, color_clamp, bit 21
    );
    ctx_field!(
        /// Use vertex alpha
        mode2: set_enable_alpha, enable_alpha, bit 20
    );
    ctx_field!(
        /// Use texture alpha
        mode2: set_texture_alpha, texture_alpha, bit 19
    );
    ctx_field!(
        /// Mirror UVs per axis
        mode2: set_uv_flip_raw, uv_flip_raw, 17, 2
    );
    ctx_field!(
        /// Clamp UVs per axis
        mode2: set_uv_clamp_raw, uv_clamp_raw, 15, 2
    );
    ctx_field!(
        /// Texture filter
        mode2: set_filter_raw, filter_raw, 13, 2
    );
    ctx_field!(
        /// 2x anisotropic sampling
        mode2: set_anisotropic, anisotropic, bit 12
    );
    ctx_field!(
        /// Mipmap D-adjust
        mode2: set_mipmap_bias_raw, mipmap_bias_raw, 8, 4
    );
    ctx_field!(
        /// Texture combine function
        mode2: set_texenv_raw, texenv_raw, 6, 2
    );
    ctx_field!(
        /// Texture U size class
        mode2: set_u_size_raw, u_size_raw, 3, 3
    );
    ctx_field!(
        /// Texture V size class
        mode2: set_v_size_raw, v_size_raw, 0, 3
    );
    ctx_field!(
        /// Texture has mipmaps
        tex: set_mipmapped, mipmapped, bit 31
    );
    ctx_field!(
        /// Texture is VQ compressed
        tex: set_compressed, compressed, bit 30
    );
    ctx_field!(
        /// Texel format
        tex: set_pixel_format_raw, pixel_format_raw, 27, 3
    );
    ctx_field!(
        /// Texture uses stride addressing
        tex: set_strided, strided, bit 25
    );
    ctx_field!(
        /// Palette selector block
        tex: set_palette_raw, palette_raw, 21, 6
    );
    ctx_field!(
        /// Texture address field (VRAM byte offset >> 3)
        tex: set_texture_word, texture_word, 0, 21
    );

    /// Set both blend factors
    #[inline(always)]
    pub fn set_blend_modes(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.set_src_blend_raw(src as u32);
        self.set_dst_blend_raw(dst as u32);
    }

    #[inline(always)]
    pub fn set_fog_mode(&mut self, fog: HwFogMode) {
        self.set_fog_mode_raw(fog as u32);
    }

    #[inline(always)]
    pub fn set_uv_flip(&mut self, flip: UvControl) {
        self.set_uv_flip_raw(flip as u32);
    }

    #[inline(always)]
    pub fn set_uv_clamp(&mut self, clamp: UvControl) {
        self.set_uv_clamp_raw(clamp as u32);
    }

    #[inline(always)]
    pub fn set_filter(&mut self, filter: TextureFilter) {
        self.set_filter_raw(filter as u32);
    }

    #[inline(always)]
    pub fn set_mipmap_bias(&mut self, bias: MipmapBias) {
        self.set_mipmap_bias_raw(bias as u32);
    }

    #[inline(always)]
    pub fn set_texenv(&mut self, env: TexEnv) {
        self.set_texenv_raw(env as u32);
    }

    /// Set both texture size classes
    #[inline(always)]
    pub fn set_uv_size(&mut self, u: SizeClass, v: SizeClass) {
        self.set_u_size_raw(u as u32);
        self.set_v_size_raw(v as u32);
    }

    #[inline(always)]
    pub fn set_pixel_format(&mut self, format: PixelFormat) {
        self.set_pixel_format_raw(format as u32);
    }

    /// Twiddled (Morton-ordered) texel layout; the hardware bit stores
    /// the *inverse* (1 = non-twiddled)
    #[inline(always)]
    pub fn set_twiddled(&mut self, twiddled: bool) {
        self.tex = replace_bit(self.tex, !twiddled, 26);
    }

    #[inline(always)]
    pub fn twiddled(&self) -> bool {
        extract_bits(self.tex, 26, 1) == 0
    }

    /// 4-bit palette selector (6-bit bank)
    #[inline(always)]
    pub fn set_palette_4bit(&mut self, bank: u32) {
        self.tex = replace_bits(self.tex, bank, 21, 6);
    }

    /// 8-bit palette selector (2-bit bank, stored shifted)
    #[inline(always)]
    pub fn set_palette_8bit(&mut self, bank: u32) {
        self.tex = replace_bits(self.tex, bank << 4, 21, 2);
    }

    /// Texture base as a VRAM byte offset; the hardware stores it >> 3
    #[inline(always)]
    pub fn set_texture_address(&mut self, vram_offset: u32) {
        self.set_texture_word(vram_offset >> 3);
    }

    #[inline(always)]
    pub fn texture_address(&self) -> u32 {
        self.texture_word() << 3
    }

    /// Configure every texture-related field in one call
    pub fn set_texture(
        &mut self,
        vram_offset: u32,
        u: SizeClass,
        v: SizeClass,
        format: PixelFormat,
        twiddled: bool,
        mipmapped: bool,
        compressed: bool,
    ) {
        self.set_texture_address(vram_offset);
        self.set_uv_size(u, v);
        self.set_pixel_format(format);
        self.set_twiddled(twiddled);
        self.set_mipmapped(mipmapped);
        self.set_compressed(compressed);
        self.set_mipmap_bias(MipmapBias::B1_00);
    }
}

/// The 32-byte polygon header submitted before vertex data
///
/// Copied verbatim into the command stream whenever the state encoder's
/// dirty flag is set. `color` is the base float color used by the
/// float-color vertex format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PvrContext {
    pub cmd: u32,
    pub mode1: u32,
    pub modes: Submodes,
    /// Base color, a/r/g/b order
    pub color: [f32; 4],
}

impl PvrContext {
    /// Size of the header record in bytes (one hardware block)
    pub const BYTES: usize = 32;

    ctx_field!(
        /// Parameter command type
        cmd: set_command_raw, command_raw, 29, 3
    );
    ctx_field!(
        /// Target display list
        cmd: set_list_raw, list_raw, 24, 3
    );
    ctx_field!(
        /// Group control enable
        cmd: set_group_enable, group_enable, bit 23
    );
    ctx_field!(
        /// Strip length hint
        cmd: set_strip_length_raw, strip_length_raw, 18, 2
    );
    ctx_field!(
        /// User tile clip mode
        cmd: set_clip_mode_raw, clip_mode_raw, 16, 2
    );
    ctx_field!(
        /// Affected by modifier volumes
        cmd: set_modified, modified, bit 7
    );
    ctx_field!(
        /// Two-parameter modifier format
        cmd: set_modifier_full, modifier_full, bit 6
    );
    ctx_field!(
        /// Vertex color format
        cmd: set_color_format_raw, color_format_raw, 4, 3
    );
    ctx_field!(
        /// Texturing enabled
        cmd: set_textured, textured, bit 3
    );
    ctx_field!(
        /// Specular (offset color) enabled
        cmd: set_specular, specular, bit 2
    );
    ctx_field!(
        /// Gouraud interpolation enabled
        cmd: set_gouraud, gouraud, bit 1
    );
    ctx_field!(
        /// 16-bit UV format
        cmd: set_small_uv, small_uv, bit 0
    );
    ctx_field!(
        /// Depth comparison
        mode1: set_depth_compare_raw, depth_compare_raw, 29, 3
    );
    ctx_field!(
        /// Culling mode
        mode1: set_cull_mode_raw, cull_mode_raw, 27, 2
    );
    ctx_field!(
        /// Disable depth writes
        mode1: set_depth_write_disable, depth_write_disable, bit 26
    );
    ctx_field!(
        /// Per-pixel (exact) mipmap selection
        mode1: set_exact_mipmap, exact_mipmap, bit 20
    );

    #[inline(always)]
    pub fn set_command(&mut self, cmd: Command) {
        self.set_command_raw(cmd as u32);
    }

    #[inline(always)]
    pub fn set_list(&mut self, list: ListKind) {
        self.set_list_raw(list as u32);
    }

    #[inline(always)]
    pub fn list(&self) -> ListKind {
        match self.list_raw() {
            0 => ListKind::OpaquePoly,
            1 => ListKind::OpaqueModifier,
            2 => ListKind::BlendPoly,
            3 => ListKind::BlendModifier,
            _ => ListKind::PunchThrough,
        }
    }

    #[inline(always)]
    pub fn set_strip_length(&mut self, length: StripLength) {
        self.set_strip_length_raw(length as u32);
    }

    #[inline(always)]
    pub fn set_clip_mode(&mut self, mode: UserClipMode) {
        self.set_clip_mode_raw(mode as u32);
    }

    #[inline(always)]
    pub fn set_color_format(&mut self, format: ColorKind) {
        self.set_color_format_raw(format as u32);
    }

    #[inline(always)]
    pub fn set_depth_compare(&mut self, compare: DepthCompare) {
        self.set_depth_compare_raw(compare as u32);
    }

    #[inline(always)]
    pub fn set_cull_mode(&mut self, cull: CullMode) {
        self.set_cull_mode_raw(cull as u32);
    }

    /// Untextured gouraud-shaded opaque polygons with float color
    ///
    /// The reset state every context starts from.
    pub fn default_polygon() -> PvrContext {
        let mut ctx = PvrContext::default();
        ctx.set_command(Command::Polygon);
        ctx.set_group_enable(true);
        ctx.set_list(ListKind::OpaquePoly);
        ctx.set_gouraud(true);
        ctx.set_strip_length(StripLength::L6);
        ctx.set_color_format(ColorKind::Float);
        ctx.set_depth_compare(DepthCompare::Gequal);
        ctx.set_cull_mode(CullMode::Small);
        ctx.modes.set_enable_alpha(true);
        ctx.modes.set_blend_modes(BlendFactor::One, BlendFactor::Zero);
        ctx.modes.set_color_clamp(true);
        ctx.modes.set_fog_mode(HwFogMode::Disable);
        ctx.modes.set_texenv(TexEnv::Modulate);
        ctx.color = [1.0, 1.0, 1.0, 1.0];
        ctx
    }

    /// The header as command-stream bytes
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; Self::BYTES] {
        bytemuck::cast_ref(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn replace_bits_preserves_neighbors() {
        let src = 0xFFFF_FFFF;
        assert_eq!(replace_bits(src, 0, 8, 4), 0xFFFF_F0FF);
        assert_eq!(replace_bits(0, 0xF, 8, 4), 0x0000_0F00);
        // excess value bits must not leak
        assert_eq!(replace_bits(0, 0xFF, 8, 4), 0x0000_0F00);
    }

    #[test]
    fn replace_bit_truthiness() {
        assert_eq!(replace_bit(0, true, 31), 0x8000_0000);
        assert_eq!(replace_bit(u32::MAX, false, 0), 0xFFFF_FFFE);
    }

    #[test]
    fn default_polygon_matches_hardware_reset_words() {
        let ctx = PvrContext::default_polygon();
        // cmd: polygon(4)<<29 | opaque(0)<<24 | group<<23 | strip6(3)<<18
        //      | float(1)<<4 | gouraud<<1
        assert_eq!(ctx.cmd, (4 << 29) | (1 << 23) | (3 << 18) | (1 << 4) | (1 << 1));
        // mode1: gequal(6)<<29 | small(1)<<27
        assert_eq!(ctx.mode1, (6 << 29) | (1 << 27));
        // mode2: one(1)<<29 | zero(0)<<26 | fog disable(2)<<22 | clamp<<21
        //        | alpha<<20 | modulate(3)<<6
        assert_eq!(
            ctx.modes.mode2,
            (1 << 29) | (2 << 22) | (1 << 21) | (1 << 20) | (3 << 6)
        );
        assert_eq!(ctx.modes.tex, 0);
        assert_eq!(ctx.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn twiddled_bit_is_inverted() {
        let mut m = Submodes::default();
        m.set_twiddled(true);
        assert_eq!(extract_bits(m.tex, 26, 1), 0);
        assert!(m.twiddled());
        m.set_twiddled(false);
        assert_eq!(extract_bits(m.tex, 26, 1), 1);
        assert!(!m.twiddled());
    }

    #[test]
    fn texture_address_drops_low_bits() {
        let mut m = Submodes::default();
        m.set_texture_address(0x0010_0020);
        assert_eq!(m.texture_address(), 0x0010_0020);
        // addresses are 8-byte granular
        m.set_texture_address(0x0010_0027);
        assert_eq!(m.texture_address(), 0x0010_0020);
    }

    #[test]
    fn size_class_conversions() {
        assert_eq!(SizeClass::from_pixels(8), SizeClass::S8);
        assert_eq!(SizeClass::from_pixels(9), SizeClass::S16);
        assert_eq!(SizeClass::from_pixels(1024), SizeClass::S1024);
        assert_eq!(SizeClass::from_pixels(4096), SizeClass::S1024);
        for class in [SizeClass::S8, SizeClass::S64, SizeClass::S1024] {
            assert_eq!(SizeClass::from_pixels(class.pixels()), class);
        }
    }

    #[test]
    fn header_is_one_block() {
        assert_eq!(std::mem::size_of::<PvrContext>(), PvrContext::BYTES);
    }

    /// Every field: write a value, read it back, and verify no other bit
    /// of the whole descriptor moved. Boundary values included via the
    /// all-ones case.
    fn roundtrip_cmd_field(
        set: fn(&mut PvrContext, u32),
        get: fn(&PvrContext) -> u32,
        width: u32,
    ) {
        let max = if width == 32 { u32::MAX } else { (1 << width) - 1 };
        for value in [0, 1, max / 2, max] {
            let mut ctx = PvrContext::default_polygon();
            let before = ctx;
            set(&mut ctx, value);
            assert_eq!(get(&ctx), value);
            set(&mut ctx, get(&before));
            assert_eq!(ctx, before, "field write disturbed other bits");
        }
    }

    #[test]
    fn cmd_and_mode1_fields_roundtrip() {
        roundtrip_cmd_field(PvrContext::set_command_raw, PvrContext::command_raw, 3);
        roundtrip_cmd_field(PvrContext::set_list_raw, PvrContext::list_raw, 3);
        roundtrip_cmd_field(PvrContext::set_strip_length_raw, PvrContext::strip_length_raw, 2);
        roundtrip_cmd_field(PvrContext::set_clip_mode_raw, PvrContext::clip_mode_raw, 2);
        roundtrip_cmd_field(PvrContext::set_color_format_raw, PvrContext::color_format_raw, 3);
        roundtrip_cmd_field(PvrContext::set_depth_compare_raw, PvrContext::depth_compare_raw, 3);
        roundtrip_cmd_field(PvrContext::set_cull_mode_raw, PvrContext::cull_mode_raw, 2);
    }

    proptest! {
        #[test]
        fn replace_then_extract_is_identity(
            src in any::<u32>(),
            value in any::<u32>(),
            start in 0u32..32,
            width in 1u32..=21,
        ) {
            prop_assume!(start + width <= 32);
            let masked = value & ((1u64 << width) as u32).wrapping_sub(1);
            let out = replace_bits(src, value, start, width);
            prop_assert_eq!(extract_bits(out, start, width), masked);
            // bits outside the field unchanged
            let m = u32::MAX << start;
            let mask = m ^ m.wrapping_shl(width);
            prop_assert_eq!(out & !mask, src & !mask);
        }

        #[test]
        fn submode_fields_do_not_interfere(
            src_blend in 0u32..8,
            dst_blend in 0u32..8,
            fog in 0u32..4,
            filter in 0u32..4,
            bias in 0u32..16,
            usize_ in 0u32..8,
            vsize in 0u32..8,
        ) {
            let mut m = Submodes::default();
            m.set_src_blend_raw(src_blend);
            m.set_dst_blend_raw(dst_blend);
            m.set_fog_mode_raw(fog);
            m.set_filter_raw(filter);
            m.set_mipmap_bias_raw(bias);
            m.set_u_size_raw(usize_);
            m.set_v_size_raw(vsize);
            prop_assert_eq!(m.src_blend_raw(), src_blend);
            prop_assert_eq!(m.dst_blend_raw(), dst_blend);
            prop_assert_eq!(m.fog_mode_raw(), fog);
            prop_assert_eq!(m.filter_raw(), filter);
            prop_assert_eq!(m.mipmap_bias_raw(), bias);
            prop_assert_eq!(m.u_size_raw(), usize_);
            prop_assert_eq!(m.v_size_raw(), vsize);
        }
    }
}
