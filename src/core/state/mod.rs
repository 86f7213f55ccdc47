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

//! GL-style render state and its hardware encoding
//!
//! [`StateEncoder`] holds the logical render state (depth, blend, alpha
//! test, culling, shading, fog) and keeps the packed
//! [`PvrContext`](crate::core::context::PvrContext) header in sync with
//! it. A single dirty flag tracks whether the header has changed since
//! it was last written to the command stream; [`StateEncoder::submit`]
//! appends it only when dirty, so redundant state calls cost nothing at
//! draw time.
//!
//! Three hardware quirks are folded in here so nothing downstream has
//! to know about them:
//!
//! - the depth buffer is reversed, so LESS-family comparisons are
//!   swapped with their GREATER counterparts;
//! - blending and alpha testing are mutually exclusive and double as
//!   list routing: blended work goes to the translucent list,
//!   GREATER/GEQUAL alpha tests to punch-through, everything else to
//!   opaque;
//! - the cull unit only knows winding direction, so the cull face and
//!   front face settings are resolved to a single hardware mode.
//!
//! Culling both faces has no hardware mode at all; the primitive
//! pipeline asks [`StateEncoder::culls_filled`] and drops filled
//! primitives outright.

use bitflags::bitflags;

use crate::core::backend::{FogCurve, TileAccelerator};
use crate::core::cmdbuf::CommandBuffers;
use crate::core::context::{
    BlendFactor, CullMode, DepthCompare, ListKind, PvrContext, TexEnv,
};
use crate::core::error::GlError;

bitflags! {
    /// Toggleable capabilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Caps: u32 {
        const DEPTH_TEST = 1 << 0;
        const BLEND      = 1 << 1;
        const ALPHA_TEST = 1 << 2;
        const CULL_FACE  = 1 << 3;
        const FOG        = 1 << 4;
        const TEXTURE_2D = 1 << 5;
    }
}

/// Comparison function for depth and alpha tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    Lequal,
    Greater,
    NotEqual,
    Gequal,
    Always,
}

impl CompareFunc {
    /// Hardware depth comparison, accounting for the reversed depth
    /// buffer
    fn to_reversed_depth(self) -> DepthCompare {
        match self {
            CompareFunc::Never => DepthCompare::Never,
            CompareFunc::Less => DepthCompare::Greater,
            CompareFunc::Equal => DepthCompare::Equal,
            CompareFunc::Lequal => DepthCompare::Gequal,
            CompareFunc::Greater => DepthCompare::Less,
            CompareFunc::NotEqual => DepthCompare::NotEqual,
            CompareFunc::Gequal => DepthCompare::Lequal,
            CompareFunc::Always => DepthCompare::Always,
        }
    }
}

/// Blend function, GL naming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFunc {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

impl BlendFunc {
    /// Hardware source factor; the hardware calls the framebuffer side
    /// "other color", so only DST-color variants are expressible here
    fn to_src_factor(self) -> Result<BlendFactor, GlError> {
        match self {
            BlendFunc::Zero => Ok(BlendFactor::Zero),
            BlendFunc::One => Ok(BlendFactor::One),
            BlendFunc::DstColor => Ok(BlendFactor::OtherColor),
            BlendFunc::OneMinusDstColor => Ok(BlendFactor::InvOtherColor),
            BlendFunc::SrcAlpha => Ok(BlendFactor::SrcAlpha),
            BlendFunc::OneMinusSrcAlpha => Ok(BlendFactor::InvSrcAlpha),
            BlendFunc::DstAlpha => Ok(BlendFactor::DstAlpha),
            BlendFunc::OneMinusDstAlpha => Ok(BlendFactor::InvDstAlpha),
            _ => Err(GlError::InvalidEnum),
        }
    }

    /// Hardware destination factor; SRC-color variants only
    fn to_dst_factor(self) -> Result<BlendFactor, GlError> {
        match self {
            BlendFunc::Zero => Ok(BlendFactor::Zero),
            BlendFunc::One => Ok(BlendFactor::One),
            BlendFunc::SrcColor => Ok(BlendFactor::OtherColor),
            BlendFunc::OneMinusSrcColor => Ok(BlendFactor::InvOtherColor),
            BlendFunc::SrcAlpha => Ok(BlendFactor::SrcAlpha),
            BlendFunc::OneMinusSrcAlpha => Ok(BlendFactor::InvSrcAlpha),
            BlendFunc::DstAlpha => Ok(BlendFactor::DstAlpha),
            BlendFunc::OneMinusDstAlpha => Ok(BlendFactor::InvDstAlpha),
            _ => Err(GlError::InvalidEnum),
        }
    }
}

/// Which faces culling removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

/// Winding direction that counts as front-facing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    Cw,
    Ccw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeModel {
    Flat,
    Smooth,
}

/// Fog attenuation curve, GL naming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogKind {
    Exp,
    Exp2,
    Linear,
}

/// Identification string queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringName {
    Vendor,
    Renderer,
    Version,
    Extensions,
}

/// Implementation identification strings
pub fn get_string(name: StringName) -> &'static str {
    match name {
        StringName::Vendor => "pvrgl contributors",
        StringName::Renderer => "PowerVR2 tile accelerator",
        StringName::Version => concat!("1.1 pvrgl-", env!("CARGO_PKG_VERSION")),
        StringName::Extensions => {
            "GL_ARB_texture_mirrored_repeat GL_ARB_texture_compression \
             GL_EXT_fog_coord GL_EXT_secondary_color"
        }
    }
}

#[derive(Debug, Clone)]
struct FogState {
    kind: FogKind,
    density: f32,
    start: f32,
    end: f32,
    color: [f32; 4],
    table_dirty: bool,
    color_dirty: bool,
}

impl Default for FogState {
    fn default() -> FogState {
        FogState {
            kind: FogKind::Exp,
            density: 1.0,
            start: 0.0,
            end: 1.0,
            color: [0.0; 4],
            table_dirty: true,
            color_dirty: true,
        }
    }
}

#[inline(always)]
fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Logical render state plus the packed header it encodes to
#[derive(Debug, Clone)]
pub struct StateEncoder {
    ctx: PvrContext,
    dirty: bool,
    caps: Caps,
    depth_func: CompareFunc,
    depth_write: bool,
    blend_src: BlendFunc,
    blend_dst: BlendFunc,
    alpha_func: CompareFunc,
    alpha_ref: f32,
    cull_face: Face,
    front_face: Winding,
    shade_model: ShadeModel,
    tex_env: TexEnv,
    fog: FogState,
    clear_color: [f32; 4],
    clear_depth: f32,
}

impl Default for StateEncoder {
    fn default() -> StateEncoder {
        StateEncoder::new()
    }
}

impl StateEncoder {
    pub fn new() -> StateEncoder {
        let mut s = StateEncoder {
            ctx: PvrContext::default_polygon(),
            dirty: true,
            caps: Caps::empty(),
            depth_func: CompareFunc::Less,
            depth_write: true,
            blend_src: BlendFunc::One,
            blend_dst: BlendFunc::Zero,
            alpha_func: CompareFunc::Always,
            alpha_ref: 0.0,
            cull_face: Face::Back,
            front_face: Winding::Ccw,
            shade_model: ShadeModel::Smooth,
            tex_env: TexEnv::Modulate,
            fog: FogState::default(),
            clear_color: [0.0; 4],
            clear_depth: 1.0,
        };
        s.regenerate();
        s
    }

    /// The packed header in its current form
    pub fn context(&self) -> &PvrContext {
        &self.ctx
    }

    /// Direct header access for the texture unit; the caller must mark
    /// the state dirty after editing
    pub fn context_mut(&mut self) -> &mut PvrContext {
        &mut self.ctx
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Re-encode every piece of logical state into the header
    pub fn regenerate(&mut self) {
        self.apply_depth_func();
        self.apply_depth_mask();
        self.apply_blend_or_alpha_test();
        self.apply_culling();
        self.apply_shade_model();
        self.apply_tex_env();
        self.apply_fog();
    }

    // --- capabilities ---

    pub fn enable(&mut self, cap: Caps) {
        self.set_cap(cap, true);
    }

    pub fn disable(&mut self, cap: Caps) {
        self.set_cap(cap, false);
    }

    fn set_cap(&mut self, cap: Caps, on: bool) {
        if self.caps.contains(cap) == on {
            return;
        }
        self.caps.set(cap, on);
        match cap {
            Caps::DEPTH_TEST => self.apply_depth_func(),
            Caps::BLEND | Caps::ALPHA_TEST => self.apply_blend_or_alpha_test(),
            Caps::CULL_FACE => self.apply_culling(),
            Caps::FOG => self.apply_fog(),
            // TEXTURE_2D is re-applied by the texture unit
            _ => {}
        }
    }

    pub fn is_enabled(&self, cap: Caps) -> bool {
        self.caps.contains(cap)
    }

    // --- depth ---

    pub fn set_depth_func(&mut self, func: CompareFunc) {
        if self.depth_func == func {
            return;
        }
        self.depth_func = func;
        self.apply_depth_func();
    }

    pub fn depth_func(&self) -> CompareFunc {
        self.depth_func
    }

    pub fn set_depth_mask(&mut self, write: bool) {
        if self.depth_write == write {
            return;
        }
        self.depth_write = write;
        self.apply_depth_mask();
    }

    pub fn depth_mask(&self) -> bool {
        self.depth_write
    }

    fn apply_depth_func(&mut self) {
        let compare = if self.caps.contains(Caps::DEPTH_TEST) {
            self.depth_func.to_reversed_depth()
        } else {
            DepthCompare::Always
        };
        self.ctx.set_depth_compare(compare);
        self.dirty = true;
    }

    fn apply_depth_mask(&mut self) {
        self.ctx.set_depth_write_disable(!self.depth_write);
        self.dirty = true;
    }

    // --- blending and alpha test ---

    pub fn set_blend_func(&mut self, src: BlendFunc, dst: BlendFunc) -> Result<(), GlError> {
        // validate both before committing either
        src.to_src_factor()?;
        dst.to_dst_factor()?;
        if self.blend_src == src && self.blend_dst == dst {
            return Ok(());
        }
        self.blend_src = src;
        self.blend_dst = dst;
        self.apply_blend_or_alpha_test();
        Ok(())
    }

    pub fn blend_func(&self) -> (BlendFunc, BlendFunc) {
        (self.blend_src, self.blend_dst)
    }

    pub fn set_alpha_func(&mut self, func: CompareFunc, reference: f32) {
        let reference = clamp01(reference);
        if self.alpha_func == func && self.alpha_ref == reference {
            return;
        }
        self.alpha_func = func;
        self.alpha_ref = reference;
        self.apply_blend_or_alpha_test();
    }

    pub fn alpha_func(&self) -> (CompareFunc, f32) {
        (self.alpha_func, self.alpha_ref)
    }

    /// Punch-through compare reference, for the backend's global
    /// register
    pub fn alpha_ref(&self) -> f32 {
        self.alpha_ref
    }

    /// Blending and alpha test are mutually exclusive in hardware and
    /// decide the list target; blending wins when both are enabled.
    fn apply_blend_or_alpha_test(&mut self) {
        if self.caps.contains(Caps::BLEND) {
            // validated in set_blend_func
            let src = self.blend_src.to_src_factor().unwrap_or(BlendFactor::One);
            let dst = self.blend_dst.to_dst_factor().unwrap_or(BlendFactor::Zero);
            self.ctx.modes.set_blend_modes(src, dst);
            self.ctx.set_list(ListKind::BlendPoly);
        } else if self.caps.contains(Caps::ALPHA_TEST)
            && self.alpha_func != CompareFunc::Always
        {
            match self.alpha_func {
                CompareFunc::Greater | CompareFunc::Gequal => {
                    self.ctx
                        .modes
                        .set_blend_modes(BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha);
                    self.ctx.set_list(ListKind::PunchThrough);
                }
                func => {
                    // only GEQUAL-style tests exist in hardware
                    log::warn!("alpha test {:?} unsupported, drawing opaque", func);
                    self.ctx
                        .modes
                        .set_blend_modes(BlendFactor::One, BlendFactor::Zero);
                    self.ctx.set_list(ListKind::OpaquePoly);
                }
            }
        } else {
            self.ctx
                .modes
                .set_blend_modes(BlendFactor::One, BlendFactor::Zero);
            self.ctx.set_list(ListKind::OpaquePoly);
        }
        self.dirty = true;
    }

    // --- culling ---

    pub fn set_cull_face(&mut self, face: Face) {
        if self.cull_face == face {
            return;
        }
        self.cull_face = face;
        self.apply_culling();
    }

    pub fn cull_face(&self) -> Face {
        self.cull_face
    }

    pub fn set_front_face(&mut self, winding: Winding) {
        if self.front_face == winding {
            return;
        }
        self.front_face = winding;
        self.apply_culling();
    }

    pub fn front_face(&self) -> Winding {
        self.front_face
    }

    /// Whether filled primitives should be dropped entirely: culling
    /// both faces has no hardware mode, so it is resolved here. Lines
    /// and points are unaffected, as culling never applies to them.
    pub fn culls_filled(&self) -> bool {
        self.caps.contains(Caps::CULL_FACE) && self.cull_face == Face::FrontAndBack
    }

    fn apply_culling(&mut self) {
        let cull = if self.caps.contains(Caps::CULL_FACE) {
            match (self.front_face, self.cull_face) {
                // culling both faces is handled by culls_filled()
                (_, Face::FrontAndBack) => CullMode::Small,
                (Winding::Ccw, Face::Back) => CullMode::Cw,
                (Winding::Ccw, Face::Front) => CullMode::Ccw,
                (Winding::Cw, Face::Back) => CullMode::Ccw,
                (Winding::Cw, Face::Front) => CullMode::Cw,
            }
        } else {
            // minimum culling: reject zero-area triangles only
            CullMode::Small
        };
        self.ctx.set_cull_mode(cull);
        self.dirty = true;
    }

    // --- shading ---

    pub fn set_shade_model(&mut self, model: ShadeModel) {
        if self.shade_model == model {
            return;
        }
        self.shade_model = model;
        self.apply_shade_model();
    }

    pub fn shade_model(&self) -> ShadeModel {
        self.shade_model
    }

    /// Whether vertex colors are interpolated; the clip stage keys its
    /// color handling off this
    pub fn gouraud(&self) -> bool {
        self.shade_model == ShadeModel::Smooth
    }

    fn apply_shade_model(&mut self) {
        self.ctx.set_gouraud(self.shade_model == ShadeModel::Smooth);
        self.dirty = true;
    }

    // --- texture environment ---

    pub fn set_tex_env(&mut self, env: TexEnv) {
        if self.tex_env == env {
            return;
        }
        self.tex_env = env;
        self.apply_tex_env();
    }

    pub fn tex_env(&self) -> TexEnv {
        self.tex_env
    }

    fn apply_tex_env(&mut self) {
        self.ctx.modes.set_texenv(self.tex_env);
        self.dirty = true;
    }

    // --- fog ---

    pub fn set_fog_kind(&mut self, kind: FogKind) {
        if self.fog.kind != kind {
            self.fog.kind = kind;
            self.fog.table_dirty = true;
        }
    }

    pub fn set_fog_density(&mut self, density: f32) -> Result<(), GlError> {
        if density < 0.0 {
            return Err(GlError::InvalidValue);
        }
        if self.fog.density != density {
            self.fog.density = density;
            self.fog.table_dirty = true;
        }
        Ok(())
    }

    pub fn set_fog_start(&mut self, start: f32) {
        if self.fog.start != start {
            self.fog.start = start;
            self.fog.table_dirty = true;
        }
    }

    pub fn set_fog_end(&mut self, end: f32) {
        if self.fog.end != end {
            self.fog.end = end;
            self.fog.table_dirty = true;
        }
    }

    pub fn set_fog_color(&mut self, color: [f32; 4]) {
        let color = color.map(clamp01);
        if self.fog.color != color {
            self.fog.color = color;
            self.fog.color_dirty = true;
        }
    }

    fn apply_fog(&mut self) {
        use crate::core::context::HwFogMode;
        let mode = if self.caps.contains(Caps::FOG) {
            HwFogMode::Table
        } else {
            HwFogMode::Disable
        };
        self.ctx.modes.set_fog_mode(mode);
        self.dirty = true;
    }

    /// Push pending fog table/color changes to the hardware's global
    /// registers
    pub fn apply_fog_globals<B: TileAccelerator>(&mut self, ta: &mut B) {
        if self.fog.table_dirty {
            let curve = match self.fog.kind {
                FogKind::Exp => FogCurve::Exp { density: self.fog.density },
                FogKind::Exp2 => FogCurve::Exp2 { density: self.fog.density },
                FogKind::Linear => FogCurve::Linear {
                    start: self.fog.start,
                    end: self.fog.end,
                },
            };
            ta.set_fog(self.fog.end, curve);
            self.fog.table_dirty = false;
        }
        if self.fog.color_dirty {
            let [r, g, b, a] = self.fog.color;
            ta.set_fog_color([a, r, g, b]);
            self.fog.color_dirty = false;
        }
    }

    // --- clear values ---

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba.map(clamp01);
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        self.clear_depth = clamp01(depth);
    }

    pub fn clear_depth(&self) -> f32 {
        self.clear_depth
    }

    // --- submission ---

    /// Route the command stream to the header's list and, if anything
    /// changed since the last submit, append the header itself
    pub fn submit(&mut self, cmdbuf: &mut CommandBuffers) {
        cmdbuf.select(self.ctx.list());
        if self.dirty {
            log::trace!(
                "state dirty, appending header to {:?} at {}",
                self.ctx.list(),
                cmdbuf.position()
            );
            cmdbuf.push_block(self.ctx.as_bytes());
            self.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identification_strings_are_populated() {
        assert_eq!(get_string(StringName::Vendor), "pvrgl contributors");
        assert!(get_string(StringName::Version).starts_with("1.1 pvrgl-"));
        assert!(get_string(StringName::Extensions).contains("GL_EXT_fog_coord"));
    }

    #[test]
    fn depth_comparisons_are_reversed() {
        let mut s = StateEncoder::new();
        s.enable(Caps::DEPTH_TEST);
        s.set_depth_func(CompareFunc::Less);
        assert_eq!(s.context().depth_compare_raw(), DepthCompare::Greater as u32);
        s.set_depth_func(CompareFunc::Lequal);
        assert_eq!(s.context().depth_compare_raw(), DepthCompare::Gequal as u32);
        s.set_depth_func(CompareFunc::Equal);
        assert_eq!(s.context().depth_compare_raw(), DepthCompare::Equal as u32);
    }

    #[test]
    fn depth_test_disabled_means_always_pass() {
        let mut s = StateEncoder::new();
        s.set_depth_func(CompareFunc::Less);
        assert_eq!(s.context().depth_compare_raw(), DepthCompare::Always as u32);
    }

    #[test]
    fn noop_setter_does_not_dirty() {
        let mut s = StateEncoder::new();
        let mut cb = CommandBuffers::new();
        s.submit(&mut cb);
        assert!(!s.is_dirty());
        s.set_depth_mask(true); // already true
        s.set_cull_face(Face::Back); // already back
        s.set_shade_model(ShadeModel::Smooth); // already smooth
        s.set_alpha_func(CompareFunc::Always, 0.0); // constructor defaults
        assert!(!s.is_dirty());
        s.submit(&mut cb);
        assert_eq!(cb.position(), 32);
        s.set_depth_mask(false);
        assert!(s.is_dirty());
        s.set_alpha_func(CompareFunc::Gequal, 0.5);
        s.submit(&mut cb);
        s.set_alpha_func(CompareFunc::Gequal, 0.5); // repeat
        s.submit(&mut cb);
        assert_eq!(cb.position(), 64);
    }

    #[test]
    fn submit_appends_header_only_when_dirty() {
        let mut s = StateEncoder::new();
        let mut cb = CommandBuffers::new();
        s.submit(&mut cb);
        assert_eq!(cb.position(), 32);
        s.submit(&mut cb);
        assert_eq!(cb.position(), 32);
        s.set_depth_mask(false);
        s.submit(&mut cb);
        assert_eq!(cb.position(), 64);
    }

    #[test]
    fn blend_routes_to_translucent_list() {
        let mut s = StateEncoder::new();
        s.set_blend_func(BlendFunc::SrcAlpha, BlendFunc::OneMinusSrcAlpha)
            .unwrap();
        s.enable(Caps::BLEND);
        assert_eq!(s.context().list(), ListKind::BlendPoly);
        assert_eq!(s.context().modes.src_blend_raw(), BlendFactor::SrcAlpha as u32);
        assert_eq!(
            s.context().modes.dst_blend_raw(),
            BlendFactor::InvSrcAlpha as u32
        );
        s.disable(Caps::BLEND);
        assert_eq!(s.context().list(), ListKind::OpaquePoly);
        assert_eq!(s.context().modes.src_blend_raw(), BlendFactor::One as u32);
    }

    #[test]
    fn blend_factor_sides_are_validated() {
        let mut s = StateEncoder::new();
        // the hardware cannot read the source side as "src color"
        assert_eq!(
            s.set_blend_func(BlendFunc::SrcColor, BlendFunc::One),
            Err(GlError::InvalidEnum)
        );
        assert_eq!(
            s.set_blend_func(BlendFunc::One, BlendFunc::DstColor),
            Err(GlError::InvalidEnum)
        );
        s.set_blend_func(BlendFunc::DstColor, BlendFunc::SrcColor)
            .unwrap();
    }

    #[test]
    fn supported_alpha_test_routes_to_punchthrough() {
        let mut s = StateEncoder::new();
        s.enable(Caps::ALPHA_TEST);
        s.set_alpha_func(CompareFunc::Gequal, 0.5);
        assert_eq!(s.context().list(), ListKind::PunchThrough);
        assert_eq!(s.context().modes.src_blend_raw(), BlendFactor::SrcAlpha as u32);
        // unsupported comparison degrades to opaque
        s.set_alpha_func(CompareFunc::Less, 0.5);
        assert_eq!(s.context().list(), ListKind::OpaquePoly);
    }

    #[test]
    fn blend_wins_over_alpha_test() {
        let mut s = StateEncoder::new();
        s.enable(Caps::ALPHA_TEST);
        s.set_alpha_func(CompareFunc::Greater, 0.5);
        s.enable(Caps::BLEND);
        assert_eq!(s.context().list(), ListKind::BlendPoly);
    }

    #[test]
    fn cull_resolution_by_winding() {
        let mut s = StateEncoder::new();
        assert_eq!(s.context().cull_mode_raw(), CullMode::Small as u32);
        s.enable(Caps::CULL_FACE);
        // ccw front, cull back: reject cw-wound screen triangles
        assert_eq!(s.context().cull_mode_raw(), CullMode::Cw as u32);
        s.set_cull_face(Face::Front);
        assert_eq!(s.context().cull_mode_raw(), CullMode::Ccw as u32);
        s.set_front_face(Winding::Cw);
        assert_eq!(s.context().cull_mode_raw(), CullMode::Cw as u32);
        s.set_cull_face(Face::Back);
        assert_eq!(s.context().cull_mode_raw(), CullMode::Ccw as u32);
    }

    #[test]
    fn tex_env_reaches_descriptor() {
        let mut s = StateEncoder::new();
        assert_eq!(s.context().modes.texenv_raw(), TexEnv::Modulate as u32);
        s.set_tex_env(TexEnv::Decal);
        assert_eq!(s.context().modes.texenv_raw(), TexEnv::Decal as u32);
        let mut cb = CommandBuffers::new();
        s.submit(&mut cb);
        s.set_tex_env(TexEnv::Decal); // repeat
        assert!(!s.is_dirty());
        s.set_tex_env(TexEnv::Replace);
        assert!(s.is_dirty());
    }

    #[test]
    fn front_and_back_drops_filled_primitives() {
        let mut s = StateEncoder::new();
        s.set_cull_face(Face::FrontAndBack);
        assert!(!s.culls_filled());
        s.enable(Caps::CULL_FACE);
        assert!(s.culls_filled());
    }

    #[test]
    fn fog_globals_flush_once() {
        use crate::core::backend::ReferenceTa;
        let mut s = StateEncoder::new();
        let mut ta = ReferenceTa::new();
        s.set_fog_kind(FogKind::Linear);
        s.set_fog_start(10.0);
        s.set_fog_end(100.0);
        s.apply_fog_globals(&mut ta);
        assert_eq!(
            ta.fog,
            Some((100.0, FogCurve::Linear { start: 10.0, end: 100.0 }))
        );
        ta.fog = None;
        s.apply_fog_globals(&mut ta);
        assert_eq!(ta.fog, None, "clean fog state must not reprogram");
    }

    #[test]
    fn shade_model_tracks_gouraud_bit() {
        let mut s = StateEncoder::new();
        assert!(s.context().gouraud());
        s.set_shade_model(ShadeModel::Flat);
        assert!(!s.context().gouraud());
        assert!(!s.gouraud());
    }
}
