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

//! System integration module
//!
//! [`RenderContext`] ties the pipeline components together over one
//! tile-accelerator backend and exposes the GL-flavored immediate-mode
//! surface. Usage errors follow the `glGetError` model: the offending
//! call becomes a no-op, the first error since the last [`error`]
//! query is latched, and the program keeps running. Only scene
//! bracketing returns results, because a failed submission is a
//! per-frame hardware condition rather than a usage bug.
//!
//! [`error`]: RenderContext::error

use crate::core::backend::TileAccelerator;
use crate::core::cmdbuf::CommandBuffers;
use crate::core::context::{PixelFormat, TexEnv};
use crate::core::error::{ErrorLatch, GlError, TaResult};
use crate::core::matrix::{Matrices, Matrix4, MatrixMode};
use crate::core::prim::{PrimPipeline, Topology};
use crate::core::state::{
    self, BlendFunc, Caps, CompareFunc, Face, FogKind, ShadeModel, StateEncoder, StringName,
    Winding,
};
use crate::core::texture::format::{UploadFormat, UploadType};
use crate::core::texture::{MagFilter, MinFilter, TexturePool, WrapMode};

/// The full rendering pipeline over one backend
///
/// # Example
/// ```
/// use pvrgl::core::backend::ReferenceTa;
/// use pvrgl::core::prim::Topology;
/// use pvrgl::core::system::RenderContext;
///
/// let mut gl = RenderContext::new(ReferenceTa::new(), false);
/// gl.begin_scene().unwrap();
/// gl.begin(Topology::Triangles);
/// gl.color4(1.0, 0.0, 0.0, 1.0);
/// gl.vertex3(-1.0, -1.0, 0.0);
/// gl.vertex3(1.0, -1.0, 0.0);
/// gl.vertex3(0.0, 1.0, 0.0);
/// gl.end();
/// gl.end_scene().unwrap();
/// assert_eq!(gl.error(), None);
/// ```
pub struct RenderContext<B: TileAccelerator> {
    backend: B,
    latch: ErrorLatch,
    matrices: Matrices,
    state: StateEncoder,
    prim: PrimPipeline,
    cmdbuf: CommandBuffers,
    textures: TexturePool,
    in_scene: bool,
}

impl<B: TileAccelerator> RenderContext<B> {
    /// Build a context over `backend`; `fsaa` doubles the horizontal
    /// render resolution
    pub fn new(mut backend: B, fsaa: bool) -> RenderContext<B> {
        let textures = TexturePool::new(backend.vram_mut());
        let mut matrices = Matrices::new();
        matrices.set_fsaa(fsaa);
        let mut ctx = RenderContext {
            backend,
            latch: ErrorLatch::new(),
            matrices,
            state: StateEncoder::new(),
            prim: PrimPipeline::new(),
            cmdbuf: CommandBuffers::new(),
            textures,
            in_scene: false,
        };
        ctx.textures.apply(&mut ctx.state);
        ctx
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Render state, for inspection
    pub fn state(&self) -> &StateEncoder {
        &self.state
    }

    /// First usage error since the last call, clearing the latch
    pub fn error(&mut self) -> Option<GlError> {
        self.latch.take()
    }

    // --- scene bracketing ---

    /// Open a frame: waits out any in-flight DMA, opens the scene, and
    /// re-programs the global registers the frame depends on
    pub fn begin_scene(&mut self) -> TaResult<()> {
        if !self.backend.dma_ready() {
            self.backend.wait_dma();
        }
        self.backend.scene_begin()?;
        self.in_scene = true;
        self.cmdbuf.clear(&self.backend);
        let [r, g, b, _] = self.state.clear_color();
        self.backend.set_background([r, g, b]);
        self.backend.set_alpha_compare(self.state.alpha_ref());
        self.state.apply_fog_globals(&mut self.backend);
        // the first draw of a frame always carries a header
        self.state.mark_dirty();
        Ok(())
    }

    /// Close the frame: flushes every buffered list and hands the scene
    /// to the hardware
    ///
    /// Called inside an open `begin`/`end` bracket, the primitive is
    /// discarded and `InvalidOperation` is latched, but the frame still
    /// completes.
    pub fn end_scene(&mut self) -> TaResult<()> {
        if self.prim.in_begin() {
            log::warn!("end_scene inside begin/end, dropping open primitive");
            self.latch.record(GlError::InvalidOperation);
            self.prim.abort();
        }
        let flushed = self.cmdbuf.flush(&mut self.backend);
        let finished = self.backend.scene_finish();
        self.in_scene = false;
        flushed?;
        finished
    }

    pub fn in_scene(&self) -> bool {
        self.in_scene
    }

    // --- matrices ---

    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        if self.prim.in_begin() {
            self.latch.record(GlError::InvalidOperation);
            return;
        }
        self.matrices.set_matrix_mode(mode);
    }

    pub fn push_matrix(&mut self) {
        if let Err(e) = self.matrices.push() {
            self.latch.record(e);
        }
    }

    pub fn pop_matrix(&mut self) {
        if let Err(e) = self.matrices.pop() {
            self.latch.record(e);
        }
    }

    pub fn load_identity(&mut self) {
        self.matrices.load_identity();
    }

    pub fn load_matrix(&mut self, m: &Matrix4) {
        self.matrices.load_matrix(m);
    }

    pub fn mult_matrix(&mut self, m: &Matrix4) {
        self.matrices.mult_matrix(m);
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.matrices.translate(x, y, z);
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.matrices.scale(x, y, z);
    }

    /// Rotate `angle` degrees about `(x, y, z)`
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        self.matrices.rotate(angle, x, y, z);
    }

    pub fn frustum(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) {
        if let Err(e) = self.matrices.frustum(l, r, b, t, n, f) {
            self.latch.record(e);
        }
    }

    pub fn ortho(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) {
        if let Err(e) = self.matrices.ortho(l, r, b, t, n, f) {
            self.latch.record(e);
        }
    }

    pub fn perspective(&mut self, fovy: f32, aspect: f32, near: f32, far: f32) {
        if let Err(e) = self.matrices.perspective(fovy, aspect, near, far) {
            self.latch.record(e);
        }
    }

    pub fn ortho_2d(&mut self, l: f32, r: f32, b: f32, t: f32) {
        if let Err(e) = self.matrices.ortho_2d(l, r, b, t) {
            self.latch.record(e);
        }
    }

    pub fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.matrices.set_viewport(x, y, width, height);
    }

    // --- render state ---

    pub fn enable(&mut self, cap: Caps) {
        self.state.enable(cap);
        if cap.contains(Caps::TEXTURE_2D) {
            self.textures.apply(&mut self.state);
        }
    }

    pub fn disable(&mut self, cap: Caps) {
        self.state.disable(cap);
        if cap.contains(Caps::TEXTURE_2D) {
            self.textures.apply(&mut self.state);
        }
    }

    pub fn depth_func(&mut self, func: CompareFunc) {
        self.state.set_depth_func(func);
    }

    pub fn depth_mask(&mut self, write: bool) {
        self.state.set_depth_mask(write);
    }

    pub fn blend_func(&mut self, src: BlendFunc, dst: BlendFunc) {
        if let Err(e) = self.state.set_blend_func(src, dst) {
            self.latch.record(e);
        }
    }

    /// Alpha test comparison; the reference goes to a global register,
    /// so it is programmed immediately as well as at scene begin
    pub fn alpha_func(&mut self, func: CompareFunc, reference: f32) {
        self.state.set_alpha_func(func, reference);
        self.backend.set_alpha_compare(self.state.alpha_ref());
    }

    pub fn cull_face(&mut self, face: Face) {
        self.state.set_cull_face(face);
    }

    pub fn front_face(&mut self, winding: Winding) {
        self.state.set_front_face(winding);
    }

    pub fn shade_model(&mut self, model: ShadeModel) {
        self.state.set_shade_model(model);
    }

    /// How texel color combines with the vertex color
    pub fn tex_env(&mut self, env: TexEnv) {
        self.state.set_tex_env(env);
    }

    pub fn fog_kind(&mut self, kind: FogKind) {
        self.state.set_fog_kind(kind);
    }

    pub fn fog_density(&mut self, density: f32) {
        if let Err(e) = self.state.set_fog_density(density) {
            self.latch.record(e);
        }
    }

    pub fn fog_start(&mut self, start: f32) {
        self.state.set_fog_start(start);
    }

    pub fn fog_end(&mut self, end: f32) {
        self.state.set_fog_end(end);
    }

    pub fn fog_color(&mut self, rgba: [f32; 4]) {
        self.state.set_fog_color(rgba);
    }

    pub fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.state.set_clear_color([r, g, b, a]);
    }

    pub fn clear_depth(&mut self, depth: f32) {
        self.state.set_clear_depth(depth);
    }

    /// The hardware clears every tile as it renders, so an explicit
    /// clear has nothing to do; the clear color is applied to the
    /// background plane at scene begin.
    pub fn clear(&mut self) {
        log::trace!("clear requested; tile hardware always clears");
    }

    pub fn get_string(&self, name: StringName) -> &'static str {
        state::get_string(name)
    }

    // --- primitives ---

    pub fn set_near_clip(&mut self, nearclip: f32) {
        if let Err(e) = self.prim.set_near_clip(nearclip) {
            self.latch.record(e);
        }
    }

    pub fn begin(&mut self, topology: Topology) {
        if let Err(e) = self.prim.begin(topology) {
            self.latch.record(e);
        }
    }

    pub fn end(&mut self) {
        if let Err(e) = self.prim.end(&mut self.state, &mut self.matrices, &mut self.cmdbuf) {
            self.latch.record(e);
        }
    }

    pub fn vertex2(&mut self, x: f32, y: f32) {
        self.prim.vertex2(x, y);
    }

    pub fn vertex3(&mut self, x: f32, y: f32, z: f32) {
        self.prim.vertex3(x, y, z);
    }

    pub fn vertex4(&mut self, x: f32, y: f32, z: f32, w: f32) {
        self.prim.vertex4(x, y, z, w);
    }

    pub fn color3(&mut self, r: f32, g: f32, b: f32) {
        self.prim.color(r, g, b, 1.0);
    }

    pub fn color4(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.prim.color(r, g, b, a);
    }

    pub fn tex_coord(&mut self, u: f32, v: f32) {
        self.prim.tex_coord(u, v);
    }

    pub fn fog_coord(&mut self, dist: f32) {
        self.prim.fog_coord(dist);
    }

    pub fn secondary_color(&mut self, r: f32, g: f32, b: f32) {
        self.prim.secondary_color(r, g, b);
    }

    /// Accepted for source compatibility; there is no lighting stage,
    /// so normals never reach the hardware
    pub fn normal(&mut self, _x: f32, _y: f32, _z: f32) {}

    /// Axis-aligned rectangle as a single polygon
    pub fn rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        if let Err(e) = self
            .prim
            .rect(x1, y1, x2, y2, &mut self.state, &mut self.matrices, &mut self.cmdbuf)
        {
            self.latch.record(e);
        }
    }

    // --- textures ---

    pub fn gen_textures(&mut self, count: usize) -> Vec<u32> {
        self.textures.gen(count)
    }

    pub fn bind_texture(&mut self, name: u32) {
        if let Err(e) = self.textures.bind(name, &mut self.state) {
            self.latch.record(e);
        }
    }

    pub fn delete_textures(&mut self, names: &[u32]) {
        self.textures
            .delete(names, self.backend.vram_mut(), &mut self.state);
    }

    pub fn is_texture(&self, name: u32) -> bool {
        self.textures.is_texture(name)
    }

    #[allow(clippy::too_many_arguments)]
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
    ) {
        if let Err(e) = self.textures.tex_image_2d(
            level,
            internal,
            width,
            height,
            border,
            fmt,
            ty,
            data,
            self.backend.vram_mut(),
            &mut self.state,
        ) {
            self.latch.record(e);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn tex_sub_image_2d(
        &mut self,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        fmt: UploadFormat,
        ty: UploadType,
        data: &[u8],
    ) {
        if let Err(e) = self.textures.tex_sub_image_2d(
            level,
            x,
            y,
            width,
            height,
            fmt,
            ty,
            data,
            self.backend.vram_mut(),
        ) {
            self.latch.record(e);
        }
    }

    /// Upload a pre-packed (VQ or pre-twiddled) image
    pub fn compressed_tex_image_2d(
        &mut self,
        internal: PixelFormat,
        width: u32,
        height: u32,
        vq: bool,
        mipmapped: bool,
        data: &[u8],
    ) {
        if let Err(e) = self.textures.compressed_tex_image_2d(
            internal,
            width,
            height,
            vq,
            mipmapped,
            data,
            self.backend.vram_mut(),
            &mut self.state,
        ) {
            self.latch.record(e);
        }
    }

    pub fn tex_min_filter(&mut self, filter: MinFilter) {
        self.textures.set_min_filter(filter, &mut self.state);
    }

    pub fn tex_mag_filter(&mut self, filter: MagFilter) {
        self.textures.set_mag_filter(filter, &mut self.state);
    }

    pub fn tex_wrap_s(&mut self, wrap: WrapMode) {
        self.textures.set_wrap_s(wrap, &mut self.state);
    }

    pub fn tex_wrap_t(&mut self, wrap: WrapMode) {
        self.textures.set_wrap_t(wrap, &mut self.state);
    }

    pub fn generate_mipmap(&mut self) {
        if let Err(e) = self
            .textures
            .generate_mipmap(self.backend.vram_mut(), &mut self.state)
        {
            self.latch.record(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::ReferenceTa;
    use crate::core::context::{ListKind, PvrContext};
    use crate::core::prim::TaVertex;

    fn gl() -> RenderContext<ReferenceTa> {
        let _ = env_logger::builder().is_test(true).try_init();
        RenderContext::new(ReferenceTa::new(), false)
    }

    fn list(gl: &RenderContext<ReferenceTa>, kind: ListKind) -> Vec<u8> {
        gl.backend()
            .last_scene()
            .expect("a scene was recorded")
            .lists[kind.index()]
            .clone()
    }

    fn vertex_at(bytes: &[u8], index: usize) -> TaVertex {
        let start = PvrContext::BYTES + index * 64;
        bytemuck::pod_read_unaligned(&bytes[start..start + 64])
    }

    #[test]
    fn triangle_frame_produces_header_and_records() {
        let mut gl = gl();
        gl.begin_scene().unwrap();
        gl.begin(Topology::Triangles);
        gl.vertex3(-1.0, -1.0, 0.0);
        gl.vertex3(1.0, -1.0, 0.0);
        gl.vertex3(0.0, 1.0, 0.0);
        gl.end();
        gl.end_scene().unwrap();

        assert_eq!(gl.error(), None);
        let opaque = list(&gl, ListKind::OpaquePoly);
        // one 32-byte header plus three 64-byte vertex records
        assert_eq!(opaque.len(), 32 + 3 * 64);
        let v = vertex_at(&opaque, 2);
        // viewport maps clip (0,1) to screen center-top; w=1 so z=1
        assert_eq!(v.x, 320.0);
        assert_eq!(v.y, 0.0);
        assert_eq!(v.z, 1.0);
    }

    #[test]
    fn near_plane_clip_expands_triangle_to_quad() {
        let mut gl = gl();
        gl.set_near_clip(0.1);
        gl.begin_scene().unwrap();
        gl.begin(Topology::Triangles);
        gl.vertex4(-1.0, -1.0, 0.0, 1.0);
        gl.vertex4(1.0, -1.0, 0.0, 1.0);
        gl.vertex4(0.0, 1.0, 0.0, 0.05); // behind the near plane
        gl.end();
        gl.end_scene().unwrap();

        let opaque = list(&gl, ListKind::OpaquePoly);
        assert_eq!(opaque.len(), 32 + 4 * 64);
    }

    #[test]
    fn unchanged_state_emits_one_header_for_two_draws() {
        let mut gl = gl();
        gl.begin_scene().unwrap();
        for _ in 0..2 {
            gl.begin(Topology::Triangles);
            gl.vertex3(-1.0, -1.0, 0.0);
            gl.vertex3(1.0, -1.0, 0.0);
            gl.vertex3(0.0, 1.0, 0.0);
            gl.end();
        }
        gl.end_scene().unwrap();

        let opaque = list(&gl, ListKind::OpaquePoly);
        assert_eq!(opaque.len(), 32 + 6 * 64);
    }

    #[test]
    fn state_change_between_draws_emits_second_header() {
        let mut gl = gl();
        gl.begin_scene().unwrap();
        gl.begin(Topology::Triangles);
        gl.vertex3(-1.0, -1.0, 0.0);
        gl.vertex3(1.0, -1.0, 0.0);
        gl.vertex3(0.0, 1.0, 0.0);
        gl.end();
        gl.depth_mask(false);
        gl.begin(Topology::Triangles);
        gl.vertex3(-1.0, -1.0, 0.0);
        gl.vertex3(1.0, -1.0, 0.0);
        gl.vertex3(0.0, 1.0, 0.0);
        gl.end();
        gl.end_scene().unwrap();

        let opaque = list(&gl, ListKind::OpaquePoly);
        assert_eq!(opaque.len(), 2 * 32 + 6 * 64);
    }

    #[test]
    fn blended_draw_lands_in_translucent_list() {
        let mut gl = gl();
        gl.enable(Caps::BLEND);
        gl.blend_func(BlendFunc::SrcAlpha, BlendFunc::OneMinusSrcAlpha);
        gl.begin_scene().unwrap();
        gl.begin(Topology::Triangles);
        gl.vertex3(-1.0, -1.0, 0.0);
        gl.vertex3(1.0, -1.0, 0.0);
        gl.vertex3(0.0, 1.0, 0.0);
        gl.end();
        gl.end_scene().unwrap();

        assert!(list(&gl, ListKind::OpaquePoly).is_empty());
        assert_eq!(list(&gl, ListKind::BlendPoly).len(), 32 + 3 * 64);
    }

    #[test]
    fn end_scene_inside_begin_latches_and_still_finishes() {
        let mut gl = gl();
        gl.begin_scene().unwrap();
        gl.begin(Topology::Triangles);
        gl.vertex3(0.0, 0.0, 0.0);
        gl.end_scene().unwrap();
        assert_eq!(gl.error(), Some(GlError::InvalidOperation));
        assert!(gl.backend().last_scene().unwrap().finished);
        // the dropped primitive leaves nothing behind
        gl.begin_scene().unwrap();
        gl.end_scene().unwrap();
        assert_eq!(gl.error(), None);
    }

    #[test]
    fn error_latch_keeps_first_error() {
        let mut gl = gl();
        gl.matrix_mode(MatrixMode::Projection);
        gl.push_matrix();
        gl.push_matrix();
        gl.push_matrix(); // depth 2 exceeded
        gl.blend_func(BlendFunc::SrcColor, BlendFunc::One); // also invalid
        assert_eq!(gl.error(), Some(GlError::StackOverflow));
        assert_eq!(gl.error(), None);
    }

    #[test]
    fn matrix_mode_inside_bracket_is_rejected() {
        let mut gl = gl();
        gl.begin_scene().unwrap();
        gl.begin(Topology::Triangles);
        gl.matrix_mode(MatrixMode::Projection);
        assert_eq!(gl.error(), Some(GlError::InvalidOperation));
        gl.end();
        gl.end_scene().unwrap();
    }

    #[test]
    fn clear_color_reaches_background_register() {
        let mut gl = gl();
        gl.clear_color(0.25, 0.5, 0.75, 1.0);
        gl.begin_scene().unwrap();
        gl.end_scene().unwrap();
        assert_eq!(gl.backend().background, [0.25, 0.5, 0.75]);
    }

    #[test]
    fn alpha_ref_programs_global_register() {
        let mut gl = gl();
        gl.alpha_func(CompareFunc::Gequal, 0.5);
        assert_eq!(gl.backend().alpha_compare, 0.5);
        // clamped
        gl.alpha_func(CompareFunc::Gequal, 2.0);
        assert_eq!(gl.backend().alpha_compare, 1.0);
    }

    #[test]
    fn textured_draw_carries_texture_descriptor() {
        let mut gl = gl();
        gl.enable(Caps::TEXTURE_2D);
        let name = gl.gen_textures(1)[0];
        gl.bind_texture(name);
        gl.tex_image_2d(
            0,
            PixelFormat::Rgb565,
            8,
            8,
            0,
            UploadFormat::Rgba,
            UploadType::UnsignedByte,
            &[0xFF; 8 * 8 * 4],
        );
        assert_eq!(gl.error(), None);

        gl.begin_scene().unwrap();
        gl.begin(Topology::Quads);
        for (x, y) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            gl.tex_coord((x + 1.0) / 2.0, (y + 1.0) / 2.0);
            gl.vertex2(x, y);
        }
        gl.end();
        gl.end_scene().unwrap();

        let opaque = list(&gl, ListKind::OpaquePoly);
        assert_eq!(opaque.len(), 32 + 4 * 64);
        let header: PvrContext = bytemuck::pod_read_unaligned(&opaque[..32]);
        assert!(header.textured());
        assert!(header.modes.twiddled());
    }

    #[test]
    fn texture_lifecycle_through_facade() {
        let mut gl = gl();
        let names = gl.gen_textures(2);
        gl.bind_texture(names[0]);
        assert!(gl.is_texture(names[0]));
        gl.delete_textures(&names[..1]);
        assert!(!gl.is_texture(names[0]));
        assert_eq!(gl.error(), None);
    }

    #[test]
    fn two_frames_bracket_cleanly() {
        let mut gl = gl();
        for _ in 0..2 {
            gl.begin_scene().unwrap();
            gl.rect(-0.5, -0.5, 0.5, 0.5);
            gl.end_scene().unwrap();
        }
        assert_eq!(gl.backend().scenes().len(), 2);
        assert!(gl.backend().scenes().iter().all(|s| s.finished));
        assert_eq!(gl.error(), None);
    }
}
