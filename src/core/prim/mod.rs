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

//! Immediate-mode vertex assembly, near clipping, and vertex emission
//!
//! Vertices collect in a fixed-capacity buffer between `begin` and
//! `end`. At `end` they are transformed by the combined screen matrix,
//! the state header is flushed if dirty, and the buffered primitive is
//! broken down into the strips the hardware understands.
//!
//! The tile accelerator rasterizes in screen space and cannot handle
//! vertices behind the eye, so primitives straddling the near plane are
//! clipped in homogeneous space against `w = nearclip`
//! (Sutherland-Hodgman, single plane) before the perspective divide.
//! Flat-shaded clips copy the provoking vertex's color onto
//! intersection points; gouraud clips interpolate.
//!
//! Each emitted vertex record stores `1/w` in its z slot: the hardware
//! depth-buffers on 1/w, which is why larger values are nearer.
//!
//! Triangle fans are re-emitted as paired two-triangle strips, and
//! independent triangles/quads as per-3/per-4 strips. Lines and points
//! have no hardware equivalent at all and are expanded into thin
//! screen-space quads.

use bytemuck::{Pod, Zeroable};

use crate::core::cmdbuf::CommandBuffers;
use crate::core::error::GlError;
use crate::core::matrix::{transform_point, Matrices};
use crate::core::state::StateEncoder;

/// Vertex command word for a strip continuation
pub const CMD_VERTEX: u32 = 0xe000_0000;
/// Vertex command word ending a strip
pub const CMD_VERTEX_EOL: u32 = 0xf000_0000;

/// Capacity of the begin/end vertex buffer
pub const VERTEX_BUFFER_CAPACITY: usize = 256;

/// Screen-space half-size of an expanded point, pixels
pub const POINT_SIZE: f32 = 10.0;
/// Screen-space half-width of an expanded line, pixels
pub const LINE_HALF_WIDTH: f32 = 5.0;

/// Default near clip distance; must stay positive so 1/w is finite
pub const DEFAULT_NEAR_CLIP: f32 = 0.0001;

/// One vertex as the application specifies it
///
/// `pos` is in object space until `end` transforms it to clip space.
/// `color` is in a/r/g/b order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 4],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    pub fog_coord: f32,
    pub offset_color: [f32; 3],
}

impl Vertex {
    const ZERO: Vertex = Vertex {
        pos: [0.0; 4],
        uv: [0.0; 2],
        color: [0.0; 4],
        fog_coord: 0.0,
        offset_color: [0.0; 3],
    };

    /// Perspective divide in place: x and y to screen space, w replaced
    /// by 1/w
    #[inline]
    fn perspective(&mut self) {
        let invw = 1.0 / self.pos[3];
        self.pos[0] *= invw;
        self.pos[1] *= invw;
        self.pos[3] = invw;
    }
}

/// The 64-byte vertex record the hardware consumes: position and UV in
/// the first block, base and offset colors in the second
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TaVertex {
    pub cmd: u32,
    pub x: f32,
    pub y: f32,
    /// Stores 1/w
    pub z: f32,
    pub u: f32,
    pub v: f32,
    pub _pad: [u32; 2],
    pub a: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub fog: f32,
    pub offset_r: f32,
    pub offset_g: f32,
    pub offset_b: f32,
}

/// The ten supported primitive topologies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
}

impl Topology {
    /// Whether the topology produces filled faces, for the both-faces
    /// culling rule
    fn filled(self) -> bool {
        !matches!(
            self,
            Topology::Points | Topology::Lines | Topology::LineStrip | Topology::LineLoop
        )
    }
}

/// How clip intersection points get their color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipShading {
    /// Copy the provoking vertex's color
    Flat,
    /// Interpolate along the clipped edge
    Gouraud,
}

#[inline(always)]
fn lerp(v0: f32, v1: f32, t: f32) -> f32 {
    v0 + t * (v1 - v0)
}

/// Intersection vertex on the near plane, `t` of the way from `a` to
/// `b`; `shading` supplies the color (the edge endpoints for gouraud,
/// the provoking vertex for flat)
fn intersect(a: &Vertex, b: &Vertex, t: f32, color_from: ColorFrom, nearclip: f32) -> Vertex {
    let mut out = Vertex::ZERO;
    out.pos[0] = lerp(a.pos[0], b.pos[0], t);
    out.pos[1] = lerp(a.pos[1], b.pos[1], t);
    out.pos[2] = nearclip;
    out.pos[3] = nearclip;
    out.uv[0] = lerp(a.uv[0], b.uv[0], t);
    out.uv[1] = lerp(a.uv[1], b.uv[1], t);
    out.color = match color_from {
        ColorFrom::Lerp => [
            lerp(a.color[0], b.color[0], t),
            lerp(a.color[1], b.color[1], t),
            lerp(a.color[2], b.color[2], t),
            lerp(a.color[3], b.color[3], t),
        ],
        ColorFrom::Vertex(v) => v,
    };
    out
}

#[derive(Clone, Copy)]
enum ColorFrom {
    Lerp,
    Vertex([f32; 4]),
}

/// Clip one directed polygon edge `a -> b` against `w = nearclip`
///
/// Sutherland-Hodgman edge step: emits `b` when fully inside, the
/// intersection when leaving, intersection plus `b` when entering, and
/// nothing when fully outside. Returns the number of vertices written.
pub fn clip_edge(
    a: &Vertex,
    b: &Vertex,
    provoking: &Vertex,
    shading: ClipShading,
    nearclip: f32,
    out: &mut [Vertex],
) -> usize {
    let a_dist = nearclip - a.pos[3];
    let b_dist = nearclip - b.pos[3];
    let a_in = a_dist < 0.0;
    let b_in = b_dist < 0.0;
    let color_from = match shading {
        ClipShading::Gouraud => ColorFrom::Lerp,
        ClipShading::Flat => ColorFrom::Vertex(provoking.color),
    };
    match (a_in, b_in) {
        (true, true) => {
            out[0] = *b;
            1
        }
        (true, false) => {
            let t = a_dist / (a_dist - b_dist);
            out[0] = intersect(a, b, t, color_from, nearclip);
            1
        }
        (false, true) => {
            let t = b_dist / (b_dist - a_dist);
            out[0] = intersect(b, a, t, color_from, nearclip);
            out[1] = *b;
            2
        }
        (false, false) => 0,
    }
}

/// Clip a line segment against `w = nearclip`; both endpoints survive
/// or the segment is rejected whole
pub fn clip_line(
    a: &Vertex,
    b: &Vertex,
    provoking: &Vertex,
    shading: ClipShading,
    nearclip: f32,
) -> Option<[Vertex; 2]> {
    let a_dist = nearclip - a.pos[3];
    let b_dist = nearclip - b.pos[3];
    let a_in = a_dist < 0.0;
    let b_in = b_dist < 0.0;
    let color_from = match shading {
        ClipShading::Gouraud => ColorFrom::Lerp,
        ClipShading::Flat => ColorFrom::Vertex(provoking.color),
    };
    match (a_in, b_in) {
        (true, true) => Some([*a, *b]),
        (true, false) => {
            let t = a_dist / (a_dist - b_dist);
            Some([*a, intersect(a, b, t, color_from, nearclip)])
        }
        (false, true) => {
            let t = b_dist / (b_dist - a_dist);
            Some([intersect(b, a, t, color_from, nearclip), *b])
        }
        (false, false) => None,
    }
}

/// Writes finished vertex records into the selected command buffer
struct Emitter<'a> {
    out: &'a mut CommandBuffers,
}

impl Emitter<'_> {
    /// Emit one clip-space vertex, performing the perspective divide
    fn emit(&mut self, v: &Vertex, cmd: u32) {
        let invw = 1.0 / v.pos[3];
        self.emit_record(v, v.pos[0] * invw, v.pos[1] * invw, invw, cmd);
    }

    /// Emit a vertex already in screen space (pos.w holds 1/w)
    fn emit_screen(&mut self, v: &Vertex, cmd: u32) {
        self.emit_record(v, v.pos[0], v.pos[1], v.pos[3], cmd);
    }

    fn emit_record(&mut self, v: &Vertex, x: f32, y: f32, z: f32, cmd: u32) {
        let rec = TaVertex {
            cmd,
            x,
            y,
            z,
            u: v.uv[0],
            v: v.uv[1],
            _pad: [0; 2],
            a: v.color[0],
            r: v.color[1],
            g: v.color[2],
            b: v.color[3],
            fog: v.fog_coord,
            offset_r: v.offset_color[0],
            offset_g: v.offset_color[1],
            offset_b: v.offset_color[2],
        };
        self.out.push_bytes(bytemuck::bytes_of(&rec));
    }

    /// Emit a run of vertices, ending a strip every `eol_every`
    /// vertices; pass `verts.len()` for one continuous strip
    fn send_run(&mut self, verts: &[Vertex], eol_every: usize) {
        for (i, v) in verts.iter().enumerate() {
            let cmd = if (i + 1) % eol_every == 0 {
                CMD_VERTEX_EOL
            } else {
                CMD_VERTEX
            };
            self.emit(v, cmd);
        }
    }

    fn send_triangle(&mut self, verts: &[Vertex]) {
        self.send_run(&verts[..3], 3);
    }

    /// Emit a polygon-order quad (v0 v1 v2 v3) as the strip v0 v1 v3 v2
    fn send_quad(&mut self, verts: &[Vertex]) {
        self.emit(&verts[0], CMD_VERTEX);
        self.emit(&verts[1], CMD_VERTEX);
        self.emit(&verts[3], CMD_VERTEX);
        self.emit(&verts[2], CMD_VERTEX_EOL);
    }

    /// Emit a fan as pairs of triangles packed into 2-triangle strips;
    /// an odd triangle count leads with a single-triangle strip
    fn send_trifan(&mut self, verts: &[Vertex]) {
        if verts.len() < 3 {
            return;
        }
        let root = &verts[0];
        let mut tricnt = verts.len() - 2;
        let mut cur = 1;
        if tricnt & 1 != 0 {
            self.emit(root, CMD_VERTEX);
            self.emit(&verts[cur], CMD_VERTEX);
            cur += 1;
            self.emit(&verts[cur], CMD_VERTEX_EOL);
            tricnt -= 1;
        }
        while tricnt > 0 {
            // strip (a, b, root, c) covers fan triangles
            // (root, a, b) and (root, b, c)
            self.emit(&verts[cur], CMD_VERTEX);
            cur += 1;
            self.emit(&verts[cur], CMD_VERTEX);
            self.emit(root, CMD_VERTEX);
            cur += 1;
            self.emit(&verts[cur], CMD_VERTEX_EOL);
            tricnt -= 2;
        }
    }

    /// Widen a line into a screen-space quad along its minor axis
    fn send_line(&mut self, start: &Vertex, end: &Vertex) {
        let mut quad = [*start, *start, *end, *end];
        for v in &mut quad {
            v.perspective();
        }
        let dx = (quad[2].pos[0] - quad[0].pos[0]).abs();
        let dy = (quad[2].pos[1] - quad[0].pos[1]).abs();
        let axis = if dx > dy { 1 } else { 0 };
        quad[0].pos[axis] -= LINE_HALF_WIDTH;
        quad[1].pos[axis] += LINE_HALF_WIDTH;
        quad[2].pos[axis] -= LINE_HALF_WIDTH;
        quad[3].pos[axis] += LINE_HALF_WIDTH;
        for (i, v) in quad.iter().enumerate() {
            let cmd = if i == 3 { CMD_VERTEX_EOL } else { CMD_VERTEX };
            self.emit_screen(v, cmd);
        }
    }

    /// Expand a point into a screen-space quad
    fn send_point(&mut self, point: &Vertex) {
        let mut quad = [*point; 4];
        for v in &mut quad {
            v.perspective();
        }
        quad[0].pos[1] -= POINT_SIZE;
        quad[2].pos[1] -= POINT_SIZE;
        quad[2].pos[0] += POINT_SIZE;
        quad[3].pos[0] += POINT_SIZE;
        for (i, v) in quad.iter().enumerate() {
            let cmd = if i == 3 { CMD_VERTEX_EOL } else { CMD_VERTEX };
            self.emit_screen(v, cmd);
        }
    }
}

/// Immediate-mode vertex assembly state
#[derive(Debug, Clone)]
pub struct PrimPipeline {
    nearclip: f32,
    /// Attributes latched by the attribute setters and stamped onto
    /// each incoming vertex
    pending: Vertex,
    verts: Vec<Vertex>,
    topology: Option<Topology>,
}

impl Default for PrimPipeline {
    fn default() -> PrimPipeline {
        PrimPipeline::new()
    }
}

impl PrimPipeline {
    pub fn new() -> PrimPipeline {
        let pending = Vertex {
            pos: [0.0, 0.0, 0.0, 1.0],
            uv: [0.0, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
            fog_coord: 0.0,
            offset_color: [0.0; 3],
        };
        PrimPipeline {
            nearclip: DEFAULT_NEAR_CLIP,
            pending,
            verts: Vec::with_capacity(VERTEX_BUFFER_CAPACITY),
            topology: None,
        }
    }

    pub fn in_begin(&self) -> bool {
        self.topology.is_some()
    }

    /// Discard an open primitive without emitting anything
    pub fn abort(&mut self) {
        self.topology = None;
        self.verts.clear();
    }

    /// Near clip plane distance; must be positive
    pub fn set_near_clip(&mut self, nearclip: f32) -> Result<(), GlError> {
        if !(nearclip > 0.0) {
            return Err(GlError::InvalidValue);
        }
        self.nearclip = nearclip;
        Ok(())
    }

    pub fn near_clip(&self) -> f32 {
        self.nearclip
    }

    pub fn begin(&mut self, topology: Topology) -> Result<(), GlError> {
        if self.topology.is_some() {
            return Err(GlError::InvalidOperation);
        }
        self.topology = Some(topology);
        self.verts.clear();
        Ok(())
    }

    // --- pending attributes ---

    pub fn color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.pending.color = [a, r, g, b];
    }

    pub fn tex_coord(&mut self, u: f32, v: f32) {
        self.pending.uv = [u, v];
    }

    pub fn fog_coord(&mut self, dist: f32) {
        self.pending.fog_coord = dist;
    }

    pub fn secondary_color(&mut self, r: f32, g: f32, b: f32) {
        self.pending.offset_color = [r, g, b];
    }

    /// Current latched color, a/r/g/b
    pub fn current_color(&self) -> [f32; 4] {
        self.pending.color
    }

    // --- vertices ---

    /// Record a vertex with the pending attributes
    ///
    /// # Panics
    ///
    /// Panics outside a `begin`/`end` bracket and when the vertex
    /// buffer is full; either would silently corrupt the primitive,
    /// so both are hard errors rather than GL errors.
    pub fn vertex4(&mut self, x: f32, y: f32, z: f32, w: f32) {
        assert!(self.topology.is_some(), "vertex outside begin/end");
        assert!(
            self.verts.len() < VERTEX_BUFFER_CAPACITY,
            "vertex buffer overflow ({} vertices)",
            VERTEX_BUFFER_CAPACITY
        );
        let mut v = self.pending;
        v.pos = [x, y, z, w];
        self.verts.push(v);
    }

    pub fn vertex3(&mut self, x: f32, y: f32, z: f32) {
        self.vertex4(x, y, z, 1.0);
    }

    pub fn vertex2(&mut self, x: f32, y: f32) {
        self.vertex4(x, y, 0.0, 1.0);
    }

    /// Number of buffered vertices (test hook)
    pub fn buffered(&self) -> usize {
        self.verts.len()
    }

    // --- end ---

    /// Transform, clip, and emit the buffered primitive
    pub fn end(
        &mut self,
        state: &mut StateEncoder,
        matrices: &mut Matrices,
        cmdbuf: &mut CommandBuffers,
    ) -> Result<(), GlError> {
        let topology = self.topology.take().ok_or(GlError::InvalidOperation)?;

        let screen = *matrices.screen();
        for v in &mut self.verts {
            v.pos = transform_point(&screen, v.pos);
        }

        // decide the drop before touching the command stream so a
        // culled primitive leaves no orphan header behind
        if state.culls_filled() && topology.filled() {
            log::trace!("both faces culled, dropping {:?}", topology);
            self.verts.clear();
            return Ok(());
        }

        state.submit(cmdbuf);

        let shading = if state.gouraud() {
            ClipShading::Gouraud
        } else {
            ClipShading::Flat
        };
        let needs_clip = self.must_clip();
        let mut em = Emitter { out: cmdbuf };
        let verts = &self.verts;
        let n = verts.len();

        match topology {
            Topology::Triangles => {
                if needs_clip {
                    for tri in verts.chunks_exact(3) {
                        Self::triangle_clipped(&mut em, &tri[0], &tri[1], &tri[2], shading, self.nearclip);
                    }
                } else if n >= 3 {
                    em.send_run(&verts[..n - n % 3], 3);
                }
            }
            Topology::TriangleStrip => {
                if needs_clip {
                    for i in 2..n {
                        Self::triangle_clipped(&mut em, &verts[i - 2], &verts[i - 1], &verts[i], shading, self.nearclip);
                    }
                } else if n >= 3 {
                    em.send_run(verts, n);
                }
            }
            Topology::TriangleFan | Topology::Polygon => {
                if needs_clip {
                    for i in 2..n {
                        Self::triangle_clipped(&mut em, &verts[0], &verts[i - 1], &verts[i], shading, self.nearclip);
                    }
                } else {
                    em.send_trifan(verts);
                }
            }
            Topology::Quads => {
                for quad in verts.chunks_exact(4) {
                    if needs_clip {
                        Self::quad_clipped(&mut em, quad, shading, self.nearclip);
                    } else {
                        em.send_quad(quad);
                    }
                }
            }
            Topology::QuadStrip => {
                if needs_clip {
                    let mut i = 3;
                    while i < n {
                        let quad = [verts[i - 3], verts[i - 2], verts[i - 1], verts[i]];
                        Self::quad_clipped(&mut em, &quad, shading, self.nearclip);
                        i += 2;
                    }
                } else if n >= 4 {
                    // quad strip vertex order is already strip order
                    em.send_run(verts, n);
                }
            }
            Topology::Lines => {
                let mut i = 1;
                while i < n {
                    Self::line_maybe_clipped(&mut em, &verts[i - 1], &verts[i], shading, self.nearclip, needs_clip);
                    i += 2;
                }
            }
            Topology::LineStrip => {
                for i in 1..n {
                    Self::line_maybe_clipped(&mut em, &verts[i - 1], &verts[i], shading, self.nearclip, needs_clip);
                }
            }
            Topology::LineLoop => {
                for i in 1..n {
                    Self::line_maybe_clipped(&mut em, &verts[i - 1], &verts[i], shading, self.nearclip, needs_clip);
                }
                if n >= 2 {
                    Self::line_maybe_clipped(&mut em, &verts[n - 1], &verts[0], shading, self.nearclip, needs_clip);
                }
            }
            Topology::Points => {
                for v in verts {
                    if v.pos[3] >= self.nearclip {
                        em.send_point(v);
                    }
                }
            }
        }

        self.verts.clear();
        Ok(())
    }

    /// Convenience axis-aligned rectangle
    pub fn rect(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        state: &mut StateEncoder,
        matrices: &mut Matrices,
        cmdbuf: &mut CommandBuffers,
    ) -> Result<(), GlError> {
        self.begin(Topology::Polygon)?;
        self.vertex2(x1, y1);
        self.vertex2(x2, y1);
        self.vertex2(x2, y2);
        self.vertex2(x1, y2);
        self.end(state, matrices, cmdbuf)
    }

    fn must_clip(&self) -> bool {
        self.verts.iter().any(|v| v.pos[3] < self.nearclip)
    }

    /// Clip one triangle and emit whatever polygon survives: three
    /// edges can produce at most four vertices against a single plane
    fn triangle_clipped(
        em: &mut Emitter,
        v0: &Vertex,
        v1: &Vertex,
        v2: &Vertex,
        shading: ClipShading,
        nearclip: f32,
    ) {
        let mut buf = [Vertex::ZERO; 8];
        let mut count = 0;
        count += clip_edge(v0, v1, v2, shading, nearclip, &mut buf[count..]);
        count += clip_edge(v1, v2, v2, shading, nearclip, &mut buf[count..]);
        count += clip_edge(v2, v0, v2, shading, nearclip, &mut buf[count..]);
        match count {
            3 => em.send_triangle(&buf),
            4 => em.send_quad(&buf),
            _ => {}
        }
    }

    /// Clip one quad; four edges can produce up to six vertices, which
    /// go out as a fan
    fn quad_clipped(em: &mut Emitter, quad: &[Vertex], shading: ClipShading, nearclip: f32) {
        let (v0, v1, v2, v3) = (&quad[0], &quad[1], &quad[2], &quad[3]);
        let mut buf = [Vertex::ZERO; 8];
        let mut count = 0;
        count += clip_edge(v0, v1, v3, shading, nearclip, &mut buf[count..]);
        count += clip_edge(v1, v2, v3, shading, nearclip, &mut buf[count..]);
        count += clip_edge(v2, v3, v3, shading, nearclip, &mut buf[count..]);
        count += clip_edge(v3, v0, v3, shading, nearclip, &mut buf[count..]);
        match count {
            3 => em.send_triangle(&buf),
            4 => em.send_quad(&buf),
            c if c > 4 => em.send_trifan(&buf[..c]),
            _ => {}
        }
    }

    fn line_maybe_clipped(
        em: &mut Emitter,
        a: &Vertex,
        b: &Vertex,
        shading: ClipShading,
        nearclip: f32,
        needs_clip: bool,
    ) {
        if needs_clip {
            if let Some(clipped) = clip_line(a, b, b, shading, nearclip) {
                em.send_line(&clipped[0], &clipped[1]);
            }
        } else {
            em.send_line(a, b);
        }
    }
}
