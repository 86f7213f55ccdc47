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

//! Matrix stacks and vertex transformation
//!
//! Three fixed-depth matrix stacks (modelview, projection, texture) in
//! the classic immediate-mode style, plus a viewport matrix. The full
//! transform applied to incoming vertices is
//!
//! ```text
//! screen = viewport * projection * modelview
//! ```
//!
//! `screen` is cached and lazily rebuilt; any edit to a contributing
//! stack marks it stale. Transformed vertices stay in clip space (w
//! unresolved) so the primitive pipeline can near-clip before the
//! perspective divide.
//!
//! Matrices are column-major: `m[col][row]`, matching the usual GL
//! convention for `LoadMatrix`/`MultMatrix` element order.

use crate::core::error::GlError;

/// Column-major 4x4 float matrix
pub type Matrix4 = [[f32; 4]; 4];

/// The identity matrix
pub const IDENTITY: Matrix4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Multiply two column-major matrices (`a * b`)
pub fn mat_mul(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    let mut out = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            let mut acc = 0.0;
            for k in 0..4 {
                acc += a[k][row] * b[col][k];
            }
            out[col][row] = acc;
        }
    }
    out
}

/// Transform a homogeneous point by `m`, returning `[x, y, z, w]`
#[inline]
pub fn transform_point(m: &Matrix4, p: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for row in 0..4 {
        out[row] =
            m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row] * p[3];
    }
    out
}

/// Which stack subsequent matrix operations edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixMode {
    ModelView,
    Projection,
    Texture,
}

impl MatrixMode {
    const COUNT: usize = 3;

    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }
}

/// One fixed-depth matrix stack
#[derive(Debug, Clone)]
struct MatrixStack {
    mats: Vec<Matrix4>,
    /// Current position. The stack is never empty.
    pos: usize,
}

impl MatrixStack {
    fn new(depth: usize) -> MatrixStack {
        let mut mats = vec![IDENTITY; depth];
        mats[0] = IDENTITY;
        MatrixStack { mats, pos: 0 }
    }

    #[inline(always)]
    fn top(&self) -> &Matrix4 {
        &self.mats[self.pos]
    }

    #[inline(always)]
    fn top_mut(&mut self) -> &mut Matrix4 {
        &mut self.mats[self.pos]
    }

    fn push(&mut self) -> Result<(), GlError> {
        if self.pos + 1 >= self.mats.len() {
            return Err(GlError::StackOverflow);
        }
        self.mats[self.pos + 1] = self.mats[self.pos];
        self.pos += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<(), GlError> {
        if self.pos == 0 {
            return Err(GlError::StackUnderflow);
        }
        self.pos -= 1;
        Ok(())
    }
}

/// All transform state: three stacks, the viewport matrix, and the
/// cached screen matrix
#[derive(Debug, Clone)]
pub struct Matrices {
    stacks: [MatrixStack; MatrixMode::COUNT],
    mode: MatrixMode,
    viewport: Matrix4,
    viewport_rect: (i32, i32, u32, u32),
    screen: Matrix4,
    screen_stale: bool,
    fsaa: bool,
}

impl Matrices {
    /// Modelview stack depth
    pub const MODELVIEW_DEPTH: usize = 32;
    /// Projection stack depth
    pub const PROJECTION_DEPTH: usize = 2;
    /// Texture stack depth
    pub const TEXTURE_DEPTH: usize = 2;

    pub fn new() -> Matrices {
        let mut m = Matrices {
            stacks: [
                MatrixStack::new(Self::MODELVIEW_DEPTH),
                MatrixStack::new(Self::PROJECTION_DEPTH),
                MatrixStack::new(Self::TEXTURE_DEPTH),
            ],
            mode: MatrixMode::ModelView,
            viewport: IDENTITY,
            viewport_rect: (0, 0, 640, 480),
            screen: IDENTITY,
            screen_stale: true,
            fsaa: false,
        };
        m.set_viewport(0, 0, 640, 480);
        m
    }

    /// Horizontal-only supersampling doubles the viewport x scale; the
    /// viewport matrix is rebuilt so the flag takes effect even when
    /// set after construction
    pub fn set_fsaa(&mut self, fsaa: bool) {
        if self.fsaa == fsaa {
            return;
        }
        self.fsaa = fsaa;
        let (x, y, w, h) = self.viewport_rect;
        self.set_viewport(x, y, w, h);
    }

    pub fn set_matrix_mode(&mut self, mode: MatrixMode) {
        self.mode = mode;
    }

    pub fn matrix_mode(&self) -> MatrixMode {
        self.mode
    }

    #[inline(always)]
    fn current(&mut self) -> &mut MatrixStack {
        &mut self.stacks[self.mode.index()]
    }

    /// Mark the cached screen matrix stale if `mode` contributes to it
    #[inline(always)]
    fn touched(&mut self) {
        if self.mode != MatrixMode::Texture {
            self.screen_stale = true;
        }
    }

    pub fn push(&mut self) -> Result<(), GlError> {
        self.stacks[self.mode.index()].push()
    }

    pub fn pop(&mut self) -> Result<(), GlError> {
        self.stacks[self.mode.index()].pop()?;
        self.touched();
        Ok(())
    }

    pub fn load_identity(&mut self) {
        *self.current().top_mut() = IDENTITY;
        self.touched();
    }

    pub fn load_matrix(&mut self, m: &Matrix4) {
        *self.current().top_mut() = *m;
        self.touched();
    }

    pub fn mult_matrix(&mut self, m: &Matrix4) {
        let top = self.current().top_mut();
        *top = mat_mul(top, m);
        self.touched();
    }

    /// Current top of the active stack
    pub fn top(&self) -> &Matrix4 {
        self.stacks[self.mode.index()].top()
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        let mut m = IDENTITY;
        m[3][0] = x;
        m[3][1] = y;
        m[3][2] = z;
        self.mult_matrix(&m);
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        let mut m = IDENTITY;
        m[0][0] = x;
        m[1][1] = y;
        m[2][2] = z;
        self.mult_matrix(&m);
    }

    /// Rotate `angle` degrees about the axis `(x, y, z)`
    ///
    /// A zero-length axis is treated as no rotation.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        let len = (x * x + y * y + z * z).sqrt();
        if len == 0.0 {
            log::debug!("rotate about zero-length axis ignored");
            return;
        }
        let (x, y, z) = (x / len, y / len, z / len);
        let rad = angle.to_radians();
        let (s, c) = rad.sin_cos();
        let omc = 1.0 - c;

        let mut m = IDENTITY;
        m[0][0] = x * x * omc + c;
        m[0][1] = y * x * omc + z * s;
        m[0][2] = x * z * omc - y * s;
        m[1][0] = x * y * omc - z * s;
        m[1][1] = y * y * omc + c;
        m[1][2] = y * z * omc + x * s;
        m[2][0] = x * z * omc + y * s;
        m[2][1] = y * z * omc - x * s;
        m[2][2] = z * z * omc + c;
        self.mult_matrix(&m);
    }

    /// Perspective frustum projection
    ///
    /// The depth row maps to the reversed-depth convention the hardware
    /// expects: near plane to 1, far plane toward 0.
    pub fn frustum(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<(), GlError> {
        if near <= 0.0 || far <= 0.0 || left == right || bottom == top || near == far {
            return Err(GlError::InvalidValue);
        }
        let mut m = [[0.0f32; 4]; 4];
        m[0][0] = 2.0 * near / (right - left);
        m[2][0] = (right + left) / (right - left);
        m[1][1] = 2.0 * near / (top - bottom);
        m[2][1] = (top + bottom) / (top - bottom);
        m[2][2] = far / (far - near);
        m[3][2] = -(far * near) / (far - near);
        m[2][3] = -1.0;
        self.mult_matrix(&m);
        Ok(())
    }

    /// Orthographic projection
    pub fn ortho(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<(), GlError> {
        if left == right || bottom == top || near == far {
            return Err(GlError::InvalidValue);
        }
        let mut m = [[0.0f32; 4]; 4];
        m[0][0] = 2.0 / (right - left);
        m[3][0] = -(right + left) / (right - left);
        m[1][1] = 2.0 / (top - bottom);
        m[3][1] = -(top + bottom) / (top - bottom);
        m[2][2] = -2.0 / (far - near);
        m[2][3] = -(far + near) / (far - near);
        m[3][3] = 1.0;
        self.mult_matrix(&m);
        Ok(())
    }

    /// Convenience symmetric perspective by vertical field of view
    pub fn perspective(
        &mut self,
        fovy_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<(), GlError> {
        let ymax = near * (fovy_degrees * core::f32::consts::PI / 360.0).tan();
        let xmax = ymax * aspect;
        self.frustum(-xmax, xmax, -ymax, ymax, near, far)
    }

    /// Convenience 2D orthographic projection over z in [-1, 1]
    pub fn ortho_2d(&mut self, left: f32, right: f32, bottom: f32, top: f32) -> Result<(), GlError> {
        self.ortho(left, right, bottom, top, -1.0, 1.0)
    }

    /// Set the viewport transform mapping NDC to pixel coordinates
    ///
    /// Y is flipped here since the framebuffer origin is top-left.
    pub fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        // x/y offsets are kept only for fsaa rebuilds; the hardware
        // viewport always spans the framebuffer
        self.viewport_rect = (x, y, width, height);
        let xscale = if self.fsaa { 2.0 } else { 1.0 };
        let w = width as f32 * 0.5 * xscale;
        let h = height as f32 * 0.5;
        let mut m = [[0.0f32; 4]; 4];
        m[0][0] = w;
        m[3][0] = w;
        m[1][1] = -h;
        m[3][1] = h;
        m[2][2] = 1.0;
        m[3][3] = 1.0;
        self.viewport = m;
        self.screen_stale = true;
    }

    /// The combined viewport * projection * modelview matrix, rebuilt
    /// only when a contributing matrix changed since the last call
    pub fn screen(&mut self) -> &Matrix4 {
        if self.screen_stale {
            let pm = mat_mul(
                &self.viewport,
                self.stacks[MatrixMode::Projection.index()].top(),
            );
            self.screen = mat_mul(&pm, self.stacks[MatrixMode::ModelView.index()].top());
            self.screen_stale = false;
        }
        &self.screen
    }

    /// Whether the screen matrix cache is stale (test hook)
    #[cfg(test)]
    pub(crate) fn screen_stale(&self) -> bool {
        self.screen_stale
    }
}

impl Default for Matrices {
    fn default() -> Matrices {
        Matrices::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn identity_multiplication() {
        let m: Matrix4 = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ];
        assert_eq!(mat_mul(&IDENTITY, &m), m);
        assert_eq!(mat_mul(&m, &IDENTITY), m);
    }

    #[test]
    fn translate_moves_points() {
        let mut ms = Matrices::new();
        ms.translate(1.0, 2.0, 3.0);
        let p = transform_point(ms.top(), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(p, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn push_pop_restores_and_overflows() {
        let mut ms = Matrices::new();
        ms.set_matrix_mode(MatrixMode::Projection);
        ms.load_identity();
        ms.push().unwrap();
        ms.translate(5.0, 0.0, 0.0);
        ms.pop().unwrap();
        assert_eq!(*ms.top(), IDENTITY);
        // projection depth is 2: one push fits, two do not
        ms.push().unwrap();
        assert_eq!(ms.push(), Err(GlError::StackOverflow));
        ms.pop().unwrap();
        assert_eq!(ms.pop(), Err(GlError::StackUnderflow));
    }

    #[test]
    fn rotate_quarter_turn_about_z() {
        let mut ms = Matrices::new();
        ms.rotate(90.0, 0.0, 0.0, 1.0);
        let p = transform_point(ms.top(), [1.0, 0.0, 0.0, 1.0]);
        assert_close(p[0], 0.0);
        assert_close(p[1], 1.0);
    }

    #[test]
    fn rotate_zero_axis_is_identity() {
        let mut ms = Matrices::new();
        ms.rotate(45.0, 0.0, 0.0, 0.0);
        assert_eq!(*ms.top(), IDENTITY);
    }

    #[test]
    fn frustum_rejects_degenerate_planes() {
        let mut ms = Matrices::new();
        ms.set_matrix_mode(MatrixMode::Projection);
        assert_eq!(
            ms.frustum(-1.0, 1.0, -1.0, 1.0, -0.1, 10.0),
            Err(GlError::InvalidValue)
        );
        assert_eq!(
            ms.frustum(1.0, 1.0, -1.0, 1.0, 0.1, 10.0),
            Err(GlError::InvalidValue)
        );
        ms.frustum(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0).unwrap();
    }

    #[test]
    fn frustum_w_is_negated_eye_z() {
        let mut ms = Matrices::new();
        ms.set_matrix_mode(MatrixMode::Projection);
        ms.frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 100.0).unwrap();
        let p = transform_point(ms.top(), [0.0, 0.0, -5.0, 1.0]);
        assert_close(p[3], 5.0);
    }

    #[test]
    fn screen_cache_rebuilds_lazily() {
        let mut ms = Matrices::new();
        assert!(ms.screen_stale());
        let _ = ms.screen();
        assert!(!ms.screen_stale());
        // texture stack edits do not invalidate the cache
        ms.set_matrix_mode(MatrixMode::Texture);
        ms.translate(1.0, 0.0, 0.0);
        assert!(!ms.screen_stale());
        ms.set_matrix_mode(MatrixMode::ModelView);
        ms.translate(1.0, 0.0, 0.0);
        assert!(ms.screen_stale());
    }

    #[test]
    fn fsaa_after_construction_doubles_x_scale() {
        let mut ms = Matrices::new();
        ms.set_fsaa(true);
        let s = *ms.screen();
        let right = transform_point(&s, [1.0, 0.0, 0.0, 1.0]);
        assert_close(right[0], 1280.0);
        // vertical mapping is unchanged
        let top = transform_point(&s, [0.0, 1.0, 0.0, 1.0]);
        assert_close(top[1], 0.0);
        ms.set_fsaa(false);
        let right = transform_point(ms.screen(), [1.0, 0.0, 0.0, 1.0]);
        assert_close(right[0], 640.0);
    }

    #[test]
    fn viewport_maps_ndc_corners() {
        let mut ms = Matrices::new();
        ms.set_viewport(0, 0, 640, 480);
        let s = *ms.screen();
        // with identity projection/modelview the screen matrix is the
        // viewport matrix
        let center = transform_point(&s, [0.0, 0.0, 0.0, 1.0]);
        assert_close(center[0], 320.0);
        assert_close(center[1], 240.0);
        let corner = transform_point(&s, [-1.0, 1.0, 0.0, 1.0]);
        assert_close(corner[0], 0.0);
        assert_close(corner[1], 0.0);
    }
}
