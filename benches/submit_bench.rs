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

//! Draw-path benchmarks: vertex transform, clip, and list submission

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use pvrgl::core::backend::ReferenceTa;
use pvrgl::core::prim::Topology;
use pvrgl::RenderContext;

fn strip_frame(gl: &mut RenderContext<ReferenceTa>, verts: usize, w: f32) {
    gl.begin_scene().unwrap();
    gl.begin(Topology::TriangleStrip);
    for i in 0..verts {
        let t = i as f32 * 0.01;
        gl.color4(t.fract(), 1.0 - t.fract(), 0.5, 1.0);
        gl.vertex4(t, if i % 2 == 0 { -1.0 } else { 1.0 }, 0.0, w);
    }
    gl.end();
    gl.end_scene().unwrap();
}

fn bench_unclipped_strip(c: &mut Criterion) {
    let mut gl = RenderContext::new(ReferenceTa::new(), false);
    c.bench_function("strip_200_unclipped", |b| {
        b.iter(|| strip_frame(&mut gl, black_box(200), 1.0));
    });
}

fn bench_clipped_strip(c: &mut Criterion) {
    let mut gl = RenderContext::new(ReferenceTa::new(), false);
    // w below the default near clip forces the per-triangle clip path
    c.bench_function("strip_200_clipped", |b| {
        b.iter(|| strip_frame(&mut gl, black_box(200), 0.00005));
    });
}

fn bench_quads(c: &mut Criterion) {
    let mut gl = RenderContext::new(ReferenceTa::new(), false);
    c.bench_function("quads_100", |b| {
        b.iter(|| {
            gl.begin_scene().unwrap();
            for i in 0..100 {
                let x = i as f32 * 0.01;
                gl.rect(black_box(x), 0.0, x + 0.5, 0.5);
            }
            gl.end_scene().unwrap();
        });
    });
}

criterion_group!(benches, bench_unclipped_strip, bench_clipped_strip, bench_quads);
criterion_main!(benches);
