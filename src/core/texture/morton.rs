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

//! Morton ("twiddled") texel addressing
//!
//! The hardware stores texels in Morton order so that neighboring
//! texels stay close in memory in both axes. For a square
//! power-of-two texture the index interleaves the coordinate bits,
//! x in the odd positions:
//!
//! ```text
//! index = x3 y3 x2 y2 x1 y1 x0 y0
//! ```
//!
//! Non-square textures twiddle in square blocks of the smaller
//! dimension, with the blocks themselves laid out linearly; this
//! amounts to the longer axis owning all the bits above the
//! interleaved square. [`MortonOrder`] captures both cases as a pair
//! of scatter masks, which also gives carry-correct incremental
//! stepping for row/column traversal without re-encoding.

/// Odd-bit mask holding the x coordinate of a square texture
pub const X_MASK: u32 = 0xAAAA_AAAA;
/// Even-bit mask holding the y coordinate of a square texture
pub const Y_MASK: u32 = 0x5555_5555;

/// Spread the low 16 bits of `x` into the even bit positions
#[inline]
pub fn part1by1(mut x: u32) -> u32 {
    x &= 0x0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

/// Inverse of [`part1by1`]: gather the even bit positions
#[inline]
pub fn compact1by1(mut x: u32) -> u32 {
    x &= 0x5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF;
    x
}

/// Morton index of `(x, y)` in a square texture
#[inline]
pub fn encode(x: u32, y: u32) -> u32 {
    (part1by1(x) << 1) | part1by1(y)
}

/// Coordinates `(x, y)` of a square-texture Morton index
#[inline]
pub fn decode(index: u32) -> (u32, u32) {
    (compact1by1(index >> 1), compact1by1(index))
}

/// Scatter the low bits of `value` over the set bits of `mask`
fn scatter(value: u32, mut mask: u32) -> u32 {
    let mut out = 0;
    let mut bit = 1u32;
    while mask != 0 {
        let low = mask & mask.wrapping_neg();
        if value & bit != 0 {
            out |= low;
        }
        mask &= !low;
        bit <<= 1;
    }
    out
}

/// Gather the set bits of `mask` from `value` into a dense integer
fn gather(value: u32, mut mask: u32) -> u32 {
    let mut out = 0;
    let mut bit = 1u32;
    while mask != 0 {
        let low = mask & mask.wrapping_neg();
        if value & low != 0 {
            out |= bit;
        }
        mask &= !low;
        bit <<= 1;
    }
    out
}

/// Increment the field of `m` scattered over `mask`, leaving the other
/// bits untouched; saturating the field carries out of it cleanly
#[inline]
fn masked_inc(m: u32, mask: u32) -> u32 {
    (((m | !mask) + (mask & mask.wrapping_neg())) & mask) | (m & !mask)
}

/// Twiddled addressing for one mip level of a (possibly non-square)
/// power-of-two texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MortonOrder {
    xmask: u32,
    ymask: u32,
}

impl MortonOrder {
    /// Addressing for a `width` x `height` level; both dimensions must
    /// be powers of two
    pub fn new(width: u32, height: u32) -> MortonOrder {
        debug_assert!(width.is_power_of_two() && height.is_power_of_two());
        let side = width.min(height);
        // bits inside the interleaved square of the smaller dimension
        let square = side * side;
        let square_mask = square.wrapping_sub(1);
        let (xmask, ymask) = if width == height {
            (X_MASK, Y_MASK)
        } else if width > height {
            // extra x bits sit linearly above the square
            ((X_MASK & square_mask) | !square_mask, Y_MASK & square_mask)
        } else {
            (X_MASK & square_mask, (Y_MASK & square_mask) | !square_mask)
        };
        MortonOrder { xmask, ymask }
    }

    /// Texel index of `(x, y)`
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> u32 {
        scatter(x, self.xmask) | scatter(y, self.ymask)
    }

    /// Coordinates of a texel index
    #[inline]
    pub fn coords(&self, index: u32) -> (u32, u32) {
        (gather(index, self.xmask), gather(index, self.ymask))
    }

    /// Index one texel to the right, same row
    #[inline]
    pub fn inc_x(&self, index: u32) -> u32 {
        masked_inc(index, self.xmask)
    }

    /// Index one texel down, same column
    #[inline]
    pub fn inc_y(&self, index: u32) -> u32 {
        masked_inc(index, self.ymask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn part1by1_known_values() {
        assert_eq!(part1by1(0), 0);
        assert_eq!(part1by1(1), 1);
        assert_eq!(part1by1(0b11), 0b101);
        assert_eq!(part1by1(0b101), 0b10001);
        assert_eq!(part1by1(0xFFFF), 0x5555_5555);
    }

    #[test]
    fn encode_walks_2x2_blocks() {
        // the first 2x2 block occupies the first four indices
        assert_eq!(encode(0, 0), 0);
        assert_eq!(encode(0, 1), 1);
        assert_eq!(encode(1, 0), 2);
        assert_eq!(encode(1, 1), 3);
        assert_eq!(encode(0, 2), 4);
        assert_eq!(encode(2, 0), 8);
    }

    #[test]
    fn rect_order_is_dense_and_unique() {
        for &(w, h) in &[(8u32, 8u32), (16, 4), (4, 16), (64, 8)] {
            let order = MortonOrder::new(w, h);
            let mut seen = vec![false; (w * h) as usize];
            for y in 0..h {
                for x in 0..w {
                    let i = order.index(x, y) as usize;
                    assert!(i < seen.len(), "{w}x{h} ({x},{y}) -> {i}");
                    assert!(!seen[i], "duplicate index {i} in {w}x{h}");
                    seen[i] = true;
                    assert_eq!(order.coords(i as u32), (x, y));
                }
            }
        }
    }

    #[test]
    fn wide_texture_blocks_are_linear() {
        // 16x4: square side 4, so indices advance by 16 per block of x
        let order = MortonOrder::new(16, 4);
        assert_eq!(order.index(0, 0), 0);
        assert_eq!(order.index(4, 0), 16);
        assert_eq!(order.index(8, 0), 32);
        assert_eq!(order.index(5, 1), 16 + encode(1, 1));
    }

    proptest! {
        #[test]
        fn square_encode_decode_roundtrip(x in 0u32..1024, y in 0u32..1024) {
            prop_assert_eq!(decode(encode(x, y)), (x, y));
        }

        #[test]
        fn incremental_stepping_matches_reencode(
            exp_w in 0u32..=7,
            exp_h in 0u32..=7,
        ) {
            let (w, h) = (1u32 << exp_w, 1u32 << exp_h);
            let order = MortonOrder::new(w, h);
            // walk a full row and a full column by increments
            let mut m = order.index(0, 3.min(h - 1));
            for x in 1..w {
                m = order.inc_x(m);
                prop_assert_eq!(m, order.index(x, 3.min(h - 1)));
            }
            let mut m = order.index(3.min(w - 1), 0);
            for y in 1..h {
                m = order.inc_y(m);
                prop_assert_eq!(m, order.index(3.min(w - 1), y));
            }
        }
    }
}
