/*  Copyright 2026 the Conwayste Developers.
 *
 *  This file is part of torus-life.
 *
 *  torus-life is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  torus-life is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with torus-life.  If not, see <http://www.gnu.org/licenses/>. */

//! Sources of an initial board. Anything that can say whether pixel `(x, y)` is opaque can seed
//! a grid; opaque means alive.

use crate::error::{EngineError, EngineResult};
use crate::grids::BitGrid;

pub trait PixelSource {
    /// Width in pixels
    fn width(&self) -> usize;

    /// Height in pixels
    fn height(&self) -> usize;

    /// Whether the pixel at `(x, y)` has a nonzero alpha. Only called with in-range coordinates.
    fn is_opaque(&self, x: usize, y: usize) -> bool;
}

/// Interleaved 8-bit RGBA pixels, row-major, as handed over by an image decoder.
pub struct RgbaPixels<'a> {
    data:   &'a [u8],
    width:  usize,
    height: usize,
}

impl<'a> RgbaPixels<'a> {
    /// # Errors
    ///
    /// `InvalidData` if `data` is not exactly `width * height * 4` bytes.
    pub fn new(data: &'a [u8], width: usize, height: usize) -> EngineResult<Self> {
        if data.len() != width * height * 4 {
            return Err(EngineError::InvalidData {
                reason: format!("expected {} RGBA bytes for {}x{}, got {}", width * height * 4, width, height, data.len()),
            });
        }
        Ok(RgbaPixels { data, width, height })
    }
}

impl<'a> PixelSource for RgbaPixels<'a> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_opaque(&self, x: usize, y: usize) -> bool {
        self.data[(y * self.width + x) * 4 + 3] != 0
    }
}

/// A bare alpha channel, one byte per pixel.
pub struct AlphaMask {
    alpha:  Vec<u8>,
    width:  usize,
    height: usize,
}

impl AlphaMask {
    /// # Errors
    ///
    /// `InvalidData` if `alpha` is not exactly `width * height` bytes.
    pub fn new(alpha: Vec<u8>, width: usize, height: usize) -> EngineResult<Self> {
        if alpha.len() != width * height {
            return Err(EngineError::InvalidData {
                reason: format!("expected {} alpha bytes for {}x{}, got {}", width * height, width, height, alpha.len()),
            });
        }
        Ok(AlphaMask { alpha, width, height })
    }

    /// Builds a mask from rows of text where `*`, `o`, `O` or `#` are opaque and anything else
    /// is transparent. Short rows are padded with transparent pixels.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let height = rows.len();
        let mut alpha = vec![0u8; width * height];
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if matches!(ch, '*' | 'o' | 'O' | '#') {
                    alpha[y * width + x] = 0xFF;
                }
            }
        }
        AlphaMask { alpha, width, height }
    }
}

impl PixelSource for AlphaMask {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_opaque(&self, x: usize, y: usize) -> bool {
        self.alpha[y * self.width + x] != 0
    }
}

/// Adapts a closure into a `PixelSource` of the given size.
pub struct FnSource<F> {
    width:  usize,
    height: usize,
    f:      F,
}

pub fn from_fn<F: Fn(usize, usize) -> bool>(width: usize, height: usize, f: F) -> FnSource<F> {
    FnSource { width, height, f }
}

impl<F: Fn(usize, usize) -> bool> PixelSource for FnSource<F> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_opaque(&self, x: usize, y: usize) -> bool {
        (self.f)(x, y)
    }
}

/// A grid is its own source, which makes snapshots re-importable.
impl PixelSource for BitGrid {
    fn width(&self) -> usize {
        BitGrid::width(self)
    }

    fn height(&self) -> usize {
        BitGrid::height(self)
    }

    fn is_opaque(&self, x: usize, y: usize) -> bool {
        self.get(x, y)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rgba_reads_alpha_channel_only() {
        // 2x1: first pixel opaque black, second transparent white
        let data = [0, 0, 0, 255, 255, 255, 255, 0];
        let px = RgbaPixels::new(&data, 2, 1).unwrap();
        assert!(px.is_opaque(0, 0));
        assert!(!px.is_opaque(1, 0));
    }

    #[test]
    fn rgba_length_mismatch_is_rejected() {
        let data = [0u8; 7];
        assert!(RgbaPixels::new(&data, 2, 1).is_err());
    }

    #[test]
    fn alpha_mask_from_ascii_pads_short_rows() {
        let mask = AlphaMask::from_ascii(&[".*.", "*"]);
        assert_eq!((mask.width(), mask.height()), (3, 2));
        assert!(mask.is_opaque(1, 0));
        assert!(mask.is_opaque(0, 1));
        assert!(!mask.is_opaque(2, 1));
    }

    #[test]
    fn alpha_mask_length_mismatch_is_rejected() {
        assert_eq!(
            AlphaMask::new(vec![0; 5], 2, 2).err(),
            Some(EngineError::InvalidData {
                reason: "expected 4 alpha bytes for 2x2, got 5".to_owned(),
            })
        );
    }

    #[test]
    fn closure_source() {
        let src = from_fn(4, 4, |x, y| x == y);
        assert!(src.is_opaque(2, 2));
        assert!(!src.is_opaque(2, 3));
    }
}
