/*  Copyright 2016-2026 the Conwayste Developers.
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

use std::cmp;
use std::sync::atomic::{AtomicBool, Ordering};

/// Rectangular area within a grid. All coordinates are cell coordinates.
#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Debug, Hash)]
pub struct Region {
    pub left:   usize,
    pub top:    usize,
    pub width:  usize,
    pub height: usize,
}

impl Region {
    /// Creates a new region given x and y coordinates of top-left corner, and width and height,
    /// all in units of cells. An empty region (zero width or height) is allowed.
    pub fn new(left: usize, top: usize, width: usize, height: usize) -> Self {
        Region {
            left,
            top,
            width,
            height,
        }
    }

    /// Returns the x coordinate of the leftmost cells of the Region.
    pub fn left(&self) -> usize {
        self.left
    }

    /// Returns the x coordinate one past the rightmost cells of the Region.
    pub fn right(&self) -> usize {
        self.left + self.width
    }

    /// Returns the y coordinate of the uppermost cells of the Region.
    pub fn top(&self) -> usize {
        self.top
    }

    /// Returns the y coordinate one past the lowermost cells of the Region.
    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Determines whether the specified cell is part of the Region.
    pub fn contains(&self, col: usize, row: usize) -> bool {
        self.left <= col && col < self.right() && self.top <= row && row < self.bottom()
    }

    /// Whether every cell of `other` is also in `self`. An empty `other` is contained only if it
    /// lies within the bounds of `self`.
    pub fn contains_region(&self, other: &Region) -> bool {
        self.left <= other.left && other.right() <= self.right() && self.top <= other.top && other.bottom() <= self.bottom()
    }

    pub fn intersection(&self, other: Region) -> Option<Region> {
        let left = cmp::max(self.left(), other.left());
        let right = cmp::min(self.right(), other.right());
        let top = cmp::max(self.top(), other.top());
        let bottom = cmp::min(self.bottom(), other.bottom());
        if left >= right || top >= bottom {
            return None;
        }
        Some(Region::new(left, top, right - left, bottom - top))
    }

    /// Iterates over every `(col, row)` in the region, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let (left, right) = (self.left, self.right());
        (self.top..self.bottom()).flat_map(move |row| (left..right).map(move |col| (col, row)))
    }
}

/// Static partition of a `width`x`height` grid into square tiles of `tile_size` cells. Tiles on
/// the right and bottom edges are clipped to the grid when the size does not divide evenly.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct TileIndex {
    width:         usize,
    height:        usize,
    tile_size:     usize,
    tiles_per_row: usize,
    tiles_per_col: usize,
}

impl TileIndex {
    /// # Panics
    ///
    /// Panics if any argument is zero.
    pub fn new(width: usize, height: usize, tile_size: usize) -> Self {
        assert!(width != 0 && height != 0, "grid dimensions must be positive");
        assert!(tile_size != 0, "tile size must be positive");
        TileIndex {
            width,
            height,
            tile_size,
            tiles_per_row: (width - 1) / tile_size + 1,
            tiles_per_col: (height - 1) / tile_size + 1,
        }
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn tiles_per_row(&self) -> usize {
        self.tiles_per_row
    }

    pub fn tiles_per_col(&self) -> usize {
        self.tiles_per_col
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.tiles_per_row * self.tiles_per_col
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of the tile holding cell `(x, y)`.
    #[inline]
    pub fn tile_of(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y / self.tile_size) * self.tiles_per_row + x / self.tile_size
    }

    /// Cell rectangle covered by tile `index`, clipped to the grid.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn tile_region(&self, index: usize) -> Region {
        assert!(index < self.len(), "tile index {} out of range ({} tiles)", index, self.len());
        let left = (index % self.tiles_per_row) * self.tile_size;
        let top = (index / self.tiles_per_row) * self.tile_size;
        let width = cmp::min(self.tile_size, self.width - left);
        let height = cmp::min(self.tile_size, self.height - top);
        Region::new(left, top, width, height)
    }
}

/// A tile reported dirty, with the rectangle a renderer needs to redraw.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct Tile {
    pub index:  usize,
    pub region: Region,
}

/// One dirty flag per tile. Flags are independent atomics, so workers marking different (or the
/// same) tiles never need a lock.
pub struct DirtyTiles {
    index: TileIndex,
    flags: Vec<AtomicBool>,
}

impl DirtyTiles {
    /// All flags start clear.
    pub fn new(index: TileIndex) -> Self {
        let flags = (0..index.len()).map(|_| AtomicBool::new(false)).collect();
        DirtyTiles { index, flags }
    }

    pub fn index(&self) -> &TileIndex {
        &self.index
    }

    /// Marks the tile holding cell `(x, y)` as dirty.
    #[inline]
    pub fn mark_dirty(&self, x: usize, y: usize) {
        self.flags[self.index.tile_of(x, y)].store(true, Ordering::Relaxed);
    }

    pub fn mark_all(&self) {
        for flag in &self.flags {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Clears every flag.
    pub fn reset(&self) {
        for flag in &self.flags {
            flag.store(false, Ordering::Relaxed);
        }
    }

    pub fn is_dirty(&self, tile: usize) -> bool {
        self.flags[tile].load(Ordering::Relaxed)
    }

    pub fn dirty_count(&self) -> usize {
        self.flags.iter().filter(|f| f.load(Ordering::Relaxed)).count()
    }

    /// Lazily walks the dirty tiles in ascending index order.
    pub fn iter(&self) -> DirtyIter<'_> {
        DirtyIter { tiles: self, next: 0 }
    }

    pub fn for_each_dirty<F: FnMut(Tile)>(&self, mut callback: F) {
        for tile in self.iter() {
            callback(tile);
        }
    }
}

pub struct DirtyIter<'a> {
    tiles: &'a DirtyTiles,
    next:  usize,
}

impl<'a> Iterator for DirtyIter<'a> {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        while self.next < self.tiles.flags.len() {
            let index = self.next;
            self.next += 1;
            if self.tiles.is_dirty(index) {
                return Some(Tile {
                    index,
                    region: self.tiles.index.tile_region(index),
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.tiles.flags.len() - self.next))
    }
}
