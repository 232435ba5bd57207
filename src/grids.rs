/*  Copyright 2017-2026 the Conwayste Developers.
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

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::region::Region;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BitOperation {
    Clear,
    Set,
    Toggle,
}

/// A fixed-size grid of on/off cells, packed 64 to a word.
///
/// Cell `(x, y)` lives at flat bit index `y * width + x`; within a word the first cell is the most
/// significant bit. Words are atomic so that any number of threads may write *different* cells
/// through a shared reference, even when those cells share a word. Nothing here orders those
/// writes against readers; callers publish a finished grid with their own synchronization.
pub struct BitGrid {
    width:  usize,
    height: usize,
    words:  Vec<AtomicU64>,
}

impl BitGrid {
    /// Creates a new zero-initialized BitGrid of given dimensions, in cells.
    ///
    /// # Panics
    ///
    /// This function will panic if `width` or `height` are zero.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width != 0);
        assert!(height != 0);

        let word_count = (width * height - 1) / 64 + 1;
        let mut words = Vec::with_capacity(word_count);
        for _ in 0..word_count {
            words.push(AtomicU64::new(0));
        }
        BitGrid { width, height, words }
    }

    /// Creates a BitGrid whose cell `(x, y)` is alive iff `alive(x, y)` returns true.
    pub fn from_fn<F: FnMut(usize, usize) -> bool>(width: usize, height: usize, mut alive: F) -> Self {
        let grid = BitGrid::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if alive(x, y) {
                    grid.set(x, y, true);
                }
            }
        }
        grid
    }

    /// Width in cells
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of u64 words backing this grid.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Get a Region of the same size as the BitGrid.
    pub fn region(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    /// Flat bit index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "({}, {}) is outside {}x{}", x, y, self.width, self.height);
        y * self.width + x
    }

    /// Returns `(word_index, mask)` addressing the bit at flat index `i`.
    #[inline]
    pub fn locate(i: usize) -> (usize, u64) {
        let shift = 63 - (i & (64 - 1));
        (i / 64, 1 << shift)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        let (word, mask) = BitGrid::locate(self.index(x, y));
        self.words[word].load(Ordering::Relaxed) & mask != 0
    }

    #[inline]
    pub fn set(&self, x: usize, y: usize, alive: bool) {
        let op = if alive { BitOperation::Set } else { BitOperation::Clear };
        self.modify(x, y, op);
    }

    /// Sets, clears, or toggles a single cell.
    #[inline]
    pub fn modify(&self, x: usize, y: usize, op: BitOperation) {
        let (word, mask) = BitGrid::locate(self.index(x, y));
        self.modify_bits_in_word(word, mask, op);
    }

    #[inline]
    pub fn modify_bits_in_word(&self, word: usize, mask: u64, op: BitOperation) {
        let w = &self.words[word];
        match op {
            BitOperation::Set => w.fetch_or(mask, Ordering::Relaxed),
            BitOperation::Clear => w.fetch_and(!mask, Ordering::Relaxed),
            BitOperation::Toggle => w.fetch_xor(mask, Ordering::Relaxed),
        };
    }

    /// Overwrites the bits selected by `mask` in word `word` with the corresponding bits of
    /// `bits`, leaving all other bits of that word untouched even if other threads are writing
    /// them concurrently.
    #[inline]
    pub fn store_bits(&self, word: usize, mask: u64, bits: u64) {
        let w = &self.words[word];
        let set = bits & mask;
        let clear = !bits & mask;
        if clear != 0 {
            w.fetch_and(!clear, Ordering::Relaxed);
        }
        if set != 0 {
            w.fetch_or(set, Ordering::Relaxed);
        }
    }

    /// Column indices `[left, x, right]` around `x`, wrapping at the edges.
    #[inline]
    pub fn wrapped_cols(&self, x: usize) -> [usize; 3] {
        let w = self.width;
        [(x + w - 1) % w, x, (x + 1) % w]
    }

    /// Row indices `[above, y, below]` around `y`, wrapping at the edges.
    #[inline]
    pub fn wrapped_rows(&self, y: usize) -> [usize; 3] {
        let h = self.height;
        [(y + h - 1) % h, y, (y + 1) % h]
    }

    /// Counts the live cells among the eight neighbors of `(x, y)` on the torus. On grids
    /// narrower or shorter than 3 cells a neighbor may be counted more than once, the same as
    /// it would be on an infinite tiling of this grid.
    pub fn live_neighbors(&self, x: usize, y: usize) -> u8 {
        let cols = self.wrapped_cols(x);
        let rows = self.wrapped_rows(y);
        let mut count = 0;
        for (j, &row) in rows.iter().enumerate() {
            for (i, &col) in cols.iter().enumerate() {
                if i == 1 && j == 1 {
                    continue;
                }
                if self.get(col, row) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Clear this BitGrid.
    pub fn clear(&self) {
        for word in &self.words {
            word.store(0, Ordering::Relaxed);
        }
    }

    /// Copies every cell of `src` into this grid.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn copy_from(&self, src: &BitGrid) {
        assert_eq!((self.width, self.height), (src.width, src.height), "BitGrid dimensions must match");
        for (dst, src) in self.words.iter().zip(src.words.iter()) {
            dst.store(src.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    /// Number of live cells.
    pub fn population(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Calls callback on each bit that is set (1). Callback receives (col, row).
    pub fn each_set<F: FnMut(usize, usize)>(&self, mut callback: F) {
        let total = self.width * self.height;
        for (word_idx, word) in self.words.iter().enumerate() {
            let mut bits = word.load(Ordering::Relaxed);
            while bits != 0 {
                let lead = bits.leading_zeros() as usize;
                let i = word_idx * 64 + lead;
                if i >= total {
                    break;
                }
                callback(i % self.width, i / self.width);
                bits &= !(1u64 << (63 - lead));
            }
        }
    }

    /// Returns `Some(`smallest region containing every live cell`)`, or `None` if there are
    /// none. This ignores wrap-around, so a pattern straddling an edge yields a wide region.
    pub fn bounding_box(&self) -> Option<Region> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        self.each_set(|x, y| {
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
            });
        });
        bounds.map(|(l, t, r, b)| Region::new(l, t, r - l + 1, b - t + 1))
    }
}

impl PartialEq for BitGrid {
    fn eq(&self, other: &BitGrid) -> bool {
        self.width == other.width
            && self.height == other.height
            && self
                .words
                .iter()
                .zip(other.words.iter())
                .all(|(a, b)| a.load(Ordering::Relaxed) == b.load(Ordering::Relaxed))
    }
}

impl Eq for BitGrid {}

impl Clone for BitGrid {
    fn clone(&self) -> Self {
        let copy = BitGrid::new(self.width, self.height);
        copy.copy_from(self);
        copy
    }
}

impl fmt::Debug for BitGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BitGrid {}x{} ({} alive)", self.width, self.height, self.population())
    }
}

/// Renders live cells as `*` and dead cells as `.`, one line per row.
impl fmt::Display for BitGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.height {
            let mut line = String::with_capacity(self.width);
            for x in 0..self.width {
                line.push(if self.get(x, y) { '*' } else { '.' });
            }
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_and_get_single_cells() {
        let grid = BitGrid::new(70, 3);
        grid.set(0, 0, true);
        grid.set(69, 2, true);
        grid.set(63, 1, true);
        assert!(grid.get(0, 0));
        assert!(grid.get(69, 2));
        assert!(grid.get(63, 1));
        assert!(!grid.get(1, 0));
        assert_eq!(grid.population(), 3);

        grid.set(63, 1, false);
        assert!(!grid.get(63, 1));
        assert_eq!(grid.population(), 2);
    }

    #[test]
    fn first_cell_is_most_significant_bit() {
        assert_eq!(BitGrid::locate(0), (0, 1 << 63));
        assert_eq!(BitGrid::locate(63), (0, 1));
        assert_eq!(BitGrid::locate(64), (1, 1 << 63));
    }

    #[test]
    fn rows_are_not_word_aligned() {
        // 10 wide: row 6 starts at bit 60, sharing word 0 with rows 0..5
        let grid = BitGrid::new(10, 10);
        assert_eq!(grid.word_count(), 2);
        grid.set(3, 6, true);
        assert!(grid.get(3, 6));
        assert_eq!(grid.index(3, 6), 63);
    }

    #[test]
    fn store_bits_only_touches_masked_bits() {
        let grid = BitGrid::new(64, 1);
        grid.modify_bits_in_word(0, 0xF000_0000_0000_000F, BitOperation::Set);
        grid.store_bits(0, 0x0000_0000_0000_00FF, 0x0000_0000_0000_00A0);
        let mut live = vec![];
        grid.each_set(|x, _| live.push(x));
        assert_eq!(live, vec![0, 1, 2, 3, 56, 58]);
    }

    #[test]
    fn toggle_flips_state() {
        let grid = BitGrid::new(5, 5);
        grid.modify(2, 2, BitOperation::Toggle);
        assert!(grid.get(2, 2));
        grid.modify(2, 2, BitOperation::Toggle);
        assert!(!grid.get(2, 2));
    }

    #[test]
    fn wrapped_coordinates_at_edges() {
        let grid = BitGrid::new(8, 4);
        assert_eq!(grid.wrapped_cols(0), [7, 0, 1]);
        assert_eq!(grid.wrapped_cols(7), [6, 7, 0]);
        assert_eq!(grid.wrapped_rows(0), [3, 0, 1]);
        assert_eq!(grid.wrapped_rows(3), [2, 3, 0]);
    }

    #[test]
    fn corner_cell_neighbors_wrap_around_torus() {
        let (w, h) = (6, 5);
        let grid = BitGrid::new(w, h);
        grid.set(0, 0, true);
        assert_eq!(grid.live_neighbors(w - 1, h - 1), 1);
        assert_eq!(grid.live_neighbors(w - 1, 0), 1);
        assert_eq!(grid.live_neighbors(0, h - 1), 1);
        assert_eq!(grid.live_neighbors(0, 0), 0);
        assert_eq!(grid.live_neighbors(3, 2), 0);
    }

    #[test]
    fn full_neighborhood_counts_eight() {
        let grid = BitGrid::from_fn(5, 5, |x, y| (1..4).contains(&x) && (1..4).contains(&y));
        assert_eq!(grid.live_neighbors(2, 2), 8);
        assert_eq!(grid.live_neighbors(0, 0), 1);
    }

    #[test]
    fn each_set_skips_padding_bits() {
        let grid = BitGrid::from_fn(3, 3, |_, _| true);
        let mut count = 0;
        grid.each_set(|x, y| {
            assert!(x < 3 && y < 3);
            count += 1;
        });
        assert_eq!(count, 9);
    }

    #[test]
    fn bounding_box_of_pattern() {
        let grid = BitGrid::new(20, 20);
        assert_eq!(grid.bounding_box(), None);
        grid.set(4, 5, true);
        grid.set(9, 7, true);
        assert_eq!(grid.bounding_box(), Some(Region::new(4, 5, 6, 3)));
    }

    #[test]
    fn clone_and_eq() {
        let grid = BitGrid::from_fn(9, 4, |x, y| (x + y) % 3 == 0);
        let copy = grid.clone();
        assert_eq!(grid, copy);
        copy.set(0, 0, false);
        assert!(grid != copy);
    }

    #[test]
    fn display_renders_rows() {
        let grid = BitGrid::from_fn(3, 2, |x, y| x == y);
        assert_eq!(format!("{}", grid), "*..\n.*.\n");
    }

    #[test]
    #[should_panic]
    fn zero_width_panics() {
        let _ = BitGrid::new(0, 4);
    }
}
