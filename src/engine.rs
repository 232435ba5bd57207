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

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::{DEFAULT_HEIGHT, DEFAULT_TILE_SIZE, DEFAULT_UPDATE_RATE, DEFAULT_WIDTH, DEFAULT_WORKERS};
use crate::error::{EngineError, EngineResult};
use crate::grids::BitGrid;
use crate::queue::JobQueue;
use crate::region::{DirtyIter, DirtyTiles, Region, TileIndex};
use crate::source::PixelSource;
use crate::sync::{Completion, ShutdownHandle};
use crate::worker::{IdlePolicy, Job, WorkerPool};

/// Builder paradigm to create `Engine` structs with default values.
pub struct BigBang {
    width:       usize,
    height:      usize,
    workers:     usize,
    tile_size:   usize,
    update_rate: usize,
    idle:        IdlePolicy,
}

/// This is a builder for `Engine` structs.
///
/// # Examples
///
/// ```
/// let mut engine = torus_life::BigBang::new()
///                 .width(256)      // optionally override width
///                 .height(128)     // optionally override height
///                 .workers(2)      // optionally override the pool size
///                 .birth()
///                 .unwrap();
/// engine.set_cell(10, 10, true);
/// assert_eq!(engine.step().unwrap(), 2);
/// ```
impl BigBang {
    /// Creates and returns a new builder.
    pub fn new() -> BigBang {
        BigBang {
            width:       DEFAULT_WIDTH,
            height:      DEFAULT_HEIGHT,
            workers:     DEFAULT_WORKERS,
            tile_size:   DEFAULT_TILE_SIZE,
            update_rate: DEFAULT_UPDATE_RATE,
            idle:        IdlePolicy::default(),
        }
    }

    /// Update the total number of columns
    pub fn width(mut self, new_width: usize) -> BigBang {
        self.width = new_width;
        self
    }

    /// Update the total number of rows
    pub fn height(mut self, new_height: usize) -> BigBang {
        self.height = new_height;
        self
    }

    /// Number of worker threads, and so the number of row bands per generation.
    pub fn workers(mut self, count: usize) -> BigBang {
        self.workers = count;
        self
    }

    /// Side length of the square tiles used for dirty tracking.
    pub fn tile_size(mut self, size: usize) -> BigBang {
        self.tile_size = size;
        self
    }

    /// `advance_frame` runs one generation every `frames` calls.
    pub fn update_rate(mut self, frames: usize) -> BigBang {
        self.update_rate = frames;
        self
    }

    pub fn idle_policy(mut self, idle: IdlePolicy) -> BigBang {
        self.idle = idle;
        self
    }

    fn validate(&self) -> EngineResult<()> {
        use EngineError::InvalidConfig;
        let checks = [
            (self.width, "Width"),
            (self.height, "Height"),
            (self.workers, "Worker count"),
            (self.tile_size, "Tile size"),
            (self.update_rate, "Update rate"),
        ];
        for &(value, name) in checks.iter() {
            if value == 0 {
                return Err(InvalidConfig {
                    reason: format!("{} must be positive", name),
                });
            }
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(InvalidConfig {
                reason: format!("{}x{} grid is too large", self.width, self.height),
            });
        }
        Ok(())
    }

    /// "Gives life to the universe and the first moment of time."
    /// Allocates both buffers, spawns the worker pool, and returns an empty board at
    /// generation 1.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if any dimension, the worker count, the tile size or the update rate is
    ///   zero.
    /// - `Io` if a worker thread can't be spawned.
    pub fn birth(&self) -> EngineResult<Engine> {
        self.validate()?;
        Engine::new(self)
    }

    /// Like `birth`, but the grid takes the dimensions of `source` and each opaque pixel seeds
    /// a live cell. The builder's own width and height are ignored.
    pub fn import_from<S: PixelSource + ?Sized>(self, source: &S) -> EngineResult<Engine> {
        let mut engine = self.width(source.width()).height(source.height()).birth()?;
        engine.stamp(source, 0, 0);
        Ok(engine)
    }
}

impl Default for BigBang {
    fn default() -> Self {
        BigBang::new()
    }
}

/// Splits `height` rows into `parts` full-width bands. Band `i` starts at row
/// `i * (height / parts)`; the last band also takes the remainder rows, so the bands cover the
/// grid exactly. When `parts > height` the leading bands are empty.
///
/// # Panics
///
/// Panics if `parts` is zero.
pub fn partition_rows(width: usize, height: usize, parts: usize) -> Vec<Region> {
    assert!(parts != 0, "cannot partition into zero bands");
    let band = height / parts;
    (0..parts)
        .map(|i| {
            let top = band * i;
            let rows = if i + 1 == parts { height - top } else { band };
            Region::new(0, top, width, rows)
        })
        .collect()
}

/// What a renderer should redraw after the latest generation.
pub enum Redraw<'a> {
    /// Everything, e.g. before the first step or after the board was edited.
    Full(Region),
    /// Only these tiles changed.
    Tiles(DirtyIter<'a>),
}

/// A toroidal Life board, double-buffered and stepped by a fixed pool of worker threads.
///
/// The board and its generation are only reachable through `&self` between steps. `step` takes
/// `&mut self`, so a step can't overlap another step or a reader of `current()`.
pub struct Engine {
    width:        usize,
    height:       usize,
    generation:   usize,        // current generation (1-based)
    update_rate:  usize,
    frame_count:  usize,
    current:      Arc<BitGrid>, // the finished generation
    next:         Arc<BitGrid>, // scratch for the generation being computed
    bands:        Vec<Region>,  // one per worker, fixed for the life of the engine
    tiles:        Arc<DirtyTiles>,
    full_redraw:  bool,
    last_step:    Duration,
    queue:        JobQueue<Job>,
    completion:   Arc<Completion>,
    shutdown:     ShutdownHandle,
    pool:         WorkerPool,
}

impl Engine {
    fn new(params: &BigBang) -> EngineResult<Engine> {
        let (width, height) = (params.width, params.height);
        let tile_index = TileIndex::new(width, height, params.tile_size);
        let tiles = Arc::new(DirtyTiles::new(tile_index));
        let queue = JobQueue::new();
        let completion = Arc::new(Completion::new(params.workers));
        let shutdown = ShutdownHandle::new();
        let pool = WorkerPool::new(params.workers, &queue, &completion, &tiles, &shutdown, params.idle)?;

        info!(
            "engine {}x{}: {} workers, {} tiles of {}x{}, {:?}",
            width,
            height,
            params.workers,
            tile_index.len(),
            params.tile_size,
            params.tile_size,
            params.idle
        );

        Ok(Engine {
            width,
            height,
            generation: 1,
            update_rate: params.update_rate,
            frame_count: 0,
            current: Arc::new(BitGrid::new(width, height)),
            next: Arc::new(BitGrid::new(width, height)),
            bands: partition_rows(width, height, params.workers),
            tiles,
            full_redraw: true,
            last_step: Duration::from_secs(0),
            queue,
            completion,
            shutdown,
            pool,
        })
    }

    /// Width in cells
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn workers(&self) -> usize {
        self.pool.len()
    }

    /// Get the latest generation number (1-based).
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The work items every step is split into.
    pub fn bands(&self) -> &[Region] {
        &self.bands
    }

    pub fn tile_index(&self) -> &TileIndex {
        self.tiles.index()
    }

    /// The latest finished generation.
    pub fn current(&self) -> &BitGrid {
        &self.current
    }

    /// Raw per-tile dirty flags of the latest step.
    pub fn dirty_tiles(&self) -> &DirtyTiles {
        &self.tiles
    }

    /// What changed since the previous generation.
    pub fn redraw(&self) -> Redraw<'_> {
        if self.full_redraw {
            Redraw::Full(self.current.region())
        } else {
            Redraw::Tiles(self.tiles.iter())
        }
    }

    pub fn population(&self) -> usize {
        self.current.population()
    }

    /// Wall-clock duration of the most recent `step`.
    pub fn last_step_time(&self) -> Duration {
        self.last_step
    }

    /// A handle that stops this engine from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Computes the next generation. Returns the new latest generation number.
    ///
    /// # Errors
    ///
    /// `ShuttingDown` if shutdown was signalled before the step was published. Once published,
    /// a step always runs to completion.
    pub fn step(&mut self) -> EngineResult<usize> {
        if !self.shutdown.is_running() {
            return Err(self.shutting_down());
        }
        let start = Instant::now();

        self.completion.begin();
        // Workers only exit while the completion is settled, and `begin` precedes this check, so
        // either this sees the signal or every worker will see the unsettled step.
        if !self.shutdown.is_running() {
            self.completion.cancel();
            return Err(self.shutting_down());
        }
        self.tiles.reset();
        for band in &self.bands {
            self.queue.enqueue(Job {
                region:     *band,
                generation: self.generation + 1,
                current:    Arc::clone(&self.current),
                next:       Arc::clone(&self.next),
            });
        }
        self.completion.wait();

        mem::swap(&mut self.current, &mut self.next);
        self.generation += 1;
        self.full_redraw = false;
        self.last_step = start.elapsed();
        trace!(
            "generation {} in {:?}, {} dirty tiles",
            self.generation,
            self.last_step,
            self.tiles.dirty_count()
        );
        Ok(self.generation)
    }

    /// Runs `count` steps. Returns the latest generation number.
    pub fn step_n(&mut self, count: usize) -> EngineResult<usize> {
        for _ in 0..count {
            self.step()?;
        }
        Ok(self.generation)
    }

    /// Call once per rendered frame. Steps on every `update_rate`-th call and returns the new
    /// generation number, otherwise returns `None`.
    pub fn advance_frame(&mut self) -> EngineResult<Option<usize>> {
        self.frame_count += 1;
        if self.frame_count % self.update_rate == 0 {
            self.step().map(Some)
        } else {
            Ok(None)
        }
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the board.
    pub fn get_cell(&self, x: usize, y: usize) -> bool {
        self.assert_in_range(x, y);
        self.current.get(x, y)
    }

    /// Sets a cell of the current generation. The next `redraw` is `Full`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the board.
    pub fn set_cell(&mut self, x: usize, y: usize, alive: bool) {
        self.assert_in_range(x, y);
        self.current.set(x, y, alive);
        self.full_redraw = true;
    }

    /// Kills every cell.
    pub fn clear(&mut self) {
        self.current.clear();
        self.full_redraw = true;
    }

    /// Makes each cell alive with probability `density`, replacing the current board.
    ///
    /// # Errors
    ///
    /// `InvalidData` unless `0.0 <= density <= 1.0`.
    pub fn seed_random<R: Rng + ?Sized>(&mut self, density: f64, rng: &mut R) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&density) {
            return Err(EngineError::InvalidData {
                reason: format!("density {} is not within 0..=1", density),
            });
        }
        self.current.clear();
        for y in 0..self.height {
            for x in 0..self.width {
                if rng.gen_bool(density) {
                    self.current.set(x, y, true);
                }
            }
        }
        self.full_redraw = true;
        Ok(())
    }

    /// Copies the opaque pixels of `source` onto the board with its top-left corner at
    /// `(left, top)`, wrapping around the edges. Transparent pixels leave cells as they were.
    /// The next `redraw` is `Full`.
    pub fn stamp<S: PixelSource + ?Sized>(&mut self, source: &S, left: usize, top: usize) {
        for y in 0..source.height() {
            for x in 0..source.width() {
                if source.is_opaque(x, y) {
                    self.current.set((left + x) % self.width, (top + y) % self.height, true);
                }
            }
        }
        self.full_redraw = true;
    }

    /// `stamp` centered on the board.
    pub fn stamp_centered<S: PixelSource + ?Sized>(&mut self, source: &S) {
        let left = (self.width + self.width / 2 - source.width() % self.width / 2) % self.width;
        let top = (self.height + self.height / 2 - source.height() % self.height / 2) % self.height;
        self.stamp(source, left, top);
    }

    fn assert_in_range(&self, x: usize, y: usize) {
        assert!(x < self.width && y < self.height, "({}, {}) is outside the {}x{} board", x, y, self.width, self.height);
    }

    fn shutting_down(&self) -> EngineError {
        EngineError::ShuttingDown {
            reason: format!("no steps after generation {}", self.generation),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.current)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown.signal();
        self.pool.shutdown();
        info!("engine stopped at generation {}", self.generation);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::AlphaMask;

    fn small(workers: usize) -> Engine {
        BigBang::new().width(16).height(12).workers(workers).tile_size(4).birth().unwrap()
    }

    #[test]
    fn partition_even_split() {
        let bands = partition_rows(10, 8, 4);
        assert_eq!(
            bands,
            vec![
                Region::new(0, 0, 10, 2),
                Region::new(0, 2, 10, 2),
                Region::new(0, 4, 10, 2),
                Region::new(0, 6, 10, 2),
            ]
        );
    }

    #[test]
    fn partition_remainder_goes_to_last_band() {
        let bands = partition_rows(5, 10, 3);
        assert_eq!(bands[0], Region::new(0, 0, 5, 3));
        assert_eq!(bands[1], Region::new(0, 3, 5, 3));
        assert_eq!(bands[2], Region::new(0, 6, 5, 4));
    }

    #[test]
    fn partition_more_workers_than_rows() {
        let bands = partition_rows(5, 2, 4);
        assert_eq!(bands.len(), 4);
        assert!(bands[..3].iter().all(|b| b.is_empty()));
        assert_eq!(bands[3], Region::new(0, 0, 5, 2));
    }

    #[test]
    fn birth_rejects_zero_parameters() {
        use EngineError::InvalidConfig;
        let cases = vec![
            (BigBang::new().width(0), "Width must be positive"),
            (BigBang::new().height(0), "Height must be positive"),
            (BigBang::new().workers(0), "Worker count must be positive"),
            (BigBang::new().tile_size(0), "Tile size must be positive"),
            (BigBang::new().update_rate(0), "Update rate must be positive"),
        ];
        for (bb, reason) in cases {
            assert_eq!(
                bb.birth().err(),
                Some(InvalidConfig {
                    reason: reason.to_owned(),
                })
            );
        }
    }

    #[test]
    fn new_engine_is_empty_and_fully_dirty() {
        let engine = small(3);
        assert_eq!(engine.generation(), 1);
        assert_eq!(engine.workers(), 3);
        assert_eq!(engine.population(), 0);
        match engine.redraw() {
            Redraw::Full(region) => assert_eq!(region, Region::new(0, 0, 16, 12)),
            Redraw::Tiles(_) => panic!("first frame must be a full redraw"),
        }
    }

    #[test]
    fn step_swaps_buffers_and_reports_dirty_tiles() {
        let mut engine = small(2);
        for x in 5..8 {
            engine.set_cell(x, 5, true);
        }
        assert_eq!(engine.step().unwrap(), 2);
        assert!(engine.get_cell(6, 4) && engine.get_cell(6, 5) && engine.get_cell(6, 6));
        assert!(!engine.get_cell(5, 5) && !engine.get_cell(7, 5));
        // all four changed cells lie in the tile spanning (4..8, 4..8)
        let dirty: Vec<usize> = match engine.redraw() {
            Redraw::Tiles(tiles) => tiles.map(|t| t.index).collect(),
            Redraw::Full(_) => panic!("expected tiles after a step"),
        };
        assert_eq!(dirty, vec![5]);
    }

    #[test]
    fn still_life_produces_no_dirty_tiles() {
        let mut engine = small(4);
        for &(x, y) in &[(2, 2), (3, 2), (2, 3), (3, 3)] {
            engine.set_cell(x, y, true);
        }
        engine.step().unwrap();
        assert_eq!(engine.dirty_tiles().dirty_count(), 0);
        assert_eq!(engine.population(), 4);
    }

    #[test]
    fn editing_forces_full_redraw() {
        let mut engine = small(1);
        engine.step().unwrap();
        assert!(matches!(engine.redraw(), Redraw::Tiles(_)));
        engine.set_cell(0, 0, true);
        assert!(matches!(engine.redraw(), Redraw::Full(_)));
    }

    #[test]
    fn advance_frame_respects_update_rate() {
        let mut engine = BigBang::new().width(8).height(8).workers(2).update_rate(3).birth().unwrap();
        let steps: Vec<Option<usize>> = (0..7).map(|_| engine.advance_frame().unwrap()).collect();
        assert_eq!(steps, vec![None, None, Some(2), None, None, Some(3), None]);
    }

    #[test]
    fn import_from_takes_source_dimensions() {
        let mask = AlphaMask::from_ascii(&["....", ".**.", ".**.", "...."]);
        let engine = BigBang::new().width(999).workers(2).import_from(&mask).unwrap();
        assert_eq!((engine.width(), engine.height()), (4, 4));
        assert_eq!(engine.population(), 4);
        assert!(engine.get_cell(1, 1) && engine.get_cell(2, 2));
    }

    #[test]
    fn stamp_wraps_around_edges() {
        let mut engine = small(1);
        let mask = AlphaMask::from_ascii(&["**", "**"]);
        engine.stamp(&mask, 15, 11);
        for &(x, y) in &[(15, 11), (0, 11), (15, 0), (0, 0)] {
            assert!(engine.get_cell(x, y), "({}, {})", x, y);
        }
        assert_eq!(engine.population(), 4);
    }

    #[test]
    fn stamp_centered_places_pattern_in_middle() {
        let mut engine = small(1);
        engine.stamp_centered(&AlphaMask::from_ascii(&["***"]));
        assert!(engine.get_cell(7, 6) && engine.get_cell(8, 6) && engine.get_cell(9, 6));
    }

    #[test]
    fn seed_random_rejects_bad_density() {
        let mut engine = small(1);
        let mut rng = rand::thread_rng();
        assert!(engine.seed_random(1.5, &mut rng).is_err());
        engine.seed_random(1.0, &mut rng).unwrap();
        assert_eq!(engine.population(), 16 * 12);
    }

    #[test]
    fn step_after_shutdown_is_rejected() {
        let mut engine = small(2);
        engine.shutdown_handle().signal();
        match engine.step() {
            Err(EngineError::ShuttingDown { .. }) => {}
            other => panic!("expected ShuttingDown, got {:?}", other),
        }
        assert_eq!(engine.generation(), 1);
    }

    #[test]
    #[should_panic]
    fn out_of_range_cell_panics() {
        let mut engine = small(1);
        engine.set_cell(16, 0, true);
    }

    #[test]
    fn display_shows_board() {
        let mut engine = BigBang::new().width(3).height(2).workers(1).birth().unwrap();
        engine.set_cell(1, 0, true);
        assert_eq!(format!("{}", engine), ".*.\n...\n");
    }
}
