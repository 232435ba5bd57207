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

use std::hint;
use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::grids::BitGrid;
use crate::queue::JobQueue;
use crate::region::{DirtyTiles, Region};
use crate::sync::{Completion, ShutdownHandle};

/// What an idle worker does while the job queue is empty.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum IdlePolicy {
    /// Poll `try_dequeue` in a tight loop. Lowest latency, burns a core per worker.
    Spin,
    /// Block on the queue for at most this long per poll.
    Wait(Duration),
}

impl Default for IdlePolicy {
    fn default() -> Self {
        IdlePolicy::Wait(Duration::from_millis(1))
    }
}

impl IdlePolicy {
    /// `0` means spin; anything else is a bounded wait of that many milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            IdlePolicy::Spin
        } else {
            IdlePolicy::Wait(Duration::from_millis(ms))
        }
    }
}

/// One unit of work: compute `region` of `next` from `current`.
pub struct Job {
    pub region:     Region,
    pub generation: usize,
    pub current:    Arc<BitGrid>,
    pub next:       Arc<BitGrid>,
}

/// B3/S23: a live cell survives with 2 or 3 live neighbors, a dead cell is born with exactly 3.
#[inline]
pub fn next_cell_state(alive: bool, live_neighbors: u8) -> bool {
    match (alive, live_neighbors) {
        (true, 2) | (true, 3) => true,
        (false, 3) => true,
        _ => false,
    }
}

/// Computes every cell of `region` in `next` from `current`, marking the tile of each cell that
/// changes. Only reads `current` and only writes the cells of `region` in `next`, so disjoint
/// regions can be processed concurrently.
///
/// # Panics
///
/// Panics if the grids differ in size or `region` reaches outside them.
pub fn process_region(region: Region, current: &BitGrid, next: &BitGrid, dirty: &DirtyTiles) {
    assert_eq!((current.width(), current.height()), (next.width(), next.height()), "buffer dimensions differ");
    assert!(current.region().contains_region(&region), "work item {:?} outside {}x{} grid", region, current.width(), current.height());

    for y in region.top()..region.bottom() {
        // (word index, mask of cells written, new bits)
        let mut pending: Option<(usize, u64, u64)> = None;
        for x in region.left()..region.right() {
            let alive = current.get(x, y);
            let alive_next = next_cell_state(alive, current.live_neighbors(x, y));
            if alive_next != alive {
                dirty.mark_dirty(x, y);
            }

            let (word, bit) = BitGrid::locate(current.index(x, y));
            let value = if alive_next { bit } else { 0 };
            pending = match pending {
                Some((w, mask, bits)) if w == word => Some((w, mask | bit, bits | value)),
                Some((w, mask, bits)) => {
                    next.store_bits(w, mask, bits);
                    Some((word, bit, value))
                }
                None => Some((word, bit, value)),
            };
        }
        if let Some((w, mask, bits)) = pending {
            next.store_bits(w, mask, bits);
        }
    }
}

/// Aborts the process if a worker unwinds. A skipped work item would leave part of the next
/// generation undefined and the coordinator waiting forever.
struct AbortOnPanic {
    id: usize,
}

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("worker {} panicked mid-generation; aborting", self.id);
            process::abort();
        }
    }
}

struct WorkerContext {
    id:         usize,
    queue:      JobQueue<Job>,
    completion: Arc<Completion>,
    dirty:      Arc<DirtyTiles>,
    shutdown:   ShutdownHandle,
    idle:       IdlePolicy,
}

impl WorkerContext {
    fn poll(&self) -> Option<Job> {
        match self.idle {
            IdlePolicy::Spin => self.queue.try_dequeue(),
            IdlePolicy::Wait(timeout) => self.queue.dequeue_timeout(timeout),
        }
    }

    fn run(self) {
        let _guard = AbortOnPanic { id: self.id };
        debug!("worker {} started", self.id);
        let mut items = 0usize;
        loop {
            match self.poll() {
                Some(job) => {
                    trace!("worker {} gen {} rows {}..{}", self.id, job.generation, job.region.top(), job.region.bottom());
                    process_region(job.region, &job.current, &job.next, &self.dirty);
                    drop(job);
                    self.completion.report();
                    items += 1;
                }
                None => {
                    // Exit only once no step is in flight, so a step that was already published
                    // is drained even after shutdown was signalled.
                    if !self.shutdown.is_running() && self.completion.is_settled() {
                        break;
                    }
                    if self.idle == IdlePolicy::Spin {
                        hint::spin_loop();
                    }
                }
            }
        }
        debug!("worker {} stopped after {} work items", self.id, items);
    }
}

/// Fixed set of long-lived worker threads sharing one job queue.
pub struct WorkerPool {
    handles:  Vec<JoinHandle<()>>,
    shutdown: ShutdownHandle,
}

impl WorkerPool {
    /// Spawns `count` workers.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Io` if a thread can't be spawned. Workers spawned before the
    /// failure are shut down and joined first.
    pub fn new(
        count: usize,
        queue: &JobQueue<Job>,
        completion: &Arc<Completion>,
        dirty: &Arc<DirtyTiles>,
        shutdown: &ShutdownHandle,
        idle: IdlePolicy,
    ) -> EngineResult<WorkerPool> {
        let mut pool = WorkerPool {
            handles:  Vec::with_capacity(count),
            shutdown: shutdown.clone(),
        };
        for id in 0..count {
            let ctx = WorkerContext {
                id,
                queue: queue.clone(),
                completion: Arc::clone(completion),
                dirty: Arc::clone(dirty),
                shutdown: shutdown.clone(),
                idle,
            };
            let spawned = thread::Builder::new()
                .name(format!("life-worker-{}", id))
                .spawn(move || ctx.run());
            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(EngineError::Io {
                        reason: format!("could not spawn worker {}: {}", id, e),
                    });
                }
            }
        }
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signals shutdown and joins every worker. Idempotent.
    pub fn shutdown(&mut self) {
        self.shutdown.signal();
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_owned();
            if handle.join().is_err() {
                warn!("{} exited with a panic", name);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::region::TileIndex;

    fn expected(alive: bool, n: u32) -> bool {
        if alive {
            n == 2 || n == 3
        } else {
            n == 3
        }
    }

    #[test]
    fn rule_table() {
        for n in 0..=8u8 {
            assert_eq!(next_cell_state(true, n), n == 2 || n == 3, "live cell with {} neighbors", n);
            assert_eq!(next_cell_state(false, n), n == 3, "dead cell with {} neighbors", n);
        }
    }

    #[test]
    fn every_neighborhood_of_a_single_cell() {
        // On a 3x3 torus the eight cells around (1, 1) are exactly its neighbors.
        const RING: [(usize, usize); 8] = [(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)];
        let dirty = DirtyTiles::new(TileIndex::new(3, 3, 3));
        for &center in &[false, true] {
            for mask in 0u32..256 {
                let current = BitGrid::new(3, 3);
                let next = BitGrid::new(3, 3);
                current.set(1, 1, center);
                for (bit, &(x, y)) in RING.iter().enumerate() {
                    if mask & (1 << bit) != 0 {
                        current.set(x, y, true);
                    }
                }
                dirty.reset();
                process_region(Region::new(1, 1, 1, 1), &current, &next, &dirty);
                let want = expected(center, mask.count_ones());
                assert_eq!(next.get(1, 1), want, "center {} mask {:08b}", center, mask);
                assert_eq!(dirty.dirty_count() == 1, want != center);
                // nothing outside the region was written
                assert_eq!(next.population(), want as usize);
            }
        }
    }

    #[test]
    fn process_region_leaves_other_rows_untouched() {
        let current = BitGrid::from_fn(8, 8, |x, y| y == 4 && (3..6).contains(&x));
        let next = BitGrid::new(8, 8);
        next.set(0, 0, true);
        let dirty = DirtyTiles::new(TileIndex::new(8, 8, 4));
        process_region(Region::new(0, 3, 8, 3), &current, &next, &dirty);
        // vertical blinker
        assert!(next.get(4, 3) && next.get(4, 4) && next.get(4, 5));
        assert!(!next.get(3, 4) && !next.get(5, 4));
        // outside the region
        assert!(next.get(0, 0));
        assert_eq!(next.population(), 4);
    }

    #[test]
    #[should_panic]
    fn region_outside_grid_panics() {
        let current = BitGrid::new(4, 4);
        let next = BitGrid::new(4, 4);
        let dirty = DirtyTiles::new(TileIndex::new(4, 4, 2));
        process_region(Region::new(0, 2, 4, 3), &current, &next, &dirty);
    }

    #[test]
    fn idle_policy_from_millis() {
        assert_eq!(IdlePolicy::from_millis(0), IdlePolicy::Spin);
        assert_eq!(IdlePolicy::from_millis(3), IdlePolicy::Wait(Duration::from_millis(3)));
    }

    fn run_pool_once(idle: IdlePolicy) {
        let queue = JobQueue::new();
        let completion = Arc::new(Completion::new(2));
        let dirty = Arc::new(DirtyTiles::new(TileIndex::new(16, 16, 8)));
        let shutdown = ShutdownHandle::new();
        let mut pool = WorkerPool::new(2, &queue, &completion, &dirty, &shutdown, idle).unwrap();
        assert_eq!(pool.len(), 2);

        let current = Arc::new(BitGrid::from_fn(16, 16, |x, y| y == 8 && (7..10).contains(&x)));
        let next = Arc::new(BitGrid::new(16, 16));
        completion.begin();
        for band in 0..2 {
            queue.enqueue(Job {
                region:     Region::new(0, band * 8, 16, 8),
                generation: 1,
                current:    Arc::clone(&current),
                next:       Arc::clone(&next),
            });
        }
        completion.wait();
        assert_eq!(next.population(), 3);
        assert!(next.get(8, 7) && next.get(8, 8) && next.get(8, 9));
        // births at (8, 7) and (8, 9), deaths at (7, 8) and (9, 8)
        assert_eq!(dirty.iter().map(|t| t.index).collect::<Vec<_>>(), vec![1, 2, 3]);

        pool.shutdown();
        assert!(pool.is_empty());
    }

    #[test]
    fn pool_processes_jobs_with_bounded_wait() {
        run_pool_once(IdlePolicy::default());
    }

    #[test]
    fn pool_processes_jobs_while_spinning() {
        run_pool_once(IdlePolicy::Spin);
    }
}
