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

//! Step completion and shutdown signalling between the coordinator and the workers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Counts how many of the `target` work items of the current step have finished.
///
/// Outside a step the counter rests at `target` ("settled"). `begin` drops it to zero, each
/// worker `report`s once, and the report that brings it back to `target` wakes the coordinator.
/// Counter accesses are `SeqCst` because workers pair them with the shutdown flag (see
/// `WorkerPool`).
pub struct Completion {
    done:   AtomicUsize,
    target: usize,
    lock:   Mutex<()>,
    cvar:   Condvar,
}

impl Completion {
    pub fn new(target: usize) -> Self {
        assert!(target != 0);
        Completion {
            done: AtomicUsize::new(target),
            target,
            lock: Mutex::new(()),
            cvar: Condvar::new(),
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Number of reports received since the last `begin`.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Starts a step: resets the counter to zero.
    ///
    /// # Panics
    ///
    /// Panics if the previous step has not settled.
    pub fn begin(&self) {
        let prev = self.done.swap(0, Ordering::SeqCst);
        assert_eq!(prev, self.target, "step started while {} of {} work items were outstanding", self.target - prev, self.target);
    }

    /// Abandons a step that was begun but never published.
    pub fn cancel(&self) {
        self.done.store(self.target, Ordering::SeqCst);
        self.notify();
    }

    /// Records one finished work item. Returns true if this was the last one.
    pub fn report(&self) -> bool {
        let now = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(now <= self.target, "more completions ({}) than work items ({})", now, self.target);
        if now == self.target {
            self.notify();
            true
        } else {
            false
        }
    }

    pub fn is_settled(&self) -> bool {
        self.done.load(Ordering::SeqCst) == self.target
    }

    /// Blocks until every work item of the current step has reported.
    pub fn wait(&self) {
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        while !self.is_settled() {
            guard = self.cvar.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
    }

    // Taking the lock before notifying closes the gap between a waiter's check and its sleep.
    fn notify(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.cvar.notify_all();
    }
}

/// Cloneable handle to the process-wide running flag of one engine.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        ShutdownHandle {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Asks the engine to stop. Steps already in flight still run to completion.
    pub fn signal(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        ShutdownHandle::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_settled() {
        let c = Completion::new(3);
        assert!(c.is_settled());
        c.wait();
    }

    #[test]
    fn last_report_settles() {
        let c = Completion::new(3);
        c.begin();
        assert!(!c.is_settled());
        assert!(!c.report());
        assert!(!c.report());
        assert!(c.report());
        assert!(c.is_settled());
        assert_eq!(c.done(), 3);
    }

    #[test]
    fn wait_returns_after_reports_from_other_threads() {
        let c = Arc::new(Completion::new(4));
        c.begin();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5 * i));
                    c.report();
                })
            })
            .collect();
        c.wait();
        assert!(c.is_settled());
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn cancel_settles_without_reports() {
        let c = Completion::new(2);
        c.begin();
        c.cancel();
        assert!(c.is_settled());
        c.begin();
    }

    #[test]
    #[should_panic]
    fn begin_twice_panics() {
        let c = Completion::new(2);
        c.begin();
        c.begin();
    }

    #[test]
    #[should_panic]
    fn extra_report_panics() {
        let c = Completion::new(1);
        c.begin();
        c.report();
        c.report();
    }

    #[test]
    fn shutdown_handle_is_shared() {
        let a = ShutdownHandle::new();
        let b = a.clone();
        assert!(b.is_running());
        a.signal();
        assert!(!b.is_running());
    }
}
