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

//! Unbounded multi-producer/multi-consumer job queue.
//!
//! Every enqueued item is handed to exactly one dequeuer. Enqueuing happens-before the matching
//! dequeue returns, so anything the producer wrote before `enqueue` is visible to the consumer.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

pub struct JobQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        JobQueue {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        JobQueue::new()
    }
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        JobQueue { tx, rx }
    }

    /// Always succeeds; the queue has no capacity limit and holds its own receiver, so it can't
    /// be disconnected while `self` is alive.
    pub fn enqueue(&self, item: T) {
        if self.tx.send(item).is_err() {
            unreachable!("job queue receiver dropped while sender alive");
        }
    }

    /// Returns immediately: `None` if nothing is queued right now.
    pub fn try_dequeue(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Waits at most `timeout` for an item.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn try_dequeue_on_empty_queue_returns_none() {
        let q: JobQueue<u32> = JobQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.try_dequeue(), None);
    }

    #[test]
    fn items_come_out_in_fifo_order_for_single_consumer() {
        let q = JobQueue::new();
        for i in 0..5 {
            q.enqueue(i);
        }
        assert_eq!(q.len(), 5);
        let out: Vec<_> = (0..5).filter_map(|_| q.try_dequeue()).collect();
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn dequeue_timeout_expires() {
        let q: JobQueue<u8> = JobQueue::new();
        assert_eq!(q.dequeue_timeout(Duration::from_millis(5)), None);
    }

    #[test]
    fn each_item_dequeued_exactly_once_across_consumers() {
        const ITEMS: usize = 10_000;
        let q = JobQueue::new();
        for i in 0..ITEMS {
            q.enqueue(i);
        }
        let seen = Arc::new(Mutex::new(Vec::with_capacity(ITEMS)));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let q = q.clone();
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    let mut mine = vec![];
                    while let Some(item) = q.dequeue_timeout(Duration::from_millis(50)) {
                        mine.push(item);
                    }
                    seen.lock().unwrap().extend(mine);
                })
            })
            .collect();

        for c in consumers {
            c.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), ITEMS);
        let unique: HashSet<_> = seen.iter().cloned().collect();
        assert_eq!(unique.len(), ITEMS);
    }
}
