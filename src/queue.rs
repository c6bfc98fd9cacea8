//! Bounded FIFO queue coordinating one scalar producer with the worker pool.
//!
//! `put` blocks while the queue is full; `get` blocks while it's empty. Once
//! `close()` is called, `put` becomes a no-op (returns `false`) and `get`
//! drains whatever remains before returning `None`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub struct BoundedQueue<T> {
    capacity: usize,
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner { items: VecDeque::new(), closed: false }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Blocks until there is room or the queue is closed. Returns `false`
    /// (without enqueuing) if the queue was already closed.
    pub fn put(&self, item: T) -> bool {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if guard.closed {
                return false;
            }
            if guard.items.len() < self.capacity {
                guard.items.push_back(item);
                self.not_empty.notify_one();
                return true;
            }
            guard = self.not_full.wait(guard).unwrap();
        }
    }

    /// Blocks until an item is available or the queue is closed and drained.
    pub fn get(&self) -> Option<T> {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some(item) = guard.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if guard.closed {
                return None;
            }
            guard = self.not_empty.wait(guard).unwrap();
        }
    }

    /// Signals that no more items will be pushed. Wakes every blocked
    /// producer and consumer.
    pub fn close(&self) {
        {
            let mut guard = self.inner.lock().unwrap();
            guard.closed = true;
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order_preserved() {
        let queue = BoundedQueue::new(4);
        for i in 0..4 {
            assert!(queue.put(i));
        }
        for i in 0..4 {
            assert_eq!(queue.get(), Some(i));
        }
    }

    #[test]
    fn close_drains_then_returns_none() {
        let queue = BoundedQueue::new(4);
        queue.put(1);
        queue.put(2);
        queue.close();
        assert!(!queue.put(3));
        assert_eq!(queue.get(), Some(1));
        assert_eq!(queue.get(), Some(2));
        assert_eq!(queue.get(), None);
    }

    #[test]
    fn producer_consumer_liveness() {
        let queue = Arc::new(BoundedQueue::new(2));
        let producer_queue = Arc::clone(&queue);
        let producer = thread::spawn(move || {
            for i in 0..100 {
                producer_queue.put(i);
            }
            producer_queue.close();
        });

        let mut received = Vec::new();
        while let Some(item) = queue.get() {
            received.push(item);
        }
        producer.join().unwrap();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }
}
