use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Shared queue of map inputs. Each input is handed out exactly once.
#[derive(Debug)]
pub struct WorkQueue {
    inputs: Vec<String>,
    next: AtomicUsize,
    closed: AtomicBool,
}

impl WorkQueue {
    pub fn new(inputs: Vec<String>) -> Self {
        Self { inputs, next: AtomicUsize::new(0), closed: AtomicBool::new(false) }
    }

    /// Next unconsumed input with its index, or `None` once drained or closed.
    pub fn take_next(&self) -> Option<(usize, &str)> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        self.inputs.get(idx).map(|s| (idx, s.as_str()))
    }

    /// Stops handing out inputs; used to wind down after a failure.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
