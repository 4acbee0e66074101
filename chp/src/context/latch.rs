//! Child-completion latch.

use parking_lot::{Condvar, Mutex};

/// Counts outstanding children; `wait` blocks until the count reaches zero.
#[derive(Debug, Default)]
pub(crate) struct Latch {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Latch {
    pub(crate) fn add(&self) {
        *self.count.lock() += 1;
    }

    pub(crate) fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.cond.notify_all();
        }
    }

    pub(crate) fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.cond.wait(&mut count);
        }
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> usize {
        *self.count.lock()
    }
}
