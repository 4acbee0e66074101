//! Running statistics over branch completion times.

use parking_lot::Mutex;

use crate::error::SimResult;
use crate::pending::Pending;

/// Which statistic a [`TimingSet`] accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Min,
    Max,
    Avg,
}

#[derive(Debug, Default)]
struct State {
    /// Running min/max, or the running sum for `Avg`.
    value: f64,
    count: usize,
    pending: Vec<Pending<f64>>,
}

impl State {
    fn add(&mut self, op: Statistic, sample: f64) {
        if self.count == 0 {
            self.value = sample;
        } else {
            match op {
                Statistic::Min => self.value = self.value.min(sample),
                Statistic::Max => self.value = self.value.max(sample),
                Statistic::Avg => self.value += sample,
            }
        }
        self.count += 1;
    }
}

/// Accumulates one statistic over samples added from any number of threads.
///
/// The first sample seeds the statistic, so a set holding only negative
/// offsets reports them rather than a spurious zero. Samples may also be
/// [`Pending`] results of asynchronous sends; those are folded in by
/// [`TimingSet::get`].
///
/// ```
/// use chp::timing::TimingSet;
///
/// let t = TimingSet::max_of([3.0, 1.0, 4.0]);
/// t.add(-2.0);
/// assert_eq!(t.get().unwrap(), 4.0);
/// ```
#[derive(Debug)]
pub struct TimingSet {
    op: Statistic,
    state: Mutex<State>,
}

impl TimingSet {
    #[must_use]
    pub fn new(op: Statistic) -> Self {
        Self {
            op,
            state: Mutex::new(State::default()),
        }
    }

    #[must_use]
    pub fn min() -> Self {
        Self::new(Statistic::Min)
    }

    #[must_use]
    pub fn max() -> Self {
        Self::new(Statistic::Max)
    }

    #[must_use]
    pub fn avg() -> Self {
        Self::new(Statistic::Avg)
    }

    #[must_use]
    pub fn min_of(samples: impl IntoIterator<Item = f64>) -> Self {
        Self::with_samples(Statistic::Min, samples)
    }

    #[must_use]
    pub fn max_of(samples: impl IntoIterator<Item = f64>) -> Self {
        Self::with_samples(Statistic::Max, samples)
    }

    #[must_use]
    pub fn avg_of(samples: impl IntoIterator<Item = f64>) -> Self {
        Self::with_samples(Statistic::Avg, samples)
    }

    fn with_samples(op: Statistic, samples: impl IntoIterator<Item = f64>) -> Self {
        let set = Self::new(op);
        for sample in samples {
            set.add(sample);
        }
        set
    }

    /// The statistic this set accumulates.
    #[must_use]
    pub const fn statistic(&self) -> Statistic {
        self.op
    }

    pub fn add(&self, sample: f64) {
        self.state.lock().add(self.op, sample);
    }

    /// Queues the result of an asynchronous operation for the next `get`.
    pub fn add_pending(&self, pending: Pending<f64>) {
        self.state.lock().pending.push(pending);
    }

    /// Number of resolved samples folded in so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.lock().count
    }

    /// Resolves queued pending samples and returns the statistic.
    ///
    /// An empty set reports `0.0`.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by a pending sample, typically a
    /// [`SimError::Deadlock`](crate::SimError::Deadlock). Remaining pending
    /// samples are abandoned.
    pub fn get(&self) -> SimResult<f64> {
        // Resolve outside the lock so concurrent `add` calls never wait on a
        // blocked branch.
        let pending = std::mem::take(&mut self.state.lock().pending);
        for p in pending {
            let sample = p.wait()?;
            self.add(sample);
        }

        let state = self.state.lock();
        Ok(match (self.op, state.count) {
            (_, 0) => 0.0,
            (Statistic::Avg, n) => state.value / n as f64,
            _ => state.value,
        })
    }
}
