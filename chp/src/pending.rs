//! Handles for channel operations running on their own thread.
//!
//! `offer`, `ready`, `expect` and `valid` start the blocking operation on a
//! dedicated thread and hand back a [`Pending`] the caller resolves later,
//! typically through a [`TimingSet`](crate::timing::TimingSet).

use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};

use crate::error::{SimError, SimResult};

/// The eventual result of an asynchronous channel operation.
#[must_use = "a pending operation reports its deadlock only when resolved"]
pub struct Pending<T> {
    rx: channel::Receiver<SimResult<T>>,
    label: String,
}

impl<T: Send + 'static> Pending<T> {
    /// Runs `op` on a new thread named `label`.
    pub(crate) fn spawn<F>(label: String, op: F) -> Self
    where
        F: FnOnce() -> SimResult<T> + Send + 'static,
    {
        let (tx, rx) = channel::bounded(1);
        let on_error = tx.clone();

        let spawned = thread::Builder::new().name(label.clone()).spawn(move || {
            // The receiving side may have been dropped by a caller that no
            // longer cares about the outcome.
            let _ = tx.send(op());
        });

        if let Err(source) = spawned {
            let _ = on_error.send(Err(SimError::Spawn {
                process: label.clone(),
                source: source.into(),
            }));
        }

        Self { rx, label }
    }
}

impl<T> Pending<T> {
    /// A handle that is already resolved to `value`.
    pub fn resolved(value: T) -> Self {
        let (tx, rx) = channel::bounded(1);
        let _ = tx.send(Ok(value));
        Self {
            rx,
            label: String::new(),
        }
    }

    /// Blocks until the operation completes.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error (usually [`SimError::Deadlock`]), or
    /// [`SimError::Panicked`] if the worker thread died without reporting.
    pub fn wait(self) -> SimResult<T> {
        self.rx.recv().unwrap_or_else(|_| {
            Err(SimError::Panicked {
                process: self.label.clone(),
            })
        })
    }

    /// Blocks for at most `timeout`.
    ///
    /// Returns `Err(self)` if the operation has not finished yet, so the
    /// caller can keep waiting.
    pub fn wait_timeout(self, timeout: Duration) -> Result<SimResult<T>, Self> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(SimError::Panicked {
                process: self.label.clone(),
            })),
        }
    }

    /// Returns `true` once a result is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("label", &self.label)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_handle_yields_value() {
        let p = Pending::resolved(4.5_f64);
        assert!(p.is_ready());
        assert_eq!(p.wait().unwrap(), 4.5);
    }

    #[test]
    fn spawned_operation_reports_error() {
        let p: Pending<f64> = Pending::spawn("test".into(), || Err(SimError::deadlock("X")));
        assert!(p.wait().unwrap_err().is_deadlock());
    }

    #[test]
    fn panicking_worker_is_reported() {
        let p: Pending<f64> = Pending::spawn("boom".into(), || panic!("worker died"));
        match p.wait() {
            Err(SimError::Panicked { process }) => assert_eq!(process, "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wait_timeout_returns_handle_when_unfinished() {
        let (gate_tx, gate_rx) = channel::bounded::<()>(0);
        let p = Pending::spawn("slow".into(), move || {
            let _ = gate_rx.recv();
            Ok(1_u32)
        });
        let p = p.wait_timeout(Duration::from_millis(10)).unwrap_err();
        gate_tx.send(()).unwrap();
        assert_eq!(p.wait().unwrap(), 1);
    }
}
