use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::Payload;
use super::monitor::Channel;
use super::waveform::{FileWaveform, WaveformLog};
use crate::context::{Node, Port, Process};
use crate::error::{Misconfigured, SimResult};
use crate::pending::Pending;
use crate::trace::debug;

struct Inner<T> {
    chan: Arc<Channel<T>>,
    node: RwLock<Option<Arc<Node>>>,
    log: Mutex<Option<Box<dyn WaveformLog<T>>>>,
    /// The front token was already written to the log by a probe.
    logged: AtomicBool,
}

/// Receiving endpoint of a timed channel.
pub struct Receiver<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("channel", &self.inner.chan.name())
            .finish_non_exhaustive()
    }
}

impl<T: Payload> Receiver<T> {
    pub(crate) fn new(chan: Arc<Channel<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                chan,
                node: RwLock::new(None),
                log: Mutex::new(None),
                logged: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.chan.name()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.chan.capacity()
    }

    /// Tokens currently buffered and not yet received.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.inner.chan.buffered()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.chan.is_recv_closed()
    }

    pub fn attach_log(&self, log: Box<dyn WaveformLog<T>>) {
        *self.inner.log.lock() = Some(log);
    }

    fn node(&self) -> SimResult<Arc<Node>> {
        self.inner.node.read().clone().ok_or_else(|| {
            Misconfigured::Unbound {
                channel: self.name().to_owned(),
            }
            .into()
        })
    }

    /// Logs the front token once, however many times it is probed before
    /// being received.
    fn log(&self, value: &T, time: f64, consumed: bool) {
        let already = if consumed {
            self.inner.logged.swap(false, Ordering::AcqRel)
        } else {
            self.inner.logged.swap(true, Ordering::AcqRel)
        };
        if !already && let Some(log) = self.inner.log.lock().as_mut() {
            log.write(value, time);
        }
    }

    /// Receives at the process's current time.
    ///
    /// # Errors
    ///
    /// See [`Receiver::recv_at`].
    pub fn recv(&self) -> SimResult<(T, f64)> {
        self.recv_at(0.0)
    }

    /// Receives the front token, no earlier than `offset` after the current
    /// time.
    ///
    /// Returns the value and its settled time relative to the process clock.
    ///
    /// # Errors
    ///
    /// [`SimError::Deadlock`](crate::SimError::Deadlock) once the sending
    /// side is closed and the buffer is drained, or if this side is closed;
    /// [`Misconfigured::Unbound`] before the endpoint is bound.
    pub fn recv_at(&self, offset: f64) -> SimResult<(T, f64)> {
        let node = self.node()?;
        let start = node.now() + offset;

        if node.debug() {
            debug!(process = node.name(), time = start, "{}?", self.name());
        }

        let (value, t) = self.inner.chan.begin_recv()?.consume(start)?;
        self.log(&value, t, true);

        if node.debug() {
            debug!(process = node.name(), time = t, "{}?{:?}", self.name(), value);
        }

        Ok((value, t - node.now()))
    }

    /// Reads the front token without consuming it.
    ///
    /// # Errors
    ///
    /// See [`Receiver::probe_at`].
    pub fn probe(&self) -> SimResult<(T, f64)> {
        self.probe_at(0.0)
    }

    /// Blocks until a token is available and returns a copy of it, leaving it
    /// buffered for the next receive.
    ///
    /// # Errors
    ///
    /// Same deadlock and binding rules as [`Receiver::recv_at`].
    pub fn probe_at(&self, offset: f64) -> SimResult<(T, f64)> {
        let node = self.node()?;
        let start = node.now() + offset;

        if node.debug() {
            debug!(process = node.name(), time = start, "#{}?", self.name());
        }

        let (value, t) = self.inner.chan.begin_recv()?.peek(start)?;
        self.log(&value, t, false);
        Ok((value, t - node.now()))
    }

    /// Starts [`Receiver::recv`] on its own thread.
    pub fn expect(&self) -> Pending<(T, f64)> {
        self.expect_at(0.0)
    }

    /// Starts [`Receiver::recv_at`] on its own thread.
    pub fn expect_at(&self, offset: f64) -> Pending<(T, f64)> {
        let this = self.clone();
        Pending::spawn(format!("{}?", self.name()), move || this.recv_at(offset))
    }

    /// Starts [`Receiver::probe`] on its own thread.
    pub fn valid(&self) -> Pending<(T, f64)> {
        self.valid_at(0.0)
    }

    /// Starts [`Receiver::probe_at`] on its own thread.
    pub fn valid_at(&self, offset: f64) -> Pending<(T, f64)> {
        let this = self.clone();
        Pending::spawn(format!("#{}?", self.name()), move || this.probe_at(offset))
    }

    /// Permanently closes the receiving side and flushes the waveform log.
    ///
    /// # Errors
    ///
    /// Returns the error raised while flushing the log; the side is closed
    /// regardless.
    pub fn close(&self) -> io::Result<()> {
        self.inner.chan.close_recv();
        match self.inner.log.lock().take() {
            Some(mut log) => log.close(),
            None => Ok(()),
        }
    }
}

impl<T: Payload> Port for Receiver<T> {
    fn channel(&self) -> &str {
        self.name()
    }

    fn bind(&self, process: &Process) {
        let node = process.node();
        if let Some(path) = node.waveform_path(self.name(), "r") {
            self.attach_log(Box::new(FileWaveform::<T>::new(path)));
        }
        *self.inner.node.write() = Some(Arc::clone(node));
    }

    fn close(&self) -> io::Result<()> {
        Receiver::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Process, SimConfig, chan};

    #[derive(Default)]
    struct Recorder(Arc<parking_lot::Mutex<Vec<(i64, f64)>>>);

    impl WaveformLog<i64> for Recorder {
        fn write(&mut self, value: &i64, time: f64) {
            self.0.lock().push((*value, time));
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn probed_token_is_logged_once() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (tx, rx) = chan::<i64>("", 2);
        top.init((&tx, &rx));

        let rows = Arc::new(parking_lot::Mutex::new(Vec::new()));
        rx.attach_log(Box::new(Recorder(Arc::clone(&rows))));

        tx.send_at(4, 1.0).unwrap();
        tx.send_at(5, 2.0).unwrap();

        assert_eq!(rx.probe().unwrap(), (4, 1.0));
        assert_eq!(rx.probe().unwrap(), (4, 1.0));
        assert_eq!(rx.recv().unwrap(), (4, 1.0));
        assert_eq!(rx.recv().unwrap(), (5, 2.0));

        assert_eq!(*rows.lock(), [(4, 1.0), (5, 2.0)]);
        top.done().unwrap();
    }

    #[test]
    fn expect_resolves_after_send() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (tx, rx) = chan::<i64>("", 0);
        top.init((&tx, &rx));

        let pending = rx.expect_at(3.0);
        tx.send_at(8, 1.0).unwrap();
        assert_eq!(pending.wait().unwrap(), (8, 3.0));
        top.done().unwrap();
    }

    #[test]
    fn valid_leaves_token_buffered() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (tx, rx) = chan::<i64>("", 1);
        top.init((&tx, &rx));

        tx.send(1).unwrap();
        assert_eq!(rx.valid().wait().unwrap().0, 1);
        assert_eq!(rx.buffered(), 1);
        assert_eq!(rx.recv().unwrap().0, 1);
        top.done().unwrap();
    }
}
