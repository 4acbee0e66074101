use std::io;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::monitor::Channel;
use super::waveform::{FileWaveform, WaveformLog};
use super::Payload;
use crate::context::{Node, Port, Process};
use crate::error::{Misconfigured, SimResult};
use crate::pending::Pending;
use crate::trace::debug;

struct Inner<T> {
    chan: Arc<Channel<T>>,
    node: RwLock<Option<Arc<Node>>>,
    log: Mutex<Option<Box<dyn WaveformLog<T>>>>,
}

/// Sending endpoint of a timed channel.
///
/// Times passed in and returned are relative to the clock of the process the
/// endpoint is bound to.
pub struct Sender<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("channel", &self.inner.chan.name())
            .finish_non_exhaustive()
    }
}

impl<T: Payload> Sender<T> {
    pub(crate) fn new(chan: Arc<Channel<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                chan,
                node: RwLock::new(None),
                log: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.chan.name()
    }

    /// Buffer capacity (`slack + 1`).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.chan.capacity()
    }

    /// `true` once this side has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.chan.is_send_closed()
    }

    /// Replaces the waveform log for this endpoint.
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

    /// Sends `value` at the process's current time.
    ///
    /// # Errors
    ///
    /// See [`Sender::send_at`].
    pub fn send(&self, value: T) -> SimResult<f64> {
        self.send_at(value, 0.0)
    }

    /// Sends `value` starting `offset` after the process's current time.
    ///
    /// Blocks until the token fits in the buffer and the buffer has room
    /// again, which for a zero-slack channel means until it was received.
    /// Returns the settled time of the token.
    ///
    /// # Errors
    ///
    /// [`SimError::Deadlock`](crate::SimError::Deadlock) if the receiving
    /// side is closed while this call waits, or this side is closed;
    /// [`Misconfigured::Unbound`] before the endpoint is bound.
    pub fn send_at(&self, value: T, offset: f64) -> SimResult<f64> {
        let node = self.node()?;
        let start = node.now() + offset;

        if node.debug() {
            debug!(process = node.name(), time = start, "{}!{:?}", self.name(), value);
        }

        let copy = self.inner.log.lock().is_some().then(|| value.clone());
        let t = self.inner.chan.begin_send()?.commit(value, start)?;

        if let Some(value) = copy
            && let Some(log) = self.inner.log.lock().as_mut()
        {
            log.write(&value, t);
        }

        if node.debug() {
            debug!(process = node.name(), time = t, "{} settled", self.name());
        }

        Ok(t - node.now())
    }

    /// Starts [`Sender::send`] on its own thread.
    pub fn offer(&self, value: T) -> Pending<f64> {
        self.offer_at(value, 0.0)
    }

    /// Starts [`Sender::send_at`] on its own thread.
    pub fn offer_at(&self, value: T, offset: f64) -> Pending<f64> {
        let this = self.clone();
        Pending::spawn(format!("{}!", self.name()), move || {
            this.send_at(value, offset)
        })
    }

    /// Waits for room at the process's current time.
    ///
    /// # Errors
    ///
    /// See [`Sender::wait_at`].
    pub fn wait(&self) -> SimResult<f64> {
        self.wait_at(0.0)
    }

    /// Blocks until the buffer has room and returns the time at which a token
    /// starting `offset` after the current time could be accepted, without
    /// sending anything.
    ///
    /// # Errors
    ///
    /// Same deadlock and binding rules as [`Sender::send_at`].
    pub fn wait_at(&self, offset: f64) -> SimResult<f64> {
        let node = self.node()?;
        let start = node.now() + offset;

        if node.debug() {
            debug!(process = node.name(), time = start, "#{}!", self.name());
        }

        let t = self.inner.chan.begin_send()?.wait(start)?;
        Ok(t - node.now())
    }

    /// Starts [`Sender::wait`] on its own thread.
    pub fn ready(&self) -> Pending<f64> {
        self.ready_at(0.0)
    }

    /// Starts [`Sender::wait_at`] on its own thread.
    pub fn ready_at(&self, offset: f64) -> Pending<f64> {
        let this = self.clone();
        Pending::spawn(format!("#{}!", self.name()), move || this.wait_at(offset))
    }

    /// Permanently closes the sending side.
    ///
    /// Every party blocked on the channel wakes and re-evaluates; a receiver
    /// drains what is buffered and then deadlocks. Repeated calls are
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns the error raised while flushing the waveform log. The channel
    /// side is closed regardless.
    pub fn close(&self) -> io::Result<()> {
        self.inner.chan.close_send();
        match self.inner.log.lock().take() {
            Some(mut log) => log.close(),
            None => Ok(()),
        }
    }
}

impl<T: Payload> Port for Sender<T> {
    fn channel(&self) -> &str {
        self.name()
    }

    fn bind(&self, process: &Process) {
        let node = process.node();
        if let Some(path) = node.waveform_path(self.name(), "s") {
            self.attach_log(Box::new(FileWaveform::<T>::new(path)));
        }
        *self.inner.node.write() = Some(Arc::clone(node));
    }

    fn close(&self) -> io::Result<()> {
        Sender::close(self)
    }
}
