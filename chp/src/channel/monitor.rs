//! The shared monitor behind a timed rendezvous channel.
//!
//! Every blocking operation is a two-phase span: `begin_*` waits on the
//! monitor until the buffer allows progress, the returned span finishes the
//! operation with one of its `end_*`-style methods. A per-direction
//! exclusivity lock is held for the whole span and is always taken before
//! the monitor, so concurrent senders (or receivers) never interleave inside
//! a span and the monitor itself only ever sees one writer and one reader.
//!
//! # Buffer invariants
//!
//! - capacity is `slack + 1`
//! - `full  <=> read == write && ready`
//! - `empty <=> read == write && !ready`
//! - the closed flags never clear
//! - an unread slot's time never drops below the time of the last receive

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{SimError, SimResult};

struct Slot<T> {
    value: Option<T>,
    time: f64,
}

struct State<T> {
    buffer: Vec<Slot<T>>,
    read: usize,
    write: usize,
    /// Disambiguates full from empty when the cursors meet.
    ready: bool,
    /// Receive time recorded the last time a full buffer was drained.
    ready_time: f64,
    send_closed: bool,
    recv_closed: bool,
}

impl<T> State<T> {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: (0..capacity)
                .map(|_| Slot {
                    value: None,
                    time: 0.0,
                })
                .collect(),
            read: 0,
            write: 0,
            ready: false,
            ready_time: 0.0,
            send_closed: false,
            recv_closed: false,
        }
    }

    fn full(&self) -> bool {
        self.read == self.write && self.ready
    }

    fn empty(&self) -> bool {
        self.read == self.write && !self.ready
    }

    fn send_dead(&self) -> bool {
        (self.full() && self.recv_closed) || self.send_closed
    }

    fn recv_dead(&self) -> bool {
        (self.empty() && self.send_closed) || self.recv_closed
    }

    fn len(&self) -> usize {
        if self.full() {
            self.buffer.len()
        } else {
            (self.write + self.buffer.len() - self.read) % self.buffer.len()
        }
    }

    fn inc_write(&mut self) -> usize {
        let i = self.write;
        self.write = (self.write + 1) % self.buffer.len();
        self.ready = true;
        i
    }

    fn inc_read(&mut self, t: f64) {
        if self.full() {
            self.ready_time = t;
        }

        self.read = (self.read + 1) % self.buffer.len();
        self.ready = false;

        let mut i = self.read;
        while i != self.write {
            let slot = &mut self.buffer[i];
            if t > slot.time {
                slot.time = t;
            }
            i = (i + 1) % self.buffer.len();
        }
    }
}

/// Monitor state shared by both endpoints of one channel.
pub(crate) struct Channel<T> {
    name: String,
    state: Mutex<State<T>>,
    cond: Condvar,
    send_excl: Mutex<()>,
    recv_excl: Mutex<()>,
}

impl<T> Channel<T> {
    pub(crate) fn new(name: String, slack: usize) -> Self {
        Self {
            name,
            state: Mutex::new(State::new(slack + 1)),
            cond: Condvar::new(),
            send_excl: Mutex::new(()),
            recv_excl: Mutex::new(()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn capacity(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Number of tokens written but not yet received.
    pub(crate) fn buffered(&self) -> usize {
        self.state.lock().len()
    }

    fn deadlock(&self) -> SimError {
        SimError::deadlock(&self.name)
    }

    /// Blocks until a slot is free.
    pub(crate) fn begin_send(&self) -> SimResult<SendSpan<'_, T>> {
        let excl = self.send_excl.lock();
        let mut state = self.state.lock();

        if state.send_closed {
            return Err(self.deadlock());
        }
        while state.full() {
            if state.send_dead() {
                self.cond.notify_all();
                return Err(self.deadlock());
            }
            self.cond.wait(&mut state);
        }

        Ok(SendSpan {
            chan: self,
            _excl: excl,
        })
    }

    /// Blocks until a token is available.
    pub(crate) fn begin_recv(&self) -> SimResult<RecvSpan<'_, T>> {
        let excl = self.recv_excl.lock();
        let mut state = self.state.lock();

        while state.empty() || state.recv_closed {
            if state.recv_dead() {
                self.cond.notify_all();
                return Err(self.deadlock());
            }
            self.cond.wait(&mut state);
        }

        Ok(RecvSpan {
            chan: self,
            _excl: excl,
        })
    }

    pub(crate) fn close_send(&self) {
        self.state.lock().send_closed = true;
        self.cond.notify_all();
    }

    pub(crate) fn close_recv(&self) {
        self.state.lock().recv_closed = true;
        self.cond.notify_all();
    }

    pub(crate) fn is_send_closed(&self) -> bool {
        self.state.lock().send_closed
    }

    pub(crate) fn is_recv_closed(&self) -> bool {
        self.state.lock().recv_closed
    }
}

/// An in-flight send holding the send-direction lock.
pub(crate) struct SendSpan<'a, T> {
    chan: &'a Channel<T>,
    _excl: MutexGuard<'a, ()>,
}

impl<T> SendSpan<'_, T> {
    /// Writes the token and waits until the buffer has room again.
    ///
    /// Returns the settled time of the token: its start time, raised to the
    /// downstream floor if a receiver drained a full buffer later than that.
    pub(crate) fn commit(self, value: T, start: f64) -> SimResult<f64> {
        let chan = self.chan;
        let mut state = chan.state.lock();

        let i = state.write;
        state.buffer[i] = Slot {
            value: Some(value),
            time: start,
        };
        state.inc_write();
        chan.cond.notify_all();

        while state.full() {
            if state.send_dead() {
                return Err(chan.deadlock());
            }
            chan.cond.wait(&mut state);
        }

        let ready_time = state.ready_time;
        let slot = &mut state.buffer[i];
        if ready_time > slot.time {
            slot.time = ready_time;
        }
        Ok(slot.time)
    }

    /// Finishes without writing: the time a token starting at `start` could
    /// be accepted.
    pub(crate) fn wait(self, start: f64) -> SimResult<f64> {
        let chan = self.chan;
        let state = chan.state.lock();

        let t = start.max(state.ready_time);
        chan.cond.notify_all();
        if state.send_dead() {
            return Err(chan.deadlock());
        }
        Ok(t)
    }
}

/// An in-flight receive holding the receive-direction lock.
pub(crate) struct RecvSpan<'a, T> {
    chan: &'a Channel<T>,
    _excl: MutexGuard<'a, ()>,
}

impl<T: Clone> RecvSpan<'_, T> {
    /// Takes the front token, floored to `start`, and advances the cursor.
    pub(crate) fn consume(self, start: f64) -> SimResult<(T, f64)> {
        let chan = self.chan;
        let mut state = chan.state.lock();

        if state.recv_dead() {
            chan.cond.notify_all();
            return Err(chan.deadlock());
        }

        let read = state.read;
        let slot = &mut state.buffer[read];
        let time = start.max(slot.time);
        // Never empty while the cursor invariants hold.
        let value = slot.value.take().ok_or_else(|| chan.deadlock())?;

        state.inc_read(time);
        chan.cond.notify_all();
        Ok((value, time))
    }

    /// Copies the front token, floored to `start`, leaving it buffered.
    pub(crate) fn peek(self, start: f64) -> SimResult<(T, f64)> {
        let chan = self.chan;
        let state = chan.state.lock();

        chan.cond.notify_all();
        if state.recv_dead() {
            return Err(chan.deadlock());
        }

        let slot = &state.buffer[state.read];
        let value = slot.value.clone().ok_or_else(|| chan.deadlock())?;
        Ok((value, start.max(slot.time)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn send<T>(c: &Channel<T>, value: T, t: f64) -> SimResult<f64> {
        c.begin_send()?.commit(value, t)
    }

    fn recv<T: Clone>(c: &Channel<T>, t: f64) -> SimResult<(T, f64)> {
        c.begin_recv()?.consume(t)
    }

    #[test]
    fn full_and_empty_with_slack() {
        let c = Channel::new("L".into(), 2);
        assert_eq!(c.capacity(), 3);
        assert_eq!(c.buffered(), 0);

        send(&c, 1, 0.0).unwrap();
        send(&c, 2, 0.0).unwrap();
        assert_eq!(c.buffered(), 2);

        assert_eq!(recv(&c, 0.0).unwrap(), (1, 0.0));
        assert_eq!(recv(&c, 0.0).unwrap(), (2, 0.0));
        assert_eq!(c.buffered(), 0);
    }

    #[test]
    fn receive_floors_unread_slots() {
        let c = Channel::new("L".into(), 3);
        send(&c, 'a', 1.0).unwrap();
        send(&c, 'b', 2.0).unwrap();
        send(&c, 'c', 9.0).unwrap();

        // A late receive pushes everything behind it to at least 5.0.
        assert_eq!(recv(&c, 5.0).unwrap(), ('a', 5.0));
        assert_eq!(recv(&c, 0.0).unwrap(), ('b', 5.0));
        assert_eq!(recv(&c, 0.0).unwrap(), ('c', 9.0));
    }

    #[test]
    fn peek_does_not_consume() {
        let c = Channel::new("L".into(), 1);
        send(&c, 7, 3.0).unwrap();

        assert_eq!(c.begin_recv().unwrap().peek(1.0).unwrap(), (7, 3.0));
        assert_eq!(c.begin_recv().unwrap().peek(4.0).unwrap(), (7, 4.0));
        assert_eq!(c.buffered(), 1);
        assert_eq!(recv(&c, 0.0).unwrap(), (7, 3.0));
    }

    #[test]
    fn rendezvous_send_settles_at_receive_time() {
        let c = Arc::new(Channel::new("L".into(), 0));

        let rx = Arc::clone(&c);
        let receiver = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            recv(&rx, 10.0).unwrap()
        });

        // The sender cannot finish before the receiver drains the slot, and
        // then observes the receive time as its settle time.
        assert_eq!(send(&c, 42, 2.0).unwrap(), 10.0);
        assert_eq!(receiver.join().unwrap(), (42, 10.0));
    }

    #[test]
    fn wait_reports_floor_without_writing() {
        let c = Channel::<u8>::new("L".into(), 0);
        assert_eq!(c.begin_send().unwrap().wait(3.0).unwrap(), 3.0);
        assert_eq!(c.buffered(), 0);
    }

    #[test]
    fn recv_on_closed_sender_deadlocks_once_drained() {
        let c = Channel::new("L".into(), 1);
        send(&c, 1, 0.0).unwrap();
        c.close_send();

        assert_eq!(recv(&c, 0.0).unwrap().0, 1);
        assert!(recv(&c, 0.0).unwrap_err().is_deadlock());
    }

    #[test]
    fn send_into_closed_receiver_fills_then_deadlocks() {
        let c = Channel::new("L".into(), 1);
        c.close_recv();

        // One slot of slack can still be written, the write that fills the
        // buffer can never settle.
        assert!(send(&c, 1, 0.0).is_ok());
        assert!(send(&c, 2, 0.0).unwrap_err().is_deadlock());
        assert!(send(&c, 3, 0.0).unwrap_err().is_deadlock());
    }

    #[test]
    fn close_wakes_blocked_receiver() {
        let c = Arc::new(Channel::<u8>::new("L".into(), 0));
        let (done_tx, done_rx) = mpsc::channel();

        let rx = Arc::clone(&c);
        thread::spawn(move || {
            done_tx.send(recv(&rx, 0.0)).unwrap();
        });

        thread::sleep(Duration::from_millis(10));
        c.close_send();

        let result = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(result.unwrap_err().is_deadlock());
    }

    #[test]
    fn close_wakes_blocked_sender() {
        let c = Arc::new(Channel::<u8>::new("L".into(), 0));
        let (done_tx, done_rx) = mpsc::channel();

        let tx = Arc::clone(&c);
        thread::spawn(move || {
            done_tx.send(send(&tx, 1, 0.0)).unwrap();
        });

        thread::sleep(Duration::from_millis(10));
        c.close_recv();

        let result = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(result.unwrap_err().is_deadlock());
        assert!(c.is_recv_closed());
        assert!(!c.is_send_closed());
    }

    #[test]
    fn concurrent_senders_do_not_interleave() {
        let c = Arc::new(Channel::new("L".into(), 0));
        let senders: Vec<_> = (0..4)
            .map(|s| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    for j in 0..50 {
                        send(&c, s * 100 + j, 0.0).unwrap();
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        for _ in 0..200 {
            seen.push(recv(&c, 0.0).unwrap().0);
        }
        for h in senders {
            h.join().unwrap();
        }

        // Per-sender FIFO survives the interleaving across senders.
        for s in 0..4 {
            let mine: Vec<_> = seen.iter().filter(|v| **v / 100 == s).copied().collect();
            let expected: Vec<_> = (0..50).map(|j| s * 100 + j).collect();
            assert_eq!(mine, expected);
        }
    }
}
