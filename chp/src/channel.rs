//! Timed rendezvous channels.
//!
//! A channel couples a CSP-style handshake with a slack buffer of
//! time-stamped tokens. [`chan`] returns a [`Sender`]/[`Receiver`] pair; both
//! are cheap handles that may be cloned and used from several threads, and
//! both must be bound to a process with [`Process::init`] before use so they
//! know which logical clock their times are relative to.
//!
//! # Example
//!
//! ```
//! use chp::{Process, SimConfig, chan};
//!
//! let top = Process::root(SimConfig::default()).unwrap();
//! let (tx, rx) = chan::<i64>("L", 0);
//!
//! top.go("src", move |g| {
//!     g.init(&tx);
//!     g.run(|_| {
//!         tx.send(7)?;
//!         Ok(())
//!     })
//! })
//! .unwrap();
//!
//! top.go("sink", move |g| {
//!     g.init(&rx);
//!     g.run(|_| {
//!         let (v, _t) = rx.recv()?;
//!         assert_eq!(v, 7);
//!         Ok(())
//!     })
//! })
//! .unwrap();
//!
//! top.done().unwrap();
//! ```
//!
//! [`Process::init`]: crate::Process::init

mod monitor;
mod receiver;
mod sender;
mod waveform;

use std::fmt::Debug;
use std::sync::Arc;

use crate::describe::Describe;

pub use receiver::Receiver;
pub use sender::Sender;
pub use waveform::{FileWaveform, WaveformLog};

use self::monitor::Channel;

/// Types that can travel over a channel.
///
/// `Debug` feeds waveform rows and debug traces, [`Describe`] the waveform
/// header.
pub trait Payload: Clone + Send + Debug + Describe + 'static {}

impl<T: Clone + Send + Debug + Describe + 'static> Payload for T {}

/// Creates a channel with `slack` tokens of buffering beyond the handshake.
///
/// `slack == 0` is a strict rendezvous. An empty `name` disables waveform
/// logging for the channel.
#[must_use]
pub fn chan<T: Payload>(name: impl Into<String>, slack: usize) -> (Sender<T>, Receiver<T>) {
    let chan = Arc::new(Channel::new(name.into(), slack));
    (Sender::new(Arc::clone(&chan)), Receiver::new(chan))
}

/// Creates `n` independent channels named `name.0` .. `name.{n-1}`.
#[must_use]
pub fn chan_arr<T: Payload>(
    name: impl Into<String>,
    n: usize,
    slack: usize,
) -> (Vec<Sender<T>>, Vec<Receiver<T>>) {
    let name = name.into();
    (0..n).map(|i| chan(format!("{name}.{i}"), slack)).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_are_indexed() {
        let (s, r) = chan_arr::<u8>("R", 3, 1);
        let names: Vec<_> = s.iter().map(Sender::name).collect();
        assert_eq!(names, ["R.0", "R.1", "R.2"]);
        assert_eq!(r[2].name(), "R.2");
        assert_eq!(r[0].capacity(), 2);
    }

    #[test]
    fn unbound_endpoint_is_misconfigured() {
        let (s, r) = chan::<u8>("L", 0);
        let err = s.send(1).unwrap_err();
        assert!(matches!(
            err,
            crate::SimError::Misconfigured(crate::Misconfigured::Unbound { .. })
        ));
        assert!(r.recv().is_err());
    }
}
