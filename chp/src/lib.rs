//! Discrete-event timing simulation of self-timed circuits.
//!
//! A circuit is a network of processes, each on its own thread, exchanging
//! time-stamped tokens over rendezvous [`channel`]s. Every process owns a
//! [`Process`] node holding its logical clock; operators in [`dataflow`] add
//! profile delays to the times they observe and record one cycle per
//! iteration. A finite network winds down by closing endpoints: blocked
//! neighbours see [`SimError::Deadlock`], which each process absorbs at its own
//! boundary.
//!
//! ```
//! use chp::{Process, SimConfig, chan, dataflow, support};
//!
//! let top = Process::root(SimConfig::default().with_journal(true)).unwrap();
//! let (l, lr) = chan::<i64>("L", 0);
//! let (r, rr) = chan::<i64>("R", 0);
//!
//! top.go("src", move |p| dataflow::source_n(p, 3, support::values(vec![1, 2, 3]), vec![l]))
//!     .unwrap();
//! top.go("buf", move |p| dataflow::buffer(p, lr, r)).unwrap();
//! top.go("sink", move |p| dataflow::sink(p, rr)).unwrap();
//!
//! let journal = top.journal().unwrap();
//! top.done().unwrap();
//! assert_eq!(journal.report().get("top.sink").unwrap().cycles, 3);
//! ```

// Allow the crate to reference itself as ::chp for derive macro usage
extern crate self as chp;

pub mod channel;
pub mod config;
pub mod context;
pub mod dataflow;
pub mod describe;
pub mod error;
pub mod journal;
pub mod pending;
pub mod stream;
pub mod support;
pub mod timing;
mod trace;

#[doc(inline)]
pub use chp_derive::Describe;

#[doc(inline)]
pub use describe::Describe;

pub use channel::{Payload, Receiver, Sender, chan, chan_arr};
pub use config::SimConfig;
pub use context::{Port, Ports, Process};
pub use error::{Misconfigured, SimError, SimResult};
pub use journal::{Cycle, Journal, Report};
pub use pending::Pending;
pub use stream::Token;
pub use timing::{Profile, ProfileSet, TimingSet};
pub use trace::init_tracing;
