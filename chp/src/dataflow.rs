//! Generic dataflow operators.
//!
//! Every operator is a process body: it takes its [`Process`] and endpoints
//! by value, binds them, reads its delays once from the profile and then
//! loops forever. The loop ends when a neighbour closes a channel, which
//! surfaces as a [`SimError::Deadlock`](crate::SimError::Deadlock) and is
//! absorbed by [`Process::run`]. Operators are meant to be started with
//! [`Process::go`]:
//!
//! ```
//! use chp::{Process, SimConfig, chan, dataflow, support};
//!
//! let top = Process::root(SimConfig::default()).unwrap();
//! let (l, lr) = chan::<i64>("L", 0);
//! let (r, rr) = chan::<i64>("R", 0);
//!
//! top.go("src", move |p| dataflow::source_n(p, 3, support::values(vec![1, 2, 3]), vec![l]))
//!     .unwrap();
//! top.go("buf", move |p| dataflow::buffer(p, lr, r)).unwrap();
//! top.go("sink", move |p| dataflow::sink(p, rr)).unwrap();
//!
//! top.done().unwrap();
//! ```
//!
//! Profile entries read by the operators:
//!
//! | name | meaning |
//! |------|---------|
//! | `d0L` | input receive delay |
//! | `d0C` | control receive delay |
//! | `d0R` | output send delay |
//! | `d0`  | reset delay added to the cycle end |
//! | `e0`  | energy per cycle (per branch for fan-out) |
//!
//! Each operator falls back to the profile registered under its identity
//! (e.g. [`BUFFER`]) when none is registered under the process name.
//!
//! [`Process`]: crate::Process
//! [`Process::run`]: crate::Process::run
//! [`Process::go`]: crate::Process::go

mod endpoints;
mod pipeline;
mod select;
mod width;

pub use endpoints::{sink, sink_and_check, sink_and_check_n, sink_n, source, source_n};
pub use pipeline::{buffer, connect, copy};
pub use select::{merge, split};
pub use width::{parallel_to_serial, serial_to_parallel};

use std::thread;

use crate::channel::{Payload, Sender};
use crate::error::SimResult;
use crate::timing::{Profile, TimingSet};

pub const BUFFER: &str = "chp::buffer";
pub const CONNECT: &str = "chp::connect";
pub const COPY: &str = "chp::copy";
pub const SPLIT: &str = "chp::split";
pub const MERGE: &str = "chp::merge";
pub const SOURCE: &str = "chp::source";
pub const SINK: &str = "chp::sink";
pub const SINK_AND_CHECK: &str = "chp::sink_and_check";
pub const SERIAL_TO_PARALLEL: &str = "chp::serial_to_parallel";
pub const PARALLEL_TO_SERIAL: &str = "chp::parallel_to_serial";

/// Delays every operator reads once before its loop.
#[derive(Debug, Clone, Copy)]
struct Delays {
    d0l: f64,
    d0c: f64,
    d0r: f64,
    d0: f64,
    e0: f64,
}

impl From<&Profile> for Delays {
    fn from(p: &Profile) -> Self {
        Self {
            d0l: p.find("d0L"),
            d0c: p.find("d0C"),
            d0r: p.find("d0R"),
            d0: p.find("d0"),
            e0: p.find("e0"),
        }
    }
}

/// Sends `value` on every output starting at `offset`, concurrently when
/// there is more than one, and returns the latest completion time.
///
/// `floor` seeds the maximum. Every branch settles or fails before this
/// returns; the first failure in output order is reported.
fn fan_out<T: Payload>(outs: &[Sender<T>], value: &T, offset: f64, floor: Option<f64>) -> SimResult<f64> {
    let done = TimingSet::max();
    if let Some(t) = floor {
        done.add(t);
    }

    match outs {
        [out] => done.add(out.send_at(value.clone(), offset)?),
        _ => {
            let settled: Vec<SimResult<f64>> = thread::scope(|s| {
                let sends: Vec<_> = outs
                    .iter()
                    .map(|out| {
                        let value = value.clone();
                        s.spawn(move || out.send_at(value, offset))
                    })
                    .collect();
                sends
                    .into_iter()
                    .map(|send| send.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                    .collect()
            });
            for t in settled {
                done.add(t?);
            }
        }
    }

    done.get()
}
