//! Timing primitives.
//!
//! - `aggregate`: min/max/avg combinators over branch completion times.
//! - `profile`: per-process named delay tables.

mod aggregate;
mod profile;

pub use aggregate::{Statistic, TimingSet};
pub use profile::{Profile, ProfileSet};
