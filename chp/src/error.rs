//! Error types for the simulation kernel.
//!
//! Every blocking channel operation returns `Result<_, SimError>`. A
//! [`SimError::Deadlock`] is the normal way a finite pipeline winds down and
//! is absorbed at the owning process boundary; every other variant is fatal
//! for the process that raised it.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Structural or wiring defects in a simulated network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Misconfigured {
    /// A split/merge control token selected a branch that does not exist.
    #[error("{process}: control value {control} out of range for {branches} branches")]
    ControlOutOfRange {
        process: String,
        control: i64,
        branches: usize,
    },
    /// Fan-in branches delivered different values for the same token.
    #[error("expected {expected}, found {found} at token {token}")]
    Mismatch {
        token: i64,
        expected: String,
        found: String,
    },
    /// A caller-supplied validator rejected a token.
    #[error("validation failed at token {token}: {reason}")]
    Validation { token: i64, reason: String },
    /// A channel endpoint was used before a process bound it with `init`.
    #[error("endpoint of channel `{channel}` used before it was bound to a process")]
    Unbound { channel: String },
}

/// The error type returned by channel operations and process functions.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// The counterpart of a channel is permanently gone.
    #[error("deadlock on channel `{channel}`")]
    Deadlock { channel: String },

    #[error("misconfigured network: {0}")]
    Misconfigured(#[from] Misconfigured),

    /// A process body panicked; its endpoints were closed during unwinding.
    #[error("process {process} panicked")]
    Panicked { process: String },

    /// The run directory could not be created.
    #[error("failed to prepare log directory {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The OS refused to start a process thread.
    #[error("failed to start process {process}: {source}")]
    Spawn {
        process: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl SimError {
    /// Returns `true` for the expected end-of-pipeline signal.
    #[must_use]
    pub const fn is_deadlock(&self) -> bool {
        matches!(self, Self::Deadlock { .. })
    }

    pub(crate) fn deadlock(channel: &str) -> Self {
        Self::Deadlock {
            channel: channel.to_owned(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;
