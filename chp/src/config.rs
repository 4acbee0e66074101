//! Simulation run configuration.

use std::path::PathBuf;

use crate::timing::ProfileSet;

/// Settings for one simulation run, consumed by
/// [`Process::root`](crate::Process::root).
///
/// ```
/// use chp::SimConfig;
///
/// let config = SimConfig::new("dut").with_journal(true);
/// assert_eq!(config.name, "dut");
/// assert!(config.log_dir.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Name of the root process; prefixes every qualified process name.
    pub name: String,
    /// Directory for cycle logs and waveforms. `None` keeps the run in
    /// memory.
    pub log_dir: Option<PathBuf>,
    /// Delay tables looked up by [`Process::init`](crate::Process::init).
    pub profiles: ProfileSet,
    /// Write a waveform file per named endpoint when `log_dir` is set.
    pub waveforms: bool,
    /// Mirror cycle records into an in-memory [`Journal`](crate::Journal).
    pub journal: bool,
    /// Initial debug flag of the root, inherited by every child.
    pub debug: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "top".to_owned(),
            log_dir: None,
            profiles: ProfileSet::new(),
            waveforms: true,
            journal: false,
            debug: false,
        }
    }
}

impl SimConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_profiles(mut self, profiles: ProfileSet) -> Self {
        self.profiles = profiles;
        self
    }

    #[must_use]
    pub fn with_waveforms(mut self, on: bool) -> Self {
        self.waveforms = on;
        self
    }

    #[must_use]
    pub fn with_journal(mut self, on: bool) -> Self {
        self.journal = on;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }
}
