//! Timing profiles: immutable name → delay tables.
//!
//! A [`ProfileSet`] maps process names (fully qualified, like `top.dut`, or
//! an operator identity like `chp::buffer`) to a [`Profile`]. Profiles are
//! plain `serde` data, so whichever loader produces them decides the file
//! format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Named delays and energies for one process.
///
/// Absent names read as `0.0`; a missing entry is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    values: HashMap<String, f64>,
}

impl Profile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, delay: f64) -> Self {
        self.values.insert(name.into(), delay);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, delay: f64) {
        self.values.insert(name.into(), delay);
    }

    #[must_use]
    pub fn find(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Profile {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Profiles keyed by process name or operator identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileSet {
    profiles: HashMap<String, Profile>,
}

impl ProfileSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, profile: Profile) -> Self {
        self.profiles.insert(name.into(), profile);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, profile: Profile) {
        self.profiles.insert(name.into(), profile);
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
