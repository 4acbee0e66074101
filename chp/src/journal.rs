//! In-memory cycle journal and per-process performance report.
//!
//! When [`SimConfig::journal`](crate::SimConfig::journal) is set, every
//! [`Process::cycle`](crate::Process::cycle) call is mirrored here in addition
//! to the on-disk cycle log. A [`Report`] condenses the journal into one row
//! per process.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One iteration of a process, in absolute simulated time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub start: f64,
    pub end: f64,
    pub energy: f64,
}

/// Cycles recorded by every process of a run, keyed by qualified name.
#[derive(Debug, Default)]
pub struct Journal {
    cycles: Mutex<BTreeMap<String, Vec<Cycle>>>,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, process: &str, cycle: Cycle) {
        self.cycles
            .lock()
            .entry(process.to_owned())
            .or_default()
            .push(cycle);
    }

    /// Cycles of `process` in recording order.
    #[must_use]
    pub fn cycles(&self, process: &str) -> Vec<Cycle> {
        self.cycles.lock().get(process).cloned().unwrap_or_default()
    }

    /// Names of every process that recorded at least one cycle, sorted.
    #[must_use]
    pub fn processes(&self) -> Vec<String> {
        self.cycles.lock().keys().cloned().collect()
    }

    #[must_use]
    pub fn report(&self) -> Report {
        let cycles = self.cycles.lock();
        Report {
            processes: cycles
                .iter()
                .map(|(name, cycles)| ProcessSummary::new(name, cycles))
                .collect(),
        }
    }
}

/// Aggregate figures for one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub name: String,
    pub cycles: usize,
    pub energy: f64,
    pub first_start: f64,
    pub last_end: f64,
    /// Mean distance between consecutive cycle starts; `0.0` below two
    /// cycles.
    pub period: f64,
}

impl ProcessSummary {
    fn new(name: &str, cycles: &[Cycle]) -> Self {
        let first_start = cycles.first().map_or(0.0, |c| c.start);
        let last_start = cycles.last().map_or(0.0, |c| c.start);
        let period = if cycles.len() > 1 {
            (last_start - first_start) / (cycles.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            name: name.to_owned(),
            cycles: cycles.len(),
            energy: cycles.iter().map(|c| c.energy).sum(),
            first_start,
            last_end: cycles.iter().map(|c| c.end).fold(first_start, f64::max),
            period,
        }
    }

    /// Mean energy per cycle.
    #[must_use]
    pub fn energy_per_cycle(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.energy / self.cycles as f64
        }
    }
}

/// Per-process summary of a run, sorted by process name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub processes: Vec<ProcessSummary>,
}

impl Report {
    #[must_use]
    pub fn get(&self, process: &str) -> Option<&ProcessSummary> {
        self.processes.iter().find(|p| p.name == process)
    }

    /// Total energy of every process.
    #[must_use]
    pub fn energy(&self) -> f64 {
        self.processes.iter().map(|p| p.energy).sum()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<32} {:>8} {:>12} {:>12} {:>12}",
            "process", "cycles", "energy", "end (ns)", "period (ns)"
        )?;
        for p in &self.processes {
            writeln!(
                f,
                "{:<32} {:>8} {:>12.3} {:>12.3} {:>12.3}",
                p.name, p.cycles, p.energy, p.last_end, p.period
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(start: f64, end: f64, energy: f64) -> Cycle {
        Cycle { start, end, energy }
    }

    #[test]
    fn summary_per_process() {
        let j = Journal::new();
        j.record("top.buf", cycle(0.0, 2.0, 1.0));
        j.record("top.buf", cycle(2.0, 4.0, 1.0));
        j.record("top.buf", cycle(4.0, 7.0, 1.5));
        j.record("top.sink", cycle(1.0, 1.5, 0.5));

        assert_eq!(j.processes(), ["top.buf", "top.sink"]);

        let report = j.report();
        let buf = report.get("top.buf").unwrap();
        assert_eq!(buf.cycles, 3);
        assert_eq!(buf.energy, 3.5);
        assert_eq!(buf.last_end, 7.0);
        assert_eq!(buf.period, 2.0);

        let sink = report.get("top.sink").unwrap();
        assert_eq!(sink.period, 0.0);
        assert_eq!(report.energy(), 4.0);
    }

    #[test]
    fn display_has_one_row_per_process() {
        let j = Journal::new();
        j.record("a", cycle(0.0, 1.0, 1.0));
        j.record("b", cycle(0.0, 1.0, 1.0));
        let text = j.report().to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().starts_with('a'));
    }
}
