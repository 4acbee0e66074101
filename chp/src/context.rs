//! Hierarchical process context.
//!
//! Every simulated process owns a [`Process`]: a node in a tree rooted at
//! [`Process::root`]. The node carries the process's logical clock, binds the
//! channel endpoints the process uses, records one cycle per iteration, and
//! tears everything down when the process finishes:
//!
//! 1. wait for every child spawned from it,
//! 2. absorb a [`SimError::Deadlock`] (normal end of a finite pipeline),
//!    record any other error as a run fault,
//! 3. close all bound endpoints so neighbours blocked on them wake up,
//! 4. flush the cycle log and signal the parent.
//!
//! The same teardown runs when a `Process` is dropped unfinished, including
//! while a process body unwinds from a panic.

mod cycle;
mod latch;
mod ports;

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use minstant::Instant;
use parking_lot::Mutex;

pub use ports::{Port, Ports};

use self::cycle::CycleLog;
use self::latch::Latch;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::journal::{Cycle, Journal};
use crate::timing::{Profile, ProfileSet};
use crate::trace::{debug, error, info, warn};

/// State shared by every node of one run.
struct Shared {
    log_dir: Option<PathBuf>,
    waveforms: bool,
    profiles: ProfileSet,
    journal: Option<Arc<Journal>>,
    /// First fatal error raised by any process.
    fault: Mutex<Option<SimError>>,
    started: Instant,
}

impl Shared {
    fn record_fault(&self, e: &SimError) {
        self.fault.lock().get_or_insert_with(|| e.clone());
    }
}

pub(crate) struct Node {
    name: String,
    parent: Weak<Node>,
    children: Mutex<Vec<Weak<Node>>>,
    latch: Latch,
    /// Logical clock as `f64` bits.
    clock: AtomicU64,
    debug: AtomicBool,
    ports: Mutex<Vec<Box<dyn Port>>>,
    log: Mutex<CycleLog>,
    shared: Arc<Shared>,
}

impl Node {
    fn new(name: String, parent: Weak<Node>, debug: bool, shared: Arc<Shared>) -> Self {
        let log = CycleLog::new(shared.log_dir.as_ref().map(|dir| dir.join(&name)));
        Self {
            name,
            parent,
            children: Mutex::new(Vec::new()),
            latch: Latch::default(),
            clock: AtomicU64::new(0f64.to_bits()),
            debug: AtomicBool::new(debug),
            ports: Mutex::new(Vec::new()),
            log: Mutex::new(log),
            shared,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn now(&self) -> f64 {
        f64::from_bits(self.clock.load(Ordering::Acquire))
    }

    pub(crate) fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::Relaxed);
        for child in self.children.lock().iter().filter_map(Weak::upgrade) {
            child.set_debug(on);
        }
    }

    /// Waveform file for an endpoint of channel `chan` bound here, if the run
    /// writes waveforms. `side` is `s` or `r`.
    pub(crate) fn waveform_path(&self, chan: &str, side: &str) -> Option<PathBuf> {
        if chan.is_empty() || !self.shared.waveforms {
            return None;
        }
        let dir = self.shared.log_dir.as_ref()?;
        Some(dir.join(format!("{}.{chan}.{side}", self.name)))
    }
}

/// Handle to one node of the process tree.
///
/// A `Process` is consumed by [`Process::run`] or [`Process::done`]; dropping
/// it without either performs the same teardown.
pub struct Process {
    node: Arc<Node>,
    finished: bool,
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.node.name)
            .field("now", &self.node.now())
            .finish_non_exhaustive()
    }
}

impl Process {
    /// Creates the root of a run.
    ///
    /// # Errors
    ///
    /// [`SimError::Setup`] if the configured log directory cannot be created.
    pub fn root(config: SimConfig) -> SimResult<Self> {
        if let Some(dir) = &config.log_dir {
            fs::create_dir_all(dir).map_err(|source| SimError::Setup {
                path: dir.clone(),
                source: Arc::new(source),
            })?;
        }

        let shared = Arc::new(Shared {
            log_dir: config.log_dir,
            waveforms: config.waveforms,
            profiles: config.profiles,
            journal: config.journal.then(|| Arc::new(Journal::new())),
            fault: Mutex::new(None),
            started: Instant::now(),
        });

        info!(name = %config.name, "simulation started");

        Ok(Self {
            node: Arc::new(Node::new(config.name, Weak::new(), config.debug, shared)),
            finished: false,
        })
    }

    /// Creates a child named `<self>.<name>`.
    ///
    /// The child inherits the debug flag, and `self` will not finish before
    /// the child does.
    #[must_use]
    pub fn spawn(&self, name: impl Display) -> Self {
        let parent = &self.node;
        parent.latch.add();

        let child = Arc::new(Node::new(
            format!("{}.{name}", parent.name),
            Arc::downgrade(parent),
            parent.debug(),
            Arc::clone(&parent.shared),
        ));
        parent.children.lock().push(Arc::downgrade(&child));

        debug!(parent = %parent.name, child = %child.name, "process spawned");

        Self {
            node: child,
            finished: false,
        }
    }

    /// Spawns a child and runs `f` with it on a new thread named after the
    /// child.
    ///
    /// # Errors
    ///
    /// [`SimError::Spawn`] if the thread cannot be started. The child is
    /// finished immediately in that case.
    pub fn go<F>(&self, name: impl Display, f: F) -> SimResult<JoinHandle<SimResult<()>>>
    where
        F: FnOnce(Process) -> SimResult<()> + Send + 'static,
    {
        let child = self.spawn(name);
        let thread_name = child.node.name.clone();

        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || f(child))
            .map_err(|source| {
                error!(process = %thread_name, error = %source, "failed to start process");
                SimError::Spawn {
                    process: thread_name,
                    source: Arc::new(source),
                }
            })
    }

    /// Binds `ports` to this process and returns its timing profile.
    ///
    /// The profile is looked up by the qualified process name; a missing
    /// entry yields an all-zero profile.
    pub fn init(&self, ports: impl Ports) -> Profile {
        self.bind(&ports);
        self.profile(None)
    }

    /// Like [`Process::init`], falling back to the profile registered for
    /// `operator` (e.g. `chp::buffer`) when the process name has none.
    pub fn init_for(&self, operator: &str, ports: impl Ports) -> Profile {
        self.bind(&ports);
        self.profile(Some(operator))
    }

    fn bind(&self, ports: &impl Ports) {
        let mut collected = Vec::new();
        ports.collect_ports(&mut collected);
        for port in &collected {
            port.bind(self);
        }
        self.node.ports.lock().extend(collected);
    }

    fn profile(&self, operator: Option<&str>) -> Profile {
        let profiles = &self.node.shared.profiles;
        profiles
            .find(&self.node.name)
            .or_else(|| operator.and_then(|op| profiles.find(op)))
            .cloned()
            .unwrap_or_default()
    }

    /// Runs `body` and finishes the process with its outcome.
    ///
    /// # Errors
    ///
    /// Any error from `body` other than [`SimError::Deadlock`]. For the root,
    /// also the first fault raised anywhere in the run.
    pub fn run<F>(mut self, body: F) -> SimResult<()>
    where
        F: FnOnce(&Process) -> SimResult<()>,
    {
        let outcome = body(&self);
        self.finish(outcome)
    }

    /// Finishes the process: waits for children, closes bound endpoints and
    /// flushes the cycle log.
    ///
    /// # Errors
    ///
    /// For the root, the first fault raised anywhere in the run.
    pub fn done(mut self) -> SimResult<()> {
        self.finish(Ok(()))
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn finish(&mut self, outcome: SimResult<()>) -> SimResult<()> {
        self.finished = true;
        let node = &self.node;

        node.latch.wait();

        let result = match outcome {
            Err(e) if e.is_deadlock() => {
                debug!(process = %node.name, reason = %e, "process finished");
                Ok(())
            }
            other => other,
        };

        if let Err(e) = &result {
            error!(process = %node.name, error = %e, "process failed");
            node.shared.record_fault(e);
        }

        let ports = std::mem::take(&mut *node.ports.lock());
        for port in ports {
            if let Err(e) = port.close() {
                warn!(process = %node.name, channel = port.channel(), error = %e, "failed to close endpoint log");
            }
        }

        if let Err(e) = node.log.lock().close() {
            warn!(process = %node.name, error = %e, "failed to flush cycle log");
        }

        match node.parent.upgrade() {
            Some(parent) => {
                parent.latch.done();
                result
            }
            None => {
                info!(
                    name = %node.name,
                    elapsed = ?node.shared.started.elapsed(),
                    "simulation finished"
                );
                match node.shared.fault.lock().clone() {
                    Some(fault) if result.is_ok() => Err(fault),
                    _ => result,
                }
            }
        }
    }

    /// Records one iteration spanning `start..end` relative to the current
    /// clock, then advances the clock by `end`.
    pub fn cycle(&self, energy: f64, start: f64, end: f64) {
        let now = self.now();
        let record = Cycle {
            start: now + start,
            end: now + end,
            energy,
        };

        self.node.log.lock().write(&record);
        if let Some(journal) = &self.node.shared.journal {
            journal.record(&self.node.name, record);
        }

        self.node
            .clock
            .store((now + end).to_bits(), Ordering::Release);
    }

    /// Dot-qualified name, e.g. `top.dut.buf`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.node.name
    }

    #[must_use]
    pub fn log_dir(&self) -> Option<&Path> {
        self.node.shared.log_dir.as_deref()
    }

    /// Current logical time of this process.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.node.now()
    }

    /// Sets the debug flag here and on every live descendant.
    pub fn set_debug(&self, on: bool) {
        self.node.set_debug(on);
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.node.debug()
    }

    /// The run's cycle journal, if enabled in [`SimConfig`].
    #[must_use]
    pub fn journal(&self) -> Option<Arc<Journal>> {
        self.node.shared.journal.clone()
    }

    pub(crate) fn node(&self) -> &Arc<Node> {
        &self.node
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let outcome = if thread::panicking() {
            Err(SimError::Panicked {
                process: self.node.name.clone(),
            })
        } else {
            Ok(())
        };
        // Nobody is left to receive the result; faults were recorded.
        let _ = self.finish(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Misconfigured;
    use crate::{chan, Profile};

    #[test]
    fn children_are_dot_qualified() {
        let top = Process::root(SimConfig::default()).unwrap();
        let dut = top.spawn("dut");
        let buf = dut.spawn(format_args!("buf{}", 3));
        assert_eq!(buf.name(), "top.dut.buf3");
        assert_eq!(top.node.latch.outstanding(), 1);
        drop(buf);
        drop(dut);
        assert_eq!(top.node.latch.outstanding(), 0);
        top.done().unwrap();
    }

    #[test]
    fn profile_lookup_order() {
        let profiles = ProfileSet::new()
            .with("top.a", Profile::new().with("d0", 1.0))
            .with("chp::buffer", Profile::new().with("d0", 2.0));
        let top = Process::root(SimConfig::default().with_profiles(profiles)).unwrap();

        assert_eq!(top.spawn("a").init_for("chp::buffer", ()).find("d0"), 1.0);
        assert_eq!(top.spawn("b").init_for("chp::buffer", ()).find("d0"), 2.0);
        assert_eq!(top.spawn("c").init(()).find("d0"), 0.0);
        top.done().unwrap();
    }

    #[test]
    fn cycle_advances_clock() {
        let top = Process::root(SimConfig::default().with_journal(true)).unwrap();
        top.cycle(1.0, 0.5, 2.0);
        top.cycle(1.0, -1.0, 3.0);
        assert_eq!(top.now(), 5.0);

        let journal = top.journal().unwrap();
        let cycles = journal.cycles("top");
        assert_eq!(cycles[1].start, 1.0);
        assert_eq!(cycles[1].end, 5.0);
        top.done().unwrap();
    }

    #[test]
    fn debug_cascades_to_children() {
        let top = Process::root(SimConfig::default()).unwrap();
        let child = top.spawn("c");
        let grandchild = child.spawn("g");
        top.set_debug(true);
        assert!(grandchild.debug());
        assert!(top.spawn("late").debug());
    }

    #[test]
    fn deadlock_is_absorbed() {
        let top = Process::root(SimConfig::default()).unwrap();
        let child = top.spawn("c");
        assert!(child.run(|_| Err(SimError::deadlock("L"))).is_ok());
        top.done().unwrap();
    }

    #[test]
    fn child_fault_is_reported_by_root() {
        let top = Process::root(SimConfig::default()).unwrap();
        let err = top
            .spawn("c")
            .run(|_| {
                Err(Misconfigured::Validation {
                    token: 0,
                    reason: "bad".into(),
                }
                .into())
            })
            .unwrap_err();
        assert!(matches!(err, SimError::Misconfigured(_)));
        assert!(matches!(top.done(), Err(SimError::Misconfigured(_))));
    }

    #[test]
    fn finishing_closes_bound_endpoints() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (tx, rx) = chan::<i64>("L", 0);
        top.spawn("src").init(&tx);
        assert!(tx.is_closed());
        assert!(!rx.is_closed());
        top.done().unwrap();
    }

    #[test]
    fn panicking_body_closes_endpoints_and_faults_root() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (tx, rx) = chan::<i64>("L", 0);

        let handle = top
            .go("boom", move |g| {
                g.init(&tx);
                g.run(|_| panic!("boom"))
            })
            .unwrap();

        assert!(handle.join().is_err());
        let sink = top.spawn("sink");
        sink.init(&rx);
        assert!(rx.recv().unwrap_err().is_deadlock());
        drop(sink);

        assert!(matches!(top.done(), Err(SimError::Panicked { .. })));
    }

    #[test]
    fn missing_log_dir_parent_is_setup_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = SimConfig::default().with_log_dir(file.path().join("run"));
        assert!(matches!(
            Process::root(config),
            Err(SimError::Setup { .. })
        ));
    }
}
