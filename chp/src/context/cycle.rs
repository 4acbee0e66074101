use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::journal::Cycle;
use crate::trace::warn;

/// Per-process cycle file: one `start\tend\tenergy` row per iteration.
///
/// Created on the first row. Without a path every row is dropped.
#[derive(Debug)]
pub(crate) struct CycleLog {
    path: Option<PathBuf>,
    file: Option<BufWriter<File>>,
}

impl CycleLog {
    pub(crate) fn new(path: Option<PathBuf>) -> Self {
        Self { path, file: None }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub(crate) fn write(&mut self, cycle: &Cycle) {
        let Some(path) = &self.path else {
            return;
        };

        if self.file.is_none() {
            match File::create(path) {
                Ok(file) => self.file = Some(BufWriter::new(file)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cycle log disabled");
                    self.path = None;
                    return;
                }
            }
        }

        if let Some(file) = self.file.as_mut()
            && let Err(e) = writeln!(
                file,
                "{:.6}\t{:.6}\t{:.6}",
                cycle.start, cycle.end, cycle.energy
            )
        {
            warn!(path = %path.display(), error = %e, "cycle log disabled");
            self.file = None;
            self.path = None;
        }
    }

    pub(crate) fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}
