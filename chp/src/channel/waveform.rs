//! Per-endpoint waveform logs.
//!
//! A waveform log records every value that crosses an endpoint together with
//! its settled time. The kernel only calls [`WaveformLog::write`] when a log
//! is attached; [`FileWaveform`] is the default attached to named channels
//! when the run has a log directory.

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::describe::Describe;
use crate::trace::warn;

/// Destination for the values crossing one endpoint.
pub trait WaveformLog<T>: Send {
    fn write(&mut self, value: &T, time: f64);

    /// Flushes and releases the destination.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while flushing.
    fn close(&mut self) -> io::Result<()>;
}

/// Tab-separated waveform file, created on the first write.
///
/// The header names the payload shape via [`Describe`]:
///
/// ```text
/// time (ns)	{end:bool digit:i64}
/// 1.250000	Token { end: false, digit: 3 }
/// ```
///
/// A file that cannot be created or written is reported once and the log
/// stays disabled for the rest of the run.
pub struct FileWaveform<T> {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    disabled: bool,
    _payload: PhantomData<fn(&T)>,
}

impl<T> FileWaveform<T> {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            disabled: false,
            _payload: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Describe> FileWaveform<T> {
    fn open(&mut self) -> io::Result<&mut BufWriter<File>> {
        if self.file.is_none() {
            let mut file = BufWriter::new(File::create(&self.path)?);
            writeln!(file, "time (ns)\t{}", T::describe())?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("waveform file unavailable"))
    }
}

impl<T: Describe + Debug> WaveformLog<T> for FileWaveform<T> {
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn write(&mut self, value: &T, time: f64) {
        if self.disabled {
            return;
        }
        let result = self
            .open()
            .and_then(|file| writeln!(file, "{time:.6}\t{value:?}"));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "waveform log disabled");
            self.disabled = true;
            self.file = None;
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}
