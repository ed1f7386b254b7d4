//! Test transcript output
//!
//! Queried values are printed for manual verification, gated by the run's
//! verbosity. Diagnostics go through `tracing` instead.

use smi_core::Verbosity;
use std::fmt;
use std::io::{self, Write};

/// Verbosity-gated transcript writer
pub struct Console {
    verbosity: Verbosity,
    sink: Box<dyn Write + Send>,
}

impl Console {
    /// Console printing to stdout
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self::new(verbosity, io::stdout())
    }

    /// Console printing to `sink`
    pub fn new(verbosity: Verbosity, sink: impl Write + Send + 'static) -> Self {
        Self {
            verbosity,
            sink: Box::new(sink),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Check whether lines at `level` are printed
    pub fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    /// Print one line at `level`
    pub fn say(&mut self, level: Verbosity, line: impl fmt::Display) {
        if self.enabled(level) {
            // A broken transcript must not change the test outcome.
            let _ = writeln!(self.sink, "{}", line);
        }
    }

    /// Print a phase banner such as `SET-UP` or `RESULTS`
    pub fn header(&mut self, level: Verbosity, label: &str) {
        self.say(level, format_args!("\n\t***** {} *****", label));
    }

    pub fn flush(&mut self) {
        let _ = self.sink.flush();
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

/// In-memory sink for inspecting transcripts in tests
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
