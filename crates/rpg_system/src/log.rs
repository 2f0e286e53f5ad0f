//! Logging context shared by the simulation subsystems.
//!
//! There is no global logger: `main` builds one [`LogContext`] and every
//! subsystem constructor takes it by reference, keeping a child span that it
//! enters while it runs.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{Span, info_span};

#[derive(Debug, Clone)]
pub struct LogContext {
    root: Span,
    crash_log: Option<PathBuf>,
}

impl LogContext {
    /// Create a context rooted at a span named after the running program.
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            root: info_span!("sim", program),
            crash_log: None,
        }
    }

    /// Append fatal errors to `path`.
    #[must_use]
    pub fn with_crash_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.crash_log = Some(path.into());
        self
    }

    #[must_use]
    pub fn root(&self) -> &Span {
        &self.root
    }

    /// A span for one subsystem, nested under the root span.
    #[must_use]
    pub fn child(&self, subsystem: &'static str) -> Span {
        info_span!(parent: &self.root, "subsystem", system = subsystem)
    }

    #[must_use]
    pub fn crash_log(&self) -> Option<&Path> {
        self.crash_log.as_deref()
    }

    /// Append one line to the crash log. Does nothing without a crash log.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or written.
    pub fn record_crash(&self, message: &str) -> io::Result<()> {
        let Some(path) = &self.crash_log else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{message}")
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new("rpg")
    }
}
