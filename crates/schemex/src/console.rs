//! Process output streams.
//!
//! The console stream (stdout) only ever carries serialized documents; every
//! progress and error line goes to the diagnostic stream (stderr). Both can be
//! redirected to channels, which is how tests observe a run.

use std::io::{self, Write};
use std::sync::mpsc::Sender;

/// A sink receiving text that would otherwise go to a process stream.
pub type OutputSink = Sender<String>;

#[derive(Debug, Clone, Default)]
pub struct Console {
    /// Replaces stdout when set.
    out_sink: Option<OutputSink>,
    /// Replaces stderr when set.
    diag_sink: Option<OutputSink>,
}

impl Console {
    /// A console writing to the real stdout and stderr.
    pub fn new() -> Self {
        Self::default()
    }

    /// A console sending both streams to channels.
    pub fn with_sinks(out_sink: OutputSink, diag_sink: OutputSink) -> Self {
        Self {
            out_sink: Some(out_sink),
            diag_sink: Some(diag_sink),
        }
    }

    /// Write raw text to the console stream.
    pub fn write_out(&self, text: &str) -> io::Result<()> {
        match &self.out_sink {
            Some(sink) => sink
                .send(text.to_string())
                .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e.to_string())),
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()
            }
        }
    }

    /// Write one line to the diagnostic stream.
    ///
    /// Each call produces one complete line, so concurrent writers never
    /// interleave within a line.
    pub fn diagnostic(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        match &self.diag_sink {
            // A dropped receiver just means nobody is listening anymore
            Some(sink) => {
                let _ = sink.send(line.to_string());
            }
            None => {
                let mut stderr = io::stderr().lock();
                let _ = writeln!(stderr, "{}", line);
            }
        }
    }
}
