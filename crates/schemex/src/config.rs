//! Run configuration, fixed for the lifetime of the process

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::module::DEFAULT_EXPORT;

/// What to watch when watch mode is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// The input module itself.
    Input,
    /// An explicit file or directory.
    Path(PathBuf),
}

impl WatchTarget {
    /// Build a target from a command-line value; an empty value means the input.
    pub fn from_arg(arg: &str) -> Self {
        if arg.is_empty() {
            WatchTarget::Input
        } else {
            WatchTarget::Path(PathBuf::from(arg))
        }
    }
}

/// Options for a single extraction run (and the watch loop around it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Module to load
    pub input: PathBuf,
    /// Export holding the schema
    pub export: String,
    /// Destination file; `None` prints to stdout
    pub output: Option<PathBuf>,
    /// Watch target; `None` disables watching
    pub watch: Option<WatchTarget>,
    /// Shell command receiving the document on stdin
    pub exec: Option<String>,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            export: DEFAULT_EXPORT.to_string(),
            output: None,
            watch: None,
            exec: None,
        }
    }

    pub fn export(mut self, name: impl Into<String>) -> Self {
        self.export = name.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn watch(mut self, target: WatchTarget) -> Self {
        self.watch = Some(target);
        self
    }

    pub fn exec(mut self, command: impl Into<String>) -> Self {
        self.exec = Some(command.into());
        self
    }

    /// The path to watch, if watching is enabled.
    pub fn watch_path(&self) -> Option<&Path> {
        match self.watch.as_ref()? {
            WatchTarget::Input => Some(&self.input),
            WatchTarget::Path(path) => Some(path),
        }
    }

    /// Make every path absolute against `base`.
    pub fn absolutize(mut self, base: &Path) -> Self {
        self.input = base.join(&self.input);
        self.output = self.output.map(|p| base.join(p));
        if let Some(WatchTarget::Path(path)) = self.watch {
            self.watch = Some(WatchTarget::Path(base.join(path)));
        }
        self
    }
}

/// Timing of the change detection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// How often the watched path is polled.
    pub poll_interval: Duration,
    /// How long a file must stay unchanged before a run starts.
    pub stability_threshold: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            stability_threshold: Duration::from_millis(2000),
        }
    }
}
