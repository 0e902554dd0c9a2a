//! schemex
//!
//! Loads a declarative schema module, converts the selected export to JSON
//! Schema and delivers the document to stdout, a file and/or a shell command,
//! optionally re-running whenever the module changes.

pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod module;
pub mod output;
pub mod pipeline;
pub mod watch;

pub use command::CommandDelivery;
pub use config::{RunConfig, WatchOptions, WatchTarget};
pub use console::{Console, OutputSink};
pub use error::{Error, ErrorStage, Result};
pub use module::{FsModuleResolver, Module, ModuleExports, ModuleResolver, DEFAULT_EXPORT};
pub use output::Destination;
pub use pipeline::{CommandStatus, Pipeline, RunOutcome, Sink};
pub use watch::{WatchEvent, WatchSession, WatchState};
