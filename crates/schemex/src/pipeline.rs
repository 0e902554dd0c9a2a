//! The run pipeline: load, extract, convert, serialize, deliver

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::command::CommandDelivery;
use crate::config::RunConfig;
use crate::console::Console;
use crate::error::{Error, Result};
use crate::module::{ModuleExports, ModuleResolver};
use crate::output::Destination;

/// A place a document was delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Console,
    File(PathBuf),
    Command(String),
}

/// How the command stage of a run went.
#[derive(Debug)]
pub enum CommandStatus {
    /// No command configured.
    Skipped,
    Succeeded,
    /// Reported, but earlier deliveries of the same run still stand.
    Failed(Error),
}

/// Result of a run that got as far as producing a document.
#[derive(Debug)]
pub struct RunOutcome {
    /// The serialized JSON Schema document
    pub document: String,
    /// Sinks that received the document
    pub sinks: Vec<Sink>,
    pub command: CommandStatus,
    /// Files the input module imported, direct or transitive
    pub dependencies: Vec<PathBuf>,
}

/// Select the schema export from a module.
pub fn extract<'a>(exports: &'a ModuleExports, config: &RunConfig) -> Result<&'a Value> {
    exports
        .get(&config.export)
        .ok_or_else(|| Error::ExportNotFound {
            export: config.export.clone(),
            path: config.input.clone(),
            available: exports.names(),
        })
}

/// Serialize a JSON Schema document with two-space indentation.
pub fn serialize(schema: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(schema)?)
}

/// One full extraction run, repeatable any number of times.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<RunConfig>,
    resolver: Arc<dyn ModuleResolver>,
    console: Console,
}

impl Pipeline {
    pub fn new(config: RunConfig, resolver: Arc<dyn ModuleResolver>, console: Console) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            console,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Execute one run.
    ///
    /// Any failure before delivery aborts the rest of the run and is returned.
    /// A failing command is reported on the diagnostic stream and recorded in
    /// the outcome instead, since the file or stdout delivery already happened.
    pub async fn run(&self) -> Result<RunOutcome> {
        let module = self.resolver.load(&self.config.input).await?;
        let description = extract(&module.exports, &self.config)?;
        let schema = schemex_convert::convert(description)?;
        let document = serialize(&schema)?;
        tracing::debug!(
            input = %self.config.input.display(),
            export = %self.config.export,
            bytes = document.len(),
            "schema converted"
        );

        let mut sinks = Vec::new();
        let destination = Destination::for_config(&self.config);
        if destination.deliver(&document, &self.console).await? {
            sinks.push(match destination {
                Destination::File(path) => Sink::File(path),
                _ => Sink::Console,
            });
        }

        let command = match &self.config.exec {
            None => CommandStatus::Skipped,
            Some(command) => match CommandDelivery::new(command.as_str()).deliver(&document).await {
                Ok(()) => {
                    sinks.push(Sink::Command(command.clone()));
                    CommandStatus::Succeeded
                }
                Err(e) => {
                    self.console.diagnostic(format!("Error executing command: {}", e));
                    CommandStatus::Failed(e)
                }
            },
        };

        Ok(RunOutcome {
            document,
            sinks,
            command,
            dependencies: module.dependencies,
        })
    }
}
