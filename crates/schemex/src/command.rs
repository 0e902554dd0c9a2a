//! Delivery of documents to a shell command's stdin.

use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

/// A shell command that receives each document on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDelivery {
    command: String,
}

impl CommandDelivery {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Run the command, feed it `document` and wait for it to exit.
    ///
    /// The child's stdout and stderr are inherited. Only a zero exit status
    /// counts as success.
    pub async fn deliver(&self, document: &str) -> Result<()> {
        let mut child = shell(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::CommandSpawn {
                command: self.command.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading stdin is judged by its status
            match stdin.write_all(document.as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!(command = %self.command, "command closed stdin early");
                }
                Err(source) => {
                    return Err(Error::CommandSpawn {
                        command: self.command.clone(),
                        source,
                    })
                }
            }
            // Dropping stdin closes the pipe
        }

        let status = child.wait().await.map_err(|source| Error::CommandSpawn {
            command: self.command.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                command: self.command.clone(),
                code: status.code(),
            })
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
