//! Routing of serialized documents to stdout or a file

use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::console::Console;
use crate::error::{Error, Result};

/// Where a document goes, apart from any command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Printed to stdout followed by a newline.
    Console,
    /// Written verbatim to a file.
    File(PathBuf),
    /// Only the command receives the document.
    Nowhere,
}

impl Destination {
    /// An output path always wins; stdout is used only when there is neither
    /// an output path nor a command.
    pub fn for_config(config: &RunConfig) -> Self {
        match (&config.output, &config.exec) {
            (Some(path), _) => Destination::File(path.clone()),
            (None, None) => Destination::Console,
            (None, Some(_)) => Destination::Nowhere,
        }
    }

    /// Deliver `document`, returning whether anything was written.
    pub async fn deliver(&self, document: &str, console: &Console) -> Result<bool> {
        match self {
            Destination::Console => {
                console
                    .write_out(&format!("{}\n", document))
                    .map_err(Error::Stdout)?;
                Ok(true)
            }
            Destination::File(path) => {
                write_file(path, document).await?;
                console.diagnostic(format!("Extracted schema saved to {}", path.display()));
                Ok(true)
            }
            Destination::Nowhere => Ok(false),
        }
    }
}

async fn write_file(path: &Path, document: &str) -> Result<()> {
    tokio::fs::write(path, document)
        .await
        .map_err(|source| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        })
}
