//! schemex CLI

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use schemex::{
    Console, FsModuleResolver, Pipeline, RunConfig, WatchOptions, WatchSession, WatchTarget,
    DEFAULT_EXPORT,
};

#[derive(Parser, Debug)]
#[command(name = "schemex")]
#[command(about = "Extract a schema from a declarative module as JSON Schema")]
#[command(version)]
struct Args {
    /// Module containing the schema
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// File to write the JSON Schema to. Prints to stdout when omitted
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Name of the exported schema. Leave empty for the default export
    #[arg(
        short,
        long,
        value_name = "NAME",
        num_args = 0..=1,
        default_value = DEFAULT_EXPORT,
        default_missing_value = DEFAULT_EXPORT
    )]
    schema: String,

    /// Watch a file or directory and re-run on changes. Leave empty to watch the input
    #[arg(short, long, value_name = "DIRECTORY", num_args = 0..=1, default_missing_value = "")]
    watch: Option<String>,

    /// Shell command receiving the JSON Schema on stdin after each run
    #[arg(short = 'x', long, value_name = "COMMAND")]
    exec: Option<String>,

    /// Watch poll interval in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100)]
    poll_interval: u64,

    /// How long a changed file must stay untouched before a run, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    stability_threshold: u64,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig::new(&self.input).export(&self.schema);
        if let Some(output) = &self.output {
            config = config.output(output);
        }
        if let Some(watch) = &self.watch {
            config = config.watch(WatchTarget::from_arg(watch));
        }
        if let Some(exec) = &self.exec {
            config = config.exec(exec);
        }
        config
    }

    fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            poll_interval: Duration::from_millis(self.poll_interval),
            stability_threshold: Duration::from_millis(self.stability_threshold),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cwd = std::env::current_dir().context("failed to determine the working directory")?;
    let config = args.run_config().absolutize(&cwd);
    let watch_path = config.watch_path().map(PathBuf::from);
    tracing::debug!(?config, "starting");

    let console = Console::new();
    let pipeline = Pipeline::new(config, Arc::new(FsModuleResolver::new()), console.clone());

    let Some(target) = watch_path else {
        if let Err(e) = pipeline.run().await {
            console.diagnostic(format!("Error: {}", e));
            process::exit(1);
        }
        return Ok(());
    };

    let session = WatchSession::start(pipeline, target, args.watch_options()).await;
    let state = session
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    tracing::debug!(?state, "exiting");

    Ok(())
}
