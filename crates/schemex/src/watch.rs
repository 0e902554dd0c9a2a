//! Watch mode: re-run the pipeline whenever the watched path changes.
//!
//! Change events are produced by a polling watcher on its own thread and
//! queued into a channel. The session consumes them one at a time, so runs
//! never overlap. A change arriving during a run waits for that run to finish
//! and then gets a run of its own; notifications for a file that arrive while
//! it is still settling belong to the same write and are merged.
//!
//! Only modifications of existing files count as changes. Created files and
//! directory timestamp updates are ignored.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::{WatchOptions, WatchTarget};
use crate::error::{Error, Result};
use crate::pipeline::{Pipeline, RunOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for the next change.
    Idle,
    /// A change-triggered run is in progress.
    Running,
    /// The subscription failed; further events are ignored.
    Stopped,
}

/// Something the filesystem subscription reported.
#[derive(Debug)]
pub enum WatchEvent {
    Changed(PathBuf),
    Error(Error),
}

/// A watch subscription and the runs it triggers.
pub struct WatchSession {
    pipeline: Pipeline,
    target: PathBuf,
    options: WatchOptions,
    state: WatchState,
    events: UnboundedReceiver<WatchEvent>,
    /// Events taken off the channel while merging, still to be handled
    pending: VecDeque<WatchEvent>,
    /// Kept alive for as long as the session; dropping it ends polling.
    watcher: Option<PollWatcher>,
    /// Imported files currently added to the watcher
    dependencies: HashSet<PathBuf>,
}

impl WatchSession {
    /// Run the pipeline once, then start watching `target`.
    ///
    /// The startup run completes before any change is processed. Its failure
    /// is reported like any other run failure. When the input module itself
    /// is watched, the files it imports are watched as well.
    pub async fn start(pipeline: Pipeline, target: impl Into<PathBuf>, options: WatchOptions) -> Self {
        let target = target.into();
        tracing::debug!(
            input = %pipeline.config().input.display(),
            target = %target.display(),
            ?options,
            "starting watch session"
        );
        let result = pipeline.run().await;
        report_failure(&pipeline, &result);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = Self::with_events(pipeline, target, options, rx);

        match subscribe(&session.target, options, tx) {
            Ok(watcher) => {
                session.watcher = Some(watcher);
                if let Ok(outcome) = &result {
                    session.follow_dependencies(outcome);
                }
                session.announce();
            }
            Err(e) => session.stop(e),
        }

        session
    }

    /// A session fed by an existing event channel instead of a filesystem
    /// subscription. No startup run is performed.
    pub fn with_events(
        pipeline: Pipeline,
        target: impl Into<PathBuf>,
        options: WatchOptions,
        events: UnboundedReceiver<WatchEvent>,
    ) -> Self {
        Self {
            pipeline,
            target: target.into(),
            options,
            state: WatchState::Idle,
            events,
            pending: VecDeque::new(),
            watcher: None,
            dependencies: HashSet::new(),
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Imported files being watched alongside the target.
    pub fn dependencies(&self) -> impl Iterator<Item = &Path> {
        self.dependencies.iter().map(PathBuf::as_path)
    }

    /// Process events until `shutdown` resolves or the event channel closes.
    ///
    /// Returns the state the session ended in.
    pub async fn run<F>(mut self, shutdown: F) -> WatchState
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let event = match self.pending.pop_front() {
                Some(event) => Some(event),
                None => tokio::select! {
                    biased;
                    event = self.events.recv() => event,
                    _ = &mut shutdown => break,
                },
            };

            match event {
                Some(WatchEvent::Changed(path)) => self.on_change(&path).await,
                Some(WatchEvent::Error(e)) => self.stop(e),
                None => break,
            }
        }

        tracing::debug!(state = ?self.state, active = self.watcher.is_some(), "watch session ended");
        self.state
    }

    async fn on_change(&mut self, path: &Path) {
        if self.state == WatchState::Stopped {
            tracing::debug!(path = %path.display(), "ignoring change, watcher stopped");
            return;
        }

        self.state = WatchState::Running;
        let started = Instant::now();
        self.pipeline
            .console()
            .diagnostic(format!("File {} has been changed. Processing...", path.display()));

        await_write_finish(path, self.options).await;
        self.merge_pending(path);

        let result = self.pipeline.run().await;
        report_failure(&self.pipeline, &result);
        if let Ok(outcome) = &result {
            self.follow_dependencies(outcome);
        }

        let elapsed = started.elapsed().as_millis();
        self.pipeline
            .console()
            .diagnostic(format!("Update completed in {} ms.", elapsed));
        self.announce();
        self.state = WatchState::Idle;
    }

    /// Drop queued notifications for `path`; the write they report has settled.
    fn merge_pending(&mut self, path: &Path) {
        let before = self.pending.len();
        self.pending
            .retain(|event| !matches!(event, WatchEvent::Changed(queued) if queued == path));
        let mut merged = before - self.pending.len();

        while let Ok(event) = self.events.try_recv() {
            match event {
                WatchEvent::Changed(queued) if queued == path => merged += 1,
                other => self.pending.push_back(other),
            }
        }

        if merged > 0 {
            tracing::debug!(path = %path.display(), merged, "merged notifications for one write");
        }
    }

    /// Track the input's imports when the input itself is the watch target.
    fn follow_dependencies(&mut self, outcome: &RunOutcome) {
        if self.pipeline.config().watch != Some(WatchTarget::Input) {
            return;
        }
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };

        let current: HashSet<PathBuf> = outcome.dependencies.iter().cloned().collect();
        for stale in self.dependencies.difference(&current) {
            if let Err(e) = watcher.unwatch(stale) {
                tracing::debug!(path = %stale.display(), error = %e, "cannot unwatch dependency");
            }
        }
        for added in current.difference(&self.dependencies) {
            tracing::debug!(path = %added.display(), "watching dependency");
            if let Err(e) = watcher.watch(added, RecursiveMode::NonRecursive) {
                tracing::warn!(path = %added.display(), error = %e, "cannot watch dependency");
            }
        }
        self.dependencies = current;
    }

    fn stop(&mut self, error: Error) {
        tracing::warn!(error = %error, "watcher failed");
        self.pipeline
            .console()
            .diagnostic(format!("Watcher error: {}", error));
        self.state = WatchState::Stopped;
    }

    fn announce(&self) {
        self.pipeline.console().diagnostic(format!(
            "Watching for changes in {} and its dependencies...",
            self.target.display()
        ));
    }
}

fn report_failure(pipeline: &Pipeline, result: &Result<RunOutcome>) {
    if let Err(e) = result {
        tracing::debug!(stage = ?e.stage(), "run failed");
        pipeline
            .console()
            .diagnostic(format!("Error processing schema: {}", e));
    }
}

/// Poll settings for `target`.
///
/// Modification times can be too coarse to tell quick successive saves
/// apart, so a single file also has its contents compared. Directories rely
/// on timestamps alone, since hashing a whole tree on every poll is costly.
fn poll_config(target: &Path, options: WatchOptions) -> notify::Config {
    notify::Config::default()
        .with_poll_interval(options.poll_interval)
        .with_compare_contents(target.is_file())
}

/// Subscribe to changes below `target` with a polling watcher.
fn subscribe(target: &Path, options: WatchOptions, events: UnboundedSender<WatchEvent>) -> Result<PollWatcher> {
    let mut watcher = PollWatcher::new(
        move |result: notify::Result<Event>| {
            let forwarded: Vec<WatchEvent> = match result {
                Ok(event) => changed_files(&event).map(WatchEvent::Changed).collect(),
                Err(e) => vec![WatchEvent::Error(Error::Watch(e))],
            };
            for event in forwarded {
                // The session is gone once the receiver is dropped
                let _ = events.send(event);
            }
        },
        poll_config(target, options),
    )?;

    watcher.watch(target, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Files whose contents an event reports as modified.
fn changed_files(event: &Event) -> impl Iterator<Item = PathBuf> + '_ {
    let modified = matches!(event.kind, EventKind::Modify(_));
    event
        .paths
        .iter()
        .filter(move |path| modified && !path.is_dir())
        .cloned()
}

/// Wait until `path` stops changing for the stability threshold.
///
/// Size and modification time are sampled every poll interval. A path that
/// cannot be read counts as stable.
pub async fn await_write_finish(path: &Path, options: WatchOptions) {
    if options.stability_threshold.is_zero() {
        return;
    }

    let mut last = snapshot(path).await;
    let mut stable_since = Instant::now();

    while last.is_some() && stable_since.elapsed() < options.stability_threshold {
        tokio::time::sleep(options.poll_interval).await;
        let current = snapshot(path).await;
        if current != last {
            last = current;
            stable_since = Instant::now();
        }
    }
}

async fn snapshot(path: &Path) -> Option<(u64, Option<SystemTime>)> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some((metadata.len(), metadata.modified().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind};
    use std::time::Duration;
    use tempfile::TempDir;

    fn changed(event: Event) -> Vec<PathBuf> {
        changed_files(&event).collect()
    }

    #[test]
    fn test_only_file_modifications_count() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("schema.json");
        std::fs::write(&file, "{}").unwrap();

        let data = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any))).add_path(file.clone());
        assert_eq!(changed(data), vec![file.clone()]);

        let mtime = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)))
            .add_path(file.clone());
        assert_eq!(changed(mtime), vec![file.clone()]);

        let created = Event::new(EventKind::Create(CreateKind::Any)).add_path(file.clone());
        assert!(changed(created).is_empty());

        let removed = Event::new(EventKind::Remove(RemoveKind::Any)).add_path(file);
        assert!(changed(removed).is_empty());

        // A directory's timestamp moves whenever an entry is added
        let dir_touched = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)))
            .add_path(dir.path().to_path_buf());
        assert!(changed(dir_touched).is_empty());
    }

    #[test]
    fn test_contents_compared_for_single_files_only() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("schema.json");
        std::fs::write(&file, "{}").unwrap();
        let options = WatchOptions::default();

        assert!(poll_config(&file, options).compare_contents());
        assert!(!poll_config(dir.path(), options).compare_contents());
        assert_eq!(poll_config(&file, options).poll_interval_v2(), Some(options.poll_interval));
    }

    #[tokio::test]
    async fn test_write_finish_missing_file_is_immediate() {
        let options = WatchOptions {
            poll_interval: Duration::from_millis(10),
            stability_threshold: Duration::from_secs(30),
        };

        let started = Instant::now();
        await_write_finish(Path::new("/definitely/not/here.json"), options).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_write_finish_waits_for_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "{}").unwrap();
        let options = WatchOptions {
            poll_interval: Duration::from_millis(10),
            stability_threshold: Duration::from_millis(100),
        };

        let started = Instant::now();
        await_write_finish(&path, options).await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
