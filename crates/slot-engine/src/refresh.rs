//! Background refresh of the schedule.
//!
//! A [`RefreshCoordinator`] polls a [`ScheduleSource`], validates each raw
//! payload into a [`ScheduleModel`], computes its horizon and publishes the
//! result as an `Arc<ScheduleSnapshot>` on a `watch` channel. Readers either
//! hold the previous snapshot or the new one; nothing is ever updated in
//! place.
//!
//! Failed fetches publish nothing. The last good snapshot stays current and
//! the loop backs off exponentially until the source recovers.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::config::{RefreshConfig, SnapshotPolicy};
use crate::error::{RefreshError, SourceError};
use crate::horizon::DEFAULT_ROLLING_YEARS;
use crate::payload::RawSchedulePayload;
use crate::schedule::ScheduleModel;
use crate::session::ScheduleSnapshot;

/// Boxed future returned by [`ScheduleSource`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where raw schedule payloads come from.
pub trait ScheduleSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn fetch(&self) -> BoxFuture<'_, Result<RawSchedulePayload, SourceError>>;
}

/// Reads a JSON payload file on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScheduleSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    fn fetch(&self) -> BoxFuture<'_, Result<RawSchedulePayload, SourceError>> {
        Box::pin(async move {
            let raw = tokio::fs::read_to_string(&self.path).await?;
            Ok(serde_json::from_str(&raw)?)
        })
    }
}

/// Always returns the same payload.
#[derive(Debug, Clone)]
pub struct StaticSource {
    payload: RawSchedulePayload,
}

impl StaticSource {
    pub fn new(payload: RawSchedulePayload) -> Self {
        Self { payload }
    }
}

impl ScheduleSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self) -> BoxFuture<'_, Result<RawSchedulePayload, SourceError>> {
        let payload = self.payload.clone();
        Box::pin(async move { Ok(payload) })
    }
}

/// Counters and last outcome of the refresh loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshStatus {
    pub attempts: u64,
    /// Snapshots actually published (identical or policy-dropped ones excluded).
    pub published: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

impl RefreshStatus {
    fn record_success(&mut self, published: bool) {
        self.consecutive_failures = 0;
        self.last_error = None;
        self.last_success = Some(Utc::now());
        if published {
            self.published += 1;
        }
    }

    fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshCommand {
    RefreshNow,
    Stop,
}

type SnapshotSlot = Option<Arc<ScheduleSnapshot>>;

/// Polls a source and publishes schedule snapshots.
pub struct RefreshCoordinator<S, C> {
    source: S,
    clock: C,
    config: RefreshConfig,
    rolling_years: u32,
}

impl<S, C> RefreshCoordinator<S, C>
where
    S: ScheduleSource + 'static,
    C: Clock + 'static,
{
    pub fn new(source: S, clock: C, config: RefreshConfig) -> Self {
        Self {
            source,
            clock,
            config,
            rolling_years: DEFAULT_ROLLING_YEARS,
        }
    }

    #[must_use]
    pub fn with_rolling_years(mut self, years: u32) -> Self {
        self.rolling_years = years;
        self
    }

    /// Fetch and validate one payload without publishing it.
    pub async fn refresh_once(&self, generation: u64) -> Result<ScheduleSnapshot, RefreshError> {
        let payload = self.source.fetch().await?;
        let model = ScheduleModel::try_from(payload)?;
        Ok(ScheduleSnapshot::with_rolling_years(
            model,
            self.clock.today(),
            self.rolling_years,
            generation,
        ))
    }

    /// Start the loop on the current tokio runtime.
    ///
    /// The loop stops on [`RefreshHandle::stop`], once every handle has been
    /// dropped, or right after the first snapshot under
    /// [`SnapshotPolicy::FirstOnly`].
    pub fn spawn(self) -> RefreshHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(8);
        let status = Arc::new(RwLock::new(RefreshStatus::default()));

        tokio::spawn(self.run(snapshot_tx, command_rx, status.clone()));

        RefreshHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            status,
        }
    }

    async fn run(
        self,
        snapshots: watch::Sender<SnapshotSlot>,
        mut commands: mpsc::Receiver<RefreshCommand>,
        status: Arc<RwLock<RefreshStatus>>,
    ) {
        info!(
            source = self.source.name(),
            interval_ms = self.config.interval.as_millis() as u64,
            policy = ?self.config.policy,
            "refresh coordinator started"
        );
        let mut generation = 0u64;

        loop {
            self.attempt(&snapshots, &status, &mut generation).await;

            if self.config.policy == SnapshotPolicy::FirstOnly && snapshots.borrow().is_some() {
                info!("first snapshot published; first-only policy stops polling");
                break;
            }

            let failures = status.read().await.consecutive_failures;
            let delay = self.config.next_delay(failures);
            debug!(delay_ms = delay.as_millis() as u64, failures, "scheduling next refresh");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                command = commands.recv() => match command {
                    Some(RefreshCommand::RefreshNow) => debug!("refresh requested"),
                    Some(RefreshCommand::Stop) | None => break,
                },
            }
        }

        info!(source = self.source.name(), "refresh coordinator stopped");
    }

    async fn attempt(
        &self,
        snapshots: &watch::Sender<SnapshotSlot>,
        status: &RwLock<RefreshStatus>,
        generation: &mut u64,
    ) {
        status.write().await.attempts += 1;

        let snapshot = match self.refresh_once(*generation + 1).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(source = self.source.name(), error = %err, "schedule refresh failed");
                status.write().await.record_failure(err.to_string());
                return;
            }
        };

        let publish = {
            let current = snapshots.borrow();
            match (&*current, self.config.policy) {
                (None, _) => true,
                (Some(_), SnapshotPolicy::FirstOnly) => false,
                (Some(previous), SnapshotPolicy::Latest) => {
                    let changed = previous.model != snapshot.model
                        || previous.horizon != snapshot.horizon;
                    if !changed {
                        trace!("schedule unchanged; keeping current snapshot");
                    }
                    changed
                }
            }
        };

        status.write().await.record_success(publish);
        if publish {
            *generation += 1;
            info!(
                generation = *generation,
                start = %snapshot.horizon.start,
                end = %snapshot.horizon.end,
                "publishing schedule snapshot"
            );
            snapshots.send_replace(Some(Arc::new(snapshot)));
        }
    }
}

/// Handle to a running [`RefreshCoordinator`].
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    commands: mpsc::Sender<RefreshCommand>,
    snapshots: watch::Receiver<SnapshotSlot>,
    status: Arc<RwLock<RefreshStatus>>,
}

impl RefreshHandle {
    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SnapshotSlot> {
        self.snapshots.clone()
    }

    /// The snapshot currently published, if any.
    pub fn latest(&self) -> SnapshotSlot {
        self.snapshots.borrow().clone()
    }

    /// Wait for the first snapshot. `None` if the loop ended before one was
    /// published.
    pub async fn first_snapshot(&self) -> SnapshotSlot {
        let mut rx = self.snapshots.clone();
        let result = rx.wait_for(Option::is_some).await;
        result.ok().and_then(|slot| slot.clone())
    }

    /// Wait for the next snapshot this handle has not seen yet. `None` once
    /// the loop has ended.
    pub async fn changed(&mut self) -> SnapshotSlot {
        match self.snapshots.changed().await {
            Ok(()) => self.snapshots.borrow_and_update().clone(),
            Err(_) => None,
        }
    }

    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }

    /// Skip the remaining wait and fetch immediately.
    pub async fn refresh_now(&self) -> bool {
        self.commands.send(RefreshCommand::RefreshNow).await.is_ok()
    }

    /// Stop the loop. Snapshots already handed out stay valid.
    pub async fn stop(&self) -> bool {
        self.commands.send(RefreshCommand::Stop).await.is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
    }
}
