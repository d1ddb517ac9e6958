//! Tests for the refresh coordinator, run on a paused tokio clock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use slot_engine::clock::FixedClock;
use slot_engine::config::{RefreshConfig, SnapshotPolicy};
use slot_engine::error::{RefreshError, SourceError};
use slot_engine::payload::RawSchedulePayload;
use slot_engine::refresh::{
    BoxFuture, JsonFileSource, RefreshCoordinator, ScheduleSource, StaticSource,
};
use slot_engine::session::{CalendarSession, LoadState};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock() -> FixedClock {
    FixedClock(ymd(2023, 9, 1))
}

fn daily(dates: &[&str]) -> RawSchedulePayload {
    let planning: BTreeMap<String, Vec<String>> = dates
        .iter()
        .map(|d| (d.to_string(), vec!["12:00".to_string()]))
        .collect();
    RawSchedulePayload {
        daily_planning: Some(planning),
        duration_session: 60.0,
        ..Default::default()
    }
}

/// Replays a fixed script of responses; the last one repeats forever.
struct ScriptedSource {
    script: Vec<Result<RawSchedulePayload, String>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<RawSchedulePayload, String>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl ScheduleSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self) -> BoxFuture<'_, Result<RawSchedulePayload, SourceError>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.script[index.min(self.script.len() - 1)].clone();
        Box::pin(async move { response.map_err(SourceError::Unavailable) })
    }
}

fn config() -> RefreshConfig {
    RefreshConfig::new(Duration::from_secs(5)).with_backoff(
        Duration::from_secs(1),
        Duration::from_secs(10),
        2.0,
    )
}

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

// ── Publishing ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_snapshot_arrives_asynchronously() {
    let source = StaticSource::new(daily(&["27/09/2023"]));
    let handle = RefreshCoordinator::new(source, clock(), config()).spawn();
    assert!(handle.latest().is_none());

    let snapshot = handle.first_snapshot().await.expect("snapshot published");
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.horizon.start, ymd(2023, 9, 27));
    assert!(snapshot.resolver().is_selectable(ymd(2023, 9, 27)));
}

#[tokio::test(start_paused = true)]
async fn latest_policy_replaces_snapshot() {
    let (source, _) = ScriptedSource::new(vec![
        Ok(daily(&["27/09/2023"])),
        Ok(daily(&["27/09/2023", "28/09/2023"])),
    ]);
    let handle = RefreshCoordinator::new(source, clock(), config()).spawn();

    let mut rx = handle.subscribe();
    let second = rx
        .wait_for(|slot| slot.as_ref().is_some_and(|s| s.generation == 2))
        .await
        .unwrap()
        .clone()
        .unwrap();
    assert!(second.resolver().is_selectable(ymd(2023, 9, 28)));
    assert_eq!(handle.status().await.published, 2);
}

#[tokio::test(start_paused = true)]
async fn unchanged_schedule_is_not_republished() {
    let source = StaticSource::new(daily(&["27/09/2023"]));
    let handle = RefreshCoordinator::new(source, clock(), config()).spawn();
    handle.first_snapshot().await.unwrap();

    tokio::time::sleep(Duration::from_secs(21)).await;
    let status = handle.status().await;
    assert!(status.attempts >= 4, "attempts = {}", status.attempts);
    assert_eq!(status.published, 1);
    assert_eq!(handle.latest().unwrap().generation, 1);
}

#[tokio::test(start_paused = true)]
async fn first_only_policy_stops_after_first_snapshot() {
    let (source, calls) = ScriptedSource::new(vec![
        Ok(daily(&["27/09/2023"])),
        Ok(daily(&["27/09/2023", "28/09/2023"])),
    ]);
    let config = config().with_policy(SnapshotPolicy::FirstOnly);
    let handle = RefreshCoordinator::new(source, clock(), config).spawn();
    handle.first_snapshot().await.unwrap();

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handle.is_stopped());

    let latest = handle.latest().unwrap();
    assert_eq!(latest.generation, 1);
    assert!(!latest.resolver().is_selectable(ymd(2023, 9, 28)));
    assert_eq!(handle.status().await.published, 1);
}

#[tokio::test(start_paused = true)]
async fn first_only_policy_keeps_retrying_until_first_success() {
    let (source, calls) = ScriptedSource::new(vec![
        Err("upstream down".to_string()),
        Ok(daily(&["27/09/2023"])),
    ]);
    let config = config().with_policy(SnapshotPolicy::FirstOnly);
    let handle = RefreshCoordinator::new(source, clock(), config).spawn();

    let snapshot = handle.first_snapshot().await.unwrap();
    assert_eq!(snapshot.generation, 1);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ── Failures ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn fetch_failure_keeps_previous_snapshot_and_backs_off() {
    let (source, _) = ScriptedSource::new(vec![
        Ok(daily(&["27/09/2023"])),
        Err("upstream down".to_string()),
        Ok(daily(&["27/09/2023", "28/09/2023"])),
    ]);
    let handle = RefreshCoordinator::new(source, clock(), config()).spawn();
    handle.first_snapshot().await.unwrap();

    // Second attempt at t=5s fails; the retry comes 1s later, not 5s.
    tokio::time::sleep(Duration::from_millis(5500)).await;
    let status = handle.status().await;
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_error.as_deref().unwrap().contains("upstream down"));
    assert_eq!(handle.latest().unwrap().generation, 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let status = handle.status().await;
    assert_eq!(status.consecutive_failures, 0);
    assert!(status.last_error.is_none());
    assert_eq!(handle.latest().unwrap().generation, 2);
}

#[tokio::test(start_paused = true)]
async fn invalid_payload_is_a_failure_not_an_empty_schedule() {
    let invalid = RawSchedulePayload {
        planning_option: Some(9),
        duration_session: 60.0,
        ..Default::default()
    };
    let handle = RefreshCoordinator::new(StaticSource::new(invalid), clock(), config()).spawn();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let status = handle.status().await;
    assert_eq!(status.attempts, 1);
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_error.unwrap().contains("invalid schedule"));
    assert!(handle.latest().is_none());
}

#[tokio::test(start_paused = true)]
async fn changed_yields_each_new_snapshot_once() {
    let (source, _) = ScriptedSource::new(vec![
        Ok(daily(&["27/09/2023"])),
        Ok(daily(&["27/09/2023", "28/09/2023"])),
    ]);
    let mut handle = RefreshCoordinator::new(source, clock(), config()).spawn();

    let first = handle.changed().await.expect("first snapshot");
    assert_eq!(first.generation, 1);
    let second = handle.changed().await.expect("second snapshot");
    assert_eq!(second.generation, 2);

    handle.stop().await;
    assert!(handle.changed().await.is_none());
}

// ── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn session_follows_published_snapshots_and_drops_stale_selection() {
    let (source, _) = ScriptedSource::new(vec![
        Ok(daily(&["27/09/2023"])),
        Ok(daily(&["27/09/2023", "28/09/2023"])),
    ]);
    let handle = RefreshCoordinator::new(source, clock(), config()).spawn();
    let mut snapshots = handle.subscribe();
    let mut session = CalendarSession::default();
    session.begin_loading();

    assert_eq!(session.follow(&mut snapshots).await, Some(1));
    assert_eq!(session.state(), &LoadState::Loaded);
    assert!(!session.is_selectable(ymd(2023, 9, 28)));
    assert_eq!(session.toggle(ymd(2023, 9, 27)), Some(ymd(2023, 9, 27)));

    assert_eq!(session.follow(&mut snapshots).await, Some(2));
    assert_eq!(session.selected(), None);
    assert!(session.is_selectable(ymd(2023, 9, 28)));

    handle.stop().await;
    assert_eq!(session.follow(&mut snapshots).await, None);
    assert_eq!(session.snapshot().unwrap().generation, 2);
}

#[tokio::test(start_paused = true)]
async fn session_picks_up_snapshot_published_before_following() {
    let source = StaticSource::new(daily(&["27/09/2023"]));
    let handle = RefreshCoordinator::new(source, clock(), config()).spawn();
    let mut snapshots = handle.subscribe();
    handle.first_snapshot().await.unwrap();

    let mut session = CalendarSession::default();
    assert_eq!(session.follow(&mut snapshots).await, Some(1));
    assert!(session.is_selectable(ymd(2023, 9, 27)));
}

// ── Commands ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn refresh_now_skips_the_wait() {
    let config = RefreshConfig::new(Duration::from_secs(60));
    let (source, calls) = ScriptedSource::new(vec![Ok(daily(&["27/09/2023"]))]);
    let handle = RefreshCoordinator::new(source, clock(), config).spawn();
    handle.first_snapshot().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(handle.refresh_now().await);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_halts_fetching_and_keeps_snapshot_valid() {
    let (source, calls) = ScriptedSource::new(vec![Ok(daily(&["27/09/2023"]))]);
    let handle = RefreshCoordinator::new(source, clock(), config()).spawn();
    let snapshot = handle.first_snapshot().await.unwrap();

    assert!(handle.stop().await);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handle.is_stopped());
    assert!(!handle.refresh_now().await);
    assert!(snapshot.resolver().is_selectable(ymd(2023, 9, 27)));
}

// ── File source ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn json_file_source_builds_snapshot() {
    let source = JsonFileSource::new(fixture("daily.json"));
    let coordinator = RefreshCoordinator::new(source, clock(), config());

    let snapshot = coordinator.refresh_once(1).await.unwrap();
    assert_eq!(snapshot.horizon.start, ymd(2023, 9, 26));
    assert_eq!(snapshot.horizon.end, ymd(2023, 12, 30));
    assert_eq!(snapshot.resolver().remaining_slots(ymd(2023, 9, 27)), 1);
}

#[tokio::test]
async fn missing_file_is_an_io_failure() {
    let source = JsonFileSource::new(fixture("does-not-exist.json"));
    let coordinator = RefreshCoordinator::new(source, clock(), config());

    let err = coordinator.refresh_once(1).await.unwrap_err();
    assert!(matches!(err, RefreshError::Fetch(SourceError::Io(_))));
}
