//! Idle monitor behaviour under a paused Tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildport_idle::{
    IdleConfig, IdleError, IdleMonitor, IdleMonitorHandle, IdleState, Interaction, LogoutHook,
    LogoutReason, MAX_TIMEOUT_MINUTES,
};
use tokio::time::sleep;

const MINUTE: Duration = Duration::from_secs(60);
const EPSILON: Duration = Duration::from_millis(1);

#[derive(Clone, Default)]
struct RecordingHook {
    calls: Arc<Mutex<Vec<LogoutReason>>>,
}

impl RecordingHook {
    fn calls(&self) -> Vec<LogoutReason> {
        self.calls.lock().unwrap().clone()
    }
}

impl LogoutHook for RecordingHook {
    async fn on_logout(&self, reason: LogoutReason) {
        self.calls.lock().unwrap().push(reason);
    }
}

fn start(minutes: i64) -> (IdleMonitorHandle, RecordingHook) {
    let hook = RecordingHook::default();
    let handle = IdleMonitor::start(IdleConfig::with_timeout_minutes(minutes), hook.clone());
    (handle, hook)
}

// =========================================================================
// Inactivity
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_warning_appears_after_timeout_with_full_countdown() {
    let (handle, hook) = start(30);

    sleep(MINUTE * 30 - EPSILON).await;
    assert_eq!(handle.snapshot().state, IdleState::Active);

    sleep(EPSILON * 2).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, IdleState::Warning);
    assert_eq!(snapshot.countdown_label().as_deref(), Some("2:00"));
    assert!(hook.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_activity_resets_inactivity_timer() {
    let (handle, _hook) = start(30);

    sleep(MINUTE * 20).await;
    handle.record_activity(Interaction::PointerMove).await.unwrap();

    sleep(MINUTE * 29).await;
    assert_eq!(handle.snapshot().state, IdleState::Active, "49 minutes in, 29 idle");

    sleep(MINUTE + EPSILON).await;
    assert_eq!(handle.snapshot().state, IdleState::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_every_tracked_interaction_counts() {
    let (handle, _hook) = start(1);

    for interaction in buildport_idle::TRACKED_INTERACTIONS {
        sleep(Duration::from_secs(50)).await;
        handle.try_record_activity(interaction).unwrap();
    }

    sleep(Duration::from_secs(50)).await;
    assert_eq!(handle.snapshot().state, IdleState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_behaves_as_one_minute() {
    let (handle, _hook) = start(0);

    sleep(MINUTE - EPSILON).await;
    assert_eq!(handle.snapshot().state, IdleState::Active);

    sleep(EPSILON * 2).await;
    assert_eq!(handle.snapshot().state, IdleState::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_huge_timeout_is_capped_instead_of_crashing_the_monitor() {
    let (handle, hook) = start(i64::MAX);
    let thirty_days = MINUTE * MAX_TIMEOUT_MINUTES as u32;

    sleep(MINUTE * 60).await;
    assert!(handle.is_running());
    assert_eq!(handle.snapshot().state, IdleState::Active);

    sleep(thirty_days - MINUTE * 60 - EPSILON).await;
    assert_eq!(handle.snapshot().state, IdleState::Active);

    sleep(EPSILON * 2).await;
    assert_eq!(handle.snapshot().state, IdleState::Warning);
    assert!(hook.calls().is_empty());
}

// =========================================================================
// Warning
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_activity_during_warning_does_not_dismiss_it() {
    let (handle, _hook) = start(1);
    sleep(MINUTE + EPSILON).await;

    handle.record_activity(Interaction::KeyDown).await.unwrap();
    handle.record_activity(Interaction::Click).await.unwrap();
    sleep(Duration::from_secs(10)).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, IdleState::Warning);
    assert_eq!(snapshot.remaining_secs, Some(110));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_expiry_logs_out_exactly_once() {
    let (handle, hook) = start(30);
    sleep(MINUTE * 30 + EPSILON).await;

    sleep(Duration::from_secs(119)).await;
    assert_eq!(handle.snapshot().countdown_label().as_deref(), Some("0:01"));
    assert!(hook.calls().is_empty());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.snapshot().state, IdleState::Terminated);
    assert_eq!(hook.calls(), vec![LogoutReason::IdleExpired]);

    sleep(MINUTE * 120).await;
    assert_eq!(hook.calls().len(), 1);
    assert!(!handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_stay_dismisses_warning_and_restarts_timer() {
    let (handle, hook) = start(30);
    sleep(MINUTE * 30 + EPSILON).await;
    sleep(Duration::from_secs(45)).await;

    let snapshot = handle.stay().await.unwrap();
    assert_eq!(snapshot.state, IdleState::Active);
    assert!(!snapshot.warning_visible());

    sleep(MINUTE * 30 - EPSILON).await;
    assert_eq!(handle.snapshot().state, IdleState::Active);

    sleep(EPSILON * 2).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, IdleState::Warning);
    assert_eq!(snapshot.countdown_label().as_deref(), Some("2:00"));
    assert!(hook.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logout_now_ends_session_as_user_requested() {
    let (handle, hook) = start(30);
    sleep(MINUTE * 30 + EPSILON).await;

    let snapshot = handle.force_logout().await.unwrap();

    assert_eq!(snapshot.state, IdleState::Terminated);
    assert_eq!(hook.calls(), vec![LogoutReason::UserRequested]);

    sleep(MINUTE * 5).await;
    assert_eq!(hook.calls().len(), 1, "countdown must not fire after logout");
}

#[tokio::test(start_paused = true)]
async fn test_force_idle_shows_warning_immediately() {
    let hook = RecordingHook::default();
    let config = IdleConfig {
        force_idle: true,
        ..IdleConfig::with_timeout_minutes(30)
    };
    let handle = IdleMonitor::start(config, hook.clone());

    let snapshot = handle.wait_for(|s| s.warning_visible()).await.unwrap();

    assert_eq!(snapshot.countdown_label().as_deref(), Some("2:00"));
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_dispose_during_warning_never_logs_out() {
    let (handle, hook) = start(1);
    sleep(MINUTE + EPSILON).await;

    let snapshot = handle.dispose().await.unwrap();
    assert_eq!(snapshot.state, IdleState::Disposed);

    sleep(MINUTE * 60).await;
    assert!(hook.calls().is_empty());
    assert_eq!(
        handle.record_activity(Interaction::Click).await,
        Err(IdleError::Stopped)
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropping_all_handles_disposes_monitor() {
    let (handle, hook) = start(1);
    let watcher = handle.subscribe();
    drop(handle);

    sleep(MINUTE * 10).await;

    assert_eq!(watcher.borrow().state, IdleState::Disposed);
    assert!(hook.calls().is_empty());
}
