//! Session operations and the timer refresh task.
//!
//! Orchestrates the `SessionRecorder` state machine against shared state,
//! raises operator notices, and mirrors lifecycle changes to the acquisition
//! server. Server calls are fire-and-forget: a failed mirror never rolls
//! back the local session, it only logs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::acquisition::AcquisitionClient;
use crate::notify::Notifier;
use crate::pipeline::AppState;
use crate::recorder::{RecorderError, StopOutcome};
use crate::types::RecordedPoint;

/// Cadence of the session-timer readout refresh.
pub const TIMER_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Begin a recording session. Requires a live link; otherwise notifies and
/// leaves everything unchanged.
pub async fn start_session(
    state: &Arc<RwLock<AppState>>,
    client: &AcquisitionClient,
    notifier: &dyn Notifier,
) -> Result<(), RecorderError> {
    {
        let mut state = state.write().await;
        let connected = state.connection.is_connected();
        if let Err(e) = state.recorder.start(Instant::now(), connected) {
            notifier.notify("Connect to the acquisition server before recording");
            return Err(e);
        }
    }
    notifier.notify("Recording started");
    if let Err(e) = client.start_test().await {
        tracing::warn!("could not mirror test start to the server: {e}");
    }
    Ok(())
}

/// Freeze the session clock without ending the session.
pub async fn pause_session(state: &Arc<RwLock<AppState>>, notifier: &dyn Notifier) {
    let paused = {
        let mut state = state.write().await;
        let was_running = state.recorder.is_running();
        state.recorder.pause(Instant::now());
        was_running
    };
    if paused {
        notifier.notify("Recording paused");
    }
}

/// Continue a paused session; the timer picks up where it left off.
pub async fn resume_session(state: &Arc<RwLock<AppState>>, notifier: &dyn Notifier) {
    let resumed = {
        let mut state = state.write().await;
        state.recorder.resume(Instant::now());
        state.recorder.is_running()
    };
    if resumed {
        notifier.notify("Recording resumed");
    }
}

/// End the session. Quiet no-op when there is nothing to stop.
pub async fn stop_session(
    state: &Arc<RwLock<AppState>>,
    client: &AcquisitionClient,
    notifier: &dyn Notifier,
) -> StopOutcome {
    let outcome = {
        let mut state = state.write().await;
        state.recorder.stop()
    };
    match outcome {
        StopOutcome::NoOp => {}
        StopOutcome::Stopped { points } => {
            notifier.notify(&format!("Recording stopped: {points} points captured"));
            if let Err(e) = client.stop_test().await {
                tracing::warn!("could not mirror test stop to the server: {e}");
            }
        }
    }
    outcome
}

/// Hand the recorded sequence to the server for export. Returns the server
/// filename when anything was exported.
pub async fn export_session(
    state: &Arc<RwLock<AppState>>,
    client: &AcquisitionClient,
    notifier: &dyn Notifier,
) -> Option<String> {
    let points: Vec<RecordedPoint> = {
        let state = state.read().await;
        state.recorder.points().to_vec()
    };
    if points.is_empty() {
        notifier.notify("No recorded data to export");
        return None;
    }
    match client.export_test(&points).await {
        Ok(filename) => {
            notifier.notify(&format!("Exported {} points to {filename}", points.len()));
            Some(filename)
        }
        Err(e) => {
            notifier.notify(&format!("Export failed: {e}"));
            None
        }
    }
}

/// Drop held points locally and clear the server-side buffers.
pub async fn clear_session(
    state: &Arc<RwLock<AppState>>,
    client: &AcquisitionClient,
    notifier: &dyn Notifier,
) {
    {
        let mut state = state.write().await;
        state.recorder.stop();
        state.recorder.clear();
    }
    match client.clear_data().await {
        Ok(()) => notifier.notify("Data cleared"),
        Err(e) => notifier.notify(&format!("Clear failed: {e}")),
    }
}

/// Periodic refresh of the session elapsed readout, independent of frame
/// arrival so the timer stays live on a quiet link.
pub async fn run_timer_refresh(state: Arc<RwLock<AppState>>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(TIMER_REFRESH_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("timer refresh shutting down");
                return;
            }
            _ = interval.tick() => {}
        }
        let mut state = state.write().await;
        state.recorder.tick(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use crate::pipeline::ConnectionStatus;
    use crate::recorder::RecorderPhase;

    fn test_client() -> AcquisitionClient {
        // Nothing listens here; mirror calls fail fast and are logged only.
        AcquisitionClient::new("http://127.0.0.1:1").unwrap()
    }

    #[tokio::test]
    async fn test_start_while_disconnected_notifies_and_stays_idle() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let notifier = MemoryNotifier::new();

        let result = start_session(&state, &test_client(), &notifier).await;
        assert!(result.is_err());
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(state.read().await.recorder.phase(), RecorderPhase::Idle);
    }

    #[tokio::test]
    async fn test_start_stop_round_trip() {
        let state = Arc::new(RwLock::new(AppState::default()));
        state.write().await.connection = ConnectionStatus::Connected;
        let notifier = MemoryNotifier::new();
        let client = test_client();

        start_session(&state, &client, &notifier).await.unwrap();
        assert!(state.read().await.recorder.is_running());

        let outcome = stop_session(&state, &client, &notifier).await;
        assert_eq!(outcome, StopOutcome::Stopped { points: 0 });
        assert_eq!(state.read().await.recorder.phase(), RecorderPhase::Idle);

        let messages = notifier.messages();
        assert!(messages[0].contains("started"));
        assert!(messages[1].contains("stopped"));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_silent() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let notifier = MemoryNotifier::new();

        let outcome = stop_session(&state, &test_client(), &notifier).await;
        assert_eq!(outcome, StopOutcome::NoOp);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_export_with_no_data_notifies() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let notifier = MemoryNotifier::new();

        let filename = export_session(&state, &test_client(), &notifier).await;
        assert!(filename.is_none());
        assert_eq!(notifier.messages(), vec!["No recorded data to export"]);
    }

    #[tokio::test]
    async fn test_pause_resume_notifications_gated_by_phase() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let notifier = MemoryNotifier::new();

        // Idle: neither pause nor resume says anything.
        pause_session(&state, &notifier).await;
        resume_session(&state, &notifier).await;
        assert!(notifier.messages().is_empty());

        state.write().await.connection = ConnectionStatus::Connected;
        start_session(&state, &test_client(), &notifier).await.unwrap();
        pause_session(&state, &notifier).await;
        assert_eq!(state.read().await.recorder.phase(), RecorderPhase::Paused);
        resume_session(&state, &notifier).await;
        assert!(state.read().await.recorder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_refresh_tracks_virtual_time() {
        let state = Arc::new(RwLock::new(AppState::default()));
        state.write().await.connection = ConnectionStatus::Connected;
        {
            let mut guard = state.write().await;
            let connected = guard.connection.is_connected();
            guard.recorder.start(Instant::now(), connected).unwrap();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_timer_refresh(Arc::clone(&state), cancel.clone()));

        tokio::time::sleep(Duration::from_millis(550)).await;
        cancel.cancel();
        handle.await.unwrap();

        let elapsed = state.read().await.recorder.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed <= Duration::from_millis(700));
    }
}
