mod support;

use imagetrace_client::{ClientError, JobStatus, JobStatusResponse, SubmitResponse};
use imagetrace_core::{AnalysisJobId, HashType, PollingConfig, SimilarityMatrix};
use imagetrace_orchestrator::{
    ChannelListener, FailFastPolicy, JobFailure, JobListener, JobOutcome, JobTracker,
    JobTrackerHandle,
};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use support::{job, sample_matrix, transport_error, RecordingListener, ScriptedBackend, Step};
use tokio::time::sleep;

fn setup() -> (Arc<ScriptedBackend>, Arc<RecordingListener>, JobTracker) {
    let backend = Arc::new(ScriptedBackend::new());
    let listener = Arc::new(RecordingListener::default());
    let tracker = JobTracker::new(backend.clone(), listener.clone(), &PollingConfig::default());
    (backend, listener, tracker)
}

#[tokio::test(start_paused = true)]
async fn running_running_completed_reports_success_once() {
    let (backend, listener, mut tracker) = setup();
    backend
        .push_status("a-1", Step::now(Ok(JobStatusResponse::running(0.2))))
        .push_status("a-1", Step::now(Ok(JobStatusResponse::running(0.6))))
        .push_status(
            "a-1",
            Step::now(Ok(JobStatusResponse::completed(&sample_matrix()))),
        );

    tracker.track(Some(job("a-1")));
    assert!(tracker.is_polling());

    sleep(Duration::from_secs(30)).await;

    assert_eq!(backend.status_calls("a-1"), vec![0, 3000, 6000]);
    assert_eq!(listener.success_ids(), vec!["a-1"]);
    assert_eq!(listener.successes.lock()[0].1, sample_matrix());
    assert!(listener.failures.lock().is_empty());
    assert!(!tracker.is_polling());
}

#[tokio::test(start_paused = true)]
async fn first_fetch_transport_error_fails_fast() {
    let (backend, listener, mut tracker) = setup();
    backend.push_status("a-1", Step::now(Err(transport_error())));

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_millis(1)).await;

    assert_eq!(listener.failures.lock().len(), 1);
    assert!(listener.failures.lock()[0].1.is_transport());
    assert!(listener.failure_messages()[0].contains("502"));

    sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.status_calls("a-1"), vec![0]);
    assert_eq!(listener.total_callbacks(), 1);
    assert!(!tracker.is_polling());
}

#[tokio::test(start_paused = true)]
async fn transport_error_after_progress_does_not_retry() {
    let (backend, listener, mut tracker) = setup();
    backend
        .push_status("a-1", Step::now(Ok(JobStatusResponse::pending())))
        .push_status("a-1", Step::now(Err(transport_error())));

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_secs(60)).await;

    assert_eq!(backend.status_calls("a-1"), vec![0, 3000]);
    assert_eq!(listener.total_callbacks(), 1);
}

#[tokio::test(start_paused = true)]
async fn backend_failure_uses_default_message() {
    let (backend, listener, mut tracker) = setup();
    backend.push_status("a-1", Step::now(Ok(JobStatusResponse::failed(None))));

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_secs(10)).await;

    assert_eq!(listener.failure_messages(), vec!["Analysis failed"]);
    assert!(matches!(
        listener.failures.lock()[0].1,
        JobFailure::BackendJobFailed(_)
    ));
    assert_eq!(backend.status_calls("a-1"), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn backend_failure_message_is_passed_through() {
    let (backend, listener, mut tracker) = setup();
    backend.push_status(
        "a-1",
        Step::now(Ok(JobStatusResponse::failed(Some("No actual image files found")))),
    );

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_secs(1)).await;

    assert_eq!(listener.failure_messages(), vec!["No actual image files found"]);
}

#[tokio::test(start_paused = true)]
async fn completed_without_matrix_is_terminal_failure() {
    let (backend, listener, mut tracker) = setup();
    backend.push_status(
        "a-1",
        Step::now(Ok(JobStatusResponse {
            status: "completed".to_string(),
            ..Default::default()
        })),
    );

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_secs(10)).await;

    let failures = listener.failures.lock();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0].1,
        JobFailure::Transport(ClientError::InvalidPayload(_))
    ));
    assert_eq!(backend.status_calls("a-1"), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn switching_jobs_discards_in_flight_result() {
    let (backend, listener, mut tracker) = setup();
    backend
        .push_status(
            "old",
            Step::after(
                Duration::from_secs(5),
                Ok(JobStatusResponse::completed(&sample_matrix())),
            ),
        )
        .push_status(
            "new",
            Step::now(Ok(JobStatusResponse::completed(&sample_matrix()))),
        );

    tracker.track(Some(job("old")));
    sleep(Duration::from_secs(1)).await;
    tracker.track(Some(job("new")));
    assert_eq!(tracker.active_job(), Some(job("new")));

    sleep(Duration::from_secs(20)).await;

    assert_eq!(listener.success_ids(), vec!["new"]);
    assert!(listener.failures.lock().is_empty());
    assert_eq!(backend.status_calls("old"), vec![0]);
    assert_eq!(backend.status_calls("new"), vec![1000]);
}

#[tokio::test(start_paused = true)]
async fn track_none_stops_without_callback() {
    let (backend, listener, mut tracker) = setup();

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_secs(1)).await;
    tracker.track(None);

    assert_eq!(tracker.active_job(), None);
    assert!(!tracker.is_polling());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.status_calls("a-1"), vec![0]);
    assert_eq!(listener.total_callbacks(), 0);
}

#[tokio::test(start_paused = true)]
async fn retracking_current_job_is_noop() {
    let (backend, _listener, mut tracker) = setup();

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_secs(1)).await;
    tracker.track(Some(job("a-1")));

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(backend.status_calls("a-1"), vec![0, 3000]);
}

#[tokio::test(start_paused = true)]
async fn latest_status_tracks_progress_and_resets_on_switch() {
    let (backend, _listener, mut tracker) = setup();
    backend.push_status("a-1", Step::now(Ok(JobStatusResponse::running(0.4))));

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_millis(10)).await;

    let snapshot = tracker.latest_status().unwrap();
    assert_eq!(snapshot.job_id, job("a-1"));
    assert_eq!(snapshot.status, JobStatus::Running { progress: Some(0.4) });
    assert_eq!(snapshot.progress, Some(0.4));

    tracker.track(Some(job("a-2")));
    assert!(tracker.latest_status().is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_tracker_cancels_polling() {
    let (backend, listener, mut tracker) = setup();
    backend.push_status(
        "a-1",
        Step::after(
            Duration::from_secs(2),
            Ok(JobStatusResponse::completed(&sample_matrix())),
        ),
    );

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_secs(1)).await;
    drop(tracker);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.status_calls("a-1"), vec![0]);
    assert_eq!(listener.total_callbacks(), 0);
}

#[tokio::test(start_paused = true)]
async fn submit_tracks_returned_job() {
    let (backend, listener, mut tracker) = setup();
    backend.push_submission(Ok(SubmitResponse {
        task_id: Some("task-1".to_string()),
        analysis_id: Some("a-9".to_string()),
        job_id: None,
    }));
    backend.push_status(
        "a-9",
        Step::now(Ok(JobStatusResponse::completed(&sample_matrix()))),
    );

    let id = tracker.submit("project-1", HashType::Orb).await.unwrap();
    assert_eq!(id, job("a-9"));
    assert_eq!(tracker.active_job(), Some(job("a-9")));

    sleep(Duration::from_secs(1)).await;
    assert_eq!(listener.success_ids(), vec!["a-9"]);
}

#[tokio::test(start_paused = true)]
async fn submit_error_tracks_nothing() {
    let (_backend, listener, mut tracker) = setup();

    assert!(tracker.submit("project-1", HashType::Brisk).await.is_err());
    assert_eq!(tracker.active_job(), None);
    assert!(!tracker.is_polling());
    assert_eq!(listener.total_callbacks(), 0);
}

#[tokio::test(start_paused = true)]
async fn channel_listener_streams_outcomes() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_status(
        "a-1",
        Step::now(Ok(JobStatusResponse::completed(&sample_matrix()))),
    );
    let (listener, mut outcomes) = ChannelListener::new();
    let mut tracker = JobTracker::new(backend, Arc::new(listener), &PollingConfig::default());

    tracker.track(Some(job("a-1")));

    match outcomes.recv().await {
        Some(JobOutcome::Completed { job_id, result }) => {
            assert_eq!(job_id, job("a-1"));
            assert_eq!(result.dimension(), 3);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn custom_interval_is_honoured() {
    let backend = Arc::new(ScriptedBackend::new());
    let listener = Arc::new(RecordingListener::default());
    let config = PollingConfig {
        interval_ms: 500,
        ..Default::default()
    };
    let mut tracker = JobTracker::new(backend.clone(), listener, &config);

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_millis(1_750)).await;

    assert_eq!(backend.status_calls("a-1"), vec![0, 500, 1000, 1500]);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_clamped_instead_of_stalling() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .push_status("a-1", Step::now(Ok(JobStatusResponse::pending())))
        .push_status(
            "a-1",
            Step::now(Ok(JobStatusResponse::completed(&sample_matrix()))),
        );
    let listener = Arc::new(RecordingListener::default());
    let config = PollingConfig {
        interval_ms: 0,
        ..Default::default()
    };
    let mut tracker = JobTracker::new(backend.clone(), listener.clone(), &config);

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(backend.status_calls("a-1"), vec![0, 1]);
    assert_eq!(listener.success_ids(), vec!["a-1"]);
    assert!(!tracker.is_polling());
}

#[tokio::test(start_paused = true)]
async fn zero_interval_policy_still_reports_failure() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_status("a-1", Step::now(Err(transport_error())));
    let listener = Arc::new(RecordingListener::default());
    let mut tracker = JobTracker::with_policy(
        backend.clone(),
        listener.clone(),
        FailFastPolicy::default(),
        Duration::ZERO,
    );

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(backend.status_calls("a-1"), vec![0]);
    assert_eq!(listener.failures.lock().len(), 1);
    assert!(!tracker.is_polling());
}

/// Reads tracker state from inside its own callback
#[derive(Default)]
struct ObservingListener {
    handle: OnceLock<JobTrackerHandle>,
    seen: Mutex<Vec<(Option<AnalysisJobId>, bool)>>,
}

impl ObservingListener {
    fn observe(&self) {
        if let Some(handle) = self.handle.get() {
            self.seen
                .lock()
                .push((handle.active_job(), handle.is_polling()));
        }
    }
}

impl JobListener for ObservingListener {
    fn on_terminal_success(&self, _job_id: &AnalysisJobId, _result: SimilarityMatrix) {
        self.observe();
    }

    fn on_terminal_failure(&self, _job_id: &AnalysisJobId, _failure: JobFailure) {
        self.observe();
    }
}

#[tokio::test(start_paused = true)]
async fn listener_can_observe_tracker_during_callback() {
    let backend = Arc::new(ScriptedBackend::new());
    backend
        .push_status(
            "a-1",
            Step::now(Ok(JobStatusResponse::completed(&sample_matrix()))),
        )
        .push_status("a-2", Step::now(Ok(JobStatusResponse::failed(None))));
    let listener = Arc::new(ObservingListener::default());
    let mut tracker = JobTracker::new(backend, listener.clone(), &PollingConfig::default());
    listener.handle.set(tracker.handle()).unwrap();

    tracker.track(Some(job("a-1")));
    sleep(Duration::from_millis(10)).await;
    tracker.track(Some(job("a-2")));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(
        *listener.seen.lock(),
        vec![(Some(job("a-1")), false), (Some(job("a-2")), false)]
    );
}
