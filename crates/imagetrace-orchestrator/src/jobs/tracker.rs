// ABOUTME: Polls analysis job status until a terminal state, one job at a time
// ABOUTME: Switching jobs cancels the old loop; stale responses are dropped by generation check

use chrono::{DateTime, Utc};
use imagetrace_client::{BackendClient, ClientError, JobStatus};
use imagetrace_core::{AnalysisJobId, HashType, PollingConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::listener::JobListener;
use super::policy::FailFastPolicy;

/// Last non-terminal status observed for the active job
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub job_id: AnalysisJobId,
    pub status: JobStatus,
    pub progress: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// Which job is current. Every switch bumps `generation`; a poll loop may
/// only apply effects while its own generation is still current.
#[derive(Debug, Default)]
struct Subject {
    generation: u64,
    job_id: Option<AnalysisJobId>,
    polling: bool,
}

struct PollRun {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Shortest accepted poll period; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Read-only view of a tracker's subject, cheap to clone.
///
/// Safe to use from inside `JobListener` callbacks.
#[derive(Debug, Clone)]
pub struct JobTrackerHandle {
    subject: Arc<Mutex<Subject>>,
}

impl JobTrackerHandle {
    pub fn active_job(&self) -> Option<AnalysisJobId> {
        self.subject.lock().job_id.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.subject.lock().polling
    }
}

/// Tracks one analysis job at a time and reports its terminal outcome once.
///
/// Must be used from within a tokio runtime; `track` spawns the poll loop.
pub struct JobTracker {
    client: Arc<dyn BackendClient>,
    listener: Arc<dyn JobListener>,
    policy: FailFastPolicy,
    interval: Duration,
    subject: Arc<Mutex<Subject>>,
    /// Held across generation bumps and terminal callbacks, never by observers
    delivery: Arc<Mutex<()>>,
    snapshots: watch::Sender<Option<JobSnapshot>>,
    run: Option<PollRun>,
}

impl JobTracker {
    pub fn new(
        client: Arc<dyn BackendClient>,
        listener: Arc<dyn JobListener>,
        config: &PollingConfig,
    ) -> Self {
        Self::with_policy(
            client,
            listener,
            FailFastPolicy::from_config(config),
            config.interval(),
        )
    }

    pub fn with_policy(
        client: Arc<dyn BackendClient>,
        listener: Arc<dyn JobListener>,
        policy: FailFastPolicy,
        interval: Duration,
    ) -> Self {
        if interval < MIN_POLL_INTERVAL {
            warn!(
                target: "imagetrace::jobs",
                interval_ms = interval.as_millis() as u64,
                "Poll interval below 1ms, using 1ms"
            );
        }
        let (snapshots, _) = watch::channel(None);
        Self {
            client,
            listener,
            policy,
            interval: interval.max(MIN_POLL_INTERVAL),
            subject: Arc::new(Mutex::new(Subject::default())),
            delivery: Arc::new(Mutex::new(())),
            snapshots,
            run: None,
        }
    }

    /// Make `job_id` the tracked job, or stop tracking with `None`.
    ///
    /// Any loop for a previous job is cancelled before the new one starts, and
    /// once this returns no callback for the previous job can fire. Tracking
    /// the job that is already current is a no-op.
    pub fn track(&mut self, job_id: Option<AnalysisJobId>) {
        if job_id.is_some() && self.subject.lock().job_id == job_id {
            return;
        }

        let previous = self.cancel_active();
        let Some(job_id) = job_id else {
            if let Some(previous) = previous {
                info!(target: "imagetrace::jobs", job_id = %previous, "Stopped tracking job");
            }
            return;
        };

        let generation = {
            let mut subject = self.subject.lock();
            subject.job_id = Some(job_id.clone());
            subject.polling = true;
            subject.generation
        };

        match previous {
            Some(previous) => info!(
                target: "imagetrace::jobs",
                job_id = %job_id,
                previous = %previous,
                "Switched tracked job"
            ),
            None => info!(target: "imagetrace::jobs", job_id = %job_id, "Tracking job"),
        }

        let cancel = CancellationToken::new();
        let poll_loop = PollLoop {
            client: Arc::clone(&self.client),
            listener: Arc::clone(&self.listener),
            policy: self.policy.clone(),
            interval: self.interval,
            subject: Arc::clone(&self.subject),
            delivery: Arc::clone(&self.delivery),
            snapshots: self.snapshots.clone(),
            generation,
            cancel: cancel.clone(),
            job_id,
        };
        let handle = tokio::spawn(poll_loop.run());
        self.run = Some(PollRun { cancel, handle });
    }

    /// Submit an analysis and track the job it creates.
    ///
    /// A submission error is returned as-is and leaves the tracker untouched.
    pub async fn submit(
        &mut self,
        project_id: &str,
        hash_type: HashType,
    ) -> Result<AnalysisJobId, ClientError> {
        let response = self.client.submit_analysis(project_id, hash_type).await?;
        let job_id = response.job_id()?;
        self.track(Some(job_id.clone()));
        Ok(job_id)
    }

    /// Stop polling without any callback
    pub fn stop(&mut self) {
        self.track(None);
    }

    pub fn active_job(&self) -> Option<AnalysisJobId> {
        self.subject.lock().job_id.clone()
    }

    /// True between `track` and the job's terminal outcome
    pub fn is_polling(&self) -> bool {
        self.subject.lock().polling
    }

    pub fn latest_status(&self) -> Option<JobSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<JobSnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn handle(&self) -> JobTrackerHandle {
        JobTrackerHandle {
            subject: Arc::clone(&self.subject),
        }
    }

    /// Invalidate the current subject and tear down its loop. Returns the job
    /// that was being tracked, if any.
    fn cancel_active(&mut self) -> Option<AnalysisJobId> {
        let previous = {
            // waits out a callback already in progress
            let _delivery = self.delivery.lock();
            let mut subject = self.subject.lock();
            subject.generation = subject.generation.wrapping_add(1);
            subject.polling = false;
            subject.job_id.take()
        };
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
            run.handle.abort();
        }
        self.snapshots.send_replace(None);
        previous
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

/// State moved into the spawned poll task for one job
struct PollLoop {
    client: Arc<dyn BackendClient>,
    listener: Arc<dyn JobListener>,
    policy: FailFastPolicy,
    interval: Duration,
    subject: Arc<Mutex<Subject>>,
    delivery: Arc<Mutex<()>>,
    snapshots: watch::Sender<Option<JobSnapshot>>,
    generation: u64,
    cancel: CancellationToken,
    job_id: AnalysisJobId,
}

impl PollLoop {
    async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick fires immediately
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                fetched = self.client.get_job_status(&self.job_id) => fetched,
            };

            match fetched.and_then(|response| response.into_status()) {
                Ok(JobStatus::Completed(result)) => {
                    self.finish(|listener, job_id| {
                        info!(target: "imagetrace::jobs", job_id = %job_id, nodes = result.dimension(), "Job completed");
                        listener.on_terminal_success(job_id, result);
                    });
                    return;
                }
                Ok(JobStatus::Failed(message)) => {
                    let failure = self.policy.on_job_failed(message);
                    self.finish(|listener, job_id| {
                        warn!(target: "imagetrace::jobs", job_id = %job_id, error = %failure, "Job failed");
                        listener.on_terminal_failure(job_id, failure);
                    });
                    return;
                }
                Ok(status) => {
                    if !self.publish(status) {
                        return;
                    }
                }
                Err(error) => {
                    let failure = self.policy.on_fetch_error(error);
                    self.finish(|listener, job_id| {
                        warn!(target: "imagetrace::jobs", job_id = %job_id, error = %failure, "Job status fetch failed, polling stopped");
                        listener.on_terminal_failure(job_id, failure);
                    });
                    return;
                }
            }
        }
    }

    fn is_current(&self, subject: &Subject) -> bool {
        subject.generation == self.generation && !self.cancel.is_cancelled()
    }

    /// Record a non-terminal status. Returns false if this loop is stale.
    fn publish(&self, status: JobStatus) -> bool {
        let subject = self.subject.lock();
        if !self.is_current(&subject) {
            debug!(target: "imagetrace::jobs", job_id = %self.job_id, "Discarding stale status");
            return false;
        }
        debug!(
            target: "imagetrace::jobs",
            job_id = %self.job_id,
            status = %status,
            progress = ?status.progress(),
            "Job still in progress"
        );
        self.snapshots.send_replace(Some(JobSnapshot {
            job_id: self.job_id.clone(),
            progress: status.progress(),
            status,
            observed_at: Utc::now(),
        }));
        true
    }

    /// Deliver the terminal outcome if this loop still owns the subject.
    /// The delivery gate is held across the callback so a concurrent `track`
    /// cannot interleave with it; the subject lock is released first so the
    /// listener may observe the tracker.
    fn finish<F>(&self, deliver: F)
    where
        F: FnOnce(&dyn JobListener, &AnalysisJobId),
    {
        let _delivery = self.delivery.lock();
        {
            let mut subject = self.subject.lock();
            if !self.is_current(&subject) {
                debug!(target: "imagetrace::jobs", job_id = %self.job_id, "Discarding stale terminal result");
                return;
            }
            subject.polling = false;
        }
        deliver(self.listener.as_ref(), &self.job_id);
    }
}
