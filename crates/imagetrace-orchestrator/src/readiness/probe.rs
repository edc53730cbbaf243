// ABOUTME: Readiness probe that waits for the analysis backend to become reachable
// ABOUTME: Owns one backoff timer and one manual-retry visibility timer, both cancellable

use imagetrace_client::BackendClient;
use imagetrace_core::{BackendState, ReadinessConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::policy::ReadinessBackoff;

/// Probes backend health until it answers, backing off between failures.
///
/// Lifecycle: `start` issues the first health check inline and, if it fails,
/// hands the retry loop to a background task. `stop` (or dropping the probe)
/// cancels every timer and resets the state; responses arriving afterwards are
/// ignored.
pub struct ReadinessProbe {
    client: Arc<dyn BackendClient>,
    backoff: ReadinessBackoff,
    retry_visibility_delay: Duration,
    state: watch::Sender<BackendState>,
    retry_visible: watch::Sender<bool>,
    attempts: Arc<AtomicU64>,
    run: Option<ProbeRun>,
}

/// Everything owned by one mounted run of the probe
struct ProbeRun {
    cancel: CancellationToken,
    manual_retry: mpsc::Sender<()>,
    driver: Option<JoinHandle<()>>,
    visibility: JoinHandle<()>,
}

impl ReadinessProbe {
    pub fn new(client: Arc<dyn BackendClient>, config: &ReadinessConfig) -> Self {
        Self::with_backoff(
            client,
            ReadinessBackoff::from_config(config),
            Duration::from_millis(config.retry_visibility_delay_ms),
        )
    }

    pub fn with_backoff(
        client: Arc<dyn BackendClient>,
        backoff: ReadinessBackoff,
        retry_visibility_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(BackendState::Checking);
        let (retry_visible, _) = watch::channel(false);
        Self {
            client,
            backoff,
            retry_visibility_delay,
            state,
            retry_visible,
            attempts: Arc::new(AtomicU64::new(0)),
            run: None,
        }
    }

    /// Begin probing. Resolves once the first health check has completed and
    /// returns the resulting state. Calling `start` on a running probe is a
    /// no-op and never rearms the visibility timer.
    pub async fn start(&mut self) -> BackendState {
        if self.run.is_some() {
            return self.state();
        }

        let cancel = CancellationToken::new();
        let visibility = self.spawn_visibility_timer(cancel.clone());
        let (manual_retry, manual_rx) = mpsc::channel(1);

        let mut driver = ProbeDriver {
            client: Arc::clone(&self.client),
            backoff: self.backoff,
            state: self.state.clone(),
            attempts: Arc::clone(&self.attempts),
            cancel: cancel.clone(),
            manual_rx,
            consecutive_failures: 0,
        };

        // Register the run before awaiting so a dropped `start` future still
        // leaves a cancellable handle behind.
        self.run = Some(ProbeRun {
            cancel,
            manual_retry,
            driver: None,
            visibility,
        });

        match driver.probe().await {
            Some(true) | None => {}
            Some(false) => {
                driver.consecutive_failures = 1;
                let handle = tokio::spawn(driver.run());
                if let Some(run) = self.run.as_mut() {
                    run.driver = Some(handle);
                }
            }
        }

        self.state()
    }

    /// Request an immediate out-of-schedule probe.
    ///
    /// Returns false when nothing will happen: the probe is stopped, already
    /// Ready, or a manual retry is already queued.
    pub fn retry_now(&self) -> bool {
        let Some(run) = &self.run else {
            return false;
        };
        if self.state().is_ready() || run.cancel.is_cancelled() {
            return false;
        }
        match run.manual_retry.try_send(()) {
            Ok(()) => {
                debug!(target: "imagetrace::readiness", "Manual retry requested");
                true
            }
            Err(_) => false,
        }
    }

    /// Cancel all pending timers and in-flight probes, resetting observable
    /// state. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        run.cancel.cancel();
        if let Some(driver) = run.driver {
            driver.abort();
        }
        run.visibility.abort();

        self.state.send_replace(BackendState::Checking);
        self.retry_visible.send_replace(false);
        debug!(target: "imagetrace::readiness", "Readiness probe stopped");
    }

    pub fn state(&self) -> BackendState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BackendState> {
        self.state.subscribe()
    }

    /// Whether the host may offer a manual retry
    pub fn retry_visible(&self) -> bool {
        *self.retry_visible.borrow()
    }

    pub fn subscribe_retry_visible(&self) -> watch::Receiver<bool> {
        self.retry_visible.subscribe()
    }

    /// Total health checks issued since construction
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Resolve once the backend is Ready. Returns false if the probe is
    /// dropped first.
    pub async fn wait_until_ready(&self) -> bool {
        let mut rx = self.state.subscribe();
        let ready = rx.wait_for(BackendState::is_ready).await.is_ok();
        ready
    }

    fn spawn_visibility_timer(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let deadline = Instant::now() + self.retry_visibility_delay;
        let retry_visible = self.retry_visible.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    let shown = retry_visible.send_if_modified(|visible| {
                        if cancel.is_cancelled() || *visible {
                            return false;
                        }
                        *visible = true;
                        true
                    });
                    if shown {
                        info!(target: "imagetrace::readiness", "Manual retry now available");
                    }
                }
            }
        })
    }
}

impl Drop for ReadinessProbe {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background half of the probe: waits, probes, repeats until Ready
struct ProbeDriver {
    client: Arc<dyn BackendClient>,
    backoff: ReadinessBackoff,
    state: watch::Sender<BackendState>,
    attempts: Arc<AtomicU64>,
    cancel: CancellationToken,
    manual_rx: mpsc::Receiver<()>,
    consecutive_failures: u32,
}

impl ProbeDriver {
    async fn run(mut self) {
        loop {
            // The only timer of this run; replaced each iteration.
            let delay = self.backoff.delay_for(self.consecutive_failures);
            let manual = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                Some(()) = self.manual_rx.recv() => true,
                _ = tokio::time::sleep(delay) => false,
            };

            match self.probe().await {
                None | Some(true) => return,
                Some(false) => {
                    // A failed manual retry keeps the pending delay
                    if !manual {
                        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    }
                    let next_delay = self.backoff.delay_for(self.consecutive_failures);
                    debug!(
                        target: "imagetrace::readiness",
                        failures = self.consecutive_failures,
                        manual,
                        next_delay_ms = next_delay.as_millis() as u64,
                        "Backend not reachable yet"
                    );
                }
            }
        }
    }

    /// One health check. `None` means the run was cancelled and nothing was
    /// applied; otherwise whether the backend is reachable.
    async fn probe(&mut self) -> Option<bool> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            result = self.client.check_health() => result,
        };

        let reachable = match &result {
            Ok(health) => health.is_reachable(),
            Err(e) => {
                debug!(target: "imagetrace::readiness", attempt, error = %e, "Health check failed");
                false
            }
        };
        let next = if reachable {
            BackendState::Ready
        } else {
            BackendState::Error
        };

        let cancel = &self.cancel;
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            applied = true;
            let changed = *state != next;
            *state = next;
            changed
        });
        if !applied {
            return None;
        }

        if reachable {
            info!(target: "imagetrace::readiness", attempt, "Backend is ready");
        }
        Some(reachable)
    }
}
