//! ImageTrace orchestration
//!
//! Provides:
//! - `ReadinessProbe`: health checks with capped linear backoff until the
//!   backend is reachable, plus the delayed manual-retry signal
//! - `JobTracker`: fixed-cadence status polling for one analysis job at a
//!   time, reporting exactly one terminal outcome per job
//!
//! Both components own their timers and cancel them on `stop`/`Drop`; a
//! response that arrives after its subject was superseded is discarded.

pub mod jobs;
pub mod readiness;

pub use jobs::{
    ChannelListener, FailFastPolicy, JobFailure, JobListener, JobOutcome, JobSnapshot,
    JobTracker, JobTrackerHandle,
};
pub use readiness::{ReadinessBackoff, ReadinessProbe};
