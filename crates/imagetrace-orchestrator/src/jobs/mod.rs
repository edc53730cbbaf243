// ABOUTME: Analysis job tracking by status polling
// ABOUTME: Fail-fast on fetch errors, one terminal callback per job, stale results discarded

pub mod listener;
pub mod policy;
pub mod tracker;

pub use listener::{ChannelListener, JobFailure, JobListener, JobOutcome};
pub use policy::FailFastPolicy;
pub use tracker::{JobSnapshot, JobTracker, JobTrackerHandle};
