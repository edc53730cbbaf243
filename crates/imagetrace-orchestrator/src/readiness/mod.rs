// ABOUTME: Readiness probing for the analysis backend process
// ABOUTME: Infinite capped backoff until reachable, plus a one-shot manual-retry window

pub mod policy;
pub mod probe;

pub use policy::ReadinessBackoff;
pub use probe::ReadinessProbe;
