//! ImageTrace backend client
//!
//! Provides:
//! - The `BackendClient` trait consumed by the readiness probe and job tracker
//! - Wire shapes for health, submission and job status payloads
//! - An HTTP implementation over `reqwest`

pub mod client;
pub mod error;
pub mod http;
pub mod status;
pub mod wire;

pub use client::BackendClient;
pub use error::ClientError;
pub use http::HttpBackendClient;
pub use status::JobStatus;
pub use wire::{HealthResponse, JobStatusResponse, SubmitResponse};
