use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ImageTraceError, Result};

/// Reachability of the analysis backend as observed by the readiness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendState {
    /// No probe has resolved yet (or the probe was torn down)
    #[default]
    Checking,
    /// A health check succeeded; terminal while the probe is mounted
    Ready,
    /// The last health check failed; a retry is scheduled
    Error,
}

impl BackendState {
    pub fn is_ready(&self) -> bool {
        matches!(self, BackendState::Ready)
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendState::Checking => write!(f, "Checking"),
            BackendState::Ready => write!(f, "Ready"),
            BackendState::Error => write!(f, "Error"),
        }
    }
}

/// Opaque identifier of an analysis job issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnalysisJobId(String);

impl AnalysisJobId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ImageTraceError::InvalidJobId(
                "job id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AnalysisJobId {
    type Err = ImageTraceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AnalysisJobId {
    type Error = ImageTraceError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AnalysisJobId> for String {
    fn from(id: AnalysisJobId) -> Self {
        id.0
    }
}

/// Feature hashing algorithm requested for an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    #[default]
    Orb,
    Brisk,
    Sift,
}

impl HashType {
    pub const ALL: [HashType; 3] = [HashType::Orb, HashType::Brisk, HashType::Sift];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashType::Orb => "orb",
            HashType::Brisk => "brisk",
            HashType::Sift => "sift",
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashType {
    type Err = ImageTraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orb" => Ok(HashType::Orb),
            "brisk" => Ok(HashType::Brisk),
            "sift" => Ok(HashType::Sift),
            other => Err(ImageTraceError::UnknownHashType(other.to_string())),
        }
    }
}
