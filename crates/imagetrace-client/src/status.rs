use imagetrace_core::SimilarityMatrix;
use std::fmt;

/// Decoded status of an analysis job
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending { progress: Option<f64> },
    Running { progress: Option<f64> },
    Completed(SimilarityMatrix),
    /// Backend-reported failure, with its message if one was given
    Failed(Option<String>),
}

impl JobStatus {
    /// Completed and Failed end polling; Pending and Running do not
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed(_) | JobStatus::Failed(_))
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            JobStatus::Pending { progress } | JobStatus::Running { progress } => *progress,
            JobStatus::Completed(_) => Some(1.0),
            JobStatus::Failed(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending { .. } => "pending",
            JobStatus::Running { .. } => "running",
            JobStatus::Completed(_) => "completed",
            JobStatus::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending { progress: None }.is_terminal());
        assert!(!JobStatus::Running { progress: Some(0.5) }.is_terminal());
        assert!(JobStatus::Completed(SimilarityMatrix::default()).is_terminal());
        assert!(JobStatus::Failed(None).is_terminal());
    }

    #[test]
    fn test_progress_and_label() {
        assert_eq!(JobStatus::Running { progress: Some(0.25) }.progress(), Some(0.25));
        assert_eq!(JobStatus::Completed(SimilarityMatrix::default()).progress(), Some(1.0));
        assert_eq!(JobStatus::Failed(Some("boom".into())).to_string(), "failed");
    }
}
