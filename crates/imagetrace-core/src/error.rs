use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageTraceError {
    #[error("Invalid similarity matrix: {0}")]
    InvalidMatrix(String),

    #[error("Threshold {0} is outside the supported range [0.1, 1.0]")]
    InvalidThreshold(f64),

    #[error("Unknown threshold preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Unknown hash type: {0}")]
    UnknownHashType(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, ImageTraceError>;
