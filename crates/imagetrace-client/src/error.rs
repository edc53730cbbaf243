use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status} for {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// True when no HTTP response was received at all
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
