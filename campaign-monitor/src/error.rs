use crate::{config::ConfigError, models::CampaignMonitorError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Request error: {0}")]
    Transport(#[source] BoxError),
    #[error("Error reading response body: {0}")]
    ResponseRead(#[source] BoxError),
    #[error("Malformed JSON response: {0}")]
    ResponseParse(#[from] serde_json::Error),
    #[error("Campaign Monitor error ({status}): {error}")]
    CampaignMonitor {
        status: u16,
        error: CampaignMonitorError,
    },
    /// 4xx/5xx reply whose JSON body is not a Campaign Monitor error document
    /// (e.g. from a proxy in front of the API).
    #[error("Request rejected ({status}): {body}")]
    Api {
        status: u16,
        body: serde_json::Value,
    },
}

/// Failures a [`crate::transport::Transport`] can report.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[source] BoxError),
    #[error("{0}")]
    ReadBody(#[source] BoxError),
}

impl From<TransportError> for Error {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Request(e) => Error::Transport(e),
            TransportError::ReadBody(e) => Error::ResponseRead(e),
        }
    }
}
