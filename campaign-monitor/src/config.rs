use crate::endpoints::DEFAULT_BASE_URL;
use reqwest::Url;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("subscriber list id must not be empty")]
    EmptyListId,
    #[error("auth token must not be empty")]
    EmptyAuthToken,
    #[error("invalid base url {0:?}: {1}")]
    InvalidBaseUrl(String, String),
}

/// Credentials and endpoint settings for a [`crate::Client`].
///
/// `auth_token` is the already base64-encoded basic auth credential; it is
/// sent as `Authorization: Basic <auth_token>`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub list_id: String,
    pub auth_token: Secret<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Config {
    /// Builds a validated configuration pointing at the production API host.
    pub fn new<S: Into<String>>(list_id: S, auth_token: S) -> Result<Self, ConfigError> {
        let config = Self {
            list_id: list_id.into(),
            auth_token: Secret::new(auth_token.into()),
            base_url: default_base_url(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Points the client at another host (e.g. a mock server).
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Result<Self, ConfigError> {
        self.base_url = base_url.into();
        self.validate()?;
        Ok(self)
    }

    /// Checks the invariants a client relies on. Needed for configs that
    /// were deserialized rather than built with [`Config::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list_id.trim().is_empty() {
            return Err(ConfigError::EmptyListId);
        }
        if self.auth_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::EmptyAuthToken);
        }
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(self.base_url.clone(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(
                self.base_url.clone(),
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        Ok(())
    }
}
