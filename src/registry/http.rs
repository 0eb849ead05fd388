//! HTTP registry client
//!
//! Queries `GET {base_url}/actions?date=YYYY-MM-DD` and expects a JSON
//! array in return.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Action, ActionRegistry, RegistryError};
use crate::config::RegistryConfig;
use crate::error::AppError;
use crate::service::ReportDate;

/// Longest slice of an error body kept in messages
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Registry client over HTTP
#[derive(Clone)]
pub struct HttpRegistry {
    http_client: Arc<reqwest::Client>,
    /// Registry base URL without trailing slash
    base_url: String,
}

impl HttpRegistry {
    /// Create a registry client with its own HTTP client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &RegistryConfig) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("action-archive/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self::with_client(Arc::new(http_client), &config.base_url))
    }

    /// Create a registry client sharing an existing HTTP client
    pub fn with_client(http_client: Arc<reqwest::Client>, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn actions_url(&self) -> String {
        format!("{}/actions", self.base_url)
    }
}

#[async_trait]
impl ActionRegistry for HttpRegistry {
    async fn list_actions(&self, date: ReportDate) -> Result<Vec<Action>, RegistryError> {
        let date = date.to_string();

        let response = self
            .http_client
            .get(self.actions_url())
            .query(&[("date", date.as_str())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let actions: Vec<Action> = serde_json::from_slice(&bytes)
            .map_err(|e| RegistryError::Malformed(e.to_string()))?;

        tracing::debug!(date = %date, count = actions.len(), "Fetched actions from registry");
        Ok(actions)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &value[..index]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let registry = HttpRegistry::with_client(
            Arc::new(reqwest::Client::new()),
            "https://registry.example.com/v1/",
        );
        assert_eq!(registry.actions_url(), "https://registry.example.com/v1/actions");
    }

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate("bad gateway", 512), "bad gateway");
    }

    #[test]
    fn truncate_cuts_long_bodies_on_char_boundary() {
        let body = "é".repeat(10);
        assert_eq!(truncate(&body, 3), "ééé...");
    }

    #[test]
    fn new_builds_client_from_config() {
        let config = RegistryConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 1,
        };
        let registry = HttpRegistry::new(&config).unwrap();
        assert_eq!(registry.actions_url(), "http://127.0.0.1:9/actions");
    }
}
