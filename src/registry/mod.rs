//! Action registry client
//!
//! The registry publishes the actions recorded for each day. The archive
//! never looks inside an action; it only forwards the collection.

mod http;

pub use http::HttpRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::service::ReportDate;

/// Opaque registry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub serde_json::Value);

/// Registry client failure
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Request could not be sent or the response not read
    #[error("request failed: {0}")]
    Transport(String),

    /// Registry answered with a non-success status
    #[error("registry returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not a JSON array of actions
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Source of actions for a given day
#[async_trait]
pub trait ActionRegistry: Send + Sync {
    async fn list_actions(&self, date: ReportDate) -> Result<Vec<Action>, RegistryError>;
}
