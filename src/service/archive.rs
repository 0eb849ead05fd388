//! Archive service
//!
//! Turns a report date into a published JSON document:
//! fetch actions → serialize → upload → public URL.

use std::fmt;
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::{ARCHIVE_ACTIONS_PUBLISHED, ARCHIVE_BYTES_PUBLISHED, ARCHIVE_RUNS_TOTAL};
use crate::registry::{Action, ActionRegistry};
use crate::service::ReportDate;
use crate::storage::{ObjectOptions, ObjectStore, ObjectWriter};

/// Bytes handed to the writer per call
const WRITE_CHUNK_SIZE: usize = 64 * 1024;

/// Progress of one archive run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStage {
    Received,
    DateResolved,
    Fetched,
    Serialized,
    Uploading,
    Published,
    Failed,
}

impl fmt::Display for ArchiveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveStage::Received => "received",
            ArchiveStage::DateResolved => "date_resolved",
            ArchiveStage::Fetched => "fetched",
            ArchiveStage::Serialized => "serialized",
            ArchiveStage::Uploading => "uploading",
            ArchiveStage::Published => "published",
            ArchiveStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReport {
    pub key: String,
    pub url: String,
    pub action_count: usize,
    pub bytes: usize,
}

/// Fetches a day's actions and publishes them as a public JSON object
#[derive(Clone)]
pub struct ArchiveService {
    registry: Arc<dyn ActionRegistry>,
    store: Arc<dyn ObjectStore>,
}

impl ArchiveService {
    pub fn new(registry: Arc<dyn ActionRegistry>, store: Arc<dyn ObjectStore>) -> Self {
        Self { registry, store }
    }

    /// Archive the actions of `date`
    ///
    /// # Errors
    /// - `UpstreamFetchFailed` if the registry call fails (nothing written)
    /// - `SerializationFailed` if the actions cannot be encoded
    /// - `StorageWriteFailed` if the upload cannot be opened or written;
    ///   the upload is aborted, never committed
    /// - `StoragePutFailed` if committing the object fails
    pub async fn archive(&self, date: ReportDate) -> Result<PublishedReport, AppError> {
        let result = self.run(date).await;

        match &result {
            Ok(report) => {
                ARCHIVE_RUNS_TOTAL.with_label_values(&["published"]).inc();
                ARCHIVE_ACTIONS_PUBLISHED.inc_by(report.action_count as u64);
                ARCHIVE_BYTES_PUBLISHED.inc_by(report.bytes as u64);
            }
            Err(error) => {
                ARCHIVE_RUNS_TOTAL.with_label_values(&[error.kind()]).inc();
                transition(date, ArchiveStage::Failed);
            }
        }

        result
    }

    async fn run(&self, date: ReportDate) -> Result<PublishedReport, AppError> {
        let actions = self.registry.list_actions(date).await.map_err(|e| {
            tracing::error!(date = %date, error = %e, "Registry fetch failed");
            AppError::UpstreamFetchFailed(e.to_string())
        })?;
        transition(date, ArchiveStage::Fetched);

        let body = serialize_actions(&actions)?;
        transition(date, ArchiveStage::Serialized);

        let key = date.object_key();
        transition(date, ArchiveStage::Uploading);
        self.upload(&key, &body).await?;

        let url = self.store.public_url(&key);
        transition(date, ArchiveStage::Published);

        tracing::info!(
            date = %date,
            key = %key,
            actions = actions.len(),
            bytes = body.len(),
            url = %url,
            "Archived actions"
        );

        Ok(PublishedReport {
            key,
            url,
            action_count: actions.len(),
            bytes: body.len(),
        })
    }

    async fn upload(&self, key: &str, body: &[u8]) -> Result<(), AppError> {
        let mut writer = self
            .store
            .create(key, &ObjectOptions::public_json())
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "Could not open upload");
                AppError::StorageWriteFailed(e.to_string())
            })?;

        if let Err(e) = write_all(writer.as_mut(), body).await {
            tracing::error!(key = %key, error = %e, "Upload write failed");
            if let Err(abort_error) = writer.abort().await {
                tracing::warn!(key = %key, error = %abort_error, "Could not abort upload");
            }
            return Err(AppError::StorageWriteFailed(e.to_string()));
        }

        writer.finish().await.map_err(|e| {
            tracing::error!(key = %key, error = %e, "Upload commit failed");
            AppError::StoragePutFailed(e.to_string())
        })
    }
}

async fn write_all(
    writer: &mut dyn ObjectWriter,
    body: &[u8],
) -> Result<(), crate::storage::StorageError> {
    for chunk in body.chunks(WRITE_CHUNK_SIZE) {
        writer.write(chunk).await?;
    }
    Ok(())
}

/// Encode actions as a JSON array
pub fn serialize_actions(actions: &[Action]) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec(actions).map_err(|e| AppError::SerializationFailed(e.to_string()))
}

fn transition(date: ReportDate, stage: ArchiveStage) {
    tracing::debug!(date = %date, stage = %stage, "Archive stage");
}
