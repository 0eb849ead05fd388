//! Object storage module
//!
//! Handles:
//! - Streaming uploads with explicit commit (`finish`) or discard (`abort`)
//! - Public URL generation for published objects
//!
//! The production backend speaks the S3 API; `MemoryObjectStore` keeps
//! objects in process for tests and local runs.

mod memory;
mod s3;

pub use memory::{MemoryObjectStore, StoredObject};
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use thiserror::Error;

/// Access policy applied when an object is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    /// Readable only with bucket credentials
    Private,
    /// Readable by all principals without authentication
    PublicRead,
}

/// Metadata set atomically with object creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectOptions {
    pub content_type: String,
    pub acl: ObjectAcl,
}

impl ObjectOptions {
    /// Publicly readable JSON document
    pub fn public_json() -> Self {
        Self {
            content_type: "application/json".to_string(),
            acl: ObjectAcl::PublicRead,
        }
    }
}

/// Storage client failure
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload could not be started
    #[error("create failed: {0}")]
    Create(String),

    /// A chunk could not be written
    #[error("write failed: {0}")]
    Write(String),

    /// The object could not be committed
    #[error("commit failed: {0}")]
    Commit(String),

    /// An unfinished upload could not be discarded
    #[error("abort failed: {0}")]
    Abort(String),
}

/// Bucket-scoped object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open a writer for `key`
    ///
    /// Nothing is visible under `key` until the writer's `finish` succeeds.
    async fn create(
        &self,
        key: &str,
        options: &ObjectOptions,
    ) -> Result<Box<dyn ObjectWriter>, StorageError>;

    /// Public URL of `key`
    fn public_url(&self, key: &str) -> String;
}

/// Streaming writer for one object
///
/// Exactly one of `finish` or `abort` ends the upload.
#[async_trait]
pub trait ObjectWriter: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError>;

    /// Commit the object, replacing any previous object under the same key
    async fn finish(self: Box<Self>) -> Result<(), StorageError>;

    /// Discard everything written so far
    async fn abort(self: Box<Self>) -> Result<(), StorageError>;
}

pub(crate) fn build_s3_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
