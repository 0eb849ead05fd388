//! S3-compatible object store
//!
//! Uploads go through the multipart API so that writing and committing are
//! separate calls. Content type and the canned ACL are set when the upload
//! is initiated, so the object never exists without its access grant.
//! Works against Google Cloud Storage's interoperability endpoint as well as
//! AWS S3 and R2.

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};

use super::{ObjectAcl, ObjectOptions, ObjectStore, ObjectWriter, StorageError};
use crate::config::StorageConfig;
use crate::error::AppError;
use crate::storage::build_s3_http_client;

/// Size of every part except the last (S3 minimum is 5 MiB)
const PART_SIZE: usize = 8 * 1024 * 1024;

/// Object store backed by an S3-compatible bucket
pub struct S3ObjectStore {
    client: S3Client,
    config: StorageConfig,
}

impl S3ObjectStore {
    /// Create new object store client
    ///
    /// # Arguments
    /// * `config` - Bucket, endpoint and HMAC credentials
    ///
    /// # Errors
    /// Returns error if credentials are missing
    pub fn new(config: &StorageConfig) -> Result<Self, AppError> {
        use aws_sdk_s3::config::retry::RetryConfig;
        use aws_sdk_s3::config::{
            BehaviorVersion, Credentials, Region, RequestChecksumCalculation,
        };

        if config.access_key_id.is_empty() || config.secret_access_key.is_empty() {
            return Err(AppError::Config(
                "object store credentials are not configured".to_string(),
            ));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "action-archive-hmac",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .http_client(build_s3_http_client())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            // Every storage failure is terminal for the request.
            .retry_config(RetryConfig::disabled())
            // GCS interoperability rejects the default flexible checksums.
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create(
        &self,
        key: &str,
        options: &ObjectOptions,
    ) -> Result<Box<dyn ObjectWriter>, StorageError> {
        let acl = match options.acl {
            ObjectAcl::Private => ObjectCannedAcl::Private,
            ObjectAcl::PublicRead => ObjectCannedAcl::PublicRead,
        };

        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(&options.content_type)
            .acl(acl)
            .send()
            .await
            .map_err(|e| StorageError::Create(DisplayErrorContext(&e).to_string()))?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| StorageError::Create("response carried no upload id".to_string()))?
            .to_string();

        tracing::debug!(bucket = %self.config.bucket, key = %key, "Multipart upload started");

        Ok(Box::new(S3ObjectWriter {
            client: self.client.clone(),
            bucket: self.config.bucket.clone(),
            key: key.to_string(),
            upload_id: Some(upload_id),
            buffer: Vec::new(),
            parts: Vec::new(),
        }))
    }

    fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }
}

/// Writer for one multipart upload
///
/// `upload_id` is cleared once the upload is completed or aborted. A writer
/// dropped while still open aborts its upload in the background.
pub struct S3ObjectWriter {
    client: S3Client,
    bucket: String,
    key: String,
    upload_id: Option<String>,
    buffer: Vec<u8>,
    parts: Vec<CompletedPart>,
}

impl S3ObjectWriter {
    fn open_upload_id(&self) -> Result<&str, StorageError> {
        self.upload_id
            .as_deref()
            .ok_or_else(|| StorageError::Write("upload is already closed".to_string()))
    }

    async fn upload_part(&mut self, body: Vec<u8>) -> Result<(), String> {
        let upload_id = self.open_upload_id().map_err(|e| e.to_string())?;
        let part_number = i32::try_from(self.parts.len() + 1)
            .map_err(|_| "too many parts".to_string())?;

        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| DisplayErrorContext(&e).to_string())?;

        self.parts.push(
            CompletedPart::builder()
                .set_e_tag(output.e_tag().map(str::to_string))
                .part_number(part_number)
                .build(),
        );
        Ok(())
    }
}

#[async_trait]
impl ObjectWriter for S3ObjectWriter {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.open_upload_id()?;
        self.buffer.extend_from_slice(chunk);

        while self.buffer.len() >= PART_SIZE {
            let rest = self.buffer.split_off(PART_SIZE);
            let part = std::mem::replace(&mut self.buffer, rest);
            self.upload_part(part).await.map_err(StorageError::Write)?;
        }

        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<(), StorageError> {
        // The last part may be empty only if it is also the first one.
        if !self.buffer.is_empty() || self.parts.is_empty() {
            let last = std::mem::take(&mut self.buffer);
            if let Err(message) = self.upload_part(last).await {
                return Err(commit_failed(self, message).await);
            }
        }

        let upload_id = self.open_upload_id().map_err(|e| StorageError::Commit(e.to_string()))?;
        let result = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(self.parts.clone()))
                    .build(),
            )
            .send()
            .await;

        match result {
            Ok(_) => {
                self.upload_id = None;
                tracing::debug!(bucket = %self.bucket, key = %self.key, "Multipart upload completed");
                Ok(())
            }
            Err(e) => {
                let message = DisplayErrorContext(&e).to_string();
                Err(commit_failed(self, message).await)
            }
        }
    }

    async fn abort(mut self: Box<Self>) -> Result<(), StorageError> {
        let Some(upload_id) = self.upload_id.take() else {
            return Ok(());
        };

        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StorageError::Abort(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(bucket = %self.bucket, key = %self.key, "Multipart upload aborted");
        Ok(())
    }
}

/// Discard the upload after a failed commit and return the commit error
async fn commit_failed(writer: Box<S3ObjectWriter>, message: String) -> StorageError {
    let key = writer.key.clone();
    if let Err(error) = writer.abort().await {
        tracing::warn!(key = %key, %error, "Failed to abort upload after commit failure");
    }
    StorageError::Commit(message)
}

impl Drop for S3ObjectWriter {
    fn drop(&mut self) {
        let Some(upload_id) = self.upload_id.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(key = %self.key, "Upload left open with no runtime to abort it");
            return;
        };

        let request = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(upload_id);
        let key = self.key.clone();

        handle.spawn(async move {
            if let Err(e) = request.send().await {
                tracing::warn!(
                    key = %key,
                    error = %DisplayErrorContext(&e),
                    "Failed to abort abandoned upload"
                );
            }
        });
    }
}
