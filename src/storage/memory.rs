//! In-process object store
//!
//! Keeps committed objects in a map. Writers buffer until `finish`, so an
//! aborted or failed upload never becomes visible. Failures can be injected
//! to exercise the error paths of callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ObjectAcl, ObjectOptions, ObjectStore, ObjectWriter, StorageError};

/// Committed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub acl: ObjectAcl,
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, StoredObject>,
    creates: usize,
    aborts: usize,
    write_failure: Option<String>,
    commit_failure: Option<String>,
}

/// Object store held in memory
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    public_host: String,
    bucket: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryObjectStore {
    pub fn new(public_host: &str, bucket: &str) -> Self {
        Self {
            public_host: public_host.to_string(),
            bucket: bucket.to_string(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Make every subsequent `write` fail with `message`
    pub fn fail_writes(&self, message: &str) {
        self.lock().write_failure = Some(message.to_string());
    }

    /// Make every subsequent `finish` fail with `message`
    pub fn fail_commits(&self, message: &str) {
        self.lock().commit_failure = Some(message.to_string());
    }

    /// Committed object under `key`
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(key).cloned()
    }

    /// Number of committed objects
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of writers opened so far
    pub fn creates(&self) -> usize {
        self.lock().creates
    }

    /// Number of writers discarded so far
    pub fn aborts(&self) -> usize {
        self.lock().aborts
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create(
        &self,
        key: &str,
        options: &ObjectOptions,
    ) -> Result<Box<dyn ObjectWriter>, StorageError> {
        self.lock().creates += 1;

        Ok(Box::new(MemoryObjectWriter {
            store: self.clone(),
            key: key.to_string(),
            options: options.clone(),
            buffer: Vec::new(),
        }))
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://{}/{}/{}", self.public_host, self.bucket, key)
    }
}

struct MemoryObjectWriter {
    store: MemoryObjectStore,
    key: String,
    options: ObjectOptions,
    buffer: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for MemoryObjectWriter {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        if let Some(message) = self.store.lock().write_failure.clone() {
            return Err(StorageError::Write(message));
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<(), StorageError> {
        let store = self.store.clone();
        let mut inner = store.lock();
        if let Some(message) = inner.commit_failure.clone() {
            inner.aborts += 1;
            return Err(StorageError::Commit(message));
        }

        let MemoryObjectWriter {
            key,
            options,
            buffer,
            ..
        } = *self;
        inner.objects.insert(
            key,
            StoredObject {
                body: buffer,
                content_type: options.content_type,
                acl: options.acl,
            },
        );
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StorageError> {
        self.store.lock().aborts += 1;
        Ok(())
    }
}
