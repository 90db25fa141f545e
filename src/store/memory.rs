//! In-memory document store and file storage.
//!
//! Deterministic simulation of the hosted backend for tests and the demo
//! binary. Supports one-shot failure injection per collection so
//! compensation paths can be exercised, and exposes counting/containment
//! helpers for assertions.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for lock poisoning only
#![allow(clippy::missing_panics_doc)]

use super::{DocumentStore, FileStorage, StorageError, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct StoreInner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    fail_create: HashSet<String>,
    fail_update: HashSet<String>,
}

/// In-memory [`DocumentStore`] for fast, deterministic testing
#[derive(Clone, Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing failure injection
    pub fn seed(&self, collection: &str, document_id: &str, data: Value) {
        self.inner
            .write()
            .unwrap()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(document_id.to_string(), data);
    }

    /// Make the next `create_document` on `collection` fail
    pub fn fail_next_create(&self, collection: &str) {
        self.inner
            .write()
            .unwrap()
            .fail_create
            .insert(collection.to_string());
    }

    /// Make the next `update_document` on `collection` fail
    pub fn fail_next_update(&self, collection: &str) {
        self.inner
            .write()
            .unwrap()
            .fail_update
            .insert(collection.to_string());
    }

    /// Number of documents in a collection
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .read()
            .unwrap()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Whether a document exists
    #[must_use]
    pub fn contains(&self, collection: &str, document_id: &str) -> bool {
        self.inner
            .read()
            .unwrap()
            .collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(document_id))
    }

    /// Snapshot of a document, if present
    #[must_use]
    pub fn document(&self, collection: &str, document_id: &str) -> Option<Value> {
        self.inner
            .read()
            .unwrap()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(document_id))
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.fail_create.remove(collection) {
            return Err(StoreError::Unavailable(format!(
                "injected create failure on {collection}"
            )));
        }
        let docs = inner.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(document_id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
            });
        }
        docs.insert(document_id.to_string(), data);
        Ok(())
    }

    async fn get_document(&self, collection: &str, document_id: &str) -> Result<Value, StoreError> {
        self.inner
            .read()
            .unwrap()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(document_id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
            })
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        patch: Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.fail_update.remove(collection) {
            return Err(StoreError::Unavailable(format!(
                "injected update failure on {collection}"
            )));
        }
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(document_id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
            })?;
        if let (Value::Object(existing), Value::Object(fields)) = (doc, patch) {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(document_id));
        if removed.is_none() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let inner = self.inner.read().unwrap();
        let docs = match inner.collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };
        Ok(docs
            .iter()
            .filter(|(_, doc)| {
                filter.is_none_or(|(field, expected)| {
                    doc.get(field).and_then(Value::as_str) == Some(expected)
                })
            })
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect())
    }
}

/// In-memory [`FileStorage`] keyed by bucket and file id
#[derive(Clone, Debug, Default)]
pub struct InMemoryFileStorage {
    files: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
    fail_uploads: Arc<RwLock<bool>>,
}

impl InMemoryFileStorage {
    /// Create a new empty in-memory file storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail
    pub fn fail_uploads(&self) {
        *self.fail_uploads.write().unwrap() = true;
    }

    /// Whether a file exists
    #[must_use]
    pub fn contains(&self, bucket: &str, file_id: &str) -> bool {
        self.files
            .read()
            .unwrap()
            .contains_key(&(bucket.to_string(), file_id.to_string()))
    }

    /// Stored bytes for a file, if present
    #[must_use]
    pub fn bytes(&self, bucket: &str, file_id: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .unwrap()
            .get(&(bucket.to_string(), file_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn upload(
        &self,
        bucket: &str,
        file_id: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        if *self.fail_uploads.read().unwrap() {
            return Err(StorageError::Unavailable(
                "injected upload failure".to_string(),
            ));
        }
        self.files
            .write()
            .unwrap()
            .insert((bucket.to_string(), file_id.to_string()), bytes);
        Ok(())
    }

    async fn view_url(&self, bucket: &str, file_id: &str) -> Result<String, StorageError> {
        if self.contains(bucket, file_id) {
            Ok(format!("memory://{bucket}/{file_id}/view"))
        } else {
            Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                file_id: file_id.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryDocumentStore::new();
        store
            .create_document("events", "e1", json!({"name": "Show"}))
            .await
            .unwrap();
        let doc = store.get_document("events", "e1").await.unwrap();
        assert_eq!(doc["name"], "Show");
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let store = InMemoryDocumentStore::new();
        store
            .create_document("locks", "l1", json!({}))
            .await
            .unwrap();
        let err = store
            .create_document("locks", "l1", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_merges_top_level_fields() {
        let store = InMemoryDocumentStore::new();
        store
            .create_document("tickets", "t1", json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        store
            .update_document("tickets", "t1", json!({"b": 3}))
            .await
            .unwrap();
        let doc = store.get_document("tickets", "t1").await.unwrap();
        assert_eq!(doc["a"], 1);
        assert_eq!(doc["b"], 3);
    }

    #[tokio::test]
    async fn injected_create_failure_fires_once() {
        let store = InMemoryDocumentStore::new();
        store.fail_next_create("locks");
        assert!(
            store
                .create_document("locks", "l1", json!({}))
                .await
                .is_err()
        );
        assert!(
            store
                .create_document("locks", "l1", json!({}))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn list_filters_on_string_equality() {
        let store = InMemoryDocumentStore::new();
        store
            .create_document("tickets", "t1", json!({"userId": "u1"}))
            .await
            .unwrap();
        store
            .create_document("tickets", "t2", json!({"userId": "u2"}))
            .await
            .unwrap();
        let mine = store
            .list_documents("tickets", Some(("userId", "u1")))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].0, "t1");
    }

    #[tokio::test]
    async fn storage_uploads_and_serves_view_urls() {
        let storage = InMemoryFileStorage::new();
        storage.upload("qrs", "f1", vec![1, 2, 3]).await.unwrap();
        assert!(storage.view_url("qrs", "f1").await.is_ok());
        assert!(storage.view_url("qrs", "missing").await.is_err());
    }
}
