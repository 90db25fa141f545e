//! External collaborator contracts: document store and file storage.
//!
//! The hosted backend exposes CRUD on documents keyed by collection id and
//! document id, plus simple equality-filtered listing, and a blob bucket
//! for uploaded files. Both are modelled as traits so the coordinator can
//! run against the real service or the in-memory simulation in
//! [`memory`].
//!
//! The store offers no transactions, no conditional writes, and no
//! uniqueness constraints beyond the document id. Every guarantee the
//! booking protocol wants on top of that is built from plain reads and
//! writes, which is exactly why it re-validates inventory at multiple
//! checkpoints.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested document does not exist
    #[error("document {document_id} not found in {collection}")]
    NotFound {
        /// Collection searched
        collection: String,
        /// Missing document id
        document_id: String,
    },

    /// A document with this id already exists
    #[error("document {document_id} already exists in {collection}")]
    AlreadyExists {
        /// Collection written to
        collection: String,
        /// Conflicting document id
        document_id: String,
    },

    /// The store rejected the write or could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Document payload could not be serialized or deserialized
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by file storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The upload was rejected or the service could not be reached
    #[error("file storage unavailable: {0}")]
    Unavailable(String),

    /// The requested file does not exist
    #[error("file {file_id} not found in bucket {bucket}")]
    NotFound {
        /// Bucket searched
        bucket: String,
        /// Missing file id
        file_id: String,
    },
}

/// Generic document store: CRUD by collection id and document id.
///
/// Document ids are caller-generated opaque strings; `update_document`
/// merges the patch into the existing document rather than replacing it,
/// mirroring the hosted service's partial-update semantics.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] on id collision and
    /// [`StoreError::Unavailable`] on rejected writes.
    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<(), StoreError>;

    /// Fetches a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent.
    async fn get_document(&self, collection: &str, document_id: &str) -> Result<Value, StoreError>;

    /// Merges `patch`'s top-level fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent and
    /// [`StoreError::Unavailable`] on rejected writes.
    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        patch: Value,
    ) -> Result<(), StoreError>;

    /// Deletes a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent.
    async fn delete_document(&self, collection: &str, document_id: &str)
    -> Result<(), StoreError>;

    /// Lists `(document_id, document)` pairs, optionally filtered by
    /// equality on one top-level string field.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store cannot be
    /// reached.
    async fn list_documents(
        &self,
        collection: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<(String, Value)>, StoreError>;
}

/// Blob storage bucket: upload and preview-URL lookup
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Uploads a file under the given bucket and file id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when the upload is rejected.
    async fn upload(&self, bucket: &str, file_id: &str, bytes: Vec<u8>)
    -> Result<(), StorageError>;

    /// Returns a preview URL for a stored file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the file does not exist.
    async fn view_url(&self, bucket: &str, file_id: &str) -> Result<String, StorageError>;
}
