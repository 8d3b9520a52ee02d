//! Storage backend abstraction for the document store.
//!
//! This module defines the seam between the store adapter and a concrete document database
//! driver. A backend exposes the driver's native primitives (insert, replace, delete, find,
//! find-and-modify, count, index and drop operations) over BSON documents.
//!
//! # Overview
//!
//! Backends never see caller-formatted identifiers: every filter handed to a [`StoreBackend`]
//! has already been normalized by [`crate::normalize`], so `_id` values are canonical
//! identifiers wherever the caller wrote one.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The driver-level operations
//! - [`StoreBackendBuilder`]: Factory that establishes a connection and yields a backend
//!
//! # Errors
//!
//! Backends report driver failures as
//! [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) and failure to
//! reach the store as [`DocumentStoreError::Connection`](crate::error::DocumentStoreError::Connection).

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{
    config::ConnectOptions,
    error::DocumentStoreResult,
    options::{FindOptions, IndexOptions, Update},
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be thread-safe. The adapter shares one backend between all callers
/// and performs no locking around these calls; drivers that pool connections do so internally.
///
/// # Async Runtime
///
/// All methods are async. The adapter awaits each call exactly once and never retries.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts a new document.
    ///
    /// The document may or may not carry an `_id`. When it doesn't, the backend assigns one.
    ///
    /// # Returns
    ///
    /// The identifier the document was stored under, or `None` if the driver did not report one.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Option<Bson>>;

    /// Replaces the document with identifier `id` by `document`, inserting it if absent.
    ///
    /// The stored document always carries `_id: id`.
    async fn replace_one(&self, collection: &str, id: Bson, document: Document) -> DocumentStoreResult<()>;

    /// Deletes the first document matching `filter`.
    ///
    /// # Returns
    ///
    /// The number of deleted documents (0 or 1).
    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Deletes every document matching `filter` and returns how many were deleted.
    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Returns the first document matching `filter`.
    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>>;

    /// Returns all documents matching `filter`, sorted, then skipped, then limited.
    ///
    /// The result is fully materialized.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Atomically updates the first document matching `filter`.
    ///
    /// With `upsert` set and no match, a new document is built from the equality fields of
    /// `filter` plus the update fields. [`Update::SetOnInsert`] fields never touch an existing
    /// match.
    ///
    /// # Returns
    ///
    /// The document as it is after the update, or `None` if nothing matched and nothing was
    /// inserted.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Update,
        upsert: bool,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Atomically deletes the first document matching `filter` and returns it.
    async fn find_one_and_delete(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>>;

    /// Counts the documents matching `filter`.
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Creates a single-field ascending index.
    ///
    /// # Note
    ///
    /// If `options.unique` is set and existing documents violate the constraint, the backend
    /// returns an error.
    async fn create_index(&self, collection: &str, field: &str, options: IndexOptions) -> DocumentStoreResult<()>;

    /// Drops a collection and all of its documents. Dropping a missing collection succeeds.
    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()>;

    /// Drops the whole database.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_database(&self) -> DocumentStoreResult<()>;

    /// Releases connections and other resources held by the backend.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Establishes a connection and produces a backend.
///
/// Builders carry whatever backend-specific state is needed before a URL is known; the URL and
/// [`ConnectOptions`] are supplied by [`crate::store::DocumentStore::connect`].
#[async_trait]
pub trait StoreBackendBuilder: Send + Sync {
    type Backend: StoreBackend + 'static;

    /// Connects to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Connection`](crate::error::DocumentStoreError::Connection)
    /// if the transport cannot be established.
    async fn build(&self, url: &str, options: &ConnectOptions) -> DocumentStoreResult<Self::Backend>;
}
