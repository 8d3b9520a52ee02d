//! The uniform CRUD and connection contract.
//!
//! [`StoreAdapter`] is what application code programs against. It is object safe, so a store
//! can be held as `Arc<dyn StoreAdapter>` and swapped for another implementation without touching
//! callers. [`DocumentStore`](crate::store::DocumentStore) is the implementation that normalizes
//! queries and delegates to a [`StoreBackend`](crate::backend::StoreBackend).
//!
//! Identifiers cross this boundary either in their caller-facing hex form or as the opaque
//! value returned by [`StoreAdapter::save`].

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::{
    config::ConnectOptions,
    error::DocumentStoreResult,
    id,
    options::{FindOptions, IndexOptions, UpdateOptions},
};

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Connects to the store at `url`. Calling it again while connected reuses the existing
    /// connection.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::Connection`](crate::error::DocumentStoreError::Connection) if the
    /// transport cannot be established, `InvalidState` if the store was closed.
    async fn connect(&self, url: &str, options: &ConnectOptions) -> DocumentStoreResult<()>;

    /// Closes the store. Every later operation fails with `InvalidState`.
    async fn close(&self) -> DocumentStoreResult<()>;

    /// Saves `values`.
    ///
    /// With an identifier, the document stored under it is replaced (or created). Without one,
    /// or with `Bson::Null`, a new document is inserted and the store assigns the identifier.
    ///
    /// # Returns
    ///
    /// The effective identifier.
    async fn save(&self, collection: &str, id: Option<Bson>, values: Document) -> DocumentStoreResult<Bson>;

    /// Deletes the document with identifier `id`. A null identifier deletes nothing.
    async fn delete_by_id(&self, collection: &str, id: Bson) -> DocumentStoreResult<u64>;

    /// Deletes the first document matching `query`.
    async fn delete_one(&self, collection: &str, query: Document) -> DocumentStoreResult<u64>;

    /// Deletes all documents matching `query`.
    async fn delete_many(&self, collection: &str, query: Document) -> DocumentStoreResult<u64>;

    async fn find_one(&self, collection: &str, query: Document) -> DocumentStoreResult<Option<Document>>;

    /// Updates the first document matching `query` and returns it as it is after the update.
    ///
    /// Without `upsert`, only the fields named in `values` change. With `upsert`, `values` are
    /// applied only when a new document is created; an existing match is returned unchanged.
    async fn find_one_and_update(
        &self,
        collection: &str,
        query: Document,
        values: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Deletes the first document matching `query`, returning 1 if one was deleted.
    async fn find_one_and_delete(&self, collection: &str, query: Document) -> DocumentStoreResult<u64>;

    /// Returns every document matching `query`, sorted, then skipped, then limited.
    async fn find(&self, collection: &str, query: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>>;

    async fn count(&self, collection: &str, query: Document) -> DocumentStoreResult<u64>;

    /// Creates a single-field ascending index on `field`.
    async fn create_index(&self, collection: &str, field: &str, options: IndexOptions) -> DocumentStoreResult<()>;

    /// Removes every document of `collection` and the collection itself.
    async fn clear_collection(&self, collection: &str) -> DocumentStoreResult<()>;

    /// Removes the entire database.
    async fn drop_database(&self) -> DocumentStoreResult<()>;

    /// String form of an identifier.
    fn to_canonical_string(&self, id: &Bson) -> String {
        id::canonical_string(id)
    }

    /// Whether `value` is a canonical identifier or a string in the caller-facing hex form.
    fn is_identifier_like(&self, value: &Bson) -> bool {
        id::is_identifier_like(value)
    }
}
