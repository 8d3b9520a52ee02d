//! Collection handles.
//!
//! A [`Collection`] binds a collection name to a store so callers don't have to repeat it on
//! every call. It works with any [`StoreAdapter`], including `dyn StoreAdapter`.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//!
//! let users = store.collection("users");
//! let id = users.save(None, doc! { "name": "Alice", "age": 30 }).await?;
//! let adults = users
//!     .find(doc! { "age": { "$gte": 18 } }, FindOptions::builder().sort("-age").build())
//!     .await?;
//! ```

use bson::{Bson, Document};

use crate::{
    adapter::StoreAdapter,
    error::DocumentStoreResult,
    options::{FindOptions, IndexOptions, UpdateOptions},
};

/// A named collection with a reference to the store that holds it.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the store reference
/// * `S` - The store type
#[derive(Debug)]
pub struct Collection<'a, S: StoreAdapter + ?Sized> {
    name: String,
    store: &'a S,
}

impl<'a, S: StoreAdapter + ?Sized> Collection<'a, S> {
    pub fn new(name: String, store: &'a S) -> Self {
        Self { name, store }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Saves a document, replacing the one stored under `id` when given.
    ///
    /// # Returns
    ///
    /// The effective identifier of the saved document.
    pub async fn save(&self, id: Option<Bson>, values: Document) -> DocumentStoreResult<Bson> {
        self.store.save(&self.name, id, values).await
    }

    pub async fn delete_by_id(&self, id: impl Into<Bson>) -> DocumentStoreResult<u64> {
        self.store.delete_by_id(&self.name, id.into()).await
    }

    pub async fn delete_one(&self, query: Document) -> DocumentStoreResult<u64> {
        self.store.delete_one(&self.name, query).await
    }

    pub async fn delete_many(&self, query: Document) -> DocumentStoreResult<u64> {
        self.store.delete_many(&self.name, query).await
    }

    pub async fn find_one(&self, query: Document) -> DocumentStoreResult<Option<Document>> {
        self.store.find_one(&self.name, query).await
    }

    /// Looks a document up by identifier, in either its hex or canonical form.
    pub async fn find_by_id(&self, id: impl Into<Bson>) -> DocumentStoreResult<Option<Document>> {
        self.store
            .find_one(&self.name, bson::doc! { "_id": id.into() })
            .await
    }

    pub async fn find_one_and_update(
        &self,
        query: Document,
        values: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        self.store
            .find_one_and_update(&self.name, query, values, options)
            .await
    }

    pub async fn find_one_and_delete(&self, query: Document) -> DocumentStoreResult<u64> {
        self.store.find_one_and_delete(&self.name, query).await
    }

    pub async fn find(&self, query: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        self.store.find(&self.name, query, options).await
    }

    pub async fn count(&self, query: Document) -> DocumentStoreResult<u64> {
        self.store.count(&self.name, query).await
    }

    pub async fn create_index(&self, field: &str, options: IndexOptions) -> DocumentStoreResult<()> {
        self.store.create_index(&self.name, field, options).await
    }

    /// Removes every document and the collection itself.
    pub async fn clear(&self) -> DocumentStoreResult<()> {
        self.store.clear_collection(&self.name).await
    }
}
