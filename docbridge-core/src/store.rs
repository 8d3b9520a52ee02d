//! The store adapter.
//!
//! [`DocumentStore`] owns a [`StoreBackendBuilder`] and the connection it produces. Every
//! query-accepting operation runs the query through [`normalize`] before the backend sees it.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected --close--> Closed
//!                               |
//!                               +--error--> Disconnected
//! ```
//!
//! Operations are only valid while `Connected`; anything else fails with
//! [`DocumentStoreError::InvalidState`].
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryStoreBuilder};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStoreBuilder::default());
//! store.connect("memory://", &ConnectOptions::default()).await?;
//!
//! let id = store.save("users", None, doc! { "name": "Alice" }).await?;
//! let user = store
//!     .find_one("users", doc! { "_id": store.to_canonical_string(&id) })
//!     .await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use mea::{mutex::Mutex, rwlock::RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    adapter::StoreAdapter,
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::{ConnectOptions, StoreConfig},
    error::{DocumentStoreError, DocumentStoreResult, Operation},
    id::ID_FIELD,
    normalize::{normalize, normalize_value},
    options::{FindOptions, IndexOptions, Update, UpdateOptions},
};

/// Observable phase of a store's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

enum Lifecycle<B> {
    Disconnected,
    Connecting,
    Connected(Arc<B>),
    Closed,
}

impl<B> Lifecycle<B> {
    fn state(&self) -> ConnectionState {
        match self {
            Lifecycle::Disconnected => ConnectionState::Disconnected,
            Lifecycle::Connecting => ConnectionState::Connecting,
            Lifecycle::Connected(_) => ConnectionState::Connected,
            Lifecycle::Closed => ConnectionState::Closed,
        }
    }
}

/// A document store bound to one backend connection.
///
/// The connection handle is shared by all callers. The lifecycle lock is only held while the
/// handle is looked up, never across a backend call.
pub struct DocumentStore<C: StoreBackendBuilder> {
    builder: C,
    lifecycle: RwLock<Lifecycle<C::Backend>>,
    connect_gate: Mutex<()>,
}

impl<C: StoreBackendBuilder> DocumentStore<C> {
    /// Creates a disconnected store that will connect through `builder`.
    pub fn new(builder: C) -> Self {
        Self {
            builder,
            lifecycle: RwLock::new(Lifecycle::Disconnected),
            connect_gate: Mutex::new(()),
        }
    }

    /// Creates a store and connects it.
    pub async fn connected(builder: C, url: &str, options: &ConnectOptions) -> DocumentStoreResult<Self> {
        let store = Self::new(builder);
        store.connect(url, options).await?;

        Ok(store)
    }

    /// Connects using a [`StoreConfig`].
    pub async fn connect_with(&self, config: &StoreConfig) -> DocumentStoreResult<()> {
        self.connect(&config.url, &config.options).await
    }

    pub async fn state(&self) -> ConnectionState {
        self.lifecycle.read().await.state()
    }

    /// Gets a handle bound to the collection `name`.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, Self> {
        Collection::new(name.to_string(), self)
    }

    async fn backend(&self, operation: Operation) -> DocumentStoreResult<Arc<C::Backend>> {
        let reason = match &*self.lifecycle.read().await {
            Lifecycle::Connected(backend) => return Ok(Arc::clone(backend)),
            Lifecycle::Disconnected => "store is not connected",
            Lifecycle::Connecting => "store is still connecting",
            Lifecycle::Closed => "store is closed",
        };

        warn!(%operation, reason, "rejected operation");
        Err(DocumentStoreError::InvalidState(format!("cannot {operation}: {reason}")))
    }
}

fn failed(operation: Operation, collection: &str, err: DocumentStoreError) -> DocumentStoreError {
    let err = err.within(operation);
    warn!(%operation, collection, error = %err, "operation failed");
    err
}

/// Converts a caller-supplied `_id` inside a document body to the canonical encoding.
fn normalize_body(mut values: Document) -> Document {
    if let Some(id) = values.remove(ID_FIELD) {
        values.insert(ID_FIELD, normalize_value(id));
    }

    values
}

#[async_trait]
impl<C: StoreBackendBuilder> StoreAdapter for DocumentStore<C> {
    async fn connect(&self, url: &str, options: &ConnectOptions) -> DocumentStoreResult<()> {
        let _gate = self.connect_gate.lock().await;

        {
            let mut lifecycle = self.lifecycle.write().await;
            match &*lifecycle {
                Lifecycle::Connected(_) => {
                    debug!("already connected, reusing connection");
                    return Ok(());
                }
                Lifecycle::Closed => {
                    return Err(DocumentStoreError::InvalidState(format!(
                        "cannot {}: store is closed",
                        Operation::Connect
                    )));
                }
                Lifecycle::Disconnected | Lifecycle::Connecting => {}
            }
            *lifecycle = Lifecycle::Connecting;
        }

        debug!(database = ?options.database, "connecting");

        match self.builder.build(url, options).await {
            Ok(backend) => {
                let mut lifecycle = self.lifecycle.write().await;
                if matches!(&*lifecycle, Lifecycle::Closed) {
                    drop(lifecycle);
                    backend.shutdown().await?;
                    return Err(DocumentStoreError::InvalidState(
                        "store was closed while connecting".into(),
                    ));
                }

                *lifecycle = Lifecycle::Connected(Arc::new(backend));
                info!(database = ?options.database, "connected");
                Ok(())
            }
            Err(err) => {
                let mut lifecycle = self.lifecycle.write().await;
                if matches!(&*lifecycle, Lifecycle::Connecting) {
                    *lifecycle = Lifecycle::Disconnected;
                }

                warn!(operation = %Operation::Connect, error = %err, "connection failed");
                Err(match err {
                    DocumentStoreError::Connection(_) => err,
                    other => DocumentStoreError::Connection(other.to_string()),
                })
            }
        }
    }

    async fn close(&self) -> DocumentStoreResult<()> {
        let previous = std::mem::replace(&mut *self.lifecycle.write().await, Lifecycle::Closed);

        match previous {
            Lifecycle::Connected(backend) => {
                backend
                    .shutdown()
                    .await
                    .map_err(|e| e.within(Operation::Close))?;
                info!("closed");
            }
            Lifecycle::Closed => debug!("already closed"),
            Lifecycle::Disconnected | Lifecycle::Connecting => info!("closed before connecting"),
        }

        Ok(())
    }

    async fn save(&self, collection: &str, id: Option<Bson>, values: Document) -> DocumentStoreResult<Bson> {
        let backend = self.backend(Operation::Save).await?;
        let values = normalize_body(values);

        let id = match id.map(normalize_value) {
            Some(Bson::Null) | None => None,
            Some(id) => Some(id),
        };

        let saved = match id {
            Some(id) => {
                debug!(collection, id = %id, "replacing document");
                backend
                    .replace_one(collection, id.clone(), values)
                    .await
                    .map_err(|e| failed(Operation::Save, collection, e))?;
                Some(id)
            }
            None => {
                debug!(collection, "inserting document");
                backend
                    .insert_one(collection, values)
                    .await
                    .map_err(|e| failed(Operation::Save, collection, e))?
            }
        };

        match saved {
            Some(Bson::Null) | None => {
                warn!(collection, "save produced no identifier");
                Err(DocumentStoreError::Persistence { collection: collection.to_string() })
            }
            Some(id) => Ok(id),
        }
    }

    async fn delete_by_id(&self, collection: &str, id: Bson) -> DocumentStoreResult<u64> {
        let backend = self.backend(Operation::DeleteById).await?;

        if let Bson::Null = id {
            debug!(collection, "null identifier, nothing to delete");
            return Ok(0);
        }

        let deleted = backend
            .delete_one(collection, doc! { ID_FIELD: normalize_value(id) })
            .await
            .map_err(|e| failed(Operation::DeleteById, collection, e))?;

        debug!(collection, deleted, "deleted by id");
        Ok(deleted)
    }

    async fn delete_one(&self, collection: &str, query: Document) -> DocumentStoreResult<u64> {
        let backend = self.backend(Operation::DeleteOne).await?;

        let deleted = backend
            .delete_one(collection, normalize(query))
            .await
            .map_err(|e| failed(Operation::DeleteOne, collection, e))?;

        debug!(collection, deleted, "deleted one");
        Ok(deleted)
    }

    async fn delete_many(&self, collection: &str, query: Document) -> DocumentStoreResult<u64> {
        let backend = self.backend(Operation::DeleteMany).await?;

        let deleted = backend
            .delete_many(collection, normalize(query))
            .await
            .map_err(|e| failed(Operation::DeleteMany, collection, e))?;

        debug!(collection, deleted, "deleted many");
        Ok(deleted)
    }

    async fn find_one(&self, collection: &str, query: Document) -> DocumentStoreResult<Option<Document>> {
        let backend = self.backend(Operation::FindOne).await?;

        backend
            .find_one(collection, normalize(query))
            .await
            .map_err(|e| failed(Operation::FindOne, collection, e))
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        query: Document,
        values: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        let backend = self.backend(Operation::FindOneAndUpdate).await?;

        if values.is_empty() {
            warn!(collection, "rejected update without fields");
            return Err(DocumentStoreError::InvalidDocument(format!(
                "cannot {}: update has no fields",
                Operation::FindOneAndUpdate
            )));
        }

        let values = normalize_body(values);
        let update = if options.upsert {
            Update::SetOnInsert(values)
        } else {
            Update::Set(values)
        };

        debug!(collection, upsert = options.upsert, "find one and update");
        backend
            .find_one_and_update(collection, normalize(query), update, options.upsert)
            .await
            .map_err(|e| failed(Operation::FindOneAndUpdate, collection, e))
    }

    async fn find_one_and_delete(&self, collection: &str, query: Document) -> DocumentStoreResult<u64> {
        let backend = self.backend(Operation::FindOneAndDelete).await?;

        let deleted = backend
            .find_one_and_delete(collection, normalize(query))
            .await
            .map_err(|e| failed(Operation::FindOneAndDelete, collection, e))?;

        Ok(if deleted.is_some() { 1 } else { 0 })
    }

    async fn find(&self, collection: &str, query: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        let backend = self.backend(Operation::Find).await?;

        let documents = backend
            .find(collection, normalize(query), options)
            .await
            .map_err(|e| failed(Operation::Find, collection, e))?;

        debug!(collection, returned = documents.len(), "find");
        Ok(documents)
    }

    async fn count(&self, collection: &str, query: Document) -> DocumentStoreResult<u64> {
        let backend = self.backend(Operation::Count).await?;

        backend
            .count(collection, normalize(query))
            .await
            .map_err(|e| failed(Operation::Count, collection, e))
    }

    async fn create_index(&self, collection: &str, field: &str, options: IndexOptions) -> DocumentStoreResult<()> {
        let backend = self.backend(Operation::CreateIndex).await?;

        debug!(collection, field, unique = options.unique, sparse = options.sparse, "creating index");
        backend
            .create_index(collection, field, options)
            .await
            .map_err(|e| failed(Operation::CreateIndex, collection, e))
    }

    async fn clear_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        let backend = self.backend(Operation::ClearCollection).await?;

        info!(collection, "dropping collection");
        backend
            .drop_collection(collection)
            .await
            .map_err(|e| failed(Operation::ClearCollection, collection, e))
    }

    async fn drop_database(&self) -> DocumentStoreResult<()> {
        let backend = self.backend(Operation::DropDatabase).await?;

        info!("dropping database");
        backend
            .drop_database()
            .await
            .map_err(|e| failed(Operation::DropDatabase, "*", e))
    }
}
