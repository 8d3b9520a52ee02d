//! Main docbridge crate providing one persistence contract over document stores.
//!
//! This crate is the primary entry point for users of docbridge. It re-exports the core types
//! and gives access to the storage backends.
//!
//! # Features
//!
//! - **Identifier normalization** - `_id` values written as hex strings are converted to native
//!   identifiers anywhere in a query, including inside `$in` / `$nin`
//! - **Uniform CRUD contract** - [`adapter::StoreAdapter`] hides the driver behind one interface
//! - **Multiple backends** - In-memory and MongoDB storage behind the same trait
//! - **Cursor options** - Compact `"-field"` sort syntax, skip and limit
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryStoreBuilder};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStoreBuilder::default());
//!     store.connect("memory://", &ConnectOptions::default()).await?;
//!
//!     let users = store.collection("users");
//!     let id = users.save(None, doc! { "name": "Alice", "age": 30 }).await?;
//!
//!     // Callers may refer to the identifier by its hex form.
//!     let hex = store.to_canonical_string(&id);
//!     let alice = users.find_one(doc! { "_id": hex }).await?;
//!
//!     let oldest = users
//!         .find(doc! {}, FindOptions::builder().sort("-age").limit(10).build())
//!         .await?;
//!
//!     store.close().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`adapter::StoreAdapter`] is object safe, so a store can be chosen at runtime and shared as
//! `Arc<dyn StoreAdapter>`:
//!
//! ```ignore
//! let store: Arc<dyn StoreAdapter> = Arc::new(DocumentStore::new(InMemoryStoreBuilder::default()));
//! store.connect("memory://", &ConnectOptions::default()).await?;
//! let count = Collection::new("users".into(), store.as_ref()).count(doc! {}).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use docbridge_core::{adapter, backend, collection, config, error, id, normalize, options, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbridge_memory::{InMemoryStore, InMemoryStoreBuilder, MEMORY_SCHEME};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbridge_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
