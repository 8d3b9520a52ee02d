//! In-memory document storage backend for docbridge.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **MongoDB-style filters** - Comparison, membership, existence and logical operators
//! - **Cursor options** - Multi-key sorting, skip and limit
//! - **Find-and-modify** - `$set` merges and `$setOnInsert` upserts
//! - **Unique indexes** - Including sparse unique indexes
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryStoreBuilder};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStoreBuilder::default());
//!     store.connect("memory://", &ConnectOptions::default()).await?;
//!
//!     let id = store.save("users", None, doc! { "name": "Alice" }).await?;
//!     let user = store.find_one("users", doc! { "_id": id }).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder, MEMORY_SCHEME};
