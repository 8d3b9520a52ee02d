//! A document store adapter that provides one CRUD contract over interchangeable backends.
//!
//! This crate is the core of the docbridge project and provides:
//!
//! - **Identifiers** ([`id`]) - The canonical identifier type and its caller-facing hex form
//! - **Query normalization** ([`normalize`]) - Rewrites `_id` fields anywhere in a query to canonical identifiers
//! - **Options** ([`options`]) - Sort/skip/limit cursor options, update and index options
//! - **Store backend abstraction** ([`backend`]) - The seam a document database driver implements
//! - **Adapter contract** ([`adapter`]) - The CRUD and connection interface application code uses
//! - **Document store** ([`store`]) - The adapter implementation with its connection lifecycle
//! - **Collections interface** ([`collection`]) - Handles bound to a single collection
//! - **Configuration** ([`config`]) - Connection URL and pass-through options
//! - **Error handling** ([`error`]) - Error taxonomy and result type
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
//!
//! // Hex strings are converted to canonical identifiers before the query is sent.
//! let hex = store.to_canonical_string(&id);
//! let user = store.find_one("users", doc! { "_id": { "$in": [hex] } }).await?;
//! ```

pub mod adapter;
pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod id;
pub mod normalize;
pub mod options;
pub mod store;
