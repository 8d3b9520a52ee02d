//! MongoDB backend implementation for docbridge.
//!
//! This crate implements the `StoreBackend` trait on top of the official async MongoDB driver.
//! Queries arrive already normalized, so `_id` filters carry native ObjectIds and are passed to
//! the driver as-is.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbridge = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{prelude::*, mongodb::MongoDbStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(MongoDbStoreBuilder::new());
//!     store
//!         .connect("mongodb://localhost:27017", &ConnectOptions::new().with_database("app"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
