//! Convenient re-exports of commonly used types from docbridge.
//!
//! ```ignore
//! use docbridge::prelude::*;
//! ```

pub use docbridge_core::{
    adapter::StoreAdapter,
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::{ConnectOptions, StoreConfig},
    error::{DocumentStoreError, DocumentStoreResult, Operation},
    id::{ID_FIELD, Identifier},
    normalize::normalize,
    options::{FindOptions, IndexOptions, SortDirection, SortKey, Update, UpdateOptions},
    store::{ConnectionState, DocumentStore},
};
