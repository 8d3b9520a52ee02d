//! In-memory storage implementation for document stores.
//!
//! Documents are kept per collection in insertion order behind an async-aware read-write lock.
//! Queries scan the whole collection; indexes are only used to enforce uniqueness.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use docbridge_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::ConnectOptions,
    error::{DocumentStoreError, DocumentStoreResult},
    id::ID_FIELD,
    options::{FindOptions, IndexOptions, SortDirection, Update},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

/// URL scheme accepted by [`InMemoryStoreBuilder`].
pub const MEMORY_SCHEME: &str = "memory://";

#[derive(Debug, Clone, PartialEq)]
struct IndexSpec {
    field: String,
    options: IndexOptions,
}

#[derive(Debug, Default)]
struct StoreState {
    /// collection name -> documents in insertion order
    collections: HashMap<String, Vec<Document>>,
    /// collection name -> declared indexes
    indexes: HashMap<String, Vec<IndexSpec>>,
}

impl StoreState {
    /// Fails if `candidate` would violate a unique index of `collection`.
    ///
    /// `replacing` is the position of the document `candidate` replaces, which is exempt.
    fn check_unique(&self, collection: &str, candidate: &Document, replacing: Option<usize>) -> DocumentStoreResult<()> {
        let documents = self.collections.get(collection).map(Vec::as_slice).unwrap_or_default();

        let id_spec = IndexSpec { field: ID_FIELD.to_string(), options: IndexOptions::unique() };
        let specs = self.indexes.get(collection).map(Vec::as_slice).unwrap_or_default();

        for spec in std::iter::once(&id_spec).chain(specs.iter().filter(|spec| spec.options.unique)) {
            let value = lookup(candidate, &spec.field);
            if value.is_none() && spec.options.sparse {
                continue;
            }

            let value = Comparable::from(value);
            let duplicate = documents.iter().enumerate().any(|(position, existing)| {
                Some(position) != replacing
                    && !(spec.options.sparse && lookup(existing, &spec.field).is_none())
                    && Comparable::from(lookup(existing, &spec.field)) == value
            });

            if duplicate {
                return Err(DocumentStoreError::Backend(format!(
                    "duplicate key error collection: {collection} index: {}_1",
                    spec.field
                )));
            }
        }

        Ok(())
    }

    fn position(&self, collection: &str, filter: &Document) -> DocumentStoreResult<Option<usize>> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(None);
        };

        for (position, document) in documents.iter().enumerate() {
            if DocumentEvaluator::new(document).matches(filter)? {
                return Ok(Some(position));
            }
        }

        Ok(None)
    }

    fn insert(&mut self, collection: &str, document: Document) -> DocumentStoreResult<()> {
        self.check_unique(collection, &document, None)?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document);

        Ok(())
    }
}

/// Returns `document` with `_id` as its first field.
fn with_id_first(id: Bson, document: Document) -> Document {
    let mut prepared = Document::new();
    prepared.insert(ID_FIELD, id);

    for (key, value) in document {
        if key != ID_FIELD {
            prepared.insert(key, value);
        }
    }

    prepared
}

/// Sets `value` at a possibly dotted `path`, creating embedded documents as needed.
fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(embedded)) = document.get_mut(head) {
                set_path(embedded, rest, value);
            }
        }
    }
}

/// The fields an upsert copies from its filter: top-level equality conditions.
fn upsert_seed(filter: &Document) -> Document {
    filter
        .iter()
        .filter(|(key, value)| {
            !key.starts_with('$')
                && !key.contains('.')
                && !value
                    .as_document()
                    .and_then(|doc| doc.keys().next())
                    .is_some_and(|op| op.starts_with('$'))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn sort_documents(documents: &mut [Document], options: &FindOptions) {
    if options.sort.is_empty() {
        return;
    }

    documents.sort_by(|a, b| {
        options
            .sort
            .iter()
            .map(|key| {
                let left = Comparable::from(lookup(a, &key.field));
                let right = Comparable::from(lookup(b, &key.field));

                match key.direction {
                    SortDirection::Asc => left.sort_cmp(&right),
                    SortDirection::Desc => right.sort_cmp(&left),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Multiple clones of the
/// same instance share the same underlying data, which lets several adapters connect to one
/// store through [`InMemoryStoreBuilder::with_store`].
///
/// # Performance
///
/// Every query scans the collection. This backend targets development and tests.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder that connects adapters to a fresh store.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Lists the collections that currently exist.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names = self.state.read().await.collections.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Option<Bson>> {
        let id = document
            .get(ID_FIELD)
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

        self.state
            .write()
            .await
            .insert(collection, with_id_first(id.clone(), document))?;

        Ok(Some(id))
    }

    async fn replace_one(&self, collection: &str, id: Bson, document: Document) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;
        let document = with_id_first(id.clone(), document);

        match state.position(collection, &bson::doc! { ID_FIELD: id })? {
            Some(position) => {
                state.check_unique(collection, &document, Some(position))?;
                if let Some(documents) = state.collections.get_mut(collection) {
                    documents[position] = document;
                }
            }
            None => state.insert(collection, document)?,
        }

        Ok(())
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let mut state = self.state.write().await;

        match state.position(collection, &filter)? {
            Some(position) => {
                if let Some(documents) = state.collections.get_mut(collection) {
                    documents.remove(position);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let mut state = self.state.write().await;
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut keep = Vec::with_capacity(documents.len());
        for document in documents.iter() {
            keep.push(!DocumentEvaluator::new(document).matches(&filter)?);
        }

        let before = documents.len();
        let mut flags = keep.into_iter();
        documents.retain(|_| flags.next().unwrap_or(true));

        Ok((before - documents.len()) as u64)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        let state = self.state.read().await;

        Ok(state
            .position(collection, &filter)?
            .and_then(|position| state.collections.get(collection)?.get(position).cloned()))
    }

    async fn find(&self, collection: &str, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        let state = self.state.read().await;
        let Some(documents) = state.collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = DocumentEvaluator::filter_documents(documents, &filter)?
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        sort_documents(&mut matched, &options);

        // A limit of zero means no limit, as with MongoDB cursors.
        let limit = match options.limit {
            Some(0) | None => usize::MAX,
            Some(limit) => limit as usize,
        };

        Ok(matched
            .into_iter()
            .skip(options.skip.unwrap_or(0) as usize)
            .take(limit)
            .collect())
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Update,
        upsert: bool,
    ) -> DocumentStoreResult<Option<Document>> {
        let mut state = self.state.write().await;

        if let Some(position) = state.position(collection, &filter)? {
            let Some(current) = state.collections.get(collection).and_then(|docs| docs.get(position)) else {
                return Ok(None);
            };

            let fields = match &update {
                Update::Set(fields) => fields,
                Update::SetOnInsert(_) => return Ok(Some(current.clone())),
            };

            let mut updated = current.clone();
            for (path, value) in fields {
                set_path(&mut updated, path, value.clone());
            }

            if Comparable::from(updated.get(ID_FIELD)) != Comparable::from(current.get(ID_FIELD)) {
                return Err(DocumentStoreError::Backend(format!(
                    "update would modify the immutable field '{ID_FIELD}'"
                )));
            }

            state.check_unique(collection, &updated, Some(position))?;
            if let Some(documents) = state.collections.get_mut(collection) {
                documents[position] = updated.clone();
            }

            return Ok(Some(updated));
        }

        if !upsert {
            return Ok(None);
        }

        let mut created = upsert_seed(&filter);
        for (path, value) in update.fields() {
            set_path(&mut created, path, value.clone());
        }

        let id = created
            .get(ID_FIELD)
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
        let created = with_id_first(id, created);

        debug!(collection, "upsert inserted a new document");
        state.insert(collection, created.clone())?;

        Ok(Some(created))
    }

    async fn find_one_and_delete(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        let mut state = self.state.write().await;

        Ok(match state.position(collection, &filter)? {
            Some(position) => state
                .collections
                .get_mut(collection)
                .map(|documents| documents.remove(position)),
            None => None,
        })
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let state = self.state.read().await;
        let Some(documents) = state.collections.get(collection) else {
            return Ok(0);
        };

        Ok(DocumentEvaluator::filter_documents(documents, &filter)?.len() as u64)
    }

    async fn create_index(&self, collection: &str, field: &str, options: IndexOptions) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;
        let spec = IndexSpec { field: field.to_string(), options };

        if let Some(existing) = state
            .indexes
            .get(collection)
            .and_then(|specs| specs.iter().find(|s| s.field == field))
        {
            if existing.options == options {
                return Ok(());
            }

            return Err(DocumentStoreError::Backend(format!(
                "index {field}_1 already exists with different options"
            )));
        }

        if options.unique {
            let documents = state.collections.get(collection).map(Vec::as_slice).unwrap_or_default();
            for (position, document) in documents.iter().enumerate() {
                if options.sparse && lookup(document, field).is_none() {
                    continue;
                }

                let value = Comparable::from(lookup(document, field));
                let duplicated = documents[position + 1..].iter().any(|other| {
                    !(options.sparse && lookup(other, field).is_none())
                        && Comparable::from(lookup(other, field)) == value
                });

                if duplicated {
                    return Err(DocumentStoreError::Backend(format!(
                        "cannot create unique index {field}_1 on {collection}: duplicate values"
                    )));
                }
            }
        }

        state.collections.entry(collection.to_string()).or_default();
        state.indexes.entry(collection.to_string()).or_default().push(spec);

        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;
        state.collections.remove(collection);
        state.indexes.remove(collection);

        Ok(())
    }

    async fn drop_database(&self) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;
        state.collections.clear();
        state.indexes.clear();

        Ok(())
    }
}

/// Builder that "connects" adapters to an in-memory store.
///
/// Only URLs starting with `memory://` are accepted. Without [`with_store`](Self::with_store),
/// every connection gets a fresh, empty store.
///
/// # Example
///
/// ```ignore
/// use docbridge_memory::InMemoryStoreBuilder;
///
/// let store = DocumentStore::new(InMemoryStoreBuilder::default());
/// store.connect("memory://", &ConnectOptions::default()).await?;
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStoreBuilder {
    store: Option<InMemoryStore>,
}

impl InMemoryStoreBuilder {
    /// Connects to `store` instead of a fresh one.
    pub fn with_store(store: InMemoryStore) -> Self {
        Self { store: Some(store) }
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(&self, url: &str, _options: &ConnectOptions) -> DocumentStoreResult<Self::Backend> {
        if !url.starts_with(MEMORY_SCHEME) {
            return Err(DocumentStoreError::Connection(format!(
                "unsupported url {url:?}, expected {MEMORY_SCHEME}"
            )));
        }

        Ok(self.store.clone().unwrap_or_default())
    }
}
