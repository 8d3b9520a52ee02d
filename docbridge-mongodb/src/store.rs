use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection, Database, IndexModel,
    options::{
        ClientOptions, FindOptions as MongoFindOptions, IndexOptions as MongoIndexOptions,
        ReturnDocument,
    },
};
use tracing::{debug, info};

use docbridge_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::ConnectOptions,
    error::{DocumentStoreError, DocumentStoreResult},
    id::ID_FIELD,
    options::{FindOptions, IndexOptions, SortKey, Update},
};

fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

fn connection_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Connection(err.to_string())
}

/// Translates cursor options into the driver's find options.
pub(crate) fn find_options(options: &FindOptions) -> MongoFindOptions {
    let mut find = MongoFindOptions::default();

    if !options.sort.is_empty() {
        find.sort = Some(SortKey::to_document(&options.sort));
    }
    find.skip = options.skip;
    find.limit = options
        .limit
        .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

    find
}

/// Copies the pass-through connection options onto the parsed client options.
pub(crate) fn apply_connect_options(client_options: &mut ClientOptions, options: &ConnectOptions) {
    if let Some(app_name) = &options.app_name {
        client_options.app_name = Some(app_name.clone());
    }
    if let Some(size) = options.max_pool_size {
        client_options.max_pool_size = Some(size);
    }
    if let Some(size) = options.min_pool_size {
        client_options.min_pool_size = Some(size);
    }
    if let Some(timeout) = options.connect_timeout() {
        client_options.connect_timeout = Some(timeout);
    }
    if let Some(timeout) = options.server_selection_timeout() {
        client_options.server_selection_timeout = Some(timeout);
    }
}

/// MongoDB backend bound to one database.
///
/// The driver's `Client` pools connections internally and is shared by every operation.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder() -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::default()
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.database().collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Option<Bson>> {
        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(backend_error)?;

        Ok(Some(result.inserted_id))
    }

    async fn replace_one(&self, collection: &str, id: Bson, mut document: Document) -> DocumentStoreResult<()> {
        document.remove(ID_FIELD);

        self.get_collection(collection)
            .replace_one(doc! { ID_FIELD: id }, document)
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        Ok(self
            .get_collection(collection)
            .delete_one(filter)
            .await
            .map_err(backend_error)?
            .deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        Ok(self
            .get_collection(collection)
            .delete_many(filter)
            .await
            .map_err(backend_error)?
            .deleted_count)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(backend_error)
    }

    async fn find(&self, collection: &str, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(find_options(&options))
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Update,
        upsert: bool,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one_and_update(filter, update.to_document())
            .upsert(upsert)
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_delete(&self, collection: &str, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one_and_delete(filter)
            .await
            .map_err(backend_error)
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(backend_error)
    }

    async fn create_index(&self, collection: &str, field: &str, options: IndexOptions) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { field: 1 })
                    .options(
                        MongoIndexOptions::builder()
                            .unique(options.unique)
                            .sparse(options.sparse)
                            .build(),
                    )
                    .build(),
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .drop()
            .await
            .map_err(backend_error)
    }

    async fn drop_database(&self) -> DocumentStoreResult<()> {
        self.database()
            .drop()
            .await
            .map_err(backend_error)
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        debug!(database = %self.database, "shutting down MongoDB client");
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Connects to MongoDB.
///
/// The database comes from [`ConnectOptions::database`], then from the path of the connection
/// string, then from [`with_database`](Self::with_database). Connecting pings the server so an
/// unreachable deployment is reported as a connection error up front.
#[derive(Debug, Default, Clone)]
pub struct MongoDbStoreBuilder {
    default_database: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(&self, url: &str, options: &ConnectOptions) -> DocumentStoreResult<Self::Backend> {
        let mut client_options = ClientOptions::parse(url)
            .await
            .map_err(connection_error)?;
        apply_connect_options(&mut client_options, options);

        let database = options
            .database
            .clone()
            .or_else(|| client_options.default_database.clone())
            .or_else(|| self.default_database.clone())
            .ok_or_else(|| {
                DocumentStoreError::Connection("no database named in options or connection string".into())
            })?;

        let client = Client::with_options(client_options).map_err(connection_error)?;
        client
            .database(&database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        info!(database = %database, "connected to MongoDB");
        Ok(MongoDbStore::new(client, database))
    }
}
