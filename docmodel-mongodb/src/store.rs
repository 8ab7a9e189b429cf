use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::{StreamExt, TryStreamExt};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{
        ClientOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions,
        FindOneAndUpdateOptions, FindOptions as MongoFindOptions, ReturnDocument,
    },
};
use tracing::info;

use docmodel_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder},
    config::ConnectionTarget,
    document::{ID_FIELD, is_operator_document, lacks_field},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindAndModify, FindOptions, RemoveOptions, UpdateOptions},
    outcome::Envelope,
};

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    /// Finds one document and updates or replaces it, depending on the shape of `update`.
    async fn modify_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        return_document: ReturnDocument,
        upsert: bool,
        sort: Option<Document>,
    ) -> DocumentStoreResult<Option<Document>> {
        let collection = self.get_collection(collection);

        if is_operator_document(&update) {
            let mut options = FindOneAndUpdateOptions::default();
            options.return_document = Some(return_document);
            options.upsert = Some(upsert);
            options.sort = sort;

            collection
                .find_one_and_update(filter, update)
                .with_options(options)
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))
        } else {
            let mut options = FindOneAndReplaceOptions::default();
            options.return_document = Some(return_document);
            options.upsert = Some(upsert);
            options.sort = sort;

            collection
                .find_one_and_replace(filter, update)
                .with_options(options)
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))
        }
    }
}

fn with_id(mut document: Document) -> Document {
    if lacks_field(&document, ID_FIELD) {
        document.insert(ID_FIELD, ObjectId::new());
    }

    document
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<DocumentStream> {
        let mut find_options = MongoFindOptions::default();
        find_options.limit = options.limit.map(|limit| limit as i64);
        find_options.skip = options.skip;
        find_options.sort = options.sort;

        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(find_options)
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))
                .boxed()
        )
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    async fn insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        let documents = documents
            .into_iter()
            .map(with_id)
            .collect::<Vec<_>>();

        if documents.is_empty() {
            return Ok(documents);
        }

        self.get_collection(collection)
            .insert_many(&documents)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(documents)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Envelope> {
        if !options.multi {
            return Ok(Envelope::with_value(
                self.modify_one(collection, filter, update, ReturnDocument::After, options.upsert, None)
                    .await?,
            ));
        }

        let result = self.get_collection(collection)
            .update_many(filter, update)
            .upsert(options.upsert)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(Envelope {
            value: None,
            n: result.matched_count + result.upserted_id.is_some() as u64,
            upserted_id: result.upserted_id,
        })
    }

    async fn remove(
        &self,
        collection: &str,
        filter: Document,
        options: RemoveOptions,
    ) -> DocumentStoreResult<Envelope> {
        let collection = self.get_collection(collection);

        let result = if options.just_one {
            collection.delete_one(filter).await
        } else {
            collection.delete_many(filter).await
        }
        .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(Envelope::with_count(result.deleted_count))
    }

    async fn save(&self, collection: &str, document: Document) -> DocumentStoreResult<Document> {
        let document = with_id(document);
        let id = document
            .get(ID_FIELD)
            .cloned()
            .unwrap_or(Bson::Null);

        self.get_collection(collection)
            .replace_one(doc! { ID_FIELD: id }, &document)
            .upsert(true)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(document)
    }

    async fn find_and_modify(
        &self,
        collection: &str,
        command: FindAndModify,
    ) -> DocumentStoreResult<Envelope> {
        let FindAndModify { query, update, remove, new, upsert, sort } = command;

        let value = match (update, remove) {
            (None, true) => {
                let mut options = FindOneAndDeleteOptions::default();
                options.sort = sort;

                self.get_collection(collection)
                    .find_one_and_delete(query)
                    .with_options(options)
                    .await
                    .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            }
            (Some(update), false) => {
                let return_document = if new { ReturnDocument::After } else { ReturnDocument::Before };
                self.modify_one(collection, query, update, return_document, upsert, sort)
                    .await?
            }
            _ => {
                return Err(DocumentStoreError::InvalidArguments(
                    "findAndModify".to_string(),
                    "exactly one of update and remove is required".to_string(),
                ));
            }
        };

        Ok(Envelope::with_value(value))
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }

    /// Creates a builder for a resolved connection target.
    pub fn from_target(target: &ConnectionTarget) -> Self {
        info!(connection = %target, database = target.database(), "using MongoDB");

        Self::new(&target.uri(), target.database())
    }

    /// Creates a builder for the target configured in the environment.
    pub fn from_env() -> Self {
        Self::from_target(&ConnectionTarget::from_env())
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
