//! Storage backend abstraction for the model layer.
//!
//! This module defines the trait every underlying document store implements. The model
//! layer talks to stores exclusively through [`StoreBackend`]: it hands over the canonical
//! collection name and the already-stamped arguments, and gets back the store's native
//! result shape.
//!
//! # Overview
//!
//! - Read verbs (`find`, `count`, `find_one`) return the store's answer untouched.
//! - Write verbs return either the written documents (`insert`, `save`) or an
//!   [`Envelope`](crate::outcome::Envelope) (`update`, `remove`, `find_and_modify`).
//! - Collections are created lazily by the store on first write; the model layer never
//!   checks for existence up front.
//!
//! # Examples
//!
//! ```ignore
//! use docmodel::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let inserted = backend.insert("users", vec![doc! { "name": "Alice" }]).await?;
//! assert!(inserted[0].contains_key("_id"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use futures::stream::BoxStream;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindAndModify, FindOptions, RemoveOptions, UpdateOptions},
    outcome::Envelope,
};

/// A lazily evaluated sequence of documents produced by `find`.
///
/// Each `find` call yields a fresh stream; consuming one does not affect another.
pub type DocumentStream = BoxStream<'static, DocumentStoreResult<Document>>;

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and support concurrent access from multiple async
/// tasks. Two concurrent writes against the same collection are not serialized by the model
/// layer; any atomicity (notably for [`find_and_modify`](StoreBackend::find_and_modify)) is
/// the backend's responsibility.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult). The
/// model layer reports failures and returns them to callers unchanged, so backends should
/// produce errors that are meaningful on their own.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Queries documents matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `collection` - The canonical collection name
    /// * `filter` - A query document; an empty document matches everything
    /// * `options` - Limit, skip and sort
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<DocumentStream>;

    /// Counts documents matching `filter`.
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Returns the first document matching `filter`, if any.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Inserts documents, assigning an `_id` to those lacking one.
    ///
    /// # Returns
    ///
    /// The documents as stored, in input order, including their `_id`.
    ///
    /// # Errors
    ///
    /// Fails without inserting anything if an `_id` is already taken.
    async fn insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Applies `update` to documents matching `filter`.
    ///
    /// `update` is either a document of update operators or a replacement document.
    ///
    /// # Returns
    ///
    /// An envelope whose `value` holds the updated document for single-document updates and
    /// is empty for multi updates.
    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Envelope>;

    /// Removes documents matching `filter`.
    ///
    /// # Returns
    ///
    /// An envelope whose `n` is the number of removed documents.
    async fn remove(
        &self,
        collection: &str,
        filter: Document,
        options: RemoveOptions,
    ) -> DocumentStoreResult<Envelope>;

    /// Inserts `document`, or replaces the stored document with the same `_id`.
    ///
    /// # Returns
    ///
    /// The document as stored, including its `_id`.
    async fn save(&self, collection: &str, document: Document) -> DocumentStoreResult<Document>;

    /// Atomically selects one document and updates or removes it.
    ///
    /// # Returns
    ///
    /// An envelope whose `value` is the post-image when `command.new` is set and the
    /// pre-image otherwise.
    async fn find_and_modify(
        &self,
        collection: &str,
        command: FindAndModify,
    ) -> DocumentStoreResult<Envelope>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Drops (deletes) a collection and all its documents.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Constructs a document identifier.
    ///
    /// With `hex` set, parses a 24-character hexadecimal id; otherwise generates a new one.
    fn object_id(&self, hex: Option<&str>) -> DocumentStoreResult<ObjectId> {
        match hex {
            Some(hex) => ObjectId::parse_str(hex)
                .map_err(|e| DocumentStoreError::InvalidDocument(e.to_string())),
            None => Ok(ObjectId::new()),
        }
    }

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<DocumentStream> {
        (*self)
            .find(collection, filter, options)
            .await
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        (*self).count(collection, filter).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        (*self).find_one(collection, filter).await
    }

    async fn insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        (*self).insert(collection, documents).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Envelope> {
        (*self)
            .update(collection, filter, update, options)
            .await
    }

    async fn remove(
        &self,
        collection: &str,
        filter: Document,
        options: RemoveOptions,
    ) -> DocumentStoreResult<Envelope> {
        (*self)
            .remove(collection, filter, options)
            .await
    }

    async fn save(&self, collection: &str, document: Document) -> DocumentStoreResult<Document> {
        (*self).save(collection, document).await
    }

    async fn find_and_modify(
        &self,
        collection: &str,
        command: FindAndModify,
    ) -> DocumentStoreResult<Envelope> {
        (*self)
            .find_and_modify(collection, command)
            .await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (*self).list_collections().await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (*self).drop_collection(name).await
    }

    fn object_id(&self, hex: Option<&str>) -> DocumentStoreResult<ObjectId> {
        (*self).object_id(hex)
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<DocumentStream> {
        (**self)
            .find(collection, filter, options)
            .await
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        (**self).count(collection, filter).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        (**self).find_one(collection, filter).await
    }

    async fn insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        (**self).insert(collection, documents).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Envelope> {
        (**self)
            .update(collection, filter, update, options)
            .await
    }

    async fn remove(
        &self,
        collection: &str,
        filter: Document,
        options: RemoveOptions,
    ) -> DocumentStoreResult<Envelope> {
        (**self)
            .remove(collection, filter, options)
            .await
    }

    async fn save(&self, collection: &str, document: Document) -> DocumentStoreResult<Document> {
        (**self).save(collection, document).await
    }

    async fn find_and_modify(
        &self,
        collection: &str,
        command: FindAndModify,
    ) -> DocumentStoreResult<Envelope> {
        (**self)
            .find_and_modify(collection, command)
            .await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (**self).list_collections().await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (**self).drop_collection(name).await
    }

    fn object_id(&self, hex: Option<&str>) -> DocumentStoreResult<ObjectId> {
        (**self).object_id(hex)
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
