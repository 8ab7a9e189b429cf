//! In-memory storage implementation for the model layer.
//!
//! Collections are kept as insertion-ordered vectors of BSON documents behind an
//! async-safe read-write lock. Every write verb holds the write lock for its whole
//! duration, so `find_and_modify` is atomic with respect to other calls.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use futures::{StreamExt, stream};
use mea::rwlock::RwLock;

use docmodel_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder},
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindAndModify, FindOptions, RemoveOptions, UpdateOptions},
    outcome::Envelope,
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator, lookup_path},
    modifier::{apply_update, upsert_seed},
};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones share
/// the same underlying data.
///
/// # Performance
///
/// Queries scan every document of a collection; there are no indexes.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert("users", vec![doc! { "name": "Alice", "age": 30 }]).await?;
///
/// let found = store.find_one("users", doc! { "age": { "$gte": 18 } }).await?;
/// assert!(found.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

/// Positions of the documents matching `filter`, in storage order.
fn matching(documents: &[Document], filter: &Document) -> DocumentStoreResult<Vec<usize>> {
    let mut positions = Vec::new();

    for (position, document) in documents.iter().enumerate() {
        if DocumentEvaluator::new(document).evaluate(filter)? {
            positions.push(position);
        }
    }

    Ok(positions)
}

/// Orders two documents by a sort specification such as `{ "age": -1, "name": 1 }`.
fn compare_by(left: &Document, right: &Document, sort: &Document) -> Ordering {
    for (path, direction) in sort {
        let descending = match direction {
            Bson::Int32(n) => *n < 0,
            Bson::Int64(n) => *n < 0,
            Bson::Double(n) => *n < 0.0,
            _ => false,
        };

        let ordering = sort_key(left, path).sort_cmp(&sort_key(right, path));
        let ordering = if descending { ordering.reverse() } else { ordering };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn sort_key<'a>(document: &'a Document, path: &str) -> Comparable<'a> {
    lookup_path(document, path)
        .into_iter()
        .next()
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

/// Picks the matching position that sorts first, or the first match without a sort.
fn select(
    documents: &[Document],
    filter: &Document,
    sort: Option<&Document>,
) -> DocumentStoreResult<Option<usize>> {
    let positions = matching(documents, filter)?;

    Ok(match sort {
        Some(sort) => positions
            .into_iter()
            .min_by(|a, b| compare_by(&documents[*a], &documents[*b], sort)),
        None => positions.into_iter().next(),
    })
}

fn ensure_id(document: &mut Document) -> Bson {
    match document.get(ID_FIELD) {
        Some(id) if *id != Bson::Null => id.clone(),
        _ => {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert(ID_FIELD, id.clone());
            id
        }
    }
}

/// Inserts the document an upsert creates. Returns it together with its id.
fn upsert(
    documents: &mut Vec<Document>,
    collection: &str,
    filter: &Document,
    update: &Document,
) -> DocumentStoreResult<(Document, Bson)> {
    let mut seed = upsert_seed(filter, update)?;
    let id = ensure_id(&mut seed);

    if documents.iter().any(|existing| existing.get(ID_FIELD) == Some(&id)) {
        return Err(DocumentStoreError::DocumentAlreadyExists(
            id.to_string(),
            collection.to_string(),
        ));
    }

    documents.push(seed.clone());
    Ok((seed, id))
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<DocumentStream> {
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(documents) => documents,
            None => return Ok(stream::empty().boxed()),
        };

        let mut found = matching(documents, &filter)?
            .into_iter()
            .map(|position| documents[position].clone())
            .collect::<Vec<_>>();

        if let Some(sort) = &options.sort {
            found.sort_by(|a, b| compare_by(a, b, sort));
        }

        // A zero limit means no limit.
        let limit = match options.limit {
            Some(0) | None => usize::MAX,
            Some(limit) => limit as usize,
        };

        let found = found
            .into_iter()
            .skip(options.skip.unwrap_or(0) as usize)
            .take(limit)
            .map(Ok)
            .collect::<Vec<_>>();

        Ok(stream::iter(found).boxed())
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;

        Ok(match store.get(collection) {
            Some(documents) => matching(documents, &filter)?.len() as u64,
            None => 0,
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(None);
        };

        Ok(select(documents, &filter, None)?.map(|position| documents[position].clone()))
    }

    async fn insert(
        &self,
        collection: &str,
        mut documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut store = self.store.write().await;
        let stored = store
            .entry(collection.to_string())
            .or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for document in documents.iter_mut() {
            let id = ensure_id(document);

            if ids.contains(&id) || stored.iter().any(|existing| existing.get(ID_FIELD) == Some(&id)) {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    id.to_string(),
                    collection.to_string(),
                ));
            }

            ids.push(id);
        }

        stored.extend(documents.iter().cloned());
        Ok(documents)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Envelope> {
        let mut store = self.store.write().await;

        let positions = match store.get(collection) {
            Some(documents) if options.multi => matching(documents, &filter)?,
            Some(documents) => select(documents, &filter, None)?
                .into_iter()
                .collect(),
            None => Vec::new(),
        };

        if positions.is_empty() {
            if !options.upsert {
                return Ok(Envelope::with_value(None));
            }

            let documents = store
                .entry(collection.to_string())
                .or_default();
            let (inserted, id) = upsert(documents, collection, &filter, &update)?;

            return Ok(Envelope {
                value: (!options.multi).then_some(inserted),
                n: 1,
                upserted_id: Some(id),
            });
        }

        let documents = store
            .get_mut(collection)
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(collection.to_string()))?;

        let mut updated = Vec::with_capacity(positions.len());
        for position in &positions {
            let mut document = documents[*position].clone();
            apply_update(&mut document, &update, false)?;
            updated.push((*position, document));
        }

        let n = updated.len() as u64;
        let mut last = None;
        for (position, document) in updated {
            documents[position] = document.clone();
            last = Some(document);
        }

        Ok(Envelope {
            value: if options.multi { None } else { last },
            n,
            upserted_id: None,
        })
    }

    async fn remove(
        &self,
        collection: &str,
        filter: Document,
        options: RemoveOptions,
    ) -> DocumentStoreResult<Envelope> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(Envelope::with_count(0));
        };

        let mut positions = matching(documents, &filter)?;
        if options.just_one {
            positions.truncate(1);
        }

        for position in positions.iter().rev() {
            documents.remove(*position);
        }

        Ok(Envelope::with_count(positions.len() as u64))
    }

    async fn save(&self, collection: &str, mut document: Document) -> DocumentStoreResult<Document> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        let id = ensure_id(&mut document);

        match documents
            .iter_mut()
            .find(|existing| existing.get(ID_FIELD) == Some(&id))
        {
            Some(existing) => *existing = document.clone(),
            None => documents.push(document.clone()),
        }

        Ok(document)
    }

    async fn find_and_modify(
        &self,
        collection: &str,
        command: FindAndModify,
    ) -> DocumentStoreResult<Envelope> {
        if command.remove == command.update.is_some() {
            return Err(DocumentStoreError::InvalidArguments(
                "findAndModify".to_string(),
                "exactly one of update and remove is required".to_string(),
            ));
        }

        let mut store = self.store.write().await;

        let position = match store.get(collection) {
            Some(documents) => select(documents, &command.query, command.sort.as_ref())?,
            None => None,
        };

        let Some(update) = command.update else {
            let removed = match position {
                Some(position) => store
                    .get_mut(collection)
                    .map(|documents| documents.remove(position)),
                None => None,
            };
            return Ok(Envelope::with_value(removed));
        };

        let Some(position) = position else {
            if !command.upsert {
                return Ok(Envelope::with_value(None));
            }

            let documents = store
                .entry(collection.to_string())
                .or_default();
            let (inserted, id) = upsert(documents, collection, &command.query, &update)?;
            return Ok(Envelope {
                value: command.new.then_some(inserted),
                n: 1,
                upserted_id: Some(id),
            });
        };

        let documents = store
            .get_mut(collection)
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(collection.to_string()))?;

        let before = documents[position].clone();
        let mut after = before.clone();
        apply_update(&mut after, &update, false)?;
        documents[position] = after.clone();

        Ok(Envelope::with_value(Some(if command.new { after } else { before })))
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .keys()
                .cloned()
                .collect()
        )
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
