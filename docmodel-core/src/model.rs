//! Model handles and verb dispatch.
//!
//! A [`ModelHandle`] binds a canonical collection name to a [`ModelStore`]. It exposes the
//! fixed verb set of the model layer and routes each call one of two ways:
//!
//! - **pass-through** (`find`, `count`, `find_one`): straight to the backend, result untouched,
//!   no event;
//! - **wrapped** (`insert`, `update`, `remove`, `save`, `set`, `find_and_modify`): the
//!   arguments are lowered into a store call, stamped with timestamps, sent to the backend,
//!   and the result is unwrapped and published as a change event.
//!
//! Failures on either path are reported with a `"<collection>.<verb>"` context and returned
//! unchanged.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//!
//! let users = store.model("User").expect("users is a collection name");
//!
//! users.insert(doc! { "name": "Alice" }).await?;
//! let alice = users.set(doc! { "name": "Alice" }, doc! { "team": "blue" }).await?;
//! let total = users.count(doc! {}).await?;
//! ```

use bson::{Bson, Document};
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use crate::{
    backend::{DocumentStream, StoreBackend},
    error::{DocumentStoreError, DocumentStoreResult},
    events::Topic,
    name::CollectionName,
    operation::{Operation, Payload, StoreCall},
    options::{FindAndModify, FindOptions, RemoveOptions, SetOptions, UpdateOptions},
    outcome::{OperationResult, RawResult, unwrap_result},
    report::OperationContext,
    stamp::stamp_call,
    store::ModelStore,
    verb::Verb,
};

/// A handle on one collection of a [`ModelStore`].
///
/// Handles are cheap and not cached: every lookup builds a new one, and two handles for the
/// same canonical name compare equal and behave identically.
#[derive(Debug)]
pub struct ModelHandle<'a, B: StoreBackend> {
    name: CollectionName,
    store: &'a ModelStore<B>,
}

impl<'a, B: StoreBackend> Clone for ModelHandle<'a, B> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), store: self.store }
    }
}

impl<'a, B: StoreBackend> PartialEq for ModelHandle<'a, B> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && std::ptr::eq(self.store, other.store)
    }
}

impl<'a, B: StoreBackend> ModelHandle<'a, B> {
    pub(crate) fn new(name: CollectionName, store: &'a ModelStore<B>) -> Self {
        Self { name, store }
    }

    /// Returns the canonical collection name of this handle.
    pub fn name(&self) -> &CollectionName {
        &self.name
    }

    /// Returns a lazy stream over the documents matching `filter`.
    ///
    /// Every call starts a new query; the stream is not buffered by the model layer.
    pub async fn find(&self, filter: Document) -> DocumentStoreResult<DocumentStream> {
        self.find_with(filter, FindOptions::default()).await
    }

    /// Like [`find`](Self::find), with limit, skip and sort.
    pub async fn find_with(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<DocumentStream> {
        let context = self.context(Verb::Find);
        let stream = self.observe(
            &context,
            self.store
                .backend()
                .find(self.name.as_str(), filter, options)
                .await,
        )?;

        let reporter = self.store.reporter();
        Ok(stream
            .inspect_err(move |error| reporter.report(&context, error))
            .boxed())
    }

    /// Counts the documents matching `filter`.
    pub async fn count(&self, filter: Document) -> DocumentStoreResult<u64> {
        self.observe(
            &self.context(Verb::Count),
            self.store
                .backend()
                .count(self.name.as_str(), filter)
                .await,
        )
    }

    /// Returns the first document matching `filter`.
    pub async fn find_one(&self, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.observe(
            &self.context(Verb::FindOne),
            self.store
                .backend()
                .find_one(self.name.as_str(), filter)
                .await,
        )
    }

    /// Inserts one document or a batch, stamping `createdAt` where it is missing.
    ///
    /// Returns the stored document for a single insert and the stored documents for a batch.
    pub async fn insert(&self, payload: impl Into<Payload>) -> DocumentStoreResult<OperationResult> {
        self.dispatch(Operation::Insert(payload.into())).await
    }

    /// Alias of [`insert`](Self::insert).
    pub async fn create(&self, payload: impl Into<Payload>) -> DocumentStoreResult<OperationResult> {
        self.insert(payload).await
    }

    /// Updates the first document matching `query`, stamping `updatedAt`.
    ///
    /// Returns the updated document, or `None` when nothing matched.
    pub async fn update(
        &self,
        query: Document,
        update: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        self.update_with(query, update, UpdateOptions::default()).await
    }

    /// Like [`update`](Self::update), with upsert and multi-document options.
    pub async fn update_with(
        &self,
        query: Document,
        update: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        Ok(self
            .dispatch(Operation::Update { query, update, options })
            .await?
            .into_document())
    }

    /// Removes every document matching `query`. Returns the driver envelope.
    pub async fn remove(&self, query: Document) -> DocumentStoreResult<OperationResult> {
        self.remove_with(query, RemoveOptions::default()).await
    }

    /// Like [`remove`](Self::remove), optionally limited to the first match.
    pub async fn remove_with(
        &self,
        query: Document,
        options: RemoveOptions,
    ) -> DocumentStoreResult<OperationResult> {
        self.dispatch(Operation::Remove { query, options }).await
    }

    /// Alias of [`remove`](Self::remove).
    pub async fn delete(&self, query: Document) -> DocumentStoreResult<OperationResult> {
        self.remove(query).await
    }

    /// Inserts or replaces a whole document, stamping `createdAt` (when missing) and `updatedAt`.
    pub async fn save(&self, document: Document) -> DocumentStoreResult<OperationResult> {
        self.dispatch(Operation::Save(document)).await
    }

    /// Sets `fields` on the first document matching `query`.
    ///
    /// Returns the document after the change, or `None` when nothing matched.
    pub async fn set(
        &self,
        query: Document,
        fields: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        self.set_with(query, fields, SetOptions::default()).await
    }

    /// Like [`set`](Self::set). With `new: Some(false)` the document before the change is
    /// returned instead.
    pub async fn set_with(
        &self,
        query: Document,
        fields: Document,
        options: SetOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        Ok(self
            .dispatch(Operation::Set { query, fields, options })
            .await?
            .into_document())
    }

    /// Runs a find-and-modify command and returns the selected document.
    pub async fn find_and_modify(
        &self,
        command: FindAndModify,
    ) -> DocumentStoreResult<Option<Document>> {
        Ok(self
            .dispatch(Operation::FindAndModify(command))
            .await?
            .into_document())
    }

    /// Invokes a verb by name with positional arguments.
    ///
    /// The name goes through the alias and pass-through tables of [`Verb::resolve`]. A `find`
    /// reached this way is collected into [`OperationResult::Documents`].
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::UnknownVerb`] for unresolvable names,
    /// [`DocumentStoreError::InvalidArguments`] for malformed arguments, and any store error.
    pub async fn invoke(&self, verb: &str, args: Vec<Bson>) -> DocumentStoreResult<OperationResult> {
        let verb = Verb::resolve(verb)
            .ok_or_else(|| DocumentStoreError::UnknownVerb(verb.to_string()))?;

        if !verb.is_pass_through() {
            return self.dispatch(Operation::from_args(verb, args)?).await;
        }

        let mut args = args.into_iter();
        let filter = match args.next() {
            None | Some(Bson::Null) => Document::new(),
            Some(Bson::Document(filter)) => filter,
            Some(other) => {
                return Err(DocumentStoreError::InvalidArguments(
                    verb.to_string(),
                    format!("query must be a document, got {:?}", other.element_type()),
                ));
            }
        };

        Ok(match verb {
            Verb::Count => OperationResult::Count(self.count(filter).await?),
            Verb::FindOne => OperationResult::Document(self.find_one(filter).await?),
            _ => OperationResult::Documents(
                self.find(filter)
                    .await?
                    .try_collect()
                    .await?,
            ),
        })
    }

    /// Runs a wrapped operation: stamp, store call, unwrap, publish.
    pub async fn dispatch(&self, operation: Operation) -> DocumentStoreResult<OperationResult> {
        let mut call = operation.into_store_call();
        stamp_call(&mut call, self.store.clock().now());

        let verb = call.verb();
        let context = self.context(verb);
        debug!(context = %context, "dispatching store call");

        let raw = self.observe(&context, self.execute(call).await)?;
        let result = unwrap_result(raw, verb.returns_value());

        self.store
            .events()
            .publish(Topic::new(verb, self.name.clone()), result.clone());

        Ok(result)
    }

    async fn execute(&self, call: StoreCall) -> DocumentStoreResult<RawResult> {
        let backend = self.store.backend();
        let collection = self.name.as_str();

        Ok(match call {
            StoreCall::Insert(payload) => {
                let batch = payload.is_batch();
                RawResult::Inserted {
                    documents: backend
                        .insert(collection, payload.into_documents())
                        .await?,
                    batch,
                }
            }
            StoreCall::Update { query, update, options } => RawResult::Envelope(
                backend
                    .update(collection, query, update, options)
                    .await?,
            ),
            StoreCall::Remove { query, options } => RawResult::Envelope(
                backend
                    .remove(collection, query, options)
                    .await?,
            ),
            StoreCall::Save(document) => RawResult::Saved(backend.save(collection, document).await?),
            StoreCall::FindAndModify(command) => RawResult::Envelope(
                backend
                    .find_and_modify(collection, command)
                    .await?,
            ),
        })
    }

    fn context(&self, verb: Verb) -> OperationContext {
        OperationContext::new(self.name.clone(), verb)
    }

    /// Reports a failed store result and passes it through unchanged.
    fn observe<T>(
        &self,
        context: &OperationContext,
        result: DocumentStoreResult<T>,
    ) -> DocumentStoreResult<T> {
        if let Err(error) = &result {
            self.store.reporter().report(context, error);
        }

        result
    }
}
