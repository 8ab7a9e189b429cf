//! The model store: entry point for resolving model names to collection handles.
//!
//! A [`ModelStore`] owns a backend together with the collaborators every dispatched call
//! needs: the [`EventPublisher`] that announces mutations, the [`ErrorReporter`] that records
//! failures, and the [`Clock`] used for timestamps.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::store::{ModelStore, Resolved};
//!
//! let store = ModelStore::new(backend);
//!
//! // "User", "user", "users" and "Users" all address the same collection.
//! let users = store.model("User").expect("resolvable model name");
//! assert_eq!(users.name().as_str(), "users");
//!
//! // Identifier construction is reachable under the ObjectId name.
//! if let Some(Resolved::ObjectId(ids)) = store.get_model("ObjectId") {
//!     let id = ids.parse("507f1f77bcf86cd799439011")?;
//! }
//! ```

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::{
    backend::StoreBackend,
    error::{DocumentStoreError, DocumentStoreResult},
    events::EventPublisher,
    model::ModelHandle,
    name::{ModelName, normalize},
    report::{ErrorReporter, TracingReporter},
    stamp::{Clock, SystemClock},
};

/// A model-oriented store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct ModelStore<B: StoreBackend> {
    backend: B,
    events: EventPublisher,
    reporter: Arc<dyn ErrorReporter>,
    clock: Arc<dyn Clock>,
}

impl<B: StoreBackend> ModelStore<B> {
    /// Creates a store with a fresh publisher, the tracing reporter and the system clock.
    pub fn new(backend: B) -> Self {
        Self::builder(backend).build()
    }

    pub fn builder(backend: B) -> ModelStoreBuilder<B> {
        ModelStoreBuilder::new(backend)
    }

    /// Resolves a model name.
    ///
    /// Returns `None` for the reserved probe names and the empty name. No existence check is
    /// made against the backend.
    pub fn get_model(&self, name: &str) -> Option<Resolved<'_, B>> {
        Some(match normalize(name)? {
            ModelName::Collection(collection) => {
                Resolved::Model(ModelHandle::new(collection, self))
            }
            ModelName::ObjectId => Resolved::ObjectId(ObjectIdFactory { backend: &self.backend }),
        })
    }

    /// Resolves a model name to a collection handle.
    ///
    /// Like [`get_model`](Self::get_model), but the identifier names also yield `None`.
    pub fn model(&self, name: &str) -> Option<ModelHandle<'_, B>> {
        match self.get_model(name)? {
            Resolved::Model(handle) => Some(handle),
            Resolved::ObjectId(_) => None,
        }
    }

    /// Returns the publisher change events are sent through.
    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn reporter(&self) -> Arc<dyn ErrorReporter> {
        self.reporter.clone()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Drops (deletes) the collection a model name resolves to.
    ///
    /// `"User"` and `"users"` drop the same collection. Names that do not resolve to a
    /// collection yield [`DocumentStoreError::CollectionNotFound`].
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        match normalize(name) {
            Some(ModelName::Collection(collection)) => {
                self.backend.drop_collection(collection.as_str()).await
            }
            _ => Err(DocumentStoreError::CollectionNotFound(name.to_string())),
        }
    }

    /// Shuts down the underlying backend.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

/// The outcome of resolving a model name.
#[derive(Debug)]
pub enum Resolved<'a, B: StoreBackend> {
    /// A collection handle.
    Model(ModelHandle<'a, B>),
    /// The identifier constructor, reached through `ObjectId` or `ObjectID`.
    ObjectId(ObjectIdFactory<'a, B>),
}

impl<'a, B: StoreBackend> Resolved<'a, B> {
    pub fn into_model(self) -> Option<ModelHandle<'a, B>> {
        match self {
            Resolved::Model(handle) => Some(handle),
            Resolved::ObjectId(_) => None,
        }
    }

    pub fn into_object_id(self) -> Option<ObjectIdFactory<'a, B>> {
        match self {
            Resolved::ObjectId(factory) => Some(factory),
            Resolved::Model(_) => None,
        }
    }
}

/// Builds document identifiers the way the backend does.
#[derive(Debug)]
pub struct ObjectIdFactory<'a, B: StoreBackend> {
    backend: &'a B,
}

impl<'a, B: StoreBackend> Clone for ObjectIdFactory<'a, B> {
    fn clone(&self) -> Self {
        Self { backend: self.backend }
    }
}

impl<'a, B: StoreBackend> ObjectIdFactory<'a, B> {
    /// Generates a fresh identifier.
    pub fn new_id(&self) -> ObjectId {
        // Generation without input cannot fail.
        self.backend
            .object_id(None)
            .unwrap_or_else(|_| ObjectId::new())
    }

    /// Parses a 24-character hexadecimal identifier.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::InvalidDocument`](crate::error::DocumentStoreError::InvalidDocument)
    /// when `hex` is not a valid identifier.
    pub fn parse(&self, hex: &str) -> DocumentStoreResult<ObjectId> {
        self.backend.object_id(Some(hex))
    }
}

/// Builder for [`ModelStore`].
#[derive(Debug)]
pub struct ModelStoreBuilder<B: StoreBackend> {
    backend: B,
    events: Option<EventPublisher>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<B: StoreBackend> ModelStoreBuilder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            events: None,
            reporter: None,
            clock: None,
        }
    }

    /// Uses an existing publisher, typically a clone the application keeps to subscribe.
    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> ModelStore<B> {
        ModelStore {
            backend: self.backend,
            events: self.events.unwrap_or_default(),
            reporter: self
                .reporter
                .unwrap_or_else(|| Arc::new(TracingReporter)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}
