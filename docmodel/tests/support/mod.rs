#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use docmodel::{
    bson::{Document, oid::ObjectId},
    memory::InMemoryStore,
    prelude::*,
};

/// A call as it reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Insert(Vec<Document>),
    Update { filter: Document, update: Document, options: UpdateOptions },
    Remove { filter: Document, options: RemoveOptions },
    Save(Document),
    FindAndModify(FindAndModify),
    Read(Verb),
}

/// Wraps the in-memory store, records every call and fails the verbs it is told to.
#[derive(Debug, Clone, Default)]
pub struct ProbeBackend {
    inner: InMemoryStore,
    failing: Arc<Mutex<HashSet<Verb>>>,
    cursor_breaks: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl ProbeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, verb: Verb) {
        self.failing.lock().unwrap().insert(verb);
    }

    /// Makes `find` streams end with an error after yielding their documents.
    pub fn break_cursors(&self) {
        self.cursor_breaks.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<Recorded> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn enter(&self, verb: Verb, call: Recorded) -> DocumentStoreResult<()> {
        self.calls.lock().unwrap().push(call);

        if self.failing.lock().unwrap().contains(&verb) {
            return Err(DocumentStoreError::Backend("connection reset by peer".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for ProbeBackend {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<DocumentStream> {
        self.enter(Verb::Find, Recorded::Read(Verb::Find))?;
        let documents = self.inner.find(collection, filter, options).await?;

        if !self.cursor_breaks.load(Ordering::SeqCst) {
            return Ok(documents);
        }

        let broken = stream::once(async {
            Err(DocumentStoreError::Backend("cursor killed".to_string()))
        });
        Ok(documents.chain(broken).boxed())
    }

    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.enter(Verb::Count, Recorded::Read(Verb::Count))?;
        self.inner.count(collection, filter).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        self.enter(Verb::FindOne, Recorded::Read(Verb::FindOne))?;
        self.inner.find_one(collection, filter).await
    }

    async fn insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.enter(Verb::Insert, Recorded::Insert(documents.clone()))?;
        self.inner.insert(collection, documents).await
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Envelope> {
        self.enter(
            Verb::Update,
            Recorded::Update {
                filter: filter.clone(),
                update: update.clone(),
                options: options.clone(),
            },
        )?;
        self.inner.update(collection, filter, update, options).await
    }

    async fn remove(
        &self,
        collection: &str,
        filter: Document,
        options: RemoveOptions,
    ) -> DocumentStoreResult<Envelope> {
        self.enter(
            Verb::Remove,
            Recorded::Remove { filter: filter.clone(), options: options.clone() },
        )?;
        self.inner.remove(collection, filter, options).await
    }

    async fn save(&self, collection: &str, document: Document) -> DocumentStoreResult<Document> {
        self.enter(Verb::Save, Recorded::Save(document.clone()))?;
        self.inner.save(collection, document).await
    }

    async fn find_and_modify(
        &self,
        collection: &str,
        command: FindAndModify,
    ) -> DocumentStoreResult<Envelope> {
        self.enter(Verb::FindAndModify, Recorded::FindAndModify(command.clone()))?;
        self.inner.find_and_modify(collection, command).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.inner.list_collections().await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.inner.drop_collection(name).await
    }

    fn object_id(&self, hex: Option<&str>) -> DocumentStoreResult<ObjectId> {
        self.inner.object_id(hex)
    }
}

/// Keeps every reported failure as `(context, error message)`.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, context: &OperationContext, error: &DocumentStoreError) {
        self.reports
            .lock()
            .unwrap()
            .push((context.to_string(), error.to_string()));
    }
}

/// Collects the events published under `topic`.
pub fn collect(events: &EventPublisher, topic: &str) -> Arc<Mutex<Vec<ChangeEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    events.subscribe(topic.parse().unwrap(), move |event| {
        sink.lock().unwrap().push(event.clone());
    });

    seen
}

pub struct Harness {
    pub store: ModelStore<ProbeBackend>,
    pub backend: ProbeBackend,
    pub events: EventPublisher,
    pub reporter: RecordingReporter,
}

/// A model store over a probe backend, with a shared publisher and a recording reporter.
pub fn harness() -> Harness {
    harness_with(|builder| builder)
}

pub fn harness_with(
    configure: impl FnOnce(ModelStoreBuilder<ProbeBackend>) -> ModelStoreBuilder<ProbeBackend>,
) -> Harness {
    let backend = ProbeBackend::new();
    let events = EventPublisher::new();
    let reporter = RecordingReporter::default();

    let store = configure(
        ModelStore::builder(backend.clone())
            .with_events(events.clone())
            .with_reporter(reporter.clone()),
    )
    .build();

    Harness { store, backend, events, reporter }
}
