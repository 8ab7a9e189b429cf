//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - The model store, model handles and name resolution
//! - Store backends and builders
//! - Operation options and results
//! - Change events and error reporting
//! - Error types

pub use docmodel_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder},
    config::{ConnectionTarget, TargetSource},
    document::{FromDocument, ToDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    events::{ChangeEvent, EventPublisher, SubscriptionId, Topic},
    model::ModelHandle,
    name::{CollectionName, ModelName},
    operation::{Operation, Payload},
    options::{FindAndModify, FindOptions, RemoveOptions, SetOptions, UpdateOptions},
    outcome::{Envelope, OperationResult},
    report::{ErrorReporter, OperationContext, TracingReporter},
    stamp::{Clock, FixedClock, SystemClock},
    store::{ModelStore, ModelStoreBuilder, ObjectIdFactory, Resolved},
    verb::Verb,
};
