//! Main docmodel crate: a model-oriented data-access layer over JSON document stores.
//!
//! This crate is the primary entry point for users of the docmodel framework. It re-exports
//! the core types from the sub-crates and gives access to the available storage backends.
//!
//! # Features
//!
//! - **Loose model names** - `"User"`, `"user"`, `"users"` and `"Users"` all address the
//!   `users` collection
//! - **A fixed verb set** - `find`, `count`, `findOne`, `insert`, `update`, `remove`, `save`
//!   and `set`, plus the `create` and `delete` aliases
//! - **Automatic timestamps** - `createdAt` on inserts, `updatedAt` on updates and saves
//! - **Change events** - one `"<verb>:<collection>"` event after every successful write
//! - **Failure reporting** - every store failure is reported once and returned unchanged
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let events = EventPublisher::new();
//!     events.subscribe("update:users".parse()?, |event| {
//!         println!("{} -> {:?}", event.topic, event.payload);
//!     });
//!
//!     let store = ModelStore::builder(InMemoryStore::builder().build().await?)
//!         .with_events(events)
//!         .build();
//!
//!     let users = store.model("User").expect("resolvable model name");
//!     users.insert(doc! { "name": "Alice" }).await?;
//!
//!     // Publishes "update:users" and returns the updated document.
//!     let alice = users.set(doc! { "name": "Alice" }, doc! { "team": "blue" }).await?;
//!     println!("{alice:?}");
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic verbs
//!
//! Verbs can also be invoked by name with positional arguments:
//!
//! ```ignore
//! use docmodel::bson::{Bson, doc};
//!
//! let users = store.model("users").expect("resolvable model name");
//! users.invoke("delete", vec![Bson::Document(doc! { "name": "Alice" })]).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{
    backend, config, document, error, events, model, name, operation, options, outcome,
    report, stamp, store, verb,
};

pub use docmodel_core::store::ModelStore;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
