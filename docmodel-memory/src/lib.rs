//! In-memory document storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is suited to development,
//! testing, and small deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Mongo-style filters** - Comparison, membership, existence and logical operators,
//!   dotted paths and array matching
//! - **Update operators** - `$set`, `$unset`, `$inc`, `$rename`, `$setOnInsert` and
//!   replacement documents, with upserts and multi-document updates
//! - **Find-and-modify** - Atomic select-and-update or select-and-remove with sorting
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{ModelStore, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ModelStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.model("user").expect("resolvable model name");
//!
//!     users.insert(doc! { "name": "Alice" }).await?;
//!     assert_eq!(users.count(doc! {}).await?, 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

mod evaluator;
mod modifier;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
