//! A model-oriented data-access layer over JSON document stores.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Name normalization** ([`name`]) - Loose model names to canonical collection names
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Model store** ([`store`]) - Resolves model names to collection handles
//! - **Model handles** ([`model`]) - The verb set: pass-through reads and wrapped writes
//! - **Verbs and operations** ([`verb`], [`operation`], [`options`]) - Verb tables, typed
//!   arguments and positional argument parsing
//! - **Timestamps** ([`stamp`]) - `createdAt` / `updatedAt` injection and clocks
//! - **Results** ([`outcome`]) - Driver envelopes and unwrapped operation results
//! - **Change events** ([`events`]) - Topic-based publish-subscribe after mutations
//! - **Error reporting** ([`report`]) - Failure hooks with `<collection>.<verb>` context
//! - **Configuration** ([`config`]) - Connection-target resolution from the environment
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{ModelStore, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = ModelStore::new(InMemoryStore::new());
//! let users = store.model("User").expect("resolvable model name");
//!
//! users.insert(doc! { "name": "Alice" }).await?;
//! let alice = users.update(doc! { "name": "Alice" }, doc! { "$set": { "age": 30 } }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod model;
pub mod name;
pub mod operation;
pub mod options;
pub mod outcome;
pub mod report;
pub mod stamp;
pub mod store;
pub mod verb;
