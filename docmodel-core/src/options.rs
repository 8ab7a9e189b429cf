//! Option types accepted by model verbs and store backends.
//!
//! All option types deserialize from BSON documents with camelCase field names, so the
//! dynamic [`ModelHandle::invoke`](crate::model::ModelHandle::invoke) entry point can accept
//! them as positional arguments (for example `{ "new": false }` for `set`).

use bson::Document;
use serde::{Deserialize, Serialize};

/// Options for `find`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Sort specification, `{ field: 1 }` ascending or `{ field: -1 }` descending.
    pub sort: Option<Document>,
}

impl FindOptions {
    /// Creates empty find options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of returned documents.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `skip` matching documents.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sorts the results.
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Options for `update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateOptions {
    /// Insert a document built from the query when nothing matches.
    pub upsert: bool,
    /// Update every matching document instead of the first one.
    ///
    /// Multi updates have no single resulting document, so the unwrapped value is `None`.
    pub multi: bool,
}

impl UpdateOptions {
    /// Creates default update options (single document, no upsert).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }
}

/// Options for `remove`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoveOptions {
    /// Remove only the first matching document.
    pub just_one: bool,
}

impl RemoveOptions {
    pub fn just_one() -> Self {
        Self { just_one: true }
    }
}

/// Options for `set`.
///
/// `new` is tri-state: `None` means the caller did not choose, which resolves to `true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetOptions {
    /// Return the document after (`true`) or before (`false`) the modification.
    pub new: Option<bool>,
    /// Insert a document built from the query when nothing matches.
    pub upsert: bool,
    /// Picks the document to modify when several match.
    pub sort: Option<Document>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses between returning the post-update (`true`) and pre-update (`false`) document.
    pub fn return_new(mut self, new: bool) -> Self {
        self.new = Some(new);
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// A find-and-modify command as sent to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindAndModify {
    /// Selects the document to modify.
    pub query: Document,
    /// Update operators or replacement document. Required unless `remove` is set.
    pub update: Option<Document>,
    /// Remove the selected document instead of updating it.
    pub remove: bool,
    /// Return the modified document rather than the original.
    pub new: bool,
    /// Insert a document when nothing matches.
    pub upsert: bool,
    /// Picks the document to modify when several match.
    pub sort: Option<Document>,
}

impl FindAndModify {
    /// Creates a command that updates the first document matching `query`.
    pub fn update(query: Document, update: Document) -> Self {
        Self {
            query,
            update: Some(update),
            ..Self::default()
        }
    }

    /// Creates a command that removes the first document matching `query`.
    pub fn remove(query: Document) -> Self {
        Self {
            query,
            remove: true,
            ..Self::default()
        }
    }

    pub fn return_new(mut self, new: bool) -> Self {
        self.new = new;
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }
}
