//! Operation results and result unwrapping.
//!
//! Store backends answer each verb in their own shape: inserted documents, a saved
//! document, or a driver [`Envelope`]. [`unwrap_result`] folds those shapes into the single
//! [`OperationResult`] contract handed to callers and to change-event subscribers.

use bson::{Bson, Document};

/// The driver response to `update`, `remove` and `findAndModify`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// The document selected by the call, if the call selects one.
    ///
    /// For `update` and `findAndModify` this is the post-image when the call asked for the
    /// new document and the pre-image otherwise. Multi updates and removals leave it empty.
    pub value: Option<Document>,
    /// Number of documents affected.
    pub n: u64,
    /// Identifier of the document inserted by an upsert.
    pub upserted_id: Option<Bson>,
}

impl Envelope {
    /// Creates an envelope around a selected document.
    pub fn with_value(value: Option<Document>) -> Self {
        Self {
            n: value.is_some() as u64,
            value,
            upserted_id: None,
        }
    }

    /// Creates an envelope that only reports an affected count.
    pub fn with_count(n: u64) -> Self {
        Self { n, ..Self::default() }
    }
}

/// The outcome of a verb invocation as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    /// A single document, or `None` when the operation selected nothing.
    Document(Option<Document>),
    /// A count of documents.
    Count(u64),
    /// A sequence of documents.
    Documents(Vec<Document>),
    /// A raw driver envelope.
    Envelope(Envelope),
}

impl OperationResult {
    /// Returns the single document carried by this result, if any.
    pub fn into_document(self) -> Option<Document> {
        match self {
            OperationResult::Document(document) => document,
            _ => None,
        }
    }

    /// Returns the documents carried by this result.
    ///
    /// A single document becomes a one-element vector.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            OperationResult::Documents(documents) => documents,
            OperationResult::Document(document) => document.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the envelope carried by this result, if any.
    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            OperationResult::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Returns the count carried by this result, if any.
    pub fn count(&self) -> Option<u64> {
        match self {
            OperationResult::Count(count) => Some(*count),
            _ => None,
        }
    }
}

/// A store response before unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawResult {
    /// Documents written by an insert, with whether the caller passed a batch.
    Inserted { documents: Vec<Document>, batch: bool },
    /// The document written by a save.
    Saved(Document),
    /// A driver envelope.
    Envelope(Envelope),
}

/// Turns a raw store response into the caller-facing result.
///
/// With `return_value` set the caller gets the envelope's `value`; otherwise the raw
/// response passes through unchanged.
pub(crate) fn unwrap_result(raw: RawResult, return_value: bool) -> OperationResult {
    match raw {
        RawResult::Envelope(envelope) if return_value => OperationResult::Document(envelope.value),
        RawResult::Envelope(envelope) => OperationResult::Envelope(envelope),
        RawResult::Inserted { documents, batch: true } => OperationResult::Documents(documents),
        RawResult::Inserted { documents, batch: false } => {
            OperationResult::Document(documents.into_iter().next())
        }
        RawResult::Saved(document) => OperationResult::Document(Some(document)),
    }
}
