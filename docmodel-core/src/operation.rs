//! Caller-level operations and their rewriting into store calls.
//!
//! An [`Operation`] is what a caller asked for, after alias resolution. Before it reaches the
//! store it is lowered into a [`StoreCall`]: `set` becomes a find-and-modify command with
//! `{ $set: fields }` as its update. Timestamp injection and result unwrapping are keyed on
//! the lowered call, not on the caller's verb.

use bson::{Bson, Document, de::deserialize_from_bson, doc};
use serde::Deserialize;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindAndModify, RemoveOptions, SetOptions, UpdateOptions},
    verb::Verb,
};

/// The document argument of `insert`: one document or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Document),
    Many(Vec<Document>),
}

impl Payload {
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Many(_))
    }

    pub fn into_documents(self) -> Vec<Document> {
        match self {
            Payload::One(document) => vec![document],
            Payload::Many(documents) => documents,
        }
    }
}

impl From<Document> for Payload {
    fn from(document: Document) -> Self {
        Payload::One(document)
    }
}

impl From<Vec<Document>> for Payload {
    fn from(documents: Vec<Document>) -> Self {
        Payload::Many(documents)
    }
}

/// A wrapped verb with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert(Payload),
    Update {
        query: Document,
        update: Document,
        options: UpdateOptions,
    },
    Remove {
        query: Document,
        options: RemoveOptions,
    },
    Save(Document),
    Set {
        query: Document,
        fields: Document,
        options: SetOptions,
    },
    FindAndModify(FindAndModify),
}

impl Operation {
    /// The verb the caller invoked, after alias resolution.
    pub fn verb(&self) -> Verb {
        match self {
            Operation::Insert(_) => Verb::Insert,
            Operation::Update { .. } => Verb::Update,
            Operation::Remove { .. } => Verb::Remove,
            Operation::Save(_) => Verb::Save,
            Operation::Set { .. } => Verb::Set,
            Operation::FindAndModify(_) => Verb::FindAndModify,
        }
    }

    /// Builds an operation from positional arguments.
    ///
    /// Argument layouts:
    ///
    /// - `insert`: document or array of documents
    /// - `update`: query, update, options?
    /// - `remove`: query?, options?
    /// - `save`: document
    /// - `set`: query, fields, options?
    /// - `findAndModify`: command document
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArguments`] when an argument is missing or has the
    /// wrong shape, and [`DocumentStoreError::UnknownVerb`] for pass-through verbs, which are
    /// not operations.
    pub fn from_args(verb: Verb, args: Vec<Bson>) -> DocumentStoreResult<Operation> {
        let mut args = Arguments::new(verb, args);

        let operation = match verb {
            Verb::Insert => Operation::Insert(args.payload()?),
            Verb::Update => Operation::Update {
                query: args.document("query")?,
                update: args.document("update")?,
                options: args.options()?,
            },
            Verb::Remove => Operation::Remove {
                query: args.optional_document("query")?.unwrap_or_default(),
                options: args.options()?,
            },
            Verb::Save => Operation::Save(args.document("document")?),
            Verb::Set => Operation::Set {
                query: args.document("query")?,
                fields: args.document("fields")?,
                options: args.options()?,
            },
            Verb::FindAndModify => Operation::FindAndModify(args.options()?),
            Verb::Find | Verb::Count | Verb::FindOne => {
                return Err(DocumentStoreError::UnknownVerb(verb.to_string()));
            }
        };

        Ok(operation)
    }

    /// Lowers this operation into the call sent to the store.
    pub(crate) fn into_store_call(self) -> StoreCall {
        match self {
            Operation::Insert(payload) => StoreCall::Insert(payload),
            Operation::Update { query, update, options } => StoreCall::Update { query, update, options },
            Operation::Remove { query, options } => StoreCall::Remove { query, options },
            Operation::Save(document) => StoreCall::Save(document),
            Operation::Set { query, fields, options } => StoreCall::FindAndModify(rewrite_set(query, fields, options)),
            Operation::FindAndModify(command) => StoreCall::FindAndModify(command),
        }
    }
}

/// Rewrites `set(query, fields, options)` into a find-and-modify command.
///
/// `new` defaults to `true` unless the caller chose it explicitly.
pub(crate) fn rewrite_set(query: Document, fields: Document, options: SetOptions) -> FindAndModify {
    FindAndModify {
        query,
        update: Some(doc! { "$set": fields }),
        remove: false,
        new: options.new.unwrap_or(true),
        upsert: options.upsert,
        sort: options.sort,
    }
}

/// A call against the store, after alias resolution and `set` rewriting.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StoreCall {
    Insert(Payload),
    Update {
        query: Document,
        update: Document,
        options: UpdateOptions,
    },
    Remove {
        query: Document,
        options: RemoveOptions,
    },
    Save(Document),
    FindAndModify(FindAndModify),
}

impl StoreCall {
    /// The literal store verb of this call.
    pub(crate) fn verb(&self) -> Verb {
        match self {
            StoreCall::Insert(_) => Verb::Insert,
            StoreCall::Update { .. } => Verb::Update,
            StoreCall::Remove { .. } => Verb::Remove,
            StoreCall::Save(_) => Verb::Save,
            StoreCall::FindAndModify(_) => Verb::FindAndModify,
        }
    }
}

/// Positional argument reader for [`Operation::from_args`].
struct Arguments {
    verb: Verb,
    args: std::vec::IntoIter<Bson>,
}

impl Arguments {
    fn new(verb: Verb, args: Vec<Bson>) -> Self {
        Self { verb, args: args.into_iter() }
    }

    fn invalid(&self, message: impl Into<String>) -> DocumentStoreError {
        DocumentStoreError::InvalidArguments(self.verb.to_string(), message.into())
    }

    fn optional_document(&mut self, name: &str) -> DocumentStoreResult<Option<Document>> {
        match self.args.next() {
            None | Some(Bson::Null) => Ok(None),
            Some(Bson::Document(document)) => Ok(Some(document)),
            Some(other) => Err(self.invalid(format!(
                "{name} must be a document, got {:?}",
                other.element_type()
            ))),
        }
    }

    fn document(&mut self, name: &str) -> DocumentStoreResult<Document> {
        self.optional_document(name)?
            .ok_or_else(|| self.invalid(format!("missing {name}")))
    }

    fn payload(&mut self) -> DocumentStoreResult<Payload> {
        match self.args.next() {
            Some(Bson::Document(document)) => Ok(Payload::One(document)),
            Some(Bson::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Bson::Document(document) => Ok(document),
                    other => Err(self.invalid(format!(
                        "batch entries must be documents, got {:?}",
                        other.element_type()
                    ))),
                })
                .collect::<DocumentStoreResult<Vec<_>>>()
                .map(Payload::Many),
            Some(other) => Err(self.invalid(format!(
                "expected a document or an array, got {:?}",
                other.element_type()
            ))),
            None => Err(self.invalid("missing document")),
        }
    }

    fn options<T>(&mut self) -> DocumentStoreResult<T>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        match self.optional_document("options")? {
            Some(document) => deserialize_from_bson(Bson::Document(document))
                .map_err(|e| self.invalid(e.to_string())),
            None => Ok(T::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_defaults_to_returning_the_new_document() {
        let command = rewrite_set(doc! { "_id": 1 }, doc! { "x": 1 }, SetOptions::default());

        assert_eq!(command.query, doc! { "_id": 1 });
        assert_eq!(command.update, Some(doc! { "$set": { "x": 1 } }));
        assert!(command.new);
        assert!(!command.remove);
    }

    #[test]
    fn set_honors_an_explicit_new_flag() {
        let command = rewrite_set(doc! {}, doc! { "x": 1 }, SetOptions::new().return_new(false));

        assert!(!command.new);
    }

    #[test]
    fn set_lowers_to_find_and_modify() {
        let call = Operation::Set {
            query: doc! { "name": "A" },
            fields: doc! { "x": 1 },
            options: SetOptions::new().upsert(true),
        }
        .into_store_call();

        match call {
            StoreCall::FindAndModify(command) => {
                assert!(command.upsert);
                assert!(command.new);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn positional_insert_accepts_documents_and_batches() {
        let one = Operation::from_args(Verb::Insert, vec![Bson::Document(doc! { "a": 1 })]).unwrap();
        let many = Operation::from_args(
            Verb::Insert,
            vec![Bson::Array(vec![Bson::Document(doc! { "a": 1 }), Bson::Document(doc! { "a": 2 })])],
        )
        .unwrap();

        assert_eq!(one, Operation::Insert(Payload::One(doc! { "a": 1 })));
        assert!(matches!(many, Operation::Insert(Payload::Many(ref docs)) if docs.len() == 2));
    }

    #[test]
    fn positional_set_reads_options() {
        let operation = Operation::from_args(
            Verb::Set,
            vec![
                Bson::Document(doc! { "_id": 1 }),
                Bson::Document(doc! { "x": 1 }),
                Bson::Document(doc! { "new": false }),
            ],
        )
        .unwrap();

        match operation {
            Operation::Set { options, .. } => assert_eq!(options.new, Some(false)),
            other => panic!("unexpected operation {other:?}"),
        }
    }

    #[test]
    fn positional_remove_defaults_to_an_empty_query() {
        let operation = Operation::from_args(Verb::Remove, vec![]).unwrap();

        assert_eq!(
            operation,
            Operation::Remove { query: doc! {}, options: RemoveOptions::default() }
        );
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert!(matches!(
            Operation::from_args(Verb::Update, vec![Bson::Document(doc! {})]),
            Err(DocumentStoreError::InvalidArguments(verb, _)) if verb == "update"
        ));
        assert!(matches!(
            Operation::from_args(Verb::Insert, vec![Bson::Int32(1)]),
            Err(DocumentStoreError::InvalidArguments(_, _))
        ));
        assert!(matches!(
            Operation::from_args(Verb::Find, vec![]),
            Err(DocumentStoreError::UnknownVerb(_))
        ));
    }
}
