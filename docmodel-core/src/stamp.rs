//! Timestamp injection for mutating store calls.
//!
//! Stamps are applied to the store call the dispatcher owns, never to a value the caller
//! still holds. Each call reads the clock once, so every document of a batch insert carries
//! the same `createdAt`.

use std::fmt::Debug;

use bson::{Bson, DateTime, Document};
use chrono::Utc;

use crate::{
    document::{CREATED_AT_FIELD, UPDATED_AT_FIELD, is_operator_document, lacks_field},
    operation::{Payload, StoreCall},
};

/// Source of the current time for timestamp injection.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        DateTime::from_chrono(Utc::now())
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime);

impl Clock for FixedClock {
    fn now(&self) -> DateTime {
        self.0
    }
}

/// Applies `createdAt` / `updatedAt` stamps to a store call.
///
/// - `insert`: `createdAt` on every document lacking one
/// - `save`: `createdAt` when lacking, `updatedAt` always
/// - `update`: `updatedAt` always, inside `$set` for operator updates
/// - `findAndModify`: `updatedAt` inside `update.$set` when present
/// - `remove`: nothing
pub(crate) fn stamp_call(call: &mut StoreCall, now: DateTime) {
    match call {
        StoreCall::Insert(payload) => stamp_created(payload, now),
        StoreCall::Save(document) => {
            stamp_created_document(document, now);
            document.insert(UPDATED_AT_FIELD, now);
        }
        StoreCall::Update { update, .. } => stamp_updated(update, now),
        StoreCall::FindAndModify(command) => {
            if let Some(Bson::Document(set)) = command
                .update
                .as_mut()
                .and_then(|update| update.get_mut("$set"))
            {
                set.insert(UPDATED_AT_FIELD, now);
            }
        }
        StoreCall::Remove { .. } => {}
    }
}

fn stamp_created(payload: &mut Payload, now: DateTime) {
    match payload {
        Payload::One(document) => stamp_created_document(document, now),
        Payload::Many(documents) => documents
            .iter_mut()
            .for_each(|document| stamp_created_document(document, now)),
    }
}

fn stamp_created_document(document: &mut Document, now: DateTime) {
    if lacks_field(document, CREATED_AT_FIELD) {
        document.insert(CREATED_AT_FIELD, now);
    }
}

fn stamp_updated(update: &mut Document, now: DateTime) {
    if !is_operator_document(update) {
        update.insert(UPDATED_AT_FIELD, now);
        return;
    }

    match update.get_mut("$set") {
        Some(Bson::Document(set)) => {
            set.insert(UPDATED_AT_FIELD, now);
        }
        // A malformed $set is left for the store to reject.
        Some(_) => {}
        None => {
            update.insert("$set", bson::doc! { UPDATED_AT_FIELD: now });
        }
    }
}
