//! Update application for in-memory documents.
//!
//! Supports replacement documents and the `$set`, `$unset`, `$inc`, `$rename` and
//! `$setOnInsert` operators, with dotted paths creating intermediate documents as needed.

use bson::{Bson, Document};

use docmodel_core::{
    document::{ID_FIELD, is_operator_document},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Applies `update` to `document` in place.
///
/// `inserting` is set when the document is being created by an upsert, which enables
/// `$setOnInsert`.
///
/// # Errors
///
/// Fails on unknown operators, non-numeric `$inc` targets, paths through non-documents and
/// attempts to change `_id`. The document is left untouched on failure.
pub(crate) fn apply_update(
    document: &mut Document,
    update: &Document,
    inserting: bool,
) -> DocumentStoreResult<()> {
    if !is_operator_document(update) {
        return replace(document, update);
    }

    let mut updated = document.clone();

    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(invalid(format!("{operator} needs a document of fields")));
        };

        for (path, value) in fields {
            match operator.as_str() {
                "$set" => set_path(&mut updated, path, value.clone())?,
                "$setOnInsert" if inserting => set_path(&mut updated, path, value.clone())?,
                "$setOnInsert" => {}
                "$unset" => {
                    unset_path(&mut updated, path);
                }
                "$inc" => increment(&mut updated, path, value)?,
                "$rename" => {
                    let Bson::String(target) = value else {
                        return Err(invalid("$rename targets must be strings"));
                    };
                    if let Some(moved) = unset_path(&mut updated, path) {
                        set_path(&mut updated, target, moved)?;
                    }
                }
                other => return Err(invalid(format!("unsupported update operator {other}"))),
            }
        }
    }

    if document.contains_key(ID_FIELD) && updated.get(ID_FIELD) != document.get(ID_FIELD) {
        return Err(invalid("the _id field cannot be changed"));
    }

    *document = updated;
    Ok(())
}

/// Builds the document an upsert inserts: the equality fields of `filter`, then `update`.
pub(crate) fn upsert_seed(filter: &Document, update: &Document) -> DocumentStoreResult<Document> {
    let mut seed = Document::new();

    for (path, condition) in filter {
        if path.starts_with('$') {
            continue;
        }

        match condition {
            Bson::Document(operators) if is_operator_document(operators) => {
                if let Some(value) = operators.get("$eq") {
                    set_path(&mut seed, path, value.clone())?;
                }
            }
            value => set_path(&mut seed, path, value.clone())?,
        }
    }

    if is_operator_document(update) {
        apply_update(&mut seed, update, true)?;
    } else {
        let id = seed.remove(ID_FIELD);
        seed = update.clone();
        if let Some(id) = id {
            if !seed.contains_key(ID_FIELD) {
                seed.insert(ID_FIELD, id);
            }
        }
    }

    Ok(seed)
}

fn replace(document: &mut Document, replacement: &Document) -> DocumentStoreResult<()> {
    let mut replaced = replacement.clone();

    match (document.get(ID_FIELD), replaced.get(ID_FIELD)) {
        (Some(current), Some(next)) if current != next => {
            return Err(invalid("the _id field cannot be changed"));
        }
        (Some(current), None) => {
            let current = current.clone();
            replaced.insert(ID_FIELD, current);
        }
        _ => {}
    }

    *document = replaced;
    Ok(())
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = document
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));

            match child {
                Bson::Document(child) => set_path(child, rest, value),
                _ => Err(invalid(format!("cannot create field {rest} inside non-document {head}"))),
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head) {
            Some(Bson::Document(child)) => unset_path(child, rest),
            _ => None,
        },
    }
}

fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head) {
            Some(Bson::Document(child)) => get_path(child, rest),
            _ => None,
        },
    }
}

fn increment(document: &mut Document, path: &str, by: &Bson) -> DocumentStoreResult<()> {
    let sum = match (get_path(document, path), by) {
        (None | Some(Bson::Null), by) if is_number(by) => by.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(*a as i64 + *b as i64),
        },
        (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(checked_sum(path, *a as i64, *b)?),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(checked_sum(path, *a, *b as i64)?),
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(checked_sum(path, *a, *b)?),
        (Some(current), by) if is_number(current) && is_number(by) => {
            Bson::Double(as_f64(current) + as_f64(by))
        }
        _ => return Err(invalid(format!("cannot apply $inc to {path}"))),
    };

    set_path(document, path, sum)
}

fn checked_sum(path: &str, a: i64, b: i64) -> DocumentStoreResult<i64> {
    a.checked_add(b)
        .ok_or_else(|| invalid(format!("$inc on {path} overflows a 64-bit integer")))
}

fn is_number(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

fn as_f64(value: &Bson) -> f64 {
    match value {
        Bson::Int32(n) => *n as f64,
        Bson::Int64(n) => *n as f64,
        Bson::Double(n) => *n,
        _ => 0.0,
    }
}

fn invalid(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::InvalidDocument(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn updated(mut document: Document, update: Document) -> Document {
        apply_update(&mut document, &update, false).unwrap();
        document
    }

    #[test]
    fn set_and_unset_fields() {
        let document = updated(
            doc! { "_id": 1, "name": "A", "age": 3 },
            doc! { "$set": { "name": "B", "profile.city": "Oslo" }, "$unset": { "age": "" } },
        );

        assert_eq!(document, doc! { "_id": 1, "name": "B", "profile": { "city": "Oslo" } });
    }

    #[test]
    fn increments_keep_integer_types() {
        let document = updated(
            doc! { "visits": 1, "score": 1.5 },
            doc! { "$inc": { "visits": 2, "score": 1, "fresh": 5 } },
        );

        assert_eq!(document, doc! { "visits": 3, "score": 2.5, "fresh": 5 });
    }

    #[test]
    fn increment_of_non_numbers_fails() {
        let mut document = doc! { "name": "A" };
        let result = apply_update(&mut document, &doc! { "$inc": { "name": 1 } }, false);

        assert!(result.is_err());
        assert_eq!(document, doc! { "name": "A" });
    }

    #[test]
    fn rename_moves_values() {
        let document = updated(doc! { "nick": "al" }, doc! { "$rename": { "nick": "alias" } });
        assert_eq!(document, doc! { "alias": "al" });
    }

    #[test]
    fn set_on_insert_only_applies_when_inserting() {
        let update = doc! { "$setOnInsert": { "role": "member" } };

        assert_eq!(updated(doc! { "a": 1 }, update.clone()), doc! { "a": 1 });

        let mut inserted = doc! { "a": 1 };
        apply_update(&mut inserted, &update, true).unwrap();
        assert_eq!(inserted, doc! { "a": 1, "role": "member" });
    }

    #[test]
    fn replacement_keeps_the_id() {
        let document = updated(doc! { "_id": 7, "a": 1, "b": 2 }, doc! { "c": 3 });
        assert_eq!(document, doc! { "_id": 7, "c": 3 });
    }

    #[test]
    fn id_changes_are_rejected() {
        let mut document = doc! { "_id": 7 };

        assert!(apply_update(&mut document, &doc! { "_id": 8 }, false).is_err());
        assert!(apply_update(&mut document, &doc! { "$set": { "_id": 8 } }, false).is_err());
        assert!(apply_update(&mut document, &doc! { "$push": { "a": 1 } }, false).is_err());
    }

    #[test]
    fn upsert_seed_takes_equality_fields() {
        let seed = upsert_seed(
            &doc! { "email": "a@b.c", "age": { "$gt": 3 }, "team": { "$eq": "blue" } },
            &doc! { "$set": { "name": "A" } },
        )
        .unwrap();

        assert_eq!(seed, doc! { "email": "a@b.c", "team": "blue", "name": "A" });
    }

    #[test]
    fn increment_overflow_is_rejected() {
        let mut document = doc! { "_id": 1, "n": i64::MAX };

        let result = apply_update(&mut document, &doc! { "$inc": { "n": 1_i64 } }, false);
        assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));

        let result = apply_update(&mut document, &doc! { "$inc": { "n": 1_i32 } }, false);
        assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));
        assert_eq!(document.get_i64("n").unwrap(), i64::MAX);

        let mut small = doc! { "n": i32::MAX };
        apply_update(&mut small, &doc! { "$inc": { "n": 1_i32 } }, false).unwrap();
        assert_eq!(small.get_i64("n").unwrap(), i32::MAX as i64 + 1);
    }

    #[test]
    fn upsert_seed_with_replacement_keeps_filter_id() {
        let seed = upsert_seed(&doc! { "_id": 3, "x": 1 }, &doc! { "y": 2 }).unwrap();
        assert_eq!(seed, doc! { "y": 2, "_id": 3 });
    }
}
