//! Filter evaluation for in-memory document matching.
//!
//! This module interprets Mongo-style query documents against BSON documents: implicit
//! equality, the comparison operators (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`), `$exists`, `$not`, and the logical combinators `$and`, `$or` and `$nor`.
//! Field names may be dotted paths; a path that crosses an array matches if any element
//! matches, as in MongoDB.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docmodel_core::error::{DocumentStoreError, DocumentStoreResult};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64`, so `1_i32` equals `1.0`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Map(HashMap<&'a str, Comparable<'a>>),
    Array(Vec<Comparable<'a>>),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    /// Values with no ordering of their own, compared by equality only.
    Opaque(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Opaque(other),
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the BSON sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Opaque(_) => 5,
            Comparable::ObjectId(_) => 6,
            Comparable::Bool(_) => 7,
            Comparable::DateTime(_) => 8,
        }
    }

    /// Total order used for sorting: by type rank first, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| {
                self.partial_cmp(other)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Opaque(a), Comparable::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().partial_cmp(&b.bytes()),
            _ => None,
        }
    }
}

/// Collects every value reachable through a dotted `path`.
///
/// Arrays along the way are traversed element by element; a numeric segment also
/// addresses an array position.
pub(crate) fn lookup_path<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<_>>();
    let mut values = Vec::new();

    if let Some((head, rest)) = segments.split_first() {
        if let Some(value) = document.get(*head) {
            descend(value, rest, &mut values);
        }
    }

    values
}

fn descend<'a>(value: &'a Bson, segments: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Bson::Document(document) => {
            if let Some(child) = document.get(*head) {
                descend(child, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Some(item) = head
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
            {
                descend(item, rest, out);
            }

            for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                descend(item, segments, out);
            }
        }
        _ => {}
    }
}

/// Evaluates query documents against stored documents.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns whether the document satisfies every clause of `filter`.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::InvalidDocument`] for unknown operators or malformed operands.
    pub fn evaluate(&self, filter: &Document) -> DocumentStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => self.all(clauses(key, condition)?)?,
                "$or" => self.any(clauses(key, condition)?)?,
                "$nor" => !self.any(clauses(key, condition)?)?,
                operator if operator.starts_with('$') => {
                    return Err(invalid(format!("unknown top-level operator {operator}")));
                }
                path => self.field(path, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn all(&self, filters: Vec<&Document>) -> DocumentStoreResult<bool> {
        for filter in filters {
            if !self.evaluate(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any(&self, filters: Vec<&Document>) -> DocumentStoreResult<bool> {
        for filter in filters {
            if self.evaluate(filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn field(&self, path: &str, condition: &Bson) -> DocumentStoreResult<bool> {
        let values = lookup_path(self.document, path);

        match condition {
            Bson::Document(operators) if is_operator_map(operators) => {
                self.operators(&values, operators)
            }
            expected => Ok(equals(&values, expected)),
        }
    }

    fn operators(&self, values: &[&Bson], operators: &Document) -> DocumentStoreResult<bool> {
        for (operator, operand) in operators {
            let matched = match operator.as_str() {
                "$eq" => equals(values, operand),
                "$ne" => !equals(values, operand),
                "$gt" => compares(values, operand, |o| o == Ordering::Greater),
                "$gte" => compares(values, operand, |o| o != Ordering::Less),
                "$lt" => compares(values, operand, |o| o == Ordering::Less),
                "$lte" => compares(values, operand, |o| o != Ordering::Greater),
                "$in" => one_of(values, operand, operator)?,
                "$nin" => !one_of(values, operand, operator)?,
                "$exists" => !values.is_empty() == truthy(operand),
                "$not" => match operand {
                    Bson::Document(inner) => !self.operators(values, inner)?,
                    _ => return Err(invalid("$not needs an operator document")),
                },
                other => return Err(invalid(format!("unknown operator {other}"))),
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn is_operator_map(document: &Document) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

fn clauses<'a>(operator: &str, condition: &'a Bson) -> DocumentStoreResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(invalid(format!("{operator} needs an array")));
    };

    items
        .iter()
        .map(|item| {
            item.as_document()
                .ok_or_else(|| invalid(format!("{operator} entries must be documents")))
        })
        .collect()
}

/// Implicit equality: a direct match, a matching array element, or `null` against a
/// missing field.
fn equals(values: &[&Bson], expected: &Bson) -> bool {
    let expected = Comparable::from(expected);

    if values.is_empty() {
        return expected == Comparable::Null;
    }

    values.iter().any(|value| {
        let value = Comparable::from(*value);
        match &value {
            Comparable::Array(items) => value == expected || items.iter().any(|item| *item == expected),
            _ => value == expected,
        }
    })
}

fn compares(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);

    values.iter().any(|value| {
        let value = Comparable::from(*value);
        let candidates = match value {
            Comparable::Array(items) => items,
            single => vec![single],
        };

        candidates
            .iter()
            .filter_map(|candidate| candidate.partial_cmp(&operand))
            .any(&accept)
    })
}

fn one_of(values: &[&Bson], operand: &Bson, operator: &str) -> DocumentStoreResult<bool> {
    let Bson::Array(options) = operand else {
        return Err(invalid(format!("{operator} needs an array")));
    };

    Ok(options
        .iter()
        .any(|option| equals(values, option)))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Null | Bson::Undefined => false,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

fn invalid(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::InvalidDocument(message.into())
}
