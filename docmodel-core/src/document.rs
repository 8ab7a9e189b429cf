//! Reserved document fields and conversions between typed models and documents.
//!
//! Documents travel through the model layer as [`bson::Document`] values. Applications that
//! prefer typed structs can convert with [`ToDocument`] before calling a verb and with
//! [`FromDocument`] on the way back.

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Identifier field managed by the store.
pub const ID_FIELD: &str = "_id";
/// Creation timestamp, stamped on `insert` and `save` when absent.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Modification timestamp, stamped on every `update`, `save` and `set`.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Returns `true` when `field` is missing from `document` or explicitly null.
pub fn lacks_field(document: &Document, field: &str) -> bool {
    matches!(document.get(field), None | Some(Bson::Null))
}

/// Returns `true` when the document is made of update operators (`$set`, `$inc`, ...)
/// rather than being a replacement document.
pub fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .any(|key| key.starts_with('$'))
}

/// Conversion of serializable values into BSON documents.
///
/// Implemented for every `Serialize` type. Values that do not serialize to a
/// BSON document (numbers, strings, arrays) are rejected.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let doc = User { name: "Alice".into() }.to_document()?;
/// users.insert(doc).await?;
/// ```
pub trait ToDocument {
    /// Serializes this value into a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the value is not a map-like structure.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Serializes this value into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> DocumentStoreResult<Value>;
}

impl<T: Serialize> ToDocument for T {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected a document, got {:?}",
                other.element_type()
            ))),
        }
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }
}

/// Conversion of BSON documents back into typed values.
pub trait FromDocument: Sized {
    /// Deserializes a value from a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the target structure.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;

    /// Deserializes a value from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the target structure.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<T: for<'de> Deserialize<'de>> FromDocument for T {
    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: i32,
    }

    #[test]
    fn null_counts_as_lacking() {
        let document = doc! { "createdAt": Bson::Null, "name": "A" };

        assert!(lacks_field(&document, CREATED_AT_FIELD));
        assert!(lacks_field(&document, UPDATED_AT_FIELD));
        assert!(!lacks_field(&document, "name"));
    }

    #[test]
    fn detects_operator_documents() {
        assert!(is_operator_document(&doc! { "$set": { "x": 1 } }));
        assert!(!is_operator_document(&doc! { "x": 1 }));
        assert!(!is_operator_document(&doc! {}));
    }

    #[test]
    fn typed_values_convert_to_documents() {
        let user = User { name: "Alice".into(), age: 30 };
        let document = user.to_document().unwrap();

        assert_eq!(document, doc! { "name": "Alice", "age": 30 });
        assert_eq!(User::from_document(document).unwrap(), user);
    }

    #[test]
    fn scalars_are_not_documents() {
        assert!(matches!(
            42_i32.to_document(),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }
}
