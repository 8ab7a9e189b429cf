//! Model name normalization.
//!
//! Callers address collections with loose model names: `"User"`, `"user"` and `"Users"`
//! all denote the same collection. [`normalize`] turns such a name into a
//! [`CollectionName`], the lower-case plural form used to address the store.
//!
//! Two kinds of names never reach a collection:
//!
//! - reserved introspection probes ([`RESERVED_NAMES`]) resolve to `None`,
//! - the identifier names in [`OBJECT_ID_NAMES`] resolve to [`ModelName::ObjectId`].

use std::fmt;

/// Probe names that resolve to nothing instead of a collection.
pub const RESERVED_NAMES: [&str; 2] = ["inspect", "valueOf"];

/// Names that route to identifier construction instead of a collection. Matched case-sensitively.
pub const OBJECT_ID_NAMES: [&str; 2] = ["ObjectId", "ObjectID"];

/// Canonical, lower-case, pluralized collection identifier.
///
/// Only produced by [`normalize`], so holding one guarantees the name is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionName(String);

impl CollectionName {
    /// Returns the canonical name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The outcome of resolving a requested model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelName {
    /// The name addresses a collection.
    Collection(CollectionName),
    /// The name addresses the identifier constructor.
    ObjectId,
}

/// Normalizes a requested model name.
///
/// Returns `None` for reserved probes and for the empty string. Otherwise lower-cases the
/// name and appends `s` unless it already ends with one.
///
/// # Example
///
/// ```ignore
/// use docmodel::name::{normalize, ModelName};
///
/// assert_eq!(normalize("User"), normalize("users"));
/// assert_eq!(normalize("ObjectId"), Some(ModelName::ObjectId));
/// assert_eq!(normalize("inspect"), None);
/// ```
pub fn normalize(raw: &str) -> Option<ModelName> {
    if raw.is_empty() || RESERVED_NAMES.contains(&raw) {
        return None;
    }

    if OBJECT_ID_NAMES.contains(&raw) {
        return Some(ModelName::ObjectId);
    }

    Some(ModelName::Collection(collection_name(raw)))
}

/// Normalizes a name that is known to address a collection.
///
/// Unlike [`normalize`] this never special-cases reserved or identifier names.
pub(crate) fn collection_name(raw: &str) -> CollectionName {
    let mut name = raw.to_lowercase();

    if !name.ends_with('s') {
        name.push('s');
    }

    CollectionName(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(raw: &str) -> String {
        match normalize(raw) {
            Some(ModelName::Collection(name)) => name.into_inner(),
            other => panic!("expected a collection for {raw}, got {other:?}"),
        }
    }

    #[test]
    fn case_and_plurality_collapse() {
        assert_eq!(canonical("User"), "users");
        assert_eq!(canonical("user"), "users");
        assert_eq!(canonical("Users"), "users");
        assert_eq!(canonical("USERS"), "users");
    }

    #[test]
    fn appends_s_only_when_missing() {
        assert_eq!(canonical("Team"), "teams");
        assert_eq!(canonical("Logs"), "logs");
        assert_eq!(canonical("status"), "status");
        assert_eq!(canonical("s"), "s");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["Session", "teams", "Log", "ADDRESS"] {
            let once = canonical(raw);
            assert_eq!(canonical(&once), once);
        }
    }

    #[test]
    fn reserved_probes_are_unresolved() {
        assert_eq!(normalize("inspect"), None);
        assert_eq!(normalize("valueOf"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn reserved_probes_match_exactly() {
        assert_eq!(canonical("Inspect"), "inspects");
        assert_eq!(canonical("valueof"), "valueofs");
    }

    #[test]
    fn object_id_names_are_case_sensitive() {
        assert_eq!(normalize("ObjectId"), Some(ModelName::ObjectId));
        assert_eq!(normalize("ObjectID"), Some(ModelName::ObjectId));
        assert_eq!(canonical("objectid"), "objectids");
    }
}
