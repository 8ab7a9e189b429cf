//! The verb vocabulary of a model handle.
//!
//! Verb names are resolved through explicit lookup tables before dispatch:
//!
//! - [`PASS_THROUGH_VERBS`] go straight to the store and are matched case-insensitively,
//! - [`VERB_ALIASES`] rename caller-facing verbs to the store verbs they stand for,
//! - everything else must be one of the wrapped verb names exactly.

use std::{fmt, str::FromStr};

use crate::error::DocumentStoreError;

/// Verbs returned straight from the store, keyed by their lower-case name.
pub const PASS_THROUGH_VERBS: [(&str, Verb); 3] = [
    ("find", Verb::Find),
    ("count", Verb::Count),
    ("findone", Verb::FindOne),
];

/// Caller-facing aliases and the verb each one resolves to.
pub const VERB_ALIASES: [(&str, Verb); 2] = [
    ("create", Verb::Insert),
    ("delete", Verb::Remove),
];

const WRAPPED_VERBS: [(&str, Verb); 6] = [
    ("insert", Verb::Insert),
    ("update", Verb::Update),
    ("remove", Verb::Remove),
    ("save", Verb::Save),
    ("set", Verb::Set),
    ("findAndModify", Verb::FindAndModify),
];

fn lookup(table: &[(&str, Verb)], name: &str) -> Option<Verb> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, verb)| *verb)
}

/// An operation a model handle can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Lazy query over matching documents.
    Find,
    /// Number of matching documents.
    Count,
    /// First matching document.
    FindOne,
    /// Insert one document or a batch.
    Insert,
    /// Update matching documents.
    Update,
    /// Remove matching documents.
    Remove,
    /// Insert or replace a whole document.
    Save,
    /// Set fields on the first matching document; rewritten to `FindAndModify`.
    Set,
    /// Atomic find-and-modify on the first matching document.
    FindAndModify,
}

impl Verb {
    /// Resolves a caller-supplied verb name.
    ///
    /// Pass-through names match case-insensitively; aliases and wrapped names match exactly.
    pub fn resolve(name: &str) -> Option<Verb> {
        lookup(&PASS_THROUGH_VERBS, &name.to_lowercase())
            .or_else(|| lookup(&VERB_ALIASES, name))
            .or_else(|| lookup(&WRAPPED_VERBS, name))
    }

    /// The name the store knows this verb by.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Find => "find",
            Verb::Count => "count",
            Verb::FindOne => "findOne",
            Verb::Insert => "insert",
            Verb::Update => "update",
            Verb::Remove => "remove",
            Verb::Save => "save",
            Verb::Set => "set",
            Verb::FindAndModify => "findAndModify",
        }
    }

    /// Whether results of this verb bypass stamping, unwrapping and events.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Verb::Find | Verb::Count | Verb::FindOne)
    }

    /// Whether the caller receives the envelope's `value` instead of the envelope.
    pub fn returns_value(&self) -> bool {
        matches!(self, Verb::Update | Verb::Set | Verb::FindAndModify)
    }

    /// The verb a change event for this operation is published under.
    ///
    /// Find-and-modify calls, including rewritten `set` calls, are reported as `update`.
    pub fn event_verb(&self) -> Verb {
        match self {
            Verb::Set | Verb::FindAndModify => Verb::Update,
            other => *other,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::resolve(s).ok_or_else(|| DocumentStoreError::UnknownVerb(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_names_ignore_case() {
        assert_eq!(Verb::resolve("find"), Some(Verb::Find));
        assert_eq!(Verb::resolve("FIND"), Some(Verb::Find));
        assert_eq!(Verb::resolve("Count"), Some(Verb::Count));
        assert_eq!(Verb::resolve("findOne"), Some(Verb::FindOne));
        assert_eq!(Verb::resolve("findone"), Some(Verb::FindOne));
    }

    #[test]
    fn aliases_resolve_to_store_verbs() {
        assert_eq!(Verb::resolve("create"), Some(Verb::Insert));
        assert_eq!(Verb::resolve("delete"), Some(Verb::Remove));
    }

    #[test]
    fn wrapped_names_match_exactly() {
        assert_eq!(Verb::resolve("insert"), Some(Verb::Insert));
        assert_eq!(Verb::resolve("set"), Some(Verb::Set));
        assert_eq!(Verb::resolve("findAndModify"), Some(Verb::FindAndModify));
        assert_eq!(Verb::resolve("Insert"), None);
        assert_eq!(Verb::resolve("drop"), None);
    }

    #[test]
    fn unknown_names_fail_to_parse() {
        assert!(matches!(
            "upsert".parse::<Verb>(),
            Err(DocumentStoreError::UnknownVerb(name)) if name == "upsert"
        ));
    }

    #[test]
    fn pass_through_verbs_are_flagged() {
        assert!(Verb::Find.is_pass_through());
        assert!(Verb::Count.is_pass_through());
        assert!(Verb::FindOne.is_pass_through());
        assert!(!Verb::Insert.is_pass_through());
        assert!(!Verb::Set.is_pass_through());
    }

    #[test]
    fn only_update_style_verbs_return_values() {
        assert!(Verb::Update.returns_value());
        assert!(Verb::Set.returns_value());
        assert!(Verb::FindAndModify.returns_value());
        assert!(!Verb::Insert.returns_value());
        assert!(!Verb::Remove.returns_value());
        assert!(!Verb::Save.returns_value());
    }

    #[test]
    fn find_and_modify_is_published_as_update() {
        assert_eq!(Verb::Set.event_verb(), Verb::Update);
        assert_eq!(Verb::FindAndModify.event_verb(), Verb::Update);
        assert_eq!(Verb::Insert.event_verb(), Verb::Insert);
        assert_eq!(Verb::Remove.event_verb(), Verb::Remove);
    }
}
