//! Reporting of failed store calls.
//!
//! A failed store call is reported once, with a `"<collection>.<verb>"` context, and the
//! original error is then returned to the caller untouched.

use std::fmt::{self, Debug};

use tracing::warn;

use crate::{error::DocumentStoreError, name::CollectionName, verb::Verb};

/// Where a failure happened: the collection and the literal store verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    pub collection: CollectionName,
    pub verb: Verb,
}

impl OperationContext {
    pub fn new(collection: CollectionName, verb: Verb) -> Self {
        Self { collection, verb }
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.collection, self.verb)
    }
}

/// Receives store failures before they are returned to the caller.
pub trait ErrorReporter: Send + Sync + Debug {
    fn report(&self, context: &OperationContext, error: &DocumentStoreError);
}

/// Logs failures as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &OperationContext, error: &DocumentStoreError) {
        warn!(context = %context, error = %error, "store operation failed");
    }
}
