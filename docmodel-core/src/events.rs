//! Change events published after successful mutations.
//!
//! Every successful wrapped verb publishes exactly one [`ChangeEvent`] under a [`Topic`]
//! made of the event verb and the canonical collection name, written `"<verb>:<collection>"`.
//! Handlers run synchronously, before the mutating call returns to its caller.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::events::{EventPublisher, Topic};
//!
//! let events = EventPublisher::new();
//! events.subscribe("update:users".parse::<Topic>()?, |event| {
//!     println!("{} -> {:?}", event.topic, event.payload);
//! });
//! ```

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::debug;

use crate::{
    error::DocumentStoreError,
    name::{CollectionName, ModelName, normalize},
    outcome::OperationResult,
    verb::Verb,
};

/// Structured event topic: which verb touched which collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    verb: Verb,
    collection: CollectionName,
}

impl Topic {
    /// Creates a topic. The verb is mapped to its event verb, so `set` becomes `update`.
    pub fn new(verb: Verb, collection: CollectionName) -> Self {
        Self { verb: verb.event_verb(), collection }
    }

    /// Creates a topic from a loose model name, normalized like any model lookup.
    ///
    /// Returns `None` for names that do not resolve to a collection.
    pub fn for_model(verb: Verb, model: &str) -> Option<Self> {
        match normalize(model)? {
            ModelName::Collection(collection) => Some(Self::new(verb, collection)),
            ModelName::ObjectId => None,
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.verb, self.collection)
    }
}

impl FromStr for Topic {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocumentStoreError::InvalidArguments("topic".into(), s.to_string());
        let (verb, model) = s.split_once(':').ok_or_else(invalid)?;

        Topic::for_model(verb.parse()?, model).ok_or_else(invalid)
    }
}

/// A notification about a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub topic: Topic,
    pub payload: OperationResult,
}

/// Handle returned by [`EventPublisher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;
type HandlerMap = HashMap<Topic, Vec<(SubscriptionId, Handler)>>;

/// Topic-based publish-subscribe channel for change events.
///
/// Clones share the same subscriber table, so a publisher can be handed to the model store
/// and kept by the application to register subscribers.
#[derive(Clone, Default)]
pub struct EventPublisher {
    handlers: Arc<RwLock<HandlerMap>>,
    next_id: Arc<AtomicU64>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every event published under `topic`.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));

        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut removed = false;
        handlers.retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|(candidate, _)| *candidate != id);
            removed |= subscribers.len() != before;
            !subscribers.is_empty()
        });

        removed
    }

    /// Number of handlers currently registered for `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Delivers an event to every current subscriber of `topic`.
    ///
    /// Handlers are called after the subscriber table lock is released, so a handler may
    /// subscribe or unsubscribe without deadlocking.
    pub fn publish(&self, topic: Topic, payload: OperationResult) {
        let handlers = self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|(_, handler)| handler.clone())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        debug!(topic = %topic, subscribers = handlers.len(), "publishing change event");

        if handlers.is_empty() {
            return;
        }

        let event = ChangeEvent { topic, payload };
        for handler in handlers {
            handler(&event);
        }
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.handlers
            .read()
            .map(|handlers| handlers.len())
            .unwrap_or_default();

        f.debug_struct("EventPublisher")
            .field("topics", &topics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn topic(s: &str) -> Topic {
        s.parse().unwrap()
    }

    #[test]
    fn topics_render_as_verb_and_collection() {
        assert_eq!(topic("update:users").to_string(), "update:users");
        assert_eq!(topic("insert:User").to_string(), "insert:users");
        assert_eq!(Topic::for_model(Verb::Set, "Users").unwrap().to_string(), "update:users");
    }

    #[test]
    fn malformed_topics_are_rejected() {
        assert!("users".parse::<Topic>().is_err());
        assert!("upsert:users".parse::<Topic>().is_err());
        assert!("insert:inspect".parse::<Topic>().is_err());
        assert!("insert:ObjectId".parse::<Topic>().is_err());
    }

    #[test]
    fn subscribers_receive_matching_events_only() {
        let events = EventPublisher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        events.subscribe(topic("update:users"), move |event| {
            sink.lock().unwrap().push(event.topic.to_string());
        });

        events.publish(topic("update:users"), OperationResult::Count(1));
        events.publish(topic("insert:users"), OperationResult::Count(1));
        events.publish(topic("update:teams"), OperationResult::Count(1));

        assert_eq!(*seen.lock().unwrap(), vec!["update:users".to_string()]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let events = EventPublisher::new();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = hits.clone();
        let id = events.subscribe(topic("remove:logs"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        events.publish(topic("remove:logs"), OperationResult::Count(0));
        assert!(events.unsubscribe(id));
        assert!(!events.unsubscribe(id));
        events.publish(topic("remove:logs"), OperationResult::Count(0));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(events.subscriber_count(&topic("remove:logs")), 0);
    }

    #[test]
    fn clones_share_subscribers() {
        let events = EventPublisher::new();
        let shared = events.clone();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = hits.clone();
        shared.subscribe(topic("save:sessions"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        events.publish(topic("save:sessions"), OperationResult::Document(None));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handlers_may_subscribe_while_publishing() {
        let events = EventPublisher::new();
        let inner = events.clone();

        events.subscribe(topic("insert:users"), move |_| {
            inner.subscribe(topic("insert:teams"), |_| {});
        });
        events.publish(topic("insert:users"), OperationResult::Documents(vec![]));

        assert_eq!(events.subscriber_count(&topic("insert:teams")), 1);
    }
}
