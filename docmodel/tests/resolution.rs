mod support;

use std::time::Duration;

use docmodel::{
    bson::{doc, oid::ObjectId},
    memory::InMemoryStore,
    prelude::*,
};
use support::harness;

#[tokio::test]
async fn loose_names_address_one_collection() {
    let h = harness();

    h.store.model("User").unwrap().insert(doc! { "name": "Alice" }).await.unwrap();

    for name in ["User", "user", "users", "Users", "USERS"] {
        let handle = h.store.model(name).unwrap();
        assert_eq!(handle.name().as_str(), "users");
        assert_eq!(handle.count(doc! {}).await.unwrap(), 1);
    }

    assert_eq!(h.store.model("User"), h.store.model("users"));
    assert_eq!(h.store.list_collections().await.unwrap(), vec!["users".to_string()]);
}

#[tokio::test]
async fn reserved_probes_never_reach_the_store() {
    let h = harness();

    assert!(h.store.get_model("inspect").is_none());
    assert!(h.store.get_model("valueOf").is_none());
    assert!(h.store.get_model("").is_none());

    assert!(h.backend.calls().is_empty());
    assert!(h.store.list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn near_miss_probes_are_ordinary_models() {
    let h = harness();

    assert_eq!(h.store.model("Inspect").unwrap().name().as_str(), "inspects");
    assert_eq!(h.store.model("valueof").unwrap().name().as_str(), "valueofs");
    assert_eq!(h.store.model("objectid").unwrap().name().as_str(), "objectids");
}

#[tokio::test]
async fn object_id_names_resolve_to_the_id_factory() {
    let h = harness();

    for name in ["ObjectId", "ObjectID"] {
        let ids = h
            .store
            .get_model(name)
            .and_then(Resolved::into_object_id)
            .unwrap();

        let hex = "507f1f77bcf86cd799439011";
        assert_eq!(ids.parse(hex).unwrap(), ObjectId::parse_str(hex).unwrap());
        assert!(matches!(ids.parse("not-an-id"), Err(DocumentStoreError::InvalidDocument(_))));
        assert_ne!(ids.new_id(), ids.new_id());
    }

    assert!(h.store.model("ObjectId").is_none());
}

#[tokio::test]
async fn sessions_resolve_user_references() {
    let store = ModelStore::new(InMemoryStore::new());
    let users = store.model("user").unwrap();
    let sessions = store.model("session").unwrap();

    let alice = users
        .insert(doc! { "name": "Alice" })
        .await
        .unwrap()
        .into_document()
        .unwrap();
    let user_id = alice.get_object_id("_id").unwrap();

    sessions
        .insert(doc! { "token": "abc", "user": user_id.to_hex() })
        .await
        .unwrap();

    let session = sessions.find_one(doc! { "token": "abc" }).await.unwrap().unwrap();
    let reference = session.get_str("user").unwrap();

    let ids = store
        .get_model("ObjectID")
        .and_then(Resolved::into_object_id)
        .unwrap();
    let lookup = users.find_one(doc! { "_id": ids.parse(reference).unwrap() });

    let user = tokio::time::timeout(Duration::from_secs(1), lookup)
        .await
        .expect("lookup finished in time")
        .unwrap()
        .unwrap();
    assert_eq!(user.get_str("name").unwrap(), "Alice");
}

#[tokio::test]
async fn typed_models_round_trip_through_documents() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Team {
        name: String,
        size: i32,
    }

    let store = ModelStore::new(InMemoryStore::new());
    let teams = store.model("Team").unwrap();

    let blue = Team { name: "blue".to_string(), size: 4 };
    teams.insert(blue.to_document().unwrap()).await.unwrap();

    let mut stored = teams.find_one(doc! { "name": "blue" }).await.unwrap().unwrap();
    stored.remove("_id");
    stored.remove("createdAt");

    assert_eq!(Team::from_document(stored).unwrap(), blue);
}

#[tokio::test]
async fn dropped_collections_disappear() {
    let store = ModelStore::new(InMemoryStore::new());
    store.model("logs").unwrap().insert(doc! { "line": 1 }).await.unwrap();

    store.drop_collection("logs").await.unwrap();

    assert!(store.list_collections().await.unwrap().is_empty());
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn drop_collection_accepts_model_names() {
    let store = ModelStore::new(InMemoryStore::new());
    store.model("users").unwrap().insert(doc! { "name": "Alice" }).await.unwrap();

    store.drop_collection("User").await.unwrap();
    assert!(store.list_collections().await.unwrap().is_empty());

    for name in ["inspect", "ObjectId", ""] {
        assert!(matches!(
            store.drop_collection(name).await,
            Err(DocumentStoreError::CollectionNotFound(_))
        ));
    }
}
