/// Adapter tests
///
/// Exercises the store adapter end to end over the in-memory backend.
/// Run with: cargo test --test adapter_tests
use docbridge::{
    bson::{Binary, Bson, Decimal128, Document, doc, oid::ObjectId, spec::BinarySubtype},
    memory::{InMemoryStore, InMemoryStoreBuilder},
    prelude::*,
};
use std::sync::Arc;

async fn connected() -> DocumentStore<InMemoryStoreBuilder> {
    DocumentStore::connected(InMemoryStoreBuilder::default(), "memory://", &ConnectOptions::default())
        .await
        .unwrap()
}

fn names(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|d| d.get_str("name").unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_save_without_id_then_find_by_returned_id() {
    let store = connected().await;

    let id = store.save("users", None, doc! { "name": "a" }).await.unwrap();
    assert!(store.is_identifier_like(&id));

    let by_native = store.find_one("users", doc! { "_id": id.clone() }).await.unwrap().unwrap();
    assert_eq!(by_native.get_str("name").unwrap(), "a");

    let hex = store.to_canonical_string(&id);
    let by_hex = store.find_one("users", doc! { "_id": hex.as_str() }).await.unwrap().unwrap();
    assert_eq!(by_hex, by_native);
}

#[tokio::test]
async fn test_save_with_null_id_inserts() {
    let store = connected().await;

    let id = store.save("users", Some(Bson::Null), doc! { "name": "a" }).await.unwrap();
    assert!(matches!(id, Bson::ObjectId(_)));
    assert_eq!(store.count("users", doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_save_with_existing_id_replaces() {
    let store = connected().await;

    let id = store.save("users", None, doc! { "name": "a", "age": 3 }).await.unwrap();
    let hex = Bson::String(store.to_canonical_string(&id));

    let same = store.save("users", Some(hex), doc! { "name": "b" }).await.unwrap();
    assert_eq!(same, id);

    let found = store.find_one("users", doc! { "_id": id }).await.unwrap().unwrap();
    assert_eq!(found.get_str("name").unwrap(), "b");
    assert!(found.get("age").is_none());
    assert_eq!(store.count("users", doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_save_with_caller_chosen_non_hex_id() {
    let store = connected().await;

    let id = store.save("users", Some(Bson::String("user-1".into())), doc! { "name": "a" }).await.unwrap();
    assert_eq!(id, Bson::String("user-1".into()));
    assert_eq!(store.to_canonical_string(&id), "user-1");

    let found = store.find_one("users", doc! { "_id": "user-1" }).await.unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn test_hex_id_in_document_body_is_canonicalized() {
    let store = connected().await;
    let hex = "507f1f77bcf86cd799439011";

    let id = store.save("users", None, doc! { "_id": hex, "name": "a" }).await.unwrap();
    assert_eq!(id, Bson::ObjectId(ObjectId::parse_str(hex).unwrap()));

    let found = store.find_one("users", doc! { "_id": { "$in": [hex] } }).await.unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn test_opaque_identifiers_round_trip() {
    let store = connected().await;
    let uuid = Bson::Binary(Binary { subtype: BinarySubtype::Uuid, bytes: vec![9; 16] });
    let ids = [
        uuid,
        Bson::Int64(42),
        Bson::Decimal128(Decimal128::from_bytes([5; 16])),
    ];

    for id in ids {
        store.save("things", Some(id.clone()), doc! { "v": 1 }).await.unwrap();
        let same = store.save("things", Some(id.clone()), doc! { "v": 2 }).await.unwrap();
        assert_eq!(same, id);
        assert_eq!(store.count("things", doc! {}).await.unwrap(), 1);

        let found = store.find_one("things", doc! { "_id": id.clone() }).await.unwrap().unwrap();
        assert_eq!(found, doc! { "_id": id.clone(), "v": 2 });
        assert!(!store.is_identifier_like(&id));

        assert_eq!(store.delete_by_id("things", id).await.unwrap(), 1);
        assert_eq!(store.count("things", doc! {}).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_update_cannot_change_identifier() {
    let store = connected().await;
    let id = store.save("counters", None, doc! { "n": 0 }).await.unwrap();

    let err = store
        .find_one_and_update("counters", doc! { "_id": id.clone() }, doc! { "_id": "other", "n": 1 }, UpdateOptions::default())
        .await
        .unwrap_err();
    match err {
        DocumentStoreError::Store { operation, .. } => assert_eq!(operation, Operation::FindOneAndUpdate),
        other => panic!("unexpected error: {other:?}"),
    }

    let unchanged = store.find_one("counters", doc! { "_id": id.clone() }).await.unwrap();
    assert_eq!(unchanged, Some(doc! { "_id": id, "n": 0 }));
}

#[tokio::test]
async fn test_update_without_fields_is_rejected() {
    let store = connected().await;
    let id = store.save("counters", None, doc! { "n": 0 }).await.unwrap();

    for options in [UpdateOptions::default(), UpdateOptions::upsert()] {
        let err = store
            .find_one_and_update("counters", doc! { "_id": id.clone() }, doc! {}, options)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }
}

#[tokio::test]
async fn test_find_one_and_update_merges_fields() {
    let store = connected().await;
    let id = store.save("counters", None, doc! { "n": 0, "m": 2 }).await.unwrap();

    let updated = store
        .find_one_and_update("counters", doc! { "_id": id.clone() }, doc! { "n": 1 }, UpdateOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated, doc! { "_id": id, "n": 1, "m": 2 });
}

#[tokio::test]
async fn test_find_one_and_update_without_match_or_upsert_returns_none() {
    let store = connected().await;

    let updated = store
        .find_one_and_update("counters", doc! { "name": "missing" }, doc! { "n": 1 }, UpdateOptions::default())
        .await
        .unwrap();

    assert!(updated.is_none());
    assert_eq!(store.count("counters", doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn test_upsert_creates_when_absent() {
    let store = connected().await;
    let hex = "507f191e810c19729de860ea";

    let created = store
        .find_one_and_update("counters", doc! { "_id": hex }, doc! { "n": 1 }, UpdateOptions::upsert())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created, doc! { "_id": ObjectId::parse_str(hex).unwrap(), "n": 1 });
}

#[tokio::test]
async fn test_upsert_generates_id_when_filter_has_none() {
    let store = connected().await;

    let created = store
        .find_one_and_update("counters", doc! { "name": "x" }, doc! { "n": 1 }, UpdateOptions::upsert())
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(created.get("_id"), Some(Bson::ObjectId(_))));
    assert_eq!(created.get_str("name").unwrap(), "x");
    assert_eq!(created.get_i32("n").unwrap(), 1);
}

#[tokio::test]
async fn test_upsert_returns_existing_match_unchanged() {
    let store = connected().await;
    let id = store.save("counters", None, doc! { "n": 0 }).await.unwrap();

    let result = store
        .find_one_and_update("counters", doc! { "_id": id.clone() }, doc! { "n": 1 }, UpdateOptions::upsert())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result, doc! { "_id": id, "n": 0 });
}

#[tokio::test]
async fn test_find_applies_sort_then_skip_then_limit() {
    let store = connected().await;
    for (name, age) in [("a", 30), ("b", 25), ("c", 41), ("d", 19)] {
        store.save("people", None, doc! { "name": name, "age": age }).await.unwrap();
    }

    let options = FindOptions::builder().sort("-age").skip(1).limit(2).build();
    let found = store.find("people", doc! {}, options).await.unwrap();

    assert_eq!(names(&found), vec!["a", "b"]);
}

#[tokio::test]
async fn test_find_ignores_non_string_sort_entries() {
    let store = connected().await;
    for (name, age) in [("a", 30), ("b", 25)] {
        store.save("people", None, doc! { "name": name, "age": age }).await.unwrap();
    }

    let options = FindOptions::builder()
        .sort(docbridge::bson::bson!([1, "age", null]))
        .build();
    let found = store.find("people", doc! {}, options).await.unwrap();

    assert_eq!(names(&found), vec!["b", "a"]);
}

#[tokio::test]
async fn test_in_with_hex_strings_matches_native_ids() {
    let store = connected().await;
    let first = store.save("users", None, doc! { "name": "a" }).await.unwrap();
    let second = store.save("users", None, doc! { "name": "b" }).await.unwrap();
    store.save("users", None, doc! { "name": "c" }).await.unwrap();

    let hexes = vec![store.to_canonical_string(&first), store.to_canonical_string(&second)];
    let found = store
        .find("users", doc! { "_id": { "$in": hexes.clone() } }, FindOptions::default())
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["a", "b"]);

    let excluded = store
        .find("users", doc! { "_id": { "$nin": hexes } }, FindOptions::default())
        .await
        .unwrap();
    assert_eq!(names(&excluded), vec!["c"]);
}

#[tokio::test]
async fn test_foreign_key_fields_are_not_converted() {
    let store = connected().await;
    let owner = store.save("users", None, doc! { "name": "owner" }).await.unwrap();
    let owner_hex = store.to_canonical_string(&owner);

    store.save("posts", None, doc! { "owner_id": owner_hex.as_str() }).await.unwrap();

    assert_eq!(store.count("posts", doc! { "owner_id": owner_hex.as_str() }).await.unwrap(), 1);
    assert_eq!(store.count("posts", doc! { "owner_id": owner }).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_many_on_empty_match_set() {
    let store = connected().await;
    store.save("users", None, doc! { "name": "a" }).await.unwrap();

    assert_eq!(store.delete_many("users", doc! { "name": "zzz" }).await.unwrap(), 0);
    assert_eq!(store.count("users", doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_operations_report_counts() {
    let store = connected().await;
    let id = store.save("users", None, doc! { "name": "a", "role": "x" }).await.unwrap();
    store.save("users", None, doc! { "name": "b", "role": "x" }).await.unwrap();
    store.save("users", None, doc! { "name": "c", "role": "x" }).await.unwrap();
    store.save("users", None, doc! { "name": "d", "role": "y" }).await.unwrap();

    let hex = Bson::String(store.to_canonical_string(&id));
    assert_eq!(store.delete_by_id("users", hex.clone()).await.unwrap(), 1);
    assert_eq!(store.delete_by_id("users", hex).await.unwrap(), 0);
    assert_eq!(store.delete_by_id("users", Bson::Null).await.unwrap(), 0);

    assert_eq!(store.delete_one("users", doc! { "role": "x" }).await.unwrap(), 1);
    assert_eq!(store.delete_many("users", doc! { "role": { "$in": ["x", "y"] } }).await.unwrap(), 2);
    assert_eq!(store.count("users", doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_one_and_delete() {
    let store = connected().await;
    store.save("jobs", None, doc! { "state": "queued" }).await.unwrap();

    assert_eq!(store.find_one_and_delete("jobs", doc! { "state": "queued" }).await.unwrap(), 1);
    assert_eq!(store.find_one_and_delete("jobs", doc! { "state": "queued" }).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unique_index_violation_is_a_store_error() {
    let store = connected().await;
    store.create_index("users", "email", IndexOptions::unique()).await.unwrap();
    store.save("users", None, doc! { "email": "a@x" }).await.unwrap();

    match store.save("users", None, doc! { "email": "a@x" }).await.unwrap_err() {
        DocumentStoreError::Store { operation, .. } => assert_eq!(operation, Operation::Save),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_clear_collection_and_drop_database() {
    let backend = InMemoryStore::new();
    let store = DocumentStore::connected(
        InMemoryStoreBuilder::with_store(backend.clone()),
        "memory://",
        &ConnectOptions::default(),
    )
    .await
    .unwrap();

    store.save("a", None, doc! {}).await.unwrap();
    store.save("b", None, doc! {}).await.unwrap();

    store.clear_collection("a").await.unwrap();
    assert_eq!(backend.collection_names().await, vec!["b".to_string()]);
    assert_eq!(store.count("a", doc! {}).await.unwrap(), 0);

    store.drop_database().await.unwrap();
    assert!(backend.collection_names().await.is_empty());
}

#[tokio::test]
async fn test_lifecycle_transitions() {
    let store = DocumentStore::new(InMemoryStoreBuilder::default());
    assert_eq!(store.state().await, ConnectionState::Disconnected);
    assert!(store.count("users", doc! {}).await.unwrap_err().is_invalid_state());

    store.connect("memory://", &ConnectOptions::default()).await.unwrap();
    assert_eq!(store.state().await, ConnectionState::Connected);

    store.close().await.unwrap();
    assert_eq!(store.state().await, ConnectionState::Closed);
    assert!(store.save("users", None, doc! {}).await.unwrap_err().is_invalid_state());
}

#[tokio::test]
async fn test_reconnect_keeps_existing_connection() {
    let store = connected().await;
    store.save("users", None, doc! { "name": "a" }).await.unwrap();

    store.connect("memory://", &ConnectOptions::default()).await.unwrap();
    assert_eq!(store.count("users", doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_connect_failure_is_a_connection_error() {
    let store = DocumentStore::new(InMemoryStoreBuilder::default());

    let err = store.connect("postgres://nowhere", &ConnectOptions::default()).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Connection(_)));
    assert_eq!(store.state().await, ConnectionState::Disconnected);

    store.connect("memory://", &ConnectOptions::default()).await.unwrap();
    assert_eq!(store.state().await, ConnectionState::Connected);
}

#[tokio::test]
async fn test_connect_with_config() {
    let config = StoreConfig::from_json_str(r#"{ "url": "memory://", "database": "app" }"#).unwrap();
    let store = DocumentStore::new(InMemoryStoreBuilder::default());

    store.connect_with(&config).await.unwrap();
    assert_eq!(store.state().await, ConnectionState::Connected);
}

#[tokio::test]
async fn test_collection_handle_over_dyn_adapter() {
    let store: Arc<dyn StoreAdapter> = Arc::new(DocumentStore::new(InMemoryStoreBuilder::default()));
    store.connect("memory://", &ConnectOptions::default()).await.unwrap();

    let users = Collection::new("users".to_string(), store.as_ref());
    let id = users.save(None, doc! { "name": "a" }).await.unwrap();

    let hex = store.to_canonical_string(&id);
    assert!(users.find_by_id(hex.as_str()).await.unwrap().is_some());
    assert_eq!(users.delete_by_id(hex.as_str()).await.unwrap(), 1);
    assert_eq!(users.count(doc! {}).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_share_one_connection() {
    let store = Arc::new(connected().await);

    let handles = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.save("events", None, doc! { "seq": i }).await })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.count("events", doc! {}).await.unwrap(), 16);
}

#[test]
fn test_identifier_helpers() {
    let id = Identifier::new();
    let hex = id.to_canonical_string();

    assert_eq!(Identifier::parse(&hex), Some(id));
    assert_eq!(Identifier::parse(&hex.to_uppercase()), Some(id));
    assert!(docbridge::id::is_identifier_like(&Bson::String(hex)));
    assert!(!docbridge::id::is_identifier_like(&Bson::String("nope".into())));
}
