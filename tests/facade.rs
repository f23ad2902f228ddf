//! Facade behavior tests.
//!
//! The driver client constructs lazily, so name resolution, pooling, and
//! option relay are all observable without a running server.

use std::sync::Arc;
use std::time::Duration;

use mongrove::prelude::*;
use pretty_assertions::assert_eq;

async fn facade(name: &str) -> Database {
    let client = Client::builder()
        .uri("mongodb://localhost:27017")
        .build()
        .await
        .unwrap();
    client.database(name)
}

fn east_tags() -> Vec<TagSet> {
    let mut tags = TagSet::new();
    tags.insert("dc".to_string(), "east".to_string());
    vec![tags]
}

// ============================================================================
// Pooling
// ============================================================================

#[tokio::test]
async fn pooled_lookups_share_one_instance() {
    let db = facade("pool_shared").await;

    let first = db.collection("users").unwrap();
    let second = db.collection("users").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn disabled_pool_constructs_distinct_instances() {
    let db = facade("pool_disabled").await;

    let pooled = db.collection("users").unwrap();

    db.disable_collection_pool();
    let first = db.collection("users").unwrap();
    let second = db.collection("users").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&pooled, &first));

    // Disabling does not evict: the original entry is served again once
    // pooling is re-enabled.
    db.enable_collection_pool();
    let revived = db.collection("users").unwrap();
    assert!(Arc::ptr_eq(&pooled, &revived));
}

#[tokio::test]
async fn clearing_the_pool_evicts_but_keeps_pooling_on() {
    let db = facade("pool_cleared").await;

    let first = db.collection("users").unwrap();
    db.clear_collection_pool();

    let second = db.collection("users").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(db.is_collection_pool_enabled());

    let third = db.collection("users").unwrap();
    assert!(Arc::ptr_eq(&second, &third));
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn unmapped_names_use_the_default_type() {
    let db = facade("resolution_default").await;

    let handle = db.collection("events").unwrap();
    assert_eq!(handle.name(), "events");
    assert!(handle.options().is_empty());
    assert_eq!(db.default_collection_type(), DEFAULT_COLLECTION_TYPE);
}

#[tokio::test]
async fn mapped_tokens_must_be_registered() {
    let db = facade("resolution_eager").await;

    db.map("users", "app.User").unwrap();
    let err = db.collection("users").unwrap_err();
    assert!(err.is_type_resolution());

    db.register_collection_type("app.User", |ctx| Ok(CollectionHandle::from_context(ctx)));
    assert!(db.collection("users").is_ok());
}

#[tokio::test]
async fn regex_mappings_attach_match_groups() {
    let db = facade("resolution_regex").await;

    db.register_collection_type("app.Log", |ctx| Ok(CollectionHandle::from_context(ctx)));
    db.map("/^logs\\.(\\d{4})\\.(\\d{2})$/", "app.Log").unwrap();

    let handle = db.collection("logs.2024.06").unwrap();
    assert_eq!(handle.match_groups(), ["2024", "06"]);
}

#[tokio::test]
async fn mapping_options_reach_the_constructed_handle() {
    let db = facade("resolution_options").await;

    db.map(
        "audit",
        ClassDefinition::default().with_options(doc! { "capped": true, "size": 1024_i64 }),
    )
    .unwrap();

    let handle = db.collection("audit").unwrap();
    assert_eq!(
        handle.options(),
        &doc! { "capped": true, "size": 1024_i64 }
    );
}

#[tokio::test]
async fn prefix_convention_synthesizes_namespaced_tokens() {
    let db = facade("resolution_prefix").await;
    db.map_prefix("App.Models");

    db.register_collection_type("App.Models.User.Profile", |ctx| {
        Ok(CollectionHandle::from_context(ctx))
    });

    assert!(db.collection("user.profile").is_ok());

    // Synthesized tokens that nobody registered fail eagerly.
    let err = db.collection("billing.invoice").unwrap_err();
    assert!(err.is_type_resolution());
}

// ============================================================================
// GridFS
// ============================================================================

#[tokio::test]
async fn gridfs_shares_the_pool_namespace() {
    let db = facade("gridfs_namespace").await;

    let first = db.gridfs().unwrap();
    assert_eq!(first.prefix(), DEFAULT_GRIDFS_PREFIX);
    assert_eq!(first.files_collection_name(), "fs.files");

    let second = db.gridfs().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // The "fs" slot is taken by a bucket; asking for a collection under
    // the same name is a conformance error.
    let err = db.collection("fs").unwrap_err();
    assert!(err.is_type_conformance());
}

#[tokio::test]
async fn gridfs_resolution_honors_the_class_map() {
    let db = facade("gridfs_mapped").await;

    db.register_gridfs_type("app.Photos", GridFsHandle::from_context);
    db.map("photos", "app.Photos").unwrap();

    let bucket = db.gridfs_with_prefix("photos").unwrap();
    assert_eq!(bucket.prefix(), "photos");
    assert_eq!(bucket.chunks_collection_name(), "photos.chunks");

    // The same token does not satisfy the collection contract.
    let err = db.collection("photos").unwrap_err();
    assert!(err.is_type_conformance());
}

// ============================================================================
// Concerns
// ============================================================================

#[tokio::test]
async fn majority_write_concern_reaches_the_driver() {
    let db = facade("concern_majority").await;

    db.set_majority_write_concern(Duration::from_millis(5000))
        .unwrap();

    let mut expected = mongodb::options::WriteConcern::builder()
        .w(mongodb::options::Acknowledgment::Majority)
        .build();
    expected.w_timeout = Some(Duration::from_millis(5000));
    assert_eq!(db.mongodb_handle().write_concern(), Some(&expected));

    let concern = db.write_concern().unwrap();
    assert_eq!(concern.level, AckLevel::Majority);
    assert_eq!(concern.timeout, Some(Duration::from_millis(5000)));
}

#[tokio::test]
async fn rejected_write_concern_leaves_the_facade_unchanged() {
    let db = facade("concern_rejected").await;

    let err = db
        .set_write_concern(WriteConcern::unacknowledged().with_journal(true))
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(db.write_concern(), None);
    assert!(db.mongodb_handle().write_concern().is_none());
}

#[tokio::test]
async fn read_preference_is_relayed_and_readable() {
    let db = facade("concern_reads").await;
    assert_eq!(db.read_preference(), None);

    db.read_secondary(east_tags()).unwrap();

    let preference = db.read_preference().unwrap();
    assert_eq!(preference.mode, ReadMode::Secondary);
    assert_eq!(preference.tag_sets, east_tags());
    assert!(db.mongodb_handle().selection_criteria().is_some());

    // Primary-only reads cannot carry a tag-set filter.
    let err = db
        .set_read_preference(ReadPreference::primary().with_tag_sets(east_tags()))
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn client_level_concerns_seed_the_facade() {
    let client = Client::builder()
        .uri("mongodb://localhost:27017")
        .database("app")
        .read_preference(ReadPreference::nearest())
        .write_concern(WriteConcern::majority())
        .build()
        .await
        .unwrap();

    let db = client.default_database().unwrap();
    assert_eq!(db.read_preference().unwrap().mode, ReadMode::Nearest);
    assert_eq!(db.write_concern().unwrap().level, AckLevel::Majority);
}

// ============================================================================
// Collection creation
// ============================================================================

#[tokio::test]
async fn capped_collections_need_a_positive_bound() {
    let db = facade("capped_validation").await;

    // Fails before any server call is attempted.
    let err = db
        .create_capped_collection("bounded", 0, 0)
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}
