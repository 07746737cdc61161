mod common;

use cakewalk_atoms::catalog::{
    create_image, list_catalog, list_catalog_handler, update_metadata, CatalogError, ListOptions,
    MetadataPatch, SweepGuard, TagsInput, UploadMetadata, UploadRequest,
};
use cakewalk_atoms::store::{ObjectStore, StoreError, TimeoutStore};
use common::FaultyStore;
use std::time::Duration;

const CALL_LIMIT: Duration = Duration::from_millis(250);

fn promote() -> MetadataPatch {
    MetadataPatch {
        is_landing_image: Some(true),
        ..Default::default()
    }
}

#[tokio::test]
async fn sequential_promotions_leave_one_landing_image() {
    let store = FaultyStore::new();
    for key in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        store.seed(key, &[("title", key)]);
    }
    let guard = SweepGuard::new(4);

    for key in ["a.jpg", "c.jpg", "b.jpg", "b.jpg", "d.jpg", "a.jpg"] {
        update_metadata(&store, &guard, key, promote()).await.unwrap();
        assert_eq!(store.landing_keys(), vec![key.to_string()]);
    }
}

#[tokio::test]
async fn merge_preserves_untouched_fields() {
    let store = FaultyStore::new();
    store.seed(
        "a.jpg",
        &[("title", "A"), ("category", "B"), ("tags", "x"), ("originalname", "a-orig.jpg")],
    );

    let patch = MetadataPatch {
        description: Some("new".into()),
        ..Default::default()
    };
    update_metadata(&store, &SweepGuard::default(), "a.jpg", patch)
        .await
        .unwrap();

    let raw = store.inner.raw_metadata("a.jpg").unwrap();
    assert_eq!(raw["title"], "A");
    assert_eq!(raw["category"], "B");
    assert_eq!(raw["tags"], "x");
    assert_eq!(raw["description"], "new");
    assert_eq!(raw["originalname"], "a-orig.jpg");
    assert_eq!(store.inner.body("a.jpg"), Some(vec![0xff, 0xd8]));
    assert_eq!(store.inner.content_type("a.jpg").as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn promotion_demotes_exactly_the_prior_holder() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "true")]);
    store.seed("b.jpg", &[("islandingimage", "false")]);
    store.seed("c.jpg", &[]);

    let outcome = update_metadata(&store, &SweepGuard::default(), "b.jpg", promote())
        .await
        .unwrap();

    assert_eq!(store.flag("a.jpg", "islandingimage").as_deref(), Some("false"));
    assert_eq!(store.flag("b.jpg", "islandingimage").as_deref(), Some("true"));
    assert_eq!(store.replace_calls("c.jpg"), 0);
    let report = outcome.sweep.unwrap();
    assert_eq!(report.demoted, 1);
    assert_eq!(report.scanned, 2);
}

#[tokio::test]
async fn promotion_without_prior_holder_writes_only_target() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "false")]);
    store.seed("b.jpg", &[]);
    store.seed("c.jpg", &[("showincarousel", "true")]);

    update_metadata(&store, &SweepGuard::default(), "b.jpg", promote())
        .await
        .unwrap();

    assert_eq!(store.total_replace_calls(), 1);
    assert_eq!(store.replace_calls("b.jpg"), 1);
}

#[tokio::test]
async fn string_and_list_tags_store_identically() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[]);
    store.seed("b.jpg", &[]);
    let guard = SweepGuard::default();

    let text = MetadataPatch {
        tags: Some(TagsInput::Text("chocolate, birthday, ".into())),
        ..Default::default()
    };
    let list = MetadataPatch {
        tags: Some(TagsInput::List(vec!["chocolate".into(), "birthday".into()])),
        ..Default::default()
    };
    let a = update_metadata(&store, &guard, "a.jpg", text).await.unwrap();
    let b = update_metadata(&store, &guard, "b.jpg", list).await.unwrap();

    assert_eq!(a.metadata.tags, b.metadata.tags);
    assert_eq!(
        store.inner.raw_metadata("a.jpg").unwrap()["tags"],
        store.inner.raw_metadata("b.jpg").unwrap()["tags"]
    );
    assert_eq!(store.inner.raw_metadata("a.jpg").unwrap()["tags"], "chocolate,birthday");
}

#[tokio::test]
async fn sibling_failure_does_not_block_promotion() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "true")]);
    store.seed("b.jpg", &[("islandingimage", "true")]);
    store.seed("c.jpg", &[("islandingimage", "true")]);
    store.seed("target.jpg", &[]);
    store.fail_replace_for("b.jpg");

    let outcome = update_metadata(&store, &SweepGuard::new(3), "target.jpg", promote())
        .await
        .unwrap();

    assert_eq!(store.flag("target.jpg", "islandingimage").as_deref(), Some("true"));
    assert_eq!(store.flag("a.jpg", "islandingimage").as_deref(), Some("false"));
    assert_eq!(store.flag("c.jpg", "islandingimage").as_deref(), Some("false"));
    assert_eq!(store.flag("b.jpg", "islandingimage").as_deref(), Some("true"));

    let report = outcome.sweep.unwrap();
    assert_eq!(report.demoted, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn unreadable_sibling_is_counted_not_fatal() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "true")]);
    store.seed("target.jpg", &[]);
    store.fail_head_for("a.jpg");

    let outcome = update_metadata(&store, &SweepGuard::default(), "target.jpg", promote())
        .await
        .unwrap();

    assert_eq!(outcome.sweep.unwrap().failed, 1);
    assert_eq!(store.flag("target.jpg", "islandingimage").as_deref(), Some("true"));
}

#[tokio::test]
async fn failed_sweep_listing_still_promotes() {
    let store = FaultyStore::new();
    store.seed("target.jpg", &[]);
    store.fail_list();

    let outcome = update_metadata(&store, &SweepGuard::default(), "target.jpg", promote())
        .await
        .unwrap();

    assert!(!outcome.sweep.unwrap().listed);
    assert_eq!(store.flag("target.jpg", "islandingimage").as_deref(), Some("true"));
}

#[tokio::test]
async fn missing_id_is_not_found_without_sweeping() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "true")]);

    let err = update_metadata(&store, &SweepGuard::default(), "nonexistent", promote())
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::NotFound(id) if id == "nonexistent"));
    assert_eq!(store.list_calls(), 0);
    assert_eq!(store.total_replace_calls(), 0);
    assert_eq!(store.flag("a.jpg", "islandingimage").as_deref(), Some("true"));
}

#[tokio::test]
async fn target_write_failure_is_fatal() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("title", "A")]);
    store.fail_replace_for("a.jpg");

    let patch = MetadataPatch {
        title: Some("B".into()),
        ..Default::default()
    };
    let err = update_metadata(&store, &SweepGuard::default(), "a.jpg", patch)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Store(_)));
    assert!(!err.is_client_error());
    assert_eq!(store.flag("a.jpg", "title").as_deref(), Some("A"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_target_read_fails_the_update() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "true")]);
    store.seed("target.jpg", &[]);
    store.stall_head_for("target.jpg");
    let store = TimeoutStore::new(store, CALL_LIMIT);

    let err = update_metadata(&store, &SweepGuard::default(), "target.jpg", promote())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::Store(StoreError::Timeout { op: "head_object", .. })
    ));
    assert!(!err.is_client_error());
    assert_eq!(store.inner().list_calls(), 0);
    assert_eq!(store.inner().flag("a.jpg", "islandingimage").as_deref(), Some("true"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_target_write_fails_the_update() {
    let store = FaultyStore::new();
    store.seed("target.jpg", &[("title", "Old")]);
    store.stall_replace_for("target.jpg");
    let store = TimeoutStore::new(store, CALL_LIMIT);

    let patch = MetadataPatch {
        title: Some("New".into()),
        ..Default::default()
    };
    let err = update_metadata(&store, &SweepGuard::default(), "target.jpg", patch)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::Store(StoreError::Timeout { op: "replace_metadata", .. })
    ));
    assert_eq!(store.inner().flag("target.jpg", "title").as_deref(), Some("Old"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_sibling_is_counted_not_fatal() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "true")]);
    store.seed("b.jpg", &[("islandingimage", "true")]);
    store.seed("c.jpg", &[("islandingimage", "true")]);
    store.seed("target.jpg", &[]);
    store.stall_head_for("a.jpg");
    store.stall_replace_for("b.jpg");
    let store = TimeoutStore::new(store, CALL_LIMIT);

    let outcome = update_metadata(&store, &SweepGuard::new(4), "target.jpg", promote())
        .await
        .unwrap();

    let report = outcome.sweep.unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.demoted, 1);
    assert_eq!(report.failed, 2);
    let inner = store.inner();
    assert_eq!(inner.flag("target.jpg", "islandingimage").as_deref(), Some("true"));
    assert_eq!(inner.flag("c.jpg", "islandingimage").as_deref(), Some("false"));
}

#[tokio::test]
async fn non_promoting_update_skips_sweep() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[("islandingimage", "true")]);
    store.seed("b.jpg", &[]);

    let demote = MetadataPatch {
        is_landing_image: Some(false),
        show_in_carousel: Some(true),
        ..Default::default()
    };
    let outcome = update_metadata(&store, &SweepGuard::default(), "b.jpg", demote)
        .await
        .unwrap();

    assert!(outcome.sweep.is_none());
    assert_eq!(store.list_calls(), 0);
    assert_eq!(store.flag("a.jpg", "islandingimage").as_deref(), Some("true"));
    assert_eq!(store.flag("b.jpg", "showincarousel").as_deref(), Some("true"));
}

#[tokio::test]
async fn listing_falls_back_per_item_on_metadata_failure() {
    let store = FaultyStore::new();
    store.seed(
        "chocolate-delight.jpg",
        &[
            ("title", "Chocolate Delight"),
            ("description", "Rich ganache"),
            ("category", "chocolate"),
            ("tags", "chocolate, birthday"),
            ("islandingimage", "true"),
            ("showincarousel", "true"),
        ],
    );
    store.seed("vanilla_dream.png", &[("title", "Vanilla"), ("islandingimage", "true")]);
    store.fail_head_for("vanilla_dream.png");

    let records = list_catalog(&store, &ListOptions::default()).await.unwrap();
    assert_eq!(records.len(), 2);

    let good = &records[0];
    assert_eq!(good.id, "chocolate-delight.jpg");
    assert_eq!(good.name, "Chocolate Delight");
    assert_eq!(good.tags, vec!["chocolate", "birthday"]);
    assert!(good.is_landing_image);
    assert!(good.show_in_carousel);
    assert_eq!(good.alt, "Image of Chocolate Delight");
    assert_eq!(good.original_filename, "chocolate-delight.jpg");

    let fallback = &records[1];
    assert_eq!(fallback.name, "vanilla dream");
    assert_eq!(fallback.description, "");
    assert!(fallback.tags.is_empty());
    assert!(!fallback.is_landing_image);
    assert!(!fallback.show_in_carousel);
}

#[tokio::test]
async fn listing_signs_fresh_urls_every_call() {
    let store = FaultyStore::new();
    store.seed("a.jpg", &[]);

    let first = list_catalog(&store, &ListOptions::default()).await.unwrap();
    let second = list_catalog(&store, &ListOptions::default()).await.unwrap();
    assert_ne!(first[0].src, second[0].src);
}

#[tokio::test]
async fn listing_fails_when_store_cannot_list() {
    let store = FaultyStore::new();
    store.fail_list();

    let err = list_catalog(&store, &ListOptions::default()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Store(_)));
}

#[tokio::test]
async fn listing_failure_responds_with_failure_body() {
    let store = FaultyStore::new();
    store.fail_list();

    let resp = list_catalog_handler(&store, &ListOptions::default()).await.unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to fetch cakes");
}

#[tokio::test]
async fn upload_defaults_flags_to_false() {
    let store = FaultyStore::new();
    let upload = UploadRequest {
        filename: "Birthday-Cake.JPG".into(),
        content_type: "image/jpeg".into(),
        body: vec![1, 2, 3],
        metadata: UploadMetadata {
            title: Some("Birthday".into()),
            tags: Some(TagsInput::Text("party, kids".into())),
            ..Default::default()
        },
    };

    let outcome = create_image(&store, upload).await.unwrap();

    assert!(outcome.key.ends_with(".jpg"));
    assert_eq!(outcome.location, store.object_location(&outcome.key));
    let raw = store.inner.raw_metadata(&outcome.key).unwrap();
    assert_eq!(raw["islandingimage"], "false");
    assert_eq!(raw["showincarousel"], "false");
    assert_eq!(raw["originalname"], "Birthday-Cake.JPG");
    assert_eq!(raw["tags"], "party,kids");
    assert!(raw.contains_key("uploaddate"));

    let records = list_catalog(&store, &ListOptions::default()).await.unwrap();
    assert_eq!(records[0].name, "Birthday");
    assert!(!records[0].is_landing_image);
}
