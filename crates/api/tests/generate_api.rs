//! HTTP-level integration tests for `POST /api/generate`.
//!
//! Requests go through the full router; RunningHub is replaced by an
//! in-process fake on a random port.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{
    body_json, post_json, post_multipart, post_raw, MemoryBlobStore, TestContext, T2I_APP,
    UPSCALE_APP,
};
use imagegen_core::job::{JobKind, JobStatus};
use imagegen_db::JobStore;
use serde_json::{json, Value};

/// The `fieldValue` sent for `nodeId`/`fieldName` in a creation body.
fn node_value<'a>(created: &'a Value, node_id: &str, field_name: &str) -> Option<&'a str> {
    created["nodeInfoList"]
        .as_array()?
        .iter()
        .find(|n| n["nodeId"] == node_id && n["fieldName"] == field_name)?["fieldValue"]
        .as_str()
}

// ---------------------------------------------------------------------------
// Text-to-image (JSON)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn text_to_image_creates_processing_record() {
    let ctx = TestContext::new().await;

    let response = post_json(
        ctx.app(),
        "/api/generate",
        json!({"prompt": "a red fox", "ratio": "16:9", "useLora": true, "seed": 42}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["taskId"], "task-1");

    let record = ctx.store.get("task-1").await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Processing);
    assert_eq!(record.details.kind, Some(JobKind::TextToImage));
    assert_eq!(record.details.prompt.as_deref(), Some("a red fox"));
    assert_eq!(record.details.width, Some(1920));
    assert_eq!(record.details.height, Some(1080));
    assert_eq!(record.details.seed.as_deref(), Some("42"));
    assert!(record.image_url.is_none());

    let created = ctx.engine.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["webappId"], T2I_APP);
    assert_eq!(created[0]["apiKey"], "test-key");
    assert_eq!(node_value(&created[0], "6", "text"), Some("a red fox"));
    assert_eq!(node_value(&created[0], "5", "width"), Some("1920"));
    assert_eq!(node_value(&created[0], "5", "height"), Some("1080"));
    assert_eq!(node_value(&created[0], "22", "strength_model"), Some("1"));
    assert_eq!(node_value(&created[0], "7", "seed"), Some("42"));
}

#[tokio::test]
async fn random_seed_and_disabled_lora_are_resolved() {
    let ctx = TestContext::new().await;

    let response = post_json(
        ctx.app(),
        "/api/generate",
        json!({"prompt": "a lighthouse", "useLora": false, "seed": "random"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let created = ctx.engine.created();
    let seed = node_value(&created[0], "7", "seed").unwrap();
    assert!(seed.parse::<u64>().is_ok(), "seed should be numeric, got {seed}");
    assert_eq!(node_value(&created[0], "22", "strength_model"), Some("0"));
    // Ratio defaults to square.
    assert_eq!(node_value(&created[0], "5", "width"), Some("1080"));
}

#[tokio::test]
async fn missing_prompt_returns_400_without_record() {
    let ctx = TestContext::new().await;

    let response = post_json(ctx.app(), "/api/generate", json!({"prompt": "   "})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Prompt is required.");
    assert!(ctx.store.list_all().await.unwrap().is_empty());
    assert!(ctx.engine.created().is_empty());
}

#[tokio::test]
async fn invalid_seed_returns_400_without_record() {
    let ctx = TestContext::new().await;

    let response = post_json(
        ctx.app(),
        "/api/generate",
        json!({"prompt": "a fox", "seed": "-5"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.store.list_all().await.unwrap().is_empty());
    assert!(ctx.engine.created().is_empty());
}

#[tokio::test]
async fn unknown_ratio_returns_400() {
    let ctx = TestContext::new().await;

    let response = post_json(
        ctx.app(),
        "/api/generate",
        json!({"prompt": "a fox", "ratio": "4:3"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let ctx = TestContext::new().await;

    let response = post_raw(ctx.app(), "/api/generate", "application/json", "{not json").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn engine_rejection_returns_500_with_message_and_no_record() {
    let ctx = TestContext::new().await;
    ctx.engine.reject_tasks("APIKEY_INVALID");

    let response = post_json(ctx.app(), "/api/generate", json!({"prompt": "a fox"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["message"], "API Error: APIKEY_INVALID");
    assert!(ctx.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_content_type_returns_400() {
    let ctx = TestContext::new().await;

    let response = post_raw(ctx.app(), "/api/generate", "text/plain", "a fox").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.engine.created().is_empty());
}

// ---------------------------------------------------------------------------
// Upscale (multipart)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upscale_uploads_through_engine() {
    let ctx = TestContext::new().await;

    let response = post_multipart(
        ctx.app(),
        "/api/generate",
        &[("scale", "x2"), ("useLora", "on"), ("loraStrength", "0.6"), ("seed", "7")],
        Some(("cat.png", &b"\x89PNG fake image bytes"[..])),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let task_id = json["taskId"].as_str().unwrap().to_string();

    assert_eq!(ctx.engine.uploads(), vec!["cat.png".to_string()]);

    let created = ctx.engine.created();
    assert_eq!(created[0]["webappId"], UPSCALE_APP);
    assert_eq!(node_value(&created[0], "15", "image"), Some("api/cat.png"));
    assert_eq!(node_value(&created[0], "25", "default_value"), Some("0.5"));
    assert_eq!(node_value(&created[0], "22", "strength_model"), Some("0.6"));
    assert_eq!(node_value(&created[0], "7", "seed"), Some("7"));

    let record = ctx.store.get(&task_id).await.unwrap().unwrap();
    assert_eq!(record.details.kind, Some(JobKind::Upscale));
    assert_eq!(record.details.original_filename.as_deref(), Some("cat.png"));
    assert_eq!(record.details.scale.as_deref(), Some("x2"));
    assert!(record.details.prompt.is_none());
}

#[tokio::test]
async fn upscale_uses_blob_store_when_configured() {
    let blob = Arc::new(MemoryBlobStore::default());
    let ctx = TestContext::with_blob_store(blob.clone()).await;

    let response = post_multipart(
        ctx.app(),
        "/api/generate",
        &[("scale", "x4")],
        Some(("dog.png", &b"fake"[..])),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(ctx.engine.uploads().is_empty());
    assert_eq!(blob.objects.lock().unwrap().len(), 1);

    let created = ctx.engine.created();
    assert_eq!(
        node_value(&created[0], "15", "image"),
        Some("https://blobs.test/uploads/dog.png")
    );
    assert_eq!(node_value(&created[0], "25", "default_value"), Some("1"));
}

#[tokio::test]
async fn upscale_without_image_returns_400() {
    let ctx = TestContext::new().await;

    let response = post_multipart(ctx.app(), "/api/generate", &[("scale", "x4")], None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Image file is required.");
    assert!(ctx.engine.uploads().is_empty());
    assert!(ctx.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn upscale_with_bad_seed_uploads_nothing() {
    let ctx = TestContext::new().await;

    let response = post_multipart(
        ctx.app(),
        "/api/generate",
        &[("seed", "abc")],
        Some(("cat.png", &b"fake"[..])),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.engine.uploads().is_empty());
}
