use async_trait::async_trait;
use serde_json::json;
use wp_content_sync::app::dispatch;
use wp_content_sync::core::{ContentStore, SyncSettings};
use wp_content_sync::domain::model::{DbCourse, DbLesson, DbModule, DbSnapshot, LessonPatch, ModulePatch};
use wp_content_sync::{MemoryStore, Result, SyncEngine, SyncError};

const EXPORT: &str = include_str!("fixtures/blues_export.xml");
const SNAPSHOT: &str = include_str!("fixtures/blues_snapshot.json");

/// 每個呼叫都失敗的儲存
struct UnreachableStore;

#[async_trait]
impl ContentStore for UnreachableStore {
    async fn fetch_courses(&self) -> Result<Vec<DbCourse>> {
        Err(SyncError::store("connection refused"))
    }

    async fn fetch_modules(&self) -> Result<Vec<DbModule>> {
        Err(SyncError::store("connection refused"))
    }

    async fn fetch_lessons(&self) -> Result<Vec<DbLesson>> {
        Err(SyncError::store("connection refused"))
    }

    async fn upsert_modules(&self, _patches: &[ModulePatch]) -> Result<usize> {
        Err(SyncError::store("connection refused"))
    }

    async fn upsert_lessons(&self, _patches: &[LessonPatch]) -> Result<usize> {
        Err(SyncError::store("connection refused"))
    }
}

fn engine() -> SyncEngine<MemoryStore> {
    let snapshot: DbSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
    SyncEngine::new(MemoryStore::new(snapshot), SyncSettings::default())
}

#[tokio::test]
async fn test_sync_content_defaults_to_dry_run() {
    let engine = engine();
    let reply = dispatch(&engine, json!({ "action": "sync-content", "xmlContent": EXPORT })).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["dryRun"], true);
    assert_eq!(reply.body["moduleUpdatesQueued"], 1);
    assert_eq!(reply.body["lessonUpdatesQueued"], 1);
    assert_eq!(reply.body["unmatchedCourses"], json!(["Jazz Piano"]));
    assert_eq!(reply.body["sampleUpdates"][0]["target"], "module");
    assert_eq!(reply.body["sampleUpdates"][1]["field"], "video_url");
    assert_eq!(engine.store().writes(), 0);
}

#[tokio::test]
async fn test_sync_content_applies_only_when_dry_run_false() {
    let engine = engine();
    let reply = dispatch(
        &engine,
        json!({ "action": "sync-content", "xmlContent": EXPORT, "dryRun": false }),
    )
    .await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["dryRun"], false);
    assert_eq!(reply.body["modulesWritten"], 1);
    assert_eq!(reply.body["lessonsWritten"], 1);
    assert_eq!(engine.store().writes(), 2);
}

#[tokio::test]
async fn test_parse_xml_reply_shape() {
    let reply = dispatch(&engine(), json!({ "action": "parse-xml", "xmlContent": EXPORT })).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["totals"]["courses"], 2);
    assert_eq!(reply.body["courses"][0]["title"], "Blues Guitar");
    assert_eq!(reply.body["courses"][0]["modules"][0]["youtubeCount"], 1);
}

#[tokio::test]
async fn test_audit_reply_shape() {
    let reply = dispatch(&engine(), json!({ "action": "audit" })).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["emptyModuleCount"], 1);
    assert_eq!(reply.body["courses"][0]["courseTitle"], "Rock Rhythm");
}

#[tokio::test]
async fn test_store_failure_is_500() {
    let engine = SyncEngine::new(UnreachableStore, SyncSettings::default());

    let reply = dispatch(&engine, json!({ "action": "audit" })).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body["success"], false);
    assert!(reply.body["error"]
        .as_str()
        .unwrap()
        .contains("connection refused"));

    let reply = dispatch(
        &engine,
        json!({ "action": "sync-content", "xmlContent": EXPORT, "dryRun": true }),
    )
    .await;
    assert_eq!(reply.status, 500);
}

#[tokio::test]
async fn test_parse_xml_does_not_touch_store() {
    let engine = SyncEngine::new(UnreachableStore, SyncSettings::default());
    let reply = dispatch(&engine, json!({ "action": "parse-xml", "xmlContent": EXPORT })).await;
    assert_eq!(reply.status, 200);
}

#[tokio::test]
async fn test_bad_requests_are_400_without_store_access() {
    let engine = SyncEngine::new(UnreachableStore, SyncSettings::default());

    for body in [
        json!({}),
        json!({ "action": "sync" }),
        json!({ "action": "sync-content" }),
        json!({ "action": "parse-xml", "xmlContent": "" }),
        json!("audit"),
    ] {
        let reply = dispatch(&engine, body.clone()).await;
        assert_eq!(reply.status, 400, "body: {}", body);
        assert_eq!(reply.body["success"], false);
    }
}
