//! Tests for engine module

use super::*;
use crate::catalog;
use crate::output::MemorySink;
use crate::testing::FakeApi;
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use serde_json::json;

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn settings() -> SyncSettings {
    SyncSettings::new(day(2016, 6, 2)).with_end_date(day(2016, 6, 6))
}

/// Two advertisables; every other endpoint echoes its query back as a record
fn fake_api() -> Arc<FakeApi> {
    Arc::new(FakeApi::new(|endpoint, params| match endpoint {
        "organization/get_advertisables" => Ok(json!({
            "results": [{"eid": "ADV1", "name": "one"}, {"eid": "ADV2", "name": "two"}]
        })),
        _ => Ok(json!({
            "results": [{
                "eid": format!("{}-{}",
                    params.get("advertisable").map_or("none", String::as_str),
                    params.get("start_date").map_or("all", String::as_str)),
            }]
        })),
    }))
}

fn engine(api: &Arc<FakeApi>) -> SyncEngine {
    let client: Arc<dyn ApiClient> = api.clone();
    SyncEngine::new(client, CheckpointManager::in_memory(), settings()).with_now(day(2026, 10, 17))
}

// ============================================================================
// SyncStats Tests
// ============================================================================

#[test]
fn test_sync_stats() {
    let mut stats = SyncStats::new();
    stats.add_records(3);
    stats.add_request();
    stats.add_stream();
    stats.add_window();
    stats.set_duration(12);

    assert_eq!(
        stats,
        SyncStats {
            records_synced: 3,
            requests_made: 1,
            streams_synced: 1,
            windows_synced: 1,
            duration_ms: 12,
        }
    );
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_report_params() {
    let params = report_params("ADV1", &DateWindow::day(day(2016, 6, 2)));
    let expected: QueryParams = [
        ("advertisable", "ADV1"),
        ("start_date", "2016-06-02"),
        ("end_date", "2016-06-02"),
        ("data_format", "entity"),
        ("breakdowns", "ad"),
        ("currency", "USD"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(params, expected);
}

#[test]
fn test_extract_results() {
    assert_eq!(
        extract_results("x", json!({"results": [{"eid": 1}]})).unwrap(),
        vec![json!({"eid": 1})]
    );
    assert_eq!(
        extract_results("x", json!({"results": {"eid": 1}})).unwrap(),
        vec![json!({"eid": 1})]
    );
    assert!(extract_results("x", json!({"results": null})).unwrap().is_empty());
    assert!(matches!(
        extract_results("x", json!({"data": []})),
        Err(Error::Decode { .. })
    ));
    assert!(matches!(
        extract_results("x", json!([1, 2])),
        Err(Error::Decode { .. })
    ));
}

// ============================================================================
// Direct Stream Tests
// ============================================================================

#[tokio::test]
async fn test_direct_stream_single_request() {
    let api = fake_api();
    let mut engine = engine(&api);
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("advertisables").unwrap(), &mut sink)
        .await
        .unwrap();

    assert_eq!(api.calls().len(), 1);
    assert!(api.calls()[0].params.is_empty());
    assert_eq!(
        sink.records("advertisables"),
        vec![
            &json!({"eid": "ADV1", "name": "one"}),
            &json!({"eid": "ADV2", "name": "two"})
        ]
    );
    assert!(sink.states().is_empty());
}

// ============================================================================
// Fan-out Stream Tests
// ============================================================================

#[tokio::test]
async fn test_fan_out_issues_one_request_per_advertisable() {
    let api = fake_api();
    let mut engine = engine(&api);
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("campaigns").unwrap(), &mut sink)
        .await
        .unwrap();

    let calls = api.calls_to("advertisable/get_campaigns");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].param("advertisable"), Some("ADV1"));
    assert_eq!(calls[1].param("advertisable"), Some("ADV2"));
    assert_eq!(
        sink.records("campaigns"),
        vec![&json!({"eid": "ADV1-all"}), &json!({"eid": "ADV2-all"})]
    );
    // Full-table streams never checkpoint
    assert!(sink.states().is_empty());
}

#[tokio::test]
async fn test_advertisables_resolved_once_per_run() {
    let api = fake_api();
    let mut engine = engine(&api);
    let mut sink = MemorySink::new();

    let streams = catalog::select(Some("ads,ad_groups,segments")).unwrap();
    let stats = engine.sync_all(&streams, &mut sink).await.unwrap();

    assert_eq!(api.calls_to("organization/get_advertisables").len(), 1);
    assert_eq!(api.calls().len(), 7);
    assert_eq!(stats.requests_made, 7);
    assert_eq!(stats.streams_synced, 3);
    assert_eq!(stats.records_synced, 6);
}

#[tokio::test]
async fn test_empty_results_emit_nothing() {
    let api = Arc::new(FakeApi::new(|endpoint, _| match endpoint {
        "organization/get_advertisables" => Ok(json!({"results": [{"eid": "ADV1"}]})),
        _ => Ok(json!({"results": []})),
    }));
    let client: Arc<dyn ApiClient> = api.clone();
    let mut engine = SyncEngine::new(client, CheckpointManager::in_memory(), settings());
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("ads").unwrap(), &mut sink)
        .await
        .unwrap();
    assert!(sink.messages().is_empty());
}

// ============================================================================
// Windowed Stream Tests
// ============================================================================

#[tokio::test]
async fn test_windowed_requests_and_ordering() {
    let api = fake_api();
    let mut engine = engine(&api);
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("ad_reports").unwrap(), &mut sink)
        .await
        .unwrap();

    // N advertisables x W windows
    let calls = api.calls_to("report/ad");
    assert_eq!(calls.len(), 2 * 4);
    assert!(calls.iter().all(|c| c.api == crate::http::ApiFamily::Reporting));

    let order: Vec<(&str, &str)> = calls
        .iter()
        .map(|c| (c.param("start_date").unwrap(), c.param("advertisable").unwrap()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("2016-06-02", "ADV1"),
            ("2016-06-02", "ADV2"),
            ("2016-06-03", "ADV1"),
            ("2016-06-03", "ADV2"),
            ("2016-06-04", "ADV1"),
            ("2016-06-04", "ADV2"),
            ("2016-06-05", "ADV1"),
            ("2016-06-05", "ADV2"),
        ]
    );

    assert_eq!(
        engine.checkpoints().state().get_bookmark("ad_reports", "date"),
        Some("2016-06-05T00:00:00.000000Z")
    );
    assert_eq!(engine.stats().windows_synced, 4);
}

#[tokio::test]
async fn test_state_follows_each_window_records() {
    let api = fake_api();
    let mut engine = engine(&api);
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("ad_reports").unwrap(), &mut sink)
        .await
        .unwrap();

    // record, record, state per window
    let shape: String = sink
        .messages()
        .iter()
        .map(|m| if m.is_record() { 'R' } else { 'S' })
        .collect();
    assert_eq!(shape, "RRSRRSRRSRRS");

    let bookmarks: Vec<&str> = sink
        .states()
        .iter()
        .map(|s| s.get_bookmark("ad_reports", "date").unwrap())
        .collect();
    assert_eq!(
        bookmarks,
        vec![
            "2016-06-02T00:00:00.000000Z",
            "2016-06-03T00:00:00.000000Z",
            "2016-06-04T00:00:00.000000Z",
            "2016-06-05T00:00:00.000000Z",
        ]
    );
}

#[tokio::test]
async fn test_report_records_are_stamped_with_window_start() {
    let api = Arc::new(FakeApi::new(|endpoint, _| match endpoint {
        "organization/get_advertisables" => Ok(json!({"results": [{"eid": "ADV1"}]})),
        _ => Ok(json!({"results": [{"eid": "AD9", "impressions": 10, "date": "ignored"}]})),
    }));
    let client: Arc<dyn ApiClient> = api.clone();
    let mut engine = SyncEngine::new(
        client,
        CheckpointManager::in_memory(),
        SyncSettings::new(day(2016, 6, 2)).with_end_date(day(2016, 6, 3)),
    );
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("ad_reports").unwrap(), &mut sink)
        .await
        .unwrap();

    assert_eq!(
        sink.records("ad_reports"),
        vec![&json!({"eid": "AD9", "impressions": 10, "date": "2016-06-02T00:00:00.000000Z"})]
    );
}

#[tokio::test]
async fn test_resume_from_bookmark_skips_committed_windows() {
    let api = fake_api();
    let client: Arc<dyn ApiClient> = api.clone();
    let checkpoints = CheckpointManager::from_json(
        &json!({"bookmarks": {"ad_reports": {"date": "2016-06-04T00:00:00Z"}}}).to_string(),
    )
    .unwrap();
    let mut engine =
        SyncEngine::new(client, checkpoints, settings()).with_now(day(2026, 10, 17));
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("ad_reports").unwrap(), &mut sink)
        .await
        .unwrap();

    let starts: Vec<String> = api
        .calls_to("report/ad")
        .iter()
        .map(|c| c.param("start_date").unwrap().to_string())
        .collect();
    assert_eq!(
        starts,
        vec!["2016-06-04", "2016-06-04", "2016-06-05", "2016-06-05"]
    );
    assert!(sink
        .records("ad_reports")
        .iter()
        .all(|r| r["date"] != "2016-06-02T00:00:00.000000Z" && r["date"] != "2016-06-03T00:00:00.000000Z"));
}

#[tokio::test]
async fn test_degenerate_range_fetches_nothing() {
    let api = fake_api();
    let client: Arc<dyn ApiClient> = api.clone();
    let settings = SyncSettings::new(day(2016, 6, 6))
        .with_end_date(day(2016, 6, 2))
        .with_lookback_days(0);
    let mut engine = SyncEngine::new(client, CheckpointManager::in_memory(), settings)
        .with_now(day(2026, 10, 17));
    let mut sink = MemorySink::new();

    engine
        .sync_stream(catalog::get("ad_reports").unwrap(), &mut sink)
        .await
        .unwrap();

    assert!(api.calls().is_empty());
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_failure_aborts_without_committing_the_window() {
    // Second advertisable fails on the third day
    let api = Arc::new(FakeApi::new(|endpoint, params| match endpoint {
        "organization/get_advertisables" => {
            Ok(json!({"results": [{"eid": "ADV1"}, {"eid": "ADV2"}]}))
        }
        _ if params.get("start_date").map(String::as_str) == Some("2016-06-04")
            && params.get("advertisable").map(String::as_str) == Some("ADV2") =>
        {
            Err(Error::http_status(500, endpoint, "boom"))
        }
        _ => Ok(json!({"results": [{"eid": "AD"}]})),
    }));
    let client: Arc<dyn ApiClient> = api.clone();
    let mut engine = SyncEngine::new(client, CheckpointManager::in_memory(), settings())
        .with_now(day(2026, 10, 17));
    let mut sink = MemorySink::new();

    let err = engine
        .sync_all(&catalog::select(Some("ad_reports")).unwrap(), &mut sink)
        .await
        .unwrap_err();

    match &err {
        Error::Sync {
            stream,
            context,
            source,
        } => {
            assert_eq!(stream, "ad_reports");
            assert!(context.contains("ADV2"), "{context}");
            assert!(context.contains("2016-06-04"), "{context}");
            assert!(context.contains("report/ad"), "{context}");
            assert!(matches!(**source, Error::HttpStatus { status: 500, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Last committed window is the one before the failure
    assert_eq!(
        engine.checkpoints().state().get_bookmark("ad_reports", "date"),
        Some("2016-06-03T00:00:00.000000Z")
    );
    assert_eq!(sink.states().len(), 2);
    // The failing window's first advertisable was emitted, no state followed it
    assert!(sink.messages().last().unwrap().is_record());
    // Nothing after the failing request
    assert_eq!(api.calls_to("report/ad").len(), 6);
}

#[tokio::test]
async fn test_non_object_report_row_aborts_before_commit() {
    let api = Arc::new(FakeApi::new(|endpoint, _| match endpoint {
        "organization/get_advertisables" => Ok(json!({"results": [{"eid": "ADV1"}]})),
        _ => Ok(json!({"results": ["row"]})),
    }));
    let client: Arc<dyn ApiClient> = api.clone();
    let mut engine = SyncEngine::new(client, CheckpointManager::in_memory(), settings())
        .with_now(day(2026, 10, 17));
    let mut sink = MemorySink::new();

    let err = engine
        .sync_all(&catalog::select(Some("ad_reports")).unwrap(), &mut sink)
        .await
        .unwrap_err();

    match &err {
        Error::Sync { context, source, .. } => {
            assert!(context.contains("2016-06-02"), "{context}");
            assert!(matches!(**source, Error::Decode { ref endpoint, .. } if endpoint == "report/ad"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(sink.messages().is_empty());
    assert_eq!(engine.checkpoints().state().get_bookmark("ad_reports", "date"), None);
}

#[tokio::test]
async fn test_commit_failure_names_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoints = CheckpointManager::from_file(dir.path().join("missing").join("state.json")).unwrap();
    let api = fake_api();
    let client: Arc<dyn ApiClient> = api.clone();
    let mut engine = SyncEngine::new(client, checkpoints, settings()).with_now(day(2026, 10, 17));
    let mut sink = MemorySink::new();

    let err = engine
        .sync_all(&catalog::select(Some("ad_reports")).unwrap(), &mut sink)
        .await
        .unwrap_err();

    match &err {
        Error::Sync {
            stream,
            context,
            source,
        } => {
            assert_eq!(stream, "ad_reports");
            assert_eq!(context, "committing window [2016-06-02, 2016-06-03)");
            assert!(matches!(**source, Error::State { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(sink.states().is_empty());
}

#[tokio::test]
async fn test_resolver_failure_is_wrapped() {
    let api = Arc::new(FakeApi::new(|endpoint, _| {
        Err(Error::http_status(503, endpoint, "unavailable"))
    }));
    let client: Arc<dyn ApiClient> = api.clone();
    let mut engine = SyncEngine::new(client, CheckpointManager::in_memory(), settings())
        .with_now(day(2026, 10, 17));
    let mut sink = MemorySink::new();

    let err = engine
        .sync_stream(catalog::get("ads").unwrap(), &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Sync { ref stream, .. } if stream == "ads"));
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_rerun_commits_same_bookmark() {
    let api = fake_api();
    let mut first = engine(&api);
    let mut sink = MemorySink::new();
    first
        .sync_stream(catalog::get("ad_reports").unwrap(), &mut sink)
        .await
        .unwrap();

    let saved = serde_json::to_string(first.checkpoints().state()).unwrap();
    let client: Arc<dyn ApiClient> = api.clone();
    let mut second = SyncEngine::new(
        client,
        CheckpointManager::from_json(&saved).unwrap(),
        settings(),
    )
    .with_now(day(2026, 10, 17));
    second
        .sync_stream(catalog::get("ad_reports").unwrap(), &mut sink)
        .await
        .unwrap();

    assert_eq!(
        second.checkpoints().state(),
        first.checkpoints().state()
    );
}
