use std::fs;

use healthview_core::{FetchError, ViewConfig, ViewState, ViewSynchronizer};
use healthview_feed::parse_history_str;
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("Không đọc được dữ liệu mẫu")
}

#[test]
fn history_table_matches_golden() {
    let samples = parse_history_str(&read_fixture("history.json")).expect("Không đọc được lịch sử");

    let mut sync = ViewSynchronizer::with_models(ViewConfig::default());
    sync.begin_load().expect("Không bắt đầu tải được");
    sync.complete_load(Ok(samples)).expect("Không hoàn tất tải được");

    let actual = serde_json::to_value(sync.table()).expect("Không serialize bảng");
    let expected: Value =
        serde_json::from_str(&read_fixture("history_table.json")).expect("Golden không hợp lệ");

    assert_eq!(actual, expected);
    assert_eq!(sync.chart().len(), 3);
    let bounds = sync.chart().y_bounds().expect("Thiếu giới hạn trục");
    assert_eq!((bounds.min, bounds.max), (60.0, 122.5));
}

#[test]
fn missing_health_data_fails_whole_load() {
    let err = parse_history_str(&read_fixture("history_missing_health.json")).unwrap_err();
    assert_eq!(err, FetchError::MissingHealthData { index: 1 });

    let mut sync = ViewSynchronizer::with_models(ViewConfig::default());
    sync.begin_load().expect("Không bắt đầu tải được");
    sync.complete_load(Err(err.clone())).expect("Không hoàn tất tải được");

    assert_eq!(sync.state(), &ViewState::Failed(err));
    assert!(sync.dataset().is_empty());
    assert!(sync.table().is_empty());
}

#[test]
fn non_array_body_is_a_parse_error() {
    assert!(matches!(
        parse_history_str(r#"{"DateTime": "2024-01-01T10:00:00Z"}"#),
        Err(FetchError::Parse(_))
    ));
    assert!(matches!(parse_history_str("<html>"), Err(FetchError::Parse(_))));
}

#[test]
fn unreadable_timestamp_is_a_parse_error() {
    let body = r#"[{"DateTime": "not a date", "HealthData": {"HeartRate": 1, "OxygenLevel": 2,
        "AccelerometerData": {"Ax": 0, "Ay": 0, "Az": 0}}}]"#;
    match parse_history_str(body) {
        Err(FetchError::Parse(message)) => assert!(message.contains("record 0")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn empty_history_is_ready_and_empty() {
    let samples = parse_history_str("[]").expect("Không đọc được lịch sử");
    let mut sync = ViewSynchronizer::with_models(ViewConfig::default());
    sync.begin_load().expect("Không bắt đầu tải được");
    sync.complete_load(Ok(samples)).expect("Không hoàn tất tải được");

    assert_eq!(sync.state(), &ViewState::Ready);
    assert!(sync.chart().y_bounds().is_none());
}
