use crate::modules::attendance_sync::adapters::outbound::in_memory_attendance_source::InMemoryAttendanceSource;
use crate::modules::attendance_sync::adapters::outbound::in_memory_board::InMemoryBoard;
use crate::modules::attendance_sync::adapters::outbound::in_memory_identity_store::InMemoryIdentityStore;
use crate::modules::attendance_sync::adapters::outbound::json_file_identity_store::JsonFileIdentityStore;
use crate::modules::attendance_sync::core::attendance::FALLBACK_DISPLAY_NAME;
use crate::modules::attendance_sync::core::board_columns::BoardColumns;
use crate::modules::attendance_sync::core::fingerprint::Fingerprint;
use crate::modules::attendance_sync::core::identity::{IdentityMapping, IdentityTable};
use crate::modules::attendance_sync::core::ports::{BoardError, IdentityStore};
use crate::modules::attendance_sync::core::projection::FieldValue;
use crate::modules::attendance_sync::use_cases::project_record::project::ProjectionError;
use crate::modules::attendance_sync::use_cases::reconcile_record::handler::ReconcileError;
use crate::modules::attendance_sync::use_cases::run_batch::handler::BatchRunner;
use crate::modules::attendance_sync::use_cases::run_batch::report::RecordError;
use crate::tests::fixtures::records::{UpstreamRecordBuilder, make_employee_profile};
use rstest::{fixture, rstest};
use std::sync::Arc;

const BOARD_ID: &str = "1234567890";
const DURATION_COLUMN: &str = "numeric_mkzm4ydj";

type Runner<TStore> = BatchRunner<InMemoryAttendanceSource, InMemoryBoard, TStore>;

#[fixture]
async fn source() -> Arc<InMemoryAttendanceSource> {
    let source = InMemoryAttendanceSource::new();
    source.add_employee(make_employee_profile()).await;
    Arc::new(source)
}

fn runner<TStore: IdentityStore + 'static>(
    source: Arc<InMemoryAttendanceSource>,
    board: Arc<InMemoryBoard>,
    store: Arc<TStore>,
) -> Runner<TStore> {
    BatchRunner::new(source, board, store, BOARD_ID, BoardColumns::default())
}

fn duration_of(fields: &[(String, FieldValue)]) -> Option<String> {
    fields
        .iter()
        .find(|(key, _)| key == DURATION_COLUMN)
        .map(|(_, value)| value.canonical())
}

#[rstest]
#[tokio::test]
async fn it_should_create_each_attendance_once_and_leave_unchanged_ones_alone(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let board = Arc::new(InMemoryBoard::new());
    let store = Arc::new(InMemoryIdentityStore::new());
    let runner = runner(source.await, board.clone(), store.clone());
    let records = vec![
        UpstreamRecordBuilder::new().id_v2(Some("a")).build(),
        UpstreamRecordBuilder::new().id_v2(Some("b")).build(),
    ];

    let first = runner.run_once(records.clone()).await.expect("first run failed");
    let second = runner.run_once(records).await.expect("second run failed");

    assert_eq!((first.created, first.updated, first.unchanged), (2, 0, 0));
    assert_eq!((second.created, second.updated, second.unchanged), (0, 0, 2));
    assert_eq!(board.create_count().await, 2);
    assert_eq!(board.update_count().await, 0);
    assert_eq!(board.item("9001").await.unwrap().name, "Ada Lovelace");
    assert_eq!(board.item("9001").await.unwrap().board_id, BOARD_ID);
}

#[rstest]
#[tokio::test]
async fn it_should_update_the_item_when_an_attendance_changes(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let board = Arc::new(InMemoryBoard::new());
    let runner = runner(source.await, board.clone(), Arc::new(InMemoryIdentityStore::new()));
    let original = UpstreamRecordBuilder::new().end_time(Some("17:30")).build();
    let amended = UpstreamRecordBuilder::new().end_time(Some("18:00")).build();

    runner.run_once(vec![original]).await.expect("run failed");
    let changed = runner.run_once(vec![amended.clone()]).await.expect("run failed");
    let settled = runner.run_once(vec![amended]).await.expect("run failed");

    assert_eq!(changed.updated, 1);
    assert_eq!(settled.unchanged, 1);
    assert_eq!(board.item_count().await, 1);
    assert_eq!(board.update_count().await, 1);
    let item = board.item("9001").await.unwrap();
    assert_eq!(duration_of(&item.fields).as_deref(), Some("numeric:9.00"));
}

#[rstest]
#[tokio::test]
async fn it_should_isolate_failures_to_the_affected_records(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let mut board = InMemoryBoard::new();
    board.reject_reference("bad");
    let board = Arc::new(board);
    let store = Arc::new(InMemoryIdentityStore::new());
    let runner = runner(source.await, board.clone(), store.clone());
    let records = vec![
        UpstreamRecordBuilder::new().id_v2(Some("a")).build(),
        UpstreamRecordBuilder::new().id_v2(Some("bad")).build(),
        UpstreamRecordBuilder::new().id("77").id_v2(None).date("10/01/2024").build(),
        UpstreamRecordBuilder::new().id_v2(Some("c")).build(),
    ];

    let report = runner.run_once(records).await.expect("run failed");

    assert_eq!(report.processed, 4);
    assert_eq!(report.created, 2);
    let failed: Vec<&str> = report
        .failed
        .iter()
        .map(|f| f.external_reference.as_str())
        .collect();
    assert_eq!(failed, vec!["bad", "77"]);
    assert!(matches!(
        report.failed[0].error,
        RecordError::Reconcile(ReconcileError::Create(BoardError::Rejected(_)))
    ));
    assert_eq!(
        report.failed[1].error,
        RecordError::Projection(ProjectionError::InvalidDate {
            external_reference: "77".into(),
            value: "10/01/2024".into(),
        })
    );

    let saved = store.saved().await.expect("table should be saved");
    assert_eq!(saved.len(), 2);
    assert!(saved.get("bad").is_none());
}

#[rstest]
#[tokio::test]
async fn it_should_not_update_an_item_while_its_employee_is_unavailable(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let source = source.await;
    let board = Arc::new(InMemoryBoard::new());
    let columns = BoardColumns {
        email: Some("email_col".into()),
        ..BoardColumns::default()
    };
    let runner = BatchRunner::new(
        source.clone(),
        board.clone(),
        Arc::new(InMemoryIdentityStore::new()),
        BOARD_ID,
        columns,
    );
    let record = UpstreamRecordBuilder::new().build();

    let first = runner.run_once(vec![record.clone()]).await.expect("run failed");
    source.toggle_employees_offline();
    let second = runner.run_once(vec![record.clone()]).await.expect("run failed");
    source.toggle_employees_offline();
    let third = runner.run_once(vec![record]).await.expect("run failed");

    assert_eq!(first.created, 1);
    assert_eq!((second.updated, second.unchanged), (0, 1));
    assert_eq!((third.updated, third.unchanged), (0, 1));
    assert_eq!(board.update_count().await, 0);
    let item = board.item("9001").await.unwrap();
    assert!(item.fields.contains(&(
        "email_col".to_string(),
        FieldValue::Text("ada@example.com".into())
    )));
}

#[rstest]
#[tokio::test]
async fn it_should_create_an_item_while_its_employee_is_unavailable(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let source = source.await;
    let board = Arc::new(InMemoryBoard::new());
    let columns = BoardColumns {
        email: Some("email_col".into()),
        ..BoardColumns::default()
    };
    let runner = BatchRunner::new(
        source.clone(),
        board.clone(),
        Arc::new(InMemoryIdentityStore::new()),
        BOARD_ID,
        columns,
    );
    source.toggle_employees_offline();

    let report = runner
        .run_once(vec![UpstreamRecordBuilder::new().build()])
        .await
        .expect("run failed");

    assert_eq!(report.created, 1);
    assert_eq!(board.item("9001").await.unwrap().name, FALLBACK_DISPLAY_NAME);
}

#[rstest]
#[tokio::test]
async fn it_should_save_the_table_once_per_run_and_only_after_changes(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let store = Arc::new(InMemoryIdentityStore::new());
    let runner = runner(source.await, Arc::new(InMemoryBoard::new()), store.clone());
    let records: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|r| UpstreamRecordBuilder::new().id_v2(Some(r)).build())
        .collect();

    runner.run_once(records.clone()).await.expect("run failed");
    assert_eq!(store.save_count(), 1);

    runner.run_once(records).await.expect("run failed");
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.saved().await.unwrap().len(), 3);
}

#[rstest]
#[tokio::test]
async fn it_should_keep_the_in_memory_table_when_saving_fails(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let mut store = InMemoryIdentityStore::new();
    store.toggle_save_offline();
    let store = Arc::new(store);
    let board = Arc::new(InMemoryBoard::new());
    let runner = runner(source.await, board.clone(), store.clone());
    let records = vec![UpstreamRecordBuilder::new().build()];

    let first = runner.run_once(records.clone()).await.expect("a failed save must not fail the run");
    let second = runner.run_once(records).await.expect("run failed");

    assert_eq!(first.created, 1);
    assert_eq!(second.unchanged, 1);
    assert_eq!(board.create_count().await, 1);
    assert_eq!(store.saved().await, None);
}

#[rstest]
#[tokio::test]
async fn it_should_leave_the_mapping_alone_when_an_update_fails(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let stale = IdentityMapping {
        downstream_id: "555".into(),
        fingerprint: Fingerprint::from("stale".to_string()),
    };
    let mut table = IdentityTable::new();
    table.insert("a", stale);
    let store = Arc::new(InMemoryIdentityStore::with_table(table));
    let board = Arc::new(InMemoryBoard::new());
    let runner = runner(source.await, board.clone(), store.clone());

    let report = runner
        .run_once(vec![UpstreamRecordBuilder::new().id_v2(Some("a")).build()])
        .await
        .expect("run failed");

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        &report.failed[0].error,
        RecordError::Reconcile(ReconcileError::Update { downstream_id, .. }) if downstream_id == "555"
    ));
    assert_eq!(board.create_count().await, 0);
    assert_eq!(store.save_count(), 0);
}

#[rstest]
#[tokio::test]
async fn it_should_not_record_a_mapping_when_the_board_returns_no_id(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let mut board = InMemoryBoard::new();
    board.toggle_omit_identifier();
    let store = Arc::new(InMemoryIdentityStore::new());
    let runner = runner(source.await, Arc::new(board), store.clone());

    let report = runner
        .run_once(vec![UpstreamRecordBuilder::new().build()])
        .await
        .expect("run failed");

    assert_eq!(
        report.failed[0].error,
        RecordError::Reconcile(ReconcileError::Create(BoardError::MissingIdentifier))
    );
    assert_eq!(store.saved().await, None);
}

#[rstest]
#[tokio::test]
async fn it_should_create_then_update_for_a_reference_repeated_in_one_batch(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let board = Arc::new(InMemoryBoard::new());
    let runner = runner(source.await, board.clone(), Arc::new(InMemoryIdentityStore::new()));
    let records = vec![
        UpstreamRecordBuilder::new().id_v2(Some("a")).end_time(Some("17:30")).build(),
        UpstreamRecordBuilder::new().id_v2(Some("a")).end_time(Some("18:00")).build(),
    ];

    let report = runner.run_once(records).await.expect("run failed");

    assert_eq!((report.created, report.updated), (1, 1));
    assert_eq!(board.item_count().await, 1);
    let item = board.item("9001").await.unwrap();
    assert_eq!(duration_of(&item.fields).as_deref(), Some("numeric:9.00"));
}

#[rstest]
#[case(1)]
#[case(4)]
#[tokio::test]
async fn it_should_reach_the_same_result_at_any_concurrency(
    #[future] source: Arc<InMemoryAttendanceSource>,
    #[case] concurrency: usize,
) {
    let mut board = InMemoryBoard::new();
    board.reject_reference("r3");
    board.reject_reference("r7");
    let board = Arc::new(board);
    let store = Arc::new(InMemoryIdentityStore::new());
    let runner = runner(source.await, board.clone(), store.clone()).with_concurrency(concurrency);
    let mut records: Vec<_> = (0..10)
        .map(|i| UpstreamRecordBuilder::new().id_v2(Some(format!("r{i}").as_str())).build())
        .collect();
    records.push(
        UpstreamRecordBuilder::new()
            .id_v2(Some("r0"))
            .end_time(Some("18:00"))
            .build(),
    );

    let report = runner.run_once(records).await.expect("run failed");

    assert_eq!(report.processed, 11);
    assert_eq!((report.created, report.updated), (8, 1));
    let failed: Vec<&str> = report
        .failed
        .iter()
        .map(|f| f.external_reference.as_str())
        .collect();
    assert_eq!(failed, vec!["r3", "r7"]);
    assert_eq!(board.item_count().await, 8);
    assert_eq!(store.saved().await.unwrap().len(), 8);
}

#[rstest]
#[tokio::test]
async fn it_should_not_duplicate_items_after_a_restart(
    #[future] source: Arc<InMemoryAttendanceSource>,
) {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("identity_store.json");
    let source = source.await;
    let board = Arc::new(InMemoryBoard::new());
    let records = vec![UpstreamRecordBuilder::new().build()];

    let before = runner(
        source.clone(),
        board.clone(),
        Arc::new(JsonFileIdentityStore::new(&path)),
    );
    let first = before.run_once(records.clone()).await.expect("run failed");
    drop(before);

    let after = runner(source, board.clone(), Arc::new(JsonFileIdentityStore::new(&path)));
    let second = after.run_once(records).await.expect("run failed");

    assert_eq!(first.created, 1);
    assert_eq!(second.unchanged, 1);
    assert_eq!(board.create_count().await, 1);
}
