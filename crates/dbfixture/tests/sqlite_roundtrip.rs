//! End-to-end init/dump tests against an in-memory SQLite database.

use dbfixture::drivers::SqliteDatabase;
use dbfixture::{ErrorKind, Orchestrator, TableRows};

async fn setup(ddl: &[&str]) -> Orchestrator<SqliteDatabase> {
    let db = SqliteDatabase::connect("sqlite::memory:").await.unwrap();
    for stmt in ddl {
        sqlx::query(stmt).execute(db.pool()).await.unwrap();
    }
    Orchestrator::new(db)
}

fn fixture(json: &str) -> Vec<TableRows> {
    serde_json::from_str(json).unwrap()
}

async fn dump_json(orchestrator: &mut Orchestrator<SqliteDatabase>, tables: &[&str]) -> String {
    let names: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
    let dumped = orchestrator.dump(&names).await.unwrap();
    serde_json::to_string(&dumped).unwrap()
}

#[tokio::test]
async fn test_init_then_dump_round_trips() {
    let mut orchestrator =
        setup(&["CREATE TABLE t (a TEXT, b INTEGER, c REAL, d VARCHAR(255), e BOOLEAN)"]).await;

    let inserted = orchestrator
        .init(
            &fixture(r#"[{"name":"t","rows":[{"a":null,"b":1,"c":-123.45,"d":"x","e":true}]}]"#),
            false,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    assert_eq!(
        dump_json(&mut orchestrator, &["t"]).await,
        r#"{"t":[{"a":null,"b":1,"c":-123.45,"d":"x","e":true}]}"#
    );
}

#[tokio::test]
async fn test_missing_and_null_cells_dump_as_null() {
    let mut orchestrator =
        setup(&["CREATE TABLE t (id INTEGER PRIMARY KEY, b INTEGER, s TEXT)"]).await;

    orchestrator
        .init(
            &fixture(r#"[{"name":"t","rows":[{"id":1},{"id":2,"b":null,"s":null}]}]"#),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        dump_json(&mut orchestrator, &["t"]).await,
        r#"{"t":[{"b":null,"id":1,"s":null},{"b":null,"id":2,"s":null}]}"#
    );
}

#[tokio::test]
async fn test_dump_orders_by_primary_key() {
    let mut orchestrator = setup(&["CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)"]).await;

    orchestrator
        .init(
            &fixture(
                r#"[{"name":"t","rows":[{"id":3,"name":"c"},{"id":1,"name":"a"},{"id":2,"name":"b"}]}]"#,
            ),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        dump_json(&mut orchestrator, &["t"]).await,
        r#"{"t":[{"id":1,"name":"a"},{"id":2,"name":"b"},{"id":3,"name":"c"}]}"#
    );
}

#[tokio::test]
async fn test_composite_primary_key_order() {
    let mut orchestrator =
        setup(&["CREATE TABLE t (k2 INTEGER, k1 INTEGER, PRIMARY KEY (k1, k2))"]).await;

    orchestrator
        .init(
            &fixture(r#"[{"name":"t","rows":[{"k1":2,"k2":1},{"k1":1,"k2":2},{"k1":1,"k2":1}]}]"#),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        dump_json(&mut orchestrator, &["t"]).await,
        r#"{"t":[{"k1":1,"k2":1},{"k1":1,"k2":2},{"k1":2,"k2":1}]}"#
    );
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let mut orchestrator =
        setup(&["CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)"]).await;
    let rows = fixture(r#"[{"name":"t","rows":[{"name":"a"},{"name":"b"}]}]"#);

    orchestrator.init(&rows, false).await.unwrap();
    let first = dump_json(&mut orchestrator, &["t"]).await;
    orchestrator.init(&rows, false).await.unwrap();
    let second = dump_json(&mut orchestrator, &["t"]).await;

    // AUTOINCREMENT restarts because the sqlite_sequence entry is cleared
    assert_eq!(first, second);
    assert_eq!(first, r#"{"t":[{"id":1,"name":"a"},{"id":2,"name":"b"}]}"#);
}

#[tokio::test]
async fn test_timestamps_round_trip_as_rfc3339() {
    let mut orchestrator =
        setup(&["CREATE TABLE t (id INTEGER PRIMARY KEY, at TIMESTAMP, day DATE)"]).await;

    orchestrator
        .init(
            &fixture(
                r#"[{"name":"t","rows":[{"id":1,"at":"2024-01-02 03:04:05","day":"2024-01-02"},{"id":2,"at":"2024-01-02T03:04:05.250+02:00"}]}]"#,
            ),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        dump_json(&mut orchestrator, &["t"]).await,
        r#"{"t":[{"at":"2024-01-02T03:04:05Z","day":"2024-01-02T00:00:00Z","id":1},{"at":"2024-01-02T01:04:05.250Z","day":null,"id":2}]}"#
    );
}

#[tokio::test]
async fn test_bad_conversion_rolls_back_every_table() {
    let mut orchestrator = setup(&[
        "CREATE TABLE a (id INTEGER PRIMARY KEY)",
        "CREATE TABLE b (id INTEGER PRIMARY KEY, n INTEGER)",
    ])
    .await;
    orchestrator
        .init(&fixture(r#"[{"name":"a","rows":[{"id":7}]}]"#), false)
        .await
        .unwrap();

    let err = orchestrator
        .init(
            &fixture(r#"[{"name":"a","rows":[{"id":1}]},{"name":"b","rows":[{"id":1,"n":1.5}]}]"#),
            false,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadConversion);
    let tables: Vec<_> = err
        .context_pairs()
        .into_iter()
        .filter(|(key, _)| *key == "table")
        .collect();
    assert_eq!(tables, vec![("table", "b")]);

    assert_eq!(
        dump_json(&mut orchestrator, &["a", "b"]).await,
        r#"{"a":[{"id":7}],"b":[]}"#
    );
}

#[tokio::test]
async fn test_unknown_column_is_rejected() {
    let mut orchestrator = setup(&["CREATE TABLE t (id INTEGER PRIMARY KEY)"]).await;

    let err = orchestrator
        .init(&fixture(r#"[{"name":"t","rows":[{"id":1,"nope":2}]}]"#), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadKeyAccess);
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_missing_table_dumps_empty_and_init_skips() {
    let mut orchestrator = setup(&[]).await;

    let inserted = orchestrator
        .init(&fixture(r#"[{"name":"ghost","rows":[{"id":1}]}]"#), false)
        .await
        .unwrap();
    assert_eq!(inserted, 0);
    assert_eq!(dump_json(&mut orchestrator, &["ghost"]).await, r#"{"ghost":[]}"#);
}

#[tokio::test]
async fn test_sort_by_references_loads_parents_first() {
    let ddl = [
        "CREATE TABLE parent (id INTEGER PRIMARY KEY)",
        "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id))",
    ];
    let rows = r#"[
        {"name":"child","rows":[{"id":10,"parent_id":1}]},
        {"name":"parent","rows":[{"id":1}]}
    ]"#;

    let mut orchestrator = setup(&ddl).await;
    let err = orchestrator.init(&fixture(rows), false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DbFailure);

    let inserted = orchestrator.init(&fixture(rows), true).await.unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(
        dump_json(&mut orchestrator, &["parent", "child"]).await,
        r#"{"child":[{"id":10,"parent_id":1}],"parent":[{"id":1}]}"#
    );
}

#[tokio::test]
async fn test_rerunning_parent_then_child_fixture() {
    let mut orchestrator = setup(&[
        "CREATE TABLE parent (id INTEGER PRIMARY KEY)",
        "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id))",
    ])
    .await;
    let rows = fixture(
        r#"[{"name":"parent","rows":[{"id":1}]},{"name":"child","rows":[{"id":10,"parent_id":1}]}]"#,
    );

    for _ in 0..3 {
        assert_eq!(orchestrator.init(&rows, false).await.unwrap(), 2);
    }
    assert_eq!(
        dump_json(&mut orchestrator, &["parent", "child"]).await,
        r#"{"child":[{"id":10,"parent_id":1}],"parent":[{"id":1}]}"#
    );
}
