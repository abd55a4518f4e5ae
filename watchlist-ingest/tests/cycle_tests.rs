//! End-to-end cycle tests against an on-disk SQLite database

mod helpers;

use helpers::*;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use watchlist_common::config::{IngestSection, StagingScope, TomlConfig};
use watchlist_common::{CanonicalRecord, WatchType};
use watchlist_ingest::db::{SqliteCanonicalStore, SqliteOutboxNotifier, SqliteRunLog};
use watchlist_ingest::models::RunStatus;
use watchlist_ingest::services::normalizer::name_checksum;
use watchlist_ingest::types::CanonicalStore;

#[tokio::test]
async fn test_cyrillic_record_is_transliterated_and_staged() {
    let (dir, pool) = create_test_db().await;
    let sources = registry(vec![StaticSource::new(
        "RUN_TESTSRC_LIST",
        vec![person("Иванов Петр Сергеевич")],
    )]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());

    let report = controller.run_cycle().await.unwrap();
    assert_eq!(staging_count(&pool, &report.cycle_id).await, 1);

    let row = report
        .analytics
        .rows
        .iter()
        .find(|r| r.source == "TESTSRC")
        .unwrap();
    assert_eq!((row.old, row.new, row.total), (0, 1, 1));

    let id = format!("IVANOV-{}", name_checksum("IVANOV PETR SERGEEVICH").unwrap());
    let record = SqliteCanonicalStore::new(pool.clone())
        .get(&id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.full_name, "IVANOV PETR SERGEEVICH");
    assert_eq!(record.first_name.as_deref(), Some("IVANOV"));
    assert_eq!(record.middle_name.as_deref(), Some("PETR"));
    assert_eq!(record.surname.as_deref(), Some("SERGEEVICH"));
    assert_eq!(record.source, "TESTSRC");
    assert_eq!(record.operator, "BOT");
}

#[tokio::test]
async fn test_duplicate_names_insert_once() {
    let (dir, pool) = create_test_db().await;
    let sources = registry(vec![StaticSource::new(
        "RUN_UN_LIST",
        vec![person("John Smith"), person("John Smith")],
    )]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());

    let first = controller.run_cycle().await.unwrap();
    assert_eq!(first.batch.inserted, 1);
    assert_eq!(first.batch.duplicates, 1);
    assert_eq!(canonical_count(&pool).await, 1);

    let second = controller.run_cycle().await.unwrap();
    assert_eq!(second.batch.inserted, 0);
    assert_eq!(second.batch.duplicates, 2);
    assert_eq!(second.analytics.breakdown_total(), 0);
    assert_eq!(second.previous_records, 1);
    assert!(!second.email_sent);
    assert_eq!(canonical_count(&pool).await, 1);
}

#[tokio::test]
async fn test_streaming_source_is_processed_batch_by_batch() {
    let (dir, pool) = create_test_db().await;
    let sources = registry(vec![BatchedSource::new("RUN_STREAM_LIST", vec![5000, 5000, 2])]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());

    let report = controller.run_cycle().await.unwrap();

    assert_eq!(report.records_found, 10_002);
    let source = &report.sources[0];
    assert_eq!(source.batches, 3);
    assert_eq!(source.largest_batch, 5000);
    assert_eq!(source.streamed_new, 10_002);
    assert!(!source.failed());

    assert_eq!(report.batch.inserted, 10_002);
    assert_eq!(staging_count(&pool, &report.cycle_id).await, 10_002);
    assert_eq!(report.analytics.breakdown_total(), 10_002);
}

#[tokio::test]
async fn test_analytics_match_staging_and_canonical_counts() {
    let (dir, pool) = create_test_db().await;
    sqlx::query("INSERT INTO regulators (code, description) VALUES ('UN', 'United Nations')")
        .execute(&pool)
        .await
        .unwrap();

    let existing = CanonicalRecord {
        watchlist_id: "UN-1".to_string(),
        full_name: "Existing Person".to_string(),
        source: "UN".to_string(),
        language: "en".to_string(),
        operator: "BOT".to_string(),
        record_date: "2026-01-01".to_string(),
        record_time: "00:00:00".to_string(),
        ..Default::default()
    };
    SqliteCanonicalStore::new(pool.clone())
        .insert_if_absent(&existing)
        .await
        .unwrap();

    let sources = registry(vec![
        StaticSource::new(
            "RUN_UN_LIST",
            vec![person_with_id("UN-1", "Existing Person"), person_with_id("UN-2", "Fresh Name")],
        ),
        StaticSource::new("RUN_EU_LIST", vec![person("Maria Garcia")]),
    ]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());
    let report = controller.run_cycle().await.unwrap();

    assert_eq!(report.previous_records, 1);
    let rows = &report.analytics.rows;
    assert_eq!(rows.len(), 2);

    let eu = &rows[0];
    assert_eq!((eu.source.as_str(), eu.description.as_str()), ("EU", "EU"));
    assert_eq!((eu.old, eu.new, eu.total), (0, 1, 1));

    let un = &rows[1];
    assert_eq!(un.description, "United Nations");
    assert_eq!((un.old, un.new, un.total), (1, 1, 2));

    assert_eq!(
        report.analytics.breakdown_total(),
        staging_count(&pool, &report.cycle_id).await
    );
    assert_eq!(report.analytics.grand_total(), canonical_count(&pool).await);
}

#[tokio::test]
async fn test_entity_names_are_never_split() {
    let (dir, pool) = create_test_db().await;
    let sources = registry(vec![StaticSource::new(
        "RUN_OFAC_LIST",
        vec![person_with_id("OFAC-7", "Acme Holdings LLC")],
    )]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());
    controller.run_cycle().await.unwrap();

    let record = SqliteCanonicalStore::new(pool.clone())
        .get("OFAC-7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.full_name, "Acme Holdings LLC");
    assert_eq!(record.first_name, None);
    assert_eq!(record.surname, None);
    assert_eq!(record.watch_type, Some(WatchType::Entity));
}

#[tokio::test]
async fn test_failing_sources_do_not_stop_the_cycle() {
    let (dir, pool) = create_test_db().await;
    let sources = registry(vec![
        StaticSource::new("RUN_GOOD_LIST", vec![person("Good Record")]),
        BrokenSource::new("RUN_BROKEN_LIST"),
        PanickingSource::new("RUN_PANIC_LIST"),
        BatchedSource::failing_after("RUN_FLAKY_LIST", vec![3]),
    ]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());

    let report = controller.run_cycle().await.unwrap();

    let keys: Vec<&str> = report.sources.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["RUN_BROKEN_LIST", "RUN_FLAKY_LIST", "RUN_GOOD_LIST", "RUN_PANIC_LIST"]
    );
    let failed: Vec<&str> = report
        .sources
        .iter()
        .filter(|s| s.failed())
        .map(|s| s.key.as_str())
        .collect();
    assert_eq!(failed, vec!["RUN_BROKEN_LIST", "RUN_FLAKY_LIST", "RUN_PANIC_LIST"]);

    let flaky = &report.sources[1];
    assert_eq!(flaky.records, 3);
    assert_eq!(flaky.streamed_new, 3);

    assert_eq!(report.batch.inserted, 4);
    assert_eq!(canonical_count(&pool).await, 4);

    let runs = SqliteRunLog::new(pool.clone()).recent(5).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Success);
    assert!(runs[0].sources.contains("RUN_PANIC_LIST"));
}

#[tokio::test]
async fn test_family_fields_written_to_canonical_and_staging() {
    let (dir, pool) = create_test_db().await;
    sqlx::query(
        r#"
        INSERT INTO watchlist_family (person_id, relative_id, relationship) VALUES
            ('P1', 'P2', 'Spouse'),
            ('P1', 'P3', 'Child/Parent'),
            ('P3', 'P1', 'Parent/Child'),
            ('P3', 'P404', 'Sibling')
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let sources = registry(vec![StaticSource::new(
        "RUN_UN_LIST",
        vec![
            person_with_id("P1", "John Smith"),
            person_with_id("P2", "Jane Smith"),
            person_with_id("P3", "Tom Smith"),
        ],
    )]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());
    controller.run_cycle().await.unwrap();

    let store = SqliteCanonicalStore::new(pool.clone());
    let john = store.get("P1").await.unwrap().unwrap();
    assert_eq!(john.spouse.as_deref(), Some("Jane Smith"));
    assert_eq!(john.children.as_deref(), Some("Tom Smith"));
    assert_eq!(john.relative, None);

    let tom = store.get("P3").await.unwrap().unwrap();
    assert_eq!(tom.parents.as_deref(), Some("John Smith"));
    assert_eq!(tom.relative, None);

    let staged_spouse: Option<String> =
        sqlx::query_scalar("SELECT spouse FROM watchlist_staging WHERE watchlist_id = 'P1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(staged_spouse.as_deref(), Some("Jane Smith"));
}

#[tokio::test]
async fn test_single_cycle_run_logs_and_queues_notification() {
    let (dir, pool) = create_test_db().await;
    sqlx::query(
        "INSERT INTO subscribers (message_code, owner_flag, owner_email) VALUES ('WL_UPDATE', 'yes', 'owner@example.com')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let sources = registry(vec![StaticSource::new("RUN_UN_LIST", vec![person("Ali Hassan")])]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());
    controller.run(CancellationToken::new(), true).await.unwrap();

    let runs = SqliteRunLog::new(pool.clone()).recent(5).await.unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.sources, "RUN_UN_LIST");
    assert_eq!(run.records_processed, 1);
    assert_eq!(run.records_inserted, 1);
    assert_eq!(run.previous_records, 0);
    assert!(run.email_sent);
    assert_eq!(run.operator, "BOT");
    let breakdown = run.source_breakdown.as_ref().unwrap();
    assert_eq!(breakdown["UN"]["new_record"], 1);

    let pending = SqliteOutboxNotifier::new(pool.clone()).pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    let (code, recipients, payload) = &pending[0];
    assert_eq!(code, "WL_UPDATE");
    assert_eq!(recipients, &vec!["owner@example.com".to_string()]);
    assert_eq!(payload.breakdown_total, 1);
    assert_eq!(payload.cycle_id, run.cycle_id);
}

#[tokio::test]
async fn test_cancelled_controller_stops_after_current_cycle() {
    let (dir, pool) = create_test_db().await;
    let sources = registry(vec![StaticSource::new("RUN_UN_LIST", vec![person("Ali Hassan")])]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());

    let cancel = CancellationToken::new();
    cancel.cancel();
    controller.run(cancel, false).await.unwrap();

    let runs = SqliteRunLog::new(pool.clone()).recent(5).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(canonical_count(&pool).await, 1);
}

#[tokio::test]
async fn test_database_source_registry_selects_adapters() {
    let (dir, pool) = create_test_db().await;
    sqlx::query("INSERT INTO source_registry (key, enabled) VALUES ('run_un_list', 1), ('RUN_EU_LIST', 0)")
        .execute(&pool)
        .await
        .unwrap();

    let sources = registry(vec![
        StaticSource::new("RUN_UN_LIST", vec![person("Ali Hassan")]),
        StaticSource::new("RUN_EU_LIST", vec![person("Maria Garcia")]),
    ]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());
    let report = controller.run_cycle().await.unwrap();

    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].key, "RUN_UN_LIST");
    assert_eq!(canonical_count(&pool).await, 1);
}

#[tokio::test]
async fn test_staging_scope_controls_new_counts_across_cycles() {
    let run_two_cycles = |scope: StagingScope| async move {
        let (dir, pool) = create_test_db().await;
        let toml = TomlConfig {
            ingest: IngestSection {
                staging_scope: Some(scope),
                ..Default::default()
            },
            ..Default::default()
        };
        let sources = registry(vec![StaticSource::new("RUN_UN_LIST", vec![person("Ali Hassan")])]);
        let mut controller = create_controller(&dir, &pool, sources, toml);
        controller.run_cycle().await.unwrap();
        let second = controller.run_cycle().await.unwrap();
        let row = second.analytics.rows[0].clone();
        (row.old, row.new, row.total)
    };

    assert_eq!(run_two_cycles(StagingScope::Cycle).await, (1, 0, 1));
    assert_eq!(run_two_cycles(StagingScope::Process).await, (0, 1, 1));
}

#[tokio::test]
async fn test_totals_file_written_after_cycle() {
    let (dir, pool) = create_test_db().await;
    let toml = TomlConfig {
        ingest: IngestSection {
            totals_file: Some(PathBuf::from("reports/totals.txt")),
            ..Default::default()
        },
        ..Default::default()
    };
    let sources = registry(vec![StaticSource::new(
        "RUN_UN_LIST",
        vec![person("Ali Hassan"), person("Maria Garcia")],
    )]);
    let mut controller = create_controller(&dir, &pool, sources, toml);
    controller.run_cycle().await.unwrap();

    let totals = std::fs::read_to_string(dir.path().join("reports/totals.txt")).unwrap();
    assert_eq!(totals, "UN:2\n");
}

#[tokio::test]
async fn test_fatal_error_is_recorded_in_run_log() {
    let (dir, pool) = create_test_db().await;
    sqlx::query("DROP TABLE watchlist").execute(&pool).await.unwrap();

    let sources = registry(vec![StaticSource::new("RUN_UN_LIST", vec![person("Ali Hassan")])]);
    let mut controller = create_controller(&dir, &pool, sources, TomlConfig::default());

    let result = controller.run(CancellationToken::new(), false).await;
    assert!(result.is_err());

    let runs = SqliteRunLog::new(pool.clone()).recent(5).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Error);
    assert_eq!(runs[0].records_inserted, 0);
    assert!(runs[0].error_details.is_some());
    assert!(!runs[0].email_sent);
}

#[tokio::test]
async fn test_declared_file_sources_feed_the_cycle() {
    let (dir, pool) = create_test_db().await;
    std::fs::create_dir_all(dir.path().join("feeds")).unwrap();
    std::fs::write(
        dir.path().join("feeds/un.json"),
        r#"[{"name": "Ali Hassan", "ref": "UN-100"}, {"name": "Maria Garcia", "ref": "UN-101"}]"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("feeds/ofac.jsonl"),
        "{\"ricaFullName\": \"Acme Holdings LLC\"}\n\n{\"ricaFullName\": \"John Smith\"}\n",
    )
    .unwrap();

    let toml: TomlConfig = toml::from_str(
        r#"
        [[sources]]
        key = "RUN_UN_LIST"
        kind = "json"
        path = "feeds/un.json"
        field_map = { name = "ricaFullName", ref = "ricaWatchlistId" }

        [[sources]]
        key = "RUN_OFAC_LIST"
        kind = "jsonl"
        path = "feeds/ofac.jsonl"
        batch_size = 1
        "#,
    )
    .unwrap();
    let sources = watchlist_ingest::sources::SourceRegistry::from_declarations(&toml.sources, dir.path());
    let mut controller = create_controller(&dir, &pool, sources, toml);

    let report = controller.run_cycle().await.unwrap();
    assert_eq!(report.records_found, 4);
    assert_eq!(report.batch.inserted, 4);

    let ofac = &report.sources[0];
    assert_eq!(ofac.key, "RUN_OFAC_LIST");
    assert_eq!((ofac.batches, ofac.largest_batch), (2, 1));

    let store = SqliteCanonicalStore::new(pool.clone());
    let ali = store.get("UN-100").await.unwrap().unwrap();
    assert_eq!(ali.full_name, "Ali Hassan");
    assert_eq!(ali.source, "UN");
}

#[tokio::test]
async fn test_malformed_stream_line_does_not_drop_later_records() {
    let (dir, pool) = create_test_db().await;
    std::fs::write(
        dir.path().join("eu.jsonl"),
        concat!(
            "{\"ricaFullName\": \"Ana Lopez\"}\n",
            "{\"ricaFullName\": \"Bob Green\",\n",
            "{\"ricaFullName\": \"Carl Weber\"}\n",
            "{\"ricaFullName\": \"Dana Novak\"}\n",
        ),
    )
    .unwrap();

    let toml: TomlConfig = toml::from_str(
        r#"
        [[sources]]
        key = "RUN_EU_LIST"
        kind = "jsonl"
        path = "eu.jsonl"
        batch_size = 2
        "#,
    )
    .unwrap();
    let sources = watchlist_ingest::sources::SourceRegistry::from_declarations(&toml.sources, dir.path());
    let mut controller = create_controller(&dir, &pool, sources, toml);

    let report = controller.run_cycle().await.unwrap();
    let eu = &report.sources[0];
    assert!(!eu.failed());
    assert_eq!(eu.records, 3);
    assert_eq!(eu.streamed_new, 3);
    assert_eq!(canonical_count(&pool).await, 3);
}
