mod common;

use nawth::config::DatabaseConfig;
use nawth::db::{
    Backend, DocumentBackend, MIGRATIONS, Migration, MigrationRunner, SqliteBackend,
};

async fn sqlite_backend(tag: &str) -> (SqliteBackend, std::path::PathBuf) {
    let path = common::temp_path(tag, "sqlite");
    let cfg = DatabaseConfig::sqlite(format!("sqlite:{}", path.display()));
    (SqliteBackend::connect(&cfg).await.unwrap(), path)
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (sqlite, path) = sqlite_backend("idempotent").await;
    let document = DocumentBackend::in_memory();
    let backends: [&dyn Backend; 2] = [&sqlite, &document];

    for backend in backends {
        let runner = MigrationRunner::new(backend);
        let first = runner.run(MIGRATIONS).await;
        assert!(first.is_clean(), "{}: {:?}", backend.name(), first.failed);
        assert_eq!(first.applied.len(), MIGRATIONS.len());
        assert!(first.skipped.is_empty());

        let second = runner.run(MIGRATIONS).await;
        assert!(second.is_clean());
        assert!(second.applied.is_empty());
        assert_eq!(second.skipped.len(), MIGRATIONS.len());

        let applied = runner.applied().await.unwrap();
        let expected: Vec<String> = MIGRATIONS.iter().map(|m| m.name.to_string()).collect();
        assert_eq!(applied, expected, "{}", backend.name());
    }

    sqlite.close().await;
    common::remove_sqlite_files(&path).await;
}

#[tokio::test]
async fn duplicate_names_run_once() {
    let document = DocumentBackend::in_memory();
    let migrations = [
        Migration::new("0001_widgets", "CREATE TABLE IF NOT EXISTS widgets (id TEXT PRIMARY KEY)"),
        Migration::new("0001_widgets", "CREATE TABLE IF NOT EXISTS gadgets (id TEXT PRIMARY KEY)"),
    ];
    let report = MigrationRunner::new(&document).run(&migrations).await;
    assert_eq!(report.applied, vec!["0001_widgets"]);
    assert_eq!(report.skipped, vec!["0001_widgets"]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn failed_migration_does_not_stop_later_ones() {
    let (sqlite, path) = sqlite_backend("fail_open").await;
    let migrations = [
        Migration::new("0001_ok", "CREATE TABLE IF NOT EXISTS widgets (id TEXT PRIMARY KEY)"),
        Migration::new("0002_broken", "CREATE TABLE widgets ("),
        Migration::new("0003_ok", "CREATE TABLE IF NOT EXISTS gadgets (id TEXT PRIMARY KEY)"),
    ];
    let runner = MigrationRunner::new(&sqlite);

    let report = runner.run(&migrations).await;
    assert_eq!(report.applied, vec!["0001_ok", "0003_ok"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "0002_broken");
    assert!(!report.is_clean());

    // The failed one is not recorded, so it is retried next time.
    let again = runner.run(&migrations).await;
    assert_eq!(again.skipped, vec!["0001_ok", "0003_ok"]);
    assert_eq!(again.failed.len(), 1);
    assert_eq!(runner.applied().await.unwrap(), vec!["0001_ok", "0003_ok"]);

    sqlite.close().await;
    common::remove_sqlite_files(&path).await;
}

#[tokio::test]
async fn unreachable_backend_fails_every_migration() {
    let document = DocumentBackend::in_memory();
    document.close().await;

    let report = MigrationRunner::new(&document).run(MIGRATIONS).await;
    assert!(report.applied.is_empty());
    assert_eq!(report.failed.len(), MIGRATIONS.len());
}

#[tokio::test]
async fn statements_may_contain_semicolons() {
    use nawth::db::{Assignment, FilterSet, TableSpec};

    const NOTES: TableSpec = TableSpec {
        name: "notes",
        id_prefix: "note",
        soft_delete: false,
        unique: &[],
    };

    let (sqlite, path) = sqlite_backend("semicolons").await;
    let migrations = [Migration::new(
        "0001_notes_with_trigger",
        "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            body TEXT NOT NULL DEFAULT 'draft; unsaved',
            edits INTEGER NOT NULL DEFAULT 0
        );
        CREATE TRIGGER IF NOT EXISTS notes_count_edits AFTER UPDATE OF body ON notes
        BEGIN
            UPDATE notes SET edits = edits + 1 WHERE id = NEW.id;
        END;",
    )];
    let report = MigrationRunner::new(&sqlite).run(&migrations).await;
    assert!(report.is_clean(), "{:?}", report.failed);

    let row = sqlite
        .insert(&NOTES, nawth::db::Row::new().with("id", "note_1"))
        .await
        .unwrap();
    assert_eq!(row.get("body").as_str(), Some("draft; unsaved"));

    let row = sqlite
        .update_by_id(&NOTES, "note_1", &FilterSet::new(), &[Assignment::new("body", "final")])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("body").as_str(), Some("final"));
    let row = sqlite
        .find_one(&NOTES, &FilterSet::new().eq("id", "note_1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("edits").as_i64(), Some(1));

    sqlite.close().await;
    common::remove_sqlite_files(&path).await;
}
