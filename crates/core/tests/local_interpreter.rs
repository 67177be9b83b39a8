//! End-to-end runs against a local `sh` standing in for `su`.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use dlc_common::Error;
use dlc_core::{BackupPolicy, ClearStrategy, Companion, CompanionConfig, InterpreterConfig};
use dlc_report_schema::{ActivityLog, StepOutcome, WipeStepKind};
use predicates::prelude::*;
use std::sync::Arc;

const PACKAGE: &str = "com.hmdglobal.app.devicelock";

/// `sh` with a `sqlite3` stand-in that reads one `CREATE TABLE` per line
/// from the database file.
const SQLITE_SHELL: &str = r#"
sqlite3() {
    case "$2" in
        .tables)
            if grep -q corrupt "$1"; then
                echo "Error: file is not a database" >&2
                return 26
            fi
            sed -n 's/^CREATE TABLE \([A-Za-z_]*\) .*/\1/p' "$1"
            ;;
        ".schema "*)
            table="${2#.schema }"
            if [ "$table" = audit_log ]; then
                echo "Error: database is locked" >&2
                return 5
            fi
            grep "^CREATE TABLE $table " "$1"
            ;;
        *)
            return 1
            ;;
    esac
}
eval "$(cat)"
"#;

fn local_config(data_root: &TempDir, backup_root: &TempDir) -> CompanionConfig {
    CompanionConfig {
        data_root: data_root.path().display().to_string(),
        backup_root: backup_root.path().display().to_string(),
        interpreter: InterpreterConfig::new("sh", Vec::new()),
        settle_delay_ms: 0,
        ..Default::default()
    }
}

fn seed_app_data(data_root: &TempDir) {
    let app = data_root.child(PACKAGE);
    app.child("shared_prefs/a.xml").write_str("<map/>\n").unwrap();
    app.child("shared_prefs/notes.txt").write_str("not a preference").unwrap();
    app.child("databases/lock.db").write_binary(b"SQLite format 3\0").unwrap();
}

#[test]
fn dump_shared_preferences_reads_only_xml() {
    let data_root = TempDir::new().unwrap();
    let backup_root = TempDir::new().unwrap();
    seed_app_data(&data_root);

    let log = Arc::new(ActivityLog::new());
    let companion = Companion::new(local_config(&data_root, &backup_root), log.clone()).unwrap();

    assert!(companion.check_access());
    let report = companion.dump_shared_preferences().unwrap();
    assert_eq!(report.file_names(), vec!["a.xml"]);
    assert_eq!(report.entries[0].text_content(), Some("<map/>"));
    assert!(report.listing.contains("notes.txt"));
    assert!(report.render().contains("--- a.xml ---\n<map/>\n"));
    assert!(!log.is_empty());
}

#[test]
fn dump_missing_directory_is_empty_result() {
    let data_root = TempDir::new().unwrap();
    let backup_root = TempDir::new().unwrap();
    let companion = Companion::new(
        local_config(&data_root, &backup_root),
        Arc::new(ActivityLog::new()),
    )
    .unwrap();

    let err = companion.dump_shared_preferences().unwrap_err();
    assert!(matches!(err, Error::EmptyResult { .. }));
}

#[test]
fn dump_database_schemas_reads_every_table() {
    let data_root = TempDir::new().unwrap();
    let backup_root = TempDir::new().unwrap();
    let databases = data_root.child(PACKAGE).child("databases");
    databases
        .child("lock.db")
        .write_str(
            "CREATE TABLE android_metadata (locale TEXT);\n\
             CREATE TABLE lock_state (id INTEGER PRIMARY KEY, locked INTEGER);\n\
             CREATE TABLE audit_log (id INTEGER, event TEXT);\n",
        )
        .unwrap();
    databases.child("lock.db-journal").write_str("corrupt").unwrap();
    databases.child("empty.db").touch().unwrap();
    databases.child("broken.db").write_str("corrupt").unwrap();

    let config = CompanionConfig {
        interpreter: InterpreterConfig::new(
            "sh",
            vec!["-c".to_string(), SQLITE_SHELL.to_string()],
        ),
        ..local_config(&data_root, &backup_root)
    };
    let companion = Companion::new(config, Arc::new(ActivityLog::new())).unwrap();

    let report = companion.dump_database_schemas().unwrap();
    let mut names = report.file_names();
    names.sort();
    assert_eq!(names, vec!["empty.db", "lock.db"]);

    let tables_of = |name: &str| {
        report
            .entries
            .iter()
            .find(|e| e.file_name == name)
            .and_then(|e| e.tables())
            .unwrap()
            .to_vec()
    };
    let lock = tables_of("lock.db");
    let table_names: Vec<&str> = lock.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(table_names, vec!["android_metadata", "lock_state"]);
    assert_eq!(
        lock[1].schema,
        "CREATE TABLE lock_state (id INTEGER PRIMARY KEY, locked INTEGER);"
    );
    assert!(tables_of("empty.db").is_empty());

    let mut omitted = report.omitted.clone();
    omitted.sort();
    assert_eq!(omitted, vec!["broken.db", "lock.db/audit_log"]);
    assert!(report.render().contains("Schema for lock_state:"));
}

#[test]
fn wipe_backs_up_before_clearing() {
    let data_root = TempDir::new().unwrap();
    let backup_root = TempDir::new().unwrap();
    seed_app_data(&data_root);

    let config = CompanionConfig {
        clear_strategy: ClearStrategy::RemovePreferences,
        backup_policy: BackupPolicy::Required,
        ..local_config(&data_root, &backup_root)
    };
    let companion = Companion::new(config, Arc::new(ActivityLog::new())).unwrap();
    let transcript = companion.wipe();

    assert!(transcript.backup_usable, "{}", transcript.render());
    assert!(transcript.overall_succeeded, "{}", transcript.render());
    // `am` does not exist here; the failure is recorded and the wipe goes on.
    assert!(matches!(
        transcript.step(WipeStepKind::ForceStop).unwrap().outcome,
        StepOutcome::Failed { .. }
    ));

    let backup = assert_fs::fixture::ChildPath::new(&transcript.backup_path);
    backup
        .child("shared_prefs/a.xml")
        .assert(predicate::str::contains("<map/>"));
    backup.child("databases/lock.db").assert(predicate::path::exists());

    let prefs = data_root.child(PACKAGE).child("shared_prefs");
    prefs.child("a.xml").assert(predicate::path::missing());
    prefs.child("notes.txt").assert(predicate::path::missing());
    data_root
        .child(PACKAGE)
        .child("databases/lock.db")
        .assert(predicate::path::exists());
}

#[test]
fn wipe_without_source_data_leaves_nothing_cleared() {
    let data_root = TempDir::new().unwrap();
    let backup_root = TempDir::new().unwrap();

    let companion = Companion::new(
        local_config(&data_root, &backup_root),
        Arc::new(ActivityLog::new()),
    )
    .unwrap();
    let transcript = companion.wipe();

    assert!(transcript
        .step(WipeStepKind::CreateBackupDir)
        .unwrap()
        .outcome
        .is_success());
    assert!(!transcript.backup_usable);
    assert!(!transcript.overall_succeeded);
    assert!(matches!(
        transcript.step(WipeStepKind::ClearData).unwrap().outcome,
        StepOutcome::Skipped { .. }
    ));
    assert_fs::fixture::ChildPath::new(&transcript.backup_path).assert(predicate::path::is_dir());
}
