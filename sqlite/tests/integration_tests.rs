//! Integration tests for the sqlhelper-sqlite crate.

use sqlhelper_core::{BuildError, Filter, Params, Value};
use sqlhelper_sqlite::{ConnectionConfig, DbError, SqlDb};

const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    score REAL
);
";

/// Opens a file-backed database in a fresh temp dir with the users table.
fn file_db() -> (tempfile::TempDir, SqlDb) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = SqlDb::open(ConnectionConfig::new(dir.path().join("users.db"))).unwrap();
    db.do_multi(SCHEMA).unwrap();
    (dir, db)
}

fn insert_user(db: &SqlDb, name: &str, email: Option<&str>, role: &str) -> i64 {
    let data = Params::new()
        .with("name", name)
        .with("email", email)
        .with("role", role);
    assert_eq!(db.prepare_and_insert("users", &data).unwrap(), 1);
    db.last_insert_id().unwrap()
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_data_survives_reconnect() {
    let (dir, mut db) = file_db();
    insert_user(&db, "ada", Some("ada@example.com"), "admin");
    db.db_close().unwrap();
    assert!(!db.check_connection());

    db.connect(dir.path().join("users.db")).unwrap();
    assert!(db.check_connection());
    assert_eq!(db.do_count("users", &Filter::new(), &[]).unwrap(), 1);
}

#[test]
fn test_open_from_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("db.yml");
    let db_path = dir.path().join("app.db");
    std::fs::write(
        &config_path,
        format!("path: {}\nbusy_timeout_ms: 250\n", db_path.display()),
    )
    .unwrap();

    let config = ConnectionConfig::load(&config_path).unwrap();
    assert_eq!(config.busy_timeout_ms, 250);
    let db = SqlDb::open(config).unwrap();
    db.do_multi(SCHEMA).unwrap();
    assert!(db_path.exists());
}

#[test]
fn test_read_only_connection_rejects_writes() {
    let (dir, mut db) = file_db();
    insert_user(&db, "ada", None, "user");
    db.db_close().unwrap();

    let ro = SqlDb::open(ConnectionConfig::new(dir.path().join("users.db")).read_only(true)).unwrap();
    assert_eq!(ro.do_all("SELECT * FROM users").unwrap().len(), 1);
    assert!(matches!(
        ro.do_only("DELETE FROM users"),
        Err(DbError::Database(_))
    ));
}

#[test]
fn test_read_only_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectionConfig::new(dir.path().join("missing.db")).read_only(true);
    assert!(SqlDb::open(config).is_err());
}

#[test]
fn test_foreign_keys_follow_config() {
    let ddl = "CREATE TABLE parent (id INTEGER PRIMARY KEY);
               CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id));";

    let enforced = SqlDb::open_in_memory().unwrap();
    enforced.do_multi(ddl).unwrap();
    assert!(
        enforced
            .prepare_and_insert("child", &Params::new().with("parent_id", 9))
            .is_err()
    );

    let mut config = ConnectionConfig::default();
    config.foreign_keys = false;
    let relaxed = SqlDb::open(config).unwrap();
    relaxed.do_multi(ddl).unwrap();
    assert!(
        relaxed
            .prepare_and_insert("child", &Params::new().with("parent_id", 9))
            .is_ok()
    );
}

// ---------------------------------------------------------------------------
// Select / insert / update helpers
// ---------------------------------------------------------------------------

#[test]
fn test_insert_then_select_roundtrip() {
    let (_dir, db) = file_db();
    let id = insert_user(&db, "grace", Some("grace@example.com"), "admin");

    let row = db
        .prepare_and_select_one("users", &Filter::new().eq("id", id), &[])
        .unwrap()
        .unwrap();
    assert_eq!(
        row.columns().collect::<Vec<_>>(),
        vec!["id", "name", "email", "role", "score"]
    );
    assert_eq!(row.get("email"), Some(&Value::from("grace@example.com")));
    assert_eq!(row.get("score"), Some(&Value::Null));
}

#[test]
fn test_select_projection_and_limit() {
    let (_dir, db) = file_db();
    for name in ["a", "b", "c", "d"] {
        insert_user(&db, name, None, "user");
    }
    let rows = db
        .prepare_and_select("users", &Filter::new().eq("role", "user"), &["name"], 2)
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].len(), 1);

    let picked = db
        .prepare_and_select("users", &Filter::new().any_of("name", ["b", "d", "zz"]), &["name"], 0)
        .unwrap();
    assert_eq!(picked.len(), 2);
}

#[test]
fn test_select_null_criterion() {
    let (_dir, db) = file_db();
    insert_user(&db, "with", Some("w@example.com"), "user");
    insert_user(&db, "without", None, "user");
    let rows = db
        .prepare_and_select("users", &Filter::new().eq("email", Value::Null), &["name"], 0)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("without")));
}

#[test]
fn test_update_set_and_where_same_column() {
    let (_dir, db) = file_db();
    insert_user(&db, "ada", None, "user");
    insert_user(&db, "bob", None, "user");
    insert_user(&db, "cyd", None, "admin");

    // SET role and WHERE role / WHERE-NOT name all bind distinct placeholders.
    let changed = db
        .prepare_and_update(
            "users",
            &Params::new().with("role", "staff").with("name", "renamed"),
            &Filter::new().eq("role", "user"),
            &Filter::new().eq("name", "bob"),
            0,
        )
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(db.do_count_where("users", "name = 'renamed' AND role = 'staff'").unwrap(), 1);
    assert_eq!(db.do_count("users", &Filter::new().eq("name", "bob"), &[]).unwrap(), 1);
}

#[test]
fn test_update_no_match_is_not_an_error() {
    let (_dir, db) = file_db();
    let changed = db
        .prepare_and_update(
            "users",
            &Params::new().with("role", "x"),
            &Filter::new().eq("id", 404),
            &Filter::new(),
            1,
        )
        .unwrap();
    assert_eq!(changed, 0);
}

#[test]
fn test_invalid_inputs_are_build_errors() {
    let (_dir, db) = file_db();
    assert!(matches!(
        db.prepare_and_insert("users", &Params::new()),
        Err(DbError::Build(BuildError::EmptyData))
    ));
    assert!(matches!(
        db.prepare_and_insert(" ", &Params::new().with("name", "x")),
        Err(DbError::Build(BuildError::EmptyTable))
    ));
    assert!(matches!(
        db.prepare_and_select("users; DROP TABLE users", &Filter::new(), &[], 0),
        Err(DbError::Build(BuildError::InvalidIdentifier(_)))
    ));
    assert!(matches!(
        db.prepare_and_update("users", &Params::new(), &Filter::new().eq("id", 1), &Filter::new(), 0),
        Err(DbError::Build(BuildError::EmptyData))
    ));
}

#[test]
fn test_missing_table_is_database_error() {
    let db = SqlDb::open_in_memory().unwrap();
    assert!(matches!(
        db.prepare_and_select("nowhere", &Filter::new(), &[], 0),
        Err(DbError::Database(_))
    ));
}

// ---------------------------------------------------------------------------
// Prepared templates
// ---------------------------------------------------------------------------

#[test]
fn test_prepare_insert_reused() {
    let (_dir, db) = file_db();
    {
        let mut insert = db.prepare_insert("users", &["name", "score"]).unwrap();
        for (i, name) in ["p", "q", "r"].into_iter().enumerate() {
            let params = Params::new().with("name", name).with("score", i as f64 * 1.5);
            assert_eq!(insert.execute_only(&params).unwrap(), 1);
        }
    }
    let total = db
        .do_from_array("SELECT SUM(score) AS total FROM users", "total")
        .unwrap();
    assert_eq!(total, Some(Value::Real(4.5)));
}

#[test]
fn test_prepare_update_with_where_placeholder() {
    let (_dir, db) = file_db();
    let id = insert_user(&db, "old", None, "user");
    let mut update = db.prepare_update("users", &["name"], "id = :id").unwrap();
    let changed = update
        .execute_only(&Params::new().with("name", "new").with("id", id))
        .unwrap();
    assert_eq!(changed, 1);
    let name = db
        .do_from_array(&format!("SELECT name FROM users WHERE id = {id}"), "name")
        .unwrap();
    assert_eq!(name, Some(Value::from("new")));
}

// ---------------------------------------------------------------------------
// Raw query helpers
// ---------------------------------------------------------------------------

#[test]
fn test_count_with_like_and_lists() {
    let (_dir, db) = file_db();
    insert_user(&db, "Alice", Some("alice@corp.example"), "admin");
    insert_user(&db, "Alicia", Some("alicia@home.example"), "user");
    insert_user(&db, "Bob", Some("bob@corp.example"), "user");

    let filter = Filter::new().eq("name", "ali").eq("email", "corp");
    assert_eq!(db.do_count("users", &filter, &["name", "email"]).unwrap(), 1);

    let filter = Filter::new().any_of("role", ["admin", "user"]).eq("email", "corp");
    assert_eq!(db.do_count("users", &filter, &["email"]).unwrap(), 2);

    let filter = Filter::new().eq("name", "%");
    assert_eq!(db.do_count("users", &filter, &[]).unwrap(), 0);
}

#[test]
fn test_grouping_helpers() {
    let (_dir, db) = file_db();
    insert_user(&db, "a", None, "admin");
    insert_user(&db, "b", None, "user");
    insert_user(&db, "c", None, "user");

    let groups = db
        .do_all_by_key("SELECT name, role FROM users ORDER BY id", "role")
        .unwrap();
    let users: Vec<_> = groups["user"]
        .iter()
        .filter_map(|r| r.get("name").cloned())
        .collect();
    assert_eq!(users, vec![Value::from("b"), Value::from("c")]);

    let by_name = db.do_all_by_id("SELECT * FROM users", "name").unwrap();
    assert_eq!(by_name.keys().cloned().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

#[test]
fn test_do_multi_error_leaves_handle_usable() {
    let (_dir, db) = file_db();
    assert!(db.do_multi("INSERT INTO users (name) VALUES ('x'); BOGUS;").is_err());
    assert!(db.do_all("SELECT * FROM users").is_ok());
}
