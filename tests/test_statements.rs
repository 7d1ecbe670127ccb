use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tinydb::executor::QueryResult;
use tinydb::export::{dump_database, render_erd};
use tinydb::{CommandProcessor, Config, Error, Result, Session};

struct Db {
    dir: TempDir,
    processor: CommandProcessor,
    session: Session,
}

impl Db {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::with_home(dir.path());
        let processor = CommandProcessor::from_config(&config);
        let session = CommandProcessor::session(&config).unwrap();
        Self {
            dir,
            processor,
            session,
        }
    }

    fn run(&mut self, input: &str) -> Result<QueryResult> {
        self.processor.process(&mut self.session, input)
    }

    fn run_all(&mut self, script: &str) {
        for statement in script.split_inclusive(';') {
            if !statement.trim().is_empty() {
                self.run(statement).unwrap();
            }
        }
    }

    fn db_dir(&self) -> PathBuf {
        self.dir.path().join("tinydb/databases/T")
    }

    fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.db_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn with_people() -> Db {
    let mut db = Db::new();
    db.run_all(
        "CREATE DATABASE T; USE T; \
         CREATE TABLE P (id INT (pk), name STRING); \
         INSERT INTO P (id,name) VALUES (1,'Ann');",
    );
    db
}

#[test]
fn test_insert_then_select_scenario() {
    let mut db = with_people();

    let result = db.run("SELECT * FROM P;").unwrap();
    assert_eq!(result.columns, vec!["ID", "NAME"]);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get("ID"), Some("1"));
    assert_eq!(result.rows[0].get("NAME"), Some("Ann"));
}

#[test]
fn test_header_follows_declared_order() {
    let mut db = with_people();
    db.run("CREATE TABLE Wide (zeta INT, alpha STRING (pk), mid VARCHAR(20));")
        .unwrap();

    let header = fs::read_to_string(db.db_dir().join("WIDE.txt")).unwrap();
    assert_eq!(header, "ZETA,ALPHA,MID\n");
    assert_eq!(
        db.run("SELECT * FROM wide;").unwrap().columns,
        vec!["ZETA", "ALPHA", "MID"]
    );
}

#[test]
fn test_duplicate_key_leaves_file_length_unchanged() {
    let mut db = with_people();
    let path = db.db_dir().join("P.txt");
    let before = fs::metadata(&path).unwrap().len();

    let err = db
        .run("INSERT INTO P (id,name) VALUES (1,'Other');")
        .unwrap_err();
    assert!(matches!(err, Error::PrimaryKeyViolation { .. }));
    assert_eq!(fs::metadata(&path).unwrap().len(), before);
}

#[test]
fn test_zero_match_mutations_leave_no_trace() {
    let mut db = with_people();
    let path = db.db_dir().join("P.txt");
    let before = fs::read(&path).unwrap();
    let files = db.file_names();

    db.run("UPDATE P SET name = 'X' WHERE id = 7;").unwrap();
    db.run("DELETE FROM P WHERE name = 'Nobody';").unwrap();

    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(db.file_names(), files);
}

#[test]
fn test_quoted_values_round_trip() {
    let mut db = with_people();
    db.run("INSERT INTO P VALUES (2, \"Bo\");").unwrap();
    db.run("INSERT INTO P VALUES (3, 'It''s');").unwrap();
    db.run("INSERT INTO P VALUES (4, 'WHERE x = 1');").unwrap();

    let result = db.run("SELECT name FROM P WHERE id >= 2;").unwrap();
    let names: Vec<&str> = result
        .rows
        .iter()
        .map(|r| r.get("NAME").unwrap())
        .collect();
    assert_eq!(names, vec!["Bo", "It's", "WHERE x = 1"]);
}

#[test]
fn test_update_primary_key_scenario() {
    let mut db = with_people();
    let path = db.db_dir().join("P.txt");
    let before = fs::read(&path).unwrap();

    assert!(matches!(
        db.run("UPDATE P SET id=9 WHERE id=1;"),
        Err(Error::PrimaryKeyImmutable(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_drop_twice_reports_missing_table() {
    let mut db = with_people();

    db.run("DROP TABLE P;").unwrap();
    let result = db.run("DROP TABLE P;").unwrap();
    assert!(result.message.unwrap().contains("does not exist"));
    assert!(db.file_names().is_empty());
}

#[test]
fn test_statements_need_a_database() {
    let mut db = Db::new();
    assert!(matches!(
        db.run("SELECT * FROM P;"),
        Err(Error::NoActiveDatabase)
    ));

    let result = db.run("USE nowhere;").unwrap();
    assert!(result.message.unwrap().contains("does not exist"));
    assert!(db.session.active_database().is_none());
}

#[test]
fn test_sessions_are_independent() {
    let mut db = with_people();
    let config = Config::with_home(db.dir.path());
    let mut other = CommandProcessor::session(&config).unwrap();

    assert!(matches!(
        db.processor.process(&mut other, "SELECT * FROM P;"),
        Err(Error::NoActiveDatabase)
    ));
    assert_eq!(db.session.active_database(), Some("T"));
}

#[test]
fn test_parse_errors() {
    let mut db = with_people();
    assert!(matches!(
        db.run("SELEC * FROM P;"),
        Err(Error::UnexpectedToken { .. })
    ));
    assert!(matches!(
        db.run("SELECT * FROM"),
        Err(Error::UnexpectedEof(_))
    ));
    assert!(matches!(
        db.run("INSERT INTO P (id) VALUES ('unterminated);"),
        Err(Error::UnterminatedString(_))
    ));
}

#[test]
fn test_exports_over_processed_database() {
    let mut db = with_people();
    db.run("INSERT INTO P (id,name) VALUES (2,'Bo');").unwrap();
    db.run("CREATE TABLE Empty (k INT (pk));").unwrap();

    let erd = render_erd(db.processor.workspace(), "T").unwrap();
    assert!(erd.starts_with("Entity-Relationship Diagram for database: T\n"));
    assert!(erd.contains("Table: EMPTY\nColumns: K\nPrimary Keys: K\n"));

    let sql = dump_database(db.processor.workspace(), "T").unwrap();
    assert!(sql.contains("-- No data to insert for table EMPTY"));
    assert!(sql.contains("INSERT INTO P (ID, NAME) VALUES\n('1', 'Ann'),\n('2', 'Bo');"));
}
