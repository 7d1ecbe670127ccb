//! Metadata files
//!
//! Each table has a `<TABLE>_meta.txt` sidecar next to its row file:
//!
//! ```text
//! Table: P
//! Structure: ID INT (pk), NAME STRING
//! Primary Key: ID
//! Relationship: From P(ID) to Q(ID)
//! ```

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::schema::{ColumnSchema, Relationship, TableSchema};
use crate::error::{Error, Result};

const META_SUFFIX: &str = "_meta.txt";
const TEMP_META_SUFFIX: &str = "_temp_meta.txt";

/// Reads and writes the metadata files of one database directory
#[derive(Debug, Clone)]
pub struct SchemaStore {
    dir: PathBuf,
}

impl SchemaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the canonical metadata file for a table
    pub fn meta_path(&self, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", table.to_uppercase(), META_SUFFIX))
    }

    fn temp_meta_path(&self, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", table.to_uppercase(), TEMP_META_SUFFIX))
    }

    pub fn exists(&self, table: &str) -> bool {
        self.meta_path(table).is_file()
    }

    /// Write the metadata file for a new table
    pub fn define_table(&self, schema: &TableSchema) -> Result<()> {
        let path = self.meta_path(schema.name());
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::TableAlreadyExists(schema.name().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(render(schema).as_bytes())?;
        debug!(table = schema.name(), path = %path.display(), "metadata written");
        Ok(())
    }

    /// Load a table's schema from its canonical metadata file
    pub fn load(&self, table: &str) -> Result<TableSchema> {
        let path = self.meta_path(table);
        if !path.is_file() {
            return Err(Error::MetadataMissing(table.to_uppercase()));
        }
        read_schema(&path)
    }

    /// Like [`load`](Self::load), but accepts a `<TABLE>_temp_meta.txt`
    /// sibling when the canonical file is missing.
    pub fn load_for_export(&self, table: &str) -> Result<TableSchema> {
        if self.exists(table) {
            return self.load(table);
        }
        let temp = self.temp_meta_path(table);
        if temp.is_file() {
            debug!(table, path = %temp.display(), "using temporary metadata");
            return read_schema(&temp);
        }
        Err(Error::MetadataMissing(table.to_uppercase()))
    }

    /// Primary key columns of a table, in declared order
    pub fn primary_keys(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.load(table)?.primary_keys())
    }

    /// False when the metadata is absent or unreadable
    pub fn is_primary_key(&self, table: &str, column: &str) -> bool {
        self.load(table)
            .map(|schema| schema.is_primary_key(column))
            .unwrap_or(false)
    }

    /// Delete the metadata file. Returns whether it existed.
    pub fn remove(&self, table: &str) -> Result<bool> {
        match fs::remove_file(self.meta_path(table)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All readable schemas in the database, sorted by table name. A
    /// malformed metadata file is skipped with a warning.
    pub fn list(&self) -> Result<Vec<TableSchema>> {
        let mut schemas = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.ends_with(META_SUFFIX) || file_name.ends_with(TEMP_META_SUFFIX) {
                continue;
            }
            match read_schema(&entry.path()) {
                Ok(schema) => schemas.push(schema),
                Err(Error::InvalidFormat(reason)) => {
                    warn!(file = file_name, reason = %reason, "unreadable metadata skipped");
                }
                Err(e) => return Err(e),
            }
        }
        schemas.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(schemas)
    }
}

/// Render a schema in metadata file format
pub fn render(schema: &TableSchema) -> String {
    let structure = schema
        .columns()
        .iter()
        .map(|c| {
            if c.primary_key {
                format!("{} {} (pk)", c.name, c.data_type)
            } else {
                format!("{} {}", c.name, c.data_type)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!("Table: {}\nStructure: {}\n", schema.name(), structure);
    for key in schema.primary_keys() {
        out.push_str(&format!("Primary Key: {}\n", key));
    }
    for rel in schema.relationships() {
        out.push_str(&format!("Relationship: {}\n", rel));
    }
    out
}

/// Parse metadata file text. `Primary Key:` lines are authoritative; the
/// `(pk)` markers in the structure line are used only when there are none.
pub fn parse(text: &str) -> Result<TableSchema> {
    let mut name = None;
    let mut columns = Vec::new();
    let mut keys = Vec::new();
    let mut relationships = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix("Table:") {
            name = Some(rest.trim().to_uppercase());
        } else if let Some(rest) = line.strip_prefix("Structure:") {
            columns = parse_structure(rest);
        } else if let Some(rest) = line.strip_prefix("Primary Key:") {
            keys.push(rest.trim().to_uppercase());
        } else if let Some(rest) = line.strip_prefix("Relationship:") {
            relationships.push(parse_relationship(rest.trim())?);
        } else {
            return Err(Error::InvalidFormat(format!(
                "unrecognized metadata line '{}'",
                line
            )));
        }
    }

    let name = name.ok_or_else(|| Error::InvalidFormat("metadata has no Table line".into()))?;
    if !keys.is_empty() {
        for column in &mut columns {
            column.primary_key = keys.contains(&column.name);
        }
    }

    let mut schema = TableSchema::from_columns(name, columns);
    for rel in relationships {
        schema.add_relationship(rel);
    }
    Ok(schema)
}

fn parse_structure(text: &str) -> Vec<ColumnSchema> {
    text.split(',')
        .map(str::trim)
        .filter(|def| !def.is_empty())
        .map(|def| {
            let mut parts = def.split_whitespace();
            let name = parts.next().unwrap_or_default();
            let data_type = parts.next().unwrap_or_default().to_uppercase();
            let primary_key = def.to_lowercase().contains("(pk)");
            ColumnSchema::new(name, data_type).primary_key(primary_key)
        })
        .collect()
}

/// `From T(c) to T2(c2)`
fn parse_relationship(text: &str) -> Result<Relationship> {
    let malformed = || Error::InvalidFormat(format!("malformed relationship '{}'", text));

    let rest = text.strip_prefix("From ").ok_or_else(malformed)?;
    let (source, target) = rest.split_once(" to ").ok_or_else(malformed)?;
    let (source_table, source_column) = split_column_ref(source).ok_or_else(malformed)?;
    let (target_table, target_column) = split_column_ref(target).ok_or_else(malformed)?;

    Ok(Relationship::new(
        source_table,
        source_column,
        target_table,
        target_column,
    ))
}

fn split_column_ref(text: &str) -> Option<(&str, &str)> {
    let (table, column) = text.trim().split_once('(')?;
    let column = column.strip_suffix(')')?;
    Some((table.trim(), column.trim()))
}

fn read_schema(path: &Path) -> Result<TableSchema> {
    parse(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn people() -> TableSchema {
        let mut schema = TableSchema::from_columns(
            "P",
            vec![
                ColumnSchema::new("ID", "INT").primary_key(true),
                ColumnSchema::new("NAME", "STRING"),
            ],
        );
        schema.add_relationship(Relationship::new("P", "ID", "Q", "ID"));
        schema
    }

    #[test]
    fn test_render_format() {
        assert_eq!(
            render(&people()),
            "Table: P\n\
             Structure: ID INT (pk), NAME STRING\n\
             Primary Key: ID\n\
             Relationship: From P(ID) to Q(ID)\n"
        );
    }

    #[test]
    fn test_parse_rendered() {
        assert_eq!(parse(&render(&people())).unwrap(), people());
    }

    #[test]
    fn test_parse_hand_written_metadata() {
        let schema = parse(
            "Table: orders\nStructure: oid INT (pk), pid int\nPrimary Key: OID\nRelationship: From ORDERS(PID) to P(ID)\n",
        )
        .unwrap();

        assert_eq!(schema.name(), "ORDERS");
        assert_eq!(schema.column_names(), vec!["OID", "PID"]);
        assert_eq!(schema.columns()[1].data_type, "INT");
        assert_eq!(schema.primary_keys(), vec!["OID"]);
        assert_eq!(schema.relationships()[0].target_table, "P");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse("Table: P\nsomething else\n"),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            parse("Structure: ID INT\n"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_define_table_twice() {
        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(dir.path());

        store.define_table(&people()).unwrap();
        assert!(matches!(
            store.define_table(&people()),
            Err(Error::TableAlreadyExists(_))
        ));
    }

    #[test]
    fn test_missing_metadata() {
        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(dir.path());

        assert!(!store.is_primary_key("P", "ID"));
        assert!(matches!(
            store.primary_keys("P"),
            Err(Error::MetadataMissing(_))
        ));
        assert!(!store.remove("P").unwrap());
    }

    #[test]
    fn test_primary_key_lookup() {
        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(dir.path());
        store.define_table(&people()).unwrap();

        assert!(store.is_primary_key("p", "id"));
        assert!(!store.is_primary_key("P", "NAME"));
        assert_eq!(store.primary_keys("P").unwrap(), vec!["ID"]);
    }

    #[test]
    fn test_export_falls_back_to_temp_metadata() {
        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(dir.path());
        fs::write(
            dir.path().join("P_temp_meta.txt"),
            render(&people()),
        )
        .unwrap();

        assert!(matches!(store.load("P"), Err(Error::MetadataMissing(_))));
        assert_eq!(store.load_for_export("P").unwrap().name(), "P");
    }

    #[test]
    fn test_list_skips_temp_metadata() {
        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(dir.path());
        store.define_table(&people()).unwrap();
        store
            .define_table(&TableSchema::from_columns(
                "A",
                vec![ColumnSchema::new("X", "INT")],
            ))
            .unwrap();
        fs::write(dir.path().join("Z_temp_meta.txt"), "Table: Z\n").unwrap();

        let names: Vec<String> = store
            .list()
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "P"]);
    }

    #[test]
    fn test_list_skips_malformed_metadata() {
        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(dir.path());
        store.define_table(&people()).unwrap();
        fs::write(dir.path().join("BROKEN_meta.txt"), "not a metadata file\n").unwrap();

        let schemas = store.list().unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name(), "P");
        assert!(matches!(store.load("BROKEN"), Err(Error::InvalidFormat(_))));
    }
}
