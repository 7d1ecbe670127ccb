//! Row files for TinyDB
//!
//! Each table is a `<TABLE>.txt` file: a header line of comma-joined column
//! names followed by one comma-joined record per line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::debug;

use super::row::{check_value, Row};
use crate::error::{Error, Result};

const ROW_SUFFIX: &str = ".txt";
const META_SUFFIX: &str = "_meta.txt";

/// Reads and writes the row files of one database directory
#[derive(Debug, Clone)]
pub struct TableStore {
    dir: PathBuf,
}

impl TableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a table's row file
    pub fn row_path(&self, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", table.to_uppercase(), ROW_SUFFIX))
    }

    pub fn exists(&self, table: &str) -> bool {
        self.row_path(table).is_file()
    }

    /// Create the row file with its header line
    pub fn create(&self, table: &str, header: &[String]) -> Result<()> {
        for column in header {
            check_value(column)?;
        }

        let path = self.row_path(table);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::TableAlreadyExists(table.to_uppercase()))
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", header.join(","))?;
        debug!(table, path = %path.display(), "row file created");
        Ok(())
    }

    /// Read the header columns
    pub fn header(&self, table: &str) -> Result<Vec<String>> {
        let mut reader = BufReader::new(self.open(table)?);
        read_header(&mut reader)
    }

    /// Lazily iterate over the rows. Calling `scan` again restarts from the
    /// top of the file.
    pub fn scan(&self, table: &str) -> Result<RowIter> {
        let mut reader = BufReader::new(self.open(table)?);
        let header = read_header(&mut reader)?;
        Ok(RowIter {
            header,
            lines: reader.lines(),
        })
    }

    /// Append one record, values in header order
    pub fn append(&self, table: &str, values: &[String]) -> Result<()> {
        for value in values {
            check_value(value)?;
        }

        let path = self.row_path(table);
        let mut file = match OpenOptions::new().read(true).append(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::TableNotFound(table.to_uppercase()))
            }
            Err(e) => return Err(e.into()),
        };

        // Repair a previous line written without its newline
        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        writeln!(file, "{}", values.join(","))?;
        Ok(())
    }

    /// Rewrite matching rows through `transform`: `None` deletes the row,
    /// `Some(row)` replaces it. Returns the number of matching rows.
    ///
    /// Output goes to a temporary file in the same directory, which replaces
    /// the row file with a single rename only when something matched.
    pub fn mutate<P, F>(&self, table: &str, mut predicate: P, mut transform: F) -> Result<usize>
    where
        P: FnMut(&Row) -> bool,
        F: FnMut(Row) -> Option<Row>,
    {
        let path = self.row_path(table);
        let mut reader = BufReader::new(self.open(table)?);
        let mut temp = NamedTempFile::new_in(&self.dir)?;

        let mut header_line = String::new();
        reader.read_line(&mut header_line)?;
        let header = parse_header(&header_line);
        temp.write_all(header_line.as_bytes())?;
        if !header_line.ends_with('\n') {
            temp.write_all(b"\n")?;
        }

        let mut matched = 0;
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            let record = line.trim_end_matches(['\n', '\r']);
            if record.trim().is_empty() {
                temp.write_all(line.as_bytes())?;
                continue;
            }

            let row = Row::from_line(&header, record);
            if !predicate(&row) {
                temp.write_all(line.as_bytes())?;
                continue;
            }

            matched += 1;
            if let Some(updated) = transform(row) {
                writeln!(temp, "{}", updated.to_line()?)?;
            }
        }

        if matched == 0 {
            debug!(table, "no rows matched, row file left untouched");
            return Ok(0);
        }

        // the temp file starts out owner-only; the row file keeps its mode
        let permissions = fs::metadata(&path)?.permissions();
        temp.as_file().set_permissions(permissions)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| Error::IoError(e.error))?;
        debug!(table, matched, "row file replaced");
        Ok(matched)
    }

    /// Delete the row file. Returns whether it existed.
    pub fn remove(&self, table: &str) -> Result<bool> {
        match fs::remove_file(self.row_path(table)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Table names with a row file, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('.') || file_name.ends_with(META_SUFFIX) {
                continue;
            }
            let Some(table) = file_name.strip_suffix(ROW_SUFFIX) else {
                continue;
            };
            tables.push(table.to_string());
        }
        tables.sort();
        Ok(tables)
    }

    fn open(&self, table: &str) -> Result<File> {
        match File::open(self.row_path(table)) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::TableNotFound(table.to_uppercase()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn read_header(reader: &mut impl BufRead) -> Result<Vec<String>> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(parse_header(&line))
}

fn parse_header(line: &str) -> Vec<String> {
    line.trim_end_matches(['\n', '\r'])
        .split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Lazy iterator over the rows of a row file
pub struct RowIter {
    header: Vec<String>,
    lines: std::io::Lines<BufReader<File>>,
}

impl RowIter {
    /// Header columns of the scanned table
    pub fn header(&self) -> &[String] {
        &self.header
    }
}

impl Iterator for RowIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    let record = line.trim_end_matches('\r');
                    if record.trim().is_empty() {
                        continue;
                    }
                    return Some(Ok(Row::from_line(&self.header, record)));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
