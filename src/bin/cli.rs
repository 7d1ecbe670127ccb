//! TinyDB - CLI Client

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use tinydb::catalog::TableSchema;
use tinydb::executor::{RelationshipChoice, RelationshipPrompt};
use tinydb::export::{export_erd, export_sql};
use tinydb::storage::Row;
use tinydb::{CommandProcessor, Config, Session};

const PRIMARY_PROMPT: &str = "tinydb> ";
const CONTINUATION_PROMPT: &str = "   ...> ";

/// Print welcome banner
fn print_banner() {
    println!(
        r#"
 _____ _             ____  ____
|_   _(_)_ __  _   _|  _ \| __ )
  | | | | '_ \| | | | | | |  _ \
  | | | | | | | |_| | |_| | |_) |
  |_| |_|_| |_|\__, |____/|____/
               |___/

 A minimal flat-file relational store
 Type '.help' for help, '.quit' to exit
"#
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help                  Show this help message
  .quit                  Exit TinyDB
  .tables                List tables of the active database
  .schema <table>        Show table schema
  .erd <db>              Write <db>/ERD.erd
  .export <db> [file]    Write a SQL dump (default export.sql)

Statements (end with ';'):
  CREATE DATABASE name
  USE name
  CREATE TABLE name (col type [(pk)], ...)
  INSERT INTO name [(cols)] VALUES (vals)
  SELECT cols|* FROM name [WHERE col op val]
  UPDATE name SET col = val[, ...] WHERE col = val
  DELETE FROM name WHERE col = val
  DROP TABLE name
  BEGIN TRANSACTION / COMMIT / ROLLBACK

Examples:
  CREATE TABLE people (id INT (pk), name STRING);
  INSERT INTO people (id, name) VALUES (1, 'Ann');
  SELECT * FROM people WHERE id >= 1;
"#
    );
}

/// Format query results as a table
fn format_results(columns: &[String], rows: &[Row]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (i, value) in row.values().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(value.chars().count());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();

    // Header
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    // Rows
    for row in rows {
        let row_str: String = row
            .values()
            .zip(&widths)
            .map(|(v, w)| format!(" {:<width$} ", v, width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }

    if !rows.is_empty() {
        output.push_str(&separator);
    }

    output
}

/// Asks on the terminal which relationship a new table should have
struct TerminalPrompt {
    editor: DefaultEditor,
}

impl TerminalPrompt {
    fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new().context("failed to initialize line editor")?,
        })
    }

    /// `None` on Ctrl-C or end of input
    fn ask(&mut self, question: &str) -> Option<String> {
        self.editor
            .readline(question)
            .ok()
            .map(|answer| answer.trim().to_string())
    }
}

impl RelationshipPrompt for TerminalPrompt {
    fn relationships(
        &mut self,
        table: &TableSchema,
        others: &[TableSchema],
    ) -> tinydb::Result<Vec<RelationshipChoice>> {
        println!("Columns: {}", table.column_names().join(", "));
        let question = format!(
            "Do you want to define relationships for table {}? (yes/no): ",
            table.name()
        );
        match self.ask(&question) {
            Some(answer) if answer.eq_ignore_ascii_case("yes") => {}
            _ => return Ok(Vec::new()),
        }

        if others.is_empty() {
            println!("There are no other tables in the current database for relationship.");
            return Ok(Vec::new());
        }

        let Some(column) = self.ask("Column of the new table: ") else {
            return Ok(Vec::new());
        };
        println!("Tables in the current database:");
        for other in others {
            println!(
                "  {} ({}; primary key: {})",
                other.name(),
                other.column_names().join(", "),
                other.primary_keys().join(", ")
            );
        }
        let Some(target_table) = self.ask("Related table: ") else {
            return Ok(Vec::new());
        };
        let Some(target_column) = self.ask("Related column (must be its primary key): ") else {
            return Ok(Vec::new());
        };

        Ok(vec![RelationshipChoice::new(
            column,
            target_table,
            target_column,
        )])
    }
}

struct Repl {
    processor: CommandProcessor,
    session: Session,
    editor: DefaultEditor,
    buffer: String,
}

impl Repl {
    fn new(config: &Config) -> Result<Self> {
        let processor = CommandProcessor::from_config(config).with_prompt(TerminalPrompt::new()?);
        Ok(Self {
            processor,
            session: CommandProcessor::session(config)?,
            editor: DefaultEditor::new().context("failed to initialize line editor")?,
            buffer: String::new(),
        })
    }

    fn run(&mut self) -> Result<()> {
        print_banner();

        loop {
            let prompt = if self.buffer.is_empty() {
                PRIMARY_PROMPT
            } else {
                CONTINUATION_PROMPT
            };

            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    self.buffer.clear();
                    println!("^C");
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e).context("failed to read input"),
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Returns false when the shell should exit
    fn handle_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }

        if self.buffer.is_empty() && trimmed.starts_with('.') {
            self.editor.add_history_entry(trimmed).ok();
            return self.handle_special_command(trimmed);
        }

        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(trimmed);

        if trimmed.ends_with(';') {
            let statement = std::mem::take(&mut self.buffer);
            self.editor.add_history_entry(statement.as_str()).ok();
            self.execute(&statement);
        }
        true
    }

    fn execute(&mut self, statement: &str) {
        match self.processor.process(&mut self.session, statement) {
            Ok(result) => {
                if !result.columns.is_empty() {
                    print!("{}", format_results(&result.columns, &result.rows));
                }
                if let Some(message) = result.message {
                    println!("{}", message);
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    /// Handle special dot commands
    fn handle_special_command(&mut self, cmd: &str) -> bool {
        let parts: Vec<&str> = cmd.split_whitespace().collect();

        match parts.first().copied() {
            Some(".help") => print_help(),
            Some(".quit") | Some(".exit") => return false,
            Some(".tables") => match self.session.active_database() {
                Some(db) => match self
                    .processor
                    .workspace()
                    .open(db)
                    .and_then(|db| db.tables().list())
                {
                    Ok(tables) if tables.is_empty() => println!("No tables found."),
                    Ok(tables) => {
                        println!("Tables:");
                        for table in tables {
                            println!("  {}", table);
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                },
                None => eprintln!("Error: {}", tinydb::Error::NoActiveDatabase),
            },
            Some(".schema") => {
                let (Some(db), Some(table)) = (self.session.active_database(), parts.get(1)) else {
                    eprintln!("Usage: .schema <table> (with an active database)");
                    return true;
                };
                match self
                    .processor
                    .workspace()
                    .open(db)
                    .and_then(|db| db.schemas().load(table))
                {
                    Ok(schema) => {
                        println!("Table: {}", schema.name());
                        for column in schema.columns() {
                            let key = if column.primary_key { " (pk)" } else { "" };
                            println!("  {} {}{}", column.name, column.data_type, key);
                        }
                        for rel in schema.relationships() {
                            println!("  Relationship: {}", rel);
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Some(".erd") => match parts.get(1) {
                Some(db) => match export_erd(self.processor.workspace(), db) {
                    Ok(path) => println!("ERD exported to {}", path.display()),
                    Err(e) => eprintln!("Error: {}", e),
                },
                None => eprintln!("Usage: .erd <db>"),
            },
            Some(".export") => match parts.get(1) {
                Some(db) => {
                    let path = PathBuf::from(parts.get(2).copied().unwrap_or("export.sql"));
                    match export_sql(self.processor.workspace(), db, &path) {
                        Ok(()) => println!("Data exported successfully to {}", path.display()),
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                None => eprintln!("Usage: .export <db> [file]"),
            },
            Some(cmd) => {
                eprintln!("Unknown command: {}", cmd);
                eprintln!("Type '.help' for available commands.");
            }
            None => {}
        }
        true
    }
}

fn load_config() -> Result<Config> {
    let args: Vec<String> = env::args().collect();

    // Simple argument parsing
    let mut config_path = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--config requires a path");
                };
                config_path = Some(PathBuf::from(path));
                i += 2;
            }
            other => bail!("unknown argument '{}'", other),
        }
    }

    match config_path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Config::from_env().context("invalid environment configuration"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    Repl::new(&config)?.run()
}
