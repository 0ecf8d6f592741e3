//! In-memory table store for pipeline tests
//!
//! Tables live in memory and each table run works on a private copy that is
//! written back on commit. Staged batches are parsed with PostgreSQL's text
//! `COPY` rules and typed by the staging column, so values that the server
//! would reject are rejected here too.

#![allow(dead_code)]

use async_trait::async_trait;
use fake::faker::internet::en::FreeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use pganon::adapters::database::{TableSession, TableStore};
use pganon::core::encoder::CopyPayload;
use pganon::core::plan::{TablePlan, TableShape};
use pganon::domain::{AnonymizerError, Result, Row, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Column types understood by the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Boolean,
    Json,
}

/// A table: typed columns and rows
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub columns: Vec<(String, ColumnType)>,
    pub rows: Vec<Vec<Value>>,
    /// Columns rejecting NULL on update
    pub not_null: Vec<String>,
}

impl MemoryTable {
    pub fn new(columns: &[(&str, ColumnType)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(name, ty)| (name.to_string(), *ty))
                .collect(),
            rows: Vec::new(),
            not_null: Vec::new(),
        }
    }

    pub fn with_not_null(mut self, column: &str) -> Self {
        self.not_null.push(column.to_string());
        self
    }

    pub fn insert(&mut self, values: Vec<Value>) {
        assert_eq!(values.len(), self.columns.len(), "row width");
        self.rows.push(values);
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|(name, _)| name == column)
    }

    /// Values of `column`, in row order
    pub fn column(&self, column: &str) -> Vec<Value> {
        let index = self.index_of(column).expect("unknown column");
        self.rows.iter().map(|row| row[index].clone()).collect()
    }

    /// Value of `column` in the row whose `id` equals `id`
    pub fn value(&self, id: i64, column: &str) -> Value {
        let key = self.index_of("id").expect("id column");
        let index = self.index_of(column).expect("unknown column");
        self.rows
            .iter()
            .find(|row| row[key] == Value::from(id))
            .map(|row| row[index].clone())
            .expect("unknown id")
    }
}

/// `users(id, email, name)` filled with `count` generated rows, ids starting at 1
pub fn users_table(count: i64) -> MemoryTable {
    let mut table = MemoryTable::new(&[
        ("id", ColumnType::Integer),
        ("email", ColumnType::Text),
        ("name", ColumnType::Text),
    ]);
    for id in 1..=count {
        let email: String = FreeEmail().fake();
        let name: String = Name().fake();
        table.insert(vec![Value::from(id), Value::from(email), Value::from(name)]);
    }
    table
}

/// Errors to inject into a run
#[derive(Debug, Default)]
pub struct Failures {
    /// Fail the n-th fetch (1-based) of a table with a connectivity error
    pub fetch: Option<(&'static str, u64)>,
    /// Reject the n-th bulk load (1-based) with a data error
    pub copy: Option<u64>,
    /// Fail the merge with a connectivity error
    pub merge: bool,
}

/// In-memory [`TableStore`]
#[derive(Default)]
pub struct MemoryStore {
    pub tables: BTreeMap<String, MemoryTable>,
    pub failures: Failures,
    /// Operations in call order, e.g. `fetch users 2`
    pub events: Vec<String>,
    /// Send `true` on this channel after the given number of fetches
    pub shutdown_after: Option<(u64, watch::Sender<bool>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    pub fn table(&self, name: &str) -> &MemoryTable {
        &self.tables[name]
    }

    pub fn count_events(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn begin_table<'a>(&'a mut self, plan: &TablePlan) -> Result<Box<dyn TableSession + 'a>> {
        let table = plan.table().to_string();
        let working = self.tables.get(&table).cloned().ok_or_else(|| {
            AnonymizerError::Configuration(format!(
                "table '{}': relation does not exist",
                table
            ))
        })?;
        self.events.push(format!("begin {}", table));

        Ok(Box::new(MemorySession {
            store: self,
            shape: plan.shape.clone(),
            columns: Arc::clone(&plan.columns),
            working,
            cursor: None,
            staging: None,
            fetches: 0,
            copies: 0,
        }))
    }
}

struct Staging {
    types: Vec<ColumnType>,
    rows: Vec<Vec<Value>>,
}

struct MemorySession<'a> {
    store: &'a mut MemoryStore,
    shape: TableShape,
    columns: Arc<[String]>,
    working: MemoryTable,
    cursor: Option<std::vec::IntoIter<Vec<Value>>>,
    staging: Option<Staging>,
    fetches: u64,
    copies: u64,
}

impl MemorySession<'_> {
    fn event(&mut self, op: &str, detail: impl std::fmt::Display) {
        let entry = format!("{} {} {}", op, self.shape.table, detail);
        self.store.events.push(entry.trim_end().to_string());
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.working.index_of(column).ok_or_else(|| {
            AnonymizerError::Configuration(format!(
                "table '{}': column \"{}\" does not exist",
                self.shape.table, column
            ))
        })
    }

    fn bad_data(&self, message: impl Into<String>) -> AnonymizerError {
        AnonymizerError::BadDataFormat {
            table: self.shape.table.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl TableSession for MemorySession<'_> {
    async fn count_rows(&mut self) -> Result<u64> {
        self.event("count", "");
        Ok(self.working.rows.len() as u64)
    }

    async fn open_cursor(&mut self) -> Result<()> {
        let indexes = self
            .shape
            .fetch_columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        let projected: Vec<Vec<Value>> = self
            .working
            .rows
            .iter()
            .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
            .collect();
        self.cursor = Some(projected.into_iter());
        self.event("open", "");
        Ok(())
    }

    async fn fetch_batch(&mut self, size: usize) -> Result<Vec<Row>> {
        self.fetches += 1;
        if self.store.failures.fetch == Some((self.shape.table.as_str(), self.fetches)) {
            return Err(AnonymizerError::Connectivity("connection reset".to_string()));
        }

        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| AnonymizerError::Connectivity("cursor is not open".to_string()))?;
        let batch: Vec<Vec<Value>> = cursor.by_ref().take(size).collect();
        let rows = batch
            .into_iter()
            .map(|values| Row::new(Arc::clone(&self.columns), values).expect("row width"))
            .collect::<Vec<_>>();
        self.event("fetch", rows.len());

        if let Some((after, tx)) = &self.store.shutdown_after {
            if self.fetches >= *after {
                let _ = tx.send(true);
            }
        }
        Ok(rows)
    }

    async fn create_staging(&mut self) -> Result<()> {
        let types = self
            .shape
            .staging_columns()
            .iter()
            .map(|c| self.column_index(c).map(|i| self.working.columns[i].1))
            .collect::<Result<Vec<_>>>()?;
        self.staging = Some(Staging {
            types,
            rows: Vec::new(),
        });
        self.event("stage", "");
        Ok(())
    }

    async fn copy_into_staging(&mut self, payload: CopyPayload) -> Result<u64> {
        self.copies += 1;
        if self.store.failures.copy == Some(self.copies) {
            return Err(self.bad_data("invalid byte sequence for encoding \"UTF8\""));
        }

        let text = std::str::from_utf8(&payload.data).map_err(|e| self.bad_data(e.to_string()))?;
        let types = match &self.staging {
            Some(staging) => staging.types.clone(),
            None => return Err(AnonymizerError::Connectivity("no staging table".to_string())),
        };

        let mut parsed = Vec::new();
        for line in text.split_terminator('\n') {
            let fields = split_copy_line(line, payload.delimiter);
            if fields.len() != types.len() {
                return Err(self.bad_data(format!(
                    "expected {} columns, got {}",
                    types.len(),
                    fields.len()
                )));
            }
            let values = fields
                .into_iter()
                .zip(&types)
                .map(|(field, ty)| typed_value(field, *ty))
                .collect::<std::result::Result<Vec<_>, String>>()
                .map_err(|e| self.bad_data(e))?;
            parsed.push(values);
        }

        let loaded = parsed.len() as u64;
        if let Some(staging) = self.staging.as_mut() {
            staging.rows.extend(parsed);
        }
        self.event("copy", loaded);
        Ok(loaded)
    }

    async fn create_staging_index(&mut self) -> Result<()> {
        self.event("index", "");
        Ok(())
    }

    async fn merge_staging(&mut self) -> Result<u64> {
        if self.store.failures.merge {
            return Err(AnonymizerError::Connectivity("server closed the connection".to_string()));
        }

        let key = self.column_index(&self.shape.primary_key)?;
        let targets = self
            .shape
            .rule_columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        let staged = self.staging.take().map(|s| s.rows).unwrap_or_default();

        for (column, position) in self.shape.rule_columns.iter().zip(1..) {
            let violated = self.working.not_null.contains(column)
                && staged.iter().any(|row| row[position] == Value::Null);
            if violated {
                return Err(self.bad_data(format!(
                    "null value in column \"{}\" violates not-null constraint",
                    column
                )));
            }
        }

        let mut merged = 0;
        for row in self.working.rows.iter_mut() {
            if let Some(staged_row) = staged.iter().find(|s| s[0] == row[key]) {
                for (target, value) in targets.iter().zip(&staged_row[1..]) {
                    row[*target] = value.clone();
                }
                merged += 1;
            }
        }
        self.event("merge", merged);
        Ok(merged)
    }

    async fn commit(&mut self) -> Result<()> {
        let table = self.shape.table.clone();
        self.store.tables.insert(table, self.working.clone());
        self.event("commit", "");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.event("rollback", "");
        Ok(())
    }
}

/// Split one line of `COPY` text into unescaped fields; `None` is NULL
///
/// Like PostgreSQL, only a raw field that is exactly `\N` is NULL.
pub fn split_copy_line(line: &str, delimiter: char) -> Vec<Option<String>> {
    raw_fields(line, delimiter)
        .into_iter()
        .map(|raw| if raw == "\\N" { None } else { Some(unescape(&raw)) })
        .collect()
}

fn raw_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if c == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn typed_value(field: Option<String>, ty: ColumnType) -> std::result::Result<Value, String> {
    let Some(text) = field else {
        return Ok(Value::Null);
    };
    match ty {
        ColumnType::Text => Ok(Value::Text(text)),
        ColumnType::Integer => text
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid input syntax for type integer: \"{}\"", text)),
        ColumnType::Boolean => match text.as_str() {
            "t" | "true" => Ok(Value::Boolean(true)),
            "f" | "false" => Ok(Value::Boolean(false)),
            _ => Err(format!("invalid input syntax for type boolean: \"{}\"", text)),
        },
        ColumnType::Json => serde_json::from_str(&text)
            .map(Value::Structured)
            .map_err(|e| format!("invalid input syntax for type json: {}", e)),
    }
}
