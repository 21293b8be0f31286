//! In-memory store used by tests. Understands the `UPDATE <table> SET col = :p, ... WHERE
//! col = :p AND ...` statements the batch updater emits and returns canned rows for reads.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::{
    named_params::{bind_named, BindError, NamedParams},
    sql_value::SqlValue,
    store::{QueryExecutor, RowSet, StoreError, StoreTransaction},
};

pub type MemoryRow = BTreeMap<String, SqlValue>;

static UPDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*UPDATE\s+(\S+)\s+SET\s+(.+?)\s+WHERE\s+(.+?)\s*$").unwrap()
});

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s*=\s*:(\w+)\s*$").unwrap());

#[derive(Debug, Default)]
pub struct Counters {
    pub begun: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub released: AtomicUsize,
    pub executed: AtomicUsize,
}

#[derive(Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<MemoryRow>>>,
    unique: Vec<String>,
    fail_on_begin: bool,
    fail_on_commit: bool,
    execute_delay: Option<Duration>,
    canned: RowSet,
    queries: Mutex<Vec<(String, NamedParams)>>,
    pub counters: Arc<Counters>,
}

impl MemoryStore {
    pub fn new(rows: Vec<MemoryRow>) -> Self {
        Self { rows: Arc::new(Mutex::new(rows)), ..Default::default() }
    }

    /// Statements leaving two rows with the same value in `column` fail.
    pub fn with_unique(mut self, column: &str) -> Self {
        self.unique.push(column.to_string());
        self
    }

    pub fn fail_on_begin(mut self) -> Self {
        self.fail_on_begin = true;
        self
    }

    pub fn fail_on_commit(mut self) -> Self {
        self.fail_on_commit = true;
        self
    }

    /// Every statement sleeps before running, so callers can be timed out mid-batch.
    pub fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = Some(delay);
        self
    }

    pub fn with_rows_for_query(mut self, rows: RowSet) -> Self {
        self.canned = rows;
        self
    }

    pub fn rows(&self) -> Vec<MemoryRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<(String, NamedParams)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub fn row(values: &[(&str, SqlValue)]) -> MemoryRow {
    values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[async_trait]
impl QueryExecutor for MemoryStore {
    async fn query(&self, sql: &str, params: &NamedParams) -> Result<RowSet, StoreError> {
        bind_named(sql, params)?;
        self.queries.lock().unwrap().push((sql.to_string(), params.clone()));
        Ok(self.canned.clone())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        if self.fail_on_begin {
            return Err(StoreError::Execution("connection refused".to_string()));
        }

        self.counters.begun.fetch_add(1, Ordering::SeqCst);
        let staged = self.rows.lock().unwrap().clone();

        Ok(Box::new(MemoryTransaction {
            target: Arc::clone(&self.rows),
            staged,
            unique: self.unique.clone(),
            fail_on_commit: self.fail_on_commit,
            execute_delay: self.execute_delay,
            counters: Arc::clone(&self.counters),
            open: true,
        }))
    }
}

struct MemoryTransaction {
    target: Arc<Mutex<Vec<MemoryRow>>>,
    staged: Vec<MemoryRow>,
    unique: Vec<String>,
    fail_on_commit: bool,
    execute_delay: Option<Duration>,
    counters: Arc<Counters>,
    open: bool,
}

fn parse_pairs(
    clause: &str,
    separator: &str,
    params: &NamedParams,
) -> Result<Vec<(String, SqlValue)>, StoreError> {
    clause
        .split(separator)
        .map(|part| -> Result<(String, SqlValue), StoreError> {
            let captures = ASSIGNMENT
                .captures(part)
                .ok_or_else(|| StoreError::Execution(format!("syntax error near `{}`", part)))?;
            let value = params
                .get(&captures[2])
                .ok_or_else(|| BindError::MissingParameter(captures[2].to_string()))?;
            Ok((captures[1].to_string(), value.clone()))
        })
        .collect()
}

impl MemoryTransaction {
    fn finish(&mut self) -> Result<(), StoreError> {
        if !self.open {
            return Err(StoreError::TransactionClosed);
        }
        self.open = false;
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn execute(&mut self, sql: &str, params: &NamedParams) -> Result<u64, StoreError> {
        if !self.open {
            return Err(StoreError::TransactionClosed);
        }
        bind_named(sql, params)?;
        if let Some(delay) = self.execute_delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.executed.fetch_add(1, Ordering::SeqCst);

        let captures = UPDATE
            .captures(sql)
            .ok_or_else(|| StoreError::Execution(format!("unsupported statement: {}", sql)))?;
        let assignments = parse_pairs(&captures[2], ",", params)?;
        let key = parse_pairs(&captures[3], " AND ", params)?;

        let mut next = self.staged.clone();
        let mut affected = 0;
        for row in next.iter_mut() {
            if key.iter().all(|(column, value)| row.get(column) == Some(value)) {
                for (column, value) in &assignments {
                    row.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }

        for column in &self.unique {
            let mut seen = Vec::new();
            for value in next.iter().filter_map(|row| row.get(column)) {
                if value.is_null() {
                    continue;
                }
                if seen.contains(&value) {
                    return Err(StoreError::Execution(format!(
                        "duplicate key value violates unique constraint on {}",
                        column
                    )));
                }
                seen.push(value);
            }
        }

        self.staged = next;
        Ok(affected)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.finish()?;
        if self.fail_on_commit {
            return Err(StoreError::Execution("server closed the connection".to_string()));
        }
        *self.target.lock().unwrap() = std::mem::take(&mut self.staged);
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.finish()?;
        self.staged.clear();
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
