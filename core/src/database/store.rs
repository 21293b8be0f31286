use async_trait::async_trait;
use bb8::RunError;
use serde_json::{Map, Value};

use crate::database::named_params::{BindError, NamedParams};

/// One row keyed by column name (or alias).
pub type Record = Map<String, Value>;

pub type RowSet = Vec<Record>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("PgError {0}")]
    PgError(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] RunError<tokio_postgres::Error>),

    #[error("{0}")]
    BindError(#[from] BindError),

    #[error("Transaction has already been committed or rolled back")]
    TransactionClosed,

    #[error("{0}")]
    Execution(String),
}

/// Read path and transaction factory of the relational store.
///
/// Implementations own connection lifecycle; callers only see named-parameter SQL.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str, params: &NamedParams) -> Result<RowSet, StoreError>;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// An open transaction exclusively owned by its caller.
///
/// Dropping a transaction that was neither committed nor rolled back must roll it back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Executes a mutation and returns the number of affected rows. A failed statement
    /// must leave the transaction usable for the statements that follow it.
    async fn execute(&mut self, sql: &str, params: &NamedParams) -> Result<u64, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}
