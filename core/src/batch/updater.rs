use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    batch::{
        outcome::{aggregate, BatchResult, UpdateOutcome},
        request::UpdateRequest,
        statement::{StatementError, UpdateStatement},
    },
    database::store::{QueryExecutor, StoreError, StoreTransaction},
    filter::{is_valid_identifier, ValidationError},
};

#[derive(thiserror::Error, Debug)]
enum RecordError {
    #[error("{0}")]
    Statement(#[from] StatementError),

    #[error("no rows matched")]
    NoMatch,

    #[error("{0}")]
    Execution(#[from] StoreError),
}

/// Applies sparse updates to the records named by their natural keys, all inside one
/// transaction.
pub struct BatchUpdater<E: QueryExecutor> {
    store: Arc<E>,
    table: String,
}

impl<E: QueryExecutor> BatchUpdater<E> {
    pub fn new(store: Arc<E>, table: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(ValidationError::InvalidIdentifier(table));
        }

        Ok(Self { store, table })
    }

    /// Runs every request in order, then commits when no record failed and rolls back
    /// otherwise. Records that matched nothing are warnings and do not prevent the commit.
    ///
    /// Never returns an error: every problem ends up in the [`BatchResult`]. If the returned
    /// future is dropped before completion the open transaction is rolled back.
    pub async fn apply_batch(&self, requests: &[UpdateRequest]) -> BatchResult {
        if requests.is_empty() {
            debug!("Empty batch, nothing to apply");
            return aggregate(&[]);
        }

        let mut transaction = match self.store.begin().await {
            Ok(transaction) => transaction,
            Err(e) => {
                error!("Could not begin batch transaction: {}", e);
                let outcomes: Vec<UpdateOutcome> = requests
                    .iter()
                    .map(|request| {
                        UpdateOutcome::failed(request.id(), format!("transaction error: {}", e))
                    })
                    .collect();
                return aggregate(&outcomes);
            }
        };

        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.apply_one(transaction.as_mut(), request).await);
        }

        let result = aggregate(&outcomes);

        if result.has_failures() {
            warn!(
                "Rolling back batch of {} requests - {} failed",
                requests.len(),
                result.errors.len()
            );
            if let Err(e) = transaction.rollback().await {
                error!("Rollback of batch transaction failed: {}", e);
                return result.with_transaction_failure(format!("rollback failed: {}", e));
            }
            return result;
        }

        match transaction.commit().await {
            Ok(()) => {
                info!(
                    "Committed batch - {} applied, {} not found",
                    result.applied_count,
                    result.warnings.len()
                );
                BatchResult { committed: true, ..result }
            }
            Err(e) => {
                error!("Commit of batch transaction failed: {}", e);
                result.with_transaction_failure(format!("commit failed: {}", e))
            }
        }
    }

    async fn apply_one(
        &self,
        transaction: &mut dyn StoreTransaction,
        request: &UpdateRequest,
    ) -> UpdateOutcome {
        let id = request.id();

        match self.execute_update(transaction, request).await {
            Ok(affected) => {
                debug!("Updated {} row(s) for {}", affected, id);
                UpdateOutcome::applied(id)
            }
            Err(RecordError::NoMatch) => {
                let message = format!("no document found for {}; no rows were updated", id);
                warn!("{}", message);
                UpdateOutcome::skipped(id, message)
            }
            Err(RecordError::Statement(StatementError::NothingToUpdate)) => {
                warn!("Request {} sets no fields", id);
                UpdateOutcome::failed(id, StatementError::NothingToUpdate.to_string())
            }
            Err(e) => {
                let message = format!("error updating guide for invoice {}: {}", id, e);
                error!("{}", message);
                UpdateOutcome::failed(id, message)
            }
        }
    }

    async fn execute_update(
        &self,
        transaction: &mut dyn StoreTransaction,
        request: &UpdateRequest,
    ) -> Result<u64, RecordError> {
        let statement = UpdateStatement::build(&self.table, request)?;

        let affected = transaction.execute(&statement.sql, &statement.params).await?;
        if affected == 0 {
            return Err(RecordError::NoMatch);
        }

        Ok(affected)
    }
}
