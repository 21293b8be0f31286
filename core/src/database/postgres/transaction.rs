use async_trait::async_trait;
use tokio_postgres::Client;
use tracing::{debug, error, warn};

use crate::database::{
    named_params::{bind_named, NamedParams},
    postgres::client::{as_sql_params, PostgresPool},
    store::{StoreError, StoreTransaction},
};

// Postgres aborts the whole transaction on the first failing statement, so each statement
// runs behind this savepoint and a failure only unwinds that statement.
const STATEMENT_SAVEPOINT: &str = "waybill_statement";

/// A transaction on a connection of its own. The connection joins the pool only after a clean
/// `COMMIT` or `ROLLBACK`; when closing fails it is dropped, which closes the session.
pub struct PostgresTransaction {
    client: Option<Client>,
    pool: PostgresPool,
}

/// Hands a connection whose transaction ended cleanly to the pool. A full pool drops it.
fn release(pool: &PostgresPool, client: Client) {
    if pool.add(client).is_err() {
        debug!("Pool is full, closing transaction connection");
    }
}

impl PostgresTransaction {
    pub(crate) fn new(client: Client, pool: PostgresPool) -> Self {
        Self { client: Some(client), pool }
    }

    fn client(&self) -> Result<&Client, StoreError> {
        self.client.as_ref().ok_or(StoreError::TransactionClosed)
    }

    async fn finish(&mut self, statement: &str) -> Result<(), StoreError> {
        let client = self.client.take().ok_or(StoreError::TransactionClosed)?;

        match client.batch_execute(statement).await {
            Ok(()) => {
                release(&self.pool, client);
                Ok(())
            }
            Err(e) => {
                error!("{} failed, discarding the connection: {}", statement, e);
                drop(client);
                Err(StoreError::PgError(e))
            }
        }
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, params: &NamedParams) -> Result<u64, StoreError> {
        let bound = bind_named(sql, params)?;
        let client = self.client()?;

        client.batch_execute(&format!("SAVEPOINT {}", STATEMENT_SAVEPOINT)).await?;

        match client.execute(bound.sql.as_str(), &as_sql_params(&bound.params)).await {
            Ok(count) => {
                client
                    .batch_execute(&format!("RELEASE SAVEPOINT {}", STATEMENT_SAVEPOINT))
                    .await?;
                Ok(count)
            }
            Err(e) => {
                if let Err(unwind_error) = client
                    .batch_execute(&format!("ROLLBACK TO SAVEPOINT {}", STATEMENT_SAVEPOINT))
                    .await
                {
                    error!("Could not unwind failed statement: {}", unwind_error);
                }
                Err(StoreError::PgError(e))
            }
        }
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.finish("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };

        warn!("Transaction dropped before commit or rollback - rolling back");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.pool.clone();
                handle.spawn(async move {
                    match client.batch_execute("ROLLBACK").await {
                        Ok(()) => release(&pool, client),
                        Err(e) => error!("Rollback of dropped transaction failed: {}", e),
                    }
                });
            }
            Err(_) => {
                // dropping the client closes the session, which ends the transaction
                error!("No runtime available to roll back dropped transaction");
            }
        }
    }
}
