use std::env;

use async_trait::async_trait;
use bb8::{Pool, RunError};
use bb8_postgres::PostgresConnectionManager;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::{task, time::timeout};
use tokio_postgres::{config::SslMode, types::ToSql, Config};
use tracing::{debug, error, info};

use crate::database::{
    named_params::{bind_named, NamedParams},
    postgres::{rows::row_to_record, transaction::PostgresTransaction},
    sql_value::SqlValue,
    store::{QueryExecutor, RowSet, StoreError, StoreTransaction},
};
use crate::manifest::DatabaseDetails;

#[derive(thiserror::Error, Debug)]
pub enum PostgresConnectionError {
    #[error("The database connection string is wrong please check your environment: {0}")]
    DatabaseConnectionConfigWrong(#[from] env::VarError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] tokio_postgres::Error),

    #[error("Connection pool runtime error: {0}")]
    ConnectionPoolRuntimeError(#[from] RunError<tokio_postgres::Error>),

    #[error("Can not connect to the database please make sure your connection string is correct")]
    CanNotConnectToDatabase,

    #[error("Could not parse connection string make sure it is correctly formatted")]
    CouldNotParseConnectionString,

    #[error("Could not create tls connector")]
    CouldNotCreateTlsConnector,
}

pub(crate) fn as_sql_params<'a>(values: &'a [&'a SqlValue]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|value| *value as &(dyn ToSql + Sync)).collect()
}

pub(crate) type PostgresPool = Pool<PostgresConnectionManager<MakeTlsConnector>>;

pub struct PostgresClient {
    pool: PostgresPool,
}

impl PostgresClient {
    pub async fn new(details: &DatabaseDetails) -> Result<Self, PostgresConnectionError> {
        async fn _new(
            details: &DatabaseDetails,
            disable_ssl: bool,
        ) -> Result<PostgresClient, PostgresConnectionError> {
            let connection_str = details.connection_string()?;
            let mut config: Config = connection_str
                .parse()
                .map_err(|_| PostgresConnectionError::CouldNotParseConnectionString)?;

            if disable_ssl {
                config.ssl_mode(SslMode::Disable);
            }

            let connector = TlsConnector::builder()
                .build()
                .map_err(|_| PostgresConnectionError::CouldNotCreateTlsConnector)?;
            let tls_connector = MakeTlsConnector::new(connector);

            // Perform a direct connection test
            let (client, connection) =
                match timeout(details.connect_timeout(), config.connect(tls_connector.clone()))
                    .await
                {
                    Ok(Ok((client, connection))) => (client, connection),
                    Ok(Err(e)) => {
                        // retry without ssl if ssl has been attempted and failed
                        if !disable_ssl
                            && config.get_ssl_mode() != SslMode::Disable
                            && !connection_str.contains("sslmode=require")
                        {
                            return Box::pin(_new(details, true)).await;
                        }
                        error!("Error connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                    Err(e) => {
                        error!("Timeout connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                };

            let connection_handle = task::spawn(connection);

            if client.query_one("SELECT 1", &[]).await.is_err() {
                return Err(PostgresConnectionError::CanNotConnectToDatabase);
            }

            drop(client);
            match connection_handle.await {
                Ok(Ok(())) => (),
                Ok(Err(_)) => return Err(PostgresConnectionError::CanNotConnectToDatabase),
                Err(_) => return Err(PostgresConnectionError::CanNotConnectToDatabase),
            }

            let manager = PostgresConnectionManager::new(config, tls_connector);

            let pool = Pool::builder().max_size(details.max_connections()).build(manager).await?;

            info!("Connected to postgres (pool size {})", details.max_connections());

            Ok(PostgresClient { pool })
        }

        _new(details, details.disable_ssl.unwrap_or(false)).await
    }

    pub async fn batch_execute(&self, sql: &str) -> Result<(), StoreError> {
        let conn = self.pool.get().await?;
        conn.batch_execute(sql).await.map_err(StoreError::PgError)
    }
}

#[async_trait]
impl QueryExecutor for PostgresClient {
    async fn query(&self, sql: &str, params: &NamedParams) -> Result<RowSet, StoreError> {
        let bound = bind_named(sql, params)?;
        debug!("Query: {} ({} params)", bound.sql, bound.params.len());

        let conn = self.pool.get().await?;
        let rows = conn.query(bound.sql.as_str(), &as_sql_params(&bound.params)).await?;

        let records = rows.iter().map(row_to_record).collect::<Result<RowSet, _>>()?;
        info!("Query returned {} rows", records.len());
        Ok(records)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        // a connection outside the pool, so one left in an unknown state is never reused
        let client = self.pool.dedicated_connection().await?;
        client.batch_execute("BEGIN").await?;

        Ok(Box::new(PostgresTransaction::new(client, self.pool.clone())))
    }
}
