pub mod client;
mod rows;
mod transaction;

pub use client::{PostgresClient, PostgresConnectionError};
pub use transaction::PostgresTransaction;
