mod apply;
mod documents;
mod query;

pub use apply::handle_apply_command;
pub use documents::{
    handle_dispatch_summary_command, handle_documents_command, handle_scheduled_command,
};
pub use query::handle_query_command;

use waybill::{manifest::Manifest, PostgresClient, PostgresConnectionError};

use crate::console::print_error_message;

pub(crate) async fn connect(
    manifest: &Manifest,
) -> Result<PostgresClient, PostgresConnectionError> {
    PostgresClient::new(&manifest.database).await.map_err(|e| {
        print_error_message(&format!(
            "Could not connect to Postgres, make sure `database.url` or DATABASE_URL is set \
             correctly: trace: {}",
            e
        ));
        e
    })
}

/// Parses a JSON object given on the command line.
pub(crate) fn parse_filter_map(
    raw: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("Filters must be a JSON object, got: {}", other)),
        Err(e) => Err(format!("Could not parse filters as JSON: {}", e)),
    }
}
