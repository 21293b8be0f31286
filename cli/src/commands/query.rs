use std::sync::Arc;

use waybill::{manifest::Manifest, DocumentQueryService};

use crate::{
    commands::{connect, parse_filter_map},
    console::{print_error_message, print_json},
};

pub async fn handle_query_command(
    manifest: &Manifest,
    filters: &str,
    base: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let filters = parse_filter_map(filters).map_err(|e| {
        print_error_message(&e);
        e
    })?;

    let client = Arc::new(connect(manifest).await?);
    let service = DocumentQueryService::with_settings(client, &manifest.documents);

    let base: Vec<&str> = base.iter().map(String::as_str).collect();
    let rows = service.query_documents_json(&base, &filters).await.map_err(|e| {
        print_error_message(&format!("Document query failed: {}", e));
        e
    })?;

    print_json(&rows)?;
    Ok(())
}
