use std::sync::Arc;

use chrono::NaiveDate;
use waybill::{dispatch_summary, filter::parse_filters, manifest::Manifest, DocumentQueryService};

use crate::{
    commands::{connect, parse_filter_map},
    console::{print_error_message, print_json},
};

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), String> {
    if from > to {
        let message = format!("--from {} is after --to {}", from, to);
        print_error_message(&message);
        return Err(message);
    }
    Ok(())
}

pub async fn handle_documents_command(
    manifest: &Manifest,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), Box<dyn std::error::Error>> {
    check_range(from, to)?;

    let client = Arc::new(connect(manifest).await?);
    let service = DocumentQueryService::with_settings(client, &manifest.documents);

    let rows = service.delivery_documents_between(from, to).await.map_err(|e| {
        print_error_message(&format!("Could not fetch delivery documents: {}", e));
        e
    })?;

    print_json(&rows)?;
    Ok(())
}

pub async fn handle_scheduled_command(
    manifest: &Manifest,
    date: NaiveDate,
    filters: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filters = match filters {
        Some(raw) => {
            let map = parse_filter_map(raw).map_err(|e| {
                print_error_message(&e);
                e
            })?;
            parse_filters(&map).map_err(|e| {
                print_error_message(&format!("Invalid filters: {}", e));
                e
            })?
        }
        None => vec![],
    };

    let client = Arc::new(connect(manifest).await?);
    let service = DocumentQueryService::with_settings(client, &manifest.documents);

    let rows = service.scheduled_for(date, &filters).await.map_err(|e| {
        print_error_message(&format!("Could not fetch scheduled documents: {}", e));
        e
    })?;

    print_json(&rows)?;
    Ok(())
}

pub async fn handle_dispatch_summary_command(
    manifest: &Manifest,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), Box<dyn std::error::Error>> {
    check_range(from, to)?;

    let client = Arc::new(connect(manifest).await?);
    let service = DocumentQueryService::with_settings(client, &manifest.documents);

    let rows = service.delivery_documents_between(from, to).await.map_err(|e| {
        print_error_message(&format!("Could not fetch delivery documents: {}", e));
        e
    })?;

    if rows.is_empty() {
        let message = format!("No delivery documents found from {} to {}", from, to);
        print_error_message(&message);
        return Err(message.into());
    }

    print_json(&dispatch_summary(&rows, &manifest.documents.payment_terms))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        let first = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

        assert!(check_range(first, last).is_ok());
        assert!(check_range(first, first).is_ok());
        assert!(check_range(last, first).unwrap_err().contains("is after"));
    }
}
