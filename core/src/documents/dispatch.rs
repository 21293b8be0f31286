//! Average dispatch time per payment term, from the rows of a delivery document search.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{database::store::RowSet, manifest::PaymentTerms};

const CREATED_AT: &str = "doc_created_at";
const DEPARTED_AT: &str = "rd_departure_time";
const PAYMENT_TERMS: &str = "doc_payment_terms";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchTimeSummary {
    pub payment_terms: String,
    pub record_count: usize,
    /// Configured deadline for the term, `None` when the term is not in the table.
    pub deadline_hours: Option<u32>,
    /// `DD Días HH Hrs MM Mins`
    pub average_dispatch_time: String,
    pub average_dispatch_seconds: i64,
    /// Share of the dispatched documents that carry this term.
    pub percentage: f64,
    /// Share of the dispatched documents whose term has the same deadline.
    pub deadline_bucket_percentage: Option<f64>,
}

#[derive(Default)]
struct Group {
    count: usize,
    total_seconds: i64,
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?;

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.naive_utc());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Formats whole days, hours and minutes. Days are floored, so a negative duration keeps
/// positive hours and minutes (`-1 Días 23 Hrs 00 Mins` for one hour early).
pub fn format_dispatch_time(seconds: i64) -> String {
    let days = seconds.div_euclid(86_400);
    let rest = seconds.rem_euclid(86_400);

    format!("{:02} Días {:02} Hrs {:02} Mins", days, rest / 3_600, (rest % 3_600) / 60)
}

/// Groups dispatched documents by payment term.
///
/// Rows without a departure time (or without a creation time) were never dispatched and are left
/// out entirely. Rows without a payment term still count towards the total the percentages are
/// taken from but do not form a group. Groups come back sorted by payment term.
pub fn dispatch_summary(rows: &RowSet, terms: &PaymentTerms) -> Vec<DispatchTimeSummary> {
    let mut total = 0usize;
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();

    for row in rows {
        let departed = row.get(DEPARTED_AT).and_then(parse_timestamp);
        let created = row.get(CREATED_AT).and_then(parse_timestamp);
        let (Some(departed), Some(created)) = (departed, created) else {
            continue;
        };

        total += 1;

        let Some(term) = row.get(PAYMENT_TERMS).and_then(Value::as_str) else {
            debug!("Dispatched document without payment terms: {:?}", row.get("doc_id"));
            continue;
        };

        let group = groups.entry(term.to_string()).or_default();
        group.count += 1;
        group.total_seconds += (departed - created).num_seconds();
    }

    if total == 0 {
        return vec![];
    }

    let percentage = |count: usize| count as f64 / total as f64 * 100.0;

    let mut buckets: BTreeMap<u32, f64> = BTreeMap::new();
    for (term, group) in &groups {
        if let Some(hours) = terms.deadline_hours(term) {
            *buckets.entry(hours).or_default() += percentage(group.count);
        }
    }

    info!("Summarized dispatch time of {} documents in {} groups", total, groups.len());

    groups
        .into_iter()
        .map(|(term, group)| {
            let average = group.total_seconds.div_euclid(group.count as i64);
            let deadline_hours = terms.deadline_hours(&term);

            DispatchTimeSummary {
                record_count: group.count,
                deadline_hours,
                average_dispatch_time: format_dispatch_time(average),
                average_dispatch_seconds: average,
                percentage: percentage(group.count),
                deadline_bucket_percentage: deadline_hours
                    .and_then(|hours| buckets.get(&hours).copied()),
                payment_terms: term,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::store::Record;

    fn record(created_at: &str, departed_at: Value, terms: Value) -> Record {
        json!({
            "doc_id": 1,
            "doc_created_at": created_at,
            "rd_departure_time": departed_at,
            "doc_payment_terms": terms,
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_format_dispatch_time() {
        assert_eq!(format_dispatch_time(0), "00 Días 00 Hrs 00 Mins");
        assert_eq!(format_dispatch_time(93_784), "01 Días 02 Hrs 03 Mins");
        assert_eq!(format_dispatch_time(-3_600), "-1 Días 23 Hrs 00 Mins");
    }

    #[test]
    fn test_groups_by_payment_terms() {
        let rows = vec![
            record("2025-01-01T08:00:00", json!("2025-01-01T20:00:00"), json!("PADEL")),
            record("2025-01-01T08:00:00", json!("2025-01-02T08:00:00"), json!("PADEL")),
            record("2025-01-02 10:00:00", json!("2025-01-04 12:30:00"), json!("PA5050")),
            record("2025-01-02T10:00:00+00:00", json!("2025-01-02T11:00:00Z"), json!("CERC")),
        ];

        let summary = dispatch_summary(&rows, &PaymentTerms::default());

        let terms: Vec<_> = summary.iter().map(|s| s.payment_terms.as_str()).collect();
        assert_eq!(terms, vec!["CERC", "PA5050", "PADEL"]);

        let padel = &summary[2];
        assert_eq!(padel.record_count, 2);
        assert_eq!(padel.deadline_hours, Some(24));
        assert_eq!(padel.average_dispatch_seconds, 18 * 3_600);
        assert_eq!(padel.average_dispatch_time, "00 Días 18 Hrs 00 Mins");

        let pa5050 = &summary[1];
        assert_eq!(pa5050.deadline_hours, Some(72));
        assert_eq!(pa5050.average_dispatch_time, "02 Días 02 Hrs 30 Mins");

        assert_eq!(summary[0].average_dispatch_time, "00 Días 01 Hrs 00 Mins");
    }

    #[test]
    fn test_percentages_and_deadline_buckets() {
        let rows = vec![
            record("2025-01-01T08:00:00", json!("2025-01-01T09:00:00"), json!("PADEL")),
            record("2025-01-01T08:00:00", json!("2025-01-01T09:00:00"), json!("PADEL")),
            record("2025-01-01T08:00:00", json!("2025-01-01T09:00:00"), json!("CERC")),
            record("2025-01-01T08:00:00", json!("2025-01-01T09:00:00"), json!("PA5050")),
            // dispatched, no terms: part of the total only
            record("2025-01-01T08:00:00", json!("2025-01-01T09:00:00"), Value::Null),
            // never dispatched: ignored
            record("2025-01-01T08:00:00", Value::Null, json!("PADEL")),
        ];

        let summary = dispatch_summary(&rows, &PaymentTerms::default());
        assert_eq!(summary.len(), 3);

        let by_term = |term: &str| summary.iter().find(|s| s.payment_terms == term).unwrap();

        assert!(close(by_term("PADEL").percentage, 40.0));
        assert!(close(by_term("CERC").percentage, 20.0));
        assert!(close(by_term("PA5050").percentage, 20.0));

        // PADEL and CERC share the 24 hour deadline
        assert!(close(by_term("PADEL").deadline_bucket_percentage.unwrap(), 60.0));
        assert!(close(by_term("CERC").deadline_bucket_percentage.unwrap(), 60.0));
        assert!(close(by_term("PA5050").deadline_bucket_percentage.unwrap(), 20.0));

        let grouped: usize = summary.iter().map(|s| s.record_count).sum();
        assert_eq!(grouped, 4);
    }

    #[test]
    fn test_unknown_terms_have_no_deadline() {
        let rows = vec![
            record("2025-01-01T08:00:00", json!("2025-01-01T09:00:00"), json!("CREDITO 30")),
            record("2025-01-01T08:00:00", json!("2025-01-01T09:00:00"), json!("CERC")),
        ];

        let summary = dispatch_summary(&rows, &PaymentTerms::default());

        let unknown = &summary[1];
        assert_eq!(unknown.payment_terms, "CREDITO 30");
        assert_eq!(unknown.deadline_hours, None);
        assert_eq!(unknown.deadline_bucket_percentage, None);
        assert!(close(unknown.percentage, 50.0));
        assert!(close(summary[0].deadline_bucket_percentage.unwrap(), 50.0));
    }

    #[test]
    fn test_empty_input() {
        assert!(dispatch_summary(&vec![], &PaymentTerms::default()).is_empty());

        let never_dispatched = vec![record("2025-01-01T08:00:00", Value::Null, json!("PADEL"))];
        assert!(dispatch_summary(&never_dispatched, &PaymentTerms::default()).is_empty());
    }

    #[test]
    fn test_summary_json_shape() {
        let rows =
            vec![record("2025-01-01T08:00:00", json!("2025-01-01T09:30:00"), json!("PA72"))];

        let summary = dispatch_summary(&rows, &PaymentTerms::default());
        let value = serde_json::to_value(summary).unwrap();

        assert_eq!(
            value,
            json!([{
                "payment_terms": "PA72",
                "record_count": 1,
                "deadline_hours": 48,
                "average_dispatch_time": "00 Días 01 Hrs 30 Mins",
                "average_dispatch_seconds": 5_400,
                "percentage": 100.0,
                "deadline_bucket_percentage": 100.0,
            }])
        );
    }
}
