//! Read side: searches delivery documents joined with their route, driver, status and vehicle.

mod dispatch;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    database::{
        named_params::NamedParams,
        sql_value::SqlValue,
        store::{QueryExecutor, RowSet, StoreError},
    },
    filter::{compile, parse_filters, FilterCondition, Operator, ValidationError},
    manifest::DocumentSettings,
};

pub use dispatch::{dispatch_summary, format_dispatch_time, DispatchTimeSummary};

const DOCUMENTS_SELECT: &str = r#"
SELECT
    d.id AS doc_id,
    d.company AS doc_company,
    CONCAT(d.guide_series, '-', d.guide_number) AS doc_guide_number,
    CONCAT(d.invoice_series, '-', d.invoice_number) AS doc_invoice_number,
    d.created_at AS doc_created_at,
    DATE(d.guide_delivery_date) AS doc_guide_delivery_date,
    DATE(d.guide_scheduled_date) AS doc_guide_scheduled_date,
    d.customer_name AS doc_customer_name,
    d.payment_terms AS doc_payment_terms,
    d.carrier_agency AS doc_carrier_agency,
    d.salesperson AS doc_salesperson,
    d.foreign_amount AS doc_foreign_amount,
    d.total_weight AS doc_total_weight,
    d.exception AS doc_exception,
    d.reason AS doc_reason,
    d.package_count AS doc_package_count,
    rd.arrival_time AS rd_arrival_time,
    rd.departure_time AS rd_departure_time,
    DATE(rd.scheduled_at) AS rd_scheduled_date,
    r.id AS route_id,
    r.started_at AS route_started_at,
    r.returned_at AS route_returned_at,
    r.departure_place AS route_departure_place,
    DATE(r.scheduled_at) AS route_scheduled_date,
    v.plate AS vehicle_plate,
    status.description AS status_description,
    CONCAT(driver.display_name, ' ', driver.last_name) AS driver_full_name
FROM documents AS d
LEFT JOIN route_details AS rd ON rd.document_id = d.id
LEFT JOIN routes AS r ON r.id = rd.route_id
LEFT JOIN users AS driver ON driver.id = r.driver_id
LEFT JOIN order_statuses AS status ON status.id = rd.status_id
LEFT JOIN vehicles AS v ON v.id = r.vehicle_id"#;

#[derive(thiserror::Error, Debug)]
pub enum DocumentQueryError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error(
        "Refusing to query documents without any condition - pass `TRUE` as a base condition to \
         scan everything"
    )]
    Unrestricted,

    #[error("{0}")]
    Store(#[from] StoreError),
}

pub struct DocumentQueryService<E: QueryExecutor> {
    store: Arc<E>,
    delivery_reasons: Vec<String>,
}

impl<E: QueryExecutor> DocumentQueryService<E> {
    pub fn new(store: Arc<E>) -> Self {
        Self::with_settings(store, &DocumentSettings::default())
    }

    pub fn with_settings(store: Arc<E>, settings: &DocumentSettings) -> Self {
        Self { store, delivery_reasons: settings.delivery_reasons.clone() }
    }

    /// Builds the document search with `base_conditions` and `filters` as its `WHERE`.
    pub fn build_query(
        base_conditions: &[&str],
        filters: &[FilterCondition],
    ) -> Result<(String, NamedParams), DocumentQueryError> {
        let predicate = compile(base_conditions, filters);
        let where_clause = predicate.where_clause().ok_or(DocumentQueryError::Unrestricted)?;

        Ok((format!("{}\nWHERE {}", DOCUMENTS_SELECT.trim_start(), where_clause), predicate.params))
    }

    pub async fn query_documents(
        &self,
        base_conditions: &[&str],
        filters: &[FilterCondition],
    ) -> Result<RowSet, DocumentQueryError> {
        let (sql, params) = Self::build_query(base_conditions, filters)?;

        info!(
            "Querying documents with filters: {:?}",
            filters.iter().map(|f| f.key()).collect::<Vec<_>>()
        );
        Ok(self.store.query(&sql, &params).await?)
    }

    /// Same as [`Self::query_documents`] with a string-keyed filter map such as
    /// `{"d.reason__in": ["VENTA"], "v.plate__like": "%ABC%"}`.
    pub async fn query_documents_json(
        &self,
        base_conditions: &[&str],
        filters: &Map<String, Value>,
    ) -> Result<RowSet, DocumentQueryError> {
        let conditions = parse_filters(filters)?;
        self.query_documents(base_conditions, &conditions).await
    }

    /// Delivery documents created between `start` and `end`, both inclusive.
    pub async fn delivery_documents_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RowSet, DocumentQueryError> {
        let filters = vec![
            FilterCondition::new("DATE(d.created_at)", Operator::Gte, SqlValue::Date(start))?,
            FilterCondition::new("DATE(d.created_at)", Operator::Lte, SqlValue::Date(end))?,
            FilterCondition::is_in("d.reason", self.delivery_reasons.iter().map(String::as_str))?,
        ];

        info!("Fetching delivery documents from {} to {}", start, end);
        self.query_documents(&[], &filters).await
    }

    /// Documents on routes scheduled for `date`, narrowed by any extra `filters`.
    pub async fn scheduled_for(
        &self,
        date: NaiveDate,
        filters: &[FilterCondition],
    ) -> Result<RowSet, DocumentQueryError> {
        let mut conditions = vec![FilterCondition::eq("DATE(r.scheduled_at)", date)?];
        conditions.extend_from_slice(filters);

        self.query_documents(&[], &conditions).await
    }
}
