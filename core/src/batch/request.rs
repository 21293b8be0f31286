use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::sql_value::SqlValue;

/// Business identifier locating the record to update, e.g. invoice series and number.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalKey {
    pub parts: Vec<(String, SqlValue)>,
}

impl NaturalKey {
    pub fn new(parts: Vec<(String, SqlValue)>) -> Self {
        Self { parts }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.parts.iter().map(|(_, value)| value.to_string()).collect();
        write!(f, "{}", rendered.join("-"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: SqlValue,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self { column: column.into(), value: value.into() }
    }
}

/// Sparse update of one record: only the listed assignments are written.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub key: NaturalKey,
    pub assignments: Vec<Assignment>,
}

impl UpdateRequest {
    pub fn new(key: NaturalKey, assignments: Vec<Assignment>) -> Self {
        Self { key, assignments }
    }

    pub fn id(&self) -> String {
        self.key.to_string()
    }
}

/// Guide (waybill) details to attach to an invoice. Fields left out are not touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuideUpdateRequest {
    pub invoice_series: String,
    pub invoice_number: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_series: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_issue_date: Option<NaiveDate>,

    /// Also written as the guide delivery date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_scheduled_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_agency: Option<String>,
}

impl GuideUpdateRequest {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(vec![
            ("invoice_series".to_string(), SqlValue::from(self.invoice_series.as_str())),
            ("invoice_number".to_string(), SqlValue::Int(self.invoice_number)),
        ])
    }

    pub fn into_update_request(self) -> UpdateRequest {
        let key = self.natural_key();
        let mut assignments = Vec::new();

        if let Some(number) = self.guide_number {
            assignments.push(Assignment::new("guide_number", number));
        }
        if let Some(series) = self.guide_series {
            assignments.push(Assignment::new("guide_series", series));
        }
        if let Some(issued) = self.guide_issue_date {
            assignments.push(Assignment::new("guide_issue_date", issued));
        }
        if let Some(scheduled) = self.guide_scheduled_date {
            assignments.push(Assignment::new("guide_delivery_date", scheduled));
            assignments.push(Assignment::new("guide_scheduled_date", scheduled));
        }
        if let Some(agency) = self.carrier_agency {
            assignments.push(Assignment::new("carrier_agency", agency));
        }

        UpdateRequest::new(key, assignments)
    }
}

impl From<GuideUpdateRequest> for UpdateRequest {
    fn from(request: GuideUpdateRequest) -> Self {
        request.into_update_request()
    }
}
