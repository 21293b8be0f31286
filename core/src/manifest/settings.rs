use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_update_table() -> String {
    "documents".to_string()
}

fn default_delivery_reasons() -> Vec<String> {
    vec![
        "VENTA".to_string(),
        "VENTA TRANSITO".to_string(),
        "TRASLADO E/ESTABLECIMIENTOS".to_string(),
    ]
}

const DEFAULT_PAYMENT_TERMS: &[(&str, u32)] = &[
    ("Contado contra entrega", 24),
    ("CERC", 24),
    ("FACT 90 - 1", 24),
    ("FACT 90 - 2", 24),
    ("FACT 90 - 3", 48),
    ("FACT 90 - 4", 48),
    ("FACT 90 - 5", 48),
    ("LETRAS 365 - 1", 24),
    ("LETRAS 365 - 3", 24),
    ("LETRAS 365 - 5", 48),
    ("PA5050", 72),
    ("PADEL", 24),
    ("ACUADEL", 24),
    ("PADEL 96", 72),
    ("Pago Adelantado", 24),
    ("PA72", 48),
];

/// Where guide updates are written.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpdateSettings {
    #[serde(default = "default_update_table")]
    pub table: String,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self { table: default_update_table() }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PaymentTermsError {
    #[error("Payment term `{0}` must look like `NAME;HOURS`")]
    MissingSeparator(String),

    #[error("Payment term `{0}` has an empty name")]
    EmptyName(String),

    #[error("Payment term `{term}` has invalid hours `{hours}`")]
    InvalidHours { term: String, hours: String },
}

/// Dispatch deadline in hours per payment term. Written in the manifest as a list of
/// `NAME;HOURS` strings, e.g. `- "PADEL 96;72"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PaymentTerms(BTreeMap<String, u32>);

impl PaymentTerms {
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, PaymentTermsError> {
        let mut terms = BTreeMap::new();

        for entry in entries {
            let entry = entry.as_ref();
            let (name, hours) = entry
                .rsplit_once(';')
                .ok_or_else(|| PaymentTermsError::MissingSeparator(entry.to_string()))?;

            let name = name.trim();
            if name.is_empty() {
                return Err(PaymentTermsError::EmptyName(entry.to_string()));
            }

            let hours = hours.trim().parse::<u32>().map_err(|_| {
                PaymentTermsError::InvalidHours {
                    term: name.to_string(),
                    hours: hours.trim().to_string(),
                }
            })?;

            terms.insert(name.to_string(), hours);
        }

        Ok(Self(terms))
    }

    /// Deadline hours for `term`, `None` when the term is not configured.
    pub fn deadline_hours(&self, term: &str) -> Option<u32> {
        self.0.get(term).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PaymentTerms {
    fn default() -> Self {
        Self(
            DEFAULT_PAYMENT_TERMS
                .iter()
                .map(|(name, hours)| (name.to_string(), *hours))
                .collect(),
        )
    }
}

impl TryFrom<Vec<String>> for PaymentTerms {
    type Error = PaymentTermsError;

    fn try_from(entries: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(&entries)
    }
}

impl From<PaymentTerms> for Vec<String> {
    fn from(terms: PaymentTerms) -> Self {
        terms.0.into_iter().map(|(name, hours)| format!("{};{}", name, hours)).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentSettings {
    /// Document reasons that count as a delivery when listing documents by date range.
    #[serde(default = "default_delivery_reasons")]
    pub delivery_reasons: Vec<String>,

    /// Dispatch deadlines used by the dispatch-time summary.
    #[serde(default)]
    pub payment_terms: PaymentTerms,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            delivery_reasons: default_delivery_reasons(),
            payment_terms: PaymentTerms::default(),
        }
    }
}
