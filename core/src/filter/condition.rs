//! Typed filter conditions. A condition is validated when it is built, so compiling a list of
//! conditions can not fail.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::database::sql_value::SqlValue;
use crate::filter::ValidationError;

const SEGMENT: &str = r#"(?:[A-Za-z_][A-Za-z0-9_]*|"[A-Za-z0-9_ ]+")"#;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{seg}(?:\.{seg}){{0,2}}$", seg = SEGMENT))
        .expect("valid identifier pattern")
});

static COLUMN_EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:[A-Za-z_][A-Za-z0-9_]*\(\s*{seg}(?:\.{seg}){{0,2}}\s*\)|{seg}(?:\.{seg}){{0,2}})$",
        seg = SEGMENT
    ))
    .expect("valid column expression pattern")
});

/// `column`, `alias.column`, `schema.table.column`, optionally double quoted per segment.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// An identifier or a single function call wrapping one, e.g. `DATE(d.created_at)`.
pub fn is_valid_column_expression(expression: &str) -> bool {
    COLUMN_EXPRESSION.is_match(expression)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    In,
    Like,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Operator {
    /// Parses the part of a filter key after the last `__`.
    pub fn from_suffix(suffix: &str) -> Option<Operator> {
        match suffix {
            "eq" => Some(Operator::Eq),
            "in" => Some(Operator::In),
            "like" => Some(Operator::Like),
            "gt" => Some(Operator::Gt),
            "lt" => Some(Operator::Lt),
            "gte" => Some(Operator::Gte),
            "lte" => Some(Operator::Lte),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::In => "in",
            Operator::Like => "like",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
        }
    }

    /// SQL operator for the single-value operators.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::In => "IN",
            Operator::Like => "LIKE",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(SqlValue),
    List(Vec<SqlValue>),
}

impl FilterValue {
    pub fn from_json(key: &str, value: &Value) -> Result<FilterValue, ValidationError> {
        let unsupported = |e: crate::database::sql_value::SqlValueError| {
            ValidationError::UnsupportedValue { key: key.to_string(), reason: e.to_string() }
        };

        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| SqlValue::from_json(item).map_err(unsupported))
                .collect::<Result<Vec<_>, _>>()
                .map(FilterValue::List),
            _ => SqlValue::from_json(value).map(FilterValue::Scalar).map_err(unsupported),
        }
    }
}

impl From<SqlValue> for FilterValue {
    fn from(value: SqlValue) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Vec<SqlValue>> for FilterValue {
    fn from(values: Vec<SqlValue>) -> Self {
        FilterValue::List(values)
    }
}

/// A single `column <operator> value` restriction.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    key: String,
    column: String,
    operator: Operator,
    value: FilterValue,
}

impl FilterCondition {
    pub fn new(
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Result<Self, ValidationError> {
        let column = column.into();
        let key = match operator {
            Operator::Eq => column.clone(),
            _ => format!("{}__{}", column, operator.suffix()),
        };

        Self::build(key, column, operator, value.into())
    }

    pub fn eq(
        column: impl Into<String>,
        value: impl Into<SqlValue>,
    ) -> Result<Self, ValidationError> {
        Self::new(column, Operator::Eq, FilterValue::Scalar(value.into()))
    }

    pub fn is_in(
        column: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<SqlValue>>,
    ) -> Result<Self, ValidationError> {
        let values = values.into_iter().map(Into::into).collect();
        Self::new(column, Operator::In, FilterValue::List(values))
    }

    /// Parses a string-keyed filter such as `d.reason__in` or `DATE(d.created_at)__gte`.
    /// A key without a recognised `__` suffix compares for equality.
    pub fn parse(key: &str, value: &Value) -> Result<Self, ValidationError> {
        if key.trim().is_empty() {
            return Err(ValidationError::EmptyKey);
        }

        let (column, operator) = match key.rsplit_once("__") {
            Some((column, suffix)) => {
                let operator = Operator::from_suffix(suffix).ok_or_else(|| {
                    ValidationError::UnknownOperator {
                        key: key.to_string(),
                        operator: suffix.to_string(),
                    }
                })?;
                (column, operator)
            }
            None => (key, Operator::Eq),
        };

        let value = FilterValue::from_json(key, value)?;
        Self::build(key.to_string(), column.to_string(), operator, value)
    }

    fn build(
        key: String,
        column: String,
        operator: Operator,
        value: FilterValue,
    ) -> Result<Self, ValidationError> {
        if !is_valid_column_expression(&column) {
            return Err(ValidationError::InvalidColumn(column));
        }

        match (&operator, &value) {
            (Operator::In, FilterValue::Scalar(_)) => {
                return Err(ValidationError::ExpectedList { key, operator });
            }
            (Operator::In, FilterValue::List(_)) => {}
            (_, FilterValue::List(_)) => {
                return Err(ValidationError::ExpectedScalar { key, operator });
            }
            (_, FilterValue::Scalar(_)) => {}
        }

        Ok(Self { key, column, operator, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }
}
