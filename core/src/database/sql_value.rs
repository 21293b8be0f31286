use std::{fmt, str::FromStr};

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};
use serde_json::Value;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type as PgType};

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

static TIMESTAMP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?$")
        .expect("valid timestamp pattern")
});

const TEXT_TYPES: [PgType; 4] = [PgType::TEXT, PgType::VARCHAR, PgType::BPCHAR, PgType::NAME];

#[derive(thiserror::Error, Debug)]
pub enum SqlValueError {
    #[error("Can not bind {value} to a column of type {column_type}")]
    TypeMismatch { value: String, column_type: String },

    #[error("Unsupported JSON value {0} - only scalars can be bound as parameters")]
    UnsupportedJson(String),

    #[error("Numeric value {0} can not be represented")]
    NumericOutOfRange(String),
}

/// A single value bound to a named SQL parameter.
///
/// Binding adapts to the column type the server reports for the placeholder, so an `Int`
/// can land in `INT2`, `INT4`, `INT8` or `NUMERIC` columns and a `Text` holding an ISO date
/// can land in a `DATE` column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Converts a JSON scalar into a bind value. ISO dates and timestamps held in JSON
    /// strings become `Date` and `Timestamp` values.
    pub fn from_json(value: &Value) -> Result<SqlValue, SqlValueError> {
        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::Bool(b) => Ok(SqlValue::Bool(*b)),
            Value::Number(number) => {
                if let Some(i) = number.as_i64() {
                    Ok(SqlValue::Int(i))
                } else if let Some(u) = number.as_u64() {
                    Ok(SqlValue::Decimal(Decimal::from(u)))
                } else if let Some(f) = number.as_f64() {
                    Ok(SqlValue::Float(f))
                } else {
                    Err(SqlValueError::NumericOutOfRange(number.to_string()))
                }
            }
            Value::String(s) => Ok(Self::from_text(s)),
            Value::Array(_) | Value::Object(_) => {
                Err(SqlValueError::UnsupportedJson(value.to_string()))
            }
        }
    }

    fn from_text(s: &str) -> SqlValue {
        if DATE_PATTERN.is_match(s) {
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return SqlValue::Date(date);
            }
        }

        if TIMESTAMP_PATTERN.is_match(s) {
            let normalized = s.replacen(' ', "T", 1);
            let parsed = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f");
            if let Ok(timestamp) = parsed {
                return SqlValue::Timestamp(timestamp);
            }
        }

        SqlValue::Text(s.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    fn mismatch(&self, ty: &PgType) -> Box<dyn std::error::Error + Sync + Send> {
        Box::new(SqlValueError::TypeMismatch {
            value: self.to_string(),
            column_type: ty.name().to_string(),
        })
    }

    fn text_to_sql(
        &self,
        s: &str,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if TEXT_TYPES.contains(ty) {
            return s.to_sql(ty, out);
        }

        if *ty == PgType::DATE {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql(ty, out)
        } else if *ty == PgType::TIMESTAMP {
            NaiveDateTime::parse_from_str(&s.replacen(' ', "T", 1), "%Y-%m-%dT%H:%M:%S%.f")?
                .to_sql(ty, out)
        } else if *ty == PgType::TIMESTAMPTZ {
            DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc).to_sql(ty, out)
        } else if *ty == PgType::INT2 {
            s.parse::<i16>()?.to_sql(ty, out)
        } else if *ty == PgType::INT4 {
            s.parse::<i32>()?.to_sql(ty, out)
        } else if *ty == PgType::INT8 {
            s.parse::<i64>()?.to_sql(ty, out)
        } else if *ty == PgType::NUMERIC {
            Decimal::from_str(s)?.to_sql(ty, out)
        } else if *ty == PgType::FLOAT4 {
            s.parse::<f32>()?.to_sql(ty, out)
        } else if *ty == PgType::FLOAT8 {
            s.parse::<f64>()?.to_sql(ty, out)
        } else if *ty == PgType::BOOL {
            s.parse::<bool>()?.to_sql(ty, out)
        } else {
            Err(self.mismatch(ty))
        }
    }

    fn int_to_sql(
        &self,
        value: i64,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if *ty == PgType::INT8 {
            value.to_sql(ty, out)
        } else if *ty == PgType::INT4 {
            i32::try_from(value)?.to_sql(ty, out)
        } else if *ty == PgType::INT2 {
            i16::try_from(value)?.to_sql(ty, out)
        } else if *ty == PgType::NUMERIC {
            Decimal::from(value).to_sql(ty, out)
        } else if *ty == PgType::FLOAT8 {
            (value as f64).to_sql(ty, out)
        } else if *ty == PgType::FLOAT4 {
            (value as f32).to_sql(ty, out)
        } else if TEXT_TYPES.contains(ty) {
            value.to_string().to_sql(ty, out)
        } else {
            Err(self.mismatch(ty))
        }
    }

    fn float_to_sql(
        &self,
        value: f64,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if *ty == PgType::FLOAT8 {
            value.to_sql(ty, out)
        } else if *ty == PgType::FLOAT4 {
            (value as f32).to_sql(ty, out)
        } else if *ty == PgType::NUMERIC {
            Decimal::from_f64(value)
                .ok_or_else(|| SqlValueError::NumericOutOfRange(value.to_string()))?
                .to_sql(ty, out)
        } else if TEXT_TYPES.contains(ty) {
            value.to_string().to_sql(ty, out)
        } else {
            Err(self.mismatch(ty))
        }
    }

    fn decimal_to_sql(
        &self,
        value: &Decimal,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if *ty == PgType::NUMERIC {
            value.to_sql(ty, out)
        } else if *ty == PgType::FLOAT8 {
            value
                .to_f64()
                .ok_or_else(|| SqlValueError::NumericOutOfRange(value.to_string()))?
                .to_sql(ty, out)
        } else if *ty == PgType::INT8 && value.fract().is_zero() {
            value
                .to_i64()
                .ok_or_else(|| SqlValueError::NumericOutOfRange(value.to_string()))?
                .to_sql(ty, out)
        } else if TEXT_TYPES.contains(ty) {
            value.to_string().to_sql(ty, out)
        } else {
            Err(self.mismatch(ty))
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SqlValue::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(value) => {
                if *ty == PgType::BOOL {
                    value.to_sql(ty, out)
                } else if TEXT_TYPES.contains(ty) {
                    value.to_string().to_sql(ty, out)
                } else {
                    Err(self.mismatch(ty))
                }
            }
            SqlValue::Int(value) => self.int_to_sql(*value, ty, out),
            SqlValue::Float(value) => self.float_to_sql(*value, ty, out),
            SqlValue::Decimal(value) => self.decimal_to_sql(value, ty, out),
            SqlValue::Text(value) => self.text_to_sql(value, ty, out),
            SqlValue::Date(value) => {
                if *ty == PgType::DATE {
                    value.to_sql(ty, out)
                } else if *ty == PgType::TIMESTAMP {
                    value.and_time(NaiveTime::default()).to_sql(ty, out)
                } else if *ty == PgType::TIMESTAMPTZ {
                    Utc.from_utc_datetime(&value.and_time(NaiveTime::default())).to_sql(ty, out)
                } else if TEXT_TYPES.contains(ty) {
                    self.to_string().to_sql(ty, out)
                } else {
                    Err(self.mismatch(ty))
                }
            }
            SqlValue::Timestamp(value) => {
                if *ty == PgType::TIMESTAMP {
                    value.to_sql(ty, out)
                } else if *ty == PgType::TIMESTAMPTZ {
                    Utc.from_utc_datetime(value).to_sql(ty, out)
                } else if *ty == PgType::DATE {
                    value.date().to_sql(ty, out)
                } else if TEXT_TYPES.contains(ty) {
                    self.to_string().to_sql(ty, out)
                } else {
                    Err(self.mismatch(ty))
                }
            }
        }
    }

    fn accepts(_ty: &PgType) -> bool {
        true
    }

    to_sql_checked!();
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}
