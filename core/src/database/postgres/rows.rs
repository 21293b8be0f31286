use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use tokio_postgres::{types::Type as PgType, Row};
use tracing::debug;

use crate::database::store::{Record, StoreError};

/// Converts a postgres row into a JSON record keyed by column name.
pub fn row_to_record(row: &Row) -> Result<Record, StoreError> {
    let mut record = Record::new();

    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_(), column.name())?;
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

fn column_value(
    row: &Row,
    idx: usize,
    ty: &PgType,
    name: &str,
) -> Result<Value, tokio_postgres::Error> {
    let value = if *ty == PgType::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
    } else if *ty == PgType::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(Value::from)
    } else if *ty == PgType::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::from)
    } else if *ty == PgType::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::from)
    } else if *ty == PgType::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?
            .and_then(|v| Number::from_f64(f64::from(v)))
            .map(Value::Number)
    } else if *ty == PgType::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.and_then(Number::from_f64).map(Value::Number)
    } else if *ty == PgType::NUMERIC {
        // kept as text so no precision is lost
        row.try_get::<_, Option<Decimal>>(idx)?.map(|v| Value::String(v.to_string()))
    } else if [PgType::TEXT, PgType::VARCHAR, PgType::BPCHAR, PgType::NAME].contains(ty) {
        row.try_get::<_, Option<String>>(idx)?.map(Value::String)
    } else if *ty == PgType::DATE {
        row.try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| Value::String(v.format("%Y-%m-%d").to_string()))
    } else if *ty == PgType::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
    } else if *ty == PgType::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)?.map(|v| Value::String(v.to_rfc3339()))
    } else if *ty == PgType::TIME {
        row.try_get::<_, Option<NaiveTime>>(idx)?
            .map(|v| Value::String(v.format("%H:%M:%S").to_string()))
    } else if *ty == PgType::JSON || *ty == PgType::JSONB {
        row.try_get::<_, Option<Value>>(idx)?
    } else {
        debug!("Column {} has unsupported type {} - returning null", name, ty.name());
        None
    };

    Ok(value.unwrap_or(Value::Null))
}
