//! Rewrites SQL authored with named placeholders (`:name`) into the positional form
//! (`$1`, `$2`, ...) understood by PostgreSQL, collecting the bound values in order.

use std::collections::{BTreeMap, HashMap};

use crate::database::sql_value::SqlValue;

/// Named parameter values. Ordered so that debug output and comparisons are deterministic.
pub type NamedParams = BTreeMap<String, SqlValue>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BindError {
    #[error("No value bound for parameter :{0}")]
    MissingParameter(String),
}

/// A statement ready for a positional driver.
#[derive(Debug)]
pub struct PositionalQuery<'a> {
    pub sql: String,
    pub params: Vec<&'a SqlValue>,
}

fn is_param_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replaces every `:name` placeholder with `$n`. A name used more than once maps to the same
/// position. `::` casts and anything inside single-quoted literals or double-quoted
/// identifiers are copied through untouched.
pub fn bind_named<'a>(
    sql: &str,
    params: &'a NamedParams,
) -> Result<PositionalQuery<'a>, BindError> {
    let mut output = String::with_capacity(sql.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut values: Vec<&'a SqlValue> = Vec::new();

    let chars: Vec<char> = sql.chars().collect();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(open) = quote {
            output.push(c);
            if c == open {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                output.push(c);
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                output.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).copied().is_some_and(is_param_start) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_param_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();

                let (key, value) = params
                    .get_key_value(name.as_str())
                    .ok_or_else(|| BindError::MissingParameter(name.clone()))?;

                let position = match positions.get(key.as_str()) {
                    Some(position) => *position,
                    None => {
                        values.push(value);
                        positions.insert(key.as_str(), values.len());
                        values.len()
                    }
                };

                output.push('$');
                output.push_str(&position.to_string());
                i = end;
            }
            _ => {
                output.push(c);
                i += 1;
            }
        }
    }

    Ok(PositionalQuery { sql: output, params: values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, SqlValue)]) -> NamedParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_bind_named_in_order_of_appearance() {
        let values = params(&[("b", SqlValue::Int(2)), ("a", SqlValue::Int(1))]);
        let bound = bind_named("SELECT * FROM t WHERE a = :a AND b = :b", &values).unwrap();

        assert_eq!(bound.sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(bound.params, vec![&SqlValue::Int(1), &SqlValue::Int(2)]);
    }

    #[test]
    fn test_bind_named_reuses_position_for_repeated_name() {
        let values = params(&[("d", SqlValue::Text("2025-01-01".into()))]);
        let bound = bind_named("x >= :d OR y >= :d", &values).unwrap();

        assert_eq!(bound.sql, "x >= $1 OR y >= $1");
        assert_eq!(bound.params.len(), 1);
    }

    #[test]
    fn test_bind_named_skips_casts_and_literals() {
        let values = params(&[("p", SqlValue::Int(1))]);
        let bound = bind_named(
            "SELECT '10:30'::time, \"odd:name\" FROM t WHERE id = :p::int8",
            &values,
        )
        .unwrap();

        assert_eq!(bound.sql, "SELECT '10:30'::time, \"odd:name\" FROM t WHERE id = $1::int8");
        assert_eq!(bound.params.len(), 1);
    }

    #[test]
    fn test_bind_named_missing_parameter() {
        let values = params(&[("a", SqlValue::Int(1))]);
        let err = bind_named("a = :a AND b = :b", &values).unwrap_err();

        assert_eq!(err, BindError::MissingParameter("b".to_string()));
    }

    #[test]
    fn test_bind_named_ignores_unused_parameters() {
        let values = params(&[("a", SqlValue::Int(1)), ("unused", SqlValue::Null)]);
        let bound = bind_named("a = :a", &values).unwrap();

        assert_eq!(bound.params, vec![&SqlValue::Int(1)]);
    }

    #[test]
    fn test_bind_named_without_placeholders() {
        let values = NamedParams::new();
        let bound = bind_named("SELECT 1 = 0", &values).unwrap();
        assert_eq!(bound.sql, "SELECT 1 = 0");
        assert!(bound.params.is_empty());
    }
}
