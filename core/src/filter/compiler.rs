use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::database::named_params::NamedParams;
use crate::filter::{
    condition::{FilterCondition, FilterValue, Operator},
    ValidationError,
};

/// Clause that matches nothing. `IN ()` is not valid SQL, so an empty `in` filter compiles to
/// this instead and must never be dropped.
pub const ALWAYS_FALSE: &str = "1 = 0";

/// Hands out parameter names derived from filter keys, never the same name twice.
#[derive(Debug, Default)]
pub struct ParameterNames {
    taken: HashSet<String>,
}

impl ParameterNames {
    /// Claims a name derived from `key`. When the derived name is already taken a numeric
    /// suffix (`_2`, `_3`, ...) is appended.
    pub fn claim(&mut self, key: &str) -> String {
        let base = sanitize_parameter_name(key);
        if self.taken.insert(base.clone()) {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Replaces every run of non-alphanumeric characters with a single `_`.
/// `DATE(d.created_at)__gte` becomes `DATE_d_created_at_gte`.
pub fn sanitize_parameter_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    let mut pending_separator = false;

    for c in key.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !name.is_empty() {
                name.push('_');
            }
            pending_separator = false;
            name.push(c);
        } else {
            pending_separator = true;
        }
    }

    match name.chars().next() {
        None => "p".to_string(),
        Some(first) if first.is_ascii_digit() => format!("p_{}", name),
        Some(_) => name,
    }
}

/// SQL clause fragments (to be joined with `AND`) and the values they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPredicate {
    pub clauses: Vec<String>,
    pub params: NamedParams,
}

impl CompiledPredicate {
    pub fn with_base(base_conditions: &[&str]) -> Self {
        Self {
            clauses: base_conditions.iter().map(|c| c.to_string()).collect(),
            params: NamedParams::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The clauses joined with `AND`, or `None` when there is nothing to restrict on.
    pub fn where_clause(&self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" AND "))
        }
    }

    pub fn push(&mut self, names: &mut ParameterNames, condition: &FilterCondition) {
        let column = condition.column();

        match (condition.operator(), condition.value()) {
            (Operator::In, FilterValue::List(items)) if items.is_empty() => {
                self.clauses.push(ALWAYS_FALSE.to_string());
            }
            (Operator::In, FilterValue::List(items)) => {
                let base = sanitize_parameter_name(condition.key());
                let placeholders = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let name = names.claim(&format!("{}_{}", base, i));
                        self.params.insert(name.clone(), item.clone());
                        format!(":{}", name)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");

                self.clauses.push(format!("{} IN ({})", column, placeholders));
            }
            (operator, FilterValue::Scalar(value)) => {
                let name = names.claim(condition.key());
                self.params.insert(name.clone(), value.clone());
                self.clauses.push(format!("{} {} :{}", column, operator.sql(), name));
            }
            // shape is checked when the condition is built
            (operator, FilterValue::List(_)) => {
                unreachable!("list value for {} operator passed validation", operator)
            }
        }
    }
}

/// Compiles typed filter conditions into a parameterized predicate.
///
/// `base_conditions` are trusted SQL fragments placed first, verbatim. No value is ever written
/// into the clause text; each is referenced by a named parameter.
pub fn compile(base_conditions: &[&str], filters: &[FilterCondition]) -> CompiledPredicate {
    let mut names = ParameterNames::default();
    compile_with(&mut names, base_conditions, filters)
}

/// Same as [`compile`], sharing `names` with other clauses of the same statement.
pub fn compile_with(
    names: &mut ParameterNames,
    base_conditions: &[&str],
    filters: &[FilterCondition],
) -> CompiledPredicate {
    let mut predicate = CompiledPredicate::with_base(base_conditions);
    for condition in filters {
        predicate.push(names, condition);
    }
    predicate
}

/// Parses and compiles a string-keyed filter map such as
/// `{"d.reason__in": ["VENTA"], "v.plate__like": "%ABC%"}`.
pub fn compile_json(
    base_conditions: &[&str],
    filters: &Map<String, Value>,
) -> Result<CompiledPredicate, ValidationError> {
    let conditions = parse_filters(filters)?;
    Ok(compile(base_conditions, &conditions))
}

pub fn parse_filters(
    filters: &Map<String, Value>,
) -> Result<Vec<FilterCondition>, ValidationError> {
    filters.iter().map(|(key, value)| FilterCondition::parse(key, value)).collect()
}
