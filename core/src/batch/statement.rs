use crate::{
    batch::request::UpdateRequest,
    database::named_params::NamedParams,
    filter::{compile_with, is_valid_identifier, FilterCondition, ParameterNames, ValidationError},
};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum StatementError {
    #[error("nothing to update")]
    NothingToUpdate,

    #[error("request has no key columns")]
    MissingKey,

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// A parameterized `UPDATE` for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub sql: String,
    pub params: NamedParams,
}

impl UpdateStatement {
    /// Builds `UPDATE <table> SET <present columns> WHERE <key columns>`. The SET and WHERE
    /// clauses share one set of parameter names.
    pub fn build(table: &str, request: &UpdateRequest) -> Result<Self, StatementError> {
        if request.assignments.is_empty() {
            return Err(StatementError::NothingToUpdate);
        }
        if request.key.parts.is_empty() {
            return Err(StatementError::MissingKey);
        }

        let mut names = ParameterNames::default();
        let mut params = NamedParams::new();
        let mut set_clauses = Vec::with_capacity(request.assignments.len());

        for assignment in &request.assignments {
            if !is_valid_identifier(&assignment.column) {
                return Err(ValidationError::InvalidIdentifier(assignment.column.clone()).into());
            }

            let name = names.claim(&assignment.column);
            set_clauses.push(format!("{} = :{}", assignment.column, name));
            params.insert(name, assignment.value.clone());
        }

        let key = request
            .key
            .parts
            .iter()
            .map(|(column, value)| FilterCondition::eq(column.as_str(), value.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let predicate = compile_with(&mut names, &[], &key);
        params.extend(predicate.params);

        Ok(Self {
            sql: format!(
                "UPDATE {} SET {} WHERE {}",
                table,
                set_clauses.join(", "),
                predicate.clauses.join(" AND ")
            ),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        batch::request::{Assignment, NaturalKey},
        database::sql_value::SqlValue,
    };

    fn key() -> NaturalKey {
        NaturalKey::new(vec![
            ("invoice_series".to_string(), SqlValue::from("F001")),
            ("invoice_number".to_string(), SqlValue::Int(10)),
        ])
    }

    #[test]
    fn test_builds_sparse_update() {
        let request = UpdateRequest::new(
            key(),
            vec![
                Assignment::new("guide_number", "45"),
                Assignment::new("carrier_agency", "Shalom"),
            ],
        );

        let statement = UpdateStatement::build("documents", &request).unwrap();

        assert_eq!(
            statement.sql,
            "UPDATE documents SET guide_number = :guide_number, carrier_agency = :carrier_agency \
             WHERE invoice_series = :invoice_series AND invoice_number = :invoice_number"
        );
        assert_eq!(statement.params.len(), 4);
        assert_eq!(statement.params["invoice_number"], SqlValue::Int(10));
        assert!(!statement.sql.contains("Shalom"));
    }

    #[test]
    fn test_key_column_also_assigned_gets_distinct_name() {
        let request =
            UpdateRequest::new(key(), vec![Assignment::new("invoice_number", SqlValue::Int(11))]);

        let statement = UpdateStatement::build("documents", &request).unwrap();

        assert_eq!(
            statement.sql,
            "UPDATE documents SET invoice_number = :invoice_number \
             WHERE invoice_series = :invoice_series AND invoice_number = :invoice_number_2"
        );
        assert_eq!(statement.params["invoice_number"], SqlValue::Int(11));
        assert_eq!(statement.params["invoice_number_2"], SqlValue::Int(10));
    }

    #[test]
    fn test_nothing_to_update() {
        let request = UpdateRequest::new(key(), vec![]);
        assert_eq!(
            UpdateStatement::build("documents", &request).unwrap_err(),
            StatementError::NothingToUpdate
        );
        assert_eq!(StatementError::NothingToUpdate.to_string(), "nothing to update");
    }

    #[test]
    fn test_rejects_unsafe_columns() {
        let request = UpdateRequest::new(
            key(),
            vec![Assignment::new("guide_number = 1, reason", "x")],
        );

        assert!(matches!(
            UpdateStatement::build("documents", &request),
            Err(StatementError::Validation(ValidationError::InvalidIdentifier(_)))
        ));

        let request = UpdateRequest::new(NaturalKey::new(vec![]), vec![Assignment::new("a", 1)]);
        assert_eq!(
            UpdateStatement::build("documents", &request).unwrap_err(),
            StatementError::MissingKey
        );
    }
}
