pub mod compiler;
pub mod condition;

pub use compiler::{
    compile, compile_json, compile_with, parse_filters, CompiledPredicate, ParameterNames,
};
pub use condition::{
    is_valid_column_expression, is_valid_identifier, FilterCondition, FilterValue, Operator,
};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Filter key can not be empty")]
    EmptyKey,

    #[error("Unknown operator `{operator}` in filter key `{key}`")]
    UnknownOperator { key: String, operator: String },

    #[error("Filter `{key}` uses `{operator}` which requires a list value")]
    ExpectedList { key: String, operator: Operator },

    #[error("Filter `{key}` uses `{operator}` which requires a single value")]
    ExpectedScalar { key: String, operator: Operator },

    #[error("Invalid column expression: {0}")]
    InvalidColumn(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unsupported value for filter `{key}`: {reason}")]
    UnsupportedValue { key: String, reason: String },
}
