// public
pub mod batch;
pub mod database;
pub mod documents;
pub mod filter;
pub mod manifest;

mod logger;
pub use logger::{parse_log_level, setup_info_logger, setup_logger};

pub use batch::{
    aggregate, BatchResult, BatchUpdater, GuideUpdateRequest, UpdateOutcome, UpdateRequest,
    UpdateStatus,
};
pub use database::{
    named_params::NamedParams,
    postgres::{PostgresClient, PostgresConnectionError},
    sql_value::SqlValue,
    store::{QueryExecutor, RowSet, StoreError, StoreTransaction},
};
pub use documents::{
    dispatch_summary, DispatchTimeSummary, DocumentQueryError, DocumentQueryService,
};
pub use filter::{
    compile, compile_json, CompiledPredicate, FilterCondition, Operator, ValidationError,
};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tokio::main as waybill_main;
pub use tracing::level_filters::LevelFilter;
