mod outcome;
mod request;
mod statement;
mod updater;

pub use outcome::{aggregate, BatchResult, UpdateOutcome, UpdateStatus};
pub use request::{Assignment, GuideUpdateRequest, NaturalKey, UpdateRequest};
pub use statement::{StatementError, UpdateStatement};
pub use updater::BatchUpdater;
