//! Engine-level errors.
//!
//! Only construction and request-shape problems surface as errors; anything
//! that goes wrong while planning a single date is isolated into that
//! date's outcome or failure entry instead.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("duplicate date in request: {0}")]
    DuplicateDate(NaiveDate),
}
