//! Daily assignment and routing engine for mobile cleaning crews.
//!
//! The binary wraps stdin/stdout JSON around [`Planner`]; library callers
//! build a [`PlannerConfig`], construct a [`Planner`], and feed it a
//! [`PlanRequest`] directly.

pub mod config;
pub mod defaults;
pub mod error;
pub mod services;
pub mod types;

pub use config::PlannerConfig;
pub use error::PlanError;
pub use services::pipeline::Planner;
pub use types::{PlanReport, PlanRequest};
