//! Type definitions

pub mod record;
pub mod report;
pub mod route;
pub mod task;
pub mod timefmt;
pub mod worker;

pub use record::*;
pub use report::*;
pub use route::*;
pub use task::*;
pub use worker::*;
