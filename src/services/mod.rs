//! Planning services

pub mod bundling;
pub mod eligibility;
pub mod greedy;
pub mod normalizer;
pub mod optimizer;
pub mod pipeline;
pub mod travel;
