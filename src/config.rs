//! Planner configuration
//!
//! One configuration value is constructed per run and passed into each
//! component; nothing is read from globals after this point. A config file
//! may set any subset of fields, the rest keep their defaults.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::error::PlanError;
use crate::types::timefmt;
use crate::types::{PriorityClass, RoleClass};

/// Travel-time model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TravelConfig {
    /// Straight-line to road scaling
    pub road_factor: f64,
    /// Flat cost between stops in the same building
    pub same_building_minutes: u32,
    pub walk_speed_kmh: f64,
    /// Road distances below this use the walking band
    pub walk_cutoff_km: f64,
    pub mixed_speed_kmh: f64,
    /// Road distances below this (and above the walking cutoff) use the mixed band
    pub mixed_cutoff_km: f64,
    pub vehicle_speed_kmh: f64,
    /// Fixed preparation time added to every leg
    pub base_minutes: u32,
    pub same_street_discount_minutes: u32,
    /// Same-street discount applies only within this great-circle range
    pub same_street_max_km: f64,
    pub min_minutes: u32,
    pub max_minutes: u32,
    /// Great-circle distances beyond this report the unreachable sentinel
    pub max_range_km: f64,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            road_factor: 1.3,
            same_building_minutes: 3,
            walk_speed_kmh: 5.0,
            walk_cutoff_km: 0.5,
            mixed_speed_kmh: 20.0,
            mixed_cutoff_km: 3.0,
            vehicle_speed_kmh: 40.0,
            base_minutes: 5,
            same_street_discount_minutes: 2,
            same_street_max_km: 0.3,
            min_minutes: 1,
            max_minutes: 90,
            max_range_km: 50.0,
        }
    }
}

/// Allow-lists for the eligibility policy.
///
/// A key absent from a map allows every role class; a present key allows
/// only the listed classes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EligibilityConfig {
    pub apartment_rules: HashMap<String, Vec<RoleClass>>,
    pub priority_rules: HashMap<PriorityClass, Vec<RoleClass>>,
}

/// Geographic thresholds for daily task bundling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundlingConfig {
    /// Pairwise travel minutes under which two tasks count as near
    pub near_minutes: u32,
    /// Travel minutes under which a candidate is very near an existing task
    pub very_near_minutes: u32,
}

impl Default for BundlingConfig {
    fn default() -> Self {
        Self {
            near_minutes: 15,
            very_near_minutes: 8,
        }
    }
}

/// Direction of the accumulated-hours tie-break in the greedy pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Prefer already-loaded workers, keeping fresh workers for later passes
    MostLoadedFirst,
    LeastLoadedFirst,
}

/// Greedy assignment parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GreedyConfig {
    pub tie_break: TieBreak,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::MostLoadedFirst,
        }
    }
}

/// Route optimizer bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    /// Wall-clock deadline per date in seconds
    pub deadline_secs: u32,
    /// Cap on local-search sweeps regardless of the deadline
    pub max_rounds: u32,
    /// Upper bound on one route's duration, departure to last task end
    pub max_route_minutes: u32,
    /// Tolerated waiting time ahead of a node's window
    pub wait_slack_minutes: u32,
    /// Objective penalty for leaving a task off every route
    pub skip_penalty_minutes: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 30,
            max_rounds: 100,
            max_route_minutes: 600,
            wait_slack_minutes: 15,
            skip_penalty_minutes: 10_000,
        }
    }
}

impl SolverConfig {
    /// Fast configuration for interactive use
    pub fn fast() -> Self {
        Self {
            deadline_secs: 5,
            max_rounds: 40,
            ..Self::default()
        }
    }

    /// Quality configuration for background planning
    pub fn quality() -> Self {
        Self {
            deadline_secs: 60,
            max_rounds: 400,
            ..Self::default()
        }
    }

    /// Minimal-latency configuration; may leave obvious improvements on the table
    pub fn instant() -> Self {
        Self {
            deadline_secs: 2,
            max_rounds: 10,
            ..Self::default()
        }
    }
}

/// Business-day window shared by routing and normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DayConfig {
    #[serde(with = "timefmt::hhmm")]
    pub start: NaiveTime,
    #[serde(with = "timefmt::hhmm")]
    pub end: NaiveTime,
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            start: defaults::default_day_start(),
            end: defaults::default_day_end(),
        }
    }
}

/// Full planner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    pub travel: TravelConfig,
    pub eligibility: EligibilityConfig,
    pub bundling: BundlingConfig,
    pub greedy: GreedyConfig,
    pub solver: SolverConfig,
    pub day: DayConfig,
}

impl PlannerConfig {
    /// Load configuration from an explicit path, the PLANNER_CONFIG env
    /// var, or defaults, in that order. A `.env` file is honored if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("PLANNER_CONFIG").ok().map(PathBuf::from));

        let config: Self = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid planner config in {}", path.display()))?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let t = &self.travel;
        if t.road_factor < 1.0 {
            return Err(PlanError::InvalidConfig(
                "travel.roadFactor must be at least 1.0".to_string(),
            ));
        }
        if t.walk_speed_kmh <= 0.0 || t.mixed_speed_kmh <= 0.0 || t.vehicle_speed_kmh <= 0.0 {
            return Err(PlanError::InvalidConfig(
                "travel speeds must be positive".to_string(),
            ));
        }
        if t.walk_cutoff_km >= t.mixed_cutoff_km {
            return Err(PlanError::InvalidConfig(
                "travel.walkCutoffKm must be below travel.mixedCutoffKm".to_string(),
            ));
        }
        if t.min_minutes > t.max_minutes {
            return Err(PlanError::InvalidConfig(
                "travel.minMinutes must not exceed travel.maxMinutes".to_string(),
            ));
        }
        if t.max_range_km <= 0.0 {
            return Err(PlanError::InvalidConfig(
                "travel.maxRangeKm must be positive".to_string(),
            ));
        }

        if self.bundling.near_minutes == 0 {
            return Err(PlanError::InvalidConfig(
                "bundling.nearMinutes must be positive".to_string(),
            ));
        }
        if self.bundling.very_near_minutes > self.bundling.near_minutes {
            return Err(PlanError::InvalidConfig(
                "bundling.veryNearMinutes must not exceed bundling.nearMinutes".to_string(),
            ));
        }

        if self.solver.deadline_secs == 0 {
            return Err(PlanError::InvalidConfig(
                "solver.deadlineSecs must be positive".to_string(),
            ));
        }
        if self.solver.max_route_minutes == 0 {
            return Err(PlanError::InvalidConfig(
                "solver.maxRouteMinutes must be positive".to_string(),
            ));
        }

        if self.day.start >= self.day.end {
            return Err(PlanError::InvalidConfig(
                "day.start must be before day.end".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.solver.deadline_secs, 30);
        assert!((config.travel.road_factor - 1.3).abs() < f64::EPSILON);
        assert_eq!(config.bundling.near_minutes, 15);
        assert_eq!(config.greedy.tie_break, TieBreak::MostLoadedFirst);
    }

    #[test]
    fn test_fast_solver_config() {
        let config = SolverConfig::fast();
        assert!(config.deadline_secs < SolverConfig::default().deadline_secs);
        assert_eq!(config.max_route_minutes, 600);
    }

    #[test]
    fn test_quality_solver_config() {
        let config = SolverConfig::quality();
        assert_eq!(config.deadline_secs, 60);
        assert!(config.max_rounds > SolverConfig::default().max_rounds);
    }

    #[test]
    fn test_instant_solver_config() {
        let config = SolverConfig::instant();
        assert!(config.deadline_secs < SolverConfig::fast().deadline_secs);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let raw = r#"{"solver":{"deadlineSecs":5},"day":{"start":"07:00"}}"#;
        let config: PlannerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.solver.deadline_secs, 5);
        assert_eq!(config.solver.max_route_minutes, 600);
        assert_eq!(config.day.start, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(config.day.end, defaults::default_day_end());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_day_window_rejected() {
        let mut config = PlannerConfig::default();
        config.day.start = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PlanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bundling_thresholds_must_be_ordered() {
        let mut config = PlannerConfig::default();
        config.bundling.very_near_minutes = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_eligibility_rules_parse_from_json() {
        let raw = r#"{
            "eligibility": {
                "apartmentRules": {"loft": ["premium", "trainer"]},
                "priorityRules": {"early_out": ["standard", "premium", "overtime_specialist"]}
            }
        }"#;
        let config: PlannerConfig = serde_json::from_str(raw).unwrap();
        let loft = &config.eligibility.apartment_rules["loft"];
        assert!(loft.contains(&RoleClass::Premium));
        assert!(!loft.contains(&RoleClass::Standard));
        let early = &config.eligibility.priority_rules[&PriorityClass::EarlyOut];
        assert!(early.contains(&RoleClass::OvertimeSpecialist));
    }
}
