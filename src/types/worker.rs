//! Worker types

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timefmt;
use super::Coordinates;

/// Worker role from the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Standard,
    Premium,
    Trainer,
}

impl WorkerRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            WorkerRole::Standard => "standard",
            WorkerRole::Premium => "premium",
            WorkerRole::Trainer => "trainer",
        }
    }
}

/// Role class used by the eligibility allow-lists.
///
/// Derived from the roster role plus the individual overtime authorization.
/// An authorized standard worker counts as an overtime specialist; premium
/// workers keep their premium class either way. Trainers stay trainers no
/// matter what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleClass {
    Standard,
    Premium,
    OvertimeSpecialist,
    Trainer,
}

impl RoleClass {
    pub fn derive(role: WorkerRole, overtime_authorized: bool) -> Self {
        match role {
            WorkerRole::Trainer => RoleClass::Trainer,
            WorkerRole::Premium => RoleClass::Premium,
            WorkerRole::Standard if overtime_authorized => RoleClass::OvertimeSpecialist,
            WorkerRole::Standard => RoleClass::Standard,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RoleClass::Standard => "standard",
            RoleClass::Premium => "premium",
            RoleClass::OvertimeSpecialist => "overtime_specialist",
            RoleClass::Trainer => "trainer",
        }
    }
}

/// A roster member. Read-only input to one planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub role: WorkerRole,
    pub active: bool,
    pub available: bool,
    /// Fixed personal start of day, when agreed
    #[serde(with = "timefmt::hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    pub overtime_authorized: bool,
    /// Hours worked over the fairness window; the load-balancing signal
    pub accumulated_hours: f64,
    pub home: Coordinates,
}

impl Worker {
    pub fn is_premium(&self) -> bool {
        self.role == WorkerRole::Premium
    }

    pub fn role_class(&self) -> RoleClass {
        RoleClass::derive(self.role, self.overtime_authorized)
    }
}
