//! Task types

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timefmt;

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Priority bucket assigned by the upstream classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    EarlyOut,
    HighPriority,
    LowPriority,
}

impl PriorityClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            PriorityClass::EarlyOut => "early_out",
            PriorityClass::HighPriority => "high_priority",
            PriorityClass::LowPriority => "low_priority",
        }
    }
}

/// Assignment status of a task within one planning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Not yet seen by any assignment phase
    Pending,
    Assigned,
    /// Premium task with no premium worker left to take it
    UnassignedPremiumRule,
    /// No unused worker left on the date
    UnassignedNoCleaners,
    /// Unused workers existed but none was eligible
    UnassignedIneligible,
    /// The route optimizer could not place the task on any route
    UnassignedUnroutable,
}

impl AssignmentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::UnassignedPremiumRule => "unassigned_premium_rule",
            AssignmentStatus::UnassignedNoCleaners => "unassigned_no_cleaners",
            AssignmentStatus::UnassignedIneligible => "unassigned_ineligible",
            AssignmentStatus::UnassignedUnroutable => "unassigned_unroutable",
        }
    }

    /// True for every status except `Pending` and `Assigned`.
    pub const fn is_unassigned(self) -> bool {
        !matches!(self, AssignmentStatus::Pending | AssignmentStatus::Assigned)
    }
}

/// Schedule fields embedded into a task once a worker takes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFragment {
    pub worker_id: Uuid,
    #[serde(with = "timefmt::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "timefmt::hhmm")]
    pub end_time: NaiveTime,
    /// Travel from the previous stop in whole minutes (0 for the first stop)
    pub travel_minutes: u32,
    /// 1-based position within the worker's route
    pub sequence: u32,
    pub is_followup: bool,
}

/// A cleaning job for one calendar date.
///
/// Identity fields never change during a planning run; only `status` and
/// `schedule` are written by the assignment, routing, and normalization
/// stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub logistic_code: String,
    pub coordinates: Coordinates,
    pub address: String,
    pub cleaning_minutes: u32,
    /// Earliest the unit is free for cleaning (guest checkout)
    #[serde(with = "timefmt::hhmm_opt")]
    pub checkout_time: Option<NaiveTime>,
    /// Latest the cleaning must be finished (next guest checkin)
    #[serde(with = "timefmt::hhmm_opt")]
    pub checkin_deadline: Option<NaiveTime>,
    pub premium: bool,
    pub apartment_type: String,
    pub priority: PriorityClass,
    pub overtime: bool,
    pub status: AssignmentStatus,
    pub schedule: Option<ScheduleFragment>,
}

impl Task {
    /// Assigned worker id, if any phase has placed the task.
    pub fn assigned_worker(&self) -> Option<Uuid> {
        self.schedule.as_ref().map(|s| s.worker_id)
    }
}
