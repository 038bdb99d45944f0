//! Wire records from the upstream extraction pipeline.
//!
//! Records are converted into domain types exactly once, here. Bad field
//! values are defaulted or the record is skipped, with a warning either
//! way; intake never aborts a date.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use crate::defaults::DEFAULT_CLEANING_MINUTES;

use super::report::PlanWarning;
use super::task::{AssignmentStatus, Coordinates, PriorityClass, Task};
use super::timefmt::parse_hhmm;
use super::worker::{Worker, WorkerRole};

/// Raw task as produced by the extraction/classification pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: Uuid,
    #[serde(default)]
    pub logistic_code: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: String,
    pub cleaning_time_minutes: u32,
    /// "HH:MM" or absent
    #[serde(default)]
    pub checkout_time: Option<String>,
    /// "HH:MM" or absent
    #[serde(default)]
    pub checkin_time: Option<String>,
    pub premium: bool,
    pub apartment_type: String,
    pub priority_class: PriorityClass,
    pub overtime: bool,
}

/// Raw roster member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecord {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub role: WorkerRole,
    pub active: bool,
    pub available: bool,
    /// "HH:MM" or absent
    #[serde(default)]
    pub start_time: Option<String>,
    pub overtime_authorized: bool,
    pub accumulated_hours: f64,
    pub home_lat: f64,
    pub home_lng: f64,
}

fn valid_coordinates(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
        && !(lat == 0.0 && lng == 0.0)
}

/// Convert raw task records into domain tasks.
///
/// Tasks without usable coordinates are skipped; malformed optional fields
/// are dropped to their defaults. Returns the surviving tasks in input
/// order plus one warning per correction.
pub fn validate_tasks(records: Vec<TaskRecord>) -> (Vec<Task>, Vec<PlanWarning>) {
    let mut tasks = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();

    for record in records {
        if !seen.insert(record.id) {
            warn!("duplicate task {} dropped", record.id);
            warnings.push(PlanWarning::for_task(
                "DUPLICATE_TASK",
                record.id,
                "task id appears more than once; later copy dropped",
            ));
            continue;
        }

        if !valid_coordinates(record.lat, record.lng) {
            warn!("task {} has no usable coordinates, skipping", record.id);
            warnings.push(PlanWarning::for_task(
                "MISSING_COORDINATES",
                record.id,
                format!("unusable coordinates ({}, {})", record.lat, record.lng),
            ));
            continue;
        }

        let checkout_time = match &record.checkout_time {
            Some(raw) => {
                let parsed = parse_hhmm(raw);
                if parsed.is_none() {
                    warnings.push(PlanWarning::for_task(
                        "INVALID_TIME",
                        record.id,
                        format!("checkout time {raw:?} is not HH:MM; ignored"),
                    ));
                }
                parsed
            }
            None => None,
        };
        let checkin_deadline = match &record.checkin_time {
            Some(raw) => {
                let parsed = parse_hhmm(raw);
                if parsed.is_none() {
                    warnings.push(PlanWarning::for_task(
                        "INVALID_TIME",
                        record.id,
                        format!("checkin time {raw:?} is not HH:MM; ignored"),
                    ));
                }
                parsed
            }
            None => None,
        };

        let cleaning_minutes = if record.cleaning_time_minutes == 0 {
            warnings.push(PlanWarning::for_task(
                "INVALID_DURATION",
                record.id,
                format!("cleaning time 0 replaced with default {DEFAULT_CLEANING_MINUTES}"),
            ));
            DEFAULT_CLEANING_MINUTES
        } else {
            record.cleaning_time_minutes
        };

        tasks.push(Task {
            id: record.id,
            logistic_code: record.logistic_code.unwrap_or_default(),
            coordinates: Coordinates {
                lat: record.lat,
                lng: record.lng,
            },
            address: record.address,
            cleaning_minutes,
            checkout_time,
            checkin_deadline,
            premium: record.premium,
            apartment_type: record.apartment_type,
            priority: record.priority_class,
            overtime: record.overtime,
            status: AssignmentStatus::Pending,
            schedule: None,
        });
    }

    (tasks, warnings)
}

/// Convert raw roster records into domain workers.
///
/// A bad home location is zeroed rather than dropping the worker, since
/// routing derives origins from seed tasks and task centroids, not homes.
pub fn validate_workers(records: Vec<WorkerRecord>) -> (Vec<Worker>, Vec<PlanWarning>) {
    let mut workers = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();

    for record in records {
        if !seen.insert(record.id) {
            warn!("duplicate worker {} dropped", record.id);
            warnings.push(PlanWarning::new(
                "DUPLICATE_WORKER",
                format!("worker {} appears more than once; later copy dropped", record.id),
            ));
            continue;
        }

        let home = if valid_coordinates(record.home_lat, record.home_lng) {
            Coordinates {
                lat: record.home_lat,
                lng: record.home_lng,
            }
        } else {
            warnings.push(PlanWarning::new(
                "INVALID_HOME",
                format!("worker {} home location is unusable; zeroed", record.id),
            ));
            Coordinates { lat: 0.0, lng: 0.0 }
        };

        let start_time = match &record.start_time {
            Some(raw) => {
                let parsed = parse_hhmm(raw);
                if parsed.is_none() {
                    warnings.push(PlanWarning::new(
                        "INVALID_TIME",
                        format!("worker {} start time {raw:?} is not HH:MM; ignored", record.id),
                    ));
                }
                parsed
            }
            None => None,
        };

        let accumulated_hours = if record.accumulated_hours.is_finite() && record.accumulated_hours >= 0.0 {
            record.accumulated_hours
        } else {
            warnings.push(PlanWarning::new(
                "INVALID_HOURS",
                format!("worker {} accumulated hours reset to 0", record.id),
            ));
            0.0
        };

        workers.push(Worker {
            id: record.id,
            name: record.name.unwrap_or_default(),
            role: record.role,
            active: record.active,
            available: record.available,
            start_time,
            overtime_authorized: record.overtime_authorized,
            accumulated_hours,
            home,
        });
    }

    (workers, warnings)
}
