//! Route types

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timefmt;
use super::Task;

/// One task bound to one worker within an ordered route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop {
    pub task_id: Uuid,
    #[serde(with = "timefmt::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "timefmt::hhmm")]
    pub end_time: NaiveTime,
    /// Travel from the previous stop in whole minutes (0 for the first stop)
    pub travel_minutes: u32,
    /// 1-based position within the route
    pub sequence: u32,
    /// False only for sequence 1
    pub is_followup: bool,
}

/// One worker's ordered stops for one date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRoute {
    pub worker_id: Uuid,
    pub date: NaiveDate,
    pub stops: Vec<RouteStop>,
    /// Sum of consecutive-stop great-circle legs in kilometers
    pub distance_km: f64,
    pub total_travel_minutes: u32,
}

impl WorkerRoute {
    /// Build a route from one worker's scheduled tasks, in stop order.
    ///
    /// Every task must carry a schedule fragment; tasks without one are
    /// skipped. `distance_km` is supplied by the caller because the legs
    /// are measured on task coordinates the route itself does not keep.
    pub fn from_tasks(worker_id: Uuid, date: NaiveDate, tasks: &[Task], distance_km: f64) -> Self {
        let stops: Vec<RouteStop> = tasks
            .iter()
            .filter_map(|task| {
                task.schedule.as_ref().map(|fragment| RouteStop {
                    task_id: task.id,
                    start_time: fragment.start_time,
                    end_time: fragment.end_time,
                    travel_minutes: fragment.travel_minutes,
                    sequence: fragment.sequence,
                    is_followup: fragment.is_followup,
                })
            })
            .collect();
        let total_travel_minutes = stops.iter().map(|s| s.travel_minutes).sum();
        Self {
            worker_id,
            date,
            stops,
            distance_km,
            total_travel_minutes,
        }
    }
}
