//! Planning request and report envelopes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{TaskRecord, WorkerRecord};
use super::route::WorkerRoute;
use super::task::{AssignmentStatus, Task};

/// Everything the planner needs for a batch of dates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub days: Vec<DayPlan>,
}

/// One date's task pool and roster, as extracted upstream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: NaiveDate,
    pub tasks: Vec<TaskRecord>,
    pub workers: Vec<WorkerRecord>,
}

/// Warning attached to a date outcome (intake, routing, or normalization)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWarning {
    pub warning_type: String,
    pub message: String,
    pub task_id: Option<Uuid>,
}

impl PlanWarning {
    pub fn new(warning_type: &str, message: impl Into<String>) -> Self {
        Self {
            warning_type: warning_type.to_string(),
            message: message.into(),
            task_id: None,
        }
    }

    pub fn for_task(warning_type: &str, task_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            warning_type: warning_type.to_string(),
            message: message.into(),
            task_id: Some(task_id),
        }
    }
}

/// Run metadata from one greedy assignment pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreedySummary {
    pub assigned: u32,
    pub unassigned_premium_rule: u32,
    pub unassigned_no_cleaners: u32,
    pub unassigned_ineligible: u32,
    /// Workers that took nothing in this pass, in priority order
    pub unused_workers: Vec<Uuid>,
}

/// Terminal status of a task the planner could not place
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedTask {
    pub task_id: Uuid,
    pub status: AssignmentStatus,
}

/// Full result for one successfully planned date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOutcome {
    pub date: NaiveDate,
    /// Final task list, statuses and schedule fragments resolved
    pub tasks: Vec<Task>,
    pub greedy: GreedySummary,
    pub routes: Vec<WorkerRoute>,
    pub unassigned: Vec<UnassignedTask>,
    /// Premium tasks routed to non-premium workers because the date had
    /// zero premium workers
    pub premium_fallback: Vec<Uuid>,
    pub warnings: Vec<PlanWarning>,
    pub algorithm: String,
    pub solve_time_ms: u64,
    pub solver_log: Vec<String>,
}

/// A date the planner had to give up on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFailure {
    pub date: NaiveDate,
    pub error: String,
}

/// Aggregated result of one planning run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub outcomes: Vec<DateOutcome>,
    pub failures: Vec<DateFailure>,
    pub total_tasks: u32,
    pub total_assigned: u32,
    pub total_unassigned: u32,
}

impl PlanReport {
    /// Roll up totals from per-date outcomes.
    pub fn from_parts(outcomes: Vec<DateOutcome>, failures: Vec<DateFailure>) -> Self {
        let total_tasks = outcomes.iter().map(|o| o.tasks.len() as u32).sum();
        let total_assigned = outcomes
            .iter()
            .flat_map(|o| &o.tasks)
            .filter(|t| t.status == AssignmentStatus::Assigned)
            .count() as u32;
        let total_unassigned = outcomes.iter().map(|o| o.unassigned.len() as u32).sum();
        Self {
            outcomes,
            failures,
            total_tasks,
            total_assigned,
            total_unassigned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals_roll_up() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let outcome = DateOutcome {
            date,
            tasks: vec![],
            greedy: GreedySummary::default(),
            routes: vec![],
            unassigned: vec![UnassignedTask {
                task_id: Uuid::nil(),
                status: AssignmentStatus::UnassignedNoCleaners,
            }],
            premium_fallback: vec![],
            warnings: vec![],
            algorithm: "none".to_string(),
            solve_time_ms: 0,
            solver_log: vec![],
        };
        let report = PlanReport::from_parts(vec![outcome], vec![]);
        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.total_unassigned, 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_warning_serializes_camel_case() {
        let warning = PlanWarning::for_task("MISSING_COORDINATES", Uuid::nil(), "task skipped");
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("\"warningType\":\"MISSING_COORDINATES\""));
        assert!(json.contains("\"taskId\""));
    }

    #[test]
    fn test_plan_request_parses_dates() {
        let raw = r#"{"days":[{"date":"2026-03-02","tasks":[],"workers":[]}]}"#;
        let request: PlanRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.days.len(), 1);
        assert_eq!(
            request.days[0].date,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }
}
