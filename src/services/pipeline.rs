//! Planning pipeline: intake, greedy pass, routing, normalization.
//!
//! Dates are independent units of work. Each one runs on the blocking
//! pool with its own child cancellation token; a date that fails lands in
//! the report's failure list and never touches the other dates.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::services::bundling::ClusterBundlingPolicy;
use crate::services::eligibility::EligibilityPolicy;
use crate::services::greedy::FairnessGreedyAssigner;
use crate::services::normalizer::ScheduleNormalizer;
use crate::services::optimizer::RouteOptimizer;
use crate::services::travel::{haversine_distance, TravelTimeEstimator};
use crate::types::{
    record, AssignmentStatus, DateFailure, DateOutcome, DayPlan, PlanReport, PlanRequest,
    PriorityClass, ScheduleFragment, Task, UnassignedTask, Worker, WorkerRole, WorkerRoute,
};

pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Plan every date in the request, dates in parallel.
    pub async fn run(&self, request: PlanRequest) -> Result<PlanReport, PlanError> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// As [`run`](Self::run), with a caller-owned cancellation token. A
    /// cancelled token makes every date return its best partial result.
    pub async fn run_with_cancel(
        &self,
        request: PlanRequest,
        cancel: CancellationToken,
    ) -> Result<PlanReport, PlanError> {
        let mut seen: HashSet<NaiveDate> = HashSet::new();
        for day in &request.days {
            if !seen.insert(day.date) {
                return Err(PlanError::DuplicateDate(day.date));
            }
        }

        let mut handles = Vec::with_capacity(request.days.len());
        for day in request.days {
            let config = self.config.clone();
            let token = cancel.child_token();
            let date = day.date;
            handles.push((
                date,
                tokio::task::spawn_blocking(move || plan_date(&config, day, &token)),
            ));
        }

        let mut outcomes = Vec::new();
        let mut failures = Vec::new();
        for (date, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!("planning {date} failed: {err}");
                    failures.push(DateFailure {
                        date,
                        error: err.to_string(),
                    });
                }
            }
        }

        let report = PlanReport::from_parts(outcomes, failures);
        info!(
            "planned {} dates: {} tasks, {} assigned, {} unassigned, {} failed dates",
            report.outcomes.len(),
            report.total_tasks,
            report.total_assigned,
            report.total_unassigned,
            report.failures.len()
        );
        Ok(report)
    }
}

/// Plan one date start to finish. Never fails: intake problems become
/// warnings, unplaceable tasks become terminal unassigned statuses.
pub fn plan_date(config: &PlannerConfig, day: DayPlan, cancel: &CancellationToken) -> DateOutcome {
    let started_at = Instant::now();
    let date = day.date;

    let (mut tasks, mut warnings) = record::validate_tasks(day.tasks);
    let (workers, worker_warnings) = record::validate_workers(day.workers);
    warnings.extend(worker_warnings);

    let roster: Vec<Worker> = workers
        .into_iter()
        .filter(|w| w.active && w.available)
        .collect();

    let travel = TravelTimeEstimator::new(config.travel.clone());
    let eligibility = EligibilityPolicy::new(config.eligibility.clone());
    let bundling = ClusterBundlingPolicy::new(config.bundling.clone());

    // First pass: greedy assignment of the early-out tasks.
    let assigner = FairnessGreedyAssigner::new(&eligibility, &bundling, &travel, &config.greedy);
    let early_indices: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.priority == PriorityClass::EarlyOut)
        .map(|(i, _)| i)
        .collect();
    let mut early: Vec<Task> = early_indices.iter().map(|&i| tasks[i].clone()).collect();
    let greedy = assigner.assign(&mut early, &roster, config.day.start);
    for (&slot, task) in early_indices.iter().zip(early) {
        tasks[slot] = task;
    }

    // Second pass: route the remaining tasks across the non-trainer pool,
    // seeded with each worker's greedy task.
    let mut seeds: HashMap<Uuid, Vec<Task>> = HashMap::new();
    for task in tasks.iter().filter(|t| t.status == AssignmentStatus::Assigned) {
        if let Some(worker_id) = task.assigned_worker() {
            seeds.entry(worker_id).or_default().push(task.clone());
        }
    }
    let pool: Vec<Worker> = roster
        .iter()
        .filter(|w| w.role != WorkerRole::Trainer)
        .cloned()
        .collect();
    let followups: Vec<Task> = tasks
        .iter()
        .filter(|t| t.status == AssignmentStatus::Pending)
        .cloned()
        .collect();

    let optimizer = RouteOptimizer::new(&travel, &eligibility, &bundling, &config.solver, &config.day);
    let plan = optimizer.solve_date(&followups, &pool, &seeds, cancel);

    let index_of: HashMap<Uuid, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id, i))
        .collect();
    for route in &plan.routes {
        for stop in &route.stops {
            let idx = index_of[&stop.task_id];
            tasks[idx].status = AssignmentStatus::Assigned;
            tasks[idx].schedule = Some(ScheduleFragment {
                worker_id: route.worker_id,
                start_time: stop.start_time,
                end_time: stop.end_time,
                travel_minutes: stop.travel_minutes,
                sequence: 0,
                is_followup: true,
            });
        }
    }
    for task_id in &plan.skipped {
        let idx = index_of[task_id];
        tasks[idx].status = AssignmentStatus::UnassignedUnroutable;
    }

    // Final shape: one normalized route per worker with any assignment.
    let normalizer = ScheduleNormalizer::new(&travel, &config.day);
    let mut by_worker: HashMap<Uuid, Vec<Task>> = HashMap::new();
    for task in tasks.iter().filter(|t| t.status == AssignmentStatus::Assigned) {
        if let Some(worker_id) = task.assigned_worker() {
            by_worker.entry(worker_id).or_default().push(task.clone());
        }
    }

    let mut routes = Vec::new();
    for worker in &roster {
        let Some(mut route_tasks) = by_worker.remove(&worker.id) else {
            continue;
        };
        route_tasks.sort_by_key(|t| t.schedule.as_ref().map(|s| s.start_time));
        warnings.extend(normalizer.normalize(worker.id, config.day.start, &mut route_tasks));

        for task in &route_tasks {
            tasks[index_of[&task.id]] = task.clone();
        }

        let distance_km = route_tasks
            .windows(2)
            .map(|pair| haversine_distance(&pair[0].coordinates, &pair[1].coordinates))
            .sum();
        routes.push(WorkerRoute::from_tasks(worker.id, date, &route_tasks, distance_km));
    }

    let unassigned: Vec<UnassignedTask> = tasks
        .iter()
        .filter(|t| t.status.is_unassigned())
        .map(|t| UnassignedTask {
            task_id: t.id,
            status: t.status,
        })
        .collect();

    DateOutcome {
        date,
        tasks,
        greedy,
        routes,
        unassigned,
        premium_fallback: plan.premium_fallback,
        warnings,
        algorithm: plan.algorithm,
        solve_time_ms: started_at.elapsed().as_millis() as u64,
        solver_log: plan.solver_log,
    }
}
