//! Fairness-aware greedy assignment pass.
//!
//! One sequential pass over an ordered task list: premium tasks first
//! against premium workers, then everything else against the rest of the
//! roster with premium workers as fallback. Each worker takes at most one
//! task per pass. Worker order ranks overtime-authorized and premium
//! workers first and, by default, prefers already-loaded workers so
//! fresh low-hour workers stay free for later passes.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{GreedyConfig, TieBreak};
use crate::services::bundling::ClusterBundlingPolicy;
use crate::services::eligibility::EligibilityPolicy;
use crate::services::travel::TravelTimeEstimator;
use crate::types::{AssignmentStatus, GreedySummary, ScheduleFragment, Task, Worker};

pub struct FairnessGreedyAssigner<'a> {
    eligibility: &'a EligibilityPolicy,
    bundling: &'a ClusterBundlingPolicy,
    travel: &'a TravelTimeEstimator,
    config: &'a GreedyConfig,
}

impl<'a> FairnessGreedyAssigner<'a> {
    pub fn new(
        eligibility: &'a EligibilityPolicy,
        bundling: &'a ClusterBundlingPolicy,
        travel: &'a TravelTimeEstimator,
        config: &'a GreedyConfig,
    ) -> Self {
        Self {
            eligibility,
            bundling,
            travel,
            config,
        }
    }

    /// Run one pass over `tasks`, writing statuses and schedule fragments
    /// in place. Only pending tasks are touched; tasks assigned before the
    /// pass count toward their worker's daily bundle. Task order is
    /// preserved.
    pub fn assign(
        &self,
        tasks: &mut [Task],
        workers: &[Worker],
        day_start: NaiveTime,
    ) -> GreedySummary {
        let ranked = self.ranked_workers(workers);
        let mut used: Vec<bool> = vec![false; ranked.len()];

        // Pre-pass assignments per worker, for the bundling check.
        let mut bundles: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, task) in tasks.iter().enumerate() {
            if let Some(worker_id) = task.assigned_worker() {
                bundles.entry(worker_id).or_default().push(idx);
            }
        }

        let mut summary = GreedySummary::default();

        // Tier 1: premium tasks against premium workers only.
        for task_idx in 0..tasks.len() {
            if tasks[task_idx].status != AssignmentStatus::Pending || !tasks[task_idx].premium {
                continue;
            }
            let pick = self.pick_worker(tasks, task_idx, &ranked, &used, &bundles, |w| {
                w.is_premium()
            });
            match pick {
                Some(rank) => {
                    used[rank] = true;
                    self.place(tasks, task_idx, ranked[rank], day_start, &mut bundles);
                    summary.assigned += 1;
                }
                None => {
                    debug!(
                        "premium task {} has no premium worker left",
                        tasks[task_idx].id
                    );
                    tasks[task_idx].status = AssignmentStatus::UnassignedPremiumRule;
                    summary.unassigned_premium_rule += 1;
                }
            }
        }

        // Tier 2: everything else, non-premium workers first.
        for task_idx in 0..tasks.len() {
            if tasks[task_idx].status != AssignmentStatus::Pending {
                continue;
            }
            let pick = self
                .pick_worker(tasks, task_idx, &ranked, &used, &bundles, |w| {
                    !w.is_premium()
                })
                .or_else(|| {
                    self.pick_worker(tasks, task_idx, &ranked, &used, &bundles, |w| {
                        w.is_premium()
                    })
                });
            match pick {
                Some(rank) => {
                    used[rank] = true;
                    self.place(tasks, task_idx, ranked[rank], day_start, &mut bundles);
                    summary.assigned += 1;
                }
                None if used.iter().all(|u| *u) => {
                    tasks[task_idx].status = AssignmentStatus::UnassignedNoCleaners;
                    summary.unassigned_no_cleaners += 1;
                }
                None => {
                    tasks[task_idx].status = AssignmentStatus::UnassignedIneligible;
                    summary.unassigned_ineligible += 1;
                }
            }
        }

        summary.unused_workers = ranked
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(w, _)| w.id)
            .collect();

        info!(
            "greedy pass: {} assigned, {} unassigned, {} workers unused",
            summary.assigned,
            summary.unassigned_premium_rule
                + summary.unassigned_no_cleaners
                + summary.unassigned_ineligible,
            summary.unused_workers.len()
        );

        summary
    }

    /// Workers in assignment priority order.
    fn ranked_workers<'w>(&self, workers: &'w [Worker]) -> Vec<&'w Worker> {
        let mut ranked: Vec<&Worker> = workers.iter().collect();
        ranked.sort_by(|a, b| {
            b.overtime_authorized
                .cmp(&a.overtime_authorized)
                .then_with(|| b.is_premium().cmp(&a.is_premium()))
                .then_with(|| {
                    let by_hours = b
                        .accumulated_hours
                        .partial_cmp(&a.accumulated_hours)
                        .unwrap_or(Ordering::Equal);
                    match self.config.tie_break {
                        TieBreak::MostLoadedFirst => by_hours,
                        TieBreak::LeastLoadedFirst => by_hours.reverse(),
                    }
                })
        });
        ranked
    }

    /// First unused worker passing the tier filter, eligibility, and the
    /// bundling cap for the given task.
    fn pick_worker(
        &self,
        tasks: &[Task],
        task_idx: usize,
        ranked: &[&Worker],
        used: &[bool],
        bundles: &HashMap<Uuid, Vec<usize>>,
        tier: impl Fn(&Worker) -> bool,
    ) -> Option<usize> {
        let task = &tasks[task_idx];
        (0..ranked.len()).find(|&rank| {
            if used[rank] || !tier(ranked[rank]) {
                return false;
            }
            if !self.eligibility.is_eligible(ranked[rank], task) {
                return false;
            }
            let existing: Vec<&Task> = bundles
                .get(&ranked[rank].id)
                .map(|indices| indices.iter().map(|&i| &tasks[i]).collect())
                .unwrap_or_default();
            self.bundling.may_take(self.travel, &existing, task)
        })
    }

    fn place(
        &self,
        tasks: &mut [Task],
        task_idx: usize,
        worker: &Worker,
        day_start: NaiveTime,
        bundles: &mut HashMap<Uuid, Vec<usize>>,
    ) {
        let start_time = tasks[task_idx]
            .checkout_time
            .map_or(day_start, |checkout| checkout.max(day_start));
        let end_time = add_minutes(start_time, tasks[task_idx].cleaning_minutes as i64);
        tasks[task_idx].status = AssignmentStatus::Assigned;
        tasks[task_idx].schedule = Some(ScheduleFragment {
            worker_id: worker.id,
            start_time,
            end_time,
            travel_minutes: 0,
            sequence: 1,
            is_followup: false,
        });
        bundles.entry(worker.id).or_default().push(task_idx);
        debug!("task {} -> worker {}", tasks[task_idx].id, worker.id);
    }
}

fn add_minutes(time: NaiveTime, minutes: i64) -> NaiveTime {
    use chrono::Timelike;
    let total_secs = time.num_seconds_from_midnight() as i64 + minutes * 60;
    let clamped = total_secs.clamp(0, 24 * 60 * 60 - 1) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(clamped, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 59).expect("valid time"))
}
