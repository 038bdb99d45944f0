//! Multi-stop, time-windowed routing for one calendar date.
//!
//! Open routes: every worker starts from an origin (the end of their seed
//! task if they have one, otherwise the day's task centroid) and does not
//! return. A constructive cheapest-insertion phase places as many tasks as
//! it can, then a bounded local-search phase (2-opt and relocate) improves
//! the result until no move helps, the round cap is hit, or the wall-clock
//! deadline expires. Tasks that fit nowhere are skipped at a penalty, never
//! failed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::NaiveTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{DayConfig, SolverConfig};
use crate::services::bundling::{ClusterBundlingPolicy, MAX_DAILY_CAP};
use crate::services::eligibility::EligibilityPolicy;
use crate::services::travel::{
    haversine_distance, TravelStop, TravelTimeEstimator, UNREACHABLE_MINUTES,
};
use crate::types::{Coordinates, Task, Worker};

/// One routed task with resolved times
#[derive(Debug, Clone)]
pub struct PlannedStop {
    pub task_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Travel from the previous stop (or the origin) in whole minutes
    pub travel_minutes: u32,
}

/// One worker's routed stops, in visit order
#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub worker_id: Uuid,
    pub stops: Vec<PlannedStop>,
    /// Sum of consecutive great-circle legs, origin included
    pub distance_km: f64,
}

/// Result of routing one date
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub routes: Vec<PlannedRoute>,
    /// Tasks no route could take, in input order
    pub skipped: Vec<Uuid>,
    /// Premium tasks routed to non-premium workers (zero-premium fallback)
    pub premium_fallback: Vec<Uuid>,
    pub algorithm: String,
    pub solve_time_ms: u64,
    pub solver_log: Vec<String>,
}

impl RoutePlan {
    fn empty(algorithm: &str) -> Self {
        Self {
            routes: vec![],
            skipped: vec![],
            premium_fallback: vec![],
            algorithm: algorithm.to_string(),
            solve_time_ms: 0,
            solver_log: vec![],
        }
    }
}

pub struct RouteOptimizer<'a> {
    travel: &'a TravelTimeEstimator,
    eligibility: &'a EligibilityPolicy,
    bundling: &'a ClusterBundlingPolicy,
    solver: &'a SolverConfig,
    day: &'a DayConfig,
}

impl<'a> RouteOptimizer<'a> {
    pub fn new(
        travel: &'a TravelTimeEstimator,
        eligibility: &'a EligibilityPolicy,
        bundling: &'a ClusterBundlingPolicy,
        solver: &'a SolverConfig,
        day: &'a DayConfig,
    ) -> Self {
        Self {
            travel,
            eligibility,
            bundling,
            solver,
            day,
        }
    }

    /// Route `tasks` across `workers` for one date.
    ///
    /// `seeds` holds each worker's already-assigned tasks in schedule
    /// order; the last one fixes that worker's origin location and
    /// earliest departure. Honors the configured deadline and the
    /// cancellation token, returning the best plan found so far.
    pub fn solve_date(
        &self,
        tasks: &[Task],
        workers: &[Worker],
        seeds: &HashMap<Uuid, Vec<Task>>,
        cancel: &CancellationToken,
    ) -> RoutePlan {
        let started_at = Instant::now();

        if tasks.is_empty() {
            debug!("no follow-up tasks to route");
            let mut plan = RoutePlan::empty("none");
            plan.solver_log = vec!["no_stops".to_string()];
            return plan;
        }
        if workers.is_empty() {
            let mut plan = RoutePlan::empty("none");
            plan.skipped = tasks.iter().map(|t| t.id).collect();
            plan.solver_log = vec!["no_workers".to_string()];
            return plan;
        }

        let mut solver = Solver::build(self, tasks, workers, seeds);
        let deadline = started_at + Duration::from_secs(self.solver.deadline_secs as u64);

        solver.construct(deadline, cancel);
        let rounds = solver.improve(deadline, cancel);

        let mut plan = solver.extract();
        plan.algorithm = "insertion+local_search".to_string();
        plan.solve_time_ms = started_at.elapsed().as_millis() as u64;

        let mut log = vec![
            format!(
                "algorithm=insertion+local_search time_ms={} rounds={}",
                plan.solve_time_ms, rounds
            ),
            format!(
                "stops={} skipped={}",
                plan.routes.iter().map(|r| r.stops.len()).sum::<usize>(),
                plan.skipped.len()
            ),
        ];
        if Instant::now() >= deadline {
            log.push("deadline_hit".to_string());
        }
        if cancel.is_cancelled() {
            log.push("cancelled".to_string());
        }
        log.extend(plan.solver_log.drain(..));
        plan.solver_log = log;

        info!(
            "routed {} of {} tasks across {} workers in {} ms",
            tasks.len() - plan.skipped.len(),
            tasks.len(),
            workers.len(),
            plan.solve_time_ms
        );
        plan
    }
}

/// Working state for one solve. Node ids: `0..n_workers` are origins,
/// `n_workers..` are tasks.
struct Solver<'a> {
    optimizer: &'a RouteOptimizer<'a>,
    tasks: &'a [Task],
    workers: &'a [Worker],
    seeds: &'a HashMap<Uuid, Vec<Task>>,
    n_workers: usize,
    matrix: Vec<Vec<u32>>,
    /// Earliest service start per node, minutes since midnight
    earliest: Vec<u32>,
    /// Latest service start per node
    latest: Vec<u32>,
    service: Vec<u32>,
    coordinates: Vec<Coordinates>,
    /// allowed[worker][task]: eligibility plus the premium hard rule
    allowed: Vec<Vec<bool>>,
    has_premium: bool,
    /// Task-node sequences per worker route
    routes: Vec<Vec<usize>>,
    route_travel: Vec<u32>,
    assigned: Vec<bool>,
}

impl<'a> Solver<'a> {
    fn build(
        optimizer: &'a RouteOptimizer<'a>,
        tasks: &'a [Task],
        workers: &'a [Worker],
        seeds: &'a HashMap<Uuid, Vec<Task>>,
    ) -> Self {
        let n_workers = workers.len();
        let centroid = centroid_of(tasks);
        let has_premium = workers.iter().any(|w| w.is_premium());

        // Origin stops first, task stops after, matching node ids.
        let mut stop_coords: Vec<Coordinates> = Vec::with_capacity(n_workers + tasks.len());
        let mut stop_addresses: Vec<String> = Vec::with_capacity(n_workers + tasks.len());
        let mut earliest = Vec::with_capacity(n_workers + tasks.len());
        let mut latest = Vec::with_capacity(n_workers + tasks.len());
        let mut service = Vec::with_capacity(n_workers + tasks.len());

        let day_start = minutes_of(optimizer.day.start);
        let day_end = minutes_of(optimizer.day.end);

        for worker in workers {
            let seed = seeds.get(&worker.id).and_then(|tasks| tasks.last());
            match seed {
                Some(task) => {
                    stop_coords.push(task.coordinates);
                    stop_addresses.push(task.address.clone());
                    let ready = task
                        .schedule
                        .as_ref()
                        .map_or(day_start, |f| minutes_of(f.end_time));
                    earliest.push(ready);
                }
                None => {
                    stop_coords.push(centroid);
                    stop_addresses.push(String::new());
                    let ready = worker
                        .start_time
                        .map_or(day_start, |t| minutes_of(t).max(day_start));
                    earliest.push(ready);
                }
            }
            latest.push(day_end);
            service.push(0);
        }
        for task in tasks {
            stop_coords.push(task.coordinates);
            stop_addresses.push(task.address.clone());
            let ready = task
                .checkout_time
                .map_or(day_start, |t| minutes_of(t).max(day_start));
            earliest.push(ready);
            // The cleaning must be done before the checkin deadline, so the
            // latest start is the deadline minus the service time.
            let due = task.checkin_deadline.map_or(day_end, |t| {
                minutes_of(t).saturating_sub(task.cleaning_minutes).min(day_end)
            });
            latest.push(due);
            service.push(task.cleaning_minutes);
        }

        let stops: Vec<TravelStop<'_>> = stop_coords
            .iter()
            .zip(&stop_addresses)
            .map(|(c, a)| TravelStop {
                coordinates: *c,
                address: a,
            })
            .collect();
        let matrix = optimizer.travel.matrix(&stops);

        let allowed = workers
            .iter()
            .map(|worker| {
                tasks
                    .iter()
                    .map(|task| {
                        if task.premium && has_premium && !worker.is_premium() {
                            return false;
                        }
                        optimizer.eligibility.is_eligible(worker, task)
                    })
                    .collect()
            })
            .collect();

        Self {
            optimizer,
            tasks,
            workers,
            seeds,
            n_workers,
            matrix,
            earliest,
            latest,
            service,
            coordinates: stop_coords,
            allowed,
            has_premium,
            routes: vec![Vec::new(); n_workers],
            route_travel: vec![0; n_workers],
            assigned: vec![false; tasks.len()],
        }
    }

    fn task_node(&self, task_idx: usize) -> usize {
        self.n_workers + task_idx
    }

    /// Simulate one route; `Some(total travel minutes)` when every window,
    /// slack bound, and the route duration cap hold.
    fn simulate(&self, worker_idx: usize, route: &[usize]) -> Option<u32> {
        let cfg = self.optimizer.solver;
        let mut clock = self.earliest[worker_idx];
        let mut travel_total = 0u32;
        let mut prev = worker_idx;

        for &node in route {
            let leg = self.matrix[prev][node];
            if leg >= UNREACHABLE_MINUTES {
                return None;
            }
            let arrival = clock + leg;
            let start = arrival.max(self.earliest[node]);
            if start - arrival > cfg.wait_slack_minutes {
                return None;
            }
            if start > self.latest[node] {
                return None;
            }
            clock = start + self.service[node];
            travel_total += leg;
            prev = node;
        }

        if clock - self.earliest[worker_idx] > cfg.max_route_minutes {
            return None;
        }
        Some(travel_total)
    }

    /// Daily cap for adding `task_idx` to this worker's route: hard
    /// ceiling of four, with the cluster gate on the fourth.
    fn cap_allows(&self, worker_idx: usize, task_idx: usize) -> bool {
        let seed_tasks = self
            .seeds
            .get(&self.workers[worker_idx].id)
            .map_or(&[][..], |v| &v[..]);
        let held = seed_tasks.len() + self.routes[worker_idx].len();
        if held + 1 > MAX_DAILY_CAP {
            return false;
        }
        if held + 1 == MAX_DAILY_CAP {
            let existing: Vec<&Task> = seed_tasks
                .iter()
                .chain(
                    self.routes[worker_idx]
                        .iter()
                        .map(|&node| &self.tasks[node - self.n_workers]),
                )
                .collect();
            return self.optimizer.bundling.may_take(
                self.optimizer.travel,
                &existing,
                &self.tasks[task_idx],
            );
        }
        true
    }

    /// Cheapest feasible insertion until nothing fits or time runs out.
    /// An insertion whose travel delta reaches the skip penalty is worse
    /// than leaving the task off the routes.
    fn construct(&mut self, deadline: Instant, cancel: &CancellationToken) {
        let penalty = self.optimizer.solver.skip_penalty_minutes as i64;
        loop {
            if Instant::now() >= deadline || cancel.is_cancelled() {
                return;
            }

            let mut best: Option<(i64, usize, usize, usize)> = None;
            for task_idx in 0..self.tasks.len() {
                if self.assigned[task_idx] {
                    continue;
                }
                let node = self.task_node(task_idx);
                for worker_idx in 0..self.n_workers {
                    if !self.allowed[worker_idx][task_idx]
                        || !self.cap_allows(worker_idx, task_idx)
                    {
                        continue;
                    }
                    for pos in 0..=self.routes[worker_idx].len() {
                        let mut candidate = self.routes[worker_idx].clone();
                        candidate.insert(pos, node);
                        if let Some(total) = self.simulate(worker_idx, &candidate) {
                            // The same-building shortcut is not metric, so
                            // the delta can be negative.
                            let delta = total as i64 - self.route_travel[worker_idx] as i64;
                            if delta < penalty && best.map_or(true, |(d, ..)| delta < d) {
                                best = Some((delta, worker_idx, pos, task_idx));
                            }
                        }
                    }
                }
            }

            match best {
                Some((_, worker_idx, pos, task_idx)) => {
                    let node = self.task_node(task_idx);
                    self.routes[worker_idx].insert(pos, node);
                    self.route_travel[worker_idx] = self
                        .simulate(worker_idx, &self.routes[worker_idx])
                        .unwrap_or(self.route_travel[worker_idx]);
                    self.assigned[task_idx] = true;
                }
                None => return,
            }
        }
    }

    /// 2-opt and relocate sweeps until no move improves, the round cap is
    /// hit, or time runs out. Returns the number of rounds run.
    fn improve(&mut self, deadline: Instant, cancel: &CancellationToken) -> u32 {
        let mut rounds = 0;
        while rounds < self.optimizer.solver.max_rounds {
            if Instant::now() >= deadline || cancel.is_cancelled() {
                break;
            }
            rounds += 1;

            let mut improved = false;
            improved |= self.two_opt_sweep();
            improved |= self.relocate_sweep();
            // Moves may have opened room for tasks skipped earlier.
            improved |= self.reinsert_skipped();

            if !improved {
                break;
            }
        }
        rounds
    }

    fn two_opt_sweep(&mut self) -> bool {
        let mut improved = false;
        for worker_idx in 0..self.n_workers {
            let len = self.routes[worker_idx].len();
            if len < 3 {
                continue;
            }
            for i in 0..len - 1 {
                for j in i + 1..len {
                    let mut candidate = self.routes[worker_idx].clone();
                    candidate[i..=j].reverse();
                    if let Some(total) = self.simulate(worker_idx, &candidate) {
                        if total < self.route_travel[worker_idx] {
                            self.routes[worker_idx] = candidate;
                            self.route_travel[worker_idx] = total;
                            improved = true;
                        }
                    }
                }
            }
        }
        improved
    }

    fn relocate_sweep(&mut self) -> bool {
        let mut improved = false;
        for from in 0..self.n_workers {
            let mut i = 0;
            while i < self.routes[from].len() {
                let node = self.routes[from][i];
                let task_idx = node - self.n_workers;

                let mut donor = self.routes[from].clone();
                donor.remove(i);
                let donor_travel = match self.simulate(from, &donor) {
                    Some(total) => total,
                    None => {
                        i += 1;
                        continue;
                    }
                };
                // Removing a stop can raise the donor's travel when the
                // same-building shortcut was carrying the route, so the
                // saving may be negative and no relocation will beat it.
                let saved = self.route_travel[from] as i64 - donor_travel as i64;

                let mut best: Option<(i64, usize, usize, u32)> = None;
                for to in 0..self.n_workers {
                    if to == from
                        || !self.allowed[to][task_idx]
                        || !self.cap_allows(to, task_idx)
                    {
                        continue;
                    }
                    for pos in 0..=self.routes[to].len() {
                        let mut candidate = self.routes[to].clone();
                        candidate.insert(pos, node);
                        if let Some(total) = self.simulate(to, &candidate) {
                            let added = total as i64 - self.route_travel[to] as i64;
                            if added < saved && best.map_or(true, |(a, ..)| added < a) {
                                best = Some((added, to, pos, total));
                            }
                        }
                    }
                }

                if let Some((_, to, pos, total)) = best {
                    self.routes[from].remove(i);
                    self.route_travel[from] = donor_travel;
                    self.routes[to].insert(pos, node);
                    self.route_travel[to] = total;
                    improved = true;
                    // Same index now holds the next stop.
                } else {
                    i += 1;
                }
            }
        }
        improved
    }

    fn reinsert_skipped(&mut self) -> bool {
        let penalty = self.optimizer.solver.skip_penalty_minutes as i64;
        let mut improved = false;
        for task_idx in 0..self.tasks.len() {
            if self.assigned[task_idx] {
                continue;
            }
            let node = self.task_node(task_idx);
            let mut best: Option<(i64, usize, usize, u32)> = None;
            for worker_idx in 0..self.n_workers {
                if !self.allowed[worker_idx][task_idx] || !self.cap_allows(worker_idx, task_idx)
                {
                    continue;
                }
                for pos in 0..=self.routes[worker_idx].len() {
                    let mut candidate = self.routes[worker_idx].clone();
                    candidate.insert(pos, node);
                    if let Some(total) = self.simulate(worker_idx, &candidate) {
                        let delta = total as i64 - self.route_travel[worker_idx] as i64;
                        if delta < penalty && best.map_or(true, |(d, ..)| delta < d) {
                            best = Some((delta, worker_idx, pos, total));
                        }
                    }
                }
            }
            if let Some((_, worker_idx, pos, total)) = best {
                self.routes[worker_idx].insert(pos, node);
                self.route_travel[worker_idx] = total;
                self.assigned[task_idx] = true;
                improved = true;
            }
        }
        improved
    }

    /// Resolve final times per route and collect skips and fallbacks.
    fn extract(&self) -> RoutePlan {
        let mut plan = RoutePlan::empty("");

        for worker_idx in 0..self.n_workers {
            let route = &self.routes[worker_idx];
            if route.is_empty() {
                continue;
            }

            let mut stops = Vec::with_capacity(route.len());
            let mut distance_km = 0.0;
            let mut clock = self.earliest[worker_idx];
            let mut prev = worker_idx;

            for &node in route {
                let leg = self.matrix[prev][node];
                let arrival = clock + leg;
                let start = arrival.max(self.earliest[node]);
                let end = start + self.service[node];
                let task = &self.tasks[node - self.n_workers];

                if task.premium && !self.workers[worker_idx].is_premium() {
                    plan.premium_fallback.push(task.id);
                }
                distance_km +=
                    haversine_distance(&self.coordinates[prev], &self.coordinates[node]);
                stops.push(PlannedStop {
                    task_id: task.id,
                    start_time: time_of(start),
                    end_time: time_of(end),
                    travel_minutes: leg,
                });
                clock = end;
                prev = node;
            }

            plan.routes.push(PlannedRoute {
                worker_id: self.workers[worker_idx].id,
                stops,
                distance_km,
            });
        }

        plan.skipped = self
            .tasks
            .iter()
            .zip(&self.assigned)
            .filter(|(_, assigned)| !**assigned)
            .map(|(t, _)| t.id)
            .collect();

        if self.has_premium {
            debug_assert!(plan.premium_fallback.is_empty());
        }
        plan
    }
}

fn centroid_of(tasks: &[Task]) -> Coordinates {
    if tasks.is_empty() {
        return Coordinates { lat: 0.0, lng: 0.0 };
    }
    let n = tasks.len() as f64;
    Coordinates {
        lat: tasks.iter().map(|t| t.coordinates.lat).sum::<f64>() / n,
        lng: tasks.iter().map(|t| t.coordinates.lng).sum::<f64>() / n,
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    use chrono::Timelike;
    time.num_seconds_from_midnight() / 60
}

fn time_of(minutes: u32) -> NaiveTime {
    let clamped = minutes.min(24 * 60 - 1);
    NaiveTime::from_hms_opt(clamped / 60, clamped % 60, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 0).expect("valid time"))
}
