//! Schedule normalization for one worker's route.
//!
//! Two idempotent operations: a time propagation that walks the route with
//! a running clock and recomputes travel/start/end fields, and a sequence
//! normalization that moves overtime stops to the front of the route. Both
//! are safe to re-run on already-normalized input, including after manual
//! edits upstream.

use chrono::NaiveTime;
use tracing::debug;
use uuid::Uuid;

use crate::config::DayConfig;
use crate::services::travel::{TravelStop, TravelTimeEstimator};
use crate::types::{PlanWarning, ScheduleFragment, Task};

pub struct ScheduleNormalizer<'a> {
    travel: &'a TravelTimeEstimator,
    day: &'a DayConfig,
}

impl<'a> ScheduleNormalizer<'a> {
    pub fn new(travel: &'a TravelTimeEstimator, day: &'a DayConfig) -> Self {
        Self { travel, day }
    }

    /// Full normalization: order overtime stops first, then recompute all
    /// time fields for the final order.
    pub fn normalize(
        &self,
        worker_id: Uuid,
        day_start: NaiveTime,
        tasks: &mut Vec<Task>,
    ) -> Vec<PlanWarning> {
        self.propagate_times(worker_id, day_start, tasks);
        self.normalize_sequence(tasks);
        self.propagate_times(worker_id, day_start, tasks)
    }

    /// Walk the route in order and recompute travel, start, end, sequence,
    /// and follow-up fields. A stop never starts before the running clock
    /// or its own checkout availability. Deadline and shift-end breaches
    /// are flagged, never rejected.
    pub fn propagate_times(
        &self,
        worker_id: Uuid,
        day_start: NaiveTime,
        tasks: &mut [Task],
    ) -> Vec<PlanWarning> {
        let mut warnings = Vec::new();
        let mut clock = day_start;

        for i in 0..tasks.len() {
            let travel_minutes = if i == 0 {
                0
            } else {
                let minutes = self.travel.minutes(
                    TravelStop {
                        coordinates: tasks[i - 1].coordinates,
                        address: &tasks[i - 1].address,
                    },
                    TravelStop {
                        coordinates: tasks[i].coordinates,
                        address: &tasks[i].address,
                    },
                );
                clock = add_minutes(clock, minutes as i64);
                minutes
            };

            let task = &mut tasks[i];
            let start_time = task
                .checkout_time
                .map_or(clock, |checkout| checkout.max(clock));
            let end_time = add_minutes(start_time, task.cleaning_minutes as i64);

            if let Some(deadline) = task.checkin_deadline {
                if end_time > deadline {
                    warnings.push(PlanWarning::for_task(
                        "CHECKIN_DEADLINE_BREACH",
                        task.id,
                        format!(
                            "cleaning ends {} after checkin deadline {}",
                            end_time.format("%H:%M"),
                            deadline.format("%H:%M")
                        ),
                    ));
                }
            }
            if end_time > self.day.end {
                warnings.push(PlanWarning::for_task(
                    "SHIFT_END_BREACH",
                    task.id,
                    format!(
                        "cleaning ends {} after shift end {}",
                        end_time.format("%H:%M"),
                        self.day.end.format("%H:%M")
                    ),
                ));
            }

            task.schedule = Some(ScheduleFragment {
                worker_id,
                start_time,
                end_time,
                travel_minutes,
                sequence: (i + 1) as u32,
                is_followup: i > 0,
            });
            clock = end_time;
        }

        if !warnings.is_empty() {
            debug!(
                "worker {} route has {} time breaches",
                worker_id,
                warnings.len()
            );
        }
        warnings
    }

    /// Move overtime stops to the front of the route, ordered by start
    /// time; every other stop keeps its existing relative order. Only
    /// sequence and follow-up fields are rewritten.
    pub fn normalize_sequence(&self, tasks: &mut Vec<Task>) {
        let mut overtime: Vec<Task> = Vec::new();
        let mut rest: Vec<Task> = Vec::new();
        for task in tasks.drain(..) {
            if task.overtime {
                overtime.push(task);
            } else {
                rest.push(task);
            }
        }
        // Stable, so equal start times keep their input order.
        overtime.sort_by_key(|t| t.schedule.as_ref().map(|s| s.start_time));

        tasks.extend(overtime);
        tasks.extend(rest);

        for (i, task) in tasks.iter_mut().enumerate() {
            if let Some(fragment) = task.schedule.as_mut() {
                fragment.sequence = (i + 1) as u32;
                fragment.is_followup = i > 0;
            }
        }
    }
}

fn add_minutes(time: NaiveTime, minutes: i64) -> NaiveTime {
    use chrono::Timelike;
    let total_secs = time.num_seconds_from_midnight() as i64 + minutes * 60;
    let clamped = total_secs.clamp(0, 24 * 60 * 60 - 1) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(clamped, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 59).expect("valid time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TravelConfig;
    use crate::types::{AssignmentStatus, Coordinates, PriorityClass};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn task_at(lat: f64, address: &str, cleaning_minutes: u32) -> Task {
        Task {
            id: Uuid::new_v4(),
            logistic_code: String::new(),
            coordinates: Coordinates { lat, lng: 14.0 },
            address: address.to_string(),
            cleaning_minutes,
            checkout_time: None,
            checkin_deadline: None,
            premium: false,
            apartment_type: "studio".to_string(),
            priority: PriorityClass::HighPriority,
            overtime: false,
            status: AssignmentStatus::Assigned,
            schedule: None,
        }
    }

    struct Fixture {
        travel: TravelTimeEstimator,
        day: DayConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                travel: TravelTimeEstimator::new(TravelConfig::default()),
                day: DayConfig::default(),
            }
        }

        fn normalizer(&self) -> ScheduleNormalizer<'_> {
            ScheduleNormalizer::new(&self.travel, &self.day)
        }
    }

    // Stops 0.01 deg of latitude apart are a 10-minute leg under the
    // default travel settings.

    #[test]
    fn test_empty_route_is_noop() {
        let fixture = Fixture::new();
        let mut tasks: Vec<Task> = vec![];
        let warnings = fixture
            .normalizer()
            .normalize(Uuid::nil(), hm(8, 0), &mut tasks);
        assert!(tasks.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_times_chain_through_the_route() {
        let fixture = Fixture::new();
        let worker = Uuid::new_v4();
        let mut tasks = vec![task_at(50.00, "A 1", 60), task_at(50.01, "B 2", 30)];

        let warnings = fixture
            .normalizer()
            .propagate_times(worker, hm(8, 0), &mut tasks);
        assert!(warnings.is_empty());

        let first = tasks[0].schedule.as_ref().unwrap();
        assert_eq!(first.start_time, hm(8, 0));
        assert_eq!(first.end_time, hm(9, 0));
        assert_eq!(first.travel_minutes, 0);
        assert_eq!(first.sequence, 1);
        assert!(!first.is_followup);
        assert_eq!(first.worker_id, worker);

        let second = tasks[1].schedule.as_ref().unwrap();
        assert_eq!(second.travel_minutes, 10);
        assert_eq!(second.start_time, hm(9, 10));
        assert_eq!(second.end_time, hm(9, 40));
        assert_eq!(second.sequence, 2);
        assert!(second.is_followup);
    }

    #[test]
    fn test_checkout_availability_delays_start() {
        let fixture = Fixture::new();
        let mut first = task_at(50.00, "A 1", 30);
        first.checkout_time = Some(hm(10, 0));
        let mut second = task_at(50.01, "B 2", 30);
        second.checkout_time = Some(hm(11, 30));
        let mut tasks = vec![first, second];

        fixture
            .normalizer()
            .propagate_times(Uuid::nil(), hm(8, 0), &mut tasks);

        // First stop waits for its checkout, second waits past arrival.
        assert_eq!(tasks[0].schedule.as_ref().unwrap().start_time, hm(10, 0));
        assert_eq!(tasks[1].schedule.as_ref().unwrap().start_time, hm(11, 30));
    }

    #[test]
    fn test_deadline_breach_is_flagged_not_rejected() {
        let fixture = Fixture::new();
        let mut late = task_at(50.00, "A 1", 90);
        late.checkin_deadline = Some(hm(9, 0));
        let mut tasks = vec![late];

        let warnings = fixture
            .normalizer()
            .propagate_times(Uuid::nil(), hm(8, 0), &mut tasks);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, "CHECKIN_DEADLINE_BREACH");
        assert_eq!(warnings[0].task_id, Some(tasks[0].id));
        // The fragment is still written.
        assert_eq!(tasks[0].schedule.as_ref().unwrap().end_time, hm(9, 30));
    }

    #[test]
    fn test_shift_end_breach_is_flagged() {
        let fixture = Fixture::new();
        let mut evening = task_at(50.00, "A 1", 120);
        evening.checkout_time = Some(hm(16, 0));
        let mut tasks = vec![evening];

        let warnings = fixture
            .normalizer()
            .propagate_times(Uuid::nil(), hm(8, 0), &mut tasks);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, "SHIFT_END_BREACH");
    }

    #[test]
    fn test_propagation_is_idempotent() {
        let fixture = Fixture::new();
        let worker = Uuid::new_v4();
        let mut one = task_at(50.00, "A 1", 45);
        one.checkout_time = Some(hm(9, 30));
        let mut tasks = vec![one, task_at(50.01, "B 2", 60), task_at(50.02, "C 3", 30)];

        fixture.normalizer().normalize(worker, hm(8, 0), &mut tasks);
        let first_pass: Vec<ScheduleFragment> =
            tasks.iter().map(|t| t.schedule.clone().unwrap()).collect();

        fixture.normalizer().normalize(worker, hm(8, 0), &mut tasks);
        let second_pass: Vec<ScheduleFragment> =
            tasks.iter().map(|t| t.schedule.clone().unwrap()).collect();

        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_overtime_stops_move_first_sorted_by_start() {
        let fixture = Fixture::new();
        let mut tasks = vec![
            task_at(50.00, "A 1", 30),
            task_at(50.01, "B 2", 30),
            task_at(50.02, "C 3", 30),
            task_at(50.03, "D 4", 30),
        ];
        tasks[1].overtime = true;
        tasks[3].overtime = true;
        let normal_first = tasks[0].id;
        let normal_second = tasks[2].id;
        let overtime_early = tasks[1].id;
        let overtime_late = tasks[3].id;

        fixture
            .normalizer()
            .propagate_times(Uuid::nil(), hm(8, 0), &mut tasks);
        fixture.normalizer().normalize_sequence(&mut tasks);

        let order: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(
            order,
            vec![overtime_early, overtime_late, normal_first, normal_second]
        );
        let sequences: Vec<u32> = tasks
            .iter()
            .map(|t| t.schedule.as_ref().unwrap().sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert!(!tasks[0].schedule.as_ref().unwrap().is_followup);
        assert!(tasks[1].schedule.as_ref().unwrap().is_followup);
    }

    #[test]
    fn test_sequence_normalization_never_reorders_regular_stops() {
        let fixture = Fixture::new();
        let mut tasks = vec![
            task_at(50.02, "C 3", 30),
            task_at(50.00, "A 1", 30),
            task_at(50.01, "B 2", 30),
        ];
        let original: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

        fixture
            .normalizer()
            .propagate_times(Uuid::nil(), hm(8, 0), &mut tasks);
        fixture.normalizer().normalize_sequence(&mut tasks);

        let after: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(original, after);
    }

    #[test]
    fn test_sequence_normalization_is_idempotent() {
        let fixture = Fixture::new();
        let mut tasks = vec![
            task_at(50.00, "A 1", 30),
            task_at(50.01, "B 2", 30),
            task_at(50.02, "C 3", 30),
        ];
        tasks[2].overtime = true;

        fixture
            .normalizer()
            .normalize(Uuid::nil(), hm(8, 0), &mut tasks);
        let once: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        fixture.normalizer().normalize_sequence(&mut tasks);
        let twice: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(once, twice);
    }
}
