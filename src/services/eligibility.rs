//! Worker-to-task eligibility rules.
//!
//! Pure predicate over worker role class and task category. Overtime and
//! trainer rules are hard-coded; everything else comes from the configured
//! allow-lists, which fail open for categories they do not mention.

use tracing::debug;

use crate::config::EligibilityConfig;
use crate::types::{PriorityClass, RoleClass, Task, Worker};

/// Why a worker cannot take a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    /// Overtime task, worker lacks the individual authorization
    OvertimeNotAuthorized,
    /// Trainers never take early-out or overtime work
    TrainerExcluded,
    /// Apartment type allow-list does not include the worker's role class
    ApartmentTypeDenied,
    /// Priority class allow-list does not include the worker's role class
    PriorityDenied,
}

impl Ineligibility {
    pub const fn as_str(self) -> &'static str {
        match self {
            Ineligibility::OvertimeNotAuthorized => "overtime_not_authorized",
            Ineligibility::TrainerExcluded => "trainer_excluded",
            Ineligibility::ApartmentTypeDenied => "apartment_type_denied",
            Ineligibility::PriorityDenied => "priority_denied",
        }
    }
}

/// Configured eligibility policy
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    config: EligibilityConfig,
}

impl EligibilityPolicy {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    /// Check one worker against one task, with the blocking rule on failure.
    pub fn check(&self, worker: &Worker, task: &Task) -> Result<(), Ineligibility> {
        if task.overtime && !worker.overtime_authorized {
            return Err(Ineligibility::OvertimeNotAuthorized);
        }

        let class = worker.role_class();

        // Hard rule, overrides any configured allow-list.
        if class == RoleClass::Trainer
            && (task.overtime || task.priority == PriorityClass::EarlyOut)
        {
            return Err(Ineligibility::TrainerExcluded);
        }

        if let Some(allowed) = self.config.apartment_rules.get(&task.apartment_type) {
            if !allowed.contains(&class) {
                return Err(Ineligibility::ApartmentTypeDenied);
            }
        }

        if let Some(allowed) = self.config.priority_rules.get(&task.priority) {
            if !allowed.contains(&class) {
                return Err(Ineligibility::PriorityDenied);
            }
        }

        Ok(())
    }

    pub fn is_eligible(&self, worker: &Worker, task: &Task) -> bool {
        match self.check(worker, task) {
            Ok(()) => true,
            Err(reason) => {
                debug!(
                    "worker {} rejected for task {}: {}",
                    worker.id,
                    task.id,
                    reason.as_str()
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssignmentStatus, Coordinates, WorkerRole};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn task(apartment: &str, priority: PriorityClass, overtime: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            logistic_code: String::new(),
            coordinates: Coordinates { lat: 50.0, lng: 14.0 },
            address: "Dlouha 1".to_string(),
            cleaning_minutes: 45,
            checkout_time: None,
            checkin_deadline: None,
            premium: false,
            apartment_type: apartment.to_string(),
            priority,
            overtime,
            status: AssignmentStatus::Pending,
            schedule: None,
        }
    }

    fn worker(role: WorkerRole, overtime_authorized: bool) -> Worker {
        Worker {
            id: Uuid::new_v4(),
            name: String::new(),
            role,
            active: true,
            available: true,
            start_time: None,
            overtime_authorized,
            accumulated_hours: 0.0,
            home: Coordinates { lat: 50.0, lng: 14.0 },
        }
    }

    fn open_policy() -> EligibilityPolicy {
        EligibilityPolicy::new(EligibilityConfig::default())
    }

    #[test]
    fn test_unknown_categories_fail_open() {
        let policy = open_policy();
        let t = task("penthouse", PriorityClass::LowPriority, false);
        assert!(policy.is_eligible(&worker(WorkerRole::Standard, false), &t));
        assert!(policy.is_eligible(&worker(WorkerRole::Premium, false), &t));
        assert!(policy.is_eligible(&worker(WorkerRole::Trainer, false), &t));
    }

    #[test]
    fn test_overtime_requires_individual_authorization() {
        let policy = open_policy();
        let t = task("studio", PriorityClass::HighPriority, true);
        assert_eq!(
            policy.check(&worker(WorkerRole::Premium, false), &t),
            Err(Ineligibility::OvertimeNotAuthorized)
        );
        assert!(policy.check(&worker(WorkerRole::Premium, true), &t).is_ok());
    }

    #[test]
    fn test_trainer_excluded_from_early_out() {
        let policy = open_policy();
        let t = task("studio", PriorityClass::EarlyOut, false);
        assert_eq!(
            policy.check(&worker(WorkerRole::Trainer, false), &t),
            Err(Ineligibility::TrainerExcluded)
        );
    }

    #[test]
    fn test_trainer_excluded_from_overtime_even_when_authorized() {
        let policy = open_policy();
        let t = task("studio", PriorityClass::HighPriority, true);
        assert_eq!(
            policy.check(&worker(WorkerRole::Trainer, true), &t),
            Err(Ineligibility::TrainerExcluded)
        );
    }

    #[test]
    fn test_apartment_allow_list_denies_unlisted_class() {
        let mut config = EligibilityConfig::default();
        config
            .apartment_rules
            .insert("loft".to_string(), vec![RoleClass::Premium]);
        let policy = EligibilityPolicy::new(config);

        let t = task("loft", PriorityClass::HighPriority, false);
        assert!(policy.check(&worker(WorkerRole::Premium, false), &t).is_ok());
        assert_eq!(
            policy.check(&worker(WorkerRole::Standard, false), &t),
            Err(Ineligibility::ApartmentTypeDenied)
        );
    }

    #[test]
    fn test_priority_allow_list_checks_derived_class() {
        let mut priority_rules = HashMap::new();
        priority_rules.insert(
            PriorityClass::EarlyOut,
            vec![RoleClass::Premium, RoleClass::OvertimeSpecialist],
        );
        let policy = EligibilityPolicy::new(EligibilityConfig {
            apartment_rules: HashMap::new(),
            priority_rules,
        });

        let t = task("studio", PriorityClass::EarlyOut, false);
        // Plain standard is not listed; an authorized standard derives to
        // overtime specialist and passes.
        assert_eq!(
            policy.check(&worker(WorkerRole::Standard, false), &t),
            Err(Ineligibility::PriorityDenied)
        );
        assert!(policy.check(&worker(WorkerRole::Standard, true), &t).is_ok());
    }

    #[test]
    fn test_empty_allow_list_denies_everyone() {
        let mut config = EligibilityConfig::default();
        config.apartment_rules.insert("vault".to_string(), vec![]);
        let policy = EligibilityPolicy::new(config);

        let t = task("vault", PriorityClass::LowPriority, false);
        assert!(!policy.is_eligible(&worker(WorkerRole::Premium, false), &t));
        assert!(!policy.is_eligible(&worker(WorkerRole::Standard, false), &t));
    }
}
