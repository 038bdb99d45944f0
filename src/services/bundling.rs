//! Daily task bundling limits.
//!
//! A worker holds at most three tasks per day by default. A fourth is
//! allowed only when the day's tasks form a tight geographic cluster, so
//! the extra stop does not stretch the route. Five is never allowed.

use std::collections::VecDeque;

use crate::config::BundlingConfig;
use crate::services::travel::{TravelStop, TravelTimeEstimator};
use crate::types::Task;

/// Tasks per worker per day without a clustering check
pub const BASELINE_DAILY_CAP: usize = 3;

/// Absolute ceiling regardless of clustering
pub const MAX_DAILY_CAP: usize = 4;

/// Configured bundling policy
#[derive(Debug, Clone)]
pub struct ClusterBundlingPolicy {
    config: BundlingConfig,
}

impl ClusterBundlingPolicy {
    pub fn new(config: BundlingConfig) -> Self {
        Self { config }
    }

    /// May `candidate` join a worker's `existing` daily tasks?
    ///
    /// Below the baseline cap the answer is always yes. The fourth task
    /// needs the existing set connected under the near threshold, the
    /// candidate very near at least one existing task, and the combined
    /// set still connected. Thresholds compare movement minutes net of
    /// the fixed per-leg preparation time, which applies to every pair
    /// equally and says nothing about proximity.
    pub fn may_take(
        &self,
        travel: &TravelTimeEstimator,
        existing: &[&Task],
        candidate: &Task,
    ) -> bool {
        if existing.len() < BASELINE_DAILY_CAP {
            return true;
        }
        if existing.len() >= MAX_DAILY_CAP {
            return false;
        }

        // Matrix over existing tasks plus the candidate as the last node.
        let stops: Vec<TravelStop<'_>> = existing
            .iter()
            .map(|t| TravelStop {
                coordinates: t.coordinates,
                address: &t.address,
            })
            .chain(std::iter::once(TravelStop {
                coordinates: candidate.coordinates,
                address: &candidate.address,
            }))
            .collect();
        let base = travel.base_minutes();
        let mut matrix = travel.matrix(&stops);
        for row in &mut matrix {
            for cell in row.iter_mut() {
                *cell = cell.saturating_sub(base);
            }
        }
        let n = existing.len();

        if !connected(&matrix, n, self.config.near_minutes) {
            return false;
        }

        let very_near = (0..n).any(|i| matrix[n][i] <= self.config.very_near_minutes);
        if !very_near {
            return false;
        }

        connected(&matrix, n + 1, self.config.near_minutes)
    }
}

/// Breadth-first connectivity over the first `n` nodes of a travel-minute
/// matrix, with edges where travel is within `near`. Zero or one node is
/// trivially connected.
fn connected(matrix: &[Vec<u32>], n: usize, near: u32) -> bool {
    if n <= 1 {
        return true;
    }

    let mut seen = vec![false; n];
    let mut queue = VecDeque::new();
    seen[0] = true;
    queue.push_back(0);

    while let Some(i) = queue.pop_front() {
        for j in 0..n {
            if !seen[j] && matrix[i][j] <= near {
                seen[j] = true;
                queue.push_back(j);
            }
        }
    }

    seen.into_iter().all(|s| s)
}
