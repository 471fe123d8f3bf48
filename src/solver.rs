// Copyright 2026 by Michael Thies <mail@mhthies.de>
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

//! Solver dispatch for one subproblem: small and medium groups go to the exact branch and bound
//! solver, large groups (and groups where the exact solver times out or fails) go to the greedy
//! packer. For a validated subproblem the dispatch cannot fail, since the packer always produces
//! a consolidation.

use std::time::Duration;

use log::{info, warn};

use crate::feasibility::FeasibilityIndex;
use crate::{mergebab, packing, SolveResult, SolverStatus, Subproblem};

/// Calibration constant of the dispatch: above this group size the exact solver is not attempted.
/// A knob, not a contract.
pub const DEFAULT_SIZE_THRESHOLD: usize = 80;
/// Default wall-clock budget of one exact solve
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30);

/// Preset selection for the two operating modes of the optimizer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Always use the greedy packer
    Fast,
    /// Attempt the exact solver on larger groups with a generous time budget
    Deep,
}

/// Tunable dispatch parameters
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum group size for which the exact solver is attempted
    pub size_threshold: usize,
    /// Wall-clock budget of one exact solve
    pub time_limit: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

impl Config {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Fast => Config {
                size_threshold: 0,
                ..Config::default()
            },
            Mode::Deep => Config {
                size_threshold: 200,
                time_limit: Duration::from_secs(600),
            },
        }
    }
}

/// Consolidate one subproblem, choosing the solver by group size and falling back to the greedy
/// packer when the exact solver gives up.
pub fn solve(subproblem: &Subproblem, config: &Config) -> SolveResult {
    if subproblem.is_empty() {
        return SolveResult::from_assignment(Vec::new(), SolverStatus::Optimal);
    }

    let index = FeasibilityIndex::build(subproblem);

    if subproblem.len() > config.size_threshold {
        info!(
            "Group {} is large (n={} > {}), using the greedy packer",
            subproblem.key(),
            subproblem.len(),
            config.size_threshold
        );
        return packing::pack(subproblem, &index);
    }

    match mergebab::solve(subproblem, &index, config.time_limit) {
        Ok((result, statistics)) => {
            info!(
                "Finished exact solve of group {} ({}). {}",
                subproblem.key(),
                result.status,
                statistics
            );
            result
        }
        Err(e) => {
            warn!(
                "Exact solver gave up on group {}: {}. Falling back to the greedy packer.",
                subproblem.key(),
                e
            );
            let mut result = packing::pack(subproblem, &index);
            result.status = SolverStatus::HeuristicFallback;
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{solve, Config, Mode};
    use crate::{assert_result_consistency, GroupKey, Room, SolverStatus, Subproblem};
    use std::time::Duration;

    fn subproblem(rows: &[(&str, &str, u32, u32)]) -> Subproblem {
        Subproblem::new(
            GroupKey {
                shift: "1".into(),
                campus: "A".into(),
            },
            rows.iter()
                .map(|(id, subject, students, capacity)| Room {
                    id: (*id).into(),
                    subject: (*subject).into(),
                    students: *students,
                    capacity: *capacity,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_group() {
        let sub = subproblem(&[]);
        let result = solve(&sub, &Config::default());
        assert!(result.assign.is_empty());
        assert_eq!(result.objective, 0);
        assert_eq!(result.status, SolverStatus::Optimal);
    }

    #[test]
    fn test_small_group_is_solved_exactly() {
        let sub = subproblem(&[("R1", "A", 5, 50), ("R2", "B", 5, 50)]);
        let result = solve(&sub, &Config::default());
        assert_result_consistency(&sub, &result);
        assert_eq!(result.status, SolverStatus::Optimal);
        assert_eq!(result.objective, 1);
    }

    #[test]
    fn test_fast_mode_always_packs() {
        let sub = subproblem(&[("R1", "A", 5, 50), ("R2", "B", 5, 50)]);
        let result = solve(&sub, &Config::for_mode(Mode::Fast));
        assert_result_consistency(&sub, &result);
        assert_eq!(result.status, SolverStatus::Heuristic);
        assert_eq!(result.objective, 1);
    }

    #[test]
    fn test_timeout_falls_back_to_packer() {
        let sub = subproblem(&[("R1", "A", 5, 50), ("R2", "B", 5, 50)]);
        let config = Config {
            time_limit: Duration::from_secs(0),
            ..Config::default()
        };
        let result = solve(&sub, &config);
        assert_result_consistency(&sub, &result);
        assert_eq!(result.status, SolverStatus::HeuristicFallback);
        assert_eq!(result.objective, 1);
    }

    #[test]
    fn test_raising_the_threshold_does_not_hurt() {
        let sub = subproblem(&[("R1", "A", 10, 30), ("R2", "B", 15, 30), ("R3", "A", 5, 30)]);
        let heuristic = solve(&sub, &Config::for_mode(Mode::Fast));
        let exact = solve(&sub, &Config::default());
        assert!(exact.objective <= heuristic.objective);
    }
}
