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

//! A specialization of the generic branch and bound algorithm from `bab` for the room
//! consolidation problem.
//!
//! Each node of the search tree carries the 0/1 variable fixings accumulated along its path. The
//! node solver hands the fixings to the LP relaxation from the `lp` module: an integer-valued
//! relaxation is a feasible consolidation and becomes an incumbent; a fractional one is branched
//! on its most fractional open-room variable (falling back to assignment variables once all
//! open-room values are integral), trying the closed child first. Fractional bounds are rounded
//! up, since the objective counts rooms.

use std::time::Duration;

use log::{debug, warn};
use ordered_float::NotNan;

use crate::bab::{self, NodeResult};
use crate::feasibility::FeasibilityIndex;
use crate::lp::{self, BranchVar, LpSolution, RelaxationModel};
use crate::{Assignment, SolveResult, SolverError, SolverStatus, Subproblem};

/// Tolerance below which a relaxation value counts as integral
const INT_TOL: f64 = 1e-6;

/// Parameter set for one subproblem of the branch and bound search: the variable fixings
/// accumulated along the path from the root node.
#[derive(Clone, Debug)]
struct MergeNode {
    fixings: Vec<(BranchVar, bool)>,
}

// Nodes are ordered by their depth in the branch and bound tree (i.e. the number of fixings) for
// the pseudo-depth-first prioritization of the search.
impl Ord for MergeNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fixings.len().cmp(&other.fixings.len())
    }
}

impl PartialOrd for MergeNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for MergeNode {}

impl PartialEq for MergeNode {
    fn eq(&self, other: &Self) -> bool {
        self.fixings.len() == other.fixings.len()
    }
}

/// Solve one subproblem to proven optimality within the given wall-clock budget.
///
/// Returns the consolidation result ([SolverStatus::Optimal] when the search ran to completion,
/// [SolverStatus::Feasible] for the incumbent of an expired budget) together with the search
/// statistics. Fails with [SolverError::SolverTimeout] when the budget expires without an
/// incumbent and with [SolverError::SolverFailure] when the LP engine misbehaves.
pub fn solve(
    subproblem: &Subproblem,
    index: &FeasibilityIndex,
    time_limit: Duration,
) -> Result<(SolveResult, bab::Statistics), SolverError> {
    let model = RelaxationModel::new(subproblem, index);
    let mut engine_error: Option<String> = None;

    let (result, statistics) = bab::solve(
        |node: MergeNode| run_node(&model, node, &mut engine_error),
        MergeNode {
            fixings: Vec::new(),
        },
        time_limit,
    );

    match result {
        Some((assignment, _)) => {
            let status = if statistics.timed_out {
                SolverStatus::Feasible
            } else {
                SolverStatus::Optimal
            };
            Ok((SolveResult::from_assignment(assignment, status), statistics))
        }
        None => {
            if let Some(message) = engine_error {
                Err(SolverError::SolverFailure(message))
            } else if statistics.timed_out {
                Err(SolverError::SolverTimeout)
            } else {
                // The self edges make every subproblem feasible, so an exhausted search without
                // an incumbent means the relaxation engine reported nonsense.
                Err(SolverError::SolverFailure(
                    "search exhausted without a solution for a feasible problem".into(),
                ))
            }
        }
    }
}

/// Solver for a single branch and bound node: solve the LP relaxation under the node's fixings,
/// then either report the integral solution as feasible or branch on a fractional variable.
fn run_node(
    model: &RelaxationModel,
    node: MergeNode,
    engine_error: &mut Option<String>,
) -> NodeResult<MergeNode, Assignment, u32> {
    let lp = match lp::solve_relaxation(model, &node.fixings) {
        Ok(Some(lp)) => lp,
        Ok(None) => {
            debug!(
                "Relaxation infeasible under {} fixings",
                node.fixings.len()
            );
            return NodeResult::NoSolution;
        }
        Err(message) => {
            warn!("Relaxation engine error: {}", message);
            *engine_error = Some(message);
            return NodeResult::NoSolution;
        }
    };

    // The objective counts rooms, so fractional bounds round up
    let bound = (lp.objective - INT_TOL).ceil().max(0.0) as u32;

    match fractional_variable(&lp) {
        None => {
            let assignment = extract_assignment(model, &lp);
            let mut open = assignment.clone();
            open.sort_unstable();
            open.dedup();
            NodeResult::Feasible(assignment, open.len() as u32)
        }
        Some(var) => {
            let mut closed_child = node.clone();
            closed_child.fixings.push((var, false));
            let mut open_child = node;
            open_child.fixings.push((var, true));
            // The closed child drives the objective down, so it goes first
            NodeResult::Infeasible(vec![closed_child, open_child], bound)
        }
    }
}

/// Find the most fractional variable of the relaxation to branch on: open-room variables first,
/// assignment variables once all open-room values are integral. Returns None for an integral
/// solution.
fn fractional_variable(lp: &LpSolution) -> Option<BranchVar> {
    if let Some(j) = most_fractional(&lp.y) {
        return Some(BranchVar::Open(j));
    }
    most_fractional(&lp.x).map(BranchVar::Edge)
}

fn most_fractional(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter_map(|(k, &v)| {
            let distance = (v - v.round()).abs();
            NotNan::new(distance).ok().map(|d| (k, d))
        })
        .filter(|(_, d)| d.into_inner() > INT_TOL)
        .max_by_key(|(_, d)| *d)
        .map(|(k, _)| k)
}

/// Convert an integral relaxation into an assignment. Every room has exactly one active outgoing
/// edge by the assignment constraint; should the engine nevertheless leave a room unresolved, it
/// keeps itself and the discrepancy is logged.
fn extract_assignment(model: &RelaxationModel, lp: &LpSolution) -> Assignment {
    let n = model.len();
    let mut assignment = Vec::with_capacity(n);
    for i in 0..n {
        let chosen = model
            .edges_from(i)
            .iter()
            .copied()
            .find(|&e| lp.x[e] > 0.5)
            .map(|e| model.edge(e).1);
        match chosen {
            Some(j) => assignment.push(j),
            None => {
                warn!(
                    "Room {} has no resolved destination in the incumbent, keeping it in place",
                    model.room_id(i)
                );
                assignment.push(i);
            }
        }
    }
    assignment
}
