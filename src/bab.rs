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

//! This module provides a generic implementation of the branch and bound algorithm for
//! minimization problems, using a sequential pseudo-depth-first search.
//!
//! The pending subproblems (nodes in the Branch and Bound tree) are stored on a heap (priority
//! queue), ordered by their depth in the tree, so the search prefers to dig into the depth of the
//! tree, which produces incumbents (and with them good bounds) early. Within one depth, nodes with
//! the smaller relaxation bound are preferred.
//!
//! The best feasible solution found so far is kept next to the queue; its score is used to bound
//! branches whose relaxation cannot beat it anymore. The search stops when the queue is exhausted
//! or the wall-clock budget is spent, whichever comes first. One solver runs strictly on the
//! calling thread; callers that want parallelism run independent problems on independent solvers.

use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use std::{cmp, fmt};

use log::debug;
use num_traits::bounds::Bounded;

/// A pending node of the branch and bound tree together with its parent's relaxation bound
struct PendingProblem<SubProblem: Ord, Score: Ord>(SubProblem, Score);

// Deeper nodes first; within one depth, prefer the smaller (more promising) parent bound.
impl<SubProblem: Ord, Score: Ord> Ord for PendingProblem<SubProblem, Score> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.cmp(&other.0).then_with(|| other.1.cmp(&self.1))
    }
}

impl<SubProblem: Ord, Score: Ord> PartialOrd for PendingProblem<SubProblem, Score> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<SubProblem: Ord, Score: Ord> Eq for PendingProblem<SubProblem, Score> {}

impl<SubProblem: Ord, Score: Ord> PartialEq for PendingProblem<SubProblem, Score> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == cmp::Ordering::Equal
    }
}

/// A struct to collect statistics about the branch and bound execution.
#[derive(Default)]
pub struct Statistics {
    /// Number of calls to the subproblem solver function
    pub num_executed_subproblems: u32,
    /// Number of subproblems that returned without solution
    pub num_no_solution: u32,
    /// Number of subproblems with a fractional relaxation that have been branched
    pub num_branched: u32,
    /// Number of feasible subproblems encountered during solving
    pub num_feasible: u32,
    /// Number of times the prior best result has been updated with a better result
    pub num_new_best: u32,
    /// Number of subproblems skipped because of their parent's bound (i.e. number of bound
    /// branches)
    pub num_bound_subproblems: u32,
    /// Whether the search was cut short by the wall-clock budget
    pub timed_out: bool,
    /// Total time for executing the branch and bound algorithm
    pub total_time: Duration,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Solving statistics:
Executed subproblems:  {: >6}
    ... no solution:   {: >6}
    ... branched:      {: >6}
    ... feasible:      {: >6}
         ... new best: {: >6}
Bound branches:        {: >6}

Total time: {:.3}s{}",
            self.num_executed_subproblems,
            self.num_no_solution,
            self.num_branched,
            self.num_feasible,
            self.num_new_best,
            self.num_bound_subproblems,
            self.total_time.as_millis() as f32 / 1000f32,
            if self.timed_out { " (budget expired)" } else { "" },
        )
    }
}

/// Result type for solving a single branch and bound node.
#[derive(Debug)]
pub enum NodeResult<SubProblem, Solution, Score> {
    /// No solution at all (subproblem was infeasible)
    NoSolution,
    /// A fractional solution with a `Vec` of more restricted SubProblems ("branches") to try and
    /// the relaxation's score to bound the branches by comparing it with the current best solution
    Infeasible(Vec<SubProblem>, Score),
    /// A feasible solution for the main problem (including the solution's score to compare to
    /// other solutions)
    Feasible(Solution, Score),
}

/// Main function of this module to minimize a generic problem by pseudo-depth-first branch and
/// bound.
///
/// This function takes a callback function, which is executed for each single node in the branch
/// and bound tree and returns either a feasible solution to be considered for the result or a
/// `Vec` of new subproblems to try (see `NodeResult` type). The type of the subproblems must
/// implement `Ord` where p1 > p2 means, p1 is in a deeper layer of the branch and bound tree;
/// this property is used to perform a pseudo-depth-first search. Subproblems with higher
/// probability for good scores should be put first in the `NodeResult::Infeasible` vector.
///
/// The search honors the given wall-clock budget: once it is spent, the best incumbent found so
/// far (if any) is returned and the statistics carry the `timed_out` flag. It may be possible
/// that no result is found at all.
///
/// # Result
///
/// Returns the best solution and its score (if one has been found) and some statistics about the
/// solving process.
pub fn solve<SubProblem, Solution, Score, F>(
    mut node_solver: F,
    base_problem: SubProblem,
    time_limit: Duration,
) -> (Option<(Solution, Score)>, Statistics)
where
    SubProblem: Ord + fmt::Debug,
    Score: Ord + Bounded + Copy + fmt::Display,
    F: FnMut(SubProblem) -> NodeResult<SubProblem, Solution, Score>,
{
    let mut pending_nodes = BinaryHeap::new();
    pending_nodes.push(PendingProblem(base_problem, Score::min_value()));
    let mut best_result: Option<Solution> = None;
    let mut best_score = Score::max_value();
    let mut statistics = Statistics::default();

    let tic = Instant::now();
    let deadline = tic + time_limit;

    while let Some(PendingProblem(subproblem, parent_bound)) = pending_nodes.pop() {
        if Instant::now() >= deadline {
            statistics.timed_out = true;
            break;
        }

        // Only consider this subproblem if the parent's relaxation bound still beats the best
        // solution known so far.
        if parent_bound < best_score {
            statistics.num_executed_subproblems += 1;
            debug!("Solving subproblem: {:?}", subproblem);
            match node_solver(subproblem) {
                NodeResult::NoSolution => {
                    statistics.num_no_solution += 1;
                }

                NodeResult::Feasible(solution, score) => {
                    statistics.num_feasible += 1;
                    debug!("Found a feasible solution with score {}", score);
                    if score < best_score {
                        debug!("This is the best solution found so far. Let's store it.");
                        statistics.num_new_best += 1;
                        best_result = Some(solution);
                        best_score = score;
                    }
                }

                NodeResult::Infeasible(new_problems, bound) => {
                    statistics.num_branched += 1;
                    debug!("Fractional relaxation with bound {}, branching", bound);
                    for new_problem in new_problems {
                        pending_nodes.push(PendingProblem(new_problem, bound));
                    }
                }
            }
        } else {
            statistics.num_bound_subproblems += 1;
            debug!(
                "Bounding this branch, since bound {} cannot beat the best known solution: {:?}",
                parent_bound, subproblem,
            );
        }
    }

    statistics.total_time = tic.elapsed();
    (best_result.map(|s| (s, best_score)), statistics)
}
