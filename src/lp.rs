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

//! Linear relaxation of the room consolidation integer program.
//!
//! The 0/1 program minimizes the number of kept rooms: `y[j]` marks room j kept open, `x[i, j]`
//! assigns room i to destination j along an admissible edge of the feasibility index. The
//! constraints are
//!
//! 1. every room is assigned to exactly one destination,
//! 2. assignments only target open rooms (`x[i, j] ≤ y[j]`),
//! 3. a room is open iff it retains itself (`y[j] = x[j, j]`),
//! 4. the students assigned to a room fit its capacity,
//! 5. each subject appears at most once per destination,
//!
//! plus two valid inequalities that tighten the relaxation: the open rooms must hold all students
//! (total-capacity cut) and there must be at least one open room per copy of the most frequent
//! subject (subject-diversity cut).
//!
//! [solve_relaxation] drops integrality and solves the continuous program under a set of variable
//! fixings imposed by the branch and bound search. The formulation is rebuilt per call; with a few
//! thousand variables per subproblem this is well below the solve time itself.

use std::collections::HashMap;

use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};

use crate::feasibility::FeasibilityIndex;
use crate::Subproblem;

/// A variable of the integer program that the branch and bound search may fix to 0 or 1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchVar {
    /// The open-room indicator of room j
    Open(usize),
    /// The assignment indicator of an admissible edge, referenced by edge index
    Edge(usize),
}

/// Problem formulation shared by all branch and bound nodes of one subproblem
pub struct RelaxationModel<'a> {
    subproblem: &'a Subproblem,
    index: &'a FeasibilityIndex,
    /// All admissible (source, destination) pairs, self edges included
    edges: Vec<(usize, usize)>,
    /// Edge indices by source room
    edges_from: Vec<Vec<usize>>,
    /// Edge indices by destination room
    edges_into: Vec<Vec<usize>>,
    /// Edge index by (source, destination) pair
    edge_index: HashMap<(usize, usize), usize>,
    /// Index of the self edge (j, j) per room
    self_edge: Vec<usize>,
    total_students: u32,
}

impl<'a> RelaxationModel<'a> {
    pub fn new(subproblem: &'a Subproblem, index: &'a FeasibilityIndex) -> Self {
        let n = subproblem.len();
        let mut edges = Vec::new();
        let mut edges_from = vec![Vec::new(); n];
        let mut edges_into = vec![Vec::new(); n];
        let mut edge_index = HashMap::new();
        let mut self_edge = vec![0; n];
        for i in 0..n {
            for &j in index.out[i].iter() {
                let e = edges.len();
                edges.push((i, j));
                edges_from[i].push(e);
                edges_into[j].push(e);
                edge_index.insert((i, j), e);
                if i == j {
                    self_edge[i] = e;
                }
            }
        }
        let total_students = subproblem.rooms().iter().map(|r| r.students).sum();
        RelaxationModel {
            subproblem,
            index,
            edges,
            edges_from,
            edges_into,
            edge_index,
            self_edge,
            total_students,
        }
    }

    /// Number of rooms in the underlying subproblem
    pub fn len(&self) -> usize {
        self.subproblem.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The (source, destination) pair of an edge index
    pub fn edge(&self, e: usize) -> (usize, usize) {
        self.edges[e]
    }

    /// Edge indices leaving source room i
    pub fn edges_from(&self, i: usize) -> &[usize] {
        &self.edges_from[i]
    }

    /// Room id for log messages
    pub fn room_id(&self, i: usize) -> &str {
        &self.subproblem.rooms()[i].id
    }
}

/// Continuous solution of one relaxation solve
pub struct LpSolution {
    /// Relaxed objective value (sum of the y values), a lower bound on the number of kept rooms
    pub objective: f64,
    /// Value of the open-room indicator per room
    pub y: Vec<f64>,
    /// Value of the assignment indicator per edge index
    pub x: Vec<f64>,
}

/// Solve the LP relaxation of the model under the given variable fixings.
///
/// Returns `Ok(None)` if the fixings make the relaxation infeasible and `Err` on an engine
/// failure.
pub fn solve_relaxation(
    model: &RelaxationModel,
    fixed: &[(BranchVar, bool)],
) -> Result<Option<LpSolution>, String> {
    let n = model.len();
    let rooms = model.subproblem.rooms();

    // Variable bounds: [0, 1], collapsed to a point for fixed variables
    let mut y_bounds = vec![(0.0, 1.0); n];
    let mut x_bounds = vec![(0.0, 1.0); model.edges.len()];
    for (var, value) in fixed.iter() {
        let bounds = if *value { (1.0, 1.0) } else { (0.0, 0.0) };
        match var {
            BranchVar::Open(j) => y_bounds[*j] = bounds,
            BranchVar::Edge(e) => x_bounds[*e] = bounds,
        }
    }

    let mut vars = variables!();
    let y: Vec<Variable> = y_bounds
        .iter()
        .map(|(lo, hi)| vars.add(variable().min(*lo).max(*hi)))
        .collect();
    let x: Vec<Variable> = x_bounds
        .iter()
        .map(|(lo, hi)| vars.add(variable().min(*lo).max(*hi)))
        .collect();

    let objective: Expression = y.iter().map(|v| Expression::from(*v)).sum();
    let mut problem = vars.minimise(objective).using(default_solver);

    // (1) assignment: every room goes somewhere
    for i in 0..n {
        let destinations: Expression = model.edges_from[i]
            .iter()
            .map(|&e| Expression::from(x[e]))
            .sum();
        problem = problem.with(constraint!(destinations == 1));
    }
    // (2) only assign into open rooms
    for (e, &(_, j)) in model.edges.iter().enumerate() {
        problem = problem.with(constraint!(x[e] <= y[j]));
    }
    // (3) a room is open iff it retains itself
    for j in 0..n {
        problem = problem.with(constraint!(y[j] == x[model.self_edge[j]]));
    }
    // (4) capacity per destination
    for j in 0..n {
        let load: Expression = model.edges_into[j]
            .iter()
            .map(|&e| rooms[model.edges[e].0].students as f64 * x[e])
            .sum();
        let capacity = rooms[j].capacity as f64;
        problem = problem.with(constraint!(load <= capacity * y[j]));
    }
    // (5) each subject at most once per destination
    for j in 0..n {
        for bucket in model.index.buckets.iter() {
            let edges: Vec<usize> = bucket
                .iter()
                .filter_map(|&i| model.edge_index.get(&(i, j)).copied())
                .collect();
            if edges.len() > 1 {
                let sum: Expression = edges.iter().map(|&e| Expression::from(x[e])).sum();
                problem = problem.with(constraint!(sum <= 1));
            }
        }
    }
    // (6) total-capacity cut: the open rooms must hold all students
    let open_capacity: Expression = (0..n).map(|j| rooms[j].capacity as f64 * y[j]).sum();
    let total_students = model.total_students as f64;
    problem = problem.with(constraint!(open_capacity >= total_students));
    // (7) subject-diversity cut: one room per copy of the most frequent subject
    let open_rooms: Expression = y.iter().map(|v| Expression::from(*v)).sum();
    let min_open = model.index.max_bucket_size as f64;
    problem = problem.with(constraint!(open_rooms >= min_open));

    match problem.solve() {
        Ok(solution) => {
            let y_values: Vec<f64> = y.iter().map(|v| solution.value(*v)).collect();
            let x_values: Vec<f64> = x.iter().map(|v| solution.value(*v)).collect();
            Ok(Some(LpSolution {
                objective: y_values.iter().sum(),
                y: y_values,
                x: x_values,
            }))
        }
        Err(ResolutionError::Infeasible) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}
