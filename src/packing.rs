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

//! Multi-strategy greedy packer for large subproblems and as fallback for the exact solver.
//!
//! Five bin-packing strategies (fit rule × source order) run sequentially on the same subproblem;
//! the assignment keeping the fewest rooms wins, with ties broken in favor of the earlier
//! strategy. Each strategy walks the source rooms in its order and merges every room that still
//! keeps itself into an eligible destination: a still-open room with enough empty seats whose
//! accumulated subjects are disjoint from the source's. A merged room is closed and never chosen
//! as a destination again; when a source that already absorbed other rooms is merged, the absorbed
//! rooms move along with it.
//!
//! The packer cannot fail on a validated subproblem: in the worst case every room keeps itself.

use log::debug;

use crate::feasibility::FeasibilityIndex;
use crate::util::SubjectSet;
use crate::{Assignment, SolveResult, SolverStatus, Subproblem};

#[derive(Clone, Copy, Debug)]
enum Fit {
    /// Minimize the empty seats remaining after the merge
    Best,
    /// Take the first eligible destination in index order
    First,
    /// Maximize the empty seats remaining after the merge
    Worst,
}

#[derive(Clone, Copy, Debug)]
enum SourceOrder {
    StudentsAscending,
    StudentsDescending,
    CapacityDescending,
}

/// The strategy portfolio, in tie-break priority order
const STRATEGIES: [(Fit, SourceOrder); 5] = [
    (Fit::Best, SourceOrder::StudentsAscending),
    (Fit::Best, SourceOrder::StudentsDescending),
    (Fit::First, SourceOrder::StudentsDescending),
    (Fit::Worst, SourceOrder::StudentsDescending),
    (Fit::Best, SourceOrder::CapacityDescending),
];

/// Run all packing strategies and return the best assignment by number of kept rooms.
pub fn pack(subproblem: &Subproblem, index: &FeasibilityIndex) -> SolveResult {
    let mut best: Option<(Assignment, usize)> = None;
    for (k, (fit, order)) in STRATEGIES.iter().enumerate() {
        let assign = pack_single(subproblem, index, *fit, *order);
        let open = assign.iter().enumerate().filter(|&(i, &j)| i == j).count();
        debug!(
            "Packing strategy {} ({:?} fit, {:?}) keeps {} of {} rooms",
            k,
            fit,
            order,
            open,
            subproblem.len()
        );
        // Strictly better only: the earlier strategy wins ties
        if best.as_ref().map_or(true, |(_, count)| open < *count) {
            best = Some((assign, open));
        }
    }
    let (assign, _) = best.unwrap_or_else(|| (Vec::new(), 0));
    SolveResult::from_assignment(assign, SolverStatus::Heuristic)
}

/// Order in which a strategy visits the source rooms. Sorting is stable, so rooms with equal keys
/// stay in input order.
fn source_order(subproblem: &Subproblem, order: SourceOrder) -> Vec<usize> {
    let rooms = subproblem.rooms();
    let mut sources: Vec<usize> = (0..subproblem.len()).collect();
    match order {
        SourceOrder::StudentsAscending => sources.sort_by_key(|&i| rooms[i].students),
        SourceOrder::StudentsDescending => {
            sources.sort_by_key(|&i| std::cmp::Reverse(rooms[i].students))
        }
        SourceOrder::CapacityDescending => {
            sources.sort_by_key(|&i| std::cmp::Reverse(rooms[i].capacity))
        }
    }
    sources
}

fn pack_single(
    subproblem: &Subproblem,
    index: &FeasibilityIndex,
    fit: Fit,
    order: SourceOrder,
) -> Assignment {
    let n = subproblem.len();
    let rooms = subproblem.rooms();
    let num_subjects = index.num_subjects();

    let mut assign: Assignment = (0..n).collect();
    let mut load: Vec<u32> = rooms.iter().map(|r| r.students).collect();
    let mut subjects: Vec<SubjectSet> = (0..n)
        .map(|i| SubjectSet::singleton(num_subjects, index.subject_ids[i]))
        .collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    for i in source_order(subproblem, order) {
        if assign[i] != i {
            continue;
        }
        let chosen = select_destination(i, &assign, &load, &subjects, rooms, fit);
        if let Some(j) = chosen {
            let moved = std::mem::take(&mut members[i]);
            for &m in moved.iter() {
                assign[m] = j;
            }
            members[j].extend(moved);
            load[j] += load[i];
            let merged_subjects = std::mem::replace(&mut subjects[i], SubjectSet::new(0));
            subjects[j].union_with(&merged_subjects);
        }
    }
    assign
}

/// Pick a destination for source room i among the still-open rooms, or None if nothing is
/// eligible. Candidates are scanned in ascending index order and only strictly better candidates
/// replace the current choice, so the lowest eligible index wins ties.
fn select_destination(
    i: usize,
    assign: &[usize],
    load: &[u32],
    subjects: &[SubjectSet],
    rooms: &[crate::Room],
    fit: Fit,
) -> Option<usize> {
    let mut chosen: Option<(usize, u32)> = None;
    for j in 0..assign.len() {
        if j == i || assign[j] != j {
            continue;
        }
        if load[j] + load[i] > rooms[j].capacity {
            continue;
        }
        if !subjects[i].is_disjoint(&subjects[j]) {
            continue;
        }
        let remaining = rooms[j].capacity - (load[j] + load[i]);
        match fit {
            Fit::First => return Some(j),
            Fit::Best => {
                if chosen.map_or(true, |(_, best)| remaining < best) {
                    chosen = Some((j, remaining));
                }
            }
            Fit::Worst => {
                if chosen.map_or(true, |(_, best)| remaining > best) {
                    chosen = Some((j, remaining));
                }
            }
        }
    }
    chosen.map(|(j, _)| j)
}

#[cfg(test)]
mod tests {
    use super::pack;
    use crate::feasibility::FeasibilityIndex;
    use crate::{assert_result_consistency, GroupKey, Room, SolveResult, SolverStatus, Subproblem};

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

    fn run(rows: &[(&str, &str, u32, u32)]) -> (Subproblem, SolveResult) {
        let sub = subproblem(rows);
        let index = FeasibilityIndex::build(&sub);
        let result = pack(&sub, &index);
        assert_result_consistency(&sub, &result);
        assert_eq!(result.status, SolverStatus::Heuristic);
        (sub, result)
    }

    #[test]
    fn test_empty() {
        let (_, result) = run(&[]);
        assert_eq!(result.objective, 0);
        assert!(result.assign.is_empty());
    }

    #[test]
    fn test_single_room() {
        let (_, result) = run(&[("R1", "A", 10, 30)]);
        assert_eq!(result.assign, vec![0]);
        assert_eq!(result.open, vec![0]);
        assert_eq!(result.objective, 1);
    }

    #[test]
    fn test_partial_merge() {
        // R3 can join R2; R1 is then blocked by R2's subject set containing A
        let (_, result) = run(&[("R1", "A", 10, 30), ("R2", "B", 15, 30), ("R3", "A", 5, 30)]);
        assert_eq!(result.objective, 2);
    }

    #[test]
    fn test_no_free_capacity() {
        let (_, result) = run(&[("R1", "A", 20, 20), ("R2", "B", 20, 20), ("R3", "C", 20, 20)]);
        assert_eq!(result.objective, 3);
    }

    #[test]
    fn test_all_fit_single_room() {
        let (_, result) = run(&[
            ("R1", "A", 5, 50),
            ("R2", "B", 5, 50),
            ("R3", "C", 5, 50),
            ("R4", "D", 5, 50),
        ]);
        assert_eq!(result.objective, 1);
    }

    #[test]
    fn test_duplicate_subject_blocks_merge() {
        let (_, result) = run(&[("R1", "A", 30, 30), ("R2", "A", 10, 40), ("R3", "B", 10, 40)]);
        assert_eq!(result.objective, 2);
    }

    #[test]
    fn test_pairwise_merges() {
        let (_, result) = run(&[
            ("R1", "A", 5, 10),
            ("R2", "B", 5, 10),
            ("R3", "C", 5, 10),
            ("R4", "D", 5, 10),
            ("R5", "E", 5, 10),
        ]);
        assert_eq!(result.objective, 3);
    }

    #[test]
    fn test_shared_subject_keeps_all_rooms() {
        let (sub, result) = run(&[
            ("R1", "A", 1, 100),
            ("R2", "A", 1, 100),
            ("R3", "A", 1, 100),
        ]);
        assert_eq!(result.objective, sub.len());
    }

    #[test]
    fn test_deterministic() {
        let rows = [
            ("R1", "A", 12, 40),
            ("R2", "B", 7, 25),
            ("R3", "C", 18, 30),
            ("R4", "A", 3, 35),
            ("R5", "D", 9, 20),
        ];
        let (_, first) = run(&rows);
        let (_, second) = run(&rows);
        assert_eq!(first.assign, second.assign);
        assert_eq!(first.objective, second.objective);
    }

    #[test]
    fn test_permutation_does_not_hurt_best_of_strategies() {
        let rows = [
            ("R1", "A", 5, 50),
            ("R2", "B", 5, 50),
            ("R3", "C", 5, 50),
            ("R4", "D", 5, 50),
        ];
        let permuted = [
            ("R4", "D", 5, 50),
            ("R2", "B", 5, 50),
            ("R1", "A", 5, 50),
            ("R3", "C", 5, 50),
        ];
        let (_, straight) = run(&rows);
        let (_, shuffled) = run(&permuted);
        assert_eq!(straight.objective, 1);
        assert_eq!(shuffled.objective, 1);
    }
}
