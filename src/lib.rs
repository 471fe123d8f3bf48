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

//! Core data model of the examination room consolidation optimizer.
//!
//! The optimizer takes a table of per-room examination records, partitions it into independent
//! subproblems (all rooms sharing one exam shift and campus) and consolidates each subproblem into
//! the minimum number of rooms such that every student keeps a seat, no two examinations of the
//! same subject share a room and no room exceeds its seating capacity.
//!
//! Within a subproblem, the integer index of a room is its canonical identity; room ids are only
//! used for reporting.

pub mod bab;
pub mod feasibility;
pub mod io;
pub mod lp;
pub mod mergebab;
pub mod packing;
pub mod report;
pub mod solver;
mod util;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;

/// Representation of a single examination room record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Room {
    /// Room identifier, unique within its subproblem. Only used for reporting
    pub id: String,
    /// Opaque subject code of the examination currently held in this room
    pub subject: String,
    /// Number of students examining in this room
    pub students: u32,
    /// Seating capacity of the room
    pub capacity: u32,
}

/// Key of an independent subproblem: all rooms sharing one (exam shift, campus) pair
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub shift: String,
    pub campus: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shift={}, campus={}", self.shift, self.campus)
    }
}

/// An independent consolidation instance: the rooms of one (shift, campus) group.
///
/// Construction validates that every room can hold its own students; all other invariants are
/// established by the solvers. The struct is a value type consumed read-only by the feasibility
/// index, the solvers and the report builder.
#[derive(Clone, Debug)]
pub struct Subproblem {
    key: GroupKey,
    rooms: Vec<Room>,
}

impl Subproblem {
    /// Create a subproblem from its group key and room records.
    ///
    /// Fails with [SolverError::InvalidInput] if any room holds more students than seats.
    pub fn new(key: GroupKey, rooms: Vec<Room>) -> Result<Self, SolverError> {
        for room in rooms.iter() {
            if room.students > room.capacity {
                return Err(SolverError::InvalidInput {
                    room: room.id.clone(),
                    students: room.students,
                    capacity: room.capacity,
                });
            }
        }
        Ok(Subproblem { key, rooms })
    }

    /// Group a sequence of keyed room records into subproblems, ordered by group key.
    pub fn partition(
        records: impl IntoIterator<Item = (GroupKey, Room)>,
    ) -> Result<Vec<Subproblem>, SolverError> {
        let mut groups: BTreeMap<GroupKey, Vec<Room>> = BTreeMap::new();
        for (key, room) in records {
            groups.entry(key).or_default().push(room);
        }
        groups
            .into_iter()
            .map(|(key, rooms)| Subproblem::new(key, rooms))
            .collect()
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Number of rooms in this subproblem
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Destination room index for every source room index. `assign[i] == j` means the examination of
/// room i takes place in room j after consolidation; `assign[j] == j` marks a kept room.
pub type Assignment = Vec<usize>;

/// How a solver result was obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum SolverStatus {
    /// Proven optimal result of the exact solver
    Optimal,
    /// Incumbent of the exact solver after its time budget expired
    Feasible,
    /// Result of the greedy packer, chosen by problem size
    Heuristic,
    /// Result of the greedy packer after the exact solver failed or timed out
    HeuristicFallback,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverStatus::Optimal => "Optimal",
            SolverStatus::Feasible => "Feasible",
            SolverStatus::Heuristic => "Heuristic",
            SolverStatus::HeuristicFallback => "HeuristicFallback",
        })
    }
}

/// Result of consolidating one subproblem
#[derive(Clone, Debug)]
pub struct SolveResult {
    /// Destination room per source room
    pub assign: Assignment,
    /// Sorted indices of the kept rooms (the distinct values of `assign`)
    pub open: Vec<usize>,
    /// Number of kept rooms, the minimized quantity
    pub objective: usize,
    pub status: SolverStatus,
}

impl SolveResult {
    /// Build a result from an assignment, deriving the open set and objective from the actual
    /// destinations.
    pub fn from_assignment(assign: Assignment, status: SolverStatus) -> Self {
        let mut open = assign.clone();
        open.sort_unstable();
        open.dedup();
        let objective = open.len();
        SolveResult {
            assign,
            open,
            objective,
            status,
        }
    }
}

/// Error values of the consolidation core
#[derive(Debug, Error)]
pub enum SolverError {
    /// A room record holds more students than seats; fatal for its subproblem
    #[error("room {room}: students exceed capacity ({students} > {capacity})")]
    InvalidInput {
        room: String,
        students: u32,
        capacity: u32,
    },
    /// The exact solver spent its wall-clock budget without finding an incumbent
    #[error("exact solver exceeded its time budget without an incumbent")]
    SolverTimeout,
    /// The exact solver terminated abnormally
    #[error("exact solver failed: {0}")]
    SolverFailure(String),
}

/// Assert that a solver result is internally consistent with its subproblem: one in-range
/// destination per room, self-kept destinations, per-room capacity respected, no subject examined
/// twice in the same room, and the objective equal to the number of kept rooms.
pub fn assert_result_consistency(subproblem: &Subproblem, result: &SolveResult) {
    let n = subproblem.len();
    let rooms = subproblem.rooms();
    assert_eq!(
        result.assign.len(),
        n,
        "Assignment length {} does not match the {} rooms of {}",
        result.assign.len(),
        n,
        subproblem.key()
    );

    let open: HashSet<usize> = result.open.iter().copied().collect();
    assert_eq!(open.len(), result.open.len(), "Open set contains duplicates");
    for (i, &j) in result.assign.iter().enumerate() {
        assert!(j < n, "Destination {} of room {} is out of range", j, i);
        assert!(
            open.contains(&j),
            "Destination {} of room {} is not a kept room",
            j,
            i
        );
    }
    for &j in result.open.iter() {
        assert_eq!(result.assign[j], j, "Kept room {} does not keep itself", j);
    }

    for &j in result.open.iter() {
        let members: Vec<usize> = (0..n).filter(|&i| result.assign[i] == j).collect();
        let total: u32 = members.iter().map(|&i| rooms[i].students).sum();
        assert!(
            total <= rooms[j].capacity,
            "Room {} is overfilled: {} students > {} seats",
            rooms[j].id,
            total,
            rooms[j].capacity
        );
        let mut subjects: Vec<&str> = members.iter().map(|&i| rooms[i].subject.as_str()).collect();
        subjects.sort_unstable();
        let num_members = subjects.len();
        subjects.dedup();
        assert_eq!(
            num_members,
            subjects.len(),
            "Room {} hosts the same subject more than once",
            rooms[j].id
        );
    }

    assert_eq!(
        result.objective,
        result.open.len(),
        "Objective does not match the number of kept rooms"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, subject: &str, students: u32, capacity: u32) -> Room {
        Room {
            id: id.into(),
            subject: subject.into(),
            students,
            capacity,
        }
    }

    fn key(shift: &str, campus: &str) -> GroupKey {
        GroupKey {
            shift: shift.into(),
            campus: campus.into(),
        }
    }

    #[test]
    fn test_capacity_violation_is_rejected() {
        let result = Subproblem::new(key("1", "A"), vec![room("R1", "A", 50, 30)]);
        match result {
            Err(SolverError::InvalidInput {
                room,
                students,
                capacity,
            }) => {
                assert_eq!(room, "R1");
                assert_eq!(students, 50);
                assert_eq!(capacity, 30);
            }
            other => panic!("Expected InvalidInput, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_partition_groups_and_orders_by_key() {
        let records = vec![
            (key("2", "B"), room("R3", "X", 1, 10)),
            (key("1", "A"), room("R1", "X", 1, 10)),
            (key("1", "A"), room("R2", "Y", 1, 10)),
        ];
        let groups = Subproblem::partition(records).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key(), &key("1", "A"));
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].key(), &key("2", "B"));
        assert_eq!(groups[1].rooms()[0].id, "R3");
    }

    #[test]
    fn test_from_assignment_derives_open_set() {
        let result = SolveResult::from_assignment(vec![2, 1, 2, 1], SolverStatus::Heuristic);
        assert_eq!(result.open, vec![1, 2]);
        assert_eq!(result.objective, 2);
    }
}
