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

//! Precomputed feasibility index of one subproblem, built once per solve and shared read-only by
//! both solvers.
//!
//! The index interns subject codes into a dense numbering, buckets the rooms by subject and
//! derives the directed graph of admissible assignments: the self edge `i → i` is always present,
//! and `i → j` for `i ≠ j` is admissible iff the two rooms examine different subjects and room i's
//! students fit into room j's empty seats. Building takes O(n²) time; the dense matrix and both
//! adjacency lists are kept for O(1) membership tests and cheap iteration.

use std::collections::HashMap;

use crate::Subproblem;

/// Feasibility data derived from a validated [Subproblem]
pub struct FeasibilityIndex {
    /// Interned subject id per room index
    pub subject_ids: Vec<usize>,
    /// Distinct subject codes, indexed by interned id (first-seen order)
    pub subjects: Vec<String>,
    /// Room indices per interned subject id
    pub buckets: Vec<Vec<usize>>,
    /// Size of the largest subject bucket
    pub max_bucket_size: usize,
    /// Admissible destinations per source room, ascending, self edge included
    pub out: Vec<Vec<usize>>,
    /// Admissible sources per destination room, ascending, self edge included
    pub inc: Vec<Vec<usize>>,
    /// Dense admissibility matrix: `admissible[[i, j]]` iff room i may collapse into room j
    admissible: ndarray::Array2<bool>,
}

impl FeasibilityIndex {
    pub fn build(subproblem: &Subproblem) -> Self {
        let n = subproblem.len();
        let rooms = subproblem.rooms();

        // Intern subjects in first-seen order and bucket the rooms
        let mut subjects = Vec::<String>::new();
        let mut subject_ids = Vec::with_capacity(n);
        let mut buckets = Vec::<Vec<usize>>::new();
        let mut id_by_code = HashMap::<&str, usize>::new();
        for (i, room) in rooms.iter().enumerate() {
            let id = match id_by_code.get(room.subject.as_str()) {
                Some(&id) => id,
                None => {
                    let id = subjects.len();
                    id_by_code.insert(room.subject.as_str(), id);
                    subjects.push(room.subject.clone());
                    buckets.push(Vec::new());
                    id
                }
            };
            subject_ids.push(id);
            buckets[id].push(i);
        }
        let max_bucket_size = buckets.iter().map(|b| b.len()).max().unwrap_or(0);

        let mut admissible = ndarray::Array2::from_elem([n, n], false);
        for i in 0..n {
            for j in 0..n {
                admissible[[i, j]] = i == j
                    || (subject_ids[i] != subject_ids[j]
                        && rooms[i].students <= rooms[j].capacity - rooms[j].students);
            }
        }

        let out = (0..n)
            .map(|i| (0..n).filter(|&j| admissible[[i, j]]).collect())
            .collect();
        let inc = (0..n)
            .map(|j| (0..n).filter(|&i| admissible[[i, j]]).collect())
            .collect();

        FeasibilityIndex {
            subject_ids,
            subjects,
            buckets,
            max_bucket_size,
            out,
            inc,
            admissible,
        }
    }

    pub fn is_admissible(&self, i: usize, j: usize) -> bool {
        self.admissible[[i, j]]
    }

    /// Number of distinct subjects in the subproblem
    pub fn num_subjects(&self) -> usize {
        self.subjects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::FeasibilityIndex;
    use crate::{GroupKey, Room, Subproblem};

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
    fn test_self_edges_always_present() {
        // R1 is full, R2 and R3 share a subject: no merge is admissible anywhere
        let sub = subproblem(&[("R1", "A", 20, 20), ("R2", "B", 5, 30), ("R3", "B", 5, 30)]);
        let index = FeasibilityIndex::build(&sub);
        for i in 0..3 {
            assert!(index.is_admissible(i, i));
            assert!(index.out[i].contains(&i));
            assert!(index.inc[i].contains(&i));
        }
        assert!(!index.is_admissible(1, 2));
        assert!(!index.is_admissible(2, 1));
    }

    #[test]
    fn test_edge_rule() {
        let sub = subproblem(&[("R1", "A", 10, 30), ("R2", "B", 15, 30), ("R3", "C", 16, 30)]);
        let index = FeasibilityIndex::build(&sub);
        // R1 (10 students) fits into R2's 15 empty seats and R3's 14 empty seats
        assert_eq!(index.out[0], vec![0, 1, 2]);
        // R2 (15 students) fits into R1's 20 empty seats but not into R3's 14
        assert_eq!(index.out[1], vec![0, 1]);
        // R3 (16 students) only fits into R1
        assert_eq!(index.out[2], vec![0, 2]);
        assert_eq!(index.inc[0], vec![0, 1, 2]);
        assert_eq!(index.inc[2], vec![0, 2]);
    }

    #[test]
    fn test_subject_buckets() {
        let sub = subproblem(&[
            ("R1", "A", 1, 10),
            ("R2", "B", 1, 10),
            ("R3", "A", 1, 10),
            ("R4", "A", 1, 10),
        ]);
        let index = FeasibilityIndex::build(&sub);
        assert_eq!(index.num_subjects(), 2);
        assert_eq!(index.subjects, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(index.subject_ids, vec![0, 1, 0, 0]);
        assert_eq!(index.buckets, vec![vec![0, 2, 3], vec![1]]);
        assert_eq!(index.max_bucket_size, 3);
    }

    #[test]
    fn test_empty_subproblem() {
        let sub = subproblem(&[]);
        let index = FeasibilityIndex::build(&sub);
        assert_eq!(index.num_subjects(), 0);
        assert_eq!(index.max_bucket_size, 0);
        assert!(index.out.is_empty());
    }
}
