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

//! Report building: converts a solver result back into the vocabulary of the input table.
//!
//! For every consolidated subproblem the builder produces one record per kept room (with its
//! members and the merged subject label), one record per executed merge, the merged room list and
//! a room-change summary. All record lists are ordered deterministically, with ties broken by
//! lexicographic room id.

use serde::Serialize;

use crate::{SolveResult, SolverStatus, Subproblem};

/// One kept room and the examinations consolidated into it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupRecord {
    pub shift: String,
    pub campus: String,
    /// 1-based running number of the group within its subproblem
    pub group_id: usize,
    pub kept_room: String,
    pub kept_subject: String,
    pub members_count: usize,
    /// Member room ids, the kept room first, then ascending by id
    pub member_rooms: Vec<String>,
    /// Member subjects, in the same order as `member_rooms`
    pub member_subjects: Vec<String>,
    /// Slash-joined label of all subjects examined in the room
    pub merged_subjects: String,
    pub total_students: u32,
    pub remaining_capacity: u32,
}

/// One executed merge of a source room into a kept room
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergeRecord {
    pub shift: String,
    pub campus: String,
    pub from_room: String,
    pub from_subject: String,
    pub from_students: u32,
    pub from_capacity: u32,
    pub to_room: String,
    pub to_subject: String,
}

/// One room of the consolidated plan, as it appears in the final room table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergedRoomRecord {
    pub room: String,
    pub shift: String,
    pub campus: String,
    /// Slash-joined subject label of all examinations in the room
    pub subject_code: String,
    pub students: u32,
}

/// Before/after comparison of one subproblem's room usage
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomChangeSummary {
    pub shift: String,
    pub campus: String,
    pub initial_rooms: usize,
    pub final_rooms: usize,
    pub rooms_removed: usize,
    /// Kept room ids, ascending
    pub kept_rooms: Vec<String>,
    /// Removed room ids, ascending
    pub removed_rooms: Vec<String>,
}

/// Solver bookkeeping of one subproblem, for the statistics section of the export
#[derive(Clone, Debug, Serialize)]
pub struct GroupStats {
    pub shift: String,
    pub campus: String,
    pub rooms_before: usize,
    pub rooms_after: usize,
    pub objective: usize,
    pub status: SolverStatus,
}

/// Complete consolidation report of one subproblem
#[derive(Clone, Debug, Serialize)]
pub struct GroupReport {
    pub groups: Vec<GroupRecord>,
    pub merges: Vec<MergeRecord>,
    pub merged_rooms: Vec<MergedRoomRecord>,
    pub changes: RoomChangeSummary,
    pub stats: GroupStats,
}

/// Aggregate statistics over all subproblems of one run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverallSummary {
    pub initial_rooms: usize,
    pub final_rooms: usize,
    pub rooms_saved: usize,
    /// Saved rooms as percentage of the initial count, rounded to one decimal
    pub efficiency_percent: f64,
}

/// Build the consolidation report for one solved subproblem.
pub fn build(subproblem: &Subproblem, result: &SolveResult) -> GroupReport {
    let n = subproblem.len();
    let rooms = subproblem.rooms();
    let key = subproblem.key();

    // Kept rooms ascending by id; their members with the kept room first, then ascending by id
    let mut kept: Vec<usize> = result.open.clone();
    kept.sort_by(|&a, &b| rooms[a].id.cmp(&rooms[b].id));

    let mut groups = Vec::with_capacity(kept.len());
    let mut merges = Vec::new();
    let mut merged_rooms = Vec::with_capacity(kept.len());
    for (gid, &j) in kept.iter().enumerate() {
        let mut members: Vec<usize> = (0..n).filter(|&i| result.assign[i] == j).collect();
        members.sort_by_key(|&i| (i != j, &rooms[i].id));

        let member_rooms: Vec<String> = members.iter().map(|&i| rooms[i].id.clone()).collect();
        let member_subjects: Vec<String> =
            members.iter().map(|&i| rooms[i].subject.clone()).collect();
        let merged_subjects = member_subjects.join("/");
        let total_students: u32 = members.iter().map(|&i| rooms[i].students).sum();

        groups.push(GroupRecord {
            shift: key.shift.clone(),
            campus: key.campus.clone(),
            group_id: gid + 1,
            kept_room: rooms[j].id.clone(),
            kept_subject: rooms[j].subject.clone(),
            members_count: members.len(),
            member_rooms,
            member_subjects,
            merged_subjects: merged_subjects.clone(),
            total_students,
            remaining_capacity: rooms[j].capacity - total_students,
        });

        merged_rooms.push(MergedRoomRecord {
            room: rooms[j].id.clone(),
            shift: key.shift.clone(),
            campus: key.campus.clone(),
            subject_code: merged_subjects,
            students: total_students,
        });

        for &i in members.iter() {
            if i == j {
                continue;
            }
            merges.push(MergeRecord {
                shift: key.shift.clone(),
                campus: key.campus.clone(),
                from_room: rooms[i].id.clone(),
                from_subject: rooms[i].subject.clone(),
                from_students: rooms[i].students,
                from_capacity: rooms[i].capacity,
                to_room: rooms[j].id.clone(),
                to_subject: rooms[j].subject.clone(),
            });
        }
    }

    let mut kept_ids: Vec<String> = kept.iter().map(|&j| rooms[j].id.clone()).collect();
    kept_ids.sort();
    let mut removed_ids: Vec<String> = (0..n)
        .filter(|&i| result.assign[i] != i)
        .map(|i| rooms[i].id.clone())
        .collect();
    removed_ids.sort();

    let changes = RoomChangeSummary {
        shift: key.shift.clone(),
        campus: key.campus.clone(),
        initial_rooms: n,
        final_rooms: result.open.len(),
        rooms_removed: removed_ids.len(),
        kept_rooms: kept_ids,
        removed_rooms: removed_ids,
    };

    let stats = GroupStats {
        shift: key.shift.clone(),
        campus: key.campus.clone(),
        rooms_before: n,
        rooms_after: result.open.len(),
        objective: result.objective,
        status: result.status,
    };

    GroupReport {
        groups,
        merges,
        merged_rooms,
        changes,
        stats,
    }
}

/// Aggregate the room counts of all subproblem reports.
pub fn summarize(reports: &[GroupReport]) -> OverallSummary {
    let initial_rooms: usize = reports.iter().map(|r| r.changes.initial_rooms).sum();
    let final_rooms: usize = reports.iter().map(|r| r.changes.final_rooms).sum();
    let rooms_saved = initial_rooms - final_rooms;
    let efficiency_percent = if initial_rooms == 0 {
        0.0
    } else {
        (rooms_saved as f64 / initial_rooms as f64 * 1000.0).round() / 10.0
    };
    OverallSummary {
        initial_rooms,
        final_rooms,
        rooms_saved,
        efficiency_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::{build, summarize};
    use crate::{GroupKey, Room, SolveResult, SolverStatus, Subproblem};

    fn subproblem() -> Subproblem {
        Subproblem::new(
            GroupKey {
                shift: "1".into(),
                campus: "North".into(),
            },
            vec![
                Room {
                    id: "R1".into(),
                    subject: "A".into(),
                    students: 10,
                    capacity: 30,
                },
                Room {
                    id: "R2".into(),
                    subject: "B".into(),
                    students: 15,
                    capacity: 30,
                },
                Room {
                    id: "R3".into(),
                    subject: "A".into(),
                    students: 5,
                    capacity: 30,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_group_records() {
        let sub = subproblem();
        // R3 merged into R2, R1 kept alone
        let result = SolveResult::from_assignment(vec![0, 1, 1], SolverStatus::Optimal);
        let report = build(&sub, &result);

        assert_eq!(report.groups.len(), 2);
        let first = &report.groups[0];
        assert_eq!(first.group_id, 1);
        assert_eq!(first.kept_room, "R1");
        assert_eq!(first.members_count, 1);
        assert_eq!(first.merged_subjects, "A");
        assert_eq!(first.total_students, 10);
        assert_eq!(first.remaining_capacity, 20);

        let second = &report.groups[1];
        assert_eq!(second.group_id, 2);
        assert_eq!(second.kept_room, "R2");
        assert_eq!(second.member_rooms, vec!["R2".to_string(), "R3".to_string()]);
        assert_eq!(second.merged_subjects, "B/A");
        assert_eq!(second.total_students, 20);
        assert_eq!(second.remaining_capacity, 10);
    }

    #[test]
    fn test_merge_records_and_changes() {
        let sub = subproblem();
        let result = SolveResult::from_assignment(vec![0, 1, 1], SolverStatus::Optimal);
        let report = build(&sub, &result);

        assert_eq!(report.merges.len(), 1);
        let merge = &report.merges[0];
        assert_eq!(merge.from_room, "R3");
        assert_eq!(merge.from_subject, "A");
        assert_eq!(merge.from_students, 5);
        assert_eq!(merge.to_room, "R2");
        assert_eq!(merge.to_subject, "B");

        assert_eq!(report.changes.initial_rooms, 3);
        assert_eq!(report.changes.final_rooms, 2);
        assert_eq!(report.changes.rooms_removed, 1);
        assert_eq!(
            report.changes.kept_rooms,
            vec!["R1".to_string(), "R2".to_string()]
        );
        assert_eq!(report.changes.removed_rooms, vec!["R3".to_string()]);

        assert_eq!(report.merged_rooms.len(), 2);
        assert_eq!(report.merged_rooms[1].subject_code, "B/A");
        assert_eq!(report.merged_rooms[1].students, 20);
    }

    #[test]
    fn test_summarize() {
        let sub = subproblem();
        let result = SolveResult::from_assignment(vec![0, 1, 1], SolverStatus::Optimal);
        let reports = vec![build(&sub, &result), build(&sub, &result)];
        let overall = summarize(&reports);
        assert_eq!(overall.initial_rooms, 6);
        assert_eq!(overall.final_rooms, 4);
        assert_eq!(overall.rooms_saved, 2);
        assert!((overall.efficiency_percent - 33.3).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report() {
        let sub = Subproblem::new(
            GroupKey {
                shift: "1".into(),
                campus: "North".into(),
            },
            Vec::new(),
        )
        .unwrap();
        let result = SolveResult::from_assignment(Vec::new(), SolverStatus::Optimal);
        let report = build(&sub, &result);
        assert!(report.groups.is_empty());
        assert!(report.merges.is_empty());
        assert_eq!(report.changes.final_rooms, 0);
        assert_eq!(summarize(&[report]).efficiency_percent, 0.0);
    }
}
