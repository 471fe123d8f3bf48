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

pub mod simple;

use std::fmt::Write;

use crate::report::{GroupReport, OverallSummary};

/// Format the consolidation plan into a human readable String (e.g. to print it to stdout).
///
/// The output format will look like
/// ```text
/// Initial rooms: 12
/// Final rooms:   8
/// Rooms saved:   4 (33.3% reduction)
///
/// ===== Shift 1, campus North =====
/// 5 rooms -> 3 rooms
/// - R101 [MATH/PHYS]: 25 students, 5 seats left (R101, R104)
/// - R102 [CHEM]: 20 students, 10 seats left (R102)
/// removed: R104, R105
/// ```
pub fn format_report(reports: &[GroupReport], overall: &OverallSummary) -> String {
    let mut result = String::new();
    writeln!(result, "Initial rooms: {}", overall.initial_rooms).unwrap();
    writeln!(result, "Final rooms:   {}", overall.final_rooms).unwrap();
    writeln!(
        result,
        "Rooms saved:   {} ({:.1}% reduction)",
        overall.rooms_saved, overall.efficiency_percent
    )
    .unwrap();

    for report in reports {
        let changes = &report.changes;
        write!(
            result,
            "\n===== Shift {}, campus {} =====\n",
            changes.shift, changes.campus
        )
        .unwrap();
        writeln!(
            result,
            "{} rooms -> {} rooms",
            changes.initial_rooms, changes.final_rooms
        )
        .unwrap();
        for group in report.groups.iter() {
            writeln!(
                result,
                "- {} [{}]: {} students, {} seats left ({})",
                group.kept_room,
                group.merged_subjects,
                group.total_students,
                group.remaining_capacity,
                group.member_rooms.join(", ")
            )
            .unwrap();
        }
        if !changes.removed_rooms.is_empty() {
            writeln!(result, "removed: {}", changes.removed_rooms.join(", ")).unwrap();
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::format_report;
    use crate::report::{build, summarize};
    use crate::{GroupKey, Room, SolveResult, SolverStatus, Subproblem};

    #[test]
    fn test_format_report() {
        let sub = Subproblem::new(
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
            ],
        )
        .unwrap();
        let result = SolveResult::from_assignment(vec![1, 1], SolverStatus::Optimal);
        let reports = vec![build(&sub, &result)];
        let overall = summarize(&reports);

        let text = format_report(&reports, &overall);
        assert!(text.contains("Initial rooms: 2"));
        assert!(text.contains("===== Shift 1, campus North ====="));
        assert!(text.contains("- R2 [B/A]: 25 students, 5 seats left (R2, R1)"));
        assert!(text.contains("removed: R1"));
    }
}
