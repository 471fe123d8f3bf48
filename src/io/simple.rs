use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::report::{GroupReport, OverallSummary};
use crate::{GroupKey, Room};

/// One row of the input room table, as delivered by the upstream parser.
///
/// The `campus` column is optional in the original tables; rows without one fall into a single
/// "ALL" campus. An optional `date` column distinguishes shifts with equal numbers on different
/// examination days.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomRow {
    pub room: String,
    pub shift: String,
    #[serde(default = "default_campus")]
    pub campus: String,
    pub subject: String,
    pub students: u32,
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

fn default_campus() -> String {
    String::from("ALL")
}

/// Read the room table from its simple JSON representation (canonical serde_json serialization of
/// `RoomRow` objects under a format envelope). All string fields are whitespace-stripped.
pub fn read<R: std::io::Read>(reader: R) -> Result<Vec<RoomRow>, String> {
    let mut data: serde_json::Value =
        serde_json::from_reader(reader).map_err(|err| err.to_string())?;

    let mut rows: Vec<RoomRow> =
        serde_json::from_value(data["rooms"].take()).map_err(|e| format!("{}", e))?;
    for row in rows.iter_mut() {
        row.room = row.room.trim().to_string();
        row.shift = row.shift.trim().to_string();
        row.campus = row.campus.trim().to_string();
        row.subject = row.subject.trim().to_string();
        row.date = row.date.take().map(|d| d.trim().to_string());
    }

    Ok(rows)
}

/// Convert input rows into the keyed room records consumed by `Subproblem::partition`. Rows with
/// a date get a composite shift key, so equal shift numbers on different days stay separate.
pub fn into_records(rows: Vec<RoomRow>) -> Vec<(GroupKey, Room)> {
    rows.into_iter()
        .map(|row| {
            let shift = match &row.date {
                Some(date) if !date.is_empty() => format!("{}_{}", date, row.shift),
                _ => row.shift,
            };
            (
                GroupKey {
                    shift,
                    campus: row.campus,
                },
                Room {
                    id: row.room,
                    subject: row.subject,
                    students: row.students,
                    capacity: row.capacity,
                },
            )
        })
        .collect()
}

/// Write the consolidation plan of all subproblems as simple JSON representation to a Writer
/// (e.g. an output file).
pub fn write<W: std::io::Write>(
    writer: W,
    reports: &[GroupReport],
    overall: &OverallSummary,
) -> Result<(), String> {
    let groups: Vec<_> = reports.iter().flat_map(|r| r.groups.iter()).collect();
    let merges: Vec<_> = reports.iter().flat_map(|r| r.merges.iter()).collect();
    let merged_rooms: Vec<_> = reports.iter().flat_map(|r| r.merged_rooms.iter()).collect();
    let room_changes: Vec<_> = reports.iter().map(|r| &r.changes).collect();
    let stats: Vec<_> = reports.iter().map(|r| &r.stats).collect();

    let data = json!({
        "format": "X-roomconsolidation-result",
        "version": "1.0",
        "generated": chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        "overall": serde_json::to_value(overall).map_err(|e| format!("{}", e))?,
        "groups": serde_json::to_value(groups).map_err(|e| format!("{}", e))?,
        "merges": serde_json::to_value(merges).map_err(|e| format!("{}", e))?,
        "merged_rooms": serde_json::to_value(merged_rooms).map_err(|e| format!("{}", e))?,
        "room_changes": serde_json::to_value(room_changes).map_err(|e| format!("{}", e))?,
        "stats": serde_json::to_value(stats).map_err(|e| format!("{}", e))?,
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}

/// Write a room table to the simple JSON representation (e.g. to dump the rows of a failing
/// group for offline debugging).
pub fn write_rows<W: std::io::Write>(writer: W, rows: &[RoomRow]) -> Result<(), String> {
    let r: serde_json::Value = serde_json::to_value(rows).map_err(|e| format!("{}", e))?;
    let data = json!({
        "format": "X-roomtable-simple",
        "version": "1.0",
        "rooms": r,
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}
