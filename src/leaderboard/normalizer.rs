use chrono::NaiveDateTime;
use log::debug;
use serde_json::Value;

use super::{CompletionStatus, SessionRecord, StageTime};

/// Coerces raw transport rows into canonical `SessionRecord`s. Rows that
/// cannot be attributed (no user id) or partitioned (no route id) are dropped;
/// nothing here ever fails.
pub fn normalize_rows(rows: &[Value]) -> Vec<SessionRecord> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match normalize_row(row) {
            Some(record) => records.push(record),
            None => debug!("Dropping unattributable session row: {row}"),
        }
    }
    records
}

fn normalize_row(row: &Value) -> Option<SessionRecord> {
    let user_id = string_field(row, "user_id")?;
    let route_id = int_field(row, "route_id")?;
    let status = CompletionStatus::from_raw(int_field(row, "stage_result_status").unwrap_or(0));

    Some(SessionRecord {
        user_id,
        user_name: string_field(row, "user_name").unwrap_or_else(|| "-".to_string()),
        started_at: timestamp_field(row, "started_at"),
        time: float_field(row, "time")
            .map(StageTime::Finite)
            .unwrap_or(StageTime::NotFinished),
        status,
        route_id,
        location_id: int_field(row, "location_id"),
        vehicle_id: int_field(row, "vehicle_id"),
        manufacturer_id: int_field(row, "vehicle_manufacturer_id"),
        vehicle_class_id: int_field(row, "vehicle_class_id"),
    })
}

// The timing source is not consistent about numeric columns: depending on the
// driver they arrive as JSON numbers or as strings.
fn string_field(row: &Value, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int_field(row: &Value, field: &str) -> Option<i64> {
    match row.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(row: &Value, field: &str) -> Option<f64> {
    let parsed = match row.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn timestamp_field(row: &Value, field: &str) -> Option<NaiveDateTime> {
    let raw = match row.get(field)? {
        Value::String(s) => s.clone(),
        _ => return None,
    };
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
