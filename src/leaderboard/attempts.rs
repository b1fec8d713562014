use super::{AttemptRecord, CompletionStatus, SessionRecord, format_time};

/// Projects one driver's attempts for the day, across every stage and
/// vehicle. Exact name match, original row order, no aggregation.
pub fn project_attempts(records: &[SessionRecord], driver_name: &str) -> Vec<AttemptRecord> {
    records
        .iter()
        .filter(|record| record.user_name == driver_name)
        .map(|record| {
            let (time, status) = match record.status {
                CompletionStatus::Completed => {
                    let time = record
                        .time
                        .seconds()
                        .map(format_time)
                        .unwrap_or_else(|| "DNF".to_string());
                    (time, "Completed".to_string())
                }
                CompletionStatus::NotFinished => ("DNF".to_string(), "DNF".to_string()),
            };
            AttemptRecord {
                time,
                status,
                vehicle_id: record.vehicle_id,
                vehicle_class_id: record.vehicle_class_id,
            }
        })
        .collect()
}
