use std::collections::HashMap;

use super::{DriverAggregate, SessionRecord, StageTime};

/// Folds one partition's records into one aggregate per driver, preserving
/// first-seen driver order. A driver stays on the board when they have a
/// completed run, or when every run of theirs was a DNF (shown once as DNF).
pub fn aggregate_drivers(records: &[SessionRecord]) -> Vec<DriverAggregate> {
    let mut order: Vec<DriverAggregate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let slot = match index.get(&record.user_id) {
            Some(slot) => *slot,
            None => {
                index.insert(record.user_id.clone(), order.len());
                order.push(DriverAggregate {
                    user_id: record.user_id.clone(),
                    name: record.user_name.clone(),
                    fastest: StageTime::NotFinished,
                    attempts: 0,
                    has_completed: false,
                    vehicle_id: None,
                    vehicle_class_id: None,
                    vehicle: "-".to_string(),
                    vehicle_class: "-".to_string(),
                });
                order.len() - 1
            }
        };

        let aggregate = &mut order[slot];
        aggregate.attempts += 1;
        let result = record.result_time();
        if result.is_finite() {
            aggregate.fastest = aggregate.fastest.min(result);
            aggregate.has_completed = true;
        }
        if aggregate.vehicle_id.is_none() {
            aggregate.vehicle_id = record.vehicle_id;
        }
        if aggregate.vehicle_class_id.is_none() {
            aggregate.vehicle_class_id = record.vehicle_class_id;
        }
    }

    order
        .into_iter()
        .filter(|a| a.has_completed || a.fastest == StageTime::NotFinished)
        .collect()
}
