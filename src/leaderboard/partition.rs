use std::collections::HashMap;

use super::{GroupingDimension, PartitionKey, SelectionPolicy, SessionRecord};

/// Result of grouping one day's records: the selection universe, the key
/// actually in effect, and the records behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionOutcome {
    pub keys: Vec<PartitionKey>,
    pub active: Option<PartitionKey>,
    pub records: Vec<SessionRecord>,
}

impl PartitionOutcome {
    fn empty() -> Self {
        Self {
            keys: Vec::new(),
            active: None,
            records: Vec::new(),
        }
    }
}

/// Groups records by `(route, grouping dimension)` and picks the active key.
/// An explicit key that still matches data is sticky and wins over the
/// configured default policy.
pub fn select_partition(
    records: &[SessionRecord],
    grouping: GroupingDimension,
    policy: SelectionPolicy,
    explicit: Option<&PartitionKey>,
) -> PartitionOutcome {
    if records.is_empty() {
        return PartitionOutcome::empty();
    }

    // first-seen key order is the dropdown order
    let mut keys: Vec<PartitionKey> = Vec::new();
    let mut groups: HashMap<PartitionKey, Vec<SessionRecord>> = HashMap::new();
    for record in records {
        let key = PartitionKey::for_record(record, grouping);
        if !groups.contains_key(&key) {
            keys.push(key);
        }
        groups.entry(key).or_default().push(record.clone());
    }

    let active = match explicit {
        Some(key) if groups.contains_key(key) => *key,
        _ => default_key(records, &keys, &groups, grouping, policy),
    };

    let records = groups.remove(&active).unwrap_or_default();
    PartitionOutcome {
        keys,
        active: Some(active),
        records,
    }
}

fn default_key(
    records: &[SessionRecord],
    keys: &[PartitionKey],
    groups: &HashMap<PartitionKey, Vec<SessionRecord>>,
    grouping: GroupingDimension,
    policy: SelectionPolicy,
) -> PartitionKey {
    match policy {
        // ties keep the earliest record, matching first-seen key order
        SelectionPolicy::MostRecent => {
            let mut most_recent = &records[0];
            for record in records {
                match (record.started_at, most_recent.started_at) {
                    (Some(a), Some(b)) if a > b => most_recent = record,
                    (Some(_), None) => most_recent = record,
                    _ => {}
                }
            }
            PartitionKey::for_record(most_recent, grouping)
        }
        SelectionPolicy::MostFrequent => {
            let mut best = keys[0];
            let mut best_len = groups.get(&best).map_or(0, Vec::len);
            for key in &keys[1..] {
                let len = groups.get(key).map_or(0, Vec::len);
                if len > best_len {
                    best = *key;
                    best_len = len;
                }
            }
            best
        }
    }
}
