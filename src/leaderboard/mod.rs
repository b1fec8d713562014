pub(crate) mod aggregate;
pub(crate) mod attempts;
pub(crate) mod normalizer;
pub(crate) mod partition;
pub(crate) mod ranking;

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub use aggregate::aggregate_drivers;
pub use attempts::project_attempts;
pub use normalizer::normalize_rows;
pub use partition::{PartitionOutcome, select_partition};
pub use ranking::rank_leaderboard;

/// Raw result status as reported by the timing source. Anything that is not
/// an explicit completion counts as a DNF.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletionStatus {
    Completed,
    NotFinished,
}

impl CompletionStatus {
    pub fn from_raw(status: i64) -> Self {
        if status == 1 {
            Self::Completed
        } else {
            Self::NotFinished
        }
    }
}

/// A stage time. `NotFinished` is the unique maximum of the ordering so DNF
/// entries always sort after every finite time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum StageTime {
    Finite(f64),
    NotFinished,
}

impl StageTime {
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::Finite(_))
    }

    pub fn seconds(&self) -> Option<f64> {
        match self {
            Self::Finite(s) => Some(*s),
            Self::NotFinished => None,
        }
    }

    pub fn min(self, other: StageTime) -> StageTime {
        if self <= other { self } else { other }
    }
}

impl PartialEq for StageTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StageTime {}

impl PartialOrd for StageTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StageTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Finite(a), Self::Finite(b)) => a.total_cmp(b),
            (Self::Finite(_), Self::NotFinished) => Ordering::Less,
            (Self::NotFinished, Self::Finite(_)) => Ordering::Greater,
            (Self::NotFinished, Self::NotFinished) => Ordering::Equal,
        }
    }
}

/// One timing attempt, normalized from a raw transport row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub user_id: String,
    pub user_name: String,
    pub started_at: Option<NaiveDateTime>,
    pub time: StageTime,
    pub status: CompletionStatus,
    pub route_id: i64,
    pub location_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub manufacturer_id: Option<i64>,
    pub vehicle_class_id: Option<i64>,
}

impl SessionRecord {
    /// The time that counts for ranking: finite only for a completed attempt
    /// with a parsable time.
    pub fn result_time(&self) -> StageTime {
        match self.status {
            CompletionStatus::Completed => self.time,
            CompletionStatus::NotFinished => StageTime::NotFinished,
        }
    }
}

/// Which vehicle dimension a partition groups by. The timing source has been
/// deployed both ways, so this is explicit configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum GroupingDimension {
    #[default]
    VehicleClass,
    Vehicle,
}

/// How the active partition is picked when the user has not chosen one.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum SelectionPolicy {
    #[default]
    MostRecent,
    MostFrequent,
}

/// One stage/vehicle grouping, i.e. one "race" view. Derived from records on
/// every run, never stored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub route_id: i64,
    pub dimension_id: Option<i64>,
}

impl PartitionKey {
    pub fn for_record(record: &SessionRecord, grouping: GroupingDimension) -> Self {
        let dimension_id = match grouping {
            GroupingDimension::VehicleClass => record.vehicle_class_id,
            GroupingDimension::Vehicle => record.vehicle_id,
        };
        Self {
            route_id: record.route_id,
            dimension_id,
        }
    }
}

/// Per-driver fold of one partition's attempts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DriverAggregate {
    pub user_id: String,
    pub name: String,
    pub fastest: StageTime,
    pub attempts: u32,
    pub has_completed: bool,
    pub vehicle_id: Option<i64>,
    pub vehicle_class_id: Option<i64>,
    /// Display names filled in by the lookup resolver, "-" until resolved.
    pub vehicle: String,
    pub vehicle_class: String,
}

/// One ranked leaderboard row, presentation-ready.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub name: String,
    pub time: String,
    pub raw_time: StageTime,
    pub diff: String,
    pub attempts: u32,
    pub vehicle: String,
    pub vehicle_class: String,
}

/// One attempt in a driver's drill-down history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    pub time: String,
    pub status: String,
    pub vehicle_id: Option<i64>,
    pub vehicle_class_id: Option<i64>,
}

/// Resolver-expanded attempt row handed to the presentation side.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AttemptView {
    pub time: String,
    pub status: String,
    pub vehicle: String,
    pub vehicle_class: String,
}

/// Header describing the active event.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventInfo {
    pub stage: String,
    pub location: String,
    pub class: String,
    pub car: String,
    pub manufacturer: String,
    pub date: String,
}

impl EventInfo {
    pub fn placeholder(date: NaiveDate) -> Self {
        Self {
            stage: "-".to_string(),
            location: "-".to_string(),
            class: "-".to_string(),
            car: "-".to_string(),
            manufacturer: "-".to_string(),
            date: format_day(date),
        }
    }
}

/// One championship standings row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StandingEntry {
    pub position: usize,
    pub name: String,
    pub points: i64,
}

/// The whole derived state of one pipeline run. Built from scratch every run
/// and swapped in as a unit; never mutated after publication.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub event: EventInfo,
    pub partition_options: Vec<PartitionKey>,
    pub active_key: Option<PartitionKey>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl Snapshot {
    /// The "no event data" snapshot for a day with zero usable records.
    pub fn placeholder(date: NaiveDate) -> Self {
        Self {
            event: EventInfo::placeholder(date),
            partition_options: Vec::new(),
            active_key: None,
            leaderboard: Vec::new(),
        }
    }
}

/// Formats seconds as `MM:SS.mmm`. Minutes and seconds truncate,
/// milliseconds round.
pub fn format_time(seconds: f64) -> String {
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let millis = ((seconds % 1.0) * 1000.0).round() as u64;
    format!("{mins:02}:{secs:02}.{millis:03}")
}

/// Formats a day as `DD.MM` for the event header.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%d.%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_boundaries() {
        assert_eq!(format_time(65.5), "01:05.500");
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_time(58.0), "00:58.000");
        assert_eq!(format_time(3.234), "00:03.234");
    }

    #[test]
    fn test_stage_time_order_puts_dnf_last() {
        assert!(StageTime::Finite(1000.0) < StageTime::NotFinished);
        assert!(StageTime::NotFinished == StageTime::NotFinished);
        assert!(StageTime::Finite(58.0) < StageTime::Finite(61.234));
        assert_eq!(
            StageTime::Finite(70.0).min(StageTime::NotFinished),
            StageTime::Finite(70.0)
        );
    }

    #[test]
    fn test_result_time_ignores_elapsed_for_dnf() {
        let record = SessionRecord {
            user_id: "u1".to_string(),
            user_name: "X".to_string(),
            started_at: None,
            time: StageTime::Finite(42.0),
            status: CompletionStatus::NotFinished,
            route_id: 1,
            location_id: None,
            vehicle_id: None,
            manufacturer_id: None,
            vehicle_class_id: None,
        };
        assert_eq!(record.result_time(), StageTime::NotFinished);
    }

    #[test]
    fn test_format_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(format_day(date), "07.01");
    }
}
