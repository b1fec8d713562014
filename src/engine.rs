use std::collections::HashMap;

use chrono::NaiveDate;
use log::{error, info};
use serde_json::Value;

use crate::leaderboard::{
    AttemptView, DriverAggregate, EventInfo, GroupingDimension, PartitionKey, SelectionPolicy,
    SessionRecord, Snapshot, StandingEntry, aggregate_drivers, format_day, normalize_rows,
    project_attempts, rank_leaderboard, select_partition,
};
use crate::transport::{
    Lookup, QueryTransport, current_driver_query, resolve_name, sessions_by_day_query,
    standings_query,
};

/// The leaderboard aggregation engine. Every public operation is total:
/// transport failures degrade to empty data and malformed rows are dropped,
/// so callers always get a well-formed (possibly placeholder) result.
pub struct LeaderboardEngine<T: QueryTransport> {
    transport: T,
    grouping: GroupingDimension,
    policy: SelectionPolicy,
}

impl<T: QueryTransport> LeaderboardEngine<T> {
    pub fn new(transport: T, grouping: GroupingDimension, policy: SelectionPolicy) -> Self {
        Self {
            transport,
            grouping,
            policy,
        }
    }

    /// Runs the full pipeline for one day: fetch, normalize, partition,
    /// aggregate, rank, resolve display names.
    pub async fn compute_daily_leaderboard(
        &self,
        date: NaiveDate,
        explicit: Option<&PartitionKey>,
    ) -> Snapshot {
        let records = self.sessions_for_day(date).await;
        if records.is_empty() {
            return Snapshot::placeholder(date);
        }

        let partition = select_partition(&records, self.grouping, self.policy, explicit);
        let Some(active) = partition.active else {
            return Snapshot::placeholder(date);
        };

        let mut names = NameCache::new();
        let aggregates = self.resolve_drivers(
            aggregate_drivers(&partition.records),
            &mut names,
        )
        .await;
        let event = self
            .resolve_event(date, &active, partition.records.first(), &mut names)
            .await;
        let leaderboard = rank_leaderboard(aggregates);
        info!(
            "Computed leaderboard for {date}: {} partitions, {} drivers",
            partition.keys.len(),
            leaderboard.len()
        );

        Snapshot {
            event,
            partition_options: partition.keys,
            active_key: Some(active),
            leaderboard,
        }
    }

    /// One driver's attempts for the day across all stages and vehicles,
    /// independent of the active partition.
    pub async fn compute_attempt_history(&self, date: NaiveDate, driver: &str) -> Vec<AttemptView> {
        let records = self.sessions_for_day(date).await;
        let mut names = NameCache::new();
        let mut views = Vec::new();
        for attempt in project_attempts(&records, driver) {
            let vehicle = names
                .resolve(&self.transport, Lookup::Vehicle, attempt.vehicle_id)
                .await;
            let vehicle_class = names
                .resolve(&self.transport, Lookup::VehicleClass, attempt.vehicle_class_id)
                .await;
            views.push(AttemptView {
                time: attempt.time,
                status: attempt.status,
                vehicle,
                vehicle_class,
            });
        }
        views
    }

    /// The selection universe for the day, in first-seen order.
    pub async fn list_partition_options(&self, date: NaiveDate) -> Vec<PartitionKey> {
        let records = self.sessions_for_day(date).await;
        select_partition(&records, self.grouping, self.policy, None).keys
    }

    /// The most recently logged-in driver, `"N/A"` when unknown.
    pub async fn current_driver(&self) -> String {
        match self.transport.query(current_driver_query()).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("user_name"))
                .and_then(Value::as_str)
                .unwrap_or("N/A")
                .to_string(),
            Err(e) => {
                error!("Error fetching current driver: {e}");
                "N/A".to_string()
            }
        }
    }

    /// Championship points projection: one row per driver, position by the
    /// backend's point ordering.
    pub async fn championship_standings(&self, series_id: i64) -> Vec<StandingEntry> {
        let rows = match self.transport.query(&standings_query(series_id)).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Error fetching championship standings: {e}");
                return Vec::new();
            }
        };
        rows.iter()
            .enumerate()
            .map(|(index, row)| StandingEntry {
                position: index + 1,
                name: row
                    .get("user_name")
                    .and_then(Value::as_str)
                    .unwrap_or("-")
                    .to_string(),
                points: row.get("points").and_then(Value::as_i64).unwrap_or(0),
            })
            .collect()
    }

    async fn sessions_for_day(&self, date: NaiveDate) -> Vec<SessionRecord> {
        match self.transport.query(&sessions_by_day_query(date)).await {
            Ok(rows) => normalize_rows(&rows),
            Err(e) => {
                error!("Error fetching sessions for {date}: {e}");
                Vec::new()
            }
        }
    }

    async fn resolve_drivers(
        &self,
        aggregates: Vec<DriverAggregate>,
        names: &mut NameCache,
    ) -> Vec<DriverAggregate> {
        let mut resolved = Vec::with_capacity(aggregates.len());
        for mut aggregate in aggregates {
            if aggregate.vehicle_id.is_some() {
                aggregate.vehicle = names
                    .resolve(&self.transport, Lookup::Vehicle, aggregate.vehicle_id)
                    .await;
            }
            if aggregate.vehicle_class_id.is_some() {
                aggregate.vehicle_class = names
                    .resolve(
                        &self.transport,
                        Lookup::VehicleClass,
                        aggregate.vehicle_class_id,
                    )
                    .await;
            }
            resolved.push(aggregate);
        }
        resolved
    }

    async fn resolve_event(
        &self,
        date: NaiveDate,
        active: &PartitionKey,
        first_record: Option<&SessionRecord>,
        names: &mut NameCache,
    ) -> EventInfo {
        let stage = names
            .resolve(&self.transport, Lookup::Route, Some(active.route_id))
            .await;
        let location = names
            .resolve(
                &self.transport,
                Lookup::Location,
                first_record.and_then(|r| r.location_id),
            )
            .await;
        // in class mode there is no single car or manufacturer to show
        let (class, car, manufacturer) = match self.grouping {
            GroupingDimension::VehicleClass => {
                let class = names
                    .resolve(&self.transport, Lookup::VehicleClass, active.dimension_id)
                    .await;
                (class, "-".to_string(), "-".to_string())
            }
            GroupingDimension::Vehicle => {
                let class = names
                    .resolve(
                        &self.transport,
                        Lookup::VehicleClass,
                        first_record.and_then(|r| r.vehicle_class_id),
                    )
                    .await;
                let car = names
                    .resolve(&self.transport, Lookup::Vehicle, active.dimension_id)
                    .await;
                let manufacturer = names
                    .resolve(
                        &self.transport,
                        Lookup::Manufacturer,
                        first_record.and_then(|r| r.manufacturer_id),
                    )
                    .await;
                (class, car, manufacturer)
            }
        };

        EventInfo {
            stage,
            location,
            class,
            car,
            manufacturer,
            date: format_day(date),
        }
    }
}

/// Per-run cache so one leaderboard pass resolves each entity name once.
struct NameCache {
    names: HashMap<(Lookup, i64), String>,
}

impl NameCache {
    fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    async fn resolve<T: QueryTransport>(
        &mut self,
        transport: &T,
        lookup: Lookup,
        id: Option<i64>,
    ) -> String {
        let Some(id) = id else {
            return lookup.placeholder().to_string();
        };
        if let Some(name) = self.names.get(&(lookup, id)) {
            return name.clone();
        }
        let name = resolve_name(transport, lookup, Some(id)).await;
        self.names.insert((lookup, id), name.clone());
        name
    }
}
