use chrono::NaiveDate;
use log::warn;
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::RallyboardError;

/// The opaque query collaborator: takes a query description, returns rows.
/// The aggregation pipeline never sees what is behind it.
pub trait QueryTransport {
    fn query(
        &self,
        statement: &str,
    ) -> impl Future<Output = Result<Vec<Value>, RallyboardError>> + Send;
}

/// Timing backend client posting queries to the `/api/query` endpoint.
#[derive(Clone, Debug)]
pub struct HttpQueryTransport {
    endpoint: String,
    client: HttpClient,
}

impl HttpQueryTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: HttpClient::new(),
        }
    }
}

impl QueryTransport for HttpQueryTransport {
    async fn query(&self, statement: &str) -> Result<Vec<Value>, RallyboardError> {
        let response = self
            .client
            .post(format!("{}/api/query", self.endpoint))
            .header("Content-Type", "plain/text; charset=utf-8")
            .body(statement.to_string())
            .send()
            .await
            .map_err(|e| RallyboardError::TransportRequest { source: e })?;

        if !response.status().is_success() {
            return Err(RallyboardError::TransportStatus {
                status: response.status().as_u16(),
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RallyboardError::TransportDecode { source: e })
    }
}

/// Entity kinds the name resolver knows about, with their lookup tables and
/// kind-specific fallback names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lookup {
    Route,
    Location,
    Vehicle,
    Manufacturer,
    VehicleClass,
}

impl Lookup {
    fn table(&self) -> &'static str {
        match self {
            Self::Route => "routes",
            Self::Location => "locations",
            Self::Vehicle => "vehicles",
            Self::Manufacturer => "vehicle_manufacturers",
            Self::VehicleClass => "vehicle_classes",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Route => "Unknown Route",
            Self::Location => "Unknown Location",
            Self::Vehicle => "Unknown Vehicle",
            Self::Manufacturer => "Unknown Manufacturer",
            Self::VehicleClass => "Unknown Class",
        }
    }
}

/// Resolves a display name for an entity id. Total: a missing id, transport
/// failure, or empty result all yield the kind's placeholder.
pub async fn resolve_name<T: QueryTransport>(
    transport: &T,
    lookup: Lookup,
    id: Option<i64>,
) -> String {
    let Some(id) = id else {
        return lookup.placeholder().to_string();
    };
    let statement = format!(
        "SELECT name FROM {} WHERE id = {}",
        lookup.table(),
        id
    );
    match transport.query(&statement).await {
        Ok(rows) => rows
            .first()
            .and_then(|row| row.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| lookup.placeholder().to_string()),
        Err(e) => {
            warn!("Error resolving {} name for id {id}: {e}", lookup.table());
            lookup.placeholder().to_string()
        }
    }
}

/// Query for every timing session started on the given day, joined with the
/// driver name.
pub fn sessions_by_day_query(date: NaiveDate) -> String {
    let day = date.format("%Y-%m-%d");
    format!(
        "SELECT sessions.user_id, users.name AS user_name, \
         sessions.stage_result_time AS time, \
         sessions.started_at, \
         sessions.route_id, sessions.location_id, \
         sessions.vehicle_id, sessions.vehicle_manufacturer_id, \
         sessions.vehicle_class_id, \
         sessions.stage_result_status \
         FROM sessions \
         JOIN users ON sessions.user_id = users.id \
         WHERE sessions.started_at BETWEEN '{day} 00:00:00' AND '{day} 23:59:59'"
    )
}

/// Query for the most recently logged-in driver.
pub fn current_driver_query() -> &'static str {
    "SELECT users.name AS user_name \
     FROM user_logins \
     JOIN users ON user_logins.user_id = users.id \
     ORDER BY user_logins.timestamp DESC \
     LIMIT 1"
}

/// Query for a series' accumulated points per driver, best first.
pub fn standings_query(series_id: i64) -> String {
    format!(
        "SELECT users.name AS user_name, SUM(results.points) AS points \
         FROM results \
         JOIN users ON results.user_id = users.id \
         JOIN race_events ON results.race_event_id = race_events.id \
         WHERE race_events.race_series_id = {series_id} \
         GROUP BY users.name \
         ORDER BY points DESC"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_query_brackets_the_day() {
        let query = sessions_by_day_query(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
        assert!(query.contains("BETWEEN '2025-01-07 00:00:00' AND '2025-01-07 23:59:59'"));
        assert!(query.contains("sessions.stage_result_status"));
    }

    #[test]
    fn test_lookup_placeholders() {
        assert_eq!(Lookup::Route.placeholder(), "Unknown Route");
        assert_eq!(Lookup::VehicleClass.placeholder(), "Unknown Class");
        assert_eq!(Lookup::Manufacturer.table(), "vehicle_manufacturers");
    }

    #[test]
    fn test_standings_query_filters_series() {
        assert!(standings_query(3).contains("race_series_id = 3"));
    }
}
