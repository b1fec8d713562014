use chrono::{Days, NaiveDate};
use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, interval};

use crate::engine::LeaderboardEngine;
use crate::leaderboard::{PartitionKey, Snapshot};
use crate::transport::QueryTransport;

/// External triggers besides the timer tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SchedulerCommand {
    /// Shift the viewed day; the partition selection resets to the default
    /// policy for the new day.
    ChangeDay(i64),
    /// Pin a partition; it stays active across refreshes while its data
    /// exists.
    SelectPartition(PartitionKey),
    /// Re-run the pipeline immediately.
    Refresh,
}

/// Re-runs the leaderboard pipeline on a fixed interval and on user commands,
/// publishing each finished run as a whole snapshot through a watch channel.
pub struct RefreshScheduler<T: QueryTransport> {
    engine: LeaderboardEngine<T>,
    current_date: NaiveDate,
    active_key: Option<PartitionKey>,
    run_seq: u64,
    published_run: u64,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<T: QueryTransport> RefreshScheduler<T> {
    pub fn new(
        engine: LeaderboardEngine<T>,
        start_date: NaiveDate,
    ) -> (Self, watch::Receiver<Snapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::placeholder(start_date));
        (
            Self {
                engine,
                current_date: start_date,
                active_key: None,
                run_seq: 0,
                published_run: 0,
                snapshot_tx,
            },
            snapshot_rx,
        )
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn active_key(&self) -> Option<PartitionKey> {
        self.active_key
    }

    /// Drives the refresh loop until every command sender is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SchedulerCommand>, period: Duration) {
        let mut ticker = interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh().await,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }
    }

    pub async fn handle_command(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::ChangeDay(offset) => {
                self.current_date = shift_date(self.current_date, offset);
                self.active_key = None;
                info!("Viewing day changed to {}", self.current_date);
            }
            SchedulerCommand::SelectPartition(key) => {
                self.active_key = Some(key);
                debug!("Partition pinned to {key:?}");
            }
            SchedulerCommand::Refresh => {}
        }
        self.refresh().await;
    }

    /// One discrete pipeline run. Runs are serialized by the loop; the run id
    /// check additionally keeps a stale run from replacing a newer snapshot.
    pub async fn refresh(&mut self) {
        self.run_seq += 1;
        let run = self.run_seq;
        let snapshot = self
            .engine
            .compute_daily_leaderboard(self.current_date, self.active_key.as_ref())
            .await;
        if run <= self.published_run {
            debug!("Discarding stale run {run}");
            return;
        }
        self.published_run = run;
        // adopt the selection the run settled on so it stays sticky; a
        // zero-record run resets the snapshot but keeps the user's pin
        if snapshot.active_key.is_some() {
            self.active_key = snapshot.active_key;
        }
        self.snapshot_tx.send_replace(snapshot);
    }
}

fn shift_date(date: NaiveDate, offset: i64) -> NaiveDate {
    let days = Days::new(offset.unsigned_abs());
    let shifted = if offset >= 0 {
        date.checked_add_days(days)
    } else {
        date.checked_sub_days(days)
    };
    shifted.unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{GroupingDimension, SelectionPolicy};
    use crate::{QueryTransport, RallyboardError};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    struct FakeBackend {
        sessions: Arc<Mutex<Vec<Value>>>,
    }

    impl FakeBackend {
        fn with_sessions(rows: Vec<Value>) -> (Self, Arc<Mutex<Vec<Value>>>) {
            let sessions = Arc::new(Mutex::new(rows));
            (
                Self {
                    sessions: sessions.clone(),
                },
                sessions,
            )
        }
    }

    impl QueryTransport for FakeBackend {
        async fn query(&self, statement: &str) -> Result<Vec<Value>, RallyboardError> {
            if statement.contains("FROM sessions") {
                Ok(self.sessions.lock().unwrap().clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn session_row(user: &str, time: f64, route: i64, started_at: &str) -> Value {
        json!({
            "user_id": user,
            "user_name": user,
            "time": time,
            "stage_result_status": 1,
            "route_id": route,
            "vehicle_class_id": 7,
            "started_at": started_at,
        })
    }

    fn scheduler(
        rows: Vec<Value>,
    ) -> (
        RefreshScheduler<FakeBackend>,
        watch::Receiver<Snapshot>,
        Arc<Mutex<Vec<Value>>>,
    ) {
        let (backend, sessions) = FakeBackend::with_sessions(rows);
        let engine = LeaderboardEngine::new(
            backend,
            GroupingDimension::VehicleClass,
            SelectionPolicy::MostRecent,
        );
        let (scheduler, rx) = RefreshScheduler::new(
            engine,
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
        );
        (scheduler, rx, sessions)
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot_and_adopts_key() {
        let (mut scheduler, rx, _sessions) =
            scheduler(vec![session_row("X", 58.0, 5, "2025-01-07 10:00:00")]);
        scheduler.refresh().await;
        let snapshot = rx.borrow();
        assert_eq!(snapshot.leaderboard.len(), 1);
        assert_eq!(
            scheduler.active_key(),
            Some(PartitionKey {
                route_id: 5,
                dimension_id: Some(7)
            })
        );
    }

    #[tokio::test]
    async fn test_day_change_clears_pinned_partition() {
        let (mut scheduler, _rx, _sessions) =
            scheduler(vec![session_row("X", 58.0, 5, "2025-01-07 10:00:00")]);
        scheduler
            .handle_command(SchedulerCommand::SelectPartition(PartitionKey {
                route_id: 5,
                dimension_id: Some(7),
            }))
            .await;
        scheduler.handle_command(SchedulerCommand::ChangeDay(1)).await;
        assert_eq!(
            scheduler.current_date(),
            NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()
        );
        // the new day has data too, so the policy default was re-adopted
        assert_eq!(
            scheduler.active_key(),
            Some(PartitionKey {
                route_id: 5,
                dimension_id: Some(7)
            })
        );
    }

    #[tokio::test]
    async fn test_empty_run_resets_to_placeholder() {
        let (mut scheduler, rx, sessions) =
            scheduler(vec![session_row("X", 58.0, 5, "2025-01-07 10:00:00")]);
        scheduler.refresh().await;
        assert_eq!(rx.borrow().leaderboard.len(), 1);

        sessions.lock().unwrap().clear();
        scheduler.refresh().await;
        {
            let snapshot = rx.borrow();
            assert!(snapshot.leaderboard.is_empty());
            assert!(snapshot.partition_options.is_empty());
            assert_eq!(snapshot.event.stage, "-");
        }
        // the pinned selection survives the empty run and reapplies
        let pinned = scheduler.active_key().unwrap();
        sessions
            .lock()
            .unwrap()
            .push(session_row("X", 58.0, 5, "2025-01-07 10:00:00"));
        scheduler.refresh().await;
        assert_eq!(scheduler.active_key(), Some(pinned));
        assert_eq!(rx.borrow().leaderboard.len(), 1);
    }

    #[tokio::test]
    async fn test_partition_command_pins_key() {
        let rows = vec![
            session_row("X", 58.0, 5, "2025-01-07 10:00:00"),
            session_row("Y", 60.0, 6, "2025-01-07 11:00:00"),
        ];
        let (mut scheduler, rx, _sessions) = scheduler(rows);
        scheduler.refresh().await;
        // most-recent default picked route 6
        assert_eq!(scheduler.active_key().unwrap().route_id, 6);

        scheduler
            .handle_command(SchedulerCommand::SelectPartition(PartitionKey {
                route_id: 5,
                dimension_id: Some(7),
            }))
            .await;
        assert_eq!(scheduler.active_key().unwrap().route_id, 5);
        assert_eq!(rx.borrow().leaderboard[0].name, "X");

        // sticky across later refreshes
        scheduler.refresh().await;
        assert_eq!(scheduler.active_key().unwrap().route_id, 5);
    }
}
