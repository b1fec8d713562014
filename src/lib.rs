// Library interface for rallyboard
// This allows integration tests to access internal modules

pub mod config;
pub mod engine;
pub mod errors;
pub mod leaderboard;
pub mod render;
pub mod scheduler;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::LeaderboardEngine;
pub use errors::RallyboardError;
pub use leaderboard::{
    AttemptView, GroupingDimension, LeaderboardEntry, PartitionKey, SelectionPolicy, SessionRecord,
    Snapshot, StageTime, StandingEntry,
};
pub use scheduler::{RefreshScheduler, SchedulerCommand};
pub use transport::{HttpQueryTransport, Lookup, QueryTransport};
