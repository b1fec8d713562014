use serde::{Deserialize, Serialize};

use crate::RallyboardError;
use crate::leaderboard::{GroupingDimension, SelectionPolicy};

const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_REFRESH_RATE_MS: u64 = 5000;
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub refresh_rate_ms: u64,
    pub grouping: GroupingDimension,
    pub selection_policy: SelectionPolicy,
    pub championship_id: Option<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            refresh_rate_ms: DEFAULT_REFRESH_RATE_MS,
            grouping: GroupingDimension::default(),
            selection_policy: SelectionPolicy::default(),
            championship_id: None,
        }
    }
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("rallyboard").join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            serde_json::from_reader(file).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> Result<(), RallyboardError> {
        let config_path = dirs::config_dir()
            .ok_or(RallyboardError::NoConfigDir)?
            .join("rallyboard")
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RallyboardError::ConfigIO { source: e })?;
            }
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| RallyboardError::ConfigIO { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| RallyboardError::ConfigSerialize { source: e })
    }
}
