//! Runtime configuration loaded from environment variables

use chrono::TimeDelta;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Open rounds older than this are closed by the reaper
    pub round_timeout: TimeDelta,
    /// How often the reaper sweeps
    pub reaper_interval: Duration,
    /// Capacity of the round event broadcast channel
    pub event_channel_capacity: usize,
    /// Where to load/save state snapshots (None = no persistence)
    pub snapshot_path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_timeout: TimeDelta::minutes(10),
            reaper_interval: Duration::from_secs(60),
            event_channel_capacity: 100,
            snapshot_path: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparseable config value");
            None
        }
    }
}

impl GameConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let round_timeout = env_parse::<i64>("ROUND_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(TimeDelta::seconds)
            .unwrap_or(defaults.round_timeout);

        let reaper_interval = env_parse::<u64>("REAPER_INTERVAL_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.reaper_interval);

        let event_channel_capacity = env_parse::<usize>("EVENT_CHANNEL_CAPACITY")
            .filter(|cap| *cap > 0)
            .unwrap_or(defaults.event_channel_capacity);

        let snapshot_path = std::env::var("SNAPSHOT_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        tracing::info!(
            round_timeout_secs = round_timeout.num_seconds(),
            reaper_interval_secs = reaper_interval.as_secs(),
            event_channel_capacity,
            snapshot_path = ?snapshot_path,
            "Game config loaded"
        );

        Self {
            round_timeout,
            reaper_interval,
            event_channel_capacity,
            snapshot_path,
        }
    }
}
