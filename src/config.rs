use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::location::Coordinates;

const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_ENDPOINT: &str = "ws://localhost:8000/ws/arc_engine";
pub const DEFAULT_HOLD_DURATION_MS: u64 = 3000;
pub const DEFAULT_PROGRESS_TICK_MS: u64 = 100;

/// Timing for the hold-to-confirm gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldSettings {
    pub hold_duration_ms: u64,
    pub progress_tick_ms: u64,
}

impl Default for HoldSettings {
    fn default() -> Self {
        Self {
            hold_duration_ms: DEFAULT_HOLD_DURATION_MS,
            progress_tick_ms: DEFAULT_PROGRESS_TICK_MS,
        }
    }
}

impl HoldSettings {
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms.max(1))
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub ws_endpoint: String,
    pub hold: HoldSettings,
    /// Fixed position reported by the terminal shell, which has no GPS.
    pub static_location: Option<Coordinates>,
    pub debug: bool,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            ws_endpoint: DEFAULT_WS_ENDPOINT.into(),
            hold: HoldSettings::default(),
            static_location: None,
            debug: false,
            data_dir: default_data_dir(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ades")
}

impl ClientConfig {
    /// Loads `config.json` from the data dir (env `ADES_DATA_DIR` or the
    /// platform default), then applies env overrides.
    pub fn load() -> Result<Self> {
        let data_dir = env::var("ADES_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let mut config = Self::load_from(&data_dir)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str::<ClientConfig>(&contents)
                .with_context(|| format!("Invalid config in {}", path.display()))?
        } else {
            ClientConfig::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var("ADES_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(endpoint) = env::var("ADES_WS_ENDPOINT") {
            self.ws_endpoint = endpoint;
        }
        if let Ok(value) = env::var("ADES_DEBUG") {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("failed to create data directory {}", self.data_dir.display())
        })
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}
