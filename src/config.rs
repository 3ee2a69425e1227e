// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Configuration is stored as TOML through `confy`. Every field has a serde
//! default so a missing or partial file still loads. The document store URL
//! is normally supplied through the `DB_URL` environment variable, which takes
//! precedence over the file.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use route_tracker::WindowConfig;
use serde::{Deserialize, Serialize};

/// Name used for the confy configuration directory
pub const APP_NAME: &str = "ymparajo-dashboard";

/// Environment variable holding the document store connection string
pub const DB_URL_ENV: &str = "DB_URL";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Address the HTTP server listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Page title shown in the browser tab
    #[serde(default = "default_title")]
    pub title: String,

    /// Directory holding the static data files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Municipality boundary GeoJSON file name (relative to `data_dir`)
    #[serde(default = "default_municipalities_file")]
    pub municipalities_file: String,

    /// Semicolon-delimited statistics file name (relative to `data_dir`)
    #[serde(default = "default_stats_file")]
    pub stats_file: String,

    /// Document store URL (env var takes precedence)
    #[serde(default)]
    pub db_url: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Seconds between live-tracking polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Runners whose latest point is younger than this are live
    #[serde(default = "default_freshness_window_hours")]
    pub freshness_window_hours: i64,

    /// History shown on top of the freshness window
    #[serde(default = "default_display_extra_hours")]
    pub display_extra_hours: i64,

    /// Latest point younger than this shows the "Live" badge
    #[serde(default = "default_live_threshold_secs")]
    pub live_threshold_secs: i64,

    /// Municipality whose border is drawn on the live map
    #[serde(default = "default_tracked_municipality")]
    pub tracked_municipality: String,

    /// Offset from UTC used for times shown on the live map
    #[serde(default = "default_display_utc_offset_minutes")]
    pub display_utc_offset_minutes: i32,

    /// Log file path; empty logs to stderr
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_bind_address() -> String {
    "127.0.0.1:8050".to_string()
}

fn default_title() -> String {
    "Ympäriajojen suoritustilanneseuranta".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_municipalities_file() -> String {
    "kunnatwgs84simplified.geojson".to_string()
}

fn default_stats_file() -> String {
    "ympäriajostatsit.csv".to_string()
}

fn default_database() -> String {
    "routedata".to_string()
}

fn default_collection() -> String {
    "routes".to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_freshness_window_hours() -> i64 {
    48
}

fn default_display_extra_hours() -> i64 {
    24
}

fn default_live_threshold_secs() -> i64 {
    300
}

fn default_tracked_municipality() -> String {
    "Kauniainen".to_string()
}

fn default_display_utc_offset_minutes() -> i32 {
    180
}

fn default_log_file() -> String {
    "app.log".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            bind_address: default_bind_address(),
            title: default_title(),
            data_dir: default_data_dir(),
            municipalities_file: default_municipalities_file(),
            stats_file: default_stats_file(),
            db_url: None,
            database: default_database(),
            collection: default_collection(),
            poll_interval_secs: default_poll_interval_secs(),
            freshness_window_hours: default_freshness_window_hours(),
            display_extra_hours: default_display_extra_hours(),
            live_threshold_secs: default_live_threshold_secs(),
            tracked_municipality: default_tracked_municipality(),
            display_utc_offset_minutes: default_display_utc_offset_minutes(),
            log_file: default_log_file(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default confy location
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Load configuration from an explicit file path
    pub fn load_from(path: &Path) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    #[must_use]
    pub fn municipalities_path(&self) -> PathBuf {
        self.data_dir.join(&self.municipalities_file)
    }

    #[must_use]
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join(&self.stats_file)
    }

    /// Log file path, or `None` to log to stderr
    #[must_use]
    pub fn log_path(&self) -> Option<PathBuf> {
        Some(self.log_file.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// Resolve the document store URL from the environment or config
    #[must_use]
    pub fn resolve_db_url(&self) -> Option<String> {
        Self::pick_db_url(std::env::var(DB_URL_ENV).ok(), self.db_url.as_deref())
    }

    fn pick_db_url(env_value: Option<String>, config_value: Option<&str>) -> Option<String> {
        // Check environment variable first
        if let Some(url) = env_value.filter(|s| !s.is_empty()) {
            return Some(url);
        }

        // Fall back to config
        config_value.map(str::to_string).filter(|s| !s.is_empty())
    }

    /// Time windows for live snapshot construction
    #[must_use]
    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            freshness_window: TimeDelta::hours(self.freshness_window_hours),
            display_extra: TimeDelta::hours(self.display_extra_hours),
            live_threshold: TimeDelta::seconds(self.live_threshold_secs),
        }
    }

    /// Zone used when formatting times for display. Falls back to UTC on an out of range offset.
    #[must_use]
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    #[must_use]
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
