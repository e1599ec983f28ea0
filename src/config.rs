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
//! Configuration is persisted with confy in TOML format. Every field carries a
//! serde default so older files keep loading as fields are added.

use serde::{Deserialize, Serialize};

/// Name confy files are stored under.
pub const APP_NAME: &str = "airjedi-list";

/// Default aircraft-tracking server
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/VirtualRadar";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Base URL of the server the aircraft list is fetched from
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Seconds between aircraft list fetches
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    /// Whether the server is allowed to report aircraft pictures
    #[serde(default = "default_true")]
    pub pictures_enabled: bool,

    /// Log how long each event takes to dispatch
    #[serde(default)]
    pub log_event_timings: bool,

    /// Settings key the aircraft list filter is saved under
    #[serde(default = "default_filter_key")]
    pub filter_persistence_key: String,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_refresh_seconds() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

fn default_filter_key() -> String {
    aircraft_list::filter::DEFAULT_PERSISTENCE_KEY.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            server_url: default_server_url(),
            refresh_seconds: default_refresh_seconds(),
            pictures_enabled: true,
            log_event_timings: false,
            filter_persistence_key: default_filter_key(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    /// Refresh interval, never shorter than one second.
    #[must_use]
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_seconds.max(1))
    }
}
