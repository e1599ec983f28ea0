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

//! User preferences persisted with confy, next to the main config file.

use std::collections::BTreeMap;
use std::sync::Mutex;

use aircraft_list::{SettingsError, SettingsStore};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// [`SettingsStore`] backed by its own confy file.
///
/// Values are cached in memory and the whole file is rewritten on every save.
#[derive(Debug)]
pub struct ConfySettingsStore {
    /// `(app name, config name)`; `None` keeps the store in memory only.
    location: Option<(String, String)>,
    cache: Mutex<StoredSettings>,
}

impl ConfySettingsStore {
    /// Open (or create) the settings file.
    pub fn open(app_name: &str, config_name: &str) -> Result<Self, confy::ConfyError> {
        let stored: StoredSettings = confy::load(app_name, config_name)?;
        debug!("Loaded {} persisted setting(s) from {}/{}", stored.values.len(), app_name, config_name);
        Ok(Self {
            location: Some((app_name.to_string(), config_name.to_string())),
            cache: Mutex::new(stored),
        })
    }

    /// Store that never touches the disk.
    #[cfg(test)]
    fn detached() -> Self {
        Self {
            location: None,
            cache: Mutex::new(StoredSettings::default()),
        }
    }
}

impl SettingsStore for ConfySettingsStore {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let cache = self
            .cache
            .lock()
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(cache.values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        cache.values.insert(key.to_string(), value.to_string());

        if let Some((app_name, config_name)) = &self.location {
            confy::store(app_name, config_name.as_str(), &*cache)
                .map_err(|e| SettingsError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}
