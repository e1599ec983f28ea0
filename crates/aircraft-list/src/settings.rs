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

//! Key/value store for persisted user preferences.
//!
//! Values are opaque strings; components serialise their own state (the list
//! filter stores JSON) and pick their own key.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Errors raised by a settings backend.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings backend failed: {0}")]
    Backend(String),
}

/// Persistent string store keyed by name.
pub trait SettingsStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsError>;

    fn save(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// Store that lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self
            .values
            .lock()
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values
            .lock()
            .map_err(|e| SettingsError::Backend(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
