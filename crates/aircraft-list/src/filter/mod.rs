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

//! Aircraft list filter.
//!
//! Decides which aircraft are visible and, once attached to an
//! [`AircraftList`], adds its filters to every outgoing fetch so the server
//! can filter too. At most one filter exists per aircraft property.

mod condition;

pub use condition::{AircraftFilter, FilterCondition, FilterKind, FilterProperty, FilterValue};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aircraft::Aircraft;
use crate::events::{EventDispatcher, HookHandle};
use crate::list::{AircraftList, FetchRequest};
use crate::settings::{SettingsError, SettingsStore};

/// Name of the event raised whenever the filter configuration changes.
pub const FILTER_CHANGED: &str = "filterChanged";

/// Key the filter state is stored under unless configured otherwise.
pub const DEFAULT_PERSISTENCE_KEY: &str = "aircraftListFilter";

/// Errors raised by the list filter.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("a filter on {0:?} already exists")]
    DuplicateProperty(FilterProperty),

    #[error("filter value does not suit property {property:?}")]
    ValueKindMismatch { property: FilterProperty },

    #[error("condition {condition:?} is not valid for property {property:?}")]
    UnsupportedCondition {
        property: FilterProperty,
        condition: FilterCondition,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("cannot serialise filter state: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persisted filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub hide_no_position: bool,
    #[serde(default)]
    pub filters: Vec<AircraftFilter>,
}

/// Construction options for [`AircraftListFilter`].
pub struct AircraftListFilterSettings {
    pub persistence_key: String,
    pub store: Option<Arc<dyn SettingsStore>>,
}

impl Default for AircraftListFilterSettings {
    fn default() -> Self {
        Self {
            persistence_key: DEFAULT_PERSISTENCE_KEY.to_string(),
            store: None,
        }
    }
}

impl std::fmt::Debug for AircraftListFilterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AircraftListFilterSettings")
            .field("persistence_key", &self.persistence_key)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

/// Group of property filters applied to the aircraft list.
pub struct AircraftListFilter {
    persistence_key: String,
    store: Option<Arc<dyn SettingsStore>>,
    state: RwLock<FilterState>,
    events: EventDispatcher<()>,
    fetching_list_hook: Mutex<Option<HookHandle>>,
}

impl std::fmt::Debug for AircraftListFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AircraftListFilter")
            .field("persistence_key", &self.persistence_key)
            .field("state", &*self.read_state())
            .finish_non_exhaustive()
    }
}

impl AircraftListFilter {
    #[must_use]
    pub fn new(settings: AircraftListFilterSettings) -> Self {
        Self {
            persistence_key: settings.persistence_key,
            store: settings.store,
            state: RwLock::new(FilterState::default()),
            events: EventDispatcher::new("aircraftListFilter"),
            fetching_list_hook: Mutex::new(None),
        }
    }

    pub fn hook_filter_changed<F>(&self, callback: F) -> HookHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.hook(FILTER_CHANGED, move |_| callback())
    }

    pub fn unhook(&self, handle: &HookHandle) -> bool {
        self.events.unhook(handle)
    }

    /// Start decorating `list`'s fetch requests with this filter.
    pub fn attach(self: &Arc<Self>, list: &AircraftList) {
        let filter = Arc::downgrade(self);
        let handle = list.hook_fetching_list(move |request| {
            if let Some(filter) = filter.upgrade() {
                filter.add_request_filter_parameters(request);
            }
        });

        if let Some(previous) = self.lock_hook().replace(handle) {
            list.unhook(&previous);
        }
    }

    /// Stop decorating `list`'s fetch requests.
    pub fn detach(&self, list: &AircraftList) {
        if let Some(handle) = self.lock_hook().take() {
            list.unhook(&handle);
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.read_state().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|state| std::mem::replace(&mut state.enabled, enabled) != enabled);
    }

    #[must_use]
    pub fn hide_aircraft_without_position(&self) -> bool {
        self.read_state().hide_no_position
    }

    pub fn set_hide_aircraft_without_position(&self, hide: bool) {
        self.update(|state| std::mem::replace(&mut state.hide_no_position, hide) != hide);
    }

    /// Add a filter. Fails if the property already has one.
    pub fn add_filter(&self, filter: AircraftFilter) -> Result<(), FilterError> {
        filter.validate()?;
        let property = filter.property();
        {
            let mut state = self.write_state();
            if state.filters.iter().any(|f| f.property() == property) {
                return Err(FilterError::DuplicateProperty(property));
            }
            state.filters.push(filter);
        }
        self.raise_filter_changed();
        Ok(())
    }

    /// Remove the filter on `property`, returning it.
    pub fn remove_filter(&self, property: FilterProperty) -> Option<AircraftFilter> {
        let removed = {
            let mut state = self.write_state();
            let position = state.filters.iter().position(|f| f.property() == property)?;
            state.filters.remove(position)
        };
        self.raise_filter_changed();
        Some(removed)
    }

    pub fn clear_filters(&self) {
        self.update(|state| {
            let had_filters = !state.filters.is_empty();
            state.filters.clear();
            had_filters
        });
    }

    #[must_use]
    pub fn filter_for(&self, property: FilterProperty) -> Option<AircraftFilter> {
        self.read_state()
            .filters
            .iter()
            .find(|f| f.property() == property)
            .cloned()
    }

    /// Filters in the order they were added.
    #[must_use]
    pub fn filters(&self) -> Vec<AircraftFilter> {
        self.read_state().filters.clone()
    }

    #[must_use]
    pub fn state(&self) -> FilterState {
        self.read_state().clone()
    }

    /// True if the aircraft should be shown.
    #[must_use]
    pub fn filter_aircraft(&self, aircraft: &Aircraft) -> bool {
        let state = self.read_state();
        if !state.enabled {
            return true;
        }

        aircraft.with_data(|data| {
            if state.hide_no_position && !data.has_position() {
                return false;
            }
            state.filters.iter().all(|filter| filter.passes(data))
        })
    }

    /// Add the active filters to an outgoing request if the group is enabled.
    pub fn add_request_filter_parameters(&self, request: &mut FetchRequest) {
        let state = self.read_state();
        if !state.enabled {
            return;
        }

        if state.hide_no_position {
            request.set_param("fNoPos", "1");
        }
        for filter in &state.filters {
            filter.add_request_parameters(request);
        }
    }

    /// Write the current configuration to the settings store.
    pub fn save_state(&self) -> Result<(), FilterError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let json = serde_json::to_string(&*self.read_state())?;
        store.save(&self.persistence_key, &json)?;
        Ok(())
    }

    /// Replace the current configuration with the stored one.
    ///
    /// Unreadable state is logged and ignored. Stored filters that are
    /// invalid or duplicate a property are dropped.
    pub fn load_state(&self) -> Result<(), FilterError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let Some(json) = store.load(&self.persistence_key)? else {
            return Ok(());
        };

        let stored: FilterState = match serde_json::from_str(&json) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Ignoring unreadable filter state '{}': {}", self.persistence_key, e);
                return Ok(());
            }
        };

        let mut seen = HashSet::new();
        let filters: Vec<AircraftFilter> = stored
            .filters
            .into_iter()
            .filter(|filter| match filter.validate() {
                Ok(()) => seen.insert(filter.property()),
                Err(e) => {
                    warn!("Dropping stored filter: {}", e);
                    false
                }
            })
            .collect();

        info!(
            "Loaded filter state '{}': {} filter(s), enabled: {}",
            self.persistence_key,
            filters.len(),
            stored.enabled
        );

        *self.write_state() = FilterState {
            enabled: stored.enabled,
            hide_no_position: stored.hide_no_position,
            filters,
        };
        self.raise_filter_changed();
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut FilterState) -> bool) {
        let changed = change(&mut self.write_state());
        if changed {
            self.raise_filter_changed();
        }
    }

    fn raise_filter_changed(&self) {
        self.events.raise(FILTER_CHANGED, &mut ());
    }

    fn lock_hook(&self) -> std::sync::MutexGuard<'_, Option<HookHandle>> {
        self.fetching_list_hook
            .lock()
            .expect("Filter hook lock poisoned - unrecoverable state")
    }

    fn read_state(&self) -> RwLockReadGuard<'_, FilterState> {
        self.state
            .read()
            .expect("Filter state lock poisoned - unrecoverable state")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, FilterState> {
        self.state
            .write()
            .expect("Filter state lock poisoned - unrecoverable state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GlobalDispatcher;
    use crate::list::AircraftListSettings;
    use crate::services::StaticServerCapabilities;
    use crate::settings::MemorySettingsStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn list_with(records: serde_json::Value) -> AircraftList {
        let list = AircraftList::new(AircraftListSettings::new(
            Arc::new(StaticServerCapabilities::new(true)),
            Arc::new(GlobalDispatcher::new("global")),
        ));
        list.apply_json_str(&json!({ "acList": records }).to_string())
            .unwrap();
        list
    }

    fn visible(filter: &AircraftListFilter, list: &AircraftList) -> Vec<i64> {
        let mut ids: Vec<i64> = list
            .aircraft()
            .to_list_filtered(|a| filter.filter_aircraft(a))
            .iter()
            .map(Aircraft::id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn callsign_starts(prefix: &str) -> AircraftFilter {
        AircraftFilter::text(FilterProperty::Callsign, FilterCondition::Starts, prefix).unwrap()
    }

    #[test]
    fn test_disabled_group_shows_everything() {
        let list = list_with(json!([{"Id": 1, "Call": "BAW1"}, {"Id": 2, "Call": "EZY2"}]));
        let filter = AircraftListFilter::new(AircraftListFilterSettings::default());
        filter.add_filter(callsign_starts("BAW")).unwrap();

        assert_eq!(visible(&filter, &list), vec![1, 2]);
        filter.set_enabled(true);
        assert_eq!(visible(&filter, &list), vec![1]);
    }

    #[test]
    fn test_every_filter_must_pass() {
        let list = list_with(json!([
            {"Id": 1, "Call": "BAW1", "Alt": 3000},
            {"Id": 2, "Call": "BAW2", "Alt": 39000},
            {"Id": 3, "Call": "EZY3", "Alt": 3000}
        ]));
        let filter = AircraftListFilter::new(AircraftListFilterSettings::default());
        filter.set_enabled(true);
        filter.add_filter(callsign_starts("BAW")).unwrap();
        filter
            .add_filter(AircraftFilter::range(FilterProperty::Altitude, None, Some(10000.0)).unwrap())
            .unwrap();

        assert_eq!(visible(&filter, &list), vec![1]);
    }

    #[test]
    fn test_hide_aircraft_without_position() {
        let list = list_with(json!([{"Id": 1, "Lat": 51.0, "Long": 0.1}, {"Id": 2}]));
        let filter = AircraftListFilter::new(AircraftListFilterSettings::default());
        filter.set_enabled(true);
        filter.set_hide_aircraft_without_position(true);

        assert_eq!(visible(&filter, &list), vec![1]);
    }

    #[test]
    fn test_one_filter_per_property() {
        let filter = AircraftListFilter::new(AircraftListFilterSettings::default());
        filter.add_filter(callsign_starts("BAW")).unwrap();

        assert!(matches!(
            filter.add_filter(callsign_starts("EZY")),
            Err(FilterError::DuplicateProperty(FilterProperty::Callsign))
        ));
        assert_eq!(filter.filters().len(), 1);

        assert!(filter.remove_filter(FilterProperty::Callsign).is_some());
        assert!(filter.remove_filter(FilterProperty::Callsign).is_none());
        filter.add_filter(callsign_starts("EZY")).unwrap();
        assert_eq!(
            filter.filter_for(FilterProperty::Callsign).map(|f| f.value().clone()),
            Some(FilterValue::Text("EZY".to_string()))
        );
    }

    #[test]
    fn test_attached_filter_decorates_fetches_when_enabled() {
        let list = list_with(json!([]));
        let filter = Arc::new(AircraftListFilter::new(AircraftListFilterSettings::default()));
        filter.add_filter(callsign_starts("BAW")).unwrap();
        filter.set_hide_aircraft_without_position(true);
        filter.attach(&list);

        let mut request = FetchRequest::new();
        list.raise_fetching_list(&mut request);
        assert!(request.params.is_empty());

        filter.set_enabled(true);
        list.raise_fetching_list(&mut request);
        assert_eq!(request.param("fCallS"), Some("BAW"));
        assert_eq!(request.param("fNoPos"), Some("1"));

        filter.detach(&list);
        let mut request = FetchRequest::new();
        list.raise_fetching_list(&mut request);
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_attach_twice_hooks_once() {
        let list = list_with(json!([]));
        let filter = Arc::new(AircraftListFilter::new(AircraftListFilterSettings::default()));
        filter.attach(&list);
        filter.attach(&list);

        assert_eq!(list.listener_count(crate::list::FETCHING_LIST), 1);
        filter.detach(&list);
        assert_eq!(list.listener_count(crate::list::FETCHING_LIST), 0);
    }

    #[test]
    fn test_changes_raise_filter_changed() {
        let filter = AircraftListFilter::new(AircraftListFilterSettings::default());
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        filter.hook_filter_changed(move || {
            c.fetch_add(1, Ordering::Relaxed);
        });

        filter.set_enabled(true);
        filter.set_enabled(true);
        filter.add_filter(callsign_starts("BAW")).unwrap();
        filter.clear_filters();
        filter.clear_filters();

        assert_eq!(count.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_state_round_trips_through_store() {
        let store: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
        let settings = || AircraftListFilterSettings {
            persistence_key: "test-filter".to_string(),
            store: Some(Arc::clone(&store)),
        };

        let original = AircraftListFilter::new(settings());
        original.set_enabled(true);
        original.add_filter(callsign_starts("BAW")).unwrap();
        original
            .add_filter(AircraftFilter::flag(FilterProperty::IsMilitary, true).unwrap().reversed(true))
            .unwrap();
        original.save_state().unwrap();

        let restored = AircraftListFilter::new(settings());
        restored.load_state().unwrap();
        assert_eq!(restored.state(), original.state());
    }

    #[test]
    fn test_unreadable_or_invalid_state_is_ignored() {
        let store = Arc::new(MemorySettingsStore::new());
        let filter = AircraftListFilter::new(AircraftListFilterSettings {
            persistence_key: "f".to_string(),
            store: Some(Arc::clone(&store) as Arc<dyn SettingsStore>),
        });

        store.save("f", "not json").unwrap();
        filter.load_state().unwrap();
        assert_eq!(filter.state(), FilterState::default());

        store
            .save(
                "f",
                &json!({
                    "enabled": true,
                    "filters": [
                        {"property": "Callsign", "condition": "Starts", "reversed": false, "value": {"Text": "BAW"}},
                        {"property": "Callsign", "condition": "Ends", "reversed": false, "value": {"Text": "1"}},
                        {"property": "Altitude", "condition": "Equals", "reversed": false, "value": {"Text": "1"}}
                    ]
                })
                .to_string(),
            )
            .unwrap();
        filter.load_state().unwrap();

        assert!(filter.is_enabled());
        assert_eq!(filter.filters(), vec![callsign_starts("BAW")]);
    }
}
