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

//! The aircraft list: snapshot reconciliation, selection and list events.
//!
//! [`AircraftList::apply_json`] merges a server snapshot into the live
//! collection. Aircraft that survive a snapshot are updated in place, unseen
//! ids become new aircraft and aircraft missing from the snapshot are evicted
//! and reported as off-radar for that one notification. The merge completes
//! before any event fires, and events for one snapshot always fire in the
//! order `appliedJson`, `selectedReselected` (when the selected aircraft came
//! back), `updated`, then the global `displayUpdated`.
//!
//! All methods take `&self` and no lock is held while listeners run, so
//! listeners may query the list or change the selection from inside a
//! notification.

mod request;

pub use request::FetchRequest;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};

use crate::aircraft::{Aircraft, AircraftDelta, ApplyContext};
use crate::collection::AircraftCollection;
use crate::events::{EventDispatcher, GlobalDispatcher, GlobalEvent, HookHandle};
use crate::services::{IdleTimeout, ServerCapabilities};
use crate::snapshot::{parse_aircraft_id, AircraftListJson, SnapshotError};

/// Short-trail cutoff meaning "keep every point".
pub const NO_SHORT_TRAIL_CUTOFF: i64 = -1;

pub const FETCHING_LIST: &str = "fetchingList";
pub const APPLIED_JSON: &str = "appliedJson";
pub const UPDATED: &str = "updated";
pub const SELECTED_CHANGED: &str = "selectedChanged";
pub const SELECTED_RESELECTED: &str = "selectedReselected";

/// Compute the server time before which short-trail points are dropped.
///
/// Half a second of slack is added on top of the trail duration.
#[must_use]
pub fn short_trail_cutoff(server_ticks: i64, short_trail_seconds: i64) -> i64 {
    if server_ticks == 0 || short_trail_seconds <= 0 {
        NO_SHORT_TRAIL_CUTOFF
    } else {
        server_ticks - (short_trail_seconds * 1000 + 500)
    }
}

/// Who changed the selection. User selections count as activity for the
/// idle timeout, programmatic ones do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    User,
    Program,
}

/// Arguments of the events raised by [`AircraftList`].
#[derive(Debug)]
pub enum ListEvent {
    /// A fetch is about to be sent; listeners may decorate the request.
    FetchingList(FetchRequest),
    /// A snapshot has been merged.
    AppliedJson {
        new_aircraft: AircraftCollection,
        off_radar: AircraftCollection,
    },
    /// Raised after [`ListEvent::AppliedJson`] for general refresh timing.
    Updated {
        new_aircraft: AircraftCollection,
        off_radar: AircraftCollection,
    },
    /// The selected aircraft changed. Carries the previous selection.
    SelectedChanged { previous: Option<Aircraft> },
    /// The selected aircraft went off-radar and has come back as a new
    /// instance, which is now the selection.
    SelectedReselected,
}

impl ListEvent {
    /// Event name the variant is raised under.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchingList(_) => FETCHING_LIST,
            Self::AppliedJson { .. } => APPLIED_JSON,
            Self::Updated { .. } => UPDATED,
            Self::SelectedChanged { .. } => SELECTED_CHANGED,
            Self::SelectedReselected => SELECTED_RESELECTED,
        }
    }
}

/// Everything an [`AircraftList`] needs at construction.
pub struct AircraftListSettings {
    pub server_capabilities: Arc<dyn ServerCapabilities>,
    /// Bus that receives `displayUpdated` after every snapshot.
    pub global_events: Arc<GlobalDispatcher>,
    /// Reset on every user-driven selection.
    pub idle_timeout: Option<Arc<dyn IdleTimeout>>,
    /// Log how long each list event takes to dispatch.
    pub log_event_timings: bool,
}

impl AircraftListSettings {
    #[must_use]
    pub fn new(server_capabilities: Arc<dyn ServerCapabilities>, global_events: Arc<GlobalDispatcher>) -> Self {
        Self {
            server_capabilities,
            global_events,
            idle_timeout: None,
            log_event_timings: false,
        }
    }
}

impl std::fmt::Debug for AircraftListSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AircraftListSettings")
            .field("has_idle_timeout", &self.idle_timeout.is_some())
            .field("log_event_timings", &self.log_event_timings)
            .finish_non_exhaustive()
    }
}

struct ListState {
    aircraft: AircraftCollection,
    count_tracked: u32,
    count_available: usize,
    source: u32,
    show_silhouettes: bool,
    show_operator_flags: bool,
    show_pictures: bool,
    flag_width: u32,
    flag_height: u32,
    data_version: i64,
    server_ticks: i64,
    short_trail_seconds: i64,
    selected: Option<Aircraft>,
    was_selected_by_user: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            aircraft: AircraftCollection::new(),
            count_tracked: 0,
            count_available: 0,
            source: 0,
            show_silhouettes: false,
            show_operator_flags: false,
            show_pictures: false,
            flag_width: 0,
            flag_height: 0,
            data_version: -1,
            server_ticks: 0,
            short_trail_seconds: 0,
            selected: None,
            was_selected_by_user: false,
        }
    }
}

/// Live set of tracked aircraft, reconciled against each server snapshot.
pub struct AircraftList {
    state: RwLock<ListState>,
    events: EventDispatcher<ListEvent>,
    server_capabilities: Arc<dyn ServerCapabilities>,
    global_events: Arc<GlobalDispatcher>,
    idle_timeout: Option<Arc<dyn IdleTimeout>>,
}

impl std::fmt::Debug for AircraftList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("AircraftList")
            .field("aircraft_count", &state.aircraft.len())
            .field("count_tracked", &state.count_tracked)
            .field("data_version", &state.data_version)
            .field("selected", &state.selected.as_ref().map(Aircraft::id))
            .finish_non_exhaustive()
    }
}

impl AircraftList {
    #[must_use]
    pub fn new(settings: AircraftListSettings) -> Self {
        let events = EventDispatcher::new("aircraftList");
        events.set_log_timings(settings.log_event_timings);

        Self {
            state: RwLock::new(ListState::default()),
            events,
            server_capabilities: settings.server_capabilities,
            global_events: settings.global_events,
            idle_timeout: settings.idle_timeout,
        }
    }

    pub fn hook_fetching_list<F>(&self, callback: F) -> HookHandle
    where
        F: Fn(&mut FetchRequest) + Send + Sync + 'static,
    {
        self.events.hook(FETCHING_LIST, move |event| {
            if let ListEvent::FetchingList(request) = event {
                callback(request);
            }
        })
    }

    /// Hook `appliedJson`. The callback receives the new and off-radar aircraft.
    pub fn hook_applied_json<F>(&self, callback: F) -> HookHandle
    where
        F: Fn(&AircraftCollection, &AircraftCollection) + Send + Sync + 'static,
    {
        self.events.hook(APPLIED_JSON, move |event| {
            if let ListEvent::AppliedJson { new_aircraft, off_radar } = event {
                callback(new_aircraft, off_radar);
            }
        })
    }

    /// Hook `updated`. The callback receives the new and off-radar aircraft.
    pub fn hook_updated<F>(&self, callback: F) -> HookHandle
    where
        F: Fn(&AircraftCollection, &AircraftCollection) + Send + Sync + 'static,
    {
        self.events.hook(UPDATED, move |event| {
            if let ListEvent::Updated { new_aircraft, off_radar } = event {
                callback(new_aircraft, off_radar);
            }
        })
    }

    /// Hook `selectedChanged`. The callback receives the previous selection.
    pub fn hook_selected_changed<F>(&self, callback: F) -> HookHandle
    where
        F: Fn(Option<&Aircraft>) + Send + Sync + 'static,
    {
        self.events.hook(SELECTED_CHANGED, move |event| {
            if let ListEvent::SelectedChanged { previous } = event {
                callback(previous.as_ref());
            }
        })
    }

    pub fn hook_selected_reselected<F>(&self, callback: F) -> HookHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.hook(SELECTED_RESELECTED, move |_| callback())
    }

    /// Hook any list event by name with access to the raw event arguments.
    pub fn hook<F>(&self, event: &str, callback: F) -> HookHandle
    where
        F: Fn(&mut ListEvent) + Send + Sync + 'static,
    {
        self.events.hook(event, callback)
    }

    pub fn unhook(&self, handle: &HookHandle) -> bool {
        self.events.unhook(handle)
    }

    /// Number of listeners hooked to a list event.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.events.listener_count(event)
    }

    /// Let `fetchingList` listeners decorate an outgoing request in place.
    pub fn raise_fetching_list(&self, request: &mut FetchRequest) {
        let event = self.raise(ListEvent::FetchingList(std::mem::take(request)));
        if let ListEvent::FetchingList(decorated) = event {
            *request = decorated;
        }
    }

    /// Parse snapshot text and apply it. `null` is an absent snapshot.
    pub fn apply_json_str(&self, text: &str) -> Result<(), SnapshotError> {
        let snapshot = AircraftListJson::parse(text)?;
        self.apply_json(snapshot.as_ref());
        Ok(())
    }

    /// Merge a snapshot into the live collection and raise the list events.
    ///
    /// An absent snapshot does nothing. Records whose id is not a number are
    /// skipped but still count towards [`AircraftList::count_available`].
    pub fn apply_json(&self, json: Option<&AircraftListJson>) {
        let Some(json) = json else {
            return;
        };

        let pictures_enabled = self.server_capabilities.pictures_enabled();

        let (new_aircraft, off_radar, reselected) = {
            let mut state = self.write_state();

            state.count_tracked = json.total_aircraft.unwrap_or(0);
            state.source = json.source.unwrap_or(0);
            state.show_silhouettes = json.show_silhouettes.unwrap_or(false);
            state.show_operator_flags = json.show_operator_flags.unwrap_or(false);
            state.show_pictures = json.show_pictures.unwrap_or(false);
            state.flag_width = json.flag_width.unwrap_or(0);
            state.flag_height = json.flag_height.unwrap_or(0);
            state.data_version = json.data_version.unwrap_or(-1);
            state.short_trail_seconds = json.short_trail_seconds.unwrap_or(0);
            state.server_ticks = json.server_ticks.unwrap_or(0);

            let context = ApplyContext {
                short_trail_cutoff: short_trail_cutoff(state.server_ticks, state.short_trail_seconds),
                pictures_enabled,
            };

            let selected_id = state.selected.as_ref().map(Aircraft::id);
            let mut previous = std::mem::take(&mut state.aircraft);
            let mut merged = AircraftCollection::new();
            let mut new_aircraft = AircraftCollection::new();
            let mut reselected = None;

            for record in &json.aircraft {
                let Some(id) = parse_aircraft_id(record) else {
                    debug!("Skipping aircraft record without a numeric id: {}", record);
                    continue;
                };
                let delta = AircraftDelta::from_json(record);

                // Whatever is left in `previous` after the loop went off-radar.
                let (aircraft, is_new) = match previous.remove(id) {
                    Some(existing) => {
                        existing.apply_json(delta, &context);
                        (existing, false)
                    }
                    None => {
                        let created = Aircraft::new(id);
                        created.apply_json(delta, &context);
                        new_aircraft.insert(created.clone());
                        (created, true)
                    }
                };

                if is_new && selected_id == Some(id) {
                    reselected = Some(aircraft.clone());
                }
                merged.insert(aircraft);
            }

            state.aircraft = merged;
            state.count_available = json.aircraft.len();

            (new_aircraft, previous, reselected)
        };

        if !new_aircraft.is_empty() || !off_radar.is_empty() {
            debug!(
                "Applied snapshot: {} new, {} off-radar, {} live",
                new_aircraft.len(),
                off_radar.len(),
                self.count_aircraft()
            );
        }

        let applied = self.raise(ListEvent::AppliedJson {
            new_aircraft,
            off_radar,
        });

        if let Some(aircraft) = reselected {
            info!("Selected aircraft {} is back on radar", aircraft.id());
            self.write_state().selected = Some(aircraft);
            self.raise(ListEvent::SelectedReselected);
        }

        if let ListEvent::AppliedJson {
            new_aircraft,
            off_radar,
        } = applied
        {
            self.raise(ListEvent::Updated {
                new_aircraft,
                off_radar,
            });
        }

        let mut display_updated = GlobalEvent::DisplayUpdated;
        self.global_events
            .raise(display_updated.name(), &mut display_updated);
    }

    /// Change the selected aircraft.
    ///
    /// Does nothing if `aircraft` is already the selection. Otherwise raises
    /// `selectedChanged` with the previous selection.
    pub fn set_selected_aircraft(&self, aircraft: Option<Aircraft>, source: SelectionSource) {
        if source == SelectionSource::User {
            if let Some(idle_timeout) = &self.idle_timeout {
                idle_timeout.reset_idle_timer();
            }
        }

        let previous = {
            let mut state = self.write_state();
            let unchanged = match (&state.selected, &aircraft) {
                (None, None) => true,
                (Some(current), Some(requested)) => Aircraft::ptr_eq(current, requested),
                _ => false,
            };
            if unchanged {
                return;
            }

            state.was_selected_by_user = source == SelectionSource::User;
            std::mem::replace(&mut state.selected, aircraft)
        };

        self.raise(ListEvent::SelectedChanged { previous });
    }

    #[must_use]
    pub fn selected_aircraft(&self) -> Option<Aircraft> {
        self.read_state().selected.clone()
    }

    #[must_use]
    pub fn was_selected_by_user(&self) -> bool {
        self.read_state().was_selected_by_user
    }

    /// Snapshot of the live collection.
    #[must_use]
    pub fn aircraft(&self) -> AircraftCollection {
        self.read_state().aircraft.clone()
    }

    #[must_use]
    pub fn find_aircraft_by_id(&self, id: i64) -> Option<Aircraft> {
        self.read_state().aircraft.find_by_id(id).cloned()
    }

    /// Number of aircraft in the live collection.
    #[must_use]
    pub fn count_aircraft(&self) -> usize {
        self.read_state().aircraft.len()
    }

    /// Aircraft tracked by the server, which may exceed the ones sent.
    #[must_use]
    pub fn count_tracked(&self) -> u32 {
        self.read_state().count_tracked
    }

    /// Records in the last snapshot's aircraft list.
    #[must_use]
    pub fn count_available(&self) -> usize {
        self.read_state().count_available
    }

    #[must_use]
    pub fn source(&self) -> u32 {
        self.read_state().source
    }

    #[must_use]
    pub fn show_silhouettes(&self) -> bool {
        self.read_state().show_silhouettes
    }

    #[must_use]
    pub fn show_operator_flags(&self) -> bool {
        self.read_state().show_operator_flags
    }

    #[must_use]
    pub fn show_pictures(&self) -> bool {
        self.read_state().show_pictures
    }

    /// Operator flag image size in pixels (width, height).
    #[must_use]
    pub fn operator_flag_size(&self) -> (u32, u32) {
        let state = self.read_state();
        (state.flag_width, state.flag_height)
    }

    /// Last data version, or -1 if the server has never sent one.
    #[must_use]
    pub fn data_version(&self) -> i64 {
        self.read_state().data_version
    }

    #[must_use]
    pub fn server_ticks(&self) -> i64 {
        self.read_state().server_ticks
    }

    #[must_use]
    pub fn short_trail_seconds(&self) -> i64 {
        self.read_state().short_trail_seconds
    }

    /// Comma-separated ids of the live aircraft.
    #[must_use]
    pub fn all_aircraft_ids_string(&self) -> String {
        self.read_state()
            .aircraft
            .iter()
            .map(|aircraft| aircraft.id().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Hyphen-separated ICAO codes of the live aircraft that have one.
    #[must_use]
    pub fn all_aircraft_icaos_string(&self) -> String {
        self.read_state()
            .aircraft
            .iter()
            .filter_map(Aircraft::icao)
            .collect::<Vec<_>>()
            .join("-")
    }

    fn raise(&self, mut event: ListEvent) -> ListEvent {
        self.events.raise(event.name(), &mut event);
        event
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ListState> {
        self.state
            .read()
            .expect("Aircraft list lock poisoned - unrecoverable state")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ListState> {
        self.state
            .write()
            .expect("Aircraft list lock poisoned - unrecoverable state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CountingIdleTimeout, StaticServerCapabilities};
    use serde_json::json;
    use std::sync::Mutex;

    struct Fixture {
        list: Arc<AircraftList>,
        global: Arc<GlobalDispatcher>,
        idle: Arc<CountingIdleTimeout>,
    }

    fn fixture() -> Fixture {
        let global = Arc::new(GlobalDispatcher::new("global"));
        let idle = Arc::new(CountingIdleTimeout::default());
        let mut settings = AircraftListSettings::new(Arc::new(StaticServerCapabilities::new(true)), Arc::clone(&global));
        settings.idle_timeout = Some(Arc::clone(&idle) as Arc<dyn IdleTimeout>);

        Fixture {
            list: Arc::new(AircraftList::new(settings)),
            global,
            idle,
        }
    }

    fn snapshot(value: serde_json::Value) -> AircraftListJson {
        serde_json::from_value(value).unwrap()
    }

    fn ids(collection: &AircraftCollection) -> Vec<i64> {
        let mut ids: Vec<i64> = collection.iter().map(Aircraft::id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_first_snapshot_creates_everything() {
        let f = fixture();
        let seen: Arc<Mutex<Option<(Vec<i64>, Vec<i64>)>>> = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        f.list.hook_applied_json(move |new_aircraft, off_radar| {
            *s.lock().unwrap() = Some((ids(new_aircraft), ids(off_radar)));
        });

        f.list.apply_json(Some(&snapshot(json!({
            "totalAc": 2, "stm": 1000, "shtTrlSec": 10,
            "acList": [{"Id": 1, "Icao": "400001"}, {"Id": 2, "Icao": "400002"}]
        }))));

        assert_eq!(f.list.count_aircraft(), 2);
        assert_eq!(f.list.count_tracked(), 2);
        assert_eq!(f.list.short_trail_seconds(), 10);
        assert_eq!(
            short_trail_cutoff(f.list.server_ticks(), f.list.short_trail_seconds()),
            -9500
        );
        assert_eq!(*seen.lock().unwrap(), Some((vec![1, 2], vec![])));
    }

    #[test]
    fn test_short_trail_cutoff_sentinel() {
        assert_eq!(short_trail_cutoff(0, 30), NO_SHORT_TRAIL_CUTOFF);
        assert_eq!(short_trail_cutoff(100_000, 0), NO_SHORT_TRAIL_CUTOFF);
        assert_eq!(short_trail_cutoff(100_000, -5), NO_SHORT_TRAIL_CUTOFF);
        assert_eq!(short_trail_cutoff(100_000, 30), 69_500);
    }

    #[test]
    fn test_non_numeric_id_is_skipped() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": "abc"}]}))));

        assert_eq!(f.list.count_aircraft(), 0);
        assert_eq!(f.list.count_available(), 1);
    }

    #[test]
    fn test_missing_aircraft_goes_off_radar() {
        let f = fixture();
        let off: Arc<Mutex<Vec<(&'static str, Vec<i64>)>>> = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&off);
        f.list.hook_applied_json(move |_, off_radar| o.lock().unwrap().push(("applied", ids(off_radar))));
        let o = Arc::clone(&off);
        f.list.hook_updated(move |_, off_radar| o.lock().unwrap().push(("updated", ids(off_radar))));

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}, {"Id": 2}]}))));
        let gone = f.list.find_aircraft_by_id(1).unwrap();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 2}]}))));

        assert!(f.list.find_aircraft_by_id(1).is_none());
        assert_eq!(gone.id(), 1);
        let off = off.lock().unwrap();
        assert_eq!(off[2], ("applied", vec![1]));
        assert_eq!(off[3], ("updated", vec![1]));
    }

    #[test]
    fn test_surviving_aircraft_are_updated_in_place() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1, "Alt": 1000}]}))));
        let before = f.list.find_aircraft_by_id(1).unwrap();

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1, "Alt": 2000}]}))));
        let after = f.list.find_aircraft_by_id(1).unwrap();

        assert!(Aircraft::ptr_eq(&before, &after));
        assert_eq!(before.altitude(), Some(2000));
    }

    #[test]
    fn test_surviving_aircraft_with_odd_field_stays_on_radar() {
        let f = fixture();
        let off_counts: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&off_counts);
        f.list.hook_applied_json(move |_, off_radar| o.lock().unwrap().push(off_radar.len()));

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1, "Alt": 1000}]}))));
        let before = f.list.find_aircraft_by_id(1).unwrap();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1, "Alt": 1000.5, "Gnd": "no"}]}))));

        assert!(f.list.aircraft().contains(1));
        assert!(Aircraft::ptr_eq(&before, &f.list.find_aircraft_by_id(1).unwrap()));
        assert_eq!(*off_counts.lock().unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_surviving_aircraft_follow_picture_setting() {
        let capabilities = Arc::new(StaticServerCapabilities::new(true));
        let list = AircraftList::new(AircraftListSettings::new(
            Arc::clone(&capabilities) as Arc<dyn ServerCapabilities>,
            Arc::new(GlobalDispatcher::new("global")),
        ));

        list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1, "HasPic": true}]}))));
        let aircraft = list.find_aircraft_by_id(1).unwrap();
        assert_eq!(aircraft.with_data(|d| d.has_picture.get()), Some(true));

        capabilities.set_pictures_enabled(false);
        list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1, "HasPic": true}]}))));
        assert!(Aircraft::ptr_eq(&aircraft, &list.find_aircraft_by_id(1).unwrap()));
        assert_eq!(aircraft.with_data(|d| d.has_picture.get()), Some(false));
    }

    #[test]
    fn test_surviving_aircraft_get_short_trail_cutoff() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}]}))));
        let aircraft = f.list.find_aircraft_by_id(1).unwrap();

        f.list.apply_json(Some(&snapshot(json!({
            "stm": 100_000, "shtTrlSec": 30,
            "acList": [{"Id": 1, "Cos": [51.0, -1.0, 60_000.0, 51.1, -1.1, 80_000.0]}]
        }))));

        let times: Vec<i64> = aircraft.with_data(|d| d.short_trail.points().iter().map(|p| p.time).collect());
        assert_eq!(times, [80_000]);
    }

    #[test]
    fn test_hook_by_name_receives_raw_event() {
        let f = fixture();
        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let handle = f.list.hook(UPDATED, move |event| {
            if let ListEvent::Updated { new_aircraft, .. } = &*event {
                assert_eq!(new_aircraft.len(), 1);
            }
            s.lock().unwrap().push(event.name());
        });
        assert_eq!(handle.event(), UPDATED);

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}]}))));
        assert!(f.list.unhook(&handle));
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}]}))));

        assert_eq!(*seen.lock().unwrap(), vec![UPDATED]);
    }

    #[test]
    fn test_same_snapshot_twice_creates_nothing_new() {
        let f = fixture();
        let new_counts: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let n = Arc::clone(&new_counts);
        f.list.hook_applied_json(move |new_aircraft, _| n.lock().unwrap().push(new_aircraft.len()));

        let json = snapshot(json!({"acList": [{"Id": 1}, {"Id": 2}, {"Id": 3}]}));
        f.list.apply_json(Some(&json));
        let first = ids(&f.list.aircraft());
        f.list.apply_json(Some(&json));

        assert_eq!(ids(&f.list.aircraft()), first);
        assert_eq!(*new_counts.lock().unwrap(), vec![3, 0]);
    }

    #[test]
    fn test_absent_snapshot_is_noop() {
        let f = fixture();
        let raised = Arc::new(Mutex::new(0));
        let r = Arc::clone(&raised);
        f.list.hook_updated(move |_, _| *r.lock().unwrap() += 1);
        let r = Arc::clone(&raised);
        f.global.hook(crate::events::DISPLAY_UPDATED, move |_| *r.lock().unwrap() += 1);

        f.list.apply_json(None);
        f.list.apply_json_str("null").unwrap();

        assert_eq!(*raised.lock().unwrap(), 0);
        assert_eq!(f.list.data_version(), -1);
    }

    #[test]
    fn test_top_level_defaults() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({
            "totalAc": 5, "src": 3, "showSil": true, "showFlg": true, "showPic": true,
            "flgW": 85, "flgH": 20, "lastDv": 12, "shtTrlSec": 30, "stm": 5000
        }))));
        assert_eq!(f.list.data_version(), 12);
        assert_eq!(f.list.operator_flag_size(), (85, 20));
        assert!(f.list.show_pictures());

        f.list.apply_json(Some(&snapshot(json!({}))));
        assert_eq!(f.list.count_tracked(), 0);
        assert_eq!(f.list.source(), 0);
        assert!(!f.list.show_silhouettes());
        assert!(!f.list.show_operator_flags());
        assert_eq!(f.list.operator_flag_size(), (0, 0));
        assert_eq!(f.list.data_version(), -1);
        assert_eq!(f.list.server_ticks(), 0);

        f.list.apply_json(Some(&snapshot(json!({"lastDv": 0}))));
        assert_eq!(f.list.data_version(), 0);
    }

    #[test]
    fn test_events_fire_in_order() {
        let f = fixture();
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        f.global.hook(crate::events::DISPLAY_UPDATED, move |_| o.lock().unwrap().push("displayUpdated"));
        let o = Arc::clone(&order);
        f.list.hook_updated(move |_, _| o.lock().unwrap().push("updated"));
        let o = Arc::clone(&order);
        f.list.hook_selected_reselected(move || o.lock().unwrap().push("reselected"));
        let o = Arc::clone(&order);
        f.list.hook_applied_json(move |_, _| o.lock().unwrap().push("applied"));

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}]}))));
        f.list
            .set_selected_aircraft(f.list.find_aircraft_by_id(1), SelectionSource::Program);
        f.list.apply_json(Some(&snapshot(json!({"acList": []}))));
        order.lock().unwrap().clear();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}]}))));

        assert_eq!(
            *order.lock().unwrap(),
            vec!["applied", "reselected", "updated", "displayUpdated"]
        );
    }

    #[test]
    fn test_selected_aircraft_is_reselected_when_it_returns() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 7, "Call": "EZY12"}]}))));
        let original = f.list.find_aircraft_by_id(7).unwrap();
        f.list
            .set_selected_aircraft(Some(original.clone()), SelectionSource::User);

        let changed = Arc::new(Mutex::new(0));
        let reselected = Arc::new(Mutex::new(0));
        let c = Arc::clone(&changed);
        f.list.hook_selected_changed(move |_| *c.lock().unwrap() += 1);
        let r = Arc::clone(&reselected);
        f.list.hook_selected_reselected(move || *r.lock().unwrap() += 1);

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 8}]}))));
        assert!(Aircraft::ptr_eq(&f.list.selected_aircraft().unwrap(), &original));

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 7, "Call": "EZY12"}]}))));

        let selected = f.list.selected_aircraft().unwrap();
        assert_eq!(*reselected.lock().unwrap(), 1);
        assert_eq!(*changed.lock().unwrap(), 0);
        assert!(!Aircraft::ptr_eq(&selected, &original));
        assert!(Aircraft::ptr_eq(&selected, &f.list.find_aircraft_by_id(7).unwrap()));
    }

    #[test]
    fn test_selection_that_stays_on_radar_is_not_reselected() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 7}]}))));
        f.list
            .set_selected_aircraft(f.list.find_aircraft_by_id(7), SelectionSource::Program);

        let reselected = Arc::new(Mutex::new(0));
        let r = Arc::clone(&reselected);
        f.list.hook_selected_reselected(move || *r.lock().unwrap() += 1);
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 7}]}))));

        assert_eq!(*reselected.lock().unwrap(), 0);
    }

    #[test]
    fn test_selecting_current_selection_is_noop() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}, {"Id": 2}]}))));
        let previous: Arc<Mutex<Vec<Option<i64>>>> = Arc::new(Mutex::new(Vec::new()));
        let p = Arc::clone(&previous);
        f.list
            .hook_selected_changed(move |prev| p.lock().unwrap().push(prev.map(Aircraft::id)));

        let first = f.list.find_aircraft_by_id(1);
        f.list.set_selected_aircraft(first.clone(), SelectionSource::User);
        f.list.set_selected_aircraft(first, SelectionSource::User);
        f.list.set_selected_aircraft(f.list.find_aircraft_by_id(2), SelectionSource::Program);
        f.list.set_selected_aircraft(None, SelectionSource::Program);
        f.list.set_selected_aircraft(None, SelectionSource::Program);

        assert_eq!(*previous.lock().unwrap(), vec![None, Some(1), Some(2)]);
        assert!(f.list.selected_aircraft().is_none());
    }

    #[test]
    fn test_selection_provenance() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}, {"Id": 2}]}))));

        f.list
            .set_selected_aircraft(f.list.find_aircraft_by_id(1), SelectionSource::User);
        assert!(f.list.was_selected_by_user());
        assert_eq!(f.idle.resets(), 1);

        f.list
            .set_selected_aircraft(f.list.find_aircraft_by_id(2), SelectionSource::Program);
        assert!(!f.list.was_selected_by_user());
        assert_eq!(f.idle.resets(), 1);
    }

    #[test]
    fn test_fetching_list_listeners_decorate_request() {
        let f = fixture();
        f.list.hook_fetching_list(|request| request.set_param("fCallS", "BAW"));
        f.list.hook_fetching_list(|request| {
            let seen = request.param("fCallS").unwrap_or_default().to_string();
            request.set_param("seen", seen);
        });

        let mut request = FetchRequest::new();
        request.set_param("ldv", "-1");
        f.list.raise_fetching_list(&mut request);

        assert_eq!(request.param("ldv"), Some("-1"));
        assert_eq!(request.param("fCallS"), Some("BAW"));
        assert_eq!(request.param("seen"), Some("BAW"));
    }

    #[test]
    fn test_id_and_icao_strings() {
        let f = fixture();
        f.list.apply_json(Some(&snapshot(json!({"acList": [
            {"Id": 1, "Icao": "400001"}, {"Id": 2, "Icao": "400002"}, {"Id": 3}
        ]}))));

        let mut ids: Vec<String> = f
            .list
            .all_aircraft_ids_string()
            .split(',')
            .map(str::to_string)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let mut icaos: Vec<String> = f
            .list
            .all_aircraft_icaos_string()
            .split('-')
            .map(str::to_string)
            .collect();
        icaos.sort();
        assert_eq!(icaos, vec!["400001", "400002"]);
    }

    #[test]
    fn test_listeners_can_query_the_list_during_events() {
        let f = fixture();
        let weak = Arc::downgrade(&f.list);
        let counts = Arc::new(Mutex::new(Vec::new()));
        let c = Arc::clone(&counts);
        f.list.hook_updated(move |_, _| {
            if let Some(list) = weak.upgrade() {
                c.lock().unwrap().push(list.count_aircraft());
                if list.selected_aircraft().is_none() {
                    list.set_selected_aircraft(list.find_aircraft_by_id(1), SelectionSource::Program);
                }
            }
        });

        f.list.apply_json(Some(&snapshot(json!({"acList": [{"Id": 1}, {"Id": 2}]}))));

        assert_eq!(*counts.lock().unwrap(), vec![2]);
        assert_eq!(f.list.selected_aircraft().map(|a| a.id()), Some(1));
    }
}
