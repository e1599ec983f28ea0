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

//! Aircraft list synchronisation for polled aircraft-tracking feeds.
//!
//! A tracking server answers each poll with a snapshot of the aircraft it
//! knows about. This library keeps the client-side list of aircraft in step
//! with those snapshots and tells the rest of the application what changed.
//! It is split into layers that can be used on their own:
//!
//! - **Events**: [`EventDispatcher`], a synchronous named-event dispatcher, and
//!   the application-wide [`GlobalDispatcher`]
//! - **Aircraft**: [`Aircraft`] handles updated in place from snapshot deltas,
//!   with per-field change flags and position trails
//! - **List**: [`AircraftList`], which reconciles snapshots against the live
//!   [`AircraftCollection`], tracks the selected aircraft and raises list events
//! - **Filter**: [`AircraftListFilter`], which hides aircraft and adds filter
//!   parameters to outgoing fetches
//!
//! The transport that polls the server is not part of this library. It calls
//! [`AircraftList::raise_fetching_list`] before each request and hands each
//! response to [`AircraftList::apply_json_str`].
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use aircraft_list::{
//!     AircraftList, AircraftListSettings, GlobalDispatcher, StaticServerCapabilities,
//! };
//!
//! let list = AircraftList::new(AircraftListSettings::new(
//!     Arc::new(StaticServerCapabilities::new(true)),
//!     Arc::new(GlobalDispatcher::new("global")),
//! ));
//!
//! list.hook_updated(|new_aircraft, off_radar| {
//!     println!("{} new, {} off-radar", new_aircraft.len(), off_radar.len());
//! });
//!
//! list.apply_json_str(r#"{"totalAc":1,"acList":[{"Id":4001,"Call":"BAW123"}]}"#)
//!     .unwrap();
//!
//! assert_eq!(list.count_aircraft(), 1);
//! assert_eq!(list.find_aircraft_by_id(4001).unwrap().callsign().as_deref(), Some("BAW123"));
//! ```
//!
//! # Filtering
//!
//! ```
//! use std::sync::Arc;
//! use aircraft_list::{
//!     AircraftFilter, AircraftList, AircraftListFilter, AircraftListFilterSettings,
//!     AircraftListSettings, FetchRequest, FilterCondition, FilterProperty,
//!     GlobalDispatcher, StaticServerCapabilities,
//! };
//!
//! let list = AircraftList::new(AircraftListSettings::new(
//!     Arc::new(StaticServerCapabilities::new(false)),
//!     Arc::new(GlobalDispatcher::new("global")),
//! ));
//! let filter = Arc::new(AircraftListFilter::new(AircraftListFilterSettings::default()));
//! filter
//!     .add_filter(AircraftFilter::text(FilterProperty::Callsign, FilterCondition::Starts, "BAW").unwrap())
//!     .unwrap();
//! filter.set_enabled(true);
//! filter.attach(&list);
//!
//! let mut request = FetchRequest::new();
//! list.raise_fetching_list(&mut request);
//! assert_eq!(request.param("fCallS"), Some("BAW"));
//! ```

pub mod aircraft;
pub mod collection;
pub mod events;
pub mod filter;
mod lenient;
pub mod list;
pub mod services;
pub mod settings;
pub mod snapshot;

pub use aircraft::{Aircraft, AircraftData, AircraftDelta, ApplyContext, Tracked};
pub use collection::AircraftCollection;
pub use events::{EventDispatcher, GlobalDispatcher, GlobalEvent, HookHandle, DISPLAY_UPDATED};
pub use filter::{
    AircraftFilter, AircraftListFilter, AircraftListFilterSettings, FilterCondition, FilterError,
    FilterProperty, FilterState, FilterValue,
};
pub use list::{
    short_trail_cutoff, AircraftList, AircraftListSettings, FetchRequest, ListEvent, SelectionSource,
    NO_SHORT_TRAIL_CUTOFF,
};
pub use services::{CountingIdleTimeout, IdleTimeout, ServerCapabilities, StaticServerCapabilities};
pub use settings::{MemorySettingsStore, SettingsError, SettingsStore};
pub use snapshot::{AircraftListJson, SnapshotError};
