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

//! Tracked aircraft state.
//!
//! An [`Aircraft`] is a cheaply clonable handle around [`AircraftData`]. The
//! aircraft list mutates the data in place when a snapshot carries a delta for
//! the aircraft, so every clone handed to a renderer sees the update. Two
//! handles refer to the same aircraft instance when [`Aircraft::ptr_eq`] holds.
//!
//! Every field is a [`Tracked`] value so renderers can tell which fields the
//! last update changed.

mod trail;
mod value;

pub use trail::{FullTrailPoint, ShortTrailPoint, Trail, TrailKind};
pub use value::Tracked;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::lenient;

/// Per-aircraft delta record from a snapshot's `acList`.
///
/// Every field is optional; an absent field means "unchanged since the last
/// snapshot". A field whose value has the wrong type is treated as absent, so
/// one odd value never costs the rest of the record. The `Id` field is parsed
/// separately by the aircraft list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AircraftDelta {
    #[serde(rename = "Icao", default, deserialize_with = "lenient::any")]
    pub icao: Option<String>,
    #[serde(rename = "Reg", default, deserialize_with = "lenient::any")]
    pub registration: Option<String>,
    #[serde(rename = "Call", default, deserialize_with = "lenient::any")]
    pub callsign: Option<String>,
    #[serde(rename = "CallSus", default, deserialize_with = "lenient::any")]
    pub callsign_suspect: Option<bool>,
    #[serde(rename = "Alt", default, deserialize_with = "lenient::integer")]
    pub altitude: Option<i32>,
    #[serde(rename = "GAlt", default, deserialize_with = "lenient::integer")]
    pub geometric_altitude: Option<i32>,
    #[serde(rename = "TAlt", default, deserialize_with = "lenient::integer")]
    pub target_altitude: Option<i32>,
    #[serde(rename = "Spd", default, deserialize_with = "lenient::any")]
    pub speed: Option<f64>,
    #[serde(rename = "Vsi", default, deserialize_with = "lenient::integer")]
    pub vertical_speed: Option<i32>,
    #[serde(rename = "Trak", default, deserialize_with = "lenient::any")]
    pub heading: Option<f64>,
    #[serde(rename = "TTrk", default, deserialize_with = "lenient::any")]
    pub target_heading: Option<f64>,
    #[serde(rename = "Lat", default, deserialize_with = "lenient::any")]
    pub latitude: Option<f64>,
    #[serde(rename = "Long", default, deserialize_with = "lenient::any")]
    pub longitude: Option<f64>,
    #[serde(rename = "PosTime", default, deserialize_with = "lenient::integer")]
    pub position_time: Option<i64>,
    #[serde(rename = "Mlat", default, deserialize_with = "lenient::any")]
    pub is_mlat: Option<bool>,
    #[serde(rename = "Tisb", default, deserialize_with = "lenient::any")]
    pub is_tisb: Option<bool>,
    #[serde(rename = "Sqk", default, deserialize_with = "lenient::any")]
    pub squawk: Option<String>,
    #[serde(rename = "Help", default, deserialize_with = "lenient::any")]
    pub is_emergency: Option<bool>,
    #[serde(rename = "Type", default, deserialize_with = "lenient::any")]
    pub model_icao: Option<String>,
    #[serde(rename = "Mdl", default, deserialize_with = "lenient::any")]
    pub model: Option<String>,
    #[serde(rename = "Man", default, deserialize_with = "lenient::any")]
    pub manufacturer: Option<String>,
    #[serde(rename = "Year", default, deserialize_with = "lenient::any")]
    pub year_built: Option<String>,
    #[serde(rename = "Op", default, deserialize_with = "lenient::any")]
    pub operator: Option<String>,
    #[serde(rename = "OpIcao", default, deserialize_with = "lenient::any")]
    pub operator_icao: Option<String>,
    #[serde(rename = "Cou", default, deserialize_with = "lenient::any")]
    pub country: Option<String>,
    #[serde(rename = "Mil", default, deserialize_with = "lenient::any")]
    pub is_military: Option<bool>,
    #[serde(rename = "Gnd", default, deserialize_with = "lenient::any")]
    pub on_ground: Option<bool>,
    #[serde(rename = "Species", default, deserialize_with = "lenient::integer")]
    pub species: Option<i32>,
    #[serde(rename = "WTC", default, deserialize_with = "lenient::integer")]
    pub wake_turbulence_category: Option<i32>,
    #[serde(rename = "EngType", default, deserialize_with = "lenient::integer")]
    pub engine_type: Option<i32>,
    #[serde(rename = "Engines", default, deserialize_with = "lenient::any")]
    pub engine_count: Option<String>,
    #[serde(rename = "From", default, deserialize_with = "lenient::any")]
    pub origin: Option<String>,
    #[serde(rename = "To", default, deserialize_with = "lenient::any")]
    pub destination: Option<String>,
    #[serde(rename = "Stops", default, deserialize_with = "lenient::any")]
    pub stopovers: Option<Vec<String>>,
    #[serde(rename = "HasPic", default, deserialize_with = "lenient::any")]
    pub has_picture: Option<bool>,
    #[serde(rename = "FlightsCount", default, deserialize_with = "lenient::integer")]
    pub flights_count: Option<i32>,
    #[serde(rename = "CMsgs", default, deserialize_with = "lenient::integer")]
    pub message_count: Option<i64>,
    #[serde(rename = "Interested", default, deserialize_with = "lenient::any")]
    pub is_interesting: Option<bool>,
    #[serde(rename = "Trt", default, deserialize_with = "lenient::integer")]
    pub transponder_type: Option<i32>,
    #[serde(rename = "Sig", default, deserialize_with = "lenient::integer")]
    pub signal_level: Option<i32>,
    #[serde(rename = "Cos", default, deserialize_with = "lenient::any")]
    pub short_trail: Option<Vec<f64>>,
    #[serde(rename = "Cot", default, deserialize_with = "lenient::any")]
    pub full_trail: Option<Vec<f64>>,
    #[serde(rename = "TT", default, deserialize_with = "lenient::any")]
    pub trail_type: Option<String>,
    #[serde(rename = "ResetTrail", default, deserialize_with = "lenient::any")]
    pub reset_trail: Option<bool>,
}

impl AircraftDelta {
    /// Decode a delta record. Anything that is not a JSON object decodes as
    /// an empty delta.
    #[must_use]
    pub fn from_json(record: &serde_json::Value) -> Self {
        Self::deserialize(record).unwrap_or_default()
    }
}

/// Values shared by every aircraft updated from the same snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyContext {
    /// Short-trail points older than this server time are dropped, unless it
    /// is [`crate::list::NO_SHORT_TRAIL_CUTOFF`].
    pub short_trail_cutoff: i64,
    /// Whether the server configuration allows aircraft pictures.
    pub pictures_enabled: bool,
}

/// Aircraft state guarded by the [`Aircraft`] handle.
#[derive(Debug, Clone)]
pub struct AircraftData {
    pub id: i64,
    pub icao: Tracked<String>,
    pub registration: Tracked<String>,
    pub callsign: Tracked<String>,
    pub callsign_suspect: Tracked<bool>,
    pub altitude: Tracked<i32>,
    pub geometric_altitude: Tracked<i32>,
    pub target_altitude: Tracked<i32>,
    pub speed: Tracked<f64>,
    pub vertical_speed: Tracked<i32>,
    pub heading: Tracked<f64>,
    pub target_heading: Tracked<f64>,
    pub latitude: Tracked<f64>,
    pub longitude: Tracked<f64>,
    pub position_time: Tracked<i64>,
    pub is_mlat: Tracked<bool>,
    pub is_tisb: Tracked<bool>,
    pub squawk: Tracked<String>,
    pub is_emergency: Tracked<bool>,
    pub model_icao: Tracked<String>,
    pub model: Tracked<String>,
    pub manufacturer: Tracked<String>,
    pub year_built: Tracked<String>,
    pub operator: Tracked<String>,
    pub operator_icao: Tracked<String>,
    pub country: Tracked<String>,
    pub is_military: Tracked<bool>,
    pub on_ground: Tracked<bool>,
    pub species: Tracked<i32>,
    pub wake_turbulence_category: Tracked<i32>,
    pub engine_type: Tracked<i32>,
    pub engine_count: Tracked<String>,
    pub origin: Tracked<String>,
    pub destination: Tracked<String>,
    pub stopovers: Tracked<Vec<String>>,
    pub has_picture: Tracked<bool>,
    pub flights_count: Tracked<i32>,
    pub message_count: Tracked<i64>,
    pub is_interesting: Tracked<bool>,
    pub transponder_type: Tracked<i32>,
    pub signal_level: Tracked<i32>,
    pub short_trail: Trail<ShortTrailPoint>,
    pub full_trail: Trail<FullTrailPoint>,
    /// Number of snapshots applied to this aircraft.
    pub update_count: u64,
    /// Local time of the last applied snapshot.
    pub last_updated: DateTime<Utc>,
}

impl AircraftData {
    fn new(id: i64) -> Self {
        Self {
            id,
            icao: Tracked::default(),
            registration: Tracked::default(),
            callsign: Tracked::default(),
            callsign_suspect: Tracked::default(),
            altitude: Tracked::default(),
            geometric_altitude: Tracked::default(),
            target_altitude: Tracked::default(),
            speed: Tracked::default(),
            vertical_speed: Tracked::default(),
            heading: Tracked::default(),
            target_heading: Tracked::default(),
            latitude: Tracked::default(),
            longitude: Tracked::default(),
            position_time: Tracked::default(),
            is_mlat: Tracked::default(),
            is_tisb: Tracked::default(),
            squawk: Tracked::default(),
            is_emergency: Tracked::default(),
            model_icao: Tracked::default(),
            model: Tracked::default(),
            manufacturer: Tracked::default(),
            year_built: Tracked::default(),
            operator: Tracked::default(),
            operator_icao: Tracked::default(),
            country: Tracked::default(),
            is_military: Tracked::default(),
            on_ground: Tracked::default(),
            species: Tracked::default(),
            wake_turbulence_category: Tracked::default(),
            engine_type: Tracked::default(),
            engine_count: Tracked::default(),
            origin: Tracked::default(),
            destination: Tracked::default(),
            stopovers: Tracked::default(),
            has_picture: Tracked::default(),
            flights_count: Tracked::default(),
            message_count: Tracked::default(),
            is_interesting: Tracked::default(),
            transponder_type: Tracked::default(),
            signal_level: Tracked::default(),
            short_trail: Trail::default(),
            full_trail: Trail::default(),
            update_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// True if both latitude and longitude have been received.
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.latitude.value().is_some() && self.longitude.value().is_some()
    }

    fn apply(&mut self, delta: AircraftDelta, context: &ApplyContext) {
        self.icao.apply(delta.icao);
        self.registration.apply(delta.registration);
        self.callsign.apply(delta.callsign);
        self.callsign_suspect.apply(delta.callsign_suspect);
        self.altitude.apply(delta.altitude);
        self.geometric_altitude.apply(delta.geometric_altitude);
        self.target_altitude.apply(delta.target_altitude);
        self.speed.apply(delta.speed);
        self.vertical_speed.apply(delta.vertical_speed);
        self.heading.apply(delta.heading);
        self.target_heading.apply(delta.target_heading);
        self.latitude.apply(delta.latitude);
        self.longitude.apply(delta.longitude);
        self.position_time.apply(delta.position_time);
        self.is_mlat.apply(delta.is_mlat);
        self.is_tisb.apply(delta.is_tisb);
        self.squawk.apply(delta.squawk);
        self.is_emergency.apply(delta.is_emergency);
        self.model_icao.apply(delta.model_icao);
        self.model.apply(delta.model);
        self.manufacturer.apply(delta.manufacturer);
        self.year_built.apply(delta.year_built);
        self.operator.apply(delta.operator);
        self.operator_icao.apply(delta.operator_icao);
        self.country.apply(delta.country);
        self.is_military.apply(delta.is_military);
        self.on_ground.apply(delta.on_ground);
        self.species.apply(delta.species);
        self.wake_turbulence_category.apply(delta.wake_turbulence_category);
        self.engine_type.apply(delta.engine_type);
        self.engine_count.apply(delta.engine_count);
        self.origin.apply(delta.origin);
        self.destination.apply(delta.destination);
        self.stopovers.apply(delta.stopovers);
        self.flights_count.apply(delta.flights_count);
        self.message_count.apply(delta.message_count);
        self.is_interesting.apply(delta.is_interesting);
        self.transponder_type.apply(delta.transponder_type);
        self.signal_level.apply(delta.signal_level);

        // Pictures switched off server-side force the flag down.
        let has_picture = match delta.has_picture {
            Some(has_picture) => Some(has_picture && context.pictures_enabled),
            None if !context.pictures_enabled => Some(false),
            None => None,
        };
        self.has_picture.apply(has_picture);

        let reset = delta.reset_trail.unwrap_or(false);
        let short_kind = delta
            .trail_type
            .as_deref()
            .map_or(self.short_trail.kind(), TrailKind::from_code);
        let full_kind = delta
            .trail_type
            .as_deref()
            .map_or(self.full_trail.kind(), TrailKind::from_code);
        self.short_trail.apply(
            delta.short_trail.as_deref(),
            short_kind,
            reset,
            context.short_trail_cutoff,
        );
        self.full_trail
            .apply(delta.full_trail.as_deref(), full_kind, reset);

        self.update_count += 1;
        self.last_updated = Utc::now();
    }
}

/// Aircraft handle that can be cheaply cloned via Arc.
#[derive(Debug, Clone)]
pub struct Aircraft {
    id: i64,
    inner: Arc<RwLock<AircraftData>>,
}

impl Aircraft {
    /// Create an aircraft that has not received any data yet.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            inner: Arc::new(RwLock::new(AircraftData::new(id))),
        }
    }

    /// Identifier the server uses for this aircraft.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// True if both handles refer to the same aircraft instance.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Apply a delta record in place.
    pub fn apply_json(&self, delta: AircraftDelta, context: &ApplyContext) {
        self.write().apply(delta, context);
    }

    pub fn icao(&self) -> Option<String> {
        self.read().icao.value().cloned()
    }

    pub fn callsign(&self) -> Option<String> {
        self.read().callsign.value().cloned()
    }

    pub fn registration(&self) -> Option<String> {
        self.read().registration.value().cloned()
    }

    pub fn altitude(&self) -> Option<i32> {
        self.read().altitude.get()
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        let data = self.read();
        data.latitude.get().zip(data.longitude.get())
    }

    #[must_use]
    pub fn has_position(&self) -> bool {
        self.read().has_position()
    }

    /// Execute a closure with read-only access to the aircraft data.
    pub fn with_data<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AircraftData) -> R,
    {
        f(&self.read())
    }

    fn read(&self) -> RwLockReadGuard<'_, AircraftData> {
        self.inner
            .read()
            .expect("Aircraft data lock poisoned - unrecoverable state")
    }

    fn write(&self) -> RwLockWriteGuard<'_, AircraftData> {
        self.inner
            .write()
            .expect("Aircraft data lock poisoned - unrecoverable state")
    }
}
