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

//! Aircraft list snapshot as sent by the server.
//!
//! Top-level fields are kept as `Option`s so the aircraft list can apply its
//! own per-field defaults. A field with an unexpected value decodes as absent
//! and so takes its default rather than rejecting the snapshot. Aircraft
//! records stay as raw JSON values; a record with a bad id must not stop the
//! rest of the snapshot from decoding.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::lenient;

/// Errors that can occur while decoding snapshot text.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// One aircraft list snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AircraftListJson {
    /// Aircraft tracked server-side, including ones not in `acList`.
    #[serde(rename = "totalAc", default, deserialize_with = "lenient::integer")]
    pub total_aircraft: Option<u32>,
    /// List source enumeration.
    #[serde(rename = "src", default, deserialize_with = "lenient::integer")]
    pub source: Option<u32>,
    #[serde(rename = "showSil", default, deserialize_with = "lenient::any")]
    pub show_silhouettes: Option<bool>,
    #[serde(rename = "showFlg", default, deserialize_with = "lenient::any")]
    pub show_operator_flags: Option<bool>,
    #[serde(rename = "showPic", default, deserialize_with = "lenient::any")]
    pub show_pictures: Option<bool>,
    #[serde(rename = "flgW", default, deserialize_with = "lenient::integer")]
    pub flag_width: Option<u32>,
    #[serde(rename = "flgH", default, deserialize_with = "lenient::integer")]
    pub flag_height: Option<u32>,
    /// Data version. Older servers send it as a string.
    #[serde(rename = "lastDv", default, deserialize_with = "lenient::integer")]
    pub data_version: Option<i64>,
    #[serde(rename = "shtTrlSec", default, deserialize_with = "lenient::integer")]
    pub short_trail_seconds: Option<i64>,
    /// Server time in milliseconds.
    #[serde(rename = "stm", default, deserialize_with = "lenient::integer")]
    pub server_ticks: Option<i64>,
    #[serde(rename = "acList", default, deserialize_with = "records")]
    pub aircraft: Vec<serde_json::Value>,
}

impl AircraftListJson {
    /// Decode snapshot text. The literal `null` decodes to `None`.
    pub fn parse(text: &str) -> Result<Option<Self>, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Read the `Id` of an aircraft record.
///
/// Accepts integers and strings holding an integer. Anything else is not an
/// id and the record is skipped.
#[must_use]
pub fn parse_aircraft_id(record: &serde_json::Value) -> Option<i64> {
    match record.get("Id")? {
        serde_json::Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// `acList` as a list of records. Anything other than an array counts as no
/// records.
fn records<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(records)) => records,
        _ => Vec::new(),
    })
}
