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

//! Position trails sent as flat coordinate arrays.
//!
//! The server sends trails as flat number arrays. A short trail (`Cos`) holds
//! `lat, lng, time` triples and a full trail (`Cot`) holds `lat, lng, heading`
//! triples. When the trail type (`TT`) is `"a"` or `"s"` each point carries an
//! extra altitude or speed value and the stride becomes four.

use crate::list::NO_SHORT_TRAIL_CUTOFF;

/// What the optional fourth value of a trail point holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailKind {
    /// Position only.
    #[default]
    Plain,
    /// Each point carries an altitude in feet.
    Altitude,
    /// Each point carries a ground speed in knots.
    Speed,
}

impl TrailKind {
    /// Parse the `TT` field.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "a" => Self::Altitude,
            "s" => Self::Speed,
            _ => Self::Plain,
        }
    }

    fn stride(self) -> usize {
        match self {
            Self::Plain => 3,
            Self::Altitude | Self::Speed => 4,
        }
    }
}

/// A timestamped short-trail sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortTrailPoint {
    pub lat: f64,
    pub lng: f64,
    /// Server time in milliseconds.
    pub time: i64,
    pub value: Option<f64>,
}

/// A full-trail sample, recorded on every change of heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullTrailPoint {
    pub lat: f64,
    pub lng: f64,
    pub heading: f64,
    pub value: Option<f64>,
}

/// Ordered trail points with a changed flag for renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail<P> {
    points: Vec<P>,
    kind: TrailKind,
    changed: bool,
}

impl<P> Default for Trail<P> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            kind: TrailKind::Plain,
            changed: false,
        }
    }
}

impl<P> Trail<P> {
    #[must_use]
    pub fn points(&self) -> &[P] {
        &self.points
    }

    #[must_use]
    pub fn kind(&self) -> TrailKind {
        self.kind
    }

    #[must_use]
    pub fn changed(&self) -> bool {
        self.changed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reset (if asked), then append points decoded from `flat`.
    fn merge(&mut self, flat: Option<&[f64]>, kind: TrailKind, reset: bool, decode: impl Fn(&[f64]) -> P) {
        self.changed = false;

        if reset || kind != self.kind {
            self.changed = !self.points.is_empty();
            self.points.clear();
            self.kind = kind;
        }

        if let Some(flat) = flat {
            let before = self.points.len();
            self.points.extend(flat.chunks_exact(kind.stride()).map(decode));
            self.changed |= self.points.len() != before;
        }
    }
}

impl Trail<ShortTrailPoint> {
    /// Merge a `Cos` array then drop points older than `cutoff`.
    pub(crate) fn apply(&mut self, flat: Option<&[f64]>, kind: TrailKind, reset: bool, cutoff: i64) {
        self.merge(flat, kind, reset, |chunk| ShortTrailPoint {
            lat: chunk[0],
            lng: chunk[1],
            time: chunk[2] as i64,
            value: chunk.get(3).copied(),
        });

        if cutoff != NO_SHORT_TRAIL_CUTOFF {
            let before = self.points.len();
            self.points.retain(|point| point.time >= cutoff);
            self.changed |= self.points.len() != before;
        }
    }
}

impl Trail<FullTrailPoint> {
    /// Merge a `Cot` array.
    pub(crate) fn apply(&mut self, flat: Option<&[f64]>, kind: TrailKind, reset: bool) {
        self.merge(flat, kind, reset, |chunk| FullTrailPoint {
            lat: chunk[0],
            lng: chunk[1],
            heading: chunk[2],
            value: chunk.get(3).copied(),
        });
    }
}
