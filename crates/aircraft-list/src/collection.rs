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

//! Aircraft keyed by identifier.

use std::collections::HashMap;

use crate::aircraft::Aircraft;

/// Set of aircraft keyed by id. Enumeration order is unspecified.
///
/// Cloning a collection clones the handles, not the aircraft, so a clone
/// handed out in an event stays valid as a membership snapshot while the
/// aircraft inside it keep receiving in-place updates.
#[derive(Debug, Clone, Default)]
pub struct AircraftCollection {
    aircraft: HashMap<i64, Aircraft>,
}

impl AircraftCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `f` for every aircraft. Returns the collection for chaining.
    pub fn for_each<F>(&self, mut f: F) -> &Self
    where
        F: FnMut(&Aircraft),
    {
        for aircraft in self.aircraft.values() {
            f(aircraft);
        }
        self
    }

    /// Iterate over all aircraft.
    pub fn iter(&self) -> impl Iterator<Item = &Aircraft> {
        self.aircraft.values()
    }

    /// Look up an aircraft by id.
    #[must_use]
    pub fn find_by_id(&self, id: i64) -> Option<&Aircraft> {
        self.aircraft.get(&id)
    }

    /// Handles to every aircraft.
    #[must_use]
    pub fn to_list(&self) -> Vec<Aircraft> {
        self.aircraft.values().cloned().collect()
    }

    /// Handles to every aircraft accepted by `predicate`.
    pub fn to_list_filtered<P>(&self, mut predicate: P) -> Vec<Aircraft>
    where
        P: FnMut(&Aircraft) -> bool,
    {
        self.aircraft
            .values()
            .filter(|aircraft| predicate(aircraft))
            .cloned()
            .collect()
    }

    /// Insert an aircraft, replacing any aircraft with the same id.
    pub fn insert(&mut self, aircraft: Aircraft) -> Option<Aircraft> {
        self.aircraft.insert(aircraft.id(), aircraft)
    }

    pub fn remove(&mut self, id: i64) -> Option<Aircraft> {
        self.aircraft.remove(&id)
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.aircraft.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}

impl FromIterator<Aircraft> for AircraftCollection {
    fn from_iter<I: IntoIterator<Item = Aircraft>>(iter: I) -> Self {
        Self {
            aircraft: iter.into_iter().map(|a| (a.id(), a)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AircraftCollection {
    type Item = &'a Aircraft;
    type IntoIter = std::collections::hash_map::Values<'a, i64, Aircraft>;

    fn into_iter(self) -> Self::IntoIter {
        self.aircraft.values()
    }
}
