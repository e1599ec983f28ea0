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

//! Single-property aircraft filters.
//!
//! Each filter is evaluated locally against [`AircraftData`] and serialised
//! into the query parameters the server understands, so the server can drop
//! filtered aircraft before they are sent:
//!
//! ```text
//! f<code>[N]<Q|C|S|E>=<value>     text and flag filters
//! f<code>[N]L=<lower>             range filters, lower bound
//! f<code>[N]U=<upper>             range filters, upper bound
//! ```
//!
//! `N` marks a reversed condition.

use serde::{Deserialize, Serialize};

use super::FilterError;
use crate::aircraft::AircraftData;
use crate::list::FetchRequest;

/// Kind of value a property holds, which decides the allowed conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    Number,
    Flag,
}

/// Aircraft property a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterProperty {
    Altitude,
    Callsign,
    Country,
    Icao,
    IsMilitary,
    IsInteresting,
    ModelIcao,
    Operator,
    Registration,
    Squawk,
    Speed,
}

impl FilterProperty {
    /// Code used in query parameter names.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Altitude => "Alt",
            Self::Callsign => "Call",
            Self::Country => "Cou",
            Self::Icao => "Ico",
            Self::IsMilitary => "Mil",
            Self::IsInteresting => "Int",
            Self::ModelIcao => "Typ",
            Self::Operator => "Op",
            Self::Registration => "Reg",
            Self::Squawk => "Sqk",
            Self::Speed => "Spd",
        }
    }

    #[must_use]
    pub fn kind(self) -> FilterKind {
        match self {
            Self::Altitude | Self::Speed => FilterKind::Number,
            Self::IsMilitary | Self::IsInteresting => FilterKind::Flag,
            Self::Callsign
            | Self::Country
            | Self::Icao
            | Self::ModelIcao
            | Self::Operator
            | Self::Registration
            | Self::Squawk => FilterKind::Text,
        }
    }

    fn text_of(self, data: &AircraftData) -> Option<&str> {
        let field = match self {
            Self::Callsign => &data.callsign,
            Self::Country => &data.country,
            Self::Icao => &data.icao,
            Self::ModelIcao => &data.model_icao,
            Self::Operator => &data.operator,
            Self::Registration => &data.registration,
            Self::Squawk => &data.squawk,
            _ => return None,
        };
        field.value().map(String::as_str)
    }

    fn number_of(self, data: &AircraftData) -> Option<f64> {
        match self {
            Self::Altitude => data.altitude.get().map(f64::from),
            Self::Speed => data.speed.get(),
            _ => None,
        }
    }

    fn flag_of(self, data: &AircraftData) -> Option<bool> {
        match self {
            Self::IsMilitary => data.is_military.get(),
            Self::IsInteresting => data.is_interesting.get(),
            _ => None,
        }
    }
}

/// Comparison a filter performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterCondition {
    Equals,
    Contains,
    Starts,
    Ends,
    Between,
}

impl FilterCondition {
    fn suffix(self) -> &'static str {
        match self {
            Self::Equals => "Q",
            Self::Contains => "C",
            Self::Starts => "S",
            Self::Ends => "E",
            Self::Between => "",
        }
    }

    fn allowed_for(self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::Text => !matches!(self, Self::Between),
            FilterKind::Number => matches!(self, Self::Between),
            FilterKind::Flag => matches!(self, Self::Equals),
        }
    }
}

/// Value a filter compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Text(String),
    Range { lower: Option<f64>, upper: Option<f64> },
    Flag(bool),
}

impl FilterValue {
    fn kind(&self) -> FilterKind {
        match self {
            Self::Text(_) => FilterKind::Text,
            Self::Range { .. } => FilterKind::Number,
            Self::Flag(_) => FilterKind::Flag,
        }
    }
}

/// One property filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftFilter {
    property: FilterProperty,
    condition: FilterCondition,
    reversed: bool,
    value: FilterValue,
}

impl AircraftFilter {
    /// Build a filter, rejecting values and conditions the property cannot take.
    pub fn new(property: FilterProperty, condition: FilterCondition, value: FilterValue) -> Result<Self, FilterError> {
        let filter = Self {
            property,
            condition,
            reversed: false,
            value,
        };
        filter.validate()?;
        Ok(filter)
    }

    /// Text filter, e.g. callsign starts with "BAW".
    pub fn text(property: FilterProperty, condition: FilterCondition, text: impl Into<String>) -> Result<Self, FilterError> {
        Self::new(property, condition, FilterValue::Text(text.into()))
    }

    /// Numeric range filter. Either bound may be open.
    pub fn range(property: FilterProperty, lower: Option<f64>, upper: Option<f64>) -> Result<Self, FilterError> {
        Self::new(property, FilterCondition::Between, FilterValue::Range { lower, upper })
    }

    pub fn flag(property: FilterProperty, value: bool) -> Result<Self, FilterError> {
        Self::new(property, FilterCondition::Equals, FilterValue::Flag(value))
    }

    /// Invert the result of the filter.
    #[must_use]
    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    #[must_use]
    pub fn property(&self) -> FilterProperty {
        self.property
    }

    #[must_use]
    pub fn condition(&self) -> FilterCondition {
        self.condition
    }

    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    #[must_use]
    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Filters with no text or no bounds filter nothing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match &self.value {
            FilterValue::Text(text) => !text.trim().is_empty(),
            FilterValue::Range { lower, upper } => lower.is_some() || upper.is_some(),
            FilterValue::Flag(_) => true,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), FilterError> {
        let kind = self.property.kind();
        if self.value.kind() != kind {
            return Err(FilterError::ValueKindMismatch {
                property: self.property,
            });
        }
        if !self.condition.allowed_for(kind) {
            return Err(FilterError::UnsupportedCondition {
                property: self.property,
                condition: self.condition,
            });
        }
        Ok(())
    }

    /// True if the aircraft passes the filter.
    #[must_use]
    pub fn passes(&self, data: &AircraftData) -> bool {
        if !self.is_active() {
            return true;
        }

        let matched = match &self.value {
            FilterValue::Text(text) => {
                let wanted = text.trim().to_uppercase();
                let actual = self
                    .property
                    .text_of(data)
                    .unwrap_or_default()
                    .to_uppercase();
                match self.condition {
                    FilterCondition::Equals => actual == wanted,
                    FilterCondition::Contains => actual.contains(&wanted),
                    FilterCondition::Starts => actual.starts_with(&wanted),
                    FilterCondition::Ends => actual.ends_with(&wanted),
                    FilterCondition::Between => false,
                }
            }
            FilterValue::Range { lower, upper } => match self.property.number_of(data) {
                Some(actual) => {
                    lower.map_or(true, |lower| actual >= lower) && upper.map_or(true, |upper| actual <= upper)
                }
                None => false,
            },
            FilterValue::Flag(wanted) => self.property.flag_of(data).unwrap_or(false) == *wanted,
        };

        matched != self.reversed
    }

    /// Add this filter's query parameters to `request`.
    pub fn add_request_parameters(&self, request: &mut FetchRequest) {
        if !self.is_active() {
            return;
        }

        let prefix = format!(
            "f{}{}",
            self.property.code(),
            if self.reversed { "N" } else { "" }
        );

        match &self.value {
            FilterValue::Text(text) => {
                request.set_param(format!("{prefix}{}", self.condition.suffix()), text.trim());
            }
            FilterValue::Range { lower, upper } => {
                if let Some(lower) = lower {
                    request.set_param(format!("{prefix}L"), lower.to_string());
                }
                if let Some(upper) = upper {
                    request.set_param(format!("{prefix}U"), upper.to_string());
                }
            }
            FilterValue::Flag(value) => {
                request.set_param(
                    format!("{prefix}{}", self.condition.suffix()),
                    if *value { "1" } else { "0" },
                );
            }
        }
    }
}
