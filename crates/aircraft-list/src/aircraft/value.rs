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

/// A field value paired with a "changed by the last update" flag.
///
/// Renderers check [`Tracked::changed`] to decide whether a cell, marker or
/// label needs redrawing after a snapshot has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    value: Option<T>,
    changed: bool,
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Self {
            value: None,
            changed: false,
        }
    }
}

impl<T: PartialEq> Tracked<T> {
    /// Current value, if one has ever been received.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// True if the last update carried a different value.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Apply an incoming value. Absent values leave the field alone and
    /// clear the changed flag.
    pub(crate) fn apply(&mut self, incoming: Option<T>) {
        match incoming {
            Some(value) => {
                self.changed = self.value.as_ref() != Some(&value);
                self.value = Some(value);
            }
            None => self.changed = false,
        }
    }
}

impl<T: Copy> Tracked<T> {
    /// Copy of the current value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_is_a_change() {
        let mut field: Tracked<i32> = Tracked::default();
        field.apply(Some(1000));
        assert_eq!(field.get(), Some(1000));
        assert!(field.changed());
    }

    #[test]
    fn test_same_value_is_not_a_change() {
        let mut field = Tracked::default();
        field.apply(Some("BAW1".to_string()));
        field.apply(Some("BAW1".to_string()));
        assert!(!field.changed());
    }

    #[test]
    fn test_absent_value_keeps_old_value() {
        let mut field = Tracked::default();
        field.apply(Some(2.5_f64));
        field.apply(None);
        assert_eq!(field.get(), Some(2.5));
        assert!(!field.changed());
    }
}
