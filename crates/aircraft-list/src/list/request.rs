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

use std::collections::BTreeMap;

/// Outgoing aircraft list request, decorated by `fetchingList` listeners
/// before the transport sends it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// Query string parameters.
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// Form-encoded body fields.
    pub body: BTreeMap<String, String>,
}

impl FetchRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn set_body_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.body.insert(name.into(), value.into());
    }
}
