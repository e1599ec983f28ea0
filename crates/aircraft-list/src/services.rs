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

//! Collaborators the aircraft list depends on but does not own.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Server configuration as far as the aircraft list needs it.
pub trait ServerCapabilities: Send + Sync {
    /// Whether the server allows aircraft pictures to be shown.
    fn pictures_enabled(&self) -> bool;
}

/// Session idle timeout, reset whenever the user does something.
pub trait IdleTimeout: Send + Sync {
    fn reset_idle_timer(&self);
}

/// Fixed capabilities, for servers whose configuration is known up front.
#[derive(Debug, Default)]
pub struct StaticServerCapabilities {
    pictures_enabled: AtomicBool,
}

impl StaticServerCapabilities {
    #[must_use]
    pub fn new(pictures_enabled: bool) -> Self {
        Self {
            pictures_enabled: AtomicBool::new(pictures_enabled),
        }
    }

    pub fn set_pictures_enabled(&self, enabled: bool) {
        self.pictures_enabled.store(enabled, Ordering::Relaxed);
    }
}

impl ServerCapabilities for StaticServerCapabilities {
    fn pictures_enabled(&self) -> bool {
        self.pictures_enabled.load(Ordering::Relaxed)
    }
}

/// Idle timeout that only counts resets.
#[derive(Debug, Default)]
pub struct CountingIdleTimeout {
    resets: AtomicU64,
}

impl CountingIdleTimeout {
    #[must_use]
    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }
}

impl IdleTimeout for CountingIdleTimeout {
    fn reset_idle_timer(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }
}
