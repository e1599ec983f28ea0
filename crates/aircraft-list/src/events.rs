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

//! Named-event publish/subscribe.
//!
//! [`EventDispatcher`] is the synchronous notification primitive shared by the
//! aircraft list, the list filter and the application-wide [`GlobalDispatcher`].
//! Listeners are registered against an event name and invoked in registration
//! order with a mutable reference to the event arguments, so a listener can
//! decorate the arguments for the listeners that follow it.
//!
//! Dispatch iterates over a snapshot of the listeners taken when the event is
//! raised. Listeners hooked during a raise are not called until the next raise.
//! Listeners unhooked during a raise are skipped if they have not been reached
//! yet. No lock is held while a callback runs, so callbacks may hook, unhook or
//! raise freely.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::debug;

/// Name of the application-wide event raised after every applied snapshot.
pub const DISPLAY_UPDATED: &str = "displayUpdated";

type Callback<A> = dyn Fn(&mut A) + Send + Sync;

struct Listener<A> {
    id: u64,
    callback: Arc<Callback<A>>,
    active: Arc<AtomicBool>,
}

/// Handle returned by [`EventDispatcher::hook`], used to remove the listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookHandle {
    event: String,
    id: u64,
}

impl HookHandle {
    /// Name of the event the listener was hooked to.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

/// Synchronous, reentrant-safe event dispatcher keyed by event name.
pub struct EventDispatcher<A> {
    name: String,
    listeners: Mutex<HashMap<String, Vec<Listener<A>>>>,
    next_id: AtomicU64,
    log_timings: AtomicBool,
}

impl<A> std::fmt::Debug for EventDispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listener_count: usize = self
            .listeners
            .lock()
            .map(|l| l.values().map(Vec::len).sum())
            .unwrap_or(0);
        f.debug_struct("EventDispatcher")
            .field("name", &self.name)
            .field("listener_count", &listener_count)
            .finish_non_exhaustive()
    }
}

impl<A> EventDispatcher<A> {
    /// Create a dispatcher. The name only appears in diagnostics.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            log_timings: AtomicBool::new(false),
        }
    }

    /// Enable or disable debug logging of how long each raise takes.
    pub fn set_log_timings(&self, enabled: bool) {
        self.log_timings.store(enabled, Ordering::Relaxed);
    }

    /// Register `callback` for `event`. Callbacks for the same event fire in
    /// the order they were hooked.
    pub fn hook<F>(&self, event: &str, callback: F) -> HookHandle
    where
        F: Fn(&mut A) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_listeners()
            .entry(event.to_string())
            .or_default()
            .push(Listener {
                id,
                callback: Arc::new(callback),
                active: Arc::new(AtomicBool::new(true)),
            });

        HookHandle {
            event: event.to_string(),
            id,
        }
    }

    /// Remove the listener identified by `handle`.
    ///
    /// Returns `false` if the listener was already removed.
    pub fn unhook(&self, handle: &HookHandle) -> bool {
        let mut listeners = self.lock_listeners();
        let Some(registered) = listeners.get_mut(&handle.event) else {
            return false;
        };

        let Some(position) = registered.iter().position(|l| l.id == handle.id) else {
            return false;
        };

        let removed = registered.remove(position);
        removed.active.store(false, Ordering::Release);
        if registered.is_empty() {
            listeners.remove(&handle.event);
        }
        true
    }

    /// Invoke every listener currently hooked to `event` with `args`.
    pub fn raise(&self, event: &str, args: &mut A) {
        let snapshot: Vec<(Arc<Callback<A>>, Arc<AtomicBool>)> = match self.lock_listeners().get(event) {
            Some(registered) => registered
                .iter()
                .map(|l| (Arc::clone(&l.callback), Arc::clone(&l.active)))
                .collect(),
            None => return,
        };

        let started = self.log_timings.load(Ordering::Relaxed).then(Instant::now);

        for (callback, active) in &snapshot {
            // Unhooked by an earlier listener in this same raise.
            if !active.load(Ordering::Acquire) {
                continue;
            }
            callback(args);
        }

        if let Some(started) = started {
            debug!(
                "{}: raising {} to {} listener(s) took {:.3}ms",
                self.name,
                event,
                snapshot.len(),
                started.elapsed().as_secs_f64() * 1000.0
            );
        }
    }

    /// Number of listeners hooked to `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock_listeners().get(event).map_or(0, Vec::len)
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Listener<A>>>> {
        self.listeners
            .lock()
            .expect("Event listener lock poisoned - unrecoverable state")
    }
}

/// Events carried by the application-wide dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalEvent {
    /// The aircraft list finished applying a snapshot.
    DisplayUpdated,
}

impl GlobalEvent {
    /// Event name the variant is raised under.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DisplayUpdated => DISPLAY_UPDATED,
        }
    }
}

/// Cross-cutting bus for subsystems that should not depend on the aircraft
/// list directly (title bar, layout).
pub type GlobalDispatcher = EventDispatcher<GlobalEvent>;
