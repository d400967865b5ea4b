// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server lifecycle state
//!
//! The server moves strictly forward through
//! `Starting -> Serving -> ShuttingDown -> Stopped`. A bind failure jumps
//! straight from `Starting` to `Stopped`. Observers subscribe to a `watch`
//! channel and always see the latest state.

use std::fmt;

use tokio::sync::watch;
use tracing::{debug, warn};

/// Phase of the server process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// Listener is being bound
    Starting,
    /// Listener is accepting connections
    Serving,
    /// No new connections are accepted, in-flight requests are draining
    ShuttingDown,
    /// Drain finished or the grace period elapsed
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Serving => write!(f, "serving"),
            LifecycleState::ShuttingDown => write!(f, "shutting_down"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Owner of the current [`LifecycleState`]
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Create a lifecycle in the `Starting` state
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self { state }
    }

    /// Current state
    pub fn current(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Receiver notified on every transition
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Move to `next`, returning whether the transition happened
    ///
    /// Backward or repeated transitions are ignored.
    pub fn transition(&self, next: LifecycleState) -> bool {
        let current = self.current();
        if next <= current {
            warn!(from = %current, to = %next, "ignoring non-forward lifecycle transition");
            return false;
        }

        self.state.send_replace(next);
        debug!(from = %current, to = %next, "lifecycle transition");
        true
    }
}
