// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::topic::Topic;
use crate::upstream::resource::ResourceConfig;

/// Shared state for the HTTP and WebSocket transport.
pub struct RelayState {
    pub bus: EventBus,
    pub resources: Vec<ResourceConfig>,
    /// Cancelled on process shutdown; open subscription sockets close on it.
    pub shutdown: CancellationToken,
}

impl RelayState {
    pub fn new(bus: EventBus, resources: Vec<ResourceConfig>, shutdown: CancellationToken) -> Self {
        Self { bus, resources, shutdown }
    }

    /// Whether a resource feeds `topic`.
    pub fn serves(&self, topic: Topic) -> bool {
        self.resources.iter().any(|r| r.topic == topic)
    }
}
