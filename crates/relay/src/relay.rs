// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The running relay: one poller per configured resource feeding a shared bus.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::upstream::client::Fetch;
use crate::upstream::poller::{start_polling, FailureHook, PollerHandle};
use crate::upstream::resource::ResourceConfig;

pub struct Relay {
    pollers: Vec<PollerHandle>,
}

impl Relay {
    /// Start polling every resource.  Pollers stop when `shutdown` is
    /// cancelled or [`Relay::shutdown`] is called.
    pub fn start(
        bus: EventBus,
        resources: &[ResourceConfig],
        fetcher: Arc<dyn Fetch>,
        on_failure: FailureHook,
        shutdown: &CancellationToken,
    ) -> Self {
        let pollers = resources
            .iter()
            .map(|resource| {
                start_polling(
                    resource.clone(),
                    Arc::clone(&fetcher),
                    bus.clone(),
                    Arc::clone(&on_failure),
                    shutdown.clone(),
                )
            })
            .collect();
        Self { pollers }
    }

    pub fn poller_count(&self) -> usize {
        self.pollers.len()
    }

    /// Stop every poller and wait for all of them to exit.
    pub async fn shutdown(self) {
        for poller in &self.pollers {
            poller.stop();
        }
        for poller in self.pollers {
            poller.shutdown().await;
        }
        tracing::debug!("all pollers stopped");
    }
}
