// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-rate pollers that fetch a resource and publish it on its topic.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::error::PollFailure;
use crate::topic::Topic;
use crate::upstream::client::{extract_payload, Fetch};
use crate::upstream::resource::ResourceConfig;

/// Callback invoked for every skipped tick.
pub type FailureHook = Arc<dyn Fn(&ResourceConfig, &PollFailure) + Send + Sync>;

/// Default hook: log the failure and move on.
pub fn log_failure() -> FailureHook {
    Arc::new(|resource, failure| {
        tracing::warn!(
            topic = %resource.topic,
            url = %resource.url,
            kind = failure.as_str(),
            err = %failure,
            "poll tick skipped"
        );
    })
}

/// Stop handle for one running poll task.
pub struct PollerHandle {
    topic: Topic,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Request the task to stop.  An in-flight fetch is abandoned.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(topic = %self.topic, err = %e, "poller task panicked");
        }
    }
}

/// Spawn a task that polls `resource` on a fixed-rate schedule.
///
/// Ticks are anchored at `start + k * interval`.  The first tick fires one
/// interval after start.  A tick that comes due while the previous fetch is
/// still running is skipped, never queued.  Failures go to `on_failure` and
/// never stop the task; it runs until `cancel` (or the handle) is cancelled.
pub fn start_polling(
    resource: ResourceConfig,
    fetcher: Arc<dyn Fetch>,
    bus: EventBus,
    on_failure: FailureHook,
    cancel: CancellationToken,
) -> PollerHandle {
    let cancel = cancel.child_token();
    let topic = resource.topic;
    let period = resource.interval();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tracing::info!(%topic, url = %resource.url, interval_ms = resource.interval_ms, "poller started");
            let mut due = Instant::now() + period;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep_until(due) => {}
                }

                let outcome = tokio::select! {
                    _ = cancel.cancelled() => break,
                    r = poll_once(fetcher.as_ref(), &resource) => r,
                };

                match outcome {
                    Ok(payload) => {
                        let delivered = bus.publish(topic, Arc::new(payload));
                        tracing::debug!(%topic, delivered, "poll tick published");
                    }
                    Err(failure) => on_failure(&resource, &failure),
                }

                let now = Instant::now();
                let next = next_due(due, period, now);
                let skipped = ticks_between(due, next, period);
                if skipped > 0 {
                    tracing::debug!(%topic, skipped, "fetch overran interval, ticks skipped");
                }
                due = next;
            }

            tracing::info!(%topic, "poller stopped");
        })
    };

    PollerHandle { topic, cancel, task }
}

/// Run one tick: fetch the resource and unwrap its payload.
pub async fn poll_once(
    fetcher: &dyn Fetch,
    resource: &ResourceConfig,
) -> Result<serde_json::Value, PollFailure> {
    let body = fetcher.fetch(&resource.url).await?;
    extract_payload(body, &resource.response_key)
}

/// Earliest tick boundary `last + k * period` (k >= 1) not before `now`.
pub(crate) fn next_due(last: Instant, period: Duration, now: Instant) -> Instant {
    let next = last + period;
    if next >= now || period.is_zero() {
        return next;
    }
    let behind = (now - next).as_nanos();
    let steps = behind.div_ceil(period.as_nanos());
    next + period.saturating_mul(u32::try_from(steps).unwrap_or(u32::MAX))
}

/// Number of whole ticks strictly between `from` and `to`.
fn ticks_between(from: Instant, to: Instant, period: Duration) -> u128 {
    if period.is_zero() {
        return 0;
    }
    ((to - from).as_nanos() / period.as_nanos()).saturating_sub(1)
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
