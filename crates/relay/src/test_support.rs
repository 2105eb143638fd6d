// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::PollFailure;
use crate::upstream::client::Fetch;

type Reply = Result<serde_json::Value, PollFailure>;

struct Route {
    script: VecDeque<Reply>,
    fallback: Reply,
    delay: Duration,
    calls: Vec<Instant>,
}

/// In-memory [`Fetch`] with per-URL scripted replies.
///
/// Each URL answers from its script queue first and then repeats its
/// fallback forever.  Every call records its start time on the tokio clock,
/// so tests running with a paused clock can check tick spacing exactly.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Route>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `url` with a reply repeated once its script is exhausted.
    pub fn route(self, url: &str, fallback: Reply) -> Self {
        self.routes.lock().insert(
            url.to_owned(),
            Route { script: VecDeque::new(), fallback, delay: Duration::ZERO, calls: Vec::new() },
        );
        self
    }

    /// Queue a one-shot reply for `url`.
    pub fn then(self, url: &str, reply: Reply) -> Self {
        if let Some(route) = self.routes.lock().get_mut(url) {
            route.script.push_back(reply);
        }
        self
    }

    /// Make every fetch of `url` take `delay` before answering.
    pub fn delayed(self, url: &str, delay: Duration) -> Self {
        if let Some(route) = self.routes.lock().get_mut(url) {
            route.delay = delay;
        }
        self
    }

    /// Start times of every fetch issued for `url`.
    pub fn calls(&self, url: &str) -> Vec<Instant> {
        self.routes.lock().get(url).map(|r| r.calls.clone()).unwrap_or_default()
    }
}

impl Fetch for ScriptedFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Reply> + Send + 'a>> {
        let planned = {
            let mut routes = self.routes.lock();
            routes.get_mut(url).map(|route| {
                route.calls.push(Instant::now());
                let reply = route.script.pop_front().unwrap_or_else(|| route.fallback.clone());
                (route.delay, reply)
            })
        };
        Box::pin(async move {
            let (delay, reply) =
                planned.ok_or_else(|| PollFailure::Request(format!("no route for {url}")))?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            reply
        })
    }
}

/// Spacing between consecutive instants.
pub fn gaps(instants: &[Instant]) -> Vec<Duration> {
    instants.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
