// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP fetch client for polled storefront resources.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;

use crate::error::PollFailure;

/// Fetches a JSON document from a URL.
///
/// The poller only depends on this trait, so tests can substitute a scripted
/// source for the real HTTP client.
pub trait Fetch: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, PollFailure>> + Send + 'a>>;
}

/// `reqwest`-backed [`Fetch`] with a per-request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        crate::ensure_crypto();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("building upstream HTTP client: {e}"))?;
        Ok(Self { client })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, PollFailure> {
        let resp = self.client.get(url).send().await.map_err(request_failure)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PollFailure::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await.map_err(request_failure)?;
        serde_json::from_slice(&bytes).map_err(|e| PollFailure::Decode(e.to_string()))
    }
}

impl Fetch for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, PollFailure>> + Send + 'a>> {
        Box::pin(self.get_json(url))
    }
}

fn request_failure(e: reqwest::Error) -> PollFailure {
    if e.is_timeout() {
        PollFailure::Timeout
    } else {
        PollFailure::Request(e.to_string())
    }
}

/// Take the value at `key` out of a response envelope such as
/// `{ "reviews": [...] }`.
///
/// Absent keys and falsy values (`null`, `false`, `0`, `""`) are reported as
/// [`PollFailure::MissingField`].  Empty arrays and objects are truthy.
pub fn extract_payload(
    body: serde_json::Value,
    key: &str,
) -> Result<serde_json::Value, PollFailure> {
    let value = match body {
        serde_json::Value::Object(mut map) => map.remove(key),
        _ => None,
    };
    match value {
        Some(v) if is_truthy(&v) => Ok(v),
        _ => Err(PollFailure::MissingField(key.to_owned())),
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
