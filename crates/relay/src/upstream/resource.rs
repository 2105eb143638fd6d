// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polled resource definitions.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::topic::Topic;

/// One monitored upstream resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Absolute http(s) URL fetched on every tick.
    pub url: String,
    /// Fixed tick period in milliseconds.
    pub interval_ms: u64,
    /// Topic that receives the unwrapped payload.
    pub topic: Topic,
    /// Field of the JSON body whose value is published.
    pub response_key: String,
}

impl ResourceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_ms == 0 {
            anyhow::bail!("{}: interval_ms must be positive", self.topic);
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            anyhow::bail!("{}: url must be http(s): {}", self.topic, self.url);
        }
        if self.response_key.is_empty() {
            anyhow::bail!("{}: response_key must not be empty", self.topic);
        }
        Ok(())
    }
}

/// The storefront's three monitored resources, rooted at `upstream`.
pub fn default_resources(upstream: &str, interval_ms: u64) -> Vec<ResourceConfig> {
    let base = upstream.trim_end_matches('/');
    let resource = |path: &str, topic, key: &str| ResourceConfig {
        url: format!("{base}{path}"),
        interval_ms,
        topic,
        response_key: key.to_owned(),
    };
    vec![
        resource("/reviews/latest", Topic::ReviewsLatest, "reviews"),
        resource("/products/engagement", Topic::ProductEngagement, "engagement"),
        resource("/products/stockUpdates", Topic::ProductStock, "stockUpdates"),
    ]
}

/// Load a resource list from a JSON file (an array of [`ResourceConfig`]).
pub fn load_resources(path: &Path) -> anyhow::Result<Vec<ResourceConfig>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    let resources: Vec<ResourceConfig> = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
    Ok(resources)
}

/// Check every resource and reject empty lists or duplicate topics.
pub fn validate_resources(resources: &[ResourceConfig]) -> anyhow::Result<()> {
    if resources.is_empty() {
        anyhow::bail!("at least one resource must be configured");
    }
    let mut seen = HashSet::new();
    for resource in resources {
        resource.validate()?;
        if !seen.insert(resource.topic) {
            anyhow::bail!("topic {} is configured more than once", resource.topic);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
