// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::upstream::resource::{
    default_resources, load_resources, validate_resources, ResourceConfig,
};

/// Polling relay that republishes storefront REST resources to live subscribers.
#[derive(Debug, Clone, Parser)]
#[command(name = "grocer-relay", version, about)]
pub struct RelayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "GROCER_RELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9810, env = "GROCER_RELAY_PORT")]
    pub port: u16,

    /// Base URL of the storefront REST API that the default resources hang off.
    #[arg(long, default_value = "http://127.0.0.1:4000/api", env = "GROCER_RELAY_UPSTREAM")]
    pub upstream: String,

    /// Poll interval in milliseconds for the default resources.
    #[arg(long, default_value_t = 10000, env = "GROCER_RELAY_POLL_MS")]
    pub poll_ms: u64,

    /// Per-request timeout in milliseconds for upstream fetches.
    #[arg(long, default_value_t = 10000, env = "GROCER_RELAY_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// JSON file listing resources to poll. Replaces the default set.
    #[arg(long, env = "GROCER_RELAY_RESOURCES")]
    pub resources: Option<PathBuf>,

    /// Log format (text or json).
    #[arg(long, default_value = "text", env = "GROCER_RELAY_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "GROCER_RELAY_LOG_LEVEL")]
    pub log_level: String,
}

impl RelayConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_ms == 0 {
            anyhow::bail!("--poll-ms must be positive");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("--request-timeout-ms must be positive");
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            anyhow::bail!("invalid log format: {}", self.log_format);
        }
        if self.resources.is_none()
            && !(self.upstream.starts_with("http://") || self.upstream.starts_with("https://"))
        {
            anyhow::bail!("--upstream must be an http(s) URL: {}", self.upstream);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The resources to poll: the `--resources` file if given, otherwise the
    /// default storefront set rooted at `--upstream`.
    pub fn resolve_resources(&self) -> anyhow::Result<Vec<ResourceConfig>> {
        let resources = match self.resources {
            Some(ref path) => load_resources(path)?,
            None => default_resources(&self.upstream, self.poll_ms),
        };
        validate_resources(&resources)?;
        Ok(resources)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
