// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `grocer-relay` binary as a subprocess against an
//! in-process mock storefront API and exercises it over HTTP and WebSocket.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `grocer-relay` binary.
pub fn relay_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("grocer-relay")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Hit counters for the mock storefront endpoints.
#[derive(Default)]
pub struct UpstreamHits {
    pub reviews: AtomicUsize,
    pub engagement: AtomicUsize,
    pub stock: AtomicUsize,
}

/// Mock storefront API serving the three polled resources under `/api`.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub hits: Arc<UpstreamHits>,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        async fn reviews(State(hits): State<Arc<UpstreamHits>>) -> Json<serde_json::Value> {
            let n = hits.reviews.fetch_add(1, Ordering::SeqCst);
            Json(json!({ "reviews": [{ "id": n, "rating": 5, "product": "heirloom tomatoes" }] }))
        }
        async fn engagement(State(hits): State<Arc<UpstreamHits>>) -> Json<serde_json::Value> {
            hits.engagement.fetch_add(1, Ordering::SeqCst);
            Json(json!({ "engagement": null }))
        }
        async fn stock(State(hits): State<Arc<UpstreamHits>>) -> Json<serde_json::Value> {
            hits.stock.fetch_add(1, Ordering::SeqCst);
            Json(json!({ "stockUpdates": [{ "sku": "oat-milk", "qty": 12 }] }))
        }

        let hits = Arc::new(UpstreamHits::default());
        let router = Router::new()
            .route("/api/reviews/latest", get(reviews))
            .route("/api/products/engagement", get(engagement))
            .route("/api/products/stockUpdates", get(stock))
            .with_state(Arc::clone(&hits));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self { addr, hits })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }
}

/// A running `grocer-relay` process that is killed on drop.
pub struct RelayProcess {
    child: Child,
    port: u16,
}

/// Builder for the relay's command line.
pub struct RelayBuilder {
    upstream: String,
    poll_ms: u64,
    extra: Vec<String>,
}

impl RelayBuilder {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self { upstream: upstream.into(), poll_ms: 100, extra: Vec::new() }
    }

    /// Poll interval for the default resources (`--poll-ms`).
    pub fn poll_ms(mut self, ms: u64) -> Self {
        self.poll_ms = ms;
        self
    }

    /// Append raw arguments.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra.push(arg.into());
        self
    }

    pub fn spawn(self) -> anyhow::Result<RelayProcess> {
        ensure_crypto();
        let binary = relay_binary();
        anyhow::ensure!(binary.exists(), "grocer-relay binary not found at {}", binary.display());

        let port = free_port()?;
        let mut args: Vec<String> = vec![
            "--host".into(),
            "127.0.0.1".into(),
            "--port".into(),
            port.to_string(),
            "--upstream".into(),
            self.upstream,
            "--poll-ms".into(),
            self.poll_ms.to_string(),
            "--request-timeout-ms".into(),
            "2000".into(),
            "--log-format".into(),
            "text".into(),
            "--log-level".into(),
            "warn".into(),
        ];
        args.extend(self.extra);

        let child = Command::new(&binary)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(RelayProcess { child, port })
    }
}

impl RelayProcess {
    pub fn build(upstream: impl Into<String>) -> RelayBuilder {
        RelayBuilder::new(upstream)
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// WebSocket URL for a single topic.
    pub fn topic_url(&self, topic: &str) -> String {
        format!("ws://127.0.0.1:{}/ws/{topic}", self.port)
    }

    /// Multiplexed WebSocket URL.
    pub fn mux_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Poll health until responsive.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("grocer-relay did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Send SIGTERM to the process.
    pub fn terminate(&self) -> anyhow::Result<()> {
        let status = Command::new("kill").args(["-TERM", &self.pid().to_string()]).status()?;
        anyhow::ensure!(status.success(), "kill -TERM failed: {status}");
        Ok(())
    }

    /// Wait for the process to exit within `timeout`.
    pub async fn wait_exit(
        &mut self,
        timeout: Duration,
    ) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("grocer-relay did not exit within {timeout:?}");
            }
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for RelayProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
