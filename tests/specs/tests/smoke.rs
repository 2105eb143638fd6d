// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `grocer-relay` binary against a
//! mock storefront API.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use grocer_relay_specs::{relay_binary, MockUpstream, RelayProcess};

const TIMEOUT: Duration = Duration::from_secs(10);

async fn next_text<S>(ws: &mut S) -> anyhow::Result<serde_json::Value>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match tokio::time::timeout(TIMEOUT, ws.next()).await? {
            Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(_)) => continue,
            other => anyhow::bail!("unexpected socket event: {other:?}"),
        }
    }
}

// -- HTTP ---------------------------------------------------------------------

#[tokio::test]
async fn http_health_and_topics() -> anyhow::Result<()> {
    let upstream = MockUpstream::start().await?;
    let relay = RelayProcess::build(upstream.base_url()).poll_ms(10_000).spawn()?;
    relay.wait_healthy(TIMEOUT).await?;

    let health: serde_json::Value =
        reqwest::get(format!("{}/api/v1/health", relay.base_url())).await?.json().await?;
    assert_eq!(health["status"], "running");
    assert_eq!(health["resources"], 3);

    let topics: Vec<serde_json::Value> =
        reqwest::get(format!("{}/api/v1/topics", relay.base_url())).await?.json().await?;
    let names: Vec<&str> = topics.iter().filter_map(|t| t["topic"].as_str()).collect();
    assert_eq!(names, vec!["reviews-latest", "product-engagement", "product-stock"]);
    Ok(())
}

// -- WebSocket ----------------------------------------------------------------

#[tokio::test]
async fn ws_topic_receives_polled_payloads() -> anyhow::Result<()> {
    let upstream = MockUpstream::start().await?;
    let relay = RelayProcess::build(upstream.base_url()).spawn()?;
    relay.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(relay.topic_url("product-stock")).await?;
    let payload = next_text(&mut ws).await?;
    assert_eq!(payload, serde_json::json!([{ "sku": "oat-milk", "qty": 12 }]));
    Ok(())
}

#[tokio::test]
async fn ws_mux_multiplexes_topics() -> anyhow::Result<()> {
    let upstream = MockUpstream::start().await?;
    let relay = RelayProcess::build(upstream.base_url()).spawn()?;
    relay.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(relay.mux_url()).await?;
    ws.send(Message::Text(r#"{"type":"connection_init"}"#.into())).await?;
    assert_eq!(next_text(&mut ws).await?["type"], "connection_ack");

    for (id, topic) in [("r", "reviews-latest"), ("s", "product-stock")] {
        let frame = serde_json::json!({"type": "subscribe", "id": id, "payload": {"topic": topic}});
        ws.send(Message::Text(frame.to_string().into())).await?;
    }

    let mut seen = std::collections::HashSet::new();
    while seen.len() < 2 {
        let frame = next_text(&mut ws).await?;
        assert_eq!(frame["type"], "next");
        if let Some(id) = frame["id"].as_str() {
            seen.insert(id.to_owned());
        }
    }
    Ok(())
}

#[tokio::test]
async fn falsy_payloads_are_never_pushed() -> anyhow::Result<()> {
    let upstream = MockUpstream::start().await?;
    let relay = RelayProcess::build(upstream.base_url()).spawn()?;
    relay.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) =
        tokio_tungstenite::connect_async(relay.topic_url("product-engagement")).await?;

    // Wait until the upstream has been polled a few times.
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while upstream.hits.engagement.load(Ordering::SeqCst) < 3 {
        anyhow::ensure!(tokio::time::Instant::now() < deadline, "engagement never polled");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let quiet = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(quiet.is_err(), "expected no frames, got {quiet:?}");
    Ok(())
}

// -- Process lifecycle --------------------------------------------------------

#[tokio::test]
async fn sigterm_shuts_down_cleanly() -> anyhow::Result<()> {
    let upstream = MockUpstream::start().await?;
    let mut relay = RelayProcess::build(upstream.base_url()).spawn()?;
    relay.wait_healthy(TIMEOUT).await?;

    relay.terminate()?;
    let status = relay.wait_exit(TIMEOUT).await?;
    assert!(status.success(), "exit status: {status}");
    Ok(())
}

#[test]
fn invalid_config_exits_2() -> anyhow::Result<()> {
    let binary = relay_binary();
    anyhow::ensure!(binary.exists(), "grocer-relay binary not found at {}", binary.display());

    let status = Command::new(&binary)
        .args(["--poll-ms", "0"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}

/// Run the binary against a `--resources` file holding `contents`.
fn exit_code_with_resources(contents: &str) -> anyhow::Result<Option<i32>> {
    let binary = relay_binary();
    anyhow::ensure!(binary.exists(), "grocer-relay binary not found at {}", binary.display());

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;

    let status = Command::new(&binary)
        .arg("--resources")
        .arg(file.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    Ok(status.code())
}

#[test]
fn duplicate_topic_resources_file_exits_2() -> anyhow::Result<()> {
    let contents = r#"[
        {"url":"http://127.0.0.1:1/a","interval_ms":100,"topic":"product-stock","response_key":"stockUpdates"},
        {"url":"http://127.0.0.1:1/b","interval_ms":100,"topic":"product-stock","response_key":"stockUpdates"}
    ]"#;
    assert_eq!(exit_code_with_resources(contents)?, Some(2));
    Ok(())
}

#[test]
fn empty_resources_file_exits_2() -> anyhow::Result<()> {
    assert_eq!(exit_code_with_resources("[]")?, Some(2));
    Ok(())
}

#[test]
fn malformed_resources_file_exits_2() -> anyhow::Result<()> {
    assert_eq!(exit_code_with_resources("{ not json")?, Some(2));
    Ok(())
}

#[tokio::test]
async fn unreachable_upstream_keeps_running() -> anyhow::Result<()> {
    let port = grocer_relay_specs::free_port()?;
    let relay = RelayProcess::build(format!("http://127.0.0.1:{port}/api")).spawn()?;
    relay.wait_healthy(TIMEOUT).await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    let resp = reqwest::get(format!("{}/api/v1/health", relay.base_url())).await?;
    assert!(resp.status().is_success());
    Ok(())
}
