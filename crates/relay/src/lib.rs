// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grocer relay: polls storefront REST resources and fans them out to live
//! WebSocket subscribers.

pub mod bus;
pub mod config;
pub mod error;
pub mod relay;
pub mod state;
pub mod test_support;
pub mod topic;
pub mod transport;
pub mod upstream;

use std::sync::{Arc, Once};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::config::RelayConfig;
use crate::relay::Relay;
use crate::state::RelayState;
use crate::transport::build_router;
use crate::upstream::client::{Fetch, HttpFetcher};
use crate::upstream::poller::log_failure;
use crate::upstream::resource::ResourceConfig;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Run the relay until `shutdown` is cancelled.
///
/// `resources` is the validated list from [`RelayConfig::resolve_resources`].
pub async fn run(
    config: RelayConfig,
    resources: Vec<ResourceConfig>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    let bus = EventBus::new();
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(config.request_timeout())?);
    let relay = Relay::start(bus.clone(), &resources, fetcher, log_failure(), &shutdown);

    let state = Arc::new(RelayState::new(bus, resources, shutdown.clone()));
    let router = build_router(state);

    tracing::info!("grocer-relay listening on {addr} ({} resources)", relay.poller_count());
    let served =
        axum::serve(listener, router).with_graceful_shutdown(shutdown.clone().cancelled_owned()).await;

    shutdown.cancel();
    relay.shutdown().await;
    served?;
    Ok(())
}
