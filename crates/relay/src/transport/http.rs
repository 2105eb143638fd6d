// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for relay introspection.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::RelayState;
use crate::topic::Topic;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub resources: usize,
    pub subscribers: usize,
}

#[derive(Debug, Serialize)]
pub struct TopicInfo {
    pub topic: Topic,
    pub url: String,
    pub interval_ms: u64,
    pub response_key: String,
    pub subscribers: usize,
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        resources: s.resources.len(),
        subscribers: s.bus.total_subscribers(),
    })
}

/// `GET /api/v1/topics`: configured resources with live subscriber counts.
pub async fn list_topics(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    let topics: Vec<TopicInfo> = s
        .resources
        .iter()
        .map(|r| TopicInfo {
            topic: r.topic,
            url: r.url.clone(),
            interval_ms: r.interval_ms,
            response_key: r.response_key.clone(),
            subscribers: s.bus.subscriber_count(r.topic),
        })
        .collect();
    Json(topics)
}
