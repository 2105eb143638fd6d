// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-topic WebSocket subscriptions.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::error::RelayError;
use crate::state::RelayState;
use crate::topic::Topic;

/// `GET /ws/{topic}`: stream every payload published on `topic`.
///
/// Each payload is sent as one text frame holding the payload JSON.
pub async fn ws_handler(
    State(state): State<Arc<RelayState>>,
    Path(topic): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> impl IntoResponse {
    let topic = match topic.parse::<Topic>() {
        Ok(t) if state.serves(t) => t,
        _ => {
            return RelayError::UnknownTopic
                .to_http_response(format!("unknown topic: {topic}"))
                .into_response();
        }
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            return RelayError::BadRequest.to_http_response(rejection.body_text()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_ws(socket, state, topic)).into_response()
}

/// Per-connection loop: bus payloads out, close/error in.
async fn handle_ws(socket: WebSocket, state: Arc<RelayState>, topic: Topic) {
    let mut sub = state.bus.subscribe(topic);
    let handle = sub.handle();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let reason = loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break "shutdown";
            }

            payload = sub.recv() => {
                let Some(payload) = payload else {
                    break "unsubscribed";
                };
                let Ok(json) = serde_json::to_string(&*payload) else {
                    continue;
                };
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break "send failed";
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break "client closed",
                    Some(Err(_)) => break "socket error",
                    // Pings are answered by axum; client text is ignored.
                    _ => {}
                }
            }
        }
    };

    state.bus.unsubscribe(handle);
    tracing::debug!(%topic, subscriber = handle.id(), reason, "topic subscriber disconnected");
}
