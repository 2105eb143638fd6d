// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multiplexed subscription socket speaking the subscription subset of the
//! `graphql-transport-ws` envelope.
//!
//! ```text
//! client: {"type":"connection_init"}             server: {"type":"connection_ack"}
//! client: {"type":"subscribe","id":"1",
//!          "payload":{"topic":"product-stock"}}  server: {"type":"next","id":"1","payload":...}
//! client: {"type":"complete","id":"1"}
//! client: {"type":"ping"}                        server: {"type":"pong"}
//! ```
//!
//! Protocol violations close the socket with the protocol's 44xx codes.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamMap;

use crate::bus::{EventBus, Subscription};
use crate::state::RelayState;
use crate::topic::Topic;

/// How long a client may wait before sending `connection_init`.
pub const INIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Subprotocol name negotiated on upgrade.
pub const SUBPROTOCOL: &str = "graphql-transport-ws";

/// Frames accepted from clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ConnectionInit {
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    Ping {
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    Pong {
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    Subscribe {
        id: String,
        payload: SubscribePayload,
    },
    Complete {
        id: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribePayload {
    pub topic: String,
}

/// Frames sent to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame<'a> {
    ConnectionAck,
    Pong,
    Next { id: &'a str, payload: &'a serde_json::Value },
    Error { id: &'a str, payload: Vec<FrameError> },
}

#[derive(Debug, Serialize)]
pub struct FrameError {
    pub message: String,
}

/// What the connection loop should do after a client frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Nothing,
    Send(String),
    Close(u16, String),
}

/// Per-connection protocol state: acknowledgement plus live subscriptions.
pub struct MuxSession {
    bus: EventBus,
    served: Vec<Topic>,
    acknowledged: bool,
    subs: StreamMap<String, Subscription>,
}

impl MuxSession {
    pub fn new(bus: EventBus, served: Vec<Topic>) -> Self {
        Self { bus, served, acknowledged: false, subs: StreamMap::new() }
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn active_ids(&self) -> Vec<&str> {
        self.subs.keys().map(String::as_str).collect()
    }

    /// Apply one text frame from the client.
    pub fn handle_text(&mut self, text: &str) -> Reply {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(f) => f,
            Err(_) => return Reply::Close(4400, "Invalid message received".to_owned()),
        };

        match frame {
            ClientFrame::ConnectionInit { .. } => {
                if self.acknowledged {
                    return Reply::Close(4429, "Too many initialisation requests".to_owned());
                }
                self.acknowledged = true;
                send(&ServerFrame::ConnectionAck)
            }
            ClientFrame::Ping { .. } => send(&ServerFrame::Pong),
            ClientFrame::Pong { .. } => Reply::Nothing,
            ClientFrame::Subscribe { id, payload } => {
                if !self.acknowledged {
                    return Reply::Close(4401, "Unauthorized".to_owned());
                }
                if self.subs.contains_key(&id) {
                    return Reply::Close(4409, format!("Subscriber for {id} already exists"));
                }
                let topic = match payload.topic.parse::<Topic>() {
                    Ok(t) if self.served.contains(&t) => t,
                    _ => {
                        let errors =
                            vec![FrameError { message: format!("unknown topic: {}", payload.topic) }];
                        return send(&ServerFrame::Error { id: &id, payload: errors });
                    }
                };
                let sub = self.bus.subscribe(topic);
                self.subs.insert(id, sub);
                Reply::Nothing
            }
            ClientFrame::Complete { id } => {
                if let Some(sub) = self.subs.remove(&id) {
                    self.bus.unsubscribe(sub.handle());
                }
                Reply::Nothing
            }
        }
    }

    /// Unsubscribe everything.  Called on every connection exit path.
    pub fn close_all(&mut self) {
        let ids: Vec<String> = self.subs.keys().cloned().collect();
        for id in ids {
            if let Some(sub) = self.subs.remove(&id) {
                self.bus.unsubscribe(sub.handle());
            }
        }
    }
}

fn send(frame: &ServerFrame<'_>) -> Reply {
    match serde_json::to_string(frame) {
        Ok(json) => Reply::Send(json),
        Err(e) => Reply::Close(1011, format!("encode failed: {e}")),
    }
}

/// `GET /ws`: multiplexed subscription socket.
pub async fn ws_mux_handler(
    State(state): State<Arc<RelayState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.protocols([SUBPROTOCOL]).on_upgrade(move |socket| handle_mux_connection(state, socket))
}

async fn handle_mux_connection(state: Arc<RelayState>, socket: WebSocket) {
    let served = state.resources.iter().map(|r| r.topic).collect();
    let mut session = MuxSession::new(state.bus.clone(), served);
    let (mut ws_tx, mut ws_rx) = socket.split();
    let init_deadline = tokio::time::sleep(INIT_TIMEOUT);
    tokio::pin!(init_deadline);

    loop {
        let reply = tokio::select! {
            _ = state.shutdown.cancelled() => Reply::Close(1001, "Going away".to_owned()),

            _ = &mut init_deadline, if !session.acknowledged() => {
                Reply::Close(4408, "Connection initialisation timeout".to_owned())
            }

            Some((id, payload)) = session.subs.next(), if !session.subs.is_empty() => {
                send(&ServerFrame::Next { id: &id, payload: payload.as_ref() })
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => session.handle_text(&text),
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => Reply::Nothing,
                }
            }
        };

        match reply {
            Reply::Nothing => {}
            Reply::Send(json) => {
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Reply::Close(code, reason) => {
                tracing::debug!(code, %reason, "closing mux subscription socket");
                let frame = CloseFrame { code, reason: reason.into() };
                let _ = ws_tx.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }

    let ids = session.active_ids().len();
    session.close_all();
    tracing::debug!(subscriptions = ids, "mux subscription socket closed");
}

#[cfg(test)]
#[path = "ws_mux_tests.rs"]
mod tests;
