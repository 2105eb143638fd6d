// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the relay's HTTP and WebSocket API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayError {
    BadRequest,
    UnknownTopic,
}

impl RelayError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::UnknownTopic => 404,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::UnknownTopic => "UNKNOWN_TOPIC",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Why a single poll tick produced nothing to publish.
///
/// Every variant is transient: the tick is skipped and the next scheduled
/// tick is the implicit retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// Connection refused, DNS, TLS, or other transport error.
    Request(String),
    /// The request exceeded the configured timeout.
    Timeout,
    /// Upstream answered with a non-2xx status.
    Status(u16),
    /// The body was not valid JSON.
    Decode(String),
    /// The body had no truthy value at the response key.
    MissingField(String),
}

impl PollFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request(_) => "REQUEST",
            Self::Timeout => "TIMEOUT",
            Self::Status(_) => "HTTP_STATUS",
            Self::Decode(_) => "DECODE",
            Self::MissingField(_) => "MISSING_FIELD",
        }
    }
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(msg) => write!(f, "request failed: {msg}"),
            Self::Timeout => f.write_str("request timed out"),
            Self::Status(code) => write!(f, "upstream returned HTTP {code}"),
            Self::Decode(msg) => write!(f, "invalid JSON body: {msg}"),
            Self::MissingField(key) => write!(f, "response has no value at `{key}`"),
        }
    }
}

impl std::error::Error for PollFailure {}
