// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream storefront communication: resource definitions, HTTP client, and pollers.

pub mod client;
pub mod poller;
pub mod resource;
