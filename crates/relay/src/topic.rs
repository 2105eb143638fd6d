// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay topics: one per monitored storefront resource.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named channel on the event bus.
///
/// The set is closed: every topic corresponds to one polled resource, and
/// topic names arriving from config files or clients are parsed into this
/// enum or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Most recent product reviews.
    ReviewsLatest,
    /// Per-product engagement aggregates (views, carts, purchases).
    ProductEngagement,
    /// Stock level snapshots.
    ProductStock,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Self::ReviewsLatest, Self::ProductEngagement, Self::ProductStock];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReviewsLatest => "reviews-latest",
            Self::ProductEngagement => "product-engagement",
            Self::ProductStock => "product-stock",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reviews-latest" => Ok(Self::ReviewsLatest),
            "product-engagement" => Ok(Self::ProductEngagement),
            "product-stock" => Ok(Self::ProductStock),
            other => anyhow::bail!("unknown topic: {other}"),
        }
    }
}
