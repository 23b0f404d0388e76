// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One storage-provider peer as reported by the network. Upstream feeds are
/// ragged, so every field except the pubkey tolerates being absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PNode {
    pub pubkey: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub rpc_port: u16,
    #[serde(default)]
    pub uptime: u64,
    #[serde(default)]
    pub storage_committed: u64,
    #[serde(default)]
    pub storage_used: u64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub last_seen_timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodStatus {
    Online,
    Warning,
    Offline,
}

impl PodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PodStatus::Online => "online",
            PodStatus::Warning => "warning",
            PodStatus::Offline => "offline",
        }
    }
}

/// A node with its derived view fields. Recomputed on every fetch, never a
/// source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPod {
    #[serde(flatten)]
    pub node: PNode,
    pub x_score: u8,
    pub status: PodStatus,
}

/// Result of a pod fetch. `stale` is true when every endpoint failed and the
/// list is the last known-good cache value rather than a fresh read.
#[derive(Debug, Clone, PartialEq)]
pub struct PodsSnapshot {
    pub pods: Vec<PNode>,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PodsWithCredits {
    pub snapshot: PodsSnapshot,
    pub credits: HashMap<String, u64>,
}
