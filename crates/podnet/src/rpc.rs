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
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::PNode;

pub const PODS_METHOD: &str = "get-pods-with-stats";

#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
    pub id: String,
}

impl RpcRequest {
    pub fn pods_with_stats() -> Self {
        Self {
            jsonrpc: "2.0",
            method: PODS_METHOD,
            params: Value::Object(serde_json::Map::new()),
            id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<PodsResult>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Endpoints answer with either a bare node array or an object wrapping it in
/// a `pods` field. Both wire shapes normalise to one list at the boundary;
/// any other shape fails the decode.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PodsResult {
    Bare(Vec<PNode>),
    Wrapped { pods: Vec<PNode> },
}

impl PodsResult {
    pub fn into_pods(self) -> Vec<PNode> {
        match self {
            PodsResult::Bare(pods) => pods,
            PodsResult::Wrapped { pods } => pods,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreditsResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub pods_credits: Vec<PodCredits>,
}

#[derive(Debug, Deserialize)]
pub struct PodCredits {
    pub pod_id: String,
    #[serde(default)]
    pub credits: u64,
}

impl CreditsResponse {
    pub fn into_map(self) -> HashMap<String, u64> {
        self.pods_credits
            .into_iter()
            .map(|entry| (entry.pod_id, entry.credits))
            .collect()
    }
}
