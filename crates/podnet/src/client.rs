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

use futures::future::join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::TtlSlot;
use crate::config::ClientConfig;
use crate::error::PodNetError;
use crate::rpc::{CreditsResponse, RpcRequest, RpcResponse};
use crate::types::{PNode, PodsSnapshot, PodsWithCredits};

const MAX_REPORTED_FAILURES: usize = 3;

/// Fetches the pod list from redundant RPC endpoints and merges the credits
/// feed, tolerating partial endpoint failure and total outage.
///
/// Endpoints are queried concurrently, each under its own timeout; selection
/// among the outcomes follows configured priority order, not arrival order.
/// Results are cached per instance in single-slot TTL caches, and a stale
/// cache value is served (flagged) when every endpoint fails. Overlapping
/// refreshes are collapsed into one upstream round per feed.
pub struct NodeDataClient {
    http: Client,
    config: ClientConfig,
    pods_cache: TtlSlot<Vec<PNode>>,
    credits_cache: TtlSlot<HashMap<String, u64>>,
    pods_refresh: Mutex<()>,
    credits_refresh: Mutex<()>,
}

impl NodeDataClient {
    pub fn new(config: ClientConfig) -> Result<Self, PodNetError> {
        config.validate()?;
        // Timeouts are enforced per request via tokio so that expiry aborts
        // exactly one endpoint's call; the client itself carries none.
        let http = Client::builder().build().map_err(PodNetError::Http)?;
        let ttl = config.cache_ttl();
        Ok(Self {
            http,
            pods_cache: TtlSlot::new(ttl),
            credits_cache: TtlSlot::new(ttl),
            pods_refresh: Mutex::new(()),
            credits_refresh: Mutex::new(()),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn fetch_pods(&self) -> Result<PodsSnapshot, PodNetError> {
        if let Some(pods) = self.pods_cache.get_fresh().await {
            debug!(pods = pods.len(), "Serving pod list from cache");
            return Ok(PodsSnapshot { pods, stale: false });
        }

        // One refresh at a time; late arrivals re-check the cache under the
        // lock and ride the round that just completed.
        let _guard = self.pods_refresh.lock().await;
        if let Some(pods) = self.pods_cache.get_fresh().await {
            debug!(pods = pods.len(), "Serving pod list refreshed by a concurrent call");
            return Ok(PodsSnapshot { pods, stale: false });
        }

        match self.refresh_pods().await {
            Ok(pods) => {
                self.pods_cache.set(pods.clone()).await;
                Ok(PodsSnapshot { pods, stale: false })
            }
            Err(err) => match self.pods_cache.get_any().await {
                Some(pods) => {
                    warn!(error = %err, pods = pods.len(), "All pod endpoints failed, serving stale cache");
                    Ok(PodsSnapshot { pods, stale: true })
                }
                None => Err(err),
            },
        }
    }

    async fn refresh_pods(&self) -> Result<Vec<PNode>, PodNetError> {
        let outcomes = join_all(
            self.config
                .endpoints
                .iter()
                .map(|endpoint| self.query_endpoint(endpoint)),
        )
        .await;

        let mut failures = Vec::new();
        for (endpoint, outcome) in self.config.endpoints.iter().zip(outcomes) {
            match outcome {
                Ok(pods) if !pods.is_empty() => {
                    info!(endpoint = %endpoint, pods = pods.len(), "Refreshed pod list");
                    return Ok(pods);
                }
                Ok(_) => {
                    warn!(endpoint = %endpoint, "Pod endpoint returned an empty list");
                    failures.push(format!("{endpoint}: returned no pods"));
                }
                Err(err) => {
                    warn!(endpoint = %endpoint, error = %err, "Pod endpoint failed");
                    failures.push(format!("{endpoint}: {err}"));
                }
            }
        }

        failures.truncate(MAX_REPORTED_FAILURES);
        Err(PodNetError::DataUnavailable {
            detail: failures.join("; "),
        })
    }

    async fn query_endpoint(&self, endpoint: &str) -> Result<Vec<PNode>, PodNetError> {
        let url = format!("{}/rpc", endpoint.trim_end_matches('/'));
        let request = RpcRequest::pods_with_stats();
        debug!(endpoint = %endpoint, id = %request.id, "Requesting pod list");

        // Dropping the request future on expiry aborts the in-flight call.
        let response = tokio::time::timeout(
            self.config.timeout(),
            self.http.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| PodNetError::Timeout {
            endpoint: endpoint.to_string(),
        })?
        .map_err(|e| PodNetError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: format!("request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PodNetError::Endpoint {
                endpoint: endpoint.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let envelope: RpcResponse =
            response.json().await.map_err(|e| PodNetError::Endpoint {
                endpoint: endpoint.to_string(),
                reason: format!("invalid JSON: {e}"),
            })?;

        if let Some(rpc_error) = envelope.error {
            return Err(PodNetError::Endpoint {
                endpoint: endpoint.to_string(),
                reason: format!("rpc error: {}", rpc_error.message),
            });
        }

        let result = envelope.result.ok_or_else(|| PodNetError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: "response carried no result".to_string(),
        })?;

        Ok(result.into_pods())
    }

    /// Never fails: on any refresh problem the last successfully fetched map
    /// is returned, or an empty map before the first success.
    pub async fn fetch_pod_credits(&self) -> HashMap<String, u64> {
        if let Some(map) = self.credits_cache.get_fresh().await {
            debug!(entries = map.len(), "Serving credits from cache");
            return map;
        }

        let _guard = self.credits_refresh.lock().await;
        if let Some(map) = self.credits_cache.get_fresh().await {
            return map;
        }

        match self.refresh_credits().await {
            Ok(map) => {
                self.credits_cache.set(map.clone()).await;
                map
            }
            Err(err) => {
                warn!(error = %err, "Credits fetch failed, serving last known map");
                self.credits_cache.get_any().await.unwrap_or_default()
            }
        }
    }

    async fn refresh_credits(&self) -> Result<HashMap<String, u64>, PodNetError> {
        let endpoint = &self.config.credits_endpoint;
        let response = tokio::time::timeout(self.config.timeout(), self.http.get(endpoint).send())
            .await
            .map_err(|_| PodNetError::Timeout {
                endpoint: endpoint.clone(),
            })?
            .map_err(|e| PodNetError::Endpoint {
                endpoint: endpoint.clone(),
                reason: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PodNetError::Endpoint {
                endpoint: endpoint.clone(),
                reason: format!("HTTP {status}"),
            });
        }

        let body: CreditsResponse =
            response.json().await.map_err(|e| PodNetError::Endpoint {
                endpoint: endpoint.clone(),
                reason: format!("invalid JSON: {e}"),
            })?;

        if body.status != "success" {
            return Err(PodNetError::Endpoint {
                endpoint: endpoint.clone(),
                reason: format!("credits status '{}'", body.status),
            });
        }

        let map = body.into_map();
        info!(entries = map.len(), "Refreshed pod credits");
        Ok(map)
    }

    /// Both feeds are fetched with their requests concurrently in flight; a
    /// credits failure degrades to the cached map and cannot fail the call.
    pub async fn fetch_pods_with_credits(&self) -> Result<PodsWithCredits, PodNetError> {
        let (snapshot, credits) = tokio::join!(self.fetch_pods(), self.fetch_pod_credits());
        Ok(PodsWithCredits {
            snapshot: snapshot?,
            credits,
        })
    }

    pub async fn fetch_pod_by_pubkey(&self, pubkey: &str) -> Result<Option<PNode>, PodNetError> {
        let snapshot = self.fetch_pods().await?;
        Ok(snapshot.pods.into_iter().find(|pod| pod.pubkey == pubkey))
    }

    /// Resets both cache slots; the next fetch of either feed hits the
    /// network.
    pub async fn clear_cache(&self) {
        self.pods_cache.clear().await;
        self.credits_cache.clear().await;
    }

    /// Age of the cached pod list, if any. Lets callers report "showing
    /// cached data from <time>" alongside a stale snapshot.
    pub async fn pods_cache_age(&self) -> Option<Duration> {
        self.pods_cache.age().await
    }
}
