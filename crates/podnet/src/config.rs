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

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::PodNetError;

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CACHE_TTL_MS: u64 = 30_000;

pub const ENDPOINTS_ENV: &str = "PODNET_ENDPOINTS";
pub const CREDITS_ENDPOINT_ENV: &str = "PODNET_CREDITS_ENDPOINT";
pub const TIMEOUT_ENV: &str = "PODNET_TIMEOUT_MS";
pub const CACHE_TTL_ENV: &str = "PODNET_CACHE_TTL_MS";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// RPC endpoint base URLs, in priority order.
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub credits_endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            credits_endpoint: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

impl ClientConfig {
    pub fn load_from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Builds a config from the environment alone.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overrides any field present in the environment. `PODNET_ENDPOINTS` is
    /// a comma-separated list, highest priority first.
    pub fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var(ENDPOINTS_ENV) {
            let endpoints: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !endpoints.is_empty() {
                self.endpoints = endpoints;
            }
        }
        if let Ok(raw) = std::env::var(CREDITS_ENDPOINT_ENV) {
            if !raw.trim().is_empty() {
                self.credits_endpoint = raw.trim().to_string();
            }
        }
        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            if let Ok(ms) = raw.trim().parse() {
                self.timeout_ms = ms;
            }
        }
        if let Ok(raw) = std::env::var(CACHE_TTL_ENV) {
            if let Ok(ms) = raw.trim().parse() {
                self.cache_ttl_ms = ms;
            }
        }
    }

    pub fn validate(&self) -> std::result::Result<(), PodNetError> {
        if self.endpoints.is_empty() {
            return Err(PodNetError::Configuration(
                "at least one RPC endpoint is required".to_string(),
            ));
        }
        if self.credits_endpoint.trim().is_empty() {
            return Err(PodNetError::Configuration(
                "a credits endpoint is required".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(PodNetError::Configuration(
                "timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}
