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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodNetError {
    #[error("Request to '{endpoint}' timed out")]
    Timeout { endpoint: String },
    #[error("Endpoint '{endpoint}' failed: {reason}")]
    Endpoint { endpoint: String, reason: String },
    #[error("HTTP client error")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Node data unavailable: {detail}")]
    DataUnavailable { detail: String },
}
