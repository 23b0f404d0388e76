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

use serde::Serialize;
use std::collections::HashMap;

use crate::score;
use crate::types::{PNode, PodStatus};

/// Headline numbers over one fetched pod list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub total_pods: usize,
    pub online: usize,
    pub warning: usize,
    pub offline: usize,
    pub public_pods: usize,
    pub storage_committed: u64,
    pub storage_used: u64,
    pub average_x_score: f64,
}

impl NetworkSummary {
    pub fn from_pods_at(pods: &[PNode], credits: &HashMap<String, u64>, now: i64) -> Self {
        let mut online = 0;
        let mut warning = 0;
        let mut offline = 0;
        let mut public_pods = 0;
        let mut storage_committed: u64 = 0;
        let mut storage_used: u64 = 0;
        let mut score_total: u64 = 0;

        for pod in pods {
            match score::status_at(pod.last_seen_timestamp, now) {
                PodStatus::Online => online += 1,
                PodStatus::Warning => warning += 1,
                PodStatus::Offline => offline += 1,
            }
            if pod.is_public {
                public_pods += 1;
            }
            storage_committed = storage_committed.saturating_add(pod.storage_committed);
            storage_used = storage_used.saturating_add(pod.storage_used);
            let pod_credits = credits.get(&pod.pubkey).copied().unwrap_or(0);
            score_total += u64::from(score::x_score_at(pod, pod_credits, now));
        }

        let average_x_score = if pods.is_empty() {
            0.0
        } else {
            score_total as f64 / pods.len() as f64
        };

        Self {
            total_pods: pods.len(),
            online,
            warning,
            offline,
            public_pods,
            storage_committed,
            storage_used,
            average_x_score,
        }
    }

    pub fn from_pods(pods: &[PNode], credits: &HashMap<String, u64>) -> Self {
        Self::from_pods_at(pods, credits, score::unix_now())
    }
}
