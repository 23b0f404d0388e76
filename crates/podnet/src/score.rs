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

//! X-Score: the canonical 0-100 composite health metric for a pod.
//!
//! Components and weights: credits 35 (full marks at 1000 credits), uptime
//! 25 (5 points per day of uptime), availability 25 (tiered by heartbeat
//! recency), committed storage 10 (full marks at 1 TB), public-access bonus
//! 5. The status classification used by list views is a separate function
//! with its own 120s/600s windows; the two threshold sets are not
//! interchangeable.

use std::collections::HashMap;

use crate::types::{PNode, PodStatus, ScoredPod};

pub const MAX_SCORE: u8 = 100;

const CREDITS_WEIGHT: f64 = 35.0;
const CREDITS_REFERENCE: f64 = 1000.0;
const UPTIME_WEIGHT: f64 = 25.0;
const UPTIME_POINTS_PER_DAY: f64 = 5.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const STORAGE_WEIGHT: f64 = 10.0;
const STORAGE_REFERENCE_BYTES: f64 = 1_000_000_000_000.0;
const PUBLIC_BONUS: f64 = 5.0;

const AVAILABILITY_TIERS: [(i64, f64); 4] = [(60, 25.0), (300, 20.0), (900, 15.0), (3600, 10.0)];
const AVAILABILITY_FLOOR: f64 = 5.0;

const ONLINE_WINDOW_SECS: i64 = 120;
const WARNING_WINDOW_SECS: i64 = 600;

/// Deterministic form: `now` is unix seconds supplied by the caller.
pub fn x_score_at(node: &PNode, credits: u64, now: i64) -> u8 {
    let credits_points = (credits as f64 / CREDITS_REFERENCE * CREDITS_WEIGHT).min(CREDITS_WEIGHT);
    let uptime_points =
        (node.uptime as f64 / SECONDS_PER_DAY * UPTIME_POINTS_PER_DAY).min(UPTIME_WEIGHT);
    let availability_points = availability_points(now - node.last_seen_timestamp);
    let storage_points =
        (node.storage_committed as f64 / STORAGE_REFERENCE_BYTES * STORAGE_WEIGHT).min(STORAGE_WEIGHT);
    let public_points = if node.is_public { PUBLIC_BONUS } else { 0.0 };

    let total =
        credits_points + uptime_points + availability_points + storage_points + public_points;
    total.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

pub fn x_score(node: &PNode, credits: u64) -> u8 {
    x_score_at(node, credits, unix_now())
}

fn availability_points(elapsed_secs: i64) -> f64 {
    for (window, points) in AVAILABILITY_TIERS {
        if elapsed_secs < window {
            return points;
        }
    }
    AVAILABILITY_FLOOR
}

/// Deterministic form of the list-view status classification.
pub fn status_at(last_seen_timestamp: i64, now: i64) -> PodStatus {
    let elapsed = now - last_seen_timestamp;
    if elapsed < ONLINE_WINDOW_SECS {
        PodStatus::Online
    } else if elapsed < WARNING_WINDOW_SECS {
        PodStatus::Warning
    } else {
        PodStatus::Offline
    }
}

pub fn status(last_seen_timestamp: i64) -> PodStatus {
    status_at(last_seen_timestamp, unix_now())
}

pub fn score_pod_at(node: PNode, credits: &HashMap<String, u64>, now: i64) -> ScoredPod {
    let pod_credits = credits.get(&node.pubkey).copied().unwrap_or(0);
    ScoredPod {
        x_score: x_score_at(&node, pod_credits, now),
        status: status_at(node.last_seen_timestamp, now),
        node,
    }
}

pub fn score_pods(pods: Vec<PNode>, credits: &HashMap<String, u64>) -> Vec<ScoredPod> {
    let now = unix_now();
    pods.into_iter()
        .map(|node| score_pod_at(node, credits, now))
        .collect()
}

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
