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

use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug)]
struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

/// Single-slot cache with a fixed time-to-live. Staleness is judged at read
/// time; `get_any` ignores the TTL so callers can fall back to the last
/// known-good value after a failed refresh.
#[derive(Debug)]
pub struct TtlSlot<T> {
    entry: RwLock<Option<Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlSlot<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_fresh(&self) -> Option<T> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    pub async fn get_any(&self) -> Option<T> {
        let entry = self.entry.read().await;
        entry.as_ref().map(|e| e.value.clone())
    }

    pub async fn set(&self, value: T) {
        let mut entry = self.entry.write().await;
        *entry = Some(Entry {
            value,
            fetched_at: Instant::now(),
        });
    }

    pub async fn clear(&self) {
        let mut entry = self.entry.write().await;
        *entry = None;
    }

    pub async fn age(&self) -> Option<Duration> {
        let entry = self.entry.read().await;
        entry.as_ref().map(|e| e.fetched_at.elapsed())
    }
}
