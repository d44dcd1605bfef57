// streamchat - A terminal chat client for streaming model endpoints
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Best-effort local cache of conversation transcripts.
//!
//! Entries live under `conv_<id>` as `{"messages": [..], "timestamp": ms}`.
//! Every failure degrades to a miss: callers never see a cache error.

use super::local::KeyValueStore;
use crate::backend::StoredMessage;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const CACHE_PREFIX: &str = "conv_";
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Entries strictly older than this are treated as absent.
    pub ttl_ms: u64,
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { ttl_ms: DEFAULT_TTL_MS, max_entries: DEFAULT_MAX_ENTRIES }
    }
}

pub trait Clock {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    messages: Vec<StoredMessage>,
    timestamp: u64,
}

pub struct ConversationCache {
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    policy: CachePolicy,
}

impl ConversationCache {
    pub fn new(store: Box<dyn KeyValueStore>, clock: Box<dyn Clock>, policy: CachePolicy) -> Self {
        Self { store, clock, policy }
    }

    /// Fresh messages for `id`. Expired and corrupt entries are deleted.
    pub fn get(&mut self, id: &str) -> Option<Vec<StoredMessage>> {
        let key = cache_key(id);
        let raw = self.store.get(&key)?;
        let record = match serde_json::from_str::<CacheRecord>(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(conversation_id = id, "dropping corrupt cache entry: {e}");
                self.remove_key(&key);
                return None;
            }
        };
        if self.is_expired(record.timestamp) {
            tracing::debug!(conversation_id = id, "cache entry expired");
            self.remove_key(&key);
            return None;
        }
        Some(record.messages)
    }

    /// Replace the entry for `id` with a fresh timestamp, then prune.
    pub fn put(&mut self, id: &str, messages: Vec<StoredMessage>) {
        let record = CacheRecord { messages, timestamp: self.clock.now_millis() };
        match serde_json::to_string(&record) {
            Ok(raw) => {
                if let Err(e) = self.store.set(&cache_key(id), raw) {
                    tracing::warn!(conversation_id = id, "cache write failed: {e:#}");
                }
            }
            Err(e) => tracing::warn!(conversation_id = id, "cache entry not serializable: {e}"),
        }
        self.evict_expired_or_excess();
    }

    /// Extend an existing fresh entry. Without one nothing is written: a
    /// partial transcript must not masquerade as the whole conversation.
    pub fn append(&mut self, id: &str, messages: &[StoredMessage]) {
        if let Some(mut cached) = self.get(id) {
            cached.extend_from_slice(messages);
            self.put(id, cached);
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.remove_key(&cache_key(id));
    }

    /// Drop expired and unreadable entries, then the oldest until at most
    /// `max_entries` remain.
    pub fn evict_expired_or_excess(&mut self) {
        let mut live: Vec<(u64, String)> = Vec::new();
        for key in self.store.keys() {
            if !key.starts_with(CACHE_PREFIX) {
                continue;
            }
            let timestamp = self
                .store
                .get(&key)
                .and_then(|raw| serde_json::from_str::<CacheRecord>(&raw).ok())
                .map(|record| record.timestamp);
            match timestamp {
                Some(ts) if !self.is_expired(ts) => live.push((ts, key)),
                _ => self.remove_key(&key),
            }
        }

        if live.len() <= self.policy.max_entries {
            return;
        }
        live.sort();
        let excess = live.len() - self.policy.max_entries;
        for (_, key) in live.into_iter().take(excess) {
            tracing::debug!(key, "evicting oldest cache entry");
            self.remove_key(&key);
        }
    }

    /// Ids of all entries currently stored, fresh or not.
    #[cfg(test)]
    fn cached_ids(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(CACHE_PREFIX).map(str::to_owned))
            .collect()
    }

    fn is_expired(&self, timestamp: u64) -> bool {
        self.clock.now_millis().saturating_sub(timestamp) > self.policy.ttl_ms
    }

    fn remove_key(&mut self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, "cache removal failed: {e:#}");
        }
    }
}

fn cache_key(id: &str) -> String {
    format!("{CACHE_PREFIX}{id}")
}
