// SPDX-License-Identifier: MIT

//! TTL-bounded snapshot storage
//!
//! One store holds, per key, the most recent snapshots (newest first, capped
//! at the history limit). Expired entries are dropped lazily by whichever call
//! touches the store next; there is no background sweep.

use super::snapshot::Snapshot;
use crate::datasync::config::EngineConfig;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

type Entries<T> = HashMap<String, VecDeque<Snapshot<T>>>;

/// Thread-safe keyed snapshot history
///
/// All mutation happens under one lock, so `put` and eviction are atomic per
/// key. Reads return `None`/empty for unknown or expired keys.
#[derive(Debug)]
pub struct SnapshotStore<T> {
    ttl: TimeDelta,
    history_limit: usize,
    entries: Mutex<Entries<T>>,
}

impl<T: Clone> SnapshotStore<T> {
    /// A store keeping up to `history_limit` entries per key for `ttl`
    pub fn new(ttl: Duration, history_limit: usize) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            history_limit: history_limit.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn for_change_detection(config: &EngineConfig) -> Self {
        Self::new(config.change_detection_ttl(), config.history_limit)
    }

    pub fn for_failures(config: &EngineConfig) -> Self {
        Self::new(config.failure_ttl(), config.history_limit)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Record `value` under `key` now; `None` is a no-op
    pub fn put(&self, key: &str, value: Option<T>) -> Option<Uuid> {
        self.put_at(key, value, Utc::now())
    }

    /// Record `value` under `key` with an explicit creation time
    ///
    /// Only the history of `key` is expired during the insert, judged from
    /// `created_at`, so history can be replayed at a fixed clock without
    /// touching other keys. Returns `None` when the snapshot is older than
    /// every entry a full history keeps, since it is dropped straight away.
    pub fn put_at(&self, key: &str, value: Option<T>, created_at: DateTime<Utc>) -> Option<Uuid> {
        let value = value?;
        let snapshot = Snapshot::new(key, value, created_at);
        let id = snapshot.id;

        let mut entries = self.lock();
        let history = entries.entry(key.to_string()).or_default();
        let evicted = self.expire(history, created_at);
        if evicted > 0 {
            log::debug!("Evicted {} expired snapshot(s) for '{}'", evicted, key);
        }

        let position = history
            .iter()
            .position(|s| s.created_at <= created_at)
            .unwrap_or(history.len());
        if position >= self.history_limit {
            log::debug!("Snapshot for '{}' is older than the kept history", key);
            return None;
        }
        history.insert(position, snapshot);
        history.truncate(self.history_limit);
        Some(id)
    }

    /// Snapshot by id
    pub fn get(&self, id: Uuid) -> Option<Snapshot<T>> {
        let mut entries = self.lock();
        self.evict(&mut entries, Utc::now());
        entries
            .values()
            .flat_map(|history| history.iter())
            .find(|s| s.id == id)
            .cloned()
    }

    /// Newest snapshot for `key`
    pub fn latest(&self, key: &str) -> Option<Snapshot<T>> {
        self.latest_at(key, Utc::now())
    }

    /// Newest snapshot for `key`, expiring relative to `now`
    pub fn latest_at(&self, key: &str, now: DateTime<Utc>) -> Option<Snapshot<T>> {
        self.recent_at(key, 1, now).into_iter().next()
    }

    /// Up to `limit` snapshots for `key`, newest first
    pub fn recent(&self, key: &str, limit: usize) -> Vec<Snapshot<T>> {
        self.recent_at(key, limit, Utc::now())
    }

    pub fn recent_at(&self, key: &str, limit: usize, now: DateTime<Utc>) -> Vec<Snapshot<T>> {
        let mut entries = self.lock();
        self.evict(&mut entries, now);
        entries
            .get(key)
            .map(|history| history.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Newest snapshot of every key
    pub fn latest_for_all_keys(&self) -> BTreeMap<String, Snapshot<T>> {
        let mut entries = self.lock();
        self.evict(&mut entries, Utc::now());
        entries
            .iter()
            .filter_map(|(key, history)| history.front().map(|s| (key.clone(), s.clone())))
            .collect()
    }

    /// Number of live snapshots across all keys
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        self.evict(&mut entries, Utc::now());
        entries.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every snapshot older than the TTL as seen from `now`
    fn evict(&self, entries: &mut Entries<T>, now: DateTime<Utc>) {
        let mut evicted = 0;
        entries.retain(|_, history| {
            evicted += self.expire(history, now);
            !history.is_empty()
        });

        if evicted > 0 {
            log::debug!("Evicted {} expired snapshot(s)", evicted);
        }
    }

    /// Expire one key's history; returns how many snapshots went
    fn expire(&self, history: &mut VecDeque<Snapshot<T>>, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.ttl) else {
            return 0;
        };
        let before = history.len();
        history.retain(|s| s.created_at >= cutoff);
        before - history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> SnapshotStore<i32> {
        SnapshotStore::new(Duration::from_secs(60), 3)
    }

    #[test]
    fn test_put_none_is_noop() {
        let store = store();
        assert!(store.put("k", None).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_latest_overwrites() {
        let store = store();
        store.put("k", Some(1));
        store.put("k", Some(2));
        assert_eq!(store.latest("k").map(|s| s.value), Some(2));
        assert!(store.latest("other").is_none());
    }

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let store = store();
        let now = Utc::now();
        for i in 0..5 {
            store.put_at("k", Some(i), now - TimeDelta::seconds(10 - i as i64));
        }
        let values: Vec<i32> = store.recent("k", 10).into_iter().map(|s| s.value).collect();
        assert_eq!(values, vec![4, 3, 2]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_out_of_order_put_is_sorted() {
        let store = store();
        let now = Utc::now();
        store.put_at("k", Some(1), now - TimeDelta::seconds(5));
        store.put_at("k", Some(2), now - TimeDelta::seconds(20));
        store.put_at("k", Some(3), now - TimeDelta::seconds(10));
        let values: Vec<i32> = store.recent("k", 3).into_iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1, 3, 2]);
    }

    #[test]
    fn test_expired_entries_vanish_on_read() {
        let store = store();
        let stale = store.put_at("k", Some(1), Utc::now() - TimeDelta::seconds(61)).unwrap();
        assert!(store.get(stale).is_none());
        assert!(store.latest("k").is_none());
        assert!(store.latest_for_all_keys().is_empty());
    }

    #[test]
    fn test_expiry_relative_to_given_instant() {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.put_at("k", Some(1), t0);
        assert_eq!(store.latest_at("k", t0 + TimeDelta::seconds(30)).map(|s| s.value), Some(1));
        assert!(store.latest_at("k", t0 + TimeDelta::seconds(61)).is_none());
    }

    #[test]
    fn test_put_at_leaves_other_keys_alone() {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.put_at("a", Some(1), t0);
        store.put_at("b", Some(2), t0 + TimeDelta::hours(1));

        assert_eq!(store.latest_at("a", t0).map(|s| s.value), Some(1));
        assert_eq!(store.recent_at("a", 3, t0 + TimeDelta::seconds(30)).len(), 1);
    }

    #[test]
    fn test_put_at_expires_the_written_key() {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.put_at("k", Some(1), t0);
        store.put_at("k", Some(2), t0 + TimeDelta::seconds(90));

        let values: Vec<i32> = store
            .recent_at("k", 3, t0 + TimeDelta::seconds(90))
            .into_iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec![2]);
    }

    #[test]
    fn test_put_older_than_full_history_is_dropped() {
        let store = store();
        let now = Utc::now();
        for i in 0..3 {
            store.put_at("k", Some(i), now - TimeDelta::seconds(i as i64));
        }
        assert!(store
            .put_at("k", Some(9), now - TimeDelta::seconds(30))
            .is_none());

        let values: Vec<i32> = store.recent("k", 5).into_iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0, 1, 2]);
        assert!(store.put_at("k", Some(5), now - TimeDelta::milliseconds(500)).is_some());
    }

    #[test]
    fn test_get_by_id_and_all_keys() {
        let store = store();
        let a = store.put("a", Some(1)).unwrap();
        store.put("b", Some(2));
        store.put("b", Some(3));

        assert_eq!(store.get(a).map(|s| s.key), Some("a".to_string()));
        let latest = store.latest_for_all_keys();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["b"].value, 3);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_config_constructors() {
        let config = EngineConfig {
            history_limit: 2,
            ..EngineConfig::default()
        };
        let store: SnapshotStore<i32> = SnapshotStore::for_failures(&config);
        assert_eq!(store.history_limit(), 2);
        assert_eq!(store.ttl, TimeDelta::seconds(3_600));
    }

    #[test]
    fn test_concurrent_puts() {
        let store = SnapshotStore::new(Duration::from_secs(60), 5);
        std::thread::scope(|scope| {
            for t in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..50 {
                        store.put(&format!("k{}", t % 4), Some(i));
                    }
                });
            }
        });
        assert_eq!(store.latest_for_all_keys().len(), 4);
        assert_eq!(store.len(), 20);
    }
}
