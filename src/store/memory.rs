// In-process key-value store with per-key expiry
// Author: kelexine (https://github.com/kelexine)

use super::{clamp_ttl, KvStore, ScanPage};
use crate::error::{ProxyError, Result};
use async_trait::async_trait;
use moka::sync::Cache;
use moka::Expiry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry bound used by [`MemoryStore::new`].
pub const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// Open scan cursors kept at once.
const MAX_OPEN_CURSORS: u64 = 4096;

/// Scan cursors untouched for this long are dropped.
const CURSOR_IDLE: Duration = Duration::from_secs(60);

#[derive(Debug)]
enum StoredValue {
    Text(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug)]
struct Entry {
    value: StoredValue,
    ttl: Duration,
}

/// Every write carries its own TTL; reads never extend it.
struct EntryTtl;

impl Expiry<String, Arc<Entry>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Arc<Entry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Arc<Entry>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Keys of an unfinished scan, sorted, resuming at `offset`.
#[derive(Debug, Clone)]
struct ScanSnapshot {
    keys: Arc<[String]>,
    offset: usize,
}

/// Single-process store on a bounded `moka` cache.
///
/// Expired entries are invisible at once and reclaimed by the cache's own
/// housekeeping; the entry bound evicts the coldest keys first. A scan
/// snapshots the matching keys on cursor 0 and later pages skip keys deleted
/// in between. Not shared between processes.
pub struct MemoryStore {
    entries: Cache<String, Arc<Entry>>,
    cursors: Cache<u64, ScanSnapshot>,
    next_cursor: AtomicU64,
    // HSET is read-merge-write
    hash_writes: Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Store holding at most `max_entries` live keys.
    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries.max(1))
            .expire_after(EntryTtl)
            .build();
        let cursors = Cache::builder()
            .max_capacity(MAX_OPEN_CURSORS)
            .time_to_idle(CURSOR_IDLE)
            .build();
        Self {
            entries,
            cursors,
            next_cursor: AtomicU64::new(0),
            hash_writes: Mutex::new(()),
        }
    }

    /// Number of entries held in memory after pending housekeeping ran.
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    fn insert(&self, key: &str, value: StoredValue, ttl: Duration) {
        let entry = Entry {
            value,
            ttl: clamp_ttl(ttl),
        };
        self.entries.insert(key.to_string(), Arc::new(entry));
    }

    /// Serve one page from a snapshot, registering a cursor for the rest.
    fn page(&self, snapshot: ScanSnapshot, count: usize) -> ScanPage {
        let mut keys = Vec::with_capacity(count);
        let mut offset = snapshot.offset;
        while offset < snapshot.keys.len() && keys.len() < count {
            let key = &snapshot.keys[offset];
            offset += 1;
            if self.entries.contains_key(key) {
                keys.push(key.clone());
            }
        }

        if offset >= snapshot.keys.len() {
            return ScanPage { cursor: 0, keys };
        }
        let cursor = self.next_cursor.fetch_add(1, Ordering::Relaxed) + 1;
        self.cursors.insert(
            cursor,
            ScanSnapshot {
                keys: snapshot.keys,
                offset,
            },
        );
        ScanPage { cursor, keys }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key).as_deref().map(|entry| &entry.value) {
            Some(StoredValue::Text(value)) => Ok(Some(value.clone())),
            Some(StoredValue::Hash(_)) => Err(ProxyError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.insert(key, StoredValue::Text(value.to_string()), ttl);
        Ok(())
    }

    async fn hset_ex(&self, key: &str, fields: &[(&str, &str)], ttl: Duration) -> Result<()> {
        let _guard = self.hash_writes.lock();

        // HSET merges into a live hash and replaces anything expired
        let mut hash = match self.entries.get(key).as_deref().map(|entry| &entry.value) {
            Some(StoredValue::Hash(existing)) => existing.clone(),
            Some(StoredValue::Text(_)) => return Err(ProxyError::WrongType(key.to_string())),
            None => HashMap::new(),
        };
        for (field, value) in fields {
            hash.insert((*field).to_string(), (*value).to_string());
        }

        self.insert(key, StoredValue::Hash(hash), ttl);
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        match self.entries.get(key).as_deref().map(|entry| &entry.value) {
            Some(StoredValue::Hash(hash)) => Ok(hash.clone()),
            Some(StoredValue::Text(_)) => Err(ProxyError::WrongType(key.to_string())),
            None => Ok(HashMap::new()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut removed = 0;
        for key in keys {
            if self.entries.contains_key(key) {
                removed += 1;
            }
            self.entries.invalidate(key);
        }
        Ok(removed)
    }

    async fn scan(&self, cursor: u64, prefix: &str, count: usize) -> Result<ScanPage> {
        let snapshot = if cursor == 0 {
            let mut keys: Vec<String> = self
                .entries
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, _)| (*key).clone())
                .collect();
            keys.sort_unstable();
            ScanSnapshot {
                keys: keys.into(),
                offset: 0,
            }
        } else {
            self.cursors.remove(&cursor).ok_or_else(|| {
                ProxyError::Store(format!("scan cursor {} is unknown or expired", cursor))
            })?
        };

        Ok(self.page(snapshot, count.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn settled_count(store: &MemoryStore) -> u64 {
        // Housekeeping works in batches
        for _ in 0..20 {
            if store.entry_count() == 0 {
                break;
            }
        }
        store.entry_count()
    }

    #[tokio::test]
    async fn test_string_round_trip_and_expiry() {
        let store = MemoryStore::new();
        store.set_ex("a", "1", TTL).await.unwrap();
        store.set_ex("b", "2", Duration::from_millis(20)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert!(store.exists("b").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("b").await.unwrap(), None);
        assert!(!store.exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entries_are_reclaimed_without_scans() {
        let store = MemoryStore::new();
        for i in 0..1_000 {
            store
                .set_ex(&format!("sig:thinking:{}", i), "v", Duration::from_millis(1))
                .await
                .unwrap();
        }

        // Expiry is tracked at roughly one-second granularity
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(settled_count(&store), 0);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let store = MemoryStore::with_capacity(100);
        for i in 0..1_000 {
            store.set_ex(&format!("k:{}", i), "v", TTL).await.unwrap();
        }
        for _ in 0..20 {
            store.entry_count();
        }
        assert!(store.entry_count() <= 100);
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let store = MemoryStore::new();
        store.set_ex("forever", "v", Duration::MAX).await.unwrap();
        store
            .hset_ex("forever:h", &[("family", "gemini")], Duration::MAX)
            .await
            .unwrap();

        assert_eq!(store.get("forever").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.hget_all("forever:h").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hash_merge_and_wrong_type() {
        let store = MemoryStore::new();
        store.hset_ex("h", &[("family", "gemini")], TTL).await.unwrap();
        store.hset_ex("h", &[("cached_at", "now")], TTL).await.unwrap();

        let hash = store.hget_all("h").await.unwrap();
        assert_eq!(hash.len(), 2);
        assert_eq!(hash["family"], "gemini");

        assert!(matches!(store.get("h").await, Err(ProxyError::WrongType(_))));
        store.set_ex("s", "x", TTL).await.unwrap();
        assert!(matches!(store.hget_all("s").await, Err(ProxyError::WrongType(_))));
        assert!(matches!(
            store.hset_ex("s", &[("f", "v")], TTL).await,
            Err(ProxyError::WrongType(_))
        ));
        assert!(store.hget_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_del_counts_existing_keys() {
        let store = MemoryStore::new();
        store.set_ex("a", "1", TTL).await.unwrap();
        store.set_ex("b", "2", TTL).await.unwrap();

        let removed = store
            .del(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(!store.exists("a").await.unwrap());
        assert_eq!(store.del(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scan_pages_through_prefix() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.set_ex(&format!("p:{}", i), "v", TTL).await.unwrap();
        }
        store.set_ex("q:0", "v", TTL).await.unwrap();
        store.set_ex("o:0", "v", TTL).await.unwrap();

        let mut cursor = 0;
        let mut seen = Vec::new();
        loop {
            let page = store.scan(cursor, "p:", 2).await.unwrap();
            assert!(page.keys.len() <= 2);
            seen.extend(page.keys);
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen, vec!["p:0", "p:1", "p:2", "p:3", "p:4"]);
    }

    #[tokio::test]
    async fn test_scan_survives_deletes_between_pages() {
        let store = MemoryStore::new();
        for i in 0..7 {
            store.set_ex(&format!("p:{}", i), "v", TTL).await.unwrap();
        }

        let mut cursor = 0;
        let mut deleted = 0;
        loop {
            let page = store.scan(cursor, "p:", 3).await.unwrap();
            deleted += store.del(&page.keys).await.unwrap();
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(deleted, 7);
        assert_eq!(store.scan(0, "p:", 10).await.unwrap(), ScanPage::default());
    }

    #[tokio::test]
    async fn test_scan_in_progress_outlives_other_cursors() {
        let store = MemoryStore::new();
        for i in 0..4 {
            store.set_ex(&format!("p:{}", i), "v", TTL).await.unwrap();
        }

        let first = store.scan(0, "p:", 1).await.unwrap();
        assert_ne!(first.cursor, 0);
        // Many abandoned scans opened in the meantime
        for _ in 0..2_000 {
            store.scan(0, "p:", 1).await.unwrap();
        }

        let mut cursor = first.cursor;
        let mut seen = first.keys;
        while cursor != 0 {
            let page = store.scan(cursor, "p:", 1).await.unwrap();
            seen.extend(page.keys);
            cursor = page.cursor;
        }
        assert_eq!(seen, vec!["p:0", "p:1", "p:2", "p:3"]);
    }

    #[tokio::test]
    async fn test_unknown_cursor_is_an_error() {
        let store = MemoryStore::new();
        store.set_ex("p:0", "v", TTL).await.unwrap();
        assert!(matches!(
            store.scan(42, "p:", 10).await,
            Err(ProxyError::Store(_))
        ));
    }
}
