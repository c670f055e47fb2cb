//! Durable per-address cache backed by sled.
//!
//! The cache is the sole source of truth across runs: anything recorded here
//! is never re-fetched. Records are partial by design, a transaction count
//! lands first and the bytecode is merged in later, if the address ever
//! qualifies for a code fetch.

use std::path::Path;

use serde::{
    Deserialize,
    Serialize,
};
use sled::{
    Config as DbConfig,
    Db,
};

use crate::{
    LEAF_FANOUT,
    MIN_CODE_LEN,
};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache record codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// One cached record per contract address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub transaction_count: Option<u64>,
    pub bytecode: Option<String>,
}

impl CacheRecord {
    /// The stored bytecode, if it is long enough to be real deployed code.
    /// Short blobs ("0x", error placeholders) are treated as absent.
    pub fn valid_bytecode(&self) -> Option<&str> {
        self.bytecode
            .as_deref()
            .filter(|code| code.len() > MIN_CODE_LEN)
    }
}

/// Handle to the on-disk cache. Cloning shares the same sled instance.
#[derive(Debug, Clone)]
pub struct CodeCache {
    db: Db<LEAF_FANOUT>,
}

impl CodeCache {
    /// Open (or create) the cache at `path`. Failure here is fatal to the
    /// caller, nothing downstream can run without the cache.
    pub fn open(path: impl AsRef<Path>, cache_bytes: usize) -> Result<Self, CacheError> {
        let db: Db<LEAF_FANOUT> = DbConfig::new()
            .path(path.as_ref())
            .cache_capacity_bytes(cache_bytes)
            .open()?;
        Ok(Self { db })
    }

    pub fn get(&self, address: &str) -> Result<Option<CacheRecord>, CacheError> {
        match self.db.get(address.as_bytes())? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Record a transaction count. First write wins: an existing count is
    /// never overwritten, so re-recording the same address is a no-op.
    ///
    /// The merge is a read-then-insert, not an atomic sled operation. It
    /// relies on at most one writer per address at a time; the pipeline
    /// upholds this by deduplicating in-flight work per address.
    pub fn put_count(&self, address: &str, count: u64) -> Result<(), CacheError> {
        let mut record = self.get(address)?.unwrap_or_default();
        if record.transaction_count.is_some() {
            return Ok(());
        }
        record.transaction_count = Some(count);
        self.db
            .insert(address.as_bytes(), bincode::serialize(&record)?)?;
        Ok(())
    }

    /// Record bytecode and its transaction count as one unit. A reader never
    /// observes the code without its count.
    pub fn put_code(&self, address: &str, bytecode: &str, count: u64) -> Result<(), CacheError> {
        let record = CacheRecord {
            transaction_count: Some(count),
            bytecode: Some(bytecode.to_string()),
        };
        self.db
            .insert(address.as_bytes(), bincode::serialize(&record)?)?;
        Ok(())
    }

    /// Durably sync the cache. Called once on every exit path, including
    /// interrupt.
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn size_on_disk(&self) -> Result<u64, CacheError> {
        Ok(self.db.size_on_disk()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_cache() -> (TempDir, CodeCache) {
        let dir = TempDir::new().unwrap();
        let cache = CodeCache::open(dir.path(), 1024 * 1024).unwrap();
        (dir, cache)
    }

    fn long_code() -> String {
        format!("0x{}", "60".repeat(200))
    }

    #[test]
    fn get_missing_returns_none() {
        let (_dir, cache) = temp_cache();
        assert!(cache.get("0xAAA").unwrap().is_none());
    }

    #[test]
    fn put_count_is_idempotent() {
        let (_dir, cache) = temp_cache();

        cache.put_count("0xAAA", 42).unwrap();
        cache.put_count("0xAAA", 42).unwrap();

        let record = cache.get("0xAAA").unwrap().unwrap();
        assert_eq!(record.transaction_count, Some(42));
        assert_eq!(record.bytecode, None);
    }

    #[test]
    fn put_count_does_not_overwrite_existing() {
        let (_dir, cache) = temp_cache();

        cache.put_count("0xAAA", 42).unwrap();
        cache.put_count("0xAAA", 7).unwrap();

        let record = cache.get("0xAAA").unwrap().unwrap();
        assert_eq!(record.transaction_count, Some(42));
    }

    #[test]
    fn put_code_commits_both_fields_together() {
        let (_dir, cache) = temp_cache();
        let code = long_code();

        cache.put_code("0xAAA", &code, 42).unwrap();

        let record = cache.get("0xAAA").unwrap().unwrap();
        assert_eq!(record.transaction_count, Some(42));
        assert_eq!(record.bytecode.as_deref(), Some(code.as_str()));
    }

    #[test]
    fn short_bytecode_is_not_valid() {
        let record = CacheRecord {
            transaction_count: Some(42),
            bytecode: Some("0x".to_string()),
        };
        assert!(record.valid_bytecode().is_none());

        let record = CacheRecord {
            transaction_count: Some(42),
            bytecode: Some(long_code()),
        };
        assert!(record.valid_bytecode().is_some());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let code = long_code();

        {
            let cache = CodeCache::open(dir.path(), 1024 * 1024).unwrap();
            cache.put_code("0xAAA", &code, 42).unwrap();
            cache.put_count("0xBBB", 3).unwrap();
            cache.flush().unwrap();
        }

        let cache = CodeCache::open(dir.path(), 1024 * 1024).unwrap();
        let record = cache.get("0xAAA").unwrap().unwrap();
        assert_eq!(record.valid_bytecode(), Some(code.as_str()));
        assert_eq!(record.transaction_count, Some(42));
        assert_eq!(
            cache.get("0xBBB").unwrap().unwrap().transaction_count,
            Some(3)
        );
    }
}
