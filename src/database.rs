mod mem_btree;
mod redb;
mod sled;

use crate::DatabaseType;
use crate::database::mem_btree::MemBTree;
use crate::database::redb::Redb;
use crate::database::sled::Sled;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

/// Flags applied to every put.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Force each write to be durable before it returns
    pub sync: bool,
    /// Ask the backend not to coalesce concurrent writes
    pub no_write_merge: bool,
}

/// Flags applied to every point lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Do not populate the backend read cache with the result
    pub dont_fill_cache: bool,
    /// A lookup of a missing key is reported as an error
    pub strict: bool,
}

/// Named counters reported by a backend. Opaque to the harness, only
/// carried into the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BackendStats(BTreeMap<String, u64>);

impl BackendStats {
    pub fn with(mut self, name: &str, value: u64) -> Self {
        self.0.insert(name.to_owned(), value);
        self
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Visitor handed to [`Database::scan`]. Returning `Break` ends the pass.
pub type ScanVisitor<'a> = dyn FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>> + 'a;

pub trait Database: Send + Sync {
    fn init(&self) -> Result<()>;
    fn get(&self, key: &[u8], opts: &ReadOptions) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8], opts: &WriteOptions) -> Result<()>;
    /// One forward pass over the whole key space in the backend's key order.
    /// Every call opens a fresh pass.
    fn scan(&self, visit: &mut ScanVisitor<'_>) -> Result<()>;
    /// Compact `[start, end)`; `None` bounds are open.
    fn compact_range(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<()>;
    fn stats(&self) -> Result<BackendStats>;
}

pub fn get_db(database: DatabaseType, dir: Option<&Path>) -> Result<Arc<dyn Database>> {
    let db: Arc<dyn Database> = match database {
        DatabaseType::MemBtree => Arc::new(MemBTree::default()),
        DatabaseType::Redb => Arc::new(Redb::open(dir)?),
        DatabaseType::Sled => Arc::new(Sled::open(dir)?),
    };
    db.init()?;
    Ok(db)
}

#[cfg(test)]
pub(crate) use mem_btree::MemBTree as TestDb;

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(db: &dyn Database) -> Result<()> {
        db.init()?;
        let wo = WriteOptions::default();
        for k in [3u8, 1, 2] {
            db.put(&[k], &[k, k], &wo)?;
        }
        db.put(&[2], &[9], &wo)?;

        let ro = ReadOptions::default();
        assert_eq!(db.get(&[2], &ro)?, Some(vec![9]));
        assert_eq!(db.get(&[7], &ro)?, None);
        let strict = ReadOptions { strict: true, ..ro };
        assert!(db.get(&[7], &strict).is_err());

        let mut keys = vec![];
        db.scan(&mut |k, _| {
            keys.push(k.to_vec());
            Ok(ControlFlow::Continue(()))
        })?;
        assert_eq!(keys, vec![vec![1], vec![2], vec![3]]);

        let mut first = None;
        db.scan(&mut |k, _| {
            first = Some(k.to_vec());
            Ok(ControlFlow::Break(()))
        })?;
        assert_eq!(first, Some(vec![1]));

        db.compact_range(None, None)?;
        assert_eq!(db.get(&[1], &ro)?, Some(vec![1, 1]));
        db.stats()?;
        Ok(())
    }

    #[test]
    fn mem_btree_contract() {
        exercise(&MemBTree::default()).unwrap();
    }

    #[test]
    fn mem_btree_counts_hits_and_misses() {
        let db = MemBTree::default();
        db.put(b"k", b"v", &WriteOptions::default()).unwrap();
        let ro = ReadOptions::default();
        db.get(b"k", &ro).unwrap();
        db.get(b"k", &ro).unwrap();
        db.get(b"nope", &ro).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.get("gets"), Some(3));
        assert_eq!(stats.get("hits"), Some(2));
        assert_eq!(stats.get("misses"), Some(1));
    }

    #[test]
    fn redb_contract() {
        let dir = tempfile::TempDir::new().unwrap();
        exercise(&Redb::open(Some(dir.path())).unwrap()).unwrap();
    }

    #[test]
    fn sled_contract() {
        exercise(&Sled::open(None).unwrap()).unwrap();
    }

    #[test]
    fn get_db_initializes() {
        let db = get_db(DatabaseType::Redb, None).unwrap();
        assert_eq!(db.get(b"missing", &ReadOptions::default()).unwrap(), None);
    }
}
