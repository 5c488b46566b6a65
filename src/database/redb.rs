use crate::database::{BackendStats, ReadOptions, ScanVisitor, WriteOptions};
use anyhow::{Result, bail};
use redb::{Database, Durability, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};
use tempfile::TempDir;

static TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("data");

/// One write transaction per put. `WriteOptions::sync` picks the commit
/// durability; redb has no write merging to turn off.
pub struct Redb {
    // compaction needs exclusive access to the database handle
    db: RwLock<Database>,
    _dir: Option<TempDir>,
}

impl Redb {
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let (tmp, path) = match dir {
            Some(d) => {
                std::fs::create_dir_all(d)?;
                (None, d.join("data.redb"))
            }
            None => {
                let t = TempDir::new()?;
                let p = t.path().join("data.redb");
                (Some(t), p)
            }
        };
        let db = Database::create(&path)?;
        Ok(Redb {
            db: RwLock::new(db),
            _dir: tmp,
        })
    }

    fn db(&self) -> RwLockReadGuard<'_, Database> {
        self.db.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl crate::database::Database for Redb {
    fn init(&self) -> Result<()> {
        let tx = self.db().begin_write()?;
        {
            let _ = tx.open_table(TABLE)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, key: &[u8], opts: &ReadOptions) -> Result<Option<Vec<u8>>> {
        let tx = self.db().begin_read()?;
        let t = tx.open_table(TABLE)?;
        let value = t.get(key)?.map(|v| v.value().to_vec());
        if value.is_none() && opts.strict {
            bail!("key {} not found", hex::encode(key));
        }
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8], opts: &WriteOptions) -> Result<()> {
        let mut tx = self.db().begin_write()?;
        tx.set_durability(if opts.sync {
            Durability::Immediate
        } else {
            Durability::None
        })?;
        {
            let mut t = tx.open_table(TABLE)?;
            t.insert(key, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn scan(&self, visit: &mut ScanVisitor<'_>) -> Result<()> {
        let tx = self.db().begin_read()?;
        let t = tx.open_table(TABLE)?;
        for entry in t.iter()? {
            let (k, v) = entry?;
            if visit(k.value(), v.value())?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn compact_range(&self, _start: Option<&[u8]>, _end: Option<&[u8]>) -> Result<()> {
        // redb only compacts the whole file
        let mut db = self.db.write().unwrap_or_else(|e| e.into_inner());
        db.compact()?;
        Ok(())
    }

    fn stats(&self) -> Result<BackendStats> {
        let tx = self.db().begin_write()?;
        let s = tx.stats()?;
        tx.abort()?;
        Ok(BackendStats::default()
            .with("tree_height", s.tree_height() as u64)
            .with("allocated_pages", s.allocated_pages())
            .with("leaf_pages", s.leaf_pages())
            .with("branch_pages", s.branch_pages())
            .with("stored_bytes", s.stored_bytes())
            .with("metadata_bytes", s.metadata_bytes())
            .with("fragmented_bytes", s.fragmented_bytes())
            .with("page_size", s.page_size() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database as _;

    #[test]
    fn put_honours_both_sync_settings() {
        let dir = TempDir::new().unwrap();
        let lazy = WriteOptions::default();
        let durable = WriteOptions {
            sync: true,
            ..lazy
        };
        {
            let db = Redb::open(Some(dir.path())).unwrap();
            db.init().unwrap();
            db.put(b"lazy", b"1", &lazy).unwrap();
            db.put(b"durable", b"2", &durable).unwrap();
            let ro = ReadOptions::default();
            assert_eq!(db.get(b"lazy", &ro).unwrap(), Some(b"1".to_vec()));
            assert_eq!(db.get(b"durable", &ro).unwrap(), Some(b"2".to_vec()));
        }

        // the durable commit also persists the earlier non-durable one
        let db = Redb::open(Some(dir.path())).unwrap();
        let ro = ReadOptions::default();
        assert_eq!(db.get(b"lazy", &ro).unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.get(b"durable", &ro).unwrap(), Some(b"2".to_vec()));
    }
}
