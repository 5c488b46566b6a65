use crate::database::{BackendStats, Database, ReadOptions, ScanVisitor, WriteOptions};
use anyhow::{Result, bail};
use std::path::Path;
use tempfile::TempDir;

pub struct Sled {
    db: sled::Db,
    _f: Option<TempDir>,
}

impl Sled {
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let (f, db) = match dir {
            Some(d) => (None, sled::open(d)?),
            None => {
                let f = TempDir::new()?;
                let db = sled::open(f.path())?;
                (Some(f), db)
            }
        };
        Ok(Sled { db, _f: f })
    }
}

impl Database for Sled {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn get(&self, key: &[u8], opts: &ReadOptions) -> Result<Option<Vec<u8>>> {
        let value = self.db.get(key)?.map(|v| v.to_vec());
        if value.is_none() && opts.strict {
            bail!("key {} not found", hex::encode(key));
        }
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8], opts: &WriteOptions) -> Result<()> {
        self.db.insert(key, value)?;
        if opts.sync {
            self.db.flush()?;
        }
        Ok(())
    }

    fn scan(&self, visit: &mut ScanVisitor<'_>) -> Result<()> {
        for entry in self.db.iter() {
            let (k, v) = entry?;
            if visit(&k, &v)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn compact_range(&self, _start: Option<&[u8]>, _end: Option<&[u8]>) -> Result<()> {
        // sled compacts in the background; flushing is the closest
        // synchronous request it offers
        self.db.flush()?;
        Ok(())
    }

    fn stats(&self) -> Result<BackendStats> {
        Ok(BackendStats::default()
            .with("entries", self.db.len() as u64)
            .with("size_on_disk", self.db.size_on_disk()?))
    }
}
