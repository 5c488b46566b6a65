use crate::database::{BackendStats, Database, ReadOptions, ScanVisitor, WriteOptions};
use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemBTree {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    puts: AtomicU64,
    gets: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    scans: AtomicU64,
    compactions: AtomicU64,
}

impl MemBTree {
    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Database for MemBTree {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn get(&self, key: &[u8], opts: &ReadOptions) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let value = self
            .data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            if opts.strict {
                bail!("key {} not found", hex::encode(key));
            }
        }
        Ok(value)
    }

    fn put(&self, key: &[u8], value: &[u8], _opts: &WriteOptions) -> Result<()> {
        self.data
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(Vec::from(key), Vec::from(value));
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn scan(&self, visit: &mut ScanVisitor<'_>) -> Result<()> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        for (k, v) in data.iter() {
            if visit(k, v)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn compact_range(&self, _start: Option<&[u8]>, _end: Option<&[u8]>) -> Result<()> {
        // nothing to reclaim in memory
        self.compactions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> Result<BackendStats> {
        Ok(BackendStats::default()
            .with("entries", self.len() as u64)
            .with("puts", self.puts.load(Ordering::Relaxed))
            .with("gets", self.gets.load(Ordering::Relaxed))
            .with("hits", self.hits.load(Ordering::Relaxed))
            .with("misses", self.misses.load(Ordering::Relaxed))
            .with("scans", self.scans.load(Ordering::Relaxed))
            .with("compactions", self.compactions.load(Ordering::Relaxed)))
    }
}
