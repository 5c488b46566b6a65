use crate::database::{ReadOptions, WriteOptions};
use crate::error::BenchError;
use anyhow::{Result, ensure};

/// Shorter keys cannot hold a whole sequential index.
pub const MIN_KEY_SIZE: usize = 8;
/// Hashed keys are truncated SHA-1 digests.
pub const MAX_KEY_SIZE: usize = 20;

/// Parameters of one benchmark run. Built once at startup and only read
/// afterwards.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Byte length of every generated key
    pub key_size: usize,
    pub small_value_size: usize,
    pub large_value_size: usize,
    /// Entries written by each small fill/overwrite phase
    pub small_fill_limit: u64,
    /// Entries written by each large fill/overwrite phase
    pub large_fill_limit: u64,
    /// Touches performed by each read phase
    pub read_limit: u64,
    /// Maximum operations in flight at once
    pub parallelism: usize,
    /// Seed of the value byte source
    pub seed: u64,
    pub write: WriteOptions,
    pub read: ReadOptions,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig {
            key_size: 8,
            small_value_size: 32,
            large_value_size: 102_400,
            small_fill_limit: 1_000_000,
            large_fill_limit: 2_000,
            read_limit: 10_000_000,
            parallelism: 1,
            seed: 1,
            write: WriteOptions::default(),
            read: ReadOptions::default(),
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| BenchError::InvalidConfig(msg.to_owned());
        ensure!(
            (MIN_KEY_SIZE..=MAX_KEY_SIZE).contains(&self.key_size),
            invalid(&format!(
                "key size must be between {MIN_KEY_SIZE} and {MAX_KEY_SIZE} bytes"
            ))
        );
        ensure!(
            self.small_value_size > 0 && self.large_value_size > 0,
            invalid("value sizes must be larger than 0")
        );
        ensure!(
            self.parallelism > 0,
            invalid("degree of parallelism must be at least 1")
        );
        ensure!(
            self.read_limit == 0 || self.small_fill_limit + self.large_fill_limit > 0,
            invalid("reads need at least one fill phase to write data")
        );
        Ok(())
    }
}
