use crate::database::Database;
use crate::executor::{Outcome, new_histogram};
use anyhow::Result;
use indicatif::ProgressBar;
use std::time::Instant;

/// Compacts the whole key range in the calling thread.
pub fn compact_all(db: &dyn Database, pb: &ProgressBar) -> Result<Outcome> {
    let mut latency_micro_sec = new_histogram()?;
    let start = Instant::now();
    db.compact_range(None, None)?;
    latency_micro_sec.saturating_record(start.elapsed().as_micros() as u64);
    pb.inc(1);
    Ok(Outcome {
        ops: 1,
        latency_micro_sec,
    })
}
