use crate::database::{Database, ReadOptions};
use crate::error::BenchError;
use crate::executor::{Executor, Outcome};
use crate::registry::KnownKeys;
use anyhow::Result;
use indicatif::ProgressBar;

/// Issues `limit` point lookups, cycling through the registered keys.
pub fn read(
    db: &dyn Database,
    known: &KnownKeys,
    executor: &Executor,
    opts: &ReadOptions,
    limit: u64,
    phase: &str,
    pb: &ProgressBar,
) -> Result<Outcome> {
    if known.is_empty() && limit > 0 {
        return Err(BenchError::EmptyKeySpace {
            phase: phase.to_owned(),
            done: 0,
            limit,
        }
        .into());
    }
    let keys = known.snapshot();
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    executor.run(
        |admit| {
            for key in keys.iter().cycle().take(limit) {
                admit.submit(key.as_slice())?;
            }
            Ok(())
        },
        |key| {
            db.get(key, opts)?;
            pb.inc(1);
            Ok(())
        },
    )
}
