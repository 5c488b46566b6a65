use crate::database::Database;
use crate::error::BenchError;
use crate::executor::{Executor, Outcome};
use anyhow::Result;
use indicatif::ProgressBar;
use std::hint::black_box;
use std::ops::ControlFlow;
use tracing::debug;

/// Touches `limit` entries in the backend's key order, starting a new pass
/// whenever one runs out before the limit.
pub fn read(
    db: &dyn Database,
    executor: &Executor,
    limit: u64,
    phase: &str,
    pb: &ProgressBar,
) -> Result<Outcome> {
    executor.run(
        |admit| {
            let mut touched = 0u64;
            let mut passes = 0u64;
            while touched < limit {
                let before = touched;
                db.scan(&mut |k, v| {
                    admit.submit((k.to_vec(), v.to_vec()))?;
                    touched += 1;
                    Ok(if touched >= limit {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    })
                })?;
                passes += 1;
                if touched == before {
                    return Err(BenchError::EmptyKeySpace {
                        phase: phase.to_owned(),
                        done: touched,
                        limit,
                    }
                    .into());
                }
            }
            debug!(passes, touched, "sequential read finished");
            Ok(())
        },
        |(k, v): (Vec<u8>, Vec<u8>)| {
            black_box(k.len() + v.len());
            pb.inc(1);
            Ok(())
        },
    )
}
