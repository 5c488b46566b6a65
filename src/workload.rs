//! The benchmark script and the runner that executes it.
//!
//! A run is an ordered list of [`Phase`]s. Phases never overlap; inside a
//! phase the per-item operations go through the shared [`Executor`].

pub mod compact;
pub mod fill;
pub mod random_read;
pub mod seq_read;

use crate::config::WorkloadConfig;
use crate::database::Database;
use crate::error::BenchError;
use crate::executor::{Executor, Outcome};
use crate::generator::{KeyMode, KeySpace};
use crate::progress::phase_bar;
use crate::registry::KnownKeys;
use crate::report::{PhaseResult, Report};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Indices `start..start + count`, each written with a `value_size` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSpec {
    pub start: u64,
    pub count: u64,
    pub value_size: usize,
    pub mode: KeyMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOp {
    Write(WriteSpec),
    /// Touch `limit` entries in key order
    SequentialRead { limit: u64 },
    /// Look up `limit` registered keys
    RandomRead { limit: u64 },
    /// Compact the whole key range
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub description: &'static str,
    pub op: PhaseOp,
}

impl Phase {
    /// Operation count reported for the phase.
    pub fn op_count(&self) -> u64 {
        match self.op {
            PhaseOp::Write(w) => w.count,
            PhaseOp::SequentialRead { limit } | PhaseOp::RandomRead { limit } => limit,
            PhaseOp::Compact => 1,
        }
    }
}

/// The fixed benchmark sequence for `config`.
pub fn script(config: &WorkloadConfig) -> Vec<Phase> {
    let small = |mode| {
        PhaseOp::Write(WriteSpec {
            start: 0,
            count: config.small_fill_limit,
            value_size: config.small_value_size,
            mode,
        })
    };
    // large keys start past the small range so the two sets stay apart
    let large = PhaseOp::Write(WriteSpec {
        start: config.small_fill_limit * 2,
        count: config.large_fill_limit,
        value_size: config.large_value_size,
        mode: KeyMode::Hashed,
    });
    let seq_read = PhaseOp::SequentialRead {
        limit: config.read_limit,
    };
    let phase = |description, op| Phase { description, op };

    vec![
        phase("small seq fill", small(KeyMode::Sequential)),
        phase("small seq overwrite", small(KeyMode::Sequential)),
        phase("small rand fill", small(KeyMode::Hashed)),
        phase("small rand overwrite", small(KeyMode::Hashed)),
        phase("small rand overwrite", small(KeyMode::Hashed)),
        phase("small rand overwrite", small(KeyMode::Hashed)),
        phase("sequential read", seq_read),
        phase("large rand fill", large),
        phase("large rand overwrite", large),
        phase("sequential read", seq_read),
        phase(
            "random read",
            PhaseOp::RandomRead {
                limit: config.read_limit,
            },
        ),
        phase("compaction", PhaseOp::Compact),
    ]
}

/// Drives one backend through a list of phases.
pub struct Bench {
    db: Arc<dyn Database>,
    config: WorkloadConfig,
    keys: KeySpace,
    executor: Executor,
    progress: bool,
}

impl Bench {
    pub fn new(db: Arc<dyn Database>, config: WorkloadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Bench {
            keys: KeySpace::new(config.key_size, config.seed),
            executor: Executor::new(config.parallelism),
            db,
            config,
            progress: false,
        })
    }

    /// Draw a progress bar on stderr for every phase.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    pub fn known_keys(&self) -> &KnownKeys {
        self.keys.known_keys()
    }

    /// Runs the full script.
    pub fn run(&self) -> Result<Report> {
        self.run_phases(&script(&self.config))
    }

    /// Runs `phases` in order. The first failing phase ends the run and no
    /// report is produced.
    pub fn run_phases(&self, phases: &[Phase]) -> Result<Report> {
        let mut report = Report::default();
        for phase in phases {
            report.push(self.run_phase(phase)?);
        }
        Ok(report)
    }

    fn run_phase(&self, phase: &Phase) -> Result<PhaseResult> {
        info!(
            phase = phase.description,
            ops = phase.op_count(),
            workers = self.executor.workers(),
            "starting phase"
        );
        let pb = phase_bar(phase.op_count(), phase.description, self.progress);
        let db = self.db.as_ref();

        let start = Utc::now();
        let outcome: Result<Outcome> = match &phase.op {
            PhaseOp::Write(spec) => fill::write(
                db,
                &self.keys,
                &self.executor,
                &self.config.write,
                spec,
                &pb,
            ),
            PhaseOp::SequentialRead { limit } => {
                seq_read::read(db, &self.executor, *limit, phase.description, &pb)
            }
            PhaseOp::RandomRead { limit } => random_read::read(
                db,
                self.keys.known_keys(),
                &self.executor,
                &self.config.read,
                *limit,
                phase.description,
                &pb,
            ),
            PhaseOp::Compact => compact::compact_all(db, &pb),
        };
        let end = Utc::now();
        pb.finish();

        let outcome = outcome.map_err(|source| {
            if source.is::<BenchError>() {
                source
            } else {
                BenchError::Phase {
                    phase: phase.description.to_owned(),
                    source,
                }
                .into()
            }
        })?;
        debug!(phase = phase.description, completed = outcome.ops, "phase barrier reached");

        PhaseResult::record(
            start,
            end,
            phase.description,
            phase.op_count(),
            db,
            &outcome.latency_micro_sec,
        )
    }
}
