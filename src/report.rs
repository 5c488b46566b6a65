use crate::database::{BackendStats, Database};
use anyhow::Result;
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thousands::Separable;
use tracing::{debug, info};

/// Per-operation latency percentiles in microseconds. `None` when the phase
/// recorded nothing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Latency {
    pub p50: Option<u64>,
    pub p95: Option<u64>,
    pub p99: Option<u64>,
    pub p999: Option<u64>,
}

impl Latency {
    fn from_histogram(h: &Histogram<u64>) -> Self {
        let q = |q: f64| (!h.is_empty()).then(|| h.value_at_quantile(q));
        Latency {
            p50: q(0.50),
            p95: q(0.95),
            p99: q(0.99),
            p999: q(0.999),
        }
    }
}

/// Outcome of a single phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "duration_secs", serialize_with = "as_secs")]
    pub duration: Duration,
    pub description: String,
    pub op_count: u64,
    /// Backend counters as of the end of the phase
    pub stats: BackendStats,
    /// Operations per second
    pub op_rate: f64,
    pub latency_micro_sec: Latency,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn throughput(ops: u64, d: Duration) -> f64 {
    if ops == 0 || d.is_zero() {
        0.0
    } else {
        ops as f64 / d.as_secs_f64()
    }
}

impl PhaseResult {
    /// Builds the result of a finished phase, snapshotting the backend's
    /// statistics now.
    pub fn record(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        description: &str,
        op_count: u64,
        db: &dyn Database,
        latency: &Histogram<u64>,
    ) -> Result<Self> {
        let duration = (end_time - start_time).to_std().unwrap_or(Duration::ZERO);
        let result = PhaseResult {
            start_time,
            end_time,
            duration,
            description: description.to_owned(),
            op_count,
            stats: db.stats()?,
            op_rate: throughput(op_count, duration),
            latency_micro_sec: Latency::from_histogram(latency),
        };
        info!(duration = ?result.duration, desc = %result.description, "recorded result");
        debug!(result = ?result, "recorded result");
        Ok(result)
    }
}

/// All phase results of a run, in execution order.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    phases: Vec<PhaseResult>,
}

impl Report {
    pub fn push(&mut self, result: PhaseResult) {
        self.phases.push(result);
    }

    pub fn phases(&self) -> &[PhaseResult] {
        &self.phases
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let us = |v: Option<u64>| v.map_or_else(|| "-".into(), |v| v.separate_with_underscores());
        for (i, r) in self.phases.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "=== {} ===", r.description.to_uppercase())?;
            write!(
                f,
                "ops: {} | time: {:.1?} | throughput: {} ops/s | p50: {} µs | p95: {} µs | p99: {} µs | p99.9: {} µs",
                r.op_count.separate_with_underscores(),
                r.duration,
                (r.op_rate as u64).separate_with_underscores(),
                us(r.latency_micro_sec.p50),
                us(r.latency_micro_sec.p95),
                us(r.latency_micro_sec.p99),
                us(r.latency_micro_sec.p999),
            )?;
            let stats: Vec<_> = r
                .stats
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.separate_with_underscores()))
                .collect();
            if !stats.is_empty() {
                write!(f, "\nstats: {}", stats.join(" | "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TestDb;
    use crate::executor::new_histogram;
    use chrono::TimeDelta;

    #[test]
    fn op_rate_is_ops_over_duration() {
        let db = TestDb::default();
        let start = Utc::now();
        let end = start + TimeDelta::milliseconds(2_500);
        let r = PhaseResult::record(start, end, "fill", 1_000, &db, &new_histogram().unwrap())
            .unwrap();
        assert_eq!(r.duration, Duration::from_millis(2_500));
        assert_eq!(r.op_rate, 1_000.0 / 2.5);
        assert_eq!(r.latency_micro_sec.p50, None);
    }

    #[test]
    fn zero_duration_has_zero_rate() {
        let db = TestDb::default();
        let now = Utc::now();
        let r = PhaseResult::record(now, now, "noop", 10, &db, &new_histogram().unwrap()).unwrap();
        assert_eq!(r.op_rate, 0.0);
    }

    #[test]
    fn stats_snapshot_taken_at_record_time() {
        let db = TestDb::default();
        db.put(b"k", b"v", &Default::default()).unwrap();
        let now = Utc::now();
        let r = PhaseResult::record(now, now, "x", 1, &db, &new_histogram().unwrap()).unwrap();
        db.put(b"k2", b"v", &Default::default()).unwrap();
        assert_eq!(r.stats.get("puts"), Some(1));
    }

    #[test]
    fn json_report_shape() {
        let db = TestDb::default();
        let mut hist = new_histogram().unwrap();
        hist.record(40).unwrap();
        let start = Utc::now();
        let mut report = Report::default();
        report.push(
            PhaseResult::record(start, start + TimeDelta::seconds(1), "small seq fill", 5, &db, &hist)
                .unwrap(),
        );

        let v: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let phase = &v.as_array().unwrap()[0];
        assert_eq!(phase["description"], "small seq fill");
        assert_eq!(phase["op_count"], 5);
        assert_eq!(phase["duration_secs"], 1.0);
        assert_eq!(phase["op_rate"], 5.0);
        assert_eq!(phase["stats"]["puts"], 0);
        assert_eq!(phase["latency_micro_sec"]["p50"], 40);
        assert!(phase["start_time"].is_string());

        let text = report.to_string();
        assert!(text.starts_with("=== SMALL SEQ FILL ==="));
        assert!(text.contains("throughput: 5 ops/s"));
    }
}
