//! Bounded-concurrency runner shared by every phase.
//!
//! The caller feeds items through [`Admit::submit`]; a fixed set of scoped
//! worker threads takes them off a rendezvous channel, so at most `workers`
//! operations are ever in flight and `submit` blocks while all of them are
//! busy. [`Executor::run`] returns only once every admitted item has
//! finished.

use crate::error::BenchError;
use anyhow::{Result, anyhow};
use crossbeam_channel::{Sender, bounded};
use hdrhistogram::Histogram;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub fn new_histogram() -> Result<Histogram<u64>> {
    Ok(Histogram::new_with_bounds(1, 10_000_000, 3)?)
}

/// What a finished phase did.
#[derive(Debug)]
pub struct Outcome {
    pub ops: u64,
    pub latency_micro_sec: Histogram<u64>,
}

/// Handle the feeding closure uses to admit work.
pub struct Admit<'a, T> {
    tx: Sender<T>,
    failed: &'a AtomicBool,
}

impl<T> Admit<'_, T> {
    /// Blocks until a worker is free. Fails once any operation has failed,
    /// which should stop the feeder.
    pub fn submit(&self, item: T) -> Result<()> {
        if self.failed.load(Ordering::Acquire) {
            return Err(BenchError::Aborted.into());
        }
        self.tx
            .send(item)
            .map_err(|_| anyhow!("executor workers exited early"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Executor {
    workers: usize,
}

impl Executor {
    pub fn new(workers: usize) -> Self {
        Executor {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `op` on every item `feed` submits. The first failing operation
    /// stops admission; its error is returned after in-flight work drains.
    pub fn run<T, P, F>(&self, feed: P, op: F) -> Result<Outcome>
    where
        T: Send,
        P: FnOnce(&Admit<'_, T>) -> Result<()>,
        F: Fn(T) -> Result<()> + Sync,
    {
        let (tx, rx) = bounded::<T>(0);
        let failed = AtomicBool::new(false);
        let first_err: Mutex<Option<anyhow::Error>> = Mutex::new(None);

        let (fed, joined) = std::thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.workers);
            for _ in 0..self.workers {
                let rx = rx.clone();
                let (op, failed, first_err) = (&op, &failed, &first_err);
                handles.push(s.spawn(move || -> Result<(u64, Histogram<u64>)> {
                    let mut hist = new_histogram()?;
                    let mut ops = 0;
                    for item in rx.iter() {
                        // drain without running once the phase is lost
                        if failed.load(Ordering::Acquire) {
                            continue;
                        }
                        let start = Instant::now();
                        match op(item) {
                            Ok(()) => {
                                hist.saturating_record(start.elapsed().as_micros() as u64);
                                ops += 1;
                            }
                            Err(e) => {
                                failed.store(true, Ordering::Release);
                                first_err
                                    .lock()
                                    .unwrap_or_else(|e| e.into_inner())
                                    .get_or_insert(e);
                            }
                        }
                    }
                    Ok((ops, hist))
                }));
            }
            drop(rx);

            let admit = Admit {
                tx,
                failed: &failed,
            };
            let fed = feed(&admit);
            // closing the channel lets the workers finish
            drop(admit);

            let joined: Vec<_> = handles
                .into_iter()
                .map(|h| h.join().map_err(|_| anyhow!("executor worker panicked")))
                .collect();
            (fed, joined)
        });

        if let Some(e) = first_err.into_inner().unwrap_or_else(|e| e.into_inner()) {
            return Err(e);
        }
        fed?;

        let mut outcome = Outcome {
            ops: 0,
            latency_micro_sec: new_histogram()?,
        };
        for worker in joined {
            let (ops, hist) = worker??;
            outcome.ops += ops;
            outcome.latency_micro_sec.add(hist)?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicU64, AtomicUsize};
    use std::time::Duration;

    fn bounded_run(count: u64, limit: usize) {
        let in_flight = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        let done = AtomicU64::new(0);
        let outcome = Executor::new(limit)
            .run(
                |admit| {
                    for i in 0..count {
                        admit.submit(i)?;
                    }
                    Ok(())
                },
                |_| {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_micros(200));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(outcome.ops, count);
        assert_eq!(outcome.latency_micro_sec.len(), count);
        // barrier: everything finished before run returned
        assert_eq!(done.load(Ordering::SeqCst), count);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert!(max_seen.load(Ordering::SeqCst) <= limit);
    }

    #[test]
    fn never_exceeds_admission_limit() {
        bounded_run(200, 1);
        bounded_run(200, 4);
        bounded_run(3, 16);
    }

    #[test]
    fn parallel_ops_overlap() {
        let in_flight = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        Executor::new(4)
            .run(
                |admit| {
                    for i in 0..64 {
                        admit.submit(i)?;
                    }
                    Ok(())
                },
                |_| {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(2));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .unwrap();
        assert!(max_seen.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(Executor::new(0).workers(), 1);
    }

    #[test]
    fn empty_feed_completes() {
        let outcome = Executor::new(2)
            .run(|_: &Admit<'_, u64>| Ok(()), |_| Ok(()))
            .unwrap();
        assert_eq!(outcome.ops, 0);
    }

    #[test]
    fn first_failure_stops_admission() {
        let submitted = AtomicU64::new(0);
        let err = Executor::new(2)
            .run(
                |admit| {
                    for i in 0..10_000u64 {
                        admit.submit(i)?;
                        submitted.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(())
                },
                |i| {
                    if i == 10 {
                        bail!("disk on fire");
                    }
                    Ok(())
                },
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
        assert!(submitted.load(Ordering::SeqCst) < 10_000);
    }

    #[test]
    fn feeder_error_is_returned() {
        let err = Executor::new(2)
            .run(
                |admit| {
                    admit.submit(1u64)?;
                    bail!("iterator broke")
                },
                |_| Ok(()),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "iterator broke");
    }
}
