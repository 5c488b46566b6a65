use crate::database::{Database, WriteOptions};
use crate::executor::{Executor, Outcome};
use crate::generator::KeySpace;
use crate::workload::WriteSpec;
use anyhow::Result;
use indicatif::ProgressBar;

/// Writes one entry for every index of `spec`.
pub fn write(
    db: &dyn Database,
    keys: &KeySpace,
    executor: &Executor,
    opts: &WriteOptions,
    spec: &WriteSpec,
    pb: &ProgressBar,
) -> Result<Outcome> {
    let WriteSpec {
        start,
        count,
        value_size,
        mode,
    } = *spec;
    executor.run(
        |admit| {
            for i in start..start + count {
                admit.submit(i)?;
            }
            Ok(())
        },
        |i| {
            let (k, v) = keys.make_kv(i, value_size, mode);
            db.put(&k, &v, opts)?;
            pb.inc(1);
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ReadOptions, TestDb};
    use crate::generator::KeyMode;

    #[test]
    fn sequential_fill_of_one_hundred() {
        let db = TestDb::default();
        let keys = KeySpace::new(8, 1);
        let out = write(
            &db,
            &keys,
            &Executor::new(4),
            &WriteOptions::default(),
            &WriteSpec {
                start: 0,
                count: 100,
                value_size: 32,
                mode: KeyMode::Sequential,
            },
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(out.ops, 100);
        assert_eq!(keys.known_keys().len(), 100);
        assert_eq!(db.len(), 100);
        for key in keys.known_keys().snapshot() {
            assert_eq!(key.len(), 8);
            let v = db.get(&key, &ReadOptions::default()).unwrap().unwrap();
            assert_eq!(v.len(), 32);
        }
    }

    #[test]
    fn hashed_fill_registers_at_most_count() {
        let db = TestDb::default();
        let keys = KeySpace::new(2, 1);
        write(
            &db,
            &keys,
            &Executor::new(2),
            &WriteOptions::default(),
            &WriteSpec {
                start: 1_000,
                count: 5_000,
                value_size: 4,
                mode: KeyMode::Hashed,
            },
            &ProgressBar::hidden(),
        )
        .unwrap();
        // two-byte digests collide; the registry only keeps distinct keys
        let n = keys.known_keys().len();
        assert!(n <= 5_000);
        assert_eq!(n, db.len());
    }
}
