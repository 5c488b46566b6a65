use crate::registry::KnownKeys;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use sha1::{Digest, Sha1};
use std::sync::Mutex;
use tracing::trace;

/// How a logical index is turned into key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Big-endian `u64::MAX - index`, so increasing indices produce keys in
    /// a single direction of the key order.
    Sequential,
    /// SHA-1 of the little-endian index, spread evenly over the key space.
    Hashed,
}

/// Builds the key for `index`. The index (or digest) is written into a
/// `key_size` buffer; shorter keys truncate it, longer ones are zero padded.
/// Hashed keys are capped at the 20-byte digest.
pub fn make_key(index: u64, key_size: usize, mode: KeyMode) -> Vec<u8> {
    let mut key = vec![0u8; key_size];
    let n = key_size.min(8);
    match mode {
        KeyMode::Sequential => {
            key[..n].copy_from_slice(&(u64::MAX - index).to_be_bytes()[..n]);
            key
        }
        KeyMode::Hashed => {
            key[..n].copy_from_slice(&index.to_le_bytes()[..n]);
            let digest = Sha1::digest(&key);
            digest[..key_size.min(digest.len())].to_vec()
        }
    }
}

/// Owns everything the write phases share: the key registry and the value
/// byte source.
pub struct KeySpace {
    key_size: usize,
    known: KnownKeys,
    rng: Mutex<SmallRng>,
}

impl KeySpace {
    pub fn new(key_size: usize, seed: u64) -> Self {
        KeySpace {
            key_size,
            known: KnownKeys::default(),
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    pub fn known_keys(&self) -> &KnownKeys {
        &self.known
    }

    /// Generates the pair for `index` and registers the key.
    pub fn make_kv(&self, index: u64, value_size: usize, mode: KeyMode) -> (Vec<u8>, Vec<u8>) {
        let key = make_key(index, self.key_size, mode);
        self.known.insert(&key);
        trace!(key = %hex::encode(&key), "generated key");

        let mut value = vec![0u8; value_size];
        // one whole draw per value
        self.rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .fill_bytes(&mut value);
        (key, value)
    }
}
