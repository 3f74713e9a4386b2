//! Winner draw beacon.
//!
//! Commit-reveal style randomness for `draw_winner`:
//! - Each group holds a 32-byte seed generated from the OS RNG at creation
//! - `SHA-256(seed)` is published as the commitment when the group is created
//! - A draw picks `u64(SHA-256(seed || period || round || candidates)) mod n`
//!
//! Once the seed is revealed anyone can recompute every draw and check it
//! against the commitment. Candidates are hashed in sorted order so the pick
//! does not depend on insertion order.

use crate::identity::Address;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Seeded draw beacon.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawBeacon {
    seed: [u8; 32],
}

impl std::fmt::Debug for DrawBeacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawBeacon")
            .field("commitment", &self.commitment())
            .finish()
    }
}

impl DrawBeacon {
    /// Beacon with a known seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    /// Beacon with a fresh OS-random seed.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self { seed }
    }

    /// Hex SHA-256 of the seed.
    pub fn commitment(&self) -> String {
        hex::encode(Sha256::digest(self.seed))
    }

    /// The seed itself. Revealing it lets auditors replay draws.
    pub fn reveal(&self) -> [u8; 32] {
        self.seed
    }

    /// Pick one of `candidates` for `(period, round)`.
    pub fn pick(&self, period: u64, round: u64, candidates: &[Address]) -> Option<Address> {
        if candidates.is_empty() {
            return None;
        }
        let mut sorted = candidates.to_vec();
        sorted.sort();

        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(period.to_be_bytes());
        hasher.update(round.to_be_bytes());
        for candidate in &sorted {
            hasher.update(candidate.as_bytes());
        }
        let digest = hasher.finalize();

        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        let index = (u64::from_be_bytes(word) % sorted.len() as u64) as usize;
        Some(sorted[index])
    }
}
