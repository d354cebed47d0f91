//! Provably-fair outcome derivation.
//!
//! Commit-reveal scheme: the SHA-256 hash of the server seed is published
//! before any bet is accepted, and the seed itself is revealed only after the
//! round (or bet) it covers has terminated. Any party holding the revealed
//! seed pair can recompute every outcome byte-for-byte.

use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Server seeds carry 256 bits of OS entropy.
pub const SERVER_SEED_BYTES: usize = 32;

/// Auto-generated client seeds are 16 random bytes, hex-encoded.
const CLIENT_SEED_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum FairnessError {
    #[error("OS entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Invalid server seed hex: {0}")]
    InvalidSeedHex(String),

    #[error("Server seed does not match published commitment {commitment}")]
    CommitmentMismatch { commitment: String },
}

/// A committed seed pair.
///
/// The server seed is private to this struct until [`SeedPair::reveal`] is
/// called; `Debug` redacts it so it cannot leak through logs.
#[derive(Clone)]
pub struct SeedPair {
    server_seed: Vec<u8>,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl fmt::Debug for SeedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedPair")
            .field("server_seed", &"<redacted>")
            .field("server_seed_hash", &self.server_seed_hash)
            .field("client_seed", &self.client_seed)
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// A seed pair after reveal. Safe to publish and serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealedSeed {
    /// Hex-encoded server seed.
    pub server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl SeedPair {
    /// Generate a fresh seed pair from OS entropy.
    ///
    /// Entropy failure is an error, never a fallback to a weaker generator.
    pub fn generate(client_seed: Option<String>) -> Result<Self, FairnessError> {
        let mut server_seed = vec![0u8; SERVER_SEED_BYTES];
        OsRng
            .try_fill_bytes(&mut server_seed)
            .map_err(|e| FairnessError::EntropyUnavailable(e.to_string()))?;

        let client_seed = match client_seed {
            Some(seed) if !seed.is_empty() => seed,
            _ => {
                let mut bytes = vec![0u8; CLIENT_SEED_BYTES];
                OsRng
                    .try_fill_bytes(&mut bytes)
                    .map_err(|e| FairnessError::EntropyUnavailable(e.to_string()))?;
                hex::encode(bytes)
            }
        };

        Ok(Self::from_parts(server_seed, client_seed, 0))
    }

    /// Build a seed pair from known parts, computing the commitment hash.
    pub fn from_parts(server_seed: impl Into<Vec<u8>>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let server_seed = server_seed.into();
        let server_seed_hash = hex::encode(Sha256::digest(&server_seed));
        Self {
            server_seed,
            server_seed_hash,
            client_seed: client_seed.into(),
            nonce,
        }
    }

    /// Reconstruct a seed pair from a revealed record, checking the commitment.
    pub fn from_revealed(revealed: &RevealedSeed) -> Result<Self, FairnessError> {
        let server_seed =
            hex::decode(&revealed.server_seed).map_err(|e| FairnessError::InvalidSeedHex(e.to_string()))?;
        let pair = Self::from_parts(server_seed, revealed.client_seed.clone(), revealed.nonce);
        if pair.server_seed_hash != revealed.server_seed_hash {
            return Err(FairnessError::CommitmentMismatch {
                commitment: revealed.server_seed_hash.clone(),
            });
        }
        Ok(pair)
    }

    /// Reveal the server seed. Call exactly once, after termination.
    pub fn reveal(&self) -> RevealedSeed {
        RevealedSeed {
            server_seed: hex::encode(&self.server_seed),
            server_seed_hash: self.server_seed_hash.clone(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }
}

/// Derive the 32-byte outcome digest for a seed pair and nonce.
///
/// `HMAC-SHA256(key = server_seed, msg = "{client_seed}:{nonce}")`. Pure:
/// identical inputs always produce identical output.
pub fn derive_outcome(seed: &SeedPair, nonce: u64) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(&seed.server_seed).expect("HMAC accepts keys of any length");
    mac.update(seed.client_seed.as_bytes());
    mac.update(b":");
    mac.update(nonce.to_string().as_bytes());
    let bytes = mac.finalize().into_bytes();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&bytes);
    digest
}

/// Normalize the first 4 digest bytes into `[0, 1)`.
pub fn outcome_to_unit_float(digest: &[u8; 32]) -> f64 {
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix as f64 / (u32::MAX as f64 + 1.0)
}

/// Map a unit float to a crash multiplier.
///
/// Below `house_edge` the round crashes instantly at the floor — this is how
/// the edge is realized. Above it the inverse-CDF `(1 - e) / (1 - u)` yields
/// a Pareto-like tail with expected payout ratio exactly `1 - house_edge`.
pub fn outcome_to_crash_multiplier(unit: f64, house_edge: f64, floor: f64, max: f64) -> f64 {
    if unit < house_edge {
        return floor;
    }
    let multiplier = (1.0 - house_edge) / (1.0 - unit);
    multiplier.clamp(floor, max)
}

/// Map a unit float to a dice roll in `[0, 100)` at two-decimal granularity.
pub fn outcome_to_dice_roll(unit: f64) -> f64 {
    (unit * 10_000.0).floor() / 100.0
}

/// One left/right decision of a Plinko ball.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

/// Derive `rows` left/right decisions for a Plinko drop.
///
/// Consumes one byte per row (least significant bit decides). When the
/// 32-byte digest is exhausted it is re-hashed with plain SHA-256 and
/// consumption restarts at byte 0; the window is fixed so independent
/// verifiers reproduce identical paths.
pub fn outcome_to_plinko_path(seed: &SeedPair, nonce: u64, rows: u8) -> Vec<Direction> {
    let mut digest = derive_outcome(seed, nonce);
    let mut path = Vec::with_capacity(rows as usize);
    let mut cursor = 0usize;

    for _ in 0..rows {
        if cursor == digest.len() {
            digest = Sha256::digest(digest).into();
            cursor = 0;
        }
        path.push(if digest[cursor] & 1 == 0 {
            Direction::Left
        } else {
            Direction::Right
        });
        cursor += 1;
    }
    path
}

/// Recompute and compare a claimed outcome digest.
pub fn verify(seed: &SeedPair, nonce: u64, claimed: &[u8; 32]) -> bool {
    derive_outcome(seed, nonce) == *claimed
}

/// Which game mapping to apply when recomputing an outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum OutcomeQuery {
    Crash { house_edge: f64, floor: f64, max: f64 },
    Dice,
    Plinko { rows: u8 },
}

/// A recomputed, domain-mapped outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum VerifiedOutcome {
    Crash { multiplier: f64 },
    Dice { roll: f64 },
    Plinko { path: Vec<Direction> },
}

/// The public verification surface.
///
/// Byte-identical to the engine's own computation; usable by internal
/// settlement and by external auditors holding a revealed seed pair.
pub fn recompute_outcome(seed: &SeedPair, nonce: u64, query: &OutcomeQuery) -> VerifiedOutcome {
    match query {
        OutcomeQuery::Crash { house_edge, floor, max } => {
            let unit = outcome_to_unit_float(&derive_outcome(seed, nonce));
            VerifiedOutcome::Crash {
                multiplier: outcome_to_crash_multiplier(unit, *house_edge, *floor, *max),
            }
        }
        OutcomeQuery::Dice => {
            let unit = outcome_to_unit_float(&derive_outcome(seed, nonce));
            VerifiedOutcome::Dice {
                roll: outcome_to_dice_roll(unit),
            }
        }
        OutcomeQuery::Plinko { rows } => VerifiedOutcome::Plinko {
            path: outcome_to_plinko_path(seed, nonce, *rows),
        },
    }
}

/// Result of checking a revealed seed pair against its commitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub outcome: Option<VerifiedOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Verify a revealed seed pair end to end: commitment check plus outcome
/// recomputation for the requested game.
pub fn verify_revealed(revealed: &RevealedSeed, nonce: u64, query: &OutcomeQuery) -> VerificationReport {
    let pair = match SeedPair::from_revealed(revealed) {
        Ok(pair) => pair,
        Err(e) => {
            return VerificationReport {
                is_valid: false,
                error: Some(e.to_string()),
                outcome: None,
                explanation: None,
            }
        }
    };

    let outcome = recompute_outcome(&pair, nonce, query);
    let digest = derive_outcome(&pair, nonce);
    let explanation = format!(
        "sha256(server_seed) matches commitment {}; outcome digest for nonce {} is {}",
        revealed.server_seed_hash,
        nonce,
        hex::encode(digest),
    );

    VerificationReport {
        is_valid: true,
        error: None,
        outcome: Some(outcome),
        explanation: Some(explanation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pair() -> SeedPair {
        SeedPair::from_parts(b"S".to_vec(), "C", 0)
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let pair = test_pair();
        let a = derive_outcome(&pair, 7);
        let b = derive_outcome(&pair, 7);
        assert_eq!(a, b);
        assert_ne!(a, derive_outcome(&pair, 8));
    }

    #[test]
    fn test_verify_matches_derivation() {
        let pair = test_pair();
        let digest = derive_outcome(&pair, 3);
        assert!(verify(&pair, 3, &digest));
        assert!(!verify(&pair, 4, &digest));

        let mut tampered = digest;
        tampered[0] ^= 0xff;
        assert!(!verify(&pair, 3, &tampered));
    }

    #[test]
    fn test_unit_float_uses_four_byte_prefix() {
        let mut digest = [0u8; 32];
        assert_eq!(outcome_to_unit_float(&digest), 0.0);

        digest[..4].copy_from_slice(&[0xff; 4]);
        let unit = outcome_to_unit_float(&digest);
        assert!(unit < 1.0);
        assert!((unit - (u32::MAX as f64 / (u32::MAX as f64 + 1.0))).abs() < 1e-12);

        // Bytes past the prefix must not matter.
        digest[4] = 0xab;
        assert_eq!(unit, outcome_to_unit_float(&digest));
    }

    #[test]
    fn test_crash_multiplier_instant_crash_below_edge() {
        assert_eq!(outcome_to_crash_multiplier(0.005, 0.01, 1.0, 10_000.0), 1.0);
    }

    #[test]
    fn test_crash_multiplier_inverse_cdf() {
        let m = outcome_to_crash_multiplier(0.5, 0.01, 1.0, 10_000.0);
        assert!((m - 1.98).abs() < 1e-9);
    }

    #[test]
    fn test_crash_multiplier_clamped_to_max() {
        let m = outcome_to_crash_multiplier(0.999_999_999, 0.01, 1.0, 10_000.0);
        assert_eq!(m, 10_000.0);
    }

    #[test]
    fn test_dice_roll_two_decimal_granularity() {
        let roll = outcome_to_dice_roll(0.123_456);
        assert!((roll - 12.34).abs() < 1e-9);
        assert!(outcome_to_dice_roll(0.999_999_9) < 100.0);
        assert_eq!(outcome_to_dice_roll(0.0), 0.0);
    }

    #[test]
    fn test_plinko_path_rehashes_when_digest_exhausted() {
        let pair = test_pair();
        // 40 rows exceed the 32 digest bytes, forcing one re-hash.
        let long = outcome_to_plinko_path(&pair, 0, 40);
        assert_eq!(long.len(), 40);
        // The first 32 decisions come straight from the digest bytes.
        let digest = derive_outcome(&pair, 0);
        for (i, dir) in long.iter().take(32).enumerate() {
            let expected = if digest[i] & 1 == 0 { Direction::Left } else { Direction::Right };
            assert_eq!(*dir, expected);
        }
        // Reproducible in full, including the rehashed tail.
        assert_eq!(long, outcome_to_plinko_path(&pair, 0, 40));
    }

    #[test]
    fn test_debug_redacts_server_seed() {
        let pair = SeedPair::from_parts(b"super-secret-server-seed".to_vec(), "client", 0);
        let rendered = format!("{:?}", pair);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&hex::encode(b"super-secret-server-seed")));
        assert!(rendered.contains(&pair.server_seed_hash));
    }

    #[test]
    fn test_reveal_round_trips_through_commitment_check() {
        let pair = SeedPair::generate(Some("my-seed".into())).expect("entropy available");
        let revealed = pair.reveal();
        let rebuilt = SeedPair::from_revealed(&revealed).expect("commitment holds");
        assert_eq!(derive_outcome(&pair, 5), derive_outcome(&rebuilt, 5));
    }

    #[test]
    fn test_tampered_reveal_is_rejected() {
        let pair = test_pair();
        let mut revealed = pair.reveal();
        revealed.server_seed = hex::encode(b"X");
        assert!(matches!(
            SeedPair::from_revealed(&revealed),
            Err(FairnessError::CommitmentMismatch { .. })
        ));

        let report = verify_revealed(&revealed, 0, &OutcomeQuery::Dice);
        assert!(!report.is_valid);
        assert!(report.outcome.is_none());
    }

    #[test]
    fn test_verification_report_recomputes_outcome() {
        let pair = test_pair();
        let report = verify_revealed(
            &pair.reveal(),
            0,
            &OutcomeQuery::Crash { house_edge: 0.01, floor: 1.0, max: 10_000.0 },
        );
        assert!(report.is_valid);

        let unit = outcome_to_unit_float(&derive_outcome(&pair, 0));
        let expected = outcome_to_crash_multiplier(unit, 0.01, 1.0, 10_000.0);
        assert_eq!(report.outcome, Some(VerifiedOutcome::Crash { multiplier: expected }));
    }

    #[test]
    fn test_crash_rtp_converges_to_one_minus_edge() {
        // Strategy: always cash out at 2.0x. P(crash >= t) = (1 - e) / t, so
        // realized RTP converges to 1 - e for any achievable target.
        let pair = SeedPair::generate(None).expect("entropy available");
        let house_edge = 0.01;
        let target = 2.0;
        let rounds = 200_000u64;

        let mut returned = 0.0f64;
        for nonce in 0..rounds {
            let unit = outcome_to_unit_float(&derive_outcome(&pair, nonce));
            let crash = outcome_to_crash_multiplier(unit, house_edge, 1.0, 10_000.0);
            if crash >= target {
                returned += target;
            }
        }

        let rtp = returned / rounds as f64;
        let expected = 1.0 - house_edge;
        assert!(
            (rtp - expected).abs() < 0.0075,
            "RTP {:.4} drifted from {:.4}",
            rtp,
            expected
        );
    }
}
