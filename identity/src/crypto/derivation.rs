//! # Hierarchical Key Derivation
//!
//! Deterministic secp256k1 key derivation from a 32-byte seed, following the
//! BIP-32 construction along a BIP-44 style path:
//!
//! ```text
//! m / 44' / 7777' / account' / change / index
//! ```
//!
//! The first three segments are hardened: their child keys mix in the parent
//! *private* key, so nobody holding only public data can walk down to an
//! account key.
//!
//! ## Construction
//!
//! 1. Master key: `HMAC-SHA512(key = "Bitcoin seed", data = seed)`, left half
//!    is the private key, right half the chain code.
//! 2. Child `i`: `HMAC-SHA512(key = chain_code, data)` where `data` is
//!    `0x00 || k_par || ser32(i)` for hardened `i` and
//!    `ser_P(point(k_par)) || ser32(i)` otherwise. The child private key is
//!    `(IL + k_par) mod n`, the chain code is `IR`.
//! 3. If `IL >= n` or the child key is zero, the index is unusable and the
//!    next index is tried. The retry loop is bounded by
//!    [`MAX_CHILD_DERIVATION_ATTEMPTS`].
//!
//! Because the HMAC key for step 1 is the BIP-32 one, the public BIP-32 test
//! vectors exercise this engine directly (see the tests below).
//!
//! Seeds and private keys are never logged.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use thiserror::Error;

use super::keys::KeyPair;
use crate::config::{
    BIP44_PURPOSE, CHAIN_CODE_LENGTH, HARDENED_OFFSET, MASTER_KEY_HMAC_KEY,
    MAX_CHILD_DERIVATION_ATTEMPTS, MIDNIGHT_COIN_TYPE, PRIVATE_KEY_LENGTH, SEED_LENGTH,
};

type HmacSha512 = Hmac<Sha512>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from seed handling and key derivation.
///
/// Derivation either produces a complete key pair or one of these. There is
/// no partially derived output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyDerivationError {
    /// The seed is not exactly 32 bytes / 64 hex characters.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// The derivation path cannot be expressed with this engine.
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    /// The seed yields a master key outside `(0, n)`.
    #[error("seed produces an invalid master key")]
    InvalidMasterKey,

    /// An extended key below the master holds a scalar outside `(0, n)`.
    #[error("extended key holds an invalid private scalar")]
    InvalidExtendedKey,

    /// Too many consecutive child indices produced invalid keys.
    #[error("no valid child key after {attempts} attempts starting at index {index}")]
    RetryLimitExceeded {
        /// The index originally requested.
        index: u32,
        /// How many indices were tried.
        attempts: u32,
    },

    /// Retrying walked past the last representable child index.
    #[error("child index overflow while skipping invalid keys")]
    IndexOverflow,

    /// The operating system entropy source failed.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// The HMAC primitive rejected its input.
    #[error("hmac failure: {0}")]
    Hmac(String),
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// A 32-byte derivation seed.
///
/// The seed is the root of every key in the tree. This core never persists
/// it; callers decide where (and whether) it is stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_LENGTH]);

impl Seed {
    /// Wrap raw seed bytes.
    pub fn from_bytes(bytes: [u8; SEED_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex seed.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyDerivationError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| KeyDerivationError::InvalidSeed(e.to_string()))?;
        let arr: [u8; SEED_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            KeyDerivationError::InvalidSeed(format!(
                "expected {} bytes, got {}",
                SEED_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Lowercase hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; SEED_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// Generate a fresh seed from the OS CSPRNG.
pub fn generate_seed() -> Result<Seed, KeyDerivationError> {
    let mut bytes = [0u8; SEED_LENGTH];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| KeyDerivationError::Entropy(e.to_string()))?;
    Ok(Seed(bytes))
}

// ---------------------------------------------------------------------------
// KeyPath
// ---------------------------------------------------------------------------

/// A BIP-44 style derivation path: `m/purpose'/coin_type'/account'/change/index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPath {
    pub purpose: u32,
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
    pub index: u32,
}

impl Default for KeyPath {
    fn default() -> Self {
        Self {
            purpose: BIP44_PURPOSE,
            coin_type: MIDNIGHT_COIN_TYPE,
            account: 0,
            change: 0,
            index: 0,
        }
    }
}

impl KeyPath {
    /// Path under the default purpose and Midnight coin type.
    pub fn new(account: u32, change: u32, index: u32) -> Self {
        Self {
            account,
            change,
            index,
            ..Self::default()
        }
    }

    /// The five raw child indices, hardened offsets applied.
    pub fn child_indices(&self) -> Result<[u32; 5], KeyDerivationError> {
        Ok([
            harden(self.purpose, "purpose")?,
            harden(self.coin_type, "coinType")?,
            harden(self.account, "account")?,
            self.change,
            self.index,
        ])
    }
}

fn harden(value: u32, segment: &str) -> Result<u32, KeyDerivationError> {
    if value >= HARDENED_OFFSET {
        return Err(KeyDerivationError::InvalidPath(format!(
            "{} {} does not fit a hardened index",
            segment, value
        )));
    }
    Ok(value | HARDENED_OFFSET)
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/{}'/{}'/{}'/{}/{}",
            self.purpose, self.coin_type, self.account, self.change, self.index
        )
    }
}

impl FromStr for KeyPath {
    type Err = KeyDerivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| KeyDerivationError::InvalidPath(format!("{}: {}", s, reason));

        let mut segments = s.trim().split('/');
        if segments.next() != Some("m") {
            return Err(invalid("path must start with 'm'"));
        }

        let segments: Vec<&str> = segments.collect();
        if segments.len() != 5 {
            return Err(invalid("expected exactly five segments"));
        }

        let mut values = [0u32; 5];
        for (position, raw) in segments.iter().enumerate() {
            let (digits, hardened) = match raw.strip_suffix('\'').or_else(|| raw.strip_suffix('h')) {
                Some(d) => (d, true),
                None => (*raw, false),
            };
            if hardened != (position < 3) {
                return Err(invalid("only the first three segments are hardened"));
            }
            values[position] = digits
                .parse::<u32>()
                .map_err(|_| invalid("segment is not an unsigned 32-bit integer"))?;
        }

        Ok(Self {
            purpose: values[0],
            coin_type: values[1],
            account: values[2],
            change: values[3],
            index: values[4],
        })
    }
}

// ---------------------------------------------------------------------------
// Extended keys
// ---------------------------------------------------------------------------

/// Derivation state: a private key plus its chain code.
///
/// Invariant: `0 < private_key < n`. Every constructor checks it.
#[derive(Clone)]
#[cfg_attr(test, derive(Debug))]
pub(crate) struct ExtendedKey {
    private_key: [u8; PRIVATE_KEY_LENGTH],
    chain_code: [u8; CHAIN_CODE_LENGTH],
}

impl ExtendedKey {
    fn scalar(&self) -> Result<Scalar, KeyDerivationError> {
        scalar_from_bytes(&self.private_key).ok_or(KeyDerivationError::InvalidExtendedKey)
    }

    fn secret_key(&self) -> Result<SecretKey, KeyDerivationError> {
        SecretKey::from_bytes(&FieldBytes::from(self.private_key))
            .map_err(|_| KeyDerivationError::InvalidExtendedKey)
    }

    #[cfg(test)]
    pub(crate) fn private_key_hex(&self) -> String {
        hex::encode(self.private_key)
    }

    #[cfg(test)]
    pub(crate) fn chain_code_hex(&self) -> String {
        hex::encode(self.chain_code)
    }
}

/// Scalar for `bytes` if it is strictly below the curve order.
fn scalar_below_order(bytes: &[u8; 32]) -> Option<Scalar> {
    Scalar::from_repr(FieldBytes::from(*bytes)).into()
}

/// Valid private key scalar: `0 < k < n`.
fn scalar_from_bytes(bytes: &[u8; 32]) -> Option<Scalar> {
    scalar_below_order(bytes).filter(|s| *s != Scalar::ZERO)
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<([u8; 32], [u8; 32]), KeyDerivationError> {
    let mut mac =
        HmacSha512::new_from_slice(key).map_err(|e| KeyDerivationError::Hmac(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let output = mac.finalize().into_bytes();

    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&output[..32]);
    right.copy_from_slice(&output[32..]);
    Ok((left, right))
}

/// Master key from raw seed bytes.
///
/// Accepts any seed length so the BIP-32 vectors (16-byte seeds) apply;
/// public entry points only ever pass a [`Seed`].
pub(crate) fn derive_master_key(seed: &[u8]) -> Result<ExtendedKey, KeyDerivationError> {
    let (il, ir) = hmac_sha512(MASTER_KEY_HMAC_KEY, &[seed])?;
    if scalar_from_bytes(&il).is_none() {
        return Err(KeyDerivationError::InvalidMasterKey);
    }
    Ok(ExtendedKey {
        private_key: il,
        chain_code: ir,
    })
}

/// Derive the child at `index`, skipping to the next index while the
/// candidate key is invalid.
pub(crate) fn derive_child(parent: &ExtendedKey, index: u32) -> Result<ExtendedKey, KeyDerivationError> {
    derive_child_with(parent, index, MAX_CHILD_DERIVATION_ATTEMPTS, hmac_sha512)
}

/// Retry loop behind [`derive_child`] with the HMAC step and the attempt cap
/// supplied by the caller.
pub(crate) fn derive_child_with<H>(
    parent: &ExtendedKey,
    index: u32,
    max_attempts: u32,
    mut hmac: H,
) -> Result<ExtendedKey, KeyDerivationError>
where
    H: FnMut(&[u8], &[&[u8]]) -> Result<([u8; 32], [u8; 32]), KeyDerivationError>,
{
    let parent_scalar = parent.scalar()?;
    // Retries only ever move towards the hardened range, so the parent
    // public key is needed at most for a normal starting index.
    let parent_public = if index < HARDENED_OFFSET {
        let point = parent.secret_key()?.public_key().to_encoded_point(true);
        Some(point.as_bytes().to_vec())
    } else {
        None
    };

    let mut candidate = index;
    for attempt in 0..max_attempts {
        let ser_index = candidate.to_be_bytes();
        let (il, ir) = match (&parent_public, candidate >= HARDENED_OFFSET) {
            (_, true) => {
                let data: [&[u8]; 3] = [&[0u8], &parent.private_key, &ser_index];
                hmac(&parent.chain_code, &data)?
            }
            (Some(public), false) => {
                let data: [&[u8]; 2] = [public, &ser_index];
                hmac(&parent.chain_code, &data)?
            }
            (None, false) => return Err(KeyDerivationError::InvalidPath(format!(
                "normal index {} reached from hardened start {}",
                candidate, index
            ))),
        };

        if let Some(tweak) = scalar_below_order(&il) {
            let child = parent_scalar + tweak;
            if child != Scalar::ZERO {
                let mut private_key = [0u8; PRIVATE_KEY_LENGTH];
                private_key.copy_from_slice(&child.to_repr());
                return Ok(ExtendedKey {
                    private_key,
                    chain_code: ir,
                });
            }
        }

        tracing::warn!(
            requested = index,
            candidate,
            attempt,
            "child key invalid, retrying with next index"
        );
        candidate = candidate
            .checked_add(1)
            .ok_or(KeyDerivationError::IndexOverflow)?;
    }

    Err(KeyDerivationError::RetryLimitExceeded {
        index,
        attempts: max_attempts,
    })
}

/// Walk a sequence of raw child indices from the master key.
pub(crate) fn derive_path(seed: &[u8], indices: &[u32]) -> Result<ExtendedKey, KeyDerivationError> {
    let mut key = derive_master_key(seed)?;
    for &index in indices {
        key = derive_child(&key, index)?;
    }
    Ok(key)
}

/// Derive the key pair at `path` from `seed`.
///
/// Deterministic: the same seed and path always produce bit-identical
/// output. The private key is 64 lowercase hex characters, the public key
/// is the 130-character uncompressed SEC1 encoding (`04` prefix).
pub fn derive_key_pair(seed: &Seed, path: &KeyPath) -> Result<KeyPair, KeyDerivationError> {
    let indices = path.child_indices()?;
    tracing::debug!(path = %path, "deriving key pair");

    let key = derive_path(seed.as_bytes(), &indices)?;
    let public = key.secret_key()?.public_key().to_encoded_point(false);

    Ok(KeyPair::from_hex_parts(
        hex::encode(public.as_bytes()),
        hex::encode(key.private_key),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
