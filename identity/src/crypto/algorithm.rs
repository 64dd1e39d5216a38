//! # Signature Algorithms
//!
//! The set of signature algorithms is closed: ECDSA on a named curve, or
//! RSASSA-PKCS1-v1_5. Everything that dispatches on an algorithm matches on
//! [`Algorithm`] exhaustively, so adding a variant is a compile error at
//! every call site until it is handled.
//!
//! DID Documents and provider calls carry algorithms in their wire form,
//! [`AlgorithmDescriptor`]:
//!
//! ```json
//! { "name": "ECDSA", "namedCurve": "P-256", "hash": "SHA-256" }
//! { "name": "RSASSA-PKCS1-v1_5", "modulusLength": 2048, "hash": "SHA-256" }
//! ```
//!
//! Converting a descriptor into an [`Algorithm`] is the only place where an
//! unknown algorithm can surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::signatures::CryptoServiceError;
use crate::config::{
    DEFAULT_RSA_MODULUS_LENGTH, P256_VERIFICATION_KEY_TYPE, RSA_VERIFICATION_KEY_TYPE,
    SECP256K1_VERIFICATION_KEY_TYPE, SIGNATURE_SUITE_SUFFIX, SUPPORTED_RSA_MODULUS_LENGTHS,
};

/// Wire name of the ECDSA family.
pub const ECDSA_NAME: &str = "ECDSA";

/// Wire name of the RSA PKCS#1 v1.5 family.
pub const RSA_PKCS1_NAME: &str = "RSASSA-PKCS1-v1_5";

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Elliptic curves supported for ECDSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedCurve {
    /// NIST P-256 (secp256r1).
    P256,
    /// secp256k1, the curve used by hierarchical derivation.
    Secp256k1,
}

impl NamedCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamedCurve::P256 => "P-256",
            NamedCurve::Secp256k1 => "secp256k1",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(NamedCurve::P256),
            "secp256k1" | "K-256" => Some(NamedCurve::Secp256k1),
            _ => None,
        }
    }
}

/// Message digests usable with either family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "SHA-256" => Some(HashAlgorithm::Sha256),
            "SHA-384" => Some(HashAlgorithm::Sha384),
            "SHA-512" => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Hash `data` with this digest.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// A fully specified signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Ecdsa { curve: NamedCurve, hash: HashAlgorithm },
    Rsa { modulus_length: u32, hash: HashAlgorithm },
}

impl Algorithm {
    /// ECDSA over secp256k1 with SHA-256. The algorithm of derived keys.
    pub fn ecdsa_secp256k1() -> Self {
        Algorithm::Ecdsa {
            curve: NamedCurve::Secp256k1,
            hash: HashAlgorithm::Sha256,
        }
    }

    /// ECDSA over P-256 with SHA-256.
    pub fn ecdsa_p256() -> Self {
        Algorithm::Ecdsa {
            curve: NamedCurve::P256,
            hash: HashAlgorithm::Sha256,
        }
    }

    /// RSASSA-PKCS1-v1_5, 2048-bit modulus, SHA-256.
    pub fn rsa_2048() -> Self {
        Algorithm::Rsa {
            modulus_length: DEFAULT_RSA_MODULUS_LENGTH,
            hash: HashAlgorithm::Sha256,
        }
    }

    /// Family name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Ecdsa { .. } => ECDSA_NAME,
            Algorithm::Rsa { .. } => RSA_PKCS1_NAME,
        }
    }

    pub fn hash(&self) -> HashAlgorithm {
        match self {
            Algorithm::Ecdsa { hash, .. } | Algorithm::Rsa { hash, .. } => *hash,
        }
    }

    /// Value of `signatureParams.type` for signatures made with this algorithm.
    pub fn signature_type(&self) -> String {
        format!("{}{}", self.name(), SIGNATURE_SUITE_SUFFIX)
    }

    /// Verification method `type` for keys of this algorithm.
    pub fn verification_key_type(&self) -> &'static str {
        match self {
            Algorithm::Ecdsa {
                curve: NamedCurve::Secp256k1,
                ..
            } => SECP256K1_VERIFICATION_KEY_TYPE,
            Algorithm::Ecdsa {
                curve: NamedCurve::P256,
                ..
            } => P256_VERIFICATION_KEY_TYPE,
            Algorithm::Rsa { .. } => RSA_VERIFICATION_KEY_TYPE,
        }
    }

    /// Wire form of this algorithm.
    pub fn descriptor(&self) -> AlgorithmDescriptor {
        AlgorithmDescriptor::from(*self)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Ecdsa { curve, hash } => {
                write!(f, "{}/{}/{}", ECDSA_NAME, curve.as_str(), hash.as_str())
            }
            Algorithm::Rsa {
                modulus_length,
                hash,
            } => write!(f, "{}/{}/{}", RSA_PKCS1_NAME, modulus_length, hash.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire descriptor
// ---------------------------------------------------------------------------

/// Algorithm descriptor as stored in DID Documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_curve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulus_length: Option<u32>,
}

impl From<Algorithm> for AlgorithmDescriptor {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Ecdsa { curve, hash } => Self {
                name: ECDSA_NAME.to_string(),
                hash: Some(hash.as_str().to_string()),
                named_curve: Some(curve.as_str().to_string()),
                modulus_length: None,
            },
            Algorithm::Rsa {
                modulus_length,
                hash,
            } => Self {
                name: RSA_PKCS1_NAME.to_string(),
                hash: Some(hash.as_str().to_string()),
                named_curve: None,
                modulus_length: Some(modulus_length),
            },
        }
    }
}

impl TryFrom<&AlgorithmDescriptor> for Algorithm {
    type Error = CryptoServiceError;

    fn try_from(descriptor: &AlgorithmDescriptor) -> Result<Self, Self::Error> {
        let unsupported = |detail: String| CryptoServiceError::UnsupportedAlgorithm(detail);

        let hash = match descriptor.hash.as_deref() {
            None => HashAlgorithm::default(),
            Some(name) => HashAlgorithm::parse(name)
                .ok_or_else(|| unsupported(format!("hash '{}'", name)))?,
        };

        match descriptor.name.as_str() {
            ECDSA_NAME => {
                let curve_name = descriptor
                    .named_curve
                    .as_deref()
                    .ok_or_else(|| unsupported("ECDSA without namedCurve".to_string()))?;
                let curve = NamedCurve::parse(curve_name)
                    .ok_or_else(|| unsupported(format!("curve '{}'", curve_name)))?;
                Ok(Algorithm::Ecdsa { curve, hash })
            }
            RSA_PKCS1_NAME => {
                let modulus_length = descriptor
                    .modulus_length
                    .unwrap_or(DEFAULT_RSA_MODULUS_LENGTH);
                if !SUPPORTED_RSA_MODULUS_LENGTHS.contains(&modulus_length) {
                    return Err(unsupported(format!("RSA modulus length {}", modulus_length)));
                }
                Ok(Algorithm::Rsa {
                    modulus_length,
                    hash,
                })
            }
            other => Err(unsupported(format!("'{}'", other))),
        }
    }
}
