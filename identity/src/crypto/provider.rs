//! # Crypto Provider
//!
//! The pluggable backend that does the actual arithmetic. [`SignatureProvider`]
//! never touches a curve or a modulus itself; it hands opaque key material and
//! a closed [`Algorithm`] to whatever implements [`CryptoProvider`].
//!
//! [`RustCryptoProvider`] is the default backend, built on the RustCrypto
//! crates (`k256`, `p256`, `rsa`, `sha2`). Alternative backends (an HSM, a
//! platform keystore) implement the same trait.
//!
//! ## Key material
//!
//! | Algorithm | private key (hex)   | public key (hex)                         |
//! |-----------|---------------------|------------------------------------------|
//! | ECDSA     | 32-byte scalar      | SEC1 point, uncompressed out, either in  |
//! | RSA       | PKCS#8 DER          | SubjectPublicKeyInfo DER                 |
//!
//! ECDSA signatures are fixed-width `r || s`. RSA signatures are PKCS#1 v1.5
//! over the digest named by the algorithm.
//!
//! ## Failure semantics
//!
//! A key that cannot be decoded is an error. A signature that cannot be
//! decoded is just a signature that does not verify: `verify` returns
//! `Ok(false)`.
//!
//! [`SignatureProvider`]: super::signatures::SignatureProvider

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use thiserror::Error;

use super::algorithm::{Algorithm, HashAlgorithm, NamedCurve};
use super::keys::KeyPair;
use crate::config::{
    COMPRESSED_PUBLIC_KEY_LENGTH, PRIVATE_KEY_LENGTH, UNCOMPRESSED_PUBLIC_KEY_LENGTH,
};

/// Failures reported by a crypto backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// A signing backend.
///
/// Implementations must be safe to call from blocking worker threads; the
/// signing pipeline runs every call on `tokio::task::spawn_blocking`.
pub trait CryptoProvider: Send + Sync {
    /// Generate a fresh key pair for `algorithm`.
    fn generate_key_pair(&self, algorithm: &Algorithm) -> Result<KeyPair, ProviderError>;

    /// Sign `data`. The backend hashes `data` with the algorithm's digest.
    fn sign(
        &self,
        algorithm: &Algorithm,
        private_key: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;

    /// Verify `signature` over `data`.
    fn verify(
        &self,
        algorithm: &Algorithm,
        public_key: &str,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError>;
}

/// Default backend on the RustCrypto stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for RustCryptoProvider {
    fn generate_key_pair(&self, algorithm: &Algorithm) -> Result<KeyPair, ProviderError> {
        match algorithm {
            Algorithm::Ecdsa {
                curve: NamedCurve::Secp256k1,
                ..
            } => Ok(secp256k1::generate()),
            Algorithm::Ecdsa {
                curve: NamedCurve::P256,
                ..
            } => Ok(p256_curve::generate()),
            Algorithm::Rsa { modulus_length, .. } => rsa_pkcs1::generate(*modulus_length),
        }
    }

    fn sign(
        &self,
        algorithm: &Algorithm,
        private_key: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let digest = algorithm.hash().digest(data);
        match algorithm {
            Algorithm::Ecdsa {
                curve: NamedCurve::Secp256k1,
                ..
            } => secp256k1::sign(private_key, &digest),
            Algorithm::Ecdsa {
                curve: NamedCurve::P256,
                ..
            } => p256_curve::sign(private_key, &digest),
            Algorithm::Rsa { hash, .. } => rsa_pkcs1::sign(*hash, private_key, &digest),
        }
    }

    fn verify(
        &self,
        algorithm: &Algorithm,
        public_key: &str,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError> {
        let digest = algorithm.hash().digest(data);
        match algorithm {
            Algorithm::Ecdsa {
                curve: NamedCurve::Secp256k1,
                ..
            } => secp256k1::verify(public_key, &digest, signature),
            Algorithm::Ecdsa {
                curve: NamedCurve::P256,
                ..
            } => p256_curve::verify(public_key, &digest, signature),
            Algorithm::Rsa { hash, .. } => rsa_pkcs1::verify(*hash, public_key, &digest, signature),
        }
    }
}

fn decode_hex(what: &str, value: &str) -> Result<Vec<u8>, ProviderError> {
    hex::decode(value).map_err(|e| ProviderError::InvalidKey(format!("{} is not hex: {}", what, e)))
}

fn decode_scalar(private_key: &str) -> Result<Vec<u8>, ProviderError> {
    let bytes = decode_hex("private key", private_key)?;
    if bytes.len() != PRIVATE_KEY_LENGTH {
        return Err(ProviderError::InvalidKey(format!(
            "ECDSA private key must be {} bytes, got {}",
            PRIVATE_KEY_LENGTH,
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn decode_point(public_key: &str) -> Result<Vec<u8>, ProviderError> {
    let bytes = decode_hex("public key", public_key)?;
    if bytes.len() != UNCOMPRESSED_PUBLIC_KEY_LENGTH && bytes.len() != COMPRESSED_PUBLIC_KEY_LENGTH {
        return Err(ProviderError::InvalidKey(format!(
            "ECDSA public key must be a {} or {} byte SEC1 point, got {} bytes",
            COMPRESSED_PUBLIC_KEY_LENGTH,
            UNCOMPRESSED_PUBLIC_KEY_LENGTH,
            bytes.len()
        )));
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// ECDSA backends
// ---------------------------------------------------------------------------

mod secp256k1 {
    use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

    use super::*;

    pub(super) fn generate() -> KeyPair {
        let signing_key = SigningKey::random(&mut OsRng);
        let public = signing_key.verifying_key().to_encoded_point(false);
        KeyPair::from_hex_parts(
            hex::encode(public.as_bytes()),
            hex::encode(signing_key.to_bytes()),
        )
    }

    pub(super) fn sign(private_key: &str, digest: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let bytes = decode_scalar(private_key)?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| ProviderError::InvalidKey("not a secp256k1 scalar".into()))?;
        let signature: Signature = signing_key
            .sign_prehash(digest)
            .map_err(|e| ProviderError::Backend(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }

    pub(super) fn verify(
        public_key: &str,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError> {
        let bytes = decode_point(public_key)?;
        let verifying_key = VerifyingKey::from_sec1_bytes(&bytes)
            .map_err(|_| ProviderError::InvalidKey("not a secp256k1 point".into()))?;
        let Ok(signature) = Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(verifying_key.verify_prehash(digest, &signature).is_ok())
    }
}

mod p256_curve {
    use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

    use super::*;

    pub(super) fn generate() -> KeyPair {
        let signing_key = SigningKey::random(&mut OsRng);
        let public = signing_key.verifying_key().to_encoded_point(false);
        KeyPair::from_hex_parts(
            hex::encode(public.as_bytes()),
            hex::encode(signing_key.to_bytes()),
        )
    }

    pub(super) fn sign(private_key: &str, digest: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let bytes = decode_scalar(private_key)?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| ProviderError::InvalidKey("not a P-256 scalar".into()))?;
        let signature: Signature = signing_key
            .sign_prehash(digest)
            .map_err(|e| ProviderError::Backend(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }

    pub(super) fn verify(
        public_key: &str,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError> {
        let bytes = decode_point(public_key)?;
        let verifying_key = VerifyingKey::from_sec1_bytes(&bytes)
            .map_err(|_| ProviderError::InvalidKey("not a P-256 point".into()))?;
        let Ok(signature) = Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(verifying_key.verify_prehash(digest, &signature).is_ok())
    }
}

// ---------------------------------------------------------------------------
// RSA backend
// ---------------------------------------------------------------------------

mod rsa_pkcs1 {
    use super::*;

    fn scheme(hash: HashAlgorithm) -> Pkcs1v15Sign {
        match hash {
            HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }

    pub(super) fn generate(modulus_length: u32) -> Result<KeyPair, ProviderError> {
        let private = RsaPrivateKey::new(&mut OsRng, modulus_length as usize)
            .map_err(|e| ProviderError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| ProviderError::KeyGeneration(e.to_string()))?;
        let public_der = public
            .to_public_key_der()
            .map_err(|e| ProviderError::KeyGeneration(e.to_string()))?;

        Ok(KeyPair::from_hex_parts(
            hex::encode(public_der.as_bytes()),
            hex::encode(private_der.as_bytes()),
        ))
    }

    pub(super) fn sign(
        hash: HashAlgorithm,
        private_key: &str,
        digest: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let der = decode_hex("private key", private_key)?;
        let private = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| ProviderError::InvalidKey(format!("not a PKCS#8 RSA key: {}", e)))?;
        private
            .sign(scheme(hash), digest)
            .map_err(|e| ProviderError::Backend(e.to_string()))
    }

    pub(super) fn verify(
        hash: HashAlgorithm,
        public_key: &str,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError> {
        let der = decode_hex("public key", public_key)?;
        let public = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| ProviderError::InvalidKey(format!("not an SPKI RSA key: {}", e)))?;
        Ok(public.verify(scheme(hash), digest, signature).is_ok())
    }
}
