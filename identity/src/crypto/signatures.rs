//! # Signature Provider
//!
//! The one entry point the rest of the toolkit uses for signatures. It
//! translates wire-level [`AlgorithmDescriptor`]s into the closed
//! [`Algorithm`] type, delegates the arithmetic to a [`CryptoProvider`], and
//! packages the result in the encodings DID Documents and signed documents
//! use: base64 signatures, hex keys, and a `<Algorithm>Signature2024` suite
//! name.
//!
//! ## Error contract
//!
//! Signing is strict: every failure is an `Err`. Verification only errors
//! when the backend itself fails (unreadable key, broken backend). A
//! signature that is not valid base64 is simply a signature that does not
//! verify, so it yields `Ok(false)`.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::algorithm::{Algorithm, AlgorithmDescriptor};
use super::keys::KeyPair;
use super::provider::{CryptoProvider, RustCryptoProvider};

/// Errors from the signature provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoServiceError {
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),
}

/// Parameters recorded next to a fresh signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureOutputParams {
    /// Suite name, e.g. `ECDSASignature2024`.
    #[serde(rename = "type")]
    pub signature_type: String,
    pub created: DateTime<Utc>,
}

/// A base64 signature plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureOutput {
    pub signature: String,
    pub params: SignatureOutputParams,
}

/// Algorithm-agnostic signing facade over a [`CryptoProvider`].
///
/// Cloning is cheap: clones share the backend.
#[derive(Clone)]
pub struct SignatureProvider {
    backend: Arc<dyn CryptoProvider>,
}

impl Default for SignatureProvider {
    fn default() -> Self {
        Self::new(Arc::new(RustCryptoProvider::new()))
    }
}

impl std::fmt::Debug for SignatureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureProvider").finish_non_exhaustive()
    }
}

impl SignatureProvider {
    pub fn new(backend: Arc<dyn CryptoProvider>) -> Self {
        Self { backend }
    }

    /// Generate a key pair for the described algorithm.
    pub fn generate_key_pair(
        &self,
        descriptor: &AlgorithmDescriptor,
    ) -> Result<KeyPair, CryptoServiceError> {
        let algorithm = Algorithm::try_from(descriptor)?;
        debug!(%algorithm, "generating key pair");
        self.backend
            .generate_key_pair(&algorithm)
            .map_err(|e| CryptoServiceError::KeyGeneration(e.to_string()))
    }

    /// Sign the UTF-8 bytes of `content` with a hex-encoded private key.
    pub fn sign(
        &self,
        content: &str,
        private_key: &str,
        descriptor: &AlgorithmDescriptor,
    ) -> Result<SignatureOutput, CryptoServiceError> {
        let algorithm = Algorithm::try_from(descriptor)?;
        let raw = self
            .backend
            .sign(&algorithm, private_key, content.as_bytes())
            .map_err(|e| CryptoServiceError::Signing(e.to_string()))?;

        debug!(%algorithm, content_len = content.len(), "content signed");

        Ok(SignatureOutput {
            signature: BASE64.encode(raw),
            params: SignatureOutputParams {
                signature_type: algorithm.signature_type(),
                created: Utc::now(),
            },
        })
    }

    /// Verify a base64 signature over `content` against a hex-encoded public key.
    pub fn verify(
        &self,
        content: &str,
        signature: &str,
        public_key: &str,
        descriptor: &AlgorithmDescriptor,
    ) -> Result<bool, CryptoServiceError> {
        let algorithm = Algorithm::try_from(descriptor)?;
        let Ok(raw) = BASE64.decode(signature) else {
            debug!(%algorithm, "signature is not valid base64");
            return Ok(false);
        };
        self.backend
            .verify(&algorithm, public_key, content.as_bytes(), &raw)
            .map_err(|e| CryptoServiceError::Verification(e.to_string()))
    }
}
