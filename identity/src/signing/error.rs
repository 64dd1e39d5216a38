//! Errors raised by the document signing pipeline.
//!
//! Every variant belongs to exactly one [`ErrorKind`], which is what callers
//! usually branch on:
//!
//! | Kind       | Raised                                   | Variants |
//! |------------|------------------------------------------|----------|
//! | Format     | before any I/O                           | `EmptyContent`, `InvalidDocumentFormat`, `InvalidDidFormat` |
//! | Resolution | by the DID resolution collaborator       | `Resolution` |
//! | Policy     | after resolution, document can't comply  | `NoVerificationMethods`, `KeyNotFound`, `PrivateKeyNotAvailable` |
//! | Crypto     | by the signature provider while signing  | `Crypto`, `SigningOperation` |
//!
//! Verification never surfaces Crypto errors. They become `Ok(false)`.

use thiserror::Error;

use crate::crypto::CryptoServiceError;
use crate::identity::{ResolutionError, ResolverError};

/// Coarse classification of [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    Resolution,
    Policy,
    Crypto,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    // -- Format ---------------------------------------------------------------
    #[error("document content must not be empty")]
    EmptyContent,

    #[error("invalid signed document: {0}")]
    InvalidDocumentFormat(String),

    #[error("invalid DID format: {0}")]
    InvalidDidFormat(String),

    // -- Resolution -----------------------------------------------------------
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    // -- Policy ---------------------------------------------------------------
    #[error("DID document for {did} has no verification methods")]
    NoVerificationMethods { did: String },

    #[error("no verification method with key id '{key_id}'")]
    KeyNotFound { key_id: String },

    #[error("verification method {method_id} has no private key")]
    PrivateKeyNotAvailable { method_id: String },

    // -- Crypto ---------------------------------------------------------------
    #[error(transparent)]
    Crypto(#[from] CryptoServiceError),

    #[error("signing operation failed: {0}")]
    SigningOperation(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::EmptyContent
            | PipelineError::InvalidDocumentFormat(_)
            | PipelineError::InvalidDidFormat(_) => ErrorKind::Format,
            PipelineError::Resolution(_) => ErrorKind::Resolution,
            PipelineError::NoVerificationMethods { .. }
            | PipelineError::KeyNotFound { .. }
            | PipelineError::PrivateKeyNotAvailable { .. } => ErrorKind::Policy,
            PipelineError::Crypto(_) | PipelineError::SigningOperation(_) => ErrorKind::Crypto,
        }
    }
}

impl From<ResolverError> for PipelineError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::InvalidDidFormat(did) => PipelineError::InvalidDidFormat(did),
            ResolverError::Resolution(e) => PipelineError::Resolution(e),
        }
    }
}
