//! # Document Signing
//!
//! Signing documents as a DID and verifying documents signed by DIDs. The
//! pipeline ties the other modules together: it resolves the signer through
//! [`crate::identity::DidKeyResolver`], picks a verification method, and
//! hands the key to [`crate::crypto::SignatureProvider`].
//!
//! The error contract is deliberately asymmetric. Signing fails loudly with a
//! [`PipelineError`]; verification reports cryptographic rejection as
//! `Ok(false)` and errors only on malformed input or failed resolution.

pub mod document;
pub mod error;
pub mod pipeline;

pub use document::{ProofPurpose, SignatureParams, SignedDocument};
pub use error::{ErrorKind, PipelineError};
pub use pipeline::{DocumentSigningPipeline, SigningOptions, VerificationOutcome};
