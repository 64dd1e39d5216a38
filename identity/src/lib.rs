// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Midnight Identity: Core Library
//!
//! The cryptographic core behind Midnight DIDs. It derives keys from seeds
//! and signs documents on behalf of a DID. Wallets, ledgers and KYC flows
//! live elsewhere and plug in through traits.
//!
//! ## Architecture
//!
//! - **config**: Derivation paths, suite names, DID syntax. The contract.
//! - **crypto**: HD key derivation on secp256k1 and a signature provider
//!   over ECDSA (P-256, secp256k1) and RSA PKCS#1 v1.5.
//! - **identity**: DID Documents, a shared resolution cache, and the
//!   resolver that sits in front of a pluggable resolution backend.
//! - **signing**: The document signing pipeline. Signs as a DID and verifies
//!   what a DID signed.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use midnight_identity::crypto::{derive_key_pair, Algorithm, KeyPath, Seed, SignatureProvider};
//! use midnight_identity::identity::{
//!     did_for_public_key, DidDocument, DidKeyResolver, InMemoryResolver, Relationship,
//!     VerificationMethod,
//! };
//! use midnight_identity::signing::DocumentSigningPipeline;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let seed = Seed::from_hex(&"00".repeat(32))?;
//! let keys = derive_key_pair(&seed, &KeyPath::default())?;
//!
//! let did = did_for_public_key(&keys);
//! let mut document = DidDocument::new(&did)?;
//! document.add_verification_method(
//!     VerificationMethod::from_key_pair(&did, "key-1", &keys, Algorithm::ecdsa_secp256k1()),
//!     &[Relationship::AssertionMethod],
//! )?;
//!
//! let registry = Arc::new(InMemoryResolver::new());
//! registry.insert(document);
//!
//! let pipeline =
//!     DocumentSigningPipeline::new(DidKeyResolver::new(registry), SignatureProvider::default());
//! let signed = pipeline.create_signed_document("hello", &did, None, None).await?;
//! assert!(pipeline.verify_signature(&signed).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Philosophy
//!
//! 1. Signing fails loudly. Verification fails closed.
//! 2. Key material never reaches a log line or a `Debug` string.
//! 3. No arithmetic of our own: derivation follows BIP-32 to the letter and
//!    every primitive comes from RustCrypto.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod signing;
