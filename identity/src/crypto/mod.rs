//! # Cryptographic Core
//!
//! Everything that touches key material lives here:
//!
//! - **derivation**: BIP-32 style hierarchical derivation on secp256k1,
//!   from a 32-byte seed down a `m/44'/7777'/account'/change/index` path.
//! - **keys**: the hex-encoded [`KeyPair`] every key source produces.
//! - **algorithm**: the closed set of signature algorithms and their wire
//!   descriptors.
//! - **provider**: the pluggable backend that performs the arithmetic.
//! - **signatures**: [`SignatureProvider`], the facade the signing pipeline
//!   talks to.
//!
//! None of this is novel cryptography. Derivation follows BIP-32 exactly
//! (its published test vectors pass against this engine) and every
//! primitive comes from the RustCrypto crates.

pub mod algorithm;
pub mod derivation;
pub mod keys;
pub mod provider;
pub mod signatures;

pub use algorithm::{Algorithm, AlgorithmDescriptor, HashAlgorithm, NamedCurve};
pub use derivation::{derive_key_pair, generate_seed, KeyDerivationError, KeyPath, Seed};
pub use keys::KeyPair;
pub use provider::{CryptoProvider, ProviderError, RustCryptoProvider};
pub use signatures::{CryptoServiceError, SignatureOutput, SignatureOutputParams, SignatureProvider};
