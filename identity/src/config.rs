//! # Identity Constants
//!
//! Every magic number in the identity core lives here. Derivation paths,
//! signature suite names and the DID syntax are part of the external
//! contract: keys derived today must be re-derivable next year, and
//! documents signed today must still verify. Change nothing here casually.

// ---------------------------------------------------------------------------
// Hierarchical Derivation
// ---------------------------------------------------------------------------

/// BIP-44 purpose segment. Always hardened.
pub const BIP44_PURPOSE: u32 = 44;

/// Registered coin type for Midnight identities. Always hardened.
pub const MIDNIGHT_COIN_TYPE: u32 = 7777;

/// Offset that marks a child index as hardened (`i' = i + 2^31`).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// HMAC key for master key generation. Shared with BIP-32 so that standard
/// test vectors apply to this engine unchanged.
pub const MASTER_KEY_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Upper bound on consecutive invalid child keys before derivation gives up.
///
/// Each retry happens with probability below 2^-127, so reaching this cap
/// means the input is adversarial or the arithmetic backend is broken.
pub const MAX_CHILD_DERIVATION_ATTEMPTS: u32 = 1 << 20;

// ---------------------------------------------------------------------------
// Key Material Sizes
// ---------------------------------------------------------------------------

/// Seed length in bytes (64 hex characters).
pub const SEED_LENGTH: usize = 32;

/// secp256k1 / P-256 private scalar length in bytes.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Chain code length in bytes.
pub const CHAIN_CODE_LENGTH: usize = 32;

/// Uncompressed SEC1 point: `0x04 || X || Y`.
pub const UNCOMPRESSED_PUBLIC_KEY_LENGTH: usize = 65;

/// Compressed SEC1 point: `0x02/0x03 || X`.
pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;

// ---------------------------------------------------------------------------
// Signature Suites
// ---------------------------------------------------------------------------

/// Suffix appended to the algorithm name to form `signatureParams.type`,
/// e.g. `ECDSASignature2024`.
pub const SIGNATURE_SUITE_SUFFIX: &str = "Signature2024";

/// RSA modulus lengths (bits) accepted for key generation and signing.
pub const SUPPORTED_RSA_MODULUS_LENGTHS: [u32; 3] = [2048, 3072, 4096];

/// Modulus length used when a descriptor omits `modulusLength`.
pub const DEFAULT_RSA_MODULUS_LENGTH: u32 = 2048;

// ---------------------------------------------------------------------------
// DIDs
// ---------------------------------------------------------------------------

/// DID method for identities issued by this toolkit.
pub const DID_METHOD: &str = "midnight";

/// Context URI for the W3C DID Core specification.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Syntax every DID must match before any resolution is attempted.
pub const DID_PATTERN: &str = r"^did:[a-zA-Z0-9]+:.+$";

/// Fragment used for the first verification method of a generated document.
pub const DEFAULT_KEY_FRAGMENT: &str = "key-1";

/// Verification method type for secp256k1 keys.
pub const SECP256K1_VERIFICATION_KEY_TYPE: &str = "EcdsaSecp256k1VerificationKey2019";

/// Verification method type for P-256 keys.
pub const P256_VERIFICATION_KEY_TYPE: &str = "EcdsaSecp256r1VerificationKey2019";

/// Verification method type for RSA keys.
pub const RSA_VERIFICATION_KEY_TYPE: &str = "RsaVerificationKey2018";
