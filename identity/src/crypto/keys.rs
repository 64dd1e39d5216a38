//! # Key Pairs
//!
//! The output of both key sources in the toolkit: hierarchical derivation
//! (see [`super::derivation`]) and fresh generation by the crypto provider
//! (see [`super::provider`]).
//!
//! Key material is carried as lowercase hex text, which is the form DID
//! Documents store it in. The encoding depends on the algorithm:
//!
//! | Algorithm | `public_key`                    | `private_key`        |
//! |-----------|---------------------------------|----------------------|
//! | ECDSA     | SEC1 uncompressed point (65 B)  | raw scalar (32 B)    |
//! | RSA       | SubjectPublicKeyInfo DER        | PKCS#8 DER           |
//!
//! ## Security considerations
//!
//! - `KeyPair` is immutable once produced. There are no setters.
//! - `KeyPair` does NOT implement `Serialize`. Writing a private key to JSON
//!   should be a deliberate act, done field by field.
//! - `Debug` prints a public key prefix only.

use std::fmt;

/// A public/private key pair in hex encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    public_key: String,
    private_key: String,
}

impl KeyPair {
    /// Only key producers inside the crate construct key pairs.
    pub(crate) fn from_hex_parts(public_key: String, private_key: String) -> Self {
        Self {
            public_key,
            private_key,
        }
    }

    /// Hex-encoded public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Hex-encoded private key.
    ///
    /// **Handle with care.** Whoever holds this string can sign on behalf of
    /// every DID whose document lists the matching public key.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        // Both fields are produced by `hex::encode`, so decoding cannot fail.
        hex::decode(&self.public_key).unwrap_or_default()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix_len = self.public_key.len().min(16);
        write!(f, "KeyPair(pub={}...)", &self.public_key[..prefix_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeyPair {
        KeyPair::from_hex_parts(format!("04{}", "ab".repeat(64)), "cd".repeat(32))
    }

    #[test]
    fn accessors_return_hex_parts() {
        let kp = sample();
        assert_eq!(kp.public_key().len(), 130);
        assert_eq!(kp.private_key().len(), 64);
        assert_eq!(kp.public_key_bytes().len(), 65);
        assert_eq!(kp.public_key_bytes()[0], 0x04);
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let kp = sample();
        let debug = format!("{:?}", kp);
        assert!(debug.starts_with("KeyPair(pub=04abab"));
        assert!(!debug.contains("cdcd"));
    }
}
