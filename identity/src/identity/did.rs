//! # DID Documents
//!
//! The subset of W3C DID Core (v1.0) the signing pipeline relies on: a DID,
//! an ordered list of verification methods, and the `authentication` /
//! `assertionMethod` relationships that reference them.
//!
//! ## DID Format
//!
//! ```text
//! did:<method>:<method-specific-id>
//! ```
//!
//! Any method is accepted for resolution. DIDs minted by this toolkit use
//! the `midnight` method with a hash of the controlling public key:
//!
//! ```text
//! did:midnight:<hex(SHA-256(public key)[..20])>
//! ```
//!
//! ## Private keys in documents
//!
//! A verification method may carry its `privateKey`. That is how a signer's
//! own resolver hands the pipeline something it can sign with. Documents
//! meant for publication must go through [`DidDocument::public_view`] first,
//! which strips every private key.
//!
//! ## Standards References
//!
//! - [DID Core v1.0](https://www.w3.org/TR/did-core/)
//! - [DID Specification Registries](https://www.w3.org/TR/did-spec-registries/)

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{DID_CONTEXT, DID_METHOD, DID_PATTERN};
use crate::crypto::{Algorithm, AlgorithmDescriptor, KeyPair};

static DID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(DID_PATTERN).expect("should compile"));

/// Bytes of the public key hash kept in a minted DID.
const DID_ID_HASH_BYTES: usize = 20;

/// Whether `did` has the `did:<method>:<id>` shape.
pub fn is_valid_did(did: &str) -> bool {
    DID_REGEX.is_match(did)
}

/// Mint a `did:midnight:` identifier from the public half of `key_pair`.
pub fn did_for_public_key(key_pair: &KeyPair) -> String {
    let digest = Sha256::digest(key_pair.public_key_bytes());
    format!(
        "did:{}:{}",
        DID_METHOD,
        hex::encode(&digest[..DID_ID_HASH_BYTES])
    )
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised when building, parsing, or validating DID Documents.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DidError {
    /// The DID string does not match `did:<method>:<id>`.
    #[error("invalid DID format: {0}")]
    InvalidFormat(String),

    /// A verification method with this id already exists.
    #[error("duplicate verification method: {0}")]
    DuplicateMethod(String),

    /// The document is structurally inconsistent.
    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

// ---------------------------------------------------------------------------
// Verification Methods
// ---------------------------------------------------------------------------

/// A key entry in a DID Document.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// DID URL, `<did>#<fragment>`.
    pub id: String,

    /// Key type tag, e.g. `EcdsaSecp256k1VerificationKey2019`.
    #[serde(rename = "type")]
    pub type_: String,

    /// The DID that controls this key.
    pub controller: String,

    /// Hex-encoded public key.
    pub public_key: String,

    /// Hex-encoded private key. Absent for methods nobody here can sign with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    pub algorithm: AlgorithmDescriptor,
}

impl VerificationMethod {
    /// Build a method for `did#fragment` from a key pair, private key included.
    pub fn from_key_pair(did: &str, fragment: &str, key_pair: &KeyPair, algorithm: Algorithm) -> Self {
        Self {
            id: format!("{}#{}", did, fragment),
            type_: algorithm.verification_key_type().to_string(),
            controller: did.to_string(),
            public_key: key_pair.public_key().to_string(),
            private_key: Some(key_pair.private_key().to_string()),
            algorithm: algorithm.descriptor(),
        }
    }

    /// Same method without its private key.
    pub fn without_private_key(&self) -> Self {
        Self {
            private_key: None,
            ..self.clone()
        }
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Fragment after `#`, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.id.rsplit_once('#').map(|(_, fragment)| fragment)
    }
}

impl fmt::Debug for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationMethod")
            .field("id", &self.id)
            .field("type", &self.type_)
            .field("controller", &self.controller)
            .field("public_key", &self.public_key)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("algorithm", &self.algorithm.name)
            .finish()
    }
}

/// Verification relationships a method can be listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Authentication,
    AssertionMethod,
}

// ---------------------------------------------------------------------------
// DID Document
// ---------------------------------------------------------------------------

/// A DID Document.
///
/// `verification_method` is ordered: when a signer names no key, the first
/// method is the one used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// JSON-LD context URIs.
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,

    pub id: String,

    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,
}

impl DidDocument {
    /// An empty document for `did`.
    pub fn new(did: impl Into<String>) -> Result<Self, DidError> {
        let did = did.into();
        if !is_valid_did(&did) {
            return Err(DidError::InvalidFormat(did));
        }
        Ok(Self {
            context: vec![DID_CONTEXT.to_string()],
            id: did,
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
        })
    }

    /// Append a verification method and list it under `relationships`.
    pub fn add_verification_method(
        &mut self,
        method: VerificationMethod,
        relationships: &[Relationship],
    ) -> Result<(), DidError> {
        if self.verification_method.iter().any(|m| m.id == method.id) {
            return Err(DidError::DuplicateMethod(method.id));
        }
        for relationship in relationships {
            let list = match relationship {
                Relationship::Authentication => &mut self.authentication,
                Relationship::AssertionMethod => &mut self.assertion_method,
            };
            if !list.contains(&method.id) {
                list.push(method.id.clone());
            }
        }
        self.verification_method.push(method);
        Ok(())
    }

    /// First method whose id ends with `#<key_id>`.
    pub fn method_for_key_id(&self, key_id: &str) -> Option<&VerificationMethod> {
        let suffix = format!("#{}", key_id);
        self.verification_method
            .iter()
            .find(|m| m.id.ends_with(&suffix))
    }

    /// The method used when no key id is given.
    pub fn default_method(&self) -> Option<&VerificationMethod> {
        self.verification_method.first()
    }

    /// Method selection shared by signing and verification.
    pub fn select_method(&self, key_id: Option<&str>) -> Option<&VerificationMethod> {
        match key_id {
            Some(key_id) => self.method_for_key_id(key_id),
            None => self.default_method(),
        }
    }

    /// Copy of this document with all private keys removed.
    pub fn public_view(&self) -> Self {
        Self {
            verification_method: self
                .verification_method
                .iter()
                .map(VerificationMethod::without_private_key)
                .collect(),
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> Result<String, DidError> {
        serde_json::to_string_pretty(self).map_err(|e| DidError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DidError> {
        serde_json::from_str(json).map_err(|e| DidError::Serialization(e.to_string()))
    }

    /// Structural checks for documents about to be published or registered.
    ///
    /// Resolution does not call this: a document without methods is a valid
    /// resolution result that the signing pipeline rejects on its own terms.
    pub fn validate(&self) -> Result<(), DidError> {
        if !is_valid_did(&self.id) {
            return Err(DidError::InvalidFormat(self.id.clone()));
        }
        if !self.context.iter().any(|c| c == DID_CONTEXT) {
            return Err(DidError::InvalidDocument(
                "document must include the DID Core context".into(),
            ));
        }
        if self.verification_method.is_empty() {
            return Err(DidError::InvalidDocument(
                "document must have at least one verification method".into(),
            ));
        }

        for method in &self.verification_method {
            if !method.id.starts_with(&format!("{}#", self.id)) {
                return Err(DidError::InvalidDocument(format!(
                    "method {} does not belong to {}",
                    method.id, self.id
                )));
            }
            if method.public_key.is_empty() {
                return Err(DidError::InvalidDocument(format!(
                    "method {} has no public key",
                    method.id
                )));
            }
            Algorithm::try_from(&method.algorithm)
                .map_err(|e| DidError::InvalidDocument(format!("method {}: {}", method.id, e)))?;
        }

        for reference in self.authentication.iter().chain(&self.assertion_method) {
            if !self.verification_method.iter().any(|m| &m.id == reference) {
                return Err(DidError::InvalidDocument(format!(
                    "relationship references unknown method {}",
                    reference
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_KEY_FRAGMENT;
    use crate::crypto::{derive_key_pair, KeyPath, Seed};

    fn key_pair() -> KeyPair {
        derive_key_pair(&Seed::from_bytes([7u8; 32]), &KeyPath::default()).unwrap()
    }

    fn document() -> DidDocument {
        let kp = key_pair();
        let did = did_for_public_key(&kp);
        let mut doc = DidDocument::new(&did).unwrap();
        doc.add_verification_method(
            VerificationMethod::from_key_pair(
                &did,
                DEFAULT_KEY_FRAGMENT,
                &kp,
                Algorithm::ecdsa_secp256k1(),
            ),
            &[Relationship::Authentication, Relationship::AssertionMethod],
        )
        .unwrap();
        doc
    }

    #[test]
    fn did_format_validation() {
        assert!(is_valid_did("did:midnight:abc"));
        assert!(is_valid_did("did:web:example.com:users:alice"));
        assert!(is_valid_did("did:key:z6Mk"));

        assert!(!is_valid_did(""));
        assert!(!is_valid_did("did:midnight:"));
        assert!(!is_valid_did("did::abc"));
        assert!(!is_valid_did("did:mid-night:abc"));
        assert!(!is_valid_did("DID:midnight:abc"));
        assert!(!is_valid_did("not-a-did"));
    }

    #[test]
    fn minted_did_is_deterministic() {
        let did = did_for_public_key(&key_pair());
        assert!(did.starts_with("did:midnight:"));
        assert_eq!(did.len(), "did:midnight:".len() + 2 * DID_ID_HASH_BYTES);
        assert_eq!(did, did_for_public_key(&key_pair()));
        assert!(is_valid_did(&did));
    }

    #[test]
    fn new_rejects_malformed_did() {
        assert!(matches!(
            DidDocument::new("midnight:abc"),
            Err(DidError::InvalidFormat(_))
        ));
    }

    #[test]
    fn assembled_document_structure() {
        let doc = document();
        assert_eq!(doc.context, vec![DID_CONTEXT.to_string()]);
        assert_eq!(doc.verification_method.len(), 1);

        let method = &doc.verification_method[0];
        assert_eq!(method.id, format!("{}#key-1", doc.id));
        assert_eq!(method.controller, doc.id);
        assert_eq!(method.type_, "EcdsaSecp256k1VerificationKey2019");
        assert_eq!(method.fragment(), Some("key-1"));
        assert!(method.has_private_key());
        assert_eq!(doc.authentication, vec![method.id.clone()]);
        assert_eq!(doc.assertion_method, vec![method.id.clone()]);
        doc.validate().unwrap();
    }

    #[test]
    fn duplicate_method_rejected() {
        let mut doc = document();
        let again = doc.verification_method[0].clone();
        assert!(matches!(
            doc.add_verification_method(again, &[]),
            Err(DidError::DuplicateMethod(_))
        ));
    }

    #[test]
    fn method_selection() {
        let mut doc = document();
        let mut second = doc.verification_method[0].without_private_key();
        second.id = format!("{}#key-2", doc.id);
        doc.add_verification_method(second, &[Relationship::Authentication])
            .unwrap();

        assert_eq!(doc.default_method().unwrap().fragment(), Some("key-1"));
        assert_eq!(
            doc.method_for_key_id("key-2").unwrap().fragment(),
            Some("key-2")
        );
        assert!(doc.method_for_key_id("key-3").is_none());
        // Suffix match is anchored on '#'.
        assert!(doc.method_for_key_id("2").is_none());
        assert_eq!(doc.select_method(None).unwrap().fragment(), Some("key-1"));
        assert_eq!(
            doc.select_method(Some("key-2")).unwrap().fragment(),
            Some("key-2")
        );
    }

    #[test]
    fn public_view_strips_private_keys() {
        let doc = document();
        let public = doc.public_view();
        assert!(public.verification_method.iter().all(|m| !m.has_private_key()));
        assert_eq!(public.id, doc.id);

        let json = public.to_json().unwrap();
        assert!(!json.contains("privateKey"));
    }

    #[test]
    fn debug_redacts_private_key() {
        let doc = document();
        let secret = doc.verification_method[0].private_key.clone().unwrap();
        let debug = format!("{:?}", doc);
        assert!(!debug.contains(&secret));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn json_roundtrip_uses_did_core_names() {
        let doc = document();
        let json = doc.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("@context").is_some());
        assert!(value.get("verificationMethod").is_some());
        assert!(value.get("assertionMethod").is_some());
        assert!(value["verificationMethod"][0].get("publicKey").is_some());
        assert_eq!(value["verificationMethod"][0]["algorithm"]["name"], "ECDSA");

        assert_eq!(DidDocument::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn validate_catches_inconsistencies() {
        let mut doc = document();
        doc.authentication.push(format!("{}#ghost", doc.id));
        assert!(matches!(doc.validate(), Err(DidError::InvalidDocument(_))));

        let mut doc = document();
        doc.verification_method[0].id = "did:other:x#key-1".into();
        assert!(matches!(doc.validate(), Err(DidError::InvalidDocument(_))));

        let mut doc = document();
        doc.verification_method[0].algorithm.name = "Ed25519".into();
        assert!(matches!(doc.validate(), Err(DidError::InvalidDocument(_))));

        let doc = DidDocument::new("did:midnight:empty").unwrap();
        assert!(matches!(doc.validate(), Err(DidError::InvalidDocument(_))));
    }
}
