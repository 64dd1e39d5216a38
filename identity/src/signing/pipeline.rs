//! # Document Signing Pipeline
//!
//! Signing and verification of documents on behalf of DIDs.
//!
//! ## Signing
//!
//! ```text
//! ValidateContent -> ResolveDID -> SelectVerificationMethod
//!     -> CheckPrivateKeyPresent -> Sign -> Done
//! ```
//!
//! Every failure is an `Err`. Provider errors come back as
//! [`PipelineError::Crypto`] exactly as the provider raised them.
//!
//! ## Verification
//!
//! ```text
//! ValidateShape -> ResolveDID -> SelectVerificationMethod
//!     -> CheckMethodIdMatches -> CheckTimestampNotFuture -> CryptoVerify
//! ```
//!
//! Verification runs in two phases with different result types:
//!
//! - **prepare** returns `Result`. Malformed documents and resolution
//!   failures are errors the caller has to see.
//! - **check** returns a [`VerificationOutcome`] and cannot fail. A wrong
//!   key, a future timestamp, a provider error, a mangled signature: all of
//!   them end as a non-valid outcome, and [`verify_signature`] reports
//!   `false`. A verifier must never crash on a malformed-but-parseable
//!   signature.
//!
//! Rejection reasons are emitted as `tracing` warnings and are available
//! through [`verify_signature_with_outcome`]; the boolean does not change.
//!
//! ## Blocking work
//!
//! Provider calls (RSA in particular) are CPU-bound and run on tokio's
//! blocking pool.
//!
//! [`verify_signature`]: DocumentSigningPipeline::verify_signature
//! [`verify_signature_with_outcome`]: DocumentSigningPipeline::verify_signature_with_outcome

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::document::{ProofPurpose, SignatureParams, SignedDocument};
use super::error::PipelineError;
use crate::crypto::{CryptoServiceError, SignatureProvider};
use crate::identity::{DidDocument, DidKeyResolver};

/// Caller-controlled signing parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SigningOptions {
    pub proof_purpose: ProofPurpose,
}

/// Why a verification ended the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid,
    /// The signer's document has no method for the requested key.
    MethodNotFound { key_id: Option<String> },
    /// The selected method is not the one the signature claims.
    VerificationMethodMismatch { selected: String, claimed: String },
    /// `signatureParams.created` is later than the verifier's clock.
    CreatedInFuture { created: DateTime<Utc> },
    /// The provider ran and rejected the signature.
    SignatureMismatch,
    /// The provider failed.
    CryptoFailure(CryptoServiceError),
    /// The provider call never completed.
    Aborted(String),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid)
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Valid => write!(f, "valid"),
            VerificationOutcome::MethodNotFound { key_id: Some(key_id) } => {
                write!(f, "no verification method for key id '{}'", key_id)
            }
            VerificationOutcome::MethodNotFound { key_id: None } => {
                write!(f, "signer has no verification methods")
            }
            VerificationOutcome::VerificationMethodMismatch { selected, claimed } => write!(
                f,
                "signature claims method {} but {} was selected",
                claimed, selected
            ),
            VerificationOutcome::CreatedInFuture { created } => write!(
                f,
                "signature created in the future ({})",
                created.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            VerificationOutcome::SignatureMismatch => write!(f, "signature does not match"),
            VerificationOutcome::CryptoFailure(e) => write!(f, "crypto failure: {}", e),
            VerificationOutcome::Aborted(reason) => write!(f, "verification aborted: {}", reason),
        }
    }
}

/// Output of the prepare phase: a well-formed document and its signer.
struct PreparedVerification<'a> {
    document: &'a SignedDocument,
    signer: Arc<DidDocument>,
    created: DateTime<Utc>,
}

/// Signs documents as DIDs and verifies documents signed by DIDs.
#[derive(Debug, Clone)]
pub struct DocumentSigningPipeline {
    resolver: DidKeyResolver,
    signer: SignatureProvider,
}

impl DocumentSigningPipeline {
    pub fn new(resolver: DidKeyResolver, signer: SignatureProvider) -> Self {
        Self { resolver, signer }
    }

    pub fn resolver(&self) -> &DidKeyResolver {
        &self.resolver
    }

    pub fn signature_provider(&self) -> &SignatureProvider {
        &self.signer
    }

    // -----------------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------------

    /// Sign `content` with a key from `signer_did`'s DID Document.
    ///
    /// With `key_id`, the first method whose id ends in `#<key_id>` signs;
    /// without it, the document's first method does.
    ///
    /// # Panics
    ///
    /// Panics if polled outside a Tokio runtime; signing runs on
    /// `tokio::task::spawn_blocking`.
    #[instrument(skip(self, content, options), fields(content_len = content.len()))]
    pub async fn create_signed_document(
        &self,
        content: &str,
        signer_did: &str,
        key_id: Option<&str>,
        options: Option<SigningOptions>,
    ) -> Result<SignedDocument, PipelineError> {
        if content.is_empty() {
            return Err(PipelineError::EmptyContent);
        }

        let did_document = self.resolver.resolve_did(signer_did).await?;
        if did_document.verification_method.is_empty() {
            return Err(PipelineError::NoVerificationMethods {
                did: signer_did.to_string(),
            });
        }

        let method = match key_id {
            Some(key_id) => {
                did_document
                    .method_for_key_id(key_id)
                    .ok_or_else(|| PipelineError::KeyNotFound {
                        key_id: key_id.to_string(),
                    })?
            }
            None => did_document
                .default_method()
                .ok_or_else(|| PipelineError::NoVerificationMethods {
                    did: signer_did.to_string(),
                })?,
        };

        let private_key = method
            .private_key
            .clone()
            .ok_or_else(|| PipelineError::PrivateKeyNotAvailable {
                method_id: method.id.clone(),
            })?;

        debug!(method_id = %method.id, algorithm = %method.algorithm.name, "signing");

        let signer = self.signer.clone();
        let algorithm = method.algorithm.clone();
        let payload = content.to_string();
        let output = tokio::task::spawn_blocking(move || {
            signer.sign(&payload, &private_key, &algorithm)
        })
        .await
        .map_err(|e| PipelineError::SigningOperation(e.to_string()))??;

        let options = options.unwrap_or_default();
        let params = SignatureParams {
            signature_type: output.params.signature_type,
            created: output
                .params
                .created
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            verification_method: method.id.clone(),
            proof_purpose: options.proof_purpose,
        };

        info!(
            method_id = %method.id,
            signature_type = %params.signature_type,
            proof_purpose = %params.proof_purpose,
            "document signed"
        );

        Ok(SignedDocument::new(
            content.to_string(),
            output.signature,
            params,
            signer_did.to_string(),
            key_id.map(str::to_string),
        ))
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Verify a signed document.
    ///
    /// `Err` only for malformed documents and failed DID resolution. Every
    /// cryptographic rejection is `Ok(false)`.
    ///
    /// # Panics
    ///
    /// Same as [`Self::verify_signature_with_outcome`].
    pub async fn verify_signature(&self, document: &SignedDocument) -> Result<bool, PipelineError> {
        Ok(self.verify_signature_with_outcome(document).await?.is_valid())
    }

    /// Like [`Self::verify_signature`], but says why.
    ///
    /// # Panics
    ///
    /// Panics if polled outside a Tokio runtime; the provider call runs on
    /// `tokio::task::spawn_blocking`.
    #[instrument(skip(self, document), fields(did = %document.signer_did()))]
    pub async fn verify_signature_with_outcome(
        &self,
        document: &SignedDocument,
    ) -> Result<VerificationOutcome, PipelineError> {
        let prepared = self.prepare(document).await?;
        let outcome = self.check(prepared).await;

        if outcome.is_valid() {
            debug!("signature valid");
        } else {
            warn!(reason = %outcome, "signature rejected");
        }
        Ok(outcome)
    }

    /// Verify an untyped JSON document after checking its shape.
    pub async fn verify_signature_json(&self, document: &Value) -> Result<bool, PipelineError> {
        let document = SignedDocument::from_value(document)?;
        self.verify_signature(&document).await
    }

    async fn prepare<'a>(
        &self,
        document: &'a SignedDocument,
    ) -> Result<PreparedVerification<'a>, PipelineError> {
        document.validate()?;
        let created = document.signature_params().created_at()?;
        let signer = self.resolver.resolve_did(document.signer_did()).await?;
        Ok(PreparedVerification {
            document,
            signer,
            created,
        })
    }

    async fn check(&self, prepared: PreparedVerification<'_>) -> VerificationOutcome {
        let PreparedVerification {
            document,
            signer,
            created,
        } = prepared;

        let Some(method) = signer.select_method(document.key_id()) else {
            return VerificationOutcome::MethodNotFound {
                key_id: document.key_id().map(str::to_string),
            };
        };

        let claimed = &document.signature_params().verification_method;
        if &method.id != claimed {
            return VerificationOutcome::VerificationMethodMismatch {
                selected: method.id.clone(),
                claimed: claimed.clone(),
            };
        }

        if created > Utc::now() {
            return VerificationOutcome::CreatedInFuture { created };
        }

        let provider = self.signer.clone();
        let content = document.content().to_string();
        let signature = document.signature().to_string();
        let public_key = method.public_key.clone();
        let algorithm = method.algorithm.clone();
        let result = tokio::task::spawn_blocking(move || {
            provider.verify(&content, &signature, &public_key, &algorithm)
        })
        .await;

        match result {
            Ok(Ok(true)) => VerificationOutcome::Valid,
            Ok(Ok(false)) => VerificationOutcome::SignatureMismatch,
            Ok(Err(e)) => VerificationOutcome::CryptoFailure(e),
            Err(e) => VerificationOutcome::Aborted(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_KEY_FRAGMENT;
    use crate::crypto::{derive_key_pair, Algorithm, KeyPath, Seed};
    use crate::identity::{
        did_for_public_key, InMemoryResolver, Relationship, ResolutionError, VerificationMethod,
    };
    use serde_json::json;

    struct Fixture {
        pipeline: DocumentSigningPipeline,
        registry: Arc<InMemoryResolver>,
        did: String,
    }

    fn fixture() -> Fixture {
        let kp = derive_key_pair(&Seed::from_bytes([1u8; 32]), &KeyPath::default()).unwrap();
        let did = did_for_public_key(&kp);
        let mut doc = DidDocument::new(&did).unwrap();
        doc.add_verification_method(
            VerificationMethod::from_key_pair(&did, DEFAULT_KEY_FRAGMENT, &kp, Algorithm::ecdsa_secp256k1()),
            &[Relationship::AssertionMethod],
        )
        .unwrap();

        let second = derive_key_pair(&Seed::from_bytes([1u8; 32]), &KeyPath::new(0, 0, 1)).unwrap();
        doc.add_verification_method(
            VerificationMethod::from_key_pair(&did, "key-2", &second, Algorithm::ecdsa_secp256k1()),
            &[Relationship::Authentication],
        )
        .unwrap();

        let registry = Arc::new(InMemoryResolver::new());
        registry.insert(doc);
        let pipeline = DocumentSigningPipeline::new(
            DidKeyResolver::new(registry.clone()),
            SignatureProvider::default(),
        );
        Fixture {
            pipeline,
            registry,
            did,
        }
    }

    fn tamper(document: &SignedDocument, edit: impl FnOnce(&mut Value)) -> SignedDocument {
        let mut value = document.to_value().unwrap();
        edit(&mut value);
        SignedDocument::from_value(&value).unwrap()
    }

    #[tokio::test]
    async fn sign_then_verify() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("hello", &f.did, None, None)
            .await
            .unwrap();

        assert_eq!(signed.content(), "hello");
        assert_eq!(signed.signer_did(), f.did);
        assert_eq!(signed.key_id(), None);
        let params = signed.signature_params();
        assert_eq!(params.signature_type, "ECDSASignature2024");
        assert_eq!(params.verification_method, format!("{}#key-1", f.did));
        assert_eq!(params.proof_purpose, ProofPurpose::AssertionMethod);
        assert!(params.created.ends_with('Z'));
        assert_eq!(params.created.len(), "2026-01-01T00:00:00.000Z".len());

        assert!(f.pipeline.verify_signature(&signed).await.unwrap());
    }

    #[tokio::test]
    async fn explicit_key_and_proof_purpose() {
        let f = fixture();
        let options = SigningOptions {
            proof_purpose: ProofPurpose::Authentication,
        };
        let signed = f
            .pipeline
            .create_signed_document("login", &f.did, Some("key-2"), Some(options))
            .await
            .unwrap();

        assert_eq!(signed.key_id(), Some("key-2"));
        assert_eq!(
            signed.signature_params().verification_method,
            format!("{}#key-2", f.did)
        );
        assert_eq!(signed.signature_params().proof_purpose, ProofPurpose::Authentication);
        assert!(f.pipeline.verify_signature(&signed).await.unwrap());
    }

    #[tokio::test]
    async fn empty_content_rejected_before_resolution() {
        let f = fixture();
        let err = f
            .pipeline
            .create_signed_document("", "not a did", None, None)
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::EmptyContent);
        assert!(f.pipeline.resolver().cache().is_empty());
    }

    #[tokio::test]
    async fn signing_policy_errors() {
        let f = fixture();

        let err = f
            .pipeline
            .create_signed_document("x", &f.did, Some("key-9"), None)
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::KeyNotFound { key_id: "key-9".into() });

        let mut public = f.registry.remove(&f.did).unwrap().public_view();
        public.id = "did:midnight:public".into();
        f.registry.insert(public);
        let err = f
            .pipeline
            .create_signed_document("x", "did:midnight:public", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::PrivateKeyNotAvailable { .. }));

        f.registry.insert(DidDocument::new("did:midnight:empty").unwrap());
        let err = f
            .pipeline
            .create_signed_document("x", "did:midnight:empty", None, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::NoVerificationMethods {
                did: "did:midnight:empty".into()
            }
        );
    }

    #[tokio::test]
    async fn signing_resolution_errors_pass_through() {
        let f = fixture();
        let err = f
            .pipeline
            .create_signed_document("x", "did:midnight:nobody", None, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::Resolution(ResolutionError::NotFound("did:midnight:nobody".into()))
        );

        let err = f
            .pipeline
            .create_signed_document("x", "nobody", None, None)
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::InvalidDidFormat("nobody".into()));
    }

    #[tokio::test]
    async fn signing_crypto_errors_pass_through() {
        let f = fixture();
        let mut doc = f.registry.remove(&f.did).unwrap();
        doc.verification_method[0].algorithm.name = "Ed25519".into();
        f.registry.insert(doc);

        let err = f
            .pipeline
            .create_signed_document("x", &f.did, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Crypto(CryptoServiceError::UnsupportedAlgorithm(_))
        ));
    }

    #[tokio::test]
    async fn tampered_content_is_false() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("pay 10", &f.did, None, None)
            .await
            .unwrap();
        let forged = tamper(&signed, |v| v["content"] = json!("pay 1000"));

        let outcome = f.pipeline.verify_signature_with_outcome(&forged).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::SignatureMismatch);
        assert!(!f.pipeline.verify_signature(&forged).await.unwrap());
    }

    #[tokio::test]
    async fn future_timestamp_is_false() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("x", &f.did, None, None)
            .await
            .unwrap();
        let later = (Utc::now() + chrono::Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Millis, true);
        let future = tamper(&signed, |v| v["signatureParams"]["created"] = json!(later));

        let outcome = f.pipeline.verify_signature_with_outcome(&future).await.unwrap();
        assert!(matches!(outcome, VerificationOutcome::CreatedInFuture { .. }));
    }

    #[tokio::test]
    async fn created_without_offset_still_verifies() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("dated", &f.did, None, None)
            .await
            .unwrap();

        for created in ["2024-01-01T00:00:00", "2024-01-01"] {
            let mut value = signed.to_value().unwrap();
            value["signatureParams"]["created"] = json!(created);
            assert!(
                f.pipeline.verify_signature_json(&value).await.unwrap(),
                "{}",
                created
            );
        }

        let mut value = signed.to_value().unwrap();
        value["signatureParams"]["created"] = json!("2024-01-01T00:00:00");
        value["content"] = json!("dated!");
        assert!(!f.pipeline.verify_signature_json(&value).await.unwrap());
    }

    #[tokio::test]
    async fn method_mismatch_is_false() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("x", &f.did, None, None)
            .await
            .unwrap();

        // Claims key-2 but the default method is key-1.
        let claimed = format!("{}#key-2", f.did);
        let mismatched = tamper(&signed, |v| {
            v["signatureParams"]["verificationMethod"] = json!(claimed)
        });
        let outcome = f.pipeline.verify_signature_with_outcome(&mismatched).await.unwrap();
        assert!(matches!(
            outcome,
            VerificationOutcome::VerificationMethodMismatch { .. }
        ));

        let unknown_key = tamper(&signed, |v| v["keyId"] = json!("key-9"));
        let outcome = f.pipeline.verify_signature_with_outcome(&unknown_key).await.unwrap();
        assert_eq!(
            outcome,
            VerificationOutcome::MethodNotFound {
                key_id: Some("key-9".into())
            }
        );
    }

    #[tokio::test]
    async fn garbage_signature_is_false_not_error() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("x", &f.did, None, None)
            .await
            .unwrap();

        for garbage in ["%%%", "AAAA", "c2hvcnQ="] {
            let broken = tamper(&signed, |v| v["signature"] = json!(garbage));
            assert!(!f.pipeline.verify_signature(&broken).await.unwrap(), "{}", garbage);
        }
    }

    #[tokio::test]
    async fn provider_errors_become_false() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("x", &f.did, None, None)
            .await
            .unwrap();

        let mut doc = f.registry.remove(&f.did).unwrap();
        doc.verification_method[0].public_key = "not hex".into();
        f.registry.insert(doc);
        // Bypass the cached copy.
        let fresh = DocumentSigningPipeline::new(
            DidKeyResolver::new(f.registry.clone()),
            SignatureProvider::default(),
        );

        let outcome = fresh.verify_signature_with_outcome(&signed).await.unwrap();
        assert!(matches!(
            outcome,
            VerificationOutcome::CryptoFailure(CryptoServiceError::Verification(_))
        ));
        assert!(!fresh.verify_signature(&signed).await.unwrap());
    }

    #[tokio::test]
    async fn verification_resolution_errors_are_errors() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("x", &f.did, None, None)
            .await
            .unwrap();
        let orphan = tamper(&signed, |v| v["signerDID"] = json!("did:midnight:gone"));

        let err = f.pipeline.verify_signature(&orphan).await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::Resolution(ResolutionError::NotFound("did:midnight:gone".into()))
        );
    }

    #[tokio::test]
    async fn verify_json_checks_shape_first() {
        let f = fixture();
        let signed = f
            .pipeline
            .create_signed_document("x", &f.did, None, None)
            .await
            .unwrap();

        let value = signed.to_value().unwrap();
        assert!(f.pipeline.verify_signature_json(&value).await.unwrap());

        let mut broken = value.clone();
        broken["signatureParams"]["proofPurpose"] = json!(7);
        assert!(matches!(
            f.pipeline.verify_signature_json(&broken).await,
            Err(PipelineError::InvalidDocumentFormat(_))
        ));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(VerificationOutcome::Valid.to_string(), "valid");
        assert_eq!(
            VerificationOutcome::SignatureMismatch.to_string(),
            "signature does not match"
        );
        assert!(VerificationOutcome::Aborted("panicked".into())
            .to_string()
            .contains("panicked"));
    }
}
