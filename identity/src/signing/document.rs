//! # Signed Documents
//!
//! The boundary format of the signing pipeline:
//!
//! ```json
//! {
//!   "content": "...",
//!   "signature": "<base64>",
//!   "signatureParams": {
//!     "type": "ECDSASignature2024",
//!     "created": "2026-01-01T00:00:00.000Z",
//!     "verificationMethod": "did:midnight:...#key-1",
//!     "proofPurpose": "assertionMethod"
//!   },
//!   "signerDID": "did:midnight:...",
//!   "keyId": "key-1"
//! }
//! ```
//!
//! A [`SignedDocument`] is immutable. The pipeline builds them; everyone else
//! parses them through [`SignedDocument::from_value`] or
//! [`SignedDocument::from_json`], which check the shape before anything
//! touches a resolver.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::PipelineError;

/// Why a document was signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    #[default]
    AssertionMethod,
    Authentication,
}

impl ProofPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofPurpose::AssertionMethod => "assertionMethod",
            ProofPurpose::Authentication => "authentication",
        }
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProofPurpose {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assertionMethod" => Ok(ProofPurpose::AssertionMethod),
            "authentication" => Ok(ProofPurpose::Authentication),
            other => Err(PipelineError::InvalidDocumentFormat(format!(
                "unknown proofPurpose '{}'",
                other
            ))),
        }
    }
}

/// Signature metadata carried next to the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureParams {
    #[serde(rename = "type")]
    pub signature_type: String,
    /// ISO-8601 UTC timestamp.
    pub created: String,
    /// DID URL of the verification method that signed.
    pub verification_method: String,
    pub proof_purpose: ProofPurpose,
}

impl SignatureParams {
    /// `created` as a UTC timestamp.
    ///
    /// Accepts RFC 3339 (offset required) as well as ISO-8601 local date-times
    /// and plain dates. Timestamps without an offset are read as UTC; a date
    /// alone means midnight UTC.
    pub fn created_at(&self) -> Result<DateTime<Utc>, PipelineError> {
        let created = self.created.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(created) {
            return Ok(t.with_timezone(&Utc));
        }
        if let Ok(t) = NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(t.and_utc());
        }
        NaiveDate::parse_from_str(created, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t.and_utc())
            .ok_or_else(|| {
                PipelineError::InvalidDocumentFormat(format!(
                    "signatureParams.created '{}' is not an ISO-8601 timestamp",
                    self.created
                ))
            })
    }
}

/// A document together with its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDocument {
    content: String,
    signature: String,
    #[serde(rename = "signatureParams")]
    signature_params: SignatureParams,
    #[serde(rename = "signerDID")]
    signer_did: String,
    #[serde(rename = "keyId", default, skip_serializing_if = "Option::is_none")]
    key_id: Option<String>,
}

impl SignedDocument {
    pub(crate) fn new(
        content: String,
        signature: String,
        signature_params: SignatureParams,
        signer_did: String,
        key_id: Option<String>,
    ) -> Self {
        Self {
            content,
            signature,
            signature_params,
            signer_did,
            key_id,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Base64 signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn signature_params(&self) -> &SignatureParams {
        &self.signature_params
    }

    pub fn signer_did(&self) -> &str {
        &self.signer_did
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Check the shape of an untyped document and convert it.
    pub fn from_value(value: &Value) -> Result<Self, PipelineError> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid("document must be a JSON object"))?;

        for field in ["content", "signature", "signerDID"] {
            require_str(object.get(field), field)?;
        }
        if let Some(key_id) = object.get("keyId") {
            if !key_id.is_string() && !key_id.is_null() {
                return Err(invalid("keyId must be a string"));
            }
        }

        let params = object
            .get("signatureParams")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("signatureParams must be an object"))?;
        for field in ["type", "created", "verificationMethod", "proofPurpose"] {
            require_str(params.get(field), &format!("signatureParams.{}", field))?;
        }

        let document: SignedDocument =
            serde_json::from_value(value.clone()).map_err(|e| invalid(&e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let value: Value = serde_json::from_str(json).map_err(|e| invalid(&e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Field-level checks that serde cannot express.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let required = [
            ("content", self.content.as_str()),
            ("signature", self.signature.as_str()),
            ("signerDID", self.signer_did.as_str()),
            ("signatureParams.type", self.signature_params.signature_type.as_str()),
            (
                "signatureParams.verificationMethod",
                self.signature_params.verification_method.as_str(),
            ),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(invalid(&format!("{} must not be empty", field)));
            }
        }
        self.signature_params.created_at()?;
        Ok(())
    }
}

fn invalid(reason: &str) -> PipelineError {
    PipelineError::InvalidDocumentFormat(reason.to_string())
}

fn require_str<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a str, PipelineError> {
    match value {
        None | Some(Value::Null) => Err(invalid(&format!("missing field {}", field))),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(invalid(&format!("{} must be a string", field))),
    }
}
