// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Midnight DID Toolkit
//!
//! Entry point for the `midnight-id` binary. Parses CLI arguments,
//! initializes logging, and runs one subcommand against the identity core.
//!
//! - `seed`       generate a random seed
//! - `derive`     derive a key pair from a seed and path
//! - `keygen`     generate a random key pair for any supported algorithm
//! - `document`   assemble a DID Document for a derived key
//! - `sign`       sign content as a DID
//! - `verify`     verify a signed document
//! - `version`    print build version information
//!
//! Every command prints JSON to stdout. `verify` exits with status 1 when the
//! signature is rejected.

mod cli;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use midnight_identity::crypto::{
    derive_key_pair, generate_seed, Algorithm, AlgorithmDescriptor, KeyPair, Seed,
    SignatureProvider,
};
use midnight_identity::identity::{
    did_for_public_key, DidDocument, DidKeyResolver, InMemoryResolver, Relationship,
    VerificationMethod,
};
use midnight_identity::signing::{
    DocumentSigningPipeline, SignedDocument, SigningOptions, VerificationOutcome,
};

use cli::{Commands, MidnightIdCli, SeedArgs};

/// A key pair as printed by `derive` and `keygen`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    did: Option<String>,
    algorithm: AlgorithmDescriptor,
    public_key: &'a str,
    private_key: &'a str,
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    valid: bool,
    outcome: String,
    signer: &'a str,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = MidnightIdCli::parse();
    logging::init_logging(&cli.log, cli.log_format);

    match cli.command {
        Commands::Seed => new_seed(),
        Commands::Derive(args) => derive(&args.seed),
        Commands::Keygen(args) => keygen(args.algorithm.algorithm()).await,
        Commands::Document(args) => document(args),
        Commands::Sign(args) => sign(args).await,
        Commands::Verify(args) => verify(args).await,
        Commands::Version => {
            print_version();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn new_seed() -> Result<ExitCode> {
    let seed = generate_seed().context("failed to generate seed")?;
    print_json(&serde_json::json!({ "seed": seed.to_hex() }))?;
    Ok(ExitCode::SUCCESS)
}

fn derive(args: &SeedArgs) -> Result<ExitCode> {
    let key_pair = derive_from_args(args)?;
    let did = did_for_public_key(&key_pair);
    tracing::info!(path = %args.path, did = %did, "key pair derived");

    print_json(&KeyOutput {
        path: Some(args.path.to_string()),
        did: Some(did),
        algorithm: Algorithm::ecdsa_secp256k1().descriptor(),
        public_key: key_pair.public_key(),
        private_key: key_pair.private_key(),
    })?;
    Ok(ExitCode::SUCCESS)
}

async fn keygen(algorithm: Algorithm) -> Result<ExitCode> {
    tracing::info!(%algorithm, "generating key pair");
    let descriptor = algorithm.descriptor();
    let key_pair = tokio::task::spawn_blocking(move || {
        SignatureProvider::default().generate_key_pair(&descriptor)
    })
    .await
    .context("key generation task failed")??;

    print_json(&KeyOutput {
        path: None,
        did: None,
        algorithm: algorithm.descriptor(),
        public_key: key_pair.public_key(),
        private_key: key_pair.private_key(),
    })?;
    Ok(ExitCode::SUCCESS)
}

fn document(args: cli::DocumentArgs) -> Result<ExitCode> {
    let document = build_document(&args)?;
    tracing::info!(did = %document.id, public = args.public, "DID document assembled");
    println!("{}", document.to_json()?);
    Ok(ExitCode::SUCCESS)
}

async fn sign(args: cli::SignArgs) -> Result<ExitCode> {
    let signed = sign_document(args).await?;
    println!("{}", signed.to_json()?);
    Ok(ExitCode::SUCCESS)
}

async fn verify(args: cli::VerifyArgs) -> Result<ExitCode> {
    let (signed, outcome) = verify_document(&args).await?;

    print_json(&VerifyOutput {
        valid: outcome.is_valid(),
        outcome: outcome.to_string(),
        signer: signed.signer_did(),
    })?;

    Ok(exit_code(&outcome))
}

/// DID Document for the key derived from `args`, private key included unless
/// `--public` is set.
fn build_document(args: &cli::DocumentArgs) -> Result<DidDocument> {
    let key_pair = derive_from_args(&args.seed)?;
    let did = did_for_public_key(&key_pair);

    let mut document = DidDocument::new(&did)?;
    document.add_verification_method(
        VerificationMethod::from_key_pair(
            &did,
            &args.fragment,
            &key_pair,
            Algorithm::ecdsa_secp256k1(),
        ),
        &[Relationship::Authentication, Relationship::AssertionMethod],
    )?;
    document.validate().context("assembled DID document is invalid")?;

    Ok(if args.public {
        document.public_view()
    } else {
        document
    })
}

async fn sign_document(args: cli::SignArgs) -> Result<SignedDocument> {
    let content = match (args.content, args.content_file) {
        (Some(content), _) => content,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read content from {}", path.display()))?,
        (None, None) => anyhow::bail!("either --content or --content-file is required"),
    };

    let pipeline = pipeline_from_documents(&args.documents)?;
    let options = SigningOptions {
        proof_purpose: args.proof_purpose.into(),
    };
    pipeline
        .create_signed_document(&content, &args.did, args.key_id.as_deref(), Some(options))
        .await
        .with_context(|| format!("failed to sign as {}", args.did))
}

async fn verify_document(args: &cli::VerifyArgs) -> Result<(SignedDocument, VerificationOutcome)> {
    let raw = std::fs::read_to_string(&args.signed)
        .with_context(|| format!("failed to read {}", args.signed.display()))?;
    let signed = SignedDocument::from_json(&raw)
        .with_context(|| format!("{} is not a signed document", args.signed.display()))?;

    let pipeline = pipeline_from_documents(&args.documents)?;
    let outcome = pipeline.verify_signature_with_outcome(&signed).await?;
    Ok((signed, outcome))
}

fn exit_code(outcome: &VerificationOutcome) -> ExitCode {
    if outcome.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn derive_from_args(args: &SeedArgs) -> Result<KeyPair> {
    let seed = Seed::from_hex(&args.seed).context("invalid --seed")?;
    derive_key_pair(&seed, &args.path).with_context(|| format!("derivation along {} failed", args.path))
}

/// Builds a pipeline whose resolver knows exactly the given DID Documents.
fn pipeline_from_documents(paths: &[PathBuf]) -> Result<DocumentSigningPipeline> {
    let registry = Arc::new(InMemoryResolver::new());
    for path in paths {
        let document = read_document(path)?;
        tracing::debug!(did = %document.id, path = %path.display(), "DID document loaded");
        registry.insert(document);
    }
    Ok(DocumentSigningPipeline::new(
        DidKeyResolver::new(registry),
        SignatureProvider::default(),
    ))
}

fn read_document(path: &Path) -> Result<DidDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read DID document {}", path.display()))?;
    DidDocument::from_json(&raw)
        .with_context(|| format!("{} is not a DID document", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("midnight-id {}", env!("CARGO_PKG_VERSION"));
    println!("did method  {}", midnight_identity::config::DID_METHOD);
    println!("coin type   {}", midnight_identity::config::MIDNIGHT_COIN_TYPE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use midnight_identity::signing::PipelineError;
    use tempfile::TempDir;

    const SEED: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["midnight-id"];
        argv.extend_from_slice(args);
        MidnightIdCli::parse_from(argv).command
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    /// Writes the DID Document for `SEED` into `dir` and returns its path and DID.
    fn write_document(dir: &TempDir, name: &str, extra: &[&str]) -> (PathBuf, String) {
        let mut args = vec!["document", "--seed", SEED];
        args.extend_from_slice(extra);
        let Commands::Document(args) = parse(&args) else {
            panic!("expected document command");
        };
        let document = build_document(&args).unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, document.to_json().unwrap()).unwrap();
        (path, document.id)
    }

    async fn sign_to_file(dir: &TempDir, document: &Path, did: &str, content: &str) -> PathBuf {
        let Commands::Sign(args) = parse(&[
            "sign",
            "-D",
            path_str(document),
            "--did",
            did,
            "--content",
            content,
        ]) else {
            panic!("expected sign command");
        };
        let signed = sign_document(args).await.unwrap();
        let path = dir.path().join("signed.json");
        std::fs::write(&path, signed.to_json().unwrap()).unwrap();
        path
    }

    async fn verify_file(document: &Path, signed: &Path) -> (SignedDocument, VerificationOutcome) {
        let Commands::Verify(args) = parse(&[
            "verify",
            "-D",
            path_str(document),
            "--signed",
            path_str(signed),
        ]) else {
            panic!("expected verify command");
        };
        verify_document(&args).await.unwrap()
    }

    #[tokio::test]
    async fn document_sign_verify_through_files() {
        let dir = TempDir::new().unwrap();
        let (private_doc, did) = write_document(&dir, "did.json", &[]);
        let (public_doc, _) = write_document(&dir, "did.public.json", &["--public"]);

        let signed = sign_to_file(&dir, &private_doc, &did, "hello from the cli").await;

        // A verifier only needs the published document.
        let (document, outcome) = verify_file(&public_doc, &signed).await;
        assert_eq!(document.signer_did(), did);
        assert_eq!(document.content(), "hello from the cli");
        assert_eq!(outcome, VerificationOutcome::Valid);
        assert_eq!(
            format!("{:?}", exit_code(&outcome)),
            format!("{:?}", ExitCode::SUCCESS)
        );
    }

    #[tokio::test]
    async fn tampered_file_exits_with_failure() {
        let dir = TempDir::new().unwrap();
        let (doc_path, did) = write_document(&dir, "did.json", &[]);
        let signed = sign_to_file(&dir, &doc_path, &did, "pay 10").await;

        let raw = std::fs::read_to_string(&signed).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        value["content"] = serde_json::json!("pay 1000");
        std::fs::write(&signed, serde_json::to_string(&value).unwrap()).unwrap();

        let (_, outcome) = verify_file(&doc_path, &signed).await;
        assert_eq!(outcome, VerificationOutcome::SignatureMismatch);
        assert_eq!(
            format!("{:?}", exit_code(&outcome)),
            format!("{:?}", ExitCode::FAILURE)
        );
    }

    #[tokio::test]
    async fn public_document_cannot_sign() {
        let dir = TempDir::new().unwrap();
        let (public_doc, did) = write_document(&dir, "did.public.json", &["--public"]);

        let Commands::Sign(args) = parse(&[
            "sign",
            "-D",
            path_str(&public_doc),
            "--did",
            did.as_str(),
            "--content",
            "x",
        ]) else {
            panic!("expected sign command");
        };
        let err = sign_document(args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::PrivateKeyNotAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn content_file_is_signed_verbatim() {
        let dir = TempDir::new().unwrap();
        let (doc_path, did) = write_document(&dir, "did.json", &["--fragment", "primary"]);
        let content_path = dir.path().join("content.txt");
        std::fs::write(&content_path, "line one\nline two\n").unwrap();

        let Commands::Sign(args) = parse(&[
            "sign",
            "-D",
            path_str(&doc_path),
            "--did",
            did.as_str(),
            "--content-file",
            path_str(&content_path),
            "--key-id",
            "primary",
        ]) else {
            panic!("expected sign command");
        };
        let signed = sign_document(args).await.unwrap();
        assert_eq!(signed.content(), "line one\nline two\n");
        assert_eq!(signed.key_id(), Some("primary"));
        assert!(signed.signature_params().verification_method.ends_with("#primary"));
    }

    #[test]
    fn missing_document_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");
        let err = pipeline_from_documents(&[missing]).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
