//! # CLI Interface
//!
//! Defines the command-line argument structure for `midnight-id` using
//! `clap` derive. Subcommands: `seed`, `derive`, `keygen`, `document`,
//! `sign`, `verify`, and `version`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use midnight_identity::crypto::{Algorithm, HashAlgorithm, KeyPath};
use midnight_identity::signing::ProofPurpose;

use crate::logging::LogFormat;

/// Midnight DID toolkit.
///
/// Derives identity keys from a seed, assembles DID Documents, and signs or
/// verifies documents on behalf of a DID. Results go to stdout as JSON;
/// logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "midnight-id",
    about = "Midnight DID key derivation and document signing",
    version,
    propagate_version = true
)]
pub struct MidnightIdCli {
    /// Log filter directive. `RUST_LOG` takes precedence when set.
    #[arg(
        long,
        global = true,
        env = "MIDNIGHT_ID_LOG",
        default_value = "midnight_id=info,midnight_identity=warn"
    )]
    pub log: String,

    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "MIDNIGHT_ID_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh random 32-byte seed.
    Seed,
    /// Derive a secp256k1 key pair from a seed.
    Derive(DeriveArgs),
    /// Generate a random key pair for any supported algorithm.
    Keygen(KeygenArgs),
    /// Build a DID Document for a key derived from a seed.
    Document(DocumentArgs),
    /// Sign content as a DID.
    Sign(SignArgs),
    /// Verify a signed document.
    Verify(VerifyArgs),
    /// Print version information and exit.
    Version,
}

/// Seed and path shared by derivation-based commands.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Hex-encoded 32-byte seed.
    ///
    /// **Prefer the environment variable.** Command lines end up in shell
    /// history and process listings.
    #[arg(long, env = "MIDNIGHT_ID_SEED", hide_env_values = true)]
    pub seed: String,

    /// Derivation path.
    #[arg(long, default_value_t = KeyPath::default())]
    pub path: KeyPath,
}

/// Arguments for the `derive` subcommand.
#[derive(Args, Debug)]
pub struct DeriveArgs {
    #[command(flatten)]
    pub seed: SeedArgs,
}

/// Arguments for the `keygen` subcommand.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    #[arg(long, value_enum, default_value_t = AlgorithmArg::EcdsaP256)]
    pub algorithm: AlgorithmArg,
}

/// Arguments for the `document` subcommand.
#[derive(Args, Debug)]
pub struct DocumentArgs {
    #[command(flatten)]
    pub seed: SeedArgs,

    /// Fragment for the verification method id.
    #[arg(long, default_value = midnight_identity::config::DEFAULT_KEY_FRAGMENT)]
    pub fragment: String,

    /// Omit the private key, producing a document fit for publication.
    #[arg(long)]
    pub public: bool,
}

/// Arguments for the `sign` subcommand.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// DID Document(s) to resolve against. Repeatable.
    #[arg(long = "document", short = 'D', required = true)]
    pub documents: Vec<PathBuf>,

    /// DID to sign as.
    #[arg(long)]
    pub did: String,

    /// Content to sign.
    #[arg(long, conflicts_with = "content_file", required_unless_present = "content_file")]
    pub content: Option<String>,

    /// Read the content to sign from a file.
    #[arg(long)]
    pub content_file: Option<PathBuf>,

    /// Fragment of the verification method to sign with. Defaults to the
    /// document's first method.
    #[arg(long)]
    pub key_id: Option<String>,

    #[arg(long, value_enum, default_value_t = ProofPurposeArg::AssertionMethod)]
    pub proof_purpose: ProofPurposeArg,
}

/// Arguments for the `verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// DID Document(s) to resolve against. Repeatable.
    #[arg(long = "document", short = 'D', required = true)]
    pub documents: Vec<PathBuf>,

    /// Signed document (JSON) to verify.
    #[arg(long)]
    pub signed: PathBuf,
}

/// Algorithms selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    EcdsaP256,
    EcdsaSecp256k1,
    Rsa2048,
    Rsa3072,
    Rsa4096,
}

impl AlgorithmArg {
    pub fn algorithm(self) -> Algorithm {
        let rsa = |modulus_length| Algorithm::Rsa {
            modulus_length,
            hash: HashAlgorithm::Sha256,
        };
        match self {
            AlgorithmArg::EcdsaP256 => Algorithm::ecdsa_p256(),
            AlgorithmArg::EcdsaSecp256k1 => Algorithm::ecdsa_secp256k1(),
            AlgorithmArg::Rsa2048 => rsa(2048),
            AlgorithmArg::Rsa3072 => rsa(3072),
            AlgorithmArg::Rsa4096 => rsa(4096),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProofPurposeArg {
    AssertionMethod,
    Authentication,
}

impl From<ProofPurposeArg> for ProofPurpose {
    fn from(arg: ProofPurposeArg) -> Self {
        match arg {
            ProofPurposeArg::AssertionMethod => ProofPurpose::AssertionMethod,
            ProofPurposeArg::Authentication => ProofPurpose::Authentication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        MidnightIdCli::command().debug_assert();
    }

    #[test]
    fn derive_parses_path() {
        let seed = "00".repeat(32);
        let cli = MidnightIdCli::parse_from([
            "midnight-id",
            "derive",
            "--seed",
            seed.as_str(),
            "--path",
            "m/44'/7777'/2'/0/5",
        ]);
        match cli.command {
            Commands::Derive(args) => {
                assert_eq!(args.seed.path, KeyPath::new(2, 0, 5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn path_defaults_to_first_identity_key() {
        let cli = MidnightIdCli::parse_from(["midnight-id", "derive", "--seed", "ab"]);
        match cli.command {
            Commands::Derive(args) => assert_eq!(args.seed.path, KeyPath::default()),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn malformed_path_rejected() {
        let result = MidnightIdCli::try_parse_from([
            "midnight-id",
            "derive",
            "--seed",
            "ab",
            "--path",
            "m/44/7777/0/0/0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn sign_requires_exactly_one_content_source() {
        let base = ["midnight-id", "sign", "-D", "doc.json", "--did", "did:midnight:a"];
        assert!(MidnightIdCli::try_parse_from(base).is_err());

        let mut both = base.to_vec();
        both.extend(["--content", "x", "--content-file", "x.txt"]);
        assert!(MidnightIdCli::try_parse_from(both).is_err());

        let mut one = base.to_vec();
        one.extend(["--content", "x"]);
        assert!(MidnightIdCli::try_parse_from(one).is_ok());
    }

    #[test]
    fn algorithm_args_map_to_algorithms() {
        assert_eq!(AlgorithmArg::EcdsaP256.algorithm(), Algorithm::ecdsa_p256());
        assert_eq!(AlgorithmArg::Rsa2048.algorithm(), Algorithm::rsa_2048());
        assert_eq!(
            AlgorithmArg::Rsa4096.algorithm().descriptor().modulus_length,
            Some(4096)
        );
    }
}
