//! # Identity Module
//!
//! DIDs, their documents, and how to find them.
//!
//! 1. **DID**: document model, DID syntax checks, and assembly of documents
//!    from key pairs.
//! 2. **Cache**: shared, concurrent memo of resolved documents.
//! 3. **Resolver**: syntax check, cache, then an injected collaborator.
//!
//! ## Design Decisions
//!
//! - Resolution is a trait object (`Arc<dyn DidResolution>`) so the same
//!   resolver runs against a ledger client in production and an
//!   [`InMemoryResolver`] in tests and the CLI.
//! - The cache is injected rather than global. Two resolvers share it only
//!   when handed the same `Arc`.

pub mod cache;
pub mod did;
pub mod resolver;

pub use cache::DidDocumentCache;
pub use did::{did_for_public_key, is_valid_did, DidDocument, DidError, Relationship, VerificationMethod};
pub use resolver::{DidKeyResolver, DidResolution, InMemoryResolver, ResolutionError, ResolverError};
