//! This crate provides the core business logic for IAM Policy Forge:
//! - Statement normalization from heterogeneous sources
//! - Policy document composition and validation
//! - Bounded version history and attachment management
//! - Assume-role trust document assembly
//!
//! Everything here is pure, synchronous, in-memory work: the crate
//! pre-validates and shapes documents, and a provisioning layer owns all
//! I/O against the provider.

pub mod attachment;
pub mod compose;
pub mod document;
pub mod error;
pub mod normalize;
pub mod registry;
pub mod role;
pub mod versioning;

// Re-exports for a small, focused public API
pub use attachment::{AttachmentKey, AttachmentTable, PrincipalKind};
pub use compose::{
    compose_policy, validate_document, validate_policy_name, validate_policy_path,
    MANAGED_POLICY_MAX_BYTES, POLICY_NAME_MAX_LEN,
};
pub use document::{
    ConditionMap, Effect, PolicyDocument, Principal, Statement, StringSet,
    POLICY_LANGUAGE_VERSION,
};
pub use error::{PolicyForgeError, PolicyForgeResult};
pub use normalize::{normalize_sources, NormalizedStatement, Provenance, StatementSource};
pub use registry::IamRegistry;
pub use role::{
    assemble_trust_policy, Role, TrustSource, MAX_SESSION_DURATION_SECS,
    MIN_SESSION_DURATION_SECS,
};
pub use versioning::{
    ManagedPolicy, PolicyVersion, PolicyVersionDescription, MAX_RETAINED_VERSIONS,
};
