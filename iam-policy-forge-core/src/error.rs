//! Error types for IAM Policy Forge
//!
//! Every variant is a local validation failure detected before any document
//! is handed to a provisioning layer. Nothing here is retried internally;
//! transient provider errors belong to the caller's retry policy.

use thiserror::Error;

/// Result alias used throughout the crate
pub type PolicyForgeResult<T> = Result<T, PolicyForgeError>;

/// Validation failures raised by the composition, versioning, and role
/// assembly operations. Each variant carries the offending value and the
/// constraint it violated.
#[derive(Debug, Error)]
pub enum PolicyForgeError {
    /// Input was not well-formed structured data (bad JSON, wrong root
    /// shape, missing or ill-typed `Statement` key).
    #[error("malformed policy document from source '{source_label}': {detail}")]
    MalformedDocument { source_label: String, detail: String },

    /// A statement parsed but lacks a required field or carries an empty
    /// required set.
    #[error("invalid statement {statement_index} from source '{source_label}': {constraint}")]
    InvalidStatement {
        source_label: String,
        statement_index: usize,
        constraint: String,
    },

    /// Composition produced a document with no statements.
    #[error("composed policy document has no statements")]
    EmptyDocument,

    /// The canonical serialization exceeds the provider ceiling.
    #[error("policy document is {size_bytes} bytes, provider ceiling is {limit} bytes")]
    DocumentTooLarge { size_bytes: usize, limit: usize },

    /// A policy or role identity attribute violates the provider's
    /// length or character constraints.
    #[error("invalid {field} '{value}': {constraint}")]
    InvalidName {
        field: &'static str,
        value: String,
        constraint: String,
    },

    /// The requested version id is not among the retained versions.
    #[error("version '{version_id}' not found for policy '{policy_name}'")]
    VersionNotFound {
        policy_name: String,
        version_id: String,
    },

    /// Internal-consistency fault: the history is at capacity and no
    /// version is evictable. Unreachable while the single-default
    /// invariant holds.
    #[error("policy '{policy_name}' retains {count} versions but none is evictable")]
    NoEvictableVersion { policy_name: String, count: usize },

    /// Role session duration outside the provider-allowed range.
    #[error("max session duration {seconds}s is outside the allowed range {min}s..={max}s")]
    InvalidSessionDuration { seconds: u32, min: u32, max: u32 },

    /// A role may carry at most one instance profile association.
    #[error("role '{role_name}' already has instance profile '{existing}' associated")]
    InstanceProfileAlreadyAttached { role_name: String, existing: String },
}
