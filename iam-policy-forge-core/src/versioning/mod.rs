//! Managed policy version history
//!
//! A `ManagedPolicy` owns a bounded, ordered history of document revisions.
//! The provider retains at most five versions; creating a sixth evicts the
//! oldest non-default one. Eviction removes retention, not the identifier
//! sequence: ordinals keep increasing and are never reused.
//!
//! The single-default invariant is held by storing the default *ordinal* and
//! recomputing each version's flag on read, so there is no per-version flag
//! to drift.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::compose::{
    validate_description, validate_document, validate_policy_name, validate_policy_path,
};
use crate::document::PolicyDocument;
use crate::error::{PolicyForgeError, PolicyForgeResult};

/// Provider ceiling on concurrently retained versions per policy.
pub const MAX_RETAINED_VERSIONS: usize = 5;

/// One retained document revision.
#[derive(Debug, Clone)]
pub struct PolicyVersion {
    ordinal: u32,
    document: PolicyDocument,
    created_at: DateTime<Utc>,
}

impl PolicyVersion {
    /// Version tag in the provider's form: `v1`, `v2`, ...
    pub fn version_id(&self) -> String {
        format!("v{}", self.ordinal)
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Read-side view of a version, with the default flag recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyVersionDescription {
    #[serde(rename = "VersionId")]
    pub version_id: String,
    #[serde(rename = "IsDefaultVersion")]
    pub is_default: bool,
    #[serde(rename = "CreateDate")]
    pub created_at: DateTime<Utc>,
}

/// A named, independently versioned policy attachable to multiple
/// principals.
#[derive(Debug, Clone)]
pub struct ManagedPolicy {
    name: String,
    path: String,
    description: Option<String>,
    versions: VecDeque<PolicyVersion>,
    next_ordinal: u32,
    default_ordinal: Option<u32>,
}

impl ManagedPolicy {
    /// Create a policy shell with no versions. Identity attributes are
    /// validated here; the first document arrives via `create_version`.
    pub fn new(name: &str, path: &str, description: Option<&str>) -> PolicyForgeResult<Self> {
        validate_policy_name(name)?;
        validate_policy_path(path)?;
        if let Some(description) = description {
            validate_description(description)?;
        }

        Ok(Self {
            name: name.to_string(),
            path: path.to_string(),
            description: description.map(ToString::to_string),
            versions: VecDeque::with_capacity(MAX_RETAINED_VERSIONS),
            next_ordinal: 1,
            default_ordinal: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Append a new version holding `document` and make it the default.
    ///
    /// At capacity, the oldest non-default version is evicted first.
    /// `NoEvictableVersion` is an internal-consistency fault: it cannot fire
    /// while exactly one version is default.
    pub fn create_version(&mut self, document: PolicyDocument) -> PolicyForgeResult<String> {
        validate_document(&document)?;

        if self.versions.len() >= MAX_RETAINED_VERSIONS {
            let evict_pos = self
                .versions
                .iter()
                .position(|v| Some(v.ordinal) != self.default_ordinal)
                .ok_or_else(|| PolicyForgeError::NoEvictableVersion {
                    policy_name: self.name.clone(),
                    count: self.versions.len(),
                })?;
            if let Some(evicted) = self.versions.remove(evict_pos) {
                debug!(
                    "policy '{}': evicted version {} to make room",
                    self.name,
                    evicted.version_id()
                );
            }
        }

        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.versions.push_back(PolicyVersion {
            ordinal,
            document,
            created_at: Utc::now(),
        });
        self.default_ordinal = Some(ordinal);

        debug!(
            "policy '{}': created version v{} ({} retained)",
            self.name,
            ordinal,
            self.versions.len()
        );
        Ok(format!("v{ordinal}"))
    }

    /// Re-pin the default to a retained version.
    pub fn set_default_version(&mut self, version_id: &str) -> PolicyForgeResult<()> {
        let ordinal = self
            .versions
            .iter()
            .find(|v| v.version_id() == version_id)
            .map(|v| v.ordinal)
            .ok_or_else(|| PolicyForgeError::VersionNotFound {
                policy_name: self.name.clone(),
                version_id: version_id.to_string(),
            })?;
        self.default_ordinal = Some(ordinal);
        Ok(())
    }

    /// Derived, not stored.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn default_version_id(&self) -> Option<String> {
        self.default_ordinal.map(|ordinal| format!("v{ordinal}"))
    }

    pub fn default_document(&self) -> Option<&PolicyDocument> {
        let default_ordinal = self.default_ordinal?;
        self.versions
            .iter()
            .find(|v| v.ordinal == default_ordinal)
            .map(PolicyVersion::document)
    }

    pub fn is_default(&self, version: &PolicyVersion) -> bool {
        Some(version.ordinal) == self.default_ordinal
    }

    pub fn get_version(&self, version_id: &str) -> Option<&PolicyVersion> {
        self.versions.iter().find(|v| v.version_id() == version_id)
    }

    /// Retained versions, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = &PolicyVersion> {
        self.versions.iter()
    }

    pub fn describe_versions(&self) -> Vec<PolicyVersionDescription> {
        self.versions
            .iter()
            .map(|v| PolicyVersionDescription {
                version_id: v.version_id(),
                is_default: self.is_default(v),
                created_at: v.created_at,
            })
            .collect()
    }
}
