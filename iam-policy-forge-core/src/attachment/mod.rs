//! Policy attachment management
//!
//! One set-based join table keyed by (policy, principal kind, principal
//! name). Both the policy-side and the principal-side views derive from the
//! same set, so they cannot drift. Attach and detach are idempotent, total
//! functions: redundant calls are no-ops, not errors.

use std::collections::BTreeSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

/// The three principal kinds a managed policy attaches to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PrincipalKind {
    Role,
    User,
    Group,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "role"),
            Self::User => write!(f, "user"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// One attachment relation. Unique within the table by construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentKey {
    pub policy_name: String,
    pub principal_kind: PrincipalKind,
    pub principal_name: String,
}

impl AttachmentKey {
    pub fn new(policy_name: &str, principal_kind: PrincipalKind, principal_name: &str) -> Self {
        Self {
            policy_name: policy_name.to_string(),
            principal_kind,
            principal_name: principal_name.to_string(),
        }
    }
}

/// The many-to-many join between policies and principals.
#[derive(Debug, Clone, Default)]
pub struct AttachmentTable {
    entries: BTreeSet<AttachmentKey>,
}

impl AttachmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a principal. Returns whether the relation was newly added;
    /// attaching an already-attached pair is a no-op.
    pub fn attach(
        &mut self,
        policy_name: &str,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> bool {
        let added = self
            .entries
            .insert(AttachmentKey::new(policy_name, kind, principal_name));
        if !added {
            debug!(
                "attach no-op: {} '{}' already attached to policy '{}'",
                kind, principal_name, policy_name
            );
        }
        added
    }

    /// Detach a principal. Returns whether the relation existed; detaching a
    /// non-attached pair is a no-op.
    pub fn detach(
        &mut self,
        policy_name: &str,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> bool {
        self.entries
            .remove(&AttachmentKey::new(policy_name, kind, principal_name))
    }

    pub fn is_attached(
        &self,
        policy_name: &str,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> bool {
        self.entries
            .contains(&AttachmentKey::new(policy_name, kind, principal_name))
    }

    /// Derived count of principals attached to a policy.
    pub fn attachment_count(&self, policy_name: &str) -> usize {
        self.attached_principals(policy_name).len()
    }

    /// Policy-side view: all principals attached to `policy_name`.
    pub fn attached_principals(&self, policy_name: &str) -> Vec<&AttachmentKey> {
        self.entries
            .iter()
            .filter(|key| key.policy_name == policy_name)
            .collect()
    }

    /// Principal-side view: names of all policies attached to a principal.
    pub fn attached_policies(&self, kind: PrincipalKind, principal_name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|key| key.principal_kind == kind && key.principal_name == principal_name)
            .map(|key| key.policy_name.as_str())
            .collect()
    }

    /// Cascade-detach on policy deletion. Returns how many relations fell.
    pub fn detach_all_for_policy(&mut self, policy_name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key| key.policy_name != policy_name);
        before - self.entries.len()
    }

    /// Cascade-detach on principal deletion.
    pub fn detach_all_for_principal(&mut self, kind: PrincipalKind, principal_name: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key| key.principal_kind != kind || key.principal_name != principal_name);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
