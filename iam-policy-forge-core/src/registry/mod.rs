//! In-memory registry of policies, roles, and their attachments
//!
//! A thin aggregate the provisioning layer hands authoritative state to
//! before each mutating call. Attach and detach run inside one `&mut self`
//! critical section over the single shared join table, so the policy-side
//! and principal-side attachment views always move together. Removing a
//! policy or role cascade-detaches its relations.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::attachment::{AttachmentTable, PrincipalKind};
use crate::role::Role;
use crate::versioning::ManagedPolicy;

#[derive(Debug, Default)]
pub struct IamRegistry {
    policies: BTreeMap<String, ManagedPolicy>,
    roles: BTreeMap<String, Role>,
    attachments: AttachmentTable,
}

impl IamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a policy, returning any prior policy under the same name.
    /// Name-uniqueness arbitration beyond map semantics is the provider's
    /// job, not this registry's.
    pub fn insert_policy(&mut self, policy: ManagedPolicy) -> Option<ManagedPolicy> {
        debug!("registry: inserting policy '{}'", policy.name());
        self.policies.insert(policy.name().to_string(), policy)
    }

    pub fn policy(&self, name: &str) -> Option<&ManagedPolicy> {
        self.policies.get(name)
    }

    pub fn policy_mut(&mut self, name: &str) -> Option<&mut ManagedPolicy> {
        self.policies.get_mut(name)
    }

    /// Remove a policy and cascade-detach everything attached to it.
    pub fn remove_policy(&mut self, name: &str) -> Option<ManagedPolicy> {
        let removed = self.policies.remove(name);
        if removed.is_some() {
            let detached = self.attachments.detach_all_for_policy(name);
            info!(
                "registry: removed policy '{}', cascade-detached {} attachments",
                name, detached
            );
        }
        removed
    }

    pub fn insert_role(&mut self, role: Role) -> Option<Role> {
        debug!("registry: inserting role '{}'", role.name());
        self.roles.insert(role.name().to_string(), role)
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn role_mut(&mut self, name: &str) -> Option<&mut Role> {
        self.roles.get_mut(name)
    }

    /// Remove a role and cascade-detach its policy attachments.
    pub fn remove_role(&mut self, name: &str) -> Option<Role> {
        let removed = self.roles.remove(name);
        if removed.is_some() {
            let detached = self
                .attachments
                .detach_all_for_principal(PrincipalKind::Role, name);
            info!(
                "registry: removed role '{}', cascade-detached {} attachments",
                name, detached
            );
        }
        removed
    }

    /// Idempotent attach over the shared join table. Total: no error for a
    /// policy or principal name the registry has never seen.
    pub fn attach(
        &mut self,
        policy_name: &str,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> bool {
        self.attachments.attach(policy_name, kind, principal_name)
    }

    /// Idempotent detach over the shared join table.
    pub fn detach(
        &mut self,
        policy_name: &str,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> bool {
        self.attachments.detach(policy_name, kind, principal_name)
    }

    pub fn attachment_count(&self, policy_name: &str) -> usize {
        self.attachments.attachment_count(policy_name)
    }

    pub fn attachments(&self) -> &AttachmentTable {
        &self.attachments
    }
}
