//! Role assembly
//!
//! Builds a role's assume-role trust document from trust-statement sources
//! and holds the role's two policy namespaces: managed-policy attachments
//! (ARNs) and inline policies (name to document). The two namespaces are
//! disjoint; a name may appear in both without conflict.

use std::collections::BTreeMap;

use log::debug;

use crate::compose::{validate_document, validate_name, validate_policy_name, validate_policy_path};
use crate::document::{PolicyDocument, Principal, Statement};
use crate::error::{PolicyForgeError, PolicyForgeResult};
use crate::normalize::{normalize_sources, StatementSource};

/// Provider bounds on a role's maximum session duration, in seconds.
pub const MIN_SESSION_DURATION_SECS: u32 = 3_600;
pub const MAX_SESSION_DURATION_SECS: u32 = 43_200;

/// Provider ceiling for role names (shorter than the policy-name ceiling).
pub const ROLE_NAME_MAX_LEN: usize = 64;

const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";
const ASSUME_WEB_IDENTITY_ACTION: &str = "sts:AssumeRoleWithWebIdentity";

/// One trusted-actor declaration feeding the trust document.
#[derive(Debug, Clone)]
pub enum TrustSource {
    /// Service principals, e.g. `ec2.amazonaws.com`. All identifiers land in
    /// one statement.
    Service { identifiers: Vec<String> },
    /// AWS-account principals, optionally gated by an `sts:ExternalId`
    /// condition.
    AwsAccount {
        arns: Vec<String>,
        external_id: Option<String>,
    },
    /// A federated identity provider, optionally gated to specific
    /// audiences.
    Federated {
        provider: String,
        audiences: Vec<String>,
    },
}

/// Assemble an assume-role trust document from trust sources, one statement
/// per source, in declaration order. Uses the same statement validation and
/// document-level checks as policy composition.
pub fn assemble_trust_policy(sources: &[TrustSource]) -> PolicyForgeResult<PolicyDocument> {
    let statements: Vec<Statement> = sources.iter().map(trust_statement).collect();

    let normalized =
        normalize_sources(&[StatementSource::statements("trust sources", statements)])?;
    let document = PolicyDocument::new(normalized.into_iter().map(|n| n.statement).collect());
    validate_document(&document)?;
    Ok(document)
}

fn trust_statement(source: &TrustSource) -> Statement {
    match source {
        TrustSource::Service { identifiers } => {
            Statement::trust(Principal::service(identifiers.clone()), ASSUME_ROLE_ACTION)
        }
        TrustSource::AwsAccount { arns, external_id } => {
            let statement = Statement::trust(Principal::aws(arns.clone()), ASSUME_ROLE_ACTION);
            match external_id {
                Some(external_id) => statement.with_condition(
                    "StringEquals",
                    "sts:ExternalId",
                    vec![external_id.clone()],
                ),
                None => statement,
            }
        }
        TrustSource::Federated {
            provider,
            audiences,
        } => {
            let statement = Statement::trust(
                Principal::federated(provider.clone()),
                ASSUME_WEB_IDENTITY_ACTION,
            );
            if audiences.is_empty() {
                statement
            } else {
                statement.with_condition(
                    "StringEquals",
                    audience_condition_key(provider),
                    audiences.clone(),
                )
            }
        }
    }
}

// The audience condition is keyed by the provider host, not its full ARN.
fn audience_condition_key(provider: &str) -> String {
    let host = provider
        .rsplit_once("oidc-provider/")
        .map_or(provider, |(_, host)| host);
    format!("{host}:aud")
}

/// An identity assumable under a trust document, carrying attached managed
/// policies and embedded inline policies.
#[derive(Debug, Clone)]
pub struct Role {
    name: String,
    path: String,
    description: Option<String>,
    assume_role_policy: PolicyDocument,
    max_session_duration: u32,
    managed_policy_arns: Vec<String>,
    inline_policies: BTreeMap<String, PolicyDocument>,
    instance_profile: Option<String>,
}

impl Role {
    pub fn new(name: &str, assume_role_policy: PolicyDocument) -> PolicyForgeResult<Self> {
        validate_name("role name", name, ROLE_NAME_MAX_LEN)?;
        validate_document(&assume_role_policy)?;

        Ok(Self {
            name: name.to_string(),
            path: "/".to_string(),
            description: None,
            assume_role_policy,
            max_session_duration: MIN_SESSION_DURATION_SECS,
            managed_policy_arns: Vec::new(),
            inline_policies: BTreeMap::new(),
            instance_profile: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: &str) -> PolicyForgeResult<()> {
        validate_policy_path(path)?;
        self.path = path.to_string();
        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
    }

    pub fn assume_role_policy(&self) -> &PolicyDocument {
        &self.assume_role_policy
    }

    pub fn set_assume_role_policy(&mut self, document: PolicyDocument) -> PolicyForgeResult<()> {
        validate_document(&document)?;
        self.assume_role_policy = document;
        Ok(())
    }

    pub fn max_session_duration(&self) -> u32 {
        self.max_session_duration
    }

    pub fn set_max_session_duration(&mut self, seconds: u32) -> PolicyForgeResult<()> {
        if !(MIN_SESSION_DURATION_SECS..=MAX_SESSION_DURATION_SECS).contains(&seconds) {
            return Err(PolicyForgeError::InvalidSessionDuration {
                seconds,
                min: MIN_SESSION_DURATION_SECS,
                max: MAX_SESSION_DURATION_SECS,
            });
        }
        self.max_session_duration = seconds;
        Ok(())
    }

    /// Attach a managed policy by ARN. Insertion-ordered and idempotent;
    /// returns whether the ARN was newly attached.
    pub fn attach_managed_policy(&mut self, policy_arn: &str) -> bool {
        if self.managed_policy_arns.iter().any(|arn| arn == policy_arn) {
            debug!(
                "role '{}': managed policy '{}' already attached",
                self.name, policy_arn
            );
            return false;
        }
        self.managed_policy_arns.push(policy_arn.to_string());
        true
    }

    pub fn detach_managed_policy(&mut self, policy_arn: &str) -> bool {
        let before = self.managed_policy_arns.len();
        self.managed_policy_arns.retain(|arn| arn != policy_arn);
        self.managed_policy_arns.len() < before
    }

    pub fn attached_policy_arns(&self) -> &[String] {
        &self.managed_policy_arns
    }

    /// Put an inline policy. Upsert semantics; the inline namespace is
    /// independent of the managed-attachment namespace.
    pub fn put_inline_policy(
        &mut self,
        policy_name: &str,
        document: PolicyDocument,
    ) -> PolicyForgeResult<()> {
        validate_policy_name(policy_name)?;
        validate_document(&document)?;
        self.inline_policies
            .insert(policy_name.to_string(), document);
        Ok(())
    }

    pub fn delete_inline_policy(&mut self, policy_name: &str) -> bool {
        self.inline_policies.remove(policy_name).is_some()
    }

    pub fn inline_policy(&self, policy_name: &str) -> Option<&PolicyDocument> {
        self.inline_policies.get(policy_name)
    }

    pub fn inline_policy_names(&self) -> Vec<&str> {
        self.inline_policies.keys().map(String::as_str).collect()
    }

    /// Associate an instance profile. At most one per role; re-associating
    /// the same profile is a no-op, a different one is an error.
    pub fn associate_instance_profile(&mut self, profile_name: &str) -> PolicyForgeResult<()> {
        match &self.instance_profile {
            Some(existing) if existing == profile_name => Ok(()),
            Some(existing) => Err(PolicyForgeError::InstanceProfileAlreadyAttached {
                role_name: self.name.clone(),
                existing: existing.clone(),
            }),
            None => {
                self.instance_profile = Some(profile_name.to_string());
                Ok(())
            }
        }
    }

    pub fn instance_profile(&self) -> Option<&str> {
        self.instance_profile.as_deref()
    }

    pub fn disassociate_instance_profile(&mut self) -> bool {
        self.instance_profile.take().is_some()
    }
}
