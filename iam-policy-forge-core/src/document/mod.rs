//! Policy document data model
//!
//! Wire-faithful representation of IAM policy documents. Field names follow
//! the provider's JSON shape (`Version`, `Statement`, `Effect`, `Action`,
//! `Resource`, `Principal`, `Condition`), and one-or-many string fields
//! round-trip both the bare-string and the list form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyForgeError, PolicyForgeResult};

/// Schema tag carried by every document this crate produces.
pub const POLICY_LANGUAGE_VERSION: &str = "2012-10-17";

/// Statement effect. Exactly two values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A string-valued field that the provider renders either as a bare string
/// or as a list of strings. The source form is preserved on round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringSet {
    One(String),
    Many(Vec<String>),
}

impl StringSet {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(_) => false,
            Self::Many(values) => values.is_empty(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::One(value) => std::slice::from_ref(value).iter().map(String::as_str),
            Self::Many(values) => values.as_slice().iter().map(String::as_str),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.iter().any(|value| value == needle)
    }
}

impl From<String> for StringSet {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<&str> for StringSet {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<String>> for StringSet {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

/// Statement principal: the `"*"` wildcard or a map of principal type
/// (`Service`, `AWS`, `Federated`) to identifiers. Sorted keys keep the
/// serialization deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    Wildcard(String),
    Entries(BTreeMap<String, StringSet>),
}

impl Principal {
    pub const SERVICE: &'static str = "Service";
    pub const AWS: &'static str = "AWS";
    pub const FEDERATED: &'static str = "Federated";

    pub fn wildcard() -> Self {
        Self::Wildcard("*".to_string())
    }

    pub fn service(identifiers: Vec<String>) -> Self {
        Self::entry(Self::SERVICE, identifiers)
    }

    pub fn aws(arns: Vec<String>) -> Self {
        Self::entry(Self::AWS, arns)
    }

    pub fn federated(provider: String) -> Self {
        Self::entry(Self::FEDERATED, vec![provider])
    }

    fn entry(key: &str, identifiers: Vec<String>) -> Self {
        let value = if identifiers.len() == 1 {
            // Single identifiers serialize in the provider's bare-string form.
            StringSet::One(identifiers.into_iter().next().unwrap_or_default())
        } else {
            StringSet::Many(identifiers)
        };
        let mut entries = BTreeMap::new();
        entries.insert(key.to_string(), value);
        Self::Entries(entries)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Wildcard(_) => false,
            Self::Entries(entries) => {
                entries.is_empty() || entries.values().all(StringSet::is_empty)
            }
        }
    }
}

/// Condition block: operator -> condition key -> values.
pub type ConditionMap = BTreeMap<String, BTreeMap<String, StringSet>>;

/// One authorization rule inside a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Sid", skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Action", skip_serializing_if = "Option::is_none")]
    pub action: Option<StringSet>,
    #[serde(rename = "NotAction", skip_serializing_if = "Option::is_none")]
    pub not_action: Option<StringSet>,
    #[serde(rename = "Resource", skip_serializing_if = "Option::is_none")]
    pub resource: Option<StringSet>,
    #[serde(rename = "NotResource", skip_serializing_if = "Option::is_none")]
    pub not_resource: Option<StringSet>,
    #[serde(rename = "Principal", skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionMap>,
}

impl Statement {
    /// Create an Allow statement over the given actions and resources.
    pub fn allow(actions: Vec<String>, resources: Vec<String>) -> Self {
        Self::with_effect(Effect::Allow, actions, resources)
    }

    /// Create a Deny statement over the given actions and resources.
    pub fn deny(actions: Vec<String>, resources: Vec<String>) -> Self {
        Self::with_effect(Effect::Deny, actions, resources)
    }

    fn with_effect(effect: Effect, actions: Vec<String>, resources: Vec<String>) -> Self {
        Self {
            sid: None,
            effect,
            action: Some(StringSet::Many(actions)),
            not_action: None,
            resource: Some(StringSet::Many(resources)),
            not_resource: None,
            principal: None,
            condition: None,
        }
    }

    /// Create a trust statement: an Allow over a single assume action with a
    /// principal and no resource.
    pub fn trust(principal: Principal, action: &str) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            action: Some(StringSet::One(action.to_string())),
            not_action: None,
            resource: None,
            not_resource: None,
            principal: Some(principal),
            condition: None,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Add one condition entry, creating the block on first use.
    pub fn with_condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        let value = if values.len() == 1 {
            StringSet::One(values.into_iter().next().unwrap_or_default())
        } else {
            StringSet::Many(values)
        };
        self.condition
            .get_or_insert_with(ConditionMap::new)
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value);
        self
    }
}

/// An ordered sequence of statements under a fixed schema tag. Order is
/// irrelevant to the provider's semantics but preserved for determinism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Statement")]
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            version: POLICY_LANGUAGE_VERSION.to_string(),
            id: None,
            statement: statements,
        }
    }

    /// Size of the canonical (compact) serialization, the number the
    /// provider ceiling is measured against.
    pub fn size_bytes(&self) -> PolicyForgeResult<usize> {
        Ok(self.to_json()?.len())
    }

    pub fn to_json(&self) -> PolicyForgeResult<String> {
        serde_json::to_string(self).map_err(|e| PolicyForgeError::MalformedDocument {
            source_label: "policy document".to_string(),
            detail: format!("failed to serialize: {e}"),
        })
    }

    pub fn to_json_pretty(&self) -> PolicyForgeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PolicyForgeError::MalformedDocument {
            source_label: "policy document".to_string(),
            detail: format!("failed to serialize: {e}"),
        })
    }
}
