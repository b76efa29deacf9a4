//! End-to-end lifecycle tests: compose a document from multiple sources,
//! run it through the version history, and manage attachments.

use iam_policy_forge_core::{
    compose_policy, normalize_sources, IamRegistry, ManagedPolicy, PolicyForgeError,
    PrincipalKind, Statement, StatementSource, MAX_RETAINED_VERSIONS,
};
use proptest::prelude::*;

const S3_READ_SOURCE: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::app-bucket/*"},
        {"Effect": "Allow", "Action": "s3:ListBucket", "Resource": "arn:aws:s3:::app-bucket"}
    ]
}"#;

const DATA_ACCESS_SOURCE: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {"Effect": "Allow", "Action": "dynamodb:GetItem", "Resource": "arn:aws:dynamodb:us-east-1:123456789012:table/app-table"},
        {"Effect": "Allow", "Action": "secretsmanager:GetSecretValue", "Resource": "arn:aws:secretsmanager:us-east-1:123456789012:secret:app-secret"},
        {"Effect": "Allow", "Action": "kms:Decrypt", "Resource": "arn:aws:kms:us-east-1:123456789012:key/app-key"}
    ]
}"#;

fn revision(marker: u32) -> iam_policy_forge_core::PolicyDocument {
    iam_policy_forge_core::PolicyDocument::new(vec![Statement::allow(
        vec![format!("s3:Revision{marker}")],
        vec!["arn:aws:s3:::app-bucket/*".to_string()],
    )])
}

#[test]
fn test_two_source_composition_yields_five_statements_in_order() {
    let sources = [
        StatementSource::document("s3-read", S3_READ_SOURCE),
        StatementSource::document("data-access", DATA_ACCESS_SOURCE),
    ];

    let document =
        compose_policy("data-source-generated-policy", "/", None, &sources).expect("compose");

    assert_eq!(document.statement.len(), 5);
    let first_actions: Vec<&str> = document
        .statement
        .iter()
        .filter_map(|s| s.action.as_ref())
        .flat_map(|a| a.iter())
        .collect();
    assert_eq!(
        first_actions,
        vec![
            "s3:GetObject",
            "s3:ListBucket",
            "dynamodb:GetItem",
            "secretsmanager:GetSecretValue",
            "kms:Decrypt"
        ]
    );
}

#[test]
fn test_serialization_round_trip_preserves_statement_order() {
    let sources = [
        StatementSource::document("s3-read", S3_READ_SOURCE),
        StatementSource::document("data-access", DATA_ACCESS_SOURCE),
    ];
    let document = compose_policy("round-trip-policy", "/", None, &sources).expect("compose");

    let serialized = document.to_json().expect("serialize");
    let normalized =
        normalize_sources(&[StatementSource::document("round-trip", serialized)])
            .expect("re-normalize");

    let statements: Vec<Statement> = normalized.into_iter().map(|n| n.statement).collect();
    assert_eq!(statements, document.statement);
}

#[test]
fn test_versioned_policy_lifecycle() {
    let mut policy = ManagedPolicy::new(
        "versioned-policy",
        "/application/",
        Some("Comprehensive IAM policy exercise"),
    )
    .expect("policy shell");

    // Initial apply plus two updates, like the comprehensive example.
    for marker in 1..=3 {
        policy.create_version(revision(marker)).expect("version");
    }

    assert!(policy.version_count() >= 3);
    assert_eq!(policy.default_version_id().as_deref(), Some("v3"));
    assert_eq!(policy.path(), "/application/");

    let descriptions = policy.describe_versions();
    assert_eq!(descriptions.iter().filter(|d| d.is_default).count(), 1);
}

#[test]
fn test_set_default_version_scenario() {
    let mut policy = ManagedPolicy::new("pinnable-policy", "/", None).expect("policy shell");
    for marker in 1..=3 {
        policy.create_version(revision(marker)).expect("version");
    }

    policy.set_default_version("v2").expect("repin");

    for description in policy.describe_versions() {
        assert_eq!(description.is_default, description.version_id == "v2");
    }
}

#[test]
fn test_eviction_keeps_four_most_recent_plus_new_default() {
    let mut policy = ManagedPolicy::new("evicting-policy", "/", None).expect("policy shell");
    for marker in 1..=5 {
        policy.create_version(revision(marker)).expect("version");
    }

    policy.create_version(revision(6)).expect("sixth version");

    let ids: Vec<String> = policy.versions().map(|v| v.version_id()).collect();
    assert_eq!(ids, vec!["v2", "v3", "v4", "v5", "v6"]);
    assert_eq!(policy.default_version_id().as_deref(), Some("v6"));
    assert_eq!(policy.version_count(), MAX_RETAINED_VERSIONS);
}

#[test]
fn test_attaching_same_role_twice_counts_once() {
    let mut registry = IamRegistry::new();
    let mut policy =
        ManagedPolicy::new("cloudwatch-logs-policy", "/", None).expect("policy shell");
    policy.create_version(revision(1)).expect("version");
    registry.insert_policy(policy);

    registry.attach("cloudwatch-logs-policy", PrincipalKind::Role, "example-policy-role");
    registry.attach("cloudwatch-logs-policy", PrincipalKind::Role, "example-policy-role");

    assert_eq!(registry.attachment_count("cloudwatch-logs-policy"), 1);
}

#[test]
fn test_attachment_count_across_three_kinds() {
    let mut registry = IamRegistry::new();
    registry.attach("cloudwatch-logs-policy", PrincipalKind::Role, "example-policy-role");
    registry.attach("cloudwatch-logs-policy", PrincipalKind::User, "example-policy-user");
    registry.attach("cloudwatch-logs-policy", PrincipalKind::Group, "example-policy-group");

    assert_eq!(registry.attachment_count("cloudwatch-logs-policy"), 3);
}

#[test]
fn test_compose_error_does_not_yield_partial_document() {
    // The second source is malformed; composition is all-or-nothing.
    let sources = [
        StatementSource::document("good", S3_READ_SOURCE),
        StatementSource::document("bad", "not json at all"),
    ];

    let result = compose_policy("all-or-nothing-policy", "/", None, &sources);
    assert!(matches!(
        result,
        Err(PolicyForgeError::MalformedDocument { ref source_label, .. }) if source_label == "bad"
    ));
}

proptest! {
    /// Any number of version creations leaves at most five retained versions
    /// and exactly one default, with strictly increasing ordinals.
    #[test]
    fn prop_version_history_invariants(creations in 1usize..20) {
        let mut policy = ManagedPolicy::new("prop-policy", "/", None).expect("policy shell");

        for marker in 0..creations {
            policy.create_version(revision(marker as u32)).expect("version");
        }

        prop_assert!(policy.version_count() <= MAX_RETAINED_VERSIONS);
        prop_assert_eq!(policy.version_count(), creations.min(MAX_RETAINED_VERSIONS));

        let descriptions = policy.describe_versions();
        prop_assert_eq!(descriptions.iter().filter(|d| d.is_default).count(), 1);
        prop_assert_eq!(
            policy.default_version_id(),
            Some(format!("v{creations}"))
        );

        let ordinals: Vec<u32> = descriptions
            .iter()
            .map(|d| d.version_id[1..].parse().expect("ordinal"))
            .collect();
        prop_assert!(ordinals.windows(2).all(|pair| pair[0] < pair[1]));
    }

    /// Attach/detach sequences keep the table consistent with plain set
    /// semantics.
    #[test]
    fn prop_attachment_set_semantics(ops in proptest::collection::vec((0u8..2, 0u8..4), 0..40)) {
        let mut registry = IamRegistry::new();
        let mut model = std::collections::BTreeSet::new();

        for (op, principal) in ops {
            let name = format!("principal-{principal}");
            if op == 0 {
                registry.attach("model-policy", PrincipalKind::Role, &name);
                model.insert(name);
            } else {
                registry.detach("model-policy", PrincipalKind::Role, &name);
                model.remove(&name);
            }
            prop_assert_eq!(registry.attachment_count("model-policy"), model.len());
        }
    }
}
