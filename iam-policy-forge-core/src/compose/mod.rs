//! Policy document composition
//!
//! Merges normalized statements from one or more sources into a single
//! document, enforcing the provider's identity and document-level
//! constraints. Composition is additive: semantically equivalent statements
//! from different sources are preserved verbatim, never deduplicated.

use std::collections::HashSet;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::document::PolicyDocument;
use crate::error::{PolicyForgeError, PolicyForgeResult};
use crate::normalize::{normalize_sources, StatementSource};

/// Provider ceiling for a managed policy document, in bytes of the compact
/// serialization.
pub const MANAGED_POLICY_MAX_BYTES: usize = 6144;

/// Provider ceiling for policy and inline-policy names.
pub const POLICY_NAME_MAX_LEN: usize = 128;

/// Provider ceiling for policy descriptions.
pub const DESCRIPTION_MAX_LEN: usize = 1000;

fn name_regex() -> &'static Regex {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    NAME_RE.get_or_init(|| Regex::new(r"^[\w+=,.@-]+$").expect("valid name pattern"))
}

fn path_regex() -> &'static Regex {
    static PATH_RE: OnceLock<Regex> = OnceLock::new();
    PATH_RE.get_or_init(|| Regex::new(r"^/(?:[\w+=,.@-]+/)*$").expect("valid path pattern"))
}

/// Compose a managed policy document from the given statement sources.
///
/// Identity validation (name, path, description) runs first and
/// unconditionally; it is independent of document content and must not be
/// skipped when the document itself fails to compose. Statements concatenate
/// in source order. All-or-nothing: no partial document is returned on
/// failure.
pub fn compose_policy(
    name: &str,
    path: &str,
    description: Option<&str>,
    sources: &[StatementSource],
) -> PolicyForgeResult<PolicyDocument> {
    validate_policy_name(name)?;
    validate_policy_path(path)?;
    if let Some(description) = description {
        validate_description(description)?;
    }

    let normalized = normalize_sources(sources)?;
    let statements: Vec<_> = normalized.into_iter().map(|n| n.statement).collect();

    warn_on_duplicates(name, &statements);

    let document = PolicyDocument::new(statements);
    validate_document(&document)?;

    debug!(
        "composed policy '{}': {} statements, {} bytes",
        name,
        document.statement.len(),
        document.size_bytes()?
    );
    Ok(document)
}

/// Document-level constraints shared with the role assembler: a non-empty
/// statement sequence within the provider size ceiling.
pub fn validate_document(document: &PolicyDocument) -> PolicyForgeResult<()> {
    if document.statement.is_empty() {
        return Err(PolicyForgeError::EmptyDocument);
    }

    let size_bytes = document.size_bytes()?;
    if size_bytes > MANAGED_POLICY_MAX_BYTES {
        return Err(PolicyForgeError::DocumentTooLarge {
            size_bytes,
            limit: MANAGED_POLICY_MAX_BYTES,
        });
    }
    Ok(())
}

/// Policy names are 1-128 characters of `[\w+=,.@-]`.
pub fn validate_policy_name(name: &str) -> PolicyForgeResult<()> {
    validate_name("policy name", name, POLICY_NAME_MAX_LEN)
}

pub(crate) fn validate_name(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> PolicyForgeResult<()> {
    if value.is_empty() {
        return Err(PolicyForgeError::InvalidName {
            field,
            value: value.to_string(),
            constraint: "must not be empty".to_string(),
        });
    }
    if value.len() > max_len {
        return Err(PolicyForgeError::InvalidName {
            field,
            value: value.to_string(),
            constraint: format!("must be at most {max_len} characters, got {}", value.len()),
        });
    }
    if !name_regex().is_match(value) {
        return Err(PolicyForgeError::InvalidName {
            field,
            value: value.to_string(),
            constraint: "may only contain alphanumerics and +=,.@-_".to_string(),
        });
    }
    Ok(())
}

/// Paths are `/` or slash-delimited segments of the name character class,
/// beginning and ending with `/`.
pub fn validate_policy_path(path: &str) -> PolicyForgeResult<()> {
    if !path_regex().is_match(path) {
        return Err(PolicyForgeError::InvalidName {
            field: "policy path",
            value: path.to_string(),
            constraint: "must begin and end with '/' with segments of alphanumerics and +=,.@-_"
                .to_string(),
        });
    }
    Ok(())
}

pub fn validate_description(description: &str) -> PolicyForgeResult<()> {
    if description.len() > DESCRIPTION_MAX_LEN {
        return Err(PolicyForgeError::InvalidName {
            field: "policy description",
            value: description.to_string(),
            constraint: format!(
                "must be at most {DESCRIPTION_MAX_LEN} characters, got {}",
                description.len()
            ),
        });
    }
    Ok(())
}

// Duplicates are legal and preserved; they usually mean two sources declared
// the same intent, which is worth surfacing to the caller's logs.
fn warn_on_duplicates(name: &str, statements: &[crate::document::Statement]) {
    let mut seen = HashSet::new();
    for statement in statements {
        if let Ok(serialized) = serde_json::to_string(statement) {
            if !seen.insert(serialized) {
                warn!("policy '{}' carries duplicate statements; keeping both", name);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Statement;

    const S3_READ_DOCUMENT: &str = r#"{
        "Version": "2012-10-17",
        "Statement": [
            {"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::bucket/*"},
            {"Effect": "Allow", "Action": "s3:ListBucket", "Resource": "arn:aws:s3:::bucket"}
        ]
    }"#;

    fn data_statements() -> Vec<Statement> {
        vec![
            Statement::allow(
                vec!["dynamodb:GetItem".to_string()],
                vec!["arn:aws:dynamodb:us-east-1:123456789012:table/t".to_string()],
            ),
            Statement::allow(
                vec!["secretsmanager:GetSecretValue".to_string()],
                vec!["arn:aws:secretsmanager:us-east-1:123456789012:secret:s".to_string()],
            ),
            Statement::allow(
                vec!["kms:Decrypt".to_string()],
                vec!["arn:aws:kms:us-east-1:123456789012:key/k".to_string()],
            ),
        ]
    }

    #[test]
    fn test_compose_merges_sources_in_order() {
        let sources = [
            StatementSource::document("s3-read", S3_READ_DOCUMENT),
            StatementSource::statements("data-access", data_statements()),
        ];

        let document = compose_policy("data-source-generated-policy", "/", None, &sources).unwrap();

        assert_eq!(document.statement.len(), 5);
        assert!(document.statement[0]
            .action
            .as_ref()
            .is_some_and(|a| a.contains("s3:GetObject")));
        assert!(document.statement[2]
            .action
            .as_ref()
            .is_some_and(|a| a.contains("dynamodb:GetItem")));
        assert!(document.statement[4]
            .action
            .as_ref()
            .is_some_and(|a| a.contains("kms:Decrypt")));
    }

    #[test]
    fn test_compose_preserves_duplicate_statements() {
        let statement = Statement::allow(
            vec!["s3:GetObject".to_string()],
            vec!["arn:aws:s3:::bucket/*".to_string()],
        );
        let sources = [
            StatementSource::statements("first", vec![statement.clone()]),
            StatementSource::statements("second", vec![statement]),
        ];

        let document = compose_policy("additive-policy", "/", None, &sources).unwrap();
        assert_eq!(document.statement.len(), 2);
        assert_eq!(document.statement[0], document.statement[1]);
    }

    #[test]
    fn test_compose_empty_sources_fails() {
        let result = compose_policy("empty-policy", "/", None, &[]);
        assert!(matches!(result, Err(PolicyForgeError::EmptyDocument)));
    }

    #[test]
    fn test_compose_rejects_oversized_document() {
        // Enough distinct wide statements to push past the 6144-byte ceiling.
        let statements: Vec<_> = (0..40)
            .map(|i| {
                Statement::allow(
                    vec![format!("service{i}:SomeVeryDescriptiveActionName{i}")],
                    vec![format!(
                        "arn:aws:service{i}:us-east-1:123456789012:resource/some-long-resource-name-{i}"
                    )],
                )
            })
            .collect();
        let sources = [StatementSource::statements("wide", statements)];

        let result = compose_policy("oversized-policy", "/", None, &sources);
        assert!(matches!(
            result,
            Err(PolicyForgeError::DocumentTooLarge { size_bytes, limit: MANAGED_POLICY_MAX_BYTES })
                if size_bytes > MANAGED_POLICY_MAX_BYTES
        ));
    }

    #[test]
    fn test_name_validation_runs_before_document_composition() {
        let long_name = "test-policy-with-very-long-name-that-exceeds-128-characters-and-should-fail-validation-because-the-provider-has-limits-on-name-length";
        assert!(long_name.len() > POLICY_NAME_MAX_LEN);

        // The document source is malformed too; the name failure must win.
        let sources = [StatementSource::document("bad", "invalid-json")];
        let result = compose_policy(long_name, "/", None, &sources);
        assert!(matches!(
            result,
            Err(PolicyForgeError::InvalidName { field: "policy name", .. })
        ));
    }

    #[test]
    fn test_name_character_class() {
        assert!(validate_policy_name("basic-s3-read-policy").is_ok());
        assert!(validate_policy_name("role_name+with=allowed,chars.@").is_ok());
        assert!(validate_policy_name("").is_err());
        assert!(validate_policy_name("has space").is_err());
        assert!(validate_policy_name("has/slash").is_err());
    }

    #[test]
    fn test_path_validation() {
        assert!(validate_policy_path("/").is_ok());
        assert!(validate_policy_path("/application/").is_ok());
        assert!(validate_policy_path("/application/team/").is_ok());
        assert!(validate_policy_path("").is_err());
        assert!(validate_policy_path("application/").is_err());
        assert!(validate_policy_path("/application").is_err());
    }

    #[test]
    fn test_description_length_ceiling() {
        assert!(validate_description("Basic IAM policy for S3 read access").is_ok());
        let long = "d".repeat(DESCRIPTION_MAX_LEN + 1);
        assert!(matches!(
            validate_description(&long),
            Err(PolicyForgeError::InvalidName { field: "policy description", .. })
        ));
    }
}
