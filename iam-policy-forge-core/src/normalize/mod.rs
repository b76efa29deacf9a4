//! Statement normalization
//!
//! Turns heterogeneous statement sources (literal JSON documents, structured
//! statement lists) into a canonical statement sequence, each entry tagged
//! with its provenance for diagnostics. Normalization is pure and preserves
//! source-declaration order first-to-last.

use log::trace;
use serde_json::Value;

use crate::document::Statement;
use crate::error::{PolicyForgeError, PolicyForgeResult};

/// One raw input to the composer: either a complete policy document in its
/// JSON wire form, or statements already in structured form.
#[derive(Debug, Clone)]
pub enum StatementSource {
    Document { label: String, json: String },
    Statements {
        label: String,
        statements: Vec<Statement>,
    },
}

impl StatementSource {
    pub fn document(label: impl Into<String>, json: impl Into<String>) -> Self {
        Self::Document {
            label: label.into(),
            json: json.into(),
        }
    }

    pub fn statements(label: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self::Statements {
            label: label.into(),
            statements,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Document { label, .. } | Self::Statements { label, .. } => label,
        }
    }
}

/// Where a normalized statement came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_label: String,
    pub source_index: usize,
    pub statement_index: usize,
}

/// A validated statement together with its origin.
#[derive(Debug, Clone)]
pub struct NormalizedStatement {
    pub statement: Statement,
    pub origin: Provenance,
}

/// Normalize all sources in order. Fails with `MalformedDocument` when a
/// source is not well-formed structured data, and `InvalidStatement` when a
/// statement parses but violates the required-field rules.
pub fn normalize_sources(
    sources: &[StatementSource],
) -> PolicyForgeResult<Vec<NormalizedStatement>> {
    let mut normalized = Vec::new();

    for (source_index, source) in sources.iter().enumerate() {
        let statements = match source {
            StatementSource::Document { label, json } => parse_document_statements(label, json)?,
            StatementSource::Statements { statements, .. } => statements.clone(),
        };
        trace!(
            "source {} '{}' contributed {} statements",
            source_index,
            source.label(),
            statements.len()
        );

        for (statement_index, statement) in statements.into_iter().enumerate() {
            validate_statement(&statement, source.label(), statement_index)?;
            normalized.push(NormalizedStatement {
                statement,
                origin: Provenance {
                    source_label: source.label().to_string(),
                    source_index,
                    statement_index,
                },
            });
        }
    }

    Ok(normalized)
}

/// Parse a literal JSON policy document into its statement sequence.
///
/// The provider accepts `Statement` as either an array or a single object;
/// the single-object short form normalizes to a one-element sequence.
fn parse_document_statements(label: &str, json: &str) -> PolicyForgeResult<Vec<Statement>> {
    let malformed = |detail: String| PolicyForgeError::MalformedDocument {
        source_label: label.to_string(),
        detail,
    };

    let value: Value = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| malformed("document root is not a JSON object".to_string()))?;
    let statement_value = object
        .get("Statement")
        .ok_or_else(|| malformed("document has no Statement field".to_string()))?;

    let raw_statements: Vec<Value> = match statement_value {
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![statement_value.clone()],
        other => {
            return Err(malformed(format!(
                "Statement must be an object or an array, got {}",
                json_type_name(other)
            )))
        }
    };

    let mut statements = Vec::with_capacity(raw_statements.len());
    for (statement_index, raw) in raw_statements.into_iter().enumerate() {
        let statement: Statement = serde_json::from_value(raw).map_err(|e| {
            PolicyForgeError::InvalidStatement {
                source_label: label.to_string(),
                statement_index,
                constraint: e.to_string(),
            }
        })?;
        statements.push(statement);
    }
    Ok(statements)
}

/// Field rules every normalized statement must satisfy: a non-empty Action
/// or NotAction, and at least one of Resource, NotResource, or Principal.
pub(crate) fn validate_statement(
    statement: &Statement,
    source_label: &str,
    statement_index: usize,
) -> PolicyForgeResult<()> {
    let invalid = |constraint: &str| PolicyForgeError::InvalidStatement {
        source_label: source_label.to_string(),
        statement_index,
        constraint: constraint.to_string(),
    };

    let has_action = statement.action.as_ref().is_some_and(|s| !s.is_empty());
    let has_not_action = statement.not_action.as_ref().is_some_and(|s| !s.is_empty());
    if !has_action && !has_not_action {
        return Err(invalid("statement must carry a non-empty Action or NotAction"));
    }

    let has_resource = statement.resource.as_ref().is_some_and(|s| !s.is_empty());
    let has_not_resource = statement
        .not_resource
        .as_ref()
        .is_some_and(|s| !s.is_empty());
    let has_principal = statement.principal.as_ref().is_some_and(|p| !p.is_empty());
    if !has_resource && !has_not_resource && !has_principal {
        return Err(invalid(
            "statement must carry at least one of Resource, NotResource, or Principal",
        ));
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
