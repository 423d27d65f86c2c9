//! Schema validation helpers.
//!
//! Declared configuration is validated against a resource's [`Schema`] before
//! the reconciliation engine builds any request, so invalid values fail fast
//! without a remote side effect.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_gitlab::schema::{Schema, Attribute};
//! use hemmer_provider_gitlab::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "link_type",
//!         Attribute::optional_string().with_allowed_values(["other", "runbook"]),
//!     );
//!
//! let diagnostics = validate(&schema, &json!({"name": "docs", "link_type": "runbook"}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "docs", "link_type": "video"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("link_type".to_string()));
//! ```

use crate::error::ProviderError;
use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Constraints, Diagnostic, NestedBlock,
    Schema,
};
use serde_json::Value;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes and computed blocks are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Allowed values, integer ranges and non-empty constraints are enforced
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Validate and fold any errors into [`ProviderError::InvalidConfiguration`].
pub fn ensure_valid(schema: &Schema, value: &Value) -> Result<(), ProviderError> {
    validate_result(schema, value).map_err(|diagnostics| {
        let details = diagnostics
            .iter()
            .map(|d| match &d.detail {
                Some(detail) => format!("{}: {}", d.summary, detail),
                None => d.summary.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        ProviderError::InvalidConfiguration(details)
    })
}

/// Check that `value` is an absolute `http` or `https` URL.
pub fn check_http_url(attr: &str, value: &str) -> Result<url::Url, ProviderError> {
    let parsed = url::Url::parse(value).map_err(|e| {
        ProviderError::InvalidConfiguration(format!(
            "expected {} to be a valid url, got {}: {}",
            attr, value, e
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        _ => Err(ProviderError::InvalidConfiguration(format!(
            "expected {} to have a url with schema of: \"http,https\", got {}",
            attr, value
        ))),
    }
}

/// Parse an RFC 3339 timestamp.
pub fn check_rfc3339(attr: &str, value: &str) -> Result<OffsetDateTime, ProviderError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| {
        ProviderError::InvalidConfiguration(format!(
            "expected {} to be a RFC 3339 timestamp, got {}: {}",
            attr, value, e
        ))
    })
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            // Null is valid for optional blocks, but we can't validate further
            return;
        },
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }

    for name in obj.keys() {
        if !block.attributes.contains_key(name) && !block.blocks.contains_key(name) {
            let attr_path = join_path(path, name);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", attr_path))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(attr_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Skip computed-only attributes (provider sets these)
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                validate_constraints(&attr.constraints, v, path, diagnostics);
            }
        },
    }
}

fn validate_constraints(
    constraints: &Constraints,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(s) = value.as_str() {
        if constraints.non_empty && s.is_empty() {
            diagnostics.push(
                Diagnostic::error(format!("Empty value for attribute '{}'", path))
                    .with_detail("expected a non-empty string")
                    .with_attribute(path),
            );
        }
        if !constraints.allowed_values.is_empty()
            && !constraints.allowed_values.iter().any(|allowed| allowed == s)
        {
            diagnostics.push(
                Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                    .with_detail(format!(
                        "{} is an invalid value for argument {}, acceptable values are: {}",
                        s,
                        path,
                        constraints.allowed_values.join(", ")
                    ))
                    .with_attribute(path),
            );
        }
    }

    if let (Some((min, max)), Some(n)) = (constraints.int_range, value.as_i64()) {
        if n < min || n > max {
            diagnostics.push(
                Diagnostic::error(format!("Out of range value for attribute '{}'", path))
                    .with_detail(format!(
                        "expected {} to be in the range ({} - {}), got {}",
                        path, min, max, n
                    ))
                    .with_attribute(path),
            );
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Object(attrs) => {
            if let Some(obj) = value.as_object() {
                validate_object_type(attrs, obj, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        },
    }
}

fn validate_object_type(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        let attr_path = join_path(path, name);
        match obj.get(name) {
            None | Some(Value::Null) => {},
            Some(value) => validate_attribute_type(attr_type, value, &attr_path, diagnostics),
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if nested.computed {
        return;
    }
    match nested.nesting_mode {
        BlockNestingMode::Single => validate_single_block(nested, value, path, diagnostics),
        BlockNestingMode::List | BlockNestingMode::Set => {
            validate_list_block(nested, value, path, diagnostics)
        },
    }
}

fn validate_single_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail("At least one block is required")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => validate_block(&nested.block, v, path, diagnostics),
    }
}

fn validate_list_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        },
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        },
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

// Helper functions

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("project", Attribute::required_string());

        assert!(validate(&schema, &json!({"project": "group/app"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("project".to_string()));

        let diagnostics = validate(&schema, &json!({"project": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"project": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("assignee_id", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"assignee_id": 42})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"assignee_id": null})).is_empty());
        assert_eq!(
            validate(&schema, &json!({"assignee_id": "not a number"})).len(),
            1
        );
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("link_id", Attribute::computed_int64());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"link_id": "whatever"})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("user_id", Attribute::required_int64());

        assert!(validate(&schema, &json!({"user_id": 42})).is_empty());
        assert!(validate(&schema, &json!({"user_id": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"user_id": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"user_id": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_allowed_values() {
        let schema = Schema::v0().with_attribute(
            "link_type",
            Attribute::optional_string().with_allowed_values(["other", "runbook", "image", "package"]),
        );

        assert!(validate(&schema, &json!({"link_type": "package"})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());

        let diagnostics = validate(&schema, &json!({"link_type": "video"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("acceptable values are: other, runbook, image, package"));
    }

    #[test]
    fn test_validate_int_range() {
        let schema =
            Schema::v0().with_attribute("weight", Attribute::optional_int64().with_int_range(0, 9));

        assert!(validate(&schema, &json!({"weight": 0})).is_empty());
        assert!(validate(&schema, &json!({"weight": 9})).is_empty());
        assert_eq!(validate(&schema, &json!({"weight": 10})).len(), 1);
        assert_eq!(validate(&schema, &json!({"weight": -1})).len(), 1);
    }

    #[test]
    fn test_validate_non_empty() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string().non_empty());

        assert!(validate(&schema, &json!({"name": "production"})).is_empty());
        let diagnostics = validate(&schema, &json!({"name": ""}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Empty value"));
    }

    #[test]
    fn test_constraints_not_checked_after_type_error() {
        let schema = Schema::v0().with_attribute(
            "link_type",
            Attribute::optional_string().with_allowed_values(["other"]),
        );
        let diagnostics = validate(&schema, &json!({"link_type": 5}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_set_of_strings() {
        let schema = Schema::v0().with_attribute(
            "labels",
            Attribute::new(
                AttributeType::set(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"labels": ["bug", "feature"]})).is_empty());
        assert!(validate(&schema, &json!({"labels": []})).is_empty());

        let diagnostics = validate(&schema, &json!({"labels": ["bug", 7]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("labels.1".to_string()));

        assert_eq!(validate(&schema, &json!({"labels": "bug"})).len(), 1);
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "lists",
            NestedBlock::list(
                Block::new()
                    .with_attribute("label_id", Attribute::optional_int64())
                    .with_attribute("position", Attribute::computed_int64()),
            )
            .with_max_items(2),
        );

        assert!(validate(&schema, &json!({"lists": [{"label_id": 1}, {}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"lists": [{}, {}, {}]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 2"));

        let diagnostics = validate(&schema, &json!({"lists": [{"label_id": "one"}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("lists.0.label_id".to_string()));

        let diagnostics = validate(&schema, &json!({"lists": {"label_id": 1}}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_validate_computed_block_skipped() {
        let schema = Schema::v0().with_block(
            "release_links",
            NestedBlock::list(Block::new().with_attribute("name", Attribute::required_string()))
                .computed(),
        );
        assert!(validate(&schema, &json!({"release_links": "garbage"})).is_empty());
    }

    #[test]
    fn test_validate_object_type() {
        let schema = Schema::v0().with_attribute(
            "endpoint",
            Attribute::new(
                AttributeType::object([
                    ("host", AttributeType::String),
                    ("port", AttributeType::Int64),
                ]),
                AttributeFlags::required(),
            ),
        );

        assert!(validate(&schema, &json!({"endpoint": {"host": "localhost", "port": 8080}})).is_empty());

        let diagnostics = validate(&schema, &json!({"endpoint": {"host": "localhost", "port": "8080"}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("endpoint.port".to_string()));
    }

    #[test]
    fn test_validate_unsupported_arguments() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_block(
                "lists",
                NestedBlock::list(Block::new().with_attribute("label_id", Attribute::optional_int64())),
            );

        assert!(validate(&schema, &json!({"name": "docs", "lists": [{"label_id": 1}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"name": "docs", "bogus": 1}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Unsupported argument 'bogus'"));

        let diagnostics = validate(&schema, &json!({"name": "docs", "lists": [{"labels": ["bug"]}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("lists.0.labels".to_string()));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("user_id", Attribute::required_int64())
            .with_attribute("can_push", Attribute::optional_bool());

        let diagnostics = validate(
            &schema,
            &json!({"name": 123, "user_id": "not a number", "can_push": "yes"}),
        );
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }

    #[test]
    fn test_helpers() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "test"})));
        assert!(!is_valid(&schema, &json!({})));
        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_check_http_url() {
        assert!(check_http_url("external_url", "https://staging.example.com").is_ok());
        assert!(check_http_url("external_url", "http://10.0.0.1:8080/app").is_ok());

        let err = check_http_url("external_url", "ftp://example.com").unwrap_err();
        assert!(err.message().contains("http,https"));
        assert!(check_http_url("external_url", "not a url").is_err());
        assert!(check_http_url("external_url", "").is_err());
    }

    #[test]
    fn test_check_rfc3339() {
        let ts = check_rfc3339("expires_at", "2030-01-21T00:00:00.000Z").unwrap();
        assert_eq!(ts.year(), 2030);
        assert!(check_rfc3339("expires_at", "2030-01-21T00:00:00+02:00").is_ok());
        assert!(check_rfc3339("expires_at", "2030-01-21").is_err());
        assert!(check_rfc3339("expires_at", "tomorrow").is_err());
    }

    #[test]
    fn test_ensure_valid_maps_to_invalid_configuration() {
        let schema = Schema::v0().with_attribute(
            "link_type",
            Attribute::optional_string().with_allowed_values(["other"]),
        );

        assert!(ensure_valid(&schema, &json!({"link_type": "other"})).is_ok());

        let err = ensure_valid(&schema, &json!({"link_type": "video"})).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfiguration(_)));
        assert!(err.message().contains("video is an invalid value"));
    }
}
