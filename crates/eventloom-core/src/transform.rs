//! Transform document loading
//!
//! A transform document maps output fields to rules:
//!
//! ```yaml
//! fields:
//!   id: "ID:integer"
//!   name: "Name"
//!   joined: "Joined:timestamp:%d/%m/%Y"
//!   note: "{ input['ID'] + '-note' }"
//! ```
//!
//! A rule wrapped in braces is an inline expression. Anything else is
//! `<input field>[:<format>]`, split on the first colon. Entries are turned
//! into [`Translator`]s in document order.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::translator::Translator;

/// `{ ... }` spanning the whole rule, from the first brace to the last
static EXPRESSION_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*\{(.*)\}\s*$").expect("static regex is valid"));

/// Parse a transform document into translators, in document order.
///
/// A document that is empty, has no `fields` key, or has `fields: ~` yields
/// no translators.
pub fn load_transform(content: &str) -> Result<Vec<Translator>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: Value = serde_yaml::from_str(content)?;
    let fields = match &doc {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(map) => match map.get("fields") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Mapping(fields)) => fields,
            Some(_) => {
                return Err(Error::TransformInvalid {
                    message: "'fields' must be a mapping of output field to rule".to_string(),
                });
            }
        },
        _ => {
            return Err(Error::TransformInvalid {
                message: "document must be a mapping with a 'fields' key".to_string(),
            });
        }
    };

    let mut translators = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let output_field = match key {
            Value::String(s) => s.clone(),
            other => {
                return Err(Error::Rule {
                    field: format!("{:?}", other),
                    message: "output field name must be a non-empty string".to_string(),
                });
            }
        };

        let rule = match value {
            Value::String(s) => s.as_str(),
            Value::Null => "",
            _ => {
                return Err(Error::Rule {
                    field: output_field,
                    message: "rule must be a string".to_string(),
                });
            }
        };

        let translator = parse_rule(&output_field, rule)?;
        tracing::debug!(field = %output_field, mode = ?translator.mode(), "loaded translator");
        translators.push(translator);
    }

    Ok(translators)
}

/// Read a transform document from disk and parse it
pub fn load_transform_file(path: impl AsRef<Path>) -> Result<Vec<Translator>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    load_transform(&content)
}

/// Turn one rule string into a translator.
///
/// A blank rule is accepted and yields a field-copy translator with an empty
/// input field and format. It reads the column with an empty header, so in
/// practice it writes `null` (or fails with a missing field in strict mode).
///
/// Fails with [`Error::Rule`] when `output_field` is empty.
pub fn parse_rule(output_field: &str, rule: &str) -> Result<Translator> {
    if let Some(caps) = EXPRESSION_RULE.captures(rule) {
        let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Translator::expression(output_field, body);
    }

    let (input_field, format) = match rule.trim().split_once(':') {
        Some((input_field, format)) => (input_field.trim(), format.trim()),
        None => (rule.trim(), ""),
    };
    Translator::field_copy(output_field, input_field, format)
}
