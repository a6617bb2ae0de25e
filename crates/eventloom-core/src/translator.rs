//! Field translators
//!
//! A [`Translator`] produces one output field from an input record, either by
//! evaluating an inline expression or by copying (and converting) one input
//! field.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::format::FieldFormat;
use crate::record::{InputRecord, OutputRecord};

/// How a translator produces its value
#[derive(Debug, Clone, PartialEq)]
pub enum TranslatorMode {
    /// Evaluate an inline expression against the whole input record
    Expression(Expression),
    /// Copy one input field, converting it per `format`
    FieldCopy {
        /// Input column to read
        input_field: String,
        /// Format name, empty for pass-through
        format: String,
    },
}

/// One compiled transform rule
#[derive(Debug, Clone, PartialEq)]
pub struct Translator {
    output_field: String,
    mode: TranslatorMode,
}

impl Translator {
    /// Create an expression-mode translator
    ///
    /// Fails with [`Error::Rule`] when `output_field` is empty.
    pub fn expression(output_field: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        Ok(Self {
            output_field: non_empty(output_field.into())?,
            mode: TranslatorMode::Expression(Expression::compile(source)),
        })
    }

    /// Create a field-copy translator
    ///
    /// Fails with [`Error::Rule`] when `output_field` is empty.
    pub fn field_copy(
        output_field: impl Into<String>,
        input_field: impl Into<String>,
        format: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            output_field: non_empty(output_field.into())?,
            mode: TranslatorMode::FieldCopy {
                input_field: input_field.into(),
                format: format.into(),
            },
        })
    }

    /// Destination key in every output record
    pub fn output_field(&self) -> &str {
        &self.output_field
    }

    /// Translation mode
    pub fn mode(&self) -> &TranslatorMode {
        &self.mode
    }

    /// Report problems that would otherwise only surface on the first row:
    /// expression syntax errors and unknown format names.
    pub fn check(&self) -> Result<()> {
        match &self.mode {
            TranslatorMode::Expression(expr) => {
                expr.check().map(|_| ()).map_err(|e| Error::Expression {
                    field: self.output_field.clone(),
                    source: e.clone(),
                })
            }
            TranslatorMode::FieldCopy { format, .. } => {
                self.resolve_format(format).map(|_| ())
            }
        }
    }

    /// Compute this translator's value and store it in `output`, replacing
    /// any value an earlier translator wrote under the same key.
    ///
    /// With `strict` set, a field-copy translator whose input field is absent
    /// fails with [`Error::MissingField`], and a blank value under a typed
    /// format fails with [`Error::Format`]. Without it both write `null`.
    pub fn apply(&self, input: &InputRecord, output: &mut OutputRecord, strict: bool) -> Result<()> {
        let value = match &self.mode {
            TranslatorMode::Expression(expr) => {
                expr.evaluate(input).map_err(|e| Error::Expression {
                    field: self.output_field.clone(),
                    source: e,
                })?
            }
            TranslatorMode::FieldCopy {
                input_field,
                format,
            } => {
                let field_format = self.resolve_format(format)?;
                match input.get(input_field) {
                    Some(raw) if !strict && field_format.is_typed() && raw.trim().is_empty() => {
                        Value::Null
                    }
                    Some(raw) => field_format.convert(raw).map_err(|message| Error::Format {
                        field: self.output_field.clone(),
                        format: format.clone(),
                        value: raw.to_string(),
                        message,
                    })?,
                    None if strict => {
                        return Err(Error::MissingField {
                            field: input_field.clone(),
                        });
                    }
                    None => Value::Null,
                }
            }
        };

        output.insert(self.output_field.clone(), value);
        Ok(())
    }

    fn resolve_format(&self, format: &str) -> Result<FieldFormat> {
        FieldFormat::parse(format).ok_or_else(|| Error::Format {
            field: self.output_field.clone(),
            format: format.to_string(),
            value: String::new(),
            message: "unknown format".to_string(),
        })
    }
}

fn non_empty(output_field: String) -> Result<String> {
    if output_field.is_empty() {
        return Err(Error::Rule {
            field: output_field,
            message: "output field name must be a non-empty string".to_string(),
        });
    }
    Ok(output_field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> InputRecord {
        InputRecord::from_pairs([("ID", "42"), ("Name", "Alice")])
    }

    #[test]
    fn test_field_copy_pass_through() {
        let mut output = OutputRecord::new();
        Translator::field_copy("name", "Name", "")
            .unwrap()
            .apply(&input(), &mut output, false)
            .unwrap();
        assert_eq!(output["name"], json!("Alice"));
    }

    #[test]
    fn test_field_copy_integer() {
        let mut output = OutputRecord::new();
        Translator::field_copy("id", "ID", "integer")
            .unwrap()
            .apply(&input(), &mut output, false)
            .unwrap();
        assert_eq!(output["id"], json!(42));
    }

    #[test]
    fn test_missing_field_permissive() {
        let mut output = OutputRecord::new();
        Translator::field_copy("email", "Email", "")
            .unwrap()
            .apply(&input(), &mut output, false)
            .unwrap();
        assert_eq!(output.get("email"), Some(&Value::Null));
    }

    #[test]
    fn test_unknown_format_fails_even_when_field_missing() {
        let mut output = OutputRecord::new();
        let err = Translator::field_copy("email", "Email", "currency")
            .unwrap()
            .apply(&input(), &mut output, false)
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn test_missing_field_strict() {
        let mut output = OutputRecord::new();
        let err = Translator::field_copy("email", "Email", "")
            .unwrap()
            .apply(&input(), &mut output, true)
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field } if field == "Email"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_unknown_format_fails_on_apply() {
        let translator = Translator::field_copy("id", "ID", "currency").unwrap();
        assert!(translator.check().is_err());
        let mut output = OutputRecord::new();
        let err = translator.apply(&input(), &mut output, false).unwrap_err();
        match err {
            Error::Format { format, message, .. } => {
                assert_eq!(format, "currency");
                assert_eq!(message, "unknown format");
            }
            other => panic!("Expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_value() {
        let mut output = OutputRecord::new();
        let err = Translator::field_copy("n", "Name", "integer")
            .unwrap()
            .apply(&input(), &mut output, false)
            .unwrap_err();
        assert!(matches!(err, Error::Format { ref value, .. } if value == "Alice"));
    }

    #[test]
    fn test_expression_mode() {
        let mut output = OutputRecord::new();
        Translator::expression("note", " input['ID'] + '-note' ")
            .unwrap()
            .apply(&input(), &mut output, false)
            .unwrap();
        assert_eq!(output["note"], json!("42-note"));
    }

    #[test]
    fn test_broken_expression_fails_on_apply() {
        let translator = Translator::expression("x", "1 +").unwrap();
        assert!(matches!(translator.check(), Err(Error::Expression { .. })));
        let mut output = OutputRecord::new();
        let err = translator.apply(&input(), &mut output, false).unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_overwrites_existing_key() {
        let mut output = OutputRecord::new();
        output.insert("x".to_string(), json!("old"));
        Translator::field_copy("x", "Name", "")
            .unwrap()
            .apply(&input(), &mut output, false)
            .unwrap();
        assert_eq!(output["x"], json!("Alice"));
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn test_blank_typed_value_permissive_is_null() {
        let input = InputRecord::from_pairs([("Age", "  ")]);
        let mut output = OutputRecord::new();
        Translator::field_copy("age", "Age", "integer")
            .unwrap()
            .apply(&input, &mut output, false)
            .unwrap();
        assert_eq!(output["age"], Value::Null);
    }

    #[test]
    fn test_blank_typed_value_strict_is_format_error() {
        let input = InputRecord::from_pairs([("Age", "")]);
        let mut output = OutputRecord::new();
        let err = Translator::field_copy("age", "Age", "integer")
            .unwrap()
            .apply(&input, &mut output, true)
            .unwrap_err();
        assert!(matches!(err, Error::Format { ref field, .. } if field == "age"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_blank_string_value_is_kept_in_strict_mode() {
        let input = InputRecord::from_pairs([("Note", "")]);
        let mut output = OutputRecord::new();
        Translator::field_copy("note", "Note", "")
            .unwrap()
            .apply(&input, &mut output, true)
            .unwrap();
        assert_eq!(output["note"], json!(""));
    }

    #[test]
    fn test_empty_output_field_is_rejected() {
        assert!(matches!(
            Translator::field_copy("", "ID", "integer"),
            Err(Error::Rule { .. })
        ));
        assert!(matches!(
            Translator::expression("", "1 + 1"),
            Err(Error::Rule { .. })
        ));
    }
}
