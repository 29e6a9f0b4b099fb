//! Default value checks against a decoded option.
//!
//! Used for the `default` of an attribute at creation time and for every
//! cell of a table attribute's default rows.

use crate::config::ValidationRules;
use crate::error::{ValidationError, ValidationResult};
use crate::schema::option::{as_integer, json_kind};
use crate::schema::{AttributeOption, PropertyType};
use regex::Regex;
use serde_json::Value;

/// Check `value` as a value of `field` whose type is `property_type`.
///
/// Null values are always accepted; absence of a default is not an error.
pub(crate) fn check_value(
    rules: &ValidationRules,
    field: &str,
    property_type: &PropertyType,
    option: &AttributeOption,
    value: &Value,
    is_multiple: bool,
) -> ValidationResult<()> {
    if value.is_null() {
        return Ok(());
    }
    let limits = rules.limits();

    match (property_type, option) {
        (PropertyType::Int, AttributeOption::Int(range)) => {
            let number = integer_value(value)
                .ok_or_else(|| ValidationError::default_value(field, expected("integer", value)))?;
            if !range.contains(number) {
                return Err(ValidationError::default_value(
                    field,
                    format!("{} is outside the option range", number),
                ));
            }
            Ok(())
        }
        (PropertyType::Float, AttributeOption::Float(range)) => {
            let number = float_value(value)
                .ok_or_else(|| ValidationError::default_value(field, expected("number", value)))?;
            if !range.contains(number) {
                return Err(ValidationError::default_value(
                    field,
                    format!("{} is outside the option range", number),
                ));
            }
            Ok(())
        }
        (PropertyType::SingleChar | PropertyType::LongChar, AttributeOption::Pattern(pattern)) => {
            let text = value
                .as_str()
                .ok_or_else(|| ValidationError::default_value(field, expected("string", value)))?;
            let max = if *property_type == PropertyType::LongChar {
                limits.long_char_max_len
            } else {
                limits.single_char_max_len
            };
            if text.chars().count() > max {
                return Err(ValidationError::too_long(field, max));
            }
            if let Some(pattern) = pattern.as_deref().filter(|_| !text.is_empty()) {
                let regex = Regex::new(pattern)
                    .map_err(|e| ValidationError::option(property_type, e.to_string()))?;
                if !regex.is_match(text) {
                    return Err(ValidationError::default_value(
                        field,
                        format!("'{}' does not match '{}'", text, pattern),
                    ));
                }
            }
            Ok(())
        }
        (PropertyType::Enum | PropertyType::EnumMulti, AttributeOption::Enum(choices)) => {
            let ids: Vec<&str> = match value {
                Value::String(id) => vec![id.as_str()],
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| {
                            ValidationError::default_value(field, expected("string", item))
                        })
                    })
                    .collect::<ValidationResult<_>>()?,
                other => {
                    return Err(ValidationError::default_value(field, expected("string", other)));
                }
            };
            if !is_multiple && ids.len() > 1 {
                return Err(ValidationError::NeedSingleChoice {
                    field: field.to_string(),
                });
            }
            match ids
                .iter()
                .find(|id| !choices.iter().any(|choice| choice.id == **id))
            {
                Some(unknown) => Err(ValidationError::default_value(
                    field,
                    format!("'{}' is not a declared choice", unknown),
                )),
                None => Ok(()),
            }
        }
        (PropertyType::List, AttributeOption::List(items)) => {
            let text = value
                .as_str()
                .ok_or_else(|| ValidationError::default_value(field, expected("string", value)))?;
            if items.iter().any(|item| item == text) {
                Ok(())
            } else {
                Err(ValidationError::default_value(
                    field,
                    format!("'{}' is not a list item", text),
                ))
            }
        }
        (PropertyType::Bool, _) => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(ValidationError::default_value(field, expected("boolean", value)))
            }
        }
        _ => Ok(()),
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.is_f64() => None,
        other => as_integer(other),
    }
}

fn float_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn expected(kind: &str, value: &Value) -> String {
    format!("expected {}, got {}", kind, json_kind(value))
}
