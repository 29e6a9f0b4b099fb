//! Per-type option grammar.
//!
//! [`TypeOptionValidator`] decodes an option payload into its
//! [`AttributeOption`] variant and checks it against the grammar of the
//! property type, then checks the default value against the decoded option.

use super::default_value::check_value;
use crate::config::ValidationRules;
use crate::error::{ValidationError, ValidationResult};
use crate::schema::{AttributeOption, EnumChoice, NumericRange, PropertyType, fields};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

/// Checks option payloads and defaults of a single property type.
#[derive(Debug, Clone, Copy)]
pub struct TypeOptionValidator<'a> {
    rules: &'a ValidationRules,
}

impl<'a> TypeOptionValidator<'a> {
    pub fn new(rules: &'a ValidationRules) -> Self {
        Self { rules }
    }

    /// Validate the option and default of an attribute being created.
    ///
    /// Returns the decoded option so callers can reuse it.
    pub fn validate_option(
        &self,
        property_type: &PropertyType,
        option: Option<&Value>,
        default: Option<&Value>,
        is_multiple: bool,
    ) -> ValidationResult<AttributeOption> {
        let decoded = AttributeOption::decode(property_type, option)?;
        self.check_grammar(property_type, &decoded, is_multiple)?;
        if let Some(default) = default {
            check_value(
                self.rules,
                "default",
                property_type,
                &decoded,
                default,
                is_multiple,
            )?;
        }
        Ok(decoded)
    }

    /// Validate the option of a table header column.
    ///
    /// Only the column types a table supports are dispatched; boolean
    /// columns take any option.
    pub fn validate_table_column(
        &self,
        property_type: &PropertyType,
        option: Option<&Value>,
        default: Option<&Value>,
        is_multiple: Option<bool>,
    ) -> ValidationResult<AttributeOption> {
        let is_multiple = is_multiple.unwrap_or(false);
        match property_type {
            PropertyType::Int
            | PropertyType::EnumMulti
            | PropertyType::SingleChar
            | PropertyType::LongChar
            | PropertyType::Float => self.validate_option(property_type, option, default, is_multiple),
            PropertyType::Bool => {
                if let Some(default) = default {
                    check_value(
                        self.rules,
                        "default",
                        property_type,
                        &AttributeOption::Unconstrained,
                        default,
                        is_multiple,
                    )?;
                }
                Ok(AttributeOption::Unconstrained)
            }
            other => Err(ValidationError::UnsupportedPropertyType {
                property_type: other.to_string(),
            }),
        }
    }

    fn check_grammar(
        &self,
        property_type: &PropertyType,
        option: &AttributeOption,
        is_multiple: bool,
    ) -> ValidationResult<()> {
        match option {
            AttributeOption::Int(range) => check_range(property_type, range),
            AttributeOption::Float(range) => check_range(property_type, range),
            AttributeOption::Pattern(pattern) => self.check_pattern(property_type, pattern.as_deref()),
            AttributeOption::Enum(choices) => self.check_choices(property_type, choices, is_multiple),
            AttributeOption::List(items) => self.check_list(property_type, items),
            // checked by the cross reference guard and the table validator
            AttributeOption::EnumQuote(_) | AttributeOption::Table(_) => Ok(()),
            AttributeOption::Unconstrained => Ok(()),
        }
    }

    fn check_pattern(&self, property_type: &PropertyType, pattern: Option<&str>) -> ValidationResult<()> {
        let Some(pattern) = pattern else {
            return Ok(());
        };
        let max = self.rules.limits().option_max_len;
        if pattern.chars().count() > max {
            return Err(ValidationError::too_long(fields::OPTION, max));
        }
        Regex::new(pattern)
            .map(|_| ())
            .map_err(|e| ValidationError::option(property_type, format!("pattern does not compile: {}", e)))
    }

    fn check_choices(
        &self,
        property_type: &PropertyType,
        choices: &[EnumChoice],
        is_multiple: bool,
    ) -> ValidationResult<()> {
        let limits = self.rules.limits();
        if choices.is_empty() {
            return Err(ValidationError::option(property_type, "at least one choice is required"));
        }
        if choices.len() > limits.option_array_max_len {
            return Err(ValidationError::TooManyItems {
                field: fields::OPTION.to_string(),
                max: limits.option_array_max_len,
            });
        }

        let mut seen = HashSet::with_capacity(choices.len());
        for choice in choices {
            if choice.id.is_empty() {
                return Err(ValidationError::missing("option id"));
            }
            if choice.id.chars().count() > limits.option_value_max_len {
                return Err(ValidationError::too_long("option id", limits.option_value_max_len));
            }
            if choice.name.is_empty() {
                return Err(ValidationError::missing("option name"));
            }
            if choice.name.chars().count() > limits.option_value_max_len {
                return Err(ValidationError::too_long("option name", limits.option_value_max_len));
            }
            if choice.kind != "text" {
                return Err(ValidationError::invalid("option type", choice.kind.clone()));
            }
            if !seen.insert(choice.id.as_str()) {
                return Err(ValidationError::option(
                    property_type,
                    format!("duplicate choice id '{}'", choice.id),
                ));
            }
        }

        let defaults = choices.iter().filter(|choice| choice.is_default).count();
        if !is_multiple && defaults > 1 {
            return Err(ValidationError::NeedSingleChoice {
                field: fields::OPTION.to_string(),
            });
        }
        Ok(())
    }

    fn check_list(&self, property_type: &PropertyType, items: &[String]) -> ValidationResult<()> {
        let limits = self.rules.limits();
        if items.is_empty() {
            return Err(ValidationError::option(property_type, "at least one item is required"));
        }
        if items.len() > limits.option_array_max_len {
            return Err(ValidationError::TooManyItems {
                field: fields::OPTION.to_string(),
                max: limits.option_array_max_len,
            });
        }
        for item in items {
            if item.is_empty() {
                return Err(ValidationError::option(property_type, "list items must not be empty"));
            }
            if item.chars().count() > limits.option_value_max_len {
                return Err(ValidationError::too_long("option item", limits.option_value_max_len));
            }
        }
        Ok(())
    }
}

fn check_range<T>(property_type: &PropertyType, range: &NumericRange<T>) -> ValidationResult<()>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if range.is_ordered() {
        return Ok(());
    }
    match (range.min, range.max) {
        (Some(min), Some(max)) => Err(ValidationError::option(
            property_type,
            format!("min {} is greater than max {}", min, max),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use serde_json::json;

    fn rules() -> ValidationRules {
        EngineConfig::default().compile().unwrap()
    }

    #[test]
    fn test_int_option_and_default() {
        let rules = rules();
        let validator = TypeOptionValidator::new(&rules);
        let option = json!({"min": 0, "max": 1024});

        assert!(validator
            .validate_option(&PropertyType::Int, Some(&option), Some(&json!(8)), false)
            .is_ok());
        assert!(validator
            .validate_option(&PropertyType::Int, Some(&option), Some(&json!(2048)), false)
            .is_err());

        let reversed = json!({"min": 10, "max": 1});
        assert!(matches!(
            validator.validate_option(&PropertyType::Int, Some(&reversed), None, false),
            Err(ValidationError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_string_pattern_must_compile() {
        let rules = rules();
        let validator = TypeOptionValidator::new(&rules);
        assert!(validator
            .validate_option(&PropertyType::SingleChar, Some(&json!("^[0-9]+$")), Some(&json!("42")), false)
            .is_ok());
        assert!(validator
            .validate_option(&PropertyType::LongChar, Some(&json!("([")), None, false)
            .is_err());
    }

    #[test]
    fn test_enum_single_choice_defaults() {
        let rules = rules();
        let validator = TypeOptionValidator::new(&rules);
        let option = json!([
            {"id": "a", "name": "A", "type": "text", "is_default": true},
            {"id": "b", "name": "B", "type": "text", "is_default": true}
        ]);

        assert!(matches!(
            validator.validate_option(&PropertyType::Enum, Some(&option), None, false),
            Err(ValidationError::NeedSingleChoice { .. })
        ));
        assert!(validator
            .validate_option(&PropertyType::EnumMulti, Some(&option), None, true)
            .is_ok());
    }

    #[test]
    fn test_enum_duplicate_ids() {
        let rules = rules();
        let validator = TypeOptionValidator::new(&rules);
        let option = json!([
            {"id": "a", "name": "A", "type": "text"},
            {"id": "a", "name": "Again", "type": "text"}
        ]);
        assert!(validator
            .validate_option(&PropertyType::EnumMulti, Some(&option), None, true)
            .is_err());
    }

    #[test]
    fn test_list_default_must_be_item() {
        let rules = rules();
        let validator = TypeOptionValidator::new(&rules);
        let option = json!(["small", "large"]);
        assert!(validator
            .validate_option(&PropertyType::List, Some(&option), Some(&json!("small")), false)
            .is_ok());
        assert!(validator
            .validate_option(&PropertyType::List, Some(&option), Some(&json!("medium")), false)
            .is_err());
    }

    #[test]
    fn test_table_column_dispatch() {
        let rules = rules();
        let validator = TypeOptionValidator::new(&rules);
        assert!(validator
            .validate_table_column(&PropertyType::Bool, Some(&json!({"anything": 1})), None, None)
            .is_ok());
        assert!(validator
            .validate_table_column(&PropertyType::Float, Some(&json!({"min": "1.5", "max": ""})), None, None)
            .is_ok());
        assert!(matches!(
            validator.validate_table_column(&PropertyType::Date, None, None, None),
            Err(ValidationError::UnsupportedPropertyType { .. })
        ));
    }
}
