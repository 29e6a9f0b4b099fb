//! Engine configuration.
//!
//! [`EngineConfig`] holds every length bound and pattern the validators
//! enforce. It is plain data so it can be loaded from a configuration
//! document; [`EngineConfig::compile`] turns it into [`ValidationRules`],
//! the form the validators borrow at runtime.

use crate::error::{BuildError, BuildResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Limits and patterns applied to attribute definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum characters in a property id
    pub property_id_max_len: usize,
    /// Maximum characters in a property display name
    pub property_name_max_len: usize,
    /// Maximum characters in a placeholder text
    pub placeholder_max_len: usize,
    /// Maximum characters in a string option pattern
    pub option_max_len: usize,
    /// Maximum characters of a single option value (enum id/name, list item, quoted object id)
    pub option_value_max_len: usize,
    /// Maximum entries in an array option
    pub option_array_max_len: usize,
    /// Maximum characters of a short string value
    pub single_char_max_len: usize,
    /// Maximum characters of a long string value
    pub long_char_max_len: usize,
    /// Maximum columns in a table header
    pub table_header_max_columns: usize,
    /// Maximum long string columns in a table header
    pub table_long_char_max_columns: usize,
    /// Maximum default rows of a table attribute
    pub table_default_max_rows: usize,
    /// Pattern property ids must match
    pub property_id_pattern: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            property_id_max_len: 128,
            property_name_max_len: 128,
            placeholder_max_len: 2000,
            option_max_len: 1000,
            option_value_max_len: 128,
            option_array_max_len: 200,
            single_char_max_len: 256,
            long_char_max_len: 2000,
            table_header_max_columns: 8,
            table_long_char_max_columns: 2,
            table_default_max_rows: 10,
            property_id_pattern: r"^[a-zA-Z][a-zA-Z0-9_]*$".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration document. Absent fields keep their defaults.
    pub fn from_json_str(document: &str) -> BuildResult<Self> {
        serde_json::from_str(document).map_err(|e| BuildError::InvalidConfiguration {
            message: format!("failed to parse engine configuration: {}", e),
        })
    }

    /// Set the maximum number of table header columns.
    pub fn with_table_header_max_columns(mut self, max: usize) -> Self {
        self.table_header_max_columns = max;
        self
    }

    /// Set the maximum number of default rows for table attributes.
    pub fn with_table_default_max_rows(mut self, max: usize) -> Self {
        self.table_default_max_rows = max;
        self
    }

    /// Set the property id pattern.
    pub fn with_property_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.property_id_pattern = pattern.into();
        self
    }

    /// Check the bounds and compile the patterns.
    pub fn compile(self) -> BuildResult<ValidationRules> {
        if self.table_header_max_columns == 0 {
            return Err(BuildError::InvalidConfiguration {
                message: "table_header_max_columns must be positive".to_string(),
            });
        }
        if self.property_id_max_len == 0 || self.property_name_max_len == 0 {
            return Err(BuildError::InvalidConfiguration {
                message: "property id and name limits must be positive".to_string(),
            });
        }

        let property_id = Regex::new(&self.property_id_pattern).map_err(|e| {
            BuildError::InvalidConfiguration {
                message: format!(
                    "property_id_pattern '{}' does not compile: {}",
                    self.property_id_pattern, e
                ),
            }
        })?;

        Ok(ValidationRules {
            config: self,
            property_id,
        })
    }
}

/// Compiled configuration shared by the validators.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    config: EngineConfig,
    property_id: Regex,
}

impl ValidationRules {
    /// The limits these rules were compiled from.
    pub fn limits(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a property id matches the identifier charset.
    pub fn is_valid_property_id(&self, property_id: &str) -> bool {
        self.property_id.is_match(property_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let rules = EngineConfig::default().compile().unwrap();
        assert!(rules.is_valid_property_id("cpu_num"));
        assert!(!rules.is_valid_property_id("1cpu"));
        assert!(!rules.is_valid_property_id("cpu-num"));
        assert!(!rules.is_valid_property_id(""));
    }

    #[test]
    fn test_default_charset_is_ascii() {
        let rules = EngineConfig::default().compile().unwrap();
        for id in ["cpu数", "aé", "Ωmega", "disk٣", "name\u{00a0}x"] {
            assert!(!rules.is_valid_property_id(id), "{} accepted", id);
        }
        assert!(rules.is_valid_property_id("Disk_01"));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"table_header_max_columns": 4}"#).unwrap();
        assert_eq!(config.table_header_max_columns, 4);
        assert_eq!(config.table_default_max_rows, 10);
        assert_eq!(config.property_id_max_len, 128);
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let result = EngineConfig::default()
            .with_property_id_pattern("([a-z")
            .compile();
        assert!(matches!(
            result,
            Err(BuildError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_malformed_document_rejected() {
        assert!(EngineConfig::from_json_str("{not json").is_err());
    }
}
