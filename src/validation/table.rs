//! Table attribute option validation.
//!
//! A table attribute's option carries a header, the column definitions of
//! the rows it stores, and optional default rows. Column types are fixed at
//! creation, so the whole header is validated every time.

use super::default_value::check_value;
use super::type_option::TypeOptionValidator;
use super::{check_property_id, check_property_name};
use crate::config::ValidationRules;
use crate::error::{ValidationError, ValidationResult};
use crate::schema::{AttributeDefinition, AttributeOption, PropertyType, TableOption, fields};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A validated table header.
#[derive(Debug, Clone)]
pub struct TableHeader {
    columns: Vec<AttributeDefinition>,
    options: Vec<AttributeOption>,
    index: HashMap<String, usize>,
}

impl TableHeader {
    /// Columns in declaration order.
    pub fn columns(&self) -> &[AttributeDefinition] {
        &self.columns
    }

    /// Look up a column and its decoded option by property id.
    pub fn column(&self, property_id: &str) -> Option<(&AttributeDefinition, &AttributeOption)> {
        self.index
            .get(property_id)
            .map(|&position| (&self.columns[position], &self.options[position]))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Validates the header and default rows of table attributes.
#[derive(Debug, Clone, Copy)]
pub struct TableAttributeValidator<'a> {
    rules: &'a ValidationRules,
}

impl<'a> TableAttributeValidator<'a> {
    pub fn new(rules: &'a ValidationRules) -> Self {
        Self { rules }
    }

    /// Validate a complete table option: header first, then default rows.
    pub fn validate(&self, option: Option<&Value>) -> ValidationResult<TableHeader> {
        let table = match AttributeOption::decode(&PropertyType::Table, option)? {
            AttributeOption::Table(table) => table,
            _ => return Err(ValidationError::missing(fields::OPTION)),
        };
        let TableOption { header, default } = table;
        let header = self.parse_header(header)?;
        self.validate_default_rows(&default, &header)?;
        Ok(header)
    }

    /// Validate header columns and index them by property id.
    pub fn parse_header(&self, columns: Vec<AttributeDefinition>) -> ValidationResult<TableHeader> {
        let limits = self.rules.limits();
        if columns.is_empty() {
            return Err(ValidationError::missing("header"));
        }
        if columns.len() > limits.table_header_max_columns {
            return Err(ValidationError::TooManyItems {
                field: "header".to_string(),
                max: limits.table_header_max_columns,
            });
        }

        let type_options = TypeOptionValidator::new(self.rules);
        let mut options = Vec::with_capacity(columns.len());
        let mut index = HashMap::with_capacity(columns.len());
        let mut long_char_columns = 0;

        for (position, column) in columns.iter().enumerate() {
            let Some(property_type) = column.property_type.as_ref() else {
                return Err(ValidationError::missing(fields::PROPERTY_TYPE));
            };
            if !property_type.is_table_column_type() {
                return Err(ValidationError::UnsupportedPropertyType {
                    property_type: property_type.to_string(),
                });
            }
            if *property_type == PropertyType::LongChar {
                long_char_columns += 1;
                if long_char_columns > limits.table_long_char_max_columns {
                    return Err(ValidationError::TooManyItems {
                        field: "longchar columns".to_string(),
                        max: limits.table_long_char_max_columns,
                    });
                }
            }

            if column.property_id.is_empty() {
                return Err(ValidationError::missing(fields::PROPERTY_ID));
            }
            check_property_id(self.rules, &column.property_id, fields::PROPERTY_ID)?;
            if column.property_name.is_empty() {
                return Err(ValidationError::missing(fields::PROPERTY_NAME));
            }
            check_property_name(self.rules, &column.property_name, fields::PROPERTY_NAME)?;

            let decoded = type_options.validate_table_column(
                property_type,
                column.option.as_ref(),
                column.default.as_ref(),
                column.is_multiple,
            )?;

            if index.insert(column.property_id.clone(), position).is_some() {
                return Err(ValidationError::invalid(
                    fields::PROPERTY_ID,
                    column.property_id.clone(),
                ));
            }
            options.push(decoded);
        }

        Ok(TableHeader {
            columns,
            options,
            index,
        })
    }

    /// Validate default rows cell by cell against their header columns.
    ///
    /// A cell naming a column the header does not declare is rejected.
    pub fn validate_default_rows(
        &self,
        rows: &[Map<String, Value>],
        header: &TableHeader,
    ) -> ValidationResult<()> {
        let max = self.rules.limits().table_default_max_rows;
        if rows.len() > max {
            return Err(ValidationError::TooManyItems {
                field: "default".to_string(),
                max,
            });
        }

        for row in rows {
            for (column_id, value) in row {
                let (column, option) =
                    header
                        .column(column_id)
                        .ok_or_else(|| ValidationError::UnknownTableColumn {
                            column: column_id.clone(),
                        })?;
                let property_type = column
                    .property_type
                    .as_ref()
                    .ok_or_else(|| ValidationError::missing(fields::PROPERTY_TYPE))?;
                check_value(
                    self.rules,
                    column_id,
                    property_type,
                    option,
                    value,
                    column.is_multiple.unwrap_or(false),
                )?;
            }
        }
        Ok(())
    }
}
