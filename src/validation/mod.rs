//! Attribute definition validation.
//!
//! Validation is layered the way attributes are built:
//!
//! - [`TypeOptionValidator`] checks an option payload against its type grammar
//! - [`TableAttributeValidator`] checks a table header and its default rows
//! - [`CrossReferenceGuard`] checks enum-quote references against the topology
//! - [`AttributeValidator`] runs the per-attribute rules and calls the others
//!
//! Only the cross reference guard talks to collaborators; everything else is
//! pure and synchronous.

pub mod attribute;
mod default_value;
pub mod quote;
pub mod table;
pub mod type_option;


pub use attribute::AttributeValidator;
pub use quote::{CrossReferenceGuard, QuoteReference, custom_levels};
pub use table::{TableAttributeValidator, TableHeader};
pub use type_option::TypeOptionValidator;

use crate::config::ValidationRules;
use crate::error::{ValidationError, ValidationResult};
use crate::schema::fields;

/// Whether a definition is being created or partially updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    /// Only the fields present in the update are checked
    Update,
}

/// Check a property id's length and charset. `label` names the field in the length error.
pub(crate) fn check_property_id(
    rules: &ValidationRules,
    property_id: &str,
    label: &str,
) -> ValidationResult<()> {
    let max = rules.limits().property_id_max_len;
    if property_id.chars().count() > max {
        return Err(ValidationError::too_long(label, max));
    }
    if !rules.is_valid_property_id(property_id) {
        return Err(ValidationError::invalid(fields::PROPERTY_ID, property_id));
    }
    Ok(())
}

pub(crate) fn check_property_name(
    rules: &ValidationRules,
    property_name: &str,
    label: &str,
) -> ValidationResult<()> {
    let max = rules.limits().property_name_max_len;
    if property_name.chars().count() > max {
        return Err(ValidationError::too_long(label, max));
    }
    Ok(())
}
