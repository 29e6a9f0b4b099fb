//! Attribute schema data model.
//!
//! This module defines the documents the engine reads and writes: attribute
//! definitions, attribute groups, the hidden objects backing table
//! attributes and the relations linking them, plus the typed decoding of
//! type dependent option payloads.
//!
//! # Key Types
//!
//! - [`AttributeDefinition`] - a typed field on a business object type
//! - [`PropertyType`] - the data type of an attribute
//! - [`AttributeGroup`] - display bucket an attribute belongs to
//! - [`AttributeOption`] - decoded option payload, one variant per type
//!
//! # Examples
//!
//! ```rust
//! use cmdb_attributes::schema::{AttributeDefinition, AttributeOption, PropertyType};
//! use serde_json::json;
//!
//! let attr = AttributeDefinition::new("host", "cpu_num", PropertyType::Int)
//!     .with_option(json!({"min": 0, "max": 1024}));
//! let option = AttributeOption::decode(&PropertyType::Int, attr.option.as_ref()).unwrap();
//! assert!(matches!(option, AttributeOption::Int(_)));
//! ```

pub mod option;
pub mod types;


pub use option::{AttributeOption, EnumChoice, NumericRange, QuoteEntry, TableOption};
pub use types::*;
