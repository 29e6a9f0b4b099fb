//! Typed option payloads.
//!
//! The `option` field of an attribute is stored as loosely typed JSON whose
//! shape depends on the property type. [`AttributeOption::decode`] turns it
//! into one strongly typed variant per type at the validation boundary, so a
//! payload of the wrong shape becomes a [`ValidationError`] instead of
//! travelling further as untyped data.

use super::types::{AttributeDefinition, PropertyType};
use crate::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded option payload, one variant per property type family.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeOption {
    Int(NumericRange<i64>),
    Float(NumericRange<f64>),
    /// Regular expression values must match; `None` accepts anything
    Pattern(Option<String>),
    /// Choices of `enum` and `enummulti`
    Enum(Vec<EnumChoice>),
    List(Vec<String>),
    EnumQuote(Vec<QuoteEntry>),
    Table(TableOption),
    /// Types whose option carries no grammar
    Unconstrained,
}

/// Inclusive range with optional bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> NumericRange<T> {
    pub fn contains(&self, value: T) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    pub fn is_ordered(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

/// One choice of an enumerated attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumChoice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub is_default: bool,
}

/// One referenced instance of an enum-quote attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEntry {
    #[serde(rename = "bk_obj_id")]
    pub object_id: String,
    #[serde(rename = "bk_inst_id")]
    pub instance_id: i64,
}

/// Header and default rows of a table attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOption {
    pub header: Vec<AttributeDefinition>,
    pub default: Vec<Map<String, Value>>,
}

impl AttributeOption {
    /// Decode `option` into the variant matching `property_type`.
    pub fn decode(property_type: &PropertyType, option: Option<&Value>) -> ValidationResult<Self> {
        let option = option.filter(|v| !v.is_null());
        match property_type {
            PropertyType::Int => Ok(Self::Int(decode_range(property_type, option, |v| {
                v.as_i64()
            })?)),
            PropertyType::Float => Ok(Self::Float(decode_range(property_type, option, |v| {
                v.as_f64()
            })?)),
            PropertyType::SingleChar | PropertyType::LongChar => match option {
                None => Ok(Self::Pattern(None)),
                Some(Value::String(s)) if s.is_empty() => Ok(Self::Pattern(None)),
                Some(Value::String(s)) => Ok(Self::Pattern(Some(s.clone()))),
                Some(other) => Err(decode_error(format!(
                    "string pattern expected, got {}",
                    json_kind(other)
                ))),
            },
            PropertyType::Enum | PropertyType::EnumMulti => {
                let option = option.ok_or_else(|| ValidationError::missing("option"))?;
                serde_json::from_value(option.clone())
                    .map(Self::Enum)
                    .map_err(|e| decode_error(e.to_string()))
            }
            PropertyType::List => {
                let option = option.ok_or_else(|| ValidationError::missing("option"))?;
                serde_json::from_value(option.clone())
                    .map(Self::List)
                    .map_err(|e| decode_error(e.to_string()))
            }
            PropertyType::EnumQuote => {
                let option = option.ok_or_else(|| ValidationError::missing("option"))?;
                let items = option
                    .as_array()
                    .ok_or_else(|| ValidationError::invalid("option", option.to_string()))?;
                items
                    .iter()
                    .map(QuoteEntry::decode)
                    .collect::<ValidationResult<Vec<_>>>()
                    .map(Self::EnumQuote)
            }
            PropertyType::Table => {
                let option = option.ok_or_else(|| ValidationError::missing("option"))?;
                serde_json::from_value(option.clone())
                    .map(Self::Table)
                    .map_err(|e| decode_error(e.to_string()))
            }
            _ => Ok(Self::Unconstrained),
        }
    }
}

impl QuoteEntry {
    /// Decode one `{bk_obj_id, bk_inst_id, type}` entry.
    ///
    /// `int` is the only instance id kind; the id may be a JSON integer or a
    /// numeric string and must not be zero.
    pub fn decode(entry: &Value) -> ValidationResult<Self> {
        let map = entry
            .as_object()
            .ok_or_else(|| ValidationError::invalid("option", entry.to_string()))?;

        let object_id = match map.get("bk_obj_id") {
            None => return Err(ValidationError::missing("option bk_obj_id")),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(ValidationError::missing("option bk_obj_id"));
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(ValidationError::invalid("option bk_obj_id", other.to_string()));
            }
        };

        let raw_instance = match map.get("bk_inst_id") {
            None | Some(Value::Null) => return Err(ValidationError::missing("option bk_inst_id")),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(ValidationError::missing("option bk_inst_id"));
            }
            Some(v) => v,
        };

        match map.get("type").and_then(Value::as_str) {
            Some("int") => {}
            other => {
                return Err(ValidationError::invalid(
                    "option type",
                    other.unwrap_or_default(),
                ));
            }
        }

        let instance_id = as_integer(raw_instance)
            .ok_or_else(|| ValidationError::invalid("option bk_inst_id", raw_instance.to_string()))?;
        if instance_id == 0 {
            return Err(ValidationError::invalid("option bk_inst_id", "0"));
        }

        Ok(Self {
            object_id,
            instance_id,
        })
    }
}

fn decode_range<T>(
    property_type: &PropertyType,
    option: Option<&Value>,
    number: impl Fn(&Value) -> Option<T>,
) -> ValidationResult<NumericRange<T>>
where
    T: std::str::FromStr,
{
    let Some(option) = option else {
        return Ok(NumericRange {
            min: None,
            max: None,
        });
    };
    let map = option.as_object().ok_or_else(|| {
        ValidationError::option(property_type, format!("object expected, got {}", json_kind(option)))
    })?;

    let bound = |name: &str| -> ValidationResult<Option<T>> {
        match map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse::<T>().map(Some).map_err(|_| {
                ValidationError::option(property_type, format!("{} '{}' is not a number", name, s))
            }),
            Some(v) => number(v).map(Some).ok_or_else(|| {
                ValidationError::option(property_type, format!("{} '{}' is not a number", name, v))
            }),
        }
    };

    Ok(NumericRange {
        min: bound("min")?,
        max: bound("max")?,
    })
}

/// Read an integer from a JSON number or numeric string.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_error(message: String) -> ValidationError {
    ValidationError::Decode {
        field: "option".to_string(),
        message,
    }
}
