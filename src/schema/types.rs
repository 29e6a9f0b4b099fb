//! Core schema type definitions for CMDB object attributes.
//!
//! These structures mirror the stored documents field for field so they can
//! be decoded from partial update payloads and written back unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Reserved property linking a custom topology instance to its parent.
pub const PARENT_LINK_PROPERTY_ID: &str = "bk_parent_id";
/// Group every global attribute falls back to.
pub const DEFAULT_GROUP_ID: &str = "default";
/// Group every business scoped attribute falls back to.
pub const BIZ_DEFAULT_GROUP_ID: &str = "bizdefault";
/// Classification of the hidden objects backing table attributes.
pub const TABLE_CLASSIFICATION_ID: &str = "bk_table_classification";
/// Icon of the hidden objects backing table attributes.
pub const TABLE_OBJECT_ICON: &str = "icon-cc-table";
/// Creator recorded on records the engine writes on its own behalf.
pub const SYSTEM_CREATOR: &str = "cc_system";

pub const OBJECT_BIZ: &str = "biz";
pub const OBJECT_SET: &str = "set";
pub const OBJECT_MODULE: &str = "module";
pub const OBJECT_HOST: &str = "host";
pub const OBJECT_PROCESS: &str = "process";

/// Stored document field names, used when building partial updates.
pub mod fields {
    pub const ID: &str = "id";
    pub const OBJECT_ID: &str = "bk_obj_id";
    pub const PROPERTY_ID: &str = "bk_property_id";
    pub const PROPERTY_NAME: &str = "bk_property_name";
    pub const PROPERTY_TYPE: &str = "bk_property_type";
    pub const PROPERTY_GROUP: &str = "bk_property_group";
    pub const IS_MULTIPLE: &str = "ismultiple";
    pub const OPTION: &str = "option";
    pub const PLACEHOLDER: &str = "placeholder";
    pub const BIZ_ID: &str = "bk_biz_id";
}

/// Data type of an attribute.
///
/// Unknown type names are preserved in [`PropertyType::Other`] so they can be
/// reported back to the caller instead of failing the whole decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    SingleChar,
    LongChar,
    Int,
    Float,
    Enum,
    EnumMulti,
    EnumQuote,
    Date,
    Time,
    TimeZone,
    Bool,
    User,
    Organization,
    List,
    Table,
    Other(String),
}

impl PropertyType {
    pub fn parse(value: &str) -> Self {
        match value {
            "singlechar" => Self::SingleChar,
            "longchar" => Self::LongChar,
            "int" => Self::Int,
            "float" => Self::Float,
            "enum" => Self::Enum,
            "enummulti" => Self::EnumMulti,
            "enumquote" => Self::EnumQuote,
            "date" => Self::Date,
            "time" => Self::Time,
            "timezone" => Self::TimeZone,
            "bool" => Self::Bool,
            "objuser" => Self::User,
            "organization" => Self::Organization,
            "list" => Self::List,
            "innertable" => Self::Table,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SingleChar => "singlechar",
            Self::LongChar => "longchar",
            Self::Int => "int",
            Self::Float => "float",
            Self::Enum => "enum",
            Self::EnumMulti => "enummulti",
            Self::EnumQuote => "enumquote",
            Self::Date => "date",
            Self::Time => "time",
            Self::TimeZone => "timezone",
            Self::Bool => "bool",
            Self::User => "objuser",
            Self::Organization => "organization",
            Self::List => "list",
            Self::Table => "innertable",
            Self::Other(other) => other,
        }
    }

    /// Whether the attribute may be declared multiple valued.
    ///
    /// `Some(true)` means both multiplicities are accepted, `Some(false)` means
    /// only single valued, `None` means the type is unknown.
    pub fn multiplicity(&self) -> Option<bool> {
        match self {
            Self::EnumMulti | Self::EnumQuote | Self::User | Self::Organization => Some(true),
            Self::Other(_) => None,
            _ => Some(false),
        }
    }

    /// Types whose option grammar is checked when the attribute is created.
    pub fn has_creation_grammar(&self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Enum
                | Self::List
                | Self::EnumMulti
                | Self::SingleChar
                | Self::LongChar
        )
    }

    /// Types allowed as table header columns.
    pub fn is_table_column_type(&self) -> bool {
        matches!(
            self,
            Self::SingleChar | Self::LongChar | Self::Int | Self::Float | Self::EnumMulti | Self::Bool
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PropertyType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

// An empty type string means "not supplied", the same as an absent field.
fn deserialize_property_type<'de, D>(deserializer: D) -> Result<Option<PropertyType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| !v.is_empty())
        .map(|v| PropertyType::parse(&v)))
}

/// Definition of a field on a business object type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeDefinition {
    /// Store assigned identifier
    pub id: i64,
    /// Owning object type
    #[serde(rename = "bk_obj_id")]
    pub object_id: String,
    /// Stable identifier, immutable after creation
    #[serde(rename = "bk_property_id")]
    pub property_id: String,
    /// Display label
    #[serde(rename = "bk_property_name")]
    pub property_name: String,
    #[serde(
        rename = "bk_property_type",
        deserialize_with = "deserialize_property_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub property_type: Option<PropertyType>,
    /// Type dependent grammar payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(rename = "ismultiple", skip_serializing_if = "Option::is_none")]
    pub is_multiple: Option<bool>,
    #[serde(rename = "isrequired")]
    pub is_required: bool,
    /// Unique; implies required
    #[serde(rename = "isonly")]
    pub is_only: bool,
    #[serde(rename = "editable", skip_serializing_if = "Option::is_none")]
    pub is_editable: Option<bool>,
    #[serde(rename = "isreadonly")]
    pub is_readonly: bool,
    #[serde(rename = "issystem")]
    pub is_system: bool,
    #[serde(rename = "isapi")]
    pub is_api: bool,
    #[serde(rename = "bk_property_group")]
    pub property_group: String,
    /// Display name of the group, only used on import and read projections
    #[serde(rename = "bk_property_group_name", skip_serializing_if = "String::is_empty")]
    pub property_group_name: String,
    #[serde(rename = "bk_property_index")]
    pub property_index: i64,
    pub unit: String,
    pub placeholder: String,
    /// 0 for global definitions, otherwise the business the definition is scoped to
    #[serde(rename = "bk_biz_id")]
    pub biz_id: i64,
    #[serde(rename = "bk_supplier_account")]
    pub owner_id: String,
    pub creator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_time: Option<DateTime<Utc>>,
}

impl AttributeDefinition {
    /// Create a definition with the identifying fields set.
    pub fn new(
        object_id: impl Into<String>,
        property_id: impl Into<String>,
        property_type: PropertyType,
    ) -> Self {
        let property_id = property_id.into();
        Self {
            object_id: object_id.into(),
            property_name: property_id.clone(),
            property_id,
            property_type: Some(property_type),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.property_name = name.into();
        self
    }

    pub fn with_option(mut self, option: serde_json::Value) -> Self {
        self.option = Some(option);
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_multiple(mut self, is_multiple: bool) -> Self {
        self.is_multiple = Some(is_multiple);
        self
    }

    pub fn with_required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.property_group = group.into();
        self
    }

    pub fn with_biz(mut self, biz_id: i64) -> Self {
        self.biz_id = biz_id;
        self
    }

    /// Whether the definition carries the given type.
    pub fn is_type(&self, property_type: &PropertyType) -> bool {
        self.property_type.as_ref() == Some(property_type)
    }

    /// Type name for messages, empty when absent.
    pub fn type_name(&self) -> &str {
        self.property_type
            .as_ref()
            .map(PropertyType::as_str)
            .unwrap_or("")
    }
}

/// A named display bucket of attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeGroup {
    pub id: i64,
    #[serde(rename = "bk_group_id")]
    pub group_id: String,
    #[serde(rename = "bk_group_name")]
    pub group_name: String,
    #[serde(rename = "bk_group_index")]
    pub group_index: i64,
    #[serde(rename = "bk_obj_id")]
    pub object_id: String,
    #[serde(rename = "bk_biz_id")]
    pub biz_id: i64,
    #[serde(rename = "bk_supplier_account")]
    pub owner_id: String,
    #[serde(rename = "bk_isdefault")]
    pub is_default: bool,
    pub is_collapse: bool,
}

impl AttributeGroup {
    /// The default group of an object within a business scope.
    pub fn scope_default(object_id: impl Into<String>, biz_id: i64, owner_id: impl Into<String>) -> Self {
        let (group_id, group_name) = if biz_id == 0 {
            (DEFAULT_GROUP_ID, "Default")
        } else {
            (BIZ_DEFAULT_GROUP_ID, BIZ_DEFAULT_GROUP_ID)
        };
        Self {
            group_id: group_id.to_string(),
            group_name: group_name.to_string(),
            group_index: -1,
            object_id: object_id.into(),
            biz_id,
            owner_id: owner_id.into(),
            is_default: true,
            ..Default::default()
        }
    }

    /// A named, non-default group with a fresh identifier.
    pub fn named(
        object_id: impl Into<String>,
        group_name: impl Into<String>,
        biz_id: i64,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: new_group_id(),
            group_name: group_name.into(),
            object_id: object_id.into(),
            biz_id,
            owner_id: owner_id.into(),
            ..Default::default()
        }
    }
}

/// Generate an identifier for a non-default group.
pub fn new_group_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Kind of relation between an attribute and the object backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteType {
    #[serde(rename = "innertable")]
    Table,
}

/// Links a table attribute to the hidden object storing its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelQuoteRelation {
    #[serde(rename = "dest_model")]
    pub dest_object_id: String,
    #[serde(rename = "src_model")]
    pub src_object_id: String,
    #[serde(rename = "bk_property_id")]
    pub property_id: String,
    #[serde(rename = "type")]
    pub quote_type: QuoteType,
    #[serde(rename = "bk_supplier_account")]
    pub owner_id: String,
}

/// Identifier of the hidden object backing `object_id.property_id`.
pub fn table_child_object_id(object_id: &str, property_id: &str) -> String {
    format!("bk_{}_{}", object_id, property_id)
}

/// Display name of the hidden object backing `object_id.property_id`.
pub fn table_child_object_name(object_id: &str, property_id: &str) -> String {
    format!("{}_{}", object_id, property_id)
}

/// Specification of the hidden object created for a table attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableObjectSpec {
    #[serde(rename = "bk_obj_id")]
    pub object_id: String,
    #[serde(rename = "bk_obj_name")]
    pub object_name: String,
    #[serde(rename = "bk_classification_id")]
    pub classification_id: String,
    #[serde(rename = "bk_obj_icon")]
    pub icon: String,
    #[serde(rename = "bk_ishidden")]
    pub is_hidden: bool,
    pub creator: String,
    pub modifier: String,
    #[serde(rename = "bk_supplier_account")]
    pub owner_id: String,
    pub create_time: DateTime<Utc>,
    pub last_time: DateTime<Utc>,
}

impl TableObjectSpec {
    /// The hidden object for a table attribute on `owner_object_id`.
    pub fn for_attribute(owner_object_id: &str, property_id: &str, owner_id: &str) -> Self {
        let now = Utc::now();
        Self {
            object_id: table_child_object_id(owner_object_id, property_id),
            object_name: table_child_object_name(owner_object_id, property_id),
            classification_id: TABLE_CLASSIFICATION_ID.to_string(),
            icon: TABLE_OBJECT_ICON.to_string(),
            is_hidden: true,
            creator: SYSTEM_CREATOR.to_string(),
            modifier: SYSTEM_CREATOR.to_string(),
            owner_id: owner_id.to_string(),
            create_time: now,
            last_time: now,
        }
    }
}

/// A mainline edge: `object_id` is the child of `asst_object_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainlineAssociation {
    #[serde(rename = "bk_obj_id")]
    pub object_id: String,
    #[serde(rename = "bk_asst_obj_id")]
    pub asst_object_id: String,
}

impl MainlineAssociation {
    pub fn new(object_id: impl Into<String>, asst_object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            asst_object_id: asst_object_id.into(),
        }
    }
}
