//! Collaborator interfaces for attribute persistence.
//!
//! The engine never touches a database directly. Everything it reads or
//! writes goes through the traits in this module, which a transport layer
//! implements on top of the real document store:
//!
//! - [`ModelStore`] - attribute definitions, attribute groups, hidden table
//!   objects, quote relations, instance counts and the mainline topology
//! - [`ObjectExistenceOracle`] - whether an object type exists
//! - [`GroupOwner`] - creation of business scoped default groups
//!
//! All methods return futures that the engine awaits one at a time. The
//! store is expected to enforce uniqueness of `(object, property id, business)`
//! itself and report a violation as [`StoreError::AlreadyExists`].
//!
//! # Example Usage
//!
//! ```rust
//! use cmdb_attributes::storage::{AttributeFilter, InMemoryModelStore, ModelStore};
//! use cmdb_attributes::schema::{AttributeDefinition, PropertyType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryModelStore::new().with_object("host");
//!
//! let attr = AttributeDefinition::new("host", "cpu_num", PropertyType::Int);
//! let result = store.create_attributes("host", vec![attr]).await?;
//! assert_eq!(result.created.len(), 1);
//!
//! let filter = AttributeFilter::new().with_object_id("host").with_property_id("cpu_num");
//! assert_eq!(store.count_attributes(&filter).await?, 1);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;


pub use errors::StoreError;
pub use in_memory::{InMemoryModelStore, InMemoryStoreStats, StoreOperation};

use crate::schema::{
    AttributeDefinition, AttributeGroup, MainlineAssociation, ModelQuoteRelation, TableObjectSpec,
};
use serde_json::{Map, Value};
use std::future::Future;

/// Result type returned by every collaborator call.
pub type StoreResult<T> = Result<T, StoreError>;

/// Match condition over attribute definitions.
///
/// Every populated field must match; `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeFilter {
    pub ids: Option<Vec<i64>>,
    pub object_ids: Option<Vec<String>>,
    pub property_ids: Option<Vec<String>>,
    pub property_names: Option<Vec<String>>,
    pub biz_ids: Option<Vec<i64>>,
    pub is_system: Option<bool>,
    pub is_api: Option<bool>,
}

impl AttributeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.ids.get_or_insert_with(Vec::new).push(id);
        self
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.ids.get_or_insert_with(Vec::new).extend(ids);
        self
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_ids
            .get_or_insert_with(Vec::new)
            .push(object_id.into());
        self
    }

    pub fn with_property_id(mut self, property_id: impl Into<String>) -> Self {
        self.property_ids
            .get_or_insert_with(Vec::new)
            .push(property_id.into());
        self
    }

    pub fn with_property_name(mut self, property_name: impl Into<String>) -> Self {
        self.property_names
            .get_or_insert_with(Vec::new)
            .push(property_name.into());
        self
    }

    pub fn with_biz_id(mut self, biz_id: i64) -> Self {
        self.biz_ids = Some(vec![biz_id]);
        self
    }

    /// Restrict to global definitions plus those of `biz_id`.
    ///
    /// A zero business id restricts to global definitions only.
    pub fn with_model_biz_scope(mut self, biz_id: i64) -> Self {
        self.biz_ids = Some(if biz_id == 0 { vec![0] } else { vec![0, biz_id] });
        self
    }

    pub fn with_is_system(mut self, is_system: bool) -> Self {
        self.is_system = Some(is_system);
        self
    }

    pub fn with_is_api(mut self, is_api: bool) -> Self {
        self.is_api = Some(is_api);
        self
    }

    /// Whether `attribute` satisfies every populated condition.
    pub fn matches(&self, attribute: &AttributeDefinition) -> bool {
        fn contains<T: PartialEq>(set: &Option<Vec<T>>, value: &T) -> bool {
            set.as_ref().is_none_or(|values| values.contains(value))
        }

        contains(&self.ids, &attribute.id)
            && contains(&self.object_ids, &attribute.object_id)
            && contains(&self.property_ids, &attribute.property_id)
            && contains(&self.property_names, &attribute.property_name)
            && contains(&self.biz_ids, &attribute.biz_id)
            && self.is_system.is_none_or(|flag| flag == attribute.is_system)
            && self.is_api.is_none_or(|flag| flag == attribute.is_api)
    }
}

/// Match condition over attribute groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupFilter {
    pub object_id: Option<String>,
    pub group_ids: Option<Vec<String>>,
    pub group_names: Option<Vec<String>>,
    pub biz_ids: Option<Vec<i64>>,
}

impl GroupFilter {
    pub fn for_object(object_id: impl Into<String>) -> Self {
        Self {
            object_id: Some(object_id.into()),
            ..Default::default()
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_ids
            .get_or_insert_with(Vec::new)
            .push(group_id.into());
        self
    }

    pub fn with_group_ids(mut self, group_ids: impl IntoIterator<Item = String>) -> Self {
        self.group_ids.get_or_insert_with(Vec::new).extend(group_ids);
        self
    }

    pub fn with_group_names(mut self, group_names: impl IntoIterator<Item = String>) -> Self {
        self.group_names
            .get_or_insert_with(Vec::new)
            .extend(group_names);
        self
    }

    pub fn with_biz_id(mut self, biz_id: i64) -> Self {
        self.biz_ids = Some(vec![biz_id]);
        self
    }

    pub fn matches(&self, group: &AttributeGroup) -> bool {
        self.object_id
            .as_ref()
            .is_none_or(|object_id| *object_id == group.object_id)
            && self
                .group_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&group.group_id))
            && self
                .group_names
                .as_ref()
                .is_none_or(|names| names.contains(&group.group_name))
            && self
                .biz_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&group.biz_id))
    }
}

/// A record the store created, keyed by its position in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedItem {
    pub index: usize,
    pub id: i64,
}

/// A request item rejected because an identical record already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatedItem {
    pub index: usize,
    pub property_id: String,
}

/// A request item the store refused for another reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemException {
    pub index: usize,
    pub code: i64,
    pub message: String,
}

/// Per-item outcome of [`ModelStore::create_attributes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateManyResult {
    pub created: Vec<CreatedItem>,
    pub repeated: Vec<RepeatedItem>,
    pub exceptions: Vec<ItemException>,
}

/// Persistence of attribute definitions and the schema around them.
pub trait ModelStore: Send + Sync {
    /// Count definitions matching `filter`.
    fn count_attributes(
        &self,
        filter: &AttributeFilter,
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    /// Read definitions matching `filter`, ordered by id.
    fn read_attributes(
        &self,
        filter: &AttributeFilter,
    ) -> impl Future<Output = StoreResult<Vec<AttributeDefinition>>> + Send;

    /// Create definitions on `object_id`, reporting the outcome per item.
    fn create_attributes(
        &self,
        object_id: &str,
        attributes: Vec<AttributeDefinition>,
    ) -> impl Future<Output = StoreResult<CreateManyResult>> + Send;

    /// Apply `fields` to every definition matching `filter`.
    fn update_attributes(
        &self,
        filter: &AttributeFilter,
        fields: Map<String, Value>,
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    /// Delete the definitions of `object_id` matching `filter`.
    fn delete_attributes(
        &self,
        object_id: &str,
        filter: &AttributeFilter,
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    fn count_attribute_groups(
        &self,
        filter: &GroupFilter,
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    fn read_attribute_groups(
        &self,
        filter: &GroupFilter,
    ) -> impl Future<Output = StoreResult<Vec<AttributeGroup>>> + Send;

    fn create_attribute_group(
        &self,
        object_id: &str,
        group: AttributeGroup,
    ) -> impl Future<Output = StoreResult<AttributeGroup>> + Send;

    /// Create the hidden object backing a table attribute together with the
    /// attribute itself, returning the numeric id of the new object.
    fn create_table_object(
        &self,
        spec: TableObjectSpec,
        attribute: AttributeDefinition,
    ) -> impl Future<Output = StoreResult<i64>> + Send;

    fn create_quote_relation(
        &self,
        relation: ModelQuoteRelation,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Count the instances of `object_id` whose id is in `instance_ids`.
    fn count_instances(
        &self,
        object_id: &str,
        instance_ids: &[i64],
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    fn read_mainline_associations(
        &self,
    ) -> impl Future<Output = StoreResult<Vec<MainlineAssociation>>> + Send;
}

/// Answers whether an object type exists.
pub trait ObjectExistenceOracle: Send + Sync {
    fn is_object_exist(&self, object_id: &str) -> impl Future<Output = StoreResult<bool>> + Send;
}

/// Creates attribute groups on behalf of the object that owns them.
pub trait GroupOwner: Send + Sync {
    fn create_group(
        &self,
        group: AttributeGroup,
    ) -> impl Future<Output = StoreResult<AttributeGroup>> + Send;
}
