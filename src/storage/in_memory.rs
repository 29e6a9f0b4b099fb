//! In-memory model store.
//!
//! A thread-safe implementation of [`ModelStore`], [`ObjectExistenceOracle`]
//! and [`GroupOwner`] backed by plain collections behind a tokio `RwLock`.
//! It is meant for tests and local development: the topology, the object
//! types and their instances are seeded up front, and any operation can be
//! made to fail on demand to exercise error paths.
//!
//! # Features
//!
//! * Cheap to clone; clones share the same state
//! * Uniqueness of `(object, property id, business)` and of
//!   `(object, property name, business)` reported as repeated items
//! * Fault injection per operation, optionally limited to one object
//! * Statistics on stored records and write calls
//!
//! # Example Usage
//!
//! ```rust
//! use cmdb_attributes::storage::{InMemoryModelStore, ObjectExistenceOracle, StoreError, StoreOperation};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryModelStore::new()
//!     .with_default_topology()
//!     .with_object("switch")
//!     .with_instances("switch", [1, 2, 3]);
//!
//! assert!(store.is_object_exist("switch").await?);
//!
//! store
//!     .fail_on(StoreOperation::CreateAttributes, StoreError::unavailable("maintenance"))
//!     .await;
//! # Ok(())
//! # }
//! ```

use crate::schema::{
    fields, AttributeDefinition, AttributeGroup, MainlineAssociation, ModelQuoteRelation,
    TableObjectSpec, OBJECT_BIZ, OBJECT_HOST, OBJECT_MODULE, OBJECT_PROCESS, OBJECT_SET,
};
use crate::storage::{
    AttributeFilter, CreateManyResult, CreatedItem, GroupFilter, GroupOwner, ItemException,
    ModelStore, ObjectExistenceOracle, RepeatedItem, StoreError, StoreResult,
};
use chrono::Utc;
use log::warn;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Exception code reported for items the store refuses to create.
pub const ITEM_REJECTED_CODE: i64 = 1_199_006;

/// Operations whose failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    CountAttributes,
    ReadAttributes,
    CreateAttributes,
    UpdateAttributes,
    DeleteAttributes,
    CountGroups,
    ReadGroups,
    CreateGroup,
    CreateTableObject,
    CreateQuoteRelation,
    CountInstances,
    ReadMainline,
    ObjectExists,
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: i64,
    // object id -> numeric id
    objects: BTreeMap<String, i64>,
    instances: HashMap<String, BTreeSet<i64>>,
    attributes: BTreeMap<i64, AttributeDefinition>,
    groups: Vec<AttributeGroup>,
    relations: Vec<ModelQuoteRelation>,
    table_objects: Vec<TableObjectSpec>,
    mainline: Vec<MainlineAssociation>,
    faults: HashMap<(StoreOperation, Option<String>), StoreError>,
    write_calls: usize,
}

impl StoreState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_object(&mut self, object_id: &str) -> i64 {
        if let Some(id) = self.objects.get(object_id) {
            return *id;
        }
        let id = self.allocate_id();
        self.objects.insert(object_id.to_string(), id);
        id
    }

    // An object scoped fault wins over an operation wide one.
    fn check_fault(&self, operation: StoreOperation, object_id: Option<&str>) -> StoreResult<()> {
        if let Some(object_id) = object_id {
            if let Some(error) = self.faults.get(&(operation, Some(object_id.to_string()))) {
                return Err(error.clone());
            }
        }
        match self.faults.get(&(operation, None)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn find_conflict(&self, candidate: &AttributeDefinition, skip_id: Option<i64>) -> Option<String> {
        self.attributes
            .values()
            .filter(|existing| Some(existing.id) != skip_id)
            .filter(|existing| {
                existing.object_id == candidate.object_id && existing.biz_id == candidate.biz_id
            })
            .find_map(|existing| {
                if existing.property_id == candidate.property_id {
                    Some(candidate.property_id.clone())
                } else if !candidate.property_name.is_empty()
                    && existing.property_name == candidate.property_name
                {
                    Some(candidate.property_name.clone())
                } else {
                    None
                }
            })
    }

    fn insert_group(&mut self, object_id: &str, mut group: AttributeGroup) -> StoreResult<AttributeGroup> {
        group.object_id = object_id.to_string();
        let exists = self.groups.iter().any(|existing| {
            existing.object_id == group.object_id
                && existing.biz_id == group.biz_id
                && existing.group_id == group.group_id
        });
        if exists {
            return Err(StoreError::already_exists(
                object_id,
                group.group_id.clone(),
                group.biz_id,
            ));
        }
        group.id = self.allocate_id();
        self.groups.push(group.clone());
        Ok(group)
    }
}

/// Thread-safe in-memory model store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModelStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryModelStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding only happens before the store is shared, so the lock is free.
    //
    // Panics when the store is locked: a seed call racing live operations
    // is a misuse of the fixture API.
    fn seed(self, apply: impl FnOnce(&mut StoreState)) -> Self {
        {
            let mut state = self
                .state
                .try_write()
                .expect("in-memory store seeded while locked");
            apply(&mut state);
        }
        self
    }

    /// Seed the built-in topology `biz -> set -> module -> host` and `process`.
    pub fn with_default_topology(self) -> Self {
        self.seed(|state| {
            for object_id in [OBJECT_BIZ, OBJECT_SET, OBJECT_MODULE, OBJECT_HOST, OBJECT_PROCESS] {
                state.add_object(object_id);
            }
            state.mainline.extend([
                MainlineAssociation::new(OBJECT_SET, OBJECT_BIZ),
                MainlineAssociation::new(OBJECT_MODULE, OBJECT_SET),
                MainlineAssociation::new(OBJECT_HOST, OBJECT_MODULE),
            ]);
        })
    }

    /// Seed an object type.
    pub fn with_object(self, object_id: impl Into<String>) -> Self {
        let object_id = object_id.into();
        self.seed(move |state| {
            state.add_object(&object_id);
        })
    }

    /// Seed instance ids of an object type.
    pub fn with_instances(
        self,
        object_id: impl Into<String>,
        instance_ids: impl IntoIterator<Item = i64>,
    ) -> Self {
        let object_id = object_id.into();
        let instance_ids: Vec<i64> = instance_ids.into_iter().collect();
        self.seed(move |state| {
            state
                .instances
                .entry(object_id)
                .or_default()
                .extend(instance_ids);
        })
    }

    /// Insert a custom level between `parent` and its current child.
    ///
    /// The level becomes an object type and takes over the child edge of
    /// `parent`, so `biz -> set` turns into `biz -> level -> set`.
    pub fn with_custom_level(self, level: impl Into<String>, parent: impl Into<String>) -> Self {
        let level = level.into();
        let parent = parent.into();
        self.seed(move |state| {
            state.add_object(&level);
            for association in state.mainline.iter_mut() {
                if association.asst_object_id == parent {
                    association.asst_object_id = level.clone();
                }
            }
            state
                .mainline
                .push(MainlineAssociation::new(level.clone(), parent.clone()));
        })
    }

    /// Seed an attribute as if it had been created earlier.
    pub fn with_attribute(self, attribute: AttributeDefinition) -> Self {
        self.seed(move |state| {
            let mut attribute = attribute;
            attribute.id = state.allocate_id();
            state.attributes.insert(attribute.id, attribute);
        })
    }

    /// Seed an attribute group.
    pub fn with_group(self, group: AttributeGroup) -> Self {
        self.seed(move |state| {
            let object_id = group.object_id.clone();
            if let Err(e) = state.insert_group(&object_id, group) {
                warn!("seed group ignored: {}", e);
            }
        })
    }

    /// Make every call of `operation` fail with `error`.
    pub async fn fail_on(&self, operation: StoreOperation, error: StoreError) {
        let mut state = self.state.write().await;
        state.faults.insert((operation, None), error);
    }

    /// Make calls of `operation` concerning `object_id` fail with `error`.
    pub async fn fail_on_object(
        &self,
        operation: StoreOperation,
        object_id: impl Into<String>,
        error: StoreError,
    ) {
        let mut state = self.state.write().await;
        state
            .faults
            .insert((operation, Some(object_id.into())), error);
    }

    /// Remove every injected fault.
    pub async fn clear_faults(&self) {
        let mut state = self.state.write().await;
        state.faults.clear();
    }

    /// Register an object type after construction.
    pub async fn add_object(&self, object_id: &str) -> i64 {
        let mut state = self.state.write().await;
        state.add_object(object_id)
    }

    /// All stored attributes, ordered by id.
    pub async fn attributes(&self) -> Vec<AttributeDefinition> {
        let state = self.state.read().await;
        state.attributes.values().cloned().collect()
    }

    pub async fn groups(&self) -> Vec<AttributeGroup> {
        let state = self.state.read().await;
        state.groups.clone()
    }

    pub async fn relations(&self) -> Vec<ModelQuoteRelation> {
        let state = self.state.read().await;
        state.relations.clone()
    }

    pub async fn table_objects(&self) -> Vec<TableObjectSpec> {
        let state = self.state.read().await;
        state.table_objects.clone()
    }

    /// Get store statistics for debugging and assertions.
    pub async fn stats(&self) -> InMemoryStoreStats {
        let state = self.state.read().await;
        InMemoryStoreStats {
            object_count: state.objects.len(),
            attribute_count: state.attributes.len(),
            group_count: state.groups.len(),
            relation_count: state.relations.len(),
            table_object_count: state.table_objects.len(),
            write_calls: state.write_calls,
        }
    }
}

impl ModelStore for InMemoryModelStore {
    async fn count_attributes(&self, filter: &AttributeFilter) -> StoreResult<usize> {
        let state = self.state.read().await;
        state.check_fault(StoreOperation::CountAttributes, None)?;
        Ok(state
            .attributes
            .values()
            .filter(|attribute| filter.matches(attribute))
            .count())
    }

    async fn read_attributes(&self, filter: &AttributeFilter) -> StoreResult<Vec<AttributeDefinition>> {
        let state = self.state.read().await;
        state.check_fault(StoreOperation::ReadAttributes, None)?;
        Ok(state
            .attributes
            .values()
            .filter(|attribute| filter.matches(attribute))
            .cloned()
            .collect())
    }

    async fn create_attributes(
        &self,
        object_id: &str,
        attributes: Vec<AttributeDefinition>,
    ) -> StoreResult<CreateManyResult> {
        let mut state = self.state.write().await;
        state.write_calls += 1;
        state.check_fault(StoreOperation::CreateAttributes, Some(object_id))?;

        let mut result = CreateManyResult::default();
        for (index, mut attribute) in attributes.into_iter().enumerate() {
            attribute.object_id = object_id.to_string();
            if attribute.property_id.is_empty() {
                result.exceptions.push(ItemException {
                    index,
                    code: ITEM_REJECTED_CODE,
                    message: format!("{} must be set", fields::PROPERTY_ID),
                });
                continue;
            }
            if state.find_conflict(&attribute, None).is_some() {
                result.repeated.push(RepeatedItem {
                    index,
                    property_id: attribute.property_id,
                });
                continue;
            }

            let now = Utc::now();
            attribute.id = state.allocate_id();
            attribute.create_time = Some(now);
            attribute.last_time = Some(now);
            result.created.push(CreatedItem {
                index,
                id: attribute.id,
            });
            state.attributes.insert(attribute.id, attribute);
        }
        Ok(result)
    }

    async fn update_attributes(
        &self,
        filter: &AttributeFilter,
        fields: Map<String, Value>,
    ) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        state.write_calls += 1;
        let object_id = filter
            .object_ids
            .as_ref()
            .and_then(|ids| ids.first())
            .map(String::as_str);
        state.check_fault(StoreOperation::UpdateAttributes, object_id)?;

        let targets: Vec<i64> = state
            .attributes
            .values()
            .filter(|attribute| filter.matches(attribute))
            .map(|attribute| attribute.id)
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for id in &targets {
            let Some(current) = state.attributes.get(id) else {
                continue;
            };
            let mut document = match serde_json::to_value(current)? {
                Value::Object(map) => map,
                _ => return Err(StoreError::internal("attribute did not encode as an object")),
            };
            for (key, value) in &fields {
                document.insert(key.clone(), value.clone());
            }
            let mut next: AttributeDefinition = serde_json::from_value(Value::Object(document))?;
            next.last_time = Some(Utc::now());
            if let Some(key) = state.find_conflict(&next, Some(*id)) {
                return Err(StoreError::already_exists(next.object_id, key, next.biz_id));
            }
            updated.push(next);
        }

        let count = updated.len();
        for attribute in updated {
            state.attributes.insert(attribute.id, attribute);
        }
        Ok(count)
    }

    async fn delete_attributes(&self, object_id: &str, filter: &AttributeFilter) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        state.write_calls += 1;
        state.check_fault(StoreOperation::DeleteAttributes, Some(object_id))?;

        let before = state.attributes.len();
        state
            .attributes
            .retain(|_, attribute| attribute.object_id != object_id || !filter.matches(attribute));
        Ok(before - state.attributes.len())
    }

    async fn count_attribute_groups(&self, filter: &GroupFilter) -> StoreResult<usize> {
        let state = self.state.read().await;
        state.check_fault(StoreOperation::CountGroups, filter.object_id.as_deref())?;
        Ok(state.groups.iter().filter(|group| filter.matches(group)).count())
    }

    async fn read_attribute_groups(&self, filter: &GroupFilter) -> StoreResult<Vec<AttributeGroup>> {
        let state = self.state.read().await;
        state.check_fault(StoreOperation::ReadGroups, filter.object_id.as_deref())?;
        Ok(state
            .groups
            .iter()
            .filter(|group| filter.matches(group))
            .cloned()
            .collect())
    }

    async fn create_attribute_group(
        &self,
        object_id: &str,
        group: AttributeGroup,
    ) -> StoreResult<AttributeGroup> {
        let mut state = self.state.write().await;
        state.write_calls += 1;
        state.check_fault(StoreOperation::CreateGroup, Some(object_id))?;
        state.insert_group(object_id, group)
    }

    async fn create_table_object(
        &self,
        spec: TableObjectSpec,
        attribute: AttributeDefinition,
    ) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        state.write_calls += 1;
        state.check_fault(StoreOperation::CreateTableObject, Some(attribute.object_id.as_str()))?;

        if state.objects.contains_key(&spec.object_id) {
            return Err(StoreError::already_exists(
                spec.object_id.clone(),
                spec.object_id,
                0,
            ));
        }
        if let Some(key) = state.find_conflict(&attribute, None) {
            return Err(StoreError::already_exists(
                attribute.object_id,
                key,
                attribute.biz_id,
            ));
        }

        let child_id = state.add_object(&spec.object_id);
        let now = Utc::now();
        let mut attribute = attribute;
        attribute.id = state.allocate_id();
        attribute.create_time = Some(now);
        attribute.last_time = Some(now);
        state.attributes.insert(attribute.id, attribute);
        state.table_objects.push(spec);
        Ok(child_id)
    }

    async fn create_quote_relation(&self, relation: ModelQuoteRelation) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.write_calls += 1;
        state.check_fault(StoreOperation::CreateQuoteRelation, Some(relation.src_object_id.as_str()))?;

        let exists = state.relations.iter().any(|existing| {
            existing.src_object_id == relation.src_object_id
                && existing.property_id == relation.property_id
        });
        if exists {
            return Err(StoreError::already_exists(
                relation.src_object_id,
                relation.property_id,
                0,
            ));
        }
        state.relations.push(relation);
        Ok(())
    }

    async fn count_instances(&self, object_id: &str, instance_ids: &[i64]) -> StoreResult<usize> {
        let state = self.state.read().await;
        state.check_fault(StoreOperation::CountInstances, Some(object_id))?;
        Ok(state
            .instances
            .get(object_id)
            .map(|known| instance_ids.iter().filter(|id| known.contains(id)).count())
            .unwrap_or(0))
    }

    async fn read_mainline_associations(&self) -> StoreResult<Vec<MainlineAssociation>> {
        let state = self.state.read().await;
        state.check_fault(StoreOperation::ReadMainline, None)?;
        Ok(state.mainline.clone())
    }
}

impl ObjectExistenceOracle for InMemoryModelStore {
    async fn is_object_exist(&self, object_id: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        state.check_fault(StoreOperation::ObjectExists, Some(object_id))?;
        Ok(state.objects.contains_key(object_id))
    }
}

impl GroupOwner for InMemoryModelStore {
    async fn create_group(&self, group: AttributeGroup) -> StoreResult<AttributeGroup> {
        let mut state = self.state.write().await;
        state.write_calls += 1;
        state.check_fault(StoreOperation::CreateGroup, Some(group.object_id.as_str()))?;
        let object_id = group.object_id.clone();
        state.insert_group(&object_id, group)
    }
}

/// Statistics about in-memory store contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStoreStats {
    pub object_count: usize,
    pub attribute_count: usize,
    pub group_count: usize,
    pub relation_count: usize,
    pub table_object_count: usize,
    /// Number of write operations attempted, failed ones included
    pub write_calls: usize,
}
