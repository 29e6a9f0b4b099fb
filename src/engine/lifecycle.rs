//! Create, update, delete and read of attribute definitions.

use super::core::AttributeEngine;
use crate::audit::{AuditAction, AuditPayload, AuditRecorder, AuditResource};
use crate::context::RequestContext;
use crate::error::{AttributeError, AttributeResult, ValidationError};
use crate::localization::Localizer;
use crate::schema::{AttributeDefinition, fields};
use crate::storage::{
    AttributeFilter, GroupFilter, GroupOwner, ModelStore, ObjectExistenceOracle, StoreError,
};
use crate::validation::ValidationMode;
use log::{debug, error, info};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Fields an update never writes.
const IMMUTABLE_FIELDS: [&str; 4] = [
    fields::ID,
    fields::OBJECT_ID,
    fields::PROPERTY_ID,
    fields::PROPERTY_TYPE,
];

impl<S, O, G, A, L> AttributeEngine<S, O, G, A, L>
where
    S: ModelStore,
    O: ObjectExistenceOracle,
    G: GroupOwner,
    A: AuditRecorder,
    L: Localizer,
{
    /// Create an attribute definition.
    ///
    /// Returns the definition as the store persisted it, reloaded by its
    /// assigned id. A create audit entry is saved for it.
    ///
    /// # Errors
    ///
    /// * [`AttributeError::Policy`] for a required attribute on a mainline object
    /// * [`AttributeError::ReferenceNotFound`] when the object does not exist
    /// * [`AttributeError::Validation`] when the definition is malformed
    /// * [`AttributeError::Duplicate`] when the store reports the definition as repeated
    /// * [`AttributeError::Store`] for collaborator failures
    pub async fn create_attribute(
        &self,
        ctx: &RequestContext,
        mut attribute: AttributeDefinition,
    ) -> AttributeResult<AttributeDefinition> {
        Self::prepare_for_create(ctx, &mut attribute);
        self.check_mainline_required(ctx, &attribute).await?;
        self.check_object_exists(ctx, &attribute.object_id).await?;
        self.ensure_attribute_group(ctx, &mut attribute).await?;
        self.validator()
            .validate(ctx, ValidationMode::Create, &mut attribute)
            .await?;

        let object_id = attribute.object_id.clone();
        let property_id = attribute.property_id.clone();
        let biz_id = attribute.biz_id;
        let result = self
            .store
            .create_attributes(&object_id, vec![attribute])
            .await
            .inspect_err(|e| {
                error!(
                    "failed to create attribute {} on {}, err: {}, rid: {}",
                    property_id,
                    object_id,
                    e,
                    ctx.rid()
                )
            })?;

        if let Some(exception) = result.exceptions.into_iter().next() {
            error!(
                "store rejected attribute {} on {}, code: {}, message: {}, rid: {}",
                property_id,
                object_id,
                exception.code,
                exception.message,
                ctx.rid()
            );
            return Err(StoreError::rejected(exception.code, exception.message).into());
        }
        if !result.repeated.is_empty() {
            error!(
                "attribute {} on {} is duplicated, rid: {}",
                property_id,
                object_id,
                ctx.rid()
            );
            return Err(AttributeError::duplicate(object_id, property_id, biz_id));
        }
        let [created] = result.created.as_slice() else {
            error!(
                "created {} attributes instead of one for {} on {}, rid: {}",
                result.created.len(),
                property_id,
                object_id,
                ctx.rid()
            );
            return Err(StoreError::internal(format!(
                "expected one created attribute, store reported {}",
                result.created.len()
            ))
            .into());
        };

        let reloaded = self
            .store
            .read_attributes(&AttributeFilter::new().with_id(created.id))
            .await?;
        let attribute = match <[AttributeDefinition; 1]>::try_from(reloaded) {
            Ok([attribute]) => attribute,
            Err(found) => {
                error!(
                    "reading created attribute {} returned {} records, rid: {}",
                    created.id,
                    found.len(),
                    ctx.rid()
                );
                return Err(AttributeError::not_found("attribute", created.id.to_string()));
            }
        };

        let snapshot = serde_json::to_value(&attribute).map_err(StoreError::from)?;
        let entry = self
            .audit
            .generate_log(
                ctx,
                AuditAction::Create,
                AuditResource::ModelAttribute,
                attribute.id,
                AuditPayload::Snapshot(snapshot),
            )
            .await
            .inspect_err(|e| {
                error!(
                    "generate audit log after creating attribute {} failed, err: {}, rid: {}",
                    attribute.id,
                    e,
                    ctx.rid()
                )
            })?;
        self.audit.save_log(ctx, vec![entry]).await.inspect_err(|e| {
            error!(
                "save audit log after creating attribute {} failed, err: {}, rid: {}",
                attribute.id,
                e,
                ctx.rid()
            )
        })?;

        info!(
            "created attribute {} ({}) on {}, rid: {}",
            attribute.property_id,
            attribute.id,
            attribute.object_id,
            ctx.rid()
        );
        Ok(attribute)
    }

    /// Apply a partial update to the attribute `attribute_id` within `biz_id`'s scope.
    ///
    /// `changes` uses the stored field names. Identity fields and the type
    /// are never written. The audit entry records the fields written and is
    /// generated before the write, then saved after it.
    pub async fn update_attribute(
        &self,
        ctx: &RequestContext,
        changes: Map<String, Value>,
        attribute_id: i64,
        biz_id: i64,
    ) -> AttributeResult<()> {
        let mut partial: AttributeDefinition =
            serde_json::from_value(Value::Object(changes.clone())).map_err(|e| {
                error!(
                    "decode update of attribute {} failed, err: {}, rid: {}",
                    attribute_id,
                    e,
                    ctx.rid()
                );
                ValidationError::Decode {
                    field: "attribute".to_string(),
                    message: e.to_string(),
                }
            })?;
        self.validator()
            .validate(ctx, ValidationMode::Update, &mut partial)
            .await?;

        let mut written = changes;
        for field in IMMUTABLE_FIELDS {
            written.remove(field);
        }

        let entry = self
            .audit
            .generate_log(
                ctx,
                AuditAction::Update,
                AuditResource::ModelAttribute,
                attribute_id,
                AuditPayload::UpdatedFields(written.clone()),
            )
            .await
            .inspect_err(|e| {
                error!(
                    "generate audit log before updating attribute {} failed, err: {}, rid: {}",
                    attribute_id,
                    e,
                    ctx.rid()
                )
            })?;

        let filter = AttributeFilter::new()
            .with_id(attribute_id)
            .with_model_biz_scope(biz_id);
        let updated = self
            .store
            .update_attributes(&filter, written)
            .await
            .inspect_err(|e| {
                error!(
                    "failed to update attribute {}, err: {}, rid: {}",
                    attribute_id,
                    e,
                    ctx.rid()
                )
            })?;
        debug!(
            "update of attribute {} matched {} record(s), rid: {}",
            attribute_id,
            updated,
            ctx.rid()
        );

        self.audit.save_log(ctx, vec![entry]).await.inspect_err(|e| {
            error!(
                "attribute {} updated but saving audit log failed, err: {}, rid: {}",
                attribute_id,
                e,
                ctx.rid()
            )
        })?;
        info!("updated attribute {}, rid: {}", attribute_id, ctx.rid());
        Ok(())
    }

    /// Delete every definition matching `condition` within `biz_id`'s scope.
    ///
    /// Matching nothing succeeds without audit. Otherwise one audit entry is
    /// generated per definition, the definitions are deleted one owning
    /// object at a time, and the audit entries are saved together only once
    /// every delete has succeeded.
    pub async fn delete_attribute(
        &self,
        ctx: &RequestContext,
        condition: AttributeFilter,
        biz_id: i64,
    ) -> AttributeResult<()> {
        let filter = condition.with_model_biz_scope(biz_id);
        let matched = self.store.read_attributes(&filter).await.inspect_err(|e| {
            error!(
                "failed to find attributes to delete, err: {}, rid: {}",
                e,
                ctx.rid()
            )
        })?;
        if matched.is_empty() {
            debug!("no attribute matched the delete condition, rid: {}", ctx.rid());
            return Ok(());
        }

        let mut entries = Vec::with_capacity(matched.len());
        let mut ids_by_object: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        for attribute in &matched {
            let snapshot = serde_json::to_value(attribute).map_err(StoreError::from)?;
            let entry = self
                .audit
                .generate_log(
                    ctx,
                    AuditAction::Delete,
                    AuditResource::ModelAttribute,
                    attribute.id,
                    AuditPayload::Snapshot(snapshot),
                )
                .await
                .inspect_err(|e| {
                    error!(
                        "generate audit log for attribute {} failed, err: {}, rid: {}",
                        attribute.property_name,
                        e,
                        ctx.rid()
                    )
                })?;
            entries.push(entry);
            ids_by_object
                .entry(attribute.object_id.clone())
                .or_default()
                .push(attribute.id);
        }

        for (object_id, ids) in ids_by_object {
            let filter = AttributeFilter::new().with_ids(ids);
            self.store
                .delete_attributes(&object_id, &filter)
                .await
                .inspect_err(|e| {
                    error!(
                        "delete attributes of {} failed, err: {}, rid: {}",
                        object_id,
                        e,
                        ctx.rid()
                    )
                })?;
        }

        let deleted = entries.len();
        self.audit.save_log(ctx, entries).await.inspect_err(|e| {
            error!(
                "attributes deleted but saving audit log failed, err: {}, rid: {}",
                e,
                ctx.rid()
            )
        })?;
        info!("deleted {} attribute(s), rid: {}", deleted, ctx.rid());
        Ok(())
    }

    /// Global, user defined attributes of each object, decorated with their
    /// group's display name.
    pub async fn find_attributes_by_objects(
        &self,
        ctx: &RequestContext,
        object_ids: &[String],
    ) -> AttributeResult<BTreeMap<String, Vec<AttributeDefinition>>> {
        let mut result = BTreeMap::new();
        for object_id in object_ids {
            let filter = AttributeFilter::new()
                .with_object_id(object_id.clone())
                .with_is_system(false)
                .with_is_api(false)
                .with_biz_id(0);
            let mut attributes = self.store.read_attributes(&filter).await.inspect_err(|e| {
                error!(
                    "get custom attributes of {} failed, err: {}, rid: {}",
                    object_id,
                    e,
                    ctx.rid()
                )
            })?;
            if attributes.is_empty() {
                result.insert(object_id.clone(), attributes);
                continue;
            }

            let group_ids: Vec<String> = attributes
                .iter()
                .map(|attribute| attribute.property_group.clone())
                .collect();
            let group_filter = GroupFilter::for_object(object_id.clone()).with_group_ids(group_ids);
            let names: HashMap<String, String> = self
                .store
                .read_attribute_groups(&group_filter)
                .await
                .inspect_err(|e| {
                    error!(
                        "find groups of {} failed, err: {}, rid: {}",
                        object_id,
                        e,
                        ctx.rid()
                    )
                })?
                .into_iter()
                .map(|group| (group.group_id, group.group_name))
                .collect();

            for attribute in &mut attributes {
                if let Some(name) = names.get(&attribute.property_group) {
                    attribute.property_group_name = name.clone();
                }
            }
            result.insert(object_id.clone(), attributes);
        }
        Ok(result)
    }
}
