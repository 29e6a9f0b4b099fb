//! Table attributes.
//!
//! A table attribute stores rows described by a header of column
//! definitions. Its rows live in a hidden child object created alongside the
//! attribute. Creation runs as an ordered sequence of separate writes:
//!
//! 1. the child object together with the attribute on its owner
//! 2. the child object's default group
//! 3. the audit entry for the child object
//! 4. the quote relation linking the attribute to the child object
//!
//! The relation is written last. A failure after step 1 leaves a child
//! object without a relation, which is reported as
//! [`AttributeError::IncompleteTable`] and can be found and repaired later.

use super::core::AttributeEngine;
use crate::audit::{AuditAction, AuditPayload, AuditRecorder, AuditResource};
use crate::context::RequestContext;
use crate::error::{AttributeError, AttributeResult, TableCreationStep, ValidationError};
use crate::localization::Localizer;
use crate::schema::{
    AttributeDefinition, AttributeGroup, ModelQuoteRelation, PropertyType, QuoteType,
    TableObjectSpec, fields,
};
use crate::storage::{AttributeFilter, GroupOwner, ModelStore, ObjectExistenceOracle, StoreError};
use crate::validation::{TableAttributeValidator, ValidationMode};
use log::{error, info, warn};

impl<S, O, G, A, L> AttributeEngine<S, O, G, A, L>
where
    S: ModelStore,
    O: ObjectExistenceOracle,
    G: GroupOwner,
    A: AuditRecorder,
    L: Localizer,
{
    /// Create a table attribute and the hidden object backing it.
    ///
    /// An attribute with the same object, property id and scope is rejected
    /// as [`AttributeError::Duplicate`] before anything is written.
    pub async fn create_table_attribute(
        &self,
        ctx: &RequestContext,
        mut attribute: AttributeDefinition,
    ) -> AttributeResult<AttributeDefinition> {
        if !attribute.is_type(&PropertyType::Table) {
            return Err(ValidationError::invalid(fields::PROPERTY_TYPE, attribute.type_name()).into());
        }
        Self::prepare_for_create(ctx, &mut attribute);
        self.check_mainline_required(ctx, &attribute).await?;
        self.check_object_exists(ctx, &attribute.object_id).await?;
        self.ensure_attribute_group(ctx, &mut attribute).await?;
        self.validator()
            .validate(ctx, ValidationMode::Create, &mut attribute)
            .await?;
        let header = TableAttributeValidator::new(&self.rules)
            .validate(attribute.option.as_ref())
            .inspect_err(|e| {
                error!(
                    "table option of {} is invalid, err: {}, rid: {}",
                    attribute.property_id,
                    e,
                    ctx.rid()
                )
            })?;

        let existing = AttributeFilter::new()
            .with_object_id(attribute.object_id.clone())
            .with_property_id(attribute.property_id.clone())
            .with_model_biz_scope(attribute.biz_id);
        if self.store.count_attributes(&existing).await? > 0 {
            error!(
                "table attribute {} already exists on {}, rid: {}",
                attribute.property_id,
                attribute.object_id,
                ctx.rid()
            );
            return Err(AttributeError::duplicate(
                attribute.object_id,
                attribute.property_id,
                attribute.biz_id,
            ));
        }

        let spec = TableObjectSpec::for_attribute(
            &attribute.object_id,
            &attribute.property_id,
            &ctx.supplier_account,
        );
        let child_object_id = spec.object_id.clone();
        let child_id = self
            .store
            .create_table_object(spec, attribute.clone())
            .await
            .inspect_err(|e| {
                error!(
                    "create table object {} failed, err: {}, rid: {}",
                    child_object_id,
                    e,
                    ctx.rid()
                )
            })?;

        let incomplete = |step: TableCreationStep, source: AttributeError| {
            warn!(
                "table object {} exists without a quote relation, failed at {}, rid: {}",
                child_object_id,
                step,
                ctx.rid()
            );
            AttributeError::IncompleteTable {
                object_id: attribute.object_id.clone(),
                property_id: attribute.property_id.clone(),
                child_object_id: child_object_id.clone(),
                step,
                source: Box::new(source),
            }
        };

        let created = self
            .reload_table_attribute(&attribute)
            .await
            .map_err(|e| incomplete(TableCreationStep::ChildObject, e))?;

        let group = AttributeGroup::scope_default(&child_object_id, 0, &ctx.supplier_account);
        self.store
            .create_attribute_group(&child_object_id, group)
            .await
            .map_err(|e| incomplete(TableCreationStep::DefaultGroup, e.into()))?;

        self.record_child_object(ctx, child_id)
            .await
            .map_err(|e| incomplete(TableCreationStep::AuditLog, e.into()))?;

        let relation = ModelQuoteRelation {
            dest_object_id: child_object_id.clone(),
            src_object_id: attribute.object_id.clone(),
            property_id: attribute.property_id.clone(),
            quote_type: QuoteType::Table,
            owner_id: ctx.supplier_account.clone(),
        };
        self.store
            .create_quote_relation(relation)
            .await
            .map_err(|e| incomplete(TableCreationStep::QuoteRelation, e.into()))?;

        info!(
            "created table attribute {} on {} with {} column(s), child object {}, rid: {}",
            created.property_id,
            created.object_id,
            header.len(),
            child_object_id,
            ctx.rid()
        );
        Ok(created)
    }

    async fn reload_table_attribute(
        &self,
        attribute: &AttributeDefinition,
    ) -> AttributeResult<AttributeDefinition> {
        let filter = AttributeFilter::new()
            .with_object_id(attribute.object_id.clone())
            .with_property_id(attribute.property_id.clone())
            .with_biz_id(attribute.biz_id);
        self.store
            .read_attributes(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AttributeError::not_found(
                    "attribute",
                    format!("{}.{}", attribute.object_id, attribute.property_id),
                )
            })
    }

    async fn record_child_object(&self, ctx: &RequestContext, child_id: i64) -> Result<(), StoreError> {
        let entry = self
            .audit
            .generate_log(
                ctx,
                AuditAction::Create,
                AuditResource::Model,
                child_id,
                AuditPayload::None,
            )
            .await?;
        self.audit.save_log(ctx, vec![entry]).await
    }
}
