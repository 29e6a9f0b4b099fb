//! Core engine structure and the helpers shared by its operations.

use crate::audit::AuditRecorder;
use crate::config::ValidationRules;
use crate::context::RequestContext;
use crate::error::{AttributeError, AttributeResult, PolicyViolation};
use crate::localization::{Localizer, NoopLocalizer};
use crate::schema::{AttributeDefinition, AttributeGroup, DEFAULT_GROUP_ID};
use crate::storage::{GroupFilter, GroupOwner, ModelStore, ObjectExistenceOracle};
use crate::validation::AttributeValidator;
use log::{error, info};

/// Attribute definition engine.
///
/// Holds immutable references to its collaborators and the compiled
/// validation rules. Every operation takes a [`RequestContext`] and awaits
/// its collaborator calls one after another; the engine keeps no state
/// between calls.
///
/// # Type Parameters
///
/// * `S` - persistence of definitions, groups and topology ([`ModelStore`])
/// * `O` - object existence lookups ([`ObjectExistenceOracle`])
/// * `G` - creation of business scoped groups ([`GroupOwner`])
/// * `A` - audit trail ([`AuditRecorder`])
/// * `L` - field label translation ([`Localizer`])
///
/// # Examples
///
/// ```rust
/// use cmdb_attributes::{AttributeEngine, InMemoryAuditRecorder, InMemoryModelStore};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryModelStore::new().with_default_topology();
/// let engine = AttributeEngine::builder()
///     .store(store.clone())
///     .objects(store.clone())
///     .groups(store)
///     .audit(InMemoryAuditRecorder::new())
///     .build()?;
/// # let _ = engine;
/// # Ok(())
/// # }
/// ```
pub struct AttributeEngine<S, O, G, A, L = NoopLocalizer> {
    pub(super) store: S,
    pub(super) objects: O,
    pub(super) groups: G,
    pub(super) audit: A,
    pub(super) localizer: L,
    pub(super) rules: ValidationRules,
}

impl<S, O, G, A, L> AttributeEngine<S, O, G, A, L>
where
    S: ModelStore,
    O: ObjectExistenceOracle,
    G: GroupOwner,
    A: AuditRecorder,
    L: Localizer,
{
    pub(super) fn from_parts(
        store: S,
        objects: O,
        groups: G,
        audit: A,
        localizer: L,
        rules: ValidationRules,
    ) -> Self {
        Self {
            store,
            objects,
            groups,
            audit,
            localizer,
            rules,
        }
    }

    /// The validation rules the engine was built with.
    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    pub(super) fn validator(&self) -> AttributeValidator<'_, S, O, L> {
        AttributeValidator::new(&self.rules, &self.store, &self.objects, &self.localizer)
    }

    /// Whether `object_id` is the child end of a mainline edge.
    pub(super) async fn is_mainline_object(
        &self,
        ctx: &RequestContext,
        object_id: &str,
    ) -> AttributeResult<bool> {
        let associations = self.store.read_mainline_associations().await?;
        if associations.is_empty() {
            error!("mainline associations are empty, rid: {}", ctx.rid());
            return Err(AttributeError::not_found(
                "mainline association",
                object_id,
            ));
        }
        Ok(associations
            .iter()
            .any(|association| association.object_id == object_id))
    }

    /// Reject required attributes on mainline objects.
    ///
    /// The topology is read on every create, so a store without mainline
    /// associations fails even for optional attributes.
    pub(super) async fn check_mainline_required(
        &self,
        ctx: &RequestContext,
        attribute: &AttributeDefinition,
    ) -> AttributeResult<()> {
        let is_mainline = self.is_mainline_object(ctx, &attribute.object_id).await?;
        if attribute.is_required && is_mainline {
            error!(
                "can not add required attribute to mainline object {}, rid: {}",
                attribute.object_id,
                ctx.rid()
            );
            return Err(PolicyViolation::RequiredOnMainline {
                object_id: attribute.object_id.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub(super) async fn check_object_exists(
        &self,
        ctx: &RequestContext,
        object_id: &str,
    ) -> AttributeResult<()> {
        if !self.objects.is_object_exist(object_id).await? {
            error!("object {} does not exist, rid: {}", object_id, ctx.rid());
            return Err(AttributeError::not_found("object", object_id));
        }
        Ok(())
    }

    /// Make sure the attribute's group exists in its scope.
    ///
    /// A missing group is replaced by the scope's default group, which is
    /// created when absent: the global `default` group through the store,
    /// the `bizdefault` group through the group owner.
    pub(super) async fn ensure_attribute_group(
        &self,
        ctx: &RequestContext,
        attribute: &mut AttributeDefinition,
    ) -> AttributeResult<()> {
        let object_id = attribute.object_id.clone();
        if !attribute.property_group.is_empty() {
            let filter = GroupFilter::for_object(&object_id)
                .with_group_id(attribute.property_group.clone())
                .with_biz_id(attribute.biz_id);
            if self.store.count_attribute_groups(&filter).await? > 0 {
                return Ok(());
            }
        }

        let default_group = self.scope_default_group(ctx, &object_id, attribute.biz_id).await?;
        attribute.property_group = default_group.group_id;
        Ok(())
    }

    /// The default group of `object_id` in the given scope, created when absent.
    pub(super) async fn scope_default_group(
        &self,
        ctx: &RequestContext,
        object_id: &str,
        biz_id: i64,
    ) -> AttributeResult<AttributeGroup> {
        let template = AttributeGroup::scope_default(object_id, biz_id, &ctx.supplier_account);
        let filter = GroupFilter::for_object(object_id)
            .with_group_id(template.group_id.clone())
            .with_biz_id(biz_id);
        if let Some(existing) = self.store.read_attribute_groups(&filter).await?.into_iter().next() {
            return Ok(existing);
        }

        let created = if biz_id == 0 {
            self.store.create_attribute_group(object_id, template).await
        } else {
            self.groups.create_group(template).await
        };
        match created {
            Ok(group) => {
                info!(
                    "created default group {} for object {} in biz {}, rid: {}",
                    group.group_id,
                    object_id,
                    biz_id,
                    ctx.rid()
                );
                Ok(group)
            }
            Err(e) => {
                error!(
                    "create default group for object {} failed, err: {}, rid: {}",
                    object_id,
                    e,
                    ctx.rid()
                );
                Err(e.into())
            }
        }
    }

    /// Apply the defaults every create path shares.
    pub(super) fn prepare_for_create(ctx: &RequestContext, attribute: &mut AttributeDefinition) {
        if attribute.is_only {
            attribute.is_required = true;
        }
        if attribute.property_group.is_empty() {
            attribute.property_group = DEFAULT_GROUP_ID.to_string();
        }
        attribute.owner_id = ctx.supplier_account.clone();
        if attribute.creator.is_empty() {
            attribute.creator = ctx.user.clone();
        }
    }
}
