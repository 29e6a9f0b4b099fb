//! Bulk import reconciliation.
//!
//! Every object and every row is reconciled on its own: a failure is
//! recorded against the object or row and processing moves on. The
//! structured report is always produced, and the aggregate status is an
//! error whenever anything in it failed.

use super::core::AttributeEngine;
use crate::audit::AuditRecorder;
use crate::context::RequestContext;
use crate::error::{AttributeError, AttributeResult, ErrorKind, ValidationError};
use crate::localization::Localizer;
use crate::schema::{AttributeDefinition, AttributeGroup, PARENT_LINK_PROPERTY_ID, fields};
use crate::storage::{
    AttributeFilter, GroupFilter, GroupOwner, ModelStore, ObjectExistenceOracle, StoreError,
};
use crate::validation::ValidationMode;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Rows to import for one object, keyed by the caller's row index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportObjectData {
    #[serde(rename = "attr", default)]
    pub attributes: BTreeMap<i64, AttributeDefinition>,
}

impl ImportObjectData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, row: i64, attribute: AttributeDefinition) -> Self {
        self.attributes.insert(row, attribute);
        self
    }
}

/// Outcome of one imported row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowInfo {
    pub row: i64,
    /// Failure message, empty on success
    #[serde(skip_serializing_if = "String::is_empty")]
    pub info: String,
    #[serde(rename = "bk_property_id")]
    pub property_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl RowInfo {
    fn success(row: i64, property_id: String) -> Self {
        Self {
            row,
            info: String::new(),
            property_id,
            kind: None,
        }
    }

    fn failure(row: i64, property_id: String, error: &AttributeError) -> Self {
        Self {
            row,
            info: error.to_string(),
            property_id,
            kind: Some(error.kind()),
        }
    }
}

/// Per-object result of a reconciliation.
///
/// Each processed row lands in exactly one of the four buckets. When the
/// object itself could not be processed, `error` says why and no row is
/// reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectBatchResult {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RowInfo>,
    #[serde(rename = "insert_failed", skip_serializing_if = "Vec::is_empty")]
    pub insert_failed: Vec<RowInfo>,
    #[serde(rename = "update_failed", skip_serializing_if = "Vec::is_empty")]
    pub update_failed: Vec<RowInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub success: Vec<RowInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ObjectBatchResult {
    fn object_error(message: String) -> Self {
        Self {
            error: Some(message),
            ..Default::default()
        }
    }

    pub fn failed_rows(&self) -> usize {
        self.errors.len() + self.insert_failed.len() + self.update_failed.len()
    }

    pub fn has_failures(&self) -> bool {
        self.error.is_some() || self.failed_rows() > 0
    }
}

/// Per-object results keyed by object id.
pub type BatchReport = BTreeMap<String, ObjectBatchResult>;

/// The report of a reconciliation together with its aggregate status.
#[derive(Debug)]
pub struct BatchOutcome {
    pub report: BatchReport,
    /// [`AttributeError::PartialFailure`] when any object or row failed
    pub status: AttributeResult<()>,
}

impl BatchOutcome {
    fn from_report(report: BatchReport) -> Self {
        let failed_objects = report.values().filter(|r| r.error.is_some()).count();
        let failed_rows = report.values().map(ObjectBatchResult::failed_rows).sum();
        let status = if failed_objects > 0 || failed_rows > 0 {
            Err(AttributeError::PartialFailure {
                failed_objects,
                failed_rows,
            })
        } else {
            Ok(())
        };
        Self { report, status }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_ok()
    }

    pub fn into_parts(self) -> (BatchReport, AttributeResult<()>) {
        (self.report, self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowBucket {
    Errors,
    InsertFailed,
    UpdateFailed,
}

enum RowOutcome {
    Skipped,
    Success,
    Failed(RowBucket, AttributeError),
}

impl<S, O, G, A, L> AttributeEngine<S, O, G, A, L>
where
    S: ModelStore,
    O: ObjectExistenceOracle,
    G: GroupOwner,
    A: AuditRecorder,
    L: Localizer,
{
    /// Insert or update imported attribute rows, object by object.
    ///
    /// A row is validated with update semantics, its display group is
    /// resolved by name (creating unseen names), then it is inserted when no
    /// definition with the same property id exists in its scope and updated
    /// otherwise. Rows with the parent-link property id are skipped.
    pub async fn reconcile_batch(
        &self,
        ctx: &RequestContext,
        input: BTreeMap<String, ImportObjectData>,
    ) -> BatchOutcome {
        let mut report = BatchReport::new();
        for (object_id, data) in input {
            let result = self.reconcile_object(ctx, &object_id, data).await;
            info!(
                "reconciled {}: {} succeeded, {} failed, rid: {}",
                object_id,
                result.success.len(),
                result.failed_rows(),
                ctx.rid()
            );
            report.insert(object_id, result);
        }
        BatchOutcome::from_report(report)
    }

    async fn reconcile_object(
        &self,
        ctx: &RequestContext,
        object_id: &str,
        data: ImportObjectData,
    ) -> ObjectBatchResult {
        match self.objects.is_object_exist(object_id).await {
            Ok(true) => {}
            Ok(false) => {
                error!("import object {} does not exist, rid: {}", object_id, ctx.rid());
                return ObjectBatchResult::object_error(format!(
                    "object ({}) does not exist",
                    object_id
                ));
            }
            Err(e) => {
                error!(
                    "check if import object {} exists failed, err: {}, rid: {}",
                    object_id,
                    e,
                    ctx.rid()
                );
                return ObjectBatchResult::object_error(format!(
                    "check if object ({}) exists failed, err: {}",
                    object_id, e
                ));
            }
        }

        let group_names: BTreeSet<String> = data
            .attributes
            .values()
            .filter(|attribute| !attribute.property_group_name.is_empty())
            .map(|attribute| attribute.property_group_name.clone())
            .collect();
        let mut group_ids = HashMap::new();
        if !group_names.is_empty() {
            let filter = GroupFilter::for_object(object_id).with_group_names(group_names);
            match self.store.read_attribute_groups(&filter).await {
                Ok(groups) => {
                    group_ids.extend(
                        groups
                            .into_iter()
                            .map(|group| (group.group_name, group.group_id)),
                    );
                }
                Err(e) => {
                    error!(
                        "find groups of import object {} failed, err: {}, rid: {}",
                        object_id,
                        e,
                        ctx.rid()
                    );
                    return ObjectBatchResult::object_error(format!(
                        "find object group failed, err: {}",
                        e
                    ));
                }
            }
        }

        let mut result = ObjectBatchResult::default();
        for (row, attribute) in data.attributes {
            let property_id = attribute.property_id.clone();
            match self
                .reconcile_row(ctx, object_id, attribute, &mut group_ids)
                .await
            {
                RowOutcome::Skipped => {}
                RowOutcome::Success => result.success.push(RowInfo::success(row, property_id)),
                RowOutcome::Failed(bucket, e) => {
                    error!(
                        "import row {} of {} failed, err: {}, rid: {}",
                        row,
                        object_id,
                        e,
                        ctx.rid()
                    );
                    let info = RowInfo::failure(row, property_id, &e);
                    match bucket {
                        RowBucket::Errors => result.errors.push(info),
                        RowBucket::InsertFailed => result.insert_failed.push(info),
                        RowBucket::UpdateFailed => result.update_failed.push(info),
                    }
                }
            }
        }
        result
    }

    async fn reconcile_row(
        &self,
        ctx: &RequestContext,
        object_id: &str,
        mut attribute: AttributeDefinition,
        group_ids: &mut HashMap<String, String>,
    ) -> RowOutcome {
        if attribute.property_id == PARENT_LINK_PROPERTY_ID {
            return RowOutcome::Skipped;
        }
        attribute.owner_id = ctx.supplier_account.clone();
        attribute.object_id = object_id.to_string();

        if attribute.property_id.is_empty() {
            return RowOutcome::Failed(
                RowBucket::Errors,
                ValidationError::missing(fields::PROPERTY_ID).into(),
            );
        }
        if let Err(e) = self
            .validator()
            .validate(ctx, ValidationMode::Update, &mut attribute)
            .await
        {
            return RowOutcome::Failed(RowBucket::Errors, e);
        }

        match self.resolve_row_group(ctx, object_id, &mut attribute, group_ids).await {
            Ok(group_id) => attribute.property_group = group_id,
            Err(e) => return RowOutcome::Failed(RowBucket::Errors, e),
        }

        let filter = AttributeFilter::new()
            .with_object_id(object_id)
            .with_property_id(attribute.property_id.clone())
            .with_model_biz_scope(attribute.biz_id);
        let existing = match self.store.count_attributes(&filter).await {
            Ok(count) => count,
            Err(e) => return RowOutcome::Failed(RowBucket::Errors, e.into()),
        };

        if existing == 0 {
            if attribute.property_type.is_none() {
                return RowOutcome::Failed(
                    RowBucket::Errors,
                    ValidationError::missing(fields::PROPERTY_TYPE).into(),
                );
            }
            match self.insert_row(object_id, attribute).await {
                Ok(()) => RowOutcome::Success,
                Err(e) => RowOutcome::Failed(RowBucket::InsertFailed, e),
            }
        } else {
            match self.update_row(&filter, &attribute).await {
                Ok(()) => RowOutcome::Success,
                Err(e) => RowOutcome::Failed(RowBucket::UpdateFailed, e),
            }
        }
    }

    /// Group id for a row: a known named group, a newly created named
    /// group, or the scope's default group when the row names none.
    async fn resolve_row_group(
        &self,
        ctx: &RequestContext,
        object_id: &str,
        attribute: &mut AttributeDefinition,
        group_ids: &mut HashMap<String, String>,
    ) -> AttributeResult<String> {
        let group_name = std::mem::take(&mut attribute.property_group_name);
        if group_name.is_empty() {
            let group = self
                .scope_default_group(ctx, object_id, attribute.biz_id)
                .await?;
            return Ok(group.group_id);
        }
        if let Some(group_id) = group_ids.get(&group_name) {
            return Ok(group_id.clone());
        }

        let group = AttributeGroup::named(
            object_id,
            group_name.clone(),
            attribute.biz_id,
            &ctx.supplier_account,
        );
        let created = self.store.create_attribute_group(object_id, group).await?;
        info!(
            "created group {} ({}) for {}, rid: {}",
            created.group_name,
            created.group_id,
            object_id,
            ctx.rid()
        );
        group_ids.insert(group_name, created.group_id.clone());
        Ok(created.group_id)
    }

    async fn insert_row(&self, object_id: &str, attribute: AttributeDefinition) -> AttributeResult<()> {
        let property_id = attribute.property_id.clone();
        let biz_id = attribute.biz_id;
        let result = self
            .store
            .create_attributes(object_id, vec![attribute])
            .await?;
        if let Some(exception) = result.exceptions.into_iter().next() {
            return Err(StoreError::rejected(exception.code, exception.message).into());
        }
        if !result.repeated.is_empty() {
            return Err(AttributeError::duplicate(object_id, property_id, biz_id));
        }
        if result.created.len() != 1 {
            return Err(StoreError::internal(format!(
                "expected one created attribute, store reported {}",
                result.created.len()
            ))
            .into());
        }
        Ok(())
    }

    async fn update_row(
        &self,
        filter: &AttributeFilter,
        attribute: &AttributeDefinition,
    ) -> AttributeResult<()> {
        let mut changes = match serde_json::to_value(attribute).map_err(StoreError::from)? {
            Value::Object(map) => map,
            _ => return Err(StoreError::internal("attribute did not encode as an object").into()),
        };
        for field in [fields::ID, fields::OBJECT_ID, fields::PROPERTY_ID] {
            changes.remove(field);
        }
        self.store.update_attributes(filter, changes).await?;
        Ok(())
    }
}
