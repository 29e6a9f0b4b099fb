//! Enum-quote reference checks.
//!
//! An enum-quote attribute stores references to instances of another
//! object type. [`CrossReferenceGuard`] checks that the references are well
//! formed, point at a single object type the topology allows to be quoted,
//! and resolve to at least one existing instance.

use crate::config::ValidationRules;
use crate::context::RequestContext;
use crate::error::{AttributeError, AttributeResult, PolicyViolation, ValidationError};
use crate::schema::{
    MainlineAssociation, QuoteEntry, OBJECT_BIZ, OBJECT_HOST, OBJECT_MODULE, OBJECT_PROCESS,
    OBJECT_SET, fields,
};
use crate::storage::{ModelStore, ObjectExistenceOracle};
use log::{debug, error};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

/// The object type and instances an enum-quote option refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteReference {
    pub object_id: String,
    /// Sorted and deduplicated
    pub instance_ids: Vec<i64>,
}

/// Validates enum-quote options against the live topology.
pub struct CrossReferenceGuard<'a, S, O> {
    rules: &'a ValidationRules,
    store: &'a S,
    objects: &'a O,
}

impl<'a, S, O> CrossReferenceGuard<'a, S, O>
where
    S: ModelStore,
    O: ObjectExistenceOracle,
{
    pub fn new(rules: &'a ValidationRules, store: &'a S, objects: &'a O) -> Self {
        Self {
            rules,
            store,
            objects,
        }
    }

    /// Validate the option of an enum-quote attribute owned by `owner_object_id`.
    pub async fn validate_quote_reference(
        &self,
        ctx: &RequestContext,
        owner_object_id: &str,
        option: Option<&Value>,
        is_multiple: bool,
    ) -> AttributeResult<QuoteReference> {
        let reference = self.parse_option(option, is_multiple)?;

        if reference.object_id == owner_object_id {
            error!(
                "enum quote model can not quote itself, object: {}, rid: {}",
                owner_object_id,
                ctx.rid()
            );
            return Err(PolicyViolation::SelfQuote {
                object_id: owner_object_id.to_string(),
            }
            .into());
        }

        self.check_quotable(ctx, &reference.object_id).await?;

        if !self.objects.is_object_exist(&reference.object_id).await? {
            error!(
                "enum quote object {} does not exist, rid: {}",
                reference.object_id,
                ctx.rid()
            );
            return Err(AttributeError::not_found("object", reference.object_id));
        }

        let found = self
            .store
            .count_instances(&reference.object_id, &reference.instance_ids)
            .await?;
        if found == 0 {
            error!(
                "enum quote instances {:?} of {} do not exist, rid: {}",
                reference.instance_ids,
                reference.object_id,
                ctx.rid()
            );
            return Err(AttributeError::not_found(
                "instance",
                format!("{}:{:?}", reference.object_id, reference.instance_ids),
            ));
        }

        debug!(
            "enum quote option references {} instance(s) of {}, rid: {}",
            reference.instance_ids.len(),
            reference.object_id,
            ctx.rid()
        );
        Ok(reference)
    }

    /// Decode the quote entries and collapse them into one reference.
    pub fn parse_option(
        &self,
        option: Option<&Value>,
        is_multiple: bool,
    ) -> Result<QuoteReference, ValidationError> {
        let limits = self.rules.limits();
        let option = option
            .filter(|value| !value.is_null())
            .ok_or_else(|| ValidationError::missing(fields::OPTION))?;
        let entries = option
            .as_array()
            .ok_or_else(|| ValidationError::invalid(fields::OPTION, option.to_string()))?;
        if entries.is_empty() {
            return Err(ValidationError::invalid(fields::OPTION, "[]"));
        }
        if !is_multiple && entries.len() != 1 {
            return Err(ValidationError::NeedSingleChoice {
                field: fields::OPTION.to_string(),
            });
        }
        if entries.len() > limits.option_array_max_len {
            return Err(ValidationError::TooManyItems {
                field: fields::OPTION.to_string(),
                max: limits.option_array_max_len,
            });
        }

        let mut quoted: Option<String> = None;
        let mut instance_ids = BTreeSet::new();
        for entry in entries {
            let QuoteEntry {
                object_id,
                instance_id,
            } = QuoteEntry::decode(entry)?;
            if object_id.chars().count() > limits.option_value_max_len {
                return Err(ValidationError::too_long(
                    "option bk_obj_id",
                    limits.option_value_max_len,
                ));
            }
            match &quoted {
                None => quoted = Some(object_id),
                Some(first) if *first != object_id => {
                    return Err(ValidationError::invalid("quote bk_obj_id", object_id));
                }
                Some(_) => {}
            }
            instance_ids.insert(instance_id);
        }

        let object_id = quoted.ok_or_else(|| ValidationError::missing("option bk_obj_id"))?;
        Ok(QuoteReference {
            object_id,
            instance_ids: instance_ids.into_iter().collect(),
        })
    }

    async fn check_quotable(&self, ctx: &RequestContext, quoted_object_id: &str) -> AttributeResult<()> {
        if matches!(quoted_object_id, OBJECT_SET | OBJECT_MODULE | OBJECT_PROCESS) {
            error!(
                "enum quote can not use inner model {}, rid: {}",
                quoted_object_id,
                ctx.rid()
            );
            return Err(PolicyViolation::QuoteStructuralModel {
                quoted_object_id: quoted_object_id.to_string(),
            }
            .into());
        }

        let associations = self.store.read_mainline_associations().await?;
        if custom_levels(&associations)
            .iter()
            .any(|level| level == quoted_object_id)
        {
            error!(
                "enum quote can not use custom level {}, rid: {}",
                quoted_object_id,
                ctx.rid()
            );
            return Err(PolicyViolation::QuoteCustomLevel {
                quoted_object_id: quoted_object_id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Custom topology levels in order from the business down.
///
/// Walks the mainline from `biz` through child edges, ignoring the host
/// edge, and leaves out the built-in `biz`, `set` and `module` levels.
pub fn custom_levels(associations: &[MainlineAssociation]) -> Vec<String> {
    let children: HashMap<&str, &str> = associations
        .iter()
        .filter(|association| association.object_id != OBJECT_HOST)
        .map(|association| {
            (
                association.asst_object_id.as_str(),
                association.object_id.as_str(),
            )
        })
        .collect();

    let mut levels = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(OBJECT_BIZ);
    while let Some(object_id) = current {
        if !visited.insert(object_id) {
            break;
        }
        if !matches!(object_id, OBJECT_BIZ | OBJECT_SET | OBJECT_MODULE) {
            levels.push(object_id.to_string());
        }
        current = children.get(object_id).copied();
    }
    levels
}
