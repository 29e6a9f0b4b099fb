//! Per-attribute validation.

use super::quote::CrossReferenceGuard;
use super::type_option::TypeOptionValidator;
use super::{ValidationMode, check_property_id, check_property_name};
use crate::config::ValidationRules;
use crate::context::RequestContext;
use crate::error::{AttributeResult, ValidationError};
use crate::localization::{Localizer, field_label};
use crate::schema::{AttributeDefinition, PARENT_LINK_PROPERTY_ID, PropertyType, fields};
use crate::storage::{ModelStore, ObjectExistenceOracle};
use log::error;

const PROPERTY_ID_LABEL: &str = "model_attr_bk_property_id";
const PROPERTY_NAME_LABEL: &str = "model_attr_bk_property_name";
const PLACEHOLDER_LABEL: &str = "model_attr_placeholder";

/// Validates one attribute definition, in create or update mode.
///
/// Checks run in a fixed order and stop at the first failure. The
/// definition is normalised in place: on create an absent `ismultiple`
/// becomes `false`, and user typed attributes are always multiple valued.
pub struct AttributeValidator<'a, S, O, L: ?Sized> {
    rules: &'a ValidationRules,
    localizer: &'a L,
    guard: CrossReferenceGuard<'a, S, O>,
}

impl<'a, S, O, L> AttributeValidator<'a, S, O, L>
where
    S: ModelStore,
    O: ObjectExistenceOracle,
    L: Localizer + ?Sized,
{
    pub fn new(rules: &'a ValidationRules, store: &'a S, objects: &'a O, localizer: &'a L) -> Self {
        Self {
            rules,
            localizer,
            guard: CrossReferenceGuard::new(rules, store, objects),
        }
    }

    pub async fn validate(
        &self,
        ctx: &RequestContext,
        mode: ValidationMode,
        attribute: &mut AttributeDefinition,
    ) -> AttributeResult<()> {
        if attribute.property_id == PARENT_LINK_PROPERTY_ID {
            return Ok(());
        }
        let is_create = mode == ValidationMode::Create;
        let language = ctx.language.as_deref();

        if is_create && attribute.is_multiple.is_none() {
            attribute.is_multiple = Some(false);
        }
        if let (Some(property_type), Some(is_multiple)) =
            (attribute.property_type.as_ref(), attribute.is_multiple)
        {
            check_multiplicity(property_type, is_multiple)?;
        }

        if is_create && attribute.is_type(&PropertyType::User) {
            attribute.is_multiple = Some(true);
        }

        if is_create && attribute.property_type.is_none() {
            return Err(ValidationError::missing(fields::PROPERTY_TYPE).into());
        }

        if is_create || !attribute.property_id.is_empty() {
            let label = field_label(self.localizer, PROPERTY_ID_LABEL, fields::PROPERTY_ID, language);
            check_property_id(self.rules, &attribute.property_id, &label)?;
        }

        if is_create || !attribute.property_name.is_empty() {
            let label = field_label(
                self.localizer,
                PROPERTY_NAME_LABEL,
                fields::PROPERTY_NAME,
                language,
            );
            check_property_name(self.rules, &attribute.property_name, &label)?;
        }

        if let Some(property_type) = attribute
            .property_type
            .as_ref()
            .filter(|property_type| is_create && property_type.has_creation_grammar())
        {
            TypeOptionValidator::new(self.rules).validate_option(
                property_type,
                attribute.option.as_ref(),
                attribute.default.as_ref(),
                attribute.is_multiple.unwrap_or(false),
            )?;
        }

        if let (true, Some(is_multiple)) = (
            attribute.is_type(&PropertyType::EnumQuote),
            attribute.is_multiple,
        ) {
            if let Err(e) = self
                .guard
                .validate_quote_reference(
                    ctx,
                    &attribute.object_id,
                    attribute.option.as_ref(),
                    is_multiple,
                )
                .await
            {
                error!("check enum quote option failed, err: {}, rid: {}", e, ctx.rid());
                return Err(e);
            }
        }

        let max = self.rules.limits().placeholder_max_len;
        if attribute.placeholder.chars().count() > max {
            let label = field_label(self.localizer, PLACEHOLDER_LABEL, fields::PLACEHOLDER, language);
            return Err(ValidationError::too_long(label, max).into());
        }

        Ok(())
    }
}

fn check_multiplicity(property_type: &PropertyType, is_multiple: bool) -> Result<(), ValidationError> {
    match property_type.multiplicity() {
        None => Err(ValidationError::UnsupportedPropertyType {
            property_type: property_type.to_string(),
        }),
        Some(false) if is_multiple => Err(ValidationError::MultiplicityNotSupported {
            property_type: property_type.to_string(),
            is_multiple,
        }),
        Some(_) => Ok(()),
    }
}
