//! Enum-quote references and topology policy.

use crate::common::builders::QuoteOptionBuilder;
use crate::common::{TestHarness, ctx};
use cmdb_attributes::{
    AttributeDefinition, AttributeError, ErrorKind, InMemoryModelStore, PolicyViolation,
    PropertyType,
};
use serde_json::Value;

fn quote_attribute(owner: &str, property_id: &str, option: Value) -> AttributeDefinition {
    AttributeDefinition::new(owner, property_id, PropertyType::EnumQuote)
        .with_option(option)
        .with_multiple(true)
}

#[tokio::test]
async fn test_quote_of_existing_instances_is_accepted() {
    let harness = TestHarness::new();
    let option = QuoteOptionBuilder::new("switch").instance(1).instance(2).build();

    let created = harness
        .engine
        .create_attribute(&ctx("quote-ok"), quote_attribute("host", "uplink", option))
        .await
        .unwrap();
    assert_eq!(created.property_type, Some(PropertyType::EnumQuote));
}

#[tokio::test]
async fn test_quote_of_structural_model_is_policy_violation() {
    let harness = TestHarness::new();
    let option = QuoteOptionBuilder::new("module").instance(1).build();

    let error = harness
        .engine
        .create_attribute(&ctx("quote-c"), quote_attribute("host", "home_module", option))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::PolicyViolation);
    assert!(matches!(
        error,
        AttributeError::Policy(PolicyViolation::QuoteStructuralModel { .. })
    ));
    assert_eq!(harness.store.stats().await.attribute_count, 0);
}

#[tokio::test]
async fn test_quote_of_own_object_is_policy_violation() {
    let harness = TestHarness::new();
    let option = QuoteOptionBuilder::new("switch").instance(1).build();

    let error = harness
        .engine
        .create_attribute(&ctx("quote-self"), quote_attribute("switch", "peer", option))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AttributeError::Policy(PolicyViolation::SelfQuote { ref object_id }) if object_id == "switch"
    ));
}

#[tokio::test]
async fn test_quote_of_custom_level_is_policy_violation() {
    let harness = TestHarness::with_store(
        InMemoryModelStore::new()
            .with_default_topology()
            .with_custom_level("region", "biz")
            .with_instances("region", [7]),
    );
    let option = QuoteOptionBuilder::new("region").instance(7).build();

    let error = harness
        .engine
        .create_attribute(&ctx("quote-level"), quote_attribute("host", "region", option))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AttributeError::Policy(PolicyViolation::QuoteCustomLevel { .. })
    ));
}

#[tokio::test]
async fn test_quote_of_unknown_instances_is_reference_not_found() {
    let harness = TestHarness::new();
    let option = QuoteOptionBuilder::new("switch").instance(99).build();

    let error = harness
        .engine
        .create_attribute(&ctx("quote-missing"), quote_attribute("host", "uplink", option))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ReferenceNotFound);
}

#[tokio::test]
async fn test_single_valued_quote_needs_one_entry() {
    let harness = TestHarness::new();
    let option = QuoteOptionBuilder::new("switch").instance(1).instance(2).build();
    let attr = quote_attribute("host", "uplink", option).with_multiple(false);

    let error = harness
        .engine
        .create_attribute(&ctx("quote-single"), attr)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ParameterInvalid);
}
