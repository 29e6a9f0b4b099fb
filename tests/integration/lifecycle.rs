//! Create, update, delete and lookup of attribute definitions.

use crate::common::builders::EnumOptionBuilder;
use crate::common::{TestHarness, ctx, int_attribute};
use cmdb_attributes::storage::AttributeFilter;
use cmdb_attributes::{
    AttributeDefinition, AttributeError, AuditAction, AuditPayload, AuditResource, ErrorKind,
    ModelStore, PolicyViolation, PropertyType, ValidationError,
};
use serde_json::{Map, Value, json};

fn changes(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn test_create_int_attribute_on_host() {
    let harness = TestHarness::new();
    let option = json!({"min": 0, "max": 1024});
    let attr = int_attribute("host", "cpu_num").with_option(option.clone());

    let created = harness
        .engine
        .create_attribute(&ctx("lifecycle-a"), attr)
        .await
        .unwrap();

    assert!(created.id > 0);
    assert_eq!(created.property_type, Some(PropertyType::Int));
    assert_eq!(created.option, Some(option));

    let entries = harness.audit.entries().await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.action, AuditAction::Create);
    assert_eq!(entry.resource, AuditResource::ModelAttribute);
    assert_eq!(entry.resource_id, created.id);
    assert_eq!(entry.operator, "admin");
    assert_eq!(entry.request_id, "lifecycle-a");
    match &entry.payload {
        AuditPayload::Snapshot(snapshot) => {
            assert_eq!(snapshot["bk_property_id"], "cpu_num");
        }
        other => panic!("expected a snapshot payload, got {:?}", other),
    }
}

#[tokio::test]
async fn test_required_attribute_on_mainline_object_writes_nothing() {
    let harness = TestHarness::new();
    let attr = AttributeDefinition::new("set", "owner", PropertyType::SingleChar).with_required(true);

    let error = harness
        .engine
        .create_attribute(&ctx("lifecycle-b"), attr)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::PolicyViolation);
    assert!(matches!(
        error,
        AttributeError::Policy(PolicyViolation::RequiredOnMainline { ref object_id }) if object_id == "set"
    ));
    assert_eq!(harness.store.stats().await.write_calls, 0);
    assert!(harness.audit.entries().await.is_empty());
}

#[tokio::test]
async fn test_required_attribute_on_plain_object_is_allowed() {
    let harness = TestHarness::new();
    let attr = AttributeDefinition::new("biz", "owner", PropertyType::SingleChar).with_required(true);

    let created = harness
        .engine
        .create_attribute(&ctx("lifecycle-biz"), attr)
        .await
        .unwrap();
    assert!(created.is_required);
}

#[tokio::test]
async fn test_create_enum_with_default_choice() {
    let harness = TestHarness::new();
    let option = EnumOptionBuilder::new()
        .default_choice("linux", "Linux")
        .choice("windows", "Windows")
        .build();
    let attr = AttributeDefinition::new("host", "os_family", PropertyType::Enum)
        .with_option(option)
        .with_default(json!("linux"));

    let created = harness
        .engine
        .create_attribute(&ctx("lifecycle-enum"), attr)
        .await
        .unwrap();
    assert_eq!(created.is_multiple, Some(false));
}

#[tokio::test]
async fn test_create_rejects_malformed_definitions() {
    let harness = TestHarness::new();

    let cases = vec![
        (
            "bad id charset",
            int_attribute("host", "9lives"),
        ),
        (
            "non-ascii id",
            int_attribute("host", "cpu数"),
        ),
        (
            "range out of order",
            int_attribute("host", "ports").with_option(json!({"min": 10, "max": 1})),
        ),
        (
            "default outside range",
            int_attribute("host", "ports")
                .with_option(json!({"min": 0, "max": 10}))
                .with_default(json!(11)),
        ),
        (
            "single valued enum with two defaults",
            AttributeDefinition::new("host", "state", PropertyType::Enum).with_option(
                EnumOptionBuilder::new()
                    .default_choice("up", "Up")
                    .default_choice("down", "Down")
                    .build(),
            ),
        ),
        (
            "multiple valued int",
            int_attribute("host", "cores").with_multiple(true),
        ),
    ];

    for (name, attr) in cases {
        let error = harness
            .engine
            .create_attribute(&ctx("lifecycle-bad"), attr)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ParameterInvalid, "case: {}", name);
    }
    assert_eq!(harness.store.stats().await.attribute_count, 0);
}

#[tokio::test]
async fn test_create_without_type_names_the_missing_field() {
    let harness = TestHarness::new();
    let attr = AttributeDefinition {
        object_id: "host".to_string(),
        property_id: "untyped".to_string(),
        property_name: "untyped".to_string(),
        ..Default::default()
    };

    let error = harness
        .engine
        .create_attribute(&ctx("lifecycle-untyped"), attr)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        AttributeError::Validation(ValidationError::MissingField { ref field }) if field == "bk_property_type"
    ));
}

#[tokio::test]
async fn test_update_writes_changes_and_audits_them() {
    let harness = TestHarness::new();
    let created = harness
        .engine
        .create_attribute(
            &ctx("lifecycle-update"),
            int_attribute("host", "memory").with_option(json!({"min": 0, "max": 4096})),
        )
        .await
        .unwrap();

    harness
        .engine
        .update_attribute(
            &ctx("lifecycle-update"),
            changes(json!({
                "bk_property_name": "Memory (MB)",
                "bk_property_id": "renamed",
                "bk_obj_id": "switch"
            })),
            created.id,
            0,
        )
        .await
        .unwrap();

    let stored = harness
        .engine
        .store()
        .read_attributes(&AttributeFilter::new().with_id(created.id))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].property_name, "Memory (MB)");
    assert_eq!(stored[0].property_id, "memory");
    assert_eq!(stored[0].object_id, "host");

    let entries = harness.audit.entries().await;
    assert_eq!(entries.len(), 2);
    match &entries[1].payload {
        AuditPayload::UpdatedFields(fields) => {
            assert!(fields.contains_key("bk_property_name"));
            assert!(!fields.contains_key("bk_property_id"));
        }
        other => panic!("expected updated fields, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_rejects_over_long_name_before_writing() {
    let harness = TestHarness::new();
    let created = harness
        .engine
        .create_attribute(&ctx("lifecycle-update-bad"), int_attribute("host", "disk"))
        .await
        .unwrap();
    let writes_before = harness.store.stats().await.write_calls;

    let error = harness
        .engine
        .update_attribute(
            &ctx("lifecycle-update-bad"),
            changes(json!({"bk_property_name": "n".repeat(200)})),
            created.id,
            0,
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ParameterInvalid);
    assert_eq!(harness.store.stats().await.write_calls, writes_before);
}

#[tokio::test]
async fn test_delete_matching_nothing_succeeds_silently() {
    let harness = TestHarness::new();

    harness
        .engine
        .delete_attribute(
            &ctx("lifecycle-delete-none"),
            AttributeFilter::new().with_object_id("host").with_property_id("ghost"),
            0,
        )
        .await
        .unwrap();

    assert_eq!(harness.store.stats().await.write_calls, 0);
    assert!(harness.audit.entries().await.is_empty());
}

#[tokio::test]
async fn test_delete_records_snapshot_per_definition() {
    let harness = TestHarness::new();
    for property_id in ["rack", "slot"] {
        harness
            .engine
            .create_attribute(&ctx("lifecycle-delete"), int_attribute("host", property_id))
            .await
            .unwrap();
    }

    harness
        .engine
        .delete_attribute(
            &ctx("lifecycle-delete"),
            AttributeFilter::new().with_object_id("host"),
            0,
        )
        .await
        .unwrap();

    assert_eq!(harness.store.stats().await.attribute_count, 0);
    let deletes: Vec<_> = harness
        .audit
        .entries()
        .await
        .into_iter()
        .filter(|entry| entry.action == AuditAction::Delete)
        .collect();
    assert_eq!(deletes.len(), 2);
    assert!(deletes
        .iter()
        .all(|entry| matches!(entry.payload, AuditPayload::Snapshot(_))));
}

#[tokio::test]
async fn test_find_attributes_by_objects_fills_group_names() {
    let harness = TestHarness::new();
    harness
        .engine
        .create_attribute(&ctx("lifecycle-find"), int_attribute("host", "cpu_num"))
        .await
        .unwrap();
    harness
        .engine
        .create_attribute(&ctx("lifecycle-find"), int_attribute("switch", "ports"))
        .await
        .unwrap();

    let found = harness
        .engine
        .find_attributes_by_objects(
            &ctx("lifecycle-find"),
            &["host".to_string(), "switch".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found["host"][0].property_id, "cpu_num");
    assert_eq!(found["switch"][0].property_id, "ports");
    assert!(found
        .values()
        .flatten()
        .all(|attr| !attr.property_group_name.is_empty()));
}
