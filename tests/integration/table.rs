//! Table attributes and their hidden child objects.

use crate::common::{TestHarness, ctx, disk_table_option};
use cmdb_attributes::error::TableCreationStep;
use cmdb_attributes::schema::QuoteType;
use cmdb_attributes::storage::StoreOperation;
use cmdb_attributes::{
    AttributeDefinition, AttributeError, AuditResource, ErrorKind, PropertyType, StoreError,
};
use serde_json::json;

fn disks() -> AttributeDefinition {
    AttributeDefinition::new("host", "disks", PropertyType::Table).with_option(disk_table_option())
}

#[tokio::test]
async fn test_table_attribute_creates_child_object_and_relation() {
    let harness = TestHarness::new();

    let created = harness
        .engine
        .create_table_attribute(&ctx("table-1"), disks())
        .await
        .unwrap();
    assert_eq!(created.property_id, "disks");

    let stats = harness.store.stats().await;
    assert_eq!(stats.table_object_count, 1);
    assert_eq!(stats.relation_count, 1);

    let relations = harness.store.relations().await;
    assert_eq!(relations[0].src_object_id, "host");
    assert_eq!(relations[0].property_id, "disks");
    assert_eq!(relations[0].quote_type, QuoteType::Table);

    let child = &relations[0].dest_object_id;
    let groups = harness.store.groups().await;
    assert!(groups.iter().any(|g| &g.object_id == child && g.is_default));

    let entries = harness.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].resource, AuditResource::Model);
}

#[tokio::test]
async fn test_second_table_attribute_with_same_identity_is_conflict() {
    let harness = TestHarness::new();
    harness
        .engine
        .create_table_attribute(&ctx("table-dup"), disks())
        .await
        .unwrap();
    let writes_before = harness.store.stats().await.write_calls;

    let error = harness
        .engine
        .create_table_attribute(&ctx("table-dup"), disks())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ConflictDuplicate);
    let stats = harness.store.stats().await;
    assert_eq!(stats.write_calls, writes_before);
    assert_eq!(stats.table_object_count, 1);
}

#[tokio::test]
async fn test_relation_failure_reports_incomplete_table() {
    let harness = TestHarness::new();
    harness
        .store
        .fail_on(
            StoreOperation::CreateQuoteRelation,
            StoreError::unavailable("relation store down"),
        )
        .await;

    let error = harness
        .engine
        .create_table_attribute(&ctx("table-partial"), disks())
        .await
        .unwrap_err();

    match &error {
        AttributeError::IncompleteTable {
            step,
            child_object_id,
            ..
        } => {
            assert_eq!(*step, TableCreationStep::QuoteRelation);
            assert!(!child_object_id.is_empty());
        }
        other => panic!("expected an incomplete table, got {:?}", other),
    }
    assert_eq!(error.kind(), ErrorKind::Infrastructure);
    assert_eq!(harness.store.stats().await.relation_count, 0);
}

#[tokio::test]
async fn test_invalid_table_options_write_nothing() {
    let harness = TestHarness::new();
    let options = vec![
        json!({"header": []}),
        json!({"header": [
            {"bk_property_id": "owner", "bk_property_name": "Owner", "bk_property_type": "user"}
        ]}),
        json!({"header": [
            {"bk_property_id": "größe", "bk_property_name": "Size", "bk_property_type": "int"}
        ]}),
        json!({
            "header": [{"bk_property_id": "size", "bk_property_name": "Size", "bk_property_type": "int"}],
            "default": [{"weight": 3}]
        }),
        json!({
            "header": [{"bk_property_id": "size", "bk_property_name": "Size", "bk_property_type": "int",
                        "option": {"min": 0, "max": 10}}],
            "default": [{"size": 11}]
        }),
    ];

    for option in options {
        let attr = AttributeDefinition::new("host", "disks", PropertyType::Table).with_option(option.clone());
        let error = harness
            .engine
            .create_table_attribute(&ctx("table-bad"), attr)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ParameterInvalid, "option: {}", option);
    }
    let stats = harness.store.stats().await;
    assert_eq!(stats.attribute_count, 0);
    assert_eq!(stats.table_object_count, 0);
}

#[tokio::test]
async fn test_too_many_header_columns_rejected() {
    let harness = TestHarness::new();
    let header: Vec<_> = (0..9)
        .map(|i| {
            json!({
                "bk_property_id": format!("c{}", i),
                "bk_property_name": format!("Column {}", i),
                "bk_property_type": "singlechar"
            })
        })
        .collect();
    let attr = AttributeDefinition::new("host", "wide", PropertyType::Table)
        .with_option(json!({"header": header}));

    let error = harness
        .engine
        .create_table_attribute(&ctx("table-wide"), attr)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ParameterInvalid);
}
