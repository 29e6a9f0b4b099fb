//! Bulk import reconciliation and its per-row report.

use crate::common::{TestHarness, batch_input, ctx, int_attribute};
use cmdb_attributes::storage::StoreOperation;
use cmdb_attributes::{
    AttributeDefinition, AttributeError, ErrorKind, PropertyType, StoreError,
};
use serde_json::json;

#[tokio::test]
async fn test_valid_and_empty_id_rows_are_reported_separately() {
    let harness = TestHarness::new();
    let input = batch_input(vec![(
        "host",
        vec![
            (0, int_attribute("host", "x")),
            (1, int_attribute("host", "")),
        ],
    )]);

    let outcome = harness.engine.reconcile_batch(&ctx("batch-d"), input).await;

    let host = &outcome.report["host"];
    assert_eq!(host.success.len(), 1);
    assert_eq!(host.success[0].row, 0);
    assert_eq!(host.success[0].property_id, "x");
    assert_eq!(host.errors.len(), 1);
    assert_eq!(host.errors[0].row, 1);
    assert_eq!(host.errors[0].kind, Some(ErrorKind::ParameterInvalid));
    assert!(!host.errors[0].info.is_empty());

    let error = outcome.status.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::PartialBatchFailure);
    assert_eq!(harness.store.stats().await.attribute_count, 1);
}

#[tokio::test]
async fn test_every_row_lands_in_exactly_one_bucket() {
    let harness = TestHarness::new();
    harness
        .store
        .fail_on_object(
            StoreOperation::UpdateAttributes,
            "switch",
            StoreError::unavailable("update refused"),
        )
        .await;
    harness
        .engine
        .create_attribute(&ctx("batch-buckets"), int_attribute("switch", "ports"))
        .await
        .unwrap();

    let input = batch_input(vec![(
        "switch",
        vec![
            (0, int_attribute("switch", "vlan")),
            (1, int_attribute("switch", "ports").with_name("Port count")),
            (2, int_attribute("switch", "9bad")),
            (3, AttributeDefinition::new("switch", "mtu", PropertyType::Int)),
        ],
    )]);

    let outcome = harness.engine.reconcile_batch(&ctx("batch-buckets"), input).await;
    let switch = &outcome.report["switch"];

    let mut rows: Vec<i64> = switch
        .success
        .iter()
        .chain(&switch.errors)
        .chain(&switch.insert_failed)
        .chain(&switch.update_failed)
        .map(|info| info.row)
        .collect();
    rows.sort();
    assert_eq!(rows, vec![0, 1, 2, 3]);

    assert_eq!(switch.update_failed.len(), 1);
    assert_eq!(switch.update_failed[0].row, 1);
    assert_eq!(switch.errors.len(), 1);
    assert_eq!(switch.errors[0].row, 2);
    assert_eq!(switch.success.len(), 2);
    assert!(matches!(
        outcome.status,
        Err(AttributeError::PartialFailure {
            failed_objects: 0,
            failed_rows: 2
        })
    ));
}

#[tokio::test]
async fn test_missing_object_does_not_stop_other_objects() {
    let harness = TestHarness::new();
    let input = batch_input(vec![
        ("router", vec![(0, int_attribute("router", "ports"))]),
        ("switch", vec![(0, int_attribute("switch", "ports"))]),
    ]);

    let outcome = harness.engine.reconcile_batch(&ctx("batch-objects"), input).await;

    let router = &outcome.report["router"];
    assert!(router.error.as_deref().unwrap_or_default().contains("router"));
    assert!(router.success.is_empty() && router.errors.is_empty());
    assert_eq!(outcome.report["switch"].success.len(), 1);
    assert!(matches!(
        outcome.status,
        Err(AttributeError::PartialFailure {
            failed_objects: 1,
            failed_rows: 0
        })
    ));
}

#[tokio::test]
async fn test_clean_batch_succeeds_and_reruns_as_updates() {
    let harness = TestHarness::new();
    let rows = || {
        vec![
            (10, int_attribute("host", "cpu_cores")),
            (11, AttributeDefinition::new("host", "kernel", PropertyType::SingleChar)),
        ]
    };

    let first = harness
        .engine
        .reconcile_batch(&ctx("batch-clean"), batch_input(vec![("host", rows())]))
        .await;
    assert!(first.is_success());
    assert_eq!(first.report["host"].success.len(), 2);

    let second = harness
        .engine
        .reconcile_batch(&ctx("batch-clean"), batch_input(vec![("host", rows())]))
        .await;
    assert!(second.is_success());
    assert_eq!(harness.store.stats().await.attribute_count, 2);
}

#[tokio::test]
async fn test_report_serializes_with_wire_names() {
    let harness = TestHarness::new();
    let input = batch_input(vec![(
        "host",
        vec![(0, int_attribute("host", "x")), (1, int_attribute("host", ""))],
    )]);

    let (report, _) = harness
        .engine
        .reconcile_batch(&ctx("batch-wire"), input)
        .await
        .into_parts();
    let encoded = serde_json::to_value(&report).unwrap();

    assert_eq!(encoded["host"]["success"][0], json!({"row": 0, "bk_property_id": "x"}));
    assert_eq!(encoded["host"]["errors"][0]["row"], 1);
    assert_eq!(encoded["host"]["errors"][0]["kind"], "parameter_invalid");
    assert!(encoded["host"].get("insert_failed").is_none());
}
