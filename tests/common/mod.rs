//! Shared fixtures for the integration suite.
//!
//! Every test gets its own engine over fresh in-memory collaborators, seeded
//! with the built-in topology plus a `switch` object that has instances 1
//! and 2 for enum-quote references.

use cmdb_attributes::{
    AttributeDefinition, AttributeEngine, ImportObjectData, InMemoryAuditRecorder,
    InMemoryModelStore, PropertyType, RequestContext,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub mod builders;

pub type TestEngine = AttributeEngine<
    InMemoryModelStore,
    InMemoryModelStore,
    InMemoryModelStore,
    InMemoryAuditRecorder,
>;

/// An engine together with handles on its collaborators.
pub struct TestHarness {
    pub engine: TestEngine,
    pub store: InMemoryModelStore,
    pub audit: InMemoryAuditRecorder,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_store(
            InMemoryModelStore::new()
                .with_default_topology()
                .with_object("switch")
                .with_instances("switch", [1, 2]),
        )
    }

    pub fn with_store(store: InMemoryModelStore) -> Self {
        init_logging();
        let audit = InMemoryAuditRecorder::new();
        let engine = AttributeEngine::builder()
            .store(store.clone())
            .objects(store.clone())
            .groups(store.clone())
            .audit(audit.clone())
            .build()
            .expect("engine should build from in-memory collaborators");
        Self {
            engine,
            store,
            audit,
        }
    }
}

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ctx(rid: &str) -> RequestContext {
    RequestContext::new(rid).with_user("admin")
}

/// Batch input from `(object, rows)` pairs.
pub fn batch_input(
    objects: Vec<(&str, Vec<(i64, AttributeDefinition)>)>,
) -> BTreeMap<String, ImportObjectData> {
    objects
        .into_iter()
        .map(|(object_id, rows)| {
            let data = rows
                .into_iter()
                .fold(ImportObjectData::new(), |data, (row, attr)| data.with_row(row, attr));
            (object_id.to_string(), data)
        })
        .collect()
}

pub fn int_attribute(object_id: &str, property_id: &str) -> AttributeDefinition {
    AttributeDefinition::new(object_id, property_id, PropertyType::Int)
}

/// A two column table option with one default row.
pub fn disk_table_option() -> Value {
    json!({
        "header": [
            {"bk_property_id": "mount", "bk_property_name": "Mount point", "bk_property_type": "singlechar"},
            {"bk_property_id": "size_gb", "bk_property_name": "Size (GB)", "bk_property_type": "int",
             "option": {"min": 0, "max": 65536}},
            {"bk_property_id": "ssd", "bk_property_name": "SSD", "bk_property_type": "bool"}
        ],
        "default": [{"mount": "/", "size_gb": 40, "ssd": true}]
    })
}
