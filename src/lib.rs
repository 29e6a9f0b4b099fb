//! Attribute definition and validation engine for a configuration
//! management database.
//!
//! Operators declare typed attributes on business object types. This crate
//! validates those definitions, manages table attributes and the hidden
//! objects backing them, and reconciles bulk imports with per-row results,
//! recording an audit trail of every schema mutation.
//!
//! # Core Components
//!
//! - [`AttributeEngine`] - the public operations on attribute definitions
//! - [`ModelStore`], [`ObjectExistenceOracle`], [`GroupOwner`] - storage collaborators
//! - [`AuditRecorder`] - audit trail collaborator
//! - [`TypeOptionValidator`], [`CrossReferenceGuard`], [`AttributeValidator`] - validation layers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cmdb_attributes::{
//!     AttributeDefinition, AttributeEngine, InMemoryAuditRecorder, InMemoryModelStore,
//!     PropertyType, RequestContext,
//! };
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryModelStore::new().with_default_topology();
//! let engine = AttributeEngine::builder()
//!     .store(store.clone())
//!     .objects(store.clone())
//!     .groups(store)
//!     .audit(InMemoryAuditRecorder::new())
//!     .build()?;
//!
//! let ctx = RequestContext::new("req-1").with_user("admin");
//! let cpu = AttributeDefinition::new("host", "cpu_num", PropertyType::Int)
//!     .with_option(json!({"min": 0, "max": 1024}));
//! let created = engine.create_attribute(&ctx, cpu).await?;
//! assert!(created.id > 0);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod localization;
pub mod schema;
pub mod storage;
pub mod validation;

// Re-export commonly used types for convenience
pub use audit::{AuditAction, AuditLogEntry, AuditPayload, AuditRecorder, AuditResource, InMemoryAuditRecorder};
pub use config::{EngineConfig, ValidationRules};
pub use context::RequestContext;
pub use engine::{
    AttributeEngine, AttributeEngineBuilder, BatchOutcome, BatchReport, ImportObjectData,
    ObjectBatchResult, RowInfo,
};
pub use error::{
    AttributeError, AttributeResult, BuildError, ErrorKind, PolicyViolation, ValidationError,
};
pub use localization::{Localizer, NoopLocalizer, StaticLocalizer};
pub use schema::{AttributeDefinition, AttributeGroup, AttributeOption, PropertyType};
pub use storage::{
    AttributeFilter, GroupFilter, GroupOwner, InMemoryModelStore, ModelStore,
    ObjectExistenceOracle, StoreError,
};
pub use validation::{AttributeValidator, CrossReferenceGuard, TableAttributeValidator, TypeOptionValidator};
