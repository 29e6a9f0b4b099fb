//! Audit trail of schema mutations.
//!
//! The engine decides what an audit entry says: the action, the affected
//! record and the payload. Generating the stored form and persisting it
//! belong to the [`AuditRecorder`] collaborator. Generation and saving are
//! separate calls so the engine can generate entries before a write and
//! save them only once the write has succeeded.

use crate::context::RequestContext;
use crate::storage::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Kind of mutation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

/// Kind of record the mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResource {
    ModelAttribute,
    /// An object type, e.g. the hidden object behind a table attribute
    Model,
}

/// What the entry carries besides its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AuditPayload {
    None,
    /// The full record at the time of the mutation
    Snapshot(Value),
    /// Only the fields an update wrote
    UpdatedFields(Map<String, Value>),
}

/// An immutable record of one schema mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub action: AuditAction,
    pub resource: AuditResource,
    pub resource_id: i64,
    pub payload: AuditPayload,
    pub operator: String,
    pub supplier_account: String,
    pub request_id: String,
    pub operation_time: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        ctx: &RequestContext,
        action: AuditAction,
        resource: AuditResource,
        resource_id: i64,
        payload: AuditPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action,
            resource,
            resource_id,
            payload,
            operator: ctx.user.clone(),
            supplier_account: ctx.supplier_account.clone(),
            request_id: ctx.request_id.clone(),
            operation_time: Utc::now(),
        }
    }
}

/// Generates and persists audit entries.
pub trait AuditRecorder: Send + Sync {
    fn generate_log(
        &self,
        ctx: &RequestContext,
        action: AuditAction,
        resource: AuditResource,
        resource_id: i64,
        payload: AuditPayload,
    ) -> impl Future<Output = StoreResult<AuditLogEntry>> + Send;

    /// Persist `entries` together.
    fn save_log(
        &self,
        ctx: &RequestContext,
        entries: Vec<AuditLogEntry>,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

#[derive(Debug, Default)]
struct RecorderState {
    saved: Vec<AuditLogEntry>,
    generated: usize,
    generate_fault: Option<StoreError>,
    save_fault: Option<StoreError>,
}

/// Audit recorder keeping saved entries in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditRecorder {
    state: Arc<RwLock<RecorderState>>,
}

impl InMemoryAuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every saved entry, in save order.
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.state.read().await.saved.clone()
    }

    /// Number of entries generated so far, saved or not.
    pub async fn generated_count(&self) -> usize {
        self.state.read().await.generated
    }

    /// Make generation fail with `error` until cleared.
    pub async fn fail_generate(&self, error: Option<StoreError>) {
        self.state.write().await.generate_fault = error;
    }

    /// Make saving fail with `error` until cleared.
    pub async fn fail_save(&self, error: Option<StoreError>) {
        self.state.write().await.save_fault = error;
    }
}

impl AuditRecorder for InMemoryAuditRecorder {
    async fn generate_log(
        &self,
        ctx: &RequestContext,
        action: AuditAction,
        resource: AuditResource,
        resource_id: i64,
        payload: AuditPayload,
    ) -> StoreResult<AuditLogEntry> {
        let mut state = self.state.write().await;
        if let Some(error) = &state.generate_fault {
            return Err(error.clone());
        }
        state.generated += 1;
        Ok(AuditLogEntry::new(ctx, action, resource, resource_id, payload))
    }

    async fn save_log(&self, _ctx: &RequestContext, entries: Vec<AuditLogEntry>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(error) = &state.save_fault {
            return Err(error.clone());
        }
        state.saved.extend(entries);
        Ok(())
    }
}
