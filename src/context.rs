//! Request context for attribute operations.
//!
//! Carries the request id used in every log line, the supplier account that
//! owns the records created by the request, and the caller's language for
//! localized field labels.

use uuid::Uuid;

/// Supplier account used when the caller does not name one.
pub const DEFAULT_SUPPLIER_ACCOUNT: &str = "0";

/// Per-request information threaded through every engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Unique identifier for this request
    pub request_id: String,
    /// Supplier account that owns created records
    pub supplier_account: String,
    /// Operator issuing the request
    pub user: String,
    /// Preferred language for field labels
    pub language: Option<String>,
}

impl RequestContext {
    /// Create a new request context with a specific request ID.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            supplier_account: DEFAULT_SUPPLIER_ACCOUNT.to_string(),
            user: String::new(),
            language: None,
        }
    }

    /// Create a new request context with a generated request ID.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Set the supplier account.
    pub fn with_supplier_account(mut self, supplier_account: impl Into<String>) -> Self {
        self.supplier_account = supplier_account.into();
        self
    }

    /// Set the operator name.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the preferred language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Short alias used in log lines.
    pub fn rid(&self) -> &str {
        &self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_generated_id()
    }
}
