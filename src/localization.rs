//! Field label lookup for error messages.
//!
//! Translation is best effort: when no label is known the raw field
//! identifier is used instead.

use std::collections::HashMap;

/// Translates field label keys into display text.
pub trait Localizer: Send + Sync {
    /// Look up the label for `key` in `language`, if one is known.
    fn label(&self, key: &str, language: Option<&str>) -> Option<String>;
}

/// Localizer that knows no labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLocalizer;

impl Localizer for NoopLocalizer {
    fn label(&self, _key: &str, _language: Option<&str>) -> Option<String> {
        None
    }
}

/// Table backed localizer keyed by (language, key).
///
/// Entries registered without a language act as the fallback for any language.
#[derive(Debug, Clone, Default)]
pub struct StaticLocalizer {
    labels: HashMap<(Option<String>, String), String>,
}

impl StaticLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label for one language.
    pub fn with_label(
        mut self,
        language: impl Into<String>,
        key: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.labels
            .insert((Some(language.into()), key.into()), label.into());
        self
    }

    /// Register a label used when no language specific entry exists.
    pub fn with_fallback(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert((None, key.into()), label.into());
        self
    }
}

impl Localizer for StaticLocalizer {
    fn label(&self, key: &str, language: Option<&str>) -> Option<String> {
        language
            .and_then(|lang| {
                self.labels
                    .get(&(Some(lang.to_string()), key.to_string()))
            })
            .or_else(|| self.labels.get(&(None, key.to_string())))
            .cloned()
    }
}

/// Resolve a label, falling back to the raw field identifier.
pub(crate) fn field_label<L: Localizer + ?Sized>(
    localizer: &L,
    key: &str,
    field: &str,
    language: Option<&str>,
) -> String {
    localizer
        .label(key, language)
        .unwrap_or_else(|| field.to_string())
}
