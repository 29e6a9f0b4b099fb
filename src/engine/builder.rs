//! Builder for assembling an [`AttributeEngine`].

use super::core::AttributeEngine;
use crate::audit::AuditRecorder;
use crate::config::EngineConfig;
use crate::error::{BuildError, BuildResult};
use crate::localization::{Localizer, NoopLocalizer};
use crate::storage::{GroupOwner, ModelStore, ObjectExistenceOracle};

/// Fluent builder taking the collaborators and configuration of an engine.
///
/// The store, object oracle, group owner and audit recorder are required.
/// The localizer defaults to [`NoopLocalizer`] and the configuration to
/// [`EngineConfig::default`].
pub struct AttributeEngineBuilder<S, O, G, A, L = NoopLocalizer> {
    store: Option<S>,
    objects: Option<O>,
    groups: Option<G>,
    audit: Option<A>,
    localizer: L,
    config: EngineConfig,
}

impl<S, O, G, A> AttributeEngineBuilder<S, O, G, A, NoopLocalizer> {
    pub fn new() -> Self {
        Self {
            store: None,
            objects: None,
            groups: None,
            audit: None,
            localizer: NoopLocalizer,
            config: EngineConfig::default(),
        }
    }
}

impl<S, O, G, A> Default for AttributeEngineBuilder<S, O, G, A, NoopLocalizer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, O, G, A, L> AttributeEngineBuilder<S, O, G, A, L> {
    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn objects(mut self, objects: O) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn groups(mut self, groups: G) -> Self {
        self.groups = Some(groups);
        self
    }

    pub fn audit(mut self, audit: A) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replace the configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `localizer` to translate field labels in error messages.
    pub fn localizer<L2>(self, localizer: L2) -> AttributeEngineBuilder<S, O, G, A, L2> {
        AttributeEngineBuilder {
            store: self.store,
            objects: self.objects,
            groups: self.groups,
            audit: self.audit,
            localizer,
            config: self.config,
        }
    }
}

impl<S, O, G, A, L> AttributeEngineBuilder<S, O, G, A, L>
where
    S: ModelStore,
    O: ObjectExistenceOracle,
    G: GroupOwner,
    A: AuditRecorder,
    L: Localizer,
{
    /// Build the engine.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingCollaborator`] when a required
    /// collaborator was not provided, and [`BuildError::InvalidConfiguration`]
    /// when the configuration does not compile.
    pub fn build(self) -> BuildResult<AttributeEngine<S, O, G, A, L>> {
        let store = self
            .store
            .ok_or(BuildError::MissingCollaborator { name: "store" })?;
        let objects = self
            .objects
            .ok_or(BuildError::MissingCollaborator { name: "objects" })?;
        let groups = self
            .groups
            .ok_or(BuildError::MissingCollaborator { name: "groups" })?;
        let audit = self
            .audit
            .ok_or(BuildError::MissingCollaborator { name: "audit" })?;
        let rules = self.config.compile()?;

        Ok(AttributeEngine::from_parts(
            store,
            objects,
            groups,
            audit,
            self.localizer,
            rules,
        ))
    }
}

impl<S, O, G, A> AttributeEngine<S, O, G, A, NoopLocalizer> {
    /// Start building an engine.
    pub fn builder() -> AttributeEngineBuilder<S, O, G, A, NoopLocalizer> {
        AttributeEngineBuilder::new()
    }
}
