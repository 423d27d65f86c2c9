//! The reconciliation engine.
//!
//! Each resource type implements [`Resource`]: how declared configuration
//! becomes a request, how a remote entity flattens into state, and how the
//! composite identifier is laid out. [`Reconciler`] drives the lifecycle on
//! top of that, and exposes it through the object-safe [`ResourceLifecycle`]
//! trait that the provider registry dispatches to.
//!
//! ```text
//! Absent --create--> Present --update--> Present --delete--> Absent
//!                       |
//!                       +--read (not found)--> Absent
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cancel::cancellable;
use crate::error::ProviderError;
use crate::identifier::CompositeId;
use crate::remote::{Endpoint, RemoteApi};
use crate::schema::Schema;
use crate::state::{ChangeSet, StateMap, StateStore};
use crate::validation::ensure_valid;

/// The state attribute that mirrors the stored identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// One resource type.
///
/// The hooks with default bodies cover the resources whose lifecycle is more
/// than a single remote call per step.
#[async_trait]
pub trait Resource: Endpoint + Sized {
    /// Typed declared configuration.
    type Config: DeserializeOwned + Send + Sync;

    /// The composite identifier persisted in state.
    type Id: CompositeId + Send + Sync;

    /// The client this resource talks to.
    type Api: ?Sized + RemoteApi<Self>;

    /// The registered type name, e.g. `gitlab_release_link`.
    const TYPE_NAME: &'static str;

    /// The schema of the resource's state.
    fn schema(&self) -> Schema;

    /// Checks that go beyond the schema. Runs before any remote call.
    fn check(&self, config: &Self::Config) -> Result<(), ProviderError> {
        let _ = config;
        Ok(())
    }

    /// The parent scope named by the configuration.
    fn scope(&self, config: &Self::Config) -> Self::Scope;

    /// Build the create payload.
    fn build_create(&self, config: &Self::Config) -> Self::CreateRequest;

    /// Build a partial update payload from the changed attributes.
    ///
    /// `None` means the resource has nothing to send remotely.
    fn build_update(&self, config: &Self::Config, changes: &ChangeSet)
        -> Option<Self::UpdateRequest>;

    /// The leaf id of a remote entity.
    fn leaf_id(&self, entity: &Self::Entity) -> Self::LeafId;

    /// Combine scope and leaf into the persisted identifier.
    fn compose_id(&self, scope: &Self::Scope, leaf: Self::LeafId) -> Self::Id;

    /// Split a persisted identifier into scope and leaf.
    fn split_id(&self, id: &Self::Id) -> (Self::Scope, Self::LeafId);

    /// Map a remote entity onto state. Every schema attribute must be present.
    fn flatten(&self, id: &Self::Id, entity: &Self::Entity) -> StateMap;

    /// Whether a difference between `old` and `new` should be ignored.
    fn suppress_diff(&self, attr: &str, old: &Value, new: &Value) -> bool {
        let _ = (attr, old, new);
        false
    }

    /// Attributes that only exist in configuration. Their last declared
    /// value is carried over every read.
    fn config_only_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Translate a failed remote create, e.g. a not-found scope.
    fn create_error(&self, err: ProviderError) -> ProviderError {
        err
    }

    /// Look up the entity for a read.
    async fn fetch(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        scope: &Self::Scope,
        leaf: Self::LeafId,
    ) -> Result<Self::Entity, ProviderError> {
        cancellable(cancel, "get", api.get(scope, leaf)).await
    }

    /// Runs after the entity is created and its identifier stored.
    async fn after_create(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        config: &Self::Config,
        scope: &Self::Scope,
        created: &Self::Entity,
    ) -> Result<(), ProviderError> {
        let _ = (api, cancel, config, scope, created);
        Ok(())
    }

    /// Runs after a remote update was sent.
    async fn after_update(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        config: &Self::Config,
        scope: &Self::Scope,
        changes: &ChangeSet,
        updated: &Self::Entity,
    ) -> Result<(), ProviderError> {
        let _ = (api, cancel, config, scope, changes, updated);
        Ok(())
    }

    /// Runs before the remote delete. A not-found error here means the entity
    /// is already gone.
    async fn before_delete(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        state: &StateMap,
        scope: &Self::Scope,
        leaf: Self::LeafId,
    ) -> Result<(), ProviderError> {
        let _ = (api, cancel, state, scope, leaf);
        Ok(())
    }
}

/// The lifecycle operations of one resource type, with configuration and
/// state passed as JSON.
#[async_trait]
pub trait ResourceLifecycle: Send + Sync {
    /// The registered type name.
    fn type_name(&self) -> &'static str;

    /// The schema of the resource's state.
    fn schema(&self) -> Schema;

    /// Create the remote entity and read it back into `store`.
    async fn create(
        &self,
        cancel: &CancellationToken,
        config: &Value,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError>;

    /// Refresh `store` from the remote entity. A vanished entity clears the
    /// stored identifier.
    async fn read(
        &self,
        cancel: &CancellationToken,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError>;

    /// Send the attributes whose declared value changed, then read back.
    async fn update(
        &self,
        cancel: &CancellationToken,
        config: &Value,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError>;

    /// Delete the remote entity. Deleting a missing entity succeeds.
    async fn delete(
        &self,
        cancel: &CancellationToken,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError>;

    /// Adopt an existing entity by its identifier.
    async fn import(
        &self,
        cancel: &CancellationToken,
        raw_id: &str,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError>;
}

/// Drives the lifecycle of one resource type against its API client.
pub struct Reconciler<R: Resource> {
    resource: R,
    api: Arc<R::Api>,
}

impl<R: Resource> Reconciler<R> {
    /// Create a reconciler.
    pub fn new(resource: R, api: Arc<R::Api>) -> Self {
        Self { resource, api }
    }

    /// The resource definition.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    fn parse_config(&self, config: &Value) -> Result<R::Config, ProviderError> {
        ensure_valid(&self.resource.schema(), config)?;
        let typed: R::Config = serde_json::from_value(config.clone())
            .map_err(|e| ProviderError::InvalidConfiguration(e.to_string()))?;
        self.resource.check(&typed)?;
        Ok(typed)
    }

    fn stored_id(&self, store: &dyn StateStore) -> Result<R::Id, ProviderError> {
        let raw = store.id().ok_or_else(|| {
            ProviderError::MalformedIdentifier(format!("no identifier stored for {}", R::TYPE_NAME))
        })?;
        R::Id::decode(raw)
    }

    /// Read the entity into `store`. Returns false if it no longer exists.
    async fn refresh(
        &self,
        cancel: &CancellationToken,
        id: &R::Id,
        prior: &StateMap,
        store: &mut dyn StateStore,
    ) -> Result<bool, ProviderError> {
        let (scope, leaf) = self.resource.split_id(id);
        match self.resource.fetch(&self.api, cancel, &scope, leaf).await {
            Ok(entity) => {
                let mut state = self.resource.flatten(id, &entity);
                for attr in self.resource.config_only_attributes() {
                    if let Some(value) = prior.get(attr).filter(|v| !v.is_null()) {
                        state.set(*attr, value.clone());
                    }
                }
                state.set(ID_ATTRIBUTE, id.encode());
                store.apply(state);
                Ok(true)
            },
            Err(e) if e.is_not_found() => {
                warn!(
                    resource_type = R::TYPE_NAME,
                    id = %id.encode(),
                    "{} not found, removing from state",
                    R::KIND
                );
                store.clear_id();
                Ok(false)
            },
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<R: Resource> ResourceLifecycle for Reconciler<R> {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.resource.schema()
    }

    #[instrument(skip_all, name = "resource.create", fields(resource_type = R::TYPE_NAME))]
    async fn create(
        &self,
        cancel: &CancellationToken,
        config: &Value,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError> {
        let typed = self.parse_config(config)?;
        let scope = self.resource.scope(&typed);
        let payload = self.resource.build_create(&typed);

        debug!(scope = ?scope, payload = ?payload, "Creating {}", R::KIND);
        let created = cancellable(cancel, "create", self.api.create(&scope, payload))
            .await
            .map_err(|e| self.resource.create_error(e))?;

        let id = self
            .resource
            .compose_id(&scope, self.resource.leaf_id(&created));
        store.set_id(id.encode());

        self.resource
            .after_create(&self.api, cancel, &typed, &scope, &created)
            .await?;

        self.refresh(cancel, &id, &StateMap::from_value(config.clone())?, store)
            .await?;
        info!(id = %id.encode(), "Create completed successfully");
        Ok(())
    }

    #[instrument(skip_all, name = "resource.read", fields(resource_type = R::TYPE_NAME))]
    async fn read(
        &self,
        cancel: &CancellationToken,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError> {
        let id = self.stored_id(store)?;
        debug!(id = %id.encode(), "Reading {}", R::KIND);
        let prior = store.snapshot();
        self.refresh(cancel, &id, &prior, store).await?;
        Ok(())
    }

    #[instrument(skip_all, name = "resource.update", fields(resource_type = R::TYPE_NAME))]
    async fn update(
        &self,
        cancel: &CancellationToken,
        config: &Value,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError> {
        let id = self.stored_id(store)?;
        let typed = self.parse_config(config)?;

        let schema = self.resource.schema();
        // Removing an attribute from configuration means its default.
        let declared = schema.with_defaults(config);
        let changes = ChangeSet::diff(&store.snapshot(), &declared, |attr, old, new| {
            self.resource.suppress_diff(attr, old, new)
        });
        if changes.is_empty() {
            debug!(id = %id.encode(), "No changes, skipping update");
            return Ok(());
        }

        if let Some(attr) = changes.attributes().find(|attr| {
            schema
                .block
                .attributes
                .get(*attr)
                .is_some_and(|a| a.force_new)
        }) {
            return Err(ProviderError::InvalidConfiguration(format!(
                "{} cannot be changed in place, the resource must be replaced",
                attr
            )));
        }

        let (scope, leaf) = self.resource.split_id(&id);
        let Some(payload) = self.resource.build_update(&typed, &changes) else {
            debug!(id = %id.encode(), "Nothing to send, recording changes locally");
            let mut state = store.snapshot();
            for change in changes.changes() {
                if let Some(after) = &change.after {
                    state.set(change.path.as_str(), after.clone());
                }
            }
            store.apply(state);
            return Ok(());
        };

        debug!(id = %id.encode(), changed = changes.len(), payload = ?payload, "Updating {}", R::KIND);
        let updated =
            cancellable(cancel, "update", self.api.update(&scope, leaf, payload)).await?;

        self.resource
            .after_update(&self.api, cancel, &typed, &scope, &changes, &updated)
            .await?;

        self.refresh(cancel, &id, &StateMap::from_value(declared)?, store)
            .await?;
        info!(id = %id.encode(), "Update completed successfully");
        Ok(())
    }

    #[instrument(skip_all, name = "resource.delete", fields(resource_type = R::TYPE_NAME))]
    async fn delete(
        &self,
        cancel: &CancellationToken,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError> {
        let id = self.stored_id(store)?;
        let (scope, leaf) = self.resource.split_id(&id);

        let prepared = self
            .resource
            .before_delete(&self.api, cancel, &store.snapshot(), &scope, leaf)
            .await;
        let result = match prepared {
            Ok(()) => {
                debug!(id = %id.encode(), "Deleting {}", R::KIND);
                cancellable(cancel, "delete", self.api.delete(&scope, leaf)).await
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => info!(id = %id.encode(), "Delete completed successfully"),
            Err(e) if e.is_not_found() => {
                warn!(id = %id.encode(), "{} already absent", R::KIND);
            },
            Err(e) => return Err(e),
        }
        store.clear_id();
        Ok(())
    }

    #[instrument(skip_all, name = "resource.import", fields(resource_type = R::TYPE_NAME))]
    async fn import(
        &self,
        cancel: &CancellationToken,
        raw_id: &str,
        store: &mut dyn StateStore,
    ) -> Result<(), ProviderError> {
        let id = R::Id::decode(raw_id)?;
        store.set_id(id.encode());

        if !self.refresh(cancel, &id, &StateMap::new(), store).await? {
            return Err(ProviderError::NotFound(format!(
                "cannot import {} {}: it does not exist",
                R::TYPE_NAME,
                raw_id
            )));
        }
        info!(id = %id.encode(), "Import completed successfully");
        Ok(())
    }
}
