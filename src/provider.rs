//! The provider: a registry of resource and data source types and dispatch
//! by type name.
//!
//! State crosses this boundary as JSON objects, the way the orchestrating
//! engine persists it between calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::cancellable;
use crate::config::ProviderConfig;
use crate::data_source::DataSource;
use crate::data_sources::{ReleaseLinkDataSource, ReleaseLinksDataSource, UserSshKeysDataSource};
use crate::error::ProviderError;
use crate::remote::RemoteApi;
use crate::resource::{Reconciler, ResourceLifecycle};
use crate::resources::{
    DeployKey, EnvironmentApi, IssueBoardApi, ProjectEnvironment, ProjectIssueBoard, ReleaseLink,
    UserSshKey, UserSshKeyApi,
};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::state::{MemoryStateStore, StateMap, StateStore};
use crate::types::{ImportedResource, ProviderMetadata};
use crate::validation::validate;

/// Registered resource and data source types, fixed once built.
pub struct Registry {
    resources: BTreeMap<&'static str, Arc<dyn ResourceLifecycle>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The resource registered as `type_name`.
    pub fn resource(&self, type_name: &str) -> Result<&dyn ResourceLifecycle, ProviderError> {
        self.resources
            .get(type_name)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// The data source registered as `type_name`.
    pub fn data_source(&self, type_name: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(type_name)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Resource type names in order.
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    /// Data source type names in order.
    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    resources: Vec<Arc<dyn ResourceLifecycle>>,
    data_sources: Vec<Arc<dyn DataSource>>,
}

impl RegistryBuilder {
    /// Register a resource type.
    pub fn resource(mut self, resource: impl ResourceLifecycle + 'static) -> Self {
        self.resources.push(Arc::new(resource));
        self
    }

    /// Register a data source type.
    pub fn data_source(mut self, data_source: impl DataSource + 'static) -> Self {
        self.data_sources.push(Arc::new(data_source));
        self
    }

    /// Finish the registry. Registering a type name twice is an error.
    pub fn build(self) -> Result<Registry, ProviderError> {
        let mut resources = BTreeMap::new();
        for resource in self.resources {
            let name = resource.type_name();
            if resources.insert(name, resource).is_some() {
                return Err(ProviderError::InvalidConfiguration(format!(
                    "resource type {} is registered twice",
                    name
                )));
            }
        }

        let mut data_sources = BTreeMap::new();
        for data_source in self.data_sources {
            let name = data_source.type_name();
            if data_sources.insert(name, data_source).is_some() {
                return Err(ProviderError::InvalidConfiguration(format!(
                    "data source type {} is registered twice",
                    name
                )));
            }
        }

        Ok(Registry {
            resources,
            data_sources,
        })
    }
}

/// API clients for every endpoint family.
#[derive(Clone)]
pub struct Clients {
    /// Release links.
    pub release_links: Arc<dyn RemoteApi<ReleaseLink>>,
    /// Project environments.
    pub environments: Arc<dyn EnvironmentApi>,
    /// Deploy keys.
    pub deploy_keys: Arc<dyn RemoteApi<DeployKey>>,
    /// Issue boards and their lists.
    pub issue_boards: Arc<dyn IssueBoardApi>,
    /// User SSH keys.
    pub ssh_keys: Arc<dyn UserSshKeyApi>,
}

/// Every resource and data source of the provider, wired to `clients`.
pub fn default_registry(clients: &Clients) -> Result<Registry, ProviderError> {
    Registry::builder()
        .resource(Reconciler::new(ReleaseLink, clients.release_links.clone()))
        .resource(Reconciler::new(ProjectEnvironment, clients.environments.clone()))
        .resource(Reconciler::new(DeployKey, clients.deploy_keys.clone()))
        .resource(Reconciler::new(ProjectIssueBoard, clients.issue_boards.clone()))
        .resource(Reconciler::new(UserSshKey, clients.ssh_keys.clone()))
        .data_source(ReleaseLinkDataSource::new(clients.release_links.clone()))
        .data_source(ReleaseLinksDataSource::new(clients.release_links.clone()))
        .data_source(UserSshKeysDataSource::new(clients.ssh_keys.clone()))
        .build()
}

/// Verifies credentials while configuring.
#[async_trait]
pub trait AuthCheck: Send + Sync {
    /// Resolve the user the configured token belongs to.
    async fn current_user(&self, config: &ProviderConfig) -> Result<String, ProviderError>;
}

/// The GitLab provider.
pub struct GitlabProvider {
    registry: Registry,
    config: RwLock<Option<ProviderConfig>>,
    auth_check: Option<Arc<dyn AuthCheck>>,
}

impl GitlabProvider {
    /// Create a provider over `registry`.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            config: RwLock::new(None),
            auth_check: None,
        }
    }

    /// Create a provider with every type wired to `clients`.
    pub fn with_clients(clients: &Clients) -> Result<Self, ProviderError> {
        default_registry(clients).map(Self::new)
    }

    /// Verify credentials with `check` when `early_auth_check` is on.
    pub fn with_auth_check(mut self, check: Arc<dyn AuthCheck>) -> Self {
        self.auth_check = Some(check);
        self
    }

    /// The registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The active configuration, once configured.
    pub async fn config(&self) -> Option<ProviderConfig> {
        self.config.read().await.clone()
    }

    /// Schemas of the provider configuration and every registered type.
    pub fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for (name, resource) in &self.registry.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.registry.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    /// Registered type names.
    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.registry.resource_types().map(String::from).collect(),
            data_sources: self
                .registry
                .data_source_types()
                .map(String::from)
                .collect(),
        }
    }

    /// Configure from declared values, falling back to the process
    /// environment.
    pub async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        self.configure_with_env(config, |name| std::env::var(name).ok())
            .await
    }

    /// Configure with an explicit environment lookup.
    ///
    /// Problems with the configuration come back as diagnostics and leave
    /// the previous configuration in place.
    #[instrument(skip_all, name = "provider.configure")]
    pub async fn configure_with_env<F>(
        &self,
        config: Value,
        env: F,
    ) -> Result<Vec<Diagnostic>, ProviderError>
    where
        F: Fn(&str) -> Option<String> + Send,
    {
        let parsed = match ProviderConfig::from_value(&config, env) {
            Ok(parsed) => parsed,
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                return Ok(diagnostics);
            },
        };

        if parsed.early_auth_check {
            if let Some(check) = &self.auth_check {
                match check.current_user(&parsed).await {
                    Ok(user) => debug!(user = %user, "Verified GitLab credentials"),
                    Err(e) => {
                        error!(error = %e, "Early auth check failed");
                        return Ok(vec![Diagnostic::error("Failed to verify GitLab credentials")
                            .with_detail(e.to_string())]);
                    },
                }
            }
        }

        debug!(config = ?parsed, "Configuration accepted");
        *self.config.write().await = Some(parsed);
        info!("Configure completed successfully");
        Ok(Vec::new())
    }

    /// Check a resource configuration against its schema.
    pub fn validate_resource_config(
        &self,
        resource_type: &str,
        config: &Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        Ok(validate(&resource.schema(), config))
    }

    /// Check a data source configuration against its schema.
    pub fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: &Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.registry.data_source(data_source_type)?;
        Ok(validate(&data_source.schema(), config))
    }

    /// Create a resource and return its state.
    #[instrument(skip(self, cancel, config), name = "provider.create")]
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let mut store = MemoryStateStore::new();
        resource.create(cancel, &config, &mut store).await?;
        Ok(store.snapshot().to_value())
    }

    /// Refresh a resource. `None` means it no longer exists.
    #[instrument(skip(self, cancel, current_state), name = "provider.read")]
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let mut store = MemoryStateStore::from_state(StateMap::from_value(current_state)?);
        resource.read(cancel, &mut store).await?;
        Ok(store.id().is_some().then(|| store.snapshot().to_value()))
    }

    /// Converge a resource on `config` and return its new state.
    #[instrument(skip(self, cancel, prior_state, config), name = "provider.update")]
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let mut store = MemoryStateStore::from_state(StateMap::from_value(prior_state)?);
        resource.update(cancel, &config, &mut store).await?;
        Ok(store.snapshot().to_value())
    }

    /// Delete a resource.
    #[instrument(skip(self, cancel, current_state), name = "provider.delete")]
    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let mut store = MemoryStateStore::from_state(StateMap::from_value(current_state)?);
        resource.delete(cancel, &mut store).await
    }

    /// Adopt an existing entity by its identifier.
    #[instrument(skip(self, cancel), name = "provider.import")]
    pub async fn import_resource(
        &self,
        cancel: &CancellationToken,
        resource_type: &str,
        id: &str,
    ) -> Result<ImportedResource, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let mut store = MemoryStateStore::new();
        resource.import(cancel, id, &mut store).await?;
        Ok(ImportedResource::new(
            resource_type,
            store.snapshot().to_value(),
        ))
    }

    /// Read a data source.
    #[instrument(skip(self, cancel, config), name = "provider.read_data_source")]
    pub async fn read_data_source(
        &self,
        cancel: &CancellationToken,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.registry.data_source(data_source_type)?;
        let state = cancellable(cancel, "read", data_source.read(cancel, &config)).await?;
        Ok(state.to_value())
    }
}
