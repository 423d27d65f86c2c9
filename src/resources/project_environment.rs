//! `gitlab_project_environment`: a deployment environment of a project.
//!
//! An environment must be stopped before it can be deleted. With
//! `stop_before_destroy` set, delete stops it first; otherwise delete refuses
//! to touch an environment that is still available.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::cancellable;
use crate::error::ProviderError;
use crate::identifier::{CompositeId, ResourceId};
use crate::remote::{Endpoint, RemoteApi};
use crate::resource::Resource;
use crate::schema::{render_value_list, Attribute, Schema};
use crate::state::{format_timestamp, ChangeSet, StateMap};
use crate::validation::check_http_url;

/// Registered type name.
pub const TYPE_NAME: &str = "gitlab_project_environment";

/// States an environment reports.
pub const ENVIRONMENT_STATES: [&str; 2] = ["available", "stopped"];

const STOPPED: &str = "stopped";

/// An environment as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentEntity {
    /// Leaf id.
    pub id: u64,
    /// Environment name.
    pub name: String,
    /// URL-safe form of the name.
    pub slug: String,
    /// Link shown for the environment.
    pub external_url: String,
    /// `available` or `stopped`.
    pub state: String,
    /// Creation time.
    pub created_at: Option<OffsetDateTime>,
    /// Last update time.
    pub updated_at: Option<OffsetDateTime>,
}

/// `project:environment_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentId {
    /// Project id or full path.
    pub project: String,
    /// Leaf id.
    pub environment_id: u64,
}

impl CompositeId for EnvironmentId {
    const ARITY: usize = 2;
    const FORMAT: &'static str = "project:environment_id";

    fn to_resource_id(&self) -> ResourceId {
        ResourceId::default()
            .with_key(self.project.as_str())
            .with_leaf(self.environment_id)
    }

    fn from_resource_id(id: &ResourceId) -> Result<Self, ProviderError> {
        Ok(Self {
            project: id.key(0)?.to_string(),
            environment_id: id.leaf(1)?,
        })
    }
}

/// Declared configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    /// Project id or full path.
    pub project: String,
    /// Environment name.
    pub name: String,
    /// Link shown for the environment.
    #[serde(default)]
    pub external_url: Option<String>,
    /// Stop the environment before deleting it.
    #[serde(default)]
    pub stop_before_destroy: bool,
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEnvironment {
    /// Environment name.
    pub name: String,
    /// Link shown for the environment.
    pub external_url: Option<String>,
}

/// Update payload. The name is always sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEnvironment {
    /// Environment name.
    pub name: String,
    /// New link, if it changed.
    pub external_url: Option<String>,
}

/// Environment endpoints beyond CRUD.
#[async_trait]
pub trait EnvironmentApi: RemoteApi<ProjectEnvironment> {
    /// Stop an environment.
    async fn stop(
        &self,
        project: &str,
        environment_id: u64,
    ) -> Result<EnvironmentEntity, ProviderError>;
}

/// The `gitlab_project_environment` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectEnvironment;

impl Endpoint for ProjectEnvironment {
    const KIND: &'static str = "environment";
    type Scope = String;
    type LeafId = u64;
    type Entity = EnvironmentEntity;
    type CreateRequest = CreateEnvironment;
    type UpdateRequest = UpdateEnvironment;
}

#[async_trait]
impl Resource for ProjectEnvironment {
    type Config = EnvironmentConfig;
    type Id = EnvironmentId;
    type Api = dyn EnvironmentApi;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages the lifecycle of an environment in a project.")
            .with_attribute(
                "project",
                Attribute::required_string()
                    .with_description("The ID or full path of the project to environment is created for.")
                    .with_force_new()
                    .non_empty(),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the environment.")
                    .with_force_new()
                    .non_empty(),
            )
            .with_attribute(
                "external_url",
                Attribute::optional_string().with_description("Place to link to for this environment."),
            )
            .with_attribute(
                "slug",
                Attribute::computed_string()
                    .with_description("The name of the environment in lowercase, shortened to 63 bytes."),
            )
            .with_attribute(
                "created_at",
                Attribute::computed_string()
                    .with_description("The ISO8601 date/time that this environment was created at in UTC."),
            )
            .with_attribute(
                "updated_at",
                Attribute::computed_string().with_description(
                    "The ISO8601 date/time that this environment was last updated at in UTC.",
                ),
            )
            .with_attribute(
                "state",
                Attribute::computed_string().with_description(format!(
                    "State the environment is in. Valid values are {}.",
                    render_value_list(&ENVIRONMENT_STATES)
                )),
            )
            .with_attribute(
                "stop_before_destroy",
                Attribute::optional_bool()
                    .with_description(
                        "Determines whether the environment is attempted to be stopped before the environment is deleted.",
                    )
                    .with_default(json!(false)),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    fn check(&self, config: &EnvironmentConfig) -> Result<(), ProviderError> {
        if let Some(url) = &config.external_url {
            check_http_url("external_url", url)?;
        }
        Ok(())
    }

    fn scope(&self, config: &EnvironmentConfig) -> String {
        config.project.clone()
    }

    fn build_create(&self, config: &EnvironmentConfig) -> CreateEnvironment {
        CreateEnvironment {
            name: config.name.clone(),
            external_url: config.external_url.clone(),
        }
    }

    fn build_update(
        &self,
        config: &EnvironmentConfig,
        changes: &ChangeSet,
    ) -> Option<UpdateEnvironment> {
        changes.contains("external_url").then(|| UpdateEnvironment {
            name: config.name.clone(),
            external_url: config.external_url.clone(),
        })
    }

    fn leaf_id(&self, entity: &EnvironmentEntity) -> u64 {
        entity.id
    }

    fn compose_id(&self, scope: &String, leaf: u64) -> EnvironmentId {
        EnvironmentId {
            project: scope.clone(),
            environment_id: leaf,
        }
    }

    fn split_id(&self, id: &EnvironmentId) -> (String, u64) {
        (id.project.clone(), id.environment_id)
    }

    fn flatten(&self, id: &EnvironmentId, entity: &EnvironmentEntity) -> StateMap {
        StateMap::new()
            .with("project", id.project.as_str())
            .with("name", entity.name.as_str())
            .with("external_url", entity.external_url.as_str())
            .with("slug", entity.slug.as_str())
            .with("state", entity.state.as_str())
            .with("created_at", format_timestamp(entity.created_at))
            .with("updated_at", format_timestamp(entity.updated_at))
            .with("stop_before_destroy", false)
    }

    fn config_only_attributes(&self) -> &'static [&'static str] {
        &["stop_before_destroy"]
    }

    fn create_error(&self, err: ProviderError) -> ProviderError {
        if err.is_not_found() {
            ProviderError::FailedPrecondition("feature Environments is not available".to_string())
        } else {
            err
        }
    }

    async fn before_delete(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        state: &StateMap,
        scope: &String,
        leaf: u64,
    ) -> Result<(), ProviderError> {
        if state.get_bool("stop_before_destroy").unwrap_or(false) {
            debug!(project = %scope, environment_id = leaf, "Stopping environment before destruction");
            cancellable(cancel, "stop", api.stop(scope, leaf)).await?;
            return Ok(());
        }

        let environment = cancellable(cancel, "get", api.get(scope, leaf)).await?;
        if environment.state != STOPPED {
            return Err(ProviderError::FailedPrecondition(format!(
                "cannot destroy gitlab project {} environment {}: Environment must be in a stopped state before deletion. \
                 Set stop_before_destroy flag to attempt to auto stop the environment on destruction",
                scope, leaf
            )));
        }
        Ok(())
    }
}
