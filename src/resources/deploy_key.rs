//! `gitlab_deploy_key`: an SSH key granted access to a single project.
//!
//! Every attribute forces replacement, so there is no in-place update.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::identifier::{CompositeId, ResourceId};
use crate::remote::{Endpoint, RemoteApi};
use crate::resource::Resource;
use crate::schema::{Attribute, Schema};
use crate::state::{ChangeSet, StateMap};

/// Registered type name.
pub const TYPE_NAME: &str = "gitlab_deploy_key";

/// A deploy key as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployKeyEntity {
    /// Leaf id.
    pub id: u64,
    /// Key title.
    pub title: String,
    /// Public key body.
    pub key: String,
    /// Whether the key may push.
    pub can_push: bool,
}

/// `project:deploy_key_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployKeyId {
    /// Project id or full path.
    pub project: String,
    /// Leaf id.
    pub deploy_key_id: u64,
}

impl CompositeId for DeployKeyId {
    const ARITY: usize = 2;
    const FORMAT: &'static str = "project:deploy_key_id";

    fn to_resource_id(&self) -> ResourceId {
        ResourceId::default()
            .with_key(self.project.as_str())
            .with_leaf(self.deploy_key_id)
    }

    fn from_resource_id(id: &ResourceId) -> Result<Self, ProviderError> {
        Ok(Self {
            project: id.key(0)?.to_string(),
            deploy_key_id: id.leaf(1)?,
        })
    }
}

/// Declared configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployKeyConfig {
    /// Project id or full path.
    pub project: String,
    /// Key title.
    pub title: String,
    /// Public key body, possibly with surrounding whitespace.
    pub key: String,
    /// Whether the key may push.
    #[serde(default)]
    pub can_push: bool,
}

/// Create payload. The key body is sent trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CreateDeployKey {
    pub title: String,
    pub key: String,
    pub can_push: bool,
}

/// The `gitlab_deploy_key` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployKey;

impl Endpoint for DeployKey {
    const KIND: &'static str = "deploy key";
    type Scope = String;
    type LeafId = u64;
    type Entity = DeployKeyEntity;
    type CreateRequest = CreateDeployKey;
    type UpdateRequest = ();
}

#[async_trait]
impl Resource for DeployKey {
    type Config = DeployKeyConfig;
    type Id = DeployKeyId;
    type Api = dyn RemoteApi<DeployKey>;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "Manages the lifecycle of a deploy key. To enable an already existing deploy key \
                 for another project use the `gitlab_project_deploy_key` resource.",
            )
            .with_attribute(
                "project",
                Attribute::required_string()
                    .with_description("The name or id of the project to add the deploy key to.")
                    .with_force_new()
                    .non_empty(),
            )
            .with_attribute(
                "title",
                Attribute::required_string()
                    .with_description("A title to describe the deploy key with.")
                    .with_force_new(),
            )
            .with_attribute(
                "key",
                Attribute::required_string()
                    .with_description("The public ssh key body.")
                    .with_force_new(),
            )
            .with_attribute(
                "can_push",
                Attribute::optional_bool()
                    .with_description(
                        "Allow this deploy key to be used to push changes to the project. Defaults to `false`.",
                    )
                    .with_default(json!(false))
                    .with_force_new(),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    fn scope(&self, config: &DeployKeyConfig) -> String {
        config.project.clone()
    }

    fn build_create(&self, config: &DeployKeyConfig) -> CreateDeployKey {
        CreateDeployKey {
            title: config.title.clone(),
            key: config.key.trim().to_string(),
            can_push: config.can_push,
        }
    }

    fn build_update(&self, _config: &DeployKeyConfig, _changes: &ChangeSet) -> Option<()> {
        None
    }

    fn leaf_id(&self, entity: &DeployKeyEntity) -> u64 {
        entity.id
    }

    fn compose_id(&self, scope: &String, leaf: u64) -> DeployKeyId {
        DeployKeyId {
            project: scope.clone(),
            deploy_key_id: leaf,
        }
    }

    fn split_id(&self, id: &DeployKeyId) -> (String, u64) {
        (id.project.clone(), id.deploy_key_id)
    }

    fn flatten(&self, id: &DeployKeyId, entity: &DeployKeyEntity) -> StateMap {
        StateMap::new()
            .with("project", id.project.as_str())
            .with("title", entity.title.as_str())
            .with("key", entity.key.as_str())
            .with("can_push", entity.can_push)
    }

    fn suppress_diff(&self, attr: &str, old: &Value, new: &Value) -> bool {
        match (attr, old.as_str(), new.as_str()) {
            ("key", Some(old), Some(new)) => old == new.trim(),
            _ => false,
        }
    }
}
