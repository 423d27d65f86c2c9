//! `gitlab_user_sshkey`: an SSH key assigned to a user.
//!
//! GitLab has no endpoint for a single key of another user, so reads walk
//! the user's key listing until the key id shows up.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::identifier::{CompositeId, ResourceId};
use crate::pagination::find_in_pages;
use crate::remote::{Endpoint, Page, PageRequest, RemoteApi};
use crate::resource::Resource;
use crate::schema::{Attribute, Block, Schema};
use crate::state::{format_timestamp, ChangeSet, StateMap};
use crate::validation::check_rfc3339;

/// Registered type name.
pub const TYPE_NAME: &str = "gitlab_user_sshkey";

/// An SSH key as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyEntity {
    /// Key id.
    pub id: u64,
    /// Key title.
    pub title: String,
    /// Key body. GitLab replaces the comment with the user and host name.
    pub key: String,
    /// Creation time.
    pub created_at: Option<OffsetDateTime>,
    /// Expiration time.
    pub expires_at: Option<OffsetDateTime>,
}

/// `user_id:key_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSshKeyId {
    /// Owning user.
    pub user_id: u64,
    /// Key id.
    pub key_id: u64,
}

impl CompositeId for UserSshKeyId {
    const ARITY: usize = 2;
    const FORMAT: &'static str = "user_id:key_id";

    fn to_resource_id(&self) -> ResourceId {
        ResourceId::default()
            .with_leaf(self.user_id)
            .with_leaf(self.key_id)
    }

    fn from_resource_id(id: &ResourceId) -> Result<Self, ProviderError> {
        Ok(Self {
            user_id: id.leaf(0)?,
            key_id: id.leaf(1)?,
        })
    }
}

/// Declared configuration.
#[derive(Debug, Clone, Deserialize)]
#[allow(missing_docs)]
pub struct UserSshKeyConfig {
    pub user_id: u64,
    pub title: String,
    pub key: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CreateSshKey {
    pub title: String,
    pub key: String,
    pub expires_at: Option<OffsetDateTime>,
}

/// SSH key endpoints beyond CRUD.
#[async_trait]
pub trait UserSshKeyApi: RemoteApi<UserSshKey> {
    /// List the keys of the user with `username`.
    async fn list_for_username(
        &self,
        username: &str,
        page: PageRequest,
    ) -> Result<Page<SshKeyEntity>, ProviderError>;
}

/// The `gitlab_user_sshkey` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserSshKey;

impl Endpoint for UserSshKey {
    const KIND: &'static str = "ssh key";
    type Scope = u64;
    type LeafId = u64;
    type Entity = SshKeyEntity;
    type CreateRequest = CreateSshKey;
    type UpdateRequest = ();
}

/// The attributes of one key, shared with the `gitlab_user_sshkeys` data
/// source.
pub fn ssh_key_block() -> Block {
    Block::new()
        .with_attribute(
            "key_id",
            Attribute::computed_int64().with_description("The ID of the ssh key."),
        )
        .with_attribute(
            "title",
            Attribute::computed_string().with_description("The title of the ssh key."),
        )
        .with_attribute(
            "key",
            Attribute::computed_string().with_description("The ssh key."),
        )
        .with_attribute(
            "expires_at",
            Attribute::computed_string().with_description("The expiration date of the SSH key."),
        )
        .with_attribute(
            "created_at",
            Attribute::computed_string()
                .with_description("The time when this key was created in GitLab."),
        )
}

/// Flatten one key without its owner.
pub fn ssh_key_state(key: &SshKeyEntity) -> StateMap {
    StateMap::new()
        .with("key_id", key.id)
        .with("title", key.title.as_str())
        .with("key", key.key.as_str())
        .with("expires_at", format_timestamp(key.expires_at))
        .with("created_at", format_timestamp(key.created_at))
}

/// Whether two keys match on type and data. The trailing comment is ignored;
/// keys with fewer than two fields must match exactly.
pub fn same_key_material(old: &str, new: &str) -> bool {
    let old_parts: Vec<&str> = old.split_whitespace().collect();
    let new_parts: Vec<&str> = new.split_whitespace().collect();
    if old_parts.len() < 2 || new_parts.len() < 2 {
        return old == new;
    }
    old_parts[..2] == new_parts[..2]
}

fn same_instant(old: &str, new: &str) -> bool {
    match (
        OffsetDateTime::parse(old, &Rfc3339),
        OffsetDateTime::parse(new, &Rfc3339),
    ) {
        (Ok(old), Ok(new)) => old == new,
        _ => false,
    }
}

#[async_trait]
impl Resource for UserSshKey {
    type Config = UserSshKeyConfig;
    type Id = UserSshKeyId;
    type Api = dyn UserSshKeyApi;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Manages the lifecycle of an SSH key assigned to a user.")
            .with_attribute(
                "user_id",
                Attribute::required_int64()
                    .with_description("The ID of the user to add the ssh key to.")
                    .with_force_new(),
            )
            .with_attribute(
                "title",
                Attribute::required_string()
                    .with_description("The title of the ssh key.")
                    .with_force_new(),
            )
            .with_attribute(
                "key",
                Attribute::required_string()
                    .with_description(
                        "The ssh key. The SSH key `comment` (trailing part) is optional and ignored for diffing, \
                         because GitLab overrides it with the username and GitLab hostname.",
                    )
                    .with_force_new(),
            )
            .with_attribute(
                "expires_at",
                Attribute::optional_string()
                    .with_description("The expiration date of the SSH key in ISO 8601 format (YYYY-MM-DDTHH:MM:SSZ)")
                    .with_force_new(),
            )
            .with_attribute(
                "key_id",
                Attribute::computed_int64().with_description("The ID of the ssh key."),
            )
            .with_attribute(
                "created_at",
                Attribute::computed_string()
                    .with_description("The time when this key was created in GitLab."),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    fn check(&self, config: &UserSshKeyConfig) -> Result<(), ProviderError> {
        if let Some(expires_at) = &config.expires_at {
            check_rfc3339("expires_at", expires_at)?;
        }
        Ok(())
    }

    fn scope(&self, config: &UserSshKeyConfig) -> u64 {
        config.user_id
    }

    fn build_create(&self, config: &UserSshKeyConfig) -> CreateSshKey {
        CreateSshKey {
            title: config.title.clone(),
            key: config.key.clone(),
            expires_at: config
                .expires_at
                .as_deref()
                .and_then(|ts| OffsetDateTime::parse(ts, &Rfc3339).ok()),
        }
    }

    fn build_update(&self, _config: &UserSshKeyConfig, _changes: &ChangeSet) -> Option<()> {
        None
    }

    fn leaf_id(&self, entity: &SshKeyEntity) -> u64 {
        entity.id
    }

    fn compose_id(&self, scope: &u64, leaf: u64) -> UserSshKeyId {
        UserSshKeyId {
            user_id: *scope,
            key_id: leaf,
        }
    }

    fn split_id(&self, id: &UserSshKeyId) -> (u64, u64) {
        (id.user_id, id.key_id)
    }

    fn flatten(&self, id: &UserSshKeyId, entity: &SshKeyEntity) -> StateMap {
        ssh_key_state(entity).with("user_id", id.user_id)
    }

    fn suppress_diff(&self, attr: &str, old: &Value, new: &Value) -> bool {
        match (attr, old.as_str(), new.as_str()) {
            ("key", Some(old), Some(new)) => same_key_material(old, new),
            ("expires_at", Some(old), Some(new)) => same_instant(old, new),
            _ => false,
        }
    }

    async fn fetch(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        scope: &u64,
        leaf: u64,
    ) -> Result<SshKeyEntity, ProviderError> {
        let found = find_in_pages(
            cancel,
            PageRequest::default(),
            |request| api.list(scope, request),
            |key: &SshKeyEntity| key.id == leaf,
        )
        .await?;
        found.ok_or_else(|| {
            ProviderError::NotFound(format!("could not find sshkey {} for user {}", leaf, scope))
        })
    }
}
