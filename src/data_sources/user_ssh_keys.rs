//! `gitlab_user_sshkeys` data source: the SSH keys of one user.
//!
//! The user is named either by id or by username, never both.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::data_source::{parse_config, DataSource};
use crate::error::ProviderError;
use crate::pagination::collect_pages;
use crate::remote::{PageRequest, DEFAULT_PER_PAGE};
use crate::resource::ID_ATTRIBUTE;
use crate::resources::user_ssh_key::{ssh_key_block, ssh_key_state};
use crate::resources::UserSshKeyApi;
use crate::schema::{Attribute, AttributeFlags, AttributeType, NestedBlock, Schema};
use crate::state::StateMap;

/// Registered type name.
pub const TYPE_NAME: &str = "gitlab_user_sshkeys";

#[derive(Debug, Deserialize)]
struct Lookup {
    #[serde(default)]
    user_id: Option<u64>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug)]
enum User {
    Id(u64),
    Username(String),
}

impl Lookup {
    fn user(self) -> Result<User, ProviderError> {
        match (self.user_id.filter(|id| *id != 0), self.username) {
            (Some(id), None) => Ok(User::Id(id)),
            (None, Some(name)) if !name.is_empty() => Ok(User::Username(name.to_lowercase())),
            _ => Err(ProviderError::InvalidConfiguration(
                "one and only one of user_id or username must be set".to_string(),
            )),
        }
    }
}

/// Lists the SSH keys of a user.
pub struct UserSshKeysDataSource {
    api: Arc<dyn UserSshKeyApi>,
}

impl UserSshKeysDataSource {
    /// Create the data source.
    pub fn new(api: Arc<dyn UserSshKeyApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for UserSshKeysDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Get information about the SSH keys of a user.")
            .with_attribute(
                "user_id",
                Attribute::new(AttributeType::Int64, AttributeFlags::optional_computed())
                    .with_description("ID of the user to get the SSH keys for."),
            )
            .with_attribute(
                "username",
                Attribute::new(AttributeType::String, AttributeFlags::optional_computed())
                    .with_description("Username of the user to get the SSH keys for."),
            )
            .with_block(
                "keys",
                NestedBlock::list(ssh_key_block().with_description("The user's keys.")).computed(),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    #[instrument(skip_all, name = "data_source.read", fields(data_source_type = TYPE_NAME))]
    async fn read(
        &self,
        cancel: &CancellationToken,
        config: &Value,
    ) -> Result<StateMap, ProviderError> {
        let lookup: Lookup = parse_config(&self.schema(), config)?;
        let user = lookup.user()?;
        let first = PageRequest::first(DEFAULT_PER_PAGE);

        let keys = match &user {
            User::Id(id) => collect_pages(cancel, first, |request| self.api.list(id, request)).await?,
            User::Username(name) => {
                collect_pages(cancel, first, |request| {
                    self.api.list_for_username(name, request)
                })
                .await?
            },
        };
        debug!(user = ?user, count = keys.len(), "Listed ssh keys");

        let keys: Vec<Value> = keys.iter().map(|key| ssh_key_state(key).to_value()).collect();
        let state = StateMap::new().with("keys", keys);
        Ok(match user {
            User::Id(id) => state
                .with("user_id", id)
                .with("username", "")
                .with(ID_ATTRIBUTE, id.to_string()),
            User::Username(name) => state
                .with("user_id", 0u64)
                .with("username", name.as_str())
                .with(ID_ATTRIBUTE, name),
        })
    }
}
