//! `gitlab_project_issue_board`: an issue board of a project and its lists.
//!
//! Scoping a board (assignee, milestone, labels, weight) is only possible
//! through an update, so create sends the name first and scopes the board in
//! a second call. There is no way to tell which list changed, so any change
//! to `lists` deletes every list and recreates them in declared order.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::cancellable;
use crate::error::ProviderError;
use crate::identifier::{CompositeId, ResourceId};
use crate::remote::{Endpoint, RemoteApi};
use crate::resource::Resource;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::state::{ChangeSet, StateMap};

/// Registered type name.
pub const TYPE_NAME: &str = "gitlab_project_issue_board";

/// Scope ids a board list can carry.
const LIST_SCOPES: [&str; 4] = ["label_id", "assignee_id", "milestone_id", "iteration_id"];

/// An issue board as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueBoardEntity {
    /// Leaf id.
    pub id: u64,
    /// Board name.
    pub name: String,
    /// Scoped assignee.
    pub assignee_id: Option<u64>,
    /// Scoped milestone.
    pub milestone_id: Option<u64>,
    /// Scoped label names.
    pub labels: Vec<String>,
    /// Scoped weight.
    pub weight: i64,
    /// Lists in the order the API returned them.
    pub lists: Vec<BoardListEntity>,
}

/// One list of a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardListEntity {
    /// List id.
    pub id: u64,
    /// Position within the board.
    pub position: i64,
    /// Label the list is scoped to.
    pub label_id: Option<u64>,
    /// Assignee the list is scoped to.
    pub assignee_id: Option<u64>,
    /// Milestone the list is scoped to.
    pub milestone_id: Option<u64>,
    /// Iteration the list is scoped to.
    pub iteration_id: Option<u64>,
}

/// `project:board_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueBoardId {
    /// Project id or full path.
    pub project: String,
    /// Leaf id.
    pub board_id: u64,
}

impl CompositeId for IssueBoardId {
    const ARITY: usize = 2;
    const FORMAT: &'static str = "project:issue_board_id";

    fn to_resource_id(&self) -> ResourceId {
        ResourceId::default()
            .with_key(self.project.as_str())
            .with_leaf(self.board_id)
    }

    fn from_resource_id(id: &ResourceId) -> Result<Self, ProviderError> {
        Ok(Self {
            project: id.key(0)?.to_string(),
            board_id: id.leaf(1)?,
        })
    }
}

/// Declared configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueBoardConfig {
    /// Project id or full path.
    pub project: String,
    /// Board name.
    pub name: String,
    /// Scoped assignee.
    #[serde(default)]
    pub assignee_id: Option<u64>,
    /// Scoped milestone.
    #[serde(default)]
    pub milestone_id: Option<u64>,
    /// Scoped label names.
    #[serde(default)]
    pub labels: Option<BTreeSet<String>>,
    /// Scoped weight.
    #[serde(default)]
    pub weight: Option<i64>,
    /// Lists in board order.
    #[serde(default)]
    pub lists: Option<Vec<BoardListConfig>>,
}

impl IssueBoardConfig {
    fn declared_lists(&self) -> &[BoardListConfig] {
        self.lists.as_deref().unwrap_or_default()
    }
}

/// One declared list. Zero ids count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[allow(missing_docs)]
pub struct BoardListConfig {
    #[serde(default)]
    pub label_id: Option<u64>,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    #[serde(default)]
    pub milestone_id: Option<u64>,
    #[serde(default)]
    pub iteration_id: Option<u64>,
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIssueBoard {
    /// Board name.
    pub name: String,
}

/// Partial update payload. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct UpdateIssueBoard {
    pub name: Option<String>,
    pub assignee_id: Option<u64>,
    pub milestone_id: Option<u64>,
    pub labels: Option<Vec<String>>,
    pub weight: Option<i64>,
}

impl UpdateIssueBoard {
    /// Whether the payload would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Payload for a new board list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CreateBoardList {
    pub label_id: Option<u64>,
    pub assignee_id: Option<u64>,
    pub milestone_id: Option<u64>,
    pub iteration_id: Option<u64>,
}

impl From<&BoardListConfig> for CreateBoardList {
    fn from(list: &BoardListConfig) -> Self {
        let set = |id: Option<u64>| id.filter(|id| *id != 0);
        Self {
            label_id: set(list.label_id),
            assignee_id: set(list.assignee_id),
            milestone_id: set(list.milestone_id),
            iteration_id: set(list.iteration_id),
        }
    }
}

/// Board list endpoints.
#[async_trait]
pub trait IssueBoardApi: RemoteApi<ProjectIssueBoard> {
    /// Append a list to a board.
    async fn create_list(
        &self,
        project: &str,
        board_id: u64,
        list: CreateBoardList,
    ) -> Result<BoardListEntity, ProviderError>;

    /// Remove a list from a board.
    async fn delete_list(
        &self,
        project: &str,
        board_id: u64,
        list_id: u64,
    ) -> Result<(), ProviderError>;
}

/// The `gitlab_project_issue_board` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectIssueBoard;

impl Endpoint for ProjectIssueBoard {
    const KIND: &'static str = "issue board";
    type Scope = String;
    type LeafId = u64;
    type Entity = IssueBoardEntity;
    type CreateRequest = CreateIssueBoard;
    type UpdateRequest = UpdateIssueBoard;
}

/// The scoping fields a freshly created board still needs.
fn scoping_update(config: &IssueBoardConfig) -> UpdateIssueBoard {
    UpdateIssueBoard {
        name: None,
        assignee_id: config.assignee_id.filter(|id| *id != 0),
        milestone_id: config.milestone_id.filter(|id| *id != 0),
        labels: config
            .labels
            .as_ref()
            .filter(|labels| !labels.is_empty())
            .map(|labels| labels.iter().cloned().collect()),
        weight: config.weight.filter(|w| *w != 0),
    }
}

fn with_list_context(err: ProviderError, context: String) -> ProviderError {
    match err {
        ProviderError::Remote(msg) => ProviderError::Remote(format!("{}: {}", context, msg)),
        other => other,
    }
}

async fn create_lists(
    api: &dyn IssueBoardApi,
    cancel: &CancellationToken,
    project: &str,
    board: &IssueBoardEntity,
    lists: &[BoardListConfig],
) -> Result<(), ProviderError> {
    for (i, list) in lists.iter().enumerate() {
        let position = i + 1;
        debug!(project, board_id = board.id, position, "Creating board list");
        cancellable(
            cancel,
            "create list",
            api.create_list(project, board.id, CreateBoardList::from(list)),
        )
        .await
        .map_err(|e| {
            with_list_context(
                e,
                format!(
                    "failed to create list at position {} for Project Issue Board {:?} in project {:?}",
                    position, board.name, project
                ),
            )
        })?;
    }
    Ok(())
}

fn list_scope(list: &Value, key: &str) -> u64 {
    list.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn same_lists(old: &Value, new: &Value) -> bool {
    match (old.as_array(), new.as_array()) {
        (Some(old), Some(new)) => {
            old.len() == new.len()
                && old.iter().zip(new).all(|(o, n)| {
                    LIST_SCOPES
                        .iter()
                        .all(|key| list_scope(o, key) == list_scope(n, key))
                })
        },
        _ => false,
    }
}

fn same_label_set(old: &Value, new: &Value) -> bool {
    let names = |v: &Value| -> Option<BTreeSet<String>> {
        v.as_array()?
            .iter()
            .map(|label| label.as_str().map(str::to_string))
            .collect()
    };
    match (names(old), names(new)) {
        (Some(old), Some(new)) => old == new,
        _ => false,
    }
}

#[async_trait]
impl Resource for ProjectIssueBoard {
    type Config = IssueBoardConfig;
    type Id = IssueBoardId;
    type Api = dyn IssueBoardApi;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        let list = Block::new()
            .with_attribute(
                "id",
                Attribute::computed_int64().with_description("The ID of the list"),
            )
            .with_attribute(
                "label_id",
                Attribute::optional_int64().with_description(
                    "The ID of the label the list should be scoped to. Requires a GitLab EE license.",
                ),
            )
            .with_attribute(
                "assignee_id",
                Attribute::optional_int64().with_description(
                    "The ID of the assignee the list should be scoped to. Requires a GitLab EE license.",
                ),
            )
            .with_attribute(
                "milestone_id",
                Attribute::optional_int64().with_description(
                    "The ID of the milestone the list should be scoped to. Requires a GitLab EE license.",
                ),
            )
            .with_attribute(
                "iteration_id",
                Attribute::optional_int64().with_description(
                    "The ID of the iteration the list should be scoped to. Requires a GitLab EE license.",
                ),
            )
            .with_attribute(
                "position",
                Attribute::computed_int64().with_description(
                    "The position of the list within the board, based on its position in the `lists` array.",
                ),
            );

        Schema::v0()
            .with_description(
                "Manages the lifecycle of a Project Issue Board. If the board lists are changed all lists will be recreated.",
            )
            .with_attribute(
                "project",
                Attribute::required_string()
                    .with_description("The ID or full path of the project maintained by the authenticated user.")
                    .with_force_new()
                    .non_empty(),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the board."),
            )
            .with_attribute(
                "assignee_id",
                Attribute::optional_int64().with_description(
                    "The assignee the board should be scoped to. Requires a GitLab EE license.",
                ),
            )
            .with_attribute(
                "milestone_id",
                Attribute::optional_int64().with_description(
                    "The milestone the board should be scoped to. Requires a GitLab EE license.",
                ),
            )
            .with_attribute(
                "labels",
                Attribute::new(
                    AttributeType::set(AttributeType::String),
                    AttributeFlags::optional(),
                )
                .with_description(
                    "The list of label names which the board should be scoped to. Requires a GitLab EE license.",
                ),
            )
            .with_attribute(
                "weight",
                Attribute::optional_int64()
                    .with_description(
                        "The weight range from 0 to 9, to which the board should be scoped to. Requires a GitLab EE license.",
                    )
                    .with_int_range(0, 9),
            )
            .with_block(
                "lists",
                NestedBlock::list(list.with_description("The list of issue board lists")),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    fn scope(&self, config: &IssueBoardConfig) -> String {
        config.project.clone()
    }

    fn build_create(&self, config: &IssueBoardConfig) -> CreateIssueBoard {
        CreateIssueBoard {
            name: config.name.clone(),
        }
    }

    /// Always sends an update when anything changed, even if only the
    /// lists did, so `after_update` sees the board's current lists.
    fn build_update(
        &self,
        config: &IssueBoardConfig,
        changes: &ChangeSet,
    ) -> Option<UpdateIssueBoard> {
        if changes.is_empty() {
            return None;
        }
        Some(UpdateIssueBoard {
            name: changes.contains("name").then(|| config.name.clone()),
            assignee_id: config.assignee_id.filter(|_| changes.contains("assignee_id")),
            milestone_id: config.milestone_id.filter(|_| changes.contains("milestone_id")),
            labels: changes
                .contains("labels")
                .then(|| config.labels.iter().flatten().cloned().collect()),
            weight: config.weight.filter(|_| changes.contains("weight")),
        })
    }

    fn leaf_id(&self, entity: &IssueBoardEntity) -> u64 {
        entity.id
    }

    fn compose_id(&self, scope: &String, leaf: u64) -> IssueBoardId {
        IssueBoardId {
            project: scope.clone(),
            board_id: leaf,
        }
    }

    fn split_id(&self, id: &IssueBoardId) -> (String, u64) {
        (id.project.clone(), id.board_id)
    }

    fn flatten(&self, id: &IssueBoardId, entity: &IssueBoardEntity) -> StateMap {
        let mut lists: Vec<&BoardListEntity> = entity.lists.iter().collect();
        lists.sort_by_key(|list| list.position);
        let lists: Vec<Value> = lists
            .into_iter()
            .map(|list| {
                json!({
                    "id": list.id,
                    "position": list.position,
                    "label_id": list.label_id.unwrap_or(0),
                    "assignee_id": list.assignee_id.unwrap_or(0),
                    "milestone_id": list.milestone_id.unwrap_or(0),
                    "iteration_id": list.iteration_id.unwrap_or(0),
                })
            })
            .collect();

        StateMap::new()
            .with("project", id.project.as_str())
            .with("name", entity.name.as_str())
            .with("assignee_id", entity.assignee_id.unwrap_or(0))
            .with("milestone_id", entity.milestone_id.unwrap_or(0))
            .with("weight", entity.weight)
            .with("labels", entity.labels.clone())
            .with("lists", lists)
    }

    fn suppress_diff(&self, attr: &str, old: &Value, new: &Value) -> bool {
        match attr {
            "lists" => same_lists(old, new),
            "labels" => same_label_set(old, new),
            _ => false,
        }
    }

    async fn after_create(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        config: &IssueBoardConfig,
        scope: &String,
        created: &IssueBoardEntity,
    ) -> Result<(), ProviderError> {
        let scoping = scoping_update(config);
        if !scoping.is_empty() {
            debug!(project = %scope, board_id = created.id, "Scoping issue board after creation");
            cancellable(cancel, "update", api.update(scope, created.id, scoping)).await?;
        }
        create_lists(api, cancel, scope, created, config.declared_lists()).await
    }

    async fn after_update(
        &self,
        api: &Self::Api,
        cancel: &CancellationToken,
        config: &IssueBoardConfig,
        scope: &String,
        changes: &ChangeSet,
        updated: &IssueBoardEntity,
    ) -> Result<(), ProviderError> {
        if !changes.contains("lists") {
            return Ok(());
        }

        debug!(project = %scope, board_id = updated.id, "Recreating issue board lists");
        for list in &updated.lists {
            cancellable(cancel, "delete list", api.delete_list(scope, updated.id, list.id))
                .await
                .map_err(|e| {
                    with_list_context(
                        e,
                        format!(
                            "failed to delete list {} for Project Issue Board {:?} in project {:?}",
                            list.id, updated.name, scope
                        ),
                    )
                })?;
        }
        create_lists(api, cancel, scope, updated, config.declared_lists()).await
    }
}
