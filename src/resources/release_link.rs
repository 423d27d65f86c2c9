//! `gitlab_release_link`: an asset link attached to a release.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ProviderError;
use crate::identifier::{CompositeId, ResourceId};
use crate::remote::{Endpoint, RemoteApi};
use crate::resource::Resource;
use crate::schema::{render_value_list, Attribute, Schema};
use crate::state::{split_direct_asset_path, ChangeSet, StateMap};

/// Registered type name.
pub const TYPE_NAME: &str = "gitlab_release_link";

/// Path segment that separates the release URL from a direct asset's filepath.
pub const DIRECT_ASSET_MARKER: &str = "downloads";

/// Kind of asset a link points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Anything else.
    #[default]
    Other,
    /// Operational documentation.
    Runbook,
    /// A container or disk image.
    Image,
    /// A downloadable package.
    Package,
}

impl LinkType {
    /// Accepted values, the default first.
    pub const VALUES: [&'static str; 4] = ["other", "runbook", "image", "package"];

    /// The wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Other => "other",
            LinkType::Runbook => "runbook",
            LinkType::Image => "image",
            LinkType::Package => "package",
        }
    }
}

/// A release link as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLinkEntity {
    /// Leaf id.
    pub id: u64,
    /// Link name, unique within the release.
    pub name: String,
    /// Link URL, unique within the release.
    pub url: String,
    /// Permanent URL of the asset.
    #[serde(default)]
    pub direct_asset_url: String,
    /// Whether the link points outside the instance.
    #[serde(default)]
    pub external: bool,
    /// Kind of asset.
    #[serde(default)]
    pub link_type: LinkType,
}

/// The release a link belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseScope {
    /// Project id or full path.
    pub project: String,
    /// Tag of the release.
    pub tag_name: String,
}

/// `project:tag_name:link_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLinkId {
    /// Project id or full path.
    pub project: String,
    /// Tag of the release.
    pub tag_name: String,
    /// Leaf id.
    pub link_id: u64,
}

impl CompositeId for ReleaseLinkId {
    const ARITY: usize = 3;
    const FORMAT: &'static str = "project:tag_name:link_id";

    fn to_resource_id(&self) -> ResourceId {
        ResourceId::default()
            .with_key(self.project.as_str())
            .with_key(self.tag_name.as_str())
            .with_leaf(self.link_id)
    }

    fn from_resource_id(id: &ResourceId) -> Result<Self, ProviderError> {
        Ok(Self {
            project: id.key(0)?.to_string(),
            tag_name: id.key(1)?.to_string(),
            link_id: id.leaf(2)?,
        })
    }
}

/// Declared configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseLinkConfig {
    /// Project id or full path.
    pub project: String,
    /// Tag of the release.
    pub tag_name: String,
    /// Link name.
    pub name: String,
    /// Link URL.
    pub url: String,
    /// Relative path for a direct asset link.
    #[serde(default)]
    pub filepath: Option<String>,
    /// Kind of asset.
    #[serde(default)]
    pub link_type: Option<LinkType>,
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateReleaseLink {
    /// Link name.
    pub name: String,
    /// Link URL.
    pub url: String,
    /// Relative path for a direct asset link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    /// Kind of asset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
}

/// Partial update payload. `None` fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReleaseLink {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// New filepath.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    /// New kind of asset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
}

impl UpdateReleaseLink {
    /// Whether nothing would be sent.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Schema shared by the resource and the single link data source.
pub fn release_link_schema() -> Schema {
    Schema::v0()
        .with_description("Manages a release link of a project release.")
        .with_attribute(
            "project",
            Attribute::required_string()
                .with_description("The ID or URL-encoded path of the project.")
                .with_force_new(),
        )
        .with_attribute(
            "tag_name",
            Attribute::required_string()
                .with_description("The tag associated with the Release.")
                .with_force_new(),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_description("The name of the link. Link names must be unique within the release."),
        )
        .with_attribute(
            "url",
            Attribute::required_string()
                .with_description("The URL of the link. Link URLs must be unique within the release."),
        )
        .with_attribute(
            "filepath",
            Attribute::optional_string().with_description("Relative path for a Direct Asset link."),
        )
        .with_attribute(
            "link_type",
            Attribute::optional_string()
                .with_description(format!(
                    "The type of the link. Valid values are {}. Defaults to {}.",
                    render_value_list(&LinkType::VALUES),
                    LinkType::VALUES[0]
                ))
                .with_allowed_values(LinkType::VALUES)
                .with_default(json!(LinkType::Other.as_str())),
        )
        .with_attribute("link_id", Attribute::computed_int64().with_description("The ID of the link."))
        .with_attribute(
            "direct_asset_url",
            Attribute::computed_string().with_description("Full path for a Direct Asset link."),
        )
        .with_attribute(
            "external",
            Attribute::computed_bool().with_description("External or internal link."),
        )
        .with_attribute("id", Attribute::computed_string())
}

/// Flatten a release link. `project` and `tag_name` are not echoed by the
/// API and come from the identifier.
pub fn release_link_state(project: &str, tag_name: &str, link: &ReleaseLinkEntity) -> StateMap {
    StateMap::new()
        .with("project", project)
        .with("tag_name", tag_name)
        .with("name", link.name.as_str())
        .with("url", link.url.as_str())
        .with(
            "filepath",
            split_direct_asset_path(&link.direct_asset_url, DIRECT_ASSET_MARKER),
        )
        .with("link_type", link.link_type.as_str())
        .with("link_id", link.id)
        .with("direct_asset_url", link.direct_asset_url.as_str())
        .with("external", link.external)
}

/// The `gitlab_release_link` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseLink;

impl Endpoint for ReleaseLink {
    const KIND: &'static str = "release link";
    type Scope = ReleaseScope;
    type LeafId = u64;
    type Entity = ReleaseLinkEntity;
    type CreateRequest = CreateReleaseLink;
    type UpdateRequest = UpdateReleaseLink;
}

impl Resource for ReleaseLink {
    type Config = ReleaseLinkConfig;
    type Id = ReleaseLinkId;
    type Api = dyn RemoteApi<ReleaseLink>;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        release_link_schema()
    }

    fn scope(&self, config: &ReleaseLinkConfig) -> ReleaseScope {
        ReleaseScope {
            project: config.project.clone(),
            tag_name: config.tag_name.clone(),
        }
    }

    fn build_create(&self, config: &ReleaseLinkConfig) -> CreateReleaseLink {
        CreateReleaseLink {
            name: config.name.clone(),
            url: config.url.clone(),
            filepath: config.filepath.clone().filter(|p| !p.is_empty()),
            link_type: config.link_type,
        }
    }

    fn build_update(
        &self,
        config: &ReleaseLinkConfig,
        changes: &ChangeSet,
    ) -> Option<UpdateReleaseLink> {
        let mut update = UpdateReleaseLink::default();
        if changes.contains("name") {
            update.name = Some(config.name.clone());
        }
        if changes.contains("url") {
            update.url = Some(config.url.clone());
        }
        if changes.contains("filepath") {
            update.filepath = config.filepath.clone();
        }
        if changes.contains("link_type") {
            update.link_type = Some(config.link_type.unwrap_or_default());
        }
        (!update.is_empty()).then_some(update)
    }

    fn leaf_id(&self, entity: &ReleaseLinkEntity) -> u64 {
        entity.id
    }

    fn compose_id(&self, scope: &ReleaseScope, leaf: u64) -> ReleaseLinkId {
        ReleaseLinkId {
            project: scope.project.clone(),
            tag_name: scope.tag_name.clone(),
            link_id: leaf,
        }
    }

    fn split_id(&self, id: &ReleaseLinkId) -> (ReleaseScope, u64) {
        (
            ReleaseScope {
                project: id.project.clone(),
                tag_name: id.tag_name.clone(),
            },
            id.link_id,
        )
    }

    fn flatten(&self, id: &ReleaseLinkId, entity: &ReleaseLinkEntity) -> StateMap {
        release_link_state(&id.project, &id.tag_name, entity)
    }
}
