//! `gitlab_release_links` data source: every link of a release.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::data_source::{parse_config, DataSource};
use crate::error::ProviderError;
use crate::identifier::build_two_part;
use crate::pagination::collect_pages;
use crate::remote::{PageRequest, RemoteApi, DEFAULT_PER_PAGE};
use crate::resource::ID_ATTRIBUTE;
use crate::resources::release_link::{release_link_schema, release_link_state, ReleaseScope};
use crate::resources::ReleaseLink;
use crate::schema::{Attribute, NestedBlock, Schema};
use crate::state::StateMap;

/// Registered type name.
pub const TYPE_NAME: &str = "gitlab_release_links";

#[derive(Debug, Deserialize)]
struct Lookup {
    project: String,
    tag_name: String,
}

/// Lists the links of a release.
pub struct ReleaseLinksDataSource {
    api: Arc<dyn RemoteApi<ReleaseLink>>,
}

impl ReleaseLinksDataSource {
    /// Create the data source.
    pub fn new(api: Arc<dyn RemoteApi<ReleaseLink>>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for ReleaseLinksDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let link = release_link_schema().data_source_view(&[]).block;
        Schema::v0()
            .with_description("Get details of the links of a release.")
            .with_attribute(
                "project",
                Attribute::required_string().with_description("The ID or full path to the project."),
            )
            .with_attribute(
                "tag_name",
                Attribute::required_string().with_description("The tag associated with the Release."),
            )
            .with_block(
                "release_links",
                NestedBlock::list(link.with_description("List of release links")).computed(),
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
        let scope = ReleaseScope {
            project: lookup.project,
            tag_name: lookup.tag_name,
        };

        let links = collect_pages(cancel, PageRequest::first(DEFAULT_PER_PAGE), |request| {
            self.api.list(&scope, request)
        })
        .await?;
        debug!(scope = ?scope, count = links.len(), "Listed release links");

        let flattened: Vec<Value> = links
            .iter()
            .map(|link| release_link_state(&scope.project, &scope.tag_name, link).to_value())
            .collect();

        Ok(StateMap::new()
            .with("project", scope.project.as_str())
            .with("tag_name", scope.tag_name.as_str())
            .with("release_links", flattened)
            .with(ID_ATTRIBUTE, build_two_part(&scope.project, &scope.tag_name)))
    }
}
