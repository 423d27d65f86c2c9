//! `gitlab_release_link` data source: one link of a release.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::cancel::cancellable;
use crate::data_source::{parse_config, DataSource};
use crate::error::ProviderError;
use crate::identifier::CompositeId;
use crate::remote::RemoteApi;
use crate::resource::ID_ATTRIBUTE;
use crate::resources::release_link::{
    release_link_schema, release_link_state, ReleaseLinkId, ReleaseScope, TYPE_NAME,
};
use crate::resources::ReleaseLink;
use crate::schema::Schema;
use crate::state::StateMap;

#[derive(Debug, Deserialize)]
struct Lookup {
    project: String,
    tag_name: String,
    link_id: u64,
}

/// Looks up a release link by project, tag and link id.
pub struct ReleaseLinkDataSource {
    api: Arc<dyn RemoteApi<ReleaseLink>>,
}

impl ReleaseLinkDataSource {
    /// Create the data source.
    pub fn new(api: Arc<dyn RemoteApi<ReleaseLink>>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for ReleaseLinkDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        release_link_schema()
            .data_source_view(&["project", "tag_name", "link_id"])
            .with_description("Get information about a release link of a project release.")
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

        debug!(scope = ?scope, link_id = lookup.link_id, "Reading release link");
        let link = cancellable(cancel, "get", self.api.get(&scope, lookup.link_id)).await?;

        let id = ReleaseLinkId {
            project: scope.project.clone(),
            tag_name: scope.tag_name.clone(),
            link_id: lookup.link_id,
        };
        Ok(release_link_state(&scope.project, &scope.tag_name, &link).with(ID_ATTRIBUTE, id.encode()))
    }
}
