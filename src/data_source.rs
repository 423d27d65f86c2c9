//! Read-only lookups.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::schema::Schema;
use crate::state::StateMap;
use crate::validation::ensure_valid;

/// One data source type.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The registered type name, e.g. `gitlab_release_links`.
    fn type_name(&self) -> &'static str;

    /// The schema of the data source's state.
    fn schema(&self) -> Schema;

    /// Look up the remote data. The returned state carries an `id`.
    async fn read(
        &self,
        cancel: &CancellationToken,
        config: &Value,
    ) -> Result<StateMap, ProviderError>;
}

/// Validate `config` against `schema` and deserialize it.
pub fn parse_config<T: DeserializeOwned>(schema: &Schema, config: &Value) -> Result<T, ProviderError> {
    ensure_valid(schema, config)?;
    serde_json::from_value(config.clone())
        .map_err(|e| ProviderError::InvalidConfiguration(e.to_string()))
}
