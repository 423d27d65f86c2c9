//! Hemmer GitLab Provider
//!
//! Resource and data source definitions that let Hemmer manage GitLab
//! objects: release links, project environments, deploy keys, project issue
//! boards and user SSH keys.
//!
//! # Overview
//!
//! Each resource type is described once, as an implementation of
//! [`resource::Resource`]: its schema, its composite identifier, how to
//! build request payloads from configuration and how to flatten the entity
//! the API returns. A generic [`resource::Reconciler`] drives the lifecycle
//! from there:
//!
//! - **Create** sends the create request, records the composite identifier
//!   and reads the entity back.
//! - **Read** refreshes state. An entity that no longer exists clears the
//!   identifier instead of failing.
//! - **Update** diffs the declared configuration against state and sends
//!   only the changed attributes.
//! - **Delete** removes the entity. Deleting an entity that is already gone
//!   succeeds.
//! - **Import** adopts an existing entity from its identifier.
//!
//! HTTP transport is not part of this crate. Each endpoint family is a trait
//! ([`remote::RemoteApi`] and its extensions) and the caller injects
//! implementations through [`Clients`].
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_gitlab::{init_logging, Clients, GitlabProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run(clients: Clients) -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = GitlabProvider::with_clients(&clients)?;
//!     provider
//!         .configure(serde_json::json!({ "base_url": "https://gitlab.example.com/api/v4/" }))
//!         .await?;
//!
//!     let cancel = CancellationToken::new();
//!     let state = provider
//!         .create(
//!             &cancel,
//!             "gitlab_release_link",
//!             serde_json::json!({
//!                 "project": "group/app",
//!                 "tag_name": "v1.0.0",
//!                 "name": "linux-amd64",
//!                 "url": "https://example.com/app-linux-amd64",
//!             }),
//!         )
//!         .await?;
//!     tracing::info!(id = %state["id"], "Created release link");
//!     Ok(())
//! }
//! ```
//!
//! # Identifiers
//!
//! Every resource identifier joins its parts with `:`, for example
//! `group/app:v1.0.0:42` for a release link. See [`identifier`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod config;
pub mod data_source;
pub mod data_sources;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod pagination;
pub mod provider;
pub mod remote;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod state;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod testing;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{default_registry, AuthCheck, Clients, GitlabProvider, Registry};
pub use schema::ProviderSchema;
pub use types::{AttributeChange, ImportedResource, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export commonly used dependencies
pub use async_trait::async_trait;
pub use serde_json;
pub use tracing;
