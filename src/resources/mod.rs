//! Resource types of the provider.
//!
//! Each module defines the entity, the composite identifier, the typed
//! configuration and the [`Resource`](crate::resource::Resource)
//! implementation of one GitLab object.

pub mod deploy_key;
pub mod issue_board;
pub mod project_environment;
pub mod release_link;
pub mod user_ssh_key;

pub use deploy_key::DeployKey;
pub use issue_board::{IssueBoardApi, ProjectIssueBoard};
pub use project_environment::{EnvironmentApi, ProjectEnvironment};
pub use release_link::ReleaseLink;
pub use user_ssh_key::{UserSshKey, UserSshKeyApi};
