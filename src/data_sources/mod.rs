//! Data source types of the provider.

pub mod release_link;
pub mod release_links;
pub mod user_ssh_keys;

pub use release_link::ReleaseLinkDataSource;
pub use release_links::ReleaseLinksDataSource;
pub use user_ssh_keys::UserSshKeysDataSource;
