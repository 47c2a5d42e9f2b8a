pub mod loader;
pub mod schema;

pub use loader::{default_config_path, load_config, validate_config};
pub use schema::{Config, GitConflictPolicy, GitSettings, LinkingConfig, RepositoryConfig, Settings};
