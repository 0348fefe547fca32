pub mod loader;
pub mod schema;

pub use loader::{default_database_path, load_config, load_config_from_str};
pub use schema::{AppConfig, EndpointsConfig, LaunchConfig, TimingConfig};
