pub mod attribution;
pub mod config;
pub mod error;
pub mod gateway;
pub mod launch;
pub mod logging;
pub mod pipeline;
pub mod push;
pub mod store;

pub use attribution::{merge_deeplink, AttributionBuffer};
pub use config::{default_database_path, load_config, LaunchConfig};
pub use error::{ConfigError, GatewayError, Result, RigLaunchError, StoreError};
pub use gateway::{LiveGateway, NetworkGateway};
pub use launch::{LaunchOrchestrator, LaunchSignal, PermissionDecision};
pub use pipeline::{Outcome, Pipeline, PipelineConfig, PipelineContext};
pub use push::{extract_push_url, PushIngestor};
pub use store::{DataStore, DiskStore, SqliteKv, StoredData};
