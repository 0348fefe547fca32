use std::time::Duration;

use crate::config::LaunchConfig;

pub struct PipelineConfig {
    /// Wait before re-fetching attribution for a first organic run.
    pub organic_grace: Duration,
    pub permission_cooldown: chrono::Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            organic_grace: Duration::from_secs(5),
            permission_cooldown: chrono::Duration::days(3),
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &LaunchConfig) -> Self {
        Self {
            organic_grace: config.timing.organic_grace(),
            permission_cooldown: config.timing.permission_cooldown(),
        }
    }
}
