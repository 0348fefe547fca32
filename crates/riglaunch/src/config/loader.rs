use std::path::{Path, PathBuf};

use crate::config::schema::LaunchConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LaunchConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<LaunchConfig, ConfigError> {
    let config: LaunchConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &LaunchConfig) -> Result<(), ConfigError> {
    let endpoints = [
        ("validateUrl", &config.endpoints.validate_url),
        ("attributionBaseUrl", &config.endpoints.attribution_base_url),
        ("destinationUrl", &config.endpoints.destination_url),
    ];
    for (name, value) in endpoints {
        if let Err(e) = reqwest::Url::parse(value) {
            return Err(ConfigError::Validation {
                message: format!("Endpoint '{}' is not a valid URL ({}): {}", name, value, e),
            });
        }
    }

    if config.app.app_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "app.appId must not be empty".to_string(),
        });
    }

    if config.timing.retry_delays_secs.is_empty() {
        return Err(ConfigError::Validation {
            message: "timing.retryDelaysSecs needs at least one entry".to_string(),
        });
    }

    if config.timing.launch_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "timing.launchTimeoutSecs must be greater than zero".to_string(),
        });
    }

    if config.timing.permission_cooldown_days < 0 {
        return Err(ConfigError::Validation {
            message: "timing.permissionCooldownDays must not be negative".to_string(),
        });
    }

    Ok(())
}

/// Returns the canonical database path: `~/.riglaunch/data/riglaunch.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".riglaunch").join("data").join("riglaunch.db"))
}
