use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    pub endpoints: EndpointsConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointsConfig {
    /// Remote marker checked before any attribution-derived destination is trusted.
    pub validate_url: String,
    /// Install-data endpoint; the app id is appended as `/id{app_id}`.
    pub attribution_base_url: String,
    /// Redirect-resolution endpoint receiving the enriched attribution payload.
    pub destination_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub app_id: String,
    pub dev_key: String,
    pub bundle_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Identifier the attribution vendor assigned to this device.
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Preferred language tag, e.g. `de-CH`. Only the first two letters are sent.
    #[serde(default)]
    pub preferred_language: Option<String>,
}

fn default_platform() -> String {
    "iOS".to_string()
}

impl AppConfig {
    pub fn store_id(&self) -> String {
        format!("id{}", self.app_id)
    }

    pub fn locale_code(&self) -> String {
        locale_code(self.preferred_language.as_deref())
    }
}

/// Two-letter uppercased language code, `EN` when nothing usable is known.
pub fn locale_code(preferred: Option<&str>) -> String {
    preferred
        .map(|tag| tag.chars().take(2).collect::<String>().to_uppercase())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| "EN".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingConfig {
    #[serde(default = "default_launch_timeout_secs")]
    pub launch_timeout_secs: u64,
    #[serde(default = "default_merge_window_ms")]
    pub merge_window_ms: u64,
    #[serde(default = "default_organic_grace_secs")]
    pub organic_grace_secs: u64,
    #[serde(default = "default_retry_delays_secs")]
    pub retry_delays_secs: Vec<u64>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_permission_cooldown_days")]
    pub permission_cooldown_days: i64,
}

fn default_launch_timeout_secs() -> u64 {
    30
}

fn default_merge_window_ms() -> u64 {
    2500
}

fn default_organic_grace_secs() -> u64 {
    5
}

fn default_retry_delays_secs() -> Vec<u64> {
    vec![10, 20, 40]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_permission_cooldown_days() -> i64 {
    3
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            launch_timeout_secs: default_launch_timeout_secs(),
            merge_window_ms: default_merge_window_ms(),
            organic_grace_secs: default_organic_grace_secs(),
            retry_delays_secs: default_retry_delays_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            permission_cooldown_days: default_permission_cooldown_days(),
        }
    }
}

impl TimingConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    pub fn merge_window(&self) -> Duration {
        Duration::from_millis(self.merge_window_ms)
    }

    pub fn organic_grace(&self) -> Duration {
        Duration::from_secs(self.organic_grace_secs)
    }

    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .map(|s| Duration::from_secs(*s))
            .collect()
    }

    pub fn permission_cooldown(&self) -> chrono::Duration {
        chrono::Duration::days(self.permission_cooldown_days)
    }
}
