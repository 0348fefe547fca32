//! Builders for test configs and attribution maps.

#![allow(dead_code)]

use std::collections::HashMap;

use riglaunch::config::{AppConfig, EndpointsConfig, LaunchConfig, TimingConfig};

/// Builder for `LaunchConfig` with test endpoints and default timing.
pub struct ConfigBuilder {
    app_id: String,
    preferred_language: Option<String>,
    endpoints: EndpointsConfig,
    timing: TimingConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            app_id: "6758891050".to_string(),
            preferred_language: None,
            endpoints: EndpointsConfig {
                validate_url: "https://marker.example.com/users/log/data.json".to_string(),
                attribution_base_url: "https://attribution.example.com/install_data/v4.0"
                    .to_string(),
                destination_url: "https://dest.example.com/config.php".to_string(),
            },
            timing: TimingConfig::default(),
        }
    }

    pub fn app_id(mut self, app_id: &str) -> Self {
        self.app_id = app_id.to_string();
        self
    }

    pub fn preferred_language(mut self, language: &str) -> Self {
        self.preferred_language = Some(language.to_string());
        self
    }

    pub fn launch_timeout_secs(mut self, secs: u64) -> Self {
        self.timing.launch_timeout_secs = secs;
        self
    }

    pub fn merge_window_ms(mut self, ms: u64) -> Self {
        self.timing.merge_window_ms = ms;
        self
    }

    /// Points every endpoint at `base`, as a single local server would serve them.
    pub fn endpoints_at(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.endpoints = EndpointsConfig {
            validate_url: format!("{}/users/log/data.json", base),
            attribution_base_url: format!("{}/install_data/v4.0", base),
            destination_url: format!("{}/config.php", base),
        };
        self
    }

    pub fn retry_delays_secs(mut self, delays: &[u64]) -> Self {
        self.timing.retry_delays_secs = delays.to_vec();
        self
    }

    pub fn build(self) -> LaunchConfig {
        LaunchConfig {
            endpoints: self.endpoints,
            app: AppConfig {
                app_id: self.app_id,
                dev_key: "test-dev-key".to_string(),
                bundle_id: "com.example.rigs".to_string(),
                project_id: Some("rig-project".to_string()),
                platform: "iOS".to_string(),
                device_id: "device-1".to_string(),
                user_agent: None,
                preferred_language: self.preferred_language,
            },
            timing: self.timing,
        }
    }
}

/// Builder for flat string maps as the attribution SDK delivers them.
#[derive(Default)]
pub struct AttributionBuilder {
    fields: HashMap<String, String>,
}

impl AttributionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn organic() -> Self {
        Self::new().field("af_status", "Organic")
    }

    pub fn non_organic() -> Self {
        Self::new()
            .field("af_status", "Non-organic")
            .field("media_source", "test_source")
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> HashMap<String, String> {
        self.fields
    }
}
