//! HTTP implementation of [`NetworkGateway`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};

use super::retry::{AttemptOutcome, RetryPolicy};
use super::{NetworkGateway, Result};
use crate::config::LaunchConfig;
use crate::error::GatewayError;
use crate::logging::redact_url;
use crate::store::codec::coerce_string_map;
use crate::store::DataStore;

/// Creates an HTTP client with the configured timeouts.
fn create_http_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|e| GatewayError::RequestFailed(format!("Failed to create HTTP client: {}", e)))
}

pub struct LiveGateway {
    client: Client,
    config: Arc<LaunchConfig>,
    retry: RetryPolicy,
    /// Source of the push token sent with destination requests.
    store: Arc<dyn DataStore>,
}

impl LiveGateway {
    pub fn new(config: Arc<LaunchConfig>, store: Arc<dyn DataStore>) -> Result<Self> {
        let timing = &config.timing;
        let client = create_http_client(
            Duration::from_secs(timing.connect_timeout_secs),
            Duration::from_secs(timing.request_timeout_secs),
        )?;
        let retry = RetryPolicy::new(timing.retry_delays());

        Ok(Self {
            client,
            config,
            retry,
            store,
        })
    }

    pub fn attribution_url(&self) -> Result<Url> {
        let base = self.config.endpoints.attribution_base_url.trim_end_matches('/');
        let app = &self.config.app;
        Url::parse_with_params(
            &format!("{}/id{}", base, app.app_id),
            &[
                ("devkey", app.dev_key.as_str()),
                ("device_id", app.device_id.as_str()),
            ],
        )
        .map_err(|e| GatewayError::BadUrl(e.to_string()))
    }

    /// Attribution fields plus device and app identity.
    pub fn destination_payload(&self, attribution: &HashMap<String, String>) -> Map<String, Value> {
        let app = &self.config.app;
        let push_token = match self.store.push_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to read push token: {}", e);
                None
            }
        };

        let mut body: Map<String, Value> = attribution
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        body.insert("os".into(), Value::String(app.platform.clone()));
        body.insert("af_id".into(), Value::String(app.device_id.clone()));
        body.insert("bundle_id".into(), Value::String(app.bundle_id.clone()));
        body.insert(
            "firebase_project_id".into(),
            app.project_id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        body.insert("store_id".into(), Value::String(app.store_id()));
        body.insert(
            "push_token".into(),
            push_token.map(Value::String).unwrap_or(Value::Null),
        );
        body.insert("locale".into(), Value::String(app.locale_code()));
        body
    }

    async fn post_destination(&self, url: &Url, body: &Map<String, Value>) -> AttemptOutcome {
        let mut request = self.client.post(url.clone()).json(body);
        if let Some(ua) = &self.config.app.user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return AttemptOutcome::Failed(GatewayError::RequestFailed(e.to_string())),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return AttemptOutcome::RateLimited;
        }
        if !status.is_success() {
            return AttemptOutcome::Fatal(GatewayError::RequestFailed(format!(
                "Destination request returned {}",
                status
            )));
        }

        match response.json::<Value>().await {
            Ok(json) => match parse_destination(&json) {
                Ok(url) => AttemptOutcome::Success(url),
                Err(e) => AttemptOutcome::Failed(e),
            },
            Err(e) => AttemptOutcome::Failed(GatewayError::Decode(e.to_string())),
        }
    }
}

/// A destination body must carry `"ok": true` and a string `"url"`.
pub fn parse_destination(json: &Value) -> Result<String> {
    if json.get("ok").and_then(Value::as_bool) != Some(true) {
        return Err(GatewayError::Decode(
            "destination response is missing \"ok\": true".to_string(),
        ));
    }
    json.get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Decode("destination response has no url".to_string()))
}

/// The marker is valid only as a non-empty string parsing as a URL.
pub fn is_valid_marker(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty() && Url::parse(s).is_ok(),
        _ => false,
    }
}

#[async_trait]
impl NetworkGateway for LiveGateway {
    async fn validate(&self) -> Result<bool> {
        let url = Url::parse(&self.config.endpoints.validate_url)
            .map_err(|e| GatewayError::BadUrl(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::RequestFailed(format!(
                "Validation request returned {}",
                response.status()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let valid = is_valid_marker(&value);
        debug!("Remote marker valid: {}", valid);
        Ok(valid)
    }

    async fn fetch_attribution(&self) -> Result<HashMap<String, String>> {
        let url = self.attribution_url()?;
        debug!("Fetching attribution from {}", redact_url(url.as_str()));

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::RequestFailed(format!(
                "Attribution request returned {}",
                response.status()
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        match json {
            Value::Object(object) => {
                let data = coerce_string_map(&object);
                info!("Fetched attribution with {} fields", data.len());
                Ok(data)
            }
            _ => Err(GatewayError::Decode(
                "attribution response is not a JSON object".to_string(),
            )),
        }
    }

    async fn fetch_destination(&self, attribution: &HashMap<String, String>) -> Result<String> {
        let url = Url::parse(&self.config.endpoints.destination_url)
            .map_err(|e| GatewayError::BadUrl(e.to_string()))?;
        let body = self.destination_payload(attribution);

        info!(
            "Resolving destination via {} ({} attribution fields)",
            redact_url(url.as_str()),
            attribution.len()
        );

        let (url, body) = (&url, &body);
        self.retry
            .run(move |_| self.post_destination(url, body))
            .await
    }
}
