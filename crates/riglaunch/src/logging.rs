//! Tracing subscriber setup.
//!
//! `log` records emitted by the gateway and store are forwarded into
//! `tracing` through `tracing-log`, so a single subscriber sees everything.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

static INSTALLED: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Human,
        }
    }
}

/// Installs the global subscriber once. Later calls are no-ops and return
/// the result of the first attempt.
pub fn init(format: LogFormat) -> bool {
    *INSTALLED.get_or_init(|| install(format))
}

fn install(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let human = (format == LogFormat::Human).then(|| fmt::layer().with_target(true));
    let json = (format == LogFormat::Json).then(|| fmt::layer().json().with_current_span(true));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(human)
        .with(json);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    // A logger may already be set by an embedding application.
    let _ = tracing_log::LogTracer::init();
    true
}

/// Reduces a URL to scheme and host for log output.
pub fn redact_url(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}/…", url.scheme(), host),
            None => format!("{}:…", url.scheme()),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}
