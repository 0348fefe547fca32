//! Remote operations the launch pipeline depends on.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::GatewayError;

pub mod live;
pub mod retry;

pub use live::LiveGateway;
pub use retry::{AttemptOutcome, RetryPolicy};

pub type Result<T> = std::result::Result<T, GatewayError>;

#[async_trait]
pub trait NetworkGateway: Send + Sync {
    /// Checks the remote marker. `true` only when it holds a non-empty,
    /// syntactically valid URL.
    async fn validate(&self) -> Result<bool>;

    /// Fresh install attribution for this device, values coerced to strings.
    async fn fetch_attribution(&self) -> Result<HashMap<String, String>>;

    /// Resolves the destination URL for the given attribution, retrying per
    /// the gateway's [`RetryPolicy`].
    async fn fetch_destination(&self, attribution: &HashMap<String, String>) -> Result<String>;
}
