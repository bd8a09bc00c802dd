pub mod client;
pub mod types;

use crate::policy::{BodyLocator, PolicyError};
use serde_json::Value;
use thiserror::Error;
use types::{Body, Email, MessageId, Payload, ResponseList};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("HTTP {code} error: {body}")]
    Status { code: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),
}

/// The email service as seen by the client. One call is one request; there
/// is no caching or retry behind any of these.
pub trait EmailResource: Send {
    fn query(&self, page: u32, size: Option<u32>) -> Result<Vec<Email>, ApiError>;
    fn count(&self) -> Result<u64, ApiError>;
    fn delete(&self, message_id: &MessageId) -> Result<(), ApiError>;
    fn body(&self, locator: &BodyLocator) -> Result<Body, ApiError>;
    fn produce(&self, topic: &str, payloads: &[Payload]) -> Result<ResponseList, ApiError>;
    fn metrics(&self) -> Result<Value, ApiError>;
}
