use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::types::*;
use super::{ApiError, EmailResource};
use crate::policy::{BodyLocator, PolicyError};

/// ureq-backed client for the email listing service.
pub struct RestClient {
    base: Url,
    agent: ureq::Agent,
}

impl RestClient {
    pub fn new(base: Url, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        RestClient { base, agent }
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::Http(format!("base URL {} cannot carry a path", self.base)))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn get_json(&self, request: ureq::Request) -> Result<Value, ApiError> {
        let response = check(request.call())?;
        let text = response
            .into_string()
            .map_err(|e| ApiError::Parse(format!("Failed to read response: {}", e)))?;
        log::debug!("[REST] Response body ({} bytes)", text.len());
        serde_json::from_str(&text).map_err(|e| {
            ApiError::Parse(format!(
                "Failed to parse response: {}. Response was: {}",
                e,
                truncate_str(&text, 200)
            ))
        })
    }
}

/// Map ureq's error split (status vs transport) onto ApiError.
fn check(result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, ApiError> {
    result.map_err(api_error)
}

fn api_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            log::error!("[REST] HTTP error {}: {}", code, truncate_str(&body, 200));
            ApiError::Status {
                code,
                body: if body.is_empty() {
                    "(empty response)".to_string()
                } else {
                    truncate_str(&body, 200).to_string()
                },
            }
        }
        e => {
            log::error!("[REST] Connection error: {}", e);
            ApiError::Http(e.to_string())
        }
    }
}

impl EmailResource for RestClient {
    fn query(&self, page: u32, size: Option<u32>) -> Result<Vec<Email>, ApiError> {
        log::info!("[REST] Listing emails (page: {}, size: {:?})", page, size);
        let url = self.endpoint(&["emails", "list"])?;
        let mut request = self.agent.get(url.as_str()).query("page", &page.to_string());
        if let Some(size) = size {
            request = request.query("size", &size.to_string());
        }
        let value = self.get_json(request)?;
        let emails: Vec<Email> =
            serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))?;
        log::info!("[REST] Email list returned {} emails", emails.len());
        Ok(emails)
    }

    fn count(&self) -> Result<u64, ApiError> {
        let url = self.endpoint(&["emails", "list", "count"])?;
        let value = self.get_json(self.agent.get(url.as_str()))?;
        parse_count(&value)
            .ok_or_else(|| ApiError::Parse(format!("Unexpected count response: {}", value)))
    }

    fn delete(&self, message_id: &MessageId) -> Result<(), ApiError> {
        log::info!("[REST] Deleting email {}", message_id);
        let id = message_id.to_string();
        let url = self.endpoint(&["emails", "list", &id])?;
        check(self.agent.delete(url.as_str()).call())?;
        Ok(())
    }

    fn body(&self, locator: &BodyLocator) -> Result<Body, ApiError> {
        log::debug!("[REST] Fetching body from {}", locator);
        if locator.url().origin() != self.base.origin() {
            return Err(PolicyError::ForeignOrigin(locator.to_string()).into());
        }
        let response = check(self.agent.get(locator.as_str()).call())?;
        let content_type = response.content_type().to_string();
        let text = response
            .into_string()
            .map_err(|e| ApiError::Parse(format!("Failed to read body: {}", e)))?;
        Ok(Body { content_type, text })
    }

    fn produce(&self, topic: &str, payloads: &[Payload]) -> Result<ResponseList, ApiError> {
        log::info!("[REST] Producing {} payload(s) to topic {}", payloads.len(), topic);
        let url = self.endpoint(&["v1", "produce", topic])?;
        let text = match self.agent.post(url.as_str()).send_json(payloads) {
            Ok(resp) => resp.into_string(),
            // A rejected batch still carries the per-payload response list.
            Err(ureq::Error::Status(400, resp)) => resp.into_string(),
            Err(e) => return Err(api_error(e)),
        }
        .map_err(|e| ApiError::Parse(format!("Failed to read response: {}", e)))?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::Parse(format!(
                "Failed to parse produce response: {}. Response was: {}",
                e,
                truncate_str(&text, 200)
            ))
        })
    }

    fn metrics(&self) -> Result<Value, ApiError> {
        let url = self.endpoint(&["v1", "produce", "metrics"])?;
        self.get_json(self.agent.get(url.as_str()))
    }
}

pub(crate) fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RestClient {
        RestClient::new(Url::parse(base).unwrap(), Duration::from_secs(1))
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let c = client("http://localhost:8080");
        let url = c.endpoint(&["emails", "list", "count"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/emails/list/count");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = client("http://localhost:8080/mail/");
        let url = c.endpoint(&["emails", "list"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/mail/emails/list");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let c = client("http://localhost:8080");
        let url = c.endpoint(&["emails", "list", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/emails/list/a%2Fb%20c");
    }

    #[test]
    fn test_truncate_str_char_boundary() {
        assert_eq!(truncate_str("héllo", 2), "h");
        assert_eq!(truncate_str("abc", 10), "abc");
    }
}
